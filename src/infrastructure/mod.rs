pub mod ledger;
pub mod notifications;
pub mod payment_app;
