pub mod balance_provider;
pub mod coordinator;
pub mod currency;
pub mod errors;
pub mod models;
pub mod state;
pub mod upi;
