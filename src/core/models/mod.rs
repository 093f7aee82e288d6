pub mod activity;
pub mod balance;
pub mod draft;
pub mod settlement;
pub mod summary;

pub use activity::{ActivityEntry, ActivityKind};
pub use balance::{Balance, BalanceSnapshot};
pub use draft::SettlementDraft;
pub use settlement::{
    CancelUpiRequest, ConfirmUpiRequest, PaymentChannel, SettlementEnvelope, SettlementPage, SettlementQuery,
    SettlementRecord, SettlementRequest, SettlementStatus, UpiSettlementIntent, UpiSettlementRequest,
};
pub use summary::BalanceSummary;
