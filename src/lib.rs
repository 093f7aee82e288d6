pub mod api;
pub mod auth;
pub mod config;
pub mod constants;
pub mod core;
pub mod infrastructure;

pub use crate::core::coordinator::{CoordinatorOptions, SettlementCoordinator};
pub use crate::core::errors::SettleError;
pub use crate::core::state::WorkflowState;
pub use infrastructure::ledger::{LedgerService, http::HttpLedger, in_memory::InMemoryLedger};

#[cfg(test)]
mod tests;
