pub mod http;
pub mod in_memory;

use crate::core::errors::SettleError;
use crate::core::models::{
    ActivityEntry, BalanceSnapshot, BalanceSummary, SettlementPage, SettlementQuery, SettlementRecord,
    SettlementRequest, UpiSettlementIntent, UpiSettlementRequest,
};
use async_trait::async_trait;
use std::sync::Arc;

/// The external system of record for balances and settlements, seen from the
/// authenticated user.
#[async_trait]
pub trait LedgerService: Send + Sync {
    async fn fetch_balances(&self, scope: Option<&str>) -> Result<BalanceSnapshot, SettleError>;
    async fn create_settlement(&self, request: SettlementRequest) -> Result<SettlementRecord, SettleError>;
    async fn create_upi_settlement(&self, request: UpiSettlementRequest) -> Result<UpiSettlementIntent, SettleError>;
    async fn confirm_upi_payment(
        &self,
        settlement_id: &str,
        transaction_ref: Option<&str>,
    ) -> Result<SettlementRecord, SettleError>;
    async fn cancel_upi_payment(&self, settlement_id: &str) -> Result<SettlementRecord, SettleError>;
    async fn balance_summary(&self, scope: Option<&str>) -> Result<BalanceSummary, SettleError>;
    async fn list_settlements(&self, query: SettlementQuery) -> Result<SettlementPage, SettleError>;
    async fn recent_activity(&self, limit: usize) -> Result<Vec<ActivityEntry>, SettleError>;
}

#[async_trait]
impl<T: LedgerService + ?Sized> LedgerService for Arc<T> {
    async fn fetch_balances(&self, scope: Option<&str>) -> Result<BalanceSnapshot, SettleError> {
        (**self).fetch_balances(scope).await
    }

    async fn create_settlement(&self, request: SettlementRequest) -> Result<SettlementRecord, SettleError> {
        (**self).create_settlement(request).await
    }

    async fn create_upi_settlement(&self, request: UpiSettlementRequest) -> Result<UpiSettlementIntent, SettleError> {
        (**self).create_upi_settlement(request).await
    }

    async fn confirm_upi_payment(
        &self,
        settlement_id: &str,
        transaction_ref: Option<&str>,
    ) -> Result<SettlementRecord, SettleError> {
        (**self).confirm_upi_payment(settlement_id, transaction_ref).await
    }

    async fn cancel_upi_payment(&self, settlement_id: &str) -> Result<SettlementRecord, SettleError> {
        (**self).cancel_upi_payment(settlement_id).await
    }

    async fn balance_summary(&self, scope: Option<&str>) -> Result<BalanceSummary, SettleError> {
        (**self).balance_summary(scope).await
    }

    async fn list_settlements(&self, query: SettlementQuery) -> Result<SettlementPage, SettleError> {
        (**self).list_settlements(query).await
    }

    async fn recent_activity(&self, limit: usize) -> Result<Vec<ActivityEntry>, SettleError> {
        (**self).recent_activity(limit).await
    }
}
