use crate::core::errors::SettleError;
use crate::core::models::BalanceSnapshot;
use crate::infrastructure::ledger::LedgerService;
use std::sync::Arc;
use tracing::{debug, warn};

/// Reads the current pairwise balances from the ledger. Never retries; the
/// caller owns retry policy.
pub struct BalanceProvider<L: LedgerService> {
    ledger: Arc<L>,
}

impl<L: LedgerService> Clone for BalanceProvider<L> {
    fn clone(&self) -> Self {
        BalanceProvider {
            ledger: self.ledger.clone(),
        }
    }
}

impl<L: LedgerService> BalanceProvider<L> {
    pub fn new(ledger: Arc<L>) -> Self {
        BalanceProvider { ledger }
    }

    /// Every returned amount is strictly positive; settled pairs are absent.
    pub async fn fetch(&self, scope: Option<&str>) -> Result<BalanceSnapshot, SettleError> {
        let mut snapshot = self.ledger.fetch_balances(scope).await?;
        let dropped = snapshot.retain_positive();
        if dropped > 0 {
            warn!(dropped, scope = ?scope, "ledger returned non-positive balances");
        }
        debug!(
            scope = ?scope,
            owed_to_me = snapshot.owed_to_me.len(),
            i_owe = snapshot.i_owe.len(),
            "balances fetched"
        );
        Ok(snapshot)
    }
}
