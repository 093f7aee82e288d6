use crate::constants::constants::{DEFAULT_PAGE_LIMIT, MAX_NOTE_LENGTH};
use crate::core::errors::SettleError;
use crate::core::models::summary::round_cents;
use crate::core::models::{
    ActivityEntry, ActivityKind, Balance, BalanceSnapshot, BalanceSummary, PaymentChannel, SettlementPage,
    SettlementQuery, SettlementRecord, SettlementRequest, SettlementStatus, UpiSettlementIntent,
    UpiSettlementRequest,
};
use crate::infrastructure::ledger::LedgerService;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

const EPSILON: f64 = 0.005;

#[derive(Clone, Debug, PartialEq)]
pub struct LedgerUser {
    pub id: String,
    pub name: String,
    pub upi_id: Option<String>,
}

impl LedgerUser {
    pub fn new(id: &str, name: &str, upi_id: Option<&str>) -> Self {
        LedgerUser {
            id: id.to_string(),
            name: name.to_string(),
            upi_id: upi_id.map(String::from),
        }
    }
}

/// (lower user id, higher user id, group). The value is what the lower id owes the
/// higher id; negative means the reverse.
type PairKey = (String, String, Option<String>);

#[derive(Default)]
struct LedgerBook {
    users: HashMap<String, LedgerUser>,
    debts: HashMap<PairKey, f64>,
    settlements: HashMap<String, SettlementRecord>,
    activity: Vec<ActivityEntry>,
}

impl LedgerBook {
    fn add_debt(&mut self, debtor: &str, creditor: &str, amount: f64, group_id: Option<&str>) {
        let (key, delta) = if debtor < creditor {
            ((debtor.to_string(), creditor.to_string(), group_id.map(String::from)), amount)
        } else {
            ((creditor.to_string(), debtor.to_string(), group_id.map(String::from)), -amount)
        };
        let entry = self.debts.entry(key.clone()).or_insert(0.0);
        *entry = round_cents(*entry + delta);
        if entry.abs() < EPSILON {
            self.debts.remove(&key);
        }
    }

    /// Net amount `user_id` owes each counterparty within `scope` (all groups when `None`).
    fn net_positions(&self, user_id: &str, scope: Option<&str>) -> BTreeMap<String, f64> {
        let mut positions = BTreeMap::new();
        for ((low, high, group), amount) in &self.debts {
            if let Some(scope) = scope {
                if group.as_deref() != Some(scope) {
                    continue;
                }
            }
            let (counterparty, owed) = if low == user_id {
                (high, *amount)
            } else if high == user_id {
                (low, -*amount)
            } else {
                continue;
            };
            *positions.entry(counterparty.clone()).or_insert(0.0) += owed;
        }
        positions
    }

    fn outstanding(&self, debtor: &str, creditor: &str, scope: Option<&str>) -> f64 {
        round_cents(self.net_positions(debtor, scope).get(creditor).copied().unwrap_or(0.0))
    }

    fn balance_entry(&self, counterparty_id: &str, amount: f64, scope: Option<&str>) -> Balance {
        let user = self.users.get(counterparty_id);
        Balance {
            counterparty_id: counterparty_id.to_string(),
            counterparty_name: user.map(|u| u.name.clone()).unwrap_or_else(|| counterparty_id.to_string()),
            counterparty_upi_id: user.and_then(|u| u.upi_id.clone()),
            amount: round_cents(amount),
            group_id: scope.map(String::from),
        }
    }

    fn snapshot(&self, user_id: &str, scope: Option<&str>) -> BalanceSnapshot {
        let mut snapshot = BalanceSnapshot::default();
        for (counterparty, net) in self.net_positions(user_id, scope) {
            if net > EPSILON {
                snapshot.i_owe.push(self.balance_entry(&counterparty, net, scope));
            } else if net < -EPSILON {
                snapshot.owed_to_me.push(self.balance_entry(&counterparty, -net, scope));
            }
        }
        snapshot
    }

    fn record_activity(&mut self, kind: ActivityKind, settlement: &SettlementRecord) {
        let payee_name = self
            .users
            .get(&settlement.payee)
            .map(|u| u.name.clone())
            .unwrap_or_else(|| settlement.payee.clone());
        let description = match kind {
            ActivityKind::SettlementRecorded => format!("Settled up with {}", payee_name),
            ActivityKind::UpiPaymentStarted => format!("Started UPI payment to {}", payee_name),
            ActivityKind::UpiPaymentConfirmed => format!("Paid {} via UPI", payee_name),
            ActivityKind::UpiPaymentCancelled => format!("Cancelled UPI payment to {}", payee_name),
        };
        self.activity.push(ActivityEntry {
            id: Uuid::new_v4().to_string(),
            kind,
            actor_id: settlement.payer.clone(),
            counterparty_id: settlement.payee.clone(),
            description,
            amount: settlement.amount,
            group_id: settlement.group_id.clone(),
            created_at: Utc::now(),
        });
    }

    fn validate_payment(&self, payer: &str, payee: &str, amount: f64, scope: Option<&str>) -> Result<(), SettleError> {
        if payer == payee {
            return Err(SettleError::rejected(400, "Cannot settle with yourself"));
        }
        if !self.users.contains_key(payee) {
            return Err(SettleError::rejected(404, format!("User {} not found", payee)));
        }
        if !amount.is_finite() || amount <= 0.0 {
            return Err(SettleError::rejected(400, "Amount must be greater than 0"));
        }
        let outstanding = self.outstanding(payer, payee, scope);
        if outstanding < EPSILON {
            return Err(SettleError::rejected(409, "Balance already settled"));
        }
        if amount > outstanding + EPSILON {
            return Err(SettleError::rejected(400, "Amount exceeds outstanding balance"));
        }
        Ok(())
    }

    fn owned_settlement(&self, payer: &str, settlement_id: &str) -> Result<SettlementRecord, SettleError> {
        self.settlements
            .get(settlement_id)
            .filter(|s| s.payer == payer)
            .cloned()
            .ok_or_else(|| SettleError::rejected(404, format!("Settlement {} not found", settlement_id)))
    }
}

/// Ledger of record kept in process memory. Backs the development server and tests.
#[derive(Clone, Default)]
pub struct InMemoryLedger {
    book: Arc<RwLock<LedgerBook>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        InMemoryLedger::default()
    }

    pub async fn add_user(&self, user: LedgerUser) {
        let mut book = self.book.write().await;
        book.users.insert(user.id.clone(), user);
    }

    pub async fn has_user(&self, user_id: &str) -> bool {
        self.book.read().await.users.contains_key(user_id)
    }

    /// Books an expense share: `debtor` owes `creditor` `amount`, netted against the reverse direction.
    pub async fn record_debt(
        &self,
        debtor: &str,
        creditor: &str,
        amount: f64,
        group_id: Option<&str>,
    ) -> Result<(), SettleError> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(SettleError::rejected(400, "Amount must be greater than 0"));
        }
        let mut book = self.book.write().await;
        for id in [debtor, creditor] {
            if !book.users.contains_key(id) {
                return Err(SettleError::rejected(404, format!("User {} not found", id)));
            }
        }
        book.add_debt(debtor, creditor, amount, group_id);
        debug!(debtor, creditor, amount, group_id = ?group_id, "debt recorded");
        Ok(())
    }

    pub async fn balances_for(&self, user_id: &str, scope: Option<&str>) -> Result<BalanceSnapshot, SettleError> {
        let book = self.book.read().await;
        Ok(book.snapshot(user_id, scope))
    }

    pub async fn summary_for(&self, user_id: &str, scope: Option<&str>) -> Result<BalanceSummary, SettleError> {
        Ok(self.balances_for(user_id, scope).await?.summary())
    }

    pub async fn create_settlement(
        &self,
        payer: &str,
        request: SettlementRequest,
    ) -> Result<SettlementRecord, SettleError> {
        let mut book = self.book.write().await;
        let scope = request.scope.as_deref();
        book.validate_payment(payer, &request.payee_id, request.amount, scope)?;
        let note = request.note.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
        if note.as_ref().is_some_and(|n| n.chars().count() > MAX_NOTE_LENGTH) {
            return Err(SettleError::rejected(
                400,
                format!("Note cannot exceed {} characters", MAX_NOTE_LENGTH),
            ));
        }

        let settlement = SettlementRecord {
            id: Uuid::new_v4().to_string(),
            payer: payer.to_string(),
            payee: request.payee_id.clone(),
            amount: round_cents(request.amount),
            channel: PaymentChannel::Cash,
            status: SettlementStatus::Completed,
            group_id: request.scope.clone(),
            note,
            transaction_ref: None,
            created_at: Utc::now(),
        };
        book.add_debt(&request.payee_id, payer, settlement.amount, scope);
        book.settlements.insert(settlement.id.clone(), settlement.clone());
        book.record_activity(ActivityKind::SettlementRecorded, &settlement);
        info!(settlement_id = %settlement.id, payer, payee = %settlement.payee, amount = settlement.amount, "cash settlement recorded");
        Ok(settlement)
    }

    pub async fn create_upi_settlement(
        &self,
        payer: &str,
        request: UpiSettlementRequest,
    ) -> Result<UpiSettlementIntent, SettleError> {
        let mut book = self.book.write().await;
        book.validate_payment(payer, &request.payee_id, request.amount, request.scope.as_deref())?;
        let recipient = book
            .users
            .get(&request.payee_id)
            .cloned()
            .ok_or_else(|| SettleError::rejected(404, format!("User {} not found", request.payee_id)))?;
        let recipient_upi_id = recipient
            .upi_id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| SettleError::rejected(400, "Recipient has not registered a UPI ID"))?;

        let settlement = SettlementRecord {
            id: Uuid::new_v4().to_string(),
            payer: payer.to_string(),
            payee: recipient.id.clone(),
            amount: round_cents(request.amount),
            channel: PaymentChannel::Upi,
            status: SettlementStatus::Pending,
            group_id: request.scope.clone(),
            note: None,
            transaction_ref: None,
            created_at: Utc::now(),
        };
        book.settlements.insert(settlement.id.clone(), settlement.clone());
        book.record_activity(ActivityKind::UpiPaymentStarted, &settlement);
        info!(settlement_id = %settlement.id, payer, payee = %settlement.payee, "UPI settlement pending");
        Ok(UpiSettlementIntent {
            settlement,
            recipient_upi_id,
            recipient_name: recipient.name,
        })
    }

    pub async fn confirm_upi_payment(
        &self,
        payer: &str,
        settlement_id: &str,
        transaction_ref: Option<&str>,
    ) -> Result<SettlementRecord, SettleError> {
        let mut book = self.book.write().await;
        let mut settlement = book.owned_settlement(payer, settlement_id)?;
        if settlement.status.is_terminal() {
            return Err(SettleError::rejected(
                409,
                format!("Settlement {} is already {}", settlement_id, settlement.status),
            ));
        }
        // The debt may have been settled another way while the payment app was open.
        let outstanding = book.outstanding(payer, &settlement.payee, settlement.group_id.as_deref());
        if outstanding + EPSILON < settlement.amount {
            return Err(SettleError::rejected(409, "Balance already settled"));
        }

        settlement.status = SettlementStatus::Completed;
        settlement.transaction_ref = transaction_ref.map(str::trim).filter(|r| !r.is_empty()).map(String::from);
        book.add_debt(&settlement.payee, payer, settlement.amount, settlement.group_id.as_deref());
        book.settlements.insert(settlement.id.clone(), settlement.clone());
        book.record_activity(ActivityKind::UpiPaymentConfirmed, &settlement);
        info!(settlement_id, payer, "UPI settlement confirmed");
        Ok(settlement)
    }

    pub async fn cancel_upi_payment(&self, payer: &str, settlement_id: &str) -> Result<SettlementRecord, SettleError> {
        let mut book = self.book.write().await;
        let mut settlement = book.owned_settlement(payer, settlement_id)?;
        if settlement.status.is_terminal() {
            return Err(SettleError::rejected(
                409,
                format!("Settlement {} is already {}", settlement_id, settlement.status),
            ));
        }
        settlement.status = SettlementStatus::Failed;
        book.settlements.insert(settlement.id.clone(), settlement.clone());
        book.record_activity(ActivityKind::UpiPaymentCancelled, &settlement);
        info!(settlement_id, payer, "UPI settlement cancelled");
        Ok(settlement)
    }

    pub async fn settlements_for(&self, user_id: &str, query: SettlementQuery) -> Result<SettlementPage, SettleError> {
        let book = self.book.read().await;
        let mut matching: Vec<SettlementRecord> = book
            .settlements
            .values()
            .filter(|s| s.payer == user_id || s.payee == user_id)
            .filter(|s| query.group_id.is_none() || s.group_id == query.group_id)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        let count = matching.len();
        let settlements = matching
            .into_iter()
            .skip(query.skip.unwrap_or(0))
            .take(query.limit.unwrap_or(DEFAULT_PAGE_LIMIT))
            .collect();
        Ok(SettlementPage { settlements, count })
    }

    pub async fn activity_for(&self, user_id: &str, limit: usize) -> Result<Vec<ActivityEntry>, SettleError> {
        let book = self.book.read().await;
        Ok(book
            .activity
            .iter()
            .rev()
            .filter(|a| a.actor_id == user_id || a.counterparty_id == user_id)
            .take(limit)
            .cloned()
            .collect())
    }

    /// View of the ledger as seen by one authenticated user.
    pub fn session(&self, user_id: &str) -> LedgerSession {
        LedgerSession {
            ledger: self.clone(),
            user_id: user_id.to_string(),
        }
    }
}

#[derive(Clone)]
pub struct LedgerSession {
    ledger: InMemoryLedger,
    user_id: String,
}

#[async_trait]
impl LedgerService for LedgerSession {
    async fn fetch_balances(&self, scope: Option<&str>) -> Result<BalanceSnapshot, SettleError> {
        self.ledger.balances_for(&self.user_id, scope).await
    }

    async fn create_settlement(&self, request: SettlementRequest) -> Result<SettlementRecord, SettleError> {
        self.ledger.create_settlement(&self.user_id, request).await
    }

    async fn create_upi_settlement(&self, request: UpiSettlementRequest) -> Result<UpiSettlementIntent, SettleError> {
        self.ledger.create_upi_settlement(&self.user_id, request).await
    }

    async fn confirm_upi_payment(
        &self,
        settlement_id: &str,
        transaction_ref: Option<&str>,
    ) -> Result<SettlementRecord, SettleError> {
        self.ledger
            .confirm_upi_payment(&self.user_id, settlement_id, transaction_ref)
            .await
    }

    async fn cancel_upi_payment(&self, settlement_id: &str) -> Result<SettlementRecord, SettleError> {
        self.ledger.cancel_upi_payment(&self.user_id, settlement_id).await
    }

    async fn balance_summary(&self, scope: Option<&str>) -> Result<BalanceSummary, SettleError> {
        self.ledger.summary_for(&self.user_id, scope).await
    }

    async fn list_settlements(&self, query: SettlementQuery) -> Result<SettlementPage, SettleError> {
        self.ledger.settlements_for(&self.user_id, query).await
    }

    async fn recent_activity(&self, limit: usize) -> Result<Vec<ActivityEntry>, SettleError> {
        self.ledger.activity_for(&self.user_id, limit).await
    }
}
