mod coordinator_tests;

use crate::core::coordinator::SettlementCoordinator;
use crate::core::errors::SettleError;
use crate::core::models::{
    ActivityEntry, Balance, BalanceSnapshot, BalanceSummary, PaymentChannel, SettlementPage, SettlementQuery,
    SettlementRecord, SettlementRequest, SettlementStatus, UpiSettlementIntent, UpiSettlementRequest,
};
use crate::infrastructure::ledger::LedgerService;
use crate::infrastructure::ledger::in_memory::{InMemoryLedger, LedgerUser};
use crate::infrastructure::notifications::in_memory::InMemoryNotifications;
use crate::infrastructure::payment_app::RecordingLauncher;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

pub type TestCoordinator<L> = SettlementCoordinator<L, InMemoryNotifications, RecordingLauncher>;

pub fn balance(id: &str, name: &str, upi_id: Option<&str>, amount: f64) -> Balance {
    Balance {
        counterparty_id: id.to_string(),
        counterparty_name: name.to_string(),
        counterparty_upi_id: upi_id.map(String::from),
        amount,
        group_id: None,
    }
}

/// I owe Bob 50 (has UPI) and Carol 20.5 (no UPI); Dave owes me 30.
pub fn default_snapshot() -> BalanceSnapshot {
    BalanceSnapshot::new(
        vec![balance("dave", "Dave", None, 30.0)],
        vec![
            balance("bob", "Bob Kumar", Some("bob@upi"), 50.0),
            balance("carol", "Carol", None, 20.5),
        ],
    )
}

pub fn record(id: &str, payee: &str, amount: f64, channel: PaymentChannel, status: SettlementStatus) -> SettlementRecord {
    SettlementRecord {
        id: id.to_string(),
        payer: "me".to_string(),
        payee: payee.to_string(),
        amount,
        channel,
        status,
        group_id: None,
        note: None,
        transaction_ref: None,
        created_at: chrono::Utc::now(),
    }
}

pub fn build_coordinator<L: LedgerService>(
    ledger: L,
) -> (Arc<TestCoordinator<L>>, InMemoryNotifications, RecordingLauncher) {
    let notifications = InMemoryNotifications::new();
    let launcher = RecordingLauncher::new();
    let coordinator = SettlementCoordinator::new(ledger, notifications.clone(), launcher.clone());
    (Arc::new(coordinator), notifications, launcher)
}

/// Me owes Bob 50 and Carol 20 in "trip"; Dave owes me 30 in "flat".
pub async fn seeded_ledger() -> InMemoryLedger {
    let ledger = InMemoryLedger::new();
    ledger.add_user(LedgerUser::new("me", "Me", Some("me@upi"))).await;
    ledger.add_user(LedgerUser::new("bob", "Bob Kumar", Some("bob@upi"))).await;
    ledger.add_user(LedgerUser::new("carol", "Carol", None)).await;
    ledger.add_user(LedgerUser::new("dave", "Dave", None)).await;
    ledger.record_debt("me", "bob", 50.0, Some("trip")).await.unwrap();
    ledger.record_debt("me", "carol", 20.0, Some("trip")).await.unwrap();
    ledger.record_debt("dave", "me", 30.0, Some("flat")).await.unwrap();
    ledger
}

/// Holds one ledger call until the test releases it.
#[derive(Default)]
pub struct Gate {
    entered: Notify,
    release: Notify,
}

impl Gate {
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    pub fn release(&self) {
        self.release.notify_one();
    }
}

#[derive(Default)]
struct Script {
    balances: HashMap<String, BalanceSnapshot>,
    failures: HashMap<&'static str, SettleError>,
    calls: Vec<String>,
    next_id: usize,
}

/// Ledger double with canned balances per scope, injectable failures and gates.
///
/// Failure and gate keys: `fetch`, `settle`, `upi`, `confirm`, `cancel`. Gates can
/// also be keyed per scope as `fetch:<scope>`.
#[derive(Clone, Default)]
pub struct ScriptedLedger {
    script: Arc<Mutex<Script>>,
    gates: Arc<Mutex<HashMap<String, Arc<Gate>>>>,
}

impl ScriptedLedger {
    pub fn new() -> Self {
        let ledger = ScriptedLedger::default();
        ledger.set_balances(None, default_snapshot());
        ledger
    }

    pub fn set_balances(&self, scope: Option<&str>, snapshot: BalanceSnapshot) {
        self.script
            .lock()
            .unwrap()
            .balances
            .insert(scope.unwrap_or_default().to_string(), snapshot);
    }

    pub fn fail(&self, operation: &'static str, error: SettleError) {
        self.script.lock().unwrap().failures.insert(operation, error);
    }

    pub fn succeed(&self, operation: &'static str) {
        self.script.lock().unwrap().failures.remove(operation);
    }

    pub fn calls(&self) -> Vec<String> {
        self.script.lock().unwrap().calls.clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    /// The next call matching `key` parks until released.
    pub fn gate(&self, key: &str) -> Arc<Gate> {
        let gate = Arc::new(Gate::default());
        self.gates.lock().unwrap().insert(key.to_string(), gate.clone());
        gate
    }

    async fn pass(&self, keys: &[String]) {
        let gate = {
            let mut gates = self.gates.lock().unwrap();
            keys.iter().find_map(|k| gates.remove(k))
        };
        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
    }

    fn enter(&self, operation: &'static str, call: String) -> Result<(), SettleError> {
        let mut script = self.script.lock().unwrap();
        script.calls.push(call);
        match script.failures.get(operation) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn next_id(&self, prefix: &str) -> String {
        let mut script = self.script.lock().unwrap();
        script.next_id += 1;
        format!("{}-{}", prefix, script.next_id)
    }

    fn find_balance(&self, counterparty_id: &str) -> Option<Balance> {
        let script = self.script.lock().unwrap();
        script
            .balances
            .values()
            .find_map(|s| s.debt_to(counterparty_id).cloned())
    }
}

#[async_trait]
impl LedgerService for ScriptedLedger {
    async fn fetch_balances(&self, scope: Option<&str>) -> Result<BalanceSnapshot, SettleError> {
        let scope_key = scope.unwrap_or_default().to_string();
        self.pass(&[format!("fetch:{}", scope_key), "fetch".to_string()]).await;
        self.enter("fetch", format!("fetch:{}", scope_key))?;
        Ok(self
            .script
            .lock()
            .unwrap()
            .balances
            .get(&scope_key)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_settlement(&self, request: SettlementRequest) -> Result<SettlementRecord, SettleError> {
        self.pass(&["settle".to_string()]).await;
        self.enter("settle", format!("settle:{}:{}", request.payee_id, request.amount))?;
        let mut settlement = record(
            &self.next_id("cash"),
            &request.payee_id,
            request.amount,
            PaymentChannel::Cash,
            SettlementStatus::Completed,
        );
        settlement.note = request.note;
        settlement.group_id = request.scope;
        Ok(settlement)
    }

    async fn create_upi_settlement(&self, request: UpiSettlementRequest) -> Result<UpiSettlementIntent, SettleError> {
        self.pass(&["upi".to_string()]).await;
        self.enter("upi", format!("upi:{}:{}", request.payee_id, request.amount))?;
        let recipient = self
            .find_balance(&request.payee_id)
            .ok_or_else(|| SettleError::rejected(404, format!("User {} not found", request.payee_id)))?;
        let recipient_upi_id = recipient
            .upi_id()
            .map(String::from)
            .ok_or_else(|| SettleError::rejected(400, "Recipient has not registered a UPI ID"))?;
        Ok(UpiSettlementIntent {
            settlement: record(
                &self.next_id("upi"),
                &request.payee_id,
                request.amount,
                PaymentChannel::Upi,
                SettlementStatus::Pending,
            ),
            recipient_upi_id,
            recipient_name: recipient.counterparty_name,
        })
    }

    async fn confirm_upi_payment(
        &self,
        settlement_id: &str,
        transaction_ref: Option<&str>,
    ) -> Result<SettlementRecord, SettleError> {
        self.pass(&["confirm".to_string()]).await;
        self.enter(
            "confirm",
            format!("confirm:{}:{}", settlement_id, transaction_ref.unwrap_or("-")),
        )?;
        let mut settlement = record(settlement_id, "bob", 50.0, PaymentChannel::Upi, SettlementStatus::Completed);
        settlement.transaction_ref = transaction_ref.map(String::from);
        Ok(settlement)
    }

    async fn cancel_upi_payment(&self, settlement_id: &str) -> Result<SettlementRecord, SettleError> {
        self.pass(&["cancel".to_string()]).await;
        self.enter("cancel", format!("cancel:{}", settlement_id))?;
        Ok(record(settlement_id, "bob", 50.0, PaymentChannel::Upi, SettlementStatus::Failed))
    }

    async fn balance_summary(&self, scope: Option<&str>) -> Result<BalanceSummary, SettleError> {
        Ok(self.fetch_balances(scope).await?.summary())
    }

    async fn list_settlements(&self, _query: SettlementQuery) -> Result<SettlementPage, SettleError> {
        Ok(SettlementPage::default())
    }

    async fn recent_activity(&self, _limit: usize) -> Result<Vec<ActivityEntry>, SettleError> {
        Ok(Vec::new())
    }
}
