use crate::config::Config;
use crate::constants::constants::{
    BALANCES_FAILED, CONFIRMATION_FAILED, DEFAULT_CURRENCY, DEFAULT_UPI_NOTE, MAX_NOTE_LENGTH, MAX_SETTLEMENT_AMOUNT,
    PAYMENT_CONFIRMED, SETTLEMENT_FAILED, SETTLEMENT_RECORDED,
};
use crate::core::balance_provider::BalanceProvider;
use crate::core::currency::format_currency;
use crate::core::errors::SettleError;
use crate::core::models::{
    Balance, BalanceSnapshot, PaymentChannel, SettlementDraft, SettlementRequest, UpiSettlementRequest,
};
use crate::core::state::{PendingUpiPayment, WorkflowState};
use crate::core::upi::UpiDeepLink;
use crate::infrastructure::ledger::LedgerService;
use crate::infrastructure::notifications::NotificationSink;
use crate::infrastructure::payment_app::PaymentLauncher;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

#[derive(Clone, Debug, PartialEq)]
pub struct CoordinatorOptions {
    pub currency: String,
    pub transaction_note: String,
}

impl Default for CoordinatorOptions {
    fn default() -> Self {
        CoordinatorOptions {
            currency: DEFAULT_CURRENCY.to_string(),
            transaction_note: DEFAULT_UPI_NOTE.to_string(),
        }
    }
}

impl CoordinatorOptions {
    pub fn from_config(config: &Config) -> Self {
        CoordinatorOptions {
            currency: config.upi_currency.clone(),
            transaction_note: config.upi_transaction_note.clone(),
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct Ticket {
    generation: u64,
    request_id: u64,
}

struct Inner {
    state: WorkflowState,
    scope: Option<String>,
    // Bumped whenever the workflow instance is replaced or discarded.
    generation: u64,
    last_request_id: u64,
}

impl Inner {
    fn ticket(&self) -> Ticket {
        Ticket {
            generation: self.generation,
            request_id: self.last_request_id,
        }
    }

    fn is_current(&self, ticket: Ticket) -> bool {
        self.generation == ticket.generation
    }

    fn is_current_fetch(&self, ticket: Ticket) -> bool {
        self.is_current(ticket) && self.last_request_id == ticket.request_id
    }
}

/// Drives the settle-up workflow: balance selection, draft editing, cash or UPI
/// submission and the two-phase UPI confirmation.
///
/// State sits behind an async mutex that is never held across a ledger call, so
/// `close` or `cancel_upi` can run while a request is outstanding. Responses that
/// come back for a discarded workflow, or for a fetch that has been superseded,
/// are dropped without touching state or notifications.
pub struct SettlementCoordinator<L: LedgerService, N: NotificationSink, P: PaymentLauncher> {
    ledger: Arc<L>,
    balances: BalanceProvider<L>,
    notifier: N,
    launcher: P,
    options: CoordinatorOptions,
    inner: Mutex<Inner>,
}

impl<L: LedgerService, N: NotificationSink, P: PaymentLauncher> SettlementCoordinator<L, N, P> {
    pub fn new(ledger: L, notifier: N, launcher: P) -> Self {
        let ledger = Arc::new(ledger);
        SettlementCoordinator {
            balances: BalanceProvider::new(ledger.clone()),
            ledger,
            notifier,
            launcher,
            options: CoordinatorOptions::default(),
            inner: Mutex::new(Inner {
                state: WorkflowState::Idle,
                scope: None,
                generation: 0,
                last_request_id: 0,
            }),
        }
    }

    pub fn with_options(mut self, options: CoordinatorOptions) -> Self {
        self.options = options;
        self
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn options(&self) -> &CoordinatorOptions {
        &self.options
    }

    pub async fn state(&self) -> WorkflowState {
        self.inner.lock().await.state.clone()
    }

    pub async fn scope(&self) -> Option<String> {
        self.inner.lock().await.scope.clone()
    }

    /// Opens the workflow (or re-scopes it) and loads balances. The newest call wins.
    pub async fn open(&self, scope: Option<String>) -> Result<WorkflowState, SettleError> {
        let ticket = {
            let mut inner = self.inner.lock().await;
            if inner.state.is_busy() || inner.state.pending_payment().is_some() {
                return Err(SettleError::invalid_transition("load balances", inner.state.name()));
            }
            inner.generation += 1;
            inner.last_request_id += 1;
            inner.scope = scope.clone();
            inner.state = WorkflowState::BalancesLoading {
                request_id: inner.last_request_id,
            };
            info!(scope = ?scope, request_id = inner.last_request_id, "settle-up opened");
            inner.ticket()
        };

        let result = self.balances.fetch(scope.as_deref()).await;

        let mut inner = self.inner.lock().await;
        if !inner.is_current_fetch(ticket) {
            debug!(request_id = ticket.request_id, "discarding stale balance response");
            return Ok(inner.state.clone());
        }
        match result {
            Ok(balances) => {
                inner.state = WorkflowState::BalancesReady { balances };
                Ok(inner.state.clone())
            }
            Err(e) => {
                warn!(error = %e, "loading balances failed");
                inner.state = WorkflowState::Failed {
                    error: failure_message(&e, BALANCES_FAILED),
                };
                Err(e)
            }
        }
    }

    /// Reloads balances for the current scope; also the retry path out of `Failed`.
    pub async fn refresh(&self) -> Result<WorkflowState, SettleError> {
        let scope = self.scope().await;
        self.open(scope).await
    }

    /// Starts a fresh draft against a debt the user owes.
    pub async fn select_counterparty(&self, counterparty_id: &str) -> Result<WorkflowState, SettleError> {
        let mut inner = self.inner.lock().await;
        let balances = match &inner.state {
            WorkflowState::BalancesReady { balances } | WorkflowState::DraftEditing { balances, .. } => balances.clone(),
            other => return Err(SettleError::invalid_transition("select a counterparty", other.name())),
        };
        if balances.debt_to(counterparty_id).is_none() {
            if balances.is_all_settled() {
                return Err(SettleError::validation(
                    "counterparty",
                    "All settled up",
                    "You don't owe anyone money",
                ));
            }
            return Err(SettleError::validation(
                "counterparty",
                "Invalid counterparty",
                format!("You do not owe {} anything", counterparty_id),
            ));
        }
        inner.state = WorkflowState::DraftEditing {
            balances,
            draft: SettlementDraft::new(counterparty_id),
            error: None,
        };
        Ok(inner.state.clone())
    }

    /// Stores the typed amount. Out-of-range input is kept and flagged inline.
    pub async fn set_amount(&self, input: &str) -> Result<WorkflowState, SettleError> {
        let currency = self.options.currency.clone();
        self.edit_draft("edit the amount", move |balance, draft, error| {
            draft.amount_input = input.trim().to_string();
            *error = if draft.amount_input.is_empty() {
                None
            } else {
                validate_amount(&draft.amount_input, balance.amount, &currency)
                    .err()
                    .map(|e| e.user_message())
            };
            Ok(())
        })
        .await
    }

    /// Sets the amount to exactly the outstanding balance.
    pub async fn use_full_amount(&self) -> Result<WorkflowState, SettleError> {
        self.edit_draft("edit the amount", |balance, draft, error| {
            draft.amount_input = balance.amount.to_string();
            *error = None;
            Ok(())
        })
        .await
    }

    pub async fn set_channel(&self, channel: PaymentChannel) -> Result<WorkflowState, SettleError> {
        self.edit_draft("change the payment method", move |balance, draft, _| {
            if channel == PaymentChannel::Upi {
                if balance.upi_id().is_none() {
                    return Err(SettleError::validation(
                        "paymentChannel",
                        "UPI unavailable",
                        format!("{} has not registered a UPI ID", balance.counterparty_name),
                    ));
                }
                // UPI carries its own transaction reference.
                draft.note = None;
            }
            draft.payment_channel = channel;
            Ok(())
        })
        .await
    }

    pub async fn set_note(&self, note: &str) -> Result<WorkflowState, SettleError> {
        self.edit_draft("edit the note", move |_, draft, _| {
            if draft.payment_channel != PaymentChannel::Cash {
                return Err(SettleError::validation(
                    "note",
                    "Notes are cash-only",
                    "UPI payments carry their own transaction reference",
                ));
            }
            let note = note.trim();
            validate_note(note)?;
            draft.note = (!note.is_empty()).then(|| note.to_string());
            Ok(())
        })
        .await
    }

    async fn edit_draft<F>(&self, action: &str, edit: F) -> Result<WorkflowState, SettleError>
    where
        F: FnOnce(&Balance, &mut SettlementDraft, &mut Option<String>) -> Result<(), SettleError>,
    {
        let mut inner = self.inner.lock().await;
        let state_name = inner.state.name();
        match &mut inner.state {
            WorkflowState::DraftEditing { balances, draft, error } => {
                let balance = balances.debt_to(&draft.counterparty_id).cloned().ok_or_else(|| {
                    SettleError::validation("counterparty", "Missing selection", "Select who to pay back")
                })?;
                edit(&balance, draft, error)?;
            }
            _ => return Err(SettleError::invalid_transition(action, state_name)),
        }
        Ok(inner.state.clone())
    }

    /// Validates the draft and sends it down the cash or UPI path.
    pub async fn submit(&self) -> Result<WorkflowState, SettleError> {
        let (ticket, scope, draft, amount) = {
            let mut inner = self.inner.lock().await;
            let state_name = inner.state.name();
            let (balances, draft, amount) = match &mut inner.state {
                WorkflowState::DraftEditing { balances, draft, error } => {
                    match validate_submission(balances, draft, &self.options.currency) {
                        Ok(amount) => {
                            *error = None;
                            (balances.clone(), draft.clone(), amount)
                        }
                        Err(e) => {
                            *error = Some(e.user_message());
                            return Err(e);
                        }
                    }
                }
                _ => return Err(SettleError::invalid_transition("submit", state_name)),
            };
            inner.state = WorkflowState::Submitting {
                balances,
                draft: draft.clone(),
            };
            info!(
                payee = %draft.counterparty_id,
                amount,
                channel = %draft.payment_channel,
                "submitting settlement"
            );
            (inner.ticket(), inner.scope.clone(), draft, amount)
        };

        match draft.payment_channel {
            PaymentChannel::Cash => self.submit_cash(ticket, scope, draft, amount).await,
            PaymentChannel::Upi => self.submit_upi(ticket, scope, draft, amount).await,
        }
    }

    async fn submit_cash(
        &self,
        ticket: Ticket,
        scope: Option<String>,
        draft: SettlementDraft,
        amount: f64,
    ) -> Result<WorkflowState, SettleError> {
        let request = SettlementRequest {
            payee_id: draft.counterparty_id.clone(),
            amount,
            scope: scope.clone(),
            note: draft.note.clone(),
        };
        let result = self.ledger.create_settlement(request).await;
        {
            let mut inner = self.inner.lock().await;
            if !inner.is_current(ticket) {
                debug!(payee = %draft.counterparty_id, "discarding settlement response for closed workflow");
                return Ok(inner.state.clone());
            }
            match result {
                Ok(settlement) => {
                    info!(
                        settlement_id = %settlement.id,
                        amount = %format_currency(settlement.amount, &self.options.currency),
                        "cash settlement recorded"
                    );
                    inner.state = WorkflowState::CashDone {
                        settlement,
                        balances: None,
                    };
                    self.notifier.success(SETTLEMENT_RECORDED);
                }
                Err(e) => {
                    self.fail_submission(&mut inner, &e);
                    return Err(e);
                }
            }
        }
        self.finish(ticket, scope).await
    }

    async fn submit_upi(
        &self,
        ticket: Ticket,
        scope: Option<String>,
        draft: SettlementDraft,
        amount: f64,
    ) -> Result<WorkflowState, SettleError> {
        let request = UpiSettlementRequest {
            payee_id: draft.counterparty_id.clone(),
            amount,
            scope,
        };
        let result = self.ledger.create_upi_settlement(request).await;

        let mut inner = self.inner.lock().await;
        if !inner.is_current(ticket) {
            debug!(payee = %draft.counterparty_id, "discarding UPI settlement response for closed workflow");
            return Ok(inner.state.clone());
        }
        match result {
            Ok(intent) => {
                let link = UpiDeepLink::new(
                    &intent.recipient_upi_id,
                    &intent.recipient_name,
                    amount,
                    &self.options.currency,
                    &self.options.transaction_note,
                );
                let payment = PendingUpiPayment {
                    settlement: intent.settlement,
                    recipient_upi_id: intent.recipient_upi_id,
                    recipient_name: intent.recipient_name,
                    link,
                };
                info!(settlement_id = %payment.settlement_id(), "handing off to payment app");
                self.launcher.launch(&payment.link);
                inner.state = WorkflowState::UpiAwaitingAppReturn { payment };
                Ok(inner.state.clone())
            }
            Err(e) => {
                self.fail_submission(&mut inner, &e);
                Err(e)
            }
        }
    }

    /// Back to editing with the draft intact so the user can retry without re-typing.
    fn fail_submission(&self, inner: &mut Inner, err: &SettleError) {
        warn!(error = %err, "settlement submission failed");
        let message = failure_message(err, SETTLEMENT_FAILED);
        inner.state = match std::mem::replace(&mut inner.state, WorkflowState::Idle) {
            WorkflowState::Submitting { balances, draft } => WorkflowState::DraftEditing {
                balances,
                draft,
                error: Some(message.clone()),
            },
            other => other,
        };
        self.notifier.error(&message);
    }

    /// User says the payment app finished; ask the ledger to complete the settlement.
    pub async fn confirm_upi(&self, transaction_ref: Option<&str>) -> Result<WorkflowState, SettleError> {
        let transaction_ref = transaction_ref
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(String::from);
        let (ticket, payment) = {
            let mut inner = self.inner.lock().await;
            let payment = match &inner.state {
                WorkflowState::UpiAwaitingAppReturn { payment }
                | WorkflowState::UpiConfirming {
                    payment,
                    in_flight: false,
                    ..
                } => payment.clone(),
                other => return Err(SettleError::invalid_transition("confirm the payment", other.name())),
            };
            inner.state = WorkflowState::UpiConfirming {
                payment: payment.clone(),
                transaction_ref: transaction_ref.clone(),
                in_flight: true,
                error: None,
            };
            (inner.ticket(), payment)
        };

        let result = self
            .ledger
            .confirm_upi_payment(payment.settlement_id(), transaction_ref.as_deref())
            .await;

        let scope = {
            let mut inner = self.inner.lock().await;
            if !inner.is_current(ticket) {
                debug!(settlement_id = %payment.settlement_id(), "discarding confirmation for cancelled workflow");
                return Ok(inner.state.clone());
            }
            match result {
                Ok(settlement) => {
                    info!(settlement_id = %settlement.id, status = %settlement.status, "UPI payment confirmed");
                    inner.state = WorkflowState::UpiDone {
                        settlement,
                        balances: None,
                    };
                    self.notifier.success(PAYMENT_CONFIRMED);
                    inner.scope.clone()
                }
                Err(e) => {
                    warn!(settlement_id = %payment.settlement_id(), error = %e, "UPI confirmation failed");
                    let message = failure_message(&e, CONFIRMATION_FAILED);
                    inner.state = WorkflowState::UpiConfirming {
                        payment,
                        transaction_ref,
                        in_flight: false,
                        error: Some(message.clone()),
                    };
                    self.notifier.error(&message);
                    return Err(e);
                }
            }
        };
        self.finish(ticket, scope).await
    }

    /// Re-opens the payment app for the same pending settlement and clears any typed reference.
    pub async fn retry_upi(&self) -> Result<WorkflowState, SettleError> {
        let mut inner = self.inner.lock().await;
        let payment = match &inner.state {
            WorkflowState::UpiAwaitingAppReturn { payment }
            | WorkflowState::UpiConfirming {
                payment,
                in_flight: false,
                ..
            } => payment.clone(),
            other => return Err(SettleError::invalid_transition("retry the payment", other.name())),
        };
        self.launcher.launch(&payment.link);
        inner.state = WorkflowState::UpiAwaitingAppReturn { payment };
        Ok(inner.state.clone())
    }

    /// Abandons the pending UPI settlement. The ledger is told on a best-effort basis.
    pub async fn cancel_upi(&self) -> Result<WorkflowState, SettleError> {
        let payment = {
            let mut inner = self.inner.lock().await;
            let payment = match &inner.state {
                WorkflowState::UpiAwaitingAppReturn { payment } | WorkflowState::UpiConfirming { payment, .. } => {
                    payment.clone()
                }
                other => return Err(SettleError::invalid_transition("cancel the payment", other.name())),
            };
            inner.generation += 1;
            inner.state = WorkflowState::Idle;
            info!(settlement_id = %payment.settlement_id(), "UPI payment cancelled");
            payment
        };

        if let Err(e) = self.ledger.cancel_upi_payment(payment.settlement_id()).await {
            warn!(settlement_id = %payment.settlement_id(), error = %e, "ledger did not accept UPI cancel");
        }
        Ok(self.state().await)
    }

    /// Closes the workflow from any state. A request already sent is not aborted;
    /// its response is ignored when it arrives.
    pub async fn close(&self) -> WorkflowState {
        let mut inner = self.inner.lock().await;
        if inner.state.is_open() {
            info!(from = inner.state.name(), "settle-up closed");
        }
        inner.generation += 1;
        inner.state = WorkflowState::Idle;
        WorkflowState::Idle
    }

    /// Re-reads balances after a terminal success and asks the host to refresh its views.
    async fn finish(&self, ticket: Ticket, scope: Option<String>) -> Result<WorkflowState, SettleError> {
        let refreshed = match self.balances.fetch(scope.as_deref()).await {
            Ok(balances) => Some(balances),
            Err(e) => {
                warn!(error = %e, "balance refresh after settlement failed");
                None
            }
        };
        let mut inner = self.inner.lock().await;
        if !inner.is_current(ticket) {
            debug!("discarding post-settlement refresh for closed workflow");
            return Ok(inner.state.clone());
        }
        if let WorkflowState::CashDone { balances, .. } | WorkflowState::UpiDone { balances, .. } = &mut inner.state {
            *balances = refreshed;
        }
        self.notifier.request_refresh(scope.as_deref());
        Ok(inner.state.clone())
    }
}

/// Ledger rejections and local checks read verbatim; transport faults get a stable fallback.
fn failure_message(err: &SettleError, fallback: &str) -> String {
    match err {
        SettleError::Network(_) | SettleError::Internal(_) => fallback.to_string(),
        other => other.user_message(),
    }
}

fn validate_submission(
    balances: &BalanceSnapshot,
    draft: &SettlementDraft,
    currency: &str,
) -> Result<f64, SettleError> {
    let balance = balances
        .debt_to(&draft.counterparty_id)
        .ok_or_else(|| SettleError::validation("counterparty", "Missing selection", "Select who to pay back"))?;
    let amount = validate_amount(&draft.amount_input, balance.amount, currency)?;
    match draft.payment_channel {
        PaymentChannel::Upi if balance.upi_id().is_none() => Err(SettleError::validation(
            "paymentChannel",
            "UPI unavailable",
            format!("{} has not registered a UPI ID", balance.counterparty_name),
        )),
        PaymentChannel::Cash => {
            validate_note(draft.note.as_deref().unwrap_or_default())?;
            Ok(amount)
        }
        PaymentChannel::Upi => Ok(amount),
    }
}

/// `0 < amount <= max`, finite, at most two decimals unless it is exactly `max`.
pub fn validate_amount(input: &str, max: f64, currency: &str) -> Result<f64, SettleError> {
    let invalid = || SettleError::validation("amount", "Invalid Amount", "Enter a valid amount.");
    let amount: f64 = input.trim().parse().map_err(|_| invalid())?;
    if !amount.is_finite() {
        return Err(invalid());
    }
    if amount <= 0.0 {
        return Err(SettleError::validation(
            "amount",
            "Invalid Amount",
            "Amount must be greater than 0",
        ));
    }
    if amount > max || amount > MAX_SETTLEMENT_AMOUNT {
        return Err(SettleError::validation(
            "amount",
            "Amount Too Large",
            format!("Amount cannot exceed {}", format_currency(max.min(MAX_SETTLEMENT_AMOUNT), currency)),
        ));
    }
    // The outstanding balance itself is always payable, whatever its precision.
    let cents = amount * 100.0;
    if amount != max && (cents - cents.round()).abs() > 1e-6 {
        return Err(SettleError::validation(
            "amount",
            "Invalid Amount",
            "Amount cannot have more than 2 decimal places",
        ));
    }
    Ok(amount)
}

fn validate_note(note: &str) -> Result<(), SettleError> {
    if note.chars().count() > MAX_NOTE_LENGTH {
        return Err(SettleError::validation(
            "note",
            "Note Too Long",
            format!("Note cannot exceed {} characters", MAX_NOTE_LENGTH),
        ));
    }
    if note.chars().any(|c| c.is_control() && c != '\n') {
        return Err(SettleError::validation("note", "Invalid note", "Note contains invalid characters"));
    }
    Ok(())
}
