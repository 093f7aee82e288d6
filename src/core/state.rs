use crate::core::models::{BalanceSnapshot, SettlementDraft, SettlementRecord};
use crate::core::upi::UpiDeepLink;
use serde::Serialize;

/// A UPI settlement the ledger holds as `pending` while the user is in the payment app.
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PendingUpiPayment {
    pub settlement: SettlementRecord,
    pub recipient_upi_id: String,
    pub recipient_name: String,
    pub link: UpiDeepLink,
}

impl PendingUpiPayment {
    pub fn settlement_id(&self) -> &str {
        &self.settlement.id
    }
}

/// Snapshot of the settle-up workflow. Every transition returns a fresh copy.
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum WorkflowState {
    Idle,
    BalancesLoading {
        request_id: u64,
    },
    BalancesReady {
        balances: BalanceSnapshot,
    },
    DraftEditing {
        balances: BalanceSnapshot,
        draft: SettlementDraft,
        error: Option<String>,
    },
    Submitting {
        balances: BalanceSnapshot,
        draft: SettlementDraft,
    },
    CashDone {
        settlement: SettlementRecord,
        /// Balances re-read after the write; `None` when that read failed.
        balances: Option<BalanceSnapshot>,
    },
    UpiAwaitingAppReturn {
        payment: PendingUpiPayment,
    },
    UpiConfirming {
        payment: PendingUpiPayment,
        transaction_ref: Option<String>,
        in_flight: bool,
        error: Option<String>,
    },
    UpiDone {
        settlement: SettlementRecord,
        balances: Option<BalanceSnapshot>,
    },
    Failed {
        error: String,
    },
}

impl WorkflowState {
    pub fn name(&self) -> &'static str {
        match self {
            WorkflowState::Idle => "idle",
            WorkflowState::BalancesLoading { .. } => "loading balances",
            WorkflowState::BalancesReady { .. } => "balances ready",
            WorkflowState::DraftEditing { .. } => "editing draft",
            WorkflowState::Submitting { .. } => "submitting",
            WorkflowState::CashDone { .. } => "cash settlement done",
            WorkflowState::UpiAwaitingAppReturn { .. } => "awaiting payment app",
            WorkflowState::UpiConfirming { .. } => "confirming UPI payment",
            WorkflowState::UpiDone { .. } => "UPI settlement done",
            WorkflowState::Failed { .. } => "failed",
        }
    }

    /// Idle and the two terminal states count as a closed workflow.
    pub fn is_open(&self) -> bool {
        !matches!(
            self,
            WorkflowState::Idle | WorkflowState::CashDone { .. } | WorkflowState::UpiDone { .. }
        )
    }

    /// A ledger call is outstanding for this state.
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            WorkflowState::Submitting { .. } | WorkflowState::UpiConfirming { in_flight: true, .. }
        )
    }

    pub fn balances(&self) -> Option<&BalanceSnapshot> {
        match self {
            WorkflowState::BalancesReady { balances }
            | WorkflowState::DraftEditing { balances, .. }
            | WorkflowState::Submitting { balances, .. } => Some(balances),
            WorkflowState::CashDone { balances, .. } | WorkflowState::UpiDone { balances, .. } => balances.as_ref(),
            _ => None,
        }
    }

    pub fn draft(&self) -> Option<&SettlementDraft> {
        match self {
            WorkflowState::DraftEditing { draft, .. } | WorkflowState::Submitting { draft, .. } => Some(draft),
            _ => None,
        }
    }

    pub fn pending_payment(&self) -> Option<&PendingUpiPayment> {
        match self {
            WorkflowState::UpiAwaitingAppReturn { payment } | WorkflowState::UpiConfirming { payment, .. } => {
                Some(payment)
            }
            _ => None,
        }
    }

    /// Inline error text for the active state, if any.
    pub fn error(&self) -> Option<&str> {
        match self {
            WorkflowState::DraftEditing { error, .. } | WorkflowState::UpiConfirming { error, .. } => {
                error.as_deref()
            }
            WorkflowState::Failed { error } => Some(error.as_str()),
            _ => None,
        }
    }
}
