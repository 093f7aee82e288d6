use super::settlement::PaymentChannel;
use serde::{Deserialize, Serialize};

/// Transient user input for one settlement. Lives only inside the workflow.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SettlementDraft {
    pub counterparty_id: String,
    /// Raw amount text as typed; parsed on submit.
    pub amount_input: String,
    pub payment_channel: PaymentChannel,
    pub note: Option<String>,
}

impl SettlementDraft {
    pub fn new(counterparty_id: impl Into<String>) -> Self {
        SettlementDraft {
            counterparty_id: counterparty_id.into(),
            amount_input: String::new(),
            payment_channel: PaymentChannel::Cash,
            note: None,
        }
    }
}
