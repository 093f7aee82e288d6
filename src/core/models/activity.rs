use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    SettlementRecorded,
    UpiPaymentStarted,
    UpiPaymentConfirmed,
    UpiPaymentCancelled,
}

impl std::fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ActivityKind::SettlementRecorded => "SETTLEMENT_RECORDED",
            ActivityKind::UpiPaymentStarted => "UPI_PAYMENT_STARTED",
            ActivityKind::UpiPaymentConfirmed => "UPI_PAYMENT_CONFIRMED",
            ActivityKind::UpiPaymentCancelled => "UPI_PAYMENT_CANCELLED",
        };
        write!(f, "{}", s)
    }
}

/// One line of the recent-activity feed.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    pub id: String,
    pub kind: ActivityKind,
    pub actor_id: String,
    pub counterparty_id: String,
    pub description: String,
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    #[schema(value_type = String, example = "2024-06-01T12:34:56Z")]
    pub created_at: chrono::DateTime<chrono::Utc>,
}
