use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Totals shown on the dashboard cards.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BalanceSummary {
    pub you_owe: f64,
    pub youre_owed: f64,
    pub net_balance: f64,
    pub owed_count: usize,
    pub owed_by_count: usize,
}

impl BalanceSummary {
    pub fn new(you_owe: f64, youre_owed: f64, owed_count: usize, owed_by_count: usize) -> Self {
        let you_owe = round_cents(you_owe);
        let youre_owed = round_cents(youre_owed);
        BalanceSummary {
            you_owe,
            youre_owed,
            net_balance: round_cents(youre_owed - you_owe),
            owed_count,
            owed_by_count,
        }
    }
}

pub(crate) fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}
