use super::summary::BalanceSummary;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A directed pairwise debt. Direction is given by the list it sits in.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Balance {
    pub counterparty_id: String,
    pub counterparty_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counterparty_upi_id: Option<String>,
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
}

impl Balance {
    pub fn upi_id(&self) -> Option<&str> {
        self.counterparty_upi_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }

    pub fn is_positive(&self) -> bool {
        self.amount.is_finite() && self.amount > 0.0
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BalanceSnapshot {
    #[serde(default)]
    pub owed_to_me: Vec<Balance>,
    #[serde(default)]
    pub i_owe: Vec<Balance>,
}

impl BalanceSnapshot {
    pub fn new(owed_to_me: Vec<Balance>, i_owe: Vec<Balance>) -> Self {
        BalanceSnapshot { owed_to_me, i_owe }
    }

    /// Debt the current user owes to `counterparty_id`, if any.
    pub fn debt_to(&self, counterparty_id: &str) -> Option<&Balance> {
        self.i_owe.iter().find(|b| b.counterparty_id == counterparty_id)
    }

    pub fn credit_from(&self, counterparty_id: &str) -> Option<&Balance> {
        self.owed_to_me.iter().find(|b| b.counterparty_id == counterparty_id)
    }

    /// Nothing left to pay back.
    pub fn is_all_settled(&self) -> bool {
        self.i_owe.is_empty()
    }

    /// Drops entries that are not strictly positive, returning how many were removed.
    pub fn retain_positive(&mut self) -> usize {
        let before = self.owed_to_me.len() + self.i_owe.len();
        self.owed_to_me.retain(Balance::is_positive);
        self.i_owe.retain(Balance::is_positive);
        before - (self.owed_to_me.len() + self.i_owe.len())
    }

    pub fn summary(&self) -> BalanceSummary {
        let you_owe: f64 = self.i_owe.iter().map(|b| b.amount).sum();
        let youre_owed: f64 = self.owed_to_me.iter().map(|b| b.amount).sum();
        BalanceSummary::new(you_owe, youre_owed, self.i_owe.len(), self.owed_to_me.len())
    }
}
