use crate::constants::constants::UPI_SCHEME;
use serde::{Deserialize, Serialize};

/// Payment-app hand-off for one pending UPI settlement.
///
/// The URI carries the payee address (`pa`), URL-encoded display name (`pn`),
/// amount without currency symbol (`am`), currency code (`cu`) and a fixed
/// transaction note (`tn`). Nothing comes back from the payment app.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UpiDeepLink {
    pub payee_address: String,
    pub payee_name: String,
    pub amount: f64,
    pub currency: String,
    pub note: String,
}

impl UpiDeepLink {
    pub fn new(
        payee_address: impl Into<String>,
        payee_name: impl Into<String>,
        amount: f64,
        currency: impl Into<String>,
        note: impl Into<String>,
    ) -> Self {
        UpiDeepLink {
            payee_address: payee_address.into(),
            payee_name: payee_name.into(),
            amount,
            currency: currency.into(),
            note: note.into(),
        }
    }

    pub fn to_uri(&self) -> String {
        format!(
            "{}?pa={}&pn={}&am={}&cu={}&tn={}",
            UPI_SCHEME,
            self.payee_address,
            urlencoding::encode(&self.payee_name),
            format_amount(self.amount),
            self.currency,
            urlencoding::encode(&self.note),
        )
    }
}

impl std::fmt::Display for UpiDeepLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_uri())
    }
}

/// At most two decimals, no trailing zeros: 50 -> "50", 12.5 -> "12.5".
pub fn format_amount(amount: f64) -> String {
    let fixed = format!("{:.2}", amount);
    fixed.trim_end_matches('0').trim_end_matches('.').to_string()
}
