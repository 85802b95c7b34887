//! Shared domain types.

use hyperswitch_masking::{PeekInterface, Secret};
use serde::{Deserialize, Serialize};

/// Overall outcome flag carried by every gateway response.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize, strum::Display)]
pub enum PaymentResult {
    #[serde(rename = "OK")]
    #[strum(serialize = "OK")]
    Ok,
    #[serde(rename = "KO")]
    #[strum(serialize = "KO")]
    Ko,
}

/// Raw card data for the direct (non-tokenized) entry points. The gateway
/// must have PCI direct entry enabled for the merchant before these are
/// usable.
#[derive(Clone, Debug)]
pub struct CardDetails {
    /// Card number, spaces and dashes tolerated.
    pub pan: Secret<String>,
    /// Expiry expressed as `mmyy`.
    pub expiry_date: Secret<String>,
    /// CVC2 code.
    pub cvv: Secret<String>,
}

impl CardDetails {
    /// Returns the card fields with all whitespace removed, the form the
    /// gateway signs over.
    pub(crate) fn normalized(&self) -> (String, String, String) {
        let strip = |s: &Secret<String>| {
            s.peek().chars().filter(|c| !c.is_whitespace()).collect::<String>()
        };
        (strip(&self.pan), strip(&self.expiry_date), strip(&self.cvv))
    }
}

/// A previously tokenized card, addressed by the gateway-assigned user id
/// and its companion token.
#[derive(Clone, Debug)]
pub struct TokenizedUser {
    pub id_user: String,
    pub token_user: Secret<String>,
}

impl TokenizedUser {
    pub fn new(id_user: impl Into<String>, token_user: Secret<String>) -> Self {
        Self {
            id_user: id_user.into(),
            token_user,
        }
    }
}

/// Subscription scheduling data. Dates travel as `YYYY-MM-DD`,
/// periodicity in days.
#[derive(Clone, Debug, Serialize)]
pub struct SubscriptionSchedule {
    pub start_date: String,
    pub end_date: String,
    pub periodicity: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn card_normalization_strips_whitespace() {
        let card = CardDetails {
            pan: Secret::new("4111 1111 1111 1111".to_string()),
            expiry_date: Secret::new("12 29".to_string()),
            cvv: Secret::new(" 123 ".to_string()),
        };
        let (pan, expiry, cvv) = card.normalized();
        assert_eq!(pan, "4111111111111111");
        assert_eq!(expiry, "1229");
        assert_eq!(cvv, "123");
    }

    #[test]
    fn payment_result_serializes_to_gateway_literals() {
        assert_eq!(serde_json::to_string(&PaymentResult::Ok).unwrap(), "\"OK\"");
        assert_eq!(PaymentResult::Ko.to_string(), "KO");
    }
}
