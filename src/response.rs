//! Normalization of gateway answers into [`GatewayResponse`].
//!
//! Applied uniformly to remote-procedure answers and to local redirect
//! verification outcomes: any present, non-zero error code forces `KO`.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::{consts, types::PaymentResult};

/// Normalized outcome of any gateway operation.
#[derive(Clone, Debug, Serialize)]
pub struct GatewayResponse {
    #[serde(rename = "RESULT")]
    pub result: PaymentResult,
    #[serde(rename = "DS_ERROR_ID")]
    pub error_id: i64,
    /// Composed, pre-flighted redirect URL. Present only on redirect-flow
    /// responses.
    #[serde(rename = "URL_REDIRECT", skip_serializing_if = "Option::is_none")]
    pub url_redirect: Option<String>,
    /// Remaining `DS_*` answer fields, passed through untouched.
    #[serde(flatten)]
    pub fields: BTreeMap<String, String>,
}

impl GatewayResponse {
    /// Normalizes a structured gateway answer.
    ///
    /// A missing, empty or zero `DS_ERROR_ID` is success. A present
    /// non-numeric code is a malformed answer and maps to the
    /// connectivity sentinel rather than being guessed at.
    pub fn from_answer(mut fields: BTreeMap<String, String>) -> Self {
        let raw_error = fields.remove(consts::DS_ERROR_ID).unwrap_or_default();
        let error_id = if raw_error.is_empty() {
            Some(0)
        } else {
            raw_error.parse::<i64>().ok()
        };

        match error_id {
            Some(0) => Self {
                result: PaymentResult::Ok,
                error_id: 0,
                url_redirect: None,
                fields,
            },
            Some(code) => Self {
                result: PaymentResult::Ko,
                error_id: code,
                url_redirect: None,
                fields,
            },
            None => Self::connection_failure(),
        }
    }

    /// The fixed answer for an unreachable or faulted remote-procedure
    /// transport.
    pub fn connection_failure() -> Self {
        Self {
            result: PaymentResult::Ko,
            error_id: consts::ERROR_COULD_NOT_CONNECT,
            url_redirect: None,
            fields: BTreeMap::new(),
        }
    }

    /// Builds the response for a composed redirect URL and its pre-flight
    /// verification outcome. The URL is handed back regardless of the
    /// outcome.
    pub fn from_verification(error_id: i64, url_redirect: String) -> Self {
        Self {
            result: if error_id == 0 {
                PaymentResult::Ok
            } else {
                PaymentResult::Ko
            },
            error_id,
            url_redirect: Some(url_redirect),
            fields: BTreeMap::new(),
        }
    }

    /// A `KO` response carrying a specific gateway error code, used when a
    /// precondition lookup fails before composition.
    pub fn from_error_id(error_id: i64) -> Self {
        Self {
            result: PaymentResult::Ko,
            error_id,
            url_redirect: None,
            fields: BTreeMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answer(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn zero_error_id_is_ok() {
        let response = GatewayResponse::from_answer(answer(&[
            ("DS_ERROR_ID", "0"),
            ("DS_IDUSER", "42"),
        ]));
        assert_eq!(response.result, PaymentResult::Ok);
        assert_eq!(response.error_id, 0);
        assert_eq!(response.fields["DS_IDUSER"], "42");
    }

    #[test]
    fn absent_error_id_is_ok() {
        let response = GatewayResponse::from_answer(answer(&[("DS_RESPONSE", "1")]));
        assert_eq!(response.result, PaymentResult::Ok);
    }

    #[test]
    fn nonzero_error_id_is_ko_and_passed_through() {
        let response = GatewayResponse::from_answer(answer(&[("DS_ERROR_ID", "127")]));
        assert_eq!(response.result, PaymentResult::Ko);
        assert_eq!(response.error_id, 127);
    }

    #[test]
    fn malformed_error_id_maps_to_the_connectivity_sentinel() {
        let response = GatewayResponse::from_answer(answer(&[("DS_ERROR_ID", "not-a-code")]));
        assert_eq!(response.result, PaymentResult::Ko);
        assert_eq!(response.error_id, consts::ERROR_COULD_NOT_CONNECT);
    }

    #[test]
    fn connection_failure_uses_the_fixed_sentinel() {
        let response = GatewayResponse::connection_failure();
        assert_eq!(response.result, PaymentResult::Ko);
        assert_eq!(response.error_id, 1011);
    }

    #[test]
    fn verification_outcome_keeps_the_url_either_way() {
        let ok = GatewayResponse::from_verification(0, "https://gw/?q".to_string());
        assert_eq!(ok.result, PaymentResult::Ok);
        assert_eq!(ok.url_redirect.as_deref(), Some("https://gw/?q"));

        let ko = GatewayResponse::from_verification(1100, "https://gw/?q".to_string());
        assert_eq!(ko.result, PaymentResult::Ko);
        assert_eq!(ko.error_id, 1100);
        assert_eq!(ko.url_redirect.as_deref(), Some("https://gw/?q"));
    }

    #[test]
    fn serializes_with_gateway_field_names() {
        let response = GatewayResponse::from_verification(0, "https://gw/?q".to_string());
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["RESULT"], "OK");
        assert_eq!(json["DS_ERROR_ID"], 0);
        assert_eq!(json["URL_REDIRECT"], "https://gw/?q");
    }
}
