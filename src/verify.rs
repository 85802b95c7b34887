//! Pre-flight verification of composed redirect URLs.
//!
//! The gateway answers a malformed redirect request with an `Error: <N>`
//! body (sometimes HTML-comment-wrapped). Verification fires the composed
//! URL once with short timeouts and reports the code it finds; the URL
//! itself stays valid either way and is returned to the caller annotated
//! with the outcome.

use std::time::Duration;

use error_stack::ResultExt;

use crate::{
    consts,
    errors::{CustomResult, TransportError},
};

/// Extracts the gateway error code from a verification response body.
///
/// Only a marker in prefix position counts; a clean body maps to 0. The
/// original integration also accepted markers further into the body by
/// accident — worth re-confirming against live gateway behavior if this
/// ever disagrees with it.
pub(crate) fn parse_error_marker(body: &str) -> i64 {
    for marker in ["<!-- Error: ", "Error: "] {
        if let Some(rest) = body.strip_prefix(marker) {
            let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
            return digits.parse().unwrap_or(0);
        }
    }
    0
}

/// Fires composed query strings at the redirect endpoint to pre-flight
/// them for composition errors.
#[derive(Clone, Debug)]
pub struct UrlVerifier {
    client: reqwest::Client,
    endpoint: String,
}

impl UrlVerifier {
    pub fn new(endpoint: impl Into<String>) -> CustomResult<Self, TransportError> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .connect_timeout(Duration::from_secs(consts::VERIFY_TIMEOUT_SECS))
            .timeout(Duration::from_secs(consts::VERIFY_TIMEOUT_SECS))
            .build()
            .change_context(TransportError::ClientConstructionFailed)?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    /// Returns the gateway error code for the composed query string: 0 on
    /// success, the parsed `Error:` code on a gateway complaint, 1021 when
    /// the endpoint is unreachable and 1023 for an empty query string
    /// (checked locally, no network call).
    pub async fn verify(&self, query: &str) -> i64 {
        if query.is_empty() {
            return consts::ERROR_URL_GENERATION;
        }

        let url = format!("{}{}", self.endpoint, query);
        let body = match self.client.get(&url).send().await {
            Ok(response) => response.text().await,
            Err(error) => Err(error),
        };

        match body {
            Ok(body) => {
                let code = parse_error_marker(&body);
                if code != 0 {
                    tracing::warn!(error_id = code, "redirect URL failed pre-flight");
                }
                code
            }
            Err(error) => {
                tracing::warn!(?error, "redirect pre-flight request failed");
                consts::ERROR_VERIFICATION_UNREACHABLE
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_error_marker_is_parsed() {
        assert_eq!(parse_error_marker("Error: 42"), 42);
    }

    #[test]
    fn comment_wrapped_marker_is_parsed() {
        assert_eq!(parse_error_marker("<!-- Error: 13 -->"), 13);
    }

    #[test]
    fn clean_body_is_success() {
        assert_eq!(parse_error_marker("<html><body>payment form</body></html>"), 0);
    }

    #[test]
    fn marker_not_in_prefix_position_is_ignored() {
        assert_eq!(parse_error_marker("<html>Error: 42</html>"), 0);
    }

    #[tokio::test]
    async fn empty_query_short_circuits_without_network() {
        // Unroutable endpoint: reaching it would fail loudly, proving the
        // sentinel is produced locally.
        let verifier = UrlVerifier::new("http://127.0.0.1:1/?").unwrap();
        assert_eq!(verifier.verify("").await, consts::ERROR_URL_GENERATION);
    }

    #[tokio::test]
    async fn unreachable_endpoint_maps_to_the_network_sentinel() {
        let verifier = UrlVerifier::new("http://127.0.0.1:1/?").unwrap();
        assert_eq!(
            verifier.verify("OPERATION=1").await,
            consts::ERROR_VERIFICATION_UNREACHABLE
        );
    }

    #[tokio::test]
    async fn gateway_error_body_yields_its_code() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", mockito::Matcher::Any)
            .with_body("<!-- Error: 1100 -->")
            .create_async()
            .await;
        let verifier = UrlVerifier::new(format!("{}/?", server.url())).unwrap();
        assert_eq!(verifier.verify("OPERATION=1").await, 1100);
    }

    #[tokio::test]
    async fn normal_body_yields_success() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", mockito::Matcher::Any)
            .with_body("<html>form</html>")
            .create_async()
            .await;
        let verifier = UrlVerifier::new(format!("{}/?", server.url())).unwrap();
        assert_eq!(verifier.verify("OPERATION=1").await, 0);
    }
}
