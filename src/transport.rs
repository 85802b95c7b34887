//! Remote-procedure transport.
//!
//! The XML BankStore integration is call-and-response: named `DS_*`
//! parameters in, a flat set of `DS_*` answer fields out. The façade only
//! depends on the [`GatewayTransport`] trait; the shipped implementation
//! wraps the parameters in a SOAP envelope and flattens whatever the
//! endpoint answers. Faults and connectivity failures surface as
//! [`TransportError`] and are normalized by the caller, never propagated
//! raw.

use std::{collections::BTreeMap, time::Duration};

use async_trait::async_trait;
use error_stack::{Report, ResultExt};
use quick_xml::{escape::escape, events::Event, Reader};

use crate::{
    consts,
    errors::{CustomResult, TransportError},
};

/// Flat map of `DS_*` answer fields.
pub type GatewayAnswer = BTreeMap<String, String>;

/// Call-and-response seam towards the gateway's remote-procedure
/// endpoint.
#[async_trait]
pub trait GatewayTransport: Send + Sync {
    /// Invokes one gateway operation with named parameters in gateway
    /// order.
    async fn call(
        &self,
        operation: &str,
        params: &[(&'static str, String)],
    ) -> CustomResult<GatewayAnswer, TransportError>;
}

/// SOAP/XML transport against the BankStore XML endpoint.
#[derive(Clone, Debug)]
pub struct SoapTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl SoapTransport {
    pub fn new(endpoint: impl Into<String>) -> CustomResult<Self, TransportError> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .connect_timeout(Duration::from_secs(consts::TRANSPORT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(consts::TRANSPORT_TIMEOUT_SECS))
            .build()
            .change_context(TransportError::ClientConstructionFailed)?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    fn envelope(operation: &str, params: &[(&'static str, String)]) -> String {
        let mut body = String::new();
        for (name, value) in params {
            body.push_str(&format!("<{name}>{}</{name}>", escape(value)));
        }
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/" xmlns:ban="urn:bankstore">
<soapenv:Body>
<ban:{operation}>{body}</ban:{operation}>
</soapenv:Body>
</soapenv:Envelope>"#
        )
    }

    /// Flattens a SOAP answer into its leaf elements. A `Fault` element
    /// anywhere in the body is a transport-level failure.
    fn parse_answer(body: &str) -> CustomResult<GatewayAnswer, TransportError> {
        let mut reader = Reader::from_str(body);
        let mut answer = GatewayAnswer::new();
        let mut current: Option<String> = None;
        let mut in_fault = false;
        let mut fault_detail = String::new();

        loop {
            match reader
                .read_event()
                .change_context(TransportError::ResponseDeserializationFailed)?
            {
                Event::Start(element) => {
                    let local = String::from_utf8_lossy(element.local_name().as_ref()).into_owned();
                    if local == "Fault" {
                        in_fault = true;
                    }
                    current = Some(local);
                }
                Event::Text(text) => {
                    let value = text
                        .unescape()
                        .change_context(TransportError::ResponseDeserializationFailed)?;
                    let value = value.trim();
                    if value.is_empty() {
                        continue;
                    }
                    if in_fault {
                        if current.as_deref() == Some("faultstring") {
                            fault_detail = value.to_string();
                        }
                    } else if let Some(name) = current.take() {
                        answer.insert(name, value.to_string());
                    }
                }
                Event::End(_) => current = None,
                Event::Eof => break,
                _ => {}
            }
        }

        if in_fault {
            return Err(Report::new(TransportError::Fault {
                detail: fault_detail,
            }));
        }
        Ok(answer)
    }
}

#[async_trait]
impl GatewayTransport for SoapTransport {
    async fn call(
        &self,
        operation: &str,
        params: &[(&'static str, String)],
    ) -> CustomResult<GatewayAnswer, TransportError> {
        tracing::debug!(operation, "calling gateway");

        let response = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "text/xml; charset=utf-8")
            .header("SOAPAction", operation)
            .body(Self::envelope(operation, params))
            .send()
            .await
            .map_err(|error| {
                if error.is_timeout() {
                    Report::new(TransportError::Timeout)
                } else {
                    Report::new(TransportError::ConnectionFailure)
                }
            })?;

        let body = response
            .text()
            .await
            .change_context(TransportError::ConnectionFailure)?;

        Self::parse_answer(&body)
    }
}
