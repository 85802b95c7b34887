//! Merchant configuration.
//!
//! Credentials are read-only for the life of the client. The password and
//! JET id are masked and only peeked at the signing boundary.

use std::path::Path;

use error_stack::{Report, ResultExt};
use hyperswitch_masking::Secret;
use serde::Deserialize;

use crate::{
    consts,
    errors::{CustomResult, SettingsError},
};

fn default_xml_endpoint() -> String {
    consts::XML_ENDPOINT.to_string()
}

fn default_iframe_endpoint() -> String {
    consts::IFRAME_ENDPOINT.to_string()
}

/// Merchant-level configuration for one BankStore terminal.
#[derive(Clone, Debug, Deserialize)]
pub struct MerchantSettings {
    /// Merchant code assigned by the gateway.
    pub merchant_code: String,
    /// Terminal number within the merchant account.
    pub terminal: String,
    /// Shared signing password. Never serialized, logged or exposed.
    pub password: Secret<String>,
    /// BankStore JET identifier, required only for `add_user_token`.
    pub jet_id: Option<Secret<String>>,
    /// Remote-procedure endpoint.
    #[serde(default = "default_xml_endpoint")]
    pub xml_endpoint: String,
    /// Redirect endpoint the composed query string is appended to.
    #[serde(default = "default_iframe_endpoint")]
    pub iframe_endpoint: String,
}

impl MerchantSettings {
    /// Builds settings against the production endpoints.
    pub fn new(
        merchant_code: impl Into<String>,
        terminal: impl Into<String>,
        password: Secret<String>,
    ) -> Self {
        Self {
            merchant_code: merchant_code.into(),
            terminal: terminal.into(),
            password,
            jet_id: None,
            xml_endpoint: default_xml_endpoint(),
            iframe_endpoint: default_iframe_endpoint(),
        }
    }

    pub fn with_jet_id(mut self, jet_id: Secret<String>) -> Self {
        self.jet_id = Some(jet_id);
        self
    }

    /// Loads settings from an optional TOML file overlaid with
    /// `PAYTPV__`-prefixed environment variables.
    pub fn load(file: Option<&Path>) -> CustomResult<Self, SettingsError> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path));
        }
        let config = builder
            .add_source(
                config::Environment::with_prefix("PAYTPV")
                    .try_parsing(true)
                    .separator("__"),
            )
            .build()
            .change_context(SettingsError::ConfigSource)?;

        config.try_deserialize().map_err(|err| {
            Report::new(SettingsError::InvalidConfig {
                message: err.to_string(),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_production_endpoints() {
        let settings =
            MerchantSettings::new("MC001", "1", Secret::new("secret".to_string()));
        assert_eq!(settings.xml_endpoint, consts::XML_ENDPOINT);
        assert_eq!(settings.iframe_endpoint, consts::IFRAME_ENDPOINT);
        assert!(settings.jet_id.is_none());
    }

    #[test]
    fn password_is_masked_in_debug_output() {
        let settings =
            MerchantSettings::new("MC001", "1", Secret::new("secret".to_string()));
        let rendered = format!("{settings:?}");
        assert!(!rendered.contains("secret"));
    }
}
