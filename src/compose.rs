//! Query-string composition for redirect flows.
//!
//! Pure: no I/O happens here. The façade chains [`compose`] with the
//! verifier in `verify.rs`.
//!
//! The wire contract is order-sensitive twice over: parameters are first
//! assembled in a fixed insertion order to compute the VHASH integrity
//! digest, then the whole set (VHASH included) is re-sorted in descending
//! key order for the final serialization. The receiving endpoint may
//! reconstruct and compare, so both orderings must be reproduced exactly.

use error_stack::Report;
use hyperswitch_masking::PeekInterface;
use sha2::{Digest, Sha512};

use crate::{
    errors::{BankStoreError, CustomResult},
    operation::{ContextField, OperationDescriptor},
    settings::MerchantSettings,
    signature::md5_hex,
};

mod params {
    pub const MERCHANT_CODE: &str = "MERCHANT_MERCHANTCODE";
    pub const TERMINAL: &str = "MERCHANT_TERMINAL";
    pub const OPERATION: &str = "OPERATION";
    pub const LANGUAGE: &str = "LANGUAGE";
    pub const SIGNATURE: &str = "MERCHANT_MERCHANTSIGNATURE";
    pub const URL_OK: &str = "URLOK";
    pub const URL_KO: &str = "URLKO";
    pub const ORDER: &str = "MERCHANT_ORDER";
    pub const SECURE_3D: &str = "3DSECURE";
    pub const AMOUNT: &str = "MERCHANT_AMOUNT";
    pub const PRODUCT_DESCRIPTION: &str = "MERCHANT_PRODUCTDESCRIPTION";
    pub const CURRENCY: &str = "MERCHANT_CURRENCY";
    pub const SCORING: &str = "MERCHANT_SCORING";
    pub const ID_USER: &str = "IDUSER";
    pub const TOKEN_USER: &str = "TOKEN_USER";
    pub const SUBSCRIPTION_START: &str = "SUBSCRIPTION_STARTDATE";
    pub const SUBSCRIPTION_END: &str = "SUBSCRIPTION_ENDDATE";
    pub const SUBSCRIPTION_PERIODICITY: &str = "SUBSCRIPTION_PERIODICITY";
    pub const VHASH: &str = "VHASH";
}

fn urlencode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

fn serialize(pairs: &[(&'static str, String)]) -> String {
    pairs
        .iter()
        .map(|(key, value)| format!("{}={}", urlencode(key), urlencode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

fn sha512_hex(input: &str) -> String {
    let mut hasher = Sha512::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// Serializes the descriptor plus its signature into the final query
/// string, VHASH included.
pub fn compose(
    descriptor: &OperationDescriptor,
    signature: &str,
    settings: &MerchantSettings,
) -> CustomResult<String, BankStoreError> {
    let mut data: Vec<(&'static str, String)> = vec![
        (params::MERCHANT_CODE, settings.merchant_code.clone()),
        (params::TERMINAL, settings.terminal.clone()),
        (params::OPERATION, descriptor.operation.code().to_string()),
        (params::LANGUAGE, descriptor.language.clone()),
        (params::SIGNATURE, signature.to_string()),
        (params::URL_OK, descriptor.url_ok.clone().unwrap_or_default()),
        (params::URL_KO, descriptor.url_ko.clone().unwrap_or_default()),
        (params::ORDER, descriptor.reference.clone()),
    ];

    if descriptor.secure_3d {
        data.push((params::SECURE_3D, "1".to_string()));
    }
    if let Some(amount) = descriptor.amount {
        data.push((params::AMOUNT, amount.to_string()));
    }
    if let Some(concept) = descriptor.concept.as_deref() {
        if !concept.is_empty() {
            data.push((params::PRODUCT_DESCRIPTION, concept.to_string()));
        }
    }

    for field in descriptor.operation.context_fields() {
        match field {
            ContextField::Currency => {
                data.push((params::CURRENCY, descriptor.effective_currency().to_string()));
            }
            ContextField::Scoring => {
                if let Some(scoring) = descriptor.scoring {
                    data.push((params::SCORING, scoring.to_string()));
                }
            }
            ContextField::IdUser => {
                let user = descriptor.user.as_ref().ok_or_else(|| {
                    Report::new(BankStoreError::MissingField { field: "id_user" })
                })?;
                data.push((params::ID_USER, user.id_user.clone()));
            }
            ContextField::TokenUser => {
                let user = descriptor.user.as_ref().ok_or_else(|| {
                    Report::new(BankStoreError::MissingField { field: "token_user" })
                })?;
                data.push((params::TOKEN_USER, user.token_user.peek().clone()));
            }
            ContextField::SubscriptionStartDate => {
                let schedule = descriptor.schedule.as_ref().ok_or_else(|| {
                    Report::new(BankStoreError::MissingField {
                        field: "subscription_schedule",
                    })
                })?;
                data.push((params::SUBSCRIPTION_START, schedule.start_date.clone()));
            }
            ContextField::SubscriptionEndDate => {
                let schedule = descriptor.schedule.as_ref().ok_or_else(|| {
                    Report::new(BankStoreError::MissingField {
                        field: "subscription_schedule",
                    })
                })?;
                data.push((params::SUBSCRIPTION_END, schedule.end_date.clone()));
            }
            ContextField::SubscriptionPeriodicity => {
                let schedule = descriptor.schedule.as_ref().ok_or_else(|| {
                    Report::new(BankStoreError::MissingField {
                        field: "subscription_schedule",
                    })
                })?;
                data.push((
                    params::SUBSCRIPTION_PERIODICITY,
                    schedule.periodicity.to_string(),
                ));
            }
        }
    }

    let content = serialize(&data);
    let vhash = sha512_hex(&md5_hex(&format!(
        "{content}{}",
        md5_hex(settings.password.peek())
    )));
    data.push((params::VHASH, vhash));

    // Descending key order, VHASH included.
    data.sort_by(|a, b| b.0.cmp(a.0));

    Ok(serialize(&data))
}
