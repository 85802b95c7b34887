//! Signature generation.
//!
//! Redirect flows sign an operation-type-specific tuple of descriptor
//! fields with MD5; the shared password is never concatenated in the
//! clear but pre-hashed once, and the outer digest covers that inner
//! digest. Remote-procedure flows use a flat SHA-1 over positional fields
//! with the password last.
//!
//! Every tuple must match the gateway's expectation bit for bit; any
//! deviation is rejected remotely as an authentication error.

use error_stack::Report;
use hyperswitch_masking::{PeekInterface, Secret};
use sha1::{Digest, Sha1};

use crate::{
    errors::{BankStoreError, CustomResult},
    operation::{OperationDescriptor, SignedField},
    settings::MerchantSettings,
};

pub(crate) fn md5_hex(input: &str) -> String {
    format!("{:x}", md5::compute(input.as_bytes()))
}

fn sha1_hex(input: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// Computes the redirect (IFRAME/Fullscreen) signature for a descriptor.
///
/// Fails with `MissingField` when the tuple names a field the descriptor
/// does not carry; fields outside the tuple are ignored entirely.
pub fn redirect_signature(
    descriptor: &OperationDescriptor,
    settings: &MerchantSettings,
) -> CustomResult<String, BankStoreError> {
    let mut material = String::new();

    for field in descriptor.operation.signed_fields() {
        match field {
            SignedField::MerchantCode => material.push_str(&settings.merchant_code),
            SignedField::Terminal => material.push_str(&settings.terminal),
            SignedField::OperationCode => {
                material.push_str(&descriptor.operation.code().to_string())
            }
            SignedField::Reference => {
                if descriptor.reference.is_empty() {
                    return Err(Report::new(BankStoreError::MissingField {
                        field: "reference",
                    }));
                }
                material.push_str(&descriptor.reference);
            }
            SignedField::Amount => {
                let amount = descriptor.amount.ok_or_else(|| {
                    Report::new(BankStoreError::MissingField { field: "amount" })
                })?;
                material.push_str(&amount.to_string());
            }
            SignedField::Currency => material.push_str(descriptor.effective_currency()),
            SignedField::IdUser => {
                let user = descriptor.user.as_ref().ok_or_else(|| {
                    Report::new(BankStoreError::MissingField { field: "id_user" })
                })?;
                material.push_str(&user.id_user);
            }
            SignedField::TokenUser => {
                let user = descriptor.user.as_ref().ok_or_else(|| {
                    Report::new(BankStoreError::MissingField { field: "token_user" })
                })?;
                material.push_str(user.token_user.peek());
            }
        }
    }

    material.push_str(&md5_hex(settings.password.peek()));
    Ok(md5_hex(&material))
}

/// Computes the SHA-1 inner signature used by the remote-procedure
/// methods: the given fields concatenated in order, password appended
/// last.
pub fn inner_signature(fields: &[&str], password: &Secret<String>) -> String {
    let mut material = String::new();
    for field in fields {
        material.push_str(field);
    }
    material.push_str(password.peek());
    sha1_hex(&material)
}

#[cfg(test)]
mod tests {
    use hyperswitch_masking::Secret;

    use super::*;
    use crate::{
        operation::{OperationDescriptor, OperationType},
        types::TokenizedUser,
    };

    fn settings() -> MerchantSettings {
        MerchantSettings::new("MC001", "1", Secret::new("secret".to_string()))
    }

    fn user() -> TokenizedUser {
        TokenizedUser::new("42", Secret::new("tok_9".to_string()))
    }

    #[test]
    fn purchase_signature_matches_the_gateway_construction() {
        // md5("MC001" + "1" + "1" + "ORD-1" + "1000" + "EUR" + md5("secret"))
        let descriptor = OperationDescriptor::new(OperationType::Purchase, "ORD-1")
            .amount(1000)
            .currency("EUR");
        let signature = redirect_signature(&descriptor, &settings()).unwrap();
        assert_eq!(signature, "dc1f9edd149659895f4a5e34a6c1008b");
    }

    #[test]
    fn registration_signature_covers_reference_only() {
        let descriptor = OperationDescriptor::new(OperationType::UserRegistration, "REF-7");
        let signature = redirect_signature(&descriptor, &settings()).unwrap();
        assert_eq!(signature, "a889ab11b6eedef546742a4cdd5beee3");
    }

    #[test]
    fn token_purchase_signature_includes_user_and_currency() {
        let descriptor = OperationDescriptor::new(OperationType::TokenPurchase, "ORD-9")
            .amount(2500)
            .currency("EUR")
            .user(user());
        let signature = redirect_signature(&descriptor, &settings()).unwrap();
        assert_eq!(signature, "12b39fae451f965eb1da9e50f12acd8b");
    }

    #[test]
    fn preauthorization_confirm_signature_has_no_currency() {
        let descriptor =
            OperationDescriptor::new(OperationType::PreauthorizationConfirm, "ORD-6")
                .amount(700)
                .user(user());
        let signature = redirect_signature(&descriptor, &settings()).unwrap();
        assert_eq!(signature, "d26b4e308dc261c6e55f0d149ebc2c73");
    }

    #[test]
    fn signature_is_deterministic() {
        let descriptor = OperationDescriptor::new(OperationType::Purchase, "ORD-1")
            .amount(1000)
            .currency("EUR");
        let first = redirect_signature(&descriptor, &settings()).unwrap();
        let second = redirect_signature(&descriptor, &settings()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn every_signed_field_influences_the_signature() {
        let base = OperationDescriptor::new(OperationType::TokenPurchase, "ORD-9")
            .amount(2500)
            .currency("EUR")
            .user(user());
        let reference = redirect_signature(&base, &settings()).unwrap();

        let variants = [
            base.clone().amount(2501),
            base.clone().currency("USD"),
            OperationDescriptor::new(OperationType::TokenPurchase, "ORD-10")
                .amount(2500)
                .currency("EUR")
                .user(user()),
            base.clone()
                .user(TokenizedUser::new("43", Secret::new("tok_9".to_string()))),
            base.clone()
                .user(TokenizedUser::new("42", Secret::new("tok_8".to_string()))),
        ];
        for variant in variants {
            assert_ne!(
                redirect_signature(&variant, &settings()).unwrap(),
                reference
            );
        }
    }

    #[test]
    fn missing_amount_fails_fast() {
        let descriptor = OperationDescriptor::new(OperationType::Purchase, "ORD-1");
        let err = redirect_signature(&descriptor, &settings()).unwrap_err();
        assert!(matches!(
            err.current_context(),
            BankStoreError::MissingField { field: "amount" }
        ));
    }

    #[test]
    fn missing_user_fails_fast_on_user_bound_types() {
        let descriptor =
            OperationDescriptor::new(OperationType::PreauthorizationConfirm, "ORD-6").amount(700);
        let err = redirect_signature(&descriptor, &settings()).unwrap_err();
        assert!(matches!(
            err.current_context(),
            BankStoreError::MissingField { field: "id_user" }
        ));
    }

    #[test]
    fn inner_signature_appends_password_last() {
        // sha1("MC001" + "42" + "tok_9" + "1" + "secret")
        let signature = inner_signature(
            &["MC001", "42", "tok_9", "1"],
            &Secret::new("secret".to_string()),
        );
        assert_eq!(signature, "0b867e91d30916f05fee13f06468fa8d1e5e1c16");
    }
}
