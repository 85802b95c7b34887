//! Redirect-flow operation model.
//!
//! The gateway keys every IFRAME/Fullscreen request off a numeric
//! operation-type code. Which descriptor fields are signed and which are
//! serialized into the query string is a fixed per-code contract; both
//! sides of that contract live here as data so a new operation type is a
//! table change, not parallel edits to the signer and the composer.

use error_stack::Report;

use crate::{
    consts,
    errors::{BankStoreError, CustomResult},
    types::{SubscriptionSchedule, TokenizedUser},
};

/// Operation-type codes of the BankStore IFRAME/Fullscreen integration.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, strum::Display)]
pub enum OperationType {
    /// `execute_purchase` (code 1)
    Purchase,
    /// `create_preauthorization` (code 3)
    Preauthorization,
    /// `preauthorization_cancel` (code 4)
    PreauthorizationCancel,
    /// `preauthorization_confirm` (code 6)
    PreauthorizationConfirm,
    /// `create_subscription` (code 9)
    Subscription,
    /// `deferred_preauthorization` (code 13)
    DeferredPreauthorization,
    /// `deferred_preauthorization_cancel` (code 14)
    DeferredPreauthorizationCancel,
    /// `deferred_preauthorization_confirm` (code 16)
    DeferredPreauthorizationConfirm,
    /// `add_user` (code 107)
    UserRegistration,
    /// `execute_purchase_token` (code 109)
    TokenPurchase,
    /// `create_subscription_token` (code 110)
    TokenSubscription,
    /// `execute_preauthorization_token` (code 111)
    TokenPreauthorization,
}

/// Fields participating in the redirect signature, in signing order.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SignedField {
    MerchantCode,
    IdUser,
    TokenUser,
    Terminal,
    OperationCode,
    Reference,
    Amount,
    Currency,
}

/// Type-specific parameters appended to the composed query string, in
/// insertion order. A superset of the signed fields: these carry display
/// and scheduling context the signature does not cover.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ContextField {
    Currency,
    Scoring,
    IdUser,
    TokenUser,
    SubscriptionStartDate,
    SubscriptionEndDate,
    SubscriptionPeriodicity,
}

// Signed tuples. The order is the gateway's signing order and must not be
// rearranged.
const SIGNED_PLAIN: &[SignedField] = &[
    SignedField::MerchantCode,
    SignedField::Terminal,
    SignedField::OperationCode,
    SignedField::Reference,
    SignedField::Amount,
    SignedField::Currency,
];

const SIGNED_USER_BOUND: &[SignedField] = &[
    SignedField::MerchantCode,
    SignedField::IdUser,
    SignedField::TokenUser,
    SignedField::Terminal,
    SignedField::OperationCode,
    SignedField::Reference,
    SignedField::Amount,
];

const SIGNED_TOKEN: &[SignedField] = &[
    SignedField::MerchantCode,
    SignedField::IdUser,
    SignedField::TokenUser,
    SignedField::Terminal,
    SignedField::OperationCode,
    SignedField::Reference,
    SignedField::Amount,
    SignedField::Currency,
];

const SIGNED_REGISTRATION: &[SignedField] = &[
    SignedField::MerchantCode,
    SignedField::Terminal,
    SignedField::OperationCode,
    SignedField::Reference,
];

const CONTEXT_PLAIN: &[ContextField] = &[ContextField::Currency, ContextField::Scoring];

const CONTEXT_USER_BOUND: &[ContextField] = &[ContextField::IdUser, ContextField::TokenUser];

const CONTEXT_SUBSCRIPTION: &[ContextField] = &[
    ContextField::Currency,
    ContextField::SubscriptionStartDate,
    ContextField::SubscriptionEndDate,
    ContextField::SubscriptionPeriodicity,
    ContextField::Scoring,
];

const CONTEXT_TOKEN_PURCHASE: &[ContextField] = &[
    ContextField::IdUser,
    ContextField::TokenUser,
    ContextField::Currency,
    ContextField::Scoring,
];

const CONTEXT_TOKEN_SUBSCRIPTION: &[ContextField] = &[
    ContextField::IdUser,
    ContextField::TokenUser,
    ContextField::Currency,
    ContextField::SubscriptionStartDate,
    ContextField::SubscriptionEndDate,
    ContextField::SubscriptionPeriodicity,
    ContextField::Scoring,
];

// Scoring ahead of currency is the gateway's documented order for this
// code, unlike the token purchase above.
const CONTEXT_TOKEN_PREAUTHORIZATION: &[ContextField] = &[
    ContextField::IdUser,
    ContextField::TokenUser,
    ContextField::Scoring,
    ContextField::Currency,
];

impl OperationType {
    /// The numeric code as it appears on the wire and inside signatures.
    pub fn code(self) -> u16 {
        match self {
            Self::Purchase => 1,
            Self::Preauthorization => 3,
            Self::PreauthorizationCancel => 4,
            Self::PreauthorizationConfirm => 6,
            Self::Subscription => 9,
            Self::DeferredPreauthorization => 13,
            Self::DeferredPreauthorizationCancel => 14,
            Self::DeferredPreauthorizationConfirm => 16,
            Self::UserRegistration => 107,
            Self::TokenPurchase => 109,
            Self::TokenSubscription => 110,
            Self::TokenPreauthorization => 111,
        }
    }

    /// Ordered tuple of fields covered by the redirect signature.
    pub fn signed_fields(self) -> &'static [SignedField] {
        match self {
            Self::Purchase
            | Self::Preauthorization
            | Self::Subscription
            | Self::DeferredPreauthorization => SIGNED_PLAIN,
            Self::PreauthorizationCancel
            | Self::PreauthorizationConfirm
            | Self::DeferredPreauthorizationCancel
            | Self::DeferredPreauthorizationConfirm => SIGNED_USER_BOUND,
            Self::TokenPurchase | Self::TokenSubscription | Self::TokenPreauthorization => {
                SIGNED_TOKEN
            }
            Self::UserRegistration => SIGNED_REGISTRATION,
        }
    }

    /// Ordered type-specific parameters appended during composition.
    pub fn context_fields(self) -> &'static [ContextField] {
        match self {
            Self::Purchase | Self::Preauthorization | Self::DeferredPreauthorization => {
                CONTEXT_PLAIN
            }
            Self::PreauthorizationCancel
            | Self::PreauthorizationConfirm
            | Self::DeferredPreauthorizationCancel
            | Self::DeferredPreauthorizationConfirm => CONTEXT_USER_BOUND,
            Self::Subscription => CONTEXT_SUBSCRIPTION,
            Self::TokenPurchase => CONTEXT_TOKEN_PURCHASE,
            Self::TokenSubscription => CONTEXT_TOKEN_SUBSCRIPTION,
            Self::TokenPreauthorization => CONTEXT_TOKEN_PREAUTHORIZATION,
            Self::UserRegistration => &[],
        }
    }

    /// Whether the façade must confirm the tokenized user exists before
    /// signing.
    pub fn requires_user_lookup(self) -> bool {
        matches!(
            self,
            Self::PreauthorizationCancel
                | Self::PreauthorizationConfirm
                | Self::DeferredPreauthorizationCancel
                | Self::DeferredPreauthorizationConfirm
                | Self::TokenPreauthorization
        )
    }

    fn uses(self, field: ContextField) -> bool {
        self.context_fields().contains(&field)
    }

    fn signs(self, field: SignedField) -> bool {
        self.signed_fields().contains(&field)
    }
}

impl TryFrom<u16> for OperationType {
    type Error = Report<BankStoreError>;

    fn try_from(code: u16) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(Self::Purchase),
            3 => Ok(Self::Preauthorization),
            4 => Ok(Self::PreauthorizationCancel),
            6 => Ok(Self::PreauthorizationConfirm),
            9 => Ok(Self::Subscription),
            13 => Ok(Self::DeferredPreauthorization),
            14 => Ok(Self::DeferredPreauthorizationCancel),
            16 => Ok(Self::DeferredPreauthorizationConfirm),
            107 => Ok(Self::UserRegistration),
            109 => Ok(Self::TokenPurchase),
            110 => Ok(Self::TokenSubscription),
            111 => Ok(Self::TokenPreauthorization),
            code => Err(Report::new(BankStoreError::UnsupportedOperation { code })),
        }
    }
}

/// One redirect-flow request. Built fresh per call, signed once, composed
/// once, discarded.
///
/// Optional fields stay absent when not provided so the signer and the
/// composer can tell "not provided" from "explicitly zero".
#[derive(Clone, Debug)]
pub struct OperationDescriptor {
    pub operation: OperationType,
    pub reference: String,
    pub amount: Option<i64>,
    pub currency: Option<String>,
    pub language: String,
    pub concept: Option<String>,
    pub user: Option<TokenizedUser>,
    pub schedule: Option<SubscriptionSchedule>,
    pub secure_3d: bool,
    pub scoring: Option<u32>,
    pub url_ok: Option<String>,
    pub url_ko: Option<String>,
}

impl OperationDescriptor {
    pub fn new(operation: OperationType, reference: impl Into<String>) -> Self {
        Self {
            operation,
            reference: reference.into(),
            amount: None,
            currency: None,
            language: consts::DEFAULT_LANGUAGE.to_string(),
            concept: None,
            user: None,
            schedule: None,
            secure_3d: false,
            scoring: None,
            url_ok: None,
            url_ko: None,
        }
    }

    /// Amount in minor currency units.
    pub fn amount(mut self, amount: i64) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = Some(currency.into());
        self
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn concept(mut self, concept: impl Into<String>) -> Self {
        self.concept = Some(concept.into());
        self
    }

    pub fn user(mut self, user: TokenizedUser) -> Self {
        self.user = Some(user);
        self
    }

    pub fn schedule(mut self, schedule: SubscriptionSchedule) -> Self {
        self.schedule = Some(schedule);
        self
    }

    /// Forces 3-D Secure for this operation. Left unset, the gateway
    /// applies its own default.
    pub fn require_3d_secure(mut self) -> Self {
        self.secure_3d = true;
        self
    }

    pub fn scoring(mut self, scoring: u32) -> Self {
        self.scoring = Some(scoring);
        self
    }

    pub fn redirect_urls(
        mut self,
        url_ok: impl Into<String>,
        url_ko: impl Into<String>,
    ) -> Self {
        self.url_ok = Some(url_ok.into());
        self.url_ko = Some(url_ko.into());
        self
    }

    /// Currency actually signed and serialized when the type carries one.
    pub fn effective_currency(&self) -> &str {
        self.currency.as_deref().unwrap_or(consts::DEFAULT_CURRENCY)
    }

    /// Rejects fields that do not apply to the selected operation type.
    /// Missing *required* fields are reported later, by the signer and
    /// the composer, as `MissingField`.
    pub fn validate(&self) -> CustomResult<(), BankStoreError> {
        let op = self.operation;

        if self.user.is_some() && !op.signs(SignedField::IdUser) && !op.uses(ContextField::IdUser)
        {
            return Err(Report::new(BankStoreError::InvalidArgument {
                message: format!("operation {op} does not take a tokenized user"),
            }));
        }
        if self.schedule.is_some() && !op.uses(ContextField::SubscriptionStartDate) {
            return Err(Report::new(BankStoreError::InvalidArgument {
                message: format!("operation {op} does not take a subscription schedule"),
            }));
        }
        if self.scoring.is_some() && !op.uses(ContextField::Scoring) {
            return Err(Report::new(BankStoreError::InvalidArgument {
                message: format!("operation {op} does not take a scoring value"),
            }));
        }
        if self.amount.is_some() && !op.signs(SignedField::Amount) {
            return Err(Report::new(BankStoreError::InvalidArgument {
                message: format!("operation {op} does not take an amount"),
            }));
        }
        if self.reference.is_empty() {
            return Err(Report::new(BankStoreError::MissingField {
                field: "reference",
            }));
        }
        Ok(())
    }
}
