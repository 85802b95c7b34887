//! Client façade: one method per BankStore operation.
//!
//! Remote-procedure methods compute the SHA-1 inner signature, forward
//! `DS_*` parameters through the transport and normalize the answer.
//! Redirect methods bind their fixed operation-type code, then chain
//! descriptor validation, signing, composition and pre-flight
//! verification. The client holds only read-only configuration and is
//! safe to share across tasks.

use std::net::IpAddr;

use error_stack::Report;
use hyperswitch_masking::PeekInterface;

use crate::{
    compose::compose,
    errors::{BankStoreError, CustomResult, TransportError},
    operation::{OperationDescriptor, OperationType},
    response::GatewayResponse,
    settings::MerchantSettings,
    signature::{inner_signature, redirect_signature},
    transport::{GatewayTransport, SoapTransport},
    types::{CardDetails, SubscriptionSchedule, TokenizedUser},
    verify::UrlVerifier,
};

/// Remote-procedure parameter names.
mod ds {
    pub const MERCHANT_CODE: &str = "DS_MERCHANT_MERCHANTCODE";
    pub const TERMINAL: &str = "DS_MERCHANT_TERMINAL";
    pub const PAN: &str = "DS_MERCHANT_PAN";
    pub const EXPIRY_DATE: &str = "DS_MERCHANT_EXPIRYDATE";
    pub const CVV2: &str = "DS_MERCHANT_CVV2";
    pub const SIGNATURE: &str = "DS_MERCHANT_MERCHANTSIGNATURE";
    pub const ORIGINAL_IP: &str = "DS_ORIGINAL_IP";
    pub const ID_USER: &str = "DS_IDUSER";
    pub const TOKEN_USER: &str = "DS_TOKEN_USER";
    pub const AMOUNT: &str = "DS_MERCHANT_AMOUNT";
    pub const ORDER: &str = "DS_MERCHANT_ORDER";
    pub const CURRENCY: &str = "DS_MERCHANT_CURRENCY";
    pub const PRODUCT_DESCRIPTION: &str = "DS_MERCHANT_PRODUCTDESCRIPTION";
    pub const OWNER: &str = "DS_MERCHANT_OWNER";
    pub const SCORING: &str = "DS_MERCHANT_SCORING";
    pub const AUTH_CODE: &str = "DS_MERCHANT_AUTHCODE";
    pub const DCC_CURRENCY: &str = "DS_MERCHANT_DCC_CURRENCY";
    pub const DCC_SESSION: &str = "DS_MERCHANT_DCC_SESSION";
    pub const SUBSCRIPTION_START: &str = "DS_SUBSCRIPTION_STARTDATE";
    pub const SUBSCRIPTION_END: &str = "DS_SUBSCRIPTION_ENDDATE";
    pub const SUBSCRIPTION_PERIODICITY: &str = "DS_SUBSCRIPTION_PERIODICITY";
    pub const EXECUTE: &str = "DS_EXECUTE";
    pub const RTOKEN: &str = "DS_MERCHANT_RTOKEN";
    pub const JET_TOKEN: &str = "DS_MERCHANT_JETTOKEN";
    pub const JET_ID: &str = "DS_MERCHANT_JETID";
}

/// Optional settings shared by the redirect (IFRAME/Fullscreen) entry
/// points.
#[derive(Clone, Debug, Default)]
pub struct RedirectOptions {
    /// Language of the hosted page literals; defaults to `ES`.
    pub language: Option<String>,
    /// Free-text operation description shown on the hosted page.
    pub concept: Option<String>,
    /// Force 3-D Secure. Left unset, the gateway applies its default.
    pub require_3d_secure: bool,
    /// Transaction risk-scoring value.
    pub scoring: Option<u32>,
    pub url_ok: Option<String>,
    pub url_ko: Option<String>,
}

impl RedirectOptions {
    fn apply(self, mut descriptor: OperationDescriptor) -> OperationDescriptor {
        if let Some(language) = self.language {
            descriptor = descriptor.language(language);
        }
        if let Some(concept) = self.concept {
            descriptor = descriptor.concept(concept);
        }
        if self.require_3d_secure {
            descriptor = descriptor.require_3d_secure();
        }
        if let Some(scoring) = self.scoring {
            descriptor = descriptor.scoring(scoring);
        }
        if let (Some(ok), Some(ko)) = (&self.url_ok, &self.url_ko) {
            descriptor = descriptor.redirect_urls(ok.clone(), ko.clone());
        } else if let Some(ok) = self.url_ok {
            descriptor.url_ok = Some(ok);
        } else if let Some(ko) = self.url_ko {
            descriptor.url_ko = Some(ko);
        }
        descriptor
    }
}

/// BankStore client for one merchant terminal.
pub struct BankStoreClient<T: GatewayTransport = SoapTransport> {
    settings: MerchantSettings,
    transport: T,
    verifier: UrlVerifier,
}

impl BankStoreClient<SoapTransport> {
    /// Builds a client against the configured endpoints with the shipped
    /// SOAP transport.
    pub fn new(settings: MerchantSettings) -> CustomResult<Self, TransportError> {
        let transport = SoapTransport::new(settings.xml_endpoint.clone())?;
        Self::with_transport(settings, transport)
    }
}

impl<T: GatewayTransport> BankStoreClient<T> {
    /// Builds a client over a caller-supplied transport.
    pub fn with_transport(
        settings: MerchantSettings,
        transport: T,
    ) -> CustomResult<Self, TransportError> {
        let verifier = UrlVerifier::new(settings.iframe_endpoint.clone())?;
        Ok(Self {
            settings,
            transport,
            verifier,
        })
    }

    fn sign(&self, fields: &[&str]) -> String {
        inner_signature(fields, &self.settings.password)
    }

    fn ip_param(origin_ip: Option<IpAddr>) -> String {
        origin_ip.map(|ip| ip.to_string()).unwrap_or_default()
    }

    async fn call_gateway(
        &self,
        operation: &'static str,
        params: Vec<(&'static str, String)>,
    ) -> GatewayResponse {
        match self.transport.call(operation, &params).await {
            Ok(answer) => GatewayResponse::from_answer(answer),
            Err(error) => {
                tracing::warn!(operation, ?error, "gateway call failed");
                GatewayResponse::connection_failure()
            }
        }
    }

    /// Shared sign → compose → verify pipeline for the redirect flows.
    async fn redirect_flow(
        &self,
        descriptor: OperationDescriptor,
    ) -> CustomResult<GatewayResponse, BankStoreError> {
        descriptor.validate()?;

        if descriptor.operation.requires_user_lookup() {
            let user = descriptor.user.clone().ok_or_else(|| {
                Report::new(BankStoreError::MissingField { field: "id_user" })
            })?;
            let lookup = self.info_user(&user, None).await?;
            if lookup.error_id != 0 {
                tracing::warn!(
                    operation = %descriptor.operation,
                    error_id = lookup.error_id,
                    "tokenized user lookup failed before signing"
                );
                return Ok(GatewayResponse::from_error_id(lookup.error_id));
            }
        }

        let signature = redirect_signature(&descriptor, &self.settings)?;
        let query = compose(&descriptor, &signature, &self.settings)?;
        let error_id = self.verifier.verify(&query).await;
        let url = format!("{}{}", self.settings.iframe_endpoint, query);
        Ok(GatewayResponse::from_verification(error_id, url))
    }

    // ------------------------------------------------------------------
    // Remote-procedure operations (XML BankStore)
    // ------------------------------------------------------------------

    /// Registers a card directly. Direct card entry must be enabled by
    /// the gateway; the PCI-DSS-compliant paths are [`Self::add_user_url`]
    /// and [`Self::add_user_token`].
    pub async fn add_user(
        &self,
        card: &CardDetails,
        origin_ip: Option<IpAddr>,
    ) -> CustomResult<GatewayResponse, BankStoreError> {
        let (pan, expiry, cvv) = card.normalized();
        let signature = self.sign(&[
            &self.settings.merchant_code,
            &pan,
            &cvv,
            &self.settings.terminal,
        ]);
        let params = vec![
            (ds::MERCHANT_CODE, self.settings.merchant_code.clone()),
            (ds::TERMINAL, self.settings.terminal.clone()),
            (ds::PAN, pan),
            (ds::EXPIRY_DATE, expiry),
            (ds::CVV2, cvv),
            (ds::SIGNATURE, signature),
            (ds::ORIGINAL_IP, Self::ip_param(origin_ip)),
        ];
        Ok(self.call_gateway("add_user", params).await)
    }

    /// Removes a tokenized user.
    pub async fn remove_user(
        &self,
        user: &TokenizedUser,
        origin_ip: Option<IpAddr>,
    ) -> CustomResult<GatewayResponse, BankStoreError> {
        Ok(self
            .call_gateway("remove_user", self.user_params(user, origin_ip))
            .await)
    }

    /// Fetches the stored information for a tokenized user.
    pub async fn info_user(
        &self,
        user: &TokenizedUser,
        origin_ip: Option<IpAddr>,
    ) -> CustomResult<GatewayResponse, BankStoreError> {
        Ok(self
            .call_gateway("info_user", self.user_params(user, origin_ip))
            .await)
    }

    fn user_params(
        &self,
        user: &TokenizedUser,
        origin_ip: Option<IpAddr>,
    ) -> Vec<(&'static str, String)> {
        let signature = self.sign(&[
            &self.settings.merchant_code,
            &user.id_user,
            user.token_user.peek(),
            &self.settings.terminal,
        ]);
        vec![
            (ds::MERCHANT_CODE, self.settings.merchant_code.clone()),
            (ds::TERMINAL, self.settings.terminal.clone()),
            (ds::ID_USER, user.id_user.clone()),
            (ds::TOKEN_USER, user.token_user.peek().clone()),
            (ds::SIGNATURE, signature),
            (ds::ORIGINAL_IP, Self::ip_param(origin_ip)),
        ]
    }

    /// Charges a tokenized card.
    #[allow(clippy::too_many_arguments)]
    pub async fn execute_purchase(
        &self,
        user: &TokenizedUser,
        amount: i64,
        reference: &str,
        currency: &str,
        description: Option<&str>,
        owner: Option<&str>,
        scoring: Option<u32>,
        origin_ip: Option<IpAddr>,
    ) -> CustomResult<GatewayResponse, BankStoreError> {
        let signature = self.sign(&[
            &self.settings.merchant_code,
            &user.id_user,
            user.token_user.peek(),
            &self.settings.terminal,
            &amount.to_string(),
            reference,
        ]);
        let mut params = vec![
            (ds::MERCHANT_CODE, self.settings.merchant_code.clone()),
            (ds::TERMINAL, self.settings.terminal.clone()),
            (ds::ID_USER, user.id_user.clone()),
            (ds::TOKEN_USER, user.token_user.peek().clone()),
            (ds::AMOUNT, amount.to_string()),
            (ds::ORDER, reference.to_string()),
            (ds::CURRENCY, currency.to_string()),
            (ds::SIGNATURE, signature),
            (ds::ORIGINAL_IP, Self::ip_param(origin_ip)),
        ];
        if let Some(description) = description {
            params.push((ds::PRODUCT_DESCRIPTION, description.to_string()));
        }
        if let Some(owner) = owner {
            params.push((ds::OWNER, owner.to_string()));
        }
        if let Some(scoring) = scoring {
            params.push((ds::SCORING, scoring.to_string()));
        }
        Ok(self.call_gateway("execute_purchase", params).await)
    }

    /// Charges a tokenized card under the DCC operative; the answer
    /// carries the DCC session and currency options.
    pub async fn execute_purchase_dcc(
        &self,
        user: &TokenizedUser,
        amount: i64,
        reference: &str,
        description: Option<&str>,
        owner: Option<&str>,
        origin_ip: Option<IpAddr>,
    ) -> CustomResult<GatewayResponse, BankStoreError> {
        let signature = self.sign(&[
            &self.settings.merchant_code,
            &user.id_user,
            user.token_user.peek(),
            &self.settings.terminal,
            &amount.to_string(),
            reference,
        ]);
        let mut params = vec![
            (ds::MERCHANT_CODE, self.settings.merchant_code.clone()),
            (ds::TERMINAL, self.settings.terminal.clone()),
            (ds::ID_USER, user.id_user.clone()),
            (ds::TOKEN_USER, user.token_user.peek().clone()),
            (ds::AMOUNT, amount.to_string()),
            (ds::ORDER, reference.to_string()),
            (ds::SIGNATURE, signature),
            (ds::ORIGINAL_IP, Self::ip_param(origin_ip)),
        ];
        if let Some(description) = description {
            params.push((ds::PRODUCT_DESCRIPTION, description.to_string()));
        }
        if let Some(owner) = owner {
            params.push((ds::OWNER, owner.to_string()));
        }
        Ok(self.call_gateway("execute_purchase_dcc", params).await)
    }

    /// Settles a DCC purchase in the currency the end user picked.
    pub async fn confirm_purchase_dcc(
        &self,
        reference: &str,
        dcc_currency: &str,
        dcc_session: &str,
    ) -> CustomResult<GatewayResponse, BankStoreError> {
        let signature = self.sign(&[
            &self.settings.merchant_code,
            &self.settings.terminal,
            reference,
            dcc_currency,
            dcc_session,
        ]);
        let params = vec![
            (ds::MERCHANT_CODE, self.settings.merchant_code.clone()),
            (ds::TERMINAL, self.settings.terminal.clone()),
            (ds::ORDER, reference.to_string()),
            (ds::DCC_CURRENCY, dcc_currency.to_string()),
            (ds::DCC_SESSION, dcc_session.to_string()),
            (ds::SIGNATURE, signature),
        ];
        Ok(self.call_gateway("confirm_purchase_dcc", params).await)
    }

    /// Refunds a previous purchase, fully or (with `amount`) partially.
    pub async fn execute_refund(
        &self,
        user: &TokenizedUser,
        reference: &str,
        currency: &str,
        auth_code: &str,
        amount: Option<i64>,
        origin_ip: Option<IpAddr>,
    ) -> CustomResult<GatewayResponse, BankStoreError> {
        let signature = self.sign(&[
            &self.settings.merchant_code,
            &user.id_user,
            user.token_user.peek(),
            &self.settings.terminal,
            auth_code,
            reference,
        ]);
        let mut params = vec![
            (ds::MERCHANT_CODE, self.settings.merchant_code.clone()),
            (ds::TERMINAL, self.settings.terminal.clone()),
            (ds::ID_USER, user.id_user.clone()),
            (ds::TOKEN_USER, user.token_user.peek().clone()),
            (ds::AUTH_CODE, auth_code.to_string()),
            (ds::ORDER, reference.to_string()),
            (ds::CURRENCY, currency.to_string()),
            (ds::SIGNATURE, signature),
            (ds::ORIGINAL_IP, Self::ip_param(origin_ip)),
        ];
        if let Some(amount) = amount {
            params.push((ds::AMOUNT, amount.to_string()));
        }
        Ok(self.call_gateway("execute_refund", params).await)
    }

    /// Creates a subscription on raw card data. Direct card entry must be
    /// enabled; prefer [`Self::create_subscription_url`] or
    /// [`Self::create_subscription_token`].
    #[allow(clippy::too_many_arguments)]
    pub async fn create_subscription(
        &self,
        card: &CardDetails,
        schedule: &SubscriptionSchedule,
        reference: &str,
        amount: i64,
        currency: &str,
        owner: Option<&str>,
        scoring: Option<u32>,
        origin_ip: Option<IpAddr>,
    ) -> CustomResult<GatewayResponse, BankStoreError> {
        let (pan, expiry, cvv) = card.normalized();
        let signature = self.sign(&[
            &self.settings.merchant_code,
            &pan,
            &cvv,
            &self.settings.terminal,
            &amount.to_string(),
            currency,
        ]);
        let mut params = vec![
            (ds::MERCHANT_CODE, self.settings.merchant_code.clone()),
            (ds::TERMINAL, self.settings.terminal.clone()),
            (ds::PAN, pan),
            (ds::EXPIRY_DATE, expiry),
            (ds::CVV2, cvv),
            (ds::SUBSCRIPTION_START, schedule.start_date.clone()),
            (ds::SUBSCRIPTION_END, schedule.end_date.clone()),
            (ds::ORDER, reference.to_string()),
            (ds::SUBSCRIPTION_PERIODICITY, schedule.periodicity.to_string()),
            (ds::AMOUNT, amount.to_string()),
            (ds::CURRENCY, currency.to_string()),
            (ds::SIGNATURE, signature),
            (ds::ORIGINAL_IP, Self::ip_param(origin_ip)),
            // First installment is always collected on direct creation.
            (ds::EXECUTE, "1".to_string()),
        ];
        if let Some(owner) = owner {
            params.push((ds::OWNER, owner.to_string()));
        }
        if let Some(scoring) = scoring {
            params.push((ds::SCORING, scoring.to_string()));
        }
        Ok(self.call_gateway("create_subscription", params).await)
    }

    /// Reschedules an existing subscription. `execute` collects the first
    /// installment of the new schedule immediately.
    pub async fn edit_subscription(
        &self,
        user: &TokenizedUser,
        schedule: &SubscriptionSchedule,
        amount: i64,
        execute: bool,
        origin_ip: Option<IpAddr>,
    ) -> CustomResult<GatewayResponse, BankStoreError> {
        let signature = self.sign(&[
            &self.settings.merchant_code,
            &user.id_user,
            user.token_user.peek(),
            &self.settings.terminal,
            &amount.to_string(),
        ]);
        let params = vec![
            (ds::MERCHANT_CODE, self.settings.merchant_code.clone()),
            (ds::TERMINAL, self.settings.terminal.clone()),
            (ds::ID_USER, user.id_user.clone()),
            (ds::TOKEN_USER, user.token_user.peek().clone()),
            (ds::SUBSCRIPTION_START, schedule.start_date.clone()),
            (ds::SUBSCRIPTION_END, schedule.end_date.clone()),
            (ds::SUBSCRIPTION_PERIODICITY, schedule.periodicity.to_string()),
            (ds::AMOUNT, amount.to_string()),
            (ds::SIGNATURE, signature),
            (ds::EXECUTE, i64::from(execute).to_string()),
            (ds::ORIGINAL_IP, Self::ip_param(origin_ip)),
        ];
        Ok(self.call_gateway("edit_subscription", params).await)
    }

    /// Cancels a subscription; the tokenized card itself survives.
    pub async fn remove_subscription(
        &self,
        user: &TokenizedUser,
        origin_ip: Option<IpAddr>,
    ) -> CustomResult<GatewayResponse, BankStoreError> {
        Ok(self
            .call_gateway("remove_subscription", self.user_params(user, origin_ip))
            .await)
    }

    /// Creates a subscription on a previously tokenized card.
    #[allow(clippy::too_many_arguments)]
    pub async fn create_subscription_token(
        &self,
        user: &TokenizedUser,
        schedule: &SubscriptionSchedule,
        reference: &str,
        amount: i64,
        currency: &str,
        scoring: Option<u32>,
        origin_ip: Option<IpAddr>,
    ) -> CustomResult<GatewayResponse, BankStoreError> {
        let signature = self.sign(&[
            &self.settings.merchant_code,
            &user.id_user,
            user.token_user.peek(),
            &self.settings.terminal,
            &amount.to_string(),
            currency,
        ]);
        let mut params = vec![
            (ds::MERCHANT_CODE, self.settings.merchant_code.clone()),
            (ds::TERMINAL, self.settings.terminal.clone()),
            (ds::ID_USER, user.id_user.clone()),
            (ds::TOKEN_USER, user.token_user.peek().clone()),
            (ds::SUBSCRIPTION_START, schedule.start_date.clone()),
            (ds::SUBSCRIPTION_END, schedule.end_date.clone()),
            (ds::ORDER, reference.to_string()),
            (ds::SUBSCRIPTION_PERIODICITY, schedule.periodicity.to_string()),
            (ds::AMOUNT, amount.to_string()),
            (ds::CURRENCY, currency.to_string()),
            (ds::SIGNATURE, signature),
            (ds::ORIGINAL_IP, Self::ip_param(origin_ip)),
        ];
        if let Some(scoring) = scoring {
            params.push((ds::SCORING, scoring.to_string()));
        }
        Ok(self.call_gateway("create_subscription_token", params).await)
    }

    /// Places a hold on a tokenized card without capturing.
    #[allow(clippy::too_many_arguments)]
    pub async fn create_preauthorization(
        &self,
        user: &TokenizedUser,
        amount: i64,
        reference: &str,
        currency: &str,
        description: Option<&str>,
        owner: Option<&str>,
        scoring: Option<u32>,
        origin_ip: Option<IpAddr>,
    ) -> CustomResult<GatewayResponse, BankStoreError> {
        let signature = self.sign(&[
            &self.settings.merchant_code,
            &user.id_user,
            user.token_user.peek(),
            &self.settings.terminal,
            &amount.to_string(),
            reference,
        ]);
        let mut params = vec![
            (ds::MERCHANT_CODE, self.settings.merchant_code.clone()),
            (ds::TERMINAL, self.settings.terminal.clone()),
            (ds::ID_USER, user.id_user.clone()),
            (ds::TOKEN_USER, user.token_user.peek().clone()),
            (ds::AMOUNT, amount.to_string()),
            (ds::ORDER, reference.to_string()),
            (ds::CURRENCY, currency.to_string()),
            (ds::SIGNATURE, signature),
            (ds::ORIGINAL_IP, Self::ip_param(origin_ip)),
        ];
        if let Some(description) = description {
            params.push((ds::PRODUCT_DESCRIPTION, description.to_string()));
        }
        if let Some(owner) = owner {
            params.push((ds::OWNER, owner.to_string()));
        }
        if let Some(scoring) = scoring {
            params.push((ds::SCORING, scoring.to_string()));
        }
        Ok(self.call_gateway("create_preauthorization", params).await)
    }

    /// Captures a previous preauthorization.
    pub async fn preauthorization_confirm(
        &self,
        user: &TokenizedUser,
        amount: i64,
        reference: &str,
        origin_ip: Option<IpAddr>,
    ) -> CustomResult<GatewayResponse, BankStoreError> {
        Ok(self
            .call_gateway(
                "preauthorization_confirm",
                self.preauthorization_params(user, amount, reference, origin_ip),
            )
            .await)
    }

    /// Releases a previous preauthorization.
    pub async fn preauthorization_cancel(
        &self,
        user: &TokenizedUser,
        amount: i64,
        reference: &str,
        origin_ip: Option<IpAddr>,
    ) -> CustomResult<GatewayResponse, BankStoreError> {
        Ok(self
            .call_gateway(
                "preauthorization_cancel",
                self.preauthorization_params(user, amount, reference, origin_ip),
            )
            .await)
    }

    /// Captures a deferred preauthorization. Deferred holds expire 72
    /// hours after authorization.
    pub async fn deferred_preauthorization_confirm(
        &self,
        user: &TokenizedUser,
        amount: i64,
        reference: &str,
        origin_ip: Option<IpAddr>,
    ) -> CustomResult<GatewayResponse, BankStoreError> {
        Ok(self
            .call_gateway(
                "deferred_preauthorization_confirm",
                self.preauthorization_params(user, amount, reference, origin_ip),
            )
            .await)
    }

    /// Releases a deferred preauthorization.
    pub async fn deferred_preauthorization_cancel(
        &self,
        user: &TokenizedUser,
        amount: i64,
        reference: &str,
        origin_ip: Option<IpAddr>,
    ) -> CustomResult<GatewayResponse, BankStoreError> {
        Ok(self
            .call_gateway(
                "deferred_preauthorization_cancel",
                self.preauthorization_params(user, amount, reference, origin_ip),
            )
            .await)
    }

    fn preauthorization_params(
        &self,
        user: &TokenizedUser,
        amount: i64,
        reference: &str,
        origin_ip: Option<IpAddr>,
    ) -> Vec<(&'static str, String)> {
        // Confirm/cancel signatures order reference ahead of amount,
        // unlike the creation call.
        let signature = self.sign(&[
            &self.settings.merchant_code,
            &user.id_user,
            user.token_user.peek(),
            &self.settings.terminal,
            reference,
            &amount.to_string(),
        ]);
        vec![
            (ds::MERCHANT_CODE, self.settings.merchant_code.clone()),
            (ds::TERMINAL, self.settings.terminal.clone()),
            (ds::ID_USER, user.id_user.clone()),
            (ds::TOKEN_USER, user.token_user.peek().clone()),
            (ds::AMOUNT, amount.to_string()),
            (ds::ORDER, reference.to_string()),
            (ds::SIGNATURE, signature),
            (ds::ORIGINAL_IP, Self::ip_param(origin_ip)),
        ]
    }

    /// Charges against a legacy card reference, for migrations into the
    /// gateway.
    pub async fn execute_purchase_rtoken(
        &self,
        amount: i64,
        reference: &str,
        rtoken: &str,
        currency: &str,
        description: Option<&str>,
    ) -> CustomResult<GatewayResponse, BankStoreError> {
        let signature = self.sign(&[
            &self.settings.merchant_code,
            &self.settings.terminal,
            &amount.to_string(),
            reference,
            rtoken,
        ]);
        let mut params = vec![
            (ds::MERCHANT_CODE, self.settings.merchant_code.clone()),
            (ds::TERMINAL, self.settings.terminal.clone()),
            (ds::AMOUNT, amount.to_string()),
            (ds::ORDER, reference.to_string()),
            (ds::RTOKEN, rtoken.to_string()),
            (ds::CURRENCY, currency.to_string()),
            (ds::SIGNATURE, signature),
        ];
        if let Some(description) = description {
            params.push((ds::PRODUCT_DESCRIPTION, description.to_string()));
        }
        Ok(self.call_gateway("execute_purchase_rtoken", params).await)
    }

    /// Registers a card from a temporary BankStore JET token. Requires
    /// the JET id in the settings.
    pub async fn add_user_token(
        &self,
        jet_token: &str,
        origin_ip: Option<IpAddr>,
    ) -> CustomResult<GatewayResponse, BankStoreError> {
        let jet_id = self
            .settings
            .jet_id
            .as_ref()
            .ok_or_else(|| Report::new(BankStoreError::MissingField { field: "jet_id" }))?;
        let signature = self.sign(&[
            &self.settings.merchant_code,
            jet_token,
            jet_id.peek(),
            &self.settings.terminal,
        ]);
        let params = vec![
            (ds::MERCHANT_CODE, self.settings.merchant_code.clone()),
            (ds::TERMINAL, self.settings.terminal.clone()),
            (ds::JET_TOKEN, jet_token.to_string()),
            (ds::JET_ID, jet_id.peek().clone()),
            (ds::SIGNATURE, signature),
            (ds::ORIGINAL_IP, Self::ip_param(origin_ip)),
        ];
        Ok(self.call_gateway("add_user_token", params).await)
    }

    // ------------------------------------------------------------------
    // Redirect operations (IFRAME/Fullscreen)
    // ------------------------------------------------------------------

    /// Redirect URL for a plain purchase.
    pub async fn execute_purchase_url(
        &self,
        reference: &str,
        amount: i64,
        currency: &str,
        options: RedirectOptions,
    ) -> CustomResult<GatewayResponse, BankStoreError> {
        let descriptor = options.apply(
            OperationDescriptor::new(OperationType::Purchase, reference)
                .amount(amount)
                .currency(currency),
        );
        self.redirect_flow(descriptor).await
    }

    /// Redirect URL for a purchase on a tokenized card.
    pub async fn execute_purchase_token_url(
        &self,
        reference: &str,
        amount: i64,
        currency: &str,
        user: TokenizedUser,
        options: RedirectOptions,
    ) -> CustomResult<GatewayResponse, BankStoreError> {
        let descriptor = options.apply(
            OperationDescriptor::new(OperationType::TokenPurchase, reference)
                .amount(amount)
                .currency(currency)
                .user(user),
        );
        self.redirect_flow(descriptor).await
    }

    /// Redirect URL for card registration.
    pub async fn add_user_url(
        &self,
        reference: &str,
        options: RedirectOptions,
    ) -> CustomResult<GatewayResponse, BankStoreError> {
        let descriptor =
            options.apply(OperationDescriptor::new(OperationType::UserRegistration, reference));
        self.redirect_flow(descriptor).await
    }

    /// Redirect URL for creating a subscription.
    pub async fn create_subscription_url(
        &self,
        reference: &str,
        amount: i64,
        currency: &str,
        schedule: SubscriptionSchedule,
        options: RedirectOptions,
    ) -> CustomResult<GatewayResponse, BankStoreError> {
        let descriptor = options.apply(
            OperationDescriptor::new(OperationType::Subscription, reference)
                .amount(amount)
                .currency(currency)
                .schedule(schedule),
        );
        self.redirect_flow(descriptor).await
    }

    /// Redirect URL for creating a subscription on a tokenized card.
    #[allow(clippy::too_many_arguments)]
    pub async fn create_subscription_token_url(
        &self,
        reference: &str,
        amount: i64,
        currency: &str,
        schedule: SubscriptionSchedule,
        user: TokenizedUser,
        options: RedirectOptions,
    ) -> CustomResult<GatewayResponse, BankStoreError> {
        let descriptor = options.apply(
            OperationDescriptor::new(OperationType::TokenSubscription, reference)
                .amount(amount)
                .currency(currency)
                .schedule(schedule)
                .user(user),
        );
        self.redirect_flow(descriptor).await
    }

    /// Redirect URL for placing a preauthorization.
    pub async fn create_preauthorization_url(
        &self,
        reference: &str,
        amount: i64,
        currency: &str,
        options: RedirectOptions,
    ) -> CustomResult<GatewayResponse, BankStoreError> {
        let descriptor = options.apply(
            OperationDescriptor::new(OperationType::Preauthorization, reference)
                .amount(amount)
                .currency(currency),
        );
        self.redirect_flow(descriptor).await
    }

    /// Redirect URL for capturing a preauthorization held on a tokenized
    /// card. Confirms the user exists before signing.
    pub async fn preauthorization_confirm_url(
        &self,
        reference: &str,
        amount: i64,
        user: TokenizedUser,
        options: RedirectOptions,
    ) -> CustomResult<GatewayResponse, BankStoreError> {
        let descriptor = options.apply(
            OperationDescriptor::new(OperationType::PreauthorizationConfirm, reference)
                .amount(amount)
                .user(user),
        );
        self.redirect_flow(descriptor).await
    }

    /// Redirect URL for releasing a preauthorization held on a tokenized
    /// card. Confirms the user exists before signing.
    pub async fn preauthorization_cancel_url(
        &self,
        reference: &str,
        amount: i64,
        user: TokenizedUser,
        options: RedirectOptions,
    ) -> CustomResult<GatewayResponse, BankStoreError> {
        let descriptor = options.apply(
            OperationDescriptor::new(OperationType::PreauthorizationCancel, reference)
                .amount(amount)
                .user(user),
        );
        self.redirect_flow(descriptor).await
    }

    /// Redirect URL for a preauthorization on a tokenized card. Confirms
    /// the user exists before signing.
    pub async fn execute_preauthorization_token_url(
        &self,
        reference: &str,
        amount: i64,
        currency: &str,
        user: TokenizedUser,
        options: RedirectOptions,
    ) -> CustomResult<GatewayResponse, BankStoreError> {
        let descriptor = options.apply(
            OperationDescriptor::new(OperationType::TokenPreauthorization, reference)
                .amount(amount)
                .currency(currency)
                .user(user),
        );
        self.redirect_flow(descriptor).await
    }

    /// Redirect URL for a deferred preauthorization.
    pub async fn deferred_preauthorization_url(
        &self,
        reference: &str,
        amount: i64,
        currency: &str,
        options: RedirectOptions,
    ) -> CustomResult<GatewayResponse, BankStoreError> {
        let descriptor = options.apply(
            OperationDescriptor::new(OperationType::DeferredPreauthorization, reference)
                .amount(amount)
                .currency(currency),
        );
        self.redirect_flow(descriptor).await
    }

    /// Redirect URL for capturing a deferred preauthorization. Confirms
    /// the user exists before signing.
    pub async fn deferred_preauthorization_confirm_url(
        &self,
        reference: &str,
        amount: i64,
        user: TokenizedUser,
        options: RedirectOptions,
    ) -> CustomResult<GatewayResponse, BankStoreError> {
        let descriptor = options.apply(
            OperationDescriptor::new(OperationType::DeferredPreauthorizationConfirm, reference)
                .amount(amount)
                .user(user),
        );
        self.redirect_flow(descriptor).await
    }

    /// Redirect URL for releasing a deferred preauthorization. Confirms
    /// the user exists before signing.
    pub async fn deferred_preauthorization_cancel_url(
        &self,
        reference: &str,
        amount: i64,
        user: TokenizedUser,
        options: RedirectOptions,
    ) -> CustomResult<GatewayResponse, BankStoreError> {
        let descriptor = options.apply(
            OperationDescriptor::new(OperationType::DeferredPreauthorizationCancel, reference)
                .amount(amount)
                .user(user),
        );
        self.redirect_flow(descriptor).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use error_stack::Report;

    use hyperswitch_masking::Secret;

    use super::*;
    use crate::{consts, transport::GatewayAnswer, types::PaymentResult};

    type RecordedCall = (String, Vec<(String, String)>);

    /// In-memory transport: records calls, replays canned answers.
    struct StubTransport {
        answers: Mutex<Vec<Result<GatewayAnswer, TransportError>>>,
        calls: Mutex<Vec<RecordedCall>>,
    }

    impl StubTransport {
        fn replying(answers: Vec<Result<GatewayAnswer, TransportError>>) -> Self {
            Self {
                answers: Mutex::new(answers),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn answer(pairs: &[(&str, &str)]) -> GatewayAnswer {
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect()
        }

        fn calls(&self) -> Vec<RecordedCall> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl GatewayTransport for StubTransport {
        async fn call(
            &self,
            operation: &str,
            params: &[(&'static str, String)],
        ) -> crate::errors::CustomResult<GatewayAnswer, TransportError> {
            self.calls.lock().unwrap().push((
                operation.to_string(),
                params
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.clone()))
                    .collect(),
            ));
            match self.answers.lock().unwrap().remove(0) {
                Ok(answer) => Ok(answer),
                Err(error) => Err(Report::new(error)),
            }
        }
    }

    fn settings() -> MerchantSettings {
        MerchantSettings::new("MC001", "1", Secret::new("secret".to_string()))
    }

    fn client_with(
        transport: StubTransport,
    ) -> BankStoreClient<StubTransport> {
        BankStoreClient::with_transport(settings(), transport).unwrap()
    }

    fn user() -> TokenizedUser {
        TokenizedUser::new("42", Secret::new("tok_9".to_string()))
    }

    fn param<'a>(params: &'a [(String, String)], key: &str) -> &'a str {
        params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .unwrap_or_else(|| panic!("missing param {key}"))
    }

    #[tokio::test]
    async fn execute_purchase_sends_the_signed_parameter_set() {
        let transport = StubTransport::replying(vec![Ok(StubTransport::answer(&[
            ("DS_ERROR_ID", "0"),
            ("DS_MERCHANT_AUTHCODE", "A1"),
        ]))]);
        let client = client_with(transport);

        let response = client
            .execute_purchase(&user(), 1000, "ORD-1", "EUR", None, None, None, None)
            .await
            .unwrap();
        assert_eq!(response.result, PaymentResult::Ok);
        assert_eq!(response.fields["DS_MERCHANT_AUTHCODE"], "A1");

        let calls = client.transport.calls();
        assert_eq!(calls.len(), 1);
        let (operation, params) = &calls[0];
        assert_eq!(operation, "execute_purchase");
        assert_eq!(param(params, "DS_MERCHANT_AMOUNT"), "1000");
        assert_eq!(param(params, "DS_MERCHANT_ORDER"), "ORD-1");
        // sha1("MC001" + "42" + "tok_9" + "1" + "1000" + "ORD-1" + "secret")
        assert_eq!(
            param(params, "DS_MERCHANT_MERCHANTSIGNATURE"),
            "3991204f93a32a93541451ffda21691510dffbaa"
        );
    }

    #[tokio::test]
    async fn transport_failure_normalizes_to_the_connectivity_sentinel() {
        let transport =
            StubTransport::replying(vec![Err(TransportError::ConnectionFailure)]);
        let client = client_with(transport);

        let response = client.info_user(&user(), None).await.unwrap();
        assert_eq!(response.result, PaymentResult::Ko);
        assert_eq!(response.error_id, consts::ERROR_COULD_NOT_CONNECT);
    }

    #[tokio::test]
    async fn gateway_business_errors_pass_through_unmodified() {
        let transport = StubTransport::replying(vec![Ok(StubTransport::answer(&[(
            "DS_ERROR_ID", "127",
        )]))]);
        let client = client_with(transport);

        let response = client.remove_user(&user(), None).await.unwrap();
        assert_eq!(response.result, PaymentResult::Ko);
        assert_eq!(response.error_id, 127);
    }

    #[tokio::test]
    async fn add_user_token_requires_a_configured_jet_id() {
        let transport = StubTransport::replying(vec![]);
        let client = client_with(transport);

        let err = client.add_user_token("jtok", None).await.unwrap_err();
        assert!(matches!(
            err.current_context(),
            BankStoreError::MissingField { field: "jet_id" }
        ));
    }

    #[tokio::test]
    async fn add_user_token_signs_with_the_jet_id() {
        let transport = StubTransport::replying(vec![Ok(StubTransport::answer(&[(
            "DS_ERROR_ID", "0",
        )]))]);
        let client = BankStoreClient::with_transport(
            settings().with_jet_id(Secret::new("JET1".to_string())),
            transport,
        )
        .unwrap();

        client.add_user_token("jtok", None).await.unwrap();
        let calls = client.transport.calls();
        let (_, params) = &calls[0];
        // sha1("MC001" + "jtok" + "JET1" + "1" + "secret")
        assert_eq!(
            param(params, "DS_MERCHANT_MERCHANTSIGNATURE"),
            "fe8409adc71ac5f7f67ef4e880983e199718d357"
        );
    }

    #[tokio::test]
    async fn card_entry_points_strip_whitespace_before_signing() {
        let transport = StubTransport::replying(vec![Ok(StubTransport::answer(&[(
            "DS_ERROR_ID", "0",
        )]))]);
        let client = client_with(transport);

        let card = CardDetails {
            pan: Secret::new("4111 1111 1111 1111".to_string()),
            expiry_date: Secret::new("12 29".to_string()),
            cvv: Secret::new("123".to_string()),
        };
        client.add_user(&card, None).await.unwrap();

        let calls = client.transport.calls();
        let (_, params) = &calls[0];
        assert_eq!(param(params, "DS_MERCHANT_PAN"), "4111111111111111");
        assert_eq!(param(params, "DS_MERCHANT_EXPIRYDATE"), "1229");
        // sha1("MC001" + "4111111111111111" + "123" + "1" + "secret")
        assert_eq!(
            param(params, "DS_MERCHANT_MERCHANTSIGNATURE"),
            "6fbcfb631a68dd32f21adcf617503738d512c383"
        );
    }

    async fn redirect_client(
        body: &str,
        transport: StubTransport,
    ) -> (mockito::ServerGuard, BankStoreClient<StubTransport>) {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", mockito::Matcher::Any)
            .with_body(body)
            .create_async()
            .await;
        let mut settings = settings();
        settings.iframe_endpoint = format!("{}/?", server.url());
        let client = BankStoreClient::with_transport(settings, transport).unwrap();
        (server, client)
    }

    #[tokio::test]
    async fn purchase_url_returns_a_verified_redirect() {
        let (_server, client) =
            redirect_client("<html>form</html>", StubTransport::replying(vec![])).await;

        let response = client
            .execute_purchase_url("ORD-1", 1000, "EUR", RedirectOptions::default())
            .await
            .unwrap();
        assert_eq!(response.result, PaymentResult::Ok);
        assert_eq!(response.error_id, 0);

        let url = response.url_redirect.unwrap();
        assert!(url.contains("MERCHANT_ORDER=ORD-1"));
        assert!(url.contains("MERCHANT_AMOUNT=1000"));
        assert!(url.contains("VHASH="));
    }

    #[tokio::test]
    async fn failed_preflight_still_hands_back_the_url() {
        let (_server, client) =
            redirect_client("<!-- Error: 1100 -->", StubTransport::replying(vec![])).await;

        let response = client
            .execute_purchase_url("ORD-1", 1000, "EUR", RedirectOptions::default())
            .await
            .unwrap();
        assert_eq!(response.result, PaymentResult::Ko);
        assert_eq!(response.error_id, 1100);
        assert!(response.url_redirect.is_some());
    }

    #[tokio::test]
    async fn preauthorization_confirm_url_checks_the_user_first() {
        let transport = StubTransport::replying(vec![Ok(StubTransport::answer(&[(
            "DS_ERROR_ID", "0",
        )]))]);
        let (_server, client) = redirect_client("<html>form</html>", transport).await;

        let response = client
            .preauthorization_confirm_url("ORD-6", 700, user(), RedirectOptions::default())
            .await
            .unwrap();
        assert_eq!(response.result, PaymentResult::Ok);

        let calls = client.transport.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "info_user");
    }

    #[tokio::test]
    async fn failed_user_lookup_short_circuits_before_signing() {
        let transport = StubTransport::replying(vec![Ok(StubTransport::answer(&[(
            "DS_ERROR_ID", "130",
        )]))]);
        let (_server, client) = redirect_client("<html>form</html>", transport).await;

        let response = client
            .preauthorization_cancel_url("ORD-4", 700, user(), RedirectOptions::default())
            .await
            .unwrap();
        assert_eq!(response.result, PaymentResult::Ko);
        assert_eq!(response.error_id, 130);
        assert!(response.url_redirect.is_none());
    }

    #[tokio::test]
    async fn signing_failures_are_loud() {
        let (_server, client) =
            redirect_client("<html>form</html>", StubTransport::replying(vec![])).await;

        // Scoring does not apply to card registration.
        let err = client
            .add_user_url(
                "REF-7",
                RedirectOptions {
                    scoring: Some(10),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err.current_context(),
            BankStoreError::InvalidArgument { .. }
        ));
    }
}
