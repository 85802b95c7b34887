//! Error taxonomy for the BankStore client.
//!
//! Signing and composition failures are programming or configuration
//! errors and surface as explicit reports; gateway business errors travel
//! inside [`GatewayResponse`](crate::response::GatewayResponse) untouched.

use error_stack::Report;

/// Result alias used across the crate.
pub type CustomResult<T, E> = Result<T, Report<E>>;

/// Failures raised while building, signing or composing a redirect
/// request.
#[derive(Debug, thiserror::Error)]
pub enum BankStoreError {
    /// A numeric operation-type code outside the supported table.
    #[error("Unsupported operation type code: {code}")]
    UnsupportedOperation { code: u16 },

    /// A field required by the selected operation type was not provided.
    #[error("Missing required field: {field}")]
    MissingField { field: &'static str },

    /// A caller-supplied argument does not apply to the selected
    /// operation type or failed coercion.
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// The composed query string could not be produced.
    #[error("Failed to encode request parameters")]
    RequestEncodingFailed,
}

/// Failures on the remote-procedure transport. These are recovered by the
/// façade and normalized to the connectivity sentinel; they never escape
/// to callers as raw reports.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Failed to construct the HTTP client")]
    ClientConstructionFailed,

    #[error("Failed to reach the gateway host")]
    ConnectionFailure,

    #[error("Gateway call timed out")]
    Timeout,

    #[error("Gateway returned a fault: {detail}")]
    Fault { detail: String },

    #[error("Failed to decode the gateway answer")]
    ResponseDeserializationFailed,
}

/// Failures while loading merchant settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Failed to read configuration source")]
    ConfigSource,

    #[error("Configuration is missing or malformed: {message}")]
    InvalidConfig { message: String },
}
