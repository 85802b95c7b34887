//! Gateway endpoints, local sentinel error codes and protocol defaults.

/// BankStore XML (remote procedure) endpoint.
pub const XML_ENDPOINT: &str = "https://secure.paytpv.com/gateway/xml-bankstore";

/// BankStore IFRAME/Fullscreen redirect endpoint. The composed query string
/// is appended to this URL verbatim.
pub const IFRAME_ENDPOINT: &str = "https://secure.paytpv.com/gateway/ifr-bankstore?";

/// Local sentinel: the remote-procedure host could not be reached.
pub const ERROR_COULD_NOT_CONNECT: i64 = 1011;

/// Local sentinel: the pre-flight verification request failed at the
/// transport level.
pub const ERROR_VERIFICATION_UNREACHABLE: i64 = 1021;

/// Local sentinel: URL generation produced an empty query string.
pub const ERROR_URL_GENERATION: i64 = 1023;

/// Connect and total timeout applied to the pre-flight verification GET.
pub const VERIFY_TIMEOUT_SECS: u64 = 5;

/// Connect and total timeout applied to remote-procedure calls.
pub const TRANSPORT_TIMEOUT_SECS: u64 = 30;

/// Currency applied when an operation that signs over currency was built
/// without one.
pub const DEFAULT_CURRENCY: &str = "EUR";

/// Language applied to redirect pages when the caller does not pick one.
pub const DEFAULT_LANGUAGE: &str = "ES";

/// Answer field carrying the gateway error code.
pub const DS_ERROR_ID: &str = "DS_ERROR_ID";

/// Response field carrying the composed redirect URL in redirect-flow
/// responses.
pub const URL_REDIRECT: &str = "URL_REDIRECT";
