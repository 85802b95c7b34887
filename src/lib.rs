//! Client library for the PAYTPV BankStore payment gateway.
//!
//! Two integration surfaces are covered:
//!
//! - **Remote procedures** (XML BankStore): card tokenization, charges,
//!   refunds, subscriptions and preauthorizations executed directly
//!   against the gateway, authenticated per call with a SHA-1 signature.
//! - **Redirect flows** (IFRAME/Fullscreen): signed URLs the end user is
//!   sent to for hosted-page card entry, covered by an MD5 operation
//!   signature plus a SHA-512 integrity hash over the composed query.
//!
//! [`BankStoreClient`] is the entry point; [`MerchantSettings`] carries
//! the terminal credentials. Card data and signing secrets are handled
//! as masked values end to end and never appear in logs or `Debug`
//! output.
//!
//! ```no_run
//! use hyperswitch_masking::Secret;
//! use paytpv_bankstore::{BankStoreClient, MerchantSettings, RedirectOptions};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let settings =
//!     MerchantSettings::new("MC001", "1", Secret::new("password".to_string()));
//! let client = BankStoreClient::new(settings)?;
//!
//! let response = client
//!     .execute_purchase_url("ORDER-1001", 1999, "EUR", RedirectOptions::default())
//!     .await?;
//! if let Some(url) = response.url_redirect {
//!     println!("send the shopper to {url}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod compose;
pub mod consts;
pub mod errors;
pub mod operation;
pub mod response;
pub mod settings;
pub mod signature;
pub mod transport;
pub mod types;
mod verify;

pub use client::{BankStoreClient, RedirectOptions};
pub use errors::{BankStoreError, CustomResult, SettingsError, TransportError};
pub use operation::{OperationDescriptor, OperationType};
pub use response::GatewayResponse;
pub use settings::MerchantSettings;
pub use transport::{GatewayAnswer, GatewayTransport, SoapTransport};
pub use types::{CardDetails, PaymentResult, SubscriptionSchedule, TokenizedUser};
