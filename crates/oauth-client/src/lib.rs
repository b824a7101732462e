//! Client-side OAuth login for SASL/OAUTHBEARER.
//!
//! A client exchanges its credentials at the identity provider's token
//! endpoint and presents the resulting bearer token to the broker.
//!
//! # Example
//!
//! ```rust,ignore
//! use oauth_client::{LoginCallbackHandler, OAUTHBEARER_MECHANISM};
//!
//! let handler = LoginCallbackHandler::configure(OAUTHBEARER_MECHANISM, &jaas_options)?;
//! if let Some(token) = handler.token().await? {
//!     // present token.raw() to the broker
//! }
//! ```

pub mod config;
pub mod error;
pub mod handler;
pub mod retriever;

pub use config::LoginConfig;
pub use error::LoginError;
pub use handler::{LoginCallbackHandler, OAUTHBEARER_MECHANISM};
pub use retriever::{OAuthTokenRetriever, TokenRetriever};
