//! Secret types for credentials that must never reach a log line.
//!
//! Keystore passwords, OAuth client secrets and raw bearer tokens are held
//! as [`SecretString`]. Its `Debug` output is redacted, so configuration
//! structs can derive `Debug` and still be logged safely; reading the value
//! requires an explicit `expose_secret()` call at the point of use.
//!
//! ```rust
//! use security_common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct ClientCredentials {
//!     client_id: String,
//!     client_secret: SecretString,
//! }
//!
//! let creds = ClientCredentials {
//!     client_id: "kafka-broker".to_string(),
//!     client_secret: SecretString::from("s3cr3t"),
//! };
//!
//! assert!(!format!("{creds:?}").contains("s3cr3t"));
//! assert_eq!(creds.client_secret.expose_secret(), "s3cr3t");
//! ```

pub use secrecy::{ExposeSecret, SecretString};

/// Placeholder used by hand-written `Debug` impls for redacted fields.
pub const REDACTED: &str = "[REDACTED]";
