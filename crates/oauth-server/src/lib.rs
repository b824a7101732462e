//! Broker-side OAuth bearer-token validation and ACL authorization.
//!
//! # Modules
//!
//! - `config` - Option-map configuration for the validator, authorizer and audit
//! - `errors` - Validation error taxonomy and the client-facing failure
//! - `issuer` - Issuer whitelist parsing and resolution
//! - `keys` - Per-issuer verification key sources (remote JWKS or local keystore)
//! - `validator` - Token validation and authentication
//! - `principal` - Principal derivation from the authentication context
//! - `authz` - ACL model, matching and the authorization engine
//! - `audit` - Audit records and sinks

pub mod audit;
pub mod authz;
pub mod config;
pub mod errors;
pub mod issuer;
pub mod keys;
pub mod principal;
pub mod validator;

pub use authz::{AuthorizationResult, Authorizer};
pub use errors::{AuthenticationFailure, ValidationError};
pub use principal::{AuthenticationContext, Principal, PrincipalBuilder};
pub use validator::TokenValidator;
