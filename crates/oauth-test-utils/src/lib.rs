//! # OAuth Test Utilities
//!
//! Shared test utilities for the OAuth security crates.
//!
//! This crate provides:
//! - Deterministic Ed25519 keypairs (fixed seeds for reproducible tests)
//! - Self-signed certificates packed into PKCS#12 trust stores
//! - JWK, JWKS and PEM renderings of those keys for mocked key sources
//! - A claims builder producing identity-provider-shaped token payloads
//!
//! ## Usage
//!
//! ```rust,ignore
//! use oauth_test_utils::*;
//!
//! let keypair = TestKeypair::new(1, "kafka-key");
//! let claims = TestTokenBuilder::new()
//!     .for_user("alice")
//!     .issued_by("http://idp:8080/realms/kafka")
//!     .with_roles(&["producer"])
//!     .build();
//! let raw = keypair.sign_token(&claims);
//! ```

pub mod certificates;
pub mod crypto_fixtures;
pub mod token_builders;

pub use certificates::*;
pub use crypto_fixtures::*;
pub use token_builders::*;
