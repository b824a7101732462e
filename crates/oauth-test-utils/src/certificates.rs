//! Self-signed certificate fixtures for keystore tests
//!
//! Local keystores hold X.509 certificates rather than bare keys. A
//! [`TestCertificate`] is a fresh ECDSA P-256 certificate that can be packed
//! into a PKCS#12 trust store and used to sign ES256 tokens.

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use p12_keystore::{Certificate, KeyStore, KeyStoreEntry};
use serde_json::Value;

/// A self-signed ECDSA P-256 certificate and its private key.
pub struct TestCertificate {
    cert_der: Vec<u8>,
    private_key_pem: String,
}

impl TestCertificate {
    /// Generate a new certificate for `subject`.
    ///
    /// # Panics
    ///
    /// Panics if certificate generation fails.
    pub fn new(subject: &str) -> Self {
        let rcgen::CertifiedKey { cert, key_pair } =
            rcgen::generate_simple_self_signed(vec![subject.to_string()])
                .expect("Failed to generate test certificate");

        Self {
            cert_der: cert.der().to_vec(),
            private_key_pem: key_pair.serialize_pem(),
        }
    }

    /// DER encoding of the certificate.
    pub fn der(&self) -> &[u8] {
        &self.cert_der
    }

    /// Sign claims as an ES256 JWT with the given kid.
    pub fn sign_token(&self, kid: &str, claims: &Value) -> String {
        let mut header = Header::new(Algorithm::ES256);
        header.kid = Some(kid.to_string());
        let key = EncodingKey::from_ec_pem(self.private_key_pem.as_bytes())
            .expect("Failed to load test private key");
        encode(&header, claims, &key).expect("Failed to sign token")
    }

    /// A PKCS#12 trust store holding this certificate under `alias`.
    pub fn pkcs12(&self, alias: &str, password: &str) -> Vec<u8> {
        let certificate =
            Certificate::from_der(&self.cert_der).expect("Failed to parse test certificate");
        let mut store = KeyStore::new();
        store.add_entry(alias, KeyStoreEntry::Certificate(certificate));
        store
            .writer(password)
            .write()
            .expect("Failed to write PKCS#12 store")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pkcs12_round_trips_with_password() {
        let cert = TestCertificate::new("broker");
        let bytes = cert.pkcs12("Broker", "changeit");

        let store = KeyStore::from_pkcs12(&bytes, "changeit").unwrap();
        assert_eq!(store.entries().count(), 1);
        assert!(KeyStore::from_pkcs12(&bytes, "wrong").is_err());
    }
}
