//! Local keystore loading.
//!
//! Readable formats:
//!
//! - A JWKS document
//! - A directory of PEM public keys named `<alias>.pem`
//! - A password-protected PKCS#12 trust store
//!
//! For PEM and PKCS#12 the lowercased alias is the key id. The legacy binary
//! JKS format is reported as unsupported when a token is validated.

use crate::config::{KeystoreSettings, KeystoreType};
use crate::errors::ValidationError;
use crate::keys::key_set::{KeyFamily, KeySet, VerificationKey};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use jsonwebtoken::DecodingKey;
use p12_keystore::{KeyStore, KeyStoreEntry};
use security_common::secret::{ExposeSecret, SecretString};
use std::path::Path;

/// Leading bytes of a legacy binary JKS file.
const JKS_MAGIC: [u8; 4] = [0xFE, 0xED, 0xFE, 0xED];

/// Load the configured keystore into a key set.
///
/// # Errors
///
/// Returns `ValidationError::Keystore` if the store cannot be read or its
/// type is not supported.
pub async fn load_keystore(settings: &KeystoreSettings) -> Result<KeySet, ValidationError> {
    let keys = match &settings.store_type {
        KeystoreType::Jwks => load_jwks_file(&settings.path).await?,
        KeystoreType::Pem => load_pem_dir(&settings.path).await?,
        KeystoreType::Pkcs12 | KeystoreType::Jks => {
            load_pkcs12(&settings.path, settings.password.as_ref()).await?
        }
        KeystoreType::Unsupported(store_type) => {
            return Err(ValidationError::Keystore(format!(
                "keystore type '{store_type}' is not supported, use JWKS, PEM or PKCS12"
            )))
        }
    };

    tracing::info!(
        target: "server.keys",
        path = %settings.path.display(),
        key_count = keys.len(),
        "Loaded local keystore"
    );
    Ok(keys)
}

async fn load_jwks_file(path: &Path) -> Result<KeySet, ValidationError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| {
        ValidationError::Keystore(format!("cannot read {}: {e}", path.display()))
    })?;
    KeySet::from_jwks_json(&bytes)
        .map_err(|e| ValidationError::Keystore(format!("{}: {e}", path.display())))
}

async fn load_pem_dir(dir: &Path) -> Result<KeySet, ValidationError> {
    let unreadable = |e: std::io::Error| {
        ValidationError::Keystore(format!("cannot read {}: {e}", dir.display()))
    };

    let mut entries = tokio::fs::read_dir(dir).await.map_err(unreadable)?;
    let mut keys = Vec::new();

    while let Some(entry) = entries.next_entry().await.map_err(unreadable)? {
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("pem") {
            continue;
        }
        let Some(alias) = path.file_stem().and_then(|stem| stem.to_str()) else {
            continue;
        };

        let pem = tokio::fs::read(&path).await.map_err(|e| {
            ValidationError::Keystore(format!("cannot read {}: {e}", path.display()))
        })?;

        match parse_public_pem(&pem) {
            Some((family, key)) => keys.push(VerificationKey {
                key_id: Some(alias.to_lowercase()),
                family,
                algorithm: None,
                key,
            }),
            None => {
                tracing::warn!(
                    target: "server.keys",
                    path = %path.display(),
                    "Skipping PEM file that is not an RSA, EC or Ed25519 public key"
                );
            }
        }
    }

    Ok(KeySet::new(keys))
}

async fn load_pkcs12(
    path: &Path,
    password: Option<&SecretString>,
) -> Result<KeySet, ValidationError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| {
        ValidationError::Keystore(format!("cannot read {}: {e}", path.display()))
    })?;
    if bytes.starts_with(&JKS_MAGIC) {
        return Err(ValidationError::Keystore(format!(
            "{} is a binary JKS keystore, convert it to PKCS12",
            path.display()
        )));
    }

    let password = password
        .map(|p| p.expose_secret().to_string())
        .unwrap_or_default();
    let display = path.display().to_string();

    // MAC verification runs a key derivation
    tokio::task::spawn_blocking(move || {
        let store = KeyStore::from_pkcs12(&bytes, &password).map_err(|e| {
            ValidationError::Keystore(format!("cannot open {display}: {e}"))
        })?;
        Ok::<_, ValidationError>(key_set_from_pkcs12(&store, &display))
    })
    .await
    .map_err(|e| ValidationError::Keystore(format!("keystore load task failed: {e}")))?
}

fn key_set_from_pkcs12(store: &KeyStore, path_display: &str) -> KeySet {
    let mut keys = Vec::new();

    for (alias, entry) in store.entries() {
        let KeyStoreEntry::Certificate(certificate) = entry else {
            tracing::debug!(
                target: "server.keys",
                alias = %alias,
                "Skipping non-certificate keystore entry"
            );
            continue;
        };

        match parse_public_pem(certificate_pem(certificate.as_der()).as_bytes()) {
            Some((family, key)) => keys.push(VerificationKey {
                key_id: Some(alias.to_lowercase()),
                family,
                algorithm: None,
                key,
            }),
            None => {
                tracing::warn!(
                    target: "server.keys",
                    path = %path_display,
                    alias = %alias,
                    "Skipping certificate without an RSA, EC or Ed25519 public key"
                );
            }
        }
    }

    KeySet::new(keys)
}

/// PEM armor for a DER certificate, 64 base64 characters per line.
fn certificate_pem(der: &[u8]) -> String {
    let encoded = STANDARD.encode(der);
    let mut pem = String::from("-----BEGIN CERTIFICATE-----\n");
    for line in encoded.as_bytes().chunks(64) {
        pem.push_str(&String::from_utf8_lossy(line));
        pem.push('\n');
    }
    pem.push_str("-----END CERTIFICATE-----\n");
    pem
}

fn parse_public_pem(pem: &[u8]) -> Option<(KeyFamily, DecodingKey)> {
    if let Ok(key) = DecodingKey::from_rsa_pem(pem) {
        return Some((KeyFamily::Rsa, key));
    }
    if let Ok(key) = DecodingKey::from_ec_pem(pem) {
        return Some((KeyFamily::Ec, key));
    }
    DecodingKey::from_ed_pem(pem)
        .ok()
        .map(|key| (KeyFamily::Ed25519, key))
}
