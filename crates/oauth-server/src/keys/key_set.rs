//! Verification key sets and key selection.
//!
//! Keys are converted to [`DecodingKey`]s once when a set is loaded. A token
//! selects candidates by algorithm family and key id; key ids are matched
//! against both the token's casing and its lowercase form, because keystore
//! aliases are lowercase.

use jsonwebtoken::jwk::{
    AlgorithmParameters, EllipticCurve, Jwk, KeyAlgorithm, PublicKeyUse,
};
use jsonwebtoken::{Algorithm, DecodingKey};
use serde_json::Value;

/// Key type and curve, which together decide the usable algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyFamily {
    Rsa,
    EcP256,
    EcP384,
    /// EC key whose curve is not known (PEM input).
    Ec,
    Ed25519,
}

impl KeyFamily {
    pub fn supports(self, algorithm: Algorithm) -> bool {
        use Algorithm::{EdDSA, ES256, ES384, PS256, PS384, PS512, RS256, RS384, RS512};
        match self {
            KeyFamily::Rsa => matches!(algorithm, RS256 | RS384 | RS512 | PS256 | PS384 | PS512),
            KeyFamily::EcP256 => algorithm == ES256,
            KeyFamily::EcP384 => algorithm == ES384,
            KeyFamily::Ec => matches!(algorithm, ES256 | ES384),
            KeyFamily::Ed25519 => algorithm == EdDSA,
        }
    }

    fn of_jwk(jwk: &Jwk) -> Option<Self> {
        match &jwk.algorithm {
            AlgorithmParameters::RSA(_) => Some(KeyFamily::Rsa),
            AlgorithmParameters::EllipticCurve(params) => match params.curve {
                EllipticCurve::P256 => Some(KeyFamily::EcP256),
                EllipticCurve::P384 => Some(KeyFamily::EcP384),
                _ => None,
            },
            AlgorithmParameters::OctetKeyPair(params) => {
                matches!(params.curve, EllipticCurve::Ed25519).then_some(KeyFamily::Ed25519)
            }
            _ => None,
        }
    }
}

/// Algorithm a JWK is pinned to via its `alg` member, when it is one we
/// can verify with.
fn declared_algorithm(jwk: &Jwk) -> Option<Algorithm> {
    let declared = jwk.common.key_algorithm.as_ref()?;
    match declared {
        KeyAlgorithm::RS256 => Some(Algorithm::RS256),
        KeyAlgorithm::RS384 => Some(Algorithm::RS384),
        KeyAlgorithm::RS512 => Some(Algorithm::RS512),
        KeyAlgorithm::PS256 => Some(Algorithm::PS256),
        KeyAlgorithm::PS384 => Some(Algorithm::PS384),
        KeyAlgorithm::PS512 => Some(Algorithm::PS512),
        KeyAlgorithm::ES256 => Some(Algorithm::ES256),
        KeyAlgorithm::ES384 => Some(Algorithm::ES384),
        _ => None,
    }
}

/// A key usable for signature verification.
#[derive(Clone)]
pub struct VerificationKey {
    pub key_id: Option<String>,
    pub family: KeyFamily,
    /// Algorithm pinned by the key itself, if any.
    pub algorithm: Option<Algorithm>,
    pub key: DecodingKey,
}

impl VerificationKey {
    fn matches(&self, algorithm: Algorithm, kid_candidates: Option<&[String; 2]>) -> bool {
        if !self.family.supports(algorithm) {
            return false;
        }
        if self.algorithm.is_some_and(|pinned| pinned != algorithm) {
            return false;
        }
        match (kid_candidates, &self.key_id) {
            (None, _) => true,
            (Some(candidates), Some(key_id)) => candidates.iter().any(|c| c == key_id),
            (Some(_), None) => false,
        }
    }
}

impl std::fmt::Debug for VerificationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerificationKey")
            .field("key_id", &self.key_id)
            .field("family", &self.family)
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

/// An immutable set of verification keys.
#[derive(Debug, Clone, Default)]
pub struct KeySet {
    keys: Vec<VerificationKey>,
}

impl KeySet {
    pub fn new(keys: Vec<VerificationKey>) -> Self {
        Self { keys }
    }

    /// Build a key set from a JWKS document.
    ///
    /// Individual keys that cannot be used for signature verification
    /// (encryption keys, symmetric keys, unknown curves or algorithms) are
    /// skipped rather than failing the whole set.
    ///
    /// # Errors
    ///
    /// Returns a description if the document is not JSON or has no `keys`
    /// array.
    pub fn from_jwks_json(bytes: &[u8]) -> Result<Self, String> {
        let document: Value =
            serde_json::from_slice(bytes).map_err(|e| format!("invalid JWKS JSON: {e}"))?;
        let Some(entries) = document.get("keys").and_then(Value::as_array) else {
            return Err("JWKS document has no 'keys' array".to_string());
        };

        let mut keys = Vec::with_capacity(entries.len());
        for entry in entries {
            let jwk: Jwk = match serde_json::from_value(entry.clone()) {
                Ok(jwk) => jwk,
                Err(e) => {
                    tracing::debug!(target: "server.keys", error = %e, "Skipping unparseable JWK");
                    continue;
                }
            };
            if matches!(jwk.common.public_key_use, Some(PublicKeyUse::Encryption)) {
                continue;
            }
            let Some(family) = KeyFamily::of_jwk(&jwk) else {
                tracing::debug!(
                    target: "server.keys",
                    kid = ?jwk.common.key_id,
                    "Skipping JWK with unsupported key type"
                );
                continue;
            };
            match DecodingKey::from_jwk(&jwk) {
                Ok(key) => keys.push(VerificationKey {
                    key_id: jwk.common.key_id.clone(),
                    family,
                    algorithm: declared_algorithm(&jwk),
                    key,
                }),
                Err(e) => {
                    tracing::debug!(
                        target: "server.keys",
                        kid = ?jwk.common.key_id,
                        error = %e,
                        "Skipping JWK that cannot be converted to a verification key"
                    );
                }
            }
        }

        Ok(Self { keys })
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Keys usable for `algorithm` whose id matches `kid` or its lowercase
    /// form. Without a `kid`, every key of the right family is a candidate.
    pub fn select(&self, algorithm: Algorithm, kid: Option<&str>) -> Vec<DecodingKey> {
        let candidates = kid.map(|kid| [kid.to_string(), kid.to_lowercase()]);
        self.keys
            .iter()
            .filter(|key| key.matches(algorithm, candidates.as_ref()))
            .map(|key| key.key.clone())
            .collect()
    }
}
