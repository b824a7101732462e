//! Per-issuer verification key sources.
//!
//! The [`KeySourceCache`] creates one [`KeySource`] per resolved issuer URL
//! and keeps it for the life of the process. Creation (a discovery fetch or
//! a keystore load) runs without any lock held; when two tasks race for the
//! same issuer, the first insert wins and the loser adopts it.

pub mod key_set;
pub mod keystore;
pub mod remote;

use crate::config::{HttpLimits, KeySourceSettings, ValidatorConfig};
use crate::errors::ValidationError;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use jsonwebtoken::{Algorithm, DecodingKey};
use key_set::KeySet;
use remote::RemoteJwks;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::instrument;

/// Source of verification keys for one issuer.
#[derive(Clone)]
pub enum KeySource {
    /// Keys discovered from the issuer and fetched on demand.
    Remote(Arc<RemoteJwks>),
    /// A local keystore, shared by every issuer.
    Local(Arc<KeySet>),
}

impl KeySource {
    /// Candidate keys for `algorithm` and `kid`. Empty if none match.
    ///
    /// # Errors
    ///
    /// Remote sources fail if the JWKS cannot be fetched or parsed.
    pub async fn select(
        &self,
        algorithm: Algorithm,
        kid: Option<&str>,
    ) -> Result<Vec<DecodingKey>, ValidationError> {
        match self {
            KeySource::Remote(jwks) => jwks.select(algorithm, kid).await,
            KeySource::Local(keys) => Ok(keys.select(algorithm, kid)),
        }
    }

    /// Whether both handles refer to the same underlying source.
    pub fn same_source(&self, other: &KeySource) -> bool {
        match (self, other) {
            (KeySource::Remote(a), KeySource::Remote(b)) => Arc::ptr_eq(a, b),
            (KeySource::Local(a), KeySource::Local(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Insert-if-absent cache of key sources keyed by issuer base URL.
pub struct KeySourceCache {
    settings: KeySourceSettings,
    limits: HttpLimits,
    replace_internal_host: bool,
    http: reqwest::Client,
    sources: DashMap<String, KeySource>,
    keystore: OnceCell<Arc<KeySet>>,
}

impl KeySourceCache {
    pub fn new(config: &ValidatorConfig) -> Self {
        Self {
            settings: config.key_source.clone(),
            limits: config.http,
            replace_internal_host: config.replace_internal_host,
            http: remote::http_client(config.http),
            sources: DashMap::new(),
            keystore: OnceCell::new(),
        }
    }

    /// Number of issuers with a key source.
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// The key source for `issuer`, creating it on first use.
    ///
    /// A failed creation is not cached; the next call tries again.
    ///
    /// # Errors
    ///
    /// Returns the discovery or keystore error if the source cannot be
    /// created.
    #[instrument(skip_all, fields(issuer = %issuer))]
    pub async fn get_or_create(&self, issuer: &str) -> Result<KeySource, ValidationError> {
        if let Some(existing) = self.sources.get(issuer) {
            return Ok(existing.value().clone());
        }

        let created = self.create(issuer).await?;

        let source = match self.sources.entry(issuer.to_string()) {
            Entry::Occupied(occupied) => {
                tracing::debug!(
                    target: "server.keys",
                    issuer = %issuer,
                    "Key source created concurrently, using existing"
                );
                occupied.get().clone()
            }
            Entry::Vacant(vacant) => {
                tracing::info!(target: "server.keys", issuer = %issuer, "Key source created");
                vacant.insert(created).value().clone()
            }
        };
        Ok(source)
    }

    async fn create(&self, issuer: &str) -> Result<KeySource, ValidationError> {
        match &self.settings {
            KeySourceSettings::Keystore(settings) => {
                let keys = self
                    .keystore
                    .get_or_try_init(|| async {
                        keystore::load_keystore(settings).await.map(Arc::new)
                    })
                    .await?;
                Ok(KeySource::Local(Arc::clone(keys)))
            }
            KeySourceSettings::Jwks => {
                let jwks_uri = remote::discover_jwks_uri(
                    &self.http,
                    issuer,
                    self.limits,
                    self.replace_internal_host,
                )
                .await?;
                Ok(KeySource::Remote(Arc::new(RemoteJwks::new(
                    jwks_uri,
                    self.http.clone(),
                    self.limits,
                ))))
            }
        }
    }
}
