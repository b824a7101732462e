//! Remote key sources: OpenID discovery and JWKS endpoints.
//!
//! The discovery document is fetched once, when the key source for an issuer
//! is created. The JWKS it points to is fetched lazily and cached:
//!
//! - Cached keys are served for [`JWKS_CACHE_TTL`]
//! - A token whose `kid` is not in the cached set triggers a refetch, at most
//!   once per [`MIN_REFETCH_INTERVAL`], so rotated keys are picked up without
//!   letting unknown key ids hammer the identity provider
//! - Concurrent refreshes are coalesced behind a renewal permit
//!
//! Every request carries the configured timeouts and a response size limit.

use crate::config::HttpLimits;
use crate::errors::ValidationError;
use crate::keys::key_set::KeySet;
use arc_swap::ArcSwapOption;
use jsonwebtoken::{Algorithm, DecodingKey};
use reqwest::header::ACCEPT;
use security_common::endpoint::{join_url, replace_host_and_port};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::instrument;

/// How long a fetched JWKS is served before it is refetched.
pub const JWKS_CACHE_TTL: Duration = Duration::from_secs(300);

/// Minimum age of the cached JWKS before an unknown `kid` may trigger a
/// refetch.
pub const MIN_REFETCH_INTERVAL: Duration = Duration::from_secs(30);

const DISCOVERY_PATH: &str = "/.well-known/openid-configuration";

/// Build the HTTP client shared by every remote key source.
pub(crate) fn http_client(limits: HttpLimits) -> reqwest::Client {
    reqwest::Client::builder()
        .connect_timeout(limits.connect_timeout)
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!(
                target: "server.keys",
                error = %e,
                "Failed to build HTTP client with custom config, using defaults"
            );
            reqwest::Client::new()
        })
}

/// GET `url` and return the body, enforcing timeouts and the size limit.
///
/// Transport failures and error statuses are `KeySourceUnavailable`; an
/// oversized body is `KeyResolution`.
pub(crate) async fn fetch_limited(
    http: &reqwest::Client,
    url: &str,
    limits: HttpLimits,
) -> Result<Vec<u8>, ValidationError> {
    let mut response = http
        .get(url)
        .header(ACCEPT, "application/json")
        .timeout(limits.connect_timeout + limits.read_timeout)
        .send()
        .await
        .map_err(|e| {
            tracing::error!(
                target: "server.keys",
                url = %url,
                error = %e,
                "Request to identity provider failed"
            );
            ValidationError::KeySourceUnavailable(format!("request to {url} failed: {e}"))
        })?;

    let status = response.status();
    if !status.is_success() {
        tracing::error!(
            target: "server.keys",
            url = %url,
            status = %status,
            "Identity provider returned error"
        );
        return Err(ValidationError::KeySourceUnavailable(format!(
            "{url} returned status {status}"
        )));
    }

    let limit = limits.size_limit;
    let too_large =
        || ValidationError::KeyResolution(format!("response from {url} exceeds {limit} bytes"));

    if response
        .content_length()
        .is_some_and(|length| length > u64::try_from(limit).unwrap_or(u64::MAX))
    {
        return Err(too_large());
    }

    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await.map_err(|e| {
        tracing::error!(
            target: "server.keys",
            url = %url,
            error = %e,
            "Failed to read identity provider response"
        );
        ValidationError::KeySourceUnavailable(format!("reading response from {url} failed: {e}"))
    })? {
        if body.len() + chunk.len() > limit {
            return Err(too_large());
        }
        body.extend_from_slice(&chunk);
    }

    Ok(body)
}

/// Resolve the JWKS endpoint of an identity provider from its discovery
/// document.
///
/// A relative `jwks_uri` is appended to the issuer URL. With
/// `replace_internal_host` set, the endpoint's host and port are replaced
/// with the issuer's, for providers that advertise an address the broker
/// cannot reach.
///
/// # Errors
///
/// `KeySourceUnavailable` if the document cannot be fetched, `KeyResolution`
/// if it has no usable `jwks_uri`.
#[instrument(skip_all, fields(issuer = %issuer))]
pub async fn discover_jwks_uri(
    http: &reqwest::Client,
    issuer: &str,
    limits: HttpLimits,
    replace_internal_host: bool,
) -> Result<String, ValidationError> {
    let discovery_url = join_url(issuer, DISCOVERY_PATH).map_err(|e| {
        ValidationError::KeySourceUnavailable(format!("invalid issuer URL {issuer}: {e}"))
    })?;

    let body = fetch_limited(http, &discovery_url, limits).await?;
    let document: Value = serde_json::from_slice(&body).map_err(|e| {
        ValidationError::KeyResolution(format!(
            "invalid discovery document from {discovery_url}: {e}"
        ))
    })?;

    let jwks_uri = document
        .get("jwks_uri")
        .and_then(Value::as_str)
        .filter(|uri| !uri.is_empty())
        .ok_or_else(|| {
            ValidationError::KeyResolution(
                "jwks_uri does not present in openid configuration".to_string(),
            )
        })?;

    let mut jwks_uri = if jwks_uri.starts_with('/') {
        join_url(issuer, jwks_uri).map_err(|e| {
            ValidationError::KeySourceUnavailable(format!("invalid jwks_uri {jwks_uri}: {e}"))
        })?
    } else {
        jwks_uri.to_string()
    };

    if replace_internal_host {
        jwks_uri = replace_host_and_port(&jwks_uri, issuer).map_err(|e| {
            ValidationError::KeySourceUnavailable(format!(
                "cannot rewrite jwks_uri {jwks_uri}: {e}"
            ))
        })?;
    }

    tracing::trace!(
        target: "server.keys",
        jwks_uri = %jwks_uri,
        "JWKS URI from openid configuration"
    );
    Ok(jwks_uri)
}

struct CachedKeySet {
    keys: KeySet,
    retrieved_at: Instant,
}

/// A JWKS endpoint with a refreshing key cache.
pub struct RemoteJwks {
    jwks_uri: String,
    http: reqwest::Client,
    limits: HttpLimits,
    cached: ArcSwapOption<CachedKeySet>,
    renewal: Mutex<()>,
}

impl RemoteJwks {
    pub fn new(jwks_uri: String, http: reqwest::Client, limits: HttpLimits) -> Self {
        Self {
            jwks_uri,
            http,
            limits,
            cached: ArcSwapOption::empty(),
            renewal: Mutex::new(()),
        }
    }

    pub fn jwks_uri(&self) -> &str {
        &self.jwks_uri
    }

    /// Keys matching `algorithm` and `kid`, fetching or refreshing the set
    /// as needed. An empty result means no key matched.
    ///
    /// # Errors
    ///
    /// Returns the fetch error if keys had to be fetched and could not be.
    pub async fn select(
        &self,
        algorithm: Algorithm,
        kid: Option<&str>,
    ) -> Result<Vec<DecodingKey>, ValidationError> {
        let current = self.current().await?;
        let found = current.keys.select(algorithm, kid);
        if !found.is_empty() || current.retrieved_at.elapsed() < MIN_REFETCH_INTERVAL {
            return Ok(found);
        }

        tracing::debug!(
            target: "server.keys",
            kid = ?kid,
            jwks_uri = %self.jwks_uri,
            "Key not found in cached JWKS, refetching"
        );
        let refreshed = self.renew(Some(current.retrieved_at)).await?;
        Ok(refreshed.keys.select(algorithm, kid))
    }

    async fn current(&self) -> Result<Arc<CachedKeySet>, ValidationError> {
        if let Some(cached) = self.cached.load_full() {
            if cached.retrieved_at.elapsed() < JWKS_CACHE_TTL {
                return Ok(cached);
            }
        }
        self.renew(None).await
    }

    /// Fetch the JWKS unless another task already replaced the set we saw.
    async fn renew(&self, seen: Option<Instant>) -> Result<Arc<CachedKeySet>, ValidationError> {
        let _permit = self.renewal.lock().await;

        if let Some(cached) = self.cached.load_full() {
            let renewed_meanwhile = match seen {
                Some(seen) => cached.retrieved_at > seen,
                None => cached.retrieved_at.elapsed() < JWKS_CACHE_TTL,
            };
            if renewed_meanwhile {
                return Ok(cached);
            }
        }

        let body = fetch_limited(&self.http, &self.jwks_uri, self.limits).await?;
        let keys = KeySet::from_jwks_json(&body).map_err(ValidationError::KeyResolution)?;

        tracing::info!(
            target: "server.keys",
            jwks_uri = %self.jwks_uri,
            key_count = keys.len(),
            "JWKS cache refreshed"
        );

        let entry = Arc::new(CachedKeySet {
            keys,
            retrieved_at: Instant::now(),
        });
        self.cached.store(Some(Arc::clone(&entry)));
        Ok(entry)
    }
}
