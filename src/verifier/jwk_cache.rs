//! Remote JWKS cache with single-flight refresh.
//!
//! Key sets are cached per JWKS URI and:
//! - are never served once older than the configured TTL
//! - are refetched at most once per cooldown window when a token names an
//!   unknown kid, so providers that just rotated are picked up
//! - are fetched by a single HTTP request no matter how many callers miss
//!   at the same time
//!
//! Fetches run on their own task and complete even when every caller waiting
//! on them is cancelled.

use crate::config::VerifierConfig;
use crate::error::{ConfigError, VerificationError};
use crate::metrics;
use arc_swap::ArcSwap;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use jsonwebtoken::{Algorithm, DecodingKey};
use parking_lot::Mutex;
use serde::Deserialize;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn, Instrument};

/// Smallest RSA modulus accepted from a remote key set, in bytes.
const MIN_RSA_MODULUS_BYTES: usize = 256;

/// Key as found in a provider's JWKS document.
#[derive(Debug, Clone, Deserialize)]
struct RemoteJwk {
    kty: String,
    kid: Option<String>,
    #[serde(rename = "use")]
    key_use: Option<String>,
    alg: Option<String>,
    n: Option<String>,
    e: Option<String>,
    x: Option<String>,
    y: Option<String>,
    crv: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RemoteJwks {
    keys: Vec<RemoteJwk>,
}

/// Family of a cached key, used to reject algorithm/key mismatches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyFamily {
    /// RSA keys verify RS* and PS*
    Rsa,
    /// EC keys verify ES*
    Ec,
}

impl KeyFamily {
    /// Whether keys of this family can verify `alg`.
    pub fn supports(self, alg: Algorithm) -> bool {
        match self {
            KeyFamily::Rsa => matches!(
                alg,
                Algorithm::RS256
                    | Algorithm::RS384
                    | Algorithm::RS512
                    | Algorithm::PS256
                    | Algorithm::PS384
                    | Algorithm::PS512
            ),
            KeyFamily::Ec => matches!(alg, Algorithm::ES256 | Algorithm::ES384),
        }
    }
}

/// A verification key from a remote key set.
#[derive(Clone)]
pub struct CachedKey {
    /// Decoding key
    pub key: Arc<DecodingKey>,
    /// Key family
    pub family: KeyFamily,
    /// Algorithm the provider pinned the key to, if any
    pub alg: Option<Algorithm>,
}

impl std::fmt::Debug for CachedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedKey")
            .field("family", &self.family)
            .field("alg", &self.alg)
            .finish_non_exhaustive()
    }
}

struct KeySet {
    keys: HashMap<String, CachedKey>,
    fetched_at: Instant,
}

type InflightFetch = Shared<BoxFuture<'static, Result<Arc<KeySet>, VerificationError>>>;

/// A running fetch, tagged so that only the task that created the entry
/// removes it.
struct Inflight {
    generation: u64,
    fetch: InflightFetch,
}

type InflightMap = Arc<Mutex<HashMap<String, Inflight>>>;

/// Per-URI cache of remote verification keys.
pub struct JwkCache {
    entries: Arc<ArcSwap<HashMap<String, Arc<KeySet>>>>,
    inflight: InflightMap,
    next_generation: AtomicU64,
    http_client: reqwest::Client,
    ttl: Duration,
    refresh_cooldown: Duration,
}

impl JwkCache {
    /// Create a cache whose HTTP client enforces the configured timeouts.
    pub fn new(config: &VerifierConfig) -> Result<Self, ConfigError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.fetch_timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| ConfigError::InvalidValue {
                field: "JWKS_FETCH_TIMEOUT".to_string(),
                reason: format!("Failed to create HTTP client: {e}"),
            })?;

        Ok(Self {
            entries: Arc::new(ArcSwap::from_pointee(HashMap::new())),
            inflight: Arc::new(Mutex::new(HashMap::new())),
            next_generation: AtomicU64::new(0),
            http_client,
            ttl: config.jwks_cache_ttl,
            refresh_cooldown: config.refresh_cooldown,
        })
    }

    /// Get the key with `kid` from the key set at `jwks_uri`.
    ///
    /// Refreshes are spawned onto the current Tokio runtime.
    #[instrument(skip_all, fields(jwks_uri = %jwks_uri, kid = %kid))]
    pub async fn get_key(&self, jwks_uri: &str, kid: &str) -> Result<CachedKey, VerificationError> {
        if let Some(set) = self.fresh_entry(jwks_uri) {
            if let Some(key) = set.keys.get(kid) {
                return Ok(key.clone());
            }
            if set.fetched_at.elapsed() < self.refresh_cooldown {
                debug!("Unknown kid within refresh cooldown");
                return Err(VerificationError::KeyNotFound {
                    kid: kid.to_string(),
                });
            }
            debug!("Unknown kid, refreshing key set");
        }

        let set = self.refresh_single_flight(jwks_uri).await?;
        set.keys
            .get(kid)
            .cloned()
            .ok_or_else(|| VerificationError::KeyNotFound {
                kid: kid.to_string(),
            })
    }

    /// Number of keys cached for a URI.
    ///
    /// An expired set is still counted until the next fetch prunes it.
    #[must_use]
    pub fn cached_key_count(&self, jwks_uri: &str) -> usize {
        self.entries
            .load()
            .get(jwks_uri)
            .map_or(0, |set| set.keys.len())
    }

    /// Drop every cached key set.
    pub fn clear(&self) {
        self.entries.store(Arc::new(HashMap::new()));
    }

    fn fresh_entry(&self, jwks_uri: &str) -> Option<Arc<KeySet>> {
        self.entries
            .load()
            .get(jwks_uri)
            .filter(|set| set.fetched_at.elapsed() < self.ttl)
            .cloned()
    }

    /// Fetch the key set, sharing one request among concurrent callers.
    ///
    /// Must be called within a Tokio runtime.
    async fn refresh_single_flight(&self, jwks_uri: &str) -> Result<Arc<KeySet>, VerificationError> {
        let fetch = {
            let mut inflight = self.inflight.lock();
            match inflight.get(jwks_uri) {
                Some(entry) => entry.fetch.clone(),
                None => {
                    let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
                    let fetch = self.spawn_fetch(jwks_uri.to_string(), generation);
                    inflight.insert(
                        jwks_uri.to_string(),
                        Inflight {
                            generation,
                            fetch: fetch.clone(),
                        },
                    );
                    fetch
                }
            }
        };

        fetch.await
    }

    /// Start a fetch task that clears its own in-flight entry when done.
    ///
    /// The caller holds the in-flight lock, so the task cannot remove the
    /// entry before it is inserted.
    fn spawn_fetch(&self, jwks_uri: String, generation: u64) -> InflightFetch {
        let client = self.http_client.clone();
        let entries = Arc::clone(&self.entries);
        let inflight = Arc::clone(&self.inflight);
        let ttl = self.ttl;

        let task = tokio::spawn(
            async move {
                let result = Self::fetch(client, entries, jwks_uri.clone(), ttl).await;
                {
                    let mut inflight = inflight.lock();
                    if inflight
                        .get(&jwks_uri)
                        .is_some_and(|entry| entry.generation == generation)
                    {
                        inflight.remove(&jwks_uri);
                    }
                }
                result
            }
            .in_current_span(),
        );

        task.map(|joined| {
            joined.unwrap_or_else(|e| {
                Err(VerificationError::NetworkError {
                    reason: format!("key set fetch task failed: {e}"),
                })
            })
        })
        .boxed()
        .shared()
    }

    async fn fetch(
        client: reqwest::Client,
        entries: Arc<ArcSwap<HashMap<String, Arc<KeySet>>>>,
        jwks_uri: String,
        ttl: Duration,
    ) -> Result<Arc<KeySet>, VerificationError> {
        let started = Instant::now();
        info!(jwks_uri = %jwks_uri, "Fetching JWKS");

        let result = Self::download(&client, &jwks_uri).await;
        let elapsed = started.elapsed().as_secs_f64();

        let document = match result {
            Ok(document) => {
                metrics::record_jwks_fetch("success", elapsed);
                document
            }
            Err(e) => {
                metrics::record_jwks_fetch("error", elapsed);
                warn!(jwks_uri = %jwks_uri, error = %e, "JWKS fetch failed");
                return Err(e);
            }
        };

        let keys: HashMap<String, CachedKey> = document
            .keys
            .iter()
            .filter_map(|jwk| Some((jwk.kid.clone()?, to_cached_key(jwk)?)))
            .collect();

        let set = Arc::new(KeySet {
            keys,
            fetched_at: Instant::now(),
        });

        entries.rcu(|current| {
            let mut next: HashMap<String, Arc<KeySet>> = current
                .iter()
                .filter(|(_, set)| set.fetched_at.elapsed() < ttl)
                .map(|(uri, set)| (uri.clone(), Arc::clone(set)))
                .collect();
            next.insert(jwks_uri.clone(), Arc::clone(&set));
            next
        });

        info!(jwks_uri = %jwks_uri, keys = set.keys.len(), "JWKS cache updated");
        Ok(set)
    }

    async fn download(client: &reqwest::Client, jwks_uri: &str) -> Result<RemoteJwks, VerificationError> {
        let response = client.get(jwks_uri).send().await?.error_for_status()?;
        Ok(response.json().await?)
    }
}

/// Convert a remote JWK into a verification key.
///
/// Keys not meant for signatures, weak RSA keys and unsupported curves are
/// skipped.
fn to_cached_key(jwk: &RemoteJwk) -> Option<CachedKey> {
    if jwk.key_use.as_deref().is_some_and(|u| u != "sig") {
        return None;
    }
    let alg = match jwk.alg.as_deref() {
        Some(name) => Some(Algorithm::from_str(name).ok()?),
        None => None,
    };

    let (key, family) = match jwk.kty.as_str() {
        "RSA" => {
            let n = jwk.n.as_deref()?;
            let e = jwk.e.as_deref()?;

            let modulus_len = URL_SAFE_NO_PAD.decode(n.trim_end_matches('=')).ok()?.len();
            if modulus_len < MIN_RSA_MODULUS_BYTES {
                warn!(kid = ?jwk.kid, "RSA key too small, rejecting");
                return None;
            }

            (DecodingKey::from_rsa_components(n, e).ok()?, KeyFamily::Rsa)
        }
        "EC" => {
            let x = jwk.x.as_deref()?;
            let y = jwk.y.as_deref()?;
            let crv = jwk.crv.as_deref().unwrap_or("P-256");

            if !matches!(crv, "P-256" | "P-384") {
                warn!(kid = ?jwk.kid, crv = %crv, "Unsupported EC curve, rejecting");
                return None;
            }

            (DecodingKey::from_ec_components(x, y).ok()?, KeyFamily::Ec)
        }
        _ => {
            debug!(kty = %jwk.kty, "Unsupported key type");
            return None;
        }
    };

    if alg.is_some_and(|alg| !family.supports(alg)) {
        warn!(kid = ?jwk.kid, "Key algorithm does not match key type, rejecting");
        return None;
    }

    Some(CachedKey {
        key: Arc::new(key),
        family,
        alg,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rsa_jwk(n: &str) -> RemoteJwk {
        RemoteJwk {
            kty: "RSA".to_string(),
            kid: Some("k1".to_string()),
            key_use: Some("sig".to_string()),
            alg: Some("RS256".to_string()),
            n: Some(n.to_string()),
            e: Some("AQAB".to_string()),
            x: None,
            y: None,
            crv: None,
        }
    }

    fn modulus(bytes: usize) -> String {
        let mut raw = vec![0xABu8; bytes];
        raw[0] = 0xC1;
        URL_SAFE_NO_PAD.encode(raw)
    }

    #[test]
    fn test_rsa_2048_accepted() {
        let key = to_cached_key(&rsa_jwk(&modulus(256))).unwrap();
        assert_eq!(key.family, KeyFamily::Rsa);
        assert_eq!(key.alg, Some(Algorithm::RS256));
    }

    #[test]
    fn test_small_rsa_rejected() {
        assert!(to_cached_key(&rsa_jwk(&modulus(128))).is_none());
    }

    #[test]
    fn test_encryption_keys_skipped() {
        let mut jwk = rsa_jwk(&modulus(256));
        jwk.key_use = Some("enc".to_string());
        assert!(to_cached_key(&jwk).is_none());
    }

    #[test]
    fn test_mismatched_alg_rejected() {
        let mut jwk = rsa_jwk(&modulus(256));
        jwk.alg = Some("ES256".to_string());
        assert!(to_cached_key(&jwk).is_none());
    }

    #[test]
    fn test_unknown_kty_skipped() {
        let mut jwk = rsa_jwk(&modulus(256));
        jwk.kty = "oct".to_string();
        assert!(to_cached_key(&jwk).is_none());
    }

    #[test]
    fn test_key_family_support() {
        assert!(KeyFamily::Rsa.supports(Algorithm::PS256));
        assert!(!KeyFamily::Rsa.supports(Algorithm::ES256));
        assert!(KeyFamily::Ec.supports(Algorithm::ES384));
        assert!(!KeyFamily::Ec.supports(Algorithm::HS256));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_network_error() {
        let config = VerifierConfig::default().with_fetch_timeout(Duration::from_secs(1));
        let cache = JwkCache::new(&config).unwrap();

        let err = cache
            .get_key("http://127.0.0.1:9/jwks.json", "k1")
            .await
            .unwrap_err();

        assert!(err.is_retryable());
        assert_eq!(cache.cached_key_count("http://127.0.0.1:9/jwks.json"), 0);
    }
}
