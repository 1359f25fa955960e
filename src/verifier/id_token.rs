//! Verification of ID tokens issued by third-party providers.

use crate::config::VerifierConfig;
use crate::error::{ConfigError, VerificationError};
use crate::metrics;
use crate::provider::Provider;
use crate::verifier::claims::IdTokenClaims;
use crate::verifier::jwk_cache::JwkCache;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::{Algorithm, Validation};
use serde::Deserialize;
use std::collections::HashSet;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use url::Url;

/// ID token verification contract.
///
/// Overrides wrap an inner verifier and implement this same trait.
pub trait VerifyIdToken: Send + Sync {
    /// Verify `id_token` against the key set at `jwks_uri`.
    ///
    /// The token's audience must contain `audience` and its issuer must
    /// exactly equal one of `acceptable_issuers`.
    fn verify(
        &self,
        id_token: &str,
        jwks_uri: &str,
        audience: &str,
        acceptable_issuers: &[String],
    ) -> impl Future<Output = Result<IdTokenClaims, VerificationError>> + Send;

    /// Verify `id_token` with a provider's configured JWKS URI and issuers,
    /// using its client ID as the audience.
    fn verify_for_provider(
        &self,
        provider: &Provider,
        id_token: &str,
    ) -> impl Future<Output = Result<IdTokenClaims, VerificationError>> + Send {
        async move {
            let jwks_uri = provider.jwks_uri.as_deref().ok_or_else(|| {
                VerificationError::ProviderNotConfigured {
                    provider_id: provider.id.clone(),
                    missing: "jwks_uri",
                }
            })?;
            let audience = provider.client_id.as_deref().ok_or_else(|| {
                VerificationError::ProviderNotConfigured {
                    provider_id: provider.id.clone(),
                    missing: "client_id",
                }
            })?;

            self.verify(id_token, jwks_uri, audience, &provider.issuers)
                .await
        }
    }
}

/// Only the `alg` member, read before any other header processing.
#[derive(Deserialize)]
struct RawHeader {
    alg: String,
}

/// Default verifier backed by a per-URI JWKS cache.
#[derive(Clone)]
pub struct IdTokenVerifier {
    cache: Arc<JwkCache>,
    allowed_algorithms: Arc<[Algorithm]>,
    validate_exp: bool,
    leeway_seconds: u64,
}

impl IdTokenVerifier {
    /// Create a verifier from validated settings.
    pub fn new(config: &VerifierConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            cache: Arc::new(JwkCache::new(config)?),
            allowed_algorithms: config.allowed_algorithms.clone().into(),
            validate_exp: config.validate_exp,
            leeway_seconds: config.leeway_seconds,
        })
    }

    /// The underlying key cache.
    pub fn cache(&self) -> &JwkCache {
        &self.cache
    }

    /// Resolve the header algorithm against the allow-list.
    ///
    /// The raw `alg` string is checked first so that `none` and names the
    /// JWT library does not know are reported as disallowed, not malformed.
    fn allowed_algorithm(&self, id_token: &str) -> Result<Algorithm, VerificationError> {
        let mut segments = id_token.split('.');
        let (Some(header), Some(_), Some(_), None) =
            (segments.next(), segments.next(), segments.next(), segments.next())
        else {
            return Err(VerificationError::TokenMalformed {
                reason: "expected three dot-separated segments".to_string(),
            });
        };

        let raw: RawHeader = URL_SAFE_NO_PAD
            .decode(header.trim_end_matches('='))
            .ok()
            .and_then(|bytes| serde_json::from_slice(&bytes).ok())
            .ok_or_else(|| VerificationError::TokenMalformed {
                reason: "header is not valid base64url JSON".to_string(),
            })?;

        Algorithm::from_str(&raw.alg)
            .ok()
            .filter(|alg| self.allowed_algorithms.contains(alg))
            .ok_or(VerificationError::AlgorithmNotAllowed { alg: raw.alg })
    }

    fn validation(&self, alg: Algorithm) -> Validation {
        let mut validation = Validation::new(alg);
        // Audience and issuer are checked after decoding with exact semantics
        validation.validate_aud = false;
        validation.validate_exp = self.validate_exp;
        validation.leeway = self.leeway_seconds;
        validation.required_spec_claims = if self.validate_exp {
            HashSet::from(["exp".to_string()])
        } else {
            HashSet::new()
        };
        validation
    }

    async fn verify_inner(
        &self,
        id_token: &str,
        jwks_uri: &str,
        audience: &str,
        acceptable_issuers: &[String],
    ) -> Result<IdTokenClaims, VerificationError> {
        Url::parse(jwks_uri).map_err(|e| VerificationError::InvalidJwksUri {
            reason: e.to_string(),
        })?;

        let alg = self.allowed_algorithm(id_token)?;
        let header = jsonwebtoken::decode_header(id_token)?;
        let kid = header.kid.ok_or_else(|| VerificationError::TokenMalformed {
            reason: "header has no kid".to_string(),
        })?;

        let key = self.cache.get_key(jwks_uri, &kid).await?;
        if !key.family.supports(alg) || key.alg.is_some_and(|pinned| pinned != alg) {
            debug!(kid = %kid, alg = ?alg, "Header algorithm does not match key");
            return Err(VerificationError::SignatureInvalid);
        }

        let claims =
            jsonwebtoken::decode::<IdTokenClaims>(id_token, &key.key, &self.validation(alg))?.claims;

        if !claims.aud.contains(audience) {
            return Err(VerificationError::AudienceMismatch {
                expected: audience.to_string(),
            });
        }

        match claims.iss.as_deref() {
            Some(iss) if acceptable_issuers.iter().any(|allowed| allowed == iss) => Ok(claims),
            _ => Err(VerificationError::IssuerNotAllowed {
                issuer: claims.iss,
            }),
        }
    }
}

impl VerifyIdToken for IdTokenVerifier {
    #[instrument(skip(self, id_token, acceptable_issuers), fields(jwks_uri = %jwks_uri))]
    async fn verify(
        &self,
        id_token: &str,
        jwks_uri: &str,
        audience: &str,
        acceptable_issuers: &[String],
    ) -> Result<IdTokenClaims, VerificationError> {
        let result = self
            .verify_inner(id_token, jwks_uri, audience, acceptable_issuers)
            .await;

        match &result {
            Ok(claims) => {
                metrics::record_id_token_verification("success", "");
                debug!(sub = ?claims.sub, "ID token verified");
            }
            Err(e) => {
                metrics::record_id_token_verification("failure", e.code().as_str());
                warn!(code = %e.code().as_str(), error = %e, "ID token rejected");
            }
        }
        result
    }
}
