//! Self-issued token signing.

use crate::error::IssueError;
use crate::jwt::claims::JwtClaims;
use crate::keys::KeyManager;
use crate::metrics;
use crate::published::Published;
use jsonwebtoken::Header;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Outcome of a token issuance request.
///
/// Serializes to `{"status": "OK", "jwt": ...}` or
/// `{"status": "UNSUPPORTED_ALGORITHM_ERROR"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum CreateJwtResult {
    /// Signed token
    #[serde(rename = "OK")]
    Ok {
        /// Compact JWS
        jwt: String,
    },
    /// The requested algorithm has no signing key; no token was produced
    #[serde(rename = "UNSUPPORTED_ALGORITHM_ERROR")]
    UnsupportedAlgorithm,
}

impl CreateJwtResult {
    /// The token, if one was issued.
    pub fn jwt(&self) -> Option<&str> {
        match self {
            Self::Ok { jwt } => Some(jwt),
            Self::UnsupportedAlgorithm => None,
        }
    }
}

/// Token issuance contract.
///
/// Overrides wrap an inner implementation and implement this same trait,
/// delegating where they do not change behavior.
pub trait IssueToken: Send + Sync {
    /// Sign `payload` with an explicitly requested algorithm.
    ///
    /// `algorithm: None` selects the installation default. An algorithm
    /// without a signing key yields [`CreateJwtResult::UnsupportedAlgorithm`].
    fn create_jwt_with_algorithm(
        &self,
        payload: Option<Map<String, Value>>,
        validity_seconds: Option<u64>,
        algorithm: Option<&str>,
    ) -> Result<CreateJwtResult, IssueError>;

    /// Sign `payload` with the default algorithm.
    fn create_jwt(
        &self,
        payload: Option<Map<String, Value>>,
        validity_seconds: Option<u64>,
    ) -> Result<CreateJwtResult, IssueError> {
        self.create_jwt_with_algorithm(payload, validity_seconds, None)
    }
}

/// Default issuer backed by the published key manager.
#[derive(Debug, Clone)]
pub struct JwtIssuer {
    keys: Published<KeyManager>,
    default_validity_seconds: Option<u64>,
}

impl JwtIssuer {
    /// Create an issuer. `default_validity_seconds` applies when callers omit
    /// a validity.
    pub fn new(keys: Published<KeyManager>, default_validity_seconds: Option<u64>) -> Self {
        Self {
            keys,
            default_validity_seconds,
        }
    }

    fn resolve_validity(&self, requested: Option<u64>) -> Result<u64, IssueError> {
        match requested.or(self.default_validity_seconds) {
            None => Err(IssueError::MissingValidity),
            Some(0) => Err(IssueError::InvalidValidity),
            Some(seconds) => Ok(seconds),
        }
    }
}

impl IssueToken for JwtIssuer {
    fn create_jwt_with_algorithm(
        &self,
        payload: Option<Map<String, Value>>,
        validity_seconds: Option<u64>,
        algorithm: Option<&str>,
    ) -> Result<CreateJwtResult, IssueError> {
        let validity = self.resolve_validity(validity_seconds).map_err(|e| {
            metrics::record_issue_failure("invalid_validity");
            warn!(error = %e, "Rejected token issuance request");
            e
        })?;

        let keys = self.keys.snapshot();
        let algorithm = match keys.select_algorithm(algorithm) {
            Ok(alg) => alg,
            Err(unsupported) => {
                metrics::record_issue_failure("unsupported_algorithm");
                debug!(requested = %unsupported.requested, "Unsupported signing algorithm");
                return Ok(CreateJwtResult::UnsupportedAlgorithm);
            }
        };

        // select_algorithm only returns algorithms that have a current key
        let Some(key) = keys.signing_key(algorithm) else {
            metrics::record_issue_failure("unsupported_algorithm");
            return Ok(CreateJwtResult::UnsupportedAlgorithm);
        };

        let claims = JwtClaims::new(payload, validity).ok_or(IssueError::InvalidValidity)?;

        let mut header = Header::new(algorithm.into());
        header.kid = Some(key.kid().to_string());

        let jwt = jsonwebtoken::encode(&header, &claims, key.encoding_key()).map_err(|e| {
            metrics::record_issue_failure("encoding");
            warn!(kid = %key.kid(), error = %e, "Failed to sign token");
            IssueError::from(e)
        })?;

        metrics::record_token_issued(algorithm.as_str());
        debug!(kid = %key.kid(), alg = %algorithm, validity, "Issued token");

        Ok(CreateJwtResult::Ok { jwt })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{JwtAlgorithm, SigningKey};
    use jsonwebtoken::{DecodingKey, Validation};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const PRIMARY_PEM: &str = include_str!("../../tests/fixtures/rsa_primary.pem");
    const SECONDARY_PEM: &str = include_str!("../../tests/fixtures/rsa_secondary.pem");

    fn issuer(default_validity: Option<u64>) -> JwtIssuer {
        let key = SigningKey::from_rsa_pem(Some("k1".to_string()), JwtAlgorithm::RS256, PRIMARY_PEM)
            .unwrap();
        JwtIssuer::new(Published::new(KeyManager::single(key)), default_validity)
    }

    fn decode(jwt: &str, key: &SigningKey) -> JwtClaims {
        let decoding_key = DecodingKey::from_rsa_components(key.modulus(), key.exponent()).unwrap();
        let mut validation = Validation::new(key.algorithm().into());
        validation.validate_aud = false;
        jsonwebtoken::decode::<JwtClaims>(jwt, &decoding_key, &validation)
            .unwrap()
            .claims
    }

    #[test]
    fn test_create_jwt_carries_kid_and_payload() {
        let issuer = issuer(None);
        let payload = json!({"sub": "user-1", "roles": ["admin"]}).as_object().cloned();

        let result = issuer.create_jwt(payload, Some(600)).unwrap();
        let jwt = result.jwt().unwrap();

        let header = jsonwebtoken::decode_header(jwt).unwrap();
        assert_eq!(header.kid.as_deref(), Some("k1"));
        assert_eq!(header.alg, jsonwebtoken::Algorithm::RS256);

        let keys = issuer.keys.snapshot();
        let claims = decode(jwt, keys.signing_key(JwtAlgorithm::RS256).unwrap());
        assert_eq!(claims.payload["sub"], "user-1");
        assert_eq!(claims.payload["roles"], json!(["admin"]));
        assert_eq!(claims.validity_seconds(), 600);
    }

    #[test]
    fn test_missing_validity_without_default_is_error() {
        assert_eq!(
            issuer(None).create_jwt(None, None),
            Err(IssueError::MissingValidity)
        );
    }

    #[test]
    fn test_default_validity_used() {
        let result = issuer(Some(120)).create_jwt(None, None).unwrap();
        assert!(result.jwt().is_some());
    }

    #[test]
    fn test_zero_validity_rejected() {
        assert_eq!(
            issuer(Some(120)).create_jwt(None, Some(0)),
            Err(IssueError::InvalidValidity)
        );
    }

    #[test]
    fn test_unsupported_algorithm_returns_status_only() {
        let result = issuer(None)
            .create_jwt_with_algorithm(None, Some(60), Some("PS512"))
            .unwrap();
        assert_eq!(result, CreateJwtResult::UnsupportedAlgorithm);
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({"status": "UNSUPPORTED_ALGORITHM_ERROR"})
        );
    }

    #[test]
    fn test_ok_result_shape() {
        let result = CreateJwtResult::Ok {
            jwt: "a.b.c".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({"status": "OK", "jwt": "a.b.c"})
        );
    }

    #[test]
    fn test_rotation_visible_to_new_requests() {
        let issuer = issuer(None);
        let rotated = issuer
            .keys
            .snapshot()
            .rotated(
                SigningKey::from_rsa_pem(Some("k2".to_string()), JwtAlgorithm::RS256, SECONDARY_PEM)
                    .unwrap(),
            )
            .unwrap();
        issuer.keys.replace(rotated);

        let result = issuer.create_jwt(None, Some(60)).unwrap();
        let header = jsonwebtoken::decode_header(result.jwt().unwrap()).unwrap();
        assert_eq!(header.kid.as_deref(), Some("k2"));
    }

    /// Override that counts calls and pins a claim before delegating.
    struct Stamping<T> {
        inner: T,
        calls: AtomicUsize,
    }

    impl<T: IssueToken> IssueToken for Stamping<T> {
        fn create_jwt_with_algorithm(
            &self,
            payload: Option<Map<String, Value>>,
            validity_seconds: Option<u64>,
            algorithm: Option<&str>,
        ) -> Result<CreateJwtResult, IssueError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut payload = payload.unwrap_or_default();
            payload.insert("stamped".to_string(), Value::Bool(true));
            self.inner
                .create_jwt_with_algorithm(Some(payload), validity_seconds, algorithm)
        }
    }

    #[test]
    fn test_override_wraps_default_issuer() {
        let inner = issuer(None);
        let keys = inner.keys.clone();
        let wrapped = Stamping {
            inner,
            calls: AtomicUsize::new(0),
        };

        let result = wrapped.create_jwt(None, Some(60)).unwrap();

        assert_eq!(wrapped.calls.load(Ordering::SeqCst), 1);
        let snapshot = keys.snapshot();
        let claims = decode(
            result.jwt().unwrap(),
            snapshot.signing_key(JwtAlgorithm::RS256).unwrap(),
        );
        assert_eq!(claims.payload["stamped"], true);
    }
}
