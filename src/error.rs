//! Error types for the trust core.
//!
//! Errors are split by how the caller must react to them:
//! - [`ConfigError`]: invalid configuration, detected once at startup, fatal
//! - [`KeyError`]: unusable signing material, detected at key-manager construction
//! - [`IssueError`]: `create_jwt` contract violations and encoder faults
//! - [`VerificationError`]: trust-boundary failures and transient fetch failures
//!
//! Unsupported signing algorithms are not errors here: they are reported as a
//! typed status in [`crate::jwt::CreateJwtResult`].

use std::time::Duration;
use thiserror::Error;

/// Configuration errors. Always fatal, never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Invalid URL format
    #[error("Invalid URL for {field}: {reason}")]
    InvalidUrl {
        /// Configuration field name
        field: String,
        /// Parser message
        reason: String,
    },

    /// Environment variable parse error
    #[error("Failed to parse environment variable {name}: {reason}")]
    ParseError {
        /// Variable name
        name: String,
        /// Parser message
        reason: String,
    },

    /// Invalid value for a field that parsed correctly
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue {
        /// Configuration field name
        field: String,
        /// Why the value was rejected
        reason: String,
    },

    /// The third-party provider list is empty
    #[error("At least one third party provider must be configured")]
    NoProviders,

    /// More than one provider with the same id is marked as default
    #[error(
        "Multiple third party providers have the id \"{id}\" and are marked as \
         is_default: true. Please only mark one of them as is_default"
    )]
    MultipleDefaults {
        /// The offending provider id
        id: String,
    },

    /// Several providers share an id but none is marked as default
    #[error(
        "The providers list has multiple entries for the third party provider \"{id}\". \
         Please mark one of them as the default one by using is_default: true"
    )]
    MissingDefault {
        /// The offending provider id
        id: String,
    },
}

/// Signing key material errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    /// The PEM document could not be parsed as an RSA private key
    #[error("Invalid RSA private key for kid {kid}: {reason}")]
    InvalidKeyMaterial {
        /// Key ID being loaded
        kid: String,
        /// Parser message
        reason: String,
    },

    /// RSA key generation failed
    #[error("RSA key generation failed: {0}")]
    Generation(String),

    /// The algorithm cannot be used with an RSA key
    #[error("Algorithm {alg} is not usable with an RSA signing key")]
    IncompatibleAlgorithm {
        /// Algorithm name
        alg: String,
    },

    /// No signing key was supplied
    #[error("At least one signing key is required")]
    NoKeys,

    /// Two keys share the same kid
    #[error("Duplicate key id: {kid}")]
    DuplicateKeyId {
        /// Duplicated key ID
        kid: String,
    },

    /// Two current keys share the same algorithm
    #[error("More than one current key for algorithm {alg}")]
    DuplicateAlgorithm {
        /// Duplicated algorithm
        alg: String,
    },

    /// The default algorithm has no current key
    #[error("Default algorithm {alg} has no signing key")]
    DefaultAlgorithmWithoutKey {
        /// Default algorithm name
        alg: String,
    },
}

/// Errors from `create_jwt` that are not the typed unsupported-algorithm status.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IssueError {
    /// Neither the caller nor the installation supplied a validity
    #[error("No validity supplied and no default validity configured")]
    MissingValidity,

    /// Validity must be a positive number of seconds
    #[error("Validity must be a positive number of seconds")]
    InvalidValidity,

    /// The JWT encoder failed
    #[error("JWT encoding error: {0}")]
    Encoding(String),
}

/// Stable error codes for verification outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// No key with the token's kid in the published set
    KeyNotFound,
    /// Signature did not verify
    SignatureInvalid,
    /// Audience claim does not match
    AudienceMismatch,
    /// Issuer claim not in the acceptable list
    IssuerNotAllowed,
    /// Remote key set could not be fetched
    NetworkError,
    /// Header algorithm outside the allow-list
    AlgorithmNotAllowed,
    /// Token cannot be parsed
    TokenMalformed,
    /// Token has expired
    TokenExpired,
    /// JWKS URI is not a valid URL
    InvalidJwksUri,
    /// Provider has no ID token settings
    ProviderNotConfigured,
}

impl ErrorCode {
    /// Get the string representation of the error code
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::KeyNotFound => "ID_TOKEN_KEY_NOT_FOUND",
            Self::SignatureInvalid => "ID_TOKEN_SIGNATURE_INVALID",
            Self::AudienceMismatch => "ID_TOKEN_AUDIENCE_MISMATCH",
            Self::IssuerNotAllowed => "ID_TOKEN_ISSUER_NOT_ALLOWED",
            Self::NetworkError => "JWKS_NETWORK_ERROR",
            Self::AlgorithmNotAllowed => "ID_TOKEN_ALGORITHM_NOT_ALLOWED",
            Self::TokenMalformed => "ID_TOKEN_MALFORMED",
            Self::TokenExpired => "ID_TOKEN_EXPIRED",
            Self::InvalidJwksUri => "JWKS_URI_INVALID",
            Self::ProviderNotConfigured => "ID_TOKEN_PROVIDER_NOT_CONFIGURED",
        }
    }
}

/// ID token verification failures.
///
/// Every variant except [`VerificationError::NetworkError`] is permanent for
/// the token that produced it.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerificationError {
    /// The published key set has no key with the token's kid
    #[error("No key with kid {kid} in the published key set")]
    KeyNotFound {
        /// Key ID from the token header
        kid: String,
    },

    /// Signature verification failed
    #[error("ID token signature invalid")]
    SignatureInvalid,

    /// The audience claim does not contain the expected audience
    #[error("ID token audience does not match {expected}")]
    AudienceMismatch {
        /// Expected audience
        expected: String,
    },

    /// The issuer claim is missing or not in the acceptable list
    #[error("ID token issuer not allowed: {issuer:?}")]
    IssuerNotAllowed {
        /// Issuer found in the token, if any
        issuer: Option<String>,
    },

    /// Fetching the remote key set failed
    #[error("Failed to fetch key set: {reason}")]
    NetworkError {
        /// Description of the failure
        reason: String,
    },

    /// The header algorithm is not in the verifier's allow-list
    #[error("Algorithm {alg} is not allowed")]
    AlgorithmNotAllowed {
        /// Algorithm named by the token header
        alg: String,
    },

    /// The token cannot be parsed
    #[error("ID token malformed: {reason}")]
    TokenMalformed {
        /// Description of the malformation
        reason: String,
    },

    /// The token has expired (only reported when expiry checking is enabled)
    #[error("ID token expired")]
    TokenExpired,

    /// The JWKS URI is not a valid URL
    #[error("Invalid JWKS URI: {reason}")]
    InvalidJwksUri {
        /// Parser message
        reason: String,
    },

    /// The provider lacks the JWKS URI or client ID needed to verify its tokens
    #[error("Provider {provider_id} is not configured for ID token verification: missing {missing}")]
    ProviderNotConfigured {
        /// Provider identifier
        provider_id: String,
        /// Name of the missing setting
        missing: &'static str,
    },
}

impl VerificationError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::KeyNotFound { .. } => ErrorCode::KeyNotFound,
            Self::SignatureInvalid => ErrorCode::SignatureInvalid,
            Self::AudienceMismatch { .. } => ErrorCode::AudienceMismatch,
            Self::IssuerNotAllowed { .. } => ErrorCode::IssuerNotAllowed,
            Self::NetworkError { .. } => ErrorCode::NetworkError,
            Self::AlgorithmNotAllowed { .. } => ErrorCode::AlgorithmNotAllowed,
            Self::TokenMalformed { .. } => ErrorCode::TokenMalformed,
            Self::TokenExpired => ErrorCode::TokenExpired,
            Self::InvalidJwksUri { .. } => ErrorCode::InvalidJwksUri,
            Self::ProviderNotConfigured { .. } => ErrorCode::ProviderNotConfigured,
        }
    }

    /// Check if this error is transient and may succeed on retry
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::NetworkError { .. })
    }

    /// Suggested delay before a caller-directed retry
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::NetworkError { .. } => Some(Duration::from_secs(1)),
            _ => None,
        }
    }
}

/// Umbrella error for callers that want a single type.
#[derive(Error, Debug)]
pub enum TrustError {
    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Signing key error
    #[error(transparent)]
    Key(#[from] KeyError),

    /// Token issuance error
    #[error(transparent)]
    Issue(#[from] IssueError),

    /// ID token verification error
    #[error(transparent)]
    Verification(#[from] VerificationError),
}

// ============================================================================
// From trait implementations for automatic error conversion
// ============================================================================

impl From<jsonwebtoken::errors::Error> for VerificationError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::InvalidSignature | ErrorKind::Crypto(_) => VerificationError::SignatureInvalid,
            ErrorKind::ExpiredSignature => VerificationError::TokenExpired,
            ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
                VerificationError::SignatureInvalid
            }
            ErrorKind::InvalidAudience => VerificationError::AudienceMismatch {
                expected: String::new(),
            },
            ErrorKind::InvalidIssuer => VerificationError::IssuerNotAllowed { issuer: None },
            ErrorKind::MissingRequiredClaim(claim) => VerificationError::TokenMalformed {
                reason: format!("missing required claim {claim}"),
            },
            ErrorKind::Base64(_) | ErrorKind::Json(_) | ErrorKind::Utf8(_) | ErrorKind::InvalidToken => {
                VerificationError::TokenMalformed {
                    reason: "token is not a well-formed JWT".to_string(),
                }
            }
            _ => VerificationError::TokenMalformed {
                reason: "token validation failed".to_string(),
            },
        }
    }
}

impl From<reqwest::Error> for VerificationError {
    fn from(err: reqwest::Error) -> Self {
        let reason = if err.is_timeout() {
            "request timed out".to_string()
        } else if err.is_connect() {
            "connection failed".to_string()
        } else if err.is_decode() {
            "response is not a valid key set".to_string()
        } else if let Some(status) = err.status() {
            format!("endpoint returned status {status}")
        } else {
            "request failed".to_string()
        };
        VerificationError::NetworkError { reason }
    }
}

impl From<jsonwebtoken::errors::Error> for IssueError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        IssueError::Encoding(err.to_string())
    }
}
