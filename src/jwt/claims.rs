//! Claims set of self-issued tokens.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Claims managed by the issuer; callers cannot override them.
pub const RESERVED_CLAIMS: [&str; 2] = ["iat", "exp"];

/// Claims set of a self-issued token.
///
/// The caller's payload is flattened next to the system-managed `iat` and
/// `exp`, which always win over payload entries of the same name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JwtClaims {
    /// Issued at, seconds since the epoch
    pub iat: i64,
    /// Expiry, `iat + validity`
    pub exp: i64,
    /// Caller-supplied claims
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl JwtClaims {
    /// Build claims issued now and valid for `validity_seconds`.
    ///
    /// Returns `None` if the expiry does not fit in an `i64` timestamp.
    pub fn new(payload: Option<Map<String, Value>>, validity_seconds: u64) -> Option<Self> {
        Self::issued_at(chrono::Utc::now().timestamp(), payload, validity_seconds)
    }

    /// Build claims issued at a fixed instant.
    pub fn issued_at(
        iat: i64,
        payload: Option<Map<String, Value>>,
        validity_seconds: u64,
    ) -> Option<Self> {
        let validity = i64::try_from(validity_seconds).ok()?;
        let exp = iat.checked_add(validity)?;

        let mut payload = payload.unwrap_or_default();
        for name in RESERVED_CLAIMS {
            payload.remove(name);
        }

        Some(Self { iat, exp, payload })
    }

    /// Lifetime of the token in seconds.
    pub fn validity_seconds(&self) -> i64 {
        self.exp - self.iat
    }
}
