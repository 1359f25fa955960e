//! Signing algorithms for self-issued tokens.

use crate::error::ConfigError;
use std::fmt;
use std::str::FromStr;

/// JWT signing algorithm usable with an RSA signing key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JwtAlgorithm {
    /// RSA PKCS#1 v1.5 with SHA-256
    RS256,
    /// RSA PKCS#1 v1.5 with SHA-384
    RS384,
    /// RSA PKCS#1 v1.5 with SHA-512
    RS512,
    /// RSA-PSS with SHA-256
    PS256,
    /// RSA-PSS with SHA-384
    PS384,
    /// RSA-PSS with SHA-512
    PS512,
}

impl JwtAlgorithm {
    /// Every algorithm this crate can sign with.
    pub const ALL: [Self; 6] = [
        Self::RS256,
        Self::RS384,
        Self::RS512,
        Self::PS256,
        Self::PS384,
        Self::PS512,
    ];

    /// Parse an algorithm name as it appears in a JWT header.
    ///
    /// Names are matched exactly; `none` and symmetric algorithms are never
    /// recognised.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|alg| alg.as_str() == name)
    }

    /// Get algorithm name for JWT header.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::RS256 => "RS256",
            Self::RS384 => "RS384",
            Self::RS512 => "RS512",
            Self::PS256 => "PS256",
            Self::PS384 => "PS384",
            Self::PS512 => "PS512",
        }
    }
}

impl fmt::Display for JwtAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JwtAlgorithm {
    type Err = ConfigError;

    /// Parse from configuration, tolerating lower case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(&s.trim().to_uppercase()).ok_or_else(|| ConfigError::InvalidValue {
            field: "JWT_ALGORITHM".to_string(),
            reason: format!("unsupported signing algorithm: {s}"),
        })
    }
}

impl From<JwtAlgorithm> for jsonwebtoken::Algorithm {
    fn from(alg: JwtAlgorithm) -> Self {
        match alg {
            JwtAlgorithm::RS256 => Self::RS256,
            JwtAlgorithm::RS384 => Self::RS384,
            JwtAlgorithm::RS512 => Self::RS512,
            JwtAlgorithm::PS256 => Self::PS256,
            JwtAlgorithm::PS384 => Self::PS384,
            JwtAlgorithm::PS512 => Self::PS512,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_exact() {
        assert_eq!(JwtAlgorithm::parse("RS256"), Some(JwtAlgorithm::RS256));
        assert_eq!(JwtAlgorithm::parse("rs256"), None);
        assert_eq!(JwtAlgorithm::parse("none"), None);
        assert_eq!(JwtAlgorithm::parse("HS256"), None);
    }

    #[test]
    fn test_from_str_tolerates_case() {
        assert_eq!("ps384".parse::<JwtAlgorithm>().unwrap(), JwtAlgorithm::PS384);
        assert!("ES256".parse::<JwtAlgorithm>().is_err());
    }

    #[test]
    fn test_as_str_round_trips_through_parse() {
        for alg in JwtAlgorithm::ALL {
            assert_eq!(JwtAlgorithm::parse(alg.as_str()), Some(alg));
        }
    }
}
