//! Configuration for the trust core.
//!
//! Configuration is an immutable value assembled once and handed to each
//! component's constructor. Reconfiguration means building a new value and
//! new components, never mutating the old ones.

use crate::error::ConfigError;
use crate::keys::JwtAlgorithm;
use crate::provider::Provider;
use jsonwebtoken::Algorithm;
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Source's default validity for self-issued tokens (100 years).
pub const DEFAULT_JWT_VALIDITY_SECONDS: u64 = 3_153_600_000;

/// Default base path under which the JWT routes are mounted.
pub const DEFAULT_API_BASE_PATH: &str = "/auth";

/// Settings for self-issued tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuerConfig {
    /// Algorithm used when the caller does not request one
    pub default_algorithm: JwtAlgorithm,
    /// Validity used when the caller does not supply one
    pub default_validity_seconds: Option<u64>,
    /// PEM file with the RSA signing key; a key is generated when absent
    pub signing_key_path: Option<PathBuf>,
    /// Explicit kid for the signing key; the key thumbprint when absent
    pub signing_key_id: Option<String>,
    /// Public origin of this API, used as the OpenID issuer
    pub api_domain: Option<Url>,
    /// Path prefix of the auth routes
    pub api_base_path: String,
}

impl Default for IssuerConfig {
    fn default() -> Self {
        Self {
            default_algorithm: JwtAlgorithm::RS256,
            default_validity_seconds: Some(DEFAULT_JWT_VALIDITY_SECONDS),
            signing_key_path: None,
            signing_key_id: None,
            api_domain: None,
            api_base_path: DEFAULT_API_BASE_PATH.to_string(),
        }
    }
}

/// Settings for verifying third-party ID tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifierConfig {
    /// Upper bound for a whole JWKS request
    pub fetch_timeout: Duration,
    /// Upper bound for establishing the connection
    pub connect_timeout: Duration,
    /// Cached key sets are never served past this age
    pub jwks_cache_ttl: Duration,
    /// Minimum interval between refetches triggered by unknown kids
    pub refresh_cooldown: Duration,
    /// Signature algorithms the verifier trusts
    pub allowed_algorithms: Vec<Algorithm>,
    /// Whether the `exp` claim is enforced
    pub validate_exp: bool,
    /// Clock skew tolerance for `exp`
    pub leeway_seconds: u64,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(5),
            jwks_cache_ttl: Duration::from_secs(3600),
            refresh_cooldown: Duration::from_secs(30),
            allowed_algorithms: vec![Algorithm::RS256],
            validate_exp: true,
            leeway_seconds: 60,
        }
    }
}

impl VerifierConfig {
    /// Set the trusted signature algorithms.
    #[must_use]
    pub fn with_allowed_algorithms(mut self, algorithms: Vec<Algorithm>) -> Self {
        self.allowed_algorithms = algorithms;
        self
    }

    /// Enable or disable `exp` enforcement.
    #[must_use]
    pub fn with_validate_exp(mut self, validate_exp: bool) -> Self {
        self.validate_exp = validate_exp;
        self
    }

    /// Set the JWKS request timeout.
    #[must_use]
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Set the cache staleness bound.
    #[must_use]
    pub fn with_jwks_cache_ttl(mut self, ttl: Duration) -> Self {
        self.jwks_cache_ttl = ttl;
        self
    }

    /// Set the unknown-kid refetch cooldown.
    #[must_use]
    pub fn with_refresh_cooldown(mut self, cooldown: Duration) -> Self {
        self.refresh_cooldown = cooldown;
        self
    }

    /// Validates the verifier settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.allowed_algorithms.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "ID_TOKEN_ALLOWED_ALGORITHMS".to_string(),
                reason: "at least one algorithm is required".to_string(),
            });
        }
        if let Some(alg) = self.allowed_algorithms.iter().find(|a| !is_asymmetric(**a)) {
            return Err(ConfigError::InvalidValue {
                field: "ID_TOKEN_ALLOWED_ALGORITHMS".to_string(),
                reason: format!("{alg:?} is a shared-secret algorithm"),
            });
        }
        if self.fetch_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "JWKS_FETCH_TIMEOUT".to_string(),
                reason: "timeout must be greater than 0".to_string(),
            });
        }
        if self.jwks_cache_ttl.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "JWKS_CACHE_TTL".to_string(),
                reason: "TTL must be greater than 0".to_string(),
            });
        }
        Ok(())
    }
}

/// Complete trust-core configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Config {
    /// Self-issued token settings
    pub issuer: IssuerConfig,
    /// ID token verification settings
    pub verifier: VerifierConfig,
    /// Third-party provider descriptors, in configuration order
    pub providers: Vec<Provider>,
}

impl Config {
    /// Loads configuration from environment variables with validation.
    ///
    /// A `.env` file is read first when present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Loads configuration from a fixed set of variables.
    pub fn from_map(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::from_lookup(|name| vars.get(name).cloned())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let default_validity_seconds = match lookup("JWT_VALIDITY_SECONDS") {
            Some(val) if val.trim().is_empty() => None,
            Some(val) => Some(parse_value("JWT_VALIDITY_SECONDS", &val)?),
            None => Some(DEFAULT_JWT_VALIDITY_SECONDS),
        };

        let issuer = IssuerConfig {
            default_algorithm: match lookup("JWT_ALGORITHM") {
                Some(val) => val.parse()?,
                None => JwtAlgorithm::RS256,
            },
            default_validity_seconds,
            signing_key_path: lookup("JWT_SIGNING_KEY_PATH").map(PathBuf::from),
            signing_key_id: lookup("JWT_SIGNING_KEY_ID"),
            api_domain: lookup("API_DOMAIN")
                .map(|val| parse_url("API_DOMAIN", &val))
                .transpose()?,
            api_base_path: lookup("API_BASE_PATH")
                .unwrap_or_else(|| DEFAULT_API_BASE_PATH.to_string()),
        };

        let defaults = VerifierConfig::default();
        let verifier = VerifierConfig {
            fetch_timeout: parse_secs(&lookup, "JWKS_FETCH_TIMEOUT", defaults.fetch_timeout)?,
            connect_timeout: parse_secs(&lookup, "JWKS_CONNECT_TIMEOUT", defaults.connect_timeout)?,
            jwks_cache_ttl: parse_secs(&lookup, "JWKS_CACHE_TTL", defaults.jwks_cache_ttl)?,
            refresh_cooldown: parse_secs(&lookup, "JWKS_REFRESH_COOLDOWN", defaults.refresh_cooldown)?,
            allowed_algorithms: match lookup("ID_TOKEN_ALLOWED_ALGORITHMS") {
                Some(val) => parse_algorithm_list(&val)?,
                None => defaults.allowed_algorithms,
            },
            validate_exp: parse_or(&lookup, "ID_TOKEN_VALIDATE_EXP", defaults.validate_exp)?,
            leeway_seconds: parse_or(&lookup, "ID_TOKEN_LEEWAY", defaults.leeway_seconds)?,
        };

        let providers = match lookup("THIRD_PARTY_PROVIDERS") {
            Some(json) => serde_json::from_str(&json).map_err(|e| ConfigError::ParseError {
                name: "THIRD_PARTY_PROVIDERS".to_string(),
                reason: e.to_string(),
            })?,
            None => Vec::new(),
        };

        let config = Self {
            issuer,
            verifier,
            providers,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.issuer.default_validity_seconds == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "JWT_VALIDITY_SECONDS".to_string(),
                reason: "validity must be greater than 0".to_string(),
            });
        }
        self.verifier.validate()
    }
}

fn is_asymmetric(alg: Algorithm) -> bool {
    !matches!(alg, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512)
}

/// Parse a single value, naming the variable on failure.
fn parse_value<T: std::str::FromStr>(name: &str, val: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    val.trim().parse().map_err(|e: T::Err| ConfigError::ParseError {
        name: name.to_string(),
        reason: e.to_string(),
    })
}

/// Parse a variable with a default value.
fn parse_or<T, F>(lookup: &F, name: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(val) => parse_value(name, &val),
        None => Ok(default),
    }
}

fn parse_secs<F>(lookup: &F, name: &str, default: Duration) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    parse_or(lookup, name, default.as_secs()).map(Duration::from_secs)
}

fn parse_url(name: &str, val: &str) -> Result<Url, ConfigError> {
    Url::parse(val).map_err(|e| ConfigError::InvalidUrl {
        field: name.to_string(),
        reason: e.to_string(),
    })
}

/// Parse a comma-separated algorithm list.
fn parse_algorithm_list(val: &str) -> Result<Vec<Algorithm>, ConfigError> {
    val.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| parse_value::<Algorithm>("ID_TOKEN_ALLOWED_ALGORITHMS", s))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_map(&HashMap::new()).unwrap();

        assert_eq!(config.issuer.default_algorithm, JwtAlgorithm::RS256);
        assert_eq!(
            config.issuer.default_validity_seconds,
            Some(DEFAULT_JWT_VALIDITY_SECONDS)
        );
        assert_eq!(config.issuer.api_base_path, "/auth");
        assert_eq!(config.verifier, VerifierConfig::default());
        assert!(config.providers.is_empty());
    }

    #[test]
    fn test_empty_validity_disables_default() {
        let config = Config::from_map(&vars(&[("JWT_VALIDITY_SECONDS", "")])).unwrap();
        assert_eq!(config.issuer.default_validity_seconds, None);
    }

    #[test]
    fn test_zero_validity_rejected() {
        let result = Config::from_map(&vars(&[("JWT_VALIDITY_SECONDS", "0")]));
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_invalid_number_names_variable() {
        let result = Config::from_map(&vars(&[("JWKS_CACHE_TTL", "soon")]));
        assert!(matches!(result, Err(ConfigError::ParseError { name, .. }) if name == "JWKS_CACHE_TTL"));
    }

    #[test]
    fn test_invalid_api_domain() {
        let result = Config::from_map(&vars(&[("API_DOMAIN", "not a url")]));
        assert!(matches!(result, Err(ConfigError::InvalidUrl { .. })));
    }

    #[test]
    fn test_algorithm_list() {
        let config = Config::from_map(&vars(&[("ID_TOKEN_ALLOWED_ALGORITHMS", "RS256, ES256")])).unwrap();
        assert_eq!(
            config.verifier.allowed_algorithms,
            vec![Algorithm::RS256, Algorithm::ES256]
        );
    }

    #[test]
    fn test_shared_secret_algorithms_rejected() {
        let result = Config::from_map(&vars(&[("ID_TOKEN_ALLOWED_ALGORITHMS", "RS256,HS256")]));
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_none_algorithm_rejected() {
        let result = Config::from_map(&vars(&[("ID_TOKEN_ALLOWED_ALGORITHMS", "none")]));
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn test_providers_from_json() {
        let config = Config::from_map(&vars(&[(
            "THIRD_PARTY_PROVIDERS",
            r#"[{"id":"google","client_id":"c1","is_default":true},{"id":"github"}]"#,
        )]))
        .unwrap();

        assert_eq!(config.providers.len(), 2);
        assert_eq!(config.providers[0].client_id.as_deref(), Some("c1"));
        assert!(config.providers[0].is_default);
        assert!(!config.providers[1].is_default);
    }

    #[test]
    fn test_expiry_toggle() {
        let config = Config::from_map(&vars(&[("ID_TOKEN_VALIDATE_EXP", "false")])).unwrap();
        assert!(!config.verifier.validate_exp);
    }
}
