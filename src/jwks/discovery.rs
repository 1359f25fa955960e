//! OpenID discovery metadata pointing relying parties at the JWKS.

use crate::config::IssuerConfig;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use url::Url;

/// Path of the JWKS document below the API base path.
pub const JWKS_PATH: &str = "/jwt/jwks.json";

/// Result of `get_open_id_discovery_configuration`.
///
/// Serializes to `{"status": "OK", "issuer": ..., "jwks_uri": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum DiscoveryResult {
    /// Discovery metadata
    #[serde(rename = "OK")]
    Ok {
        /// Issuer identifier of self-issued tokens
        issuer: String,
        /// Absolute URL of the JWKS document
        jwks_uri: String,
    },
}

/// Discovery metadata derived once from the issuer configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenIdDiscovery {
    issuer: String,
    jwks_uri: String,
}

impl OpenIdDiscovery {
    /// Derive the issuer as `api_domain + api_base_path`.
    ///
    /// # Errors
    ///
    /// Fails if no API domain is configured or the combined URL is invalid.
    pub fn from_config(config: &IssuerConfig) -> Result<Self, ConfigError> {
        let domain = config
            .api_domain
            .as_ref()
            .ok_or_else(|| ConfigError::InvalidValue {
                field: "API_DOMAIN".to_string(),
                reason: "required for OpenID discovery".to_string(),
            })?;
        Self::new(domain, &config.api_base_path)
    }

    /// Build discovery metadata for an API origin and base path.
    pub fn new(api_domain: &Url, base_path: &str) -> Result<Self, ConfigError> {
        let origin = api_domain.origin().ascii_serialization();
        let base_path = normalize_base_path(base_path);
        let issuer = format!("{origin}{base_path}");

        Url::parse(&issuer).map_err(|e| ConfigError::InvalidUrl {
            field: "API_BASE_PATH".to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            jwks_uri: format!("{issuer}{JWKS_PATH}"),
            issuer,
        })
    }

    /// Issuer identifier.
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// JWKS URL.
    pub fn jwks_uri(&self) -> &str {
        &self.jwks_uri
    }

    /// Discovery document for relying parties.
    pub fn get_open_id_discovery_configuration(&self) -> DiscoveryResult {
        DiscoveryResult::Ok {
            issuer: self.issuer.clone(),
            jwks_uri: self.jwks_uri.clone(),
        }
    }
}

/// Leading slash, no trailing slash; empty for the root.
fn normalize_base_path(path: &str) -> String {
    let trimmed = path.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_discovery_document() {
        let discovery =
            OpenIdDiscovery::new(&Url::parse("https://api.example.com").unwrap(), "/auth").unwrap();

        assert_eq!(
            serde_json::to_value(discovery.get_open_id_discovery_configuration()).unwrap(),
            json!({
                "status": "OK",
                "issuer": "https://api.example.com/auth",
                "jwks_uri": "https://api.example.com/auth/jwt/jwks.json"
            })
        );
    }

    #[test]
    fn test_base_path_normalized() {
        let domain = Url::parse("http://localhost:3001/ignored").unwrap();

        let root = OpenIdDiscovery::new(&domain, "/").unwrap();
        assert_eq!(root.issuer(), "http://localhost:3001");
        assert_eq!(root.jwks_uri(), "http://localhost:3001/jwt/jwks.json");

        let nested = OpenIdDiscovery::new(&domain, "api/auth/").unwrap();
        assert_eq!(nested.issuer(), "http://localhost:3001/api/auth");
    }

    #[test]
    fn test_requires_api_domain() {
        let result = OpenIdDiscovery::from_config(&IssuerConfig::default());
        assert!(matches!(result, Err(ConfigError::InvalidValue { field, .. }) if field == "API_DOMAIN"));
    }
}
