//! Provider descriptors as configured.

use serde::{Deserialize, Serialize};

/// Third-party identity provider descriptor.
///
/// Deserializes from the configuration shape
/// `{id, client_id?, is_default?, jwks_uri?, issuers?}`. The last two are
/// only needed to verify ID tokens through [`crate::IdTokenVerifier::verify_for_provider`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    /// Caller-chosen identifier such as `google` or `github`
    pub id: String,
    /// OAuth client ID, used to tell apart entries sharing an `id`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    /// Whether this entry is the default for its `id`
    #[serde(default)]
    pub is_default: bool,
    /// Provider's JWKS endpoint for ID token verification
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jwks_uri: Option<String>,
    /// Acceptable `iss` values of the provider's ID tokens
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issuers: Vec<String>,
}

impl Provider {
    /// A provider entry with only an identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            client_id: None,
            is_default: false,
            jwks_uri: None,
            issuers: Vec::new(),
        }
    }

    /// Set the client ID.
    #[must_use]
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Mark the entry as default for its identifier.
    #[must_use]
    pub fn as_default(mut self) -> Self {
        self.is_default = true;
        self
    }

    /// Set the ID token verification endpoint and issuers.
    #[must_use]
    pub fn with_id_token_settings(
        mut self,
        jwks_uri: impl Into<String>,
        issuers: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.jwks_uri = Some(jwks_uri.into());
        self.issuers = issuers.into_iter().map(Into::into).collect();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_shape() {
        let provider: Provider = serde_json::from_str(r#"{"id":"github"}"#).unwrap();
        assert_eq!(provider, Provider::new("github"));
    }

    #[test]
    fn test_full_config_shape() {
        let provider: Provider = serde_json::from_str(
            r#"{"id":"google","client_id":"c1","is_default":true,
                "jwks_uri":"https://www.googleapis.com/oauth2/v3/certs",
                "issuers":["https://accounts.google.com","accounts.google.com"]}"#,
        )
        .unwrap();

        assert_eq!(
            provider,
            Provider::new("google")
                .with_client_id("c1")
                .as_default()
                .with_id_token_settings(
                    "https://www.googleapis.com/oauth2/v3/certs",
                    ["https://accounts.google.com", "accounts.google.com"],
                )
        );
    }
}
