//! Claims read from third-party ID tokens.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// `aud` claim, which may be a string or an array of strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    /// Claim absent
    #[default]
    None,
    /// Single audience
    Single(String),
    /// Audience list
    Multiple(Vec<String>),
}

impl Audience {
    /// Whether `aud` is one of the token's audiences.
    pub fn contains(&self, aud: &str) -> bool {
        match self {
            Audience::None => false,
            Audience::Single(s) => s == aud,
            Audience::Multiple(v) => v.iter().any(|a| a == aud),
        }
    }
}

/// Claims of a verified third-party ID token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdTokenClaims {
    /// Subject at the provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    /// Issuer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    /// Audience
    #[serde(default, skip_serializing_if = "is_absent")]
    pub aud: Audience,
    /// Every other claim, `exp` and `email` included
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn is_absent(aud: &Audience) -> bool {
    *aud == Audience::None
}

impl IdTokenClaims {
    /// Expiry timestamp, if present.
    pub fn expires_at(&self) -> Option<i64> {
        self.extra.get("exp").and_then(Value::as_i64)
    }

    /// A string claim from the remaining claims.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.extra.get(name).and_then(Value::as_str)
    }
}
