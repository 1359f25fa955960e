//! JWKS wire format.

use crate::keys::SigningKey;
use serde::{Deserialize, Serialize};

/// Public RSA key descriptor as published to relying parties.
///
/// Field names and order are fixed: `kty, kid, n, e, alg, use`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonWebKey {
    /// Key type
    pub kty: String,
    /// Key ID
    pub kid: String,
    /// Base64url modulus
    pub n: String,
    /// Base64url public exponent
    pub e: String,
    /// Signing algorithm
    pub alg: String,
    /// Key use
    #[serde(rename = "use")]
    pub key_use: String,
}

impl From<&SigningKey> for JsonWebKey {
    fn from(key: &SigningKey) -> Self {
        Self {
            kty: key.key_type().to_string(),
            kid: key.kid().to_string(),
            n: key.modulus().to_string(),
            e: key.exponent().to_string(),
            alg: key.algorithm().to_string(),
            key_use: key.key_use().to_string(),
        }
    }
}

/// Ordered set of published keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwksDocument {
    /// Keys in publication order
    pub keys: Vec<JsonWebKey>,
}

impl JwksDocument {
    /// Find a key by kid.
    pub fn find_key(&self, kid: &str) -> Option<&JsonWebKey> {
        self.keys.iter().find(|k| k.kid == kid)
    }
}

impl<'a> FromIterator<&'a SigningKey> for JwksDocument {
    fn from_iter<I: IntoIterator<Item = &'a SigningKey>>(iter: I) -> Self {
        Self {
            keys: iter.into_iter().map(JsonWebKey::from).collect(),
        }
    }
}

/// Result of `get_jwks`; the only status is `OK`.
///
/// Serializes to `{"status": "OK", "keys": [...]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum GetJwksResult {
    /// The current key set
    #[serde(rename = "OK")]
    Ok(JwksDocument),
}

impl GetJwksResult {
    /// The published key set.
    pub fn document(&self) -> &JwksDocument {
        match self {
            Self::Ok(document) => document,
        }
    }
}
