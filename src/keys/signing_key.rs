//! RSA signing keys with their public JWK parameters.

use crate::error::KeyError;
use crate::keys::algorithm::JwtAlgorithm;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::EncodingKey;
use rsa::pkcs1::{DecodeRsaPrivateKey, EncodeRsaPrivateKey};
use rsa::pkcs8::DecodePrivateKey;
use rsa::traits::PublicKeyParts;
use rsa::RsaPrivateKey;
use sha2::{Digest, Sha256};
use std::fmt;

/// Minimum accepted RSA modulus size.
pub const MIN_RSA_BITS: usize = 2048;

/// Key use advertised for every signing key.
pub const SIGNATURE_USE: &str = "sig";

/// An immutable RSA signing key.
///
/// The kid is fixed at construction and never changes while the key is
/// published.
#[derive(Clone)]
pub struct SigningKey {
    kid: String,
    algorithm: JwtAlgorithm,
    modulus: String,
    exponent: String,
    encoding_key: EncodingKey,
}

impl SigningKey {
    /// Load a key from a PKCS#8 or PKCS#1 PEM document.
    ///
    /// When `kid` is `None` the RFC 7638 thumbprint of the public key is
    /// used, so the same key keeps the same kid across restarts.
    pub fn from_rsa_pem(
        kid: Option<String>,
        algorithm: JwtAlgorithm,
        pem: &str,
    ) -> Result<Self, KeyError> {
        let pem = pem.trim();
        let private_key = RsaPrivateKey::from_pkcs8_pem(pem)
            .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
            .map_err(|e| KeyError::InvalidKeyMaterial {
                kid: kid.clone().unwrap_or_default(),
                reason: e.to_string(),
            })?;

        Self::from_private_key(kid, algorithm, &private_key)
    }

    /// Generate a fresh 2048-bit key.
    pub fn generate_rsa(kid: Option<String>, algorithm: JwtAlgorithm) -> Result<Self, KeyError> {
        let mut rng = rand::rngs::OsRng;
        let private_key = RsaPrivateKey::new(&mut rng, MIN_RSA_BITS)
            .map_err(|e| KeyError::Generation(e.to_string()))?;

        Self::from_private_key(kid, algorithm, &private_key)
    }

    fn from_private_key(
        kid: Option<String>,
        algorithm: JwtAlgorithm,
        private_key: &RsaPrivateKey,
    ) -> Result<Self, KeyError> {
        let modulus = URL_SAFE_NO_PAD.encode(private_key.n().to_bytes_be());
        let exponent = URL_SAFE_NO_PAD.encode(private_key.e().to_bytes_be());
        let kid = kid.unwrap_or_else(|| rsa_thumbprint(&modulus, &exponent));

        if private_key.size() * 8 < MIN_RSA_BITS {
            return Err(KeyError::InvalidKeyMaterial {
                kid,
                reason: format!("RSA key must be at least {MIN_RSA_BITS} bits"),
            });
        }

        let der = private_key
            .to_pkcs1_der()
            .map_err(|e| KeyError::InvalidKeyMaterial {
                kid: kid.clone(),
                reason: e.to_string(),
            })?;
        let encoding_key = EncodingKey::from_rsa_der(der.as_bytes());

        Ok(Self {
            kid,
            algorithm,
            modulus,
            exponent,
            encoding_key,
        })
    }

    /// Key ID advertised in the JWKS and in token headers.
    #[must_use]
    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// Algorithm this key signs with.
    #[must_use]
    pub fn algorithm(&self) -> JwtAlgorithm {
        self.algorithm
    }

    /// Key type, always `RSA`.
    #[must_use]
    pub fn key_type(&self) -> &'static str {
        "RSA"
    }

    /// Key use, always `sig`.
    #[must_use]
    pub fn key_use(&self) -> &'static str {
        SIGNATURE_USE
    }

    /// Base64url modulus.
    #[must_use]
    pub fn modulus(&self) -> &str {
        &self.modulus
    }

    /// Base64url public exponent.
    #[must_use]
    pub fn exponent(&self) -> &str {
        &self.exponent
    }

    pub(crate) fn encoding_key(&self) -> &EncodingKey {
        &self.encoding_key
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("kid", &self.kid)
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

/// RFC 7638 thumbprint of an RSA public key.
fn rsa_thumbprint(modulus: &str, exponent: &str) -> String {
    // Members in lexicographic order, no whitespace.
    let canonical = format!(r#"{{"e":"{exponent}","kty":"RSA","n":"{modulus}"}}"#);
    URL_SAFE_NO_PAD.encode(Sha256::digest(canonical.as_bytes()))
}
