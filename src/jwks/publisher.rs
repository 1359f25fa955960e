//! JWKS publication of the current signing keys.

use crate::error::KeyError;
use crate::jwks::document::{GetJwksResult, JwksDocument};
use crate::keys::{KeyManager, SigningKey};
use crate::published::Published;
use tracing::info;

/// Key publication contract.
pub trait PublishKeys: Send + Sync {
    /// Current public keys. Never fails.
    fn get_jwks(&self) -> GetJwksResult;
}

/// Publishes the keys of the shared key manager.
#[derive(Debug, Clone)]
pub struct JwksPublisher {
    keys: Published<KeyManager>,
}

impl JwksPublisher {
    /// Create a publisher over the same key manager the issuer signs with.
    pub fn new(keys: Published<KeyManager>) -> Self {
        Self { keys }
    }

    /// Make `new_key` current for its algorithm.
    ///
    /// The replaced key stays published until it falls out of the retention
    /// window. The successor is fully built before it is swapped in.
    pub fn rotate_keys(&self, new_key: SigningKey) -> Result<(), KeyError> {
        let kid = new_key.kid().to_string();
        let successor = self.keys.snapshot().rotated(new_key)?;
        self.keys.replace(successor);
        info!(kid = %kid, "Signing key rotated");
        Ok(())
    }

    /// Kid of the current key for the default algorithm.
    pub fn current_key_id(&self) -> Option<String> {
        let keys = self.keys.snapshot();
        keys.signing_key(keys.default_algorithm())
            .map(|k| k.kid().to_string())
    }
}

impl PublishKeys for JwksPublisher {
    fn get_jwks(&self) -> GetJwksResult {
        let keys = self.keys.snapshot();
        GetJwksResult::Ok(keys.published_keys().collect::<JwksDocument>())
    }
}
