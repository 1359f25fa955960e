//! Key and algorithm manager.
//!
//! Holds the current signing key per algorithm plus retired keys that stay
//! published until they rotate out. A manager is never mutated: rotation
//! builds a successor that callers publish through [`crate::Published`].

use crate::config::IssuerConfig;
use crate::error::KeyError;
use crate::keys::algorithm::JwtAlgorithm;
use crate::keys::signing_key::SigningKey;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

/// Number of retired keys kept in the published set by default.
pub const DEFAULT_RETIRED_KEY_RETENTION: usize = 2;

/// Returned when a requested algorithm has no current signing key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsupportedAlgorithm {
    /// The algorithm name the caller asked for
    pub requested: String,
}

/// Immutable set of signing keys and the installation's default algorithm.
#[derive(Debug, Clone)]
pub struct KeyManager {
    current: Vec<Arc<SigningKey>>,
    retired: Vec<Arc<SigningKey>>,
    default_algorithm: JwtAlgorithm,
    retention: usize,
}

impl KeyManager {
    /// Create a manager from the current keys, one per algorithm.
    ///
    /// # Errors
    ///
    /// Fails if no keys are given, two keys share a kid or an algorithm, or
    /// the default algorithm has no key.
    pub fn new(keys: Vec<SigningKey>, default_algorithm: JwtAlgorithm) -> Result<Self, KeyError> {
        if keys.is_empty() {
            return Err(KeyError::NoKeys);
        }

        let mut algorithms = HashSet::new();
        for key in &keys {
            if !algorithms.insert(key.algorithm()) {
                return Err(KeyError::DuplicateAlgorithm {
                    alg: key.algorithm().to_string(),
                });
            }
        }
        if !algorithms.contains(&default_algorithm) {
            return Err(KeyError::DefaultAlgorithmWithoutKey {
                alg: default_algorithm.to_string(),
            });
        }

        let manager = Self {
            current: keys.into_iter().map(Arc::new).collect(),
            retired: Vec::new(),
            default_algorithm,
            retention: DEFAULT_RETIRED_KEY_RETENTION,
        };
        manager.check_unique_kids()?;
        Ok(manager)
    }

    /// Create a manager with a single key whose algorithm is the default.
    pub fn single(key: SigningKey) -> Self {
        let default_algorithm = key.algorithm();
        Self {
            current: vec![Arc::new(key)],
            retired: Vec::new(),
            default_algorithm,
            retention: DEFAULT_RETIRED_KEY_RETENTION,
        }
    }

    /// Build the manager described by the issuer configuration.
    ///
    /// Loads the configured PEM file, or generates a key when none is
    /// configured.
    pub fn from_config(config: &IssuerConfig) -> Result<Self, KeyError> {
        let key = match config.signing_key_path {
            Some(ref path) => {
                let pem = std::fs::read_to_string(path).map_err(|e| KeyError::InvalidKeyMaterial {
                    kid: config.signing_key_id.clone().unwrap_or_default(),
                    reason: format!("failed to read {}: {e}", path.display()),
                })?;
                SigningKey::from_rsa_pem(
                    config.signing_key_id.clone(),
                    config.default_algorithm,
                    &pem,
                )?
            }
            None => {
                info!(alg = %config.default_algorithm, "No signing key configured, generating one");
                SigningKey::generate_rsa(config.signing_key_id.clone(), config.default_algorithm)?
            }
        };

        Ok(Self::single(key))
    }

    /// Set how many retired keys stay published.
    #[must_use]
    pub fn with_retention(mut self, retention: usize) -> Self {
        self.retention = retention;
        self.retired.truncate(retention);
        self
    }

    /// The installation's default algorithm.
    #[must_use]
    pub fn default_algorithm(&self) -> JwtAlgorithm {
        self.default_algorithm
    }

    /// Algorithms with a current signing key, in configuration order.
    #[must_use]
    pub fn supported_algorithms(&self) -> Vec<JwtAlgorithm> {
        self.current.iter().map(|k| k.algorithm()).collect()
    }

    /// Resolve the algorithm for a signing request.
    ///
    /// No request yields the default; a supported request is returned as is.
    pub fn select_algorithm(
        &self,
        requested: Option<&str>,
    ) -> Result<JwtAlgorithm, UnsupportedAlgorithm> {
        let Some(name) = requested else {
            return Ok(self.default_algorithm);
        };

        JwtAlgorithm::parse(name)
            .filter(|alg| self.signing_key(*alg).is_some())
            .ok_or_else(|| UnsupportedAlgorithm {
                requested: name.to_string(),
            })
    }

    /// Current signing key for an algorithm.
    #[must_use]
    pub fn signing_key(&self, algorithm: JwtAlgorithm) -> Option<&SigningKey> {
        self.current
            .iter()
            .find(|k| k.algorithm() == algorithm)
            .map(|k| &**k)
    }

    /// Every published key: current keys first, then retired keys newest first.
    pub fn published_keys(&self) -> impl Iterator<Item = &SigningKey> {
        self.current.iter().chain(self.retired.iter()).map(|k| &**k)
    }

    /// Build a successor where `new_key` becomes current for its algorithm.
    ///
    /// The replaced key moves to the retired set so tokens it signed stay
    /// verifiable; the oldest retired keys beyond the retention drop out.
    pub fn rotated(&self, new_key: SigningKey) -> Result<Self, KeyError> {
        let algorithm = new_key.algorithm();
        let mut current = Vec::with_capacity(self.current.len() + 1);
        let mut retired = Vec::with_capacity(self.retired.len() + 1);
        let mut new_key = Some(Arc::new(new_key));

        for key in &self.current {
            if key.algorithm() == algorithm {
                retired.push(Arc::clone(key));
                if let Some(replacement) = new_key.take() {
                    current.push(replacement);
                }
            } else {
                current.push(Arc::clone(key));
            }
        }
        if let Some(added) = new_key {
            current.push(added);
        }

        retired.extend(self.retired.iter().cloned());
        retired.truncate(self.retention);

        let successor = Self {
            current,
            retired,
            default_algorithm: self.default_algorithm,
            retention: self.retention,
        };
        successor.check_unique_kids()?;

        debug!(
            alg = %algorithm,
            published = successor.published_keys().count(),
            "Rotated signing key"
        );
        Ok(successor)
    }

    fn check_unique_kids(&self) -> Result<(), KeyError> {
        let mut kids = HashSet::new();
        for key in self.published_keys() {
            if !kids.insert(key.kid()) {
                return Err(KeyError::DuplicateKeyId {
                    kid: key.kid().to_string(),
                });
            }
        }
        Ok(())
    }
}
