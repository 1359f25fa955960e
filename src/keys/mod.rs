//! Signing keys and the algorithms they serve.

pub mod algorithm;
pub mod manager;
pub mod signing_key;

pub use algorithm::JwtAlgorithm;
pub use manager::{KeyManager, UnsupportedAlgorithm, DEFAULT_RETIRED_KEY_RETENTION};
pub use signing_key::SigningKey;
