//! Third-party ID token verification.

pub mod claims;
pub mod id_token;
pub mod jwk_cache;

pub use claims::{Audience, IdTokenClaims};
pub use id_token::{IdTokenVerifier, VerifyIdToken};
pub use jwk_cache::{CachedKey, JwkCache, KeyFamily};
