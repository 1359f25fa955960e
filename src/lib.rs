//! Trust core library.
//!
//! Provides self-issued JWT signing, JWKS and OpenID discovery publication,
//! third-party identity provider resolution, and ID token verification
//! against remote key sets.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod jwks;
pub mod jwt;
pub mod keys;
pub mod metrics;
pub mod provider;
pub mod published;
pub mod telemetry;
pub mod verifier;

// Re-exports for convenience
pub use config::Config;
pub use error::{ConfigError, IssueError, KeyError, TrustError, VerificationError};
pub use jwks::{GetJwksResult, JsonWebKey, JwksDocument, JwksPublisher, OpenIdDiscovery, PublishKeys};
pub use jwt::{CreateJwtResult, IssueToken, JwtIssuer};
pub use keys::{JwtAlgorithm, KeyManager, SigningKey};
pub use provider::{Provider, ProviderRegistry};
pub use published::Published;
pub use verifier::{IdTokenClaims, IdTokenVerifier, VerifyIdToken};
