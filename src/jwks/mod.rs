//! Public key publication: the JWKS document and OpenID discovery.

pub mod discovery;
pub mod document;
pub mod publisher;

pub use discovery::{DiscoveryResult, OpenIdDiscovery, JWKS_PATH};
pub use document::{GetJwksResult, JsonWebKey, JwksDocument};
pub use publisher::{JwksPublisher, PublishKeys};
