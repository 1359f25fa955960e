//! Third-party identity providers.

pub mod descriptor;
pub mod registry;

pub use descriptor::Provider;
pub use registry::ProviderRegistry;
