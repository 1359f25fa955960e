//! Provider registry and resolution.
//!
//! The registry is validated and indexed once; lookups never scan the list.

use crate::config::Config;
use crate::error::ConfigError;
use crate::metrics;
use crate::provider::descriptor::Provider;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Validated, immutable set of third-party providers.
#[derive(Debug, Clone)]
pub struct ProviderRegistry {
    providers: Vec<Provider>,
    /// Positions of every entry per identifier, in configuration order
    by_id: HashMap<String, Vec<usize>>,
    /// The resolvable default per identifier
    defaults: HashMap<String, usize>,
    /// First entry per (identifier, client id)
    by_client: HashMap<(String, String), usize>,
}

impl ProviderRegistry {
    /// Validate and index a provider list.
    ///
    /// Every identifier must have exactly one resolvable default: either it
    /// has a single entry, or exactly one of its entries sets `is_default`.
    /// The outcome does not depend on the order of `providers`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoProviders`] for an empty list, or
    /// [`ConfigError::MultipleDefaults`] / [`ConfigError::MissingDefault`]
    /// naming the first offending identifier in lexical order.
    pub fn new(providers: Vec<Provider>) -> Result<Self, ConfigError> {
        if providers.is_empty() {
            return Err(ConfigError::NoProviders);
        }

        let mut grouped: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for (index, provider) in providers.iter().enumerate() {
            grouped.entry(provider.id.as_str()).or_default().push(index);
        }

        let mut defaults = HashMap::with_capacity(grouped.len());
        for (id, indices) in &grouped {
            let marked: Vec<usize> = indices
                .iter()
                .copied()
                .filter(|&i| providers[i].is_default)
                .collect();

            let default = match (indices.as_slice(), marked.as_slice()) {
                ([only], _) => *only,
                (_, [marked]) => *marked,
                (_, []) => return Err(ConfigError::MissingDefault { id: id.to_string() }),
                _ => return Err(ConfigError::MultipleDefaults { id: id.to_string() }),
            };
            defaults.insert(id.to_string(), default);
        }

        let by_id = grouped
            .into_iter()
            .map(|(id, indices)| (id.to_string(), indices))
            .collect();

        let mut by_client = HashMap::new();
        for (index, provider) in providers.iter().enumerate() {
            if let Some(client_id) = &provider.client_id {
                by_client
                    .entry((provider.id.clone(), client_id.clone()))
                    .or_insert(index);
            }
        }

        debug!(
            providers = providers.len(),
            identifiers = defaults.len(),
            "Provider registry built"
        );

        Ok(Self {
            providers,
            by_id,
            defaults,
            by_client,
        })
    }

    /// Build the registry from the configured provider list.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Self::new(config.providers.clone())
    }

    /// Resolve the provider entry for an identifier and optional client ID.
    ///
    /// 1. A sole entry for `id` is returned whatever `client_id` says.
    /// 2. Without a client ID the default entry for `id` is returned.
    /// 3. Otherwise the entry whose client ID equals `client_id`.
    ///
    /// Returns `None` when no rule matches.
    pub fn resolve(&self, id: &str, client_id: Option<&str>) -> Option<&Provider> {
        let resolved = self.resolve_index(id, client_id).map(|i| &self.providers[i]);

        match resolved {
            Some(provider) => {
                metrics::record_provider_resolution("found");
                debug!(provider_id = %id, client_id = ?provider.client_id, "Resolved provider");
            }
            None => {
                metrics::record_provider_resolution("not_found");
                debug!(provider_id = %id, client_id = ?client_id, "No matching provider");
            }
        }
        resolved
    }

    fn resolve_index(&self, id: &str, client_id: Option<&str>) -> Option<usize> {
        let matches = self.by_id.get(id)?;
        if let [only] = matches.as_slice() {
            return Some(*only);
        }
        match client_id {
            None => self.defaults.get(id).copied(),
            Some(client_id) => self
                .by_client
                .get(&(id.to_string(), client_id.to_string()))
                .copied(),
        }
    }

    /// The default entry for an identifier.
    pub fn default_for(&self, id: &str) -> Option<&Provider> {
        self.defaults.get(id).map(|&i| &self.providers[i])
    }

    /// All entries in configuration order.
    pub fn providers(&self) -> &[Provider] {
        &self.providers
    }

    /// Number of configured entries.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Always false; construction rejects empty lists.
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
