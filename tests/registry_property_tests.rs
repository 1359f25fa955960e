//! Property-based tests for the provider registry.
//!
//! Property 1: Construction outcome does not depend on list order
//! Property 2: Resolution honours sole-entry, default, then client-id rules

use proptest::prelude::*;
use std::collections::HashMap;
use trust_core::{ConfigError, Config, Provider, ProviderRegistry, Published};

/// Generate provider entries over a small id and client-id space so that
/// duplicates and default conflicts are common.
fn arb_provider() -> impl Strategy<Value = Provider> {
    (
        prop::sample::select(vec!["google", "github", "apple"]),
        prop::option::of(prop::sample::select(vec!["c1", "c2", "c3"])),
        prop::bool::weighted(0.3),
    )
        .prop_map(|(id, client_id, is_default)| Provider {
            id: id.to_string(),
            client_id: client_id.map(str::to_string),
            is_default,
            jwks_uri: None,
            issuers: Vec::new(),
        })
}

fn arb_providers() -> impl Strategy<Value = Vec<Provider>> {
    prop::collection::vec(arb_provider(), 0..8)
}

/// Outcome with the order-dependent parts stripped.
fn outcome(providers: Vec<Provider>) -> Result<(), ConfigError> {
    ProviderRegistry::new(providers).map(|_| ())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property 1: any permutation yields the same accepted/rejected outcome,
    /// including the identifier named by the error.
    #[test]
    fn prop_construction_is_order_independent(
        (providers, shuffled) in arb_providers()
            .prop_flat_map(|p| (Just(p.clone()), Just(p).prop_shuffle())),
    ) {
        prop_assert_eq!(outcome(providers.clone()), outcome(shuffled));
        // Idempotent
        prop_assert_eq!(outcome(providers.clone()), outcome(providers));
    }

    /// Property 2: every accepted registry resolves each identifier to its
    /// default when no client id is given.
    #[test]
    fn prop_every_identifier_has_a_default(providers in arb_providers()) {
        if let Ok(registry) = ProviderRegistry::new(providers.clone()) {
            for provider in &providers {
                let resolved = registry.resolve(&provider.id, None);
                prop_assert!(resolved.is_some());
                prop_assert_eq!(resolved, registry.default_for(&provider.id));
            }
        }
    }

    /// Property 3: a sole entry is returned for any client id.
    #[test]
    fn prop_sole_entry_ignores_client_id(
        provider in arb_provider(),
        client_id in prop::option::of("[a-z0-9]{1,8}"),
    ) {
        let registry = ProviderRegistry::new(vec![provider.clone()]).unwrap();
        prop_assert_eq!(registry.resolve(&provider.id, client_id.as_deref()), Some(&provider));
    }
}

#[test]
fn test_single_default_among_duplicates_accepted() {
    let providers = vec![
        Provider::new("google").as_default(),
        Provider::new("google").with_client_id("c2"),
    ];
    assert!(ProviderRegistry::new(providers).is_ok());
}

#[test]
fn test_second_default_rejected() {
    let providers = vec![
        Provider::new("google").as_default(),
        Provider::new("google").with_client_id("c2"),
        Provider::new("google").with_client_id("c3").as_default(),
    ];
    assert_eq!(
        ProviderRegistry::new(providers).unwrap_err(),
        ConfigError::MultipleDefaults {
            id: "google".to_string()
        }
    );
}

#[test]
fn test_sole_entry_resolved_without_client_id() {
    let registry = ProviderRegistry::new(vec![Provider::new("google").with_client_id("c1")]).unwrap();
    let resolved = registry.resolve("google", None).unwrap();
    assert_eq!(resolved.client_id.as_deref(), Some("c1"));
}

#[test]
fn test_matching_client_id_preferred_over_default() {
    let registry = ProviderRegistry::new(vec![
        Provider::new("google").with_client_id("c1").as_default(),
        Provider::new("google").with_client_id("c2"),
    ])
    .unwrap();

    let resolved = registry.resolve("google", Some("c2")).unwrap();
    assert_eq!(resolved.client_id.as_deref(), Some("c2"));
    assert!(!resolved.is_default);
}

#[test]
fn test_registry_from_env_shaped_config() {
    let vars: HashMap<String, String> = [(
        "THIRD_PARTY_PROVIDERS".to_string(),
        r#"[{"id":"google","client_id":"c1","is_default":true},
            {"id":"google","client_id":"c2"},
            {"id":"github","client_id":"gh"}]"#
            .to_string(),
    )]
    .into_iter()
    .collect();
    let config = Config::from_map(&vars).unwrap();

    let registry = ProviderRegistry::from_config(&config).unwrap();

    assert_eq!(registry.len(), 3);
    assert_eq!(
        registry.resolve("github", Some("anything")).unwrap().client_id.as_deref(),
        Some("gh")
    );
}

#[test]
fn test_reconfiguration_swaps_whole_registry() {
    let published = Published::new(
        ProviderRegistry::new(vec![Provider::new("google").with_client_id("old")]).unwrap(),
    );
    let in_flight = published.snapshot();

    published.replace(
        ProviderRegistry::new(vec![Provider::new("google").with_client_id("new")]).unwrap(),
    );

    assert_eq!(
        in_flight.resolve("google", None).unwrap().client_id.as_deref(),
        Some("old")
    );
    assert_eq!(
        published.snapshot().resolve("google", None).unwrap().client_id.as_deref(),
        Some("new")
    );
}
