use super::*;
use crate::config::CustomHeaders;

#[test]
fn test_table_rows_match_their_provider() {
    for provider in Provider::ALL {
        assert_eq!(ProviderAdapter::for_provider(provider).provider, provider);
    }
    let order: Vec<Provider> = ProviderAdapter::all().iter().map(|a| a.provider).collect();
    assert_eq!(order, Provider::ALL.to_vec());
}

/// Only Gitee verifies whenever a token is present.
#[test]
fn test_only_gitee_always_validates_present_token() {
    let flagged: Vec<Provider> = ProviderAdapter::all()
        .iter()
        .filter(|a| a.always_validate_when_token_present)
        .map(|a| a.provider)
        .collect();
    assert_eq!(flagged, vec![Provider::Gitee]);
}

#[test]
fn test_fixed_sources_ignore_configuration() {
    let config = ProviderConfig::new(Provider::Github);
    let adapter = ProviderAdapter::for_provider(Provider::Github);
    assert_eq!(adapter.token_header.resolve(&config), Some("X-Hub-Signature"));
    assert_eq!(adapter.identifier_path.resolve(&config), Some("repository.full_name"));
}

#[test]
fn test_custom_sources_follow_layout() {
    let config = ProviderConfig::new(Provider::Custom).with_custom_headers(CustomHeaders {
        header_token: "X-Deploy-Key".to_string(),
        identifier_path: "repo.name".to_string(),
        ..CustomHeaders::default()
    });
    let adapter = ProviderAdapter::for_provider(Provider::Custom);
    assert_eq!(adapter.token_header.resolve(&config), Some("X-Deploy-Key"));
    assert_eq!(adapter.identifier_path.resolve(&config), Some("repo.name"));
    assert_eq!(adapter.event_header.resolve(&config), Some("X-Custom-Event"));
}

/// Empty layout entries resolve to nothing.
#[test]
fn test_custom_sources_empty_when_unset() {
    let config = ProviderConfig::new(Provider::Custom);
    let adapter = ProviderAdapter::for_provider(Provider::Custom);
    assert_eq!(adapter.identifier_path.resolve(&config), None);

    let without_layout = ProviderConfig {
        custom: None,
        ..ProviderConfig::new(Provider::Custom)
    };
    assert_eq!(adapter.token_header.resolve(&without_layout), None);
}
