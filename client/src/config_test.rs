use std::collections::HashMap;

use super::*;

fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
        .collect();
    move |key| map.get(key).cloned()
}

// =============================================================================
// from_lookup
// =============================================================================

#[test]
fn defaults_when_nothing_set() {
    let cfg = ClientConfig::from_lookup(lookup_from(&[])).unwrap();
    assert_eq!(cfg.base_url, DEFAULT_API_BASE_URL);
    assert_eq!(
        cfg.timeouts,
        Timeouts { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    );
    assert_eq!(cfg, ClientConfig::default());
}

#[test]
fn api_url_takes_precedence_over_backend_url() {
    let cfg = ClientConfig::from_lookup(lookup_from(&[
        ("SPHERE_API_URL", "https://crm.example.test/"),
        ("SPHERE_BACKEND_URL", "http://other.example.test"),
    ]))
    .unwrap();
    assert_eq!(cfg.base_url, "https://crm.example.test");
}

#[test]
fn backend_url_used_when_api_url_blank() {
    let cfg = ClientConfig::from_lookup(lookup_from(&[
        ("SPHERE_API_URL", "   "),
        ("SPHERE_BACKEND_URL", "http://backend:9000//"),
    ]))
    .unwrap();
    assert_eq!(cfg.base_url, "http://backend:9000");
}

#[test]
fn timeouts_parse_overrides() {
    let cfg = ClientConfig::from_lookup(lookup_from(&[
        ("SPHERE_REQUEST_TIMEOUT_SECS", "42"),
        ("SPHERE_CONNECT_TIMEOUT_SECS", " 7 "),
    ]))
    .unwrap();
    assert_eq!(cfg.timeouts, Timeouts { request_secs: 42, connect_secs: 7 });
}

#[test]
fn invalid_timeout_is_an_error() {
    let err = ClientConfig::from_lookup(lookup_from(&[("SPHERE_REQUEST_TIMEOUT_SECS", "soon")])).unwrap_err();
    assert_eq!(
        err,
        ConfigError::InvalidNumber { key: "SPHERE_REQUEST_TIMEOUT_SECS", value: "soon".to_owned() }
    );
}

#[test]
fn non_http_base_url_is_rejected() {
    let err = ClientConfig::from_lookup(lookup_from(&[("SPHERE_API_URL", "ftp://files")])).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidBaseUrl(_)));
}

// =============================================================================
// normalize_base_url / with_base_url
// =============================================================================

#[test]
fn normalize_requires_host_after_scheme() {
    assert!(normalize_base_url("http://").is_err());
    assert!(normalize_base_url("https:///").is_err());
    assert!(normalize_base_url("localhost:8080").is_err());
}

#[test]
fn normalize_trims_whitespace_and_slashes() {
    assert_eq!(normalize_base_url("  http://localhost:8080/  ").unwrap(), "http://localhost:8080");
}

#[test]
fn with_base_url_keeps_timeouts() {
    let cfg = ClientConfig { base_url: DEFAULT_API_BASE_URL.to_owned(), timeouts: Timeouts { request_secs: 5, connect_secs: 2 } }
        .with_base_url("http://127.0.0.1:3000/")
        .unwrap();
    assert_eq!(cfg.base_url, "http://127.0.0.1:3000");
    assert_eq!(cfg.timeouts, Timeouts { request_secs: 5, connect_secs: 2 });
}
