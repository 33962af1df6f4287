use std::collections::HashMap;
use std::env::VarError;

use super::*;

fn lookup_from_map<'a>(
    map: &'a HashMap<&'a str, &'a str>,
) -> impl Fn(&str) -> Result<String, VarError> + 'a {
    move |key| {
        map.get(key)
            .map(|v| (*v).to_string())
            .ok_or(VarError::NotPresent)
    }
}

/// Returns a map with all required env vars populated with valid defaults.
fn full_env<'a>() -> HashMap<&'a str, &'a str> {
    let mut m = HashMap::new();
    m.insert("AWRC_BASE_URL", "http://localhost:8081");
    m
}

#[test]
fn parse_environment_known_values() {
    assert_eq!(
        parse_environment("development").unwrap(),
        Environment::Development
    );
    assert_eq!(parse_environment("test").unwrap(), Environment::Test);
    assert_eq!(
        parse_environment("production").unwrap(),
        Environment::Production
    );
}

#[test]
fn parse_environment_unknown_fails() {
    let err = parse_environment("staging").unwrap_err();
    assert!(matches!(err, ConfigError::InvalidEnvVar { ref var, .. } if var == "AWRC_ENV"));
}

#[test]
fn build_app_config_fails_without_base_url() {
    let map: HashMap<&str, &str> = HashMap::new();
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::MissingEnvVar(ref v)) if v == "AWRC_BASE_URL"),
        "expected MissingEnvVar(AWRC_BASE_URL), got: {result:?}"
    );
}

#[test]
fn build_app_config_rejects_base_url_without_scheme() {
    let mut map = full_env();
    map.insert("AWRC_BASE_URL", "localhost:8081");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "AWRC_BASE_URL"),
        "expected InvalidEnvVar(AWRC_BASE_URL), got: {result:?}"
    );
}

#[test]
fn build_app_config_succeeds_with_defaults() {
    let map = full_env();
    let cfg = build_app_config(lookup_from_map(&map)).expect("config should build");
    assert_eq!(cfg.env, Environment::Development);
    assert_eq!(cfg.base_url, "http://localhost:8081");
    assert_eq!(cfg.log_level, "info");
    assert!(cfg.auth_cookie.is_none());
    assert!(!cfg.public_templates);
    assert_eq!(cfg.request_timeout_secs, 30);
    assert_eq!(cfg.user_agent, "awrc/0.1 (reporting-console)");
    assert_eq!(cfg.poll_interval_ms, 2000);
    assert_eq!(cfg.page_size, 10);
}

#[test]
fn public_templates_flag_accepts_common_spellings() {
    for (raw, expected) in [("true", true), ("1", true), ("YES", true), ("no", false)] {
        let mut map = full_env();
        map.insert("AWRC_PUBLIC_TEMPLATES", raw);
        let cfg = build_app_config(lookup_from_map(&map)).unwrap();
        assert_eq!(cfg.public_templates, expected, "{raw}");
    }
}

#[test]
fn public_templates_flag_rejects_garbage() {
    let mut map = full_env();
    map.insert("AWRC_PUBLIC_TEMPLATES", "maybe");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "AWRC_PUBLIC_TEMPLATES")
    );
}

#[test]
fn poll_interval_override_and_zero() {
    let mut map = full_env();
    map.insert("AWRC_POLL_INTERVAL_MS", "500");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.poll_interval_ms, 500);

    map.insert("AWRC_POLL_INTERVAL_MS", "0");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "AWRC_POLL_INTERVAL_MS")
    );
}

#[test]
fn request_timeout_invalid() {
    let mut map = full_env();
    map.insert("AWRC_REQUEST_TIMEOUT_SECS", "not-a-number");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "AWRC_REQUEST_TIMEOUT_SECS"),
        "expected InvalidEnvVar(AWRC_REQUEST_TIMEOUT_SECS), got: {result:?}"
    );
}

#[test]
fn page_size_must_be_an_offered_size() {
    let mut map = full_env();
    map.insert("AWRC_PAGE_SIZE", "25");
    assert_eq!(build_app_config(lookup_from_map(&map)).unwrap().page_size, 25);

    map.insert("AWRC_PAGE_SIZE", "30");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "AWRC_PAGE_SIZE")
    );
}

#[test]
fn auth_cookie_is_redacted_in_debug() {
    let mut map = full_env();
    map.insert("AWRC_AUTH_COOKIE", "session=secret-value");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.auth_cookie.as_deref(), Some("session=secret-value"));
    let rendered = format!("{cfg:?}");
    assert!(!rendered.contains("secret-value"));
    assert!(rendered.contains("[redacted]"));
}
