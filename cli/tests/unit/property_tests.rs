//! Property-based tests for naming, configuration and profile validation.
//!
//! Uses `proptest` to verify invariants across many random inputs.

#![allow(clippy::unwrap_used)]

use proptest::prelude::*;
use serde_json::json;

use flow_cli::domain::config::VALID_CONFIG_KEYS;
use flow_cli::domain::identity::derive_uuid;
use flow_cli::domain::profile::{validate_option, validate_profile};
use flow_cli::domain::source::sanitize_log_line;
use flow_cli::domain::{FlowConfig, apply_config_value, validate_config_key};

// ============================================================================
// derive_uuid() property tests
// ============================================================================

proptest! {
    /// Derived uuids are stable and follow `name.user_ref`.
    #[test]
    fn prop_derived_uuid_is_deterministic(
        name in "[a-z][a-z0-9]{0,15}",
        user in "[a-z][a-z0-9]{0,15}",
        reference in "[0-9a-f]{7,40}",
    ) {
        let a = derive_uuid(None, &name, &user, &reference).unwrap();
        let b = derive_uuid(None, &name, &user, &reference).unwrap();
        prop_assert_eq!(&a, &b);
        prop_assert_eq!(a, format!("{name}.{user}_{reference}"));
    }

    /// Derived uuids never contain whitespace: outer space is trimmed,
    /// inner space is refused.
    #[test]
    fn prop_derived_uuid_has_no_whitespace(
        name in " ?[a-z]{1,8}( [a-z]{1,8}){0,3} ?",
        user in "[a-z]{1,8}",
        reference in " ?[0-9a-f]{7,12} ?",
    ) {
        match derive_uuid(None, &name, &user, &reference) {
            Ok(uuid) => {
                prop_assert!(!uuid.chars().any(char::is_whitespace), "whitespace in {uuid}");
                prop_assert!(!name.trim().contains(' '));
            }
            Err(err) => {
                prop_assert!(name.trim().contains(' '), "unexpected rejection: {err}");
            }
        }
    }

    /// Explicit names outside the allowed alphabet are refused.
    #[test]
    fn prop_explicit_name_with_slash_rejected(prefix in "[a-z]{1,10}", suffix in "[a-z]{1,10}") {
        let name = format!("{prefix}/{suffix}");
        prop_assert!(derive_uuid(Some(&name), "svc", "alice", "abc").is_err());
    }

    /// Explicit names inside the alphabet win over derivation.
    #[test]
    fn prop_explicit_name_used_verbatim(name in "[A-Za-z0-9._-]{1,64}") {
        prop_assert_eq!(derive_uuid(Some(&name), "svc", "alice", "abc").unwrap(), name);
    }
}

#[test]
fn test_derive_uuid_overlong_name_rejected() {
    let name = "a".repeat(129);
    assert!(derive_uuid(Some(&name), "svc", "alice", "abc").is_err());
}

// ============================================================================
// Config key and value property tests
// ============================================================================

proptest! {
    /// Arbitrary keys outside the whitelist are rejected.
    #[test]
    fn prop_arbitrary_keys_rejected(key in "[a-z]{1,12}\\.[a-z_]{1,16}") {
        if !VALID_CONFIG_KEYS.contains(&key.as_str()) {
            prop_assert!(validate_config_key(&key).is_err(), "accepted invalid key: {key}");
        }
    }

    /// Positive integers are accepted for numeric settings, zero never is.
    #[test]
    fn prop_fleet_concurrency_accepts_positive(n in 1usize..10_000) {
        let mut config = FlowConfig::default();
        apply_config_value(&mut config, "fleet.concurrency", &n.to_string()).unwrap();
        prop_assert_eq!(config.fleet.concurrency, n);
        prop_assert!(apply_config_value(&mut config, "fleet.concurrency", "0").is_err());
        prop_assert_eq!(config.fleet.concurrency, n);
    }

    /// Registry urls must use a redis scheme.
    #[test]
    fn prop_registry_url_requires_redis_scheme(host in "[a-z]{1,12}") {
        let mut config = FlowConfig::default();
        let http_url = format!("http://{host}");
        prop_assert!(apply_config_value(&mut config, "registry.url", &http_url).is_err());
        apply_config_value(&mut config, "registry.url", &format!("redis://{host}:6379")).unwrap();
        prop_assert_eq!(config.registry.url, format!("redis://{host}:6379"));
    }
}

#[test]
fn test_every_whitelisted_key_is_accepted() {
    for key in VALID_CONFIG_KEYS {
        assert!(validate_config_key(key).is_ok(), "{key}");
    }
}

// ============================================================================
// Profile validator property tests
// ============================================================================

proptest! {
    /// Positive pool limits pass, so do unknown options with any value.
    #[test]
    fn prop_pool_limit_positive_accepted(n in 1u64..100_000, custom in ".*") {
        let profile = validate_profile(&json!({"pool-limit": n, "custom": custom})).unwrap();
        prop_assert_eq!(profile.len(), 2);
    }

    /// Negative timeouts are always rejected.
    #[test]
    fn prop_negative_timeout_rejected(t in -1.0e6f64..-1.0e-6) {
        prop_assert!(validate_option("idle-timeout", &json!(t)).is_err());
    }

    /// Non-boolean log-output values are rejected.
    #[test]
    fn prop_log_output_must_be_boolean(s in "[a-z]{1,8}") {
        prop_assert!(validate_option("log-output", &json!(s)).is_err());
    }
}

// ============================================================================
// Changelog sanitizing
// ============================================================================

proptest! {
    /// Sanitized lines never carry escape characters or surrounding space.
    #[test]
    fn prop_sanitized_line_has_no_escapes(body in "[a-zA-Z0-9 \\[\\]]{1,40}", color in 30u8..38) {
        let raw = format!("\x1b[{color}m{body}\x1b[m\r");
        if let Some(clean) = sanitize_log_line(&raw) {
            prop_assert!(!clean.contains('\x1b'));
            prop_assert_eq!(clean.trim(), clean.as_str());
        }
    }
}
