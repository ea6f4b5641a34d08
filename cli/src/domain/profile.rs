//! Profile option validators.
//!
//! Pure logic, no I/O.

use flow_common::Profile;
use serde_json::Value;

use crate::domain::error::ProfileError;

type Validator = fn(&Value) -> Result<(), String>;

/// Options with a known shape. Anything else passes through unvalidated.
pub const PROFILE_OPTION_VALIDATORS: &[(&str, Validator)] = &[
    ("pool-limit", positive_integer),
    ("queue-limit", positive_integer),
    ("concurrency", positive_integer),
    ("idle-timeout", non_negative_number),
    ("startup-timeout", non_negative_number),
    ("heartbeat-timeout", non_negative_number),
    ("termination-timeout", non_negative_number),
    ("isolate", isolate_spec),
    ("log-output", boolean),
];

fn validator_for(option: &str) -> Option<Validator> {
    PROFILE_OPTION_VALIDATORS
        .iter()
        .find(|(name, _)| *name == option)
        .map(|(_, v)| *v)
}

/// Validate every known option of a profile body.
///
/// # Errors
///
/// Returns [`ProfileError::NotAnObject`] for non-object bodies and
/// [`ProfileError::InvalidOption`] for the first option that fails its validator.
pub fn validate_profile(body: &Value) -> Result<Profile, ProfileError> {
    let profile = body.as_object().ok_or(ProfileError::NotAnObject)?;
    for (option, value) in profile {
        validate_option(option, value)?;
    }
    Ok(profile.clone())
}

/// Validate a single option value.
///
/// # Errors
///
/// Returns [`ProfileError::InvalidOption`] if a validator exists and rejects the value.
pub fn validate_option(option: &str, value: &Value) -> Result<(), ProfileError> {
    match validator_for(option) {
        Some(validator) => validator(value).map_err(|reason| ProfileError::InvalidOption {
            option: option.to_string(),
            value: value.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

/// Update one existing option from its textual form.
///
/// The raw value is read as JSON when it parses, otherwise as a string.
/// Only options already present in the profile may be edited.
///
/// # Errors
///
/// Returns [`ProfileError::UnknownOption`] for options not in the profile and
/// [`ProfileError::InvalidOption`] when the validator rejects the value.
pub fn edit_option(profile: &mut Profile, option: &str, raw: &str) -> Result<(), ProfileError> {
    if !profile.contains_key(option) {
        return Err(ProfileError::UnknownOption(option.to_string()));
    }
    let value = serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    validate_option(option, &value)?;
    profile.insert(option.to_string(), value);
    Ok(())
}

fn positive_integer(value: &Value) -> Result<(), String> {
    match value.as_u64() {
        Some(n) if n > 0 => Ok(()),
        _ => Err("expected a positive integer".to_string()),
    }
}

fn non_negative_number(value: &Value) -> Result<(), String> {
    match value.as_f64() {
        Some(n) if n >= 0.0 && n.is_finite() => Ok(()),
        _ => Err("expected a non-negative number".to_string()),
    }
}

fn boolean(value: &Value) -> Result<(), String> {
    if value.is_boolean() {
        Ok(())
    } else {
        Err("expected true or false".to_string())
    }
}

fn isolate_spec(value: &Value) -> Result<(), String> {
    match value.get("type") {
        Some(Value::String(kind)) if !kind.is_empty() => Ok(()),
        _ => Err("expected an object with a string `type`".to_string()),
    }
}
