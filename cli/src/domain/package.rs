//! Package declaration parsing and validation.
//!
//! Pure logic, no I/O.

use flow_common::{PackageInfo, RuntimeKind};
use serde_json::Value;

use crate::domain::error::BuildError;

/// Declaration file expected at the checkout root. Never shipped in the archive.
pub const DECLARATION_FILE: &str = "info.yaml";

/// Parse and validate a YAML declaration.
///
/// # Errors
///
/// Returns [`BuildError::InvalidManifest`] for malformed YAML or a declaration
/// that fails [`validate_info`].
pub fn parse_declaration(yaml: &str) -> Result<PackageInfo, BuildError> {
    let value: Value = serde_yaml::from_str(yaml)
        .map_err(|e| BuildError::InvalidManifest(format!("bad encoded {DECLARATION_FILE}: {e}")))?;
    validate_info(&value).map_err(BuildError::InvalidManifest)
}

/// Validate a declaration already decoded into a JSON value.
///
/// Accepts the legacy field names `depends` and `nodejs_version`. Version
/// expressions written as bare numbers are kept as their textual form.
///
/// # Errors
///
/// Returns a human-readable description of the first violation.
pub fn validate_info(value: &Value) -> Result<PackageInfo, String> {
    let map = value
        .as_object()
        .ok_or_else(|| "package info must be a mapping".to_string())?;

    let runtime = match map.get("type") {
        Some(Value::String(s)) => s.parse::<RuntimeKind>().map_err(|e| e.to_string())?,
        Some(other) => return Err(format!("{other} type is not supported")),
        None => return Err("App type is required in info file".to_string()),
    };

    let name = required_string(map, "name")
        .ok_or_else(|| "App name is required in info file".to_string())?;
    let description = required_string(map, "description")
        .ok_or_else(|| "App description is required in info file".to_string())?;

    let dependencies = match map.get("dependencies").or_else(|| map.get("depends")) {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
                other => Err(format!("invalid dependency specifier {other}")),
            })
            .collect::<Result<Vec<_>, _>>()?,
        Some(_) => return Err("dependencies must be a list".to_string()),
    };

    let runtime_version = match map
        .get("runtime_version")
        .or_else(|| map.get("nodejs_version"))
    {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(other) => return Err(format!("invalid runtime version {other}")),
    };

    Ok(PackageInfo {
        runtime,
        name,
        description,
        dependencies,
        runtime_version,
        changelog: Vec::new(),
        structure: Vec::new(),
        slave: None,
    })
}

fn required_string(map: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
    match map.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}
