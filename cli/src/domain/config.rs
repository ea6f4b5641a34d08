//! Domain types and validators for flow configuration.
//!
//! Pure logic, no I/O.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::error::ConfigError;

// ── Constants ────────────────────────────────────────────────────────────────

pub const VALID_CONFIG_KEYS: &[&str] = &[
    "registry.url",
    "fleet.port",
    "fleet.timeout_secs",
    "fleet.concurrency",
    "build.upload_folder",
    "build.keep_workdir",
    "build.command_timeout_secs",
    "build.install_timeout_secs",
    "build.changelog_depth",
    "runtimes.python.pip",
    "runtimes.nodejs.prefix",
    "runtimes.nodejs.worker",
    "auth.token",
];

pub const DEFAULT_REGISTRY_URL: &str = "redis://127.0.0.1:6379";
pub const DEFAULT_FLEET_PORT: u16 = 10053;

// ── Config schema ────────────────────────────────────────────────────────────

/// Top-level configuration stored in `~/.flow/config.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct FlowConfig {
    pub registry: RegistryConfig,
    pub fleet: FleetConfig,
    pub build: BuildConfig,
    pub runtimes: RuntimesConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RegistryConfig {
    pub url: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_REGISTRY_URL.to_string(),
        }
    }
}

/// Fleet RPC settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FleetConfig {
    /// Port every worker host listens on.
    pub port: u16,
    /// Per-host response bound.
    pub timeout_secs: u64,
    /// Maximum in-flight host calls per dispatch.
    pub concurrency: usize,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_FLEET_PORT,
            timeout_secs: 10,
            concurrency: 32,
        }
    }
}

impl FleetConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Artifact build settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BuildConfig {
    /// Parent of per-repository working directories.
    pub upload_folder: PathBuf,
    /// Keep the checkout after the build for debugging.
    pub keep_workdir: bool,
    pub command_timeout_secs: u64,
    pub install_timeout_secs: u64,
    /// Number of log entries recorded in `changelog`.
    pub changelog_depth: usize,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            upload_folder: std::env::temp_dir(),
            keep_workdir: false,
            command_timeout_secs: 300,
            install_timeout_secs: 900,
            changelog_depth: 5,
        }
    }
}

impl BuildConfig {
    #[must_use]
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    #[must_use]
    pub fn install_timeout(&self) -> Duration {
        Duration::from_secs(self.install_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct RuntimesConfig {
    pub python: PythonRuntimeConfig,
    pub nodejs: NodejsRuntimeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PythonRuntimeConfig {
    /// Installer program; `pip<version>` is used when a runtime version is declared.
    pub pip: String,
}

impl Default for PythonRuntimeConfig {
    fn default() -> Self {
        Self {
            pip: "pip".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NodejsRuntimeConfig {
    /// Directory holding `node-<version>` engine installs.
    pub prefix: PathBuf,
    /// Worker entrypoint binary inside each engine's `bin/`.
    pub worker: String,
}

impl Default for NodejsRuntimeConfig {
    fn default() -> Self {
        Self {
            prefix: PathBuf::from("/opt/flow/nodejs"),
            worker: "flow-worker".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct AuthConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

// ── Validators ───────────────────────────────────────────────────────────────

/// Validates a configuration key against the whitelist.
///
/// # Errors
///
/// Returns [`ConfigError::UnknownKey`] if the key is not in the allowed list.
pub fn validate_config_key(key: &str) -> Result<(), ConfigError> {
    if !VALID_CONFIG_KEYS.contains(&key) {
        return Err(unknown_key(key));
    }
    Ok(())
}

fn unknown_key(key: &str) -> ConfigError {
    ConfigError::UnknownKey {
        key: key.to_string(),
        valid: VALID_CONFIG_KEYS.join(", "),
    }
}

/// Validates `value` for `key` and stores it in `config`.
///
/// # Errors
///
/// Returns [`ConfigError::UnknownKey`] for keys outside the whitelist and
/// [`ConfigError::InvalidValue`] when the value does not parse for the key.
pub fn apply_config_value(config: &mut FlowConfig, key: &str, value: &str) -> Result<(), ConfigError> {
    let value = value.trim();
    match key {
        "registry.url" => {
            if !(value.starts_with("redis://")
                || value.starts_with("rediss://")
                || value.starts_with("unix://"))
            {
                return Err(invalid(key, value, "expected a redis://, rediss:// or unix:// url"));
            }
            config.registry.url = value.to_string();
        }
        "fleet.port" => config.fleet.port = parse_positive(key, value)?,
        "fleet.timeout_secs" => config.fleet.timeout_secs = parse_positive(key, value)?,
        "fleet.concurrency" => config.fleet.concurrency = parse_positive(key, value)?,
        "build.upload_folder" => config.build.upload_folder = PathBuf::from(non_empty(key, value)?),
        "build.keep_workdir" => {
            config.build.keep_workdir = value
                .parse()
                .map_err(|_| invalid(key, value, "expected true or false"))?;
        }
        "build.command_timeout_secs" => config.build.command_timeout_secs = parse_positive(key, value)?,
        "build.install_timeout_secs" => config.build.install_timeout_secs = parse_positive(key, value)?,
        "build.changelog_depth" => config.build.changelog_depth = parse_positive(key, value)?,
        "runtimes.python.pip" => config.runtimes.python.pip = non_empty(key, value)?.to_string(),
        "runtimes.nodejs.prefix" => config.runtimes.nodejs.prefix = PathBuf::from(non_empty(key, value)?),
        "runtimes.nodejs.worker" => config.runtimes.nodejs.worker = non_empty(key, value)?.to_string(),
        "auth.token" => config.auth.token = Some(non_empty(key, value)?.to_string()),
        other => return Err(unknown_key(other)),
    }
    Ok(())
}

fn parse_positive<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    match value.parse::<T>() {
        Ok(n) if n > T::default() => Ok(n),
        _ => Err(invalid(key, value, "expected a positive integer")),
    }
}

fn non_empty<'a>(key: &str, value: &'a str) -> Result<&'a str, ConfigError> {
    if value.is_empty() {
        return Err(invalid(key, value, "value must not be empty"));
    }
    Ok(value)
}

fn invalid(key: &str, value: &str, expected: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        expected: expected.to_string(),
    }
}

// ── Unit tests ───────────────────────────────────────────────────────────────
