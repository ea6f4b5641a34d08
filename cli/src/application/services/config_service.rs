//! Application service: configuration use-cases.

use anyhow::Result;

use crate::application::ports::ConfigStore;
use crate::domain::config::{FlowConfig, apply_config_value, validate_config_key};

/// Load configuration.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be parsed.
pub fn load_config(store: &impl ConfigStore) -> Result<FlowConfig> {
    store.load()
}

/// Save configuration.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn save_config(store: &impl ConfigStore, config: &FlowConfig) -> Result<()> {
    store.save(config)
}

/// Validate and persist one `key = value` setting, returning the new config.
///
/// # Errors
///
/// Returns a [`crate::domain::ConfigError`] for unknown keys or bad values,
/// and store errors from load/save.
pub fn set_value(store: &impl ConfigStore, key: &str, value: &str) -> Result<FlowConfig> {
    validate_config_key(key)?;
    let mut config = load_config(store)?;
    apply_config_value(&mut config, key, value)?;
    save_config(store, &config)?;
    tracing::info!(%key, "configuration updated");
    Ok(config)
}
