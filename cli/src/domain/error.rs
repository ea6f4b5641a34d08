//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All error types implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator. Errors that surface to operators carry an
//! HTTP-analogous `status_code()` and a stable machine `code()`.

use thiserror::Error;

// ── Build errors ──────────────────────────────────────────────────────────────

/// Terminal failures of one artifact build. Never retried automatically.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Unsupported repository type: {0}")]
    UnsupportedVcs(String),

    #[error("Unable to check out {url}. {detail}")]
    Checkout { url: String, detail: String },

    #[error("Invalid reference '{reference}'. {detail}")]
    InvalidReference { reference: String, detail: String },

    #[error("{0} is required")]
    MissingManifest(String),

    #[error("Invalid package declaration: {0}")]
    InvalidManifest(String),

    #[error("Unable to install dependencies. {0}")]
    DependencyFailure(#[from] DependencyInstallError),

    #[error("Unable to pack application. {0}")]
    PackagingFailure(String),
}

impl BuildError {
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            BuildError::UnsupportedVcs(_)
            | BuildError::InvalidReference { .. }
            | BuildError::MissingManifest(_)
            | BuildError::InvalidManifest(_) => 400,
            BuildError::Checkout { .. }
            | BuildError::DependencyFailure(_)
            | BuildError::PackagingFailure(_) => 503,
        }
    }

    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            BuildError::UnsupportedVcs(_) => "unsupported_vcs",
            BuildError::Checkout { .. } => "checkout_failed",
            BuildError::InvalidReference { .. } => "invalid_reference",
            BuildError::MissingManifest(_) => "missing_manifest",
            BuildError::InvalidManifest(_) => "invalid_manifest",
            BuildError::DependencyFailure(_) => "dependency_failure",
            BuildError::PackagingFailure(_) => "packaging_failure",
        }
    }
}

/// Dependency installation failed. Carries the offending tool's diagnostics.
#[derive(Debug, Error)]
pub enum DependencyInstallError {
    #[error("{tool} exited with {status}: {stderr}")]
    Failed {
        tool: String,
        status: String,
        stderr: String,
    },

    #[error("failed to run {tool}: {detail}")]
    Spawn { tool: String, detail: String },

    #[error("invalid engine version expression '{0}'")]
    InvalidVersionExpr(String),

    #[error("no installed engine matches '{requirement}' (available: {available})")]
    NoMatchingEngine {
        requirement: String,
        available: String,
    },

    #[error("cannot prepare {path}: {detail}")]
    Io { path: String, detail: String },
}

// ── Registry errors ───────────────────────────────────────────────────────────

/// Storage failures. Surfaced as a generic 500-class outcome, never retried.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Storage failure: {0}")]
    Unavailable(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Corrupt registry value at {key}: {detail}")]
    Corrupt { key: String, detail: String },

    #[error("Invalid name '{name}': {reason}")]
    InvalidKey { name: String, reason: String },
}

impl RegistryError {
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            RegistryError::NotFound(_) => 404,
            RegistryError::InvalidKey { .. } => 400,
            RegistryError::Unavailable(_) | RegistryError::Corrupt { .. } => 500,
        }
    }

    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            RegistryError::Unavailable(_) => "storage_failure",
            RegistryError::NotFound(_) => "not_found",
            RegistryError::Corrupt { .. } => "corrupt_value",
            RegistryError::InvalidKey { .. } => "invalid_name",
        }
    }
}

// ── Deploy errors ─────────────────────────────────────────────────────────────

/// Deploy/undeploy/delete failures. Host-level variants name the offending node.
#[derive(Debug, Error)]
pub enum DeployError {
    #[error("Manifest for app {0} doesn't exist")]
    UnknownApp(String),

    #[error("Not allowed to manage app {0}")]
    Forbidden(String),

    #[error("No hosts are available")]
    NoHosts,

    #[error("Profile '{name}' is not valid: {reason}")]
    InvalidProfile { name: String, reason: String },

    #[error("{uuid} app is not deployed in runlist '{runlist}'")]
    NotDeployed { uuid: String, runlist: String },

    #[error("{uuid} app is still deployed in runlist '{runlist}'. Undeploy it first.")]
    StillDeployed { uuid: String, runlist: String },

    #[error("Fleet RPC on {host} didn't process call ({reason})")]
    HostUnresponsive { host: String, reason: String },

    #[error("{host} rejected {uuid} - {detail}")]
    RemoteRejected {
        host: String,
        uuid: String,
        detail: String,
    },

    #[error("Runlist '{0}' is locked by another deployment")]
    RunlistBusy(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl DeployError {
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            DeployError::UnknownApp(_)
            | DeployError::NoHosts
            | DeployError::InvalidProfile { .. }
            | DeployError::NotDeployed { .. }
            | DeployError::StillDeployed { .. } => 400,
            DeployError::Forbidden(_) => 403,
            DeployError::RunlistBusy(_) => 409,
            DeployError::HostUnresponsive { .. } | DeployError::RemoteRejected { .. } => 500,
            DeployError::Registry(e) => e.status_code(),
        }
    }

    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            DeployError::UnknownApp(_) => "unknown_app",
            DeployError::Forbidden(_) => "forbidden",
            DeployError::NoHosts => "no_hosts",
            DeployError::InvalidProfile { .. } => "invalid_profile",
            DeployError::NotDeployed { .. } => "not_deployed",
            DeployError::StillDeployed { .. } => "still_deployed",
            DeployError::HostUnresponsive { .. } => "host_unresponsive",
            DeployError::RemoteRejected { .. } => "remote_rejected",
            DeployError::RunlistBusy(_) => "runlist_busy",
            DeployError::Registry(e) => e.code(),
        }
    }
}

// ── Upload errors ─────────────────────────────────────────────────────────────

/// Manifest registration failures.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Invalid application name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    #[error("Invalid package info: {0}")]
    InvalidInfo(String),

    #[error("Application {uuid} belongs to another developer")]
    Conflict { uuid: String },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl UploadError {
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            UploadError::InvalidName { .. } | UploadError::InvalidInfo(_) => 400,
            UploadError::Conflict { .. } => 409,
            UploadError::Registry(e) => e.status_code(),
        }
    }

    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            UploadError::InvalidName { .. } => "invalid_name",
            UploadError::InvalidInfo(_) => "invalid_info",
            UploadError::Conflict { .. } => "conflict",
            UploadError::Registry(e) => e.code(),
        }
    }
}

// ── Profile errors ────────────────────────────────────────────────────────────

/// Profile body or option validation failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProfileError {
    #[error("profile body must be a JSON object")]
    NotAnObject,

    #[error("invalid value {value} for `{option}` profile option: {reason}")]
    InvalidOption {
        option: String,
        value: String,
        reason: String,
    },

    #[error("profile has no `{0}` option")]
    UnknownOption(String),
}

impl ProfileError {
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            ProfileError::NotAnObject | ProfileError::InvalidOption { .. } => "invalid_profile",
            ProfileError::UnknownOption(_) => "unknown_option",
        }
    }
}

// ── Config errors ─────────────────────────────────────────────────────────────

/// Errors related to configuration key/value validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unknown setting: {key}\n\nValid settings: {valid}")]
    UnknownKey { key: String, valid: String },

    #[error("Invalid value for {key}: {value}\n\n{expected}")]
    InvalidValue {
        key: String,
        value: String,
        expected: String,
    },
}

impl ConfigError {
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            ConfigError::UnknownKey { .. } => "unknown_setting",
            ConfigError::InvalidValue { .. } => "invalid_setting",
        }
    }
}
