//! Domain layer: pure business logic, types, and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All functions are synchronous and take data in, returning data out.

pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod identity;
pub mod package;
pub mod profile;
pub mod source;

pub use config::{FlowConfig, apply_config_value, validate_config_key};
pub use dispatch::{AbsenceReason, DispatchReport, DispatchResult, evaluate_batch};
pub use engine::{EngineRequirement, engine_version, select_engine};
pub use error::{
    BuildError, ConfigError, DependencyInstallError, DeployError, ProfileError, RegistryError,
    UploadError,
};
pub use identity::derive_uuid;
pub use package::{DECLARATION_FILE, parse_declaration, validate_info};
pub use source::{VcsKind, changelog_from_log, resolve_vcs, workdir_name};
