//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain` and `flow_common`, never from
//! `crate::infra`, `crate::commands`, or `crate::output`.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Output;

use anyhow::Result;
use flow_common::{HostReply, HostSet, Manifest, Profile, RpcCall, Runlist, User};

use crate::domain::FlowConfig;
use crate::domain::error::RegistryError;

// ── Command Runner Port ───────────────────────────────────────────────────────

/// Abstracts process execution so infrastructure can be swapped or mocked.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Run a program and capture its output.
    ///
    /// Implementations should delegate to `run_with_timeout` using the
    /// instance's configured default timeout.
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output>;
    /// Run a program with a custom timeout override.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or exceeds `timeout`.
    /// On timeout, the child process must be killed (not left orphaned).
    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        timeout: std::time::Duration,
    ) -> Result<Output>;
}

// ── Registry Port ─────────────────────────────────────────────────────────────

/// Durable store for apps, manifests, runlists, profiles, hosts and users.
///
/// Absent records are `Ok(None)` (or an empty collection), never an error.
/// Implementations surface connection problems as [`RegistryError::Unavailable`].
#[allow(async_fn_in_trait)]
pub trait Registry {
    async fn read_manifest(&self, uuid: &str) -> Result<Option<Manifest>, RegistryError>;
    async fn write_manifest(&self, uuid: &str, manifest: &Manifest) -> Result<(), RegistryError>;
    /// Every manifest in the store, ordered by uuid.
    async fn read_manifests(&self) -> Result<Vec<Manifest>, RegistryError>;
    /// Remove both the app payload and its manifest.
    async fn delete_app(&self, uuid: &str) -> Result<(), RegistryError>;
    async fn save_app_payload(&self, uuid: &str, payload: &[u8]) -> Result<(), RegistryError>;

    /// The named runlist, or an empty mapping when none is stored.
    async fn read_runlist(&self, name: &str) -> Result<Runlist, RegistryError>;
    async fn write_runlist(&self, name: &str, runlist: &Runlist) -> Result<(), RegistryError>;
    async fn read_runlists(&self) -> Result<BTreeMap<String, Runlist>, RegistryError>;

    async fn read_profile(&self, name: &str) -> Result<Option<Profile>, RegistryError>;
    async fn write_profile(&self, name: &str, profile: &Profile) -> Result<(), RegistryError>;
    async fn read_profiles(&self) -> Result<BTreeMap<String, Profile>, RegistryError>;

    async fn read_hosts(&self) -> Result<HostSet, RegistryError>;
    async fn add_host(&self, alias: &str, host: &str) -> Result<(), RegistryError>;
    /// Returns whether the host was a member of the alias.
    async fn remove_host(&self, alias: &str, host: &str) -> Result<bool, RegistryError>;

    /// Store a new user and its token index entry.
    ///
    /// Returns `false`, writing nothing, when the username is taken.
    async fn create_user(&self, user: &User) -> Result<bool, RegistryError>;
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, RegistryError>;
    async fn find_user_by_token(&self, token: &str) -> Result<Option<User>, RegistryError>;

    /// Take the advisory lock on `resource` for `holder`, expiring after `ttl`.
    ///
    /// Returns `false` when someone else holds it.
    async fn try_lock(
        &self,
        resource: &str,
        holder: &str,
        ttl: std::time::Duration,
    ) -> Result<bool, RegistryError>;
    /// Release `resource` if `holder` still owns it.
    async fn unlock(&self, resource: &str, holder: &str) -> Result<(), RegistryError>;
}

// ── Fleet Transport Port ──────────────────────────────────────────────────────

/// One RPC call to one worker host.
///
/// Transport failures are returned as errors; the dispatcher turns them into
/// absent results. Timeouts are enforced by the caller.
#[allow(async_fn_in_trait)]
pub trait HostTransport {
    async fn call(&self, host: &str, call: &RpcCall) -> Result<HostReply>;
}

// ── Progress Reporting Port ───────────────────────────────────────────────────

/// Abstracts progress reporting so services can emit events without
/// depending on the Presentation layer. Sync trait, no async needed.
pub trait ProgressReporter {
    /// Emit an in-progress step message.
    fn step(&self, message: &str);
    /// Emit a success message.
    fn success(&self, message: &str);
    /// Emit a warning message.
    fn warn(&self, message: &str);
}

// ── Config Port ───────────────────────────────────────────────────────────────

/// Loads and saves the CLI configuration file.
pub trait ConfigStore {
    /// Load the configuration, returning defaults when no file exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    fn load(&self) -> Result<FlowConfig>;
    /// Persist the configuration with owner-only permissions.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    fn save(&self, config: &FlowConfig) -> Result<()>;
    /// Location of the backing file.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    fn path(&self) -> Result<PathBuf>;
}
