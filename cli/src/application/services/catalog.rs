//! Application service: catalog and fleet roster use-cases.
//!
//! Read-mostly views over the registry plus the small edits operators make
//! by hand: host roster, profile options and users.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::{Context, Result, bail};
use flow_common::{FleetCommand, HostSet, Manifest, Profile, Runlist, User};
use tracing::instrument;

use crate::application::ports::{HostTransport, Registry};
use crate::application::services::dispatcher::FleetDispatcher;
use crate::domain::DispatchReport;
use crate::domain::error::{DeployError, RegistryError};
use crate::domain::profile::edit_option;

// ── Identity ─────────────────────────────────────────────────────────────────

/// Resolve the caller behind `token`.
///
/// # Errors
///
/// Returns an error when the token is missing, unknown, or the registry is down.
pub async fn authenticate(registry: &impl Registry, token: Option<&str>) -> Result<User> {
    let Some(token) = token.map(str::trim).filter(|t| !t.is_empty()) else {
        bail!("no API token given; pass --token or set FLOW_TOKEN");
    };
    match registry.find_user_by_token(token).await? {
        Some(user) => {
            tracing::debug!(user = %user.username, admin = user.admin, "authenticated");
            Ok(user)
        }
        None => bail!("unknown API token"),
    }
}

/// Create a user with a fresh random token.
///
/// # Errors
///
/// Returns an error if the username is taken or invalid.
#[instrument(skip_all, fields(%username, admin))]
pub async fn create_user(registry: &impl Registry, username: &str, admin: bool) -> Result<User> {
    let username = username.trim();
    let user = User {
        username: username.to_string(),
        token: uuid::Uuid::new_v4().simple().to_string(),
        admin,
    };
    if !registry.create_user(&user).await? {
        bail!("user '{username}' already exists");
    }
    tracing::info!("user created");
    Ok(user)
}

fn require_admin(caller: &User, action: &str) -> Result<()> {
    if !caller.admin {
        bail!("{action} requires an admin token");
    }
    Ok(())
}

// ── Apps ─────────────────────────────────────────────────────────────────────

/// Manifests visible to `caller`, ordered by uuid.
///
/// # Errors
///
/// Propagates registry failures.
pub async fn list_apps(registry: &impl Registry, caller: &User) -> Result<Vec<Manifest>> {
    let mut manifests: Vec<Manifest> = registry
        .read_manifests()
        .await?
        .into_iter()
        .filter(|m| caller.may_manage(m))
        .collect();
    manifests.sort_by(|a, b| a.uuid.cmp(&b.uuid));
    Ok(manifests)
}

/// One manifest, if `caller` may see it.
///
/// # Errors
///
/// Returns [`DeployError::UnknownApp`] or [`DeployError::Forbidden`].
pub async fn show_app(registry: &impl Registry, caller: &User, uuid: &str) -> Result<Manifest> {
    let manifest = registry
        .read_manifest(uuid)
        .await?
        .ok_or_else(|| DeployError::UnknownApp(uuid.to_string()))?;
    if !caller.may_manage(&manifest) {
        return Err(DeployError::Forbidden(uuid.to_string()).into());
    }
    Ok(manifest)
}

// ── Hosts ────────────────────────────────────────────────────────────────────

/// The full host roster.
///
/// # Errors
///
/// Propagates registry failures.
pub async fn list_hosts(registry: &impl Registry) -> Result<HostSet> {
    Ok(registry.read_hosts().await?)
}

/// Add `host` under `alias`.
///
/// # Errors
///
/// Fails for non-admin callers and invalid names.
#[instrument(skip_all, fields(%alias, %host))]
pub async fn add_host(registry: &impl Registry, caller: &User, alias: &str, host: &str) -> Result<()> {
    require_admin(caller, "adding hosts")?;
    let host = host.trim();
    if host.is_empty() || host.contains(char::is_whitespace) {
        bail!("invalid host address '{host}'");
    }
    registry.add_host(alias, host).await?;
    tracing::info!("host added");
    Ok(())
}

/// Remove `host` from `alias`.
///
/// # Errors
///
/// Fails for non-admin callers and hosts that are not in the alias.
#[instrument(skip_all, fields(%alias, %host))]
pub async fn remove_host(
    registry: &impl Registry,
    caller: &User,
    alias: &str,
    host: &str,
) -> Result<()> {
    require_admin(caller, "removing hosts")?;
    if !registry.remove_host(alias, host).await? {
        return Err(RegistryError::NotFound(format!("host {host} in alias {alias}")).into());
    }
    tracing::info!("host removed");
    Ok(())
}

/// Query one host, or every host in the roster.
///
/// Absent hosts stay in the report so callers can show them.
///
/// # Errors
///
/// Returns [`DeployError::NoHosts`] when there is nothing to query.
pub async fn host_stats<T: HostTransport>(
    registry: &impl Registry,
    dispatcher: &FleetDispatcher<T>,
    host: Option<&str>,
) -> Result<DispatchReport> {
    let targets: BTreeSet<String> = match host {
        Some(host) => BTreeSet::from([host.to_string()]),
        None => registry.read_hosts().await?.flatten(),
    };
    if targets.is_empty() {
        return Err(DeployError::NoHosts.into());
    }
    Ok(dispatcher.dispatch(&FleetCommand::Query, &targets).await)
}

// ── Profiles ─────────────────────────────────────────────────────────────────

/// All profiles by name.
///
/// # Errors
///
/// Propagates registry failures.
pub async fn list_profiles(registry: &impl Registry) -> Result<BTreeMap<String, Profile>> {
    Ok(registry.read_profiles().await?)
}

/// One profile.
///
/// # Errors
///
/// Returns [`RegistryError::NotFound`] for unknown names.
pub async fn show_profile(registry: &impl Registry, name: &str) -> Result<Profile> {
    registry
        .read_profile(name)
        .await?
        .ok_or_else(|| RegistryError::NotFound(format!("profile {name}")).into())
}

/// Change one existing option of a stored profile.
///
/// # Errors
///
/// Fails for unknown profiles, options the profile lacks, and values the
/// option's validator rejects.
#[instrument(skip_all, fields(%name, %option))]
pub async fn set_profile_option(
    registry: &impl Registry,
    name: &str,
    option: &str,
    raw: &str,
) -> Result<Profile> {
    let mut profile = show_profile(registry, name).await?;
    edit_option(&mut profile, option, raw).with_context(|| format!("editing profile {name}"))?;
    registry.write_profile(name, &profile).await?;
    tracing::info!("profile option updated");
    Ok(profile)
}

// ── Runlists ─────────────────────────────────────────────────────────────────

/// All runlists by name.
///
/// # Errors
///
/// Propagates registry failures.
pub async fn list_runlists(registry: &impl Registry) -> Result<BTreeMap<String, Runlist>> {
    Ok(registry.read_runlists().await?)
}

/// One runlist; unknown names read as empty.
///
/// # Errors
///
/// Propagates registry failures.
pub async fn show_runlist(registry: &impl Registry, name: &str) -> Result<Runlist> {
    Ok(registry.read_runlist(name).await?)
}
