//! Application service: deployment coordinator.
//!
//! Drives the deploy/undeploy state machine for (uuid, runlist) pairs.
//! Desired state (runlist and manifest) is persisted only after every
//! dispatched host accepted the command. Any failure leaves the registry as
//! it was, apart from a profile body supplied with a deploy, which is
//! written before dispatch.

use std::time::Duration;

use flow_common::{FleetCommand, Manifest, User, runlist_lock};
use serde_json::Value;
use tokio::time::Instant;
use tracing::instrument;

use crate::application::ports::{HostTransport, Registry};
use crate::application::services::dispatcher::FleetDispatcher;
use crate::domain::error::DeployError;
use crate::domain::evaluate_batch;
use crate::domain::profile::validate_profile;

/// How long to wait for another deployment to release a runlist.
pub const DEFAULT_LOCK_WAIT: Duration = Duration::from_secs(30);

const LOCK_POLL: Duration = Duration::from_millis(50);
/// Added to the fleet timeout so a held lock outlives the dispatch it guards.
const LOCK_TTL_MARGIN: Duration = Duration::from_secs(30);

/// A runlist lock held in the registry.
struct RunlistGuard {
    resource: String,
    holder: String,
}

/// Coordinates registry state with fleet dispatch.
///
/// Deploy and undeploy take a registry-held lock on the runlist, so
/// concurrent invocations (from any process) are serialised per runlist.
pub struct DeploymentCoordinator<R: Registry, T: HostTransport> {
    registry: R,
    dispatcher: FleetDispatcher<T>,
    lock_wait: Duration,
}

impl<R: Registry, T: HostTransport> DeploymentCoordinator<R, T> {
    pub fn new(registry: R, dispatcher: FleetDispatcher<T>) -> Self {
        Self {
            registry,
            dispatcher,
            lock_wait: DEFAULT_LOCK_WAIT,
        }
    }

    /// Override how long to wait for a busy runlist.
    #[must_use]
    pub fn with_lock_wait(mut self, wait: Duration) -> Self {
        self.lock_wait = wait;
        self
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    pub fn dispatcher(&self) -> &FleetDispatcher<T> {
        &self.dispatcher
    }

    /// Start `uuid` with `profile` on every host and record it in `runlist`.
    ///
    /// When `body` is given it replaces the stored profile before dispatch;
    /// otherwise the profile must already exist.
    ///
    /// # Errors
    ///
    /// Returns the first [`DeployError`] met. Nothing but the supplied
    /// profile is written unless every host accepted the start command.
    #[instrument(skip_all, fields(%runlist, %uuid, %profile))]
    pub async fn deploy(
        &self,
        caller: &User,
        runlist: &str,
        uuid: &str,
        profile: &str,
        body: Option<&Value>,
    ) -> Result<(), DeployError> {
        let guard = self.lock_runlist(runlist).await?;
        let result = self.deploy_locked(caller, runlist, uuid, profile, body).await;
        self.unlock_runlist(&guard).await;
        result
    }

    async fn deploy_locked(
        &self,
        caller: &User,
        runlist: &str,
        uuid: &str,
        profile: &str,
        body: Option<&Value>,
    ) -> Result<(), DeployError> {
        let mut manifest = self.authorized_manifest(caller, uuid).await?;
        let mut entries = self.registry.read_runlist(runlist).await?;
        let hosts = self.registry.read_hosts().await?;
        if hosts.is_empty() {
            return Err(DeployError::NoHosts);
        }

        match body {
            Some(body) => {
                let validated = validate_profile(body).map_err(|e| DeployError::InvalidProfile {
                    name: profile.to_string(),
                    reason: e.to_string(),
                })?;
                self.registry.write_profile(profile, &validated).await?;
                tracing::debug!(%profile, "profile stored");
            }
            None => {
                if self.registry.read_profile(profile).await?.is_none() {
                    return Err(DeployError::InvalidProfile {
                        name: profile.to_string(),
                        reason: "profile does not exist".to_string(),
                    });
                }
            }
        }

        entries.insert(uuid.to_string(), profile.to_string());
        manifest.runlist = Some(runlist.to_string());

        let targets = hosts.flatten();
        let report = self
            .dispatcher
            .dispatch(&FleetCommand::start(uuid, profile), &targets)
            .await;
        evaluate_batch(&targets, &report)?;

        self.registry.write_runlist(runlist, &entries).await?;
        self.registry.write_manifest(uuid, &manifest).await?;
        tracing::info!(hosts = targets.len(), "application deployed");
        Ok(())
    }

    /// Stop `uuid` on every host and drop it from `runlist`.
    ///
    /// The manifest's `runlist` is cleared only when it names this runlist.
    ///
    /// # Errors
    ///
    /// Returns [`DeployError::UnknownApp`] or [`DeployError::Forbidden`]
    /// before anything about the runlist is revealed,
    /// [`DeployError::NotDeployed`] when the runlist has no entry for `uuid`,
    /// and the first dispatch failure otherwise. No writes happen on any
    /// error path.
    #[instrument(skip_all, fields(%runlist, %uuid))]
    pub async fn undeploy(&self, caller: &User, runlist: &str, uuid: &str) -> Result<(), DeployError> {
        let guard = self.lock_runlist(runlist).await?;
        let result = self.undeploy_locked(caller, runlist, uuid).await;
        self.unlock_runlist(&guard).await;
        result
    }

    async fn undeploy_locked(&self, caller: &User, runlist: &str, uuid: &str) -> Result<(), DeployError> {
        let mut manifest = self.authorized_manifest(caller, uuid).await?;

        let mut entries = self.registry.read_runlist(runlist).await?;
        if !entries.contains_key(uuid) {
            return Err(DeployError::NotDeployed {
                uuid: uuid.to_string(),
                runlist: runlist.to_string(),
            });
        }

        let hosts = self.registry.read_hosts().await?;
        if hosts.is_empty() {
            return Err(DeployError::NoHosts);
        }

        entries.remove(uuid);
        if manifest.runlist.as_deref() == Some(runlist) {
            manifest.runlist = None;
        }

        let targets = hosts.flatten();
        let report = self
            .dispatcher
            .dispatch(&FleetCommand::stop(uuid), &targets)
            .await;
        evaluate_batch(&targets, &report)?;

        self.registry.write_runlist(runlist, &entries).await?;
        self.registry.write_manifest(uuid, &manifest).await?;
        tracing::info!(hosts = targets.len(), "application undeployed");
        Ok(())
    }

    /// Remove an undeployed application.
    ///
    /// # Errors
    ///
    /// Returns [`DeployError::StillDeployed`] while the manifest names a
    /// runlist; nothing is deleted in that case.
    #[instrument(skip_all, fields(%uuid))]
    pub async fn delete_app(&self, caller: &User, uuid: &str) -> Result<(), DeployError> {
        let manifest = self.authorized_manifest(caller, uuid).await?;
        if manifest.is_deployed() {
            return Err(DeployError::StillDeployed {
                uuid: uuid.to_string(),
                runlist: manifest.runlist.unwrap_or_default(),
            });
        }
        self.registry.delete_app(uuid).await?;
        tracing::info!("application deleted");
        Ok(())
    }

    /// Take the registry lock on `runlist`, polling until `lock_wait` runs out.
    async fn lock_runlist(&self, runlist: &str) -> Result<RunlistGuard, DeployError> {
        let guard = RunlistGuard {
            resource: runlist_lock(runlist),
            holder: uuid::Uuid::new_v4().simple().to_string(),
        };
        let ttl = self.dispatcher.timeout() + LOCK_TTL_MARGIN;
        let deadline = Instant::now() + self.lock_wait;
        loop {
            if self.registry.try_lock(&guard.resource, &guard.holder, ttl).await? {
                tracing::debug!(resource = %guard.resource, "runlist locked");
                return Ok(guard);
            }
            if Instant::now() >= deadline {
                return Err(DeployError::RunlistBusy(runlist.to_string()));
            }
            tokio::time::sleep(LOCK_POLL).await;
        }
    }

    /// Release failures are logged; the lock expires on its own.
    async fn unlock_runlist(&self, guard: &RunlistGuard) {
        if let Err(e) = self.registry.unlock(&guard.resource, &guard.holder).await {
            tracing::warn!(resource = %guard.resource, error = %e, "failed to release runlist lock");
        }
    }

    async fn authorized_manifest(&self, caller: &User, uuid: &str) -> Result<Manifest, DeployError> {
        let manifest = self
            .registry
            .read_manifest(uuid)
            .await?
            .ok_or_else(|| DeployError::UnknownApp(uuid.to_string()))?;
        if !caller.may_manage(&manifest) {
            return Err(DeployError::Forbidden(uuid.to_string()));
        }
        Ok(manifest)
    }
}
