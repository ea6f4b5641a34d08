//! Application service: manifest registration.
//!
//! Turns a built [`Artifact`] into a registry entry. The payload is written
//! before the manifest, so a listed manifest always has its archive.

use chrono::Utc;
use flow_common::{Manifest, User};
use tracing::instrument;

use crate::application::ports::Registry;
use crate::application::services::build::Artifact;
use crate::domain::derive_uuid;
use crate::domain::error::UploadError;

/// Register `artifact` on behalf of `uploader` and return its uuid.
///
/// Re-uploading the same uuid overwrites payload and metadata but keeps the
/// manifest's `runlist`, so a deployed app stays deployed.
///
/// # Errors
///
/// Returns [`UploadError::InvalidName`] for a bad explicit name,
/// [`UploadError::Conflict`] when the uuid belongs to another developer,
/// and [`UploadError::Registry`] for storage failures.
#[instrument(skip_all, fields(app = %artifact.info.name, uploader = %uploader.username))]
pub async fn register(
    registry: &impl Registry,
    artifact: Artifact,
    uploader: &User,
    explicit_name: Option<&str>,
) -> Result<String, UploadError> {
    let uuid = derive_uuid(
        explicit_name,
        &artifact.info.name,
        &uploader.username,
        &artifact.reference,
    )?;

    let existing = registry.read_manifest(&uuid).await?;
    if let Some(existing) = &existing
        && !uploader.may_manage(existing)
    {
        tracing::warn!(%uuid, "upload refused, uuid owned by another developer");
        return Err(UploadError::Conflict { uuid });
    }

    let manifest = Manifest {
        info: artifact.info,
        uuid: uuid.clone(),
        reference: artifact.reference,
        developer: match &existing {
            Some(existing) if uploader.token != existing.developer => existing.developer.clone(),
            _ => uploader.token.clone(),
        },
        runlist: existing.and_then(|m| m.runlist),
        url: artifact.source_url,
        sha256: Some(artifact.sha256),
        uploaded_at: Some(Utc::now()),
    };

    registry.save_app_payload(&uuid, &artifact.payload).await?;
    registry.write_manifest(&uuid, &manifest).await?;
    tracing::info!(%uuid, bytes = artifact.payload.len(), "application registered");
    Ok(uuid)
}
