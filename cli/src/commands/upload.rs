//! `flow upload`: register a prebuilt archive.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;

use crate::app::AppContext;
use crate::application::services::build::Artifact;
use crate::application::services::upload;
use crate::output::UploadOutcome;

/// Arguments for the upload command.
#[derive(Args)]
pub struct UploadArgs {
    /// Gzipped tar archive of the application
    #[arg(long)]
    pub archive: PathBuf,

    /// JSON file with the package info (type, name, description, ...)
    #[arg(long)]
    pub info: PathBuf,

    /// Source revision the archive was built from
    #[arg(long = "ref")]
    pub reference: String,

    /// Register under this name instead of the derived uuid
    #[arg(long)]
    pub name: Option<String>,
}

/// Run the upload command.
///
/// # Errors
///
/// Returns an error for unreadable inputs, invalid info, or registration failures.
pub async fn run(app: &AppContext, args: UploadArgs) -> Result<ExitCode> {
    let payload = tokio::fs::read(&args.archive)
        .await
        .with_context(|| format!("cannot read {}", args.archive.display()))?;
    let raw = tokio::fs::read_to_string(&args.info)
        .await
        .with_context(|| format!("cannot read {}", args.info.display()))?;
    let info: serde_json::Value = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not valid JSON", args.info.display()))?;

    let artifact = Artifact::from_prebuilt(payload, &info, &args.reference)?;

    let registry = app.registry().await?;
    let caller = app.caller(&registry).await?;

    let mut outcome = UploadOutcome {
        uuid: None,
        name: artifact.info.name.clone(),
        reference: artifact.reference.clone(),
        sha256: artifact.sha256.clone(),
        size: artifact.payload.len(),
        archive: Some(args.archive),
    };
    let uuid = upload::register(&registry, artifact, &caller, args.name.as_deref()).await?;
    outcome.uuid = Some(uuid);

    app.renderer().render_upload(&outcome)?;
    Ok(ExitCode::SUCCESS)
}
