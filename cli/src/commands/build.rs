//! `flow build`: build an application from a repository and register it.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;

use crate::app::AppContext;
use crate::application::services::build::{Artifact, BuildRequest, build_artifact};
use crate::application::services::upload;
use crate::output::UploadOutcome;

/// Arguments for the build command.
#[derive(Args)]
pub struct BuildArgs {
    /// Repository url (git or mercurial)
    pub url: String,

    /// Branch, tag or revision to build (repository default when omitted)
    #[arg(long = "ref")]
    pub reference: Option<String>,

    /// Repository type: git or hg (inferred from the url when omitted)
    #[arg(long)]
    pub vcs: Option<String>,

    /// Register under this name instead of the derived uuid
    #[arg(long)]
    pub name: Option<String>,

    /// Build and report only; do not touch the registry
    #[arg(long)]
    pub no_upload: bool,

    /// Also write the archive to this file
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

/// Run the build command.
///
/// # Errors
///
/// Returns the first build, authentication or registration failure.
pub async fn run(app: &AppContext, args: BuildArgs) -> Result<ExitCode> {
    let target = if args.no_upload {
        None
    } else {
        let registry = app.registry().await?;
        let caller = app.caller(&registry).await?;
        Some((registry, caller))
    };

    let request = BuildRequest {
        url: &args.url,
        reference: args.reference.as_deref(),
        vcs: args.vcs.as_deref(),
    };
    let artifact = build_artifact(&app.runner, &app.reporter(), &app.config, request).await?;

    if let Some(path) = &args.output {
        write_archive(path, &artifact).await?;
    }

    let mut outcome = UploadOutcome {
        uuid: None,
        name: artifact.info.name.clone(),
        reference: artifact.reference.clone(),
        sha256: artifact.sha256.clone(),
        size: artifact.payload.len(),
        archive: args.output,
    };
    if let Some((registry, caller)) = target {
        let uuid = upload::register(&registry, artifact, &caller, args.name.as_deref()).await?;
        outcome.uuid = Some(uuid);
    }

    app.renderer().render_upload(&outcome)?;
    Ok(ExitCode::SUCCESS)
}

async fn write_archive(path: &std::path::Path, artifact: &Artifact) -> Result<()> {
    tokio::fs::write(path, &artifact.payload)
        .await
        .with_context(|| format!("cannot write {}", path.display()))
}
