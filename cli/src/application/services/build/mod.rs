//! Application service: artifact build pipeline.
//!
//! checkout -> resolve reference -> read declaration -> install dependencies
//! -> record history -> pack. Steps run strictly in sequence inside a scoped
//! working directory. The builder never touches the registry; registration
//! is a separate step that runs only on full success.

pub mod archive;
pub mod resolver;
pub mod source;
pub mod workdir;

use flow_common::PackageInfo;
use tracing::instrument;

use crate::application::ports::{CommandRunner, ProgressReporter};
use crate::domain::error::BuildError;
use crate::domain::{DECLARATION_FILE, FlowConfig, parse_declaration, resolve_vcs, validate_info};

use self::archive::{list_archive_members, pack_directory, sha256_hex};
use self::resolver::Packager;
use self::source::SourceControl;
use self::workdir::WorkDir;

/// Inputs to a build.
#[derive(Debug, Clone, Copy)]
pub struct BuildRequest<'a> {
    pub url: &'a str,
    /// Reference to build; the repository default when `None`.
    pub reference: Option<&'a str>,
    /// Repository type; inferred from the url when `None`.
    pub vcs: Option<&'a str>,
}

/// A packaged, dependency-resolved application ready for registration.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub payload: Vec<u8>,
    /// Declared metadata enriched with `changelog`, `structure` and `slave`.
    pub info: PackageInfo,
    /// Resolved source revision.
    pub reference: String,
    pub source_url: Option<String>,
    pub sha256: String,
}

impl Artifact {
    /// Wrap an archive built elsewhere.
    ///
    /// `info` is validated exactly like a declaration and `structure` is
    /// recomputed from the archive members.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::InvalidManifest`] for bad info and
    /// [`BuildError::PackagingFailure`] when the payload is not a gzip tar.
    pub fn from_prebuilt(
        payload: Vec<u8>,
        info: &serde_json::Value,
        reference: &str,
    ) -> Result<Self, BuildError> {
        let mut declared = validate_info(info).map_err(BuildError::InvalidManifest)?;
        if let Some(slave) = info.get("slave").and_then(serde_json::Value::as_str) {
            declared.slave = Some(slave.to_string());
        }
        if let Some(changelog) = info.get("changelog").and_then(serde_json::Value::as_array) {
            declared.changelog = changelog
                .iter()
                .filter_map(|line| line.as_str().map(str::to_string))
                .collect();
        }
        declared.structure = list_archive_members(&payload)
            .map_err(|e| BuildError::PackagingFailure(format!("unreadable archive: {e}")))?;
        Ok(Self {
            sha256: sha256_hex(&payload),
            payload,
            info: declared,
            reference: reference.trim().to_string(),
            source_url: None,
        })
    }
}

/// Build an artifact from a source repository.
///
/// # Errors
///
/// Returns a [`BuildError`] for the first failing step. The working
/// directory is removed on every path unless `build.keep_workdir` is set.
#[instrument(skip_all, fields(url = request.url))]
pub async fn build_artifact(
    runner: &impl CommandRunner,
    reporter: &impl ProgressReporter,
    config: &FlowConfig,
    request: BuildRequest<'_>,
) -> Result<Artifact, BuildError> {
    let kind = resolve_vcs(request.vcs, request.url)?;
    let workdir = WorkDir::claim(
        &config.build.upload_folder,
        request.url,
        config.build.keep_workdir,
    )
    .await?;
    let scm = SourceControl::new(runner, kind, request.url, config.build.command_timeout());

    reporter.step(&format!("cloning {} ({kind})...", request.url));
    scm.clone_into(workdir.path()).await?;
    let revision = scm.resolve(workdir.path(), request.reference).await?;

    let declaration = workdir.join(DECLARATION_FILE);
    let raw = match tokio::fs::read_to_string(&declaration).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(BuildError::MissingManifest(DECLARATION_FILE.to_string()));
        }
        Err(e) => {
            return Err(BuildError::InvalidManifest(format!(
                "cannot read {DECLARATION_FILE}: {e}"
            )));
        }
    };
    let mut info = parse_declaration(&raw)?;
    tracing::info!(app = %info.name, runtime = %info.runtime, %revision, "declaration accepted");

    let packager = Packager::for_runtime(info.runtime, &config.runtimes);
    reporter.step(&format!("installing {} dependencies...", info.runtime));
    let resolution = packager
        .resolve(runner, &info, workdir.path(), config.build.install_timeout())
        .await?;
    tracing::debug!(installed = ?resolution.installed, "dependencies resolved");

    info.changelog = scm
        .history(workdir.path(), &revision, config.build.changelog_depth)
        .await?;

    reporter.step("packing application...");
    let packed = pack_directory(
        workdir.path(),
        packager.layout(kind.metadata_dir(), DECLARATION_FILE),
    )
    .await
    .map_err(|e| BuildError::PackagingFailure(e.to_string()))?;

    info.structure = packed.members;
    info.slave = resolution.entrypoint;
    reporter.success(&format!(
        "built {} at {} ({} bytes)",
        info.name,
        short_rev(&revision),
        packed.bytes.len()
    ));

    Ok(Artifact {
        payload: packed.bytes,
        info,
        reference: revision,
        source_url: Some(request.url.to_string()),
        sha256: packed.sha256,
    })
}

fn short_rev(revision: &str) -> &str {
    revision.get(..12).unwrap_or(revision)
}
