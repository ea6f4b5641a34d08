//! Dependency resolvers, one strategy per runtime kind.

use std::path::{Path, PathBuf};
use std::time::Duration;

use flow_common::{PackageInfo, RuntimeKind};
use semver::Version;

use super::archive::ArchiveLayout;
use super::source::{path_arg, stderr_of};
use crate::application::ports::CommandRunner;
use crate::domain::config::{NodejsRuntimeConfig, PythonRuntimeConfig, RuntimesConfig};
use crate::domain::error::{BuildError, DependencyInstallError};
use crate::domain::{EngineRequirement, engine_version, select_engine};

/// Where python dependencies are installed inside the checkout.
pub const PYTHON_DEPENDS_DIR: &str = "depends";
/// Where npm installs packages inside the checkout.
pub const NODE_MODULES_DIR: &str = "node_modules";
/// Package manifest required for nodejs apps.
pub const PACKAGE_JSON: &str = "package.json";

/// Result of resolving an app's dependencies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Top-level entries of the installed dependency tree.
    pub installed: Vec<String>,
    /// Worker entrypoint to stamp into the manifest.
    pub entrypoint: Option<String>,
}

/// Packaging strategy for a runtime kind.
#[derive(Debug, Clone)]
pub enum Packager<'a> {
    Python(&'a PythonRuntimeConfig),
    Nodejs(&'a NodejsRuntimeConfig),
}

impl<'a> Packager<'a> {
    #[must_use]
    pub fn for_runtime(kind: RuntimeKind, runtimes: &'a RuntimesConfig) -> Self {
        match kind {
            RuntimeKind::Python => Packager::Python(&runtimes.python),
            RuntimeKind::Nodejs => Packager::Nodejs(&runtimes.nodejs),
        }
    }

    /// How the checkout maps onto the archive for this runtime.
    #[must_use]
    pub fn hoisted_dir(&self) -> Option<&'static str> {
        match self {
            Packager::Python(_) => Some(PYTHON_DEPENDS_DIR),
            Packager::Nodejs(_) => None,
        }
    }

    /// Archive layout for a checkout made with `metadata_dir`.
    #[must_use]
    pub fn layout(&self, metadata_dir: &str, declaration: &str) -> ArchiveLayout {
        ArchiveLayout {
            excluded: [metadata_dir, declaration].map(String::from).into(),
            hoisted: self.hoisted_dir().map(String::from),
        }
    }

    /// Install the declared dependencies into `workdir`.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::DependencyFailure`] for installer failures and
    /// engine selection problems, and [`BuildError::InvalidManifest`] for a
    /// missing or unreadable `package.json`.
    pub async fn resolve(
        &self,
        runner: &impl CommandRunner,
        info: &PackageInfo,
        workdir: &Path,
        timeout: Duration,
    ) -> Result<Resolution, BuildError> {
        match self {
            Packager::Python(cfg) => resolve_python(cfg, runner, info, workdir, timeout).await,
            Packager::Nodejs(cfg) => resolve_nodejs(cfg, runner, info, workdir, timeout).await,
        }
    }
}

async fn resolve_python(
    cfg: &PythonRuntimeConfig,
    runner: &impl CommandRunner,
    info: &PackageInfo,
    workdir: &Path,
    timeout: Duration,
) -> Result<Resolution, BuildError> {
    let target = workdir.join(PYTHON_DEPENDS_DIR);
    tokio::fs::create_dir_all(&target).await.map_err(|e| io_error(&target, &e))?;

    if info.dependencies.is_empty() {
        return Ok(Resolution::default());
    }

    let program = match info.runtime_version.as_deref() {
        Some(version) => format!("{}{version}", cfg.pip),
        None => cfg.pip.clone(),
    };
    let target_arg = path_arg(&target);
    let mut args = vec![
        "install",
        "--isolated",
        "--no-input",
        "--disable-pip-version-check",
        "--target",
        target_arg.as_str(),
    ];
    args.extend(info.dependencies.iter().map(String::as_str));

    run_installer(runner, &program, &args, timeout).await?;
    Ok(Resolution {
        installed: list_dir(&target).await?,
        entrypoint: None,
    })
}

async fn resolve_nodejs(
    cfg: &NodejsRuntimeConfig,
    runner: &impl CommandRunner,
    info: &PackageInfo,
    workdir: &Path,
    timeout: Duration,
) -> Result<Resolution, BuildError> {
    let package_json = workdir.join(PACKAGE_JSON);
    let raw = match tokio::fs::read_to_string(&package_json).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(BuildError::InvalidManifest(format!("{PACKAGE_JSON} is required")));
        }
        Err(e) => return Err(io_error(&package_json, &e).into()),
    };
    let package: serde_json::Value = serde_json::from_str(&raw)
        .map_err(|e| BuildError::InvalidManifest(format!("error reading {PACKAGE_JSON}: {e}")))?;

    let expr = info
        .runtime_version
        .clone()
        .or_else(|| {
            package
                .pointer("/engines/node")
                .and_then(serde_json::Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| "*".to_string());
    let requirement = EngineRequirement::parse(&expr)?;
    let installed = installed_engines(&cfg.prefix).await?;
    let version = select_engine(&requirement, &installed)?;
    tracing::debug!(requirement = %expr, %version, "selected node engine");

    let bin = engine_bin(&cfg.prefix, &version);
    let npm = path_arg(&bin.join("npm"));
    let workdir_arg = path_arg(workdir);
    run_installer(
        runner,
        &npm,
        &["install", "--production", "--prefix", &workdir_arg],
        timeout,
    )
    .await?;

    let modules = workdir.join(NODE_MODULES_DIR);
    let installed = if tokio::fs::metadata(&modules).await.is_ok() {
        list_dir(&modules).await?
    } else {
        Vec::new()
    };
    Ok(Resolution {
        installed,
        entrypoint: Some(path_arg(&bin.join(&cfg.worker))),
    })
}

fn engine_bin(prefix: &Path, version: &Version) -> PathBuf {
    prefix.join(format!("node-{version}")).join("bin")
}

/// Versions of the engines installed under `prefix`.
async fn installed_engines(prefix: &Path) -> Result<Vec<Version>, DependencyInstallError> {
    let mut dir = match tokio::fs::read_dir(prefix).await {
        Ok(dir) => dir,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(io_error(prefix, &e)),
    };
    let mut versions = Vec::new();
    while let Some(entry) = dir.next_entry().await.map_err(|e| io_error(prefix, &e))? {
        if !entry.file_type().await.is_ok_and(|t| t.is_dir()) {
            continue;
        }
        if let Some(version) = engine_version(&entry.file_name().to_string_lossy()) {
            versions.push(version);
        }
    }
    Ok(versions)
}

async fn run_installer(
    runner: &impl CommandRunner,
    program: &str,
    args: &[&str],
    timeout: Duration,
) -> Result<(), DependencyInstallError> {
    tracing::info!(tool = program, "installing dependencies");
    let output = runner
        .run_with_timeout(program, args, timeout)
        .await
        .map_err(|e| DependencyInstallError::Spawn {
            tool: program.to_string(),
            detail: format!("{e:#}"),
        })?;
    if !output.status.success() {
        return Err(DependencyInstallError::Failed {
            tool: program.to_string(),
            status: output.status.to_string(),
            stderr: stderr_of(&output),
        });
    }
    Ok(())
}

async fn list_dir(dir: &Path) -> Result<Vec<String>, DependencyInstallError> {
    let mut entries = tokio::fs::read_dir(dir).await.map_err(|e| io_error(dir, &e))?;
    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(|e| io_error(dir, &e))? {
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    Ok(names)
}

fn io_error(path: &Path, err: &std::io::Error) -> DependencyInstallError {
    DependencyInstallError::Io {
        path: path.display().to_string(),
        detail: err.to_string(),
    }
}
