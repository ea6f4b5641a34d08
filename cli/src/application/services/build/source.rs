//! Source control strategies: clone, resolve a reference, read history.

use std::path::Path;
use std::process::Output;
use std::time::Duration;

use crate::application::ports::CommandRunner;
use crate::domain::error::BuildError;
use crate::domain::{VcsKind, changelog_from_log};

const GIT_LOG_FORMAT: &str = "--format=%h %ad %s [%an]";
const HG_LOG_TEMPLATE: &str = "{node|short} {date|shortdate} {desc|firstline} [{author|person}]\n";

/// A repository checkout driven through external VCS tools.
pub struct SourceControl<'a, R: CommandRunner> {
    runner: &'a R,
    kind: VcsKind,
    url: &'a str,
    timeout: Duration,
}

impl<'a, R: CommandRunner> SourceControl<'a, R> {
    pub fn new(runner: &'a R, kind: VcsKind, url: &'a str, timeout: Duration) -> Self {
        Self {
            runner,
            kind,
            url,
            timeout,
        }
    }

    /// Clone the repository into `dest`.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::Checkout`] with the tool's stderr on failure.
    pub async fn clone_into(&self, dest: &Path) -> Result<(), BuildError> {
        let dest = path_arg(dest);
        let args: Vec<&str> = match self.kind {
            VcsKind::Git => vec!["clone", "--quiet", self.url, dest.as_str()],
            VcsKind::Mercurial => vec!["clone", "--quiet", "--noupdate", self.url, dest.as_str()],
        };
        let output = self.run(&args).await.map_err(|detail| self.checkout_error(detail))?;
        if !output.status.success() {
            return Err(self.checkout_error(stderr_of(&output)));
        }
        Ok(())
    }

    /// Resolve `reference` (or the default) to a concrete revision and move
    /// the working tree to it.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::InvalidReference`] when the reference does not
    /// name a revision, and [`BuildError::Checkout`] when the tree cannot be
    /// updated.
    pub async fn resolve(&self, repo: &Path, reference: Option<&str>) -> Result<String, BuildError> {
        let reference = reference
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(self.kind.default_ref());
        let repo_arg = path_arg(repo);

        let output = match self.kind {
            VcsKind::Git => {
                let target = format!("{reference}^{{commit}}");
                self.run(&["-C", &repo_arg, "rev-parse", "--verify", "--quiet", &target])
                    .await
            }
            VcsKind::Mercurial => {
                self.run(&["-R", &repo_arg, "log", "-r", reference, "--template", "{node}"])
                    .await
            }
        }
        .map_err(|detail| self.checkout_error(detail))?;

        let revision = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if !output.status.success() || revision.is_empty() {
            return Err(BuildError::InvalidReference {
                reference: reference.to_string(),
                detail: if output.status.success() {
                    "unknown revision".to_string()
                } else {
                    stderr_of(&output)
                },
            });
        }

        let update = match self.kind {
            VcsKind::Git => {
                self.run(&["-C", &repo_arg, "checkout", "--quiet", "--detach", &revision])
                    .await
            }
            VcsKind::Mercurial => {
                self.run(&["-R", &repo_arg, "update", "--quiet", "--clean", "-r", &revision])
                    .await
            }
        }
        .map_err(|detail| self.checkout_error(detail))?;
        if !update.status.success() {
            return Err(self.checkout_error(stderr_of(&update)));
        }

        tracing::debug!(%reference, %revision, "resolved reference");
        Ok(revision)
    }

    /// The last `depth` history entries reachable from `revision`, sanitized,
    /// in source order.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::PackagingFailure`] when the log cannot be read.
    pub async fn history(
        &self,
        repo: &Path,
        revision: &str,
        depth: usize,
    ) -> Result<Vec<String>, BuildError> {
        let repo_arg = path_arg(repo);
        let depth = depth.to_string();
        let output = match self.kind {
            VcsKind::Git => {
                let limit = format!("-{depth}");
                self.run(&[
                    "-C",
                    &repo_arg,
                    "log",
                    &limit,
                    "--date=short",
                    GIT_LOG_FORMAT,
                    revision,
                ])
                .await
            }
            VcsKind::Mercurial => {
                let revset = format!("reverse(::{revision})");
                self.run(&[
                    "-R",
                    &repo_arg,
                    "log",
                    "-l",
                    &depth,
                    "-r",
                    &revset,
                    "--template",
                    HG_LOG_TEMPLATE,
                ])
                .await
            }
        }
        .map_err(|detail| BuildError::PackagingFailure(format!("cannot read history: {detail}")))?;

        if !output.status.success() {
            return Err(BuildError::PackagingFailure(format!(
                "cannot read history: {}",
                stderr_of(&output)
            )));
        }
        Ok(changelog_from_log(&String::from_utf8_lossy(&output.stdout)))
    }

    fn program(&self) -> &'static str {
        match self.kind {
            VcsKind::Git => "git",
            VcsKind::Mercurial => "hg",
        }
    }

    async fn run(&self, args: &[&str]) -> Result<Output, String> {
        self.runner
            .run_with_timeout(self.program(), args, self.timeout)
            .await
            .map_err(|e| format!("{e:#}"))
    }

    fn checkout_error(&self, detail: String) -> BuildError {
        BuildError::Checkout {
            url: self.url.to_string(),
            detail,
        }
    }
}

pub(crate) fn stderr_of(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    if stderr.is_empty() {
        format!("exited with {}", output.status)
    } else {
        stderr
    }
}

pub(crate) fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
