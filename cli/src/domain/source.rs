//! Source repository identity: VCS kind, default references, work dir naming,
//! and change-history sanitizing.
//!
//! Pure logic, no I/O.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use crate::domain::error::BuildError;

/// Supported version control systems.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VcsKind {
    Git,
    Mercurial,
}

impl VcsKind {
    /// Reference used when the caller does not name one.
    #[must_use]
    pub fn default_ref(self) -> &'static str {
        match self {
            VcsKind::Git => "HEAD",
            VcsKind::Mercurial => "tip",
        }
    }

    /// Metadata directory excluded from archives.
    #[must_use]
    pub fn metadata_dir(self) -> &'static str {
        match self {
            VcsKind::Git => ".git",
            VcsKind::Mercurial => ".hg",
        }
    }
}

impl fmt::Display for VcsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            VcsKind::Git => "git",
            VcsKind::Mercurial => "hg",
        })
    }
}

impl FromStr for VcsKind {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "git" => Ok(VcsKind::Git),
            "hg" | "mercurial" => Ok(VcsKind::Mercurial),
            other => Err(BuildError::UnsupportedVcs(other.to_string())),
        }
    }
}

/// Pick the VCS kind: the explicit one if given, otherwise infer from the URL.
///
/// # Errors
///
/// Returns [`BuildError::UnsupportedVcs`] when the URL does not identify a
/// repository type and none was given.
pub fn resolve_vcs(explicit: Option<&str>, url: &str) -> Result<VcsKind, BuildError> {
    if let Some(kind) = explicit.filter(|k| !k.trim().is_empty()) {
        return kind.parse();
    }
    if url.starts_with("git://") || url.trim_end_matches('/').ends_with(".git") {
        return Ok(VcsKind::Git);
    }
    Err(BuildError::UnsupportedVcs(
        "cannot define type of repository by url, please specify it".to_string(),
    ))
}

/// Directory name a checkout of `url` is cloned into.
///
/// # Errors
///
/// Returns [`BuildError::Checkout`] for URLs with no usable last segment.
pub fn workdir_name(url: &str) -> Result<String, BuildError> {
    let trimmed = url.trim().trim_end_matches('/');
    let name = trimmed
        .rsplit(['/', ':'])
        .next()
        .unwrap_or_default()
        .trim();
    if name.is_empty() || name == "." || name == ".." {
        return Err(BuildError::Checkout {
            url: url.to_string(),
            detail: "repository url has no usable name".to_string(),
        });
    }
    Ok(name.to_string())
}

#[allow(clippy::expect_used)] // Pattern is a compile-time constant
static ANSI_SEQUENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1B\[[^A-Za-z]*[A-Za-z]").expect("valid regex"));

/// Clean one line of VCS log output for the changelog.
///
/// Returns `None` for lines that are empty once cleaned.
#[must_use]
pub fn sanitize_log_line(line: &str) -> Option<String> {
    let line = line.trim();
    let line = ANSI_SEQUENCE.replace_all(line, "");
    let line = line
        .trim_matches(|c| matches!(c, '\x1b' | '=' | '\r'))
        .trim_matches(|c| matches!(c, '\x1b' | '>'))
        .trim();
    (!line.is_empty()).then(|| line.to_string())
}

/// Clean raw log output, keeping source order.
#[must_use]
pub fn changelog_from_log(output: &str) -> Vec<String> {
    output.lines().filter_map(sanitize_log_line).collect()
}
