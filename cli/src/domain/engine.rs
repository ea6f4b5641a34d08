//! Runtime engine version matching.
//!
//! Pure logic, no I/O.

use semver::{Version, VersionReq};

use crate::domain::error::DependencyInstallError;

/// Directory-name prefix of installed engines, e.g. `node-0.8.21`.
pub const ENGINE_DIR_PREFIX: &str = "node-";

/// A parsed engine requirement: any alternative may match.
#[derive(Debug, Clone)]
pub struct EngineRequirement {
    source: String,
    alternatives: Vec<Alternative>,
}

#[derive(Debug, Clone)]
enum Alternative {
    Exact(Version),
    Range(VersionReq),
}

impl EngineRequirement {
    /// Parse an npm-style engine expression.
    ///
    /// Supports `||` alternatives, space-separated comparator sets
    /// (`>=0.8 <0.10`), wildcards, and bare full versions, which match
    /// exactly. An empty expression matches anything.
    ///
    /// # Errors
    ///
    /// Returns [`DependencyInstallError::InvalidVersionExpr`] for anything
    /// `semver` cannot read.
    pub fn parse(expr: &str) -> Result<Self, DependencyInstallError> {
        let invalid = || DependencyInstallError::InvalidVersionExpr(expr.to_string());
        let mut alternatives = Vec::new();
        for part in expr.split("||") {
            let part = part.trim();
            let part = part.strip_prefix('v').unwrap_or(part);
            if part.is_empty() {
                alternatives.push(Alternative::Range(VersionReq::STAR));
            } else if let Ok(version) = Version::parse(part) {
                alternatives.push(Alternative::Exact(version));
            } else {
                let req = VersionReq::parse(&join_comparators(part)).map_err(|_| invalid())?;
                alternatives.push(Alternative::Range(req));
            }
        }
        Ok(Self {
            source: expr.to_string(),
            alternatives,
        })
    }

    #[must_use]
    pub fn matches(&self, version: &Version) -> bool {
        self.alternatives.iter().any(|alt| match alt {
            Alternative::Exact(v) => v == version,
            Alternative::Range(req) => req.matches(version),
        })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

/// `>= 0.8 <0.10` -> `>=0.8, <0.10`; bare versions keep npm meaning.
fn join_comparators(part: &str) -> String {
    let mut comparators: Vec<String> = Vec::new();
    let mut pending_op = String::new();
    for token in part.split_whitespace() {
        if token.chars().all(|c| matches!(c, '>' | '<' | '=' | '~' | '^')) {
            pending_op.push_str(token);
            continue;
        }
        let token = token.trim_end_matches(',');
        let op = std::mem::take(&mut pending_op);
        let op = if op.is_empty() && !token.starts_with(|c: char| "><=~^*".contains(c)) {
            bare_operator(token).to_string()
        } else {
            op
        };
        comparators.push(format!("{op}{token}"));
    }
    comparators.join(", ")
}

/// npm reads `4.2` as `4.2.x` and `4.2.1` as exactly `4.2.1`; `semver`
/// would read both as caret requirements.
fn bare_operator(token: &str) -> &'static str {
    let parts: Vec<&str> = token.split('.').collect();
    if !parts.iter().all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit())) {
        return "";
    }
    if parts.len() >= 3 { "=" } else { "~" }
}

/// Version encoded in an engine directory name, if it is one.
#[must_use]
pub fn engine_version(dir_name: &str) -> Option<Version> {
    Version::parse(dir_name.strip_prefix(ENGINE_DIR_PREFIX)?).ok()
}

/// Highest installed version satisfying `req`.
///
/// # Errors
///
/// Returns [`DependencyInstallError::NoMatchingEngine`] listing what is installed.
pub fn select_engine(
    req: &EngineRequirement,
    installed: &[Version],
) -> Result<Version, DependencyInstallError> {
    installed
        .iter()
        .filter(|v| req.matches(v))
        .max()
        .cloned()
        .ok_or_else(|| {
            let mut available: Vec<_> = installed.iter().map(ToString::to_string).collect();
            available.sort();
            DependencyInstallError::NoMatchingEngine {
                requirement: req.as_str().to_string(),
                available: if available.is_empty() {
                    "none".to_string()
                } else {
                    available.join(", ")
                },
            }
        })
}
