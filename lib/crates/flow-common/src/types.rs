use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Runtime an application is packaged for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeKind {
    Python,
    Nodejs,
}

impl RuntimeKind {
    pub const ALL: [RuntimeKind; 2] = [RuntimeKind::Python, RuntimeKind::Nodejs];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RuntimeKind::Python => "python",
            RuntimeKind::Nodejs => "nodejs",
        }
    }
}

impl fmt::Display for RuntimeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a declaration names a runtime outside [`RuntimeKind::ALL`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0} type is not supported")]
pub struct UnsupportedRuntime(pub String);

impl FromStr for RuntimeKind {
    type Err = UnsupportedRuntime;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "python" => Ok(RuntimeKind::Python),
            "nodejs" => Ok(RuntimeKind::Nodejs),
            other => Err(UnsupportedRuntime(other.to_string())),
        }
    }
}

/// Declared metadata for a buildable application, enriched by the builder.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PackageInfo {
    #[serde(rename = "type")]
    pub runtime: RuntimeKind,
    pub name: String,
    pub description: String,
    /// Dependency specifiers in declaration order.
    #[serde(default, alias = "depends", skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
    #[serde(
        default,
        alias = "nodejs_version",
        skip_serializing_if = "Option::is_none"
    )]
    pub runtime_version: Option<String>,
    /// Recent source history, in source order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub changelog: Vec<String>,
    /// Archive member paths.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub structure: Vec<String>,
    /// Worker entrypoint for runtimes that need one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slave: Option<String>,
}

/// Registry record describing one uploaded application.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Manifest {
    #[serde(flatten)]
    pub info: PackageInfo,
    pub uuid: String,
    /// Resolved source revision.
    #[serde(rename = "ref")]
    pub reference: String,
    /// Owner identity token.
    pub developer: String,
    /// Runlist currently referencing this app; absent when undeployed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runlist: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploaded_at: Option<DateTime<Utc>>,
}

impl Manifest {
    /// An app with a populated runlist is deployed and may not be deleted.
    #[must_use]
    pub fn is_deployed(&self) -> bool {
        self.runlist.as_deref().is_some_and(|r| !r.is_empty())
    }
}

/// Desired state for a deployment group: app uuid → profile name.
pub type Runlist = BTreeMap<String, String>;

/// Named runtime configuration options.
pub type Profile = serde_json::Map<String, serde_json::Value>;

/// Worker host roster grouped by alias.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct HostSet(pub BTreeMap<String, BTreeSet<String>>);

impl HostSet {
    /// `true` when no alias carries a host.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.values().all(BTreeSet::is_empty)
    }

    /// All host addresses across aliases, deduplicated.
    #[must_use]
    pub fn flatten(&self) -> BTreeSet<String> {
        self.0.values().flatten().cloned().collect()
    }

    pub fn insert(&mut self, alias: impl Into<String>, host: impl Into<String>) {
        self.0.entry(alias.into()).or_default().insert(host.into());
    }
}

/// An operator known to the registry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub username: String,
    pub token: String,
    #[serde(default)]
    pub admin: bool,
}

impl User {
    /// Admins and the recorded developer may act on a manifest.
    #[must_use]
    pub fn may_manage(&self, manifest: &Manifest) -> bool {
        self.admin || self.token == manifest.developer
    }
}
