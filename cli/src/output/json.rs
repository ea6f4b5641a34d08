//! JSON output.
//!
//! Every `--json` code path prints exactly one pretty-printed document on
//! stdout. Failures use the error object from [`format_error`].

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use flow_common::{HostSet, Manifest, Profile, Runlist, User};
use serde::Serialize;
use serde_json::json;

use crate::domain::{DispatchReport, DispatchResult, FlowConfig};
use crate::output::UploadOutcome;

/// Format a JSON error object.
///
/// Output (pretty-printed):
/// ```json
/// {
///   "error": {
///     "message": "...",
///     "code": "..."
///   }
/// }
/// ```
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_error(message: &str, code: &str) -> Result<String> {
    let obj = json!({
        "error": {
            "message": message,
            "code": code,
        },
    });
    serde_json::to_string_pretty(&obj).context("JSON serialization failed")
}

fn print<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("JSON serialization failed")?
    );
    Ok(())
}

/// Renders domain types as JSON documents on stdout.
pub struct JsonRenderer;

#[allow(clippy::unused_self)]
impl JsonRenderer {
    pub fn render_apps(&self, apps: &[Manifest]) -> Result<()> {
        print(apps)
    }

    pub fn render_app(&self, app: &Manifest) -> Result<()> {
        print(app)
    }

    pub fn render_hosts(&self, hosts: &HostSet) -> Result<()> {
        print(hosts)
    }

    /// Absent hosts appear as `{"error": true, "reason": ...}`.
    pub fn render_stats(&self, report: &DispatchReport) -> Result<()> {
        let doc: BTreeMap<&str, serde_json::Value> = report
            .iter()
            .map(|(host, result)| {
                let value = match result {
                    DispatchResult::Responded(reply) => json!(reply),
                    DispatchResult::Absent(reason) => {
                        json!({"error": true, "reason": reason.to_string()})
                    }
                };
                (host.as_str(), value)
            })
            .collect();
        print(&doc)
    }

    pub fn render_profiles(&self, profiles: &BTreeMap<String, Profile>) -> Result<()> {
        print(profiles)
    }

    pub fn render_profile(&self, name: &str, profile: &Profile) -> Result<()> {
        print(&json!({"name": name, "profile": profile}))
    }

    pub fn render_runlists(&self, runlists: &BTreeMap<String, Runlist>) -> Result<()> {
        print(runlists)
    }

    pub fn render_runlist(&self, name: &str, runlist: &Runlist) -> Result<()> {
        print(&json!({"name": name, "apps": runlist}))
    }

    pub fn render_user(&self, user: &User) -> Result<()> {
        print(user)
    }

    pub fn render_config(&self, config: &FlowConfig, path: &Path) -> Result<()> {
        print(&json!({"path": path, "config": config}))
    }

    pub fn render_upload(&self, outcome: &UploadOutcome) -> Result<()> {
        print(outcome)
    }

    pub fn render_version(&self, version: &str) -> Result<()> {
        print(&json!({"version": version}))
    }
}
