//! Output formatting module

pub mod human;
pub mod json;
pub mod progress;
pub mod reporter;
pub mod styles;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use console::Term;
use flow_common::{HostSet, Manifest, Profile, Runlist, User};
use owo_colors::OwoColorize as _;
use serde::Serialize;

use crate::domain::{DispatchReport, FlowConfig};
pub use human::HumanRenderer;
pub use json::JsonRenderer;
pub use reporter::TerminalReporter;
pub use styles::Styles;

/// Output context carrying styling and terminal state.
pub struct OutputContext {
    /// Stylesheet for colored output.
    pub styles: Styles,
    /// Whether stdout is a TTY.
    pub is_tty: bool,
    /// Whether to suppress non-error output.
    pub quiet: bool,
}

impl OutputContext {
    /// Create output context based on CLI flags and environment.
    #[must_use]
    pub fn new(no_color: bool, quiet: bool) -> Self {
        let is_tty = Term::stdout().is_term();
        let use_colors = !no_color && is_tty && std::env::var("NO_COLOR").is_err();

        let mut styles = Styles::default();
        if use_colors {
            styles.colorize();
        }

        Self {
            styles,
            is_tty,
            quiet,
        }
    }

    /// Check if progress indicators should be shown.
    #[must_use]
    pub fn show_progress(&self) -> bool {
        self.is_tty && !self.quiet
    }

    /// Print a success message prefixed with `✓`. Suppressed when `quiet`.
    pub fn success(&self, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", "✓".style(self.styles.success));
        }
    }

    /// Print a warning message prefixed with `⚠`. Suppressed when `quiet`.
    pub fn warn(&self, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", "⚠".style(self.styles.warning));
        }
    }

    /// Print an error message prefixed with `✗` to stderr. Never suppressed.
    pub fn error(&self, msg: &str) {
        eprintln!("  {} {msg}", "✗".style(self.styles.error));
    }

    /// Print an info message prefixed with `ℹ`. Suppressed when `quiet`.
    pub fn info(&self, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", "ℹ".style(self.styles.info));
        }
    }

    /// Print a section header. Suppressed when `quiet`.
    pub fn header(&self, msg: &str) {
        if !self.quiet {
            println!("  {}", msg.style(self.styles.header));
        }
    }

    /// Print a key-value pair with the key dimmed. Suppressed when `quiet`.
    pub fn kv(&self, key: &str, value: &str) {
        if !self.quiet {
            println!("  {:<14} {value}", key.style(self.styles.dim));
        }
    }
}

/// Renders command results in the active output mode.
pub enum Renderer<'a> {
    Human(HumanRenderer<'a>),
    Json(JsonRenderer),
}

impl Renderer<'_> {
    /// Application manifests.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_apps(&self, apps: &[Manifest]) -> Result<()> {
        match self {
            Renderer::Human(r) => {
                r.render_apps(apps);
                Ok(())
            }
            Renderer::Json(r) => r.render_apps(apps),
        }
    }

    /// One application manifest.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_app(&self, app: &Manifest) -> Result<()> {
        match self {
            Renderer::Human(r) => {
                r.render_app(app);
                Ok(())
            }
            Renderer::Json(r) => r.render_app(app),
        }
    }

    /// Host roster.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_hosts(&self, hosts: &HostSet) -> Result<()> {
        match self {
            Renderer::Human(r) => {
                r.render_hosts(hosts);
                Ok(())
            }
            Renderer::Json(r) => r.render_hosts(hosts),
        }
    }

    /// Per-host `query` replies.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_stats(&self, report: &DispatchReport) -> Result<()> {
        match self {
            Renderer::Human(r) => {
                r.render_stats(report);
                Ok(())
            }
            Renderer::Json(r) => r.render_stats(report),
        }
    }

    /// Profiles by name.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_profiles(&self, profiles: &BTreeMap<String, Profile>) -> Result<()> {
        match self {
            Renderer::Human(r) => {
                r.render_profiles(profiles);
                Ok(())
            }
            Renderer::Json(r) => r.render_profiles(profiles),
        }
    }

    /// One profile.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_profile(&self, name: &str, profile: &Profile) -> Result<()> {
        match self {
            Renderer::Human(r) => {
                r.render_profile(name, profile);
                Ok(())
            }
            Renderer::Json(r) => r.render_profile(name, profile),
        }
    }

    /// Runlists by name.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_runlists(&self, runlists: &BTreeMap<String, Runlist>) -> Result<()> {
        match self {
            Renderer::Human(r) => {
                r.render_runlists(runlists);
                Ok(())
            }
            Renderer::Json(r) => r.render_runlists(runlists),
        }
    }

    /// One runlist.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_runlist(&self, name: &str, runlist: &Runlist) -> Result<()> {
        match self {
            Renderer::Human(r) => {
                r.render_runlist(name, runlist);
                Ok(())
            }
            Renderer::Json(r) => r.render_runlist(name, runlist),
        }
    }

    /// A freshly created user, token included.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_user(&self, user: &User) -> Result<()> {
        match self {
            Renderer::Human(r) => {
                r.render_user(user);
                Ok(())
            }
            Renderer::Json(r) => r.render_user(user),
        }
    }

    /// Effective configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_config(&self, config: &FlowConfig, path: &Path) -> Result<()> {
        match self {
            Renderer::Human(r) => {
                r.render_config(config, path);
                Ok(())
            }
            Renderer::Json(r) => r.render_config(config, path),
        }
    }

    /// Result of a build or upload.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_upload(&self, outcome: &UploadOutcome) -> Result<()> {
        match self {
            Renderer::Human(r) => {
                r.render_upload(outcome);
                Ok(())
            }
            Renderer::Json(r) => r.render_upload(outcome),
        }
    }

    /// CLI version.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_version(&self, version: &str) -> Result<()> {
        match self {
            Renderer::Human(r) => {
                r.render_version(version);
                Ok(())
            }
            Renderer::Json(r) => r.render_version(version),
        }
    }
}

/// What `build` and `upload` report back.
#[derive(Debug, Clone, Serialize)]
pub struct UploadOutcome {
    /// Registered uuid; `None` when registration was skipped.
    pub uuid: Option<String>,
    pub name: String,
    #[serde(rename = "ref")]
    pub reference: String,
    pub sha256: String,
    pub size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archive: Option<PathBuf>,
}
