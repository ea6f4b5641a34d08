//! Human-readable terminal renderer.

use std::collections::BTreeMap;
use std::path::Path;

use flow_common::{HostSet, Manifest, Profile, Runlist, User};
use owo_colors::OwoColorize as _;

use crate::domain::{DispatchReport, DispatchResult, FlowConfig};
use crate::infra::config::CONFIG_ENV;
use crate::output::{OutputContext, UploadOutcome};

/// Renders domain types as human-readable terminal output using `OutputContext`.
pub struct HumanRenderer<'a> {
    ctx: &'a OutputContext,
}

impl<'a> HumanRenderer<'a> {
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self { ctx }
    }

    pub fn render_apps(&self, apps: &[Manifest]) {
        if apps.is_empty() {
            self.ctx.info("No applications uploaded. Upload one: flow build <repository-url>");
            return;
        }
        if self.ctx.quiet {
            return;
        }
        for app in apps {
            let status = match app.runlist.as_deref() {
                Some(runlist) if app.is_deployed() => format!("deployed in {runlist}"),
                _ => "not deployed".to_string(),
            };
            println!(
                "  {:<40} {:<8} {}",
                app.uuid.style(self.ctx.styles.ident),
                app.info.runtime.as_str(),
                status.style(self.ctx.styles.dim)
            );
        }
    }

    pub fn render_app(&self, app: &Manifest) {
        self.ctx.header(&app.uuid);
        self.ctx.kv("name:", &app.info.name);
        self.ctx.kv("description:", &app.info.description);
        self.ctx.kv("type:", app.info.runtime.as_str());
        self.ctx.kv("ref:", &app.reference);
        self.ctx.kv("runlist:", app.runlist.as_deref().unwrap_or("(none)"));
        if let Some(url) = &app.url {
            self.ctx.kv("url:", url);
        }
        if let Some(sha) = &app.sha256 {
            self.ctx.kv("sha256:", sha);
        }
        if let Some(at) = &app.uploaded_at {
            self.ctx.kv("uploaded:", &at.to_rfc3339());
        }
        if let Some(slave) = &app.info.slave {
            self.ctx.kv("slave:", slave);
        }
        if !app.info.dependencies.is_empty() {
            self.ctx.kv("depends:", &app.info.dependencies.join(", "));
        }
        if !app.info.changelog.is_empty() && !self.ctx.quiet {
            println!();
            self.ctx.header("Changelog:");
            for line in &app.info.changelog {
                println!("    {line}");
            }
        }
    }

    pub fn render_hosts(&self, hosts: &HostSet) {
        if hosts.is_empty() {
            self.ctx.info("No hosts registered. Add one: flow hosts add <alias> <host>");
            return;
        }
        for (alias, members) in &hosts.0 {
            if members.is_empty() {
                continue;
            }
            self.ctx.header(alias);
            if !self.ctx.quiet {
                for host in members {
                    println!("    {host}");
                }
            }
        }
    }

    pub fn render_stats(&self, report: &DispatchReport) {
        for (host, result) in report {
            match result {
                DispatchResult::Responded(reply) => {
                    self.ctx.success(host);
                    if self.ctx.quiet {
                        continue;
                    }
                    for (key, value) in reply {
                        println!("    {:<32} {value}", key.style(self.ctx.styles.dim));
                    }
                }
                DispatchResult::Absent(reason) => {
                    self.ctx.warn(&format!("{host}: {reason}"));
                }
            }
        }
    }

    pub fn render_profiles(&self, profiles: &BTreeMap<String, Profile>) {
        if profiles.is_empty() {
            self.ctx.info("No profiles stored.");
            return;
        }
        for (name, profile) in profiles {
            self.render_profile(name, profile);
        }
    }

    pub fn render_profile(&self, name: &str, profile: &Profile) {
        self.ctx.header(name);
        for (option, value) in profile {
            self.ctx.kv(&format!("{option}:"), &value.to_string());
        }
    }

    pub fn render_runlists(&self, runlists: &BTreeMap<String, Runlist>) {
        if runlists.is_empty() {
            self.ctx.info("No runlists stored.");
            return;
        }
        for (name, runlist) in runlists {
            self.render_runlist(name, runlist);
        }
    }

    pub fn render_runlist(&self, name: &str, runlist: &Runlist) {
        self.ctx.header(name);
        if runlist.is_empty() {
            self.ctx.info("(empty)");
        }
        for (uuid, profile) in runlist {
            self.ctx.kv(uuid, profile);
        }
    }

    pub fn render_user(&self, user: &User) {
        self.ctx.success(&format!(
            "Created {}user {}",
            if user.admin { "admin " } else { "" },
            user.username
        ));
        // Printed even when quiet.
        println!("{}", user.token);
    }

    pub fn render_config(&self, config: &FlowConfig, path: &Path) {
        println!();
        println!(
            "  {}",
            format!("Configuration ({})", path.display()).style(self.ctx.styles.header)
        );
        println!();
        println!("  {:<30} {}", "registry.url:", config.registry.url);
        println!("  {:<30} {}", "fleet.port:", config.fleet.port);
        println!("  {:<30} {}", "fleet.timeout_secs:", config.fleet.timeout_secs);
        println!("  {:<30} {}", "fleet.concurrency:", config.fleet.concurrency);
        println!(
            "  {:<30} {}",
            "build.upload_folder:",
            config.build.upload_folder.display()
        );
        println!("  {:<30} {}", "build.keep_workdir:", config.build.keep_workdir);
        println!(
            "  {:<30} {}",
            "build.command_timeout_secs:", config.build.command_timeout_secs
        );
        println!(
            "  {:<30} {}",
            "build.install_timeout_secs:", config.build.install_timeout_secs
        );
        println!("  {:<30} {}", "build.changelog_depth:", config.build.changelog_depth);
        println!("  {:<30} {}", "runtimes.python.pip:", config.runtimes.python.pip);
        println!(
            "  {:<30} {}",
            "runtimes.nodejs.prefix:",
            config.runtimes.nodejs.prefix.display()
        );
        println!("  {:<30} {}", "runtimes.nodejs.worker:", config.runtimes.nodejs.worker);
        println!(
            "  {:<30} {}",
            "auth.token:",
            if config.auth.token.is_some() { "(set)" } else { "(not set)" }
        );
        println!();
        println!("  {}", "Environment:".style(self.ctx.styles.bold));
        for var in [CONFIG_ENV, "FLOW_TOKEN", "NO_COLOR", "RUST_LOG"] {
            let shown = match std::env::var(var) {
                Ok(_) if var == "FLOW_TOKEN" => "(set)".to_string(),
                Ok(value) => value,
                Err(_) => "(not set)".to_string(),
            };
            println!("    {:<18} {shown}", format!("{var}:"));
        }
        println!();
    }

    pub fn render_upload(&self, outcome: &UploadOutcome) {
        match &outcome.uuid {
            Some(uuid) => self.ctx.success(&format!("Uploaded {uuid}")),
            None => self.ctx.success(&format!("Built {} (not uploaded)", outcome.name)),
        }
        self.ctx.kv("ref:", &outcome.reference);
        self.ctx.kv("sha256:", &outcome.sha256);
        self.ctx.kv("size:", &format!("{} bytes", outcome.size));
        if let Some(archive) = &outcome.archive {
            self.ctx.kv("archive:", &archive.display().to_string());
        }
    }

    pub fn render_version(&self, version: &str) {
        if self.ctx.quiet {
            return;
        }
        println!("flow {version}");
    }
}
