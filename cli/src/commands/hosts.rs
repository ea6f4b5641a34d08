//! `flow hosts`: manage the worker host roster.

use std::process::ExitCode;

use anyhow::Result;
use clap::Subcommand;

use crate::app::AppContext;
use crate::application::services::catalog;
use crate::output::progress;

/// Hosts subcommands.
#[derive(Subcommand)]
pub enum HostsCommand {
    /// List hosts grouped by alias
    List,
    /// Add a host to an alias (admin)
    Add {
        alias: String,
        /// Host name or address, optionally with `:port`
        host: String,
    },
    /// Remove a host from an alias (admin)
    Remove { alias: String, host: String },
    /// Query runtime state on one host or on every host
    Stats {
        /// Only query this host
        host: Option<String>,
    },
}

/// Run the hosts command.
///
/// # Errors
///
/// Returns registry and authorization errors, and `NoHosts` for an empty roster.
pub async fn run(app: &AppContext, cmd: HostsCommand) -> Result<ExitCode> {
    let registry = app.registry().await?;
    match cmd {
        HostsCommand::List => {
            let hosts = catalog::list_hosts(&registry).await?;
            app.renderer().render_hosts(&hosts)?;
        }
        HostsCommand::Add { alias, host } => {
            let caller = app.caller(&registry).await?;
            catalog::add_host(&registry, &caller, &alias, &host).await?;
            app.output.success(&format!("Added {host} to {alias}"));
        }
        HostsCommand::Remove { alias, host } => {
            let caller = app.caller(&registry).await?;
            catalog::remove_host(&registry, &caller, &alias, &host).await?;
            app.output.success(&format!("Removed {host} from {alias}"));
        }
        HostsCommand::Stats { host } => {
            app.caller(&registry).await?;
            let dispatcher = app.dispatcher()?;
            let spinner = progress::spinner_for(&app.output, "Querying hosts...");
            let report = catalog::host_stats(&registry, &dispatcher, host.as_deref()).await;
            if let Some(pb) = &spinner {
                pb.finish_and_clear();
            }
            app.renderer().render_stats(&report?)?;
        }
    }
    Ok(ExitCode::SUCCESS)
}
