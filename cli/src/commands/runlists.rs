//! `flow runlists`

use std::process::ExitCode;

use anyhow::Result;
use clap::Subcommand;

use crate::app::AppContext;
use crate::application::services::catalog;

/// Runlists subcommands.
#[derive(Subcommand)]
pub enum RunlistsCommand {
    /// List runlists and their applications
    List,
    /// Show one runlist
    Show { name: String },
}

/// Run the runlists command.
///
/// # Errors
///
/// Returns registry errors.
pub async fn run(app: &AppContext, cmd: RunlistsCommand) -> Result<ExitCode> {
    let registry = app.registry().await?;
    app.caller(&registry).await?;
    match cmd {
        RunlistsCommand::List => {
            let runlists = catalog::list_runlists(&registry).await?;
            app.renderer().render_runlists(&runlists)?;
        }
        RunlistsCommand::Show { name } => {
            let runlist = catalog::show_runlist(&registry, &name).await?;
            app.renderer().render_runlist(&name, &runlist)?;
        }
    }
    Ok(ExitCode::SUCCESS)
}
