//! `flow users`: operator accounts.
//!
//! Runs with direct registry access and needs no token, so the first admin
//! can be created on a fresh registry.

use std::process::ExitCode;

use anyhow::Result;
use clap::Subcommand;

use crate::app::AppContext;
use crate::application::services::catalog;

/// Users subcommands.
#[derive(Subcommand)]
pub enum UsersCommand {
    /// Create a user and print its API token
    Add {
        username: String,
        /// Grant admin rights
        #[arg(long)]
        admin: bool,
    },
}

/// Run the users command.
///
/// # Errors
///
/// Returns an error if the user exists or the registry is unavailable.
pub async fn run(app: &AppContext, cmd: UsersCommand) -> Result<ExitCode> {
    let registry = app.registry().await?;
    match cmd {
        UsersCommand::Add { username, admin } => {
            let user = catalog::create_user(&registry, &username, admin).await?;
            app.renderer().render_user(&user)?;
        }
    }
    Ok(ExitCode::SUCCESS)
}
