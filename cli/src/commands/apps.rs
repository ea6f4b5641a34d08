//! `flow apps`: list, inspect and delete uploaded applications.

use std::process::ExitCode;

use anyhow::Result;
use clap::Subcommand;

use crate::app::AppContext;
use crate::application::services::catalog;
use crate::application::services::deploy::DeploymentCoordinator;

/// Apps subcommands.
#[derive(Subcommand)]
pub enum AppsCommand {
    /// List applications you may manage
    List,
    /// Show one application manifest
    Show {
        /// Application uuid
        uuid: String,
    },
    /// Delete an undeployed application
    Delete {
        /// Application uuid
        uuid: String,
    },
}

/// Run the apps command.
///
/// # Errors
///
/// Returns registry, authorization and deletion errors.
pub async fn run(app: &AppContext, cmd: AppsCommand) -> Result<ExitCode> {
    let registry = app.registry().await?;
    let caller = app.caller(&registry).await?;
    match cmd {
        AppsCommand::List => {
            let apps = catalog::list_apps(&registry, &caller).await?;
            app.renderer().render_apps(&apps)?;
        }
        AppsCommand::Show { uuid } => {
            let manifest = catalog::show_app(&registry, &caller, &uuid).await?;
            app.renderer().render_app(&manifest)?;
        }
        AppsCommand::Delete { uuid } => {
            if !app.confirm(&format!("Delete application {uuid}?"), false)? {
                app.output.info("Cancelled.");
                return Ok(ExitCode::SUCCESS);
            }
            let coordinator = DeploymentCoordinator::new(registry, app.dispatcher()?);
            coordinator.delete_app(&caller, &uuid).await?;
            app.output.success(&format!("Deleted {uuid}"));
        }
    }
    Ok(ExitCode::SUCCESS)
}
