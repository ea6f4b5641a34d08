//! `flow profiles`

use std::process::ExitCode;

use anyhow::Result;
use clap::Subcommand;

use crate::app::AppContext;
use crate::application::services::catalog;

/// Profiles subcommands.
#[derive(Subcommand)]
pub enum ProfilesCommand {
    /// List stored profiles
    List,
    /// Show one profile
    Show { name: String },
    /// Change an option the profile already has
    Set {
        name: String,
        option: String,
        /// New value; parsed as JSON when possible, otherwise kept as a string
        value: String,
    },
}

/// Run the profiles command.
///
/// # Errors
///
/// Returns registry errors and profile validation failures.
pub async fn run(app: &AppContext, cmd: ProfilesCommand) -> Result<ExitCode> {
    let registry = app.registry().await?;
    app.caller(&registry).await?;
    match cmd {
        ProfilesCommand::List => {
            let profiles = catalog::list_profiles(&registry).await?;
            app.renderer().render_profiles(&profiles)?;
        }
        ProfilesCommand::Show { name } => {
            let profile = catalog::show_profile(&registry, &name).await?;
            app.renderer().render_profile(&name, &profile)?;
        }
        ProfilesCommand::Set { name, option, value } => {
            let profile = catalog::set_profile_option(&registry, &name, &option, &value).await?;
            if app.is_json() {
                app.renderer().render_profile(&name, &profile)?;
            } else {
                app.output.success(&format!("Set {name}.{option} = {value}"));
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}
