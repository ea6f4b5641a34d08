//! CLI argument parsing with clap derive

use std::process::ExitCode;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};

use crate::app::{AppContext, AppFlags, BehaviourFlags, OutputFlags};
use crate::commands;

/// Build, register and deploy applications onto a worker fleet
#[derive(Parser)]
#[command(
    name = "flow",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Skip confirmation prompts
    #[arg(short, long, global = true)]
    pub yes: bool,

    /// API token (overrides `auth.token`)
    #[arg(long, global = true, env = "FLOW_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Build an application from a repository and upload it
    Build(commands::build::BuildArgs),

    /// Upload a prebuilt archive
    Upload(commands::upload::UploadArgs),

    /// Start an application on every host and add it to a runlist
    Deploy(commands::deploy::DeployArgs),

    /// Stop an application on every host and remove it from a runlist
    Undeploy(commands::deploy::UndeployArgs),

    /// Manage uploaded applications
    #[command(subcommand)]
    Apps(commands::apps::AppsCommand),

    /// Manage the worker host roster
    #[command(subcommand)]
    Hosts(commands::hosts::HostsCommand),

    /// Manage runtime profiles
    #[command(subcommand)]
    Profiles(commands::profiles::ProfilesCommand),

    /// Inspect runlists
    #[command(subcommand)]
    Runlists(commands::runlists::RunlistsCommand),

    /// Manage operator accounts
    #[command(subcommand)]
    Users(commands::users::UsersCommand),

    /// Manage configuration
    #[command(subcommand)]
    Config(commands::config::ConfigCommand),

    /// Show version
    Version,
}

impl Cli {
    /// Default log filter when `RUST_LOG` is unset.
    #[must_use]
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "flow_cli=info,warn",
            2 => "flow_cli=debug,info",
            _ => "trace",
        }
    }

    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn run(self) -> Result<ExitCode> {
        let Cli {
            json,
            quiet,
            no_color,
            yes,
            token,
            verbose: _,
            command,
        } = self;
        let app = AppContext::new(&AppFlags {
            output: OutputFlags {
                no_color,
                quiet,
                json,
            },
            behaviour: BehaviourFlags { yes, token },
        })?;

        match command {
            Command::Build(args) => commands::build::run(&app, args).await,
            Command::Upload(args) => commands::upload::run(&app, args).await,
            Command::Deploy(args) => commands::deploy::deploy(&app, args).await,
            Command::Undeploy(args) => commands::deploy::undeploy(&app, args).await,
            Command::Apps(cmd) => commands::apps::run(&app, cmd).await,
            Command::Hosts(cmd) => commands::hosts::run(&app, cmd).await,
            Command::Profiles(cmd) => commands::profiles::run(&app, cmd).await,
            Command::Runlists(cmd) => commands::runlists::run(&app, cmd).await,
            Command::Users(cmd) => commands::users::run(&app, cmd).await,
            Command::Config(cmd) => commands::config::run(&app, cmd),
            Command::Version => commands::version::run(&app),
        }
    }
}

/// Stable machine-readable code for a failed command.
#[must_use]
pub fn error_code(err: &anyhow::Error) -> &'static str {
    use crate::domain::error::{
        BuildError, ConfigError, DeployError, ProfileError, RegistryError, UploadError,
    };

    if let Some(e) = err.downcast_ref::<DeployError>() {
        e.code()
    } else if let Some(e) = err.downcast_ref::<BuildError>() {
        e.code()
    } else if let Some(e) = err.downcast_ref::<UploadError>() {
        e.code()
    } else if let Some(e) = err.downcast_ref::<RegistryError>() {
        e.code()
    } else if let Some(e) = err.downcast_ref::<ProfileError>() {
        e.code()
    } else if let Some(e) = err.downcast_ref::<ConfigError>() {
        e.code()
    } else {
        "error"
    }
}
