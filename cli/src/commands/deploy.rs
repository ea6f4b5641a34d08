//! `flow deploy` / `flow undeploy`

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;

use crate::app::AppContext;
use crate::application::services::deploy::DeploymentCoordinator;
use crate::infra::fleet::HttpHostTransport;
use crate::infra::registry::ValkeyRegistry;
use crate::output::progress;

/// Arguments for the deploy command.
#[derive(Args)]
pub struct DeployArgs {
    /// Runlist to add the application to
    pub runlist: String,
    /// Application uuid
    pub uuid: String,
    /// Profile to start the application with
    pub profile: String,

    /// JSON file replacing the stored profile before dispatch
    #[arg(long)]
    pub profile_file: Option<PathBuf>,
}

/// Arguments for the undeploy command.
#[derive(Args)]
pub struct UndeployArgs {
    /// Runlist to remove the application from
    pub runlist: String,
    /// Application uuid
    pub uuid: String,
}

async fn coordinator(
    app: &AppContext,
) -> Result<(DeploymentCoordinator<ValkeyRegistry, HttpHostTransport>, flow_common::User)> {
    let registry = app.registry().await?;
    let caller = app.caller(&registry).await?;
    Ok((DeploymentCoordinator::new(registry, app.dispatcher()?), caller))
}

/// Run the deploy command.
///
/// # Errors
///
/// Returns the coordinator's [`crate::domain::DeployError`] on failure.
pub async fn deploy(app: &AppContext, args: DeployArgs) -> Result<ExitCode> {
    let body = match &args.profile_file {
        Some(path) => {
            let raw = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("cannot read {}", path.display()))?;
            let body: serde_json::Value = serde_json::from_str(&raw)
                .with_context(|| format!("{} is not valid JSON", path.display()))?;
            Some(body)
        }
        None => None,
    };

    let (coordinator, caller) = coordinator(app).await?;
    let spinner = progress::spinner_for(
        &app.output,
        &format!("Deploying {} to {}...", args.uuid, args.runlist),
    );
    let result = coordinator
        .deploy(&caller, &args.runlist, &args.uuid, &args.profile, body.as_ref())
        .await;
    finish(spinner.as_ref(), result.is_ok(), "deploy");
    result?;

    report(app, "deployed", &args.uuid, &args.runlist)
}

/// Run the undeploy command.
///
/// # Errors
///
/// Returns the coordinator's [`crate::domain::DeployError`] on failure.
pub async fn undeploy(app: &AppContext, args: UndeployArgs) -> Result<ExitCode> {
    let (coordinator, caller) = coordinator(app).await?;
    let spinner = progress::spinner_for(
        &app.output,
        &format!("Undeploying {} from {}...", args.uuid, args.runlist),
    );
    let result = coordinator.undeploy(&caller, &args.runlist, &args.uuid).await;
    finish(spinner.as_ref(), result.is_ok(), "undeploy");
    result?;

    report(app, "undeployed", &args.uuid, &args.runlist)
}

fn finish(spinner: Option<&indicatif::ProgressBar>, ok: bool, action: &str) {
    let Some(pb) = spinner else { return };
    if ok {
        progress::finish_ok(pb, &format!("{action} dispatched to every host"));
    } else {
        progress::finish_error(pb, &format!("{action} failed"));
    }
}

fn report(app: &AppContext, action: &str, uuid: &str, runlist: &str) -> Result<ExitCode> {
    if app.is_json() {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "uuid": uuid,
                "runlist": runlist,
                "status": action,
            }))?
        );
    } else {
        app.output.success(&format!("{uuid} {action} ({runlist})"));
    }
    Ok(ExitCode::SUCCESS)
}
