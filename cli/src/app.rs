//! Application context: unified state passed to every command handler.
//!
//! Adapters that need the network (registry, fleet transport) are built on
//! demand so commands like `config` and `version` work offline.

use anyhow::{Context, Result};
use flow_common::User;

use crate::application::services::catalog;
use crate::application::services::config_service;
use crate::application::services::dispatcher::FleetDispatcher;
use crate::domain::FlowConfig;
use crate::infra::command_runner::TokioCommandRunner;
use crate::infra::config::YamlConfigStore;
use crate::infra::fleet::HttpHostTransport;
use crate::infra::registry::ValkeyRegistry;
use crate::output::{HumanRenderer, JsonRenderer, OutputContext, Renderer, TerminalReporter};

/// Output rendering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable terminal output (default).
    Human,
    /// Machine-readable JSON output.
    Json,
}

/// Output rendering flags.
pub struct OutputFlags {
    /// Disable ANSI color output.
    pub no_color: bool,
    /// Suppress non-error output.
    pub quiet: bool,
    /// Enable JSON output mode.
    pub json: bool,
}

/// Behaviour flags.
pub struct BehaviourFlags {
    /// Skip interactive prompts (also set by `CI` / `FLOW_YES` env vars).
    pub yes: bool,
    /// API token from `--token` / `FLOW_TOKEN`.
    pub token: Option<String>,
}

/// Flags passed from the top-level CLI to `AppContext::new`.
pub struct AppFlags {
    pub output: OutputFlags,
    pub behaviour: BehaviourFlags,
}

/// Unified application context passed to every command handler.
pub struct AppContext {
    /// Terminal output context (colors, quiet mode).
    ///
    /// Always quiet in JSON mode so progress lines never reach stdout.
    pub output: OutputContext,
    pub mode: OutputMode,
    pub config_store: YamlConfigStore,
    /// Configuration as loaded at startup.
    pub config: FlowConfig,
    /// Runs git, hg, pip and npm for builds.
    pub runner: TokioCommandRunner,
    /// When `true`, skip interactive prompts and use defaults.
    pub non_interactive: bool,
    token: Option<String>,
}

impl AppContext {
    /// Construct an `AppContext` from top-level CLI flags.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but cannot be parsed.
    pub fn new(flags: &AppFlags) -> Result<Self> {
        let ci_env = std::env::var("CI").is_ok() || std::env::var("FLOW_YES").is_ok();
        let non_interactive = flags.behaviour.yes || ci_env;

        let mode = if flags.output.json {
            OutputMode::Json
        } else {
            OutputMode::Human
        };

        let config_store = YamlConfigStore;
        let config = config_service::load_config(&config_store)?;
        let runner = TokioCommandRunner::new(config.build.command_timeout());

        Ok(Self {
            output: OutputContext::new(
                flags.output.no_color,
                flags.output.quiet || flags.output.json,
            ),
            mode,
            config_store,
            config,
            runner,
            non_interactive,
            token: flags.behaviour.token.clone(),
        })
    }

    /// Returns `true` when JSON output mode is active.
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.mode == OutputMode::Json
    }

    /// Returns the appropriate `Renderer` variant for the current output mode.
    #[must_use]
    pub fn renderer(&self) -> Renderer<'_> {
        match self.mode {
            OutputMode::Human => Renderer::Human(HumanRenderer::new(&self.output)),
            OutputMode::Json => Renderer::Json(JsonRenderer),
        }
    }

    #[must_use]
    pub fn reporter(&self) -> TerminalReporter<'_> {
        TerminalReporter::new(&self.output)
    }

    /// Ask the user for confirmation.
    ///
    /// When `non_interactive` is `true` (CI, `--yes` flag, or `FLOW_YES` env),
    /// returns `default` immediately without prompting.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal prompt fails (e.g. no TTY available).
    pub fn confirm(&self, prompt: &str, default: bool) -> Result<bool> {
        if self.non_interactive {
            return Ok(default);
        }
        let confirmed = dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(default)
            .interact()?;
        Ok(confirmed)
    }

    /// Connect to the configured registry.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry cannot be reached.
    pub async fn registry(&self) -> Result<ValkeyRegistry> {
        Ok(ValkeyRegistry::connect(&self.config.registry.url).await?)
    }

    /// A dispatcher over the HTTP fleet transport.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn dispatcher(&self) -> Result<FleetDispatcher<HttpHostTransport>> {
        let fleet = &self.config.fleet;
        let transport = HttpHostTransport::new(fleet.port, fleet.timeout())
            .context("cannot build fleet transport")?;
        Ok(FleetDispatcher::new(transport, fleet.timeout(), fleet.concurrency))
    }

    /// The API token: the flag or environment first, then `auth.token`.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref().or(self.config.auth.token.as_deref())
    }

    /// Resolve the calling user against `registry`.
    ///
    /// # Errors
    ///
    /// Returns an error when no token is configured or the token is unknown.
    pub async fn caller(&self, registry: &ValkeyRegistry) -> Result<User> {
        catalog::authenticate(registry, self.token()).await
    }
}
