//! `sdcheck run` command handler

use std::io::Write;
use std::path::Path;

use colored::Colorize;
use tracing::info;

use sdcheck_core::config::SdcheckConfig;
use sdcheck_platform::{CliSession, CommandTimeouts, ReqwestProbe};
use sdcheck_suite::{ScenarioReport, ScenarioSettings, ServiceDiscoveryScenario, StepOutcome};

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::logging;
use crate::output::{OutputWriter, Render};

/// Execute the `run` command.
///
/// Loads and validates the configuration, logs in the user and admin sessions,
/// runs the scenario and renders its report.
///
/// # Errors
///
/// `CliError::Core` for configuration or login failures, `CliError::ScenarioFailed`
/// when the scenario ran but did not pass.
pub async fn execute(
    args: RunArgs,
    config_path: &Path,
    log_level: Option<&str>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let mut config = SdcheckConfig::load(config_path).await?;
    apply_overrides(&mut config, &args);
    config.validate_for_run()?;

    logging::init_tracing(&config.general, log_level)
        .map_err(|e| CliError::Config(e.to_string()))?;

    info!(
        path = %config_path.display(),
        api = %config.platform.api,
        apps_domain = %config.platform.apps_domain,
        "starting service discovery run"
    );

    let timeouts = CommandTimeouts {
        default: config.default_timeout(),
        push: config.cf_push_timeout(),
    };
    let binary = config.platform.cf_binary.as_str();
    let user = CliSession::open(binary, timeouts, config.user_context()).await?;
    let admin = CliSession::open(binary, timeouts, config.admin_context()).await?;
    let probe = ReqwestProbe::new(config.default_timeout(), config.platform.skip_ssl_validation)?;

    let scenario = ServiceDiscoveryScenario::new(
        user.client().clone(),
        admin.client().clone(),
        probe,
        ScenarioSettings::from_config(&config),
    );
    let report = scenario.run().await;

    writer.render(&report)?;

    if !report.passed {
        let reason = report
            .error
            .clone()
            .or_else(|| report.teardown_errors.first().cloned())
            .unwrap_or_else(|| "unknown failure".to_owned());
        return Err(CliError::ScenarioFailed(reason));
    }

    Ok(())
}

fn apply_overrides(config: &mut SdcheckConfig, args: &RunArgs) {
    if let Some(prefix) = &args.name_prefix {
        config.apps.name_prefix.clone_from(prefix);
    }
    if let Some(binary) = &args.cf_binary {
        config.platform.cf_binary = binary.display().to_string();
    }
    if args.skip_ssl_validation {
        config.platform.skip_ssl_validation = true;
    }
}

impl Render for ScenarioReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        writeln!(w, "Scenario: {}", self.scenario.bold())?;
        writeln!(w, "  Frontend:      {}", self.names.frontend)?;
        writeln!(w, "  Backend:       {}", self.names.backend)?;
        writeln!(w, "  Internal host: {}", self.names.internal_host)?;
        writeln!(w)?;

        for step in &self.steps {
            match &step.outcome {
                StepOutcome::Passed => {
                    writeln!(w, "  {} {} ({}ms)", "✓".green(), step.name, step.duration_ms)?;
                }
                StepOutcome::Failed { reason } => {
                    writeln!(w, "  {} {} ({}ms)", "✗".red(), step.name, step.duration_ms)?;
                    writeln!(w, "      {}", reason.red())?;
                }
            }
        }

        if !self.teardown_errors.is_empty() {
            writeln!(w)?;
            writeln!(w, "Teardown errors:")?;
            for err in &self.teardown_errors {
                writeln!(w, "  {}", err.yellow())?;
            }
        }

        for (app, text) in &self.app_reports {
            writeln!(w)?;
            writeln!(w, "App report: {}", app.bold())?;
            for line in text.lines() {
                writeln!(w, "  {line}")?;
            }
        }

        writeln!(w)?;
        if self.passed {
            writeln!(w, "Result: {}", "PASSED".green().bold())?;
        } else {
            writeln!(w, "Result: {}", "FAILED".red().bold())?;
        }
        Ok(())
    }
}
