//! `sdcheck config` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use sdcheck_core::config::SdcheckConfig;

use crate::cli::{ConfigAction, ConfigArgs};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

const REDACTED: &str = "***REDACTED***";
const SECTIONS: [&str; 5] = ["general", "platform", "user", "apps", "timeouts"];

/// Execute the `config` command.
pub async fn execute(
    args: ConfigArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    match args.action {
        ConfigAction::Validate { for_run } => execute_validate(config_path, for_run, writer).await,
        ConfigAction::Show { section } => execute_show(config_path, section, writer).await,
    }
}

/// Loads and validates the configuration file, reporting any errors.
///
/// With `for_run`, also checks that everything `sdcheck run` needs is set.
///
/// # Errors
///
/// Returns `CliError::Config` if validation fails.
async fn execute_validate(
    config_path: &Path,
    for_run: bool,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    info!(path = %config_path.display(), for_run, "validating configuration");

    let result = match SdcheckConfig::load(config_path).await {
        Ok(config) if for_run => config.validate_for_run(),
        Ok(_) => Ok(()),
        Err(e) => Err(e),
    };

    let report = ConfigValidationReport {
        source: config_path.display().to_string(),
        valid: result.is_ok(),
        errors: result.err().map(|e| e.to_string()).into_iter().collect(),
    };

    writer.render(&report)?;

    if !report.valid {
        return Err(CliError::Config("configuration is invalid".to_owned()));
    }

    Ok(())
}

/// Displays the effective configuration (file + env overrides + defaults) with
/// passwords redacted.
///
/// # Errors
///
/// Returns `CliError::Core` if loading fails or `CliError::Command` if the section
/// name is unknown.
async fn execute_show(
    config_path: &Path,
    section: Option<String>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    info!(path = %config_path.display(), "loading configuration");

    let mut config = SdcheckConfig::load(config_path).await?;
    redact_credentials(&mut config);

    let config_toml = match section.as_deref() {
        None => to_toml(&config),
        Some("general") => to_toml(&config.general),
        Some("platform") => to_toml(&config.platform),
        Some("user") => to_toml(&config.user),
        Some("apps") => to_toml(&config.apps),
        Some("timeouts") => to_toml(&config.timeouts),
        Some(other) => {
            return Err(CliError::Command(format!(
                "unknown section: {} (expected: {})",
                other,
                SECTIONS.join(", ")
            )));
        }
    };

    let report = ConfigReport {
        source: config_path.display().to_string(),
        section,
        config_toml,
    };

    writer.render(&report)?;

    Ok(())
}

fn to_toml<T: Serialize>(value: &T) -> String {
    toml::to_string_pretty(value).unwrap_or_else(|e| format!("(serialization error: {})", e))
}

/// Replaces non-empty passwords with a marker.
fn redact_credentials(config: &mut SdcheckConfig) {
    for password in [
        &mut config.platform.admin_password,
        &mut config.user.password,
    ] {
        if !password.is_empty() {
            *password = REDACTED.to_owned();
        }
    }
}

/// Configuration display report.
///
/// `config_toml` is only used for text rendering.
#[derive(Serialize)]
pub struct ConfigReport {
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(skip)]
    pub config_toml: String,
}

impl Render for ConfigReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        if let Some(ref section) = self.section {
            let section_label = format!("[{}]", section);
            writeln!(
                w,
                "Configuration {} (source: {})",
                section_label.bold(),
                self.source
            )?;
        } else {
            writeln!(w, "Configuration (source: {})", self.source.bold())?;
        }

        writeln!(w)?;
        write!(w, "{}", self.config_toml)?;

        Ok(())
    }
}

/// Configuration validation report.
#[derive(Serialize)]
pub struct ConfigValidationReport {
    pub source: String,
    pub valid: bool,
    /// Empty if valid
    pub errors: Vec<String>,
}

impl Render for ConfigValidationReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Config Validation: {}", self.source.bold())?;

        if self.valid {
            writeln!(w, "  Result: {}", "VALID".green().bold())?;
        } else {
            writeln!(w, "  Result: {}", "INVALID".red().bold())?;
            for err in &self.errors {
                writeln!(w, "  Error: {}", err.red())?;
            }
        }

        Ok(())
    }
}
