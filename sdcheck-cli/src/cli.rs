//! CLI argument parsing using clap derive API
//!
//! Purely declarative: no I/O happens here.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// sdcheck -- service-discovery and network-policy acceptance check.
///
/// Use `sdcheck <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "sdcheck", version, about, long_about = None)]
pub struct Cli {
    /// Path to the sdcheck.toml configuration file.
    #[arg(short, long, default_value = "sdcheck.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the service-discovery scenario against the configured platform.
    Run(RunArgs),

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- run ----

/// Push the apps, check policy gating, clean up.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Override the prefix of generated app and host names.
    #[arg(long)]
    pub name_prefix: Option<String>,

    /// Override the path to the cf binary.
    #[arg(long)]
    pub cf_binary: Option<PathBuf>,

    /// Skip TLS certificate validation for the API and app routes.
    #[arg(long)]
    pub skip_ssl_validation: bool,
}

// ---- config ----

/// Manage sdcheck configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate {
        /// Also require everything `run` needs (API, credentials, org/space, assets).
        #[arg(long)]
        for_run: bool,
    },
    /// Show the effective configuration (file + env overrides + defaults), passwords redacted.
    Show {
        /// Show only a specific section (general, platform, user, apps, timeouts).
        #[arg(long)]
        section: Option<String>,
    },
}
