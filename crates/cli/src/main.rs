//! calmwire CLI — the operator entry point.
//!
//! Commands:
//! - `analyze` — Run one message through the mediation pipeline
//! - `config`  — Show, initialize or validate configuration
//! - `doctor`  — Check configuration and reach the inference endpoint

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "calmwire",
    about = "calmwire — co-parenting message mediation",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json: bool,

    /// Config file to use instead of ~/.calmwire/config.toml
    #[arg(short, long, global = true, env = "CALMWIRE_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a single message
    Analyze(commands::analyze::AnalyzeArgs),

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Diagnose configuration and inference connectivity
    Doctor,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,
    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Check the config file for errors
    Validate,
    /// Print the config file path
    Path,
}

#[tokio::main]
async fn main() -> calmwire_core::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays machine-readable
    let filter = if cli.verbose { "debug" } else { "info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    if cli.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    let config_path = cli
        .config
        .unwrap_or_else(calmwire_config::MediatorConfig::config_path);

    match cli.command {
        Commands::Analyze(args) => commands::analyze::run(&config_path, args).await?,
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_cmd::show(&config_path).await?,
            ConfigAction::Init { force } => commands::config_cmd::init(&config_path, force).await?,
            ConfigAction::Validate => commands::config_cmd::validate(&config_path).await?,
            ConfigAction::Path => commands::config_cmd::path(&config_path).await?,
        },
        Commands::Doctor => commands::doctor::run(&config_path).await?,
    }

    Ok(())
}
