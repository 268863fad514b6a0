use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use bg_cli::render;
use bg_core::models::DeployMode;
use bg_core::services::config_loader::{self, DEFAULT_CONFIG_FILENAME};
use bg_core::services::deployer::Deployer;

#[derive(Parser)]
#[command(
    name = "bgswap",
    about = "Blue/green container swap controller",
    version,
    propagate_version = true
)]
struct Cli {
    /// Verbose logging
    #[arg(long, global = true)]
    debug: bool,
    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the idle slot, switch traffic to it and stop the live one
    Deploy {
        #[arg(short, long, default_value = DEFAULT_CONFIG_FILENAME)]
        config: PathBuf,
        /// Leave the proxy config alone even if one is configured
        #[arg(long)]
        no_proxy: bool,
    },
    /// Show which slot is live and the last recorded deployment
    Status {
        #[arg(short, long, default_value = DEFAULT_CONFIG_FILENAME)]
        config: PathBuf,
        /// Print machine-readable JSON
        #[arg(long)]
        json: bool,
    },
    /// Validate the config file and print a summary
    CheckConfig {
        #[arg(short, long, default_value = DEFAULT_CONFIG_FILENAME)]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    let _guard = setup_logging(cli.debug, cli.log_file.as_deref());

    match cli.command {
        Commands::Deploy { config, no_proxy } => deploy(&config, no_proxy).await,
        Commands::Status { config, json } => status(&config, json).await,
        Commands::CheckConfig { config } => check_config(&config),
    }
}

/// Log to stderr, or to `log_file` through a non-blocking writer.
/// The returned guard must live until the program exits.
fn setup_logging(
    debug: bool,
    log_file: Option<&Path>,
) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let default_level = if debug { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    match log_file {
        Some(path) => {
            let directory = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let file_name = path
                .file_name()
                .map(|n| n.to_os_string())
                .unwrap_or_else(|| "bgswap.log".into());
            let file_appender = tracing_appender::rolling::never(directory, file_name);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            tracing_subscriber::fmt()
                .with_writer(non_blocking)
                .with_env_filter(filter)
                .with_ansi(false)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt()
                .with_writer(std::io::stderr)
                .with_env_filter(filter)
                .init();
            None
        }
    }
}

async fn deploy(config_path: &Path, no_proxy: bool) -> color_eyre::Result<()> {
    let config = config_loader::load(config_path)?;
    let deployer = Deployer::from_config(config);
    let mode = if no_proxy {
        DeployMode::Swap
    } else {
        deployer.default_mode()
    };

    tracing::debug!(config = %config_path.display(), %mode, "running deployment");
    let report = deployer.deploy(mode).await?;
    println!("{}", render::render_report(&report));
    Ok(())
}

async fn status(config_path: &Path, json: bool) -> color_eyre::Result<()> {
    let config = config_loader::load(config_path)?;
    let deployer = Deployer::from_config(config);
    let status = deployer.status().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!(
            "{}",
            render::render_status(&status, &deployer.config().slots)
        );
    }
    Ok(())
}

fn check_config(config_path: &Path) -> color_eyre::Result<()> {
    let config = config_loader::load(config_path)?;
    println!("{}", render::render_config(&config));
    Ok(())
}
