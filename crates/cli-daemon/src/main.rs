//! CLI entry point for the BililiveRecorder webhook daemon
//!
//! Parses command line arguments and starts the daemon.

use biliverec_hooks::{Config, Daemon};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};

/// Config file read when `--config` is not given, if present
const DEFAULT_CONFIG_PATH: &str = "biliverec-hooks.toml";

/// BililiveRecorder webhook receiver with HEVC transcoding
#[derive(Parser, Debug)]
#[command(name = "biliverec-hooks")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Host to listen on
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Recorder work directory
    #[arg(short = 'd', long)]
    base_dir: Option<PathBuf>,

    /// Bot API URL receiving room notifications
    #[arg(short, long)]
    bot_api: Option<String>,

    /// Directory holding the recorder's own logs
    #[arg(short, long)]
    log_dir: Option<PathBuf>,

    /// Skip startup checks (ffmpeg, directories)
    #[arg(long, default_value = "false")]
    skip_checks: bool,
}

impl Args {
    /// Command line values win over file and environment
    fn apply_overrides(self, config: &mut Config) {
        if let Some(host) = self.host {
            config.server.host = host;
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(base_dir) = self.base_dir {
            config.paths.base_dir = base_dir;
        }
        if let Some(bot_api) = self.bot_api {
            config.notify.bot_api = bot_api;
        }
        if let Some(log_dir) = self.log_dir {
            config.paths.log_dir = log_dir;
        }
    }
}

fn load_config(explicit: Option<&PathBuf>) -> Result<Config, biliverec_hooks::config::ConfigError> {
    match explicit {
        Some(path) => {
            info!("Config file: {}", path.display());
            Config::load(path)
        }
        None if std::path::Path::new(DEFAULT_CONFIG_PATH).exists() => {
            info!("Config file: {}", DEFAULT_CONFIG_PATH);
            Config::load(DEFAULT_CONFIG_PATH)
        }
        None => Ok(Config::from_env()),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();

    let mut config = match load_config(args.config.as_ref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let skip_checks = args.skip_checks;
    args.apply_overrides(&mut config);

    if skip_checks {
        warn!("Skipping startup checks (--skip-checks enabled)");
    }

    if let Err(e) = Daemon::new(config).run(!skip_checks).await {
        error!("Daemon error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
