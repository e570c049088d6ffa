use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use m8c_headless::app::App;
use m8c_headless::config::Config;

/// Headless display client for the M8 tracker hardware.
#[derive(Debug, Parser)]
#[command(name = "m8c-headless", version, about)]
struct Cli {
    /// Path to the configuration file.
    #[arg(long, default_value = "config.ini")]
    config: PathBuf,

    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Force a specific serial device path instead of discovering by VID/PID.
    #[arg(long)]
    device: Option<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    let config = match Config::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            log::error!("failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    match App::initialize(&config, cli.device, cli.verbose) {
        Ok(app) => ExitCode::from(app.run() as u8),
        Err(e) => {
            log::error!("fatal initialization failure: {e:#}");
            ExitCode::FAILURE
        }
    }
}
