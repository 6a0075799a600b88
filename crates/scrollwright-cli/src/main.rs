use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use scrollwright_core::AppConfig;

mod commands;
mod script;

#[derive(Parser)]
#[command(name = "scrollwright")]
#[command(author, version, about = "Drive scroll-animated pages without a browser")]
struct Cli {
    /// Config file (defaults to ~/.config/scrollwright/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a scripted session against a page and print engine events
    Simulate {
        /// Page manifest (TOML)
        manifest: PathBuf,
        /// Session script; a default walk through the page is used when omitted
        #[arg(short, long)]
        script: Option<PathBuf>,
        /// Delay before the scene finishes loading
        #[arg(long, default_value_t = 500)]
        scene_delay_ms: u64,
        /// Make the scene load fail
        #[arg(long)]
        scene_fail: bool,
        /// Directory fragments are read from (defaults to the manifest's directory)
        #[arg(long)]
        fragments: Option<PathBuf>,
        /// Print events as JSON lines
        #[arg(long)]
        json: bool,
    },
    /// Show the steady-state trigger plan for a viewport
    Plan {
        /// Page manifest (TOML)
        manifest: PathBuf,
        #[arg(long)]
        width: Option<f64>,
        #[arg(long)]
        height: Option<f64>,
        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the effective configuration
    Config {
        /// Write the defaults to the config path if no file exists
        #[arg(long)]
        init: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config_path = cli.config.clone().unwrap_or_else(AppConfig::config_path);
    let config = Arc::new(AppConfig::load_from(&config_path)?);

    // Initialize logging; stdout is reserved for command output
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| config.general.log_level.clone()),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    match cli.command {
        Commands::Simulate {
            manifest,
            script,
            scene_delay_ms,
            scene_fail,
            fragments,
            json,
        } => {
            let options = commands::simulate::SimulateOptions {
                script,
                scene_delay_ms,
                scene_fail,
                fragments,
                json,
            };
            commands::simulate::run(config, &manifest, options).await
        }
        Commands::Plan {
            manifest,
            width,
            height,
            json,
        } => commands::plan::run(config, &manifest, width, height, json),
        Commands::Config { init } => commands::config::run(&config, &config_path, init),
    }
}
