#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs the Sokobots engine over a socket or a pipe.

mod config;
mod server;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sokobots_protocol::{Dispatcher, SharedDispatcher};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::EngineConfig;

#[derive(Debug, Parser)]
#[command(name = "sokobots", version, about = "Deterministic robot puzzle engine")]
struct CliArgs {
    /// TOML configuration file.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Tracing filter used when `RUST_LOG` is unset.
    #[arg(long, value_name = "FILTER")]
    log_filter: Option<String>,

    /// Directory relative level paths are resolved against.
    #[arg(long, value_name = "DIR")]
    levels: Option<PathBuf>,

    /// Step budget for levels without `max_steps` (0 disables it).
    #[arg(long, value_name = "STEPS")]
    step_budget: Option<u64>,

    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Subcommand)]
enum Mode {
    /// Serve length-prefixed JSON frames over TCP.
    Serve {
        /// Socket address to listen on.
        #[arg(long, value_name = "ADDR")]
        listen: Option<String>,

        /// Level file loaded before the first connection.
        #[arg(long, value_name = "FILE")]
        level: Option<PathBuf>,
    },
    /// Serve newline-delimited JSON on stdin/stdout.
    Pipe {
        /// Level file loaded before the first request.
        #[arg(long, value_name = "FILE")]
        level: Option<PathBuf>,
    },
}

impl Mode {
    fn level(&self) -> Option<&PathBuf> {
        match self {
            Self::Serve { level, .. } | Self::Pipe { level } => level.as_ref(),
        }
    }
}

/// Entry point for the Sokobots command-line interface.
fn main() -> Result<()> {
    let args = CliArgs::parse();
    let config = resolve_config(&args)?;
    init_logging(&config.log_filter);

    let mut dispatcher = Dispatcher::new(config.dispatcher_settings());
    if let Some(level) = args.mode.level() {
        let _ = dispatcher
            .load_level_file(level)
            .with_context(|| format!("failed to preload level {}", level.display()))?;
    }

    match args.mode {
        Mode::Serve { listen, .. } => {
            let listen = listen.unwrap_or(config.listen);
            server::serve(
                &listen,
                SharedDispatcher::new(dispatcher),
                config.max_frame_len,
            )
        }
        Mode::Pipe { .. } => {
            server::run_pipe(dispatcher, config.max_frame_len);
            Ok(())
        }
    }
}

fn resolve_config(args: &CliArgs) -> Result<EngineConfig> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => EngineConfig::default(),
    };

    if let Some(filter) = &args.log_filter {
        config.log_filter = filter.clone();
    }
    if let Some(levels) = &args.levels {
        config.levels_dir = Some(levels.clone());
    }
    if let Some(budget) = args.step_budget {
        config.default_step_budget = budget;
    }
    Ok(config)
}

fn init_logging(default_filter: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
    info!(version = env!("CARGO_PKG_VERSION"), "sokobots starting");
}
