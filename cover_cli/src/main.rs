#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! `sc-cover`: check a configuration, run the controller, or simulate a door.

mod cli;
mod error_fmt;
mod run;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use cover_core::error::CoverError;
use eyre::WrapErr;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use crate::cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};
use crate::run::SimOptions;

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    if let Err(e) = real_main(cli) {
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", format_error_json(&e));
        } else {
            eprintln!("{}", humanize(&e));
            tracing::debug!(error = ?e, "command failed");
        }
        std::process::exit(exit_code_for_error(&e));
    }
}

fn config_error(e: eyre::Report) -> eyre::Report {
    eyre::Report::new(CoverError::Config(format!("{e:#}")))
}

fn load_config(path: &Path) -> eyre::Result<cover_config::Config> {
    let cfg = cover_config::load_path(path).map_err(config_error)?;
    cfg.validate()
        .map_err(config_error)
        .wrap_err_with(|| format!("validate {}", path.display()))?;
    Ok(cfg)
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

fn filter_for(level: &str) -> EnvFilter {
    EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Console logs go to stderr (stdout carries snapshots). RUST_LOG overrides
/// `--log-level`. An optional JSON-lines file log follows `[logging]`.
fn init_tracing(cli: &Cli, logging: &cover_config::Logging) -> eyre::Result<()> {
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| filter_for(&cli.log_level));
    let console: BoxedLayer = if cli.json {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_filter(console_filter)
            .boxed()
    } else {
        fmt::layer()
            .compact()
            .with_target(false)
            .with_writer(std::io::stderr)
            .with_filter(console_filter)
            .boxed()
    };
    let mut layers = vec![console];

    if let Some(file) = logging.file.as_deref() {
        let path = Path::new(file);
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let name = path
            .file_name()
            .ok_or_else(|| eyre::eyre!("logging.file {file:?} has no file name"))?;
        let appender = match logging.rotation.as_deref() {
            Some("daily") => tracing_appender::rolling::daily(dir, name),
            Some("hourly") => tracing_appender::rolling::hourly(dir, name),
            _ => tracing_appender::rolling::never(dir, name),
        };
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = FILE_GUARD.set(guard);
        let level = logging.level.as_deref().unwrap_or("info");
        layers.push(
            fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(filter_for(level))
                .boxed(),
        );
    }

    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .map_err(|e| eyre::eyre!("init logging: {e}"))
}

fn real_main(cli: Cli) -> eyre::Result<()> {
    let _ = color_eyre::install();

    let cfg = load_config(&cli.config)?;
    init_tracing(&cli, &cfg.logging)?;
    tracing::info!(config = %cli.config.display(), "configuration loaded");

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let flag = shutdown.clone();
        if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed)) {
            tracing::warn!(error = %e, "failed to install Ctrl-C handler");
        }
    }

    match &cli.cmd {
        Commands::Check => run::run_check(&cfg, cli.json),
        Commands::Run { run_for_ms } => {
            run::run_live(&cfg, *run_for_ms, &shutdown, cli.json).map(|_| ())
        }
        Commands::Simulate {
            script,
            duration_ms,
            door_open_ms,
            door_close_ms,
            start_position,
            broken_open_endstop,
            broken_close_endstop,
            input_fault,
        } => {
            let opts = SimOptions {
                script: script.clone(),
                duration_ms: *duration_ms,
                door_open_ms: *door_open_ms,
                door_close_ms: *door_close_ms,
                start_position: *start_position,
                broken_open_endstop: *broken_open_endstop,
                broken_close_endstop: *broken_close_endstop,
                input_fault: *input_fault,
            };
            run::run_simulation(&cfg, &opts, &shutdown, cli.json).map(|_| ())
        }
    }
}
