//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "sc-cover", version, about = "Single-control cover (garage door) controller")]
pub struct Cli {
    /// Path to config file (.toml, or .yaml/.yml)
    #[arg(long, value_name = "FILE", default_value = "etc/sc_cover.toml")]
    pub config: PathBuf,

    /// Print snapshots and errors as JSON lines, and log as JSON
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate the configuration and print what it resolves to
    Check,
    /// Run the controller; commands (open, close, stop, toggle, position <0..1>) are read from stdin
    Run {
        /// Exit after this many milliseconds (default: until Ctrl-C)
        #[arg(long, value_name = "MS")]
        run_for_ms: Option<u64>,
    },
    /// Drive a simulated door from a timed script, faster than real time
    Simulate {
        /// Comma-separated `<time>:<command>` entries, e.g. "0:open,6s:stop,8s:close"
        #[arg(long, default_value = "0:open")]
        script: String,
        /// Simulated time limit in ms (default: last entry plus two full travels)
        #[arg(long, value_name = "MS")]
        duration_ms: Option<u64>,
        /// Physical open travel of the simulated door (default: 95% of open_duration)
        #[arg(long, value_name = "MS")]
        door_open_ms: Option<u64>,
        /// Physical close travel of the simulated door (default: 95% of close_duration)
        #[arg(long, value_name = "MS")]
        door_close_ms: Option<u64>,
        /// Initial door position, 0.0 closed .. 1.0 open
        #[arg(long, value_name = "POS", default_value_t = 0.0)]
        start_position: f32,
        /// Simulate an open endstop that never reports
        #[arg(long, action = ArgAction::SetTrue)]
        broken_open_endstop: bool,
        /// Simulate a close endstop that never reports
        #[arg(long, action = ArgAction::SetTrue)]
        broken_close_endstop: bool,
        /// Simulate an activation output that fails on use
        #[arg(long, action = ArgAction::SetTrue)]
        input_fault: bool,
    },
}
