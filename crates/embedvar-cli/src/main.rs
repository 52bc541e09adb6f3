//! embedvar CLI
//!
//! Command-line tools for hash-table-backed embedding variables.
//!
//! # Commands
//!
//! - `check`: assign rows, read them back, require a near-zero error
//! - `inspect`: fill a variable and print table occupancy as JSON
//!
//! # Exit Codes
//!
//! 0 on success, 1 on check failure or runtime error, 2 on invalid input.

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod error;

pub use error::{exit_code_for_error, CliError, CliExitCode};

/// embedvar - embedding variable checks and inspection
#[derive(Parser)]
#[command(name = "embedvar")]
#[command(version)]
#[command(about = "Checks and inspection for hash-table-backed embedding variables")]
#[command(propagate_version = true)]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Assign rows at a few keys and verify they read back unchanged
    Check(commands::check::CheckArgs),
    /// Fill a variable with sequential keys and report tier occupancy
    ///
    /// Prints table stats as JSON on stdout.
    Inspect(commands::inspect::InspectArgs),
}

fn main() {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();

    let exit_code = match cli.command {
        Commands::Check(args) => commands::check::handle_check(args),
        Commands::Inspect(args) => commands::inspect::handle_inspect(args),
    };

    std::process::exit(exit_code);
}
