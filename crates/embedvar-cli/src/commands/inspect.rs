//! Fill a variable with sequential keys and report table occupancy.
//!
//! Useful for sizing `max_hbm_for_vectors` and `max_capacity`: the printed
//! stats show how many rows stayed on the device tier and how much demotion
//! and eviction the access pattern caused.

use std::path::PathBuf;

use clap::Args;
use tracing::{error, info};

use embedvar_core::{
    DType, Initializer, Key, KeyType, ResourceManager, TableStats, VarShape, VarType,
};

use crate::error::{exit_code_for_error, CliError, CliExitCode};

/// Keys per sparse-read batch while filling.
const FILL_BATCH: usize = 4096;

/// Arguments for the inspect command.
#[derive(Args, Debug, Clone)]
pub struct InspectArgs {
    /// Number of sequential keys to read into the table
    #[arg(long, default_value_t = 10_000)]
    pub rows: usize,

    /// Embedding width
    #[arg(long, default_value_t = 128)]
    pub dim: usize,

    /// Placement: hbm or hybrid
    #[arg(long, default_value = "hybrid")]
    pub var_type: String,

    /// Initializer: a constant, `dim` comma-separated values, or zeros/ones/random
    #[arg(long, default_value = "random")]
    pub initializer: String,

    /// Table config JSON
    #[arg(long, default_value = "")]
    pub config: String,

    /// Write a checkpoint of the filled variable to this path
    #[arg(long)]
    pub checkpoint: Option<PathBuf>,
}

/// Fill a fresh variable and return its stats.
pub fn run_inspect(args: &InspectArgs) -> Result<TableStats, CliError> {
    let count = Key::try_from(args.rows).map_err(|_| {
        CliError::InvalidArgument(format!("rows {} exceeds the key range", args.rows))
    })?;
    let var_type: VarType = args.var_type.parse()?;
    let manager = ResourceManager::new();
    let handle = manager.create_handle(
        "inspect",
        VarShape::dynamic(args.dim),
        KeyType::Int64,
        DType::Float32,
    )?;
    let var = manager.initialize(
        &handle,
        Initializer::parse(&args.initializer, args.dim)?,
        var_type,
        "",
        KeyType::Int64,
        DType::Float32,
        &args.config,
    )?;

    let keys: Vec<Key> = (0..count).collect();
    for batch in keys.chunks(FILL_BATCH) {
        var.sparse_read(batch)?;
    }

    if let Some(path) = &args.checkpoint {
        let written = var.save(path)?;
        info!(rows = written, path = %path.display(), "Wrote checkpoint");
    }
    Ok(var.stats())
}

/// Execute the inspect command, printing stats as JSON on stdout.
pub fn handle_inspect(args: InspectArgs) -> i32 {
    let result = run_inspect(&args).and_then(|stats| {
        let json = serde_json::to_string_pretty(&stats)?;
        Ok(json)
    });
    match result {
        Ok(json) => {
            println!("{}", json);
            CliExitCode::Success as i32
        }
        Err(e) => {
            error!("Inspect failed: {}", e);
            exit_code_for_error(&e) as i32
        }
    }
}
