//! Write/read-back correctness check.
//!
//! Creates a handle, initializes a variable, assigns `arange(n * dim)` rows at
//! the given keys, reads them back and requires the mean squared error to be
//! below [`MSE_THRESHOLD`].
//!
//! # Usage
//!
//! ```bash
//! embedvar check
//! embedvar check --keys 0,1,1024 --dim 128 --var-type hybrid \
//!     --config '{"init_capacity":1048576,"max_capacity":1048576}'
//! ```

use clap::Args;
use tracing::{error, info};

use embedvar_core::{DType, Initializer, KeyType, ResourceManager, Rows, VarShape, VarType};

use super::parse_keys;
use crate::error::{exit_code_for_error, CliError, CliExitCode};

/// Readback must match written rows to within this mean squared error.
pub const MSE_THRESHOLD: f64 = 1e-8;

const OP_NAME: &str = "dummy_var_assign";

/// Arguments for the check command.
#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    /// Shared name of the variable
    #[arg(long, default_value = "Var_0")]
    pub name: String,

    /// Embedding width
    #[arg(long, default_value_t = 128)]
    pub dim: usize,

    /// Comma-separated keys to write and read back
    #[arg(long, default_value = "0,1,1024")]
    pub keys: String,

    /// Placement: hbm or hybrid
    #[arg(long, default_value = "hybrid")]
    pub var_type: String,

    /// Initializer: a constant, `dim` comma-separated values, or zeros/ones/random
    #[arg(long, default_value = "2.71828")]
    pub initializer: String,

    /// Table config JSON
    #[arg(long, default_value = r#"{"init_capacity":1048576,"max_capacity":1048576}"#)]
    pub config: String,
}

/// Outcome of a passing check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CheckReport {
    pub rows: usize,
    pub mse: f64,
}

/// Run the check against a fresh registry.
pub fn run_check(args: &CheckArgs) -> Result<CheckReport, CliError> {
    let keys = parse_keys(&args.keys)?;
    if keys.is_empty() {
        return Err(CliError::InvalidArgument("no keys given".to_string()));
    }
    let var_type: VarType = args.var_type.parse()?;

    let manager = ResourceManager::new();
    let handle = manager.create_handle(
        &args.name,
        VarShape::dynamic(args.dim),
        KeyType::Int64,
        DType::Float32,
    )?;
    manager.initialize(
        &handle,
        Initializer::parse(&args.initializer, args.dim)?,
        var_type,
        "",
        KeyType::Int64,
        DType::Float32,
        &args.config,
    )?;

    let values = Rows::arange(keys.len(), args.dim);
    manager.assign(&handle, &keys, &values)?;
    let embedding_vector = manager.sparse_read(&handle, &keys)?;

    let mse = embedding_vector.mean_squared_error(&values)?;
    info!(rows = keys.len(), mse, "Read back assigned rows");
    if mse < MSE_THRESHOLD {
        Ok(CheckReport {
            rows: keys.len(),
            mse,
        })
    } else {
        Err(CliError::CheckFailed {
            mse,
            threshold: MSE_THRESHOLD,
        })
    }
}

/// Execute the check command.
///
/// # Returns
///
/// Exit code:
/// - 0: readback matched
/// - 1: readback mismatch or runtime failure
/// - 2: invalid arguments or config
pub fn handle_check(args: CheckArgs) -> i32 {
    match run_check(&args) {
        Ok(report) => {
            info!(rows = report.rows, mse = report.mse, "Check passed");
            println!("Test of {} passed.", OP_NAME);
            CliExitCode::Success as i32
        }
        Err(e) => {
            error!("Test of {} failed: {}", OP_NAME, e);
            exit_code_for_error(&e) as i32
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_args() -> CheckArgs {
        CheckArgs {
            name: "Var_0".to_string(),
            dim: 128,
            keys: "0,1,1024".to_string(),
            var_type: "hybrid".to_string(),
            initializer: "2.71828".to_string(),
            config: r#"{"init_capacity":1048576,"max_capacity":1048576}"#.to_string(),
        }
    }

    #[test]
    fn test_check_passes_with_defaults() {
        let report = run_check(&default_args()).unwrap();
        assert_eq!(report.rows, 3);
        assert!(report.mse < MSE_THRESHOLD);
        assert_eq!(handle_check(default_args()), 0);
    }

    #[test]
    fn test_check_hbm() {
        let args = CheckArgs {
            var_type: "hbm".to_string(),
            ..default_args()
        };
        assert!(run_check(&args).is_ok());
    }

    #[test]
    fn test_check_fails_when_capacity_too_small() {
        // Two slots for three distinct keys: the first key is evicted and
        // re-initialized on read, so readback diverges.
        let args = CheckArgs {
            config: r#"{"init_capacity":2,"max_capacity":2}"#.to_string(),
            ..default_args()
        };
        let err = run_check(&args).unwrap_err();
        assert!(matches!(err, CliError::CheckFailed { .. }));
        assert_eq!(handle_check(args), 1);
    }

    #[test]
    fn test_check_invalid_config_exit_code() {
        let args = CheckArgs {
            config: "{broken".to_string(),
            ..default_args()
        };
        assert_eq!(handle_check(args), 2);
    }

    #[test]
    fn test_check_unknown_var_type() {
        let args = CheckArgs {
            var_type: "dram".to_string(),
            ..default_args()
        };
        assert_eq!(handle_check(args), 2);
    }
}
