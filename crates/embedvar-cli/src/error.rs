//! CLI error types and exit codes.
//!
//! | Code | Meaning |
//! |------|---------|
//! | 0 | Success |
//! | 1 | Check failed or runtime error |
//! | 2 | Invalid arguments or config |

use embedvar_core::VarError;
use thiserror::Error;

/// Process exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum CliExitCode {
    Success = 0,
    Failure = 1,
    InvalidInput = 2,
}

/// Errors surfaced by CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// Readback differed from the written rows.
    #[error("Check failed: mse {mse:e} is not below {threshold:e}")]
    CheckFailed { mse: f64, threshold: f64 },

    /// Malformed command-line value.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Variable operation failed.
    #[error(transparent)]
    Var(#[from] VarError),

    /// Output encoding failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Map an error to the process exit code.
pub fn exit_code_for_error(error: &CliError) -> CliExitCode {
    match error {
        CliError::InvalidArgument(_) => CliExitCode::InvalidInput,
        CliError::Var(e) if e.is_invalid_argument() => CliExitCode::InvalidInput,
        CliError::CheckFailed { .. } | CliError::Var(_) | CliError::Serialization(_) => {
            CliExitCode::Failure
        }
    }
}
