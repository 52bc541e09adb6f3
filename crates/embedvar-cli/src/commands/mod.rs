//! CLI command handlers
//!
//! # Modules
//!
//! - `check`: write/read-back correctness check against a fresh variable
//! - `inspect`: fill a variable and report table occupancy

pub mod check;
pub mod inspect;

use embedvar_core::Key;

use crate::error::CliError;

/// Parse a comma-separated key list such as `0,1,1024`.
pub(crate) fn parse_keys(list: &str) -> Result<Vec<Key>, CliError> {
    list.split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|s| {
            s.trim()
                .parse::<Key>()
                .map_err(|e| CliError::InvalidArgument(format!("bad key '{}': {}", s.trim(), e)))
        })
        .collect()
}
