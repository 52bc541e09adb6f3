//! Error types for embedding variable operations.
//!
//! Every fallible operation in this crate returns [`VarResult`]. Errors carry
//! enough context (names, expected/actual sizes) to diagnose a bad call
//! without a debugger.

use thiserror::Error;

/// Result type for embedding variable operations.
pub type VarResult<T> = Result<T, VarError>;

/// Errors that can occur while creating, initializing or accessing a variable.
#[derive(Debug, Error)]
pub enum VarError {
    /// Variable shape is not `[None, dim]` with `dim > 0`.
    #[error("Invalid shape: {0}")]
    InvalidShape(String),

    /// Table configuration failed validation.
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Table configuration JSON could not be parsed.
    #[error("Failed to parse config JSON: {0}")]
    ConfigParse(#[from] serde_json::Error),

    /// Initializer values do not describe a usable row.
    #[error("Invalid initializer: {0}")]
    InvalidInitializer(String),

    /// Value dtype has no storage implementation.
    #[error("Unsupported dtype: {0}")]
    UnsupportedDType(String),

    /// `var_type` string is neither `hbm` nor `hybrid`.
    #[error("Unknown var_type '{0}' (expected 'hbm' or 'hybrid')")]
    UnknownVarType(String),

    /// `key_type` string is neither `int32` nor `int64`.
    #[error("Unknown key_type '{0}' (expected 'int32' or 'int64')")]
    UnknownKeyType(String),

    /// Key type or dtype given to initialize differs from the handle.
    #[error("Handle '{name}' mismatch on {field}: handle has {handle}, got {given}")]
    HandleMismatch {
        name: String,
        field: &'static str,
        handle: String,
        given: String,
    },

    /// A variable with this name was already initialized.
    #[error("Variable '{name}' is already initialized")]
    AlreadyInitialized { name: String },

    /// Handle does not resolve to an initialized variable.
    #[error("Variable '{name}' is not initialized")]
    NotInitialized { name: String },

    /// Row width does not match the variable dimension.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Number of keys does not match number of rows.
    #[error("Batch mismatch: {keys} keys but {rows} rows")]
    BatchMismatch { keys: usize, rows: usize },

    /// Key does not fit the variable's key type.
    #[error("Key {key} out of range for key type {key_type}")]
    KeyOutOfRange { key: i64, key_type: String },

    /// Checkpoint file IO failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Checkpoint encoding or decoding failed.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl VarError {
    /// Create an invalid config error.
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create a not initialized error.
    pub fn not_initialized(name: impl Into<String>) -> Self {
        Self::NotInitialized { name: name.into() }
    }

    /// Create a serialization error.
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    /// Check if this error was caused by bad caller input rather than runtime state.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(
            self,
            Self::InvalidShape(_)
                | Self::InvalidConfig(_)
                | Self::ConfigParse(_)
                | Self::InvalidInitializer(_)
                | Self::UnsupportedDType(_)
                | Self::UnknownVarType(_)
                | Self::UnknownKeyType(_)
                | Self::HandleMismatch { .. }
        )
    }
}

impl From<bincode::Error> for VarError {
    fn from(e: bincode::Error) -> Self {
        VarError::serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_dimension_mismatch() {
        let error = VarError::DimensionMismatch {
            expected: 128,
            actual: 64,
        };
        let msg = error.to_string();
        assert!(msg.contains("128"));
        assert!(msg.contains("64"));
    }

    #[test]
    fn test_error_handle_mismatch() {
        let error = VarError::HandleMismatch {
            name: "Var_0".to_string(),
            field: "key_type",
            handle: "int64".to_string(),
            given: "int32".to_string(),
        };
        let msg = error.to_string();
        assert!(msg.contains("Var_0"));
        assert!(msg.contains("key_type"));
        assert!(msg.contains("int32"));
    }

    #[test]
    fn test_error_not_initialized() {
        let error = VarError::not_initialized("Var_7");
        assert!(error.to_string().contains("Var_7"));
        assert!(!error.is_invalid_argument());
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let error: VarError = json_err.into();
        assert!(matches!(error, VarError::ConfigParse(_)));
        assert!(error.is_invalid_argument());
    }

    #[test]
    fn test_from_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.ckpt");
        let error: VarError = io.into();
        assert!(error.to_string().contains("missing.ckpt"));
    }

    #[test]
    fn test_from_bincode_error() {
        let truncated = [1u8, 2];
        let bincode_err = bincode::deserialize::<u64>(&truncated).unwrap_err();
        let error: VarError = bincode_err.into();
        assert!(matches!(error, VarError::Serialization(_)));
        assert!(!error.is_invalid_argument());
    }
}
