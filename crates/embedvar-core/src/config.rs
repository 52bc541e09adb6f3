//! Hash table configuration.
//!
//! Parsed from the JSON `config` string passed to variable initialization,
//! e.g. `{"init_capacity":1048576,"max_capacity":1048576}`.

use serde::{Deserialize, Serialize};

use crate::error::{VarError, VarResult};
use crate::types::{DType, VarType};

/// Default initial reserved slot count.
pub const DEFAULT_INIT_CAPACITY: usize = 64 * 1024;

/// Default load factor above which reserved capacity doubles.
pub const DEFAULT_MAX_LOAD_FACTOR: f32 = 0.5;

/// Victim selection policy for demotion and eviction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvictStrategy {
    /// Least recently used.
    #[default]
    Lru,
    /// Least frequently used.
    Lfu,
}

/// JSON shape of the config string. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawTableConfig {
    init_capacity: Option<usize>,
    max_capacity: Option<usize>,
    max_hbm_for_vectors: Option<usize>,
    max_load_factor: Option<f32>,
    evict_strategy: Option<EvictStrategy>,
}

/// Validated table configuration.
///
/// # Example
///
/// ```
/// use embedvar_core::config::TableConfig;
///
/// let config = TableConfig::from_json(r#"{"init_capacity":1024,"max_capacity":4096}"#).unwrap();
/// assert_eq!(config.init_capacity, 1024);
/// assert_eq!(config.max_capacity, 4096);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableConfig {
    /// Slots reserved up front.
    pub init_capacity: usize,
    /// Hard bound on distinct keys.
    pub max_capacity: usize,
    /// Device-tier byte budget for row data. `None` means unbounded.
    pub max_hbm_for_vectors: Option<usize>,
    /// Reserved capacity doubles once `len / reserved` exceeds this.
    pub max_load_factor: f32,
    /// Victim selection policy.
    pub evict_strategy: EvictStrategy,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            init_capacity: DEFAULT_INIT_CAPACITY,
            max_capacity: DEFAULT_INIT_CAPACITY,
            max_hbm_for_vectors: None,
            max_load_factor: DEFAULT_MAX_LOAD_FACTOR,
            evict_strategy: EvictStrategy::default(),
        }
    }
}

impl TableConfig {
    /// Parse and validate a JSON config string. Blank input yields defaults.
    ///
    /// # Errors
    ///
    /// - `ConfigParse` for malformed JSON or unknown fields
    /// - `InvalidConfig` if the values fail [`TableConfig::validate`]
    pub fn from_json(json: &str) -> VarResult<Self> {
        let raw: RawTableConfig = if json.trim().is_empty() {
            RawTableConfig::default()
        } else {
            serde_json::from_str(json)?
        };

        let init_capacity = raw.init_capacity.unwrap_or(DEFAULT_INIT_CAPACITY);
        let config = Self {
            init_capacity,
            max_capacity: raw.max_capacity.unwrap_or(init_capacity),
            max_hbm_for_vectors: raw.max_hbm_for_vectors,
            max_load_factor: raw.max_load_factor.unwrap_or(DEFAULT_MAX_LOAD_FACTOR),
            evict_strategy: raw.evict_strategy.unwrap_or_default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if:
    /// - `init_capacity` is 0
    /// - `max_capacity < init_capacity`
    /// - `max_load_factor` is outside `(0, 1]` or NaN
    pub fn validate(&self) -> VarResult<()> {
        if self.init_capacity == 0 {
            return Err(VarError::invalid_config(
                "init_capacity must be greater than 0",
            ));
        }
        if self.max_capacity < self.init_capacity {
            return Err(VarError::invalid_config(format!(
                "max_capacity ({}) must be >= init_capacity ({})",
                self.max_capacity, self.init_capacity
            )));
        }
        if self.max_load_factor.is_nan()
            || self.max_load_factor <= 0.0
            || self.max_load_factor > 1.0
        {
            return Err(VarError::invalid_config(format!(
                "max_load_factor must be in (0, 1], got {}",
                self.max_load_factor
            )));
        }
        Ok(())
    }

    /// Number of rows the device tier may hold for rows of `dim` f32 elements.
    ///
    /// `Hbm` variables keep every row on device, so the byte budget does not apply.
    pub fn device_capacity(&self, dim: usize, var_type: VarType) -> usize {
        match (var_type, self.max_hbm_for_vectors) {
            (VarType::Hbm, _) | (VarType::Hybrid, None) => self.max_capacity,
            (VarType::Hybrid, Some(bytes)) => {
                let row_bytes = dim.max(1) * DType::Float32.size_of();
                (bytes / row_bytes).min(self.max_capacity)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_original_json() {
        let config =
            TableConfig::from_json(r#"{"init_capacity":1048576,"max_capacity":1048576}"#).unwrap();
        assert_eq!(config.init_capacity, 1_048_576);
        assert_eq!(config.max_capacity, 1_048_576);
        assert_eq!(config.evict_strategy, EvictStrategy::Lru);
        assert!(config.max_hbm_for_vectors.is_none());
    }

    #[test]
    fn test_config_blank_is_default() {
        let config = TableConfig::from_json("  ").unwrap();
        assert_eq!(config, TableConfig::default());
    }

    #[test]
    fn test_config_max_defaults_to_init() {
        let config = TableConfig::from_json(r#"{"init_capacity":32}"#).unwrap();
        assert_eq!(config.max_capacity, 32);
    }

    #[test]
    fn test_config_rejects_max_below_init() {
        let err = TableConfig::from_json(r#"{"init_capacity":64,"max_capacity":8}"#).unwrap_err();
        assert!(matches!(err, VarError::InvalidConfig(_)));
    }

    #[test]
    fn test_config_rejects_zero_init() {
        assert!(TableConfig::from_json(r#"{"init_capacity":0}"#).is_err());
    }

    #[test]
    fn test_config_rejects_bad_load_factor() {
        assert!(TableConfig::from_json(r#"{"max_load_factor":0.0}"#).is_err());
        assert!(TableConfig::from_json(r#"{"max_load_factor":1.5}"#).is_err());
        assert!(TableConfig::from_json(r#"{"max_load_factor":1.0}"#).is_ok());
    }

    #[test]
    fn test_config_rejects_unknown_field() {
        let err = TableConfig::from_json(r#"{"init_capacty":64}"#).unwrap_err();
        assert!(matches!(err, VarError::ConfigParse(_)));
    }

    #[test]
    fn test_config_evict_strategy() {
        let config = TableConfig::from_json(r#"{"evict_strategy":"lfu"}"#).unwrap();
        assert_eq!(config.evict_strategy, EvictStrategy::Lfu);
        assert!(TableConfig::from_json(r#"{"evict_strategy":"fifo"}"#).is_err());
    }

    #[test]
    fn test_device_capacity() {
        let config = TableConfig::from_json(
            r#"{"init_capacity":16,"max_capacity":1024,"max_hbm_for_vectors":4096}"#,
        )
        .unwrap();
        // 4096 bytes / (8 * 4 bytes) = 128 rows
        assert_eq!(config.device_capacity(8, VarType::Hybrid), 128);
        assert_eq!(config.device_capacity(8, VarType::Hbm), 1024);
        // budget larger than max_capacity is capped
        assert_eq!(config.device_capacity(1, VarType::Hybrid), 1024);
    }
}
