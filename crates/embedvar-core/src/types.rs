//! Core value types shared by handles, variables and tables.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{VarError, VarResult};

/// Storage key for a row. Int32 variables restrict the accepted range.
pub type Key = i64;

/// Integer type of variable keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyType {
    Int32,
    #[default]
    Int64,
}

impl KeyType {
    /// Check that `key` is representable in this key type.
    pub fn check(self, key: Key) -> VarResult<()> {
        match self {
            KeyType::Int64 => Ok(()),
            KeyType::Int32 if i32::try_from(key).is_ok() => Ok(()),
            KeyType::Int32 => Err(VarError::KeyOutOfRange {
                key,
                key_type: self.to_string(),
            }),
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyType::Int32 => write!(f, "int32"),
            KeyType::Int64 => write!(f, "int64"),
        }
    }
}

impl FromStr for KeyType {
    type Err = VarError;

    fn from_str(s: &str) -> VarResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "int32" | "i32" => Ok(KeyType::Int32),
            "int64" | "i64" => Ok(KeyType::Int64),
            _ => Err(VarError::UnknownKeyType(s.to_string())),
        }
    }
}

/// Element type of stored rows.
///
/// Only `Float32` has a storage implementation. The other names parse so that
/// a handle can be created for them, but initialization rejects them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    Float16,
    #[default]
    Float32,
    Float64,
}

impl DType {
    /// Size of one element in bytes.
    pub fn size_of(self) -> usize {
        match self {
            DType::Float16 => 2,
            DType::Float32 => 4,
            DType::Float64 => 8,
        }
    }

    /// Fail unless rows of this dtype can be stored.
    pub fn ensure_supported(self) -> VarResult<()> {
        match self {
            DType::Float32 => Ok(()),
            other => Err(VarError::UnsupportedDType(other.to_string())),
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DType::Float16 => write!(f, "float16"),
            DType::Float32 => write!(f, "float32"),
            DType::Float64 => write!(f, "float64"),
        }
    }
}

impl FromStr for DType {
    type Err = VarError;

    fn from_str(s: &str) -> VarResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "float16" | "f16" | "half" => Ok(DType::Float16),
            "float32" | "f32" | "float" => Ok(DType::Float32),
            "float64" | "f64" | "double" => Ok(DType::Float64),
            _ => Err(VarError::UnsupportedDType(s.to_string())),
        }
    }
}

/// Placement policy of a variable's rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VarType {
    /// All rows in the device tier.
    Hbm,
    /// Device tier backed by a host tier for rows that do not fit.
    #[default]
    Hybrid,
}

impl fmt::Display for VarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VarType::Hbm => write!(f, "hbm"),
            VarType::Hybrid => write!(f, "hybrid"),
        }
    }
}

impl FromStr for VarType {
    type Err = VarError;

    fn from_str(s: &str) -> VarResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "hbm" => Ok(VarType::Hbm),
            "hybrid" => Ok(VarType::Hybrid),
            _ => Err(VarError::UnknownVarType(s.to_string())),
        }
    }
}

/// Variable shape `[rows, dim]`.
///
/// Hash-backed variables grow on demand, so `rows` must be `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VarShape {
    pub rows: Option<usize>,
    pub dim: usize,
}

impl VarShape {
    /// Dynamic-row shape with a fixed embedding width.
    pub fn dynamic(dim: usize) -> Self {
        Self { rows: None, dim }
    }

    /// Validate the shape for a hash-backed variable.
    ///
    /// # Errors
    ///
    /// Returns `InvalidShape` if `dim == 0` or `rows` is fixed.
    pub fn validate(&self) -> VarResult<()> {
        if self.dim == 0 {
            return Err(VarError::InvalidShape(
                "embedding dimension must be greater than 0".to_string(),
            ));
        }
        if let Some(rows) = self.rows {
            return Err(VarError::InvalidShape(format!(
                "hash variables have a dynamic first dimension, got fixed rows = {}",
                rows
            )));
        }
        Ok(())
    }
}

impl fmt::Display for VarShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.rows {
            Some(rows) => write!(f, "[{}, {}]", rows, self.dim),
            None => write!(f, "[None, {}]", self.dim),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_type_parse() {
        assert_eq!("int64".parse::<KeyType>().unwrap(), KeyType::Int64);
        assert_eq!("INT32".parse::<KeyType>().unwrap(), KeyType::Int32);
        assert!(matches!(
            "uint8".parse::<KeyType>(),
            Err(VarError::UnknownKeyType(_))
        ));
    }

    #[test]
    fn test_key_type_range_check() {
        assert!(KeyType::Int64.check(i64::MAX).is_ok());
        assert!(KeyType::Int32.check(i32::MAX as i64).is_ok());
        assert!(KeyType::Int32.check(i32::MIN as i64).is_ok());
        let err = KeyType::Int32.check(i32::MAX as i64 + 1).unwrap_err();
        assert!(matches!(err, VarError::KeyOutOfRange { .. }));
    }

    #[test]
    fn test_dtype_support() {
        assert!(DType::Float32.ensure_supported().is_ok());
        assert!(DType::Float16.ensure_supported().is_err());
        assert_eq!(DType::Float32.size_of(), 4);
    }

    #[test]
    fn test_var_type_parse() {
        assert_eq!("hybrid".parse::<VarType>().unwrap(), VarType::Hybrid);
        assert_eq!("HBM".parse::<VarType>().unwrap(), VarType::Hbm);
        assert!("dram".parse::<VarType>().is_err());
    }

    #[test]
    fn test_shape_validation() {
        assert!(VarShape::dynamic(128).validate().is_ok());
        assert!(VarShape::dynamic(0).validate().is_err());
        let fixed = VarShape {
            rows: Some(10),
            dim: 4,
        };
        assert!(fixed.validate().is_err());
        assert_eq!(VarShape::dynamic(128).to_string(), "[None, 128]");
    }

    #[test]
    fn test_shape_usable_as_map_key() {
        use std::collections::HashSet;
        let mut shapes = HashSet::new();
        shapes.insert(VarShape::dynamic(128));
        shapes.insert(VarShape::dynamic(128));
        shapes.insert(VarShape::dynamic(64));
        assert_eq!(shapes.len(), 2);
    }
}
