//! Hash-table-backed embedding variables.
//!
//! This crate provides sparse embedding storage keyed by integer ids:
//! - A two-tier hash table (device tier + host overflow tier) with LRU/LFU
//!   demotion and eviction
//! - Variables with assign / sparse-read / scatter-add / export / checkpoint
//! - A handle registry mirroring the create-handle → initialize → use flow
//!
//! # Example
//!
//! ```
//! use embedvar_core::{DType, Initializer, KeyType, ResourceManager, Rows, VarShape, VarType};
//!
//! let manager = ResourceManager::new();
//! let handle = manager
//!     .create_handle("Var_0", VarShape::dynamic(128), KeyType::Int64, DType::Float32)
//!     .unwrap();
//! manager
//!     .initialize(
//!         &handle,
//!         Initializer::from_values(&[2.71828], 128).unwrap(),
//!         VarType::Hybrid,
//!         "",
//!         KeyType::Int64,
//!         DType::Float32,
//!         r#"{"init_capacity":1048576,"max_capacity":1048576}"#,
//!     )
//!     .unwrap();
//!
//! let keys = [0, 1, 1024];
//! let values = Rows::arange(3, 128);
//! manager.assign(&handle, &keys, &values).unwrap();
//! let read = manager.sparse_read(&handle, &keys).unwrap();
//! assert!(read.mean_squared_error(&values).unwrap() < 1e-8);
//! ```
//!
//! # Module Structure
//!
//! - [`error`]: error taxonomy
//! - [`types`]: key, dtype, placement and shape types
//! - [`config`]: JSON table configuration
//! - [`initializer`]: rows for keys read before written
//! - [`rows`]: dense row batches
//! - [`table`]: the two-tier hash table
//! - [`variable`]: a single variable and its checkpoints
//! - [`manager`]: handles and the variable registry

pub mod config;
pub mod error;
pub mod initializer;
pub mod manager;
pub mod rows;
pub mod table;
pub mod types;
pub mod variable;

pub use config::{EvictStrategy, TableConfig};
pub use error::{VarError, VarResult};
pub use initializer::Initializer;
pub use manager::{ResourceManager, VarHandle};
pub use rows::Rows;
pub use table::{HybridTable, TableStats, Tier};
pub use types::{DType, Key, KeyType, VarShape, VarType};
pub use variable::{DummyVar, VarCheckpoint, VarSpec};
