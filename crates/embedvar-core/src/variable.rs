//! Hash-table-backed embedding variable.
//!
//! A [`DummyVar`] pairs immutable metadata (name, width, key type, placement,
//! table config, initializer) with a [`HybridTable`] behind a
//! `parking_lot::RwLock`. Every operation validates its batch before the
//! lock is taken, so a rejected call leaves the table untouched.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::config::TableConfig;
use crate::error::{VarError, VarResult};
use crate::initializer::Initializer;
use crate::rows::Rows;
use crate::table::{HybridTable, TableStats};
use crate::types::{DType, Key, KeyType, VarType};

/// Static description of a variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarSpec {
    pub unique_name: String,
    pub dim: usize,
    pub key_type: KeyType,
    pub dtype: DType,
    pub var_type: VarType,
}

/// On-disk checkpoint of a variable's contents (bincode).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarCheckpoint {
    pub unique_name: String,
    pub dim: usize,
    pub key_type: KeyType,
    pub keys: Vec<Key>,
    /// Row-major, `keys.len() * dim` values.
    pub values: Vec<f32>,
}

/// Mutable key → row mapping with device/host tiering.
///
/// # Thread Safety
///
/// `Send + Sync`. Reads that may insert (`sparse_read`) take the write lock;
/// `find`, `export`, `shape` and `stats` take the read lock.
#[derive(Debug)]
pub struct DummyVar {
    spec: VarSpec,
    config: TableConfig,
    initializer: Initializer,
    table: RwLock<HybridTable>,
}

impl DummyVar {
    /// Create an empty variable.
    ///
    /// # Errors
    ///
    /// - `InvalidShape` if `spec.dim == 0`
    /// - `UnsupportedDType` for anything but float32
    /// - `InvalidConfig` / `InvalidInitializer` if those fail validation
    pub fn new(spec: VarSpec, config: TableConfig, initializer: Initializer) -> VarResult<Self> {
        if spec.dim == 0 {
            return Err(VarError::InvalidShape(
                "embedding dimension must be greater than 0".to_string(),
            ));
        }
        spec.dtype.ensure_supported()?;
        config.validate()?;
        initializer.validate(spec.dim)?;

        let table = HybridTable::new(spec.dim, spec.var_type, &config);
        info!(
            name = %spec.unique_name,
            dim = spec.dim,
            var_type = %spec.var_type,
            key_type = %spec.key_type,
            init_capacity = config.init_capacity,
            max_capacity = config.max_capacity,
            "Initialized embedding variable"
        );

        Ok(Self {
            spec,
            config,
            initializer,
            table: RwLock::new(table),
        })
    }

    pub fn spec(&self) -> &VarSpec {
        &self.spec
    }

    pub fn name(&self) -> &str {
        &self.spec.unique_name
    }

    pub fn dim(&self) -> usize {
        self.spec.dim
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    pub fn initializer(&self) -> &Initializer {
        &self.initializer
    }

    // =========================================================================
    // Validation
    // =========================================================================

    fn check_keys(&self, indices: &[Key]) -> VarResult<()> {
        indices
            .iter()
            .try_for_each(|&key| self.spec.key_type.check(key))
    }

    fn check_batch(&self, indices: &[Key], rows: &Rows) -> VarResult<()> {
        if rows.len() != indices.len() {
            return Err(VarError::BatchMismatch {
                keys: indices.len(),
                rows: rows.len(),
            });
        }
        if !rows.is_empty() && rows.dim() != self.spec.dim {
            return Err(VarError::DimensionMismatch {
                expected: self.spec.dim,
                actual: rows.dim(),
            });
        }
        self.check_keys(indices)
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Write `values.row(i)` under `indices[i]`.
    #[instrument(skip_all, fields(var = %self.spec.unique_name, n = indices.len()))]
    pub fn assign(&self, indices: &[Key], values: &Rows) -> VarResult<()> {
        self.check_batch(indices, values)?;
        self.table.write().insert_or_assign(indices, values);
        debug!("Assigned rows");
        Ok(())
    }

    /// Alias of [`DummyVar::assign`].
    pub fn scatter_update(&self, indices: &[Key], values: &Rows) -> VarResult<()> {
        self.assign(indices, values)
    }

    /// Add `deltas.row(i)` to the row under `indices[i]`. Absent keys take the delta.
    #[instrument(skip_all, fields(var = %self.spec.unique_name, n = indices.len()))]
    pub fn scatter_add(&self, indices: &[Key], deltas: &Rows) -> VarResult<()> {
        self.check_batch(indices, deltas)?;
        self.table.write().accum_or_assign(indices, deltas);
        Ok(())
    }

    /// Read rows by key, initializing rows for keys never written.
    #[instrument(skip_all, fields(var = %self.spec.unique_name, n = indices.len()))]
    pub fn sparse_read(&self, indices: &[Key]) -> VarResult<Rows> {
        self.check_keys(indices)?;
        let rows = self
            .table
            .write()
            .find_or_insert(indices, &self.initializer);
        Ok(rows)
    }

    /// Read rows by key without inserting. Returns rows and a found mask.
    pub fn find(&self, indices: &[Key]) -> VarResult<(Rows, Vec<bool>)> {
        self.check_keys(indices)?;
        Ok(self.table.read().find(indices))
    }

    /// Remove keys, returning how many were present.
    pub fn remove(&self, indices: &[Key]) -> VarResult<usize> {
        self.check_keys(indices)?;
        Ok(self.table.write().erase(indices))
    }

    /// All stored `(key, row)` pairs, ordered by key.
    pub fn export(&self) -> (Vec<Key>, Rows) {
        self.table.read().export()
    }

    /// Insert or overwrite rows from an export.
    pub fn import(&self, keys: &[Key], values: &Rows) -> VarResult<()> {
        self.assign(keys, values)
    }

    /// `[rows stored, dim]`.
    pub fn shape(&self) -> [usize; 2] {
        [self.table.read().len(), self.spec.dim]
    }

    pub fn stats(&self) -> TableStats {
        self.table.read().stats()
    }

    // =========================================================================
    // Checkpointing
    // =========================================================================

    /// Write every row to `path` as a bincode [`VarCheckpoint`]. Returns rows written.
    #[instrument(skip_all, fields(var = %self.spec.unique_name, path = %path.as_ref().display()))]
    pub fn save(&self, path: impl AsRef<Path>) -> VarResult<usize> {
        let (keys, rows) = self.export();
        let count = keys.len();
        let checkpoint = VarCheckpoint {
            unique_name: self.spec.unique_name.clone(),
            dim: self.spec.dim,
            key_type: self.spec.key_type,
            keys,
            values: rows.into_flat(),
        };

        let mut writer = BufWriter::new(File::create(path.as_ref())?);
        bincode::serialize_into(&mut writer, &checkpoint)?;
        writer.flush()?;
        info!(rows = count, "Saved variable checkpoint");
        Ok(count)
    }

    /// Replace the variable's contents with a checkpoint. Returns rows loaded.
    ///
    /// # Errors
    ///
    /// - `DimensionMismatch` if the checkpoint width differs
    /// - `HandleMismatch` if the checkpoint key type differs
    #[instrument(skip_all, fields(var = %self.spec.unique_name, path = %path.as_ref().display()))]
    pub fn load(&self, path: impl AsRef<Path>) -> VarResult<usize> {
        let reader = BufReader::new(File::open(path.as_ref())?);
        let checkpoint: VarCheckpoint = bincode::deserialize_from(reader)?;

        if checkpoint.dim != self.spec.dim {
            return Err(VarError::DimensionMismatch {
                expected: self.spec.dim,
                actual: checkpoint.dim,
            });
        }
        if checkpoint.key_type != self.spec.key_type {
            return Err(VarError::HandleMismatch {
                name: self.spec.unique_name.clone(),
                field: "key_type",
                handle: self.spec.key_type.to_string(),
                given: checkpoint.key_type.to_string(),
            });
        }

        let rows = Rows::from_flat(checkpoint.values, checkpoint.dim)?;
        self.check_batch(&checkpoint.keys, &rows)?;

        let mut table = self.table.write();
        table.clear();
        table.insert_or_assign(&checkpoint.keys, &rows);
        info!(rows = checkpoint.keys.len(), "Loaded variable checkpoint");
        Ok(checkpoint.keys.len())
    }
}
