//! Variable handles and the registry that resolves them.
//!
//! The flow mirrors a resource-handle op surface:
//!
//! 1. [`ResourceManager::create_handle`] names and shapes a variable without
//!    allocating it.
//! 2. [`ResourceManager::initialize`] builds the table behind the handle.
//! 3. [`ResourceManager::assign`] / [`ResourceManager::sparse_read`] and
//!    friends resolve the handle and forward to the [`DummyVar`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::config::TableConfig;
use crate::error::{VarError, VarResult};
use crate::initializer::Initializer;
use crate::rows::Rows;
use crate::table::TableStats;
use crate::types::{DType, Key, KeyType, VarShape, VarType};
use crate::variable::{DummyVar, VarSpec};

/// Prefix for names generated when a handle is created with an empty name.
pub const GENERATED_NAME_PREFIX: &str = "DummyVar_";

static GLOBAL_MANAGER: OnceLock<ResourceManager> = OnceLock::new();

/// Opaque reference to a (possibly not yet initialized) variable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VarHandle {
    shared_name: String,
    shape: VarShape,
    key_type: KeyType,
    dtype: DType,
}

impl VarHandle {
    pub fn shared_name(&self) -> &str {
        &self.shared_name
    }

    pub fn shape(&self) -> VarShape {
        self.shape
    }

    pub fn dim(&self) -> usize {
        self.shape.dim
    }

    pub fn key_type(&self) -> KeyType {
        self.key_type
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }
}

/// Registry of initialized variables keyed by shared name.
///
/// # Thread Safety
///
/// The registry map has its own `RwLock`; variables are handed out as
/// `Arc<DummyVar>` so table work never runs under the registry lock.
#[derive(Debug, Default)]
pub struct ResourceManager {
    vars: RwLock<HashMap<String, Arc<DummyVar>>>,
    next_id: AtomicUsize,
}

impl ResourceManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide registry.
    pub fn global() -> &'static ResourceManager {
        GLOBAL_MANAGER.get_or_init(ResourceManager::new)
    }

    /// Create a handle. Does not allocate storage.
    ///
    /// An empty `shared_name` is replaced by a generated unique name.
    ///
    /// # Errors
    ///
    /// Returns `InvalidShape` unless the shape is `[None, dim]` with `dim > 0`.
    pub fn create_handle(
        &self,
        shared_name: &str,
        shape: VarShape,
        key_type: KeyType,
        dtype: DType,
    ) -> VarResult<VarHandle> {
        shape.validate()?;
        let shared_name = if shared_name.is_empty() {
            let id = self.next_id.fetch_add(1, Ordering::Relaxed);
            format!("{}{}", GENERATED_NAME_PREFIX, id)
        } else {
            shared_name.to_string()
        };
        debug!(name = %shared_name, %shape, %key_type, %dtype, "Created variable handle");
        Ok(VarHandle {
            shared_name,
            shape,
            key_type,
            dtype,
        })
    }

    /// Build and register the variable behind `handle`.
    ///
    /// `config` is the JSON table config, e.g.
    /// `{"init_capacity":1048576,"max_capacity":1048576}`. An empty
    /// `unique_name` defaults to the handle's shared name.
    ///
    /// # Errors
    ///
    /// - `HandleMismatch` if `key_type` or `dtype` differ from the handle
    /// - `ConfigParse` / `InvalidConfig` for a bad config string
    /// - `AlreadyInitialized` if the handle already has a variable
    #[allow(clippy::too_many_arguments)]
    pub fn initialize(
        &self,
        handle: &VarHandle,
        initializer: Initializer,
        var_type: VarType,
        unique_name: &str,
        key_type: KeyType,
        dtype: DType,
        config: &str,
    ) -> VarResult<Arc<DummyVar>> {
        if key_type != handle.key_type {
            return Err(VarError::HandleMismatch {
                name: handle.shared_name.clone(),
                field: "key_type",
                handle: handle.key_type.to_string(),
                given: key_type.to_string(),
            });
        }
        if dtype != handle.dtype {
            return Err(VarError::HandleMismatch {
                name: handle.shared_name.clone(),
                field: "dtype",
                handle: handle.dtype.to_string(),
                given: dtype.to_string(),
            });
        }

        let config = TableConfig::from_json(config)?;
        let unique_name = if unique_name.is_empty() {
            handle.shared_name.clone()
        } else {
            unique_name.to_string()
        };

        // Cheap rejection before building the table.
        if self.vars.read().contains_key(&handle.shared_name) {
            return Err(VarError::AlreadyInitialized {
                name: handle.shared_name.clone(),
            });
        }

        let var = Arc::new(DummyVar::new(
            VarSpec {
                unique_name,
                dim: handle.shape.dim,
                key_type,
                dtype,
                var_type,
            },
            config,
            initializer,
        )?);

        let mut vars = self.vars.write();
        if vars.contains_key(&handle.shared_name) {
            warn!(name = %handle.shared_name, "Lost initialization race");
            return Err(VarError::AlreadyInitialized {
                name: handle.shared_name.clone(),
            });
        }
        vars.insert(handle.shared_name.clone(), Arc::clone(&var));
        info!(name = %handle.shared_name, "Registered variable");
        Ok(var)
    }

    /// Resolve a handle to its variable.
    pub fn get(&self, handle: &VarHandle) -> VarResult<Arc<DummyVar>> {
        self.vars
            .read()
            .get(&handle.shared_name)
            .cloned()
            .ok_or_else(|| VarError::not_initialized(&handle.shared_name))
    }

    pub fn is_initialized(&self, handle: &VarHandle) -> bool {
        self.vars.read().contains_key(&handle.shared_name)
    }

    /// Unregister a variable. Returns whether it existed.
    ///
    /// Outstanding `Arc<DummyVar>` clones stay valid until dropped.
    pub fn destroy(&self, handle: &VarHandle) -> bool {
        let removed = self.vars.write().remove(&handle.shared_name).is_some();
        if removed {
            info!(name = %handle.shared_name, "Destroyed variable");
        }
        removed
    }

    /// Shared names of every registered variable, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.vars.read().keys().cloned().collect();
        names.sort();
        names
    }

    // =========================================================================
    // Handle-based operations
    // =========================================================================

    pub fn assign(&self, handle: &VarHandle, indices: &[Key], values: &Rows) -> VarResult<()> {
        self.get(handle)?.assign(indices, values)
    }

    pub fn sparse_read(&self, handle: &VarHandle, indices: &[Key]) -> VarResult<Rows> {
        self.get(handle)?.sparse_read(indices)
    }

    pub fn scatter_add(&self, handle: &VarHandle, indices: &[Key], deltas: &Rows) -> VarResult<()> {
        self.get(handle)?.scatter_add(indices, deltas)
    }

    pub fn scatter_update(
        &self,
        handle: &VarHandle,
        indices: &[Key],
        values: &Rows,
    ) -> VarResult<()> {
        self.get(handle)?.scatter_update(indices, values)
    }

    pub fn export(&self, handle: &VarHandle) -> VarResult<(Vec<Key>, Rows)> {
        Ok(self.get(handle)?.export())
    }

    pub fn shape(&self, handle: &VarHandle) -> VarResult<[usize; 2]> {
        Ok(self.get(handle)?.shape())
    }

    pub fn stats(&self, handle: &VarHandle) -> VarResult<TableStats> {
        Ok(self.get(handle)?.stats())
    }
}
