//! Two-tier hash table mapping integer keys to fixed-width rows.
//!
//! # Placement
//!
//! New and recently touched rows live in the device tier. When the device
//! tier is full, its coldest row is demoted to the host tier to make room
//! (hybrid variables only). A host-tier row that is accessed again is
//! promoted back to the device tier.
//!
//! # Capacity
//!
//! The table never holds more than `max_capacity` distinct keys. Inserting a
//! new key into a full table first evicts the coldest row overall, taking it
//! from the host tier when that tier is non-empty.
//!
//! # Scores
//!
//! - LRU: score is a logical clock value stamped at each access.
//! - LFU: score is the access count.
//!
//! The victim in a tier is the minimum `(score, key)`.
//!
//! # Module Structure
//!
//! - [`slab`]: contiguous row storage with slot reuse
//! - [`tier`]: per-tier storage and score ordering

mod slab;
mod tier;


use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::config::{EvictStrategy, TableConfig};
use crate::initializer::Initializer;
use crate::rows::Rows;
use crate::types::{Key, VarType};

pub use tier::Tier;
use tier::TierStore;

/// Index slots reserved eagerly at construction. Larger initial capacities
/// are accounted logically and reserved as the table fills.
const EAGER_INDEX_RESERVE: usize = 1 << 16;

#[derive(Debug, Clone, Copy)]
struct Entry {
    tier: Tier,
    slot: usize,
    score: u64,
}

/// Snapshot of table occupancy and tiering activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableStats {
    pub len: usize,
    pub device_len: usize,
    pub host_len: usize,
    pub reserved: usize,
    pub max_capacity: usize,
    pub device_capacity: usize,
    pub evictions: u64,
    pub demotions: u64,
    pub promotions: u64,
}

/// Hash table with a bounded device tier and an overflow host tier.
///
/// Callers are responsible for shape checks; every row passed in must be
/// exactly `dim` wide and batches must pair one row per key.
///
/// # Thread Safety
///
/// Not synchronized. Variables wrap it in a `parking_lot::RwLock`.
#[derive(Debug)]
pub struct HybridTable {
    dim: usize,
    strategy: EvictStrategy,
    init_capacity: usize,
    max_capacity: usize,
    max_load_factor: f32,
    reserved: usize,
    index: HashMap<Key, Entry>,
    device: TierStore,
    host: TierStore,
    clock: u64,
    evictions: u64,
    demotions: u64,
    promotions: u64,
}

impl HybridTable {
    /// Create an empty table for rows of `dim` floats.
    pub fn new(dim: usize, var_type: VarType, config: &TableConfig) -> Self {
        let device_capacity = config.device_capacity(dim, var_type);
        let host_capacity = match var_type {
            VarType::Hbm => 0,
            VarType::Hybrid => config.max_capacity,
        };
        debug!(
            dim,
            %var_type,
            device_capacity,
            host_capacity,
            max_capacity = config.max_capacity,
            "Creating hybrid table"
        );

        Self {
            dim,
            strategy: config.evict_strategy,
            init_capacity: config.init_capacity,
            max_capacity: config.max_capacity,
            max_load_factor: config.max_load_factor,
            reserved: config.init_capacity,
            index: HashMap::with_capacity(config.init_capacity.min(EAGER_INDEX_RESERVE)),
            device: TierStore::new(dim, device_capacity),
            host: TierStore::new(dim, host_capacity),
            clock: 0,
            evictions: 0,
            demotions: 0,
            promotions: 0,
        }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of distinct keys stored.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn device_len(&self) -> usize {
        self.device.len()
    }

    pub fn host_len(&self) -> usize {
        self.host.len()
    }

    /// Logical reserved capacity (grows by doubling up to `max_capacity`).
    pub fn reserved_capacity(&self) -> usize {
        self.reserved
    }

    pub fn contains(&self, key: Key) -> bool {
        self.index.contains_key(&key)
    }

    /// Tier holding `key`, if present.
    pub fn tier_of(&self, key: Key) -> Option<Tier> {
        self.index.get(&key).map(|e| e.tier)
    }

    /// Row for `key` without updating its score.
    pub fn get(&self, key: Key) -> Option<&[f32]> {
        self.index
            .get(&key)
            .map(|e| self.tier(e.tier).slab.row(e.slot))
    }

    /// Write `values.row(i)` under `keys[i]`, inserting absent keys.
    ///
    /// Duplicate keys in one batch: the last row wins.
    pub fn insert_or_assign(&mut self, keys: &[Key], values: &Rows) {
        for (i, &key) in keys.iter().enumerate() {
            let (entry, _) = self.access(key);
            self.tier_mut(entry.tier)
                .slab
                .row_mut(entry.slot)
                .copy_from_slice(values.row(i));
        }
    }

    /// Read rows for `keys`, inserting `init` rows for absent keys.
    pub fn find_or_insert(&mut self, keys: &[Key], init: &Initializer) -> Rows {
        let mut out = Rows::zeros(keys.len(), self.dim);
        for (i, &key) in keys.iter().enumerate() {
            let (entry, inserted) = self.access(key);
            let row = self.tier_mut(entry.tier).slab.row_mut(entry.slot);
            if inserted {
                init.fill(key, row);
            }
            out.row_mut(i).copy_from_slice(row);
        }
        out
    }

    /// Read rows for `keys` without inserting or touching scores.
    ///
    /// Missing keys yield zero rows and `false` in the mask.
    pub fn find(&self, keys: &[Key]) -> (Rows, Vec<bool>) {
        let mut out = Rows::zeros(keys.len(), self.dim);
        let mut found = Vec::with_capacity(keys.len());
        for (i, &key) in keys.iter().enumerate() {
            match self.get(key) {
                Some(row) => {
                    out.row_mut(i).copy_from_slice(row);
                    found.push(true);
                }
                None => found.push(false),
            }
        }
        (out, found)
    }

    /// Add `deltas.row(i)` to the row under `keys[i]`; absent keys take the delta as-is.
    pub fn accum_or_assign(&mut self, keys: &[Key], deltas: &Rows) {
        for (i, &key) in keys.iter().enumerate() {
            let (entry, inserted) = self.access(key);
            let row = self.tier_mut(entry.tier).slab.row_mut(entry.slot);
            let delta = deltas.row(i);
            if inserted {
                row.copy_from_slice(delta);
            } else {
                row.iter_mut().zip(delta).for_each(|(r, d)| *r += d);
            }
        }
    }

    /// Remove keys, returning how many were present.
    pub fn erase(&mut self, keys: &[Key]) -> usize {
        let mut removed = 0;
        for &key in keys {
            if let Some(entry) = self.index.remove(&key) {
                self.tier_mut(entry.tier).evict(key, entry.score, entry.slot);
                removed += 1;
            }
        }
        removed
    }

    /// Drop every row and reset capacity to its initial value.
    pub fn clear(&mut self) {
        self.index.clear();
        self.device.clear();
        self.host.clear();
        self.reserved = self.init_capacity;
    }

    /// All `(key, row)` pairs ordered by key.
    pub fn export(&self) -> (Vec<Key>, Rows) {
        let mut keys: Vec<Key> = self.index.keys().copied().collect();
        keys.sort_unstable();
        let (rows, _) = self.find(&keys);
        (keys, rows)
    }

    pub fn stats(&self) -> TableStats {
        TableStats {
            len: self.len(),
            device_len: self.device.len(),
            host_len: self.host.len(),
            reserved: self.reserved,
            max_capacity: self.max_capacity,
            device_capacity: self.device.capacity(),
            evictions: self.evictions,
            demotions: self.demotions,
            promotions: self.promotions,
        }
    }

    // =========================================================================
    // Placement
    // =========================================================================

    fn tier(&self, tier: Tier) -> &TierStore {
        match tier {
            Tier::Device => &self.device,
            Tier::Host => &self.host,
        }
    }

    fn tier_mut(&mut self, tier: Tier) -> &mut TierStore {
        match tier {
            Tier::Device => &mut self.device,
            Tier::Host => &mut self.host,
        }
    }

    fn next_score(&mut self, previous: Option<u64>) -> u64 {
        match self.strategy {
            EvictStrategy::Lru => {
                self.clock += 1;
                self.clock
            }
            EvictStrategy::Lfu => previous.map_or(1, |s| s.saturating_add(1)),
        }
    }

    /// Resolve `key` for an access, inserting it if absent. Returns the
    /// entry after scoring and promotion, and whether it was inserted.
    fn access(&mut self, key: Key) -> (Entry, bool) {
        match self.index.get(&key).copied() {
            Some(entry) => (self.touch(key, entry), false),
            None => (self.insert_new(key), true),
        }
    }

    fn touch(&mut self, key: Key, mut entry: Entry) -> Entry {
        let score = self.next_score(Some(entry.score));
        self.tier_mut(entry.tier).rescore(key, entry.score, score);
        entry.score = score;
        self.index.insert(key, entry);

        if entry.tier == Tier::Host && self.device.capacity() > 0 {
            entry = self.promote(key, entry);
        }
        entry
    }

    fn insert_new(&mut self, key: Key) -> Entry {
        if self.index.len() >= self.max_capacity {
            self.evict_coldest();
        }

        let score = self.next_score(None);
        let tier = if self.device.has_room() {
            Tier::Device
        } else if self.device.capacity() > 0 {
            self.demote_coldest();
            Tier::Device
        } else {
            Tier::Host
        };

        let slot = self.tier_mut(tier).admit(key, score);
        let entry = Entry { tier, slot, score };
        self.index.insert(key, entry);
        self.grow_if_needed();
        entry
    }

    fn promote(&mut self, key: Key, entry: Entry) -> Entry {
        if !self.device.has_room() {
            self.demote_coldest();
        }
        let slot = self.device.admit(key, entry.score);
        self.device
            .slab
            .row_mut(slot)
            .copy_from_slice(self.host.slab.row(entry.slot));
        self.host.evict(key, entry.score, entry.slot);

        let promoted = Entry {
            tier: Tier::Device,
            slot,
            score: entry.score,
        };
        self.index.insert(key, promoted);
        self.promotions += 1;
        trace!(key, "Promoted row to device tier");
        promoted
    }

    fn demote_coldest(&mut self) {
        let Some((score, victim)) = self.device.coldest() else {
            return;
        };
        let Some(entry) = self.index.get(&victim).copied() else {
            return;
        };
        let slot = self.host.admit(victim, score);
        self.host
            .slab
            .row_mut(slot)
            .copy_from_slice(self.device.slab.row(entry.slot));
        self.device.evict(victim, score, entry.slot);

        self.index.insert(
            victim,
            Entry {
                tier: Tier::Host,
                slot,
                score,
            },
        );
        self.demotions += 1;
        trace!(key = victim, "Demoted row to host tier");
    }

    fn evict_coldest(&mut self) {
        let tier = if self.host.len() > 0 {
            Tier::Host
        } else {
            Tier::Device
        };
        let Some((_, victim)) = self.tier(tier).coldest() else {
            return;
        };
        if let Some(entry) = self.index.remove(&victim) {
            self.tier_mut(entry.tier).evict(victim, entry.score, entry.slot);
            self.evictions += 1;
            trace!(key = victim, %tier, "Evicted row");
        }
    }

    fn grow_if_needed(&mut self) {
        while self.reserved < self.max_capacity
            && self.index.len() as f64 > self.reserved as f64 * f64::from(self.max_load_factor)
        {
            self.reserved = self.reserved.saturating_mul(2).min(self.max_capacity);
            let target = self.reserved.min(EAGER_INDEX_RESERVE.max(self.index.len() * 2));
            self.index.reserve(target.saturating_sub(self.index.len()));
            debug!(reserved = self.reserved, len = self.index.len(), "Table capacity grown");
        }
    }
}
