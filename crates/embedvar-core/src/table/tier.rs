//! One memory tier: a row slab plus score ordering for victim selection.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::slab::RowSlab;
use crate::types::Key;

/// Where a row currently lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Accelerator memory (HBM).
    Device,
    /// Host memory.
    Host,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Device => write!(f, "device"),
            Tier::Host => write!(f, "host"),
        }
    }
}

#[derive(Debug)]
pub(crate) struct TierStore {
    pub(crate) slab: RowSlab,
    /// `(score, key)` for every resident row; the first element is the coldest.
    order: BTreeSet<(u64, Key)>,
    capacity: usize,
}

impl TierStore {
    pub(crate) fn new(dim: usize, capacity: usize) -> Self {
        Self {
            slab: RowSlab::new(dim),
            order: BTreeSet::new(),
            capacity,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.order.len()
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity
    }

    pub(crate) fn has_room(&self) -> bool {
        self.order.len() < self.capacity
    }

    pub(crate) fn coldest(&self) -> Option<(u64, Key)> {
        self.order.first().copied()
    }

    /// Admit `key` at `score`, returning its slot.
    pub(crate) fn admit(&mut self, key: Key, score: u64) -> usize {
        self.order.insert((score, key));
        self.slab.alloc()
    }

    pub(crate) fn evict(&mut self, key: Key, score: u64, slot: usize) {
        self.order.remove(&(score, key));
        self.slab.release(slot);
    }

    pub(crate) fn rescore(&mut self, key: Key, old: u64, new: u64) {
        self.order.remove(&(old, key));
        self.order.insert((new, key));
    }

    pub(crate) fn clear(&mut self) {
        self.order.clear();
        self.slab.clear();
    }
}
