//! Contiguous row storage with slot reuse.

/// Fixed-width row buffer. Freed slots are recycled before the buffer grows.
#[derive(Debug)]
pub(crate) struct RowSlab {
    data: Vec<f32>,
    dim: usize,
    free: Vec<usize>,
}

impl RowSlab {
    pub(crate) fn new(dim: usize) -> Self {
        Self {
            data: Vec::new(),
            dim,
            free: Vec::new(),
        }
    }

    /// Allocate a slot. Contents are unspecified until written.
    pub(crate) fn alloc(&mut self) -> usize {
        if let Some(slot) = self.free.pop() {
            return slot;
        }
        let slot = self.data.len() / self.dim;
        self.data.resize(self.data.len() + self.dim, 0.0);
        slot
    }

    pub(crate) fn release(&mut self, slot: usize) {
        debug_assert!(slot < self.slots());
        self.free.push(slot);
    }

    pub(crate) fn row(&self, slot: usize) -> &[f32] {
        &self.data[slot * self.dim..(slot + 1) * self.dim]
    }

    pub(crate) fn row_mut(&mut self, slot: usize) -> &mut [f32] {
        &mut self.data[slot * self.dim..(slot + 1) * self.dim]
    }

    /// Slots ever allocated, free or not.
    pub(crate) fn slots(&self) -> usize {
        self.data.len() / self.dim
    }

    pub(crate) fn clear(&mut self) {
        self.data.clear();
        self.free.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slab_reuses_freed_slots() {
        let mut slab = RowSlab::new(4);
        let a = slab.alloc();
        let b = slab.alloc();
        assert_ne!(a, b);
        slab.row_mut(a).copy_from_slice(&[1.0, 2.0, 3.0, 4.0]);
        slab.release(a);
        let c = slab.alloc();
        assert_eq!(c, a);
        assert_eq!(slab.slots(), 2);
    }

    #[test]
    fn test_slab_rows_are_independent() {
        let mut slab = RowSlab::new(2);
        let a = slab.alloc();
        let b = slab.alloc();
        slab.row_mut(a).fill(1.0);
        slab.row_mut(b).fill(2.0);
        assert_eq!(slab.row(a), &[1.0, 1.0]);
        assert_eq!(slab.row(b), &[2.0, 2.0]);
    }
}
