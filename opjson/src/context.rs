//! Scratch memory for the VM.
//!
//! A context is a flat array of machine words split into regions, one per
//! active program. Slot `0` of a region holds the address of the value the
//! program encodes; slots `1..FIRST_FREE_SLOT` hold the frame that lets a
//! sub-program return to its caller. Opcodes address slots relative to the
//! current region.

use crate::pool::Recycle;
use crate::program::Slot;

pub(crate) const INPUT_SLOT: Slot = 0;
pub(crate) const FRAME_PROGRAM: Slot = 1;
pub(crate) const FRAME_RETURN: Slot = 2;
pub(crate) const FRAME_BASE: Slot = 3;
pub(crate) const FRAME_INDENT: Slot = 4;
/// Address registered in the cycle set by this call, or `0`.
pub(crate) const FRAME_ENTRY: Slot = 5;
pub(crate) const FIRST_FREE_SLOT: Slot = 6;

#[derive(Default)]
pub(crate) struct Context {
    slots: Vec<usize>,
    base: usize,
}

impl Context {
    /// Sets up the root region.
    pub(crate) fn prepare(&mut self, size: usize) {
        self.slots.clear();
        self.slots.resize(size, 0);
        self.base = 0;
    }

    #[inline]
    pub(crate) fn load(&self, slot: Slot) -> usize {
        self.slots[self.base + slot]
    }

    #[inline]
    pub(crate) fn store(&mut self, slot: Slot, value: usize) {
        self.slots[self.base + slot] = value;
    }

    /// Opens a region of `size` slots right after the current region,
    /// which is `offset` slots long. Returns the previous base.
    pub(crate) fn enter(&mut self, offset: usize, size: usize) -> usize {
        let previous = self.base;
        self.base += offset;
        let needed = self.base + size;
        if self.slots.len() < needed {
            self.slots.resize(needed, 0);
        }
        previous
    }

    /// Returns to the region starting at `base`.
    pub(crate) fn leave(&mut self, base: usize) {
        self.base = base;
    }
}

impl Recycle for Context {
    fn recycle(&mut self) {
        self.slots.clear();
        self.base = 0;
    }
}

/// Entries of the map being encoded, as `(key, value)` addresses.
#[derive(Default)]
pub(crate) struct MapIter {
    pub entries: Vec<(usize, usize)>,
}

impl Recycle for MapIter {
    fn recycle(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opjson_testhelpers::test;

    #[test]
    fn regions_are_relative_to_base() {
        let mut ctx = Context::default();
        ctx.prepare(8);
        ctx.store(INPUT_SLOT, 11);
        let previous = ctx.enter(8, 10);
        assert_eq!(previous, 0);
        assert_eq!(ctx.load(INPUT_SLOT), 0);
        ctx.store(INPUT_SLOT, 22);
        ctx.store(9, 33);
        ctx.leave(previous);
        assert_eq!(ctx.load(INPUT_SLOT), 11);
        assert_eq!(ctx.slots.len(), 18);
    }

    #[test]
    fn recycling_forgets_everything() {
        let mut iter = MapIter::default();
        iter.entries.push((1, 2));
        iter.recycle();
        assert!(iter.entries.is_empty());

        let mut ctx = Context::default();
        ctx.prepare(4);
        ctx.enter(4, 4);
        ctx.recycle();
        assert_eq!((ctx.slots.len(), ctx.base), (0, 0));
    }
}
