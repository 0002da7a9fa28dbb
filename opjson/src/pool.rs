//! Reusable scratch objects shared across encodes.

use std::sync::LazyLock;

use parking_lot::Mutex;

use crate::context::{Context, MapIter};

/// Clears an object before it goes back into a pool.
pub(crate) trait Recycle {
    fn recycle(&mut self);
}

/// A bounded free list. Objects are recycled on return, so a taken object
/// never carries state from a previous use.
pub(crate) struct Pool<T> {
    items: Mutex<Vec<T>>,
    capacity: usize,
}

impl<T: Default + Recycle> Pool<T> {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            items: Mutex::new(Vec::new()),
            capacity,
        }
    }

    pub(crate) fn take(&self) -> T {
        self.items.lock().pop().unwrap_or_default()
    }

    pub(crate) fn give(&self, mut item: T) {
        item.recycle();
        let mut items = self.items.lock();
        if items.len() < self.capacity {
            items.push(item);
        }
    }
}

pub(crate) static CONTEXTS: LazyLock<Pool<Context>> = LazyLock::new(|| Pool::new(32));

pub(crate) static MAP_ITERS: LazyLock<Pool<MapIter>> = LazyLock::new(|| Pool::new(64));

#[cfg(test)]
mod tests {
    use super::*;
    use opjson_testhelpers::test;

    #[test]
    fn returned_items_come_back_clean() {
        let pool: Pool<MapIter> = Pool::new(1);
        let mut iter = pool.take();
        iter.entries.push((1, 2));
        pool.give(iter);
        let again = pool.take();
        assert!(again.entries.is_empty());
        assert!(again.entries.capacity() >= 1);
    }

    #[test]
    fn capacity_bounds_the_free_list() {
        let pool: Pool<MapIter> = Pool::new(1);
        pool.give(MapIter::default());
        pool.give(MapIter::default());
        assert_eq!(pool.items.lock().len(), 1);
    }
}
