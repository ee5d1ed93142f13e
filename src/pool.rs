use std::marker::PhantomData;

/// Handle to a block owned by a [`ResourcePool`].
///
/// Plain index, no generation: pool blocks are frame-scoped and every
/// outstanding handle is invalidated by `return_all` at frame end.
pub struct PoolHandle<T> {
    index: u32,
    _marker: PhantomData<*const T>,
}

impl<T> std::fmt::Debug for PoolHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PoolHandle").field(&self.index).finish()
    }
}

impl<T> PartialEq for PoolHandle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl<T> Eq for PoolHandle<T> {}

impl<T> Clone for PoolHandle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for PoolHandle<T> {}

unsafe impl<T> Send for PoolHandle<T> {}
unsafe impl<T> Sync for PoolHandle<T> {}

impl<T> PoolHandle<T> {
    fn new(index: usize) -> Self {
        Self {
            index: index as u32,
            _marker: PhantomData,
        }
    }

    pub fn index(&self) -> usize {
        self.index as usize
    }
}

struct Slot<T> {
    value: T,
    /// Position in `acquired` while the block is outstanding.
    acquired_at: usize,
    live: bool,
}

/// Fixed-payload block pool with bulk reclaim.
///
/// Blocks are constructed once via the injected `construct` hook and recycled
/// with the `recycle` hook on release, so payloads holding their own `Vec`s
/// keep capacity across frames instead of reallocating. `return_all` moves
/// every outstanding block back to the free list in O(outstanding).
///
/// Exceeding a configured hard bound is fatal: the pools backing per-frame
/// records are sized at startup, and running past that size means a leak
/// upstream, not a recoverable condition.
pub struct ResourcePool<T> {
    slots: Vec<Slot<T>>,
    free: Vec<usize>,
    acquired: Vec<usize>,
    construct: Box<dyn Fn() -> T>,
    recycle: Option<Box<dyn Fn(&mut T)>>,
    bound: Option<usize>,
    constructed: usize,
}

impl<T> ResourcePool<T> {
    pub fn new(construct: impl Fn() -> T + 'static) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            acquired: Vec::new(),
            construct: Box::new(construct),
            recycle: None,
            bound: None,
            constructed: 0,
        }
    }

    /// Installs a hook run on every block as it returns to the free list.
    pub fn with_recycle(mut self, recycle: impl Fn(&mut T) + 'static) -> Self {
        self.recycle = Some(Box::new(recycle));
        self
    }

    /// Caps the number of blocks the pool may ever construct.
    pub fn with_bound(mut self, bound: usize) -> Self {
        self.bound = Some(bound);
        self
    }

    /// Constructs `count` blocks up front and parks them on the free list.
    pub fn preallocate(mut self, count: usize) -> Self {
        for _ in 0..count {
            let index = self.construct_slot();
            self.free.push(index);
        }
        self
    }

    fn construct_slot(&mut self) -> usize {
        if let Some(bound) = self.bound {
            if self.constructed >= bound {
                panic!(
                    "resource pool exhausted: {} blocks constructed, bound {}",
                    self.constructed, bound
                );
            }
        }
        let index = self.slots.len();
        self.slots.push(Slot {
            value: (self.construct)(),
            acquired_at: 0,
            live: false,
        });
        self.constructed += 1;
        index
    }

    pub fn acquire(&mut self) -> PoolHandle<T> {
        let index = match self.free.pop() {
            Some(index) => index,
            None => self.construct_slot(),
        };
        let slot = &mut self.slots[index];
        slot.live = true;
        slot.acquired_at = self.acquired.len();
        self.acquired.push(index);
        PoolHandle::new(index)
    }

    pub fn release(&mut self, handle: PoolHandle<T>) {
        let index = handle.index();
        debug_assert!(self.slots[index].live, "double release of pool block");
        if !self.slots[index].live {
            log::warn!("ignoring release of a block that is not outstanding");
            return;
        }
        let at = self.slots[index].acquired_at;
        self.acquired.swap_remove(at);
        if let Some(&moved) = self.acquired.get(at) {
            self.slots[moved].acquired_at = at;
        }
        self.recycle_slot(index);
        self.free.push(index);
    }

    /// Moves every outstanding block back to the free list without touching
    /// the backing storage.
    pub fn return_all(&mut self) {
        while let Some(index) = self.acquired.pop() {
            self.recycle_slot(index);
            self.free.push(index);
        }
    }

    fn recycle_slot(&mut self, index: usize) {
        let slot = &mut self.slots[index];
        slot.live = false;
        if let Some(recycle) = &self.recycle {
            recycle(&mut slot.value);
        }
    }

    pub fn get(&self, handle: PoolHandle<T>) -> &T {
        let slot = &self.slots[handle.index()];
        debug_assert!(slot.live, "access through a released pool handle");
        &slot.value
    }

    pub fn get_mut(&mut self, handle: PoolHandle<T>) -> &mut T {
        let slot = &mut self.slots[handle.index()];
        debug_assert!(slot.live, "access through a released pool handle");
        &mut slot.value
    }

    pub fn outstanding(&self) -> usize {
        self.acquired.len()
    }

    /// Total blocks ever constructed, free or outstanding.
    pub fn constructed(&self) -> usize {
        self.constructed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn return_all_reuses_constructed_blocks() {
        let built = Rc::new(Cell::new(0usize));
        let counter = built.clone();
        let mut pool = ResourcePool::new(move || {
            counter.set(counter.get() + 1);
            0u32
        });

        let handles: Vec<_> = (0..8).map(|_| pool.acquire()).collect();
        assert_eq!(built.get(), 8);
        assert_eq!(pool.outstanding(), handles.len());

        pool.return_all();
        assert_eq!(pool.outstanding(), 0);

        for _ in 0..8 {
            pool.acquire();
        }
        assert_eq!(built.get(), 8, "reacquire must reuse existing blocks");
    }

    #[test]
    fn recycle_hook_retains_inner_capacity() {
        let mut pool = ResourcePool::new(Vec::<u32>::new).with_recycle(|v| v.clear());

        let handle = pool.acquire();
        pool.get_mut(handle).extend(0..100);
        let capacity = pool.get(handle).capacity();
        pool.release(handle);

        let handle = pool.acquire();
        assert!(pool.get(handle).is_empty());
        assert!(pool.get(handle).capacity() >= capacity);
    }

    #[test]
    fn release_is_order_independent() {
        let mut pool = ResourcePool::new(|| 0u32);
        let a = pool.acquire();
        let b = pool.acquire();
        let c = pool.acquire();

        pool.release(b);
        pool.release(a);
        pool.release(c);
        assert_eq!(pool.outstanding(), 0);

        pool.acquire();
        assert_eq!(pool.constructed(), 3);
    }

    #[test]
    fn preallocation_constructs_up_front() {
        let mut pool = ResourcePool::new(|| 0u32).preallocate(16);
        assert_eq!(pool.constructed(), 16);
        for _ in 0..16 {
            pool.acquire();
        }
        assert_eq!(pool.constructed(), 16);
    }

    #[test]
    #[should_panic(expected = "resource pool exhausted")]
    fn exceeding_the_bound_is_fatal() {
        let mut pool = ResourcePool::new(|| 0u32).with_bound(2);
        pool.acquire();
        pool.acquire();
        pool.acquire();
    }
}
