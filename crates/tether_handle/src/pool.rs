//! Thread-confined free lists of retired shells.
//!
//! Each thread owns one [`Pool`] per payload type. Acquisition pops from the
//! calling thread's pool; recycling pushes onto the calling thread's pool,
//! whichever thread originally allocated the shell. Pools are caches, not
//! owners: a shell that cannot be pooled (capacity reached, thread shutting
//! down) is simply dropped.
//!
//! ```
//! use tether_handle::{Handle, Pool};
//! use tether_handle::adapter::{AdapterError, ResourceAdapter};
//!
//! struct Id(u32);
//! impl ResourceAdapter<u32> for Id {
//!     fn resource(&self) -> Option<u32> { Some(self.0) }
//!     fn dispose(&mut self) -> Result<(), AdapterError> { Ok(()) }
//! }
//!
//! let handle = Handle::new(Id(1));
//! handle.dispose();
//! assert_eq!(Pool::<u32>::local_len(), 1);
//!
//! // The next handle for `u32` on this thread reuses the shell.
//! let again = Handle::new(Id(2));
//! assert_eq!(again.id().shell(), handle.id().shell());
//! assert!(again.generation() > handle.generation());
//! # again.dispose();
//! ```

use core::any::{Any, TypeId};
use std::cell::RefCell;
use std::sync::Arc;

use hashbrown::HashMap;

use crate::adapter::Payload;
use crate::config::TetherConfig;
use crate::shell::Shell;

thread_local! {
    static LOCAL_POOLS: RefCell<PoolSet> = RefCell::new(PoolSet::default());
}

/// Counters for one payload type's pool on one thread.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Shells handed out, fresh or recycled.
    pub acquired: u64,
    /// Shells allocated because the pool was empty.
    pub allocated: u64,
    /// Shells returned to the pool.
    pub recycled: u64,
    /// Shells dropped because the pool was full.
    pub discarded: u64,
}

/// Per-thread free list of shells for payload type `T`.
///
/// Pools are never constructed directly; use the associated `local_*`
/// functions to inspect or manage the calling thread's pool.
pub struct Pool<T: Payload> {
    free: Vec<Arc<Shell<T>>>,
    stats: PoolStats,
}

impl<T: Payload> Pool<T> {
    fn new() -> Self {
        Self {
            free: Vec::new(),
            stats: PoolStats::default(),
        }
    }

    /// Number of retired shells waiting on this thread.
    #[must_use]
    pub fn local_len() -> usize {
        with_local::<T, _>(|pool| pool.free.len()).unwrap_or(0)
    }

    /// Counters for this thread's pool.
    #[must_use]
    pub fn local_stats() -> PoolStats {
        with_local::<T, _>(|pool| pool.stats).unwrap_or_default()
    }

    /// Drops every retired shell held by this thread.
    ///
    /// Stale handles and references keep working (they report dead); only
    /// the cached allocations are released.
    pub fn clear_local() {
        let drained = with_local::<T, _>(|pool| core::mem::take(&mut pool.free));
        // Dropped outside the pool borrow.
        drop(drained);
    }

    /// Allocates `count` shells into this thread's pool ahead of time.
    pub fn prewarm_local(count: usize) {
        let capacity = TetherConfig::current().max_pooled_per_type;
        with_local::<T, _>(|pool| {
            let room = capacity.saturating_sub(pool.free.len());
            for _ in 0..count.min(room) {
                pool.stats.allocated += 1;
                pool.free.push(Arc::new(Shell::new()));
            }
        });
    }

    /// Pops a retired shell or allocates a new one.
    pub(crate) fn acquire() -> Arc<Shell<T>> {
        with_local::<T, _>(Self::take_or_allocate).unwrap_or_else(|| Arc::new(Shell::new()))
    }

    /// Returns a torn-down shell to the calling thread's pool.
    pub(crate) fn recycle(shell: Arc<Shell<T>>) {
        let capacity = TetherConfig::current().max_pooled_per_type;
        let rejected = with_local::<T, _>(move |pool| {
            if pool.free.len() < capacity {
                pool.stats.recycled += 1;
                pool.free.push(shell);
                None
            } else {
                pool.stats.discarded += 1;
                Some(shell)
            }
        });
        drop(rejected);
    }

    fn take_or_allocate(&mut self) -> Arc<Shell<T>> {
        self.stats.acquired += 1;
        self.free.pop().unwrap_or_else(|| {
            self.stats.allocated += 1;
            Arc::new(Shell::new())
        })
    }
}

/// All pools of one thread, keyed by payload type.
#[derive(Default)]
struct PoolSet {
    pools: HashMap<TypeId, Box<dyn Any>>,
}

impl PoolSet {
    fn pool_mut<T: Payload>(&mut self) -> Option<&mut Pool<T>> {
        self.pools
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(Pool::<T>::new()))
            .downcast_mut::<Pool<T>>()
    }
}

/// Runs `f` against this thread's pool for `T`.
///
/// Returns `None` while the thread is tearing down its locals or when the
/// pool set is already borrowed further up the stack.
fn with_local<T: Payload, R>(f: impl FnOnce(&mut Pool<T>) -> R) -> Option<R> {
    LOCAL_POOLS
        .try_with(|set| {
            let mut set = set.try_borrow_mut().ok()?;
            set.pool_mut::<T>().map(f)
        })
        .ok()
        .flatten()
}
