//! The leak safety net.
//!
//! A handle or reference dropped without being disposed is a leak. The drop
//! is detected, logged (with the acquisition backtrace when one was
//! captured) and the release it skipped is queued on the [`Reclaimer`] the
//! handle was created under. The queue is drained on the reclaimer's owner
//! thread, the one context where disposing adapters is known to be safe.
//!
//! Handles created outside any reclaimer release leaks inline on the
//! dropping thread.
//!
//! # Example
//!
//! ```
//! use tether_handle::{Handle, Reclaimer};
//! use tether_handle::adapter::{AdapterError, ResourceAdapter};
//!
//! struct Mesh;
//! impl ResourceAdapter<u32> for Mesh {
//!     fn resource(&self) -> Option<u32> { Some(3) }
//!     fn dispose(&mut self) -> Result<(), AdapterError> { Ok(()) }
//! }
//!
//! let reclaimer = Reclaimer::new();
//! let handle = {
//!     let _scope = reclaimer.enter();
//!     Handle::new(Mesh)
//! };
//!
//! let reference = handle.new_reference();
//! drop(reference); // leaked: never disposed
//!
//! assert!(handle.is_alive());
//! assert_eq!(reclaimer.pending(), 1);
//!
//! // Next frame, on the owner thread:
//! assert_eq!(reclaimer.drain(), 1);
//! assert!(!handle.is_alive());
//! ```

use core::marker::PhantomData;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Weak};
use std::thread::{self, ThreadId};

use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::generation::HandleId;

thread_local! {
    static CURRENT: RefCell<Option<Reclaimer>> = const { RefCell::new(None) };
}

/// A release skipped by a leaked owner.
struct Deferred {
    id: HandleId,
    release: Box<dyn FnOnce() + Send>,
}

/// Counters describing the leak safety net's activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LeakReport {
    /// Leaks detected and queued.
    pub deferred: u64,
    /// Deferred releases executed by [`Reclaimer::drain`].
    pub released: u64,
}

struct Inner {
    owner: ThreadId,
    queue: Mutex<VecDeque<Deferred>>,
    report: Mutex<LeakReport>,
    notify: Notify,
}

impl Drop for Inner {
    fn drop(&mut self) {
        let pending = self.queue.get_mut().len();
        if pending > 0 {
            tracing::warn!(
                pending,
                "reclaimer dropped before draining; leaked resources are dropped undisposed"
            );
        }
    }
}

/// Deferred-cleanup queue bound to one owner thread.
///
/// Cloning yields another handle to the same queue. Handles only keep a weak
/// link to the reclaimer they were created under: once every `Reclaimer`
/// clone is gone, queued releases are dropped without running (their
/// adapters are dropped, not disposed) and later leaks of those handles are
/// released inline on the dropping thread.
#[derive(Clone)]
pub struct Reclaimer {
    inner: Arc<Inner>,
}

impl Reclaimer {
    /// Creates a reclaimer owned by the calling thread.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                owner: thread::current().id(),
                queue: Mutex::new(VecDeque::new()),
                report: Mutex::new(LeakReport::default()),
                notify: Notify::new(),
            }),
        }
    }

    /// The reclaimer entered on this thread, if any.
    #[must_use]
    pub fn current() -> Option<Self> {
        CURRENT
            .try_with(|current| current.borrow().clone())
            .ok()
            .flatten()
    }

    /// Makes this the current reclaimer of the calling thread until the
    /// guard is dropped. Handles created meanwhile route leaks here.
    #[must_use = "the reclaimer is only current while the guard is alive"]
    pub fn enter(&self) -> ReclaimerGuard {
        let previous = CURRENT.with(|current| current.borrow_mut().replace(self.clone()));
        ReclaimerGuard {
            previous,
            _not_send: PhantomData,
        }
    }

    /// Whether the calling thread is this reclaimer's owner.
    #[must_use]
    pub fn is_owner_thread(&self) -> bool {
        thread::current().id() == self.inner.owner
    }

    /// Number of releases waiting to be drained.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.inner.queue.lock().len()
    }

    /// Activity counters.
    #[must_use]
    pub fn report(&self) -> LeakReport {
        *self.inner.report.lock()
    }

    /// Runs every queued release, including ones queued while draining.
    ///
    /// Must be called on the owner thread; elsewhere it logs a warning and
    /// runs nothing. Returns the number of releases executed.
    pub fn drain(&self) -> usize {
        if !self.is_owner_thread() {
            tracing::warn!(
                pending = self.pending(),
                "reclaimer drained off its owner thread; skipping"
            );
            return 0;
        }

        let mut released = 0;
        loop {
            let next = self.inner.queue.lock().pop_front();
            let Some(Deferred { id, release }) = next else {
                break;
            };
            if catch_unwind(AssertUnwindSafe(release)).is_err() {
                tracing::error!(handle = %id, "deferred release panicked");
            }
            released += 1;
        }

        if released > 0 {
            self.inner.report.lock().released += released as u64;
            tracing::debug!(released, "reclaimer drained deferred releases");
        }
        released
    }

    /// Drains whenever new work is queued until `shutdown` completes, then
    /// drains one final time.
    ///
    /// Intended to be polled on the owner thread, e.g. from a current-thread
    /// runtime or a `LocalSet`. Returns the total number of releases run.
    pub async fn run<F>(&self, shutdown: F) -> usize
    where
        F: Future<Output = ()>,
    {
        let mut shutdown = core::pin::pin!(shutdown);
        let mut total = 0;
        loop {
            total += self.drain();
            tokio::select! {
                biased;
                () = &mut shutdown => break,
                () = self.inner.notify.notified() => {}
            }
        }
        total + self.drain()
    }

    pub(crate) fn downgrade(&self) -> WeakReclaimer {
        WeakReclaimer(Arc::downgrade(&self.inner))
    }

    pub(crate) fn defer(&self, id: HandleId, release: Box<dyn FnOnce() + Send>) {
        self.inner.queue.lock().push_back(Deferred { id, release });
        self.inner.report.lock().deferred += 1;
        self.inner.notify.notify_one();
    }
}

impl Default for Reclaimer {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for Reclaimer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Reclaimer")
            .field("owner", &self.inner.owner)
            .field("pending", &self.pending())
            .finish()
    }
}

/// Non-owning link from a handle life to its reclaimer.
#[derive(Clone)]
pub(crate) struct WeakReclaimer(Weak<Inner>);

impl WeakReclaimer {
    pub(crate) fn upgrade(&self) -> Option<Reclaimer> {
        self.0.upgrade().map(|inner| Reclaimer { inner })
    }
}

/// Restores the previously entered reclaimer when dropped.
pub struct ReclaimerGuard {
    previous: Option<Reclaimer>,
    _not_send: PhantomData<*const ()>,
}

impl Drop for ReclaimerGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        // Ignored during thread teardown.
        let _ = CURRENT.try_with(|current| *current.borrow_mut() = previous);
    }
}
