//! The sole owner of one disposable resource.

use core::fmt;
use std::backtrace::Backtrace;
use std::borrow::Cow;
use std::sync::Arc;

use crate::adapter::{Payload, ResourceAdapter};
use crate::config::TetherConfig;
use crate::error::TetherError;
use crate::generation::{Generation, HandleId};
use crate::observer::ObserverId;
use crate::pool::Pool;
use crate::reclaimer::Reclaimer;
use crate::reference::Reference;
use crate::shell::{Leak, Shell};

/// Owns one resource adapter and counts the references claiming it.
///
/// A new handle starts with a reference count of zero. Each
/// [`new_reference`](Self::new_reference) adds a claim; when the last claim
/// is disposed the adapter is disposed, pre-dispose observers having run
/// first, and the handle's shell returns to the thread's [`Pool`] for a
/// later, higher-generation life.
///
/// Every operation on a handle whose life has ended is a harmless no-op:
/// queries report "not alive" and resource accessors return `None`.
///
/// # Example
///
/// ```
/// use tether_handle::Handle;
/// use tether_handle::adapter::{AdapterError, ResourceAdapter};
///
/// struct Texture(&'static str);
/// impl ResourceAdapter<&'static str> for Texture {
///     fn resource(&self) -> Option<&'static str> { Some(self.0) }
///     fn dispose(&mut self) -> Result<(), AdapterError> { Ok(()) }
/// }
///
/// let handle = Handle::new(Texture("grass.png"));
/// let mut a = handle.new_reference();
/// let mut b = handle.new_reference();
/// assert_eq!(handle.reference_count(), 2);
///
/// a.dispose();
/// assert!(handle.is_alive());
/// b.dispose();
/// assert!(!handle.is_alive());
/// assert_eq!(a.resource(), None);
/// ```
pub struct Handle<T: Payload> {
    shell: Arc<Shell<T>>,
    generation: Generation,
}

impl<T: Payload> Handle<T> {
    /// Creates a handle around `adapter`, reusing a pooled shell when one is
    /// available on this thread.
    ///
    /// The handle captures the thread's current [`Reclaimer`], if any.
    #[must_use]
    pub fn new(adapter: impl ResourceAdapter<T>) -> Self {
        Self::from_boxed(Box::new(adapter))
    }

    /// Creates a handle from an optional adapter.
    ///
    /// # Errors
    ///
    /// [`TetherError::MissingResource`] if `adapter` is `None`.
    pub fn try_new<A: ResourceAdapter<T>>(adapter: Option<A>) -> Result<Self, TetherError> {
        adapter.map(Self::new).ok_or(TetherError::MissingResource)
    }

    /// Creates a handle around an already boxed adapter.
    #[must_use]
    pub fn from_boxed(adapter: Box<dyn ResourceAdapter<T>>) -> Self {
        let origin = TetherConfig::current()
            .capture_backtraces
            .then(Backtrace::force_capture);
        let shell = Pool::<T>::acquire();
        let generation = shell.install(adapter, Reclaimer::current(), origin);
        Self { shell, generation }
    }

    /// Issues a new counted claim.
    ///
    /// Returns a dead reference if this handle's life has ended.
    #[must_use]
    pub fn new_reference(&self) -> Reference<T> {
        Reference::claim(&self.shell, self.generation)
    }

    /// Ends this life now, even if references are outstanding.
    ///
    /// Outstanding references immediately report "not alive". Whether a
    /// dispose with outstanding references proceeds is governed by
    /// [`TetherConfig::forced_dispose`]. Returns `true` if this call
    /// performed the disposal; repeated calls are no-ops.
    pub fn dispose(&self) -> bool {
        self.shell.dispose(self.generation)
    }

    /// Ends this life only if no references are outstanding.
    ///
    /// Returns `Ok(false)` if the life had already ended.
    ///
    /// # Errors
    ///
    /// [`TetherError::ReferencesOutstanding`] if claims remain; the handle
    /// stays live.
    pub fn try_dispose(&self) -> Result<bool, TetherError> {
        self.shell.try_dispose(self.generation)
    }

    /// Whether this life is still running.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.shell.is_live(self.generation)
    }

    /// Whether this life has ended.
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        !self.is_alive()
    }

    /// Outstanding claims; zero once the life has ended.
    #[must_use]
    pub fn reference_count(&self) -> i32 {
        self.shell.reference_count(self.generation)
    }

    /// The generation this handle was issued under.
    #[must_use]
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Identity of this handle life.
    #[must_use]
    pub fn id(&self) -> HandleId {
        HandleId::new(self.shell.shell_id(), self.generation)
    }

    /// The adapter's description while live.
    #[must_use]
    pub fn description(&self) -> Option<String> {
        self.shell
            .description(self.generation)
            .map(Cow::into_owned)
    }

    /// The resource, or `None` once disposed or while the adapter is empty.
    #[must_use]
    pub fn resource(&self) -> Option<T> {
        self.shell.resource(self.generation)
    }

    /// The resource, or `T::default()` once disposed.
    #[must_use]
    pub fn resource_or_default(&self) -> T
    where
        T: Default,
    {
        self.resource().unwrap_or_default()
    }

    /// Registers a callback run right before the adapter is disposed.
    ///
    /// Observers run synchronously in registration order and receive the
    /// resource one last time. A panicking observer is logged and does not
    /// affect the others. Returns `None` if the life has already ended.
    pub fn on_pre_dispose(
        &self,
        observer: impl FnOnce(Option<&T>) + Send + 'static,
    ) -> Option<ObserverId> {
        self.shell.add_observer(self.generation, Box::new(observer))
    }

    /// Unregisters a pre-dispose observer. Returns `false` if it was not
    /// registered on this life.
    pub fn remove_pre_dispose_observer(&self, id: ObserverId) -> bool {
        self.shell.remove_observer(self.generation, id)
    }
}

impl<T: Payload> Drop for Handle<T> {
    fn drop(&mut self) {
        // A handle that never handed out its resource and was never disposed
        // has leaked it.
        self.shell.release_leaked(self.generation, Leak::Handle);
    }
}

impl<T: Payload> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("id", &self.id())
            .field("alive", &self.is_alive())
            .field("reference_count", &self.reference_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::AdapterError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone, Default)]
    struct Counters {
        disposed: Arc<AtomicUsize>,
    }

    impl Counters {
        fn count(&self) -> usize {
            self.disposed.load(Ordering::SeqCst)
        }
    }

    struct Value {
        value: i64,
        counters: Counters,
    }

    impl ResourceAdapter<i64> for Value {
        fn resource(&self) -> Option<i64> {
            Some(self.value)
        }

        fn dispose(&mut self) -> Result<(), AdapterError> {
            self.counters.disposed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn handle(value: i64, counters: &Counters) -> Handle<i64> {
        Handle::new(Value {
            value,
            counters: counters.clone(),
        })
    }

    #[test]
    fn new_handle_has_zero_references() {
        let counters = Counters::default();
        let handle = handle(5, &counters);

        assert!(handle.is_alive());
        assert_eq!(handle.reference_count(), 0);
        assert_eq!(handle.resource(), Some(5));
        assert!(handle.dispose());
    }

    #[test]
    fn try_new_rejects_missing_resource() {
        let result = Handle::<i64>::try_new(None::<Value>);
        assert!(matches!(result, Err(TetherError::MissingResource)));
    }

    #[test]
    fn dispose_is_idempotent() {
        let counters = Counters::default();
        let handle = handle(1, &counters);

        assert!(handle.dispose());
        assert!(!handle.dispose());
        assert_eq!(counters.count(), 1);
        assert!(handle.is_disposed());
    }

    #[test]
    fn disposed_handle_returns_default() {
        let counters = Counters::default();
        let handle = handle(42, &counters);
        handle.dispose();

        assert_eq!(handle.resource(), None);
        assert_eq!(handle.resource_or_default(), 0);
        assert_eq!(handle.reference_count(), 0);
    }

    #[test]
    fn new_reference_on_disposed_handle_is_dead() {
        let counters = Counters::default();
        let handle = handle(1, &counters);
        handle.dispose();

        let reference = handle.new_reference();
        assert!(!reference.is_alive());
        assert_eq!(handle.reference_count(), 0);
    }

    #[test]
    fn forced_dispose_kills_outstanding_references() {
        let counters = Counters::default();
        let handle = handle(3, &counters);
        let mut a = handle.new_reference();
        let b = handle.new_reference();

        assert!(handle.dispose());
        assert!(!a.is_alive());
        assert!(!b.is_alive());
        assert_eq!(counters.count(), 1);

        // Disposing a reference to the ended life does not dispose again.
        a.dispose();
        assert_eq!(counters.count(), 1);
        drop(b);
        assert_eq!(counters.count(), 1);
    }

    #[test]
    fn try_dispose_keeps_handle_with_references() {
        let counters = Counters::default();
        let handle = handle(3, &counters);
        let mut reference = handle.new_reference();

        assert!(handle.try_dispose().is_err());
        assert!(handle.is_alive());

        reference.dispose();
        assert_eq!(counters.count(), 1);
        assert_eq!(handle.try_dispose().ok(), Some(false));
    }

    #[test]
    fn observers_run_in_order_before_dispose() {
        let counters = Counters::default();
        let handle = handle(8, &counters);
        let log = Arc::new(parking_lot::Mutex::new(Vec::new()));

        for name in ["first", "second"] {
            let log = Arc::clone(&log);
            let counters = counters.clone();
            handle
                .on_pre_dispose(move |resource| {
                    log.lock().push((name, resource.copied(), counters.count()));
                })
                .expect("handle is live");
        }

        handle.dispose();
        assert_eq!(
            *log.lock(),
            vec![("first", Some(8), 0), ("second", Some(8), 0)]
        );
    }

    #[test]
    fn panicking_observer_does_not_block_others() {
        let counters = Counters::default();
        let handle = handle(1, &counters);
        let ran = Arc::new(AtomicUsize::new(0));

        handle.on_pre_dispose(|_| panic!("observer failure"));
        let counter = Arc::clone(&ran);
        handle.on_pre_dispose(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(handle.dispose());
        assert_eq!(ran.load(Ordering::SeqCst), 1);
        assert_eq!(counters.count(), 1);
    }

    #[test]
    fn removed_observer_does_not_run() {
        let counters = Counters::default();
        let handle = handle(1, &counters);
        let ran = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ran);

        let id = handle
            .on_pre_dispose(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .expect("handle is live");
        assert!(handle.remove_pre_dispose_observer(id));
        assert!(!handle.remove_pre_dispose_observer(id));

        handle.dispose();
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn observer_on_disposed_handle_is_rejected() {
        let counters = Counters::default();
        let handle = handle(1, &counters);
        handle.dispose();

        assert!(handle.on_pre_dispose(|_| {}).is_none());
    }

    #[test]
    fn dropping_unclaimed_handle_releases_it() {
        let counters = Counters::default();
        drop(handle(1, &counters));
        assert_eq!(counters.count(), 1);
    }

    #[test]
    fn dropping_claimed_handle_keeps_resource() {
        let counters = Counters::default();
        let handle = handle(1, &counters);
        let mut reference = handle.new_reference();
        drop(handle);

        assert!(reference.is_alive());
        assert_eq!(reference.resource(), Some(1));
        reference.dispose();
        assert_eq!(counters.count(), 1);
    }
}
