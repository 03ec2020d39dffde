//! Resources produced by an asynchronous load.
//!
//! The adapter sits in front of a oneshot channel. Until the loader reports,
//! the handle is live but empty: `resource()` returns `None` and
//! [`Reference::try_resource`](tether_handle::Reference::try_resource)
//! reports [`AccessError::Empty`](tether_handle::AccessError::Empty).
//! Disposing a handle whose load is still in flight cancels the load. A
//! value delivered through a [`LoadSender`] after that point is handed to
//! the unload callback by [`LoadSender::send`] instead of being dropped.

use std::borrow::Cow;
use std::sync::Arc;

use parking_lot::Mutex;
use tether_handle::{AdapterError, Payload, ResourceAdapter};
use tokio::sync::oneshot::{self, error::TryRecvError};
use tokio::task::AbortHandle;

use crate::error::LoadError;
use crate::value::ReleaseFn;

type SharedUnload<T> = Arc<Mutex<Option<ReleaseFn<T>>>>;

/// Sending half handed to whoever performs the load.
///
/// Shares the adapter's unload callback so a value that arrives after the
/// handle was disposed is still unloaded.
pub struct LoadSender<T> {
    sender: oneshot::Sender<Result<T, LoadError>>,
    unload: SharedUnload<T>,
}

impl<T> LoadSender<T> {
    /// Reports the load result. Returns `false` when the adapter was
    /// already disposed; a successful value is then unloaded here.
    pub fn send(self, result: Result<T, LoadError>) -> bool {
        match self.sender.send(result) {
            Ok(()) => true,
            Err(Ok(value)) => {
                let on_unload = self.unload.lock().take();
                if let Some(on_unload) = on_unload {
                    on_unload(value);
                }
                tracing::debug!(
                    resource = core::any::type_name::<T>(),
                    "load finished after dispose; unloaded"
                );
                false
            }
            Err(Err(_)) => false,
        }
    }

    /// Whether the adapter stopped listening.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

enum LoadState<T> {
    Pending(oneshot::Receiver<Result<T, LoadError>>),
    Loaded(T),
    Failed,
    Finished,
}

impl<T> LoadState<T> {
    /// Moves a pending load forward if its result has arrived.
    fn poll(&mut self) {
        let Self::Pending(receiver) = self else {
            return;
        };
        match receiver.try_recv() {
            Err(TryRecvError::Empty) => {}
            Ok(Ok(value)) => *self = Self::Loaded(value),
            Ok(Err(error)) => {
                tracing::warn!(%error, "asynchronous load failed");
                *self = Self::Failed;
            }
            Err(TryRecvError::Closed) => {
                tracing::warn!(error = %LoadError::Abandoned, "asynchronous load failed");
                *self = Self::Failed;
            }
        }
    }
}

/// Adapter over an in-flight or completed asynchronous load.
pub struct AsyncLoadAdapter<T> {
    state: Mutex<LoadState<T>>,
    task: Option<AbortHandle>,
    on_unload: SharedUnload<T>,
}

impl<T: Payload> AsyncLoadAdapter<T> {
    /// Wraps the receiving half of a load.
    ///
    /// A raw oneshot sender does not see the unload callback: a value it
    /// sends after dispose comes back as its `Err`. Use
    /// [`channel`](Self::channel) to have late values unloaded.
    #[must_use]
    pub fn new(receiver: oneshot::Receiver<Result<T, LoadError>>) -> Self {
        Self {
            state: Mutex::new(LoadState::Pending(receiver)),
            task: None,
            on_unload: Arc::default(),
        }
    }

    /// Creates an adapter together with the sender its loader reports to.
    #[must_use]
    pub fn channel() -> (LoadSender<T>, Self) {
        let (sender, receiver) = oneshot::channel();
        let adapter = Self::new(receiver);
        let sender = LoadSender {
            sender,
            unload: Arc::clone(&adapter.on_unload),
        };
        (sender, adapter)
    }

    /// Wraps a load that has already completed.
    #[must_use]
    pub fn ready(value: T) -> Self {
        Self {
            state: Mutex::new(LoadState::Loaded(value)),
            task: None,
            on_unload: Arc::default(),
        }
    }

    /// Runs `future` on the ambient tokio runtime and wraps its result.
    ///
    /// Disposing the handle before the future finishes aborts the task.
    ///
    /// # Errors
    ///
    /// [`LoadError::NoRuntime`] when called outside a tokio runtime.
    pub fn spawn<F>(future: F) -> Result<Self, LoadError>
    where
        F: Future<Output = Result<T, LoadError>> + Send + 'static,
    {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| LoadError::NoRuntime)?;
        let (sender, mut adapter) = Self::channel();
        let task = runtime.spawn(async move {
            // False once the handle is gone; the sender has unloaded the value.
            sender.send(future.await);
        });
        adapter.task = Some(task.abort_handle());
        Ok(adapter)
    }

    /// Runs `on_unload` with the loaded value when the handle is disposed,
    /// or when the value arrives after disposal.
    #[must_use]
    pub fn with_unload(self, on_unload: impl FnOnce(T) + Send + 'static) -> Self {
        *self.on_unload.lock() = Some(Box::new(on_unload));
        self
    }

    /// Whether the load has not reported yet.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        let mut state = self.state.lock();
        state.poll();
        matches!(*state, LoadState::Pending(_))
    }

    fn unload(&self, value: T) {
        let on_unload = self.on_unload.lock().take();
        if let Some(on_unload) = on_unload {
            on_unload(value);
        }
    }
}

impl<T: Payload> ResourceAdapter<T> for AsyncLoadAdapter<T> {
    fn resource(&self) -> Option<T> {
        let mut state = self.state.lock();
        state.poll();
        match &*state {
            LoadState::Loaded(value) => Some(value.clone()),
            _ => None,
        }
    }

    fn dispose(&mut self) -> Result<(), AdapterError> {
        let state = core::mem::replace(self.state.get_mut(), LoadState::Finished);
        match state {
            LoadState::Pending(mut receiver) => {
                if let Some(task) = self.task.take() {
                    task.abort();
                }
                receiver.close();
                // A result sent before `close` is still buffered.
                if let Ok(Ok(value)) = receiver.try_recv() {
                    self.unload(value);
                } else {
                    tracing::debug!(
                        resource = core::any::type_name::<T>(),
                        "cancelled in-flight load"
                    );
                }
            }
            LoadState::Loaded(value) => self.unload(value),
            LoadState::Failed | LoadState::Finished => {}
        }
        Ok(())
    }

    fn describe(&self) -> Cow<'static, str> {
        Cow::Owned(format!("async load<{}>", core::any::type_name::<T>()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn empty_until_sent() {
        let (sender, adapter) = AsyncLoadAdapter::<u32>::channel();
        assert!(adapter.is_pending());
        assert_eq!(adapter.resource(), None);

        assert!(sender.send(Ok(12)));
        assert_eq!(adapter.resource(), Some(12));
        assert!(!adapter.is_pending());
    }

    #[test]
    fn failed_load_stays_empty() {
        let (sender, adapter) = AsyncLoadAdapter::<u32>::channel();
        assert!(sender.send(Err(LoadError::failed("missing bundle"))));

        assert_eq!(adapter.resource(), None);
        assert!(!adapter.is_pending());
    }

    #[test]
    fn dropped_sender_counts_as_failure() {
        let (sender, adapter) = AsyncLoadAdapter::<u32>::channel();
        drop(sender);
        assert_eq!(adapter.resource(), None);
        assert!(!adapter.is_pending());
    }

    #[test]
    fn dispose_cancels_pending_load() {
        let (sender, mut adapter) = AsyncLoadAdapter::<u32>::channel();
        adapter.dispose().expect("cancel never fails");
        assert!(sender.is_closed());
        assert!(!sender.send(Ok(1)));
    }

    #[test]
    fn value_arriving_after_dispose_is_unloaded() {
        let unloaded = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&unloaded);
        let (sender, adapter) = AsyncLoadAdapter::<u32>::channel();
        let mut adapter = adapter.with_unload(move |value| seen.lock().push(value));

        adapter.dispose().expect("cancel never fails");
        assert!(unloaded.lock().is_empty());

        assert!(!sender.send(Ok(7)));
        assert_eq!(*unloaded.lock(), vec![7]);
    }

    #[test]
    fn late_failure_unloads_nothing() {
        let unloaded = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&unloaded);
        let (sender, adapter) = AsyncLoadAdapter::<u32>::channel();
        let mut adapter = adapter.with_unload(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        adapter.dispose().expect("cancel never fails");
        assert!(!sender.send(Err(LoadError::Abandoned)));
        assert_eq!(unloaded.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn dispose_unloads_completed_value() {
        let unloaded = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&unloaded);
        let mut adapter = AsyncLoadAdapter::ready(String::from("bundle")).with_unload(move |value| {
            assert_eq!(value, "bundle");
            counter.fetch_add(1, Ordering::SeqCst);
        });

        adapter.dispose().expect("unload never fails");
        adapter.dispose().expect("second dispose is a no-op");
        assert_eq!(unloaded.load(Ordering::SeqCst), 1);
        assert_eq!(adapter.resource(), None);
    }

    #[test]
    fn value_arriving_before_dispose_is_unloaded() {
        let unloaded = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&unloaded);
        let (sender, adapter) = AsyncLoadAdapter::<u8>::channel();
        let mut adapter = adapter.with_unload(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        // Sent but never observed through `resource()`.
        assert!(sender.send(Ok(5)));
        adapter.dispose().expect("unload never fails");
        assert_eq!(unloaded.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn spawn_requires_runtime() {
        let result = AsyncLoadAdapter::spawn(async { Ok(1_u8) });
        assert!(matches!(result, Err(LoadError::NoRuntime)));
    }
}
