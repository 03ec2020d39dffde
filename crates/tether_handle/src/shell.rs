//! The pooled state block behind every handle.
//!
//! A [`Shell`] is allocated once and reused for many unrelated handle lives.
//! Each life is identified by the shell's generation at install time; every
//! operation takes the generation the caller was issued and is a no-op when
//! it no longer matches. That check is what turns use-after-release into a
//! harmless "not alive".
//!
//! The shell lock is never held while user code (observers, adapter
//! `dispose`, adapter `Drop`) runs.

use std::backtrace::{Backtrace, BacktraceStatus};
use std::borrow::Cow;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::adapter::{Payload, ResourceAdapter};
use crate::config::{ForcedDisposePolicy, TetherConfig};
use crate::error::{AccessError, TetherError};
use crate::generation::{Generation, HandleId, ShellId};
use crate::observer::{ObserverId, ObserverList, PreDisposeFn};
use crate::pool::Pool;
use crate::reclaimer::{Reclaimer, WeakReclaimer};

/// What ended a handle life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DisposeCause {
    /// `Handle::dispose` was called.
    Explicit,
    /// The reference count dropped to zero.
    LastReference,
    /// The leak safety net cleaned up an abandoned handle.
    Leaked,
}

/// Which kind of owner was dropped without being disposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Leak {
    Reference,
    Handle,
}

impl Leak {
    const fn as_str(self) -> &'static str {
        match self {
            Leak::Reference => "reference",
            Leak::Handle => "handle",
        }
    }
}

pub(crate) struct Shell<T: Payload> {
    id: ShellId,
    state: Mutex<LifeState<T>>,
}

struct LifeState<T> {
    generation: Generation,
    live: bool,
    reference_count: i32,
    next_claim: u64,
    adapter: Option<Box<dyn ResourceAdapter<T>>>,
    description: Cow<'static, str>,
    observers: ObserverList<T>,
    origin: Option<Arc<Backtrace>>,
    reclaimer: Option<WeakReclaimer>,
}

/// Everything moved out of a life under the lock, torn down outside it.
struct Teardown<T> {
    id: HandleId,
    adapter: Option<Box<dyn ResourceAdapter<T>>>,
    observers: Vec<(ObserverId, PreDisposeFn<T>)>,
    description: Cow<'static, str>,
}

impl<T> LifeState<T> {
    fn is_live(&self, generation: Generation) -> bool {
        self.live && self.generation == generation
    }

    fn begin_teardown(&mut self, shell: ShellId) -> Teardown<T> {
        self.live = false;
        self.reference_count = 0;
        Teardown {
            id: HandleId::new(shell, self.generation),
            adapter: self.adapter.take(),
            observers: self.observers.take(),
            description: core::mem::take(&mut self.description),
        }
    }

    fn reset(&mut self) {
        self.next_claim = 0;
        self.origin = None;
        self.reclaimer = None;
    }
}

impl<T: Payload> Shell<T> {
    pub(crate) fn new() -> Self {
        Self {
            id: ShellId::next(),
            state: Mutex::new(LifeState {
                generation: Generation::UNUSED,
                live: false,
                reference_count: 0,
                next_claim: 0,
                adapter: None,
                description: Cow::Borrowed(""),
                observers: ObserverList::new(),
                origin: None,
                reclaimer: None,
            }),
        }
    }

    pub(crate) fn shell_id(&self) -> ShellId {
        self.id
    }

    /// Starts a new life on this shell and returns its generation.
    pub(crate) fn install(
        &self,
        adapter: Box<dyn ResourceAdapter<T>>,
        reclaimer: Option<Reclaimer>,
        origin: Option<Backtrace>,
    ) -> Generation {
        let description = adapter.describe();
        let mut state = self.state.lock();
        state.generation.advance();
        state.live = true;
        state.reference_count = 0;
        state.next_claim = 0;
        state.adapter = Some(adapter);
        state.observers = ObserverList::new();
        state.origin = origin.map(Arc::new);
        state.reclaimer = reclaimer.as_ref().map(Reclaimer::downgrade);

        tracing::debug!(
            handle = %HandleId::new(self.id, state.generation),
            resource = %description,
            "handle created"
        );
        state.description = description;
        state.generation
    }

    pub(crate) fn is_live(&self, generation: Generation) -> bool {
        self.state.lock().is_live(generation)
    }

    pub(crate) fn reference_count(&self, generation: Generation) -> i32 {
        let state = self.state.lock();
        if state.is_live(generation) {
            state.reference_count
        } else {
            0
        }
    }

    pub(crate) fn resource(&self, generation: Generation) -> Option<T> {
        self.access(generation).ok()
    }

    pub(crate) fn access(&self, generation: Generation) -> Result<T, AccessError> {
        let id = HandleId::new(self.id, generation);
        let state = self.state.lock();
        if !state.is_live(generation) {
            return Err(AccessError::Stale(id));
        }
        state
            .adapter
            .as_ref()
            .and_then(|adapter| adapter.resource())
            .ok_or(AccessError::Empty(id))
    }

    /// Records a new claim; returns its claim number, or `None` if the life
    /// is over.
    pub(crate) fn add_reference(&self, generation: Generation) -> Option<u64> {
        let mut state = self.state.lock();
        if !state.is_live(generation) {
            return None;
        }
        state.reference_count += 1;
        let claim = state.next_claim;
        state.next_claim += 1;
        Some(claim)
    }

    /// Drops one claim and ends the life once no claims remain.
    pub(crate) fn remove_reference(self: &Arc<Self>, generation: Generation) {
        let teardown = {
            let mut state = self.state.lock();
            if !state.is_live(generation) {
                return;
            }
            state.reference_count -= 1;
            if state.reference_count > 0 {
                return;
            }
            state.begin_teardown(self.id)
        };
        self.finish_teardown(teardown, DisposeCause::LastReference);
    }

    /// Ends the life regardless of outstanding claims, subject to the
    /// configured [`ForcedDisposePolicy`].
    ///
    /// Returns `true` if this call performed the disposal.
    pub(crate) fn dispose(self: &Arc<Self>, generation: Generation) -> bool {
        let policy = TetherConfig::current().forced_dispose;
        let teardown = {
            let mut state = self.state.lock();
            if !state.is_live(generation) {
                return false;
            }
            let outstanding = state.reference_count;
            if outstanding > 0 {
                let id = HandleId::new(self.id, generation);
                match policy {
                    ForcedDisposePolicy::Warn => tracing::warn!(
                        handle = %id,
                        resource = %state.description,
                        outstanding,
                        "disposing handle with outstanding references"
                    ),
                    ForcedDisposePolicy::Allow => {}
                    ForcedDisposePolicy::Deny => {
                        tracing::error!(
                            handle = %id,
                            resource = %state.description,
                            outstanding,
                            "refusing to dispose handle with outstanding references"
                        );
                        return false;
                    }
                }
            }
            state.begin_teardown(self.id)
        };
        self.finish_teardown(teardown, DisposeCause::Explicit);
        true
    }

    /// Ends the life only if no claims are outstanding.
    pub(crate) fn try_dispose(self: &Arc<Self>, generation: Generation) -> Result<bool, TetherError> {
        let teardown = {
            let mut state = self.state.lock();
            if !state.is_live(generation) {
                return Ok(false);
            }
            if state.reference_count > 0 {
                return Err(TetherError::ReferencesOutstanding {
                    id: HandleId::new(self.id, generation),
                    outstanding: state.reference_count,
                });
            }
            state.begin_teardown(self.id)
        };
        self.finish_teardown(teardown, DisposeCause::Explicit);
        Ok(true)
    }

    pub(crate) fn add_observer(
        &self,
        generation: Generation,
        observer: PreDisposeFn<T>,
    ) -> Option<ObserverId> {
        let mut state = self.state.lock();
        if !state.is_live(generation) {
            return None;
        }
        Some(state.observers.push(observer))
    }

    pub(crate) fn remove_observer(&self, generation: Generation, id: ObserverId) -> bool {
        let mut state = self.state.lock();
        state.is_live(generation) && state.observers.remove(id)
    }

    pub(crate) fn description(&self, generation: Generation) -> Option<Cow<'static, str>> {
        let state = self.state.lock();
        state
            .is_live(generation)
            .then(|| state.description.clone())
    }

    /// Leak safety net entry point: an owner was dropped without disposing.
    ///
    /// Logs the leak and hands the release to the life's reclaimer, or runs
    /// it inline when the life was created outside any reclaimer or that
    /// reclaimer is gone.
    pub(crate) fn release_leaked(self: &Arc<Self>, generation: Generation, leak: Leak) {
        let (reclaimer, origin, description) = {
            let state = self.state.lock();
            if !state.is_live(generation) {
                return;
            }
            if leak == Leak::Handle && state.reference_count > 0 {
                // References own the life now.
                return;
            }
            (
                state.reclaimer.as_ref().and_then(WeakReclaimer::upgrade),
                state.origin.clone(),
                state.description.clone(),
            )
        };

        let id = HandleId::new(self.id, generation);
        match origin.as_deref() {
            Some(backtrace) if backtrace.status() == BacktraceStatus::Captured => {
                tracing::warn!(
                    handle = %id,
                    resource = %description,
                    kind = leak.as_str(),
                    acquired_at = %backtrace,
                    "dropped without dispose; deferring release"
                );
            }
            _ => tracing::warn!(
                handle = %id,
                resource = %description,
                kind = leak.as_str(),
                "dropped without dispose; deferring release"
            ),
        }

        let shell = Arc::clone(self);
        let release = move || match leak {
            Leak::Reference => shell.remove_reference(generation),
            Leak::Handle => shell.dispose_leaked(generation),
        };
        match reclaimer {
            Some(reclaimer) => reclaimer.defer(id, Box::new(release)),
            None => release(),
        }
    }

    fn dispose_leaked(self: &Arc<Self>, generation: Generation) {
        let teardown = {
            let mut state = self.state.lock();
            if !state.is_live(generation) || state.reference_count > 0 {
                return;
            }
            state.begin_teardown(self.id)
        };
        self.finish_teardown(teardown, DisposeCause::Leaked);
    }

    /// Runs observers, disposes the adapter, resets the shell and returns it
    /// to the calling thread's pool. Nothing raised here escapes.
    fn finish_teardown(self: &Arc<Self>, teardown: Teardown<T>, cause: DisposeCause) {
        let Teardown {
            id,
            adapter,
            observers,
            description,
        } = teardown;

        let resource = adapter.as_ref().and_then(|adapter| {
            catch_unwind(AssertUnwindSafe(|| adapter.resource()))
                .ok()
                .flatten()
        });
        for (observer_id, observer) in observers {
            if catch_unwind(AssertUnwindSafe(|| observer(resource.as_ref()))).is_err() {
                tracing::error!(
                    handle = %id,
                    resource = %description,
                    observer = %observer_id,
                    "pre-dispose observer panicked"
                );
            }
        }
        drop(resource);

        if let Some(mut adapter) = adapter {
            match catch_unwind(AssertUnwindSafe(|| adapter.dispose())) {
                Ok(Ok(())) => {}
                Ok(Err(error)) => tracing::warn!(
                    handle = %id,
                    resource = %description,
                    %error,
                    "resource adapter failed to dispose"
                ),
                Err(_) => tracing::error!(
                    handle = %id,
                    resource = %description,
                    "resource adapter panicked while disposing"
                ),
            }
            if catch_unwind(AssertUnwindSafe(move || drop(adapter))).is_err() {
                tracing::error!(
                    handle = %id,
                    resource = %description,
                    "resource adapter panicked while dropping"
                );
            }
        }

        self.state.lock().reset();
        tracing::debug!(handle = %id, resource = %description, ?cause, "handle disposed");
        if id.generation().is_exhausted() {
            tracing::debug!(shell = %self.id, "generations exhausted; retiring shell");
            return;
        }
        Pool::recycle(Arc::clone(self));
    }
}
