//! Counted claims against a handle.

use core::fmt;
use std::sync::Arc;

use crate::adapter::Payload;
use crate::dependent::{DependentResource, IntoDependencies};
use crate::erased::ErasedReference;
use crate::error::AccessError;
use crate::generation::{Generation, HandleId};
use crate::handle::Handle;
use crate::observer::ObserverId;
use crate::shell::{Leak, Shell};

/// One counted claim of ownership against a [`Handle`].
///
/// A reference keeps its handle's resource alive until it is disposed. Once
/// the handle life ends, for whatever reason, the reference reports
/// `is_alive() == false` and yields no resource; this holds even after the
/// underlying shell has been reused for an unrelated resource.
///
/// Cloning issues a *new* claim (the count goes up by one) and the clone must
/// be disposed separately. Dropping a live reference without disposing it is
/// treated as a leak: a warning is logged and the release is handed to the
/// leak safety net (see [`Reclaimer`](crate::Reclaimer)).
///
/// Equality is identity of the claim: a reference equals only itself, and
/// only while live.
pub struct Reference<T: Payload> {
    shell: Option<Arc<Shell<T>>>,
    generation: Generation,
    claim: u64,
    alive: bool,
}

impl<T: Payload> Reference<T> {
    pub(crate) fn claim(shell: &Arc<Shell<T>>, generation: Generation) -> Self {
        match shell.add_reference(generation) {
            Some(claim) => Self {
                shell: Some(Arc::clone(shell)),
                generation,
                claim,
                alive: true,
            },
            None => Self::dead(),
        }
    }

    /// A reference that was never alive.
    #[must_use]
    pub const fn dead() -> Self {
        Self {
            shell: None,
            generation: Generation::UNUSED,
            claim: 0,
            alive: false,
        }
    }

    /// Issues a sibling claim on the same handle life.
    ///
    /// Returns a dead reference if this reference or its handle is no longer
    /// alive.
    #[must_use]
    pub fn new_reference(&self) -> Self {
        match &self.shell {
            Some(shell) if self.alive => Self::claim(shell, self.generation),
            _ => Self::dead(),
        }
    }

    /// Releases this claim. Idempotent.
    ///
    /// Disposing the last claim of a live handle disposes its resource.
    /// Disposing a claim whose handle life already ended only marks the
    /// reference dead.
    pub fn dispose(&mut self) {
        if !core::mem::replace(&mut self.alive, false) {
            return;
        }
        if let Some(shell) = self.shell.take() {
            shell.remove_reference(self.generation);
        }
    }

    /// Whether this claim and its handle life are both still live.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.alive
            && self
                .shell
                .as_ref()
                .is_some_and(|shell| shell.is_live(self.generation))
    }

    /// The resource, or `None` if not alive or the adapter is empty.
    #[must_use]
    pub fn resource(&self) -> Option<T> {
        self.try_resource().ok()
    }

    /// The resource, or `T::default()` if not alive.
    #[must_use]
    pub fn resource_or_default(&self) -> T
    where
        T: Default,
    {
        self.resource().unwrap_or_default()
    }

    /// The resource, with the reason it is unavailable.
    ///
    /// # Errors
    ///
    /// - [`AccessError::Released`] if this reference was disposed or is dead
    /// - [`AccessError::Stale`] if the handle life has ended
    /// - [`AccessError::Empty`] if the adapter has nothing to hand out yet
    pub fn try_resource(&self) -> Result<T, AccessError> {
        match &self.shell {
            Some(shell) if self.alive => shell.access(self.generation),
            _ => Err(AccessError::Released),
        }
    }

    /// The generation of the handle life this claim was issued under.
    #[must_use]
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Identity of the handle life, while this reference holds a claim.
    #[must_use]
    pub fn handle_id(&self) -> Option<HandleId> {
        match &self.shell {
            Some(shell) if self.alive => Some(HandleId::new(shell.shell_id(), self.generation)),
            _ => None,
        }
    }

    /// Whether both references are live claims on the same handle life.
    #[must_use]
    pub fn same_handle(&self, other: &Self) -> bool {
        match (&self.shell, &other.shell) {
            (Some(a), Some(b)) => {
                self.is_alive()
                    && other.is_alive()
                    && Arc::ptr_eq(a, b)
                    && self.generation == other.generation
            }
            _ => false,
        }
    }

    /// Registers a pre-dispose observer on this reference's handle life.
    ///
    /// See [`Handle::on_pre_dispose`].
    pub fn on_pre_dispose(
        &self,
        observer: impl FnOnce(Option<&T>) + Send + 'static,
    ) -> Option<ObserverId> {
        match &self.shell {
            Some(shell) if self.alive => shell.add_observer(self.generation, Box::new(observer)),
            _ => None,
        }
    }

    /// Extends this resource's lifetime to cover `dependencies`.
    ///
    /// Consumes this claim and returns the first claim of a new handle whose
    /// resource is the same value. Disposing that handle disposes this claim
    /// first, then each dependency in order.
    #[must_use]
    pub fn with_dependencies(self, dependencies: impl IntoDependencies) -> Self {
        Handle::new(DependentResource::new(self, dependencies)).new_reference()
    }

    /// Type-erases this claim.
    #[must_use]
    pub fn erase(self) -> ErasedReference {
        ErasedReference::new(self)
    }
}

impl<T: Payload> Clone for Reference<T> {
    fn clone(&self) -> Self {
        self.new_reference()
    }
}

impl<T: Payload> Default for Reference<T> {
    fn default() -> Self {
        Self::dead()
    }
}

/// Two references are equal when they hold the same claim on the same live
/// handle.
///
/// Equality is not reflexive: a dead or stale reference compares unequal to
/// everything, itself included. For that reason `Reference` does not
/// implement `Eq` and must not be used as a map key.
impl<T: Payload> PartialEq for Reference<T> {
    fn eq(&self, other: &Self) -> bool {
        self.same_handle(other) && self.claim == other.claim
    }
}

impl<T: Payload> Drop for Reference<T> {
    fn drop(&mut self) {
        if !core::mem::replace(&mut self.alive, false) {
            return;
        }
        if let Some(shell) = self.shell.take() {
            shell.release_leaked(self.generation, Leak::Reference);
        }
    }
}

impl<T: Payload> fmt::Debug for Reference<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reference")
            .field("handle", &self.handle_id())
            .field("claim", &self.claim)
            .field("alive", &self.is_alive())
            .finish()
    }
}
