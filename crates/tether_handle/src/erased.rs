//! Type-erased references.
//!
//! Dependencies of a [`DependentResource`](crate::DependentResource) have
//! arbitrary payload types, so they are stored as [`ErasedReference`]s.

use core::fmt;

use downcast_rs::{Downcast, impl_downcast};

use crate::adapter::Payload;
use crate::generation::HandleId;
use crate::reference::Reference;

/// Object-safe view of a [`Reference`] of any payload type.
pub trait ReferenceClaim: Downcast + Send {
    /// Releases the claim. Idempotent.
    fn dispose(&mut self);

    /// Whether the claim and its handle life are still live.
    fn is_alive(&self) -> bool;

    /// Identity of the handle life, while the claim is held.
    fn handle_id(&self) -> Option<HandleId>;

    /// Name of the payload type, for diagnostics.
    fn payload_type(&self) -> &'static str;
}

impl_downcast!(ReferenceClaim);

impl<T: Payload> ReferenceClaim for Reference<T> {
    fn dispose(&mut self) {
        Reference::dispose(self);
    }

    fn is_alive(&self) -> bool {
        Reference::is_alive(self)
    }

    fn handle_id(&self) -> Option<HandleId> {
        Reference::handle_id(self)
    }

    fn payload_type(&self) -> &'static str {
        core::any::type_name::<T>()
    }
}

/// A [`Reference`] whose payload type has been erased.
///
/// Dropping it without disposing counts as a leak, exactly like dropping the
/// typed reference.
pub struct ErasedReference(Box<dyn ReferenceClaim>);

impl ErasedReference {
    /// Erases `reference`.
    #[must_use]
    pub fn new<T: Payload>(reference: Reference<T>) -> Self {
        Self(Box::new(reference))
    }

    /// Releases the claim. Idempotent.
    pub fn dispose(&mut self) {
        self.0.dispose();
    }

    /// Whether the claim and its handle life are still live.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.0.is_alive()
    }

    /// Identity of the handle life, while the claim is held.
    #[must_use]
    pub fn handle_id(&self) -> Option<HandleId> {
        self.0.handle_id()
    }

    /// Name of the erased payload type.
    #[must_use]
    pub fn payload_type(&self) -> &'static str {
        self.0.payload_type()
    }

    /// Recovers the typed reference.
    ///
    /// # Errors
    ///
    /// Returns `self` unchanged if the payload type is not `T`.
    pub fn downcast<T: Payload>(self) -> Result<Reference<T>, Self> {
        self.0
            .downcast::<Reference<T>>()
            .map(|boxed| *boxed)
            .map_err(Self)
    }
}

impl<T: Payload> From<Reference<T>> for ErasedReference {
    fn from(reference: Reference<T>) -> Self {
        Self::new(reference)
    }
}

impl fmt::Debug for ErasedReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErasedReference")
            .field("payload", &self.payload_type())
            .field("handle", &self.handle_id())
            .field("alive", &self.is_alive())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Handle;
    use crate::adapter::{AdapterError, ResourceAdapter};

    struct Unit;

    impl ResourceAdapter<u16> for Unit {
        fn resource(&self) -> Option<u16> {
            Some(16)
        }

        fn dispose(&mut self) -> Result<(), AdapterError> {
            Ok(())
        }
    }

    #[test]
    fn erased_reference_round_trips() {
        let handle = Handle::new(Unit);
        let erased = handle.new_reference().erase();

        assert!(erased.is_alive());
        assert_eq!(erased.payload_type(), "u16");
        assert_eq!(erased.handle_id(), Some(handle.id()));

        let erased = match erased.downcast::<u32>() {
            Ok(_) => panic!("payload is u16, not u32"),
            Err(erased) => erased,
        };
        let mut typed = erased.downcast::<u16>().expect("payload is u16");
        assert_eq!(typed.resource(), Some(16));
        typed.dispose();
        assert!(!handle.is_alive());
    }

    #[test]
    fn erased_dispose_releases_claim() {
        let handle = Handle::new(Unit);
        let mut erased = ErasedReference::from(handle.new_reference());

        erased.dispose();
        erased.dispose();
        assert!(!erased.is_alive());
        assert!(!handle.is_alive());
    }
}
