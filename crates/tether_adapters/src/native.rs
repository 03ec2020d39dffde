//! Host-native objects that are either owned or borrowed.
//!
//! An owned object was instantiated for this handle alone and is destroyed
//! with it. A borrowed object is a shared asset owned by someone else; the
//! handle only gives back its claim on it.

use std::borrow::Cow;

use tether_handle::{AdapterError, ResourceAdapter};

/// A native object the adapter can destroy or release.
///
/// Implementors are usually cheap handles (ids, `Arc`s) into a native
/// system; the adapter hands out clones of them.
pub trait NativeObject: Clone + Send + 'static {
    /// Destroys an instance this handle owned.
    ///
    /// # Errors
    ///
    /// Any failure reported by the native system.
    fn destroy(self) -> Result<(), AdapterError>;

    /// Gives back a borrowed shared asset. Does nothing by default.
    ///
    /// # Errors
    ///
    /// Any failure reported by the native system.
    fn release(self) -> Result<(), AdapterError> {
        Ok(())
    }

    /// Human readable name for logs.
    fn name(&self) -> Cow<'static, str> {
        Cow::Borrowed(core::any::type_name::<Self>())
    }
}

/// Whether a [`NativeAdapter`] destroys or merely releases its object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Ownership {
    /// The object is an instance owned by this handle; dispose destroys it.
    #[default]
    Owned,
    /// The object is a shared asset; dispose only releases it.
    Borrowed,
}

/// Adapter around a [`NativeObject`].
pub struct NativeAdapter<O> {
    object: Option<O>,
    ownership: Ownership,
}

impl<O: NativeObject> NativeAdapter<O> {
    /// Wraps `object` with the given ownership.
    #[must_use]
    pub fn new(object: O, ownership: Ownership) -> Self {
        Self {
            object: Some(object),
            ownership,
        }
    }

    /// Wraps an instance that is destroyed on dispose.
    #[must_use]
    pub fn owned(object: O) -> Self {
        Self::new(object, Ownership::Owned)
    }

    /// Wraps a shared asset that is released on dispose.
    #[must_use]
    pub fn borrowed(object: O) -> Self {
        Self::new(object, Ownership::Borrowed)
    }

    /// How the object is disposed.
    #[must_use]
    pub fn ownership(&self) -> Ownership {
        self.ownership
    }
}

impl<O: NativeObject> ResourceAdapter<O> for NativeAdapter<O> {
    fn resource(&self) -> Option<O> {
        self.object.clone()
    }

    fn dispose(&mut self) -> Result<(), AdapterError> {
        let Some(object) = self.object.take() else {
            return Ok(());
        };
        match self.ownership {
            Ownership::Owned => object.destroy(),
            Ownership::Borrowed => object.release(),
        }
    }

    fn describe(&self) -> Cow<'static, str> {
        let name = self
            .object
            .as_ref()
            .map_or(Cow::Borrowed("<released>"), NativeObject::name);
        match self.ownership {
            Ownership::Owned => Cow::Owned(format!("native {name} (owned)")),
            Ownership::Borrowed => Cow::Owned(format!("native {name} (borrowed)")),
        }
    }
}
