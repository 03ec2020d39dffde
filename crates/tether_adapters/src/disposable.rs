//! Values that know how to release themselves.

use std::borrow::Cow;

use tether_handle::{AdapterError, Payload, ResourceAdapter};

/// A value with its own release routine.
///
/// Implement this for types that are cheap to clone but own something that
/// must be given back exactly once, such as a pooled buffer lease.
pub trait Dispose {
    /// Releases whatever this value owns.
    ///
    /// # Errors
    ///
    /// Any failure to release; it is logged by the handle.
    fn dispose(&mut self) -> Result<(), AdapterError>;
}

/// Adapter around a [`Dispose`] value.
pub struct DisposableAdapter<D> {
    value: Option<D>,
}

impl<D: Dispose + Payload> DisposableAdapter<D> {
    /// Wraps `value`.
    #[must_use]
    pub fn new(value: D) -> Self {
        Self { value: Some(value) }
    }
}

impl<D: Dispose + Payload> ResourceAdapter<D> for DisposableAdapter<D> {
    fn resource(&self) -> Option<D> {
        self.value.clone()
    }

    fn dispose(&mut self) -> Result<(), AdapterError> {
        match self.value.take() {
            Some(mut value) => Dispose::dispose(&mut value),
            None => Ok(()),
        }
    }

    fn describe(&self) -> Cow<'static, str> {
        Cow::Owned(format!("disposable<{}>", core::any::type_name::<D>()))
    }
}
