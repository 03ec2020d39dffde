//! Plain values with an optional release callback.

use std::borrow::Cow;

use tether_handle::{AdapterError, Payload, ResourceAdapter};

/// Callback receiving the value when its handle is disposed.
pub type ReleaseFn<T> = Box<dyn FnOnce(T) + Send>;

/// Adapter around a bare value.
///
/// The value is handed out by clone. On dispose, the optional callback
/// receives the value itself; without one the value is simply dropped.
pub struct ValueAdapter<T> {
    value: Option<T>,
    on_dispose: Option<ReleaseFn<T>>,
}

impl<T: Payload> ValueAdapter<T> {
    /// Wraps `value` with no release logic.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            value: Some(value),
            on_dispose: None,
        }
    }

    /// Wraps `value` and runs `on_dispose` with it when the handle is
    /// disposed.
    #[must_use]
    pub fn with_dispose(value: T, on_dispose: impl FnOnce(T) + Send + 'static) -> Self {
        Self {
            value: Some(value),
            on_dispose: Some(Box::new(on_dispose)),
        }
    }
}

impl<T: Payload> ResourceAdapter<T> for ValueAdapter<T> {
    fn resource(&self) -> Option<T> {
        self.value.clone()
    }

    fn dispose(&mut self) -> Result<(), AdapterError> {
        if let (Some(value), Some(on_dispose)) = (self.value.take(), self.on_dispose.take()) {
            on_dispose(value);
        }
        Ok(())
    }

    fn describe(&self) -> Cow<'static, str> {
        Cow::Owned(format!("value<{}>", core::any::type_name::<T>()))
    }
}
