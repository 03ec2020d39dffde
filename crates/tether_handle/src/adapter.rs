//! The resource adapter contract.
//!
//! A [`ResourceAdapter`] wraps one payload value plus the action that
//! releases it. Handles only ever call the two methods of this trait; what a
//! "resource" is (a texture, a loaded bundle, a native object) is up to the
//! adapter.

use std::borrow::Cow;

/// Values that can flow out of a handle.
///
/// Payloads are handed out by value, so they are expected to be cheap to
/// clone: shared pointers, ids, small descriptors. Any type that is
/// `Clone + Send + 'static` automatically implements `Payload`.
pub trait Payload: Clone + Send + 'static {}

impl<T: Clone + Send + 'static> Payload for T {}

/// Wraps one payload value and knows how to release it.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use tether_handle::{AdapterError, ResourceAdapter};
///
/// struct Buffer {
///     bytes: Option<Arc<Vec<u8>>>,
/// }
///
/// impl ResourceAdapter<Arc<Vec<u8>>> for Buffer {
///     fn resource(&self) -> Option<Arc<Vec<u8>>> {
///         self.bytes.clone()
///     }
///
///     fn dispose(&mut self) -> Result<(), AdapterError> {
///         self.bytes = None;
///         Ok(())
///     }
/// }
/// ```
pub trait ResourceAdapter<T>: Send + 'static {
    /// Returns the payload, or `None` if there is nothing to hand out.
    fn resource(&self) -> Option<T>;

    /// Releases the payload.
    ///
    /// Called at most once per handle life. Errors are logged by the handle
    /// and never abort the rest of the teardown.
    fn dispose(&mut self) -> Result<(), AdapterError>;

    /// Human-readable identity used in log lines.
    fn describe(&self) -> Cow<'static, str> {
        Cow::Borrowed(core::any::type_name::<Self>())
    }
}

impl<T, A: ResourceAdapter<T> + ?Sized> ResourceAdapter<T> for Box<A> {
    fn resource(&self) -> Option<T> {
        (**self).resource()
    }

    fn dispose(&mut self) -> Result<(), AdapterError> {
        (**self).dispose()
    }

    fn describe(&self) -> Cow<'static, str> {
        (**self).describe()
    }
}

/// Failure reported by [`ResourceAdapter::dispose`].
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct AdapterError {
    message: Cow<'static, str>,
    #[source]
    source: Option<Box<dyn core::error::Error + Send + Sync>>,
}

impl AdapterError {
    /// Creates an error with a message.
    #[must_use]
    pub fn new(message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an error with a message and an underlying cause.
    #[must_use]
    pub fn with_source(
        message: impl Into<Cow<'static, str>>,
        source: impl core::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// The error message, without the cause.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}
