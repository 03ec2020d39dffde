//! Entry points that build a handle and return its first reference.
//!
//! Every factory creates a fresh [`Handle`], issues one claim and lets the
//! handle go. The returned [`Reference`] is then the sole owner: disposing
//! it (and every clone made from it) disposes the resource.


use tether_handle::{Handle, IntoDependencies, Payload, Reference, ResourceAdapter, TetherError};

use crate::async_load::AsyncLoadAdapter;
use crate::disposable::{Dispose, DisposableAdapter};
use crate::error::LoadError;
use crate::native::{NativeAdapter, NativeObject, Ownership};
use crate::value::ValueAdapter;

/// Builds a handle around `adapter` and returns its first claim.
pub fn from_adapter<T: Payload>(adapter: impl ResourceAdapter<T>) -> Reference<T> {
    Handle::new(adapter).new_reference()
}

/// A plain value, dropped on dispose.
pub fn from_value<T: Payload>(value: T) -> Reference<T> {
    from_adapter(ValueAdapter::new(value))
}

/// A plain value handed to `on_dispose` when released.
pub fn from_value_with<T: Payload>(
    value: T,
    on_dispose: impl FnOnce(T) + Send + 'static,
) -> Reference<T> {
    from_adapter(ValueAdapter::with_dispose(value, on_dispose))
}

/// An optional value.
///
/// # Errors
///
/// [`TetherError::MissingResource`] if `value` is `None`.
pub fn try_from_value<T: Payload>(value: Option<T>) -> Result<Reference<T>, TetherError> {
    Handle::try_new(value.map(ValueAdapter::new)).map(|handle| handle.new_reference())
}

/// A native object, destroyed or released according to `ownership`.
pub fn from_native<O: NativeObject>(object: O, ownership: Ownership) -> Reference<O> {
    from_adapter(NativeAdapter::new(object, ownership))
}

/// The receiving end of an asynchronous load.
///
/// The reference is live immediately and yields nothing until the load
/// completes.
pub fn from_async<T: Payload>(adapter: AsyncLoadAdapter<T>) -> Reference<T> {
    from_adapter(adapter)
}

/// Spawns `future` on the current tokio runtime and tracks its result.
///
/// # Errors
///
/// [`LoadError::NoRuntime`] when called outside a tokio runtime.
pub fn spawn_load<T, F>(future: F) -> Result<Reference<T>, LoadError>
where
    T: Payload,
    F: Future<Output = Result<T, LoadError>> + Send + 'static,
{
    AsyncLoadAdapter::spawn(future).map(from_adapter)
}

/// A value that releases itself through [`Dispose`].
pub fn from_disposable<D: Dispose + Payload>(value: D) -> Reference<D> {
    from_adapter(DisposableAdapter::new(value))
}

/// Extends `reference`'s lifetime to cover `dependencies`.
///
/// Disposing the returned reference releases `reference` first and then
/// each dependency in order.
pub fn extend_lifetime<T: Payload>(
    reference: Reference<T>,
    dependencies: impl IntoDependencies,
) -> Reference<T> {
    reference.with_dependencies(dependencies)
}
