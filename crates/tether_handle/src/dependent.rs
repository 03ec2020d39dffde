//! Resources that keep other resources alive.
//!
//! A [`DependentResource`] binds one primary reference to any number of
//! dependency references of other payload types. Installed as the adapter
//! of an outer handle, it makes the outer handle's release cascade: the
//! primary is disposed first, then each dependency in the order supplied.
//!
//! ```
//! use tether_handle::{Handle, Reference};
//! use tether_handle::adapter::{AdapterError, ResourceAdapter};
//!
//! struct Atlas;
//! impl ResourceAdapter<&'static str> for Atlas {
//!     fn resource(&self) -> Option<&'static str> { Some("atlas") }
//!     fn dispose(&mut self) -> Result<(), AdapterError> { Ok(()) }
//! }
//!
//! struct Sprite;
//! impl ResourceAdapter<u32> for Sprite {
//!     fn resource(&self) -> Option<u32> { Some(7) }
//!     fn dispose(&mut self) -> Result<(), AdapterError> { Ok(()) }
//! }
//!
//! let atlas = Handle::new(Atlas);
//! let sprite = Handle::new(Sprite);
//!
//! // The sprite now keeps the atlas it was cut from alive.
//! let mut view: Reference<u32> = sprite
//!     .new_reference()
//!     .with_dependencies(atlas.new_reference());
//! assert_eq!(view.resource(), Some(7));
//!
//! view.dispose();
//! assert!(!sprite.is_alive());
//! assert!(!atlas.is_alive());
//! ```

use std::borrow::Cow;

use variadics_please::all_tuples;

use crate::adapter::{AdapterError, Payload, ResourceAdapter};
use crate::erased::ErasedReference;
use crate::reference::Reference;

/// Composite adapter whose disposal cascades to its dependencies.
pub struct DependentResource<T: Payload> {
    primary: Reference<T>,
    dependencies: Vec<ErasedReference>,
}

impl<T: Payload> DependentResource<T> {
    /// Binds `primary` to `dependencies`.
    #[must_use]
    pub fn new(primary: Reference<T>, dependencies: impl IntoDependencies) -> Self {
        Self {
            primary,
            dependencies: dependencies.into_dependencies(),
        }
    }

    /// The primary reference.
    #[must_use]
    pub fn primary(&self) -> &Reference<T> {
        &self.primary
    }

    /// The dependency references, in disposal order.
    #[must_use]
    pub fn dependencies(&self) -> &[ErasedReference] {
        &self.dependencies
    }
}

impl<T: Payload> ResourceAdapter<T> for DependentResource<T> {
    fn resource(&self) -> Option<T> {
        self.primary.resource()
    }

    fn dispose(&mut self) -> Result<(), AdapterError> {
        // Each step isolates its own failures, so the cascade always
        // reaches every dependency.
        self.primary.dispose();
        for dependency in &mut self.dependencies {
            dependency.dispose();
        }
        Ok(())
    }

    fn describe(&self) -> Cow<'static, str> {
        Cow::Owned(format!(
            "dependent<{}> (+{} dependencies)",
            core::any::type_name::<T>(),
            self.dependencies.len()
        ))
    }
}

/// Anything that can be turned into an ordered list of dependencies.
///
/// Implemented for single references, erased references, vectors of erased
/// references and tuples of up to eight references of mixed payload types.
pub trait IntoDependencies {
    /// Converts into dependencies, preserving order.
    fn into_dependencies(self) -> Vec<ErasedReference>;
}

impl IntoDependencies for () {
    fn into_dependencies(self) -> Vec<ErasedReference> {
        Vec::new()
    }
}

impl IntoDependencies for Vec<ErasedReference> {
    fn into_dependencies(self) -> Vec<ErasedReference> {
        self
    }
}

impl IntoDependencies for ErasedReference {
    fn into_dependencies(self) -> Vec<ErasedReference> {
        vec![self]
    }
}

impl<T: Payload> IntoDependencies for Reference<T> {
    fn into_dependencies(self) -> Vec<ErasedReference> {
        vec![self.erase()]
    }
}

impl<T: Payload> IntoDependencies for Vec<Reference<T>> {
    fn into_dependencies(self) -> Vec<ErasedReference> {
        self.into_iter().map(Reference::erase).collect()
    }
}

macro_rules! impl_into_dependencies_tuple {
    ($($reference:ident),*) => {
        impl<$($reference: Into<ErasedReference>),*> IntoDependencies for ($($reference,)*) {
            #[expect(non_snake_case, reason = "tuple fields are bound to their type names")]
            fn into_dependencies(self) -> Vec<ErasedReference> {
                let ($($reference,)*) = self;
                vec![$($reference.into()),*]
            }
        }
    };
}

// Generate impls for tuples of size 1 to 8
all_tuples!(impl_into_dependencies_tuple, 1, 8, R);
