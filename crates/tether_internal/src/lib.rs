//! # Tether Internal Library
//!
//! Re-exports the tether crates for convenience.

/// Handles, references, pooling and the leak safety net.
pub use tether_handle;

/// Concrete resource adapters and factories.
pub use tether_adapters;

/// Subscriber setup and leak reporting.
pub use tether_diagnostics;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use tether_adapters::{
        AsyncLoadAdapter, Dispose, DisposableAdapter, LoadError, NativeAdapter, NativeObject,
        Ownership, ValueAdapter, factory,
    };
    pub use tether_handle::prelude::*;
}
