//! Deterministic ownership of shared disposable resources.
//!
//! `tether_handle` is the core of tether: a generational handle and
//! reference-counting engine for resources (loaded assets, generated
//! buffers, pooled native objects) that many consumers share and that must
//! be released exactly once, as soon as the last consumer lets go.
//!
//! - [`adapter`] - The [`ResourceAdapter`] contract wrapping a payload
//! - [`Handle`] - Sole owner of one adapter and its reference count
//! - [`Reference`] - One counted claim against a handle
//! - [`DependentResource`] - A resource whose release cascades to others
//! - [`pool`] - Per-thread free lists of recycled shells
//! - [`Reclaimer`] - The leak safety net for owners dropped without dispose
//! - [`config`] - Process-wide tuning
//!
//! # Lifecycle
//!
//! 1. A producer wraps its payload in an adapter and calls [`Handle::new`]
//!    (reference count 0).
//! 2. [`Handle::new_reference`] issues the first claim (count 1); consumers
//!    get further claims by cloning.
//! 3. Each consumer calls [`Reference::dispose`] when done.
//! 4. When the count reaches 0 the pre-dispose observers run, the adapter
//!    is disposed and the handle's shell returns to the pool, to be reused
//!    under a higher [`Generation`].
//!
//! Any reference or handle that outlives its life, including across shell
//! reuse, reports "not alive" and yields no resource instead of touching
//! released state.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use tether_handle::{Handle, Reference};
//! use tether_handle::adapter::{AdapterError, ResourceAdapter};
//!
//! struct Texture {
//!     pixels: Arc<[u8]>,
//! }
//!
//! impl ResourceAdapter<Arc<[u8]>> for Texture {
//!     fn resource(&self) -> Option<Arc<[u8]>> {
//!         Some(Arc::clone(&self.pixels))
//!     }
//!
//!     fn dispose(&mut self) -> Result<(), AdapterError> {
//!         // Free GPU memory, close files, ...
//!         Ok(())
//!     }
//! }
//!
//! let handle = Handle::new(Texture { pixels: Arc::from(vec![0_u8; 16]) });
//! let mut first: Reference<Arc<[u8]>> = handle.new_reference();
//! let mut second = first.clone();
//!
//! first.dispose();
//! assert!(second.is_alive());
//!
//! second.dispose();
//! assert!(!first.is_alive() && !second.is_alive());
//! assert!(handle.is_disposed());
//! ```
//!
//! # Threading
//!
//! Handles and references are `Send` and may be used from any thread; shell
//! pools are thread-confined caches. Reference counting for one handle is
//! expected to be driven by one logical owner at a time: the internal lock
//! keeps memory safe, but the order in which unsynchronized claims and
//! releases from several threads take effect is unspecified.

/// The resource adapter contract.
pub mod adapter;

/// Process-wide configuration.
pub mod config;

/// Generation counters and identities.
pub mod generation;

/// Per-thread shell pools.
pub mod pool;

mod dependent;
mod erased;
mod error;
mod handle;
mod observer;
mod reclaimer;
mod reference;
mod shell;

pub use adapter::{AdapterError, Payload, ResourceAdapter};
pub use config::{ForcedDisposePolicy, TetherConfig};
pub use dependent::{DependentResource, IntoDependencies};
pub use erased::{ErasedReference, ReferenceClaim};
pub use error::{AccessError, TetherError};
pub use generation::{Generation, HandleId, ShellId};
pub use handle::Handle;
pub use observer::ObserverId;
pub use pool::{Pool, PoolStats};
pub use reclaimer::{LeakReport, Reclaimer, ReclaimerGuard};
pub use reference::Reference;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::adapter::{AdapterError, ResourceAdapter};
    pub use crate::{
        DependentResource, ErasedReference, Handle, IntoDependencies, Reclaimer, Reference,
    };
}
