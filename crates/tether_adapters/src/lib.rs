//! Resource adapters and factories for tether handles.
//!
//! `tether_handle` only knows the two-method [`ResourceAdapter`] contract.
//! This crate supplies the adapters most producers need and the factory
//! functions that turn them into a live [`Reference`]:
//!
//! | Resource | Adapter | Factory |
//! |----------|---------|---------|
//! | Bare value | [`ValueAdapter`] | [`factory::from_value`], [`factory::from_value_with`] |
//! | Native object | [`NativeAdapter`] | [`factory::from_native`] |
//! | Async load | [`AsyncLoadAdapter`] | [`factory::from_async`], [`factory::spawn_load`] |
//! | Self-disposing value | [`DisposableAdapter`] | [`factory::from_disposable`] |
//! | Reference plus dependencies | [`DependentResource`](tether_handle::DependentResource) | [`factory::extend_lifetime`] |
//!
//! # Example
//!
//! ```
//! use tether_adapters::factory;
//!
//! let source = factory::from_value(vec![0_u8; 16]);
//! let mut view = factory::extend_lifetime(factory::from_value(16_usize), source);
//!
//! assert_eq!(view.resource(), Some(16));
//! view.dispose();
//! assert!(!view.is_alive());
//! ```
//!
//! [`ResourceAdapter`]: tether_handle::ResourceAdapter
//! [`Reference`]: tether_handle::Reference

mod async_load;
mod disposable;
mod error;
pub mod factory;
mod native;
mod value;

pub use async_load::{AsyncLoadAdapter, LoadSender};
pub use disposable::{Dispose, DisposableAdapter};
pub use error::LoadError;
pub use native::{NativeAdapter, NativeObject, Ownership};
pub use value::{ReleaseFn, ValueAdapter};
