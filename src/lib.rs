//! Deterministic, generation-checked ownership of shared disposable resources.
//!
//! ```
//! use tether::prelude::*;
//!
//! let texture = factory::from_value(String::from("hero.png"));
//! let mut consumer = texture.clone();
//! let mut texture = texture;
//!
//! texture.dispose();
//! assert_eq!(consumer.resource().as_deref(), Some("hero.png"));
//!
//! consumer.dispose();
//! assert!(!consumer.is_alive());
//! ```

pub use tether_internal::*;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use tether_internal::prelude::*;
}
