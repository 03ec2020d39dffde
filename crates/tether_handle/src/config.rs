//! Process-wide tuning for handles, pools and the leak safety net.
//!
//! # Example
//!
//! ```
//! use tether_handle::config::{ForcedDisposePolicy, TetherConfig};
//!
//! TetherConfig::new()
//!     .with_max_pooled_per_type(64)
//!     .with_forced_dispose(ForcedDisposePolicy::Warn)
//!     .install();
//!
//! assert_eq!(TetherConfig::current().max_pooled_per_type, 64);
//! ```

use parking_lot::RwLock;

static ACTIVE: RwLock<TetherConfig> = parking_lot::const_rwlock(TetherConfig::DEFAULT);

/// What [`Handle::dispose`](crate::Handle::dispose) does when references are
/// still outstanding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ForcedDisposePolicy {
    /// Dispose anyway and log a warning (default).
    #[default]
    Warn,
    /// Dispose anyway without logging.
    Allow,
    /// Refuse and log an error. The handle stays live.
    Deny,
}

/// Configuration shared by every handle in the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TetherConfig {
    /// Upper bound on retired shells kept per payload type per thread.
    pub max_pooled_per_type: usize,
    /// Capture the acquisition backtrace of every handle for leak reports.
    ///
    /// This flag alone decides; `RUST_BACKTRACE` is not consulted.
    pub capture_backtraces: bool,
    /// Behaviour of a manual dispose while references are outstanding.
    pub forced_dispose: ForcedDisposePolicy,
}

impl TetherConfig {
    /// The configuration in effect until [`install`](Self::install) is called.
    pub const DEFAULT: Self = Self {
        max_pooled_per_type: 256,
        capture_backtraces: cfg!(debug_assertions),
        forced_dispose: ForcedDisposePolicy::Warn,
    };

    /// Creates a configuration with default values.
    #[must_use]
    pub const fn new() -> Self {
        Self::DEFAULT
    }

    /// Sets the per-type, per-thread pool capacity.
    #[must_use]
    pub const fn with_max_pooled_per_type(mut self, max: usize) -> Self {
        self.max_pooled_per_type = max;
        self
    }

    /// Enables or disables acquisition backtraces.
    #[must_use]
    pub const fn with_capture_backtraces(mut self, enabled: bool) -> Self {
        self.capture_backtraces = enabled;
        self
    }

    /// Sets the forced-dispose policy.
    #[must_use]
    pub const fn with_forced_dispose(mut self, policy: ForcedDisposePolicy) -> Self {
        self.forced_dispose = policy;
        self
    }

    /// Makes this the active configuration for the whole process.
    pub fn install(self) {
        *ACTIVE.write() = self;
        tracing::debug!(config = ?self, "tether configuration installed");
    }

    /// Returns the active configuration.
    #[must_use]
    pub fn current() -> Self {
        *ACTIVE.read()
    }
}

impl Default for TetherConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
