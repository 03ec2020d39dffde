//! Errors surfaced by the fallible handle and reference APIs.
//!
//! The dispose paths never return these; they are only produced by the
//! `try_*` variants for callers that want to tell the failure modes apart.

use crate::generation::HandleId;

/// Errors from creating or disposing a handle.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TetherError {
    /// A handle was requested for an absent resource.
    #[error("cannot create a handle without a resource")]
    MissingResource,

    /// A strict dispose was refused because references are outstanding.
    #[error("handle {id} still has {outstanding} outstanding reference(s)")]
    ReferencesOutstanding {
        /// The handle that refused to dispose.
        id: HandleId,
        /// How many references were still live.
        outstanding: i32,
    },
}

/// Why a reference could not produce its resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AccessError {
    /// The reference itself was disposed or never pointed at a handle.
    #[error("reference has been released")]
    Released,

    /// The handle life this reference belonged to has ended.
    #[error("handle {0} is no longer live")]
    Stale(HandleId),

    /// The handle is live but its adapter has no value (e.g. still loading).
    #[error("handle {0} has no resource available")]
    Empty(HandleId),
}
