//! Shared adapters for `tether_handle` integration tests.
//!
//! Import via `mod test_utils;` in test files.

#![allow(
    dead_code,
    missing_docs,
    reason = "shared test utilities, not all items used in every test binary"
)]

use std::io;
use std::sync::Arc;

use parking_lot::Mutex;
use tether_handle::{AdapterError, ResourceAdapter};
use tracing::Level;
use tracing::subscriber::DefaultGuard;

/// Ordered record of dispose calls, shared by several adapters.
#[derive(Clone, Default)]
pub struct DisposeLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl DisposeLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, name: &str) {
        self.entries.lock().push(name.to_owned());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }

    pub fn count(&self, name: &str) -> usize {
        self.entries.lock().iter().filter(|entry| *entry == name).count()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

/// Adapter around a cloneable value that logs its disposal by name.
pub struct Tracked<T> {
    pub name: String,
    pub value: T,
    pub log: DisposeLog,
}

impl<T> Tracked<T> {
    pub fn new(name: impl Into<String>, value: T, log: &DisposeLog) -> Self {
        Self {
            name: name.into(),
            value,
            log: log.clone(),
        }
    }
}

impl<T: Clone + Send + 'static> ResourceAdapter<T> for Tracked<T> {
    fn resource(&self) -> Option<T> {
        Some(self.value.clone())
    }

    fn dispose(&mut self) -> Result<(), AdapterError> {
        self.log.record(&self.name);
        Ok(())
    }
}

/// Adapter whose dispose always fails.
pub struct Failing {
    pub log: DisposeLog,
}

impl ResourceAdapter<u8> for Failing {
    fn resource(&self) -> Option<u8> {
        Some(0)
    }

    fn dispose(&mut self) -> Result<(), AdapterError> {
        self.log.record("failing");
        Err(AdapterError::new("device lost"))
    }
}

/// Adapter whose dispose panics.
pub struct Panicking {
    pub log: DisposeLog,
}

impl ResourceAdapter<u8> for Panicking {
    fn resource(&self) -> Option<u8> {
        Some(0)
    }

    fn dispose(&mut self) -> Result<(), AdapterError> {
        self.log.record("panicking");
        panic!("native release crashed");
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// LOG CAPTURE
// ═══════════════════════════════════════════════════════════════════════════════

/// Plain-text tracing output collected on the current thread.
#[derive(Clone, Default)]
pub struct CapturedLogs {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl CapturedLogs {
    /// Routes this thread's events into the returned buffer until the guard
    /// is dropped.
    pub fn install() -> (Self, DefaultGuard) {
        let logs = Self::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_max_level(Level::TRACE)
            .with_writer(move || writer.clone())
            .finish();
        let guard = tracing::subscriber::set_default(subscriber);
        (logs, guard)
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock()).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.buffer.lock().extend_from_slice(bytes);
        Ok(bytes.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
