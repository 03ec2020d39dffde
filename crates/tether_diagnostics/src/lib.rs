//! Log output for hosts embedding tether.
//!
//! tether reports through [`tracing`]: handle creation and disposal at
//! `debug`, leaks and forced disposals at `warn`, adapter and observer
//! failures at `error`. Everything is emitted under the `tether_handle` and
//! `tether_adapters` targets. [`TracingSetup`] installs a subscriber for
//! hosts that do not configure one themselves.
//!
//! # Example
//!
//! ```
//! use tether_diagnostics::{TracingFormat, TracingSetup};
//! use tracing::Level;
//!
//! TracingSetup::new()
//!     .with_level(Level::DEBUG)
//!     .with_format(TracingFormat::Compact)
//!     .init();
//! ```

use tether_handle::Reclaimer;
use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Targets tether logs under.
pub const TARGETS: &[&str] = &["tether_handle", "tether_adapters"];

// ─────────────────────────────────────────────────────────────────────────────
// TracingFormat
// ─────────────────────────────────────────────────────────────────────────────

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TracingFormat {
    /// Human-readable multi-line output (default).
    #[default]
    Pretty,
    /// Compact single-line output.
    Compact,
    /// JSON lines for log aggregation.
    Json,
}

// ─────────────────────────────────────────────────────────────────────────────
// TracingSetup
// ─────────────────────────────────────────────────────────────────────────────

/// Builder for the global `tracing` subscriber.
///
/// Without an explicit filter only tether's own targets are enabled, at the
/// configured level.
///
/// ```
/// use tether_diagnostics::TracingSetup;
///
/// // Leak warnings only, everything else from the host at info.
/// TracingSetup::new().with_env_filter("info,tether_handle=warn");
/// ```
#[derive(Debug, Clone)]
pub struct TracingSetup {
    level: Level,
    format: TracingFormat,
    env_filter: Option<String>,
    span_events: bool,
}

impl Default for TracingSetup {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: TracingFormat::Pretty,
            env_filter: None,
            span_events: false,
        }
    }
}

impl TracingSetup {
    /// Creates a setup with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the level for tether's targets.
    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Sets the output format.
    #[must_use]
    pub fn with_format(mut self, format: TracingFormat) -> Self {
        self.format = format;
        self
    }

    /// Replaces the default filter with `target=level,...` directives.
    ///
    /// An unparsable filter falls back to the default one.
    #[must_use]
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// Emits span enter/exit events.
    #[must_use]
    pub fn with_span_events(mut self, enabled: bool) -> Self {
        self.span_events = enabled;
        self
    }

    /// The filter directives this setup installs.
    #[must_use]
    pub fn directives(&self) -> String {
        if let Some(filter) = &self.env_filter
            && EnvFilter::try_new(filter).is_ok()
        {
            return filter.clone();
        }
        let level = self.level.as_str().to_ascii_lowercase();
        TARGETS
            .iter()
            .map(|target| format!("{target}={level}"))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Installs the subscriber globally.
    ///
    /// Returns `false` if another subscriber was already installed; the
    /// existing one is left in place.
    pub fn init(&self) -> bool {
        let env_filter = EnvFilter::new(self.directives());
        let span_events = if self.span_events {
            FmtSpan::ENTER | FmtSpan::EXIT
        } else {
            FmtSpan::NONE
        };

        let installed = match self.format {
            TracingFormat::Pretty => tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .pretty()
                        .with_span_events(span_events),
                )
                .try_init()
                .is_ok(),
            TracingFormat::Compact => tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .compact()
                        .with_span_events(span_events),
                )
                .try_init()
                .is_ok(),
            TracingFormat::Json => tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_span_events(span_events),
                )
                .try_init()
                .is_ok(),
        };

        if installed {
            tracing::info!(
                level = %self.level,
                format = ?self.format,
                "tether tracing initialized"
            );
        }
        installed
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Leak reporting
// ─────────────────────────────────────────────────────────────────────────────

/// Logs a summary of `reclaimer`'s activity.
///
/// Meant for shutdown or end-of-frame checks: leaks still waiting to be
/// drained are reported at `warn`, a clean state at `debug`.
pub fn log_leak_report(reclaimer: &Reclaimer) {
    let report = reclaimer.report();
    let pending = reclaimer.pending();
    if pending > 0 {
        tracing::warn!(
            pending,
            deferred = report.deferred,
            released = report.released,
            "leaked releases still waiting for the owner thread"
        );
    } else {
        tracing::debug!(
            deferred = report.deferred,
            released = report.released,
            "no leaked releases pending"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::Arc;

    use parking_lot::Mutex;
    use tether_handle::{AdapterError, Handle, ResourceAdapter};
    use tracing::subscriber::DefaultGuard;

    #[test]
    fn format_default_is_pretty() {
        assert_eq!(TracingFormat::default(), TracingFormat::Pretty);
    }

    #[test]
    fn default_directives_cover_tether_targets() {
        let setup = TracingSetup::new().with_level(Level::DEBUG);
        assert_eq!(
            setup.directives(),
            "tether_handle=debug,tether_adapters=debug"
        );
    }

    #[test]
    fn custom_filter_replaces_default() {
        let setup = TracingSetup::new().with_env_filter("tether_handle=warn,info");
        assert_eq!(setup.directives(), "tether_handle=warn,info");
    }

    #[test]
    fn invalid_filter_falls_back() {
        let setup = TracingSetup::new().with_env_filter("tether_handle=notalevel");
        assert_eq!(setup.directives(), "tether_handle=info,tether_adapters=info");
    }

    #[test]
    fn builders_set_fields() {
        let setup = TracingSetup::new()
            .with_format(TracingFormat::Json)
            .with_span_events(true);
        assert_eq!(setup.format, TracingFormat::Json);
        assert!(setup.span_events);
    }

    #[test]
    fn second_init_keeps_first_subscriber() {
        let first = TracingSetup::new().with_format(TracingFormat::Compact).init();
        let second = TracingSetup::new().init();
        assert!(first);
        assert!(!second);
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn install() -> (Self, DefaultGuard) {
            let logs = Self::default();
            let writer = logs.clone();
            let subscriber = tracing_subscriber::fmt()
                .with_ansi(false)
                .with_max_level(Level::TRACE)
                .with_writer(move || writer.clone())
                .finish();
            (logs, tracing::subscriber::set_default(subscriber))
        }

        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock()).into_owned()
        }
    }

    impl io::Write for CapturedLogs {
        fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(bytes);
            Ok(bytes.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct Abandoned;

    impl ResourceAdapter<u8> for Abandoned {
        fn resource(&self) -> Option<u8> {
            Some(0)
        }

        fn dispose(&mut self) -> Result<(), AdapterError> {
            Ok(())
        }
    }

    #[test]
    fn leak_report_on_clean_reclaimer() {
        let (logs, _guard) = CapturedLogs::install();
        let reclaimer = Reclaimer::new();
        log_leak_report(&reclaimer);

        let output = logs.contents();
        assert!(output.contains("no leaked releases pending"), "{output}");
        assert!(!output.contains("WARN"), "{output}");
    }

    #[test]
    fn leak_report_warns_while_releases_pending() {
        let (logs, _guard) = CapturedLogs::install();
        let reclaimer = Reclaimer::new();
        {
            let _scope = reclaimer.enter();
            drop(Handle::new(Abandoned));
        }
        assert_eq!(reclaimer.pending(), 1);

        log_leak_report(&reclaimer);

        let output = logs.contents();
        assert!(output.contains("leaked releases still waiting"), "{output}");
        assert!(output.contains("pending=1"), "{output}");
        assert!(output.contains("deferred=1"), "{output}");
        assert!(output.contains("released=0"), "{output}");
        assert_eq!(reclaimer.drain(), 1);
    }
}
