//! Process-wide configuration.
//!
//! Installing a configuration affects every test in the binary, so this file
//! holds a single test.

mod test_utils;

use tether_handle::{ForcedDisposePolicy, Handle, Pool, TetherConfig, TetherError};
use test_utils::{CapturedLogs, DisposeLog, Tracked};

/// A `Deny` policy refuses forced disposal, a small pool cap discards
/// surplus shells, captured backtraces reach the leak warning and `Allow`
/// forces disposal silently.
#[test]
fn installed_config_governs_dispose_and_pooling() {
    TetherConfig::new()
        .with_forced_dispose(ForcedDisposePolicy::Deny)
        .with_max_pooled_per_type(2)
        .with_capture_backtraces(true)
        .install();
    assert_eq!(TetherConfig::current().max_pooled_per_type, 2);

    let log = DisposeLog::new();

    // Forced dispose is refused while a claim is outstanding.
    let handle = Handle::new(Tracked::new("guarded", 1_u32, &log));
    let mut reference = handle.new_reference();
    assert!(!handle.dispose());
    assert!(handle.is_alive());
    assert!(matches!(
        handle.try_dispose(),
        Err(TetherError::ReferencesOutstanding { outstanding: 1, .. })
    ));
    reference.dispose();
    assert!(handle.is_disposed());
    assert_eq!(log.count("guarded"), 1);

    // With no claims the policy does not apply.
    let unclaimed = Handle::new(Tracked::new("unclaimed", 2_u32, &log));
    assert!(unclaimed.dispose());

    std::thread::spawn(|| {
        let log = DisposeLog::new();
        let handles: Vec<_> = (0..5_u32)
            .map(|i| Handle::new(Tracked::new("pooled", i, &log)))
            .collect();
        for handle in &handles {
            handle.dispose();
        }

        let stats = Pool::<u32>::local_stats();
        assert_eq!(Pool::<u32>::local_len(), 2);
        assert_eq!(stats.recycled, 2);
        assert_eq!(stats.discarded, 3);

        Pool::<u32>::clear_local();
        assert_eq!(Pool::<u32>::local_len(), 0);
        assert!(handles.iter().all(Handle::is_disposed));
    })
    .join()
    .expect("pool thread panicked");

    // Leak warnings carry the acquisition backtrace.
    {
        let (logs, _guard) = CapturedLogs::install();
        let traced = Handle::new(Tracked::new("traced", 3_u32, &log));
        drop(traced.new_reference());
        assert!(traced.is_disposed());
        let output = logs.contents();
        assert!(output.contains("dropped without dispose"), "{output}");
        assert!(output.contains("acquired_at="), "{output}");
    }

    // `Allow` disposes with claims outstanding and says nothing.
    TetherConfig::new()
        .with_forced_dispose(ForcedDisposePolicy::Allow)
        .install();
    {
        let (logs, _guard) = CapturedLogs::install();
        let allowed = Handle::new(Tracked::new("allowed", 4_u32, &log));
        let outstanding = allowed.new_reference();
        assert!(allowed.dispose());
        assert!(!outstanding.is_alive());
        assert_eq!(log.count("allowed"), 1);
        let output = logs.contents();
        assert!(!output.contains("WARN"), "{output}");
        assert!(!output.contains("outstanding references"), "{output}");
    }

    TetherConfig::default().install();
}
