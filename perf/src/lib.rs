//! Shared helpers for the relay benches.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Unique tmpfs-ish path per bench invocation, safe under parallel runs.
pub fn temp_shm_path(label: &str) -> String {
    static COUNTER: AtomicUsize = AtomicUsize::new(0);
    format!(
        "/tmp/relay_bench_{label}_{}_{}",
        std::process::id(),
        COUNTER.fetch_add(1, Ordering::Relaxed)
    )
}

/// Value table the CAS benches rotate through; every exchange succeeds
/// because consecutive entries differ.
pub const CAS_VALUES: [u64; 8] = [0, 1, 2, 3, 4, 5, 6, 7];
