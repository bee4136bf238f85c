//! Thread-to-core pinning for the harness roles.
//!
//! Each role runs hottest when it stays on one physical core; a failed pin
//! is logged and tolerated rather than fatal.

/// Pin the current thread to `core_id`. Returns whether the pin took.
pub fn pin(name: &str, core_id: usize) -> bool {
    let pinned = core_affinity::set_for_current(core_affinity::CoreId { id: core_id });
    if pinned {
        tracing::debug!(role = name, core = core_id, "pinned thread to core");
    } else {
        tracing::warn!(role = name, core = core_id, "failed to pin thread");
    }
    pinned
}

/// Core ids the OS reports as available, for configuration sanity checks.
pub fn available_cores() -> Vec<usize> {
    core_affinity::get_core_ids()
        .unwrap_or_default()
        .into_iter()
        .map(|c| c.id)
        .collect()
}
