use std::time::{Duration, Instant};

/// How a writer waits when the ring has no space for the next record.
///
/// Injected at construction so tests can bound execution time instead of
/// inheriting an unbounded busy-spin.
#[derive(Debug, Copy, Clone)]
pub enum WaitPolicy {
    /// Busy-spin until space frees up. Trades a core for minimal latency.
    Spin,
    /// Yield the thread between checks. Friendlier on shared machines.
    Yield,
    /// Spin, but give up after the deadline with a backpressure error.
    SpinTimeout(Duration),
}

/// Per-wait state for a single blocked operation.
pub(crate) struct Waiter {
    policy: WaitPolicy,
    started: Option<Instant>,
}

impl Waiter {
    pub(crate) fn new(policy: WaitPolicy) -> Self {
        Self {
            policy,
            started: None,
        }
    }

    /// One backoff step. Returns the elapsed wait when the deadline has
    /// passed, `None` while the caller should keep retrying.
    #[inline]
    pub(crate) fn park(&mut self) -> Option<Duration> {
        match self.policy {
            WaitPolicy::Spin => {
                std::hint::spin_loop();
                None
            }
            WaitPolicy::Yield => {
                std::thread::yield_now();
                None
            }
            WaitPolicy::SpinTimeout(limit) => {
                let started = *self.started.get_or_insert_with(Instant::now);
                let waited = started.elapsed();
                if waited >= limit {
                    Some(waited)
                } else {
                    std::hint::spin_loop();
                    None
                }
            }
        }
    }
}
