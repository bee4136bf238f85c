use std::time::Duration;

/// Error taxonomy for the ring transport.
///
/// Construction-time failures (`Capacity*`) are fatal and surfaced
/// immediately. `BackpressureTimeout` is the one recoverable variant; the
/// caller decides whether to retry, drop or abort. `CorruptFrame` indicates
/// a broken single-writer/single-reader invariant and invalidates the run.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("capacity {0} is not a power of two")]
    CapacityNotPowerOfTwo(usize),

    #[error("capacity {capacity} below minimum {minimum}")]
    CapacityTooSmall { capacity: usize, minimum: usize },

    #[error("record of {frame} bytes (framed) exceeds ring capacity {capacity}")]
    RecordTooLarge { frame: usize, capacity: usize },

    #[error("record must not be empty")]
    EmptyRecord,

    #[error("no space for record after waiting {waited:?}")]
    BackpressureTimeout { waited: Duration },

    #[error("corrupt frame at cursor {cursor}: length {length}")]
    CorruptFrame { cursor: u64, length: u32 },

    #[error("region header invalid: {0}")]
    BadHeader(&'static str),

    #[error("transport i/o failure")]
    Io(#[from] std::io::Error),
}
