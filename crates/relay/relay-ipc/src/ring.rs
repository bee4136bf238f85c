//! Capacity validation and frame arithmetic for the byte ring.
//!
//! Capacities are powers of two so the physical offset of a logical cursor
//! is `cursor & (capacity - 1)` instead of a modulo.

use crate::error::TransportError;

/// Bytes occupied by the `u32` length prefix of every frame.
pub const FRAME_HEADER: usize = 4;

/// Frames are padded to this alignment so cursors stay 8-aligned and a wrap
/// marker always has room in the remaining tail.
pub const FRAME_ALIGN: usize = 8;

/// Length value signalling "skip to the start of the region".
pub const WRAP_MARKER: u32 = 0;

/// Smallest capacity that fits at least one padded frame.
pub const MIN_CAPACITY: usize = 64;

/// Validate a ring capacity at construction time.
pub fn validate_capacity(capacity: usize) -> Result<(), TransportError> {
    if capacity < MIN_CAPACITY {
        return Err(TransportError::CapacityTooSmall {
            capacity,
            minimum: MIN_CAPACITY,
        });
    }
    if !capacity.is_power_of_two() {
        return Err(TransportError::CapacityNotPowerOfTwo(capacity));
    }
    Ok(())
}

/// Total ring bytes consumed by a payload of `len` bytes: length prefix plus
/// payload, rounded up to [`FRAME_ALIGN`].
#[inline(always)]
pub fn frame_bytes(len: usize) -> usize {
    (FRAME_HEADER + len + FRAME_ALIGN - 1) & !(FRAME_ALIGN - 1)
}

/// Physical data offset of a logical cursor.
#[inline(always)]
pub fn physical(cursor: u64, mask: u64) -> usize {
    (cursor & mask) as usize
}
