//! Shared memory layout of a ring region.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ meta line (64B): magic | version | capacity  │
//! ├──────────────────────────────────────────────┤
//! │ writer line (64B): write_cursor (atomic u64) │
//! ├──────────────────────────────────────────────┤
//! │ reader line (64B): read_cursor (atomic u64)  │
//! ├──────────────────────────────────────────────┤
//! │ data: `capacity` bytes                       │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! Each cursor sits on its own cache line: the writer mutates only the write
//! cursor and the reader only the read cursor, so isolating them avoids
//! false sharing between the two sides.

use std::mem::size_of;
use std::sync::atomic::AtomicU64;

/// ASCII "RELAYBUF".
pub const REGION_MAGIC: u64 = 0x5245_4C41_5942_5546;

/// Bumped on incompatible layout changes; attach rejects mismatches.
pub const REGION_VERSION: u64 = 1;

#[repr(C, align(64))]
pub struct MetaLine {
    pub magic: u64,
    pub version: u64,
    pub capacity: u64,
}

/// One atomic cursor, padded out to a full cache line.
#[repr(C, align(64))]
pub struct CursorLine {
    pub value: AtomicU64,
}

#[repr(C)]
pub struct RegionHeader {
    pub meta: MetaLine,
    pub write_cursor: CursorLine,
    pub read_cursor: CursorLine,
}

impl RegionHeader {
    /// Check a mapped header before trusting any of its fields.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.meta.magic != REGION_MAGIC {
            return Err("bad magic");
        }
        if self.meta.version != REGION_VERSION {
            return Err("wrong version");
        }
        let capacity = self.meta.capacity as usize;
        if !capacity.is_power_of_two() {
            return Err("capacity not a power of two");
        }
        Ok(())
    }
}

/// Byte offset of the data sub-region.
pub const fn data_offset() -> usize {
    size_of::<RegionHeader>()
}

/// Total file size for a ring of `capacity` data bytes.
pub const fn bytes_for_region(capacity: usize) -> usize {
    size_of::<RegionHeader>() + capacity
}
