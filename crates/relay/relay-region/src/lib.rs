//! Atomic access capability over a raw byte region.
//!
//! One interface, one implementation per backing (heap-resident and
//! memory-mapped), so callers never reach for per-backing escape hatches.
//! Ordering semantics are fixed by the interface: Acquire loads, Release
//! stores, AcqRel compare-and-swap.

use relay_mmap::SharedFile;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

/// Word-granular atomic operations over a byte region.
///
/// Offsets are in bytes and must be 8-aligned; the region length must be a
/// multiple of 8. Out-of-range or misaligned offsets are caller bugs and
/// panic.
pub trait AtomicRegion {
    /// Region length in bytes.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Load the word at `offset` with Acquire ordering.
    fn load_acquire_u64(&self, offset: usize) -> u64;

    /// Store `value` at `offset` with Release ordering.
    fn store_release_u64(&self, offset: usize, value: u64);

    /// Compare-and-swap the word at `offset` with AcqRel ordering.
    ///
    /// Returns the witness value: equal to `expected` on success, the
    /// conflicting current value otherwise.
    fn compare_and_swap_u64(&self, offset: usize, expected: u64, new: u64) -> u64;
}

#[inline(always)]
unsafe fn atomic_at(base: *const u8, len: usize, offset: usize) -> &'static AtomicU64 {
    assert!(offset % 8 == 0, "offset must be 8-aligned");
    assert!(offset + 8 <= len, "offset out of region bounds");
    // SAFETY: caller guarantees base..base+len is a valid mapping for the
    // lifetime of the owning region; alignment and bounds are checked above.
    unsafe { &*(base.add(offset) as *const AtomicU64) }
}

/// Heap-resident backing: a boxed slice of atomic words.
pub struct HeapRegion {
    cells: Box<[AtomicU64]>,
}

impl HeapRegion {
    /// Allocate a zeroed region of `len` bytes (`len` must be a multiple of 8).
    pub fn new(len: usize) -> Self {
        assert!(len % 8 == 0, "region length must be a multiple of 8");
        let cells = (0..len / 8).map(|_| AtomicU64::new(0)).collect();
        Self { cells }
    }
}

impl AtomicRegion for HeapRegion {
    #[inline(always)]
    fn len(&self) -> usize {
        self.cells.len() * 8
    }

    #[inline(always)]
    fn load_acquire_u64(&self, offset: usize) -> u64 {
        self.cells[offset / 8].load(Ordering::Acquire)
    }

    #[inline(always)]
    fn store_release_u64(&self, offset: usize, value: u64) {
        self.cells[offset / 8].store(value, Ordering::Release);
    }

    #[inline(always)]
    fn compare_and_swap_u64(&self, offset: usize, expected: u64, new: u64) -> u64 {
        match self.cells[offset / 8].compare_exchange(
            expected,
            new,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(witness) | Err(witness) => witness,
        }
    }
}

/// Memory-mapped backing over a shared file.
pub struct MmapRegion {
    _mm: SharedFile,
    base: *mut u8,
    len: usize,
}

// SAFETY: all access goes through the atomic operations below; the raw
// pointer is only a view into the mapping owned by `_mm`.
unsafe impl Send for MmapRegion {}
unsafe impl Sync for MmapRegion {}

impl MmapRegion {
    /// Create a fresh zeroed mapped region of `len` bytes at `path`.
    pub fn create<P: AsRef<Path>>(path: P, len: usize) -> io::Result<Self> {
        assert!(len % 8 == 0, "region length must be a multiple of 8");
        let mut mm = SharedFile::create(path, len as u64)?;
        let base = mm.as_mut_ptr();
        Ok(Self { _mm: mm, base, len })
    }

    /// Map an existing region created by a peer.
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let mut mm = SharedFile::open(path)?;
        let base = mm.as_mut_ptr();
        let len = mm.len();
        Ok(Self { _mm: mm, base, len })
    }
}

impl AtomicRegion for MmapRegion {
    #[inline(always)]
    fn len(&self) -> usize {
        self.len
    }

    #[inline(always)]
    fn load_acquire_u64(&self, offset: usize) -> u64 {
        unsafe { atomic_at(self.base, self.len, offset) }.load(Ordering::Acquire)
    }

    #[inline(always)]
    fn store_release_u64(&self, offset: usize, value: u64) {
        unsafe { atomic_at(self.base, self.len, offset) }.store(value, Ordering::Release);
    }

    #[inline(always)]
    fn compare_and_swap_u64(&self, offset: usize, expected: u64, new: u64) -> u64 {
        let cell = unsafe { atomic_at(self.base, self.len, offset) };
        match cell.compare_exchange(expected, new, Ordering::AcqRel, Ordering::Acquire) {
            Ok(witness) | Err(witness) => witness,
        }
    }
}
