//! Single-writer / single-reader byte ring over a shared memory region.
//!
//! The writer side owns the write cursor, the reader side the read cursor;
//! each only ever *reads* the other's cursor. Payload visibility relies on
//! the release store of the write cursor pairing with the reader's acquire
//! load, so no mutual exclusion primitive is needed.
//!
//! Frames are `[u32 length][payload]`, padded to 8 bytes. A zero length is
//! the wrap marker: the reader skips to the start of the region. The writer
//! never advances more than `capacity` bytes past the reader, so unread data
//! is never overwritten; an undersized ring blocks the writer instead.

use crate::error::TransportError;
use crate::ring::{FRAME_HEADER, WRAP_MARKER, frame_bytes, physical, validate_capacity};
use crate::shm_layout::{
    CursorLine, MetaLine, REGION_MAGIC, REGION_VERSION, RegionHeader, bytes_for_region,
    data_offset,
};
use crate::wait::{WaitPolicy, Waiter};
use relay_mmap::SharedFile;
use std::mem::size_of;
use std::path::Path;
use std::ptr;
use std::sync::atomic::{AtomicU64, Ordering};

fn map_and_validate(path: &Path) -> Result<(SharedFile, *mut u8, u64), TransportError> {
    let mut mm = SharedFile::open(path)?;
    if mm.len() < size_of::<RegionHeader>() {
        return Err(TransportError::BadHeader("region smaller than header"));
    }
    let base = mm.as_mut_ptr();
    // SAFETY: the mapping is at least header-sized; validate() checks the
    // fields before anything else trusts them.
    let header = unsafe { &*(base as *const RegionHeader) };
    header.validate().map_err(TransportError::BadHeader)?;
    let capacity = header.meta.capacity;
    if mm.len() < bytes_for_region(capacity as usize) {
        return Err(TransportError::BadHeader("region truncated"));
    }
    Ok((mm, base, capacity))
}

/// The writing end of a ring. Exactly one publisher per region.
pub struct RingPublisher {
    _mm: SharedFile,
    base: *mut u8,
    capacity: u64,
    mask: u64,
    /// Writer-owned copy of the write cursor; the shared header is only
    /// stored to, never re-read, on the hot path.
    head: u64,
    wait: WaitPolicy,
}

// SAFETY: Send but not Sync — single-writer discipline is the contract.
unsafe impl Send for RingPublisher {}

impl RingPublisher {
    /// Create a fresh region at `path`, deleting any stale file first.
    pub fn create<P: AsRef<Path>>(
        path: P,
        capacity: usize,
        wait: WaitPolicy,
    ) -> Result<Self, TransportError> {
        validate_capacity(capacity)?;
        let path = path.as_ref();
        let mut mm = SharedFile::create(path, bytes_for_region(capacity) as u64)?;
        tracing::debug!(path = %path.display(), capacity, "created ring region");
        let base = mm.as_mut_ptr();

        // SAFETY: freshly created mapping, sized for header + data; no other
        // process can hold a reference yet.
        unsafe {
            ptr::write(
                base as *mut RegionHeader,
                RegionHeader {
                    meta: MetaLine {
                        magic: REGION_MAGIC,
                        version: REGION_VERSION,
                        capacity: capacity as u64,
                    },
                    write_cursor: CursorLine {
                        value: AtomicU64::new(0),
                    },
                    read_cursor: CursorLine {
                        value: AtomicU64::new(0),
                    },
                },
            );
        }

        Ok(Self {
            _mm: mm,
            base,
            capacity: capacity as u64,
            mask: capacity as u64 - 1,
            head: 0,
            wait,
        })
    }

    /// Attach to a region created by the peer, resuming at its current
    /// write cursor.
    pub fn attach<P: AsRef<Path>>(path: P, wait: WaitPolicy) -> Result<Self, TransportError> {
        let (mm, base, capacity) = map_and_validate(path.as_ref())?;
        let header = unsafe { &*(base as *const RegionHeader) };
        let head = header.write_cursor.value.load(Ordering::Acquire);
        Ok(Self {
            _mm: mm,
            base,
            capacity,
            mask: capacity - 1,
            head,
            wait,
        })
    }

    #[inline(always)]
    fn header(&self) -> &RegionHeader {
        // SAFETY: validated (or freshly initialized) at construction.
        unsafe { &*(self.base as *const RegionHeader) }
    }

    #[inline(always)]
    fn data_ptr(&self, offset: usize) -> *mut u8 {
        // SAFETY: offset is always masked below capacity.
        unsafe { self.base.add(data_offset() + offset) }
    }

    /// Logical write cursor (monotonic, includes wrap-marker skips).
    pub fn cursor(&self) -> u64 {
        self.head
    }

    pub fn capacity(&self) -> usize {
        self.capacity as usize
    }

    /// Append one record.
    ///
    /// Blocks per the configured [`WaitPolicy`] while the ring lacks space;
    /// the unbounded policies never return `BackpressureTimeout`.
    pub fn write_record(&mut self, payload: &[u8]) -> Result<(), TransportError> {
        if payload.is_empty() {
            return Err(TransportError::EmptyRecord);
        }
        let frame = frame_bytes(payload.len());
        let cap = self.capacity as usize;
        if frame > cap {
            return Err(TransportError::RecordTooLarge {
                frame,
                capacity: cap,
            });
        }

        let offset = physical(self.head, self.mask);
        let contiguous = cap - offset;
        // Tail too small for the frame: mark it and restart at offset 0.
        // The skipped tail still counts against the cursor accounting.
        let (skip, write_at) = if contiguous < frame {
            (contiguous as u64, 0usize)
        } else {
            (0u64, offset)
        };
        let needed = skip + frame as u64;

        let mut waiter = Waiter::new(self.wait);
        loop {
            let read = self.header().read_cursor.value.load(Ordering::Acquire);
            if self.head + needed - read <= self.capacity {
                break;
            }
            if let Some(waited) = waiter.park() {
                return Err(TransportError::BackpressureTimeout { waited });
            }
        }

        if skip != 0 {
            // Tail is 8-aligned and at least one frame slot wide, so the
            // marker always fits.
            unsafe { ptr::write(self.data_ptr(offset) as *mut u32, WRAP_MARKER) };
            self.head += skip;
        }

        // SAFETY: write_at + frame <= capacity by the wrap computation, and
        // the backpressure bound guarantees the reader is done with these
        // bytes.
        unsafe {
            let dst = self.data_ptr(write_at);
            ptr::write(dst as *mut u32, payload.len() as u32);
            ptr::copy_nonoverlapping(payload.as_ptr(), dst.add(FRAME_HEADER), payload.len());
        }
        self.head += frame as u64;
        // Release pairs with the reader's acquire load: once the new cursor
        // is observed, the payload bytes are visible.
        self.header().write_cursor.value.store(self.head, Ordering::Release);
        Ok(())
    }
}

/// The reading end of a ring. Exactly one subscriber per region.
pub struct RingSubscriber {
    _mm: SharedFile,
    base: *mut u8,
    capacity: u64,
    mask: u64,
    /// Reader-owned copy of the read cursor.
    tail: u64,
}

// SAFETY: Send but not Sync — single-reader discipline is the contract.
unsafe impl Send for RingSubscriber {}

impl RingSubscriber {
    /// Attach to an existing region, resuming at its current read cursor.
    pub fn attach<P: AsRef<Path>>(path: P) -> Result<Self, TransportError> {
        let (mm, base, capacity) = map_and_validate(path.as_ref())?;
        let header = unsafe { &*(base as *const RegionHeader) };
        let tail = header.read_cursor.value.load(Ordering::Acquire);
        Ok(Self {
            _mm: mm,
            base,
            capacity,
            mask: capacity - 1,
            tail,
        })
    }

    #[inline(always)]
    fn header(&self) -> &RegionHeader {
        // SAFETY: validated at construction.
        unsafe { &*(self.base as *const RegionHeader) }
    }

    #[inline(always)]
    fn data_ptr(&self, offset: usize) -> *const u8 {
        // SAFETY: offset is always masked below capacity.
        unsafe { self.base.add(data_offset() + offset) }
    }

    /// Logical read cursor.
    pub fn cursor(&self) -> u64 {
        self.tail
    }

    /// Drain every record published up to this call.
    ///
    /// Never blocks: an empty ring returns `Ok(0)` immediately. The handler
    /// receives a borrowed view of each payload in FIFO order; the new read
    /// cursor is published once per drain, after the batch.
    pub fn poll<F: FnMut(&[u8])>(&mut self, mut on_record: F) -> Result<usize, TransportError> {
        let published = self.header().write_cursor.value.load(Ordering::Acquire);
        let mut tail = self.tail;
        if tail == published {
            return Ok(0);
        }

        let cap = self.capacity as usize;
        let mut drained = 0usize;
        while tail < published {
            let offset = physical(tail, self.mask);
            // SAFETY: offset + 4 <= capacity (cursors are 8-aligned).
            let length = unsafe { ptr::read(self.data_ptr(offset) as *const u32) };
            if length == WRAP_MARKER {
                tail += (cap - offset) as u64;
                continue;
            }

            let frame = frame_bytes(length as usize);
            if frame > cap || offset + frame > cap || tail + frame as u64 > published {
                // Only a second writer (or scribbled region) can produce
                // this; the run is invalid.
                return Err(TransportError::CorruptFrame {
                    cursor: tail,
                    length,
                });
            }

            // SAFETY: bounds checked above; the writer's release store makes
            // these bytes visible before `published` was observed.
            let payload = unsafe {
                std::slice::from_raw_parts(self.data_ptr(offset + FRAME_HEADER), length as usize)
            };
            on_record(payload);
            tail += frame as u64;
            drained += 1;
        }

        self.tail = tail;
        // Release so the writer's backpressure check observes freed space
        // only after we are done with the bytes.
        self.header().read_cursor.value.store(tail, Ordering::Release);
        Ok(drained)
    }
}
