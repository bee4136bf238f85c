use memmap2::MmapMut;
use std::{
    fs::{self, File, OpenOptions},
    io,
    path::Path,
};

/// A file-backed shared memory region, mapped read-write.
///
/// Both ends of a channel need write access: the publishing side stores its
/// write cursor into the shared header, the subscribing side its read cursor.
pub struct SharedFile {
    _file: File,
    mmap: MmapMut,
}

impl SharedFile {
    /// Create a fresh region of `size_bytes` at `path`, removing any stale
    /// file left behind by a previous run.
    pub fn create<P: AsRef<Path>>(path: P, size_bytes: u64) -> io::Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            fs::remove_file(path)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(true)
            .open(path)?;
        file.set_len(size_bytes)?;

        let mmap = unsafe { MmapMut::map_mut(&file)? };
        Ok(Self { _file: file, mmap })
    }

    /// Map an existing region created by the peer process.
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let mmap = unsafe { MmapMut::map_mut(&file)? };
        Ok(Self { _file: file, mmap })
    }

    /// Raw pointer to the start of the mapped region.
    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        self.mmap.as_mut_ptr()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.mmap.len() == 0
    }
}
