//! One named shared-memory region.
//!
//! The backing file must already exist (the consumer creates it). The
//! region starts with a 16-byte header followed by the payload:
//!
//! ```text
//!   0  u32  magic "VRC1"
//!   4  u32  payload length
//!   8  u64  sequence (odd while a write is in progress)
//!   16 ...  payload
//! ```
//!
//! Writers in this process serialize on the region's own lock. Readers in
//! other processes use the sequence counter to detect torn copies.

use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{fence, AtomicU64, Ordering};

use byteorder::{ByteOrder, LittleEndian};
use memmap2::{MmapMut, MmapOptions};
use parking_lot::Mutex;
use thiserror::Error;
use tracing::debug;

use crate::channel::layout::LayoutError;

pub const REGION_MAGIC: u32 = 0x5652_4331;
pub const HEADER_LEN: usize = 16;

const SEQUENCE_OFFSET: usize = 8;
const MAX_READ_ATTEMPTS: usize = 64;

#[derive(Debug, Error)]
pub enum RegionError {
    #[error("Cannot open shared region {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Shared region {path} is {got} bytes, need at least {needed}")]
    TooSmall {
        path: PathBuf,
        needed: usize,
        got: u64,
    },

    #[error("Cannot map shared region {path}: {source}")]
    Map {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A memory-mapped region with its own write lock.
pub struct SharedRegion {
    name: String,
    path: PathBuf,
    map: Mutex<Option<MmapMut>>,
}

impl SharedRegion {
    /// Map the region `dir/name`, reserving `payload_len` bytes after the header.
    pub fn attach(dir: &Path, name: &str, payload_len: usize) -> Result<Self, RegionError> {
        let path = dir.join(name);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|source| RegionError::Open {
                path: path.clone(),
                source,
            })?;

        let needed = HEADER_LEN + payload_len;
        let got = file
            .metadata()
            .map_err(|source| RegionError::Open {
                path: path.clone(),
                source,
            })?
            .len();
        if got < needed as u64 {
            return Err(RegionError::TooSmall { path, needed, got });
        }

        // SAFETY: the file stays open for the lifetime of the mapping and only
        // the length we validated above is mapped.
        let mut map = unsafe { MmapOptions::new().len(needed).map_mut(&file) }.map_err(
            |source| RegionError::Map {
                path: path.clone(),
                source,
            },
        )?;

        LittleEndian::write_u32(&mut map[0..4], REGION_MAGIC);
        LittleEndian::write_u32(&mut map[4..8], payload_len as u32);
        sequence(&map).store(0, Ordering::Release);

        debug!("Attached shared region {} ({} bytes)", path.display(), needed);

        Ok(Self {
            name: name.to_string(),
            path,
            map: Mutex::new(Some(map)),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_attached(&self) -> bool {
        self.map.lock().is_some()
    }

    /// Unmap the region. Later writes are skipped.
    pub fn detach(&self) {
        if self.map.lock().take().is_some() {
            debug!("Detached shared region {}", self.name);
        }
    }

    /// Fill the payload with `write` while holding this region's lock.
    ///
    /// Returns `Ok(false)` when the region is detached and nothing was written.
    pub fn write_with<F>(&self, write: F) -> Result<bool, LayoutError>
    where
        F: FnOnce(&mut [u8]) -> Result<(), LayoutError>,
    {
        let mut guard = self.map.lock();
        let Some(map) = guard.as_mut() else {
            return Ok(false);
        };

        let seq = sequence(map);
        let start = seq.load(Ordering::Relaxed);
        seq.store(start.wrapping_add(1), Ordering::Relaxed);
        fence(Ordering::Release);

        let result = write(&mut map[HEADER_LEN..]);

        // Close the write even when encoding failed.
        sequence(map).store(start.wrapping_add(2), Ordering::Release);
        result.map(|()| true)
    }

    /// Copy a consistent snapshot of the payload.
    ///
    /// Returns `None` when detached or when no stable copy could be taken.
    pub fn read_payload(&self) -> Option<Vec<u8>> {
        let guard = self.map.lock();
        let map = guard.as_ref()?;
        let seq = sequence(map);

        for _ in 0..MAX_READ_ATTEMPTS {
            let before = seq.load(Ordering::Acquire);
            if before % 2 == 1 {
                std::hint::spin_loop();
                continue;
            }
            let payload = map[HEADER_LEN..].to_vec();
            fence(Ordering::Acquire);
            if seq.load(Ordering::Relaxed) == before {
                return Some(payload);
            }
        }
        None
    }

    /// Number of completed writes since attach.
    pub fn write_count(&self) -> Option<u64> {
        let guard = self.map.lock();
        guard.as_ref().map(|map| sequence(map).load(Ordering::Acquire) / 2)
    }
}

fn sequence(map: &MmapMut) -> &AtomicU64 {
    // SAFETY: mappings are page aligned, so the header's u64 at offset 8 is
    // aligned, and the mapping outlives the returned reference.
    unsafe { &*(map.as_ptr().add(SEQUENCE_OFFSET) as *const AtomicU64) }
}
