//! Read access to comic book archives.
//!
//! A [`SourceArchive`] wraps a local, randomly accessible copy of a CBZ file. The
//! copy is memory-mapped and handed to the ZIP reader, so entries can be visited
//! in any order and read more than once.

use std::collections::HashMap;
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

use log::debug;
use memmap2::{Mmap, MmapOptions};
use zip::ZipArchive;

use crate::error::{Error, Result};
use crate::path_utils::is_hidden_entry;
use crate::types::{ArchiveEntry, OrderingPolicy};

pub mod merge;
pub mod order;

pub use merge::{MergeSource, MergedArchive, merge_archives};
pub use order::order_entries;

/// Largest entry, in decompressed bytes, that will be read into memory.
pub const MAX_ENTRY_SIZE: u64 = 1 << 30;

/// Upper bound for the buffer reserved from an entry's declared size.
const MAX_PREALLOCATION: u64 = 64 << 20;

/// An opened, read-only ZIP container and the page entries it holds.
pub struct SourceArchive {
    path: PathBuf,
    zip: ZipArchive<Cursor<Mmap>>,
    entries: Vec<ArchiveEntry>,
}

impl std::fmt::Debug for SourceArchive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceArchive")
            .field("path", &self.path)
            .field("entries", &self.entries.len())
            .finish()
    }
}

impl SourceArchive {
    /// Opens the archive at `path`.
    ///
    /// Directory records and hidden files (`.DS_Store`, `__MACOSX/._*`) are not pages and
    /// are left out of [`entries`](Self::entries).
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        if file.metadata()?.len() == 0 {
            return Err(Error::InvalidArchive(
                path.to_path_buf(),
                "file is empty".to_string(),
            ));
        }

        // The scratch copy is owned by the running job and never modified while mapped.
        let mmap = unsafe { MmapOptions::new().map(&file)? };
        let mut zip = ZipArchive::new(Cursor::new(mmap))
            .map_err(|e| Error::InvalidArchive(path.to_path_buf(), e.to_string()))?;

        let mut entries = Vec::with_capacity(zip.len());
        for index in 0..zip.len() {
            let file = zip.by_index_raw(index)?;
            if file.is_dir() || is_hidden_entry(file.name()) {
                continue;
            }
            entries.push(ArchiveEntry {
                name: file.name().to_string(),
                index,
                offset: file.header_start(),
                size: file.size(),
                source_seq: 0,
            });
        }

        debug!("Opened archive {:?} with {} page entries", path, entries.len());

        Ok(Self {
            path: path.to_path_buf(),
            zip,
            entries,
        })
    }

    /// Opens a merged archive and tags every entry with the source it came from.
    pub fn open_merged(merged: &MergedArchive) -> Result<Self> {
        let mut archive = Self::open(&merged.path)?;
        archive.tag_sources(&merged.entry_sources);
        Ok(archive)
    }

    /// Assigns `source_seq` from a name → source sequence map. Unknown names keep `0`.
    pub fn tag_sources(&mut self, entry_sources: &HashMap<String, usize>) {
        for entry in &mut self.entries {
            if let Some(seq) = entry_sources.get(&entry.name) {
                entry.source_seq = *seq;
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Page entries in container order.
    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Page entries ordered by `policy`.
    pub fn ordered_entries(&self, policy: OrderingPolicy) -> Vec<ArchiveEntry> {
        order_entries(&self.entries, policy)
    }

    /// Reads the full, decompressed content of `entry`.
    ///
    /// Entries declaring more than [`MAX_ENTRY_SIZE`] bytes, or inflating past it, fail with
    /// [`Error::EntryDecode`].
    pub fn read_entry(&mut self, entry: &ArchiveEntry) -> Result<Vec<u8>> {
        let too_large = || Error::EntryDecode {
            entry: entry.name.clone(),
            reason: format!("entry is larger than {} bytes", MAX_ENTRY_SIZE),
        };
        if entry.size > MAX_ENTRY_SIZE {
            return Err(too_large());
        }

        let file = self.zip.by_index(entry.index)?;
        let mut buffer = Vec::with_capacity(entry.size.min(MAX_PREALLOCATION) as usize);
        file.take(MAX_ENTRY_SIZE + 1).read_to_end(&mut buffer)?;
        if buffer.len() as u64 > MAX_ENTRY_SIZE {
            return Err(too_large());
        }
        Ok(buffer)
    }
}
