//! Core data types, enums, and reports for the cbz2pdf conversion library.
//!
//! This module defines the fundamental data structures used throughout the pipeline:
//! - Archive contents (`ArchiveEntry`) and how to order them (`OrderingPolicy`)
//! - Output planning (`PageRange`, `OutputPlan`)
//! - Job state and outcome (`ConversionPhase`, `ConversionResult`)

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::Error;

/// How the pages of an archive are ordered before they are written.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OrderingPolicy {
    /// Sort entries by name, byte-wise ascending. Archivers rarely store pages in reading order.
    #[default]
    ByNameAscending,
    /// Keep the order in which the container lists its entries.
    ByInsertionOffset,
}

impl FromStr for OrderingPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "name" => Ok(OrderingPolicy::ByNameAscending),
            "offset" => Ok(OrderingPolicy::ByInsertionOffset),
            other => Err(Error::InvalidConfiguration(format!(
                "Unknown ordering policy '{}', expected 'name' or 'offset'",
                other
            ))),
        }
    }
}

impl fmt::Display for OrderingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderingPolicy::ByNameAscending => f.write_str("name"),
            OrderingPolicy::ByInsertionOffset => f.write_str("offset"),
        }
    }
}

/// One page candidate inside a ZIP container.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ArchiveEntry {
    pub name: String,
    /// Position in the container's central directory.
    pub index: usize,
    /// Byte offset of the entry's local header.
    pub offset: u64,
    /// Uncompressed size in bytes.
    pub size: u64,
    /// Source sequence number inside a merged archive, `0` otherwise.
    pub source_seq: usize,
}

/// A contiguous run of pages that ends up in one output document.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PageRange {
    pub start: usize,
    /// Exclusive.
    pub end: usize,
    /// 1-based.
    pub part_number: usize,
    pub file_name: String,
}

impl PageRange {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

/// Partition of an archive's pages into output documents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OutputPlan {
    pub ranges: Vec<PageRange>,
    pub total_pages: usize,
}

impl OutputPlan {
    pub fn total_parts(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn is_split(&self) -> bool {
        self.ranges.len() > 1
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PageRange> {
        self.ranges.iter()
    }
}

/// Where a running job currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConversionPhase {
    #[default]
    Idle,
    Preparing,
    Merging,
    Planning,
    Writing {
        part: usize,
        total_parts: usize,
    },
    Finalizing,
    Failed,
}

/// Outcome of a finished conversion job.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConversionResult {
    /// Produced PDF files, in the order they were written.
    pub outputs: Vec<PathBuf>,
    pub pages_written: usize,
    /// Names of entries that were dropped because they failed to decode.
    pub skipped_entries: Vec<String>,
    /// Source references that could not be read.
    pub skipped_sources: Vec<String>,
}

impl ConversionResult {
    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    pub(crate) fn absorb(&mut self, other: ConversionResult) {
        self.outputs.extend(other.outputs);
        self.pages_written += other.pages_written;
        self.skipped_entries.extend(other.skipped_entries);
        self.skipped_sources.extend(other.skipped_sources);
    }
}
