//! Generator module provides the document generator interface and the PDF implementation.
//!
//! Pages reach a generator already decoded and validated (see [`page`]), so a generator
//! only has to lay them out and persist the document.

use crate::error::Result;
use std::path::{Path, PathBuf};

pub mod page;
pub mod pdf;

pub use page::{PageImage, PreparedPage, prepare_page};
pub use pdf::PdfGenerator;

/// Document-level metadata written alongside the pages.
#[derive(Debug, Clone, Default)]
pub struct DocumentMetadata {
    /// Title of the document, usually the output file name without extension.
    pub title: String,
    /// 1-based part number when an archive is split across several documents.
    pub part_number: usize,
    pub total_parts: usize,
}

/// Common interface for all document generators.
///
/// A generator owns its output file from [`new`](Generator::new) on. Calling
/// [`save`](Generator::save) flushes and closes it.
pub trait Generator {
    /// Creates a new generator writing to `output_path`.
    ///
    /// # Parameters
    /// * `output_path` - Full path of the document to create; its directory must exist
    ///
    /// # Returns
    /// * `Result<Self>` - A new generator instance or an error if the file cannot be created
    fn new(output_path: &Path) -> Result<Self>
    where
        Self: Sized;

    /// Appends one page showing `page`.
    ///
    /// # Returns
    /// * `Result<&mut Self>` - Self reference for method chaining, or an error if failed
    fn add_page(&mut self, page: PreparedPage) -> Result<&mut Self>
    where
        Self: Sized;

    /// Sets document-level metadata.
    fn set_metadata(&mut self, metadata: &DocumentMetadata) -> Result<&mut Self>
    where
        Self: Sized;

    /// Number of pages appended so far.
    fn page_count(&self) -> usize;

    /// Finalizes the document and writes it to disk.
    ///
    /// # Returns
    /// * `Result<PathBuf>` - Path of the written document
    fn save(self) -> Result<PathBuf>;
}
