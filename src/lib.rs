//! cbz2pdf - Comic Book Archive to PDF Conversion Library
//!
//! This crate converts one or more CBZ files (ZIP containers of sequentially named images)
//! into paginated PDF documents. Archives can be converted one by one or merged into a
//! single page sequence first, and long page sequences are split into parts of a bounded
//! size (`Volume 01_part-1.pdf`, `Volume 01_part-2.pdf`, ...).
//!
//! # Getting Started
//!
//! Describe the job with a [`ConversionRequest`] and hand it to a [`Converter`]. The
//! converter resolves sources through a [`FileAccessProvider`](provider::FileAccessProvider)
//! and reports progress to a [`ProgressSink`](progress::ProgressSink).
//!
//! ```rust,no_run
//! use cbz2pdf::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> cbz2pdf::error::Result<()> {
//!     let converter = Converter::new(
//!         Arc::new(LocalFileProvider::new().with_default_output_dir("./converted")),
//!         Arc::new(NoopProgressSink),
//!     );
//!
//!     let request = ConversionRequest::builder()
//!         .sources(vec![
//!             "./comics/Volume 01.cbz".to_string(),
//!             "./comics/Volume 02.cbz".to_string(),
//!         ])
//!         .max_pages_per_document(200usize)
//!         .ordering(OrderingPolicy::ByNameAscending)
//!         .build()?;
//!
//!     let result = converter.convert(request).await?;
//!     for output in &result.outputs {
//!         println!("Created {:?}", output);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! Single pages that cannot be decoded and sources that cannot be read are reported and
//! skipped; only job-level failures are returned as [`Error`](error::Error).

pub mod archive;
pub mod cancel;
pub mod converter;
pub mod error;
pub mod generator;
pub mod path_utils;
pub mod pipeline;
pub mod planner;
pub mod progress;
pub mod provider;
pub mod request;
pub mod types;
pub mod writer;

pub use converter::{ConversionJob, Converter};
pub use request::{ConversionRequest, ConversionRequestBuilder, parse_max_pages};

pub use types::{
    ArchiveEntry, ConversionPhase, ConversionResult, OrderingPolicy, OutputPlan, PageRange,
};

/// Prelude module for convenient imports.
///
/// This module re-exports the most commonly used types and traits, allowing you to
/// import everything you need with a single `use cbz2pdf::prelude::*;` statement.
pub mod prelude {
    pub use super::{
        ArchiveEntry, ConversionJob, ConversionPhase, ConversionRequest,
        ConversionRequestBuilder, ConversionResult, Converter, OrderingPolicy, OutputPlan,
        PageRange, error, parse_max_pages, types,
    };
    pub use crate::cancel::{CancellationExt, CancellationToken};
    pub use crate::progress::{
        NoopProgressSink, ProgressSink, StatusBoard, StatusReporter,
    };
    pub use crate::provider::{FileAccessProvider, LocalFileProvider};
    pub use std::path::{Path, PathBuf};
    pub use std::sync::Arc;
}
