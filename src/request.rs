//! Conversion requests.
//!
//! A [`ConversionRequest`] describes one job: the sources, how pages are ordered and
//! split, whether sources are merged, and where the PDFs go. Requests are built and
//! validated through [`ConversionRequestBuilder`]; [`parse_max_pages`] turns user text into
//! a page limit.
//!
//! ```
//! use cbz2pdf::request::{ConversionRequest, DEFAULT_MAX_PAGES};
//!
//! let request = ConversionRequest::builder()
//!     .sources(vec!["Volume 01.cbz".to_string()])
//!     .build()
//!     .unwrap();
//! assert_eq!(request.max_pages_per_document, DEFAULT_MAX_PAGES);
//! assert!(!request.merge);
//! ```

use crate::progress::StatusReporter;
use crate::types::OrderingPolicy;

/// Page limit used when user input for the limit cannot be understood.
pub const FALLBACK_MAX_PAGES: usize = 10;

/// Page limit of a request that does not set one.
pub const DEFAULT_MAX_PAGES: usize = 100;

/// One conversion job, built declaratively using the builder pattern.
///
/// A request names the sources to convert and how their pages are distributed over PDF
/// files. It carries no I/O of its own; hand it to [`Converter::convert`](crate::Converter::convert)
/// or [`Converter::spawn`](crate::Converter::spawn).
///
/// ## Builder Pattern
///
/// ```rust,no_run
/// # use cbz2pdf::prelude::*;
/// let request = ConversionRequest::builder()
///     .sources(vec!["Volume 01.cbz".to_string(), "Volume 02.cbz".to_string()])
///     .max_pages_per_document(150usize)
///     .merge(true)
///     .output_names(vec!["Complete".to_string()])
///     .build()
///     .expect("Invalid request");
/// ```
#[derive(Debug, Clone, derive_builder::Builder)]
#[builder(setter(into, strip_option), build_fn(validate = "Self::validate"))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConversionRequest {
    /// Source references, resolved by the [`FileAccessProvider`](crate::provider::FileAccessProvider).
    ///
    /// The order is significant: merged pages follow it, and outputs of independent sources
    /// are produced in it.
    pub sources: Vec<String>,

    /// Upper bound of pages per produced PDF. Longer archives are split into
    /// `{name}_part-{n}.pdf` files. Must be at least 1.
    #[builder(default = "DEFAULT_MAX_PAGES")]
    pub max_pages_per_document: usize,

    /// Output names without extension, one per source, or a single one when merging.
    ///
    /// Empty means every output is named after its source (`Volume 01.cbz` → `Volume 01.pdf`).
    /// Blank names fall back to the default too.
    #[builder(default)]
    pub output_names: Vec<String>,

    /// Page order inside an archive.
    #[builder(default)]
    pub ordering: OrderingPolicy,

    /// Combines every source into one page sequence before splitting.
    #[builder(default = "false")]
    pub merge: bool,

    /// Output directory, resolved by the provider. Falls back to the provider default.
    #[builder(default)]
    pub output_directory: Option<String>,

    /// Number of pages decoded concurrently inside a part.
    #[builder(default = "num_cpus::get().max(1)")]
    pub decode_parallelism: usize,
}

impl ConversionRequest {
    /// Creates a new builder for configuring a `ConversionRequest`.
    pub fn builder() -> ConversionRequestBuilder {
        ConversionRequestBuilder::default()
    }

    /// Caller supplied output name for the unit at `index`, if any.
    ///
    /// Independent sources look up their own position; a merged job looks up index 0.
    pub fn output_name_for(&self, index: usize) -> Option<&str> {
        self.output_names
            .get(index)
            .map(|name| name.trim())
            .filter(|name| !name.is_empty())
    }
}

impl ConversionRequestBuilder {
    fn validate(&self) -> std::result::Result<(), String> {
        match &self.sources {
            Some(sources) if !sources.is_empty() => {}
            _ => return Err("At least one source is required".to_string()),
        }

        if let Some(max_pages) = self.max_pages_per_document {
            if max_pages == 0 {
                return Err("Maximum number of pages per document must be at least 1".to_string());
            }
        }

        if let Some(parallelism) = self.decode_parallelism {
            if parallelism == 0 {
                return Err("Decode parallelism must be at least 1".to_string());
            }
        }

        let merge = self.merge.unwrap_or(false);
        if let (Some(names), Some(sources)) = (&self.output_names, &self.sources) {
            if merge && names.len() > 1 {
                return Err(format!(
                    "A merged conversion takes one output name, {} were given",
                    names.len()
                ));
            }
            if !merge && !names.is_empty() && names.len() != sources.len() {
                return Err(format!(
                    "Expected {} output names (one per source), {} were given",
                    sources.len(),
                    names.len()
                ));
            }
        }

        Ok(())
    }
}

/// Parses a user typed page limit.
///
/// Surrounding whitespace is ignored. Anything that is not a positive integer falls back to
/// [`FALLBACK_MAX_PAGES`]; both outcomes are reported on the phase channel.
pub fn parse_max_pages(input: &str, reporter: &StatusReporter) -> usize {
    match input.trim().parse::<usize>() {
        Ok(value) if value > 0 => {
            reporter.phase(&format!("Updated maxNumberOfPages size: {}", value));
            value
        }
        _ => {
            reporter.failure(&format!(
                "Invalid maxNumberOfPages size: {} reverting to default value",
                input
            ));
            FALLBACK_MAX_PAGES
        }
    }
}
