//! Writing a planned range of archive entries into a document.
//!
//! Entries are read from the archive one after the other, decoded in parallel in
//! windows of `decode_parallelism` entries, and appended to the generator in planned
//! order. Uncompressed pixels are only held for the current window; once appended, a
//! page lives on in the generator as compressed image data.

use log::debug;
use rayon::prelude::*;

use crate::archive::SourceArchive;
use crate::cancel::{CancellationExt, CancellationToken};
use crate::error::Result;
use crate::generator::{Generator, PreparedPage, prepare_page};
use crate::progress::StatusReporter;
use crate::types::{ArchiveEntry, PageRange};

/// Where a range sits in the overall job, used for progress messages.
#[derive(Debug, Clone, Copy)]
pub struct PartContext {
    pub part_number: usize,
    pub total_parts: usize,
    /// Page count of the whole archive.
    pub total_pages: usize,
    pub decode_parallelism: usize,
}

/// What happened while writing one range.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteOutcome {
    pub written: usize,
    /// Names of entries that failed to read or decode.
    pub skipped: Vec<String>,
}

/// Progress line for the `position`-th page (1-based, counted over the whole archive).
pub fn page_progress_message(context: &PartContext, position: usize, entry_name: &str) -> String {
    if context.total_parts > 1 {
        format!(
            "Processing part {} of {} - Processing image file {} of {}: {}",
            context.part_number, context.total_parts, position, context.total_pages, entry_name
        )
    } else {
        format!(
            "Processing image file {} of {}: {}",
            position, context.total_pages, entry_name
        )
    }
}

/// Appends one page per entry of `entries[range.start..range.end]` to `generator`.
///
/// A read or decode failure is reported with the entry name and the entry is skipped; it
/// never aborts the range. Progress is reported once per attempted entry, in order.
/// Cancellation is checked before every decode window.
///
/// # Returns
///
/// * `Ok(WriteOutcome)` - Pages written and entries skipped
/// * `Err(Error)` - Cancellation, or a failure of the generator itself
pub fn write_pages<G: Generator>(
    generator: &mut G,
    archive: &mut SourceArchive,
    entries: &[ArchiveEntry],
    range: &PageRange,
    context: &PartContext,
    reporter: &StatusReporter,
    cancel: &CancellationToken,
) -> Result<WriteOutcome> {
    let mut outcome = WriteOutcome::default();
    let end = range.end.min(entries.len());
    let start = range.start.min(end);
    let window = context.decode_parallelism.max(1);

    for (window_index, chunk) in entries[start..end].chunks(window).enumerate() {
        cancel.check()?;

        let raw: Vec<(&ArchiveEntry, Result<Vec<u8>>)> = chunk
            .iter()
            .map(|entry| (entry, archive.read_entry(entry)))
            .collect();

        let decoded: Vec<(&ArchiveEntry, Result<PreparedPage>)> = raw
            .into_par_iter()
            .map(|(entry, bytes)| (entry, bytes.and_then(|data| prepare_page(&entry.name, data))))
            .collect();

        for (offset, (entry, page)) in decoded.into_iter().enumerate() {
            let position = start + window_index * window + offset + 1;
            reporter.sub_step(&page_progress_message(context, position, &entry.name));

            match page {
                Ok(page) => {
                    generator.add_page(page)?;
                    outcome.written += 1;
                }
                Err(e) => {
                    reporter.warn(&format!(
                        "Skipping entry '{}', it is not a readable image: {}",
                        entry.name, e
                    ));
                    outcome.skipped.push(entry.name.clone());
                }
            }
        }
    }

    debug!(
        "Part {} of {}: wrote {} page(s), skipped {}",
        context.part_number,
        context.total_parts,
        outcome.written,
        outcome.skipped.len()
    );

    Ok(outcome)
}
