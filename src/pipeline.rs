//! The blocking part of a conversion: one archive in, one or more PDF files out.
//!
//! A [`ConversionUnit`] is either a single scratch copy or a merged archive. Running it
//! opens the archive, orders its entries, plans the output parts and writes each part.
//! Everything here is synchronous; the converter runs it on the blocking thread pool.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use log::{debug, info};

use crate::archive::{MergedArchive, SourceArchive};
use crate::cancel::{CancellationExt, CancellationToken};
use crate::error::Result;
use crate::generator::{DocumentMetadata, Generator, PdfGenerator};
use crate::planner;
use crate::progress::StatusReporter;
use crate::types::{ConversionPhase, ConversionResult, OrderingPolicy};
use crate::writer::{PartContext, write_pages};

/// Shared view of the phase a job is in.
#[derive(Debug, Clone, Default)]
pub struct PhaseTracker {
    phase: Arc<Mutex<ConversionPhase>>,
}

impl PhaseTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, phase: ConversionPhase) {
        match self.phase.lock() {
            Ok(mut current) => *current = phase,
            Err(poisoned) => *poisoned.into_inner() = phase,
        }
    }

    pub fn get(&self) -> ConversionPhase {
        match self.phase.lock() {
            Ok(current) => *current,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

/// Request settings a unit needs, detached from the request itself.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub max_pages: usize,
    pub ordering: OrderingPolicy,
    pub decode_parallelism: usize,
    /// Existing directory the PDF files are written to.
    pub output_dir: PathBuf,
}

/// Where the pages of a unit come from.
#[derive(Debug, Clone)]
pub enum UnitSource {
    /// A scratch copy of one source archive.
    Single(PathBuf),
    /// Several sources combined into one archive.
    Merged(MergedArchive),
}

/// One archive to convert and the name its output is derived from.
#[derive(Debug, Clone)]
pub struct ConversionUnit {
    pub source: UnitSource,
    pub display_name: String,
    /// File name of the output when it fits into one part, e.g. `Volume 01.pdf`.
    pub output_file_name: String,
}

impl ConversionUnit {
    fn open(&self) -> Result<SourceArchive> {
        match &self.source {
            UnitSource::Single(path) => SourceArchive::open(path),
            UnitSource::Merged(merged) => SourceArchive::open_merged(merged),
        }
    }
}

/// Converts `unit` into PDF files inside `settings.output_dir`.
///
/// # Returns
///
/// * `Ok(ConversionResult)` - Produced files, empty when the archive holds no pages
/// * `Err(Error)` - The archive could not be opened, a PDF could not be written, or the
///   job was cancelled
pub fn run_unit(
    unit: &ConversionUnit,
    settings: &PipelineSettings,
    reporter: &StatusReporter,
    cancel: &CancellationToken,
    phase: &PhaseTracker,
) -> Result<ConversionResult> {
    phase.set(ConversionPhase::Planning);
    let mut archive = unit.open()?;
    let result = convert_archive(&mut archive, unit, settings, reporter, cancel, phase);
    drop(archive);
    result
}

fn convert_archive(
    archive: &mut SourceArchive,
    unit: &ConversionUnit,
    settings: &PipelineSettings,
    reporter: &StatusReporter,
    cancel: &CancellationToken,
    phase: &PhaseTracker,
) -> Result<ConversionResult> {
    let mut result = ConversionResult::default();

    let entries = archive.ordered_entries(settings.ordering);
    let plan = planner::plan(entries.len(), settings.max_pages, &unit.output_file_name)?;
    if plan.is_empty() {
        reporter.warn(&format!("No images found in {}", unit.display_name));
        return Ok(result);
    }

    info!(
        "Converting {} ({} page(s)) into {} part(s), ordered {}",
        unit.display_name,
        plan.total_pages,
        plan.total_parts(),
        settings.ordering
    );

    let title = document_title(&unit.output_file_name);
    for range in plan.iter() {
        cancel.check()?;
        phase.set(ConversionPhase::Writing {
            part: range.part_number,
            total_parts: plan.total_parts(),
        });
        if plan.is_split() {
            reporter.sub_step(&format!(
                "Processing part {} of {}",
                range.part_number,
                plan.total_parts()
            ));
        }

        let output_path = settings.output_dir.join(&range.file_name);
        let mut generator = PdfGenerator::new(&output_path)?;
        generator.set_metadata(&DocumentMetadata {
            title: title.clone(),
            part_number: range.part_number,
            total_parts: plan.total_parts(),
        })?;

        let context = PartContext {
            part_number: range.part_number,
            total_parts: plan.total_parts(),
            total_pages: plan.total_pages,
            decode_parallelism: settings.decode_parallelism,
        };
        let outcome = write_pages(
            &mut generator,
            archive,
            &entries,
            range,
            &context,
            reporter,
            cancel,
        )?;
        result.skipped_entries.extend(outcome.skipped);

        if generator.page_count() == 0 {
            // Dropping an empty generator removes its file.
            drop(generator);
            reporter.warn(&format!(
                "No readable images in part {} of {}, {} was not written",
                range.part_number,
                plan.total_parts(),
                range.file_name
            ));
            continue;
        }

        let written = generator.save()?;
        debug!("Saved {:?} with {} page(s)", written, outcome.written);
        result.pages_written += outcome.written;
        result.outputs.push(written);
    }

    Ok(result)
}

/// `Volume 01.pdf` → `Volume 01`.
fn document_title(file_name: &str) -> String {
    Path::new(file_name)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_name.to_string())
}
