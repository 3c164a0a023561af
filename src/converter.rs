//! Job orchestration: from source references to PDF files.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, info, warn};
use tokio::io::AsyncWriteExt;
use tokio::task::JoinHandle;

use crate::archive::{MergeSource, merge_archives};
use crate::cancel::{CancellationExt, CancellationToken};
use crate::error::{Error, Result};
use crate::path_utils::{
    default_pdf_name, numbered_file_name, override_pdf_name, path_to_string_lossy,
};
use crate::pipeline::{ConversionUnit, PhaseTracker, PipelineSettings, UnitSource, run_unit};
use crate::progress::{ProgressSink, StatusReporter};
use crate::provider::FileAccessProvider;
use crate::request::ConversionRequest;
use crate::types::{ConversionPhase, ConversionResult};

/// Name of the merged archive inside a job's scratch directory.
const COMBINED_ARCHIVE_NAME: &str = "combined.cbz";

/// Runs conversion jobs, one at a time.
///
/// A converter owns the collaborators a job needs: the [`FileAccessProvider`] that resolves
/// sources and output locations, and the [`ProgressSink`] that receives status messages.
/// Submitting a job while another one is running fails with [`Error::Busy`].
///
/// ```rust,no_run
/// # use cbz2pdf::prelude::*;
/// # use std::sync::Arc;
/// # #[tokio::main]
/// # async fn main() -> cbz2pdf::error::Result<()> {
/// let converter = Converter::new(
///     Arc::new(LocalFileProvider::new()),
///     Arc::new(NoopProgressSink),
/// );
/// let request = ConversionRequest::builder()
///     .sources(vec!["Volume 01.cbz".to_string()])
///     .build()?;
///
/// let result = converter.convert(request).await?;
/// println!("Created {:?}", result.outputs);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Converter {
    provider: Arc<dyn FileAccessProvider>,
    reporter: StatusReporter,
    phase: PhaseTracker,
    busy: Arc<AtomicBool>,
}

impl std::fmt::Debug for Converter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Converter")
            .field("phase", &self.phase.get())
            .field("busy", &self.is_busy())
            .finish_non_exhaustive()
    }
}

/// Holds the converter's busy flag for the lifetime of one job.
struct BusyGuard {
    flag: Arc<AtomicBool>,
}

impl BusyGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Result<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| Error::Busy)?;
        Ok(Self { flag: flag.clone() })
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Handle to a job started with [`Converter::spawn`].
#[derive(Debug)]
pub struct ConversionJob {
    handle: JoinHandle<Result<ConversionResult>>,
    cancel: CancellationToken,
}

impl ConversionJob {
    /// Asks the job to stop at the next source, part or decode window boundary.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Waits for the job and returns its outcome.
    pub async fn wait(self) -> Result<ConversionResult> {
        self.handle.await?
    }
}

/// A source that was copied to scratch storage.
#[derive(Debug)]
struct PreparedSource {
    index: usize,
    source_ref: String,
    display_name: String,
    path: PathBuf,
}

/// Everything a running job needs, detached from the converter.
#[derive(Clone)]
struct JobContext {
    provider: Arc<dyn FileAccessProvider>,
    reporter: StatusReporter,
    phase: PhaseTracker,
}

impl Converter {
    pub fn new(provider: Arc<dyn FileAccessProvider>, sink: Arc<dyn ProgressSink>) -> Self {
        Self {
            provider,
            reporter: StatusReporter::new(sink),
            phase: PhaseTracker::new(),
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Phase of the current (or last) job.
    pub fn phase(&self) -> ConversionPhase {
        self.phase.get()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Runs `request` to completion.
    ///
    /// # Returns
    ///
    /// * `Ok(ConversionResult)` - At least one PDF was produced
    /// * `Err(Error::Busy)` - Another job is running on this converter
    /// * `Err(Error::EmptyResult)` - Nothing could be converted
    /// * `Err(Error)` - Any other job-level failure
    pub async fn convert(&self, request: ConversionRequest) -> Result<ConversionResult> {
        self.convert_with_cancel(request, CancellationToken::new())
            .await
    }

    /// Runs `request` to completion, stopping early once `cancel` is triggered.
    ///
    /// Dropping the returned future cancels the job. The job's blocking work finishes its
    /// current page first, and the converter stays busy until it has.
    pub async fn convert_with_cancel(
        &self,
        request: ConversionRequest,
        cancel: CancellationToken,
    ) -> Result<ConversionResult> {
        let guard = BusyGuard::acquire(&self.busy)?;
        let cancel_on_drop = cancel.clone().drop_guard();
        let handle = tokio::spawn(run_guarded(guard, self.context(), request, cancel));

        let result = handle.await?;
        cancel_on_drop.disarm();
        result
    }

    /// Starts `request` in the background and returns a handle to it.
    ///
    /// The busy flag is taken before this returns, so a second submission is rejected right
    /// away. Must be called from within a Tokio runtime.
    pub fn spawn(&self, request: ConversionRequest) -> Result<ConversionJob> {
        let guard = BusyGuard::acquire(&self.busy)?;
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_guarded(
            guard,
            self.context(),
            request,
            cancel.clone(),
        ));

        Ok(ConversionJob { handle, cancel })
    }

    fn context(&self) -> JobContext {
        JobContext {
            provider: self.provider.clone(),
            reporter: self.reporter.clone(),
            phase: self.phase.clone(),
        }
    }
}

/// Runs a job while holding the converter's busy flag.
async fn run_guarded(
    _guard: BusyGuard,
    context: JobContext,
    request: ConversionRequest,
    cancel: CancellationToken,
) -> Result<ConversionResult> {
    run_job(context, request, cancel).await
}

async fn run_job(
    context: JobContext,
    request: ConversionRequest,
    cancel: CancellationToken,
) -> Result<ConversionResult> {
    context.reporter.phase("Conversion started");

    match execute(&context, &request, &cancel).await {
        Ok(result) => {
            context.reporter.phase(&summary_message(&result.outputs));
            info!(
                "Conversion finished: {} file(s), {} page(s), {} skipped page(s), {} skipped source(s)",
                result.outputs.len(),
                result.pages_written,
                result.skipped_entries.len(),
                result.skipped_sources.len()
            );
            context.phase.set(ConversionPhase::Idle);
            Ok(result)
        }
        Err(e) => {
            context.phase.set(ConversionPhase::Failed);
            context.reporter.failure(&format!("Conversion failed: {}", e));
            Err(e)
        }
    }
}

async fn execute(
    context: &JobContext,
    request: &ConversionRequest,
    cancel: &CancellationToken,
) -> Result<ConversionResult> {
    context.phase.set(ConversionPhase::Preparing);
    context
        .reporter
        .phase("Conversion from CBZ to PDF started");

    let output_dir = resolve_output_dir(context, request).await?;

    let scratch_root = context.provider.scratch_dir();
    tokio::fs::create_dir_all(&scratch_root).await?;
    let scratch = tempfile::Builder::new()
        .prefix("cbz2pdf-")
        .tempdir_in(&scratch_root)?;
    debug!("Scratch directory {:?}", scratch.path());

    let settings = PipelineSettings {
        max_pages: request.max_pages_per_document,
        ordering: request.ordering,
        decode_parallelism: request.decode_parallelism,
        output_dir,
    };
    let outcome = process(context, request, &settings, scratch.path(), cancel).await;

    context.phase.set(ConversionPhase::Finalizing);
    let scratch_path = scratch.path().to_path_buf();
    if let Err(e) = scratch.close() {
        warn!(
            "Could not remove scratch directory '{}': {}",
            path_to_string_lossy(&scratch_path),
            e
        );
    }

    let result = outcome?;
    if result.is_empty() {
        return Err(Error::EmptyResult(
            "CBZ file is invalid or empty".to_string(),
        ));
    }
    Ok(result)
}

/// The request's output directory through the provider, or the provider default; created
/// when missing.
async fn resolve_output_dir(context: &JobContext, request: &ConversionRequest) -> Result<PathBuf> {
    let output_dir = match &request.output_directory {
        Some(requested) => context
            .provider
            .resolve_output_dir(requested)
            .await
            .map_err(|e| Error::OutputDirectory {
                path: PathBuf::from(requested),
                reason: e.to_string(),
            })?,
        None => context.provider.default_output_dir(),
    };

    tokio::fs::create_dir_all(&output_dir)
        .await
        .map_err(|e| Error::OutputDirectory {
            path: output_dir.clone(),
            reason: e.to_string(),
        })?;
    Ok(output_dir)
}

async fn process(
    context: &JobContext,
    request: &ConversionRequest,
    settings: &PipelineSettings,
    scratch_dir: &Path,
    cancel: &CancellationToken,
) -> Result<ConversionResult> {
    let mut result = ConversionResult::default();
    let mut prepared = Vec::with_capacity(request.sources.len());

    for (index, source_ref) in request.sources.iter().enumerate() {
        cancel.check()?;
        match prepare_source(context, index, source_ref, scratch_dir).await {
            Ok(source) => prepared.push(source),
            Err(e) => {
                context
                    .reporter
                    .warn(&format!("Skipping source '{}': {}", source_ref, e));
                result.skipped_sources.push(source_ref.clone());
            }
        }
    }

    if request.merge {
        if prepared.is_empty() {
            return Err(Error::NoReadableSources(request.sources.len()));
        }
        cancel.check()?;
        context.phase.set(ConversionPhase::Merging);

        let merge_sources: Vec<MergeSource> = prepared
            .iter()
            .map(|source| MergeSource {
                path: source.path.clone(),
                display_name: source.display_name.clone(),
                source_ref: source.source_ref.clone(),
            })
            .collect();
        let destination = scratch_dir.join(COMBINED_ARCHIVE_NAME);
        let reporter = context.reporter.clone();
        let token = cancel.clone();
        let merged = tokio::task::spawn_blocking(move || {
            merge_archives(&merge_sources, &destination, &reporter, &token)
        })
        .await??;
        result
            .skipped_sources
            .extend(merged.skipped_sources.iter().cloned());

        let output_file_name = output_file_name(request, 0, &merged.display_name);
        let unit = ConversionUnit {
            display_name: merged.display_name.clone(),
            source: UnitSource::Merged(merged),
            output_file_name,
        };
        result.absorb(convert_unit(context, unit, settings, cancel).await?);
        return Ok(result);
    }

    let mut used_names = HashSet::new();
    for source in prepared {
        cancel.check()?;
        let planned = output_file_name(request, source.index, &source.display_name);
        let file_name = unique_file_name(&planned, &mut used_names);
        if file_name != planned {
            context.reporter.warn(&format!(
                "Output name '{}' is already used by this conversion, writing '{}' instead",
                planned, file_name
            ));
        }
        let unit = ConversionUnit {
            output_file_name: file_name,
            display_name: source.display_name.clone(),
            source: UnitSource::Single(source.path.clone()),
        };

        match convert_unit(context, unit, settings, cancel).await {
            Ok(unit_result) => {
                used_names.extend(unit_result.outputs.iter().filter_map(|path| {
                    path.file_name()
                        .map(|name| name.to_string_lossy().to_lowercase())
                }));
                result.absorb(unit_result);
            }
            Err(Error::Cancelled) => return Err(Error::Cancelled),
            Err(e) => {
                context.reporter.warn(&format!(
                    "Conversion of '{}' failed: {}",
                    source.display_name, e
                ));
                result.skipped_sources.push(source.source_ref);
            }
        }
    }

    Ok(result)
}

/// Copies one source into the scratch directory as `source-{index}.cbz`.
async fn prepare_source(
    context: &JobContext,
    index: usize,
    source_ref: &str,
    scratch_dir: &Path,
) -> Result<PreparedSource> {
    let unreadable = |reason: String| Error::SourceUnreadable {
        source_ref: source_ref.to_string(),
        reason,
    };

    let display_name = context
        .provider
        .display_name(source_ref)
        .await
        .map_err(|e| unreadable(e.to_string()))?;
    context
        .reporter
        .sub_step(&format!("Copying {} to scratch storage", display_name));

    let mut stream = context.provider.open_source(source_ref).await?;
    let path = scratch_dir.join(format!("source-{}.cbz", index));
    let mut file = tokio::fs::File::create(&path).await?;
    let copied = tokio::io::copy(&mut stream, &mut file)
        .await
        .map_err(|e| unreadable(e.to_string()))?;
    file.flush().await?;

    debug!(
        "Copied {} ({} bytes) to {}",
        source_ref,
        copied,
        path_to_string_lossy(&path)
    );

    Ok(PreparedSource {
        index,
        source_ref: source_ref.to_string(),
        display_name,
        path,
    })
}

async fn convert_unit(
    context: &JobContext,
    unit: ConversionUnit,
    settings: &PipelineSettings,
    cancel: &CancellationToken,
) -> Result<ConversionResult> {
    let settings = settings.clone();
    let reporter = context.reporter.clone();
    let token = cancel.clone();
    let phase = context.phase.clone();

    tokio::task::spawn_blocking(move || run_unit(&unit, &settings, &reporter, &token, &phase))
        .await?
}

fn output_file_name(request: &ConversionRequest, index: usize, display_name: &str) -> String {
    request
        .output_name_for(index)
        .map(override_pdf_name)
        .unwrap_or_else(|| default_pdf_name(display_name))
}

/// `file_name`, or the first free `name (n).pdf` variant, compared case-insensitively
/// against `used`. The returned name is added to `used`.
fn unique_file_name(file_name: &str, used: &mut HashSet<String>) -> String {
    let mut candidate = file_name.to_string();
    let mut number = 2;
    while used.contains(&candidate.to_lowercase()) {
        candidate = numbered_file_name(file_name, number);
        number += 1;
    }
    used.insert(candidate.to_lowercase());
    candidate
}

/// Final status line of a successful job.
pub fn summary_message(outputs: &[PathBuf]) -> String {
    match outputs {
        [single] => format!("PDF created: {}", path_to_string_lossy(single)),
        _ => format!(
            "Multiple PDFs created: {}",
            outputs
                .iter()
                .map(|path| format!("\n {}", path_to_string_lossy(path)))
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}
