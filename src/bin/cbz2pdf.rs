//! CLI binary for cbz2pdf.
//!
//! A thin shim over the library crate that maps CLI flags to a `ConversionRequest`,
//! prints status lines to stderr and the produced files to stdout.

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use cbz2pdf::prelude::*;
use cbz2pdf::progress::SinkError;
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Prints phase lines (and sub-steps when verbose) to stderr.
struct ConsoleSink {
    verbose: bool,
    quiet: bool,
}

impl ProgressSink for ConsoleSink {
    fn report_phase(&self, message: &str) -> std::result::Result<(), SinkError> {
        if !self.quiet {
            writeln!(io::stderr(), "{}", message)?;
        }
        Ok(())
    }

    fn report_sub_step(&self, message: &str) -> std::result::Result<(), SinkError> {
        if self.verbose && !self.quiet {
            writeln!(io::stderr(), "  {}", message)?;
        }
        Ok(())
    }
}

/// Convert CBZ comic book archives into PDF documents.
#[derive(Parser, Debug)]
#[command(
    name = "cbz2pdf",
    version,
    about = "Convert CBZ comic book archives into PDF documents",
    long_about = "Convert one or more CBZ (ZIP) comic book archives into PDF documents. \
Each archive becomes its own PDF unless --merge is given; documents longer than --max-pages \
are split into NAME_part-1.pdf, NAME_part-2.pdf, ...",
    arg_required_else_help = true
)]
struct Cli {
    /// CBZ files to convert, in order.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Maximum number of pages per PDF. Invalid values fall back to 10.
    #[arg(short = 'm', long, env = "CBZ2PDF_MAX_PAGES", default_value = "100")]
    max_pages: String,

    /// Page order inside an archive: "name" or "offset" (order of the ZIP directory).
    #[arg(long, env = "CBZ2PDF_SORT", default_value = "name")]
    sort: OrderingPolicy,

    /// Merge all inputs into one page sequence before splitting.
    #[arg(long)]
    merge: bool,

    /// Directory the PDFs are written to (default: ~/Downloads, or the working directory).
    #[arg(short, long, env = "CBZ2PDF_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Output name without extension; once per input, or once with --merge.
    #[arg(short = 'n', long = "output-name")]
    output_names: Vec<String>,

    /// Root directory for temporary files (default: the OS temp directory).
    #[arg(long, env = "CBZ2PDF_SCRATCH_DIR")]
    scratch_dir: Option<PathBuf>,

    /// Number of pages decoded in parallel (default: number of CPUs).
    #[arg(short = 'j', long, env = "CBZ2PDF_JOBS")]
    jobs: Option<usize>,

    /// Show per-page progress and debug logs.
    #[arg(short, long, env = "CBZ2PDF_VERBOSE")]
    verbose: bool,

    /// Only print the produced files.
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let sink: Arc<dyn ProgressSink> = Arc::new(ConsoleSink {
        verbose: cli.verbose,
        quiet: cli.quiet,
    });
    let reporter = StatusReporter::new(sink.clone());
    let max_pages = parse_max_pages(&cli.max_pages, &reporter);

    let mut provider = LocalFileProvider::new();
    if let Some(scratch_dir) = &cli.scratch_dir {
        provider = provider.with_scratch_dir(scratch_dir);
    }

    let mut builder = ConversionRequest::builder();
    builder
        .sources(
            cli.inputs
                .iter()
                .map(|p| p.to_string_lossy().into_owned())
                .collect::<Vec<_>>(),
        )
        .max_pages_per_document(max_pages)
        .ordering(cli.sort)
        .merge(cli.merge)
        .output_names(cli.output_names.clone());
    if let Some(output_dir) = &cli.output_dir {
        builder.output_directory(output_dir.to_string_lossy().into_owned());
    }
    if let Some(jobs) = cli.jobs {
        builder.decode_parallelism(jobs);
    }
    let request = builder.build().context("Invalid conversion request")?;

    let converter = Converter::new(Arc::new(provider), sink);
    let result = converter
        .convert(request)
        .await
        .context("Conversion failed")?;

    let mut stdout = io::stdout().lock();
    for output in &result.outputs {
        writeln!(stdout, "{}", output.display())?;
    }
    if !cli.quiet && (!result.skipped_entries.is_empty() || !result.skipped_sources.is_empty()) {
        eprintln!(
            "Skipped {} page(s) and {} source(s)",
            result.skipped_entries.len(),
            result.skipped_sources.len()
        );
    }

    Ok(())
}
