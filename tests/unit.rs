//! Unit tests for the public building blocks of the cbz2pdf crate.

use cbz2pdf::archive::{MergeSource, SourceArchive, merge_archives, order_entries};
use cbz2pdf::error::{Error, Result};
use cbz2pdf::path_utils::{default_pdf_name, override_pdf_name, part_file_name};
use cbz2pdf::planner::plan;
use cbz2pdf::prelude::*;
use cbz2pdf::request::FALLBACK_MAX_PAGES;

mod common;
use common::{RecordingSink, create_cbz, png_page, setup_test_dirs};

fn entry(name: &str, index: usize) -> ArchiveEntry {
    ArchiveEntry {
        name: name.to_string(),
        index,
        offset: (index * 100) as u64,
        size: 10,
        source_seq: 0,
    }
}

#[test]
fn test_name_ordering_is_a_sorted_permutation() {
    let entries = vec![
        entry("010.jpg", 0),
        entry("002.jpg", 1),
        entry("001.jpg", 2),
        entry("Cover.jpg", 3),
        entry("cover.jpg", 4),
    ];

    let ordered = order_entries(&entries, OrderingPolicy::ByNameAscending);
    let names: Vec<&str> = ordered.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["001.jpg", "002.jpg", "010.jpg", "Cover.jpg", "cover.jpg"]
    );

    let by_offset = order_entries(&entries, OrderingPolicy::ByInsertionOffset);
    let indices: Vec<usize> = by_offset.iter().map(|e| e.index).collect();
    assert_eq!(indices, vec![0, 1, 2, 3, 4]);
}

#[test]
fn test_plan_covers_pages_exactly() {
    let output = plan(250, 100, "output.pdf").unwrap();
    assert_eq!(output.total_parts(), 3);
    let lens: Vec<usize> = output.iter().map(PageRange::len).collect();
    assert_eq!(lens, vec![100, 100, 50]);
    assert_eq!(output.ranges[1].file_name, "output_part-2.pdf");

    assert!(matches!(
        plan(5, 0, "output.pdf"),
        Err(Error::InvalidConfiguration(_))
    ));
}

#[test]
fn test_output_names() {
    assert_eq!(default_pdf_name("Volume 01.cbz"), "Volume 01.pdf");
    assert_eq!(default_pdf_name("Volume 01.CBZ"), "Volume 01.pdf");
    assert_eq!(default_pdf_name("archive.zip"), "archive.pdf");
    assert_eq!(default_pdf_name("noext"), "noext.pdf");
    assert_eq!(override_pdf_name("My: Book"), "My- Book.pdf");
    assert_eq!(part_file_name("output.pdf", 2), "output_part-2.pdf");
}

#[test]
fn test_parse_max_pages_reports_fallback() {
    let sink = RecordingSink::new();
    let reporter = StatusReporter::new(sink.clone());

    assert_eq!(parse_max_pages("42", &reporter), 42);
    assert_eq!(parse_max_pages("forty-two", &reporter), FALLBACK_MAX_PAGES);
    assert_eq!(parse_max_pages("-3", &reporter), FALLBACK_MAX_PAGES);

    let phases = sink.phases();
    assert_eq!(phases[0], "Updated maxNumberOfPages size: 42");
    assert!(phases[1].starts_with("Invalid maxNumberOfPages size: forty-two"));
    assert_eq!(phases.len(), 3);
}

#[tokio::test]
async fn test_merge_archives_tags_sources() -> Result<()> {
    let dirs = setup_test_dirs("unit_merge").await;
    let first = dirs.source_dir.join("z-first.cbz");
    let second = dirs.source_dir.join("a-second.cbz");
    let broken = dirs.source_dir.join("broken.cbz");
    create_cbz(
        &first,
        &[
            ("2.png".to_string(), png_page(2, 2)),
            ("1.png".to_string(), png_page(1, 2)),
        ],
    );
    create_cbz(&second, &[("1.png".to_string(), png_page(3, 2))]);
    std::fs::write(&broken, b"nope").unwrap();

    let sources: Vec<MergeSource> = [&first, &broken, &second]
        .iter()
        .map(|path| MergeSource {
            path: path.to_path_buf(),
            display_name: path.file_name().unwrap().to_string_lossy().into_owned(),
            source_ref: path.to_string_lossy().into_owned(),
        })
        .collect();

    let sink = RecordingSink::new();
    let merged = merge_archives(
        &sources,
        &dirs.scratch_dir.join("combined.cbz"),
        &StatusReporter::new(sink.clone()),
        &CancellationToken::new(),
    )?;

    assert_eq!(merged.sources_merged, 2);
    assert_eq!(merged.entry_count(), 3);
    assert_eq!(merged.display_name, "z-first.cbz");
    assert_eq!(merged.skipped_sources, vec![broken.to_string_lossy().into_owned()]);

    let archive = SourceArchive::open_merged(&merged)?;
    let ordered = archive.ordered_entries(OrderingPolicy::ByNameAscending);
    let seqs: Vec<usize> = ordered.iter().map(|e| e.source_seq).collect();
    assert_eq!(seqs, vec![0, 0, 2]);
    assert!(ordered[0].name.ends_with("1.png"));
    assert!(ordered[2].name.contains("a-second"));
    assert!(sink.saw_sub_step("Merging file 2 of 3: broken.cbz"));
    Ok(())
}
