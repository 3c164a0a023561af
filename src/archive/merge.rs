//! Combining several archives into one page sequence.

use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::archive::SourceArchive;
use crate::cancel::{CancellationExt, CancellationToken};
use crate::error::{Error, Result};
use crate::path_utils::merge_name_hint;
use crate::progress::StatusReporter;

/// One archive taking part in a merge.
#[derive(Debug, Clone)]
pub struct MergeSource {
    /// Local, randomly accessible copy of the archive.
    pub path: PathBuf,
    pub display_name: String,
    /// Caller reference, used in reports.
    pub source_ref: String,
}

/// The outcome of [`merge_archives`].
#[derive(Debug, Clone)]
pub struct MergedArchive {
    pub path: PathBuf,
    /// Display name of the first source that made it into the archive.
    pub display_name: String,
    /// Renamed entry → position of its source in the caller's list.
    pub entry_sources: HashMap<String, usize>,
    pub sources_merged: usize,
    pub skipped_sources: Vec<String>,
}

impl MergedArchive {
    pub fn entry_count(&self) -> usize {
        self.entry_sources.len()
    }
}

/// Name an entry gets inside a merged archive: `{index}_{hint}_{original}`.
///
/// The index is zero-padded to the width of the source count so the names read in order,
/// but ordering never relies on it; see [`MergedArchive::entry_sources`].
pub fn merged_entry_name(source_index: usize, source_count: usize, hint: &str, original: &str) -> String {
    let width = source_count.max(1).to_string().len();
    format!("{:0width$}_{}_{}", source_index, hint, original, width = width)
}

/// Copies every page of `sources`, in the given order, into a new archive at `destination`.
///
/// Sources that cannot be opened are reported and skipped. Fails with
/// [`Error::NoReadableSources`] when none of them could be merged.
pub fn merge_archives(
    sources: &[MergeSource],
    destination: &Path,
    reporter: &StatusReporter,
    cancel: &CancellationToken,
) -> Result<MergedArchive> {
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    let mut zip = ZipWriter::new(File::create(destination)?);

    let mut entry_sources = HashMap::new();
    let mut skipped_sources = Vec::new();
    let mut display_name: Option<String> = None;
    let mut sources_merged = 0;

    for (source_index, source) in sources.iter().enumerate() {
        cancel.check()?;
        reporter.sub_step(&format!(
            "Merging file {} of {}: {}",
            source_index + 1,
            sources.len(),
            source.display_name
        ));

        let mut archive = match SourceArchive::open(&source.path) {
            Ok(archive) => archive,
            Err(e) => {
                reporter.warn(&format!(
                    "Skipping '{}' while merging, it could not be opened: {}",
                    source.display_name, e
                ));
                skipped_sources.push(source.source_ref.clone());
                continue;
            }
        };

        let hint = merge_name_hint(&source.display_name);
        let entries = archive.entries().to_vec();
        for entry in &entries {
            let renamed = merged_entry_name(source_index, sources.len(), &hint, &entry.name);
            if entry_sources.contains_key(&renamed) {
                reporter.warn(&format!(
                    "Skipping duplicate entry '{}' in '{}'",
                    entry.name, source.display_name
                ));
                continue;
            }

            let data = match archive.read_entry(entry) {
                Ok(data) => data,
                Err(e) => {
                    reporter.warn(&format!(
                        "Skipping entry '{}' of '{}', it could not be read: {}",
                        entry.name, source.display_name, e
                    ));
                    continue;
                }
            };

            zip.start_file(
                renamed.clone(),
                options.large_file(data.len() as u64 >= u32::MAX as u64),
            )?;
            zip.write_all(&data)?;
            entry_sources.insert(renamed, source_index);
        }

        debug!(
            "Merged {} entries from {:?} as source {}",
            entries.len(),
            source.path,
            source_index
        );
        sources_merged += 1;
        if display_name.is_none() {
            display_name = Some(source.display_name.clone());
        }
    }

    zip.finish()?;

    let display_name = display_name.ok_or(Error::NoReadableSources(sources.len()))?;

    Ok(MergedArchive {
        path: destination.to_path_buf(),
        display_name,
        entry_sources,
        sources_merged,
        skipped_sources,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OrderingPolicy;

    fn write_zip(path: &Path, names: &[&str]) {
        let mut zip = ZipWriter::new(File::create(path).unwrap());
        for name in names {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(name.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    fn source(dir: &Path, file: &str, names: &[&str]) -> MergeSource {
        let path = dir.join(file);
        write_zip(&path, names);
        MergeSource {
            path,
            display_name: file.to_string(),
            source_ref: file.to_string(),
        }
    }

    #[test]
    fn test_merged_entry_name_padding() {
        assert_eq!(merged_entry_name(0, 2, "A", "1.png"), "0_A_1.png");
        assert_eq!(merged_entry_name(3, 12, "B", "x/1.png"), "03_B_x/1.png");
    }

    #[test]
    fn test_merge_preserves_source_order() {
        let dir = tempfile::tempdir().unwrap();
        let sources = vec![
            source(dir.path(), "A.cbz", &["2.png", "1.png"]),
            source(dir.path(), "B.cbz", &["1.png"]),
        ];
        let destination = dir.path().join("combined.cbz");

        let merged = merge_archives(
            &sources,
            &destination,
            &StatusReporter::default(),
            &CancellationToken::new(),
        )
        .unwrap();

        assert_eq!(merged.display_name, "A.cbz");
        assert_eq!(merged.sources_merged, 2);
        assert_eq!(merged.entry_count(), 3);

        let archive = SourceArchive::open_merged(&merged).unwrap();
        let ordered: Vec<String> = archive
            .ordered_entries(OrderingPolicy::ByNameAscending)
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(ordered, vec!["0_A_1.png", "0_A_2.png", "1_B_1.png"]);
    }

    #[test]
    fn test_merge_skips_unreadable_sources() {
        let dir = tempfile::tempdir().unwrap();
        let broken = dir.path().join("broken.cbz");
        std::fs::write(&broken, b"not a zip").unwrap();
        let sources = vec![
            MergeSource {
                path: broken,
                display_name: "broken.cbz".to_string(),
                source_ref: "broken.cbz".to_string(),
            },
            source(dir.path(), "ok.cbz", &["1.png"]),
        ];

        let merged = merge_archives(
            &sources,
            &dir.path().join("combined.cbz"),
            &StatusReporter::default(),
            &CancellationToken::new(),
        )
        .unwrap();

        assert_eq!(merged.display_name, "ok.cbz");
        assert_eq!(merged.skipped_sources, vec!["broken.cbz".to_string()]);
        assert_eq!(merged.entry_sources.get("1_ok_1.png"), Some(&1));
    }

    #[test]
    fn test_merge_without_readable_sources_fails() {
        let dir = tempfile::tempdir().unwrap();
        let broken = dir.path().join("broken.cbz");
        std::fs::write(&broken, b"not a zip").unwrap();
        let sources = vec![MergeSource {
            path: broken,
            display_name: "broken.cbz".to_string(),
            source_ref: "broken.cbz".to_string(),
        }];

        let result = merge_archives(
            &sources,
            &dir.path().join("combined.cbz"),
            &StatusReporter::default(),
            &CancellationToken::new(),
        );
        assert!(matches!(result, Err(Error::NoReadableSources(1))));
    }
}
