//! File name utilities for output documents and scratch copies.
//!
//! Output names are derived from the display name of a source archive or from a
//! caller override, sanitised so they are valid on every platform, and suffixed
//! with `_part-N` when an archive is split across several documents.

use lazy_static::lazy_static;
use regex::Regex;
use std::path::Path;

lazy_static! {
    /// Matches a trailing archive extension (`.cbz` or `.zip`, any case).
    static ref ARCHIVE_EXTENSION_REGEX: Regex = Regex::new(r"(?i)\.(cbz|zip)$").unwrap();
    /// Matches a trailing `.pdf` extension (any case).
    static ref PDF_EXTENSION_REGEX: Regex = Regex::new(r"(?i)\.pdf$").unwrap();
}

/// Extension given to every produced document.
pub const PDF_EXTENSION: &str = "pdf";

/// Gets the file name from a path with fallback to lossy conversion.
///
/// # Arguments
///
/// * `path` - The path to extract the file name from
///
/// # Returns
///
/// * `String` - The file name, using lossy conversion if necessary
pub fn get_file_name_lossy(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Converts a path to a string with fallback to lossy conversion.
pub fn path_to_string_lossy(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

/// Sanitizes a filename by replacing invalid characters with safe alternatives.
///
/// # Arguments
///
/// * `filename` - The filename to sanitize
///
/// # Returns
///
/// * `String` - The sanitized filename
pub fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| match c {
            '<' | '>' | '"' | '|' | '?' | '*' => '-',
            ':' => '-',
            '/' | '\\' => '-',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

/// Derives the default PDF file name for a source archive.
///
/// A trailing `.cbz`/`.zip` becomes `.pdf`; any other name gets `.pdf` appended.
///
/// ```
/// use cbz2pdf::path_utils::default_pdf_name;
/// assert_eq!(default_pdf_name("Volume 01.cbz"), "Volume 01.pdf");
/// ```
pub fn default_pdf_name(display_name: &str) -> String {
    let sanitized = sanitize_filename(display_name.trim());
    if PDF_EXTENSION_REGEX.is_match(&sanitized) {
        return sanitized;
    }
    if ARCHIVE_EXTENSION_REGEX.is_match(&sanitized) {
        ARCHIVE_EXTENSION_REGEX
            .replace(&sanitized, format!(".{}", PDF_EXTENSION))
            .into_owned()
    } else {
        format!("{}.{}", sanitized, PDF_EXTENSION)
    }
}

/// Turns a caller supplied output name (given without extension) into a PDF file name.
pub fn override_pdf_name(name: &str) -> String {
    let sanitized = sanitize_filename(name.trim());
    if PDF_EXTENSION_REGEX.is_match(&sanitized) {
        sanitized
    } else {
        format!("{}.{}", sanitized, PDF_EXTENSION)
    }
}

/// Inserts `_part-{part_number}` in front of the extension of `file_name`.
///
/// `output.pdf` becomes `output_part-1.pdf`; a name without extension gets the suffix appended.
pub fn part_file_name(file_name: &str, part_number: usize) -> String {
    match file_name.rfind('.') {
        Some(dot) if dot > 0 => format!(
            "{}_part-{}{}",
            &file_name[..dot],
            part_number,
            &file_name[dot..]
        ),
        _ => format!("{}_part-{}", file_name, part_number),
    }
}

/// `Vol.pdf` → `Vol (2).pdf`, used when a job would write the same name twice.
pub fn numbered_file_name(file_name: &str, number: usize) -> String {
    match file_name.rfind('.') {
        Some(dot) if dot > 0 => format!(
            "{} ({}){}",
            &file_name[..dot],
            number,
            &file_name[dot..]
        ),
        _ => format!("{} ({})", file_name, number),
    }
}

/// Short name used to prefix entries of a source inside a merged archive.
pub fn merge_name_hint(display_name: &str) -> String {
    let stem = ARCHIVE_EXTENSION_REGEX.replace(display_name.trim(), "");
    sanitize_filename(&stem).replace(' ', "_")
}

/// Checks if a filename starts with a dot (hidden file).
pub fn is_hidden_entry(name: &str) -> bool {
    name.rsplit('/')
        .find(|segment| !segment.is_empty())
        .map(|segment| segment.starts_with('.'))
        .unwrap_or(false)
}
