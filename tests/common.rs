//! Common test utilities and constants for the cbz2pdf crate.
//!
//! Provides functions for setting up test directories, building fixture CBZ archives,
//! recording progress messages and inspecting produced PDF files.

use cbz2pdf::prelude::*;
use cbz2pdf::progress::SinkError;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use lopdf::Document;
use rand::{Rng, distributions::Alphanumeric};
use std::io::{Cursor, Write};
use std::sync::Mutex;
use std::sync::mpsc;
use std::time::Duration;
use tokio::fs;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

#[allow(dead_code)]
pub const TEST_TMP_DIR: &str = "tests/tmp";
#[allow(dead_code)]
pub const TEST_TIMEOUT: Duration = Duration::from_secs(30);
#[allow(dead_code)]
pub const LONG_TEST_TIMEOUT: Duration = Duration::from_secs(120); // For full conversions if they are slow

/// Per-test directory layout.
#[allow(dead_code)]
pub struct TestDirs {
    pub base: PathBuf,
    pub source_dir: PathBuf,
    pub target_dir: PathBuf,
    pub scratch_dir: PathBuf,
}

/// Helper function to create a clean, uniquely named test directory with source, target
/// and scratch subdirectories.
#[allow(dead_code)]
pub async fn setup_test_dirs(sub_path: &str) -> TestDirs {
    let rand_string: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(char::from)
        .collect();
    let base = PathBuf::from(TEST_TMP_DIR).join(format!("{}-{}", sub_path, rand_string));
    if base.exists() {
        fs::remove_dir_all(&base).await.unwrap();
    }
    let dirs = TestDirs {
        source_dir: base.join("source"),
        target_dir: base.join("target"),
        scratch_dir: base.join("scratch"),
        base,
    };

    fs::create_dir_all(&dirs.source_dir).await.unwrap();
    fs::create_dir_all(&dirs.target_dir).await.unwrap();
    fs::create_dir_all(&dirs.scratch_dir).await.unwrap();

    dirs
}

/// A converter reading from the local filesystem, writing to `target_dir` by default and
/// keeping its scratch files under `scratch_dir`.
#[allow(dead_code)]
pub fn local_converter(dirs: &TestDirs, sink: Arc<dyn ProgressSink>) -> Converter {
    let provider = LocalFileProvider::new()
        .with_scratch_dir(&dirs.scratch_dir)
        .with_default_output_dir(&dirs.target_dir);
    Converter::new(Arc::new(provider), sink)
}

/// Encodes a solid image of the given size.
#[allow(dead_code)]
pub fn image_bytes(width: u32, height: u32, color: Rgb<u8>, format: ImageFormat) -> Vec<u8> {
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, color))
        .write_to(&mut Cursor::new(&mut bytes), format)
        .unwrap();
    bytes
}

#[allow(dead_code)]
pub fn jpeg_page(width: u32, height: u32) -> Vec<u8> {
    image_bytes(width, height, Rgb([200, 30, 30]), ImageFormat::Jpeg)
}

#[allow(dead_code)]
pub fn png_page(width: u32, height: u32) -> Vec<u8> {
    image_bytes(width, height, Rgb([30, 30, 200]), ImageFormat::Png)
}

/// Writes a CBZ at `path` holding `entries` in the given container order.
#[allow(dead_code)]
pub fn create_cbz(path: &Path, entries: &[(String, Vec<u8>)]) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let mut zip = ZipWriter::new(std::fs::File::create(path).unwrap());
    for (name, data) in entries {
        zip.start_file(name.as_str(), SimpleFileOptions::default())
            .unwrap();
        zip.write_all(data).unwrap();
    }
    zip.finish().unwrap();
}

/// Writes a CBZ with `page_count` small JPEG pages named `001.jpg`, `002.jpg`, ...
#[allow(dead_code)]
pub fn create_comic(path: &Path, page_count: usize) {
    let page = jpeg_page(16, 24);
    let entries: Vec<(String, Vec<u8>)> = (1..=page_count)
        .map(|i| (format!("{:03}.jpg", i), page.clone()))
        .collect();
    create_cbz(path, &entries);
}

/// Rewrites the uncompressed size recorded in the central directory for `entry_name`,
/// leaving the stored data untouched.
#[allow(dead_code)]
pub fn declare_entry_size(path: &Path, entry_name: &str, size: u32) {
    let mut bytes = std::fs::read(path).unwrap();
    let name = entry_name.as_bytes();
    let header = (0..bytes.len().saturating_sub(46 + name.len()))
        .find(|&i| {
            bytes[i..i + 4] == [0x50, 0x4b, 0x01, 0x02] && &bytes[i + 46..i + 46 + name.len()] == name
        })
        .unwrap();
    bytes[header + 24..header + 28].copy_from_slice(&size.to_le_bytes());
    std::fs::write(path, bytes).unwrap();
}

/// Number of pages of the PDF at `path`.
#[allow(dead_code)]
pub fn pdf_page_count(path: &Path) -> usize {
    Document::load(path).unwrap().get_pages().len()
}

/// Widths of the pages of the PDF at `path`, in page order.
#[allow(dead_code)]
pub fn pdf_page_widths(path: &Path) -> Vec<i64> {
    let doc = Document::load(path).unwrap();
    doc.get_pages()
        .values()
        .map(|page_id| {
            let page = doc.get_object(*page_id).unwrap().as_dict().unwrap();
            let media_box = page.get(b"MediaBox").unwrap().as_array().unwrap();
            media_box[2].as_i64().unwrap()
        })
        .collect()
}

/// File names of the given paths.
#[allow(dead_code)]
pub fn file_names(paths: &[PathBuf]) -> Vec<String> {
    paths
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect()
}

/// Whether `dir` holds no files or directories.
#[allow(dead_code)]
pub fn is_empty_dir(dir: &Path) -> bool {
    std::fs::read_dir(dir).unwrap().next().is_none()
}

/// Keeps every message it receives.
#[allow(dead_code)]
#[derive(Default)]
pub struct RecordingSink {
    phases: Mutex<Vec<String>>,
    sub_steps: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn phases(&self) -> Vec<String> {
        self.phases.lock().unwrap().clone()
    }

    pub fn sub_steps(&self) -> Vec<String> {
        self.sub_steps.lock().unwrap().clone()
    }

    pub fn saw_sub_step(&self, needle: &str) -> bool {
        self.sub_steps().iter().any(|m| m.contains(needle))
    }

    pub fn saw_phase(&self, needle: &str) -> bool {
        self.phases().iter().any(|m| m.contains(needle))
    }
}

impl ProgressSink for RecordingSink {
    fn report_phase(&self, message: &str) -> std::result::Result<(), SinkError> {
        self.phases.lock().unwrap().push(message.to_string());
        Ok(())
    }

    fn report_sub_step(&self, message: &str) -> std::result::Result<(), SinkError> {
        self.sub_steps.lock().unwrap().push(message.to_string());
        Ok(())
    }
}

/// Cancels `token` as soon as a sub-step starting with `trigger` is reported.
#[allow(dead_code)]
pub struct CancellingSink {
    pub token: CancellationToken,
    pub trigger: String,
}

impl ProgressSink for CancellingSink {
    fn report_phase(&self, _message: &str) -> std::result::Result<(), SinkError> {
        Ok(())
    }

    fn report_sub_step(&self, message: &str) -> std::result::Result<(), SinkError> {
        if message.starts_with(&self.trigger) {
            self.token.cancel();
        }
        Ok(())
    }
}

/// Holds the reporting thread at the first sub-step starting with `trigger` until the test
/// releases it (or drops the release sender).
#[allow(dead_code)]
pub struct GateSink {
    trigger: String,
    reached: tokio::sync::mpsc::UnboundedSender<()>,
    release: Mutex<mpsc::Receiver<()>>,
}

#[allow(dead_code)]
impl GateSink {
    pub fn new(
        trigger: &str,
    ) -> (
        Arc<Self>,
        tokio::sync::mpsc::UnboundedReceiver<()>,
        mpsc::Sender<()>,
    ) {
        let (reached_tx, reached_rx) = tokio::sync::mpsc::unbounded_channel();
        let (release_tx, release_rx) = mpsc::channel();
        let sink = Arc::new(Self {
            trigger: trigger.to_string(),
            reached: reached_tx,
            release: Mutex::new(release_rx),
        });
        (sink, reached_rx, release_tx)
    }
}

impl ProgressSink for GateSink {
    fn report_phase(&self, _message: &str) -> std::result::Result<(), SinkError> {
        Ok(())
    }

    fn report_sub_step(&self, message: &str) -> std::result::Result<(), SinkError> {
        if message.starts_with(&self.trigger) {
            let _ = self.reached.send(());
            if let Ok(release) = self.release.lock() {
                let _ = release.recv();
            }
        }
        Ok(())
    }
}
