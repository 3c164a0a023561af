//! Access to source archives and output locations.
//!
//! The conversion core never touches caller-facing storage directly. Everything it needs
//! (source byte streams, display names, the scratch root and the output directory) goes
//! through a [`FileAccessProvider`], so hosts with their own storage model (content URIs,
//! sandboxed pickers, remote mounts) only have to implement this trait.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use log::debug;
use tokio::io::AsyncRead;

use crate::error::{Error, Result};
use crate::path_utils::{get_file_name_lossy, path_to_string_lossy};

/// A readable byte stream of one source archive.
pub type SourceStream = Box<dyn AsyncRead + Send + Unpin>;

/// Resolves logical source references and output locations for the converter.
#[async_trait]
pub trait FileAccessProvider: Send + Sync {
    /// Opens the source identified by `source_ref` for sequential reading.
    ///
    /// # Returns
    ///
    /// * `Ok(SourceStream)` - The archive bytes
    /// * `Err(Error::SourceUnreadable)` - The reference cannot be opened
    async fn open_source(&self, source_ref: &str) -> Result<SourceStream>;

    /// Human readable name of the source, used for default output names and reports.
    async fn display_name(&self, source_ref: &str) -> Result<String>;

    /// Root under which per-job scratch directories are created.
    fn scratch_dir(&self) -> PathBuf;

    /// Output directory used when the request does not name one.
    fn default_output_dir(&self) -> PathBuf;

    /// Turns a caller supplied output location into a directory path.
    async fn resolve_output_dir(&self, requested: &str) -> Result<PathBuf>;
}

/// A [`FileAccessProvider`] over the local filesystem where source references are paths.
#[derive(Debug, Clone)]
pub struct LocalFileProvider {
    scratch_root: PathBuf,
    default_output: PathBuf,
}

impl Default for LocalFileProvider {
    fn default() -> Self {
        Self {
            scratch_root: std::env::temp_dir(),
            default_output: default_downloads_dir(),
        }
    }
}

impl LocalFileProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `scratch_root` instead of the OS temp directory.
    pub fn with_scratch_dir(mut self, scratch_root: impl Into<PathBuf>) -> Self {
        self.scratch_root = scratch_root.into();
        self
    }

    /// Uses `output_dir` instead of the user's downloads directory.
    pub fn with_default_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.default_output = output_dir.into();
        self
    }
}

#[async_trait]
impl FileAccessProvider for LocalFileProvider {
    async fn open_source(&self, source_ref: &str) -> Result<SourceStream> {
        let unreadable = |reason: String| Error::SourceUnreadable {
            source_ref: source_ref.to_string(),
            reason,
        };

        let metadata = tokio::fs::metadata(source_ref)
            .await
            .map_err(|e| unreadable(e.to_string()))?;
        if !metadata.is_file() {
            return Err(unreadable("not a regular file".to_string()));
        }

        let file = tokio::fs::File::open(source_ref)
            .await
            .map_err(|e| unreadable(e.to_string()))?;
        debug!("Opened source {} ({} bytes)", source_ref, metadata.len());
        Ok(Box::new(file))
    }

    async fn display_name(&self, source_ref: &str) -> Result<String> {
        Ok(get_file_name_lossy(Path::new(source_ref)))
    }

    fn scratch_dir(&self) -> PathBuf {
        self.scratch_root.clone()
    }

    fn default_output_dir(&self) -> PathBuf {
        self.default_output.clone()
    }

    async fn resolve_output_dir(&self, requested: &str) -> Result<PathBuf> {
        let trimmed = requested.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidPath(
                PathBuf::from(requested),
                "Output directory must not be empty".to_string(),
            ));
        }

        let path = PathBuf::from(trimmed);
        if path.exists() && !path.is_dir() {
            return Err(Error::InvalidPath(
                path.clone(),
                format!("'{}' is not a directory", path_to_string_lossy(&path)),
            ));
        }
        Ok(path)
    }
}

/// `$HOME/Downloads` (or `%USERPROFILE%\Downloads`) when it exists, the working directory otherwise.
fn default_downloads_dir() -> PathBuf {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(|home| PathBuf::from(home).join("Downloads"))
        .filter(|downloads| downloads.is_dir())
        .unwrap_or_else(|| PathBuf::from("."))
}
