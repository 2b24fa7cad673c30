//! Capture folders: listing, freshness selection and data-URI encoding.

pub mod retrieval;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{DateTime, Duration, Utc};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::warn;

use crate::error::{IntelError, IntelResult};

pub use retrieval::{EncodedMedia, RetrievalPipeline};

/// Every capture is served to the browser as PNG.
pub const DATA_URI_PREFIX: &str = "data:image/png;base64,";

/// A file in a capture folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    pub file_name: String,
    pub modified: DateTime<Utc>,
}

/// Contents of one capture folder.
#[derive(Debug, Clone)]
pub struct MediaListing {
    pub dir: PathBuf,
    pub files: Vec<MediaFile>,
}

impl MediaListing {
    pub fn new(dir: impl Into<PathBuf>, files: Vec<MediaFile>) -> Self {
        Self {
            dir: dir.into(),
            files,
        }
    }

    /// Read a folder non-recursively. Sub-directories and dot-files are skipped.
    pub async fn read(dir: &Path) -> IntelResult<Self> {
        let unreadable = |source: std::io::Error| IntelError::DirectoryUnreadable {
            path: dir.to_path_buf(),
            source,
        };

        let mut entries = fs::read_dir(dir).await.map_err(unreadable)?;
        let mut files = Vec::new();

        while let Some(entry) = entries.next_entry().await.map_err(unreadable)? {
            let file_name = match entry.file_name().into_string() {
                Ok(name) if !name.starts_with('.') => name,
                _ => continue,
            };

            let metadata = match fs::metadata(entry.path()).await {
                Ok(metadata) => metadata,
                Err(e) => {
                    warn!(file = %file_name, error = %e, "Skipping unreadable entry");
                    continue;
                }
            };
            if !metadata.is_file() {
                continue;
            }

            let modified = match metadata.modified() {
                Ok(time) => DateTime::<Utc>::from(time),
                Err(e) => {
                    warn!(file = %file_name, error = %e, "Skipping entry without mtime");
                    continue;
                }
            };

            files.push(MediaFile { file_name, modified });
        }

        Ok(Self::new(dir, files))
    }

    pub fn path_of(&self, file: &MediaFile) -> PathBuf {
        self.dir.join(&file.file_name)
    }

    /// Files sorted oldest first. Equal mtimes are ordered by file name.
    pub fn chronological(&self) -> Vec<MediaFile> {
        let mut files = self.files.clone();
        files.sort_by(|a, b| {
            a.modified
                .cmp(&b.modified)
                .then_with(|| a.file_name.cmp(&b.file_name))
        });
        files
    }

    /// The most recently modified file.
    pub fn newest(&self) -> IntelResult<MediaFile> {
        self.chronological()
            .pop()
            .ok_or_else(|| IntelError::EmptyDirectory(self.dir.clone()))
    }

    /// Files modified at most `max_age_secs` before `now`, oldest first.
    ///
    /// A threshold of 0 disables the filter and returns the whole folder.
    pub fn not_older_than(&self, max_age_secs: u64, now: DateTime<Utc>) -> Vec<MediaFile> {
        let files = self.chronological();
        if max_age_secs == 0 {
            return files;
        }

        let cutoff = i64::try_from(max_age_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|age| now.checked_sub_signed(age));

        match cutoff {
            Some(cutoff) => files.into_iter().filter(|f| f.modified >= cutoff).collect(),
            // older than anything representable
            None => files,
        }
    }
}

/// Label folders must be a single plain path segment.
pub fn validate_label(label: &str) -> IntelResult<&str> {
    let plain = !label.is_empty()
        && label != "."
        && label != ".."
        && !label.contains(|c| c == '/' || c == '\\' || c == '\0');

    if plain {
        Ok(label)
    } else {
        Err(IntelError::InvalidLabel(label.to_string()))
    }
}

pub fn encode_data_uri(bytes: &[u8]) -> String {
    format!("{}{}", DATA_URI_PREFIX, BASE64.encode(bytes))
}

/// Read a capture and return it as a data URI.
pub async fn read_data_uri(path: &Path) -> IntelResult<String> {
    let bytes = fs::read(path).await.map_err(|source| IntelError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(encode_data_uri(&bytes))
}
