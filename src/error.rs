//! Error taxonomy for the intelligence views.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IntelError {
    #[error("Store query failed: {0}")]
    StoreQuery(#[from] rusqlite::Error),

    #[error("Cannot read directory {}: {source}", .path.display())]
    DirectoryUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No files available in {}", .0.display())]
    EmptyDirectory(PathBuf),

    #[error("Cannot read file {}: {source}", .path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to mark detections as announced: {0}")]
    AcknowledgmentCommit(#[source] rusqlite::Error),

    #[error("Invalid label folder: {0:?}")]
    InvalidLabel(String),

    #[error("Invalid stored timestamp: {0:?}")]
    InvalidTimestamp(String),
}

impl IntelError {
    /// HTTP-equivalent status for front ends that map errors onto responses.
    pub fn status_code(&self) -> u16 {
        match self {
            IntelError::InvalidLabel(_) => 400,
            _ => 500,
        }
    }
}

pub type IntelResult<T> = std::result::Result<T, IntelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(IntelError::InvalidLabel("..".to_string()).status_code(), 400);
        assert_eq!(
            IntelError::EmptyDirectory(PathBuf::from("/media/object_detection")).status_code(),
            500
        );
    }

    #[test]
    fn test_empty_directory_message() {
        let err = IntelError::EmptyDirectory(PathBuf::from("/media/person"));
        assert_eq!(err.to_string(), "No files available in /media/person");
    }
}
