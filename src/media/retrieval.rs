//! Bounded batch retrieval of capture files.
//!
//! Reads are gated by a semaphore so that at most `concurrency` files are
//! open (and held in memory, raw and encoded) at any moment. Results are
//! written into an indexed slot per request, so the output order always
//! matches the input order no matter which read finishes first. With a
//! bound of 1 the batch is read strictly one file after another.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

use super::{read_data_uri, MediaFile, DATA_URI_PREFIX};
use crate::config::TimeFormat;

/// One retrieved capture, in the `{title, image}` shape the gallery expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncodedMedia {
    pub title: String,
    pub image: String,
}

impl EncodedMedia {
    /// Placeholder for a capture that could not be read: the data URI
    /// prefix with no payload.
    pub fn unavailable(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            image: DATA_URI_PREFIX.to_string(),
        }
    }

    pub fn is_unavailable(&self) -> bool {
        self.image == DATA_URI_PREFIX
    }
}

pub struct RetrievalPipeline {
    concurrency: usize,
    title_format: TimeFormat,
}

impl RetrievalPipeline {
    pub fn new(concurrency: usize, title_format: TimeFormat) -> Self {
        Self {
            concurrency: concurrency.max(1),
            title_format,
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Read and encode every file of `files` from `dir`.
    ///
    /// Resolves once every file has been attempted. A file that cannot be
    /// read yields [`EncodedMedia::unavailable`] in its slot; the rest of the
    /// batch is unaffected.
    pub async fn retrieve(&self, dir: &Path, files: &[MediaFile]) -> Vec<EncodedMedia> {
        let permits = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();

        for (index, file) in files.iter().enumerate() {
            // The permit is taken before spawning, so no more than
            // `concurrency` reads exist at once.
            let permit = match permits.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };

            debug!(file = %file.file_name, index, "Loading capture");
            let path = dir.join(&file.file_name);
            let modified = file.modified;
            let title_format = self.title_format.clone();

            tasks.spawn(async move {
                let media = retrieve_one(path, modified, &title_format).await;
                drop(permit);
                (index, media)
            });
        }

        let mut slots: Vec<Option<EncodedMedia>> = vec![None; files.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, media)) => slots[index] = Some(media),
                Err(e) => error!(error = %e, "Capture retrieval task failed"),
            }
        }

        slots
            .into_iter()
            .zip(files)
            .map(|(slot, file)| {
                slot.unwrap_or_else(|| EncodedMedia::unavailable(self.title_format.apply(file.modified)))
            })
            .collect()
    }
}

async fn retrieve_one(path: PathBuf, modified: DateTime<Utc>, title_format: &TimeFormat) -> EncodedMedia {
    let title = title_format.apply(modified);
    match read_data_uri(&path).await {
        Ok(image) => EncodedMedia { title, image },
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Capture unreadable, sending empty image");
            EncodedMedia::unavailable(title)
        }
    }
}
