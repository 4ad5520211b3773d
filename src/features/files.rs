//! Per-user file gallery: CDN-hosted files indexed in the `files` collection.

use crate::{
    error::{QueryError, UploadError},
    media::{MediaHost, MediaUpload},
    store::{DocumentStore, LiveQuery, Query, QueryState, SortOrder},
};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

pub const COLLECTION: &str = "files";
pub const UPLOAD_FAILED_MESSAGE: &str = "Upload failed. Please try again.";
pub const DELETED_MESSAGE: &str = "File deleted successfully";
pub const DELETE_FAILED_MESSAGE: &str = "Failed to delete file";

static IMAGE_EXTENSION: OnceLock<Option<Regex>> = OnceLock::new();

/// File descriptor as stored; `createdAt` comes from the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub owner: String,
    pub file_name: String,
    pub file_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub file_name: String,
    pub file_url: String,
    pub public_id: Option<String>,
}

impl FileEntry {
    /// Whether the file can be previewed inline.
    #[must_use]
    pub fn is_image(&self) -> bool {
        IMAGE_EXTENSION
            .get_or_init(|| Regex::new(r"(?i)\.(jpeg|jpg|gif|png|webp)$").ok())
            .as_ref()
            .is_some_and(|re| re.is_match(&self.file_url))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GalleryState {
    Loading,
    Ready(Vec<FileEntry>),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GalleryError {
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error(transparent)]
    Store(#[from] QueryError),
}

impl GalleryError {
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Upload(err) => err.user_message(),
            Self::Store(_) => UPLOAD_FAILED_MESSAGE.to_string(),
        }
    }
}

pub struct FileGallery {
    documents: Arc<dyn DocumentStore>,
    media: Arc<dyn MediaHost>,
    owner: String,
    live: Option<LiveQuery>,
    progress: watch::Sender<Option<u8>>,
}

impl FileGallery {
    /// Opens the gallery for `owner`, newest file first.
    #[must_use]
    pub fn open(documents: Arc<dyn DocumentStore>, media: Arc<dyn MediaHost>, owner: &str) -> Self {
        let live = documents.query(
            Query::collection(COLLECTION)
                .where_eq("owner", owner)
                .order_by_created(SortOrder::Descending),
        );
        Self {
            documents,
            media,
            owner: owner.to_string(),
            live: Some(live),
            progress: watch::Sender::new(None),
        }
    }

    #[must_use]
    pub fn state(&self) -> GalleryState {
        match self.live.as_ref().map(LiveQuery::current) {
            None | Some(QueryState::Pending) => GalleryState::Loading,
            Some(QueryState::Failed(err)) => {
                error!("Error fetching files: {err}");
                GalleryState::Failed(err.user_message())
            }
            Some(QueryState::Ready(documents)) => GalleryState::Ready(
                documents
                    .iter()
                    .filter_map(|document| match document.decode::<FileRecord>() {
                        Ok(record) => Some(FileEntry {
                            id: document.id.clone(),
                            created_at: document.created_at,
                            file_name: record.file_name,
                            file_url: record.file_url,
                            public_id: record.public_id,
                        }),
                        Err(err) => {
                            warn!(id = %document.id, "skipping malformed file record: {err}");
                            None
                        }
                    })
                    .collect(),
            ),
        }
    }

    /// Upload progress in percent, `None` while no upload is running.
    ///
    /// The file body goes out in a single request, so an upload reports 0
    /// when it starts and 100 once the media host has accepted it.
    #[must_use]
    pub fn progress(&self) -> watch::Receiver<Option<u8>> {
        self.progress.subscribe()
    }

    /// Waits for the next delivery. Returns `false` once the gallery is closed.
    pub async fn changed(&mut self) -> bool {
        match self.live.as_mut() {
            Some(live) => live.changed().await,
            None => false,
        }
    }

    /// Uploads `file` to the media host, then indexes it.
    ///
    /// # Errors
    /// Returns the upload or store error; `user_message()` gives the notice.
    pub async fn upload(&self, file: &MediaUpload) -> Result<FileEntry, GalleryError> {
        self.progress.send_replace(Some(0));
        let result = self.upload_and_index(file).await;
        self.progress.send_replace(None);
        result
    }

    async fn upload_and_index(&self, file: &MediaUpload) -> Result<FileEntry, GalleryError> {
        let uploaded = self.media.upload(file).await.inspect_err(|err| {
            error!("Error uploading file: {err}");
        })?;
        self.progress.send_replace(Some(100));
        let record = FileRecord {
            owner: self.owner.clone(),
            file_name: file.file_name.clone(),
            file_url: uploaded.secure_url,
            public_id: Some(uploaded.public_id),
        };
        let id = self
            .documents
            .add(COLLECTION, serde_json::to_value(&record).map_err(QueryError::from)?)
            .await?;
        info!(id = %id, file_name = %record.file_name, "file uploaded");
        Ok(FileEntry {
            id,
            created_at: Utc::now(),
            file_name: record.file_name,
            file_url: record.file_url,
            public_id: record.public_id,
        })
    }

    /// Removes the record, then asks the media host to drop the asset.
    ///
    /// The media delete is best effort: a failure is logged and the call still
    /// succeeds, leaving an orphaned asset behind.
    ///
    /// # Errors
    /// Returns the notice to show when the record could not be removed.
    pub async fn delete(&self, entry: &FileEntry) -> Result<&'static str, &'static str> {
        if let Err(err) = self.documents.delete(COLLECTION, &entry.id).await {
            error!("Error deleting file: {err}");
            return Err(DELETE_FAILED_MESSAGE);
        }
        if let Some(public_id) = entry.public_id.as_deref() {
            match self.media.delete(public_id).await {
                Ok(()) => debug!(public_id, "media deleted"),
                Err(err) => warn!(public_id, "media delete failed: {err}"),
            }
        }
        Ok(DELETED_MESSAGE)
    }

    pub fn close(&mut self) {
        self.live = None;
    }
}
