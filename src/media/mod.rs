//! Media host seam: uploads go straight to the CDN with an unsigned preset,
//! deletes go through the relay so the write credential never reaches the
//! client.

pub mod cloudinary;
pub mod memory;

use crate::{error::UploadError, BoxFuture};
use serde::{Deserialize, Serialize};

/// A file picked by the user, ready to upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl MediaUpload {
    #[must_use]
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }
}

/// Stable handle to an uploaded asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedMedia {
    pub secure_url: String,
    pub public_id: String,
}

pub trait MediaHost: Send + Sync {
    fn upload<'a>(&'a self, file: &'a MediaUpload) -> BoxFuture<'a, Result<UploadedMedia, UploadError>>;

    fn delete<'a>(&'a self, public_id: &'a str) -> BoxFuture<'a, Result<(), UploadError>>;
}
