//! In-process media host for local development and tests.

use super::{MediaHost, MediaUpload, UploadedMedia};
use crate::{error::UploadError, BoxFuture};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use ulid::Ulid;

const BASE_URL: &str = "https://media.atrium.local";

#[derive(Debug, Default)]
pub struct MemoryMedia {
    assets: Mutex<BTreeMap<String, MediaUpload>>,
}

impl MemoryMedia {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn assets(&self) -> MutexGuard<'_, BTreeMap<String, MediaUpload>> {
        self.assets.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn contains(&self, public_id: &str) -> bool {
        self.assets().contains_key(public_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.assets().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assets().is_empty()
    }
}

impl MediaHost for MemoryMedia {
    fn upload<'a>(
        &'a self,
        file: &'a MediaUpload,
    ) -> BoxFuture<'a, Result<UploadedMedia, UploadError>> {
        Box::pin(async move {
            let public_id = Ulid::new().to_string().to_lowercase();
            let secure_url = format!("{BASE_URL}/{public_id}/{}", file.file_name);
            self.assets().insert(public_id.clone(), file.clone());
            Ok(UploadedMedia {
                secure_url,
                public_id,
            })
        })
    }

    fn delete<'a>(&'a self, public_id: &'a str) -> BoxFuture<'a, Result<(), UploadError>> {
        Box::pin(async move {
            self.assets()
                .remove(public_id)
                .map(|_| ())
                .ok_or_else(|| UploadError::Rejected {
                    status: 404,
                    message: format!("unknown asset {public_id}"),
                })
        })
    }
}
