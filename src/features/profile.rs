//! Profile editor.

use crate::{
    media::MediaUpload,
    session::{PhotoSource, SessionStore},
};
use tracing::error;

pub const SIGNED_OUT_MESSAGE: &str = "Please log in to view your profile.";
pub const UPDATED_MESSAGE: &str = "Profile updated successfully!";
pub const FAILED_MESSAGE: &str = "Failed to update profile";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileEditor {
    pub display_name: String,
    pub photo_url: String,
    image: Option<MediaUpload>,
}

impl ProfileEditor {
    /// Seeds the form from the signed-in identity.
    ///
    /// # Errors
    /// Returns the message to show in place of the form when nobody is signed in.
    pub fn open(session: &SessionStore) -> Result<Self, &'static str> {
        let identity = session.current_identity().ok_or(SIGNED_OUT_MESSAGE)?;
        Ok(Self {
            display_name: identity.display_name.unwrap_or_default(),
            photo_url: identity.photo_url.unwrap_or_default(),
            image: None,
        })
    }

    /// Picks a file to upload as the new avatar. It wins over `photo_url`.
    pub fn choose_image(&mut self, file: MediaUpload) {
        self.image = Some(file);
    }

    #[must_use]
    pub fn chosen_image(&self) -> Option<&MediaUpload> {
        self.image.as_ref()
    }

    fn photo_source(&self) -> PhotoSource {
        if let Some(file) = &self.image {
            return PhotoSource::Image(file.clone());
        }
        match self.photo_url.trim() {
            "" => PhotoSource::Keep,
            url => PhotoSource::Url(url.to_string()),
        }
    }

    /// Saves the form and returns the notice to show.
    ///
    /// # Errors
    /// Returns the failure notice; details are logged.
    pub async fn submit(&mut self, session: &SessionStore) -> Result<&'static str, &'static str> {
        let display_name = Some(self.display_name.trim())
            .filter(|name| !name.is_empty())
            .map(str::to_string);
        let photo = self.photo_source();

        match session.update_profile(display_name, photo).await {
            Ok(identity) => {
                // Kept until now so a failed submit can be retried as is.
                self.image = None;
                if let Some(url) = identity.photo_url {
                    self.photo_url = url;
                }
                Ok(UPDATED_MESSAGE)
            }
            Err(err) => {
                error!("Error updating profile: {err}");
                Err(FAILED_MESSAGE)
            }
        }
    }
}
