//! Error taxonomy for the identity, media and store collaborators.
//!
//! Every variant is recoverable at the UI level: views catch these at the call
//! site, surface `user_message()` and let the user retry. Nothing here retries
//! automatically.

use thiserror::Error;

/// Failures from the identity provider or from the session store around it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredential,
    #[error("email address already in use")]
    EmailInUse,
    #[error("password is too weak")]
    WeakPassword,
    #[error("no account for this email")]
    UserNotFound,
    #[error("sign-in popup was closed before completing")]
    PopupClosed,
    #[error("no user is signed in")]
    NotSignedIn,
    #[error("network error: {0}")]
    Network(String),
    #[error("identity provider error: {code}")]
    Provider { code: String },
    #[error("media upload failed: {0}")]
    MediaUpload(#[from] UploadError),
}

impl AuthError {
    /// Text suitable for showing next to the form that triggered the error.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidCredential => "Invalid email or password.".to_string(),
            Self::EmailInUse => "An account with this email already exists.".to_string(),
            Self::WeakPassword => "Password should be at least 6 characters.".to_string(),
            Self::UserNotFound => "No account found for this email.".to_string(),
            Self::PopupClosed => "Sign-in was cancelled.".to_string(),
            Self::NotSignedIn => "Please log in first.".to_string(),
            Self::Network(_) => "Unable to reach the server. Please try again.".to_string(),
            Self::Provider { code } => format!("Authentication failed ({code})."),
            Self::MediaUpload(err) => err.user_message(),
        }
    }
}

/// Failures talking to the media host or the delete relay.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadError {
    #[error("network error: {0}")]
    Network(String),
    #[error("media host rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("unexpected media host response: {0}")]
    InvalidResponse(String),
}

impl UploadError {
    #[must_use]
    pub fn user_message(&self) -> String {
        "Upload failed. Please try again.".to_string()
    }
}

/// Failures from the document or key-value store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("permission denied")]
    PermissionDenied,
    #[error("network error: {0}")]
    Network(String),
    #[error("record not found: {0}")]
    NotFound(String),
    #[error("failed to decode record: {0}")]
    Decode(String),
}

impl QueryError {
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::PermissionDenied => "You don't have permission to view these files.".to_string(),
            _ => "Failed to load files.".to_string(),
        }
    }
}

impl From<serde_json::Error> for QueryError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Maps a transport error the same way for every HTTP collaborator.
pub(crate) fn describe_transport_error(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        "Request timed out. Please try again.".to_string()
    } else {
        format!("Unable to reach the server: {err}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_failure_reads_as_upload_failure() {
        let err = AuthError::from(UploadError::Network("reset".to_string()));
        assert_eq!(err.user_message(), "Upload failed. Please try again.");
    }

    #[test]
    fn permission_denied_has_dedicated_message() {
        assert_eq!(
            QueryError::PermissionDenied.user_message(),
            "You don't have permission to view these files."
        );
        assert_eq!(
            QueryError::Network("offline".to_string()).user_message(),
            "Failed to load files."
        );
    }

    #[test]
    fn provider_code_is_surfaced() {
        let err = AuthError::Provider {
            code: "TOO_MANY_ATTEMPTS_TRY_LATER".to_string(),
        };
        assert_eq!(
            err.user_message(),
            "Authentication failed (TOO_MANY_ATTEMPTS_TRY_LATER)."
        );
    }
}
