//! Login, registration and password-reset forms.

use crate::{
    error::AuthError,
    identity::{Credentials, SocialProvider},
    routes::Route,
    session::SessionStore,
};
use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

pub const RESET_SENT_MESSAGE: &str = "Password reset email sent";

static EMAIL_SHAPE: OnceLock<Option<Regex>> = OnceLock::new();

/// Loose `local@domain.tld` check; the provider does the real validation.
fn is_plausible_email(email: &str) -> bool {
    EMAIL_SHAPE
        .get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").ok())
        .as_ref()
        .map_or_else(|| email.contains('@'), |re| re.is_match(email))
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("Please fill in all fields.")]
    MissingFields,
    #[error("Please enter a valid email address.")]
    InvalidEmail,
    #[error("Passwords do not match.")]
    PasswordMismatch,
    #[error("{}", .0.user_message())]
    Auth(#[from] AuthError),
}

fn validate(email: &str, password: &str) -> Result<(), FormError> {
    if email.trim().is_empty() || password.is_empty() {
        return Err(FormError::MissingFields);
    }
    if !is_plausible_email(email.trim()) {
        return Err(FormError::InvalidEmail);
    }
    Ok(())
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    /// Message from the last failed attempt.
    pub error: Option<String>,
}

impl LoginForm {
    /// Signs in with email and password and returns the page to show next.
    ///
    /// # Errors
    /// Returns the validation or provider error, also kept in `self.error`.
    pub async fn submit_password(&mut self, session: &SessionStore) -> Result<Route, FormError> {
        let result = self.try_password(session).await;
        self.record(result)
    }

    async fn try_password(&self, session: &SessionStore) -> Result<Route, FormError> {
        validate(&self.email, &self.password)?;
        let credentials = Credentials::new(self.email.trim(), self.password.as_str());
        session.login(&credentials).await?;
        Ok(Route::Home)
    }

    /// Signs in through the social popup.
    ///
    /// # Errors
    /// Returns the provider error, also kept in `self.error`.
    pub async fn submit_social(
        &mut self,
        session: &SessionStore,
        provider: SocialProvider,
    ) -> Result<Route, FormError> {
        let result = session
            .login_with_social_provider(provider)
            .await
            .map(|_| Route::Home)
            .map_err(FormError::from);
        self.record(result)
    }

    fn record(&mut self, result: Result<Route, FormError>) -> Result<Route, FormError> {
        self.error = result.as_ref().err().map(ToString::to_string);
        result
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterForm {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub error: Option<String>,
}

impl RegisterForm {
    /// Creates the account; the provider signs the new user in.
    ///
    /// # Errors
    /// Returns the validation or provider error, also kept in `self.error`.
    pub async fn submit(&mut self, session: &SessionStore) -> Result<Route, FormError> {
        let result = self.try_register(session).await;
        self.error = result.as_ref().err().map(ToString::to_string);
        result
    }

    async fn try_register(&self, session: &SessionStore) -> Result<Route, FormError> {
        validate(&self.email, &self.password)?;
        if self.password != self.confirm_password {
            return Err(FormError::PasswordMismatch);
        }
        session.register(self.email.trim(), &self.password).await?;
        Ok(Route::Home)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForgotPasswordForm {
    pub email: String,
}

impl ForgotPasswordForm {
    /// Requests a reset email and returns the confirmation to display.
    ///
    /// # Errors
    /// Returns the validation or provider error.
    pub async fn submit(&self, session: &SessionStore) -> Result<&'static str, FormError> {
        let email = self.email.trim();
        if email.is_empty() {
            return Err(FormError::MissingFields);
        }
        if !is_plausible_email(email) {
            return Err(FormError::InvalidEmail);
        }
        session.send_password_reset(email).await?;
        Ok(RESET_SENT_MESSAGE)
    }
}
