//! Client configuration for the identity provider, media host and delete relay.
//!
//! Values come from `ATRIUM_*` environment variables with an optional JSON
//! override file (`ATRIUM_CONFIG_FILE`) so deployments can change endpoints
//! without rebuilding. Blank values never override. Configuration values are
//! public (web API keys, unsigned upload presets); do not store secrets here.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::{env, fs, path::Path};

pub const DEFAULT_IDENTITY_BASE_URL: &str = "https://identitytoolkit.googleapis.com";
pub const DEFAULT_MEDIA_UPLOAD_BASE_URL: &str = "https://api.cloudinary.com";
pub const DEFAULT_AUTH_REDIRECT_URI: &str = "http://localhost";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    pub identity_base_url: String,
    pub identity_api_key: String,
    pub auth_redirect_uri: String,
    pub media_upload_base_url: String,
    pub media_cloud_name: String,
    pub media_upload_preset: String,
    /// Base URL of the delete relay; empty means same origin as the app.
    pub relay_base_url: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            identity_base_url: DEFAULT_IDENTITY_BASE_URL.to_string(),
            identity_api_key: String::new(),
            auth_redirect_uri: DEFAULT_AUTH_REDIRECT_URI.to_string(),
            media_upload_base_url: DEFAULT_MEDIA_UPLOAD_BASE_URL.to_string(),
            media_cloud_name: String::new(),
            media_upload_preset: String::new(),
            relay_base_url: String::new(),
        }
    }
}

/// Partial configuration; every present, non-blank field wins.
#[derive(Debug, Default, Deserialize)]
pub struct RuntimeConfig {
    pub identity_base_url: Option<String>,
    pub identity_api_key: Option<String>,
    pub auth_redirect_uri: Option<String>,
    pub media_upload_base_url: Option<String>,
    pub media_cloud_name: Option<String>,
    pub media_upload_preset: Option<String>,
    pub relay_base_url: Option<String>,
}

impl AppConfig {
    /// Loads config from the environment and applies the optional override file.
    ///
    /// # Errors
    /// Returns an error if `ATRIUM_CONFIG_FILE` is set but unreadable or not valid JSON.
    pub fn load() -> Result<Self> {
        let mut config = Self::from_env();
        if let Some(path) = env_value("ATRIUM_CONFIG_FILE") {
            let runtime = read_runtime_config(Path::new(&path))?;
            apply_runtime_overrides(&mut config, runtime);
        }
        Ok(config)
    }

    /// Reads `ATRIUM_*` variables on top of the defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        apply_runtime_overrides(
            &mut config,
            RuntimeConfig {
                identity_base_url: env_value("ATRIUM_IDENTITY_BASE_URL"),
                identity_api_key: env_value("ATRIUM_IDENTITY_API_KEY"),
                auth_redirect_uri: env_value("ATRIUM_AUTH_REDIRECT_URI"),
                media_upload_base_url: env_value("ATRIUM_MEDIA_UPLOAD_BASE_URL"),
                media_cloud_name: env_value("ATRIUM_MEDIA_CLOUD_NAME"),
                media_upload_preset: env_value("ATRIUM_MEDIA_UPLOAD_PRESET"),
                relay_base_url: env_value("ATRIUM_RELAY_BASE_URL"),
            },
        );
        config
    }
}

fn env_value(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .and_then(|value| normalize_runtime_value(&value))
}

fn read_runtime_config(path: &Path) -> Result<RuntimeConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Invalid config file: {}", path.display()))
}

pub fn apply_runtime_overrides(config: &mut AppConfig, runtime: RuntimeConfig) {
    let overrides = [
        (&mut config.identity_base_url, runtime.identity_base_url),
        (&mut config.identity_api_key, runtime.identity_api_key),
        (&mut config.auth_redirect_uri, runtime.auth_redirect_uri),
        (&mut config.media_upload_base_url, runtime.media_upload_base_url),
        (&mut config.media_cloud_name, runtime.media_cloud_name),
        (&mut config.media_upload_preset, runtime.media_upload_preset),
        (&mut config.relay_base_url, runtime.relay_base_url),
    ];
    for (field, value) in overrides {
        if let Some(value) = value.as_deref().and_then(normalize_runtime_value) {
            *field = value;
        }
    }
}

fn normalize_runtime_value(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Joins a base URL and a path; an empty base yields the bare path.
pub(crate) fn join_url(base_url: &str, path: &str) -> String {
    let base = base_url.trim().trim_end_matches('/');
    let path = path.trim();

    if base.is_empty() {
        path.to_string()
    } else {
        format!("{}/{}", base, path.trim_start_matches('/'))
    }
}
