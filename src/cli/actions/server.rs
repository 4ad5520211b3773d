use crate::{
    cli::telemetry,
    relay::{self, CloudinaryAdmin, MediaAdmin},
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::sync::Arc;
use tracing::info;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: SecretString,
    pub media_api_url: String,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the CDN client cannot be built or the relay fails to start.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    let admin = CloudinaryAdmin::new(
        &args.media_api_url,
        &args.cloud_name,
        args.api_key,
        args.api_secret,
    )
    .context("Could not configure the media admin client")?;
    let admin: Arc<dyn MediaAdmin> = Arc::new(admin);

    let result = relay::serve(args.port, admin).await;

    telemetry::shutdown_tracer();

    result
}

fn log_startup_args(args: &Args) {
    let entries = [
        ("listen", format!("tcp:{}", args.port)),
        ("cloud_name", args.cloud_name.clone()),
        ("api_key", args.api_key.clone()),
        ("media_api_url", args.media_api_url.clone()),
    ];
    info!("{}", startup_message(&entries));
}

fn startup_message(entries: &[(&str, String)]) -> String {
    let max_key_len = entries.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    let mut message = format!(
        "{} {} - {}\n\nStartup configuration:",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        short_commit(crate::GIT_COMMIT_HASH)
    );
    for (key, value) in entries {
        let padding = " ".repeat(max_key_len.saturating_sub(key.len()));
        let _ =
            std::fmt::Write::write_fmt(&mut message, format_args!("\n  {key}:{padding} {value}"));
    }
    message
}

fn short_commit(hash: &str) -> &str {
    let trimmed = hash.trim();
    trimmed.get(..7).unwrap_or(trimmed)
}
