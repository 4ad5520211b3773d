use crate::cli::{
    actions::{server::Args, Action},
    commands::{ARG_API_KEY, ARG_API_SECRET, ARG_CLOUD_NAME, ARG_MEDIA_API_URL, ARG_PORT},
};
use anyhow::{Context, Result};
use secrecy::SecretString;

/// # Errors
/// Returns an error if required arguments are missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);

    let required = |name: &str| -> Result<String> {
        matches
            .get_one::<String>(name)
            .cloned()
            .with_context(|| format!("missing required argument: --{name}"))
    };

    Ok(Action::Server(Args {
        port,
        cloud_name: required(ARG_CLOUD_NAME)?,
        api_key: required(ARG_API_KEY)?,
        api_secret: SecretString::from(required(ARG_API_SECRET)?),
        media_api_url: required(ARG_MEDIA_API_URL)?,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands;
    use secrecy::ExposeSecret;

    #[test]
    fn test_handler_builds_server_action() {
        temp_env::with_vars(
            [
                ("ATRIUM_PORT", None::<&str>),
                ("ATRIUM_MEDIA_API_URL", None),
                ("ATRIUM_LOG_LEVEL", None),
            ],
            || {
                let matches = commands::new().get_matches_from(vec![
                    "atrium",
                    "--cloud-name",
                    "demo",
                    "--api-key",
                    "key",
                    "--api-secret",
                    "secret",
                ]);
                let Action::Server(args) = handler(&matches).expect("action");
                assert_eq!(args.port, 8080);
                assert_eq!(args.cloud_name, "demo");
                assert_eq!(args.api_key, "key");
                assert_eq!(args.api_secret.expose_secret(), "secret");
                assert_eq!(args.media_api_url, commands::DEFAULT_MEDIA_API_URL);
            },
        );
    }
}
