pub mod logging;

use clap::{
    builder::styling::{AnsiColor, Effects, Styles},
    Arg, ColorChoice, Command,
};

pub const ARG_PORT: &str = "port";
pub const ARG_CLOUD_NAME: &str = "cloud-name";
pub const ARG_API_KEY: &str = "api-key";
pub const ARG_API_SECRET: &str = "api-secret";
pub const ARG_MEDIA_API_URL: &str = "media-api-url";

pub const DEFAULT_MEDIA_API_URL: &str = "https://api.cloudinary.com";

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("atrium")
        .about("Media delete relay for the atrium app")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new(ARG_PORT)
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("8080")
                .env("ATRIUM_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new(ARG_CLOUD_NAME)
                .long("cloud-name")
                .help("Cloudinary cloud name")
                .env("ATRIUM_CLOUD_NAME")
                .required(true),
        )
        .arg(
            Arg::new(ARG_API_KEY)
                .long("api-key")
                .help("Cloudinary API key")
                .env("ATRIUM_API_KEY")
                .required(true),
        )
        .arg(
            Arg::new(ARG_API_SECRET)
                .long("api-secret")
                .help("Cloudinary API secret")
                .env("ATRIUM_API_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_MEDIA_API_URL)
                .long("media-api-url")
                .help("Cloudinary API base URL")
                .default_value(DEFAULT_MEDIA_API_URL)
                .env("ATRIUM_MEDIA_API_URL"),
        );

    logging::with_args(command)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENV_VARS: [&str; 6] = [
        "ATRIUM_PORT",
        "ATRIUM_CLOUD_NAME",
        "ATRIUM_API_KEY",
        "ATRIUM_API_SECRET",
        "ATRIUM_MEDIA_API_URL",
        "ATRIUM_LOG_LEVEL",
    ];

    fn without_env<F: FnOnce()>(f: F) {
        temp_env::with_vars(ENV_VARS.map(|key| (key, None::<String>)), f);
    }

    #[test]
    fn test_new() {
        let command = new();

        assert_eq!(command.get_name(), "atrium");
        assert_eq!(
            command.get_about().map(ToString::to_string),
            Some("Media delete relay for the atrium app".to_string())
        );
        assert_eq!(
            command.get_version().map(ToString::to_string),
            Some(env!("CARGO_PKG_VERSION").to_string())
        );
    }

    #[test]
    fn test_check_args() {
        without_env(|| {
            let matches = new().get_matches_from(vec![
                "atrium",
                "--port",
                "9090",
                "--cloud-name",
                "demo",
                "--api-key",
                "key",
                "--api-secret",
                "secret",
            ]);

            assert_eq!(matches.get_one::<u16>(ARG_PORT).copied(), Some(9090));
            assert_eq!(
                matches.get_one::<String>(ARG_CLOUD_NAME).cloned(),
                Some("demo".to_string())
            );
            assert_eq!(
                matches.get_one::<String>(ARG_API_KEY).cloned(),
                Some("key".to_string())
            );
            assert_eq!(
                matches.get_one::<String>(ARG_API_SECRET).cloned(),
                Some("secret".to_string())
            );
            assert_eq!(
                matches.get_one::<String>(ARG_MEDIA_API_URL).cloned(),
                Some(DEFAULT_MEDIA_API_URL.to_string())
            );
        });
    }

    #[test]
    fn test_missing_secret_is_an_error() {
        without_env(|| {
            let result = new().try_get_matches_from(vec![
                "atrium",
                "--cloud-name",
                "demo",
                "--api-key",
                "key",
            ]);
            assert!(result.is_err());
        });
    }

    #[test]
    fn test_check_env() {
        temp_env::with_vars(
            [
                ("ATRIUM_PORT", Some("443")),
                ("ATRIUM_CLOUD_NAME", Some("demo")),
                ("ATRIUM_API_KEY", Some("key")),
                ("ATRIUM_API_SECRET", Some("secret")),
                ("ATRIUM_MEDIA_API_URL", Some("http://localhost:9000")),
                ("ATRIUM_LOG_LEVEL", Some("info")),
            ],
            || {
                let matches = new().get_matches_from(vec!["atrium"]);
                assert_eq!(matches.get_one::<u16>(ARG_PORT).copied(), Some(443));
                assert_eq!(
                    matches.get_one::<String>(ARG_MEDIA_API_URL).cloned(),
                    Some("http://localhost:9000".to_string())
                );
                assert_eq!(
                    matches.get_one::<u8>(logging::ARG_VERBOSITY).copied(),
                    Some(2)
                );
            },
        );
    }

    #[test]
    fn test_check_log_level_env() {
        // loop cover all possible value_parse
        let levels = ["error", "warn", "info", "debug", "trace"];
        for (index, &level) in levels.iter().enumerate() {
            temp_env::with_vars(
                [
                    ("ATRIUM_LOG_LEVEL", Some(level)),
                    ("ATRIUM_CLOUD_NAME", Some("demo")),
                    ("ATRIUM_API_KEY", Some("key")),
                    ("ATRIUM_API_SECRET", Some("secret")),
                ],
                || {
                    let matches = new().get_matches_from(vec!["atrium"]);
                    assert_eq!(
                        matches.get_one::<u8>(logging::ARG_VERBOSITY).copied(),
                        u8::try_from(index).ok()
                    );
                },
            );
        }
    }

    #[test]
    fn test_check_log_level_verbosity() {
        for index in 0..5_usize {
            without_env(|| {
                let mut args = vec![
                    "atrium".to_string(),
                    "--cloud-name".to_string(),
                    "demo".to_string(),
                    "--api-key".to_string(),
                    "key".to_string(),
                    "--api-secret".to_string(),
                    "secret".to_string(),
                ];

                // Add the appropriate number of "-v" flags based on the index
                if index > 0 {
                    args.push(format!("-{}", "v".repeat(index)));
                }

                let matches = new().get_matches_from(args);

                assert_eq!(
                    matches.get_one::<u8>(logging::ARG_VERBOSITY).copied(),
                    u8::try_from(index).ok()
                );
            });
        }
    }
}
