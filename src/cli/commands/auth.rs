use anyhow::{Context, Result};
use clap::{Arg, Command};
use secrecy::SecretString;

pub const ARG_TOKEN_SECRET: &str = "token-secret";

/// Parsed auth-related CLI options.
#[derive(Debug)]
pub struct Options {
    pub frontend_base_url: String,
    pub otp_ttl_seconds: i64,
    pub session_ttl_seconds: i64,
    pub token_secret: SecretString,
}

impl Options {
    /// Extract auth options from parsed matches.
    ///
    /// # Errors
    /// Returns an error if the token secret is missing.
    pub fn parse(matches: &clap::ArgMatches) -> Result<Self> {
        let token_secret = matches
            .get_one::<String>(ARG_TOKEN_SECRET)
            .cloned()
            .context("missing required argument: --token-secret")?;

        Ok(Self {
            frontend_base_url: matches
                .get_one::<String>("frontend-base-url")
                .cloned()
                .unwrap_or_else(|| "https://folioforge.dev".to_string()),
            otp_ttl_seconds: matches
                .get_one::<i64>("otp-ttl-seconds")
                .copied()
                .unwrap_or(600),
            session_ttl_seconds: matches
                .get_one::<i64>("session-ttl-seconds")
                .copied()
                .unwrap_or(604_800),
            token_secret: SecretString::from(token_secret),
        })
    }
}

pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("frontend-base-url")
                .long("frontend-base-url")
                .help("Frontend base URL used for CORS and cookie security")
                .env("FOLIOFORGE_FRONTEND_BASE_URL")
                .default_value("https://folioforge.dev"),
        )
        .arg(
            Arg::new("otp-ttl-seconds")
                .long("otp-ttl-seconds")
                .help("One-time passcode TTL in seconds")
                .env("FOLIOFORGE_OTP_TTL_SECONDS")
                .default_value("600")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new("session-ttl-seconds")
                .long("session-ttl-seconds")
                .help("Session token TTL in seconds")
                .env("FOLIOFORGE_SESSION_TTL_SECONDS")
                .default_value("604800")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new(ARG_TOKEN_SECRET)
                .long(ARG_TOKEN_SECRET)
                .help("Secret used to sign session tokens")
                .env("FOLIOFORGE_TOKEN_SECRET")
                .required(true),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn base_args() -> Vec<&'static str> {
        vec![
            "folioforge",
            "--dsn",
            "postgres://localhost/folioforge",
            "--token-secret",
            "secret",
        ]
    }

    #[test]
    fn parse_defaults() -> Result<()> {
        temp_env::with_vars(
            [
                ("FOLIOFORGE_FRONTEND_BASE_URL", None::<&str>),
                ("FOLIOFORGE_OTP_TTL_SECONDS", None),
                ("FOLIOFORGE_SESSION_TTL_SECONDS", None),
            ],
            || {
                let matches = crate::cli::commands::new().get_matches_from(base_args());
                let options = Options::parse(&matches)?;
                assert_eq!(options.frontend_base_url, "https://folioforge.dev");
                assert_eq!(options.otp_ttl_seconds, 600);
                assert_eq!(options.session_ttl_seconds, 604_800);
                assert_eq!(options.token_secret.expose_secret(), "secret");
                Ok(())
            },
        )
    }

    #[test]
    fn parse_overrides() -> Result<()> {
        let mut args = base_args();
        args.extend([
            "--frontend-base-url",
            "http://localhost:3000",
            "--otp-ttl-seconds",
            "120",
            "--session-ttl-seconds",
            "3600",
        ]);
        let matches = crate::cli::commands::new().get_matches_from(args);
        let options = Options::parse(&matches)?;
        assert_eq!(options.frontend_base_url, "http://localhost:3000");
        assert_eq!(options.otp_ttl_seconds, 120);
        assert_eq!(options.session_ttl_seconds, 3600);
        Ok(())
    }
}
