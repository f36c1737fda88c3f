use anyhow::Result;
use clap::{Arg, Command};
use secrecy::SecretString;

use crate::api::email::SmtpConfig;

/// Parsed email delivery options.
///
/// `smtp` is `None` when no SMTP host is configured; the server then
/// falls back to the logging sender for local development.
#[derive(Debug)]
pub struct Options {
    pub smtp: Option<SmtpConfig>,
}

impl Options {
    /// Extract email options from parsed matches.
    ///
    /// # Errors
    /// Returns an error if an SMTP host is set without credentials.
    pub fn parse(matches: &clap::ArgMatches) -> Result<Self> {
        let Some(host) = matches.get_one::<String>("smtp-host").cloned() else {
            return Ok(Self { smtp: None });
        };

        let username = matches
            .get_one::<String>("smtp-username")
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("missing required argument: --smtp-username"))?;
        let password = matches
            .get_one::<String>("smtp-password")
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("missing required argument: --smtp-password"))?;

        Ok(Self {
            smtp: Some(SmtpConfig {
                host,
                port: matches.get_one::<u16>("smtp-port").copied().unwrap_or(587),
                username,
                password: SecretString::from(password),
                from_email: matches
                    .get_one::<String>("from-email")
                    .cloned()
                    .unwrap_or_else(|| "no-reply@folioforge.dev".to_string()),
                from_name: matches
                    .get_one::<String>("from-name")
                    .cloned()
                    .unwrap_or_else(|| "Folioforge".to_string()),
            }),
        })
    }
}

pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("smtp-host")
                .long("smtp-host")
                .help("SMTP relay host; emails are logged instead when unset")
                .env("FOLIOFORGE_SMTP_HOST"),
        )
        .arg(
            Arg::new("smtp-port")
                .long("smtp-port")
                .help("SMTP relay port")
                .env("FOLIOFORGE_SMTP_PORT")
                .default_value("587")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("smtp-username")
                .long("smtp-username")
                .help("SMTP authentication username")
                .env("FOLIOFORGE_SMTP_USERNAME"),
        )
        .arg(
            Arg::new("smtp-password")
                .long("smtp-password")
                .help("SMTP authentication password")
                .env("FOLIOFORGE_SMTP_PASSWORD"),
        )
        .arg(
            Arg::new("from-email")
                .long("from-email")
                .help("Sender address for outbound mail")
                .env("FOLIOFORGE_FROM_EMAIL")
                .default_value("no-reply@folioforge.dev"),
        )
        .arg(
            Arg::new("from-name")
                .long("from-name")
                .help("Sender display name for outbound mail")
                .env("FOLIOFORGE_FROM_NAME")
                .default_value("Folioforge"),
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
    fn no_smtp_host_means_log_sender() -> Result<()> {
        temp_env::with_vars([("FOLIOFORGE_SMTP_HOST", None::<&str>)], || {
            let matches = crate::cli::commands::new().get_matches_from(base_args());
            let options = Options::parse(&matches)?;
            assert!(options.smtp.is_none());
            Ok(())
        })
    }

    #[test]
    fn smtp_host_requires_credentials() {
        temp_env::with_vars(
            [
                ("FOLIOFORGE_SMTP_USERNAME", None::<&str>),
                ("FOLIOFORGE_SMTP_PASSWORD", None),
            ],
            || {
                let mut args = base_args();
                args.extend(["--smtp-host", "smtp.example.com"]);
                let matches = crate::cli::commands::new().get_matches_from(args);
                assert!(Options::parse(&matches).is_err());
            },
        );
    }

    #[test]
    fn full_smtp_config_parses() -> Result<()> {
        let mut args = base_args();
        args.extend([
            "--smtp-host",
            "smtp.example.com",
            "--smtp-port",
            "2525",
            "--smtp-username",
            "mailer",
            "--smtp-password",
            "hunter2",
            "--from-email",
            "hello@folioforge.dev",
            "--from-name",
            "Folioforge Accounts",
        ]);
        let matches = crate::cli::commands::new().get_matches_from(args);
        let options = Options::parse(&matches)?;
        let smtp = options.smtp.expect("smtp config");
        assert_eq!(smtp.host, "smtp.example.com");
        assert_eq!(smtp.port, 2525);
        assert_eq!(smtp.username, "mailer");
        assert_eq!(smtp.password.expose_secret(), "hunter2");
        assert_eq!(smtp.from_email, "hello@folioforge.dev");
        assert_eq!(smtp.from_name, "Folioforge Accounts");
        Ok(())
    }
}
