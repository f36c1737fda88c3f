//! Command-line argument dispatch and server initialization.
//!
//! This module parses validated CLI arguments and maps them to the
//! appropriate action, such as starting the API server with its full
//! configuration state.

use crate::cli::actions::{Action, server::Args};
use crate::cli::commands::{auth, email};
use anyhow::{Context, Result};

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>("dsn")
        .cloned()
        .context("missing required argument: --dsn")?;

    let auth_opts = auth::Options::parse(matches)?;
    let email_opts = email::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        dsn,
        frontend_base_url: auth_opts.frontend_base_url,
        otp_ttl_seconds: auth_opts.otp_ttl_seconds,
        session_ttl_seconds: auth_opts.session_ttl_seconds,
        token_secret: auth_opts.token_secret,
        smtp: email_opts.smtp,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_secret_required() {
        temp_env::with_vars(
            [
                ("FOLIOFORGE_TOKEN_SECRET", None::<&str>),
                (
                    "FOLIOFORGE_DSN",
                    Some("postgres://user@localhost:5432/folioforge"),
                ),
            ],
            || {
                let command = crate::cli::commands::new();
                let result = command.try_get_matches_from(vec!["folioforge"]);
                // clap enforces the secret before dispatch is reached.
                assert!(result.is_err());
            },
        );
    }

    #[test]
    fn dispatches_server_action() -> Result<()> {
        temp_env::with_vars([("FOLIOFORGE_SMTP_HOST", None::<&str>)], || {
            let command = crate::cli::commands::new();
            let matches = command.get_matches_from(vec![
                "folioforge",
                "--dsn",
                "postgres://user@localhost:5432/folioforge",
                "--token-secret",
                "secret",
                "--port",
                "9000",
            ]);
            let Action::Server(args) = handler(&matches)?;
            assert_eq!(args.port, 9000);
            assert_eq!(args.dsn, "postgres://user@localhost:5432/folioforge");
            assert!(args.smtp.is_none());
            Ok(())
        })
    }
}
