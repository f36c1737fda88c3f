use crate::api;
use crate::api::email::SmtpConfig;
use crate::api::handlers::auth::AuthConfig;
use anyhow::Result;
use secrecy::SecretString;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub frontend_base_url: String,
    pub otp_ttl_seconds: i64,
    pub session_ttl_seconds: i64,
    pub token_secret: SecretString,
    pub smtp: Option<SmtpConfig>,
}

/// Execute the server action.
///
/// # Errors
/// Returns an error if the database is unreachable or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let auth_config = AuthConfig::new(args.frontend_base_url)
        .with_otp_ttl_seconds(args.otp_ttl_seconds)
        .with_session_ttl_seconds(args.session_ttl_seconds);

    api::new(
        args.port,
        args.dsn,
        auth_config,
        args.token_secret,
        args.smtp,
    )
    .await
}
