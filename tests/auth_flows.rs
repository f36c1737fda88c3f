//! End-to-end account lifecycle tests over the in-memory store.
//!
//! These exercise the public service API the way the HTTP layer does,
//! without a database or an SMTP relay.

use std::sync::Arc;

use anyhow::{Context, Result};
use secrecy::SecretString;

use folioforge::api::handlers::auth::mocks::{MemoryAccountStore, RecordingEmailSender};
use folioforge::api::handlers::auth::{
    AccountStore, AuthConfig, AuthError, AuthService, SignupInput,
};

fn service_with_store() -> Result<(AuthService<Arc<MemoryAccountStore>>, Arc<MemoryAccountStore>)> {
    let store = Arc::new(MemoryAccountStore::new());
    let sender = Arc::new(RecordingEmailSender::new());
    let config = AuthConfig::new("https://folioforge.dev".to_string());
    let service = AuthService::new(
        Arc::clone(&store),
        sender,
        config,
        SecretString::from("integration-signing-secret".to_string()),
    )?;
    Ok((service, store))
}

async fn verification_code(store: &MemoryAccountStore, email: &str) -> Result<String> {
    store
        .find_by_email(email)
        .await?
        .context("account missing")?
        .verification_otp
        .context("no pending verification code")
}

async fn reset_code(store: &MemoryAccountStore, email: &str) -> Result<String> {
    store
        .find_by_email(email)
        .await?
        .context("account missing")?
        .reset_otp
        .context("no pending reset code")
}

#[tokio::test]
async fn full_verification_lifecycle() -> Result<()> {
    let (service, store) = service_with_store()?;

    service
        .signup(SignupInput {
            email: "a@x.com".to_string(),
            password: "secret1".to_string(),
            name: Some("Ann".to_string()),
        })
        .await?;

    let account = store
        .find_by_email("a@x.com")
        .await?
        .context("account missing")?;
    assert!(!account.email_verified);

    let code = verification_code(&store, "a@x.com").await?;
    let wrong = if code == "999999" { "999998" } else { "999999" };

    let rejected = service.verify_email("a@x.com", wrong).await;
    assert!(matches!(rejected, Err(AuthError::InvalidCode)));

    let session = service.verify_email("a@x.com", &code).await?;
    let claims = service.verify_session(&session.token)?;
    assert_eq!(claims.email, "a@x.com");

    let account = store
        .find_by_email("a@x.com")
        .await?
        .context("account missing")?;
    assert!(account.email_verified);
    assert!(account.verification_otp.is_none());

    // Verification is monotonic: the consumed code resolves nothing.
    let replay = service.verify_email("a@x.com", &code).await;
    assert!(matches!(replay, Err(AuthError::NotFound)));
    Ok(())
}

#[tokio::test]
async fn full_reset_lifecycle() -> Result<()> {
    let (service, store) = service_with_store()?;

    service
        .signup(SignupInput {
            email: "a@x.com".to_string(),
            password: "secret1".to_string(),
            name: Some("Ann".to_string()),
        })
        .await?;

    service.forgot_password("a@x.com").await?;
    let code = reset_code(&store, "a@x.com").await?;

    service.reset_password("a@x.com", &code, "newpass1").await?;

    let old_login = service.login("a@x.com", "secret1").await;
    assert!(matches!(old_login, Err(AuthError::InvalidCredentials)));

    let session = service.login("a@x.com", "newpass1").await?;
    assert_eq!(session.email, "a@x.com");
    Ok(())
}

#[tokio::test]
async fn opaque_flows_behave_identically_for_unknown_accounts() -> Result<()> {
    let (service, _store) = service_with_store()?;

    // Both flows succeed silently whether or not the account exists.
    service.forgot_password("missing@x.com").await?;
    service.resend_verification("missing@x.com").await?;

    service
        .signup(SignupInput {
            email: "real@x.com".to_string(),
            password: "secret1".to_string(),
            name: None,
        })
        .await?;
    service.forgot_password("real@x.com").await?;
    service.resend_verification("real@x.com").await?;
    Ok(())
}
