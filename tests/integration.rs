//! Integration tests for mail-probe.
//!
//! These tests require a real IMAP server and are disabled by default.
//! To run them:
//!
//! ```bash
//! # Set environment variables
//! export MAIL_PROBE_TEST_EMAIL="your@email.com"
//! export MAIL_PROBE_TEST_PASSWORD="your-app-password"
//!
//! # Optional: a non-default host or label
//! export MAIL_PROBE_TEST_HOST="imap.example.com"
//! export MAIL_PROBE_TEST_LABEL="INBOX"
//!
//! # Run with the integration-tests feature
//! cargo test --features integration-tests -- --ignored
//! ```

use mail_probe::{ExpectOptions, FetchOptions, ImapConfig, MailClient};
use std::env;
use std::time::Duration;

// ─────────────────────────────────────────────────────────────────────────────
// Test Configuration Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn get_test_credentials() -> Option<(String, String)> {
    dotenvy::dotenv().ok();
    let email = env::var("MAIL_PROBE_TEST_EMAIL").ok()?;
    let password = env::var("MAIL_PROBE_TEST_PASSWORD").ok()?;
    Some((email, password))
}

fn get_test_config() -> Option<ImapConfig> {
    let (email, password) = get_test_credentials()?;

    let mut builder = ImapConfig::builder().email(email).password(password);

    if let Ok(host) = env::var("MAIL_PROBE_TEST_HOST") {
        builder = builder.imap_host(host);
    }
    if let Ok(label) = env::var("MAIL_PROBE_TEST_LABEL") {
        builder = builder.label(label);
    }

    builder.build().ok()
}

// ─────────────────────────────────────────────────────────────────────────────
// Connection Tests
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
#[ignore = "requires real IMAP server"]
async fn test_connect_and_logout() {
    let config = get_test_config().expect("Test config from environment variables");

    let mut client = MailClient::connect(config).await.expect("Failed to connect");

    assert!(!client.email().is_empty());

    client.logout().await.expect("Failed to logout");
}

#[tokio::test]
#[ignore = "requires real IMAP server"]
async fn test_guard_auto_logout() {
    let config = get_test_config().expect("Test config from environment variables");

    let client = MailClient::connect(config).await.expect("Failed to connect");

    // Guard will logout on drop
    let guard = client.into_guard();
    assert!(!guard.email().is_empty());

    // Explicit logout through guard
    guard.logout().await.expect("Failed to logout");
}

// ─────────────────────────────────────────────────────────────────────────────
// Fetch Tests
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
#[ignore = "requires real IMAP server with at least one message"]
async fn test_fetch_most_recent_text() {
    let config = get_test_config().expect("Test config from environment variables");

    let mut client = MailClient::connect(config).await.expect("Failed to connect");

    let result = client.fetch_text(&FetchOptions::default()).await;

    match result {
        Ok(Some(text)) => assert!(!text.is_empty()),
        Ok(None) => println!("Most recent message has no text part"),
        Err(e) => panic!("fetch failed: {e}"),
    }

    client.logout().await.expect("Failed to logout");
}

#[tokio::test]
#[ignore = "requires real IMAP server"]
async fn test_fetch_is_idempotent() {
    let config = get_test_config().expect("Test config from environment variables");

    let mut client = MailClient::connect(config).await.expect("Failed to connect");

    let opts = FetchOptions::default();
    let first = client.fetch_text(&opts).await.expect("first fetch");
    let second = client.fetch_text(&opts).await.expect("second fetch");
    assert_eq!(first, second);

    client.logout().await.expect("Failed to logout");
}

// ─────────────────────────────────────────────────────────────────────────────
// Expectation Search Tests
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
#[ignore = "requires real IMAP server"]
async fn test_wait_for_delivery_timeout() {
    let config = get_test_config().expect("Test config from environment variables");

    let mut client = MailClient::connect(config).await.expect("Failed to connect");

    // Wait for an address nothing was ever delivered to
    let opts = ExpectOptions {
        timeout: Duration::from_secs(3),
        poll_delay: Duration::from_millis(500),
        ..ExpectOptions::default()
    };
    let result = client
        .wait_for_delivery("nobody+never@example.invalid", &opts)
        .await;

    assert!(result.is_err());
    let err = result.unwrap_err();

    // The bounded wait already elapsed; not retryable as-is
    assert!(!err.is_retryable());

    client.logout().await.expect("Failed to logout");
}

// ─────────────────────────────────────────────────────────────────────────────
// Error Handling Tests
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
#[ignore = "requires intentionally wrong credentials"]
async fn test_invalid_credentials() {
    let config = ImapConfig::builder()
        .email("test@gmail.com")
        .password("wrong-password")
        .build()
        .expect("valid config structure");

    let result = MailClient::connect(config).await;

    assert!(result.is_err());
    let err = result.unwrap_err();

    // Authentication errors are retryable (could be temporary server issue)
    println!("Connection error: {}", err);
    println!("Category: {}", err.category());
}

#[tokio::test]
async fn test_invalid_email_format() {
    let result = ImapConfig::builder()
        .email("not-an-email")
        .password("password")
        .build();

    assert!(result.is_err());
}

#[tokio::test]
async fn test_missing_required_fields() {
    // Missing email
    let result = ImapConfig::builder().password("password").build();
    assert!(result.is_err());

    // Missing password
    let result = ImapConfig::builder().email("test@example.com").build();
    assert!(result.is_err());
}
