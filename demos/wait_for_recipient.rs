//! Example: Wait for a message delivered to a generated address.
//!
//! This is the workflow the crate exists for: a test registers an account
//! with a plus-address like `you+run42@gmail.com`, then waits for the
//! resulting message to land and reads its text body.
//!
//! # Usage
//!
//! ```bash
//! export EMAIL_ADDRESS="your@email.com"
//! export EMAIL_PASSWORD="your-app-password"
//! export EXPECTED_ADDRESS="your+something@email.com"
//! cargo run --example wait_for_recipient
//! ```

use mail_probe::{ExpectOptions, ImapConfig, MailClient};
use std::env;
use std::time::Duration;

#[tokio::main]
async fn main() -> mail_probe::Result<()> {
    // RUST_LOG=mail_probe=debug shows the polling spans
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let email = env::var("EMAIL_ADDRESS").expect("EMAIL_ADDRESS environment variable required");
    let password =
        env::var("EMAIL_PASSWORD").expect("EMAIL_PASSWORD environment variable required");
    let expected =
        env::var("EXPECTED_ADDRESS").expect("EXPECTED_ADDRESS environment variable required");

    println!("Connecting to IMAP server for {}...", email);

    let config = ImapConfig::builder()
        .email(&email)
        .password(password)
        .build()?;

    let client = MailClient::connect(config).await?;
    let mut guard = client.into_guard(); // logs out on drop

    println!(
        "Connected! Waiting up to 60s for mail delivered to {}...",
        expected
    );
    println!("(Send a message to that address, or press Ctrl+C to cancel)");

    let opts = ExpectOptions {
        last_few: 5,
        timeout: Duration::from_secs(60),
        poll_delay: Duration::from_secs(1),
        ..ExpectOptions::default()
    };

    match guard.wait_for_delivery(&expected, &opts).await? {
        Some(text) => println!("\nGot it! Text body:\n{}", text),
        None => println!("\nMessage arrived, but it has no text part."),
    }

    guard.logout().await?;

    Ok(())
}
