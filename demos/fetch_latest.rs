//! Example: Fetch the text of the most recent message.
//!
//! # Usage
//!
//! ```bash
//! export EMAIL_ADDRESS="your@email.com"
//! export EMAIL_PASSWORD="your-app-password"
//! cargo run --example fetch_latest
//! ```
//!
//! For Gmail, you'll need to use an [App Password](https://support.google.com/accounts/answer/185833).

use mail_probe::{FetchOptions, ImapConfig, MailClient, SearchFilter};
use std::env;

#[tokio::main]
async fn main() -> mail_probe::Result<()> {
    // Read credentials from environment
    let email = env::var("EMAIL_ADDRESS").expect("EMAIL_ADDRESS environment variable required");
    let password =
        env::var("EMAIL_PASSWORD").expect("EMAIL_PASSWORD environment variable required");

    println!("Connecting to IMAP server for {}...", email);

    let config = ImapConfig::builder()
        .email(&email)
        .password(password)
        .build()?;

    let mut client = MailClient::connect(config).await?;

    println!("Connected! Fetching the most recent message...\n");

    // Most recent message in the current label
    match client.fetch_text(&FetchOptions::default()).await? {
        Some(text) => println!("Text body:\n{}", text),
        None => println!("The most recent message has no text part."),
    }

    // Same thing, but narrowed by subject
    let opts = FetchOptions {
        filter: SearchFilter::subject("Welcome"),
        ..FetchOptions::default()
    };
    println!("\nLooking for the most recent 'Welcome' message...");
    match client.fetch_text(&opts).await {
        Ok(Some(text)) => println!("  Found:\n{}", text),
        Ok(None) => println!("  Found one, but it has no text part."),
        Err(e) => println!("  Not found: {}", e),
    }

    client.logout().await?;

    Ok(())
}
