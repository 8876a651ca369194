//! # mail-probe
//!
//! Async IMAP polling client for retrieving expected test emails by delivery
//! address.
//!
//! This crate exists for one workflow: an automated test (or other automation)
//! sends mail to a dynamically generated address, then needs to reliably pull
//! the resulting message back out of a mailbox despite delivery latency and
//! ordering variance. It provides a high-level, async API for:
//!
//! - Connecting to an IMAP server over TLS
//! - Listing message ids with a bounded staleness retry (new mail can take a
//!   moment to become searchable)
//! - Fetching a message by position, with out-of-range leniency
//! - Polling a sliding window of recent messages until one is delivered to an
//!   expected address, then extracting its text body
//!
//! ## Quick Start
//!
//! ```no_run
//! use mail_probe::{ExpectOptions, ImapConfig, MailClient};
//!
//! # async fn example() -> mail_probe::Result<()> {
//! let config = ImapConfig::builder()
//!     .email("robot@gmail.com")
//!     .password("app-password")  // Use app-specific password for Gmail
//!     .build()?;
//!
//! let mut client = MailClient::connect(config).await?;
//!
//! // The test sent mail to a generated plus-address; wait for it to land
//! // among the last few messages and return its text body.
//! let text = client
//!     .wait_for_delivery("robot+run42@gmail.com", &ExpectOptions::default())
//!     .await?;
//! println!("Got message: {:?}", text);
//!
//! // Clean up
//! client.logout().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Fetching by Position
//!
//! ```no_run
//! use mail_probe::{FetchOptions, ImapConfig, MailClient, SearchFilter};
//!
//! # async fn example() -> mail_probe::Result<()> {
//! # let config = ImapConfig::builder().email("a@b.c").password("x").build()?;
//! let mut client = MailClient::connect(config).await?;
//!
//! // Most recent message matching a subject filter
//! let opts = FetchOptions {
//!     filter: SearchFilter::subject("Welcome!"),
//!     ..FetchOptions::default()
//! };
//! let text = client.fetch_text(&opts).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Custom Backends
//!
//! All polling logic runs against the [`Mailbox`] trait, so the client can be
//! pointed at any store that speaks select/search/fetch - including an
//! in-memory fake in tests:
//!
//! ```ignore
//! let client = MailClient::with_store(my_store, config);
//! ```
//!
//! ## RAII Guard for Automatic Cleanup
//!
//! ```no_run
//! use mail_probe::{ExpectOptions, ImapConfig, MailClient};
//!
//! # async fn example() -> mail_probe::Result<()> {
//! # let config = ImapConfig::builder().email("a@b.c").password("x").build()?;
//! let client = MailClient::connect(config).await?;
//! let mut guard = client.into_guard();  // Will logout on drop
//!
//! let text = guard
//!     .wait_for_delivery("a+test@b.c", &ExpectOptions::default())
//!     .await?;
//! // Guard automatically logs out when dropped
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! All errors implement `std::error::Error` and provide context. The two
//! search outcomes worth special-casing are [`Error::EmptyMailbox`] (the
//! label stayed empty past the staleness ceiling) and
//! [`Error::ExpectationNotFound`] (no message for the expected address within
//! the timeout - retry with a larger window or timeout if the mail may still
//! be in flight). Use [`Error::is_retryable`] for everything else.
//!
//! ## Observability
//!
//! The crate uses `tracing` for instrumentation. Client operations emit spans
//! with structured fields (`label`, `filter`, `index`, `expected`); the
//! out-of-range index correction is reported as a `warn` event.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Public modules
pub mod config;
pub mod error;
pub mod mailbox;
pub mod parser;

// Internal modules
mod client;
mod connection;
mod session;

// Re-exports for ergonomic API
pub use client::{ExpectOptions, FetchOptions, MailClient, MailClientGuard};
pub use config::{ImapConfig, ImapConfigBuilder, StalenessConfig, TimeoutConfig};
pub use email_address::EmailAddress;
pub use error::{Error, ErrorCategory, Result};
pub use mailbox::{Mailbox, SearchFilter};
pub use parser::ParsedEmail;
pub use session::ImapStore;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_api_accessible() {
        // Ensure all public types are accessible
        let _ = ImapConfig::builder();
        let _ = SearchFilter::all();
        let _ = FetchOptions::default();
        let _ = ExpectOptions::default();
    }
}
