//! Mailbox polling client for retrieving expected test emails.
//!
//! The [`MailClient`] is the main entry point for this crate. It provides
//! async methods to:
//!
//! - List message ids with a bounded staleness retry
//! - Fetch a message by position (newest by default)
//! - Wait for a message delivered to an expected address and return its text
//!
//! # Example
//!
//! ```no_run
//! use mail_probe::{ExpectOptions, ImapConfig, MailClient};
//!
//! # async fn example() -> mail_probe::Result<()> {
//! let config = ImapConfig::builder()
//!     .email("robot@gmail.com")
//!     .password("app-password")
//!     .build()?;
//!
//! let mut client = MailClient::connect(config).await?;
//!
//! // A workflow sent mail to a generated plus-address; wait for it to land.
//! let text = client
//!     .wait_for_delivery("robot+run42@gmail.com", &ExpectOptions::default())
//!     .await?;
//! println!("Got message: {:?}", text);
//!
//! client.logout().await?;
//! # Ok(())
//! # }
//! ```

use crate::config::ImapConfig;
use crate::connection;
use crate::error::{Error, Result};
use crate::mailbox::{Mailbox, SearchFilter};
use crate::parser::ParsedEmail;
use crate::session::{self, AuthConfig, ImapStore};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

/// Options for fetching one message by position.
///
/// Typed replacement for ad-hoc keyword arguments: every recognized option and
/// its default is enumerated here.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Label to search in. `None` (or an empty string) keeps the currently
    /// selected label.
    pub label: Option<String>,
    /// Search filter narrowing the id listing. Default: `ALL`.
    pub filter: SearchFilter,
    /// Position in the ascending id listing. Negative counts from the newest
    /// message, so the default `-1` is the most recent. Out-of-range values
    /// are corrected to the most recent with a logged warning.
    pub index: i64,
    /// Pacing delay applied before the request. Default: none.
    pub sleep_before: Duration,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            label: None,
            filter: SearchFilter::all(),
            index: -1,
            sleep_before: Duration::ZERO,
        }
    }
}

/// Options for waiting on a message delivered to an expected address.
#[derive(Debug, Clone)]
pub struct ExpectOptions {
    /// Label to search in. `None` (or an empty string) keeps the currently
    /// selected label.
    pub label: Option<String>,
    /// Search filter narrowing the id listing. Default: `ALL`.
    pub filter: SearchFilter,
    /// How many of the most recent messages to scan each pass. Default: 3.
    pub last_few: usize,
    /// Total wall time before the search gives up. Default: 30 s.
    pub timeout: Duration,
    /// Sleep between scan passes. Default: none.
    pub poll_delay: Duration,
    /// Pacing delay applied before the first request. Default: none.
    pub sleep_before: Duration,
}

impl Default for ExpectOptions {
    fn default() -> Self {
        Self {
            label: None,
            filter: SearchFilter::all(),
            last_few: 3,
            timeout: Duration::from_secs(30),
            poll_delay: Duration::ZERO,
            sleep_before: Duration::ZERO,
        }
    }
}

/// Async mailbox polling client.
///
/// Create using [`MailClient::connect`] for a real IMAP server, or
/// [`MailClient::with_store`] to run against any [`Mailbox`] implementation.
///
/// # Lifecycle
///
/// 1. Create a client with [`connect`](Self::connect)
/// 2. Use [`fetch_text`](Self::fetch_text) or
///    [`wait_for_delivery`](Self::wait_for_delivery)
/// 3. Call [`logout`](Self::logout) when done (or use
///    [`into_guard`](Self::into_guard) for RAII)
///
/// One client owns one session; run concurrent searches on separate clients.
pub struct MailClient<S: Mailbox = ImapStore> {
    store: S,
    config: ImapConfig,
    /// Currently selected label.
    label: String,
}

impl MailClient<ImapStore> {
    /// Connects to the IMAP server and prepares for polling.
    ///
    /// This establishes a TLS connection, authenticates, and selects the
    /// configured label.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Connection cannot be established
    /// - Authentication fails
    /// - Label selection fails
    #[instrument(
        name = "MailClient::connect",
        skip_all,
        fields(
            email = %config.email(),
            imap_host = %config.imap_host,
            label = %config.label
        )
    )]
    pub async fn connect(config: ImapConfig) -> Result<Self> {
        let target_addr = config.server_address();
        let timeouts = &config.timeouts;

        // Establish TLS connection
        let tls_stream = tokio::time::timeout(
            timeouts.connect,
            connection::establish_tls_connection(&config.imap_host, &target_addr),
        )
        .await
        .map_err(|_| Error::ConnectTimeout {
            target: target_addr.clone(),
            timeout: timeouts.connect,
        })??;

        debug!("TLS connection established");

        // Authenticate
        let auth_config = AuthConfig {
            email: config.email(),
            password: config.password(),
        };

        let imap_session = tokio::time::timeout(
            timeouts.auth,
            session::authenticate(tls_stream, &auth_config),
        )
        .await
        .map_err(|_| Error::AuthTimeout {
            email: config.email().to_string(),
            timeout: timeouts.auth,
        })??;

        debug!("Authenticated");

        // Select the configured label
        let mut store = ImapStore::new(imap_session);
        tokio::time::timeout(timeouts.select, store.select(&config.label))
            .await
            .map_err(|_| Error::SelectTimeout {
                label: config.label.clone(),
                timeout: timeouts.select,
            })??;

        debug!(label = %config.label, "Label selected, client ready");

        let label = config.label.clone();
        Ok(Self {
            store,
            config,
            label,
        })
    }

    /// Converts this client into a guard that logs out on drop.
    ///
    /// This is useful for ensuring cleanup in the face of early returns
    /// or panics.
    #[must_use]
    pub fn into_guard(self) -> MailClientGuard {
        MailClientGuard { inner: Some(self) }
    }
}

impl<S: Mailbox> MailClient<S> {
    /// Creates a client over an already-prepared store.
    ///
    /// The store must behave like an authenticated session with
    /// `config.label` selected. This is the entry point for custom backends
    /// and for exercising the polling logic against an in-memory store.
    pub fn with_store(store: S, config: ImapConfig) -> Self {
        let label = config.label.clone();
        Self {
            store,
            config,
            label,
        }
    }

    /// Returns the email address used for this connection.
    #[must_use]
    pub fn email(&self) -> &str {
        self.config.email()
    }

    /// Returns the currently selected label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Lists message ids matching the filter, in ascending arrival order.
    ///
    /// Newly delivered mail can lag behind searchability, so an empty result
    /// is retried on a short interval (keepalive, then search again) until
    /// the staleness ceiling elapses. The returned list is therefore never
    /// empty.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyMailbox`] if the label stays empty for the whole
    /// ceiling (default 10 s).
    #[instrument(name = "MailClient::list_ids", skip(self), fields(label = %self.label, filter = %filter))]
    pub async fn list_ids(&mut self, filter: &SearchFilter) -> Result<Vec<u32>> {
        let started = Instant::now();

        loop {
            self.store.keepalive().await?;
            let ids = self.store.search(filter).await?;

            if !ids.is_empty() {
                debug!(id_count = ids.len(), "Listing complete");
                return Ok(ids);
            }

            if started.elapsed() > self.config.staleness.ceiling {
                return Err(Error::EmptyMailbox {
                    label: self.label.clone(),
                    filter: filter.to_string(),
                });
            }

            tokio::time::sleep(self.config.staleness.interval).await;
        }
    }

    /// Fetches and parses one message by position in the id listing.
    ///
    /// An out-of-range index is corrected to the most recent message with a
    /// logged warning rather than failing, so callers with a stale or guessed
    /// position still get a usable result.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyMailbox`] if the listing stays empty, or any
    /// transport/parse failure from the fetch itself.
    #[instrument(
        name = "MailClient::fetch_by_index",
        skip(self, opts),
        fields(label = %self.label, filter = %opts.filter, index = opts.index)
    )]
    pub async fn fetch_by_index(&mut self, opts: &FetchOptions) -> Result<ParsedEmail> {
        if !opts.sleep_before.is_zero() {
            tokio::time::sleep(opts.sleep_before).await;
        }
        self.apply_label(opts.label.as_deref()).await?;

        let ids = self.list_ids(&opts.filter).await?;

        let position = match resolve_index(ids.len(), opts.index) {
            Some(position) => position,
            None => {
                warn!(
                    label = %self.label,
                    filter = %opts.filter,
                    index = opts.index,
                    id_count = ids.len(),
                    "Requested index out of range, using most recent message"
                );
                ids.len() - 1
            }
        };

        self.fetch_parsed(ids[position]).await
    }

    /// Fetches and parses the last `count` messages, oldest-to-newest.
    ///
    /// The window is re-resolved from a fresh listing on every call: new mail
    /// shifts which ids are the most recent, and re-fetching a handful of
    /// messages is cheaper than tracking that drift.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyMailbox`] if the listing stays empty, or any
    /// transport/parse failure from the individual fetches.
    pub async fn fetch_window(
        &mut self,
        filter: &SearchFilter,
        count: usize,
    ) -> Result<Vec<ParsedEmail>> {
        let ids = self.list_ids(filter).await?;
        let window_start = ids.len().saturating_sub(count);

        let mut messages = Vec::with_capacity(ids.len() - window_start);
        for &id in &ids[window_start..] {
            messages.push(self.fetch_parsed(id).await?);
        }
        Ok(messages)
    }

    /// Fetches one message by position and returns its first text body.
    ///
    /// `Ok(None)` means the message was found but has no text part, which is
    /// a legitimate shape (e.g. an all-attachment multipart), not an error.
    ///
    /// # Errors
    ///
    /// See [`fetch_by_index`](Self::fetch_by_index).
    pub async fn fetch_text(&mut self, opts: &FetchOptions) -> Result<Option<String>> {
        let message = self.fetch_by_index(opts).await?;
        Ok(message.text_body().map(str::to_string))
    }

    /// Waits for a message delivered to `expected` and returns its text body.
    ///
    /// Each pass re-fetches the window of the `last_few` most recent messages
    /// and scans them oldest-to-newest for an exact, case-sensitive
    /// `Delivered-To` match. If no pass matches, the client sleeps
    /// `poll_delay` and scans again until `timeout` of wall time has elapsed.
    /// The timeout is checked at pass boundaries: a pass already underway
    /// runs to completion before failure is declared.
    ///
    /// `Ok(None)` means the matching message has no text part.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ExpectationNotFound`] naming the expected address if
    /// the timeout elapses, or [`Error::EmptyMailbox`] if the label never
    /// becomes searchable at all.
    #[instrument(
        name = "MailClient::wait_for_delivery",
        skip(self, opts),
        fields(
            expected = %expected,
            filter = %opts.filter,
            last_few = opts.last_few
        )
    )]
    pub async fn wait_for_delivery(
        &mut self,
        expected: &str,
        opts: &ExpectOptions,
    ) -> Result<Option<String>> {
        if !opts.sleep_before.is_zero() {
            tokio::time::sleep(opts.sleep_before).await;
        }
        self.apply_label(opts.label.as_deref()).await?;

        let started = Instant::now();
        let mut passes: u32 = 0;

        loop {
            let window = self.fetch_window(&opts.filter, opts.last_few).await?;
            passes += 1;

            if let Some(hit) = window
                .iter()
                .find(|message| message.delivered_to() == Some(expected))
            {
                debug!(passes, "Found expected delivery");
                return Ok(hit.text_body().map(str::to_string));
            }

            if started.elapsed() > opts.timeout {
                debug!(passes, "Search timeout elapsed");
                return Err(Error::ExpectationNotFound {
                    expected: expected.to_string(),
                });
            }

            tokio::time::sleep(opts.poll_delay).await;
        }
    }

    /// Logs out from the server: CLOSE the selected label, then LOGOUT.
    ///
    /// # Errors
    ///
    /// Returns an error if either teardown command fails.
    #[instrument(name = "MailClient::logout", skip(self))]
    pub async fn logout(&mut self) -> Result<()> {
        self.store.close().await?;
        self.store.logout().await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Private methods
    // ─────────────────────────────────────────────────────────────────────────

    /// Switches the selected label if a per-call override asks for one.
    ///
    /// Absent and empty labels both mean "keep the current label"; selecting
    /// the already-current label is a no-op.
    async fn apply_label(&mut self, label: Option<&str>) -> Result<()> {
        let Some(requested) = label.filter(|l| !l.is_empty()) else {
            return Ok(());
        };

        if requested != self.label {
            self.store.select(requested).await?;
            self.label = requested.to_string();
        }
        Ok(())
    }

    /// Fetches one raw message and decodes it.
    async fn fetch_parsed(&mut self, id: u32) -> Result<ParsedEmail> {
        let raw = self.store.fetch(id).await?;
        ParsedEmail::parse(&raw)
    }
}

/// Resolves a possibly-negative position into the id listing.
///
/// Negative values count from the end (`-1` is the newest message). Returns
/// `None` when the position falls outside the listing.
fn resolve_index(len: usize, index: i64) -> Option<usize> {
    let signed_len = i64::try_from(len).ok()?;
    let resolved = if index < 0 { signed_len + index } else { index };

    usize::try_from(resolved).ok().filter(|&position| position < len)
}

impl<S: Mailbox> std::fmt::Debug for MailClient<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailClient")
            .field("email", &self.config.email())
            .field("imap_host", &self.config.imap_host)
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// RAII guard for [`MailClient`] that logs out on drop.
///
/// Created by [`MailClient::into_guard`].
pub struct MailClientGuard {
    inner: Option<MailClient<ImapStore>>,
}

impl MailClientGuard {
    /// Fetches one message by position and returns its first text body.
    ///
    /// See [`MailClient::fetch_text`].
    ///
    /// # Panics
    ///
    /// Panics if the guard has already been consumed (e.g., after calling
    /// [`logout`](Self::logout)).
    ///
    /// # Errors
    ///
    /// See [`MailClient::fetch_text`].
    pub async fn fetch_text(&mut self, opts: &FetchOptions) -> Result<Option<String>> {
        self.inner
            .as_mut()
            .expect("guard already consumed")
            .fetch_text(opts)
            .await
    }

    /// Waits for a message delivered to `expected` and returns its text body.
    ///
    /// See [`MailClient::wait_for_delivery`].
    ///
    /// # Panics
    ///
    /// Panics if the guard has already been consumed (e.g., after calling
    /// [`logout`](Self::logout)).
    ///
    /// # Errors
    ///
    /// See [`MailClient::wait_for_delivery`].
    pub async fn wait_for_delivery(
        &mut self,
        expected: &str,
        opts: &ExpectOptions,
    ) -> Result<Option<String>> {
        self.inner
            .as_mut()
            .expect("guard already consumed")
            .wait_for_delivery(expected, opts)
            .await
    }

    /// Explicitly logs out and consumes the guard.
    ///
    /// If not called, the guard will attempt to logout on drop.
    ///
    /// # Errors
    ///
    /// Returns an error if the teardown commands fail.
    pub async fn logout(mut self) -> Result<()> {
        if let Some(mut client) = self.inner.take() {
            client.logout().await
        } else {
            Ok(())
        }
    }

    /// Returns the email address used for this connection.
    ///
    /// # Panics
    ///
    /// Panics if the guard has already been consumed (e.g., after calling
    /// [`logout`](Self::logout)).
    #[must_use]
    pub fn email(&self) -> &str {
        self.inner.as_ref().expect("guard already consumed").email()
    }
}

impl Drop for MailClientGuard {
    fn drop(&mut self) {
        if let Some(mut client) = self.inner.take() {
            let logout_timeout = client.config.timeouts.logout;

            // Try to get the current tokio runtime handle
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    // We're in an async context, spawn the logout task
                    handle.spawn(async move {
                        match tokio::time::timeout(logout_timeout, client.logout()).await {
                            Ok(Ok(())) => debug!("Client logged out successfully"),
                            Ok(Err(e)) => warn!(error = %e, "Client logout failed"),
                            Err(_) => warn!(
                                timeout_secs = logout_timeout.as_secs(),
                                "Client logout timed out"
                            ),
                        }
                    });
                }
                Err(_) => {
                    // No tokio runtime available - we're in a sync context
                    warn!(
                        "MailClientGuard dropped outside of tokio runtime context. \
                         Connection will be closed without proper IMAP logout. \
                         Consider calling .logout().await explicitly before dropping."
                    );
                }
            }
        }
    }
}

impl std::fmt::Debug for MailClientGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailClientGuard")
            .field("inner", &self.inner)
            .finish()
    }
}
