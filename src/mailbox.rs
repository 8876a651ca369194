//! The mailbox collaborator seam and search filters.
//!
//! [`Mailbox`] abstracts the handful of IMAP session operations the client
//! depends on: select, keepalive, search, fetch, and teardown. The production
//! implementation is [`ImapStore`](crate::ImapStore); test suites substitute
//! an in-memory implementation to exercise the polling logic without a server.

use crate::error::Result;

/// The protocol operations the client performs against a mail store.
///
/// Implementations are expected to behave like an authenticated IMAP session
/// with a label selected: `search` returns the ids currently visible in that
/// label, and `fetch` returns the full raw message (headers and body) for one
/// of those ids.
///
/// The client owns its store exclusively; no concurrent callers are supported
/// against a single store instance.
#[allow(async_fn_in_trait)]
pub trait Mailbox {
    /// Selects a label (named folder/mailbox view) for subsequent operations.
    async fn select(&mut self, label: &str) -> Result<()>;

    /// Issues a keepalive/refresh (IMAP NOOP) so the next search sees current
    /// state. Side-effect-free from the caller's perspective.
    async fn keepalive(&mut self) -> Result<()>;

    /// Searches the selected label and returns matching message ids in
    /// ascending order (later id = newer arrival). May be empty.
    async fn search(&mut self, filter: &SearchFilter) -> Result<Vec<u32>>;

    /// Fetches the full raw message for an id known from a prior search.
    async fn fetch(&mut self, id: u32) -> Result<Vec<u8>>;

    /// Closes the selected label. Must precede [`logout`](Self::logout).
    async fn close(&mut self) -> Result<()>;

    /// Ends the session.
    async fn logout(&mut self) -> Result<()>;
}

/// A search criteria expression narrowing which message ids a listing returns.
///
/// The default filter is `ALL`. Arbitrary IMAP SEARCH criteria can be passed
/// through [`SearchFilter::raw`], and the common header predicate has a typed
/// constructor:
///
/// ```
/// use mail_probe::SearchFilter;
///
/// assert_eq!(SearchFilter::all().as_query(), "ALL");
/// assert_eq!(
///     SearchFilter::header("Subject", "Welcome!").as_query(),
///     "HEADER Subject \"Welcome!\""
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchFilter {
    query: String,
}

impl SearchFilter {
    /// Matches every message in the label.
    #[must_use]
    pub fn all() -> Self {
        Self {
            query: "ALL".to_string(),
        }
    }

    /// A raw IMAP SEARCH criteria string, passed through unmodified.
    ///
    /// Example: `SearchFilter::raw("UNSEEN FROM \"noreply@example.com\"")`.
    #[must_use]
    pub fn raw(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
        }
    }

    /// Matches messages whose named header contains the given value.
    #[must_use]
    pub fn header(name: &str, value: &str) -> Self {
        Self {
            query: format!("HEADER {name} \"{value}\""),
        }
    }

    /// Matches messages with the given subject.
    #[must_use]
    pub fn subject(value: &str) -> Self {
        Self {
            query: format!("SUBJECT \"{value}\""),
        }
    }

    /// Returns the criteria string sent to the server.
    #[must_use]
    pub fn as_query(&self) -> &str {
        &self.query
    }
}

impl Default for SearchFilter {
    fn default() -> Self {
        Self::all()
    }
}

impl std::fmt::Display for SearchFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.query)
    }
}
