//! IMAP-backed implementation of the [`Mailbox`] seam.
//!
//! This module wraps async-imap operations with proper error handling. The
//! raw session is never exposed; the client drives it through [`ImapStore`].

use crate::connection::TlsStream;
use crate::error::{Error, Result};
use crate::mailbox::{Mailbox, SearchFilter};
use async_imap::Session;
use futures::StreamExt;
use tracing::{debug, instrument};

/// Type alias for IMAP session over TLS.
pub(crate) type ImapSession = Session<TlsStream>;

/// Authentication configuration for IMAP.
pub(crate) struct AuthConfig<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Authenticates to the IMAP server and returns a session.
#[instrument(
    name = "session::authenticate",
    skip_all,
    fields(email = %config.email)
)]
pub(crate) async fn authenticate(
    tls_stream: TlsStream,
    config: &AuthConfig<'_>,
) -> Result<ImapSession> {
    let client = async_imap::Client::new(tls_stream);

    debug!("Authenticating to IMAP server");

    client
        .login(config.email, config.password)
        .await
        .map_err(|e| Error::ImapLogin {
            email: config.email.to_string(),
            source: e.0,
        })
}

/// A live, authenticated IMAP session implementing [`Mailbox`].
///
/// Produced by [`MailClient::connect`](crate::MailClient::connect); not
/// usually constructed directly.
pub struct ImapStore {
    session: ImapSession,
}

impl ImapStore {
    pub(crate) fn new(session: ImapSession) -> Self {
        Self { session }
    }
}

impl Mailbox for ImapStore {
    #[instrument(name = "store::select", skip(self), fields(label = %label))]
    async fn select(&mut self, label: &str) -> Result<()> {
        debug!("Selecting label");

        self.session
            .select(label)
            .await
            .map_err(|source| Error::SelectLabel {
                label: label.to_string(),
                source,
            })?;

        Ok(())
    }

    async fn keepalive(&mut self) -> Result<()> {
        self.session
            .noop()
            .await
            .map_err(|source| Error::ImapNoop { source })
    }

    #[instrument(name = "store::search", skip(self), fields(filter = %filter))]
    async fn search(&mut self, filter: &SearchFilter) -> Result<Vec<u32>> {
        let ids = self
            .session
            .uid_search(filter.as_query())
            .await
            .map_err(|source| Error::ImapSearch {
                filter: filter.to_string(),
                source,
            })?;

        // The server returns an unordered set; normalize to ascending arrival
        // order so positional indexing is stable (later id = newer).
        let mut ids: Vec<u32> = ids.into_iter().collect();
        ids.sort_unstable();

        debug!(id_count = ids.len(), "Search complete");

        Ok(ids)
    }

    #[instrument(name = "store::fetch", skip(self))]
    async fn fetch(&mut self, id: u32) -> Result<Vec<u8>> {
        let uid_set = id.to_string();

        let mut stream = self
            .session
            .uid_fetch(&uid_set, "BODY[]")
            .await
            .map_err(|source| Error::ImapFetch { id, source })?;

        // A single-uid fetch yields at most one message with a body; drain
        // the stream so the session is ready for the next command.
        let mut body: Option<Vec<u8>> = None;
        while let Some(item) = stream.next().await {
            let message = item.map_err(|source| Error::FetchMessage { source })?;
            if body.is_none() {
                body = message.body().map(<[u8]>::to_vec);
            }
        }

        body.ok_or(Error::MessageNotFound { id })
    }

    async fn close(&mut self) -> Result<()> {
        self.session
            .close()
            .await
            .map_err(|source| Error::ImapClose { source })
    }

    #[instrument(name = "store::logout", skip(self))]
    async fn logout(&mut self) -> Result<()> {
        debug!("Logging out");

        self.session
            .logout()
            .await
            .map_err(|source| Error::ImapLogout { source })
    }
}

impl std::fmt::Debug for ImapStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImapStore").finish_non_exhaustive()
    }
}
