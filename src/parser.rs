//! Decoded view of a fetched message.
//!
//! Extraction is a pure function of the raw message bytes: the delivery
//! target and first text body are pulled out once at parse time, and a
//! [`ParsedEmail`] is never mutated afterwards.

use crate::error::{Error, Result};
use mailparse::{MailHeaderMap, ParsedMail};

/// An immutable decoded view of one fetched message.
///
/// Exposes the two pieces of the message the client cares about: the
/// `Delivered-To` header (the matching key for expectation search) and the
/// first text body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedEmail {
    delivered_to: Option<String>,
    text_body: Option<String>,
}

impl ParsedEmail {
    /// Parses raw RFC 822 message bytes (headers + body) as returned by fetch.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ParseEmail`] if the bytes are not a well-formed
    /// message. A well-formed message with no text part is *not* an error;
    /// [`text_body`](Self::text_body) is simply `None`.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        let mail = mailparse::parse_mail(raw).map_err(|source| Error::ParseEmail { source })?;

        Ok(Self {
            delivered_to: mail.headers.get_first_value("Delivered-To"),
            text_body: first_text_block(&mail),
        })
    }

    /// The address the message was delivered for, from the `Delivered-To`
    /// header. `None` if the header is absent.
    #[must_use]
    pub fn delivered_to(&self) -> Option<&str> {
        self.delivered_to.as_deref()
    }

    /// The first text body of the message. `None` for messages with no text
    /// part (for example an all-attachment multipart).
    #[must_use]
    pub fn text_body(&self) -> Option<&str> {
        self.text_body.as_deref()
    }
}

/// Extracts the first text block from a parsed message.
///
/// Multipart: scan immediate parts in original order and return the decoded
/// payload of the first part whose content kind is text. Flat text message:
/// return its decoded payload. Any other top-level kind has no text block.
fn first_text_block(mail: &ParsedMail<'_>) -> Option<String> {
    let mimetype = mail.ctype.mimetype.to_lowercase();

    if mimetype.starts_with("multipart/") {
        mail.subparts
            .iter()
            .find(|part| part.ctype.mimetype.to_lowercase().starts_with("text/"))
            .and_then(|part| part.get_body().ok())
    } else if mimetype.starts_with("text/") {
        mail.get_body().ok()
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FLAT_TEXT: &[u8] = b"Delivered-To: www+ABC123@example.com\r\n\
From: sender@example.com\r\n\
Subject: Test pymail\r\n\
Content-Type: text/plain\r\n\
\r\n\
Welcome! Your activation code is 998877.\r\n";

    fn multipart_with_leading_image() -> &'static [u8] {
        b"Delivered-To: www+ABC123@example.com\r\n\
From: sender@example.com\r\n\
MIME-Version: 1.0\r\n\
Content-Type: multipart/mixed; boundary=\"sep\"\r\n\
\r\n\
--sep\r\n\
Content-Type: image/png\r\n\
Content-Transfer-Encoding: base64\r\n\
\r\n\
iVBORw0KGgo=\r\n\
--sep\r\n\
Content-Type: text/plain\r\n\
\r\n\
first text part\r\n\
--sep\r\n\
Content-Type: text/plain\r\n\
\r\n\
second text part\r\n\
--sep--\r\n"
    }

    #[test]
    fn test_flat_text_returns_payload() {
        let email = ParsedEmail::parse(FLAT_TEXT).unwrap();
        assert_eq!(
            email.text_body().map(str::trim),
            Some("Welcome! Your activation code is 998877.")
        );
    }

    #[test]
    fn test_multipart_returns_first_text_part() {
        let email = ParsedEmail::parse(multipart_with_leading_image()).unwrap();
        // The image part is skipped; the first of the two text parts wins.
        assert_eq!(email.text_body().map(str::trim), Some("first text part"));
    }

    #[test]
    fn test_multipart_without_text_part_is_absent() {
        let raw = b"From: sender@example.com\r\n\
MIME-Version: 1.0\r\n\
Content-Type: multipart/mixed; boundary=\"sep\"\r\n\
\r\n\
--sep\r\n\
Content-Type: application/pdf\r\n\
Content-Transfer-Encoding: base64\r\n\
\r\n\
JVBERi0=\r\n\
--sep--\r\n";
        let email = ParsedEmail::parse(raw).unwrap();
        // All-attachment multipart legitimately has no text block.
        assert_eq!(email.text_body(), None);
    }

    #[test]
    fn test_non_text_top_level_is_absent() {
        let raw = b"From: sender@example.com\r\n\
Content-Type: image/png\r\n\
Content-Transfer-Encoding: base64\r\n\
\r\n\
iVBORw0KGgo=\r\n";
        let email = ParsedEmail::parse(raw).unwrap();
        assert_eq!(email.text_body(), None);
    }

    #[test]
    fn test_delivered_to_literal_header_value() {
        let email = ParsedEmail::parse(FLAT_TEXT).unwrap();
        assert_eq!(email.delivered_to(), Some("www+ABC123@example.com"));
    }

    #[test]
    fn test_delivered_to_absent_header() {
        let raw = b"From: sender@example.com\r\n\r\nbody\r\n";
        let email = ParsedEmail::parse(raw).unwrap();
        assert_eq!(email.delivered_to(), None);
    }

    #[test]
    fn test_absent_message_yields_absent_address() {
        // A missing message is a checked precondition, not a fault.
        let missing: Option<ParsedEmail> = None;
        assert_eq!(missing.and_then(|m| m.delivered_to().map(String::from)), None);
    }

    #[test]
    fn test_quoted_printable_body_is_decoded() {
        let raw = b"From: sender@example.com\r\n\
Content-Type: text/plain; charset=utf-8\r\n\
Content-Transfer-Encoding: quoted-printable\r\n\
\r\n\
caf=C3=A9\r\n";
        let email = ParsedEmail::parse(raw).unwrap();
        assert_eq!(email.text_body().map(str::trim), Some("caf\u{e9}"));
    }
}
