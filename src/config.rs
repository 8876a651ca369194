//! Configuration for the mail-probe IMAP client.
//!
//! Use [`ImapConfigBuilder`] to create a configuration with sensible defaults:
//!
//! ```
//! use mail_probe::ImapConfig;
//!
//! let config = ImapConfig::builder()
//!     .email("user@example.com")
//!     .password("app-password")
//!     .build()
//!     .expect("valid config");
//! ```

use crate::error::{Error, Result};
use email_address::EmailAddress;
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;

/// Default label selected at connect time.
pub const DEFAULT_LABEL: &str = "INBOX";

/// Configuration for connecting to an IMAP server.
///
/// Create using [`ImapConfig::builder()`].
///
/// Note: The `password` field is stored as a [`SecretString`] to prevent
/// accidental logging of sensitive credentials. The `email` field is stored
/// as a validated [`EmailAddress`] type.
#[derive(Clone)]
pub struct ImapConfig {
    /// Email address used for login. Stored as a validated `EmailAddress` type.
    email: EmailAddress,
    /// Email password or app-specific password (protected from accidental logging).
    password: SecretString,
    /// IMAP server hostname.
    pub imap_host: String,
    /// IMAP server port (default: 993 for IMAPS).
    pub imap_port: u16,
    /// Label selected at connect time (default: "INBOX").
    pub label: String,
    /// Timeout configuration.
    pub timeouts: TimeoutConfig,
    /// Staleness-retry policy for id listing.
    pub staleness: StalenessConfig,
}

impl std::fmt::Debug for ImapConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImapConfig")
            .field("email", &self.email.as_str())
            .field("password", &"[REDACTED]")
            .field("imap_host", &self.imap_host)
            .field("imap_port", &self.imap_port)
            .field("label", &self.label)
            .field("timeouts", &self.timeouts)
            .field("staleness", &self.staleness)
            .finish()
    }
}

impl ImapConfig {
    /// Returns the email address as a string slice.
    #[must_use]
    pub fn email(&self) -> &str {
        self.email.as_str()
    }

    /// Returns a reference to the validated email address.
    #[must_use]
    pub fn email_address(&self) -> &EmailAddress {
        &self.email
    }

    /// Returns the password as a string slice.
    ///
    /// Use this method when you need to pass the password to authentication.
    /// The password is intentionally not directly accessible to prevent accidental logging.
    #[must_use]
    pub fn password(&self) -> &str {
        self.password.expose_secret()
    }

    /// Creates a new configuration builder.
    #[must_use]
    pub fn builder() -> ImapConfigBuilder {
        ImapConfigBuilder::default()
    }

    /// Returns the full IMAP server address as "host:port".
    #[must_use]
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.imap_host, self.imap_port)
    }
}

/// Timeout configuration for session setup and teardown.
#[derive(Debug, Clone)]
pub struct TimeoutConfig {
    /// Timeout for establishing TCP/TLS connection.
    pub connect: Duration,
    /// Timeout for IMAP authentication.
    pub auth: Duration,
    /// Timeout for selecting a label.
    pub select: Duration,
    /// Timeout for logout operation.
    pub logout: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(30),
            auth: Duration::from_secs(30),
            select: Duration::from_secs(10),
            logout: Duration::from_secs(5),
        }
    }
}

/// Bounded-retry policy for tolerating eventual-consistency lag between
/// message arrival and searchability.
///
/// When an id listing comes back empty, the client sleeps `interval` and
/// searches again, until `ceiling` of wall time has elapsed. Newly created
/// labels can take a few hundred milliseconds before sent mail becomes
/// visible; this keeps test latency predictable while tolerating that lag.
#[derive(Debug, Clone)]
pub struct StalenessConfig {
    /// Sleep between empty-listing retries.
    pub interval: Duration,
    /// Total wall time after which an empty listing becomes an error.
    pub ceiling: Duration,
}

impl Default for StalenessConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(100),
            ceiling: Duration::from_secs(10),
        }
    }
}

/// Validates an email address format.
///
/// Returns the validated `EmailAddress` if valid, or an error if invalid.
fn validate_email(email: &str) -> Result<EmailAddress> {
    EmailAddress::parse_with_options(email, email_address::Options::default()).map_err(|_| {
        Error::InvalidEmailFormat {
            email: email.to_string(),
        }
    })
}

/// Builder for [`ImapConfig`].
#[derive(Debug, Default)]
pub struct ImapConfigBuilder {
    email: Option<String>,
    password: Option<String>,
    imap_host: Option<String>,
    imap_port: Option<u16>,
    label: Option<String>,
    timeouts: Option<TimeoutConfig>,
    staleness: Option<StalenessConfig>,
}

impl ImapConfigBuilder {
    /// Sets the email address (required).
    #[must_use]
    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Sets the password (required).
    ///
    /// For Gmail/Outlook, use an app-specific password.
    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Sets the IMAP server hostname.
    ///
    /// Default is `imap.gmail.com`.
    #[must_use]
    pub fn imap_host(mut self, host: impl Into<String>) -> Self {
        self.imap_host = Some(host.into());
        self
    }

    /// Sets the IMAP server port.
    ///
    /// Default is 993 (IMAPS with TLS).
    #[must_use]
    pub fn imap_port(mut self, port: u16) -> Self {
        self.imap_port = Some(port);
        self
    }

    /// Sets the label selected at connect time.
    ///
    /// Default is "INBOX". Individual operations may still switch to another
    /// label per call.
    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Sets timeout configuration.
    #[must_use]
    pub fn timeouts(mut self, timeouts: TimeoutConfig) -> Self {
        self.timeouts = Some(timeouts);
        self
    }

    /// Sets the connection timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts
            .get_or_insert_with(TimeoutConfig::default)
            .connect = timeout;
        self
    }

    /// Sets the authentication timeout.
    #[must_use]
    pub fn auth_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts
            .get_or_insert_with(TimeoutConfig::default)
            .auth = timeout;
        self
    }

    /// Sets the staleness-retry policy for id listing.
    #[must_use]
    pub fn staleness(mut self, staleness: StalenessConfig) -> Self {
        self.staleness = Some(staleness);
        self
    }

    /// Sets the sleep between empty-listing retries.
    #[must_use]
    pub fn staleness_interval(mut self, interval: Duration) -> Self {
        self.staleness
            .get_or_insert_with(StalenessConfig::default)
            .interval = interval;
        self
    }

    /// Sets the wall-time ceiling for empty-listing retries.
    #[must_use]
    pub fn staleness_ceiling(mut self, ceiling: Duration) -> Self {
        self.staleness
            .get_or_insert_with(StalenessConfig::default)
            .ceiling = ceiling;
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if required fields are missing or invalid.
    pub fn build(self) -> Result<ImapConfig> {
        let email_raw = self.email.ok_or_else(|| Error::InvalidConfig {
            message: "email is required".into(),
        })?;

        // Validate email format using email_address crate
        let email = validate_email(&email_raw)?;

        let password_raw = self.password.ok_or_else(|| Error::InvalidConfig {
            message: "password is required".into(),
        })?;

        let label = self.label.unwrap_or_else(|| DEFAULT_LABEL.to_string());
        if label.is_empty() {
            return Err(Error::InvalidConfig {
                message: "label must not be empty".into(),
            });
        }

        Ok(ImapConfig {
            email,
            password: SecretString::from(password_raw),
            imap_host: self
                .imap_host
                .unwrap_or_else(|| "imap.gmail.com".to_string()),
            imap_port: self.imap_port.unwrap_or(993),
            label,
            timeouts: self.timeouts.unwrap_or_default(),
            staleness: self.staleness.unwrap_or_default(),
        })
    }
}
