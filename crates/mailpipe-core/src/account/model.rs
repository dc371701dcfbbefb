//! Account model types.

use std::fmt;

use mailpipe_imap::{Config, Security};
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;

/// Unique identifier for an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub u64);

impl AccountId {
    /// Create a new account ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Credentials and server location for one mailbox owner.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Stable identifier; the session pool is keyed by it.
    pub id: AccountId,
    /// Email address, also used as the login name.
    pub email: String,
    /// Login secret.
    pub password: String,
    /// IMAP server hostname.
    pub host: String,
    /// IMAP port. Defaults to 993 with TLS and 143 without.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    /// Connect with implicit TLS.
    #[serde(default = "default_secure")]
    pub secure: bool,
}

const fn default_secure() -> bool {
    true
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("secure", &self.secure)
            .finish_non_exhaustive()
    }
}

impl Account {
    /// Protocol settings for dialing this account's server.
    #[must_use]
    pub fn imap_config(&self, engine: &EngineConfig) -> Config {
        let mut builder = Config::builder(&self.host)
            .security(Security::from_secure(self.secure))
            .connect_timeout(engine.connect_timeout)
            .io_timeout(engine.command_timeout);
        if let Some(port) = self.port {
            builder = builder.port(port);
        }
        builder.build()
    }
}
