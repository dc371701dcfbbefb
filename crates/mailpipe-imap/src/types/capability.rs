//! Server capabilities and completion status.

/// Status word of a tagged or untagged condition response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Success.
    Ok,
    /// Operational failure.
    No,
    /// Protocol or syntax failure.
    Bad,
    /// Greeting for an already authenticated connection.
    PreAuth,
    /// Server is closing the connection.
    Bye,
}

/// A capability advertised by the server.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Capability {
    /// `IMAP4rev1`
    Imap4Rev1,
    /// `IMAP4rev2`
    Imap4Rev2,
    /// `IDLE` (RFC 2177)
    Idle,
    /// `LOGINDISABLED`
    LoginDisabled,
    /// `AUTH=<mechanism>`
    Auth(String),
    /// Anything this client does not act on.
    Other(String),
}

impl Capability {
    /// Parses a capability atom, case-insensitively.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        let upper = s.to_ascii_uppercase();
        match upper.as_str() {
            "IMAP4REV1" => Self::Imap4Rev1,
            "IMAP4REV2" => Self::Imap4Rev2,
            "IDLE" => Self::Idle,
            "LOGINDISABLED" => Self::LoginDisabled,
            _ => upper
                .strip_prefix("AUTH=")
                .map_or_else(|| Self::Other(s.to_string()), |m| Self::Auth(m.to_string())),
        }
    }
}
