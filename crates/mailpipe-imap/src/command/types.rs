//! FETCH data item requests.

/// One data item requested by FETCH.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchAttribute {
    /// `UID`
    Uid,
    /// `FLAGS`
    Flags,
    /// `ENVELOPE`
    Envelope,
    /// `INTERNALDATE`
    InternalDate,
    /// `BODY[section]` or `BODY.PEEK[section]`.
    ///
    /// An empty section addresses the whole message. Some providers reject the
    /// bare `BODY` shorthand, so the bracketed form is always written.
    Body {
        /// Section specifier, empty for the full message.
        section: String,
        /// Use `BODY.PEEK` so `\Seen` is not set.
        peek: bool,
    },
}

impl FetchAttribute {
    /// Items needed to build a complete message record: identity, flags,
    /// envelope and the full raw message.
    #[must_use]
    pub fn message() -> Vec<Self> {
        vec![
            Self::Uid,
            Self::Flags,
            Self::Envelope,
            Self::Body {
                section: String::new(),
                peek: true,
            },
        ]
    }
}
