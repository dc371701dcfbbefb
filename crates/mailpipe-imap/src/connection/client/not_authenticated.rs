//! Greeting and LOGIN.

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

use super::states::{Authenticated, NotAuthenticated};
use super::{Client, DEFAULT_IO_TIMEOUT, code_capabilities};
use crate::command::{Command, TagGenerator};
use crate::connection::config::Config;
use crate::connection::framed::FramedStream;
use crate::connection::stream::{ImapStream, connect};
use crate::parser::{Response, ResponseParser, UntaggedResponse};
use crate::{Error, Result};

impl Client<ImapStream, NotAuthenticated> {
    /// Dials the server and reads its greeting within the connect timeout.
    pub async fn connect(config: &Config) -> Result<Self> {
        let stream = connect(config).await?;
        let client = tokio::time::timeout(config.connect_timeout, Self::from_stream(stream))
            .await
            .map_err(|_| Error::Timeout(config.connect_timeout))??;
        Ok(client.with_io_timeout(config.io_timeout))
    }
}

impl<S> Client<S, NotAuthenticated>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps a connected transport and reads the greeting.
    pub async fn from_stream(stream: S) -> Result<Self> {
        let mut framed = FramedStream::new(stream);

        let greeting = framed.read_response().await?;
        let capabilities = match ResponseParser::parse(&greeting)? {
            Response::Untagged(UntaggedResponse::Ok { code, .. }) => {
                code_capabilities(code).unwrap_or_default()
            }
            Response::Untagged(UntaggedResponse::Bye { text, .. }) => return Err(Error::Bye(text)),
            Response::Untagged(UntaggedResponse::PreAuth { .. }) => {
                return Err(Error::InvalidState(
                    "server pre-authenticated the connection".to_string(),
                ));
            }
            other => {
                return Err(Error::Protocol(format!("unexpected greeting: {other:?}")));
            }
        };
        debug!(capabilities = capabilities.len(), "greeting received");

        Ok(Self {
            stream: framed,
            tag_gen: TagGenerator::default(),
            capabilities,
            io_timeout: DEFAULT_IO_TIMEOUT,
            state: NotAuthenticated,
        })
    }

    /// Logs in with LOGIN.
    ///
    /// A `NO` completion becomes [`Error::Auth`].
    pub async fn login(mut self, username: &str, password: &str) -> Result<Client<S, Authenticated>> {
        let command = Command::Login {
            username: username.to_string(),
            password: password.to_string(),
        };
        let tag = self.send(&command).await?;
        let responses = self.read_until_tagged(&tag).await?;

        for bytes in &responses {
            match ResponseParser::parse(bytes) {
                Ok(Response::Untagged(UntaggedResponse::Capability(caps))) => {
                    self.capabilities = caps;
                }
                Ok(Response::Tagged { code, .. }) => {
                    if let Some(caps) = code_capabilities(code) {
                        self.capabilities = caps;
                    }
                }
                _ => {}
            }
        }

        match Self::check_tagged_ok(&responses, &tag) {
            Ok(()) => {}
            Err(Error::No(text)) => return Err(Error::Auth(text)),
            Err(e) => return Err(e),
        }

        let mut client = self.into_state(Authenticated);
        // Capabilities advertised before LOGIN may be incomplete.
        if !client.supports_idle() {
            client.capability().await?;
        }
        Ok(client)
    }
}
