//! Plain and TLS transports.

#![allow(clippy::missing_errors_doc)]

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use rustls::pki_types::ServerName;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;
use tracing::debug;

use super::config::{Config, Security};
use crate::{Error, Result};

/// Either a plain TCP socket or a TLS session over one.
pub enum ImapStream {
    /// Unencrypted.
    Plain(TcpStream),
    /// TLS, boxed to keep the enum small.
    Tls(Box<TlsStream<TcpStream>>),
}

impl ImapStream {
    /// Returns true for TLS transports.
    #[must_use]
    pub const fn is_tls(&self) -> bool {
        matches!(self, Self::Tls(_))
    }
}

impl AsyncRead for ImapStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_read(cx, buf),
            Self::Tls(stream) => Pin::new(stream).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for ImapStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_write(cx, buf),
            Self::Tls(stream) => Pin::new(stream).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_flush(cx),
            Self::Tls(stream) => Pin::new(stream).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Plain(stream) => Pin::new(stream).poll_shutdown(cx),
            Self::Tls(stream) => Pin::new(stream).poll_shutdown(cx),
        }
    }
}

/// TLS connector trusting the Mozilla root set.
pub fn create_tls_connector() -> TlsConnector {
    let root_store = rustls::RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    };

    let config = rustls::ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    TlsConnector::from(Arc::new(config))
}

/// Dials `host:port` and performs the TLS handshake, verifying `server_name`.
pub async fn connect_tls(host: &str, port: u16, server_name: &str) -> Result<ImapStream> {
    let tcp = TcpStream::connect((host, port)).await?;
    let server_name = ServerName::try_from(server_name.to_string())?;
    let tls = create_tls_connector().connect(server_name, tcp).await?;
    Ok(ImapStream::Tls(Box::new(tls)))
}

/// Dials `host:port` without encryption.
pub async fn connect_plain(host: &str, port: u16) -> Result<ImapStream> {
    let tcp = TcpStream::connect((host, port)).await?;
    Ok(ImapStream::Plain(tcp))
}

/// Dials according to `config`, bounded by its connect timeout.
pub async fn connect(config: &Config) -> Result<ImapStream> {
    debug!(host = %config.host, port = config.port, security = ?config.security, "dialing");

    let dial = async {
        match config.security {
            Security::Implicit => {
                connect_tls(&config.host, config.port, config.server_name()).await
            }
            Security::None => connect_plain(&config.host, config.port).await,
        }
    };

    tokio::time::timeout(config.connect_timeout, dial)
        .await
        .map_err(|_| Error::Timeout(config.connect_timeout))?
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_create_tls_connector() {
        let _connector = create_tls_connector();
    }

    #[tokio::test]
    async fn test_connect_refused_is_io_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let config = Config::builder("127.0.0.1")
            .port(port)
            .security(Security::None)
            .connect_timeout(Duration::from_secs(5))
            .build();

        let err = connect(&config).await.err().unwrap();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_connect_plain_to_listener() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let config = Config::builder("127.0.0.1")
            .port(port)
            .security(Security::None)
            .build();

        let stream = connect(&config).await.unwrap();
        assert!(!stream.is_tls());
    }
}
