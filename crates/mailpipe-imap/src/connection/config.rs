//! Connection configuration.

use std::time::Duration;

/// Transport security.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Security {
    /// Plain TCP (port 143).
    None,
    /// TLS from the first byte (port 993).
    #[default]
    Implicit,
}

impl Security {
    /// Returns the conventional port for this mode.
    #[must_use]
    pub const fn default_port(self) -> u16 {
        match self {
            Self::None => 143,
            Self::Implicit => 993,
        }
    }

    /// Maps the account's `secure` switch to a mode.
    #[must_use]
    pub const fn from_secure(secure: bool) -> Self {
        if secure { Self::Implicit } else { Self::None }
    }
}

/// Where and how to connect.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server hostname.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Transport security.
    pub security: Security,
    /// Limit on TCP connect plus TLS handshake plus greeting.
    pub connect_timeout: Duration,
    /// Limit on waiting for any single server response.
    pub io_timeout: Duration,
    /// Name to verify the certificate against when it differs from `host`.
    pub tls_server_name: Option<String>,
}

impl Config {
    /// Implicit TLS on port 993 with default timeouts.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        ConfigBuilder::new(host).build()
    }

    /// Starts a builder.
    #[must_use]
    pub fn builder(host: impl Into<String>) -> ConfigBuilder {
        ConfigBuilder::new(host)
    }

    /// `host:port` for dialing.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Name presented for TLS verification.
    #[must_use]
    pub fn server_name(&self) -> &str {
        self.tls_server_name.as_deref().unwrap_or(&self.host)
    }
}

/// Builder for [`Config`].
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    host: String,
    port: Option<u16>,
    security: Security,
    connect_timeout: Duration,
    io_timeout: Duration,
    tls_server_name: Option<String>,
}

impl ConfigBuilder {
    /// Creates a builder for `host`.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: None,
            security: Security::Implicit,
            connect_timeout: Duration::from_secs(30),
            io_timeout: Duration::from_secs(300),
            tls_server_name: None,
        }
    }

    /// Sets the port. Defaults to [`Security::default_port`].
    #[must_use]
    pub const fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Sets the security mode.
    #[must_use]
    pub const fn security(mut self, security: Security) -> Self {
        self.security = security;
        self
    }

    /// Sets the connect timeout.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the per-response timeout.
    #[must_use]
    pub const fn io_timeout(mut self, timeout: Duration) -> Self {
        self.io_timeout = timeout;
        self
    }

    /// Overrides the certificate name.
    #[must_use]
    pub fn tls_server_name(mut self, name: impl Into<String>) -> Self {
        self.tls_server_name = Some(name.into());
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> Config {
        Config {
            host: self.host,
            port: self.port.unwrap_or_else(|| self.security.default_port()),
            security: self.security,
            connect_timeout: self.connect_timeout,
            io_timeout: self.io_timeout,
            tls_server_name: self.tls_server_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ports() {
        assert_eq!(Security::None.default_port(), 143);
        assert_eq!(Security::Implicit.default_port(), 993);
    }

    #[test]
    fn test_from_secure() {
        assert_eq!(Security::from_secure(true), Security::Implicit);
        assert_eq!(Security::from_secure(false), Security::None);
    }

    #[test]
    fn test_builder() {
        let config = Config::builder("imap.example.com")
            .security(Security::None)
            .connect_timeout(Duration::from_secs(10))
            .build();

        assert_eq!(config.port, 143);
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.io_timeout, Duration::from_secs(300));
        assert_eq!(config.address(), "imap.example.com:143");
    }

    #[test]
    fn test_explicit_port_wins() {
        let config = Config::builder("localhost").port(1143).build();
        assert_eq!(config.port, 1143);
        assert_eq!(config.security, Security::Implicit);
        assert_eq!(config.server_name(), "localhost");
    }

    #[test]
    fn test_tls_server_name_override() {
        let config = Config::builder("10.0.0.5")
            .tls_server_name("mail.example.com")
            .build();
        assert_eq!(config.server_name(), "mail.example.com");
    }
}
