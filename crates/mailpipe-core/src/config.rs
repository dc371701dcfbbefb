//! Engine tuning knobs.

use std::time::Duration;

/// Page size used when a caller passes zero or a negative value.
pub const DEFAULT_PAGE_SIZE: i64 = 50;

/// Maximum time a server is required to keep an idling client (RFC 2177).
pub const IDLE_RENEWAL: Duration = Duration::from_secs(30 * 60);

/// Timeouts and buffer sizes shared by every session the engine opens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Limit on TCP connect plus TLS handshake.
    pub connect_timeout: Duration,
    /// Limit on a single command round-trip (login, select, list, fetch).
    pub command_timeout: Duration,
    /// How long one IDLE command stays outstanding before it is renewed.
    pub idle_renewal: Duration,
    /// NOOP interval for servers without IDLE.
    pub poll_interval: Duration,
    /// Buffered events per subscription before the listener waits on the consumer.
    pub channel_capacity: usize,
    /// Page size substituted for non-positive requests.
    pub default_page_size: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            command_timeout: Duration::from_secs(300),
            idle_renewal: IDLE_RENEWAL,
            poll_interval: Duration::from_secs(60),
            channel_capacity: 64,
            default_page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl EngineConfig {
    /// Overrides the IDLE renewal period. Only tests should need this.
    #[must_use]
    pub const fn with_idle_renewal(mut self, renewal: Duration) -> Self {
        self.idle_renewal = renewal;
        self
    }

    /// Overrides the command timeout.
    #[must_use]
    pub const fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }
}
