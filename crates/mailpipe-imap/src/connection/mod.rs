//! Connections: configuration, transport, framing, the type-state client
//! and IDLE.

mod client;
mod config;
mod framed;
mod idle;
mod stream;

pub use client::{
    Authenticated, Client, DEFAULT_IO_TIMEOUT, NotAuthenticated, SelectError, Selected,
};
pub use config::{Config, ConfigBuilder, Security};
pub use framed::FramedStream;
pub use idle::{IdleEvent, IdleHandle};
pub use stream::{ImapStream, connect, connect_plain, connect_tls, create_tls_connector};
