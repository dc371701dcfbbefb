//! # mailpipe-core
//!
//! Mail retrieval engine on top of `mailpipe-imap`.
//!
//! This crate provides:
//! - Account model, validation and lookup
//! - A session pool with one authenticated connection per account
//! - Paginated, newest-first fetching with MIME body extraction
//! - Live updates through IDLE, delivered as a stream of events
//!
//! ```no_run
//! use mailpipe_core::{
//!     Account, AccountId, Engine, EngineConfig, ImapConnector, MemoryAccountStore,
//! };
//!
//! # async fn run() -> mailpipe_core::Result<()> {
//! let account = Account {
//!     id: AccountId::new(1),
//!     email: "me@example.com".into(),
//!     password: "app-password".into(),
//!     host: "imap.example.com".into(),
//!     port: None,
//!     secure: true,
//! };
//! let config = EngineConfig::default();
//! let engine = Engine::new(
//!     ImapConnector::new(config.clone()),
//!     MemoryAccountStore::new(vec![account])?,
//!     config,
//! );
//!
//! for email in engine.fetch("me@example.com", "INBOX", 20, 1).await? {
//!     println!("{} {}", email.id, email.subject);
//! }
//! engine.shutdown().await;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod account;
pub mod config;
pub mod email;
mod engine;
mod error;
pub mod mapper;
pub mod pagination;
pub mod pool;
pub mod service;
pub mod session;

#[cfg(test)]
mod testing;

pub use account::{Account, AccountId, AccountStore, MemoryAccountStore, ValidationError};
pub use config::{DEFAULT_PAGE_SIZE, EngineConfig, IDLE_RENEWAL};
pub use email::{Email, StreamEvent, StreamRequest};
pub use engine::{Engine, Subscription};
pub use error::{Error, Result};
pub use pagination::{SequenceRange, paginate};
pub use pool::ConnectionManager;
pub use session::{Connector, IdleOutcome, ImapConnector, ImapSession, MailSession, StopSignal};
