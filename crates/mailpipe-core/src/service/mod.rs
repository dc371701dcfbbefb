//! Operations run on a single session: paging, listing and listening.

mod fetch;
mod listener;

pub use fetch::{fetch_page, fetch_range, list_mailboxes};
pub use listener::{Listener, ListenerExit};
