//! Account credentials and lookup.

mod model;
mod store;
mod validation;

pub use model::{Account, AccountId};
pub use store::{AccountStore, MemoryAccountStore};
pub use validation::{ValidationError, validate_account};
