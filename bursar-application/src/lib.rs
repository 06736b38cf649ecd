#![warn(clippy::uninlined_format_args)]

mod groups;
mod model;
mod ports;
mod store;
mod treasury;

pub use groups::{GroupDirectory, GroupError};
pub use model::{HistoryEntry, HistoryKind, Message, Reply};
pub use ports::BlobStore;
pub use store::{BALANCE_KEY, EXPENSES_KEY, GROUPS_KEY, TreasuryStore};
pub use treasury::Treasury;
