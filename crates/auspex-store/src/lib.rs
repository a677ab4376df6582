pub mod error;
pub mod fs;
pub mod ledger;
pub mod memory;

pub use error::StoreError;
pub use ledger::{CommandLedger, DEFAULT_ARCHIVE_LIMIT};
pub use memory::{truncate_to_words, ConversationMemory, SavedMemory};
