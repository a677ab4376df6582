pub mod command;
pub mod config;
pub mod decision;
pub mod event;

pub use command::{CommandStatus, CommandStore, PendingCommand, DEFAULT_MAX_RETRIES};
pub use config::{
    AgentsConfig, AuspexConfig, BackendConfig, LedgerConfig, MemoryConfig, ThinkingConfig,
};
pub use decision::{Action, Decision, MemoryUpdate, ThoughtValue, Thoughts};
pub use event::{ChatMessage, CommandOutcome, Event, EventPayload, MarketSnapshot, NewsItem};
