pub mod agent;
pub mod claude_cli;
pub mod error;
pub mod keeper;
pub mod parser;
pub mod prompts;
pub mod session;
pub mod thinking;

pub mod test_support;

pub use agent::{interpret, Agent, ClaudeAgent};
pub use error::AgentError;
pub use keeper::AgentKeeper;
pub use parser::{extract_json, parse_decision};
pub use session::{ChatSession, Session};
pub use thinking::{split_thinking, ThinkingMarkers, ThinkingSplit};
