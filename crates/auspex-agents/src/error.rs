use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Claude CLI error: {0}")]
    Cli(String),

    #[error("Agent timed out after {0} seconds")]
    Timeout(u64),

    #[error("Agent call cancelled")]
    Cancelled,

    #[error("No JSON object found in response (length={0})")]
    NoObject(usize),

    #[error("JSON object found but invalid: {0}")]
    InvalidObject(String),

    #[error("Unknown agent: {0}")]
    UnknownAgent(String),

    #[error("Failed to start {tier} agent {agent}: {source}")]
    Start {
        tier: String,
        agent: String,
        #[source]
        source: Box<AgentError>,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AgentError {
    /// The model answered but the answer could not be interpreted.
    pub fn is_malformed_output(&self) -> bool {
        matches!(self, AgentError::NoObject(_) | AgentError::InvalidObject(_))
    }
}
