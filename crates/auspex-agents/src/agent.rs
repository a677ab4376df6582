use std::time::Duration;

use async_trait::async_trait;
use auspex_models::decision::Decision;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::claude_cli::{check_cli_available, invoke_claude, ClaudeCliConfig};
use crate::error::AgentError;
use crate::parser::parse_decision;
use crate::prompts::{build_user_prompt, decision_system_prompt};
use crate::session::Session;
use crate::thinking::{split_thinking, ThinkingMarkers};

/// A model backend that turns a conversation into a Decision. Mockable for testing.
#[async_trait]
pub trait Agent: Send + Sync {
    fn name(&self) -> &str;

    async fn start(&self) -> Result<(), AgentError>;

    async fn stop(&self) -> Result<(), AgentError>;

    /// Produce a decision for `messages` in the context of `session`.
    ///
    /// Implementations must give up promptly once `cancel` fires.
    async fn gen_actions(
        &self,
        cancel: &CancellationToken,
        session: &dyn Session,
        messages: &[String],
    ) -> Result<Decision, AgentError>;
}

/// Turn raw model output into a Decision: drop the reasoning block, then
/// extract the structured result from what remains.
pub fn interpret(agent: &str, raw: &str, markers: &ThinkingMarkers) -> Result<Decision, AgentError> {
    let split = split_thinking(raw, markers);
    if let Some(reasoning) = &split.reasoning {
        debug!(agent, reasoning_len = reasoning.len(), "Stripped reasoning block");
    }
    parse_decision(&split.content)
}

/// An agent that drives a model through the Claude CLI.
pub struct ClaudeAgent {
    name: String,
    cli_config: ClaudeCliConfig,
    markers: ThinkingMarkers,
    system_prompt: String,
}

impl ClaudeAgent {
    pub fn new(name: String, model: String, timeout: Duration, markers: ThinkingMarkers) -> Self {
        Self {
            name,
            cli_config: ClaudeCliConfig {
                model,
                timeout,
                ..Default::default()
            },
            markers,
            system_prompt: decision_system_prompt(),
        }
    }

    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.cli_config.binary = binary.into();
        self
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }

    pub fn cli_config(&self) -> &ClaudeCliConfig {
        &self.cli_config
    }
}

#[async_trait]
impl Agent for ClaudeAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn start(&self) -> Result<(), AgentError> {
        if !check_cli_available(&self.cli_config.binary).await {
            return Err(AgentError::Cli(format!(
                "{} is not available on PATH",
                self.cli_config.binary
            )));
        }
        info!(agent = %self.name, model = %self.cli_config.model, "Agent started");
        Ok(())
    }

    async fn stop(&self) -> Result<(), AgentError> {
        info!(agent = %self.name, "Agent stopped");
        Ok(())
    }

    async fn gen_actions(
        &self,
        cancel: &CancellationToken,
        session: &dyn Session,
        messages: &[String],
    ) -> Result<Decision, AgentError> {
        let user_prompt = build_user_prompt(session, messages);
        let raw = invoke_claude(&self.system_prompt, &user_prompt, &self.cli_config, cancel).await?;
        interpret(&self.name, &raw, &self.markers)
    }
}
