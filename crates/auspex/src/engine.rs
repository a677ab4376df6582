use std::sync::{Arc, Mutex};

use auspex_agents::{Agent, Session};
use auspex_models::command::PendingCommand;
use auspex_models::config::AuspexConfig;
use auspex_models::decision::Decision;
use auspex_models::event::{Event, EventPayload};
use auspex_store::{CommandLedger, ConversationMemory};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::EngineError;
use crate::with_ledger;

/// What one decision cycle produced.
#[derive(Debug, Clone, Serialize)]
pub struct CycleOutcome {
    pub session_id: String,
    pub decision: Decision,
    /// The command queued for the decision's action, if it had one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<PendingCommand>,
    pub memory_truncated: bool,
}

/// Runs decision cycles: events in, a decision and at most one queued
/// command out.
pub struct Engine {
    agent: Arc<dyn Agent>,
    ledger: Arc<Mutex<CommandLedger>>,
    memory: ConversationMemory,
    entity_id: String,
    max_retries: u32,
}

impl Engine {
    pub fn new(
        agent: Arc<dyn Agent>,
        ledger: Arc<Mutex<CommandLedger>>,
        memory: ConversationMemory,
        entity_id: impl Into<String>,
        max_retries: u32,
    ) -> Self {
        Self {
            agent,
            ledger,
            memory,
            entity_id: entity_id.into(),
            max_retries,
        }
    }

    /// Wire an engine to the ledger and memory paths named in `config`.
    pub fn from_config(
        config: &AuspexConfig,
        agent: Arc<dyn Agent>,
        ledger: Arc<Mutex<CommandLedger>>,
    ) -> Self {
        Self::new(
            agent,
            ledger,
            ConversationMemory::from_config(&config.memory),
            config.entity_id.clone(),
            config.ledger.max_retries,
        )
    }

    pub fn ledger(&self) -> &Arc<Mutex<CommandLedger>> {
        &self.ledger
    }

    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }

    /// Run one cycle for `events` in `session`.
    ///
    /// Stored memory is offered to the agent ahead of the new messages. An
    /// action is queued in the ledger before the exchange is recorded in
    /// the session and in memory, so a failed save leaves both untouched.
    pub async fn step(
        &self,
        cancel: &CancellationToken,
        session: &mut dyn Session,
        events: &[Event],
    ) -> Result<CycleOutcome, EngineError> {
        let context = self.memory.load_memory()?;
        let incoming: Vec<String> = events.iter().flat_map(|e| e.to_prompts()).collect();

        let mut messages = Vec::with_capacity(incoming.len() + 1);
        if !context.trim().is_empty() {
            messages.push(format!("[memory] {}", context.trim()));
        }
        messages.extend(incoming.iter().cloned());

        debug!(
            session = %session.id(),
            events = events.len(),
            messages = messages.len(),
            "Starting decision cycle"
        );
        let decision = self.agent.gen_actions(cancel, &*session, &messages).await?;

        let command = match &decision.action {
            Some(action) => {
                let command = PendingCommand::from_action(&self.entity_id, action, self.max_retries);
                with_ledger(&self.ledger, |ledger| {
                    ledger.save_commands(std::slice::from_ref(&command))
                })?;
                info!(
                    command_id = %command.id,
                    command = %command.command_name,
                    entity = %command.entity_id,
                    "Queued command"
                );
                Some(command)
            }
            None => None,
        };

        let turns = exchanged_turns(incoming, &decision, command.as_ref());
        for turn in &turns {
            session.add_chat(turn.clone());
        }
        let saved = self.memory.append_turns(&turns)?;

        info!(
            session = %session.id(),
            action = decision.action.as_ref().map(|a| a.name.as_str()).unwrap_or("none"),
            memory_truncated = saved.truncated,
            "Decision cycle complete"
        );

        Ok(CycleOutcome {
            session_id: session.id().to_string(),
            decision,
            command,
            memory_truncated: saved.truncated,
        })
    }
}

/// Lines recorded for a cycle: what came in, then what the agent said and did.
fn exchanged_turns(
    incoming: Vec<String>,
    decision: &Decision,
    command: Option<&PendingCommand>,
) -> Vec<String> {
    let mut turns = incoming;
    if let Some(spoken) = decision.spoken() {
        turns.push(format!("agent: {spoken}"));
    }
    if let Some(command) = command {
        let args = command
            .args
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(" ");
        turns.push(format!("agent -> {} {args}", command.command_name).trim_end().to_string());
    }
    if let Some(memory) = decision.memory.as_ref().filter(|m| !m.content.trim().is_empty()) {
        turns.push(format!("note: {}", memory.content.trim()));
    }
    turns
}

#[cfg(test)]
mod tests {
    use super::*;
    use auspex_models::decision::{Action, MemoryUpdate, Thoughts};

    #[test]
    fn turns_follow_incoming_messages() {
        let decision = Decision {
            thoughts: Some(Thoughts {
                speak: Some("Going long.".into()),
                ..Default::default()
            }),
            action: Some(Action::new("open_long").with_arg("symbol", "ETHUSDT")),
            memory: Some(MemoryUpdate {
                content: " funding flipped negative ".to_string(),
            }),
        };
        let command = PendingCommand::from_action("acct-1", decision.action.as_ref().unwrap(), 3);

        let turns = exchanged_turns(vec!["alice: go".to_string()], &decision, Some(&command));
        assert_eq!(
            turns,
            vec![
                "alice: go",
                "agent: Going long.",
                "agent -> open_long symbol=ETHUSDT",
                "note: funding flipped negative",
            ]
        );
    }

    #[test]
    fn quiet_decision_adds_nothing() {
        let turns = exchanged_turns(vec![], &Decision::default(), None);
        assert!(turns.is_empty());
    }
}
