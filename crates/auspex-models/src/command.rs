use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decision::Action;

/// Default number of execution attempts before a command is given up on.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CommandStatus {
    Pending,
    Completed,
    Failed,
}

/// A command derived from a model decision, tracked until it completes or
/// runs out of retries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PendingCommand {
    pub id: String,
    /// The trader/account the command targets.
    pub entity_id: String,
    pub command_name: String,
    #[serde(default)]
    pub args: BTreeMap<String, String>,
    pub status: CommandStatus,
    #[serde(default)]
    pub retry_count: u32,
    pub max_retries: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PendingCommand {
    pub fn new(
        entity_id: impl Into<String>,
        command_name: impl Into<String>,
        args: BTreeMap<String, String>,
        max_retries: u32,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            entity_id: entity_id.into(),
            command_name: command_name.into(),
            args,
            status: CommandStatus::Pending,
            retry_count: 0,
            max_retries,
            created_at: now,
            updated_at: now,
            error: None,
        }
    }

    pub fn from_action(entity_id: impl Into<String>, action: &Action, max_retries: u32) -> Self {
        Self::new(entity_id, action.name.clone(), action.args.clone(), max_retries)
    }

    pub fn mark_completed(&mut self) {
        self.status = CommandStatus::Completed;
        self.error = None;
        self.updated_at = Utc::now();
    }

    /// Record a failed attempt. The command stays retryable until
    /// `retry_count` reaches `max_retries`.
    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.status = CommandStatus::Failed;
        self.retry_count = self.retry_count.saturating_add(1);
        self.error = Some(error.into());
        self.updated_at = Utc::now();
    }

    pub fn is_exhausted(&self) -> bool {
        self.retry_count >= self.max_retries
    }

    /// Pending, or failed with attempts left.
    pub fn is_retryable(&self) -> bool {
        match self.status {
            CommandStatus::Pending => true,
            CommandStatus::Failed => !self.is_exhausted(),
            CommandStatus::Completed => false,
        }
    }
}

/// On-disk command document. The three lists are kept disjoint by id.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CommandStore {
    #[serde(default)]
    pub pending: Vec<PendingCommand>,
    #[serde(default)]
    pub completed: Vec<PendingCommand>,
    #[serde(default)]
    pub failed: Vec<PendingCommand>,
}

impl CommandStore {
    pub fn len(&self) -> usize {
        self.pending.len() + self.completed.len() + self.failed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PendingCommand {
        let action = Action::new("close_position").with_arg("symbol", "BTCUSDT");
        PendingCommand::from_action("trader-1", &action, 2)
    }

    #[test]
    fn new_command_is_pending() {
        let cmd = sample();
        assert_eq!(cmd.status, CommandStatus::Pending);
        assert_eq!(cmd.retry_count, 0);
        assert_eq!(cmd.command_name, "close_position");
        assert_eq!(cmd.args["symbol"], "BTCUSDT");
        assert!(cmd.is_retryable());
        assert!(Uuid::parse_str(&cmd.id).is_ok());
    }

    #[test]
    fn failures_exhaust_retries() {
        let mut cmd = sample();
        cmd.mark_failed("exchange timeout");
        assert_eq!(cmd.retry_count, 1);
        assert!(cmd.is_retryable());

        cmd.mark_failed("exchange timeout");
        assert_eq!(cmd.retry_count, 2);
        assert!(cmd.is_exhausted());
        assert!(!cmd.is_retryable());
        assert_eq!(cmd.error.as_deref(), Some("exchange timeout"));
    }

    #[test]
    fn completion_clears_error() {
        let mut cmd = sample();
        cmd.mark_failed("rejected");
        cmd.mark_completed();
        assert_eq!(cmd.status, CommandStatus::Completed);
        assert!(cmd.error.is_none());
        assert!(!cmd.is_retryable());
    }

    #[test]
    fn store_document_shape() {
        let store = CommandStore {
            pending: vec![sample()],
            ..Default::default()
        };
        let value = serde_json::to_value(&store).unwrap();
        let entry = &value["pending"][0];
        assert_eq!(entry["status"], "pending");
        assert_eq!(entry["entity_id"], "trader-1");
        assert_eq!(entry["max_retries"], 2);
        assert!(entry.get("error").is_none());
        assert!(value["completed"].as_array().unwrap().is_empty());

        let decoded: CommandStore = serde_json::from_value(value).unwrap();
        assert_eq!(decoded, store);
    }

    #[test]
    fn missing_lists_default_empty() {
        let store: CommandStore = serde_json::from_str("{}").unwrap();
        assert!(store.is_empty());
    }
}
