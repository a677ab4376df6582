use std::path::{Path, PathBuf};

use auspex_models::command::{CommandStatus, CommandStore, PendingCommand};
use auspex_models::config::LedgerConfig;
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::fs::{read_optional, write_atomic};

pub const DEFAULT_ARCHIVE_LIMIT: usize = 50;

/// Durable command ledger backed by a single JSON document.
///
/// Every mutating call reads the whole document, applies the change and
/// atomically rewrites it. There is no internal locking: callers sharing a
/// ledger across tasks must serialize access (e.g. `Arc<Mutex<CommandLedger>>`).
#[derive(Debug, Clone)]
pub struct CommandLedger {
    path: PathBuf,
    archive_limit: usize,
}

impl CommandLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            archive_limit: DEFAULT_ARCHIVE_LIMIT,
        }
    }

    pub fn from_config(config: &LedgerConfig) -> Self {
        Self::new(&config.path).with_archive_limit(config.archive_limit)
    }

    pub fn with_archive_limit(mut self, limit: usize) -> Self {
        self.archive_limit = limit;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the whole document. A missing file is an empty store.
    pub fn load_store(&self) -> Result<CommandStore, StoreError> {
        match read_optional(&self.path)? {
            Some(contents) if !contents.trim().is_empty() => {
                serde_json::from_str(&contents).map_err(|e| StoreError::json(&self.path, e))
            }
            _ => Ok(CommandStore::default()),
        }
    }

    fn write_store(&self, store: &CommandStore) -> Result<(), StoreError> {
        let bytes =
            serde_json::to_vec_pretty(store).map_err(|e| StoreError::json(&self.path, e))?;
        write_atomic(&self.path, &bytes)
    }

    /// Commands that still need executing: everything pending plus failed
    /// commands with attempts left. Exhausted commands are never returned.
    pub fn load_pending_commands(&self) -> Result<Vec<PendingCommand>, StoreError> {
        let store = self.load_store()?;
        let commands: Vec<PendingCommand> = store
            .pending
            .into_iter()
            .chain(store.failed)
            .filter(PendingCommand::is_retryable)
            .collect();
        debug!(count = commands.len(), path = %self.path.display(), "Loaded pending commands");
        Ok(commands)
    }

    /// Apply each command's current status to the document.
    ///
    /// Commands are processed in batch order, so a later entry with the same
    /// id overrides an earlier one.
    pub fn save_commands(&self, batch: &[PendingCommand]) -> Result<(), StoreError> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut store = self.load_store()?;
        for command in batch {
            apply(&mut store, command.clone());
        }
        self.write_store(&store)?;

        debug!(
            saved = batch.len(),
            pending = store.pending.len(),
            completed = store.completed.len(),
            failed = store.failed.len(),
            "Saved commands"
        );
        Ok(())
    }

    /// Trim the completed and failed lists to the most recent entries.
    /// Returns how many entries were dropped. Pending is never trimmed.
    pub fn archive_completed_commands(&self) -> Result<usize, StoreError> {
        let mut store = self.load_store()?;
        let dropped = keep_most_recent(&mut store.completed, self.archive_limit)
            + keep_most_recent(&mut store.failed, self.archive_limit);

        if dropped > 0 {
            self.write_store(&store)?;
            info!(dropped, limit = self.archive_limit, "Archived command history");
        }
        Ok(dropped)
    }
}

fn apply(store: &mut CommandStore, command: PendingCommand) {
    let id = command.id.clone();
    match command.status {
        CommandStatus::Pending => {
            remove(&mut store.completed, &id);
            remove(&mut store.failed, &id);
            upsert(&mut store.pending, command);
        }
        CommandStatus::Completed => {
            remove(&mut store.pending, &id);
            remove(&mut store.failed, &id);
            upsert(&mut store.completed, command);
        }
        CommandStatus::Failed if command.is_exhausted() => {
            warn!(
                id = %id,
                command = %command.command_name,
                retries = command.retry_count,
                error = command.error.as_deref().unwrap_or(""),
                "Command exhausted its retries"
            );
            remove(&mut store.pending, &id);
            remove(&mut store.completed, &id);
            upsert(&mut store.failed, command);
        }
        CommandStatus::Failed => {
            remove(&mut store.completed, &id);
            remove(&mut store.failed, &id);
            upsert(&mut store.pending, command);
        }
    }
}

fn upsert(list: &mut Vec<PendingCommand>, command: PendingCommand) {
    match list.iter_mut().find(|c| c.id == command.id) {
        Some(slot) => *slot = command,
        None => list.push(command),
    }
}

fn remove(list: &mut Vec<PendingCommand>, id: &str) {
    list.retain(|c| c.id != id);
}

fn keep_most_recent(list: &mut Vec<PendingCommand>, limit: usize) -> usize {
    let excess = list.len().saturating_sub(limit);
    list.drain(..excess);
    excess
}
