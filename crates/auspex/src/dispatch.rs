use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use auspex_models::command::{CommandStatus, PendingCommand};
use auspex_models::event::{CommandOutcome, Event};
use auspex_store::CommandLedger;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::EngineError;
use crate::with_ledger;

/// Carries out queued commands against whatever sits downstream
/// (an exchange, a broker, a paper-trading book). Mockable for testing.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn execute(&self, command: &PendingCommand) -> anyhow::Result<()>;
}

/// Tally of one dispatch pass.
#[derive(Debug, Clone, Default)]
pub struct DispatchReport {
    pub completed: usize,
    /// Failed but still retryable.
    pub retrying: usize,
    /// Failed with no attempts left.
    pub failed: usize,
    /// Entries dropped from the completed/failed history.
    pub archived: usize,
    /// One entry per attempted command, ready to feed back into a cycle.
    pub outcomes: Vec<CommandOutcome>,
}

impl DispatchReport {
    pub fn attempted(&self) -> usize {
        self.completed + self.retrying + self.failed
    }

    pub fn events(&self) -> Vec<Event> {
        self.outcomes
            .iter()
            .cloned()
            .map(Event::CommandResult)
            .collect()
    }
}

/// Drains the ledger's retryable commands through a `CommandExecutor`.
pub struct Dispatcher {
    ledger: Arc<Mutex<CommandLedger>>,
    executor: Arc<dyn CommandExecutor>,
}

impl Dispatcher {
    pub fn new(ledger: Arc<Mutex<CommandLedger>>, executor: Arc<dyn CommandExecutor>) -> Self {
        Self { ledger, executor }
    }

    /// Attempt every retryable command once, persist the results, then
    /// trim history.
    ///
    /// Commands are executed one at a time in ledger order. Cancellation
    /// stops before the next command; results gathered so far are still
    /// saved.
    pub async fn dispatch_once(
        &self,
        cancel: &CancellationToken,
    ) -> Result<DispatchReport, EngineError> {
        let commands = with_ledger(&self.ledger, |ledger| ledger.load_pending_commands())?;
        let mut report = DispatchReport::default();
        let mut batch = Vec::with_capacity(commands.len());

        for mut command in commands {
            if cancel.is_cancelled() {
                warn!("Dispatch cancelled, leaving remaining commands queued");
                break;
            }

            match self.executor.execute(&command).await {
                Ok(()) => {
                    command.mark_completed();
                    report.completed += 1;
                    info!(command_id = %command.id, command = %command.command_name, "Command completed");
                }
                Err(e) => {
                    command.mark_failed(e.to_string());
                    if command.is_exhausted() {
                        report.failed += 1;
                        error!(
                            command_id = %command.id,
                            command = %command.command_name,
                            attempts = command.retry_count,
                            error = %e,
                            "Command out of retries"
                        );
                    } else {
                        report.retrying += 1;
                        warn!(
                            command_id = %command.id,
                            command = %command.command_name,
                            attempt = command.retry_count,
                            max_retries = command.max_retries,
                            error = %e,
                            "Command failed, will retry"
                        );
                    }
                }
            }

            report.outcomes.push(outcome(&command));
            batch.push(command);
        }

        with_ledger(&self.ledger, |ledger| ledger.save_commands(&batch))?;
        report.archived = with_ledger(&self.ledger, |ledger| ledger.archive_completed_commands())?;
        Ok(report)
    }

    /// Dispatch every `interval` until `cancel` fires. Pass failures are
    /// logged and the loop carries on.
    pub async fn run(&self, interval: Duration, cancel: &CancellationToken) {
        info!(interval_ms = interval.as_millis() as u64, "Dispatcher starting");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Dispatcher shutting down");
                    break;
                }
                _ = tokio::time::sleep(interval) => {
                    match self.dispatch_once(cancel).await {
                        Ok(report) if report.attempted() > 0 => {
                            info!(
                                completed = report.completed,
                                retrying = report.retrying,
                                failed = report.failed,
                                archived = report.archived,
                                "Dispatch pass finished"
                            );
                        }
                        Ok(_) => {}
                        Err(e) => {
                            error!(error = %e, "Dispatch pass failed");
                        }
                    }
                }
            }
        }
    }
}

fn outcome(command: &PendingCommand) -> CommandOutcome {
    // A failed command with attempts left goes back to the pending list.
    let status = match command.status {
        CommandStatus::Failed if !command.is_exhausted() => CommandStatus::Pending,
        status => status,
    };
    CommandOutcome {
        id: Uuid::new_v4().to_string(),
        command_id: command.id.clone(),
        command_name: command.command_name.clone(),
        status,
        error: command.error.clone(),
    }
}
