//! Auspex: an event-driven decision loop around LLM trading agents.
//!
//! Events (market snapshots, news, operator chat, command results) go to a
//! failover chain of model backends. The first usable Decision wins. Its
//! action is queued in a persistent command ledger and dispatched with
//! bounded retries.
//!
//! # Library Usage
//!
//! ```rust,no_run
//! use auspex::agents::{AgentKeeper, ChatSession, ClaudeAgent};
//! use auspex::models::config::AuspexConfig;
//! use auspex::store::{CommandLedger, ConversationMemory};
//! use auspex::{Dispatcher, Engine};
//! ```

pub use auspex_agents as agents;
pub use auspex_models as models;
pub use auspex_store as store;

pub mod dispatch;
pub mod engine;
pub mod error;

pub use dispatch::{CommandExecutor, DispatchReport, Dispatcher};
pub use engine::{CycleOutcome, Engine};
pub use error::EngineError;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use auspex_agents::{Agent, AgentError, AgentKeeper, ClaudeAgent, ThinkingMarkers};
use auspex_models::config::AuspexConfig;
use auspex_store::{CommandLedger, StoreError};

/// Build the failover chain from configuration.
///
/// Every enabled backend becomes a `ClaudeAgent`. Disabled backends are left
/// out of the registry, so naming one as leader or follower is an error.
pub fn build_keeper(config: &AuspexConfig) -> Result<AgentKeeper, AgentError> {
    let markers = ThinkingMarkers::from(&config.thinking);

    let registry: HashMap<String, Arc<dyn Agent>> = config
        .agents
        .backends
        .iter()
        .filter(|b| b.enabled)
        .map(|b| {
            let model = b
                .model
                .clone()
                .unwrap_or_else(|| config.agents.default_model.clone());
            let timeout = Duration::from_secs(
                b.timeout_seconds
                    .unwrap_or(config.agents.timeout_seconds),
            );
            let agent = ClaudeAgent::new(b.name.clone(), model, timeout, markers.clone());
            (b.name.clone(), Arc::new(agent) as Arc<dyn Agent>)
        })
        .collect();

    AgentKeeper::from_registry(&registry, &config.agents.leader, &config.agents.followers)
}

/// The single shared ledger handle for an engine and a dispatcher.
pub fn shared_ledger(config: &AuspexConfig) -> Arc<Mutex<CommandLedger>> {
    Arc::new(Mutex::new(CommandLedger::from_config(&config.ledger)))
}

/// Run `f` with the ledger locked. The lock is released before returning,
/// so callers never hold it across an await.
pub(crate) fn with_ledger<T>(
    ledger: &Mutex<CommandLedger>,
    f: impl FnOnce(&CommandLedger) -> Result<T, StoreError>,
) -> Result<T, EngineError> {
    let guard = ledger.lock().map_err(|_| EngineError::LedgerPoisoned)?;
    Ok(f(&guard)?)
}
