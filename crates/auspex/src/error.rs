use auspex_agents::AgentError;
use auspex_store::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Agent(#[from] AgentError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Command ledger lock poisoned")]
    LedgerPoisoned,
}
