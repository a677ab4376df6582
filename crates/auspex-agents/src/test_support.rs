//! Deterministic agents for exercising the keeper and the decision loop
//! without a model.
//!
//! `ScriptedAgent` returns canned raw model text through the same
//! reasoning-split and extraction path as a real backend, so tests see the
//! same parse errors production would.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use auspex_models::decision::Decision;
use tokio_util::sync::CancellationToken;

use crate::agent::{interpret, Agent};
use crate::error::AgentError;
use crate::session::Session;
use crate::thinking::ThinkingMarkers;

/// Shared, ordered record of what scripted agents were asked to do.
pub type Journal = Arc<Mutex<Vec<String>>>;

pub fn journal() -> Journal {
    Arc::new(Mutex::new(Vec::new()))
}

enum Script {
    Respond(String),
    Fail(String),
}

pub struct ScriptedAgent {
    name: String,
    script: Script,
    markers: ThinkingMarkers,
    fail_start: bool,
    fail_stop: bool,
    journal: Option<Journal>,
    calls: AtomicUsize,
    last_messages: Mutex<Vec<String>>,
}

impl ScriptedAgent {
    fn with_script(name: &str, script: Script) -> Self {
        Self {
            name: name.to_string(),
            script,
            markers: ThinkingMarkers::default(),
            fail_start: false,
            fail_stop: false,
            journal: None,
            calls: AtomicUsize::new(0),
            last_messages: Mutex::new(Vec::new()),
        }
    }

    /// Answers every call with `raw` as if a model had produced it.
    pub fn responding(name: &str, raw: &str) -> Self {
        Self::with_script(name, Script::Respond(raw.to_string()))
    }

    /// Fails every call with a backend error carrying `message`.
    pub fn failing(name: &str, message: &str) -> Self {
        Self::with_script(name, Script::Fail(message.to_string()))
    }

    pub fn failing_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    pub fn failing_stop(mut self) -> Self {
        self.fail_stop = true;
        self
    }

    pub fn with_journal(mut self, journal: Journal) -> Self {
        self.journal = Some(journal);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Messages passed to the most recent `gen_actions` call.
    pub fn last_messages(&self) -> Vec<String> {
        self.last_messages
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    fn record(&self, entry: &str) {
        if let Some(journal) = &self.journal {
            if let Ok(mut entries) = journal.lock() {
                entries.push(format!("{}:{entry}", self.name));
            }
        }
    }
}

#[async_trait]
impl Agent for ScriptedAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn start(&self) -> Result<(), AgentError> {
        self.record("start");
        if self.fail_start {
            return Err(AgentError::Cli(format!("{} failed to start", self.name)));
        }
        Ok(())
    }

    async fn stop(&self) -> Result<(), AgentError> {
        self.record("stop");
        if self.fail_stop {
            return Err(AgentError::Cli(format!("{} failed to stop", self.name)));
        }
        Ok(())
    }

    async fn gen_actions(
        &self,
        cancel: &CancellationToken,
        _session: &dyn Session,
        messages: &[String],
    ) -> Result<Decision, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.record("gen_actions");
        if let Ok(mut last) = self.last_messages.lock() {
            *last = messages.to_vec();
        }

        if cancel.is_cancelled() {
            return Err(AgentError::Cancelled);
        }
        match &self.script {
            Script::Respond(raw) => interpret(&self.name, raw, &self.markers),
            Script::Fail(message) => Err(AgentError::Cli(message.clone())),
        }
    }
}

/// Raw model text carrying a single action, optionally with a reasoning block.
pub fn action_response(name: &str, args: &[(&str, &str)]) -> String {
    let args: serde_json::Map<String, serde_json::Value> = args
        .iter()
        .map(|(k, v)| (k.to_string(), serde_json::Value::String(v.to_string())))
        .collect();
    let body = serde_json::json!({
        "thoughts": {"speak": format!("executing {name}")},
        "action": {"name": name, "args": args},
    });
    format!("<think>deciding on {name}</think>\n{body}")
}
