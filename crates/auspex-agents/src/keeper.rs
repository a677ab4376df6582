use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use auspex_models::decision::Decision;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::agent::Agent;
use crate::error::AgentError;
use crate::session::Session;

/// A static failover chain: one leader, then followers in declared order.
///
/// Every call starts again from the leader. Candidates run one at a time,
/// never speculatively in parallel, since each call may be billed.
pub struct AgentKeeper {
    leader: Arc<dyn Agent>,
    followers: Vec<Arc<dyn Agent>>,
}

impl AgentKeeper {
    pub fn new(leader: Arc<dyn Agent>, followers: Vec<Arc<dyn Agent>>) -> Self {
        Self { leader, followers }
    }

    /// Resolve the chain from a name→agent registry. Unknown names are a
    /// configuration error.
    pub fn from_registry(
        registry: &HashMap<String, Arc<dyn Agent>>,
        leader: &str,
        followers: &[String],
    ) -> Result<Self, AgentError> {
        let resolve = |name: &str| {
            registry
                .get(name)
                .cloned()
                .ok_or_else(|| AgentError::UnknownAgent(name.to_string()))
        };

        let leader = resolve(leader)?;
        let followers = followers
            .iter()
            .map(|name| resolve(name))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(leader, followers))
    }

    pub fn leader(&self) -> &Arc<dyn Agent> {
        &self.leader
    }

    pub fn followers(&self) -> &[Arc<dyn Agent>] {
        &self.followers
    }

    /// Agent names in failover order.
    pub fn chain(&self) -> Vec<&str> {
        std::iter::once(self.leader.name())
            .chain(self.followers.iter().map(|f| f.name()))
            .collect()
    }
}

fn follower_tier(index: usize) -> String {
    format!("follower[{index}]")
}

#[async_trait]
impl Agent for AgentKeeper {
    fn name(&self) -> &str {
        self.leader.name()
    }

    async fn start(&self) -> Result<(), AgentError> {
        self.leader
            .start()
            .await
            .map_err(|e| AgentError::Start {
                tier: "leader".to_string(),
                agent: self.leader.name().to_string(),
                source: Box::new(e),
            })?;

        for (i, follower) in self.followers.iter().enumerate() {
            follower.start().await.map_err(|e| AgentError::Start {
                tier: follower_tier(i),
                agent: follower.name().to_string(),
                source: Box::new(e),
            })?;
        }

        info!(chain = ?self.chain(), "Agent chain started");
        Ok(())
    }

    async fn stop(&self) -> Result<(), AgentError> {
        if let Err(e) = self.leader.stop().await {
            warn!(agent = %self.leader.name(), error = %e, "Leader failed to stop");
        }
        for (i, follower) in self.followers.iter().enumerate() {
            if let Err(e) = follower.stop().await {
                warn!(agent = %follower.name(), tier = %follower_tier(i), error = %e, "Follower failed to stop");
            }
        }
        info!("Agent chain stopped");
        Ok(())
    }

    /// Try the leader, then each follower in order; first success wins.
    ///
    /// When every tier fails the leader's error is returned.
    async fn gen_actions(
        &self,
        cancel: &CancellationToken,
        session: &dyn Session,
        messages: &[String],
    ) -> Result<Decision, AgentError> {
        let leader_error = match self.leader.gen_actions(cancel, session, messages).await {
            Ok(decision) => return Ok(decision),
            Err(e) => {
                warn!(agent = %self.leader.name(), session = %session.id(), error = %e, "Leader failed");
                e
            }
        };

        for (i, follower) in self.followers.iter().enumerate() {
            if cancel.is_cancelled() {
                warn!(session = %session.id(), "Cancelled, skipping remaining followers");
                break;
            }
            match follower.gen_actions(cancel, session, messages).await {
                Ok(decision) => {
                    info!(agent = %follower.name(), tier = %follower_tier(i), "Follower succeeded");
                    return Ok(decision);
                }
                Err(e) => {
                    warn!(agent = %follower.name(), tier = %follower_tier(i), error = %e, "Follower failed");
                }
            }
        }

        error!(agent = %self.leader.name(), error = %leader_error, "Every agent in the chain failed");
        Err(leader_error)
    }
}
