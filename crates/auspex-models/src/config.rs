use serde::{Deserialize, Serialize};

use crate::command::DEFAULT_MAX_RETRIES;

/// Top-level configuration for auspex.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuspexConfig {
    /// The trader/account every generated command targets.
    #[serde(default = "default_entity_id")]
    pub entity_id: String,
    #[serde(default)]
    pub agents: AgentsConfig,
    #[serde(default)]
    pub thinking: ThinkingConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
}

impl Default for AuspexConfig {
    fn default() -> Self {
        Self {
            entity_id: default_entity_id(),
            agents: AgentsConfig::default(),
            thinking: ThinkingConfig::default(),
            ledger: LedgerConfig::default(),
            memory: MemoryConfig::default(),
        }
    }
}

/// Configuration for the failover chain of model backends.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentsConfig {
    /// Name of the backend tried first on every call.
    pub leader: String,
    /// Backends tried in this order when the leader fails.
    #[serde(default)]
    pub followers: Vec<String>,
    /// Default model for backends that don't override it.
    pub default_model: String,
    /// Per-call timeout in seconds for backends that don't override it.
    pub timeout_seconds: u64,
    /// Every backend that may be referenced by `leader` or `followers`.
    pub backends: Vec<BackendConfig>,
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            leader: "primary".to_string(),
            followers: vec!["fallback".to_string()],
            default_model: "claude-sonnet-4-5-20250929".to_string(),
            timeout_seconds: 90,
            backends: vec![
                BackendConfig {
                    name: "primary".to_string(),
                    model: None,
                    timeout_seconds: None,
                    enabled: true,
                },
                BackendConfig {
                    name: "fallback".to_string(),
                    model: Some("claude-3-5-haiku-latest".to_string()),
                    timeout_seconds: Some(45),
                    enabled: true,
                },
            ],
        }
    }
}

/// A single model backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BackendConfig {
    pub name: String,
    /// Override model for this backend. Falls back to `AgentsConfig::default_model`.
    #[serde(default)]
    pub model: Option<String>,
    /// Override timeout. Falls back to `AgentsConfig::timeout_seconds`.
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Literal markers bounding a model's reasoning block.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ThinkingConfig {
    pub start_marker: String,
    pub end_marker: String,
}

impl Default for ThinkingConfig {
    fn default() -> Self {
        Self {
            start_marker: "<think>".to_string(),
            end_marker: "</think>".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LedgerConfig {
    /// Path of the JSON command document.
    pub path: String,
    /// Attempts per command before it lands in the failed list.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Entries kept in each of the completed/failed lists on archival.
    #[serde(default = "default_archive_limit")]
    pub archive_limit: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            path: "data/commands.json".to_string(),
            max_retries: default_max_retries(),
            archive_limit: default_archive_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemoryConfig {
    /// Path of the plain-text conversation memory.
    pub path: String,
    /// Word ceiling enforced on every save.
    #[serde(default = "default_max_words")]
    pub max_words: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            path: "data/memory.txt".to_string(),
            max_words: default_max_words(),
        }
    }
}

fn default_entity_id() -> String {
    "default".to_string()
}
fn default_true() -> bool {
    true
}
fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}
fn default_archive_limit() -> usize {
    50
}
fn default_max_words() -> usize {
    2000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_auspex_config() {
        let config = AuspexConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: AuspexConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn default_chain_resolves_to_backends() {
        let agents = AgentsConfig::default();
        let names: Vec<&str> = agents.backends.iter().map(|b| b.name.as_str()).collect();
        assert!(names.contains(&agents.leader.as_str()));
        assert!(agents.followers.iter().all(|f| names.contains(&f.as_str())));
    }

    #[test]
    fn config_from_toml() {
        let toml_str = r#"
entity_id = "binance-main"

[agents]
leader = "sonnet"
followers = ["haiku", "backup"]
default_model = "claude-sonnet-4-5-20250929"
timeout_seconds = 60

[[agents.backends]]
name = "sonnet"

[[agents.backends]]
name = "haiku"
model = "claude-3-5-haiku-latest"
timeout_seconds = 30

[[agents.backends]]
name = "backup"
enabled = false

[thinking]
start_marker = "<reasoning>"
end_marker = "</reasoning>"

[ledger]
path = "/tmp/auspex/commands.json"
max_retries = 5

[memory]
path = "/tmp/auspex/memory.txt"
"#;

        let config: AuspexConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.entity_id, "binance-main");
        assert_eq!(config.agents.followers, vec!["haiku", "backup"]);
        assert_eq!(config.agents.backends.len(), 3);
        assert!(config.agents.backends[0].enabled);
        assert!(!config.agents.backends[2].enabled);
        assert_eq!(config.agents.backends[1].timeout_seconds, Some(30));
        assert_eq!(config.thinking.start_marker, "<reasoning>");
        assert_eq!(config.ledger.max_retries, 5);
        assert_eq!(config.ledger.archive_limit, 50);
        assert_eq!(config.memory.max_words, 2000);
    }

    #[test]
    fn empty_toml_uses_defaults() {
        let config: AuspexConfig = toml::from_str("").unwrap();
        assert_eq!(config, AuspexConfig::default());
    }
}
