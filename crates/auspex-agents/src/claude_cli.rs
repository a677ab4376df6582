use std::time::Duration;

use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::AgentError;

/// How to reach one model through the `claude` CLI.
#[derive(Debug, Clone)]
pub struct ClaudeCliConfig {
    /// Executable to run. Overridable so wrappers or fakes can stand in.
    pub binary: String,
    pub model: String,
    pub timeout: Duration,
}

impl Default for ClaudeCliConfig {
    fn default() -> Self {
        Self {
            binary: "claude".to_string(),
            model: "claude-sonnet-4-5-20250929".to_string(),
            timeout: Duration::from_secs(90),
        }
    }
}

/// Run one completion and return the raw stdout text.
///
/// Races the subprocess against `cancel` and the configured timeout. The
/// child is killed when either wins.
pub async fn invoke_claude(
    system_prompt: &str,
    user_prompt: &str,
    config: &ClaudeCliConfig,
    cancel: &CancellationToken,
) -> Result<String, AgentError> {
    debug!(
        binary = %config.binary,
        model = %config.model,
        prompt_len = user_prompt.len(),
        "Invoking claude CLI"
    );

    let mut command = Command::new(&config.binary);
    command
        .args([
            "-p",
            user_prompt,
            "--system-prompt",
            system_prompt,
            "--model",
            &config.model,
            "--output-format",
            "text",
        ])
        .kill_on_drop(true);

    let output = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(AgentError::Cancelled),
        result = tokio::time::timeout(config.timeout, command.output()) => result,
    };

    let output = output
        .map_err(|_| AgentError::Timeout(config.timeout.as_secs()))?
        .map_err(|e| AgentError::Cli(format!("Failed to spawn {}: {e}", config.binary)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        warn!(status = %output.status, stderr = %stderr, "Claude CLI failed");
        return Err(AgentError::Cli(format!(
            "{} exited {}: {}",
            config.binary,
            output.status,
            stderr.trim()
        )));
    }

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    if stdout.trim().is_empty() {
        return Err(AgentError::Cli(format!(
            "{} returned an empty response",
            config.model
        )));
    }

    Ok(stdout)
}

/// Whether `binary --version` runs successfully.
pub async fn check_cli_available(binary: &str) -> bool {
    match Command::new(binary).arg("--version").output().await {
        Ok(output) => output.status.success(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(binary: &str) -> ClaudeCliConfig {
        ClaudeCliConfig {
            binary: binary.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn missing_binary_is_cli_error() {
        let err = invoke_claude(
            "system",
            "user",
            &config("auspex-no-such-binary"),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AgentError::Cli(_)));
    }

    #[tokio::test]
    async fn cancelled_before_start() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = invoke_claude("system", "user", &config("claude"), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Cancelled));
    }

    #[tokio::test]
    async fn missing_binary_is_unavailable() {
        assert!(!check_cli_available("auspex-no-such-binary").await);
    }
}
