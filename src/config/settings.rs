use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::error::{ConductorError, Result};

const CONFIG_FILE: &str = "conductor.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConductorConfig {
    pub planner: PlannerConfig,
    pub approval: ApprovalConfig,
    pub terminal: TerminalConfig,
    pub rate_limit: RateLimitConfig,
    pub file_cache: FileCacheConfig,
}

impl ConductorConfig {
    pub async fn load(dir: &Path) -> Result<Self> {
        let config_path = dir.join(CONFIG_FILE);
        let config: Self = if config_path.exists() {
            let content = fs::read_to_string(&config_path).await?;
            toml::from_str(&content)?
        } else {
            Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub async fn save(&self, dir: &Path) -> Result<()> {
        self.validate()?;
        let config_path = dir.join(CONFIG_FILE);
        let content =
            toml::to_string_pretty(self).map_err(|e| ConductorError::Config(e.to_string()))?;
        fs::write(&config_path, content).await?;
        Ok(())
    }

    /// Validate configuration values for consistency and safety.
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        if self.planner.max_ai_calls == 0 {
            errors.push("planner.max_ai_calls must be greater than 0");
        }

        if self.approval.timeout_secs == 0 {
            errors.push("approval.timeout_secs must be greater than 0");
        }

        if self.terminal.timeout_secs == 0 {
            errors.push("terminal.timeout_secs must be greater than 0");
        }
        if self.terminal.max_output_bytes == 0 {
            errors.push("terminal.max_output_bytes must be greater than 0");
        }
        if self.terminal.max_command_len == 0 {
            errors.push("terminal.max_command_len must be greater than 0");
        }

        if self.rate_limit.max_tokens_per_minute == 0 {
            errors.push("rate_limit.max_tokens_per_minute must be greater than 0");
        }
        if self.rate_limit.max_requests_per_minute == 0 {
            errors.push("rate_limit.max_requests_per_minute must be greater than 0");
        }
        if self.rate_limit.window_secs == 0 {
            errors.push("rate_limit.window_secs must be greater than 0");
        }
        if self.rate_limit.max_wait_attempts == 0 {
            errors.push("rate_limit.max_wait_attempts must be greater than 0");
        }

        if self.file_cache.max_entries == 0 {
            errors.push("file_cache.max_entries must be greater than 0");
        }
        if !(0.0..=1.0).contains(&self.file_cache.evict_fraction) {
            errors.push("file_cache.evict_fraction must be between 0.0 and 1.0");
        }
        if self.file_cache.cooldown_secs > self.file_cache.ttl_secs {
            errors.push("file_cache.cooldown_secs must not exceed file_cache.ttl_secs");
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConductorError::Config(errors.join("; ")))
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Hard cap on AI backend calls per plan, to bound cost.
    pub max_ai_calls: u32,
    /// Substitute deterministic fallback tasks when the backend fails or
    /// returns unparseable output.
    pub fallback_on_error: bool,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            max_ai_calls: 5,
            fallback_on_error: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApprovalConfig {
    /// How long an approval request stays pending before resolving to rejected.
    pub timeout_secs: u64,
    /// Read-only commands exempt from the approval round-trip.
    pub quick_approve_commands: Vec<String>,
}

impl Default for ApprovalConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 300,
            quick_approve_commands: vec![
                "git status".to_string(),
                "git diff".to_string(),
                "git log".to_string(),
                "git --version".to_string(),
                "node --version".to_string(),
                "npm --version".to_string(),
                "npm test".to_string(),
                "npm run build".to_string(),
                "npm run lint".to_string(),
                "ls".to_string(),
                "pwd".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminalConfig {
    /// Hard timeout for a single command execution.
    pub timeout_secs: u64,
    /// Captured output is truncated beyond this many bytes.
    pub max_output_bytes: usize,
    /// Commands longer than this are rejected by validation.
    pub max_command_len: usize,
    /// Read-only commands that skip the approval requirement entirely.
    pub auto_approve_commands: Vec<String>,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            max_output_bytes: 1024 * 1024,
            max_command_len: 500,
            auto_approve_commands: vec![
                "ls".to_string(),
                "pwd".to_string(),
                "git status".to_string(),
                "git diff".to_string(),
                "git log".to_string(),
                "node --version".to_string(),
                "npm --version".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub max_tokens_per_minute: u32,
    pub max_requests_per_minute: u32,
    /// Trailing admission window.
    pub window_secs: u64,
    /// Waits shorter than this floor admit immediately to avoid livelock on
    /// window-boundary conditions.
    pub min_wait_floor_ms: u64,
    /// Bounded retries before admitting unconditionally.
    pub max_wait_attempts: u32,
    /// Poll interval while cooperatively waiting out the window.
    pub poll_interval_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_tokens_per_minute: 20_000,
            max_requests_per_minute: 50,
            window_secs: 60,
            min_wait_floor_ms: 1000,
            max_wait_attempts: 3,
            poll_interval_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileCacheConfig {
    /// Maximum age before a cached read is considered stale.
    pub ttl_secs: u64,
    /// Entries younger than this are served without re-verifying the disk
    /// fingerprint.
    pub cooldown_secs: u64,
    /// Capacity bound; overflow triggers a batched eviction.
    pub max_entries: usize,
    /// Fraction of oldest entries evicted in one pass on overflow.
    pub evict_fraction: f64,
    /// Content larger than this is never cached and always re-read.
    pub max_content_bytes: usize,
}

impl Default for FileCacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 600,
            cooldown_secs: 30,
            max_entries: 50,
            evict_fraction: 0.25,
            max_content_bytes: 2 * 1024 * 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(ConductorConfig::default().validate().is_ok());
    }

    #[test]
    fn default_constants_match_policy() {
        let config = ConductorConfig::default();
        assert_eq!(config.planner.max_ai_calls, 5);
        assert_eq!(config.approval.timeout_secs, 300);
        assert_eq!(config.terminal.timeout_secs, 60);
        assert_eq!(config.terminal.max_output_bytes, 1024 * 1024);
        assert_eq!(config.rate_limit.window_secs, 60);
        assert_eq!(config.file_cache.ttl_secs, 600);
        assert_eq!(config.file_cache.max_entries, 50);
    }

    #[test]
    fn validate_collects_all_violations() {
        let mut config = ConductorConfig::default();
        config.planner.max_ai_calls = 0;
        config.rate_limit.window_secs = 0;

        let err = config.validate().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("max_ai_calls"));
        assert!(msg.contains("window_secs"));
    }

    #[test]
    fn cooldown_longer_than_ttl_is_rejected() {
        let mut config = ConductorConfig::default();
        config.file_cache.cooldown_secs = config.file_cache.ttl_secs + 1;
        assert!(config.validate().is_err());
    }

    #[tokio::test]
    async fn load_returns_defaults_when_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let config = ConductorConfig::load(dir.path()).await.unwrap();
        assert_eq!(config.approval.timeout_secs, 300);
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ConductorConfig::default();
        config.rate_limit.max_tokens_per_minute = 123;
        config.save(dir.path()).await.unwrap();

        let loaded = ConductorConfig::load(dir.path()).await.unwrap();
        assert_eq!(loaded.rate_limit.max_tokens_per_minute, 123);
    }
}
