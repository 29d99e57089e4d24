//! Safe terminal command construction and execution.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::config::TerminalConfig;
use crate::error::{ConductorError, Result};
use crate::output::SharedSink;

use super::rules::{RiskLevel, Validation, assess_command_risk, validate_command_with_limit};

/// A shell command with its risk assessment and, after execution, its
/// structured outcome. Mutated in place exactly once; never re-executed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerminalCommand {
    pub id: String,
    pub command: String,
    pub working_dir: PathBuf,
    pub description: String,
    pub risk: RiskLevel,
    pub user_approval_required: bool,
    pub executed: bool,
    pub result: Option<CommandResult>,
}

/// Structured execution outcome. Execution failures are captured here,
/// never thrown past the executor boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResult {
    pub success: bool,
    pub output: String,
    pub error: Option<String>,
    pub exit_code: i32,
}

impl CommandResult {
    fn failure(output: String, error: impl Into<String>, exit_code: i32) -> Self {
        Self {
            success: false,
            output,
            error: Some(error.into()),
            exit_code,
        }
    }
}

pub struct TerminalExecutor {
    config: TerminalConfig,
    sink: SharedSink,
}

impl TerminalExecutor {
    pub fn new(config: TerminalConfig, sink: SharedSink) -> Self {
        Self { config, sink }
    }

    /// Validate and classify a raw command into a structured record.
    ///
    /// Approval defaults to required; a short read-only allow-list clears the
    /// flag and forces risk down to low.
    pub fn create_safe_command(&self, raw: &str, working_dir: &Path) -> Result<TerminalCommand> {
        match validate_command_with_limit(raw, self.config.max_command_len) {
            Validation::Invalid { reason } => {
                warn!(command = raw, reason = %reason, "Command rejected by validation");
                Err(ConductorError::InvalidCommand { reason })
            }
            Validation::Valid => {
                let auto_approved = self.is_auto_approvable(raw);
                let risk = if auto_approved {
                    RiskLevel::Low
                } else {
                    assess_command_risk(raw)
                };

                Ok(TerminalCommand {
                    id: format!("cmd-{}", &uuid::Uuid::new_v4().to_string()[..8]),
                    command: raw.trim().to_string(),
                    working_dir: working_dir.to_path_buf(),
                    description: describe(raw),
                    risk,
                    user_approval_required: !auto_approved,
                    executed: false,
                    result: None,
                })
            }
        }
    }

    /// Execute the command with a hard timeout and bounded output capture.
    /// Always returns a result; the command record is stamped in place.
    pub async fn execute(&self, cmd: &mut TerminalCommand) -> CommandResult {
        if cmd.executed {
            // A command record is single-use.
            return cmd.result.clone().unwrap_or_else(|| {
                CommandResult::failure(String::new(), "command already executed", -1)
            });
        }

        debug!(
            id = %cmd.id,
            command = %cmd.command,
            dir = %cmd.working_dir.display(),
            risk = %cmd.risk,
            "Executing command"
        );

        let result = match validate_command_with_limit(&cmd.command, self.config.max_command_len) {
            Validation::Invalid { reason } => {
                CommandResult::failure(String::new(), format!("rejected: {}", reason), -1)
            }
            Validation::Valid => self.run(cmd).await,
        };

        cmd.executed = true;
        cmd.result = Some(result.clone());
        self.audit(cmd, &result);
        result
    }

    async fn run(&self, cmd: &TerminalCommand) -> CommandResult {
        let timeout = Duration::from_secs(self.config.timeout_secs);
        let child = Command::new("sh")
            .arg("-c")
            .arg(&cmd.command)
            .current_dir(&cmd.working_dir)
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(timeout, child).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return CommandResult::failure(String::new(), format!("failed to spawn: {}", e), -1);
            }
            Err(_) => {
                // Dropping the output future kills the child.
                return CommandResult::failure(
                    String::new(),
                    format!("timed out after {}s", self.config.timeout_secs),
                    -1,
                );
            }
        };

        let stdout = self.truncate(&String::from_utf8_lossy(&output.stdout));
        let stderr = self.truncate(&String::from_utf8_lossy(&output.stderr));
        let exit_code = output.status.code().unwrap_or(-1);

        if output.status.success() {
            CommandResult {
                success: true,
                output: stdout,
                error: None,
                exit_code: 0,
            }
        } else {
            warn!(id = %cmd.id, exit_code, "Command failed");
            CommandResult::failure(stdout, stderr, exit_code)
        }
    }

    fn is_auto_approvable(&self, command: &str) -> bool {
        let trimmed = command.trim();
        self.config
            .auto_approve_commands
            .iter()
            .any(|entry| trimmed == entry || trimmed.starts_with(&format!("{} ", entry)))
    }

    fn truncate(&self, text: &str) -> String {
        if text.len() <= self.config.max_output_bytes {
            return text.to_string();
        }
        let mut end = self.config.max_output_bytes;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}\n[output truncated]", &text[..end])
    }

    fn audit(&self, cmd: &TerminalCommand, result: &CommandResult) {
        let snippet: String = result.output.chars().take(200).collect();
        self.sink.append(&format!(
            "exec [{}] `{}` in {} -> {} (exit {}){}{}",
            cmd.id,
            cmd.command,
            cmd.working_dir.display(),
            if result.success { "ok" } else { "failed" },
            result.exit_code,
            if snippet.is_empty() { "" } else { ": " },
            snippet
        ));
    }
}

/// Derive a short human description from the command's leading token.
fn describe(command: &str) -> String {
    let first = command.trim().split_whitespace().next().unwrap_or("command");
    match first {
        "git" => "Run a git operation".to_string(),
        "npm" | "npx" | "yarn" | "pnpm" => "Run a package manager command".to_string(),
        "node" => "Run a node process".to_string(),
        "cargo" => "Run a cargo command".to_string(),
        "ls" | "pwd" | "cat" | "head" | "tail" => "Inspect files or directories".to_string(),
        other => format!("Execute `{}`", other),
    }
}
