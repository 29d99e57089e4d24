use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConductorError {
    #[error("Workspace root not found: {0}")]
    WorkspaceNotFound(PathBuf),

    #[error("Circular dependency detected at task: {task_id}")]
    CircularDependency { task_id: String },

    #[error("Task not found: {plan_id}/{task_id}")]
    TaskNotFound { plan_id: String, task_id: String },

    #[error("AI backend error: {0}")]
    Backend(String),

    #[error("Failed to parse AI plan output: {0}")]
    PlanParse(String),

    #[error("Plan AI call budget exhausted ({used}/{limit})")]
    AiCallBudgetExhausted { used: u32, limit: u32 },

    #[error("Command rejected: {reason}")]
    InvalidCommand { reason: String },

    #[error("Approval timed out for decision: {decision_id}")]
    ApprovalTimeout { decision_id: String },

    #[error("Approval cancelled for decision: {decision_id}")]
    ApprovalCancelled { decision_id: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("{0}")]
    Other(String),
}

impl ConductorError {
    /// Returns true for failures the planner recovers from via fallback tasks.
    pub fn is_recoverable_by_fallback(&self) -> bool {
        matches!(self, Self::Backend(_) | Self::PlanParse(_))
    }
}

pub type Result<T> = std::result::Result<T, ConductorError>;
