use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A pending approval request tied to a task or command.
///
/// Lives only until resolved, cancelled, or timed out, then leaves the
/// pending set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    pub id: String,
    /// Back-reference to the task that raised this decision, not ownership.
    pub task_id: Option<String>,
    pub kind: DecisionKind,
    pub description: String,
    pub target: String,
    /// Opaque payload under review, e.g. a command line or a diff summary.
    pub changes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub user_response: Option<bool>,
}

impl Decision {
    pub fn new(kind: DecisionKind, description: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: format!("dec-{}", &uuid::Uuid::new_v4().to_string()[..8]),
            task_id: None,
            kind,
            description: description.into(),
            target: target.into(),
            changes: None,
            created_at: Utc::now(),
            user_response: None,
        }
    }

    pub fn with_task(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }

    pub fn with_changes(mut self, changes: impl Into<String>) -> Self {
        self.changes = Some(changes.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionKind {
    FileChanges,
    ModuleChanges,
    TerminalCommand,
    Generic,
}

impl std::fmt::Display for DecisionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FileChanges => write!(f, "file changes"),
            Self::ModuleChanges => write!(f, "module changes"),
            Self::TerminalCommand => write!(f, "terminal command"),
            Self::Generic => write!(f, "change"),
        }
    }
}
