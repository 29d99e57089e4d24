use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One unit of planned work.
///
/// Created by the planner from AI output or fallback rules; after creation
/// only status and priority bookkeeping change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub task_type: TaskType,
    pub title: String,
    pub description: String,
    pub target: PathBuf,
    pub status: TaskStatus,
    /// 1-10, higher runs sooner. Advisory alongside dependency order.
    pub priority: u8,
    #[serde(default)]
    pub dependencies: Vec<String>,
    pub user_approval_required: bool,
    /// Advisory only; never enforced.
    pub estimated_duration_secs: u64,
}

impl Task {
    pub fn new(task_type: TaskType, title: impl Into<String>, target: impl Into<PathBuf>) -> Self {
        Self {
            id: format!("task-{}", &uuid::Uuid::new_v4().to_string()[..8]),
            task_type,
            title: title.into(),
            description: String::new(),
            target: target.into(),
            status: TaskStatus::Pending,
            priority: 5,
            dependencies: Vec::new(),
            user_approval_required: true,
            estimated_duration_secs: 60,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority.clamp(1, 10);
        self
    }

    pub fn with_dependencies(mut self, deps: Vec<String>) -> Self {
        self.dependencies = deps;
        self
    }

    pub fn with_approval_required(mut self, required: bool) -> Self {
        self.user_approval_required = required;
        self
    }

    pub fn with_estimated_duration(mut self, secs: u64) -> Self {
        self.estimated_duration_secs = secs;
        self
    }

    /// Dependencies must be in terminal success states (Completed or
    /// Skipped) for the task to start.
    pub fn can_start(&self, satisfied_deps: &[&str]) -> bool {
        self.status == TaskStatus::Pending
            && self
                .dependencies
                .iter()
                .all(|dep| satisfied_deps.contains(&dep.as_str()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    FileConversion,
    ModuleConversion,
    TerminalCommand,
    Analysis,
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FileConversion => write!(f, "file_conversion"),
            Self::ModuleConversion => write!(f, "module_conversion"),
            Self::TerminalCommand => write!(f, "terminal_command"),
            Self::Analysis => write!(f, "analysis"),
        }
    }
}

impl std::str::FromStr for TaskType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "file_conversion" => Ok(Self::FileConversion),
            "module_conversion" => Ok(Self::ModuleConversion),
            "terminal_command" => Ok(Self::TerminalCommand),
            "analysis" => Ok(Self::Analysis),
            other => Err(format!("Unknown task type: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Skipped,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Skipped)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::InProgress => write!(f, "in progress"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    Planning,
    Executing,
    Completed,
    Failed,
}

/// An ordered collection of tasks pursuing one goal, with a bounded AI-call
/// budget. Owns its tasks exclusively; tasks do not outlive their plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub id: String,
    pub goal: String,
    pub tasks: Vec<Task>,
    pub status: PlanStatus,
    pub ai_calls_used: u32,
    pub ai_calls_limit: u32,
    pub created_at: DateTime<Utc>,
}

impl Plan {
    pub fn new(goal: impl Into<String>, ai_calls_limit: u32) -> Self {
        Self {
            id: format!("plan-{}", &uuid::Uuid::new_v4().to_string()[..8]),
            goal: goal.into(),
            tasks: Vec::new(),
            status: PlanStatus::Planning,
            ai_calls_used: 0,
            ai_calls_limit,
            created_at: Utc::now(),
        }
    }

    pub fn total_tasks(&self) -> usize {
        self.tasks.len()
    }

    pub fn completed_tasks(&self) -> usize {
        self.tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Completed)
            .count()
    }

    pub fn progress(&self) -> Progress {
        let total = self.total_tasks();
        let done = self.tasks.iter().filter(|t| t.status.is_terminal()).count();
        Progress {
            completed: done,
            total,
            percentage: if total > 0 {
                ((done as f64 / total as f64) * 100.0).round() as u8
            } else {
                0
            },
        }
    }

    pub fn task(&self, task_id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == task_id)
    }

    pub fn task_mut(&mut self, task_id: &str) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == task_id)
    }

    /// Tasks ready to start: pending with all dependencies in a terminal
    /// success state. Skipped counts as satisfied so an intentionally
    /// skipped task does not block its dependents.
    pub fn next_tasks(&self) -> Vec<&Task> {
        let satisfied: Vec<&str> = self
            .tasks
            .iter()
            .filter(|t| matches!(t.status, TaskStatus::Completed | TaskStatus::Skipped))
            .map(|t| t.id.as_str())
            .collect();

        self.tasks.iter().filter(|t| t.can_start(&satisfied)).collect()
    }

    /// Consume one unit of the AI-call budget.
    pub fn record_ai_call(&mut self) -> crate::error::Result<()> {
        if self.ai_calls_used >= self.ai_calls_limit {
            return Err(crate::error::ConductorError::AiCallBudgetExhausted {
                used: self.ai_calls_used,
                limit: self.ai_calls_limit,
            });
        }
        self.ai_calls_used += 1;
        Ok(())
    }

    /// Mark a task failed and skip its transitive dependents, which can
    /// never start. Independent siblings are untouched and keep running.
    /// Returns the ids of the skipped dependents.
    pub fn fail_task(&mut self, task_id: &str) -> Vec<String> {
        let Some(task) = self.task_mut(task_id) else {
            return Vec::new();
        };
        task.status = TaskStatus::Failed;

        let mut skipped = Vec::new();
        let mut blocked: Vec<String> = vec![task_id.to_string()];
        while let Some(blocking_id) = blocked.pop() {
            let dependents: Vec<String> = self
                .tasks
                .iter()
                .filter(|t| {
                    t.status == TaskStatus::Pending && t.dependencies.contains(&blocking_id)
                })
                .map(|t| t.id.clone())
                .collect();

            for dependent_id in dependents {
                if let Some(dependent) = self.task_mut(&dependent_id) {
                    dependent.status = TaskStatus::Skipped;
                }
                blocked.push(dependent_id.clone());
                skipped.push(dependent_id);
            }
        }

        if self.tasks.iter().all(|t| t.status.is_terminal()) {
            self.status = PlanStatus::Failed;
        }
        skipped
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
    pub percentage: u8,
}

impl std::fmt::Display for Progress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}% ({}/{})", self.percentage, self.completed, self.total)
    }
}
