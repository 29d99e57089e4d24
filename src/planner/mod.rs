//! Task planning: context gathering, AI task generation with fallback, and
//! dependency-order resolution.

mod context;
mod fallback;
mod parse;
mod prompt;
mod resolve;
mod types;

pub use context::{
    DirEntryInfo, EntryKind, FileContext, PlanScope, ProjectType, WorkspaceContext, build_context,
};
pub use fallback::fallback_tasks;
pub use parse::{RawTask, materialize_tasks, parse_task_array};
pub use prompt::build_plan_prompt;
pub use resolve::resolve_dependencies;
pub use types::{Plan, PlanStatus, Progress, Task, TaskStatus, TaskType};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::backend::{AiBackend, estimate_tokens};
use crate::config::PlannerConfig;
use crate::error::{ConductorError, Result};
use crate::filecache::FileContextTracker;
use crate::limiter::RateLimiter;

/// Top-level orchestrator: turns a goal into an ordered, executable plan.
pub struct TaskPlanner {
    workspace_root: PathBuf,
    backend: Arc<dyn AiBackend>,
    limiter: Arc<RateLimiter>,
    tracker: Arc<FileContextTracker>,
    config: PlannerConfig,
}

impl TaskPlanner {
    /// A missing workspace root is fatal: no plan is possible without one.
    pub fn new(
        workspace_root: impl Into<PathBuf>,
        backend: Arc<dyn AiBackend>,
        limiter: Arc<RateLimiter>,
        tracker: Arc<FileContextTracker>,
        config: PlannerConfig,
    ) -> Result<Self> {
        let workspace_root = workspace_root.into();
        if !workspace_root.is_dir() {
            return Err(ConductorError::WorkspaceNotFound(workspace_root));
        }
        Ok(Self {
            workspace_root,
            backend,
            limiter,
            tracker,
            config,
        })
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    /// Build context, generate tasks (or fall back), and resolve dependency
    /// order. Backend and parse failures recover via fallback; circular
    /// dependencies are fatal and reported, not silently broken.
    pub async fn create_plan(&self, goal: &str, scope: PlanScope, target: &Path) -> Result<Plan> {
        let target = self.resolve_target(target);
        info!(goal, %scope, target = %target.display(), "Creating plan");

        let context = build_context(scope, &target, &self.tracker).await;
        let prompt = build_plan_prompt(goal, &context, self.config.max_ai_calls);

        let mut plan = Plan::new(goal, self.config.max_ai_calls);

        // An empty parsed list is treated like a parse failure: same
        // fallback gate, same error when the gate is off.
        let tasks = match self.generate_tasks(&mut plan, &prompt, &target).await {
            Ok(tasks) if !tasks.is_empty() => tasks,
            Ok(_) if self.config.fallback_on_error => {
                warn!("Backend returned an empty task list, falling back");
                fallback_tasks(scope, &target)
            }
            Ok(_) => {
                return Err(ConductorError::PlanParse(
                    "backend returned an empty task list".to_string(),
                ));
            }
            Err(e) if e.is_recoverable_by_fallback() && self.config.fallback_on_error => {
                warn!(error = %e, "Task generation failed, falling back");
                fallback_tasks(scope, &target)
            }
            Err(e) => return Err(e),
        };

        plan.tasks = resolve_dependencies(&tasks)?;
        info!(plan_id = %plan.id, tasks = plan.total_tasks(), "Plan created");
        Ok(plan)
    }

    async fn generate_tasks(
        &self,
        plan: &mut Plan,
        prompt: &str,
        default_target: &Path,
    ) -> Result<Vec<Task>> {
        plan.record_ai_call()?;

        let estimated = estimate_tokens(prompt);
        let admission = self.limiter.check_rate_limit(estimated).await;
        if let crate::limiter::Admission::Forced { attempts } = admission {
            warn!(attempts, "Proceeding despite rate limit pressure");
        }

        let response = self.backend.complete(prompt).await?;

        // Estimate before, record backend-reported truth afterwards.
        let actual = response.usage.total();
        self.limiter
            .record_usage(if actual > 0 { actual } else { estimated });

        let raw = parse_task_array(&response.text)?;
        Ok(materialize_tasks(raw, default_target))
    }

    fn resolve_target(&self, target: &Path) -> PathBuf {
        if target.is_absolute() {
            target.to_path_buf()
        } else {
            self.workspace_root.join(target)
        }
    }
}
