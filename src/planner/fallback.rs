//! Deterministic fallback task sets.
//!
//! Used when the backend errors or returns unparseable output: a goal with
//! a resolvable target never ends up with zero tasks.

use std::path::Path;

use tracing::info;

use super::context::PlanScope;
use super::types::{Task, TaskType};

pub fn fallback_tasks(scope: PlanScope, target: &Path) -> Vec<Task> {
    info!(%scope, target = %target.display(), "Using deterministic fallback tasks");
    match scope {
        PlanScope::File => {
            let audit = Task::new(TaskType::Analysis, "Audit file", target)
                .with_description("Review the file and list the changes the goal requires")
                .with_priority(8)
                .with_approval_required(false)
                .with_estimated_duration(60);
            let convert = Task::new(TaskType::FileConversion, "Apply changes to file", target)
                .with_description("Apply the changes identified by the audit")
                .with_priority(6)
                .with_dependencies(vec![audit.id.clone()])
                .with_estimated_duration(120);
            vec![audit, convert]
        }
        PlanScope::Folder => {
            let audit = Task::new(TaskType::Analysis, "Audit folder", target)
                .with_description("Review each file in the folder against the goal")
                .with_priority(8)
                .with_approval_required(false)
                .with_estimated_duration(120);
            let convert = Task::new(TaskType::ModuleConversion, "Convert module", target)
                .with_description("Apply the changes identified by the audit across the module")
                .with_priority(6)
                .with_dependencies(vec![audit.id.clone()])
                .with_estimated_duration(300);
            vec![audit, convert]
        }
        PlanScope::Repository => {
            let audit = Task::new(TaskType::Analysis, "Audit project", target)
                .with_description("Survey the repository structure and flag files relevant to the goal")
                .with_priority(9)
                .with_approval_required(false)
                .with_estimated_duration(180);
            let tooling = Task::new(TaskType::TerminalCommand, "Install lint tooling", target)
                .with_description("npm install --save-dev eslint")
                .with_priority(5)
                .with_dependencies(vec![audit.id.clone()])
                .with_estimated_duration(120);
            vec![audit, tooling]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn every_scope_yields_at_least_one_task() {
        for scope in [PlanScope::File, PlanScope::Folder, PlanScope::Repository] {
            let tasks = fallback_tasks(scope, &PathBuf::from("/repo"));
            assert!(!tasks.is_empty(), "scope {} yielded no tasks", scope);
        }
    }

    #[test]
    fn repository_fallback_is_audit_plus_tooling_command() {
        let tasks = fallback_tasks(PlanScope::Repository, &PathBuf::from("/repo"));
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].task_type, TaskType::Analysis);
        assert_eq!(tasks[1].task_type, TaskType::TerminalCommand);
        assert_eq!(tasks[1].dependencies, vec![tasks[0].id.clone()]);
        assert!(tasks[1].user_approval_required);
    }

    #[test]
    fn fallback_dependencies_use_real_ids() {
        let tasks = fallback_tasks(PlanScope::File, &PathBuf::from("/a.ts"));
        assert_eq!(tasks[1].dependencies, vec![tasks[0].id.clone()]);
    }
}
