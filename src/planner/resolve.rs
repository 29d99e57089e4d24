//! Dependency-order resolution.
//!
//! Depth-first emit: every task's dependencies appear before the task
//! itself. An in-progress marker set detects cycles, which fail fast with
//! the offending task named; no partial ordering is returned.

use std::collections::{HashMap, HashSet};

use crate::error::{ConductorError, Result};

use super::types::Task;

pub fn resolve_dependencies(tasks: &[Task]) -> Result<Vec<Task>> {
    let by_id: HashMap<&str, &Task> = tasks.iter().map(|t| (t.id.as_str(), t)).collect();

    let mut ordered = Vec::with_capacity(tasks.len());
    let mut resolved: HashSet<&str> = HashSet::new();
    let mut in_progress: HashSet<&str> = HashSet::new();

    for task in tasks {
        visit(task, &by_id, &mut resolved, &mut in_progress, &mut ordered)?;
    }

    Ok(ordered)
}

fn visit<'a>(
    task: &'a Task,
    by_id: &HashMap<&'a str, &'a Task>,
    resolved: &mut HashSet<&'a str>,
    in_progress: &mut HashSet<&'a str>,
    ordered: &mut Vec<Task>,
) -> Result<()> {
    // Resolving an already-resolved task is a no-op.
    if resolved.contains(task.id.as_str()) {
        return Ok(());
    }
    if in_progress.contains(task.id.as_str()) {
        return Err(ConductorError::CircularDependency {
            task_id: task.id.clone(),
        });
    }

    in_progress.insert(&task.id);
    for dep in &task.dependencies {
        // Unknown ids were dropped with a warning at parse time.
        if let Some(dep_task) = by_id.get(dep.as_str()) {
            visit(dep_task, by_id, resolved, in_progress, ordered)?;
        }
    }
    in_progress.remove(task.id.as_str());

    resolved.insert(&task.id);
    ordered.push(task.clone());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::types::TaskType;

    fn task(id: &str, deps: &[&str]) -> Task {
        let mut t = Task::new(TaskType::Analysis, id, "x")
            .with_dependencies(deps.iter().map(|s| s.to_string()).collect());
        t.id = id.to_string();
        t
    }

    fn position(ordered: &[Task], id: &str) -> usize {
        ordered.iter().position(|t| t.id == id).unwrap()
    }

    #[test]
    fn dependencies_come_before_dependents() {
        let tasks = vec![
            task("c", &["a", "b"]),
            task("a", &[]),
            task("b", &["a"]),
        ];

        let ordered = resolve_dependencies(&tasks).unwrap();
        assert_eq!(ordered.len(), 3);
        assert!(position(&ordered, "a") < position(&ordered, "b"));
        assert!(position(&ordered, "b") < position(&ordered, "c"));
        assert!(position(&ordered, "a") < position(&ordered, "c"));
    }

    #[test]
    fn resolution_is_a_permutation() {
        let tasks = vec![
            task("a", &[]),
            task("b", &["a"]),
            task("c", &["a"]),
            task("d", &["b", "c"]),
        ];

        let ordered = resolve_dependencies(&tasks).unwrap();
        let mut ids: Vec<&str> = ordered.iter().map(|t| t.id.as_str()).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn cycle_fails_with_task_named_and_no_partial_order() {
        let tasks = vec![task("a", &["b"]), task("b", &["c"]), task("c", &["a"])];

        let err = resolve_dependencies(&tasks).unwrap_err();
        let ConductorError::CircularDependency { task_id } = err else {
            panic!("expected circular dependency error");
        };
        assert!(["a", "b", "c"].contains(&task_id.as_str()));
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let tasks = vec![task("a", &["a"])];
        assert!(resolve_dependencies(&tasks).is_err());
    }

    #[test]
    fn unknown_dependency_ids_are_ignored() {
        let tasks = vec![task("a", &["ghost"])];
        let ordered = resolve_dependencies(&tasks).unwrap();
        assert_eq!(ordered.len(), 1);
    }

    #[test]
    fn already_ordered_input_is_stable() {
        let tasks = vec![task("a", &[]), task("b", &["a"])];
        let ordered = resolve_dependencies(&tasks).unwrap();
        let ids: Vec<&str> = ordered.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
