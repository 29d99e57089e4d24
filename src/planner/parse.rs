//! Parsing of AI plan output.
//!
//! The backend returns free text; the planner expects a JSON array literal
//! embedded somewhere in it. Extraction scans for the first balanced array,
//! string-aware so brackets inside quoted values do not confuse it.

use std::path::Path;

use serde::Deserialize;
use tracing::warn;

use crate::error::{ConductorError, Result};

use super::types::{Task, TaskType};

/// Task-shaped object as produced by the backend. All fields except the
/// title are optional so a slightly sloppy response still materializes.
#[derive(Debug, Clone, Deserialize)]
pub struct RawTask {
    #[serde(rename = "type", default)]
    pub task_type: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub priority: Option<u8>,
    /// Positional indices into the same array, remapped to real ids later.
    #[serde(default)]
    pub dependencies: Vec<usize>,
    #[serde(default)]
    pub user_approval_required: Option<bool>,
    #[serde(default)]
    pub estimated_duration_secs: Option<u64>,
}

/// Locate and parse the first well-formed JSON array literal in the
/// response text. Non-array payloads are rejected.
pub fn parse_task_array(response: &str) -> Result<Vec<RawTask>> {
    let literal = extract_array_literal(response)
        .ok_or_else(|| ConductorError::PlanParse("no JSON array found in response".to_string()))?;

    serde_json::from_str::<Vec<RawTask>>(literal)
        .map_err(|e| ConductorError::PlanParse(format!("task array did not parse: {}", e)))
}

/// Materialize raw tasks into `Task`s with fresh ids, remapping positional
/// dependency indices to the generated ids. Out-of-range and self indices
/// are dropped with a warning.
pub fn materialize_tasks(raw_tasks: Vec<RawTask>, default_target: &Path) -> Vec<Task> {
    let mut tasks: Vec<Task> = raw_tasks
        .iter()
        .map(|raw| {
            let task_type = raw
                .task_type
                .as_deref()
                .and_then(|s| s.parse::<TaskType>().ok())
                .unwrap_or(TaskType::Analysis);

            let target = raw
                .target
                .as_deref()
                .map(Into::into)
                .unwrap_or_else(|| default_target.to_path_buf());

            Task::new(task_type, &raw.title, target)
                .with_description(&raw.description)
                .with_priority(raw.priority.unwrap_or(5))
                .with_approval_required(raw.user_approval_required.unwrap_or(true))
                .with_estimated_duration(raw.estimated_duration_secs.unwrap_or(60))
        })
        .collect();

    let ids: Vec<String> = tasks.iter().map(|t| t.id.clone()).collect();
    for (position, raw) in raw_tasks.iter().enumerate() {
        let deps: Vec<String> = raw
            .dependencies
            .iter()
            .filter_map(|&index| {
                if index == position {
                    warn!(position, "Dropping self-referential dependency index");
                    return None;
                }
                match ids.get(index) {
                    Some(id) => Some(id.clone()),
                    None => {
                        warn!(position, index, "Dropping out-of-range dependency index");
                        None
                    }
                }
            })
            .collect();
        tasks[position].dependencies = deps;
    }

    tasks
}

/// Find the first balanced `[` … `]` literal, skipping over string
/// contents and escapes.
fn extract_array_literal(text: &str) -> Option<&str> {
    let start = text.find('[')?;
    let bytes = text.as_bytes();

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &byte) in bytes[start..].iter().enumerate() {
        if escaped {
            escaped = false;
            continue;
        }
        match byte {
            b'\\' if in_string => escaped = true,
            b'"' => in_string = !in_string,
            b'[' if !in_string => depth += 1,
            b']' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const RESPONSE: &str = r#"Here is the plan:
[
  {"type": "analysis", "title": "Audit components", "description": "Scan for issues", "target": "src", "priority": 8, "dependencies": []},
  {"type": "file_conversion", "title": "Fix Button", "target": "src/Button.tsx", "dependencies": [0], "user_approval_required": true}
]
Let me know if you want changes."#;

    #[test]
    fn extracts_array_from_surrounding_prose() {
        let raw = parse_task_array(RESPONSE).unwrap();
        assert_eq!(raw.len(), 2);
        assert_eq!(raw[0].title, "Audit components");
        assert_eq!(raw[1].dependencies, vec![0]);
    }

    #[test]
    fn brackets_inside_strings_do_not_break_extraction() {
        let response = r#"[{"title": "Fix [legacy] code", "dependencies": []}]"#;
        let raw = parse_task_array(response).unwrap();
        assert_eq!(raw[0].title, "Fix [legacy] code");
    }

    #[test]
    fn missing_array_is_a_parse_error() {
        let err = parse_task_array("I could not produce a plan.").unwrap_err();
        assert!(matches!(err, ConductorError::PlanParse(_)));
    }

    #[test]
    fn non_array_payload_is_rejected() {
        let err = parse_task_array(r#"{"tasks": "nope"}"#).unwrap_err();
        assert!(matches!(err, ConductorError::PlanParse(_)));
    }

    #[test]
    fn malformed_objects_are_rejected() {
        let err = parse_task_array(r#"[{"no_title": true}]"#).unwrap_err();
        assert!(matches!(err, ConductorError::PlanParse(_)));
    }

    #[test]
    fn positional_dependencies_are_remapped_to_ids() {
        let raw = parse_task_array(RESPONSE).unwrap();
        let tasks = materialize_tasks(raw, &PathBuf::from("/repo"));

        assert_eq!(tasks.len(), 2);
        assert!(tasks[0].dependencies.is_empty());
        assert_eq!(tasks[1].dependencies, vec![tasks[0].id.clone()]);
        // Fresh ids, not indices.
        assert!(tasks[1].dependencies[0].starts_with("task-"));
    }

    #[test]
    fn out_of_range_and_self_indices_are_dropped() {
        let response = r#"[{"title": "a", "dependencies": [0, 7]}]"#;
        let raw = parse_task_array(response).unwrap();
        let tasks = materialize_tasks(raw, &PathBuf::from("/repo"));
        assert!(tasks[0].dependencies.is_empty());
    }

    #[test]
    fn defaults_fill_absent_fields() {
        let response = r#"[{"title": "bare"}]"#;
        let raw = parse_task_array(response).unwrap();
        let tasks = materialize_tasks(raw, &PathBuf::from("/repo"));

        let task = &tasks[0];
        assert_eq!(task.task_type, crate::planner::TaskType::Analysis);
        assert_eq!(task.target, PathBuf::from("/repo"));
        assert_eq!(task.priority, 5);
        assert!(task.user_approval_required);
    }
}
