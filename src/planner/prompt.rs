//! Plan prompt construction.

use super::context::{PlanScope, WorkspaceContext};

/// Build the structured planning prompt: goal, scope, target, inferred
/// project context, and the output constraints the parser depends on
/// (enumerated task types, positional dependency indices, call budget).
pub fn build_plan_prompt(goal: &str, context: &WorkspaceContext, max_ai_calls: u32) -> String {
    let mut prompt = format!(
        r#"## Planning Request

**Goal**: {}
**Scope**: {}
**Target**: {}
"#,
        goal,
        context.scope,
        context.target.display()
    );

    match context.scope {
        PlanScope::File => {
            if let Some(ref file) = context.file {
                prompt.push_str(&format!(
                    "**File extension**: {}\n\n**File content**:\n```\n{}\n```\n",
                    file.extension, file.content
                ));
            }
        }
        PlanScope::Folder => {
            if !context.entries.is_empty() {
                prompt.push_str("\n**Directory entries**:\n");
                for entry in &context.entries {
                    prompt.push_str(&format!("- {} ({:?})\n", entry.name, entry.kind));
                }
            }
        }
        PlanScope::Repository => {
            if let Some(project_type) = context.project_type {
                prompt.push_str(&format!("**Project type**: {}\n", project_type));
            }
        }
    }

    if let Some(ref error) = context.error {
        prompt.push_str(&format!("\n**Context note**: {}\n", error));
    }

    prompt.push_str(&format!(
        r#"
---

## Requirements

Respond with a JSON array of task objects and nothing else. Each object:

- "type": one of "file_conversion", "module_conversion", "terminal_command", "analysis"
- "title": short imperative summary
- "description": what to do and why
- "target": path the task touches (file, directory, or working directory)
- "priority": 1-10, higher runs sooner
- "dependencies": array of ZERO-BASED INDICES into this same array
- "user_approval_required": true for anything that modifies files or runs commands
- "estimated_duration_secs": advisory estimate

Constraints:
- At most {} AI calls are available for this whole plan; do not propose tasks that require more.
- Keep the list minimal; prefer fewer, well-scoped tasks.
- Dependencies must be acyclic."#,
        max_ai_calls
    ));

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::context::{FileContext, PlanScope, ProjectType};
    use std::path::PathBuf;

    #[test]
    fn prompt_embeds_goal_scope_and_constraints() {
        let context = WorkspaceContext {
            scope: PlanScope::Repository,
            target: PathBuf::from("/repo"),
            file: None,
            entries: Vec::new(),
            project_type: Some(ProjectType::React),
            error: None,
        };

        let prompt = build_plan_prompt("make forms accessible", &context, 5);
        assert!(prompt.contains("make forms accessible"));
        assert!(prompt.contains("repository"));
        assert!(prompt.contains("react"));
        assert!(prompt.contains("ZERO-BASED INDICES"));
        assert!(prompt.contains("At most 5 AI calls"));
    }

    #[test]
    fn file_scope_embeds_content() {
        let context = WorkspaceContext {
            scope: PlanScope::File,
            target: PathBuf::from("/repo/app.tsx"),
            file: Some(FileContext {
                content: "<button/>".to_string(),
                extension: "tsx".to_string(),
            }),
            entries: Vec::new(),
            project_type: None,
            error: None,
        };

        let prompt = build_plan_prompt("fix buttons", &context, 5);
        assert!(prompt.contains("<button/>"));
        assert!(prompt.contains("tsx"));
    }

    #[test]
    fn context_error_is_surfaced_as_note() {
        let context = WorkspaceContext {
            scope: PlanScope::File,
            target: PathBuf::from("/gone.ts"),
            file: None,
            entries: Vec::new(),
            project_type: None,
            error: Some("failed to read file: not found".to_string()),
        };

        let prompt = build_plan_prompt("goal", &context, 5);
        assert!(prompt.contains("Context note"));
        assert!(prompt.contains("not found"));
    }
}
