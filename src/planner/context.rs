//! Workspace context gathering for plan prompts.
//!
//! Read failures never abort planning; they degrade into an error
//! annotation inside the context so the prompt (or fallback) still carries
//! whatever was learned.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, warn};

use crate::filecache::{FileContextTracker, ReadWindow};

/// Breadth of a plan request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanScope {
    File,
    Folder,
    Repository,
}

impl std::fmt::Display for PlanScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File => write!(f, "file"),
            Self::Folder => write!(f, "folder"),
            Self::Repository => write!(f, "repository"),
        }
    }
}

/// Project flavor inferred from the manifest's declared dependencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectType {
    React,
    Angular,
    Vue,
    Svelte,
    Next,
    Nuxt,
    Express,
    Unknown,
}

impl ProjectType {
    /// Meta-frameworks are checked before the frameworks they embed, so a
    /// Next app is not misread as plain React.
    fn from_dependency_names(deps: &[&str]) -> Self {
        let has = |name: &str| deps.contains(&name);
        if has("next") {
            Self::Next
        } else if has("nuxt") {
            Self::Nuxt
        } else if has("@angular/core") {
            Self::Angular
        } else if has("svelte") {
            Self::Svelte
        } else if has("vue") {
            Self::Vue
        } else if has("react") {
            Self::React
        } else if has("express") {
            Self::Express
        } else {
            Self::Unknown
        }
    }
}

impl std::fmt::Display for ProjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::React => write!(f, "react"),
            Self::Angular => write!(f, "angular"),
            Self::Vue => write!(f, "vue"),
            Self::Svelte => write!(f, "svelte"),
            Self::Next => write!(f, "next"),
            Self::Nuxt => write!(f, "nuxt"),
            Self::Express => write!(f, "express"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileContext {
    pub content: String,
    pub extension: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    File,
    Directory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirEntryInfo {
    pub name: String,
    pub kind: EntryKind,
}

/// Everything the planner learned about the target before prompting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceContext {
    pub scope: PlanScope,
    pub target: PathBuf,
    pub file: Option<FileContext>,
    pub entries: Vec<DirEntryInfo>,
    pub project_type: Option<ProjectType>,
    /// Read failure captured as data rather than thrown.
    pub error: Option<String>,
}

impl WorkspaceContext {
    fn empty(scope: PlanScope, target: &Path) -> Self {
        Self {
            scope,
            target: target.to_path_buf(),
            file: None,
            entries: Vec::new(),
            project_type: None,
            error: None,
        }
    }
}

/// Build the context object for one plan request. The read cache is
/// consulted before every file read and updated after every successful one.
pub async fn build_context(
    scope: PlanScope,
    target: &Path,
    tracker: &FileContextTracker,
) -> WorkspaceContext {
    let mut context = WorkspaceContext::empty(scope, target);

    match scope {
        PlanScope::File => match read_cached(target, tracker).await {
            Ok(content) => {
                let extension = target
                    .extension()
                    .map(|e| e.to_string_lossy().to_string())
                    .unwrap_or_default();
                context.file = Some(FileContext { content, extension });
            }
            Err(e) => {
                warn!(target = %target.display(), error = %e, "File context read failed, degrading");
                context.error = Some(format!("failed to read file: {}", e));
            }
        },
        PlanScope::Folder => match fs::read_dir(target).await {
            Ok(mut dir) => {
                loop {
                    match dir.next_entry().await {
                        Ok(Some(entry)) => {
                            let kind = match entry.file_type().await {
                                Ok(ft) if ft.is_dir() => EntryKind::Directory,
                                _ => EntryKind::File,
                            };
                            context.entries.push(DirEntryInfo {
                                name: entry.file_name().to_string_lossy().to_string(),
                                kind,
                            });
                        }
                        Ok(None) => break,
                        Err(e) => {
                            // Partial listing; keep what was gathered and
                            // annotate the failure like the initial error.
                            warn!(target = %target.display(), error = %e, "Folder listing interrupted, degrading");
                            context.error = Some(format!("failed to list folder: {}", e));
                            break;
                        }
                    }
                }
                context.entries.sort_by(|a, b| a.name.cmp(&b.name));
            }
            Err(e) => {
                warn!(target = %target.display(), error = %e, "Folder listing failed, degrading");
                context.error = Some(format!("failed to list folder: {}", e));
            }
        },
        PlanScope::Repository => {
            let manifest_path = target.join("package.json");
            match read_cached(&manifest_path, tracker).await {
                Ok(manifest) => match infer_project_type(&manifest) {
                    Ok(project_type) => {
                        debug!(%project_type, "Inferred project type from manifest");
                        context.project_type = Some(project_type);
                    }
                    Err(e) => {
                        context.project_type = Some(ProjectType::Unknown);
                        context.error = Some(format!("failed to parse manifest: {}", e));
                    }
                },
                Err(e) => {
                    context.project_type = Some(ProjectType::Unknown);
                    context.error = Some(format!("failed to read manifest: {}", e));
                }
            }
        }
    }

    context
}

async fn read_cached(path: &Path, tracker: &FileContextTracker) -> std::io::Result<String> {
    let decision = tracker.should_read_file(path, ReadWindow::full());
    if let Some(cached) = decision.cached_content {
        return Ok(cached);
    }

    let content = fs::read_to_string(path).await?;
    tracker.cache_file_content(path, &content, ReadWindow::full());
    Ok(content)
}

fn infer_project_type(manifest: &str) -> serde_json::Result<ProjectType> {
    let value: serde_json::Value = serde_json::from_str(manifest)?;

    let mut names: Vec<&str> = Vec::new();
    for section in ["dependencies", "devDependencies"] {
        if let Some(deps) = value.get(section).and_then(|d| d.as_object()) {
            names.extend(deps.keys().map(|k| k.as_str()));
        }
    }

    Ok(ProjectType::from_dependency_names(&names))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FileCacheConfig;
    use std::fs as std_fs;
    use tempfile::tempdir;

    fn tracker() -> FileContextTracker {
        FileContextTracker::new(FileCacheConfig::default())
    }

    #[tokio::test]
    async fn file_scope_embeds_content_and_extension() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("app.tsx");
        std_fs::write(&path, "export default App;").unwrap();

        let context = build_context(PlanScope::File, &path, &tracker()).await;
        let file = context.file.unwrap();
        assert_eq!(file.content, "export default App;");
        assert_eq!(file.extension, "tsx");
        assert!(context.error.is_none());
    }

    #[tokio::test]
    async fn file_read_failure_degrades_to_error_field() {
        let context =
            build_context(PlanScope::File, Path::new("/nonexistent/a.ts"), &tracker()).await;
        assert!(context.file.is_none());
        assert!(context.error.unwrap().contains("failed to read file"));
    }

    #[tokio::test]
    async fn folder_scope_lists_entries() {
        let dir = tempdir().unwrap();
        std_fs::write(dir.path().join("a.ts"), "").unwrap();
        std_fs::create_dir(dir.path().join("sub")).unwrap();

        let context = build_context(PlanScope::Folder, dir.path(), &tracker()).await;
        assert_eq!(context.entries.len(), 2);
        assert_eq!(context.entries[0].name, "a.ts");
        assert_eq!(context.entries[0].kind, EntryKind::File);
        assert_eq!(context.entries[1].kind, EntryKind::Directory);
    }

    #[tokio::test]
    async fn folder_listing_failure_degrades_to_error_field() {
        let context =
            build_context(PlanScope::Folder, Path::new("/nonexistent/dir"), &tracker()).await;
        assert!(context.entries.is_empty());
        assert!(context.error.unwrap().contains("failed to list folder"));
    }

    #[tokio::test]
    async fn repository_scope_infers_project_type() {
        let dir = tempdir().unwrap();
        std_fs::write(
            dir.path().join("package.json"),
            r#"{"dependencies": {"react": "^18.0.0", "react-dom": "^18.0.0"}}"#,
        )
        .unwrap();

        let context = build_context(PlanScope::Repository, dir.path(), &tracker()).await;
        assert_eq!(context.project_type, Some(ProjectType::React));
    }

    #[tokio::test]
    async fn meta_framework_wins_over_base_framework() {
        let dir = tempdir().unwrap();
        std_fs::write(
            dir.path().join("package.json"),
            r#"{"dependencies": {"next": "14.0.0", "react": "^18.0.0"}}"#,
        )
        .unwrap();

        let context = build_context(PlanScope::Repository, dir.path(), &tracker()).await;
        assert_eq!(context.project_type, Some(ProjectType::Next));
    }

    #[tokio::test]
    async fn missing_manifest_degrades_to_unknown() {
        let dir = tempdir().unwrap();
        let context = build_context(PlanScope::Repository, dir.path(), &tracker()).await;
        assert_eq!(context.project_type, Some(ProjectType::Unknown));
        assert!(context.error.unwrap().contains("failed to read manifest"));
    }

    #[tokio::test]
    async fn second_file_read_is_served_from_cache() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("app.ts");
        std_fs::write(&path, "content").unwrap();

        let tracker = tracker();
        build_context(PlanScope::File, &path, &tracker).await;
        assert_eq!(tracker.len(), 1);

        let decision = tracker.should_read_file(&path, ReadWindow::full());
        assert!(!decision.should_read);
    }
}
