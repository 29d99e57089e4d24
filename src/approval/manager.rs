//! Asynchronous approval protocol.
//!
//! Each request parks its caller on a oneshot resolver until an external
//! response arrives or the timeout fires. Two parallel maps keyed by
//! decision id hold the pending decisions (for UI enumeration) and the
//! resolvers (for completion); both are cleared together on every exit path,
//! which makes late or duplicate completion a harmless no-op.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::config::ApprovalConfig;
use crate::error::{ConductorError, Result};
use crate::planner::Task;
use crate::terminal::TerminalCommand;

use super::decision::{Decision, DecisionKind};
use super::ui::{ApprovalPresentation, ApprovalUi, BulkApprovalRequest, BulkChoice};

/// Outcome of a bulk approval round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BulkOutcome {
    ApprovedAll,
    RejectedAll,
    /// Per-task verdicts from individual review, as (task id, approved).
    Individual(Vec<(String, bool)>),
}

pub struct DecisionManager {
    ui: Arc<dyn ApprovalUi>,
    config: ApprovalConfig,
    pending: Mutex<HashMap<String, Decision>>,
    resolvers: Mutex<HashMap<String, oneshot::Sender<bool>>>,
}

impl DecisionManager {
    pub fn new(ui: Arc<dyn ApprovalUi>, config: ApprovalConfig) -> Self {
        Self {
            ui,
            config,
            pending: Mutex::new(HashMap::new()),
            resolvers: Mutex::new(HashMap::new()),
        }
    }

    /// Generic approval path. Never resolves before an external response or
    /// the timeout; timeout and cancellation surface as errors distinguishable
    /// from a genuine `Ok(false)` rejection.
    pub async fn request_approval(
        &self,
        decision: Decision,
        presentation: ApprovalPresentation,
    ) -> Result<bool> {
        let id = decision.id.clone();
        let (tx, rx) = oneshot::channel();

        self.pending.lock().insert(id.clone(), decision.clone());
        self.resolvers.lock().insert(id.clone(), tx);

        self.ui.present(&decision, &presentation).await;
        debug!(decision_id = %id, kind = %decision.kind, "Awaiting approval");

        let timeout = Duration::from_secs(self.config.timeout_secs);
        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(approved)) => {
                info!(decision_id = %id, approved, "Decision resolved");
                Ok(approved)
            }
            Ok(Err(_)) => {
                // Resolver dropped without a send: cancelled at shutdown.
                Err(ConductorError::ApprovalCancelled { decision_id: id })
            }
            Err(_) => {
                self.pending.lock().remove(&id);
                self.resolvers.lock().remove(&id);
                warn!(decision_id = %id, timeout_secs = self.config.timeout_secs, "Approval timed out, rejecting");
                Err(ConductorError::ApprovalTimeout { decision_id: id })
            }
        }
    }

    /// Single completion path for external responses. Stamps the decision,
    /// removes it from both maps, and resolves the waiting caller exactly
    /// once. Unknown or already-resolved ids have no effect.
    pub fn handle_decision_response(&self, decision_id: &str, approved: bool) -> bool {
        let decision = self.pending.lock().remove(decision_id);
        let resolver = self.resolvers.lock().remove(decision_id);

        match (decision, resolver) {
            (Some(mut decision), Some(resolver)) => {
                decision.user_response = Some(approved);
                // Send can only fail if the caller already gave up; the maps
                // are clear either way.
                let _ = resolver.send(approved);
                true
            }
            _ => {
                debug!(decision_id, "Ignoring response for unknown or resolved decision");
                false
            }
        }
    }

    pub async fn request_file_change_approval(&self, task: &Task) -> Result<bool> {
        let decision = Decision::new(
            DecisionKind::FileChanges,
            &task.description,
            task.target.display().to_string(),
        )
        .with_task(&task.id);

        let presentation = ApprovalPresentation::new(
            "Approve file changes",
            format!("{}: {}", task.title, task.target.display()),
        )
        .with_details(vec![task.description.clone()]);

        self.request_approval(decision, presentation).await
    }

    pub async fn request_module_change_approval(&self, task: &Task) -> Result<bool> {
        let decision = Decision::new(
            DecisionKind::ModuleChanges,
            &task.description,
            task.target.display().to_string(),
        )
        .with_task(&task.id);

        let presentation = ApprovalPresentation::new(
            "Approve module changes",
            format!("{}: {}", task.title, task.target.display()),
        )
        .with_details(vec![task.description.clone()]);

        self.request_approval(decision, presentation).await
    }

    /// Command approvals carry the risk presentation; quick-approvable
    /// read-only commands skip the round-trip entirely.
    pub async fn request_terminal_command_approval(&self, cmd: &TerminalCommand) -> Result<bool> {
        if self.is_quick_approvable(&cmd.command) {
            debug!(command = %cmd.command, "Quick-approved read-only command");
            return Ok(true);
        }

        let decision = Decision::new(
            DecisionKind::TerminalCommand,
            &cmd.description,
            cmd.working_dir.display().to_string(),
        )
        .with_changes(&cmd.command);

        let presentation = ApprovalPresentation::new(
            "Approve terminal command",
            cmd.command.clone(),
        )
        .with_details(vec![format!("working directory: {}", cmd.working_dir.display())])
        .with_risk(cmd.risk);

        self.request_approval(decision, presentation).await
    }

    pub async fn request_change_approval(
        &self,
        description: impl Into<String>,
        target: impl Into<String>,
        changes: Option<String>,
    ) -> Result<bool> {
        let description = description.into();
        let mut decision = Decision::new(DecisionKind::Generic, &description, target);
        if let Some(changes) = changes {
            decision = decision.with_changes(changes);
        }

        let presentation = ApprovalPresentation::new("Approve change", description);
        self.request_approval(decision, presentation).await
    }

    /// One three-way choice for a batch of file tasks. Only individual
    /// review falls through to per-task round-trips.
    pub async fn request_bulk_file_approval(&self, tasks: &[Task]) -> Result<BulkOutcome> {
        let request = BulkApprovalRequest {
            title: "Approve planned file changes".to_string(),
            message: format!("{} tasks modify files", tasks.len()),
            task_summaries: tasks
                .iter()
                .map(|t| format!("{}: {}", t.title, t.target.display()))
                .collect(),
        };

        match self.ui.present_bulk(&request).await {
            BulkChoice::ApproveAll => {
                info!(tasks = tasks.len(), "Bulk approval: approve all");
                Ok(BulkOutcome::ApprovedAll)
            }
            BulkChoice::RejectAll => {
                info!(tasks = tasks.len(), "Bulk approval: reject all");
                Ok(BulkOutcome::RejectedAll)
            }
            BulkChoice::ReviewIndividually => {
                let mut verdicts = Vec::with_capacity(tasks.len());
                for task in tasks {
                    let approved = match self.request_file_change_approval(task).await {
                        Ok(approved) => approved,
                        Err(e) => {
                            warn!(task_id = %task.id, error = %e, "Individual approval failed, treating as rejected");
                            false
                        }
                    };
                    verdicts.push((task.id.clone(), approved));
                }
                Ok(BulkOutcome::Individual(verdicts))
            }
        }
    }

    /// Reject every outstanding caller with a cancellation signal and clear
    /// both maps. Used at shutdown so no caller is left hanging.
    pub fn cancel_all_pending_decisions(&self) {
        let pending = std::mem::take(&mut *self.pending.lock());
        let resolvers = std::mem::take(&mut *self.resolvers.lock());
        if !pending.is_empty() {
            info!(count = pending.len(), "Cancelling all pending decisions");
        }
        // Dropping the senders wakes every awaiting caller with a recv error,
        // which request_approval maps to ApprovalCancelled.
        drop(resolvers);
    }

    /// Fixed allow-list of harmless read-only commands exempt from the
    /// approval round-trip.
    pub fn is_quick_approvable(&self, command: &str) -> bool {
        let trimmed = command.trim();
        self.config
            .quick_approve_commands
            .iter()
            .any(|entry| trimmed == entry || trimmed.starts_with(&format!("{} ", entry)))
    }

    /// Snapshot of pending decisions for UI enumeration.
    pub fn pending_decisions(&self) -> Vec<Decision> {
        self.pending.lock().values().cloned().collect()
    }
}
