//! Approval UI boundary.
//!
//! The core pushes presentations to the UI; individual responses come back
//! asynchronously through `DecisionManager::handle_decision_response`. Only
//! bulk mode returns its three-way choice directly.

use async_trait::async_trait;
use tracing::info;

use crate::terminal::RiskLevel;

use super::decision::Decision;

/// Human-readable presentation attached to an approval request.
#[derive(Debug, Clone)]
pub struct ApprovalPresentation {
    pub title: String,
    pub message: String,
    pub details: Vec<String>,
    /// Risk presentation for command requests; None for plain changes.
    pub risk: Option<RiskLevel>,
}

impl ApprovalPresentation {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            details: Vec::new(),
            risk: None,
        }
    }

    pub fn with_details(mut self, details: Vec<String>) -> Self {
        self.details = details;
        self
    }

    pub fn with_risk(mut self, risk: RiskLevel) -> Self {
        self.risk = Some(risk);
        self
    }

    /// Render the request as a console banner for terminal-based UIs.
    pub fn to_banner(&self) -> String {
        let risk = self
            .risk
            .map(|r| format!("║ Risk: {} {} ({})\n", r.icon(), r, r.color()))
            .unwrap_or_default();

        let details = if self.details.is_empty() {
            String::new()
        } else {
            let lines: Vec<String> = self.details.iter().map(|d| format!("║   {}", d)).collect();
            format!("{}\n", lines.join("\n"))
        };

        format!(
            "╔══════════════════════════════════════════════╗\n\
             ║ APPROVAL REQUIRED: {}\n\
             ║ {}\n\
             {}{}╚══════════════════════════════════════════════╝",
            self.title, self.message, risk, details
        )
    }
}

/// Three-way bulk approval choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkChoice {
    ApproveAll,
    RejectAll,
    ReviewIndividually,
}

/// Bulk request summary presented as a single choice.
#[derive(Debug, Clone)]
pub struct BulkApprovalRequest {
    pub title: String,
    pub message: String,
    pub task_summaries: Vec<String>,
}

/// UI surface that renders approval dialogs.
#[async_trait]
pub trait ApprovalUi: Send + Sync {
    /// Show a pending decision. The response arrives later through
    /// `handle_decision_response`, not from this call.
    async fn present(&self, decision: &Decision, presentation: &ApprovalPresentation);

    /// Show a bulk request and return the user's three-way choice.
    async fn present_bulk(&self, request: &BulkApprovalRequest) -> BulkChoice;
}

/// UI that only logs presentations. Suitable for headless runs where an
/// external surface drives `handle_decision_response`.
#[derive(Debug, Default)]
pub struct TracingUi;

#[async_trait]
impl ApprovalUi for TracingUi {
    async fn present(&self, decision: &Decision, presentation: &ApprovalPresentation) {
        info!(
            decision_id = %decision.id,
            kind = %decision.kind,
            title = %presentation.title,
            "Approval requested"
        );
    }

    async fn present_bulk(&self, request: &BulkApprovalRequest) -> BulkChoice {
        info!(tasks = request.task_summaries.len(), "Bulk approval requested, deferring to individual review");
        BulkChoice::ReviewIndividually
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::approval::DecisionKind;

    #[test]
    fn banner_includes_risk_presentation() {
        let presentation = ApprovalPresentation::new("Run command", "npm install left-pad")
            .with_risk(RiskLevel::High)
            .with_details(vec!["cwd: /repo".to_string()]);

        let banner = presentation.to_banner();
        assert!(banner.contains("APPROVAL REQUIRED: Run command"));
        assert!(banner.contains("high"));
        assert!(banner.contains("red"));
        assert!(banner.contains("cwd: /repo"));
    }

    #[tokio::test]
    async fn tracing_ui_defers_bulk_to_individual_review() {
        let ui = TracingUi;
        let request = BulkApprovalRequest {
            title: "t".into(),
            message: "m".into(),
            task_summaries: vec![],
        };
        assert_eq!(ui.present_bulk(&request).await, BulkChoice::ReviewIndividually);
        // present() returns without a response; the manager collects it later.
        let decision = Decision::new(DecisionKind::Generic, "d", "t");
        ui.present(&decision, &ApprovalPresentation::new("a", "b")).await;
    }
}
