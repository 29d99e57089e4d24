//! Approval gating for risky actions.
//!
//! Proposed changes and commands become `Decision`s that suspend their
//! caller until an external response, a timeout, or shutdown cancellation.

mod decision;
mod manager;
mod ui;

pub use decision::{Decision, DecisionKind};
pub use manager::{BulkOutcome, DecisionManager};
pub use ui::{ApprovalPresentation, ApprovalUi, BulkApprovalRequest, BulkChoice, TracingUi};
