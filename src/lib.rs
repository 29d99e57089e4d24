//! Conductor: the execution core of an AI-assisted code migration agent.
//!
//! The crate wires five cooperating engines together:
//! - [`planner`] turns a migration goal into an ordered task plan, using an
//!   AI backend with a deterministic fallback.
//! - [`approval`] suspends execution on a decision until the user responds,
//!   with timeouts and bulk review.
//! - [`terminal`] validates shell commands against deny and risk rules and
//!   executes approved ones with output capture.
//! - [`limiter`] admits AI calls under sliding-window token and request
//!   budgets.
//! - [`filecache`] decides when a file re-read is redundant and serves
//!   cached content instead.

pub mod approval;
pub mod backend;
pub mod config;
pub mod error;
pub mod filecache;
pub mod limiter;
pub mod output;
pub mod planner;
pub mod terminal;

pub use approval::{BulkChoice, BulkOutcome, Decision, DecisionKind, DecisionManager};
pub use backend::{AiBackend, BackendResponse, BackendUsage, estimate_tokens};
pub use config::ConductorConfig;
pub use error::{ConductorError, Result};
pub use filecache::{FileContextTracker, ReadDecision, ReadWindow};
pub use limiter::{Admission, RateLimiter, UsageSnapshot};
pub use output::{ExecutionSink, MemorySink, SharedSink, TracingSink};
pub use planner::{Plan, PlanScope, PlanStatus, Task, TaskPlanner, TaskStatus, TaskType};
pub use terminal::{CommandResult, RiskLevel, TerminalCommand, TerminalExecutor, Validation};
