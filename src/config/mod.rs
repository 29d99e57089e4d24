//! Configuration for the execution core.
//!
//! One section per engine, all with serde defaults so a partial config file
//! only overrides what it names.

mod settings;

pub use settings::{
    ApprovalConfig, ConductorConfig, FileCacheConfig, PlannerConfig, RateLimitConfig,
    TerminalConfig,
};
