//! Terminal command validation, risk classification, and execution.
//!
//! Validation is a pure gate; classification is an ordered tier table; the
//! executor runs `sh -c` with a hard timeout and bounded output, mirroring
//! every invocation to the audit sink.

mod executor;
mod rules;

pub use executor::{CommandResult, TerminalCommand, TerminalExecutor};
pub use rules::{
    MAX_COMMAND_LEN, RiskLevel, Validation, assess_command_risk, validate_command,
    validate_command_with_limit,
};
