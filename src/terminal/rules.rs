//! Command validation and risk classification tables.
//!
//! Both checks are ordered first-match-wins rule lists over compiled
//! regexes, kept data-driven so tiers can be extended and tested in
//! isolation. Validation is a pure gate that runs before a command is ever
//! classified or executed; classification is independent of validation.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Default ceiling on raw command length.
pub const MAX_COMMAND_LEN: usize = 500;

/// Outcome of the validation gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    Valid,
    Invalid { reason: String },
}

impl Validation {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

/// Potential-for-harm classification of a shell command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Presentation color for approval dialogs.
    pub fn color(&self) -> &'static str {
        match self {
            Self::Low => "green",
            Self::Medium => "yellow",
            Self::High => "red",
        }
    }

    /// Presentation icon for approval dialogs.
    pub fn icon(&self) -> &'static str {
        match self {
            Self::Low => "✅",
            Self::Medium => "⚠️",
            Self::High => "🚨",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

struct Rule {
    pattern: Regex,
    tag: &'static str,
}

fn rules(table: &[(&'static str, &'static str)]) -> Vec<Rule> {
    table
        .iter()
        .map(|(pattern, tag)| Rule {
            pattern: Regex::new(pattern).expect("invalid rule pattern"),
            tag,
        })
        .collect()
}

fn first_match(rules: &[Rule], command: &str) -> Option<&'static str> {
    rules
        .iter()
        .find(|rule| rule.pattern.is_match(command))
        .map(|rule| rule.tag)
}

/// Catastrophic patterns that are never executed regardless of approval.
static DANGEROUS_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    rules(&[
        (
            r"rm\s+(-[a-zA-Z]+\s+)*(/|/\*)\s*$",
            "recursive root deletion",
        ),
        (r"(?i)\bmkfs(\.[a-z0-9]+)?\b", "disk formatting"),
        (r"(?i)\bdd\b.*\bof=/dev/", "raw device write"),
        (r">\s*/dev/(sd|hd|nvme)", "raw device write"),
        (r":\(\)\s*\{\s*:\s*\|\s*:\s*&\s*\}\s*;\s*:", "fork bomb"),
    ])
});

/// Shell metacharacters associated with injection.
static INJECTION_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    rules(&[
        (r"[;&|]", "shell metacharacter"),
        (r"`", "backtick substitution"),
        (r"\$\(", "command substitution"),
        (r"\$\{", "variable expansion"),
    ])
});

static HIGH_RISK_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    rules(&[
        (r"(?i)(^|\s)sudo\b", "privilege escalation"),
        (r"(?i)(^|\s)su\b", "privilege escalation"),
        (r"rm\s+(-[a-zA-Z]*[rR][a-zA-Z]*[fF]|-[a-zA-Z]*[fF][a-zA-Z]*[rR])\b", "forced recursive delete"),
        (r"(?i)\bmkfs\b|\bdd\b|\bformat\b", "destructive disk operation"),
        (r"(?i)\b(shutdown|reboot|halt|poweroff)\b", "power control"),
        (r"(?i)\bdel\s+/[sq]", "recursive delete"),
    ])
});

static MEDIUM_RISK_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    rules(&[
        (r"(?i)npm\s+(install|i)\s+(-g|--global)\b", "global package install"),
        (r"(?i)yarn\s+global\s+add\b", "global package install"),
        (r"(?i)pip3?\s+install\b", "package install"),
        (r"git\s+reset\s+--hard\b", "hard reset"),
        (r"git\s+clean\s+-[a-zA-Z]*f", "forced clean"),
        (r"rm\s+-[a-zA-Z]*r", "recursive delete"),
        (r"rm\s+.*\*", "wildcard delete"),
        (r"(?i)chmod\s+-R\b", "recursive permission change"),
        (r"(?i)chown\s+-R\b", "recursive ownership change"),
    ])
});

/// Pure validation gate: rejects empty, overlong, denylisted, and
/// injection-prone input. Must run before classification or execution.
pub fn validate_command(command: &str) -> Validation {
    validate_command_with_limit(command, MAX_COMMAND_LEN)
}

pub fn validate_command_with_limit(command: &str, max_len: usize) -> Validation {
    let trimmed = command.trim();
    if trimmed.is_empty() {
        return Validation::Invalid {
            reason: "empty command".to_string(),
        };
    }
    if command.len() > max_len {
        return Validation::Invalid {
            reason: format!("command exceeds {} characters", max_len),
        };
    }
    if let Some(tag) = first_match(&DANGEROUS_RULES, trimmed) {
        return Validation::Invalid {
            reason: format!("dangerous pattern: {}", tag),
        };
    }
    if let Some(tag) = first_match(&INJECTION_RULES, trimmed) {
        return Validation::Invalid {
            reason: format!("potential injection: {}", tag),
        };
    }
    Validation::Valid
}

/// Ordered-tier risk classification: high patterns first, then medium,
/// defaulting to low. A command can be valid yet high-risk.
pub fn assess_command_risk(command: &str) -> RiskLevel {
    let trimmed = command.trim();
    if first_match(&HIGH_RISK_RULES, trimmed).is_some() {
        return RiskLevel::High;
    }
    if first_match(&MEDIUM_RISK_RULES, trimmed).is_some() {
        return RiskLevel::Medium;
    }
    RiskLevel::Low
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_command_is_invalid() {
        assert!(!validate_command("").is_valid());
        assert!(!validate_command("   ").is_valid());
    }

    #[test]
    fn recursive_root_deletion_is_rejected() {
        let validation = validate_command("rm -rf /");
        let Validation::Invalid { reason } = validation else {
            panic!("expected invalid");
        };
        assert!(reason.contains("dangerous pattern"), "reason: {}", reason);
    }

    #[test]
    fn denylist_covers_catastrophic_patterns() {
        for cmd in [
            "rm -rf /*",
            "mkfs.ext4 /dev/sda1",
            "dd if=/dev/zero of=/dev/sda",
            "echo x > /dev/sda",
            ":(){ :|:& };:",
        ] {
            assert!(!validate_command(cmd).is_valid(), "should reject: {}", cmd);
        }
    }

    #[test]
    fn injection_metacharacters_are_rejected() {
        for cmd in [
            "ls; rm file",
            "ls && whoami",
            "cat a | grep b",
            "echo `whoami`",
            "echo $(whoami)",
            "echo ${HOME}",
        ] {
            assert!(!validate_command(cmd).is_valid(), "should reject: {}", cmd);
        }
    }

    #[test]
    fn overlong_command_is_rejected() {
        let long = "echo ".to_string() + &"a".repeat(600);
        assert!(!validate_command(&long).is_valid());
    }

    #[test]
    fn ordinary_commands_are_valid() {
        for cmd in ["git status", "npm test", "ls -la", "node --version"] {
            assert!(validate_command(cmd).is_valid(), "should accept: {}", cmd);
        }
    }

    #[test]
    fn high_risk_tier_wins_first() {
        assert_eq!(assess_command_risk("sudo rm -rf /tmp/x"), RiskLevel::High);
        assert_eq!(assess_command_risk("shutdown -h now"), RiskLevel::High);
        assert_eq!(assess_command_risk("rm -rf node_modules"), RiskLevel::High);
    }

    #[test]
    fn medium_risk_tier() {
        assert_eq!(assess_command_risk("npm install -g foo"), RiskLevel::Medium);
        assert_eq!(assess_command_risk("git reset --hard HEAD~1"), RiskLevel::Medium);
        assert_eq!(assess_command_risk("rm -r build"), RiskLevel::Medium);
    }

    #[test]
    fn default_risk_is_low() {
        assert_eq!(assess_command_risk("ls -la"), RiskLevel::Low);
        assert_eq!(assess_command_risk("git status"), RiskLevel::Low);
    }

    #[test]
    fn classification_is_independent_of_validation() {
        // Valid yet high-risk.
        assert!(validate_command("sudo apt upgrade").is_valid());
        assert_eq!(assess_command_risk("sudo apt upgrade"), RiskLevel::High);
    }
}
