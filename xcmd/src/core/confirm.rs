//! Confirmation policy: risk classification and answer parsing.

use std::fmt;

/// How dangerous an exec step claims to be.
///
/// Parsed permissively: anything that does not start with `medium` or `high`
/// (case-insensitive) is treated as low risk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn parse(raw: &str) -> Self {
        let lowered = raw.trim().to_ascii_lowercase();
        if lowered.starts_with("high") {
            RiskLevel::High
        } else if lowered.starts_with("medium") {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    /// Medium and high risk require an explicit "yes".
    pub fn is_elevated(self) -> bool {
        self >= RiskLevel::Medium
    }

    pub fn default_answer(self) -> DefaultAnswer {
        if self.is_elevated() {
            DefaultAnswer::No
        } else {
            DefaultAnswer::Yes
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an empty answer means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultAnswer {
    Yes,
    No,
}

impl DefaultAnswer {
    pub fn hint(self) -> &'static str {
        match self {
            DefaultAnswer::Yes => "[Y/n]",
            DefaultAnswer::No => "[y/N]",
        }
    }
}

/// Decide whether a typed answer approves the action.
pub fn accepts(response: &str, default: DefaultAnswer) -> bool {
    let answer = response.trim().to_ascii_lowercase();
    match default {
        DefaultAnswer::Yes => !matches!(answer.as_str(), "n" | "no"),
        DefaultAnswer::No => matches!(answer.as_str(), "y" | "yes"),
    }
}

/// Approval rule for agent-issued shell commands: empty, `y`, or `yes`.
pub fn approves_tool_call(response: &str) -> bool {
    matches!(response.trim().to_ascii_lowercase().as_str(), "" | "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn risk_parses_by_case_insensitive_prefix() {
        assert_eq!(RiskLevel::parse("HIGH - deletes files"), RiskLevel::High);
        assert_eq!(RiskLevel::parse("Medium"), RiskLevel::Medium);
        assert_eq!(RiskLevel::parse("low"), RiskLevel::Low);
        assert_eq!(RiskLevel::parse(""), RiskLevel::Low);
        assert_eq!(RiskLevel::parse("catastrophic"), RiskLevel::Low);
    }

    #[test]
    fn elevated_risk_defaults_to_no() {
        assert_eq!(RiskLevel::High.default_answer(), DefaultAnswer::No);
        assert_eq!(RiskLevel::Medium.default_answer(), DefaultAnswer::No);
        assert_eq!(RiskLevel::Low.default_answer(), DefaultAnswer::Yes);
    }

    #[test]
    fn default_yes_rejects_only_explicit_no() {
        assert!(accepts("", DefaultAnswer::Yes));
        assert!(accepts("y", DefaultAnswer::Yes));
        assert!(accepts("whatever", DefaultAnswer::Yes));
        assert!(!accepts("n", DefaultAnswer::Yes));
        assert!(!accepts(" No \n", DefaultAnswer::Yes));
    }

    #[test]
    fn default_no_accepts_only_explicit_yes() {
        assert!(!accepts("", DefaultAnswer::No));
        assert!(!accepts("n", DefaultAnswer::No));
        assert!(!accepts("sure", DefaultAnswer::No));
        assert!(accepts("y", DefaultAnswer::No));
        assert!(accepts("YES\n", DefaultAnswer::No));
    }

    #[test]
    fn tool_calls_need_empty_or_yes() {
        assert!(approves_tool_call(""));
        assert!(approves_tool_call(" Y "));
        assert!(approves_tool_call("yes"));
        assert!(!approves_tool_call("n"));
        assert!(!approves_tool_call("maybe"));
    }
}
