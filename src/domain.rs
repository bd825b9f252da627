//! Conceptual entities exposed at the backing service's interface boundary.
//!
//! The core owns none of this data durably — these are thin deserialization
//! targets and validated value objects used by the tool catalog, not a
//! persistence layer. Most tool handlers simply echo the backing service's
//! JSON payload back to the agent (see [`crate::tools`]); the typed structs
//! here exist for the one composite tool (`project_status_summary`) that
//! needs to read specific fields rather than pass a payload through.

use serde::{Deserialize, Serialize};

use crate::error::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub priority: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub id: String,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub project_id: String,
    pub title: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub priority: String,
    #[serde(default, rename = "type")]
    pub issue_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub decision_type: Option<String>,
    #[serde(default)]
    pub rationale: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Initiative {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub entity_type: String,
    pub entity_id: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkLogEntry {
    pub id: String,
    pub issue_id: String,
    pub summary: String,
    #[serde(default)]
    pub hours: Option<f64>,
}

/// Issue type enum closed over the four values the tool catalog accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueType {
    Task,
    Bug,
    Feature,
    Improvement,
}

impl IssueType {
    pub fn parse(s: &str) -> crate::error::Result<Self> {
        match s {
            "task" => Ok(IssueType::Task),
            "bug" => Ok(IssueType::Bug),
            "feature" => Ok(IssueType::Feature),
            "improvement" => Ok(IssueType::Improvement),
            other => Err(Error::validation(format!(
                "type must be one of task, bug, feature, improvement (got '{other}')"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IssueType::Task => "task",
            IssueType::Bug => "bug",
            IssueType::Feature => "feature",
            IssueType::Improvement => "improvement",
        }
    }
}

/// Priority enum closed over the four values the tool catalog accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn parse(s: &str) -> crate::error::Result<Self> {
        match s {
            "critical" => Ok(Priority::Critical),
            "high" => Ok(Priority::High),
            "medium" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            other => Err(Error::validation(format!(
                "priority must be one of critical, high, medium, low (got '{other}')"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Critical => "critical",
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }

    pub fn is_high_priority(&self) -> bool {
        matches!(self, Priority::Critical | Priority::High)
    }
}

/// A validated, non-empty identifier. Used for `project_id`, `issue_id`,
/// and similar required string fields across tool input validation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NonEmptyId(String);

impl NonEmptyId {
    pub fn new(field: &str, value: impl Into<String>) -> crate::error::Result<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(Error::validation(format!("{field} must not be empty")));
        }
        Ok(NonEmptyId(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

/// A validated bounded string, used for `title`/`content`/`summary` fields
/// that the backing service caps at a maximum length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundedText(String);

impl BoundedText {
    pub fn new(field: &str, value: impl Into<String>, max_len: usize) -> crate::error::Result<Self> {
        let value = value.into();
        if value.is_empty() {
            return Err(Error::validation(format!("{field} must not be empty")));
        }
        if value.chars().count() > max_len {
            return Err(Error::validation(format!(
                "{field} must be at most {max_len} characters (got {})",
                value.chars().count()
            )));
        }
        Ok(BoundedText(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

/// A validated limit parameter, clamped to the 1..=100 range the backing
/// service's list endpoints accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListLimit(u32);

impl ListLimit {
    pub fn new(value: u32) -> crate::error::Result<Self> {
        if !(1..=100).contains(&value) {
            return Err(Error::validation(format!(
                "limit must be between 1 and 100 (got {value})"
            )));
        }
        Ok(ListLimit(value))
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

/// A validated non-negative hours value, used by `log_work`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NonNegativeHours(f64);

impl NonNegativeHours {
    pub fn new(value: f64) -> crate::error::Result<Self> {
        if value < 0.0 {
            return Err(Error::validation(format!(
                "hours must be >= 0 (got {value})"
            )));
        }
        Ok(NonNegativeHours(value))
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_type_parses_known_values_and_rejects_others() {
        assert_eq!(IssueType::parse("bug").unwrap().as_str(), "bug");
        assert!(IssueType::parse("epic").is_err());
    }

    #[test]
    fn priority_high_priority_classification() {
        assert!(Priority::parse("critical").unwrap().is_high_priority());
        assert!(Priority::parse("high").unwrap().is_high_priority());
        assert!(!Priority::parse("medium").unwrap().is_high_priority());
        assert!(!Priority::parse("low").unwrap().is_high_priority());
    }

    #[test]
    fn non_empty_id_rejects_blank_input() {
        assert!(NonEmptyId::new("project_id", "").is_err());
        assert!(NonEmptyId::new("project_id", "   ").is_err());
        assert!(NonEmptyId::new("project_id", "abc").is_ok());
    }

    #[test]
    fn bounded_text_enforces_max_length() {
        assert!(BoundedText::new("title", "ok", 500).is_ok());
        assert!(BoundedText::new("title", "", 500).is_err());
        let long = "x".repeat(501);
        assert!(BoundedText::new("title", long, 500).is_err());
    }

    #[test]
    fn list_limit_clamps_to_valid_range() {
        assert!(ListLimit::new(0).is_err());
        assert!(ListLimit::new(1).is_ok());
        assert!(ListLimit::new(100).is_ok());
        assert!(ListLimit::new(101).is_err());
    }

    #[test]
    fn non_negative_hours_rejects_negative() {
        assert!(NonNegativeHours::new(-0.1).is_err());
        assert!(NonNegativeHours::new(0.0).is_ok());
    }
}
