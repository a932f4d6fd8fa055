use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::recurrence::RecurrenceRule;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TaskCategory {
    Operational,
    Retrospective,
    Strategic,
}

/// Ad-hoc task template loaded from the YAML configuration file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskTemplate {
    pub name: String,
    #[serde(default)]
    pub default_duration_seconds: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtask_labels: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pillar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<RecurrenceRule>,
}

/// A recurring task as persisted by its store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecurringTask {
    pub id: i64,
    pub title: String,
    pub category: TaskCategory,
    pub pipeline: String,
    pub pillar: String,
    pub recurrence: RecurrenceRule,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_block: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: String,
}

/// A one-off task with a single fixed due date.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OneOffTask {
    pub id: i64,
    pub title: String,
    pub category: TaskCategory,
    pub pipeline: String,
    pub pillar: String,
    /// YYYY-MM-DD.
    pub scheduled_for: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_block: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0}: title is required")]
    MissingTitle(&'static str),
    #[error("{0}: pipeline is required")]
    MissingPipeline(&'static str),
    #[error("{0}: pillar is required")]
    MissingPillar(&'static str),
    #[error("{0}: scheduled_for must be in YYYY-MM-DD format")]
    InvalidDate(&'static str),
}

/// Input for creating a recurring task. `normalized` rejects the draft
/// entirely on any failure so a create never partially writes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecurringDraft {
    pub title: String,
    pub category: TaskCategory,
    pub pipeline: String,
    pub pillar: String,
    #[serde(default)]
    pub recurrence: RecurrenceRule,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_block: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl RecurringDraft {
    pub fn normalized(mut self) -> Result<Self, ValidationError> {
        self.title = require_trimmed(&self.title).ok_or(ValidationError::MissingTitle("Recurring"))?;
        self.pipeline =
            require_trimmed(&self.pipeline).ok_or(ValidationError::MissingPipeline("Recurring"))?;
        self.pillar = require_trimmed(&self.pillar).ok_or(ValidationError::MissingPillar("Recurring"))?;
        self.time_block = trim_optional(self.time_block);
        self.context = trim_optional(self.context);
        self.notes = trim_optional(self.notes);
        Ok(self)
    }
}

/// Input for creating a one-off task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OneOffDraft {
    pub title: String,
    pub category: TaskCategory,
    pub pipeline: String,
    pub pillar: String,
    pub scheduled_for: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_block: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl OneOffDraft {
    pub fn normalized(mut self) -> Result<Self, ValidationError> {
        self.title = require_trimmed(&self.title).ok_or(ValidationError::MissingTitle("One-off"))?;
        self.pipeline =
            require_trimmed(&self.pipeline).ok_or(ValidationError::MissingPipeline("One-off"))?;
        self.pillar = require_trimmed(&self.pillar).ok_or(ValidationError::MissingPillar("One-off"))?;
        self.scheduled_for = normalize_date(&self.scheduled_for)
            .ok_or(ValidationError::InvalidDate("One-off"))?;
        self.time_block = trim_optional(self.time_block);
        self.context = trim_optional(self.context);
        self.notes = trim_optional(self.notes);
        Ok(self)
    }
}

fn require_trimmed(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn trim_optional(value: Option<String>) -> Option<String> {
    value.and_then(|v| require_trimmed(&v))
}

fn normalize_date(value: &str) -> Option<String> {
    let trimmed = value.trim();
    chrono::NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").ok()?;
    Some(trimmed.to_string())
}
