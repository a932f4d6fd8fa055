use serde::{Deserialize, Serialize};

/// Authoritative state of one sub-occurrence on one calendar day.
///
/// `Scheduled` rows are placeholders written by the reconciler; any entry
/// with another status for the same identity key and day supersedes them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum EntryStatus {
    Scheduled,
    Pending,
    InProgress,
    Done,
    Skipped,
}

impl EntryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryStatus::Scheduled => "scheduled",
            EntryStatus::Pending => "pending",
            EntryStatus::InProgress => "in-progress",
            EntryStatus::Done => "done",
            EntryStatus::Skipped => "skipped",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "scheduled" => Some(EntryStatus::Scheduled),
            "pending" => Some(EntryStatus::Pending),
            "in-progress" => Some(EntryStatus::InProgress),
            "done" => Some(EntryStatus::Done),
            "skipped" => Some(EntryStatus::Skipped),
            _ => None,
        }
    }
}

/// One row of the history log. Field names serialize in camelCase so the
/// JSON fallback files stay readable by earlier versions of the tracker.
/// `status` is absent on legacy rows, which are treated as completions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    pub task: String,
    pub subtask_number: u32,
    pub duration_seconds: u64,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<EntryStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occurrence_date: Option<String>,
}

impl HistoryEntry {
    /// The calendar day this entry belongs to: the explicit occurrence date
    /// when recorded, otherwise the date prefix of the timestamp.
    pub fn occurrence_day(&self) -> &str {
        match &self.occurrence_date {
            Some(date) => date.as_str(),
            None => self.timestamp.get(..10).unwrap_or(""),
        }
    }

    /// Identity match against a task. A persisted id takes precedence over
    /// the display name; the name fallback applies only when no id is given.
    pub fn matches_task(&self, task_id: Option<&str>, task_name: &str) -> bool {
        match task_id {
            Some(id) => self.task_id.as_deref() == Some(id),
            None => !task_name.is_empty() && self.task == task_name,
        }
    }

    pub fn matches_subtask(&self, task_id: Option<&str>, task_name: &str, subtask_number: u32) -> bool {
        self.matches_task(task_id, task_name) && self.subtask_number == subtask_number
    }
}
