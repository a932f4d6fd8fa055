use anyhow::Result;

use crate::history::HistoryEntry;
use crate::task::{OneOffDraft, OneOffTask, RecurringDraft, RecurringTask, TaskTemplate};

/// Durable history log. Implementations resolve their own failures where
/// possible (fallback files, retries); errors that do surface are logged by
/// the service and degrade to best-available data, never a crash.
pub trait HistoryStore: Send + Sync {
    fn read(&self) -> Result<Vec<HistoryEntry>>;
    fn append(&self, entries: &[HistoryEntry]) -> Result<()>;
    /// Atomic full overwrite; last writer wins.
    fn replace(&self, entries: &[HistoryEntry]) -> Result<()>;
    /// Remove the entry with this exact key, returning how many rows went.
    fn delete_entry(&self, task: &str, subtask_number: u32, timestamp: &str) -> Result<u64>;
}

pub trait RecurringStore: Send + Sync {
    fn list(&self) -> Result<Vec<RecurringTask>>;
    fn create(&self, draft: RecurringDraft) -> Result<RecurringTask>;
    fn delete(&self, id: i64) -> Result<u64>;
}

pub trait OneOffStore: Send + Sync {
    fn list(&self) -> Result<Vec<OneOffTask>>;
    fn create(&self, draft: OneOffDraft) -> Result<OneOffTask>;
}

/// Supplies the ad-hoc template list from external configuration.
pub trait TemplateSource: Send + Sync {
    fn load(&self) -> Result<Vec<TaskTemplate>>;
    /// Opaque modification version (file mtime in milliseconds), if known.
    fn version(&self) -> Result<Option<i64>>;
}
