use anyhow::Result;
use cadence_domain::history::{EntryStatus, HistoryEntry};
use cadence_domain::occurrence::TaskOccurrence;
use cadence_domain::recurrence::{RecurrenceRule, Weekday};
use cadence_domain::stores::{HistoryStore, OneOffStore, RecurringStore};
use cadence_domain::task::{OneOffDraft, RecurringDraft, TaskCategory};
use cadence_store::{DataPaths, HistoryDb, OneOffDb, RecurringDb};
use chrono::{Duration, Utc};
use tracing::info;

/// Populate an empty dev database with a recognizable dataset: a couple of
/// recurring tasks and two one-offs, one of them already past due. Runs only
/// when the recurring table is empty so restarts never duplicate rows.
pub fn seed_dev_data(paths: &DataPaths) -> Result<()> {
    let recurring = RecurringDb::new(paths.clone());
    if !recurring.list()?.is_empty() {
        return Ok(());
    }
    info!("seeding dev data");

    recurring.create(RecurringDraft {
        title: "Inbox zero".to_string(),
        category: TaskCategory::Operational,
        pipeline: "admin".to_string(),
        pillar: "mental_clarity".to_string(),
        recurrence: RecurrenceRule::Daily,
        time_block: Some("morning".to_string()),
        priority: Some(3),
        context: None,
        notes: None,
    })?;
    recurring.create(RecurringDraft {
        title: "Weekly review".to_string(),
        category: TaskCategory::Retrospective,
        pipeline: "planning".to_string(),
        pillar: "mental_clarity".to_string(),
        recurrence: RecurrenceRule::Weekly {
            days: Some(vec![Weekday::Sun]),
        },
        time_block: None,
        priority: Some(4),
        context: None,
        notes: Some("Look over the week's log before planning".to_string()),
    })?;

    let one_offs = OneOffDb::new(paths.clone());
    let today = Utc::now().date_naive();
    one_offs.create(OneOffDraft {
        title: "Renew passport".to_string(),
        category: TaskCategory::Strategic,
        pipeline: "admin".to_string(),
        pillar: "finances".to_string(),
        scheduled_for: (today - Duration::days(3)).format("%Y-%m-%d").to_string(),
        time_block: None,
        priority: Some(5),
        context: None,
        notes: None,
    })?;
    one_offs.create(OneOffDraft {
        title: "Book dentist".to_string(),
        category: TaskCategory::Operational,
        pipeline: "health".to_string(),
        pillar: "health".to_string(),
        scheduled_for: (today + Duration::days(2)).format("%Y-%m-%d").to_string(),
        time_block: None,
        priority: Some(2),
        context: None,
        notes: None,
    })?;

    // One completion from yesterday so the history view is not empty.
    let yesterday = (today - Duration::days(1)).format("%Y-%m-%d").to_string();
    HistoryDb::new(paths.clone()).append(&[HistoryEntry {
        task_id: Some("recurring-1".to_string()),
        task: "Inbox zero".to_string(),
        subtask_number: 1,
        duration_seconds: 600,
        timestamp: format!("{yesterday}T09:00:00.000Z"),
        status: Some(EntryStatus::Done),
        occurrence_date: Some(yesterday),
    }])?;
    Ok(())
}

/// The single task shown when no source yields anything, so a first run
/// with no configuration still has a list.
pub fn default_occurrence() -> TaskOccurrence {
    TaskOccurrence {
        id: "morning-stretch".to_string(),
        name: "Morning stretch".to_string(),
        pipeline: None,
        pillar: Some("health".to_string()),
        priority: None,
        recurrence: None,
        is_one_off: false,
        one_off_id: None,
        due_date: None,
        subtask_labels: vec![String::new()],
    }
}
