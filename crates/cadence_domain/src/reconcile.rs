use chrono::NaiveDate;

use crate::history::{EntryStatus, HistoryEntry};
use crate::occurrence::TaskOccurrence;

/// Result of one reconciliation pass. `changed` is a content comparison so
/// callers can skip the store write when nothing moved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub entries: Vec<HistoryEntry>,
    pub changed: bool,
}

fn scheduled_placeholder(occurrence: &TaskOccurrence, subtask_number: u32, target_iso: &str) -> HistoryEntry {
    HistoryEntry {
        task_id: Some(occurrence.id.clone()),
        task: occurrence.name.clone(),
        subtask_number,
        duration_seconds: 0,
        timestamp: format!("{target_iso}T00:00:00.000Z"),
        status: Some(EntryStatus::Scheduled),
        occurrence_date: Some(target_iso.to_string()),
    }
}

fn has_non_scheduled_on_date(
    entries: &[HistoryEntry],
    target_date: &str,
    task_id: Option<&str>,
    task_name: &str,
    subtask_number: u32,
) -> bool {
    entries.iter().any(|entry| {
        entry.matches_subtask(task_id, task_name, subtask_number)
            && entry.occurrence_day() == target_date
            && entry.status != Some(EntryStatus::Scheduled)
    })
}

/// Correct the history log for `target_date`: every due sub-occurrence gets
/// a `scheduled` placeholder when no entry exists for it yet, and any
/// placeholder superseded by a real status is dropped. Idempotent — running
/// the pass again over its own output yields the same entry set.
pub fn reconcile_history(
    occurrences: &[TaskOccurrence],
    history: &[HistoryEntry],
    target_date: NaiveDate,
) -> ReconcileOutcome {
    let target_iso = target_date.format("%Y-%m-%d").to_string();
    let mut reconciled: Vec<HistoryEntry> = history.to_vec();

    for occurrence in occurrences {
        for subtask_number in 1..=occurrence.subtask_count() {
            let already = reconciled.iter().any(|entry| {
                entry.matches_subtask(Some(&occurrence.id), &occurrence.name, subtask_number)
                    && entry.occurrence_day() == target_iso
            });
            if !already {
                reconciled.insert(0, scheduled_placeholder(occurrence, subtask_number, &target_iso));
            }
        }
    }

    let snapshot = reconciled.clone();
    reconciled.retain(|entry| {
        entry.status != Some(EntryStatus::Scheduled)
            || !has_non_scheduled_on_date(
                &snapshot,
                entry.occurrence_day(),
                entry.task_id.as_deref(),
                &entry.task,
                entry.subtask_number,
            )
    });

    let changed = reconciled != history;
    ReconcileOutcome {
        entries: reconciled,
        changed,
    }
}
