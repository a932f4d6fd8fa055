use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::clock::{Clock, SystemClock};
use crate::history::HistoryEntry;
use crate::occurrence::{resolve_due_occurrences, TaskOccurrence};
use crate::overdue::is_occurrence_overdue;
use crate::reconcile::reconcile_history;
use crate::sorting::sort_by_overdue;
use crate::stores::{HistoryStore, OneOffStore, RecurringStore, TemplateSource};
use crate::task::{OneOffDraft, OneOffTask, RecurringDraft, RecurringTask};

/// Facade over the task sources, the history log, and the clock. All
/// scheduling decisions flow through here; store failures are logged and
/// degrade to best-available data so a corrupt or missing store never takes
/// the whole view down.
pub struct TaskService {
    templates: Box<dyn TemplateSource>,
    recurring: Box<dyn RecurringStore>,
    one_offs: Box<dyn OneOffStore>,
    history: Box<dyn HistoryStore>,
    clock: Box<dyn Clock>,
}

#[derive(Default)]
pub struct TaskServiceBuilder {
    templates: Option<Box<dyn TemplateSource>>,
    recurring: Option<Box<dyn RecurringStore>>,
    one_offs: Option<Box<dyn OneOffStore>>,
    history: Option<Box<dyn HistoryStore>>,
    clock: Option<Box<dyn Clock>>,
}

impl TaskServiceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_templates(mut self, source: Box<dyn TemplateSource>) -> Self {
        self.templates = Some(source);
        self
    }

    pub fn with_recurring(mut self, store: Box<dyn RecurringStore>) -> Self {
        self.recurring = Some(store);
        self
    }

    pub fn with_one_offs(mut self, store: Box<dyn OneOffStore>) -> Self {
        self.one_offs = Some(store);
        self
    }

    pub fn with_history(mut self, store: Box<dyn HistoryStore>) -> Self {
        self.history = Some(store);
        self
    }

    pub fn with_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn build(self) -> Result<TaskService> {
        Ok(TaskService {
            templates: self.templates.ok_or_else(|| anyhow!("template source not set"))?,
            recurring: self.recurring.ok_or_else(|| anyhow!("recurring store not set"))?,
            one_offs: self.one_offs.ok_or_else(|| anyhow!("one-off store not set"))?,
            history: self.history.ok_or_else(|| anyhow!("history store not set"))?,
            clock: self.clock.unwrap_or_else(|| Box::new(SystemClock)),
        })
    }
}

impl TaskService {
    pub fn builder() -> TaskServiceBuilder {
        TaskServiceBuilder::new()
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn history(&self) -> Result<Vec<HistoryEntry>> {
        self.history.read()
    }

    pub fn template_version(&self) -> Result<Option<i64>> {
        self.templates.version()
    }

    /// The combined, id-stable occurrence list for a date. Each source
    /// degrades independently: a failed store contributes nothing but does
    /// not block the others.
    pub fn due_occurrences_for(&self, target_date: NaiveDate) -> Vec<TaskOccurrence> {
        let templates = self.templates.load().unwrap_or_else(|err| {
            warn!(%err, "template load failed, continuing without ad-hoc tasks");
            Vec::new()
        });
        let recurring = self.recurring.list().unwrap_or_else(|err| {
            warn!(%err, "recurring list failed, continuing without recurring tasks");
            Vec::new()
        });
        let one_offs = self.one_offs.list().unwrap_or_else(|err| {
            warn!(%err, "one-off list failed, continuing without one-offs");
            Vec::new()
        });
        resolve_due_occurrences(&templates, &recurring, &one_offs, target_date)
    }

    pub fn due_occurrences_today(&self) -> Vec<TaskOccurrence> {
        self.due_occurrences_for(self.clock.today())
    }

    /// Due occurrences in display order: overdue first, then priority, due
    /// date, name. Uses the current history snapshot for overdue checks.
    pub fn sorted_occurrences_for(&self, target_date: NaiveDate) -> Vec<TaskOccurrence> {
        let due = self.due_occurrences_for(target_date);
        let history = self.history.read().unwrap_or_else(|err| {
            warn!(%err, "history read failed, overdue flags unavailable");
            Vec::new()
        });
        let now = self.clock.now();
        sort_by_overdue(&due, &history, true, &|occ, history, _ready| {
            is_occurrence_overdue(occ, history, now)
        })
    }

    /// One reconciliation pass: make sure every due sub-occurrence on the
    /// target date has a history row, drop superseded placeholders, and
    /// persist only when the entry set actually changed.
    pub fn reconcile_scheduled(&self, target_date: Option<NaiveDate>) -> Result<Vec<HistoryEntry>> {
        let target = target_date.unwrap_or_else(|| self.clock.today());
        let history = self.history.read()?;
        let due = self.due_occurrences_for(target);
        let outcome = reconcile_history(&due, &history, target);
        if outcome.changed {
            self.history.replace(&outcome.entries)?;
            debug!(
                date = %target,
                entries = outcome.entries.len(),
                "reconciled scheduled history"
            );
        }
        Ok(outcome.entries)
    }

    pub fn create_one_off(&self, draft: OneOffDraft) -> Result<OneOffTask> {
        let normalized = draft.normalized()?;
        self.one_offs.create(normalized)
    }

    pub fn create_recurring(&self, draft: RecurringDraft) -> Result<RecurringTask> {
        let normalized = draft.normalized()?;
        self.recurring.create(normalized)
    }

    pub fn append_history(&self, entries: &[HistoryEntry]) -> Result<()> {
        self.history.append(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use chrono::{TimeZone, Utc};

    use crate::clock::FixedClock;
    use crate::history::EntryStatus;
    use crate::recurrence::RecurrenceRule;
    use crate::task::{TaskCategory, TaskTemplate};

    #[derive(Default)]
    struct MemoryHistory {
        entries: Mutex<Vec<HistoryEntry>>,
        fail_reads: bool,
    }

    impl HistoryStore for MemoryHistory {
        fn read(&self) -> Result<Vec<HistoryEntry>> {
            if self.fail_reads {
                return Err(anyhow!("disk on fire"));
            }
            Ok(self.entries.lock().unwrap().clone())
        }

        fn append(&self, entries: &[HistoryEntry]) -> Result<()> {
            let mut all = self.entries.lock().unwrap();
            for entry in entries {
                all.insert(0, entry.clone());
            }
            Ok(())
        }

        fn replace(&self, entries: &[HistoryEntry]) -> Result<()> {
            *self.entries.lock().unwrap() = entries.to_vec();
            Ok(())
        }

        fn delete_entry(&self, task: &str, subtask_number: u32, timestamp: &str) -> Result<u64> {
            let mut all = self.entries.lock().unwrap();
            let before = all.len();
            all.retain(|e| {
                !(e.task == task && e.subtask_number == subtask_number && e.timestamp == timestamp)
            });
            Ok((before - all.len()) as u64)
        }
    }

    struct MemoryRecurring(Mutex<Vec<RecurringTask>>);

    impl RecurringStore for MemoryRecurring {
        fn list(&self) -> Result<Vec<RecurringTask>> {
            Ok(self.0.lock().unwrap().clone())
        }

        fn create(&self, draft: RecurringDraft) -> Result<RecurringTask> {
            let mut all = self.0.lock().unwrap();
            let id = all.iter().map(|t| t.id).max().unwrap_or(0) + 1;
            let task = RecurringTask {
                id,
                title: draft.title,
                category: draft.category,
                pipeline: draft.pipeline,
                pillar: draft.pillar,
                recurrence: draft.recurrence,
                time_block: draft.time_block,
                priority: draft.priority,
                context: draft.context,
                notes: draft.notes,
                created_at: "2025-12-25T00:00:00.000Z".to_string(),
            };
            all.push(task.clone());
            Ok(task)
        }

        fn delete(&self, id: i64) -> Result<u64> {
            let mut all = self.0.lock().unwrap();
            let before = all.len();
            all.retain(|t| t.id != id);
            Ok((before - all.len()) as u64)
        }
    }

    struct MemoryOneOffs(Mutex<Vec<OneOffTask>>);

    impl OneOffStore for MemoryOneOffs {
        fn list(&self) -> Result<Vec<OneOffTask>> {
            Ok(self.0.lock().unwrap().clone())
        }

        fn create(&self, draft: OneOffDraft) -> Result<OneOffTask> {
            let mut all = self.0.lock().unwrap();
            let id = all.iter().map(|t| t.id).max().unwrap_or(0) + 1;
            let task = OneOffTask {
                id,
                title: draft.title,
                category: draft.category,
                pipeline: draft.pipeline,
                pillar: draft.pillar,
                scheduled_for: draft.scheduled_for,
                time_block: draft.time_block,
                priority: draft.priority,
                context: draft.context,
                notes: draft.notes,
                created_at: "2025-12-25T00:00:00.000Z".to_string(),
            };
            all.push(task.clone());
            Ok(task)
        }
    }

    struct StaticTemplates(Vec<TaskTemplate>);

    impl TemplateSource for StaticTemplates {
        fn load(&self) -> Result<Vec<TaskTemplate>> {
            Ok(self.0.clone())
        }

        fn version(&self) -> Result<Option<i64>> {
            Ok(None)
        }
    }

    fn service_with(
        templates: Vec<TaskTemplate>,
        recurring: Vec<RecurringTask>,
        one_offs: Vec<OneOffTask>,
    ) -> TaskService {
        let clock = FixedClock(Utc.with_ymd_and_hms(2025, 12, 25, 20, 0, 0).unwrap());
        TaskService::builder()
            .with_templates(Box::new(StaticTemplates(templates)))
            .with_recurring(Box::new(MemoryRecurring(Mutex::new(recurring))))
            .with_one_offs(Box::new(MemoryOneOffs(Mutex::new(one_offs))))
            .with_history(Box::new(MemoryHistory::default()))
            .with_clock(Box::new(clock))
            .build()
            .unwrap()
    }

    fn daily_template(name: &str, priority: u32) -> TaskTemplate {
        TaskTemplate {
            name: name.to_string(),
            default_duration_seconds: 60,
            subtask_labels: None,
            pillar: None,
            priority: Some(priority),
            recurrence: Some(RecurrenceRule::Daily),
        }
    }

    #[test]
    fn builder_requires_all_stores() {
        assert!(TaskService::builder().build().is_err());
    }

    #[test]
    fn reconcile_persists_only_on_change() {
        let service = service_with(vec![daily_template("Stretch", 1)], Vec::new(), Vec::new());
        let first = service.reconcile_scheduled(None).unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].status, Some(EntryStatus::Scheduled));

        let second = service.reconcile_scheduled(None).unwrap();
        assert_eq!(second, first);
    }

    #[test]
    fn reconcile_drops_superseded_placeholder() {
        let service = service_with(vec![daily_template("Stretch", 1)], Vec::new(), Vec::new());
        let seeded = service.reconcile_scheduled(None).unwrap();
        let mut done = seeded[0].clone();
        done.status = Some(EntryStatus::Done);
        done.timestamp = "2025-12-25T09:00:00.000Z".to_string();
        service.append_history(&[done]).unwrap();

        let after = service.reconcile_scheduled(None).unwrap();
        assert_eq!(after.len(), 1);
        assert_eq!(after[0].status, Some(EntryStatus::Done));
    }

    #[test]
    fn reconcile_surfaces_history_read_failure() {
        let clock = FixedClock(Utc.with_ymd_and_hms(2025, 12, 25, 20, 0, 0).unwrap());
        let service = TaskService::builder()
            .with_templates(Box::new(StaticTemplates(Vec::new())))
            .with_recurring(Box::new(MemoryRecurring(Mutex::new(Vec::new()))))
            .with_one_offs(Box::new(MemoryOneOffs(Mutex::new(Vec::new()))))
            .with_history(Box::new(MemoryHistory {
                entries: Mutex::new(Vec::new()),
                fail_reads: true,
            }))
            .with_clock(Box::new(clock))
            .build()
            .unwrap();
        assert!(service.reconcile_scheduled(None).is_err());
        // Listing still works; overdue flags just degrade.
        assert!(service.sorted_occurrences_for(service.clock().today()).is_empty());
    }

    #[test]
    fn sorted_occurrences_surface_overdue_one_off_first() {
        let one_off = OneOffTask {
            id: 1,
            title: "File taxes".to_string(),
            category: TaskCategory::Operational,
            pipeline: "finances".to_string(),
            pillar: "finances".to_string(),
            scheduled_for: "2025-12-20".to_string(),
            time_block: None,
            priority: Some(0),
            context: None,
            notes: None,
            created_at: "2025-12-01T00:00:00.000Z".to_string(),
        };
        let service = service_with(
            vec![daily_template("Deep work", 9)],
            Vec::new(),
            vec![one_off],
        );
        // The daily task was completed today, so only the stale one-off is
        // overdue despite its lower priority.
        let due = service.due_occurrences_for(service.clock().today());
        let daily_id = due
            .iter()
            .find(|occ| occ.name == "Deep work")
            .map(|occ| occ.id.clone())
            .unwrap();
        service
            .append_history(&[HistoryEntry {
                task_id: Some(daily_id),
                task: "Deep work".to_string(),
                subtask_number: 1,
                duration_seconds: 1800,
                timestamp: "2025-12-25T10:00:00.000Z".to_string(),
                status: Some(EntryStatus::Done),
                occurrence_date: Some("2025-12-25".to_string()),
            }])
            .unwrap();

        let sorted = service.sorted_occurrences_for(service.clock().today());
        assert_eq!(sorted[0].name, "File taxes");
        assert_eq!(sorted[1].name, "Deep work");
    }

    #[test]
    fn create_one_off_rejects_invalid_draft() {
        let service = service_with(Vec::new(), Vec::new(), Vec::new());
        let draft = OneOffDraft {
            title: String::new(),
            category: TaskCategory::Operational,
            pipeline: "ops".to_string(),
            pillar: "career".to_string(),
            scheduled_for: "2025-12-26".to_string(),
            time_block: None,
            priority: None,
            context: None,
            notes: None,
        };
        assert!(service.create_one_off(draft).is_err());
    }

    #[test]
    fn create_recurring_assigns_store_id() {
        let service = service_with(Vec::new(), Vec::new(), Vec::new());
        let draft = RecurringDraft {
            title: "Weekly review".to_string(),
            category: TaskCategory::Retrospective,
            pipeline: "self_reflection".to_string(),
            pillar: "mental_clarity".to_string(),
            recurrence: RecurrenceRule::Weekly {
                days: Some(vec![crate::recurrence::Weekday::Sun]),
            },
            time_block: None,
            priority: Some(9),
            context: None,
            notes: None,
        };
        let created = service.create_recurring(draft).unwrap();
        assert_eq!(created.id, 1);
    }
}
