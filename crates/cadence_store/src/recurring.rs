use anyhow::Result;
use chrono::Utc;
use rusqlite::{params, Connection, Row};
use tracing::warn;

use cadence_domain::recurrence::{RecurrenceRule, Weekday};
use cadence_domain::stores::RecurringStore;
use cadence_domain::task::{RecurringDraft, RecurringTask, TaskCategory};

use crate::db::{open_db, read_json_list, write_json_list};
use crate::paths::DataPaths;

const JSON_FILE: &str = "recurring.json";

const CREATE_RECURRING: &str = r#"
    CREATE TABLE IF NOT EXISTS recurring_tasks (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        category TEXT NOT NULL,
        pipeline TEXT NOT NULL,
        pillar TEXT NOT NULL,
        recurrence_frequency TEXT NOT NULL,
        recurrence_days TEXT,
        recurrence_day_of_month INTEGER,
        recurrence_month INTEGER,
        recurrence_day INTEGER,
        time_block TEXT,
        priority INTEGER,
        context TEXT,
        notes TEXT,
        created_at TEXT NOT NULL
    )
"#;

/// Recurring task catalogue. The recurrence rule is stored flattened into
/// per-frequency columns so rows stay inspectable with plain SQL.
pub struct RecurringDb {
    paths: DataPaths,
}

impl RecurringDb {
    pub fn new(paths: DataPaths) -> Self {
        Self { paths }
    }

    fn open(&self) -> Result<Connection> {
        let conn = open_db(&self.paths)?;
        conn.execute(CREATE_RECURRING, [])?;
        Ok(conn)
    }

    fn list_db(&self) -> Result<Vec<RecurringTask>> {
        let conn = self.open()?;
        let mut stmt = conn.prepare(
            "SELECT id, title, category, pipeline, pillar,
                    recurrence_frequency, recurrence_days, recurrence_day_of_month,
                    recurrence_month, recurrence_day,
                    time_block, priority, context, notes, created_at
             FROM recurring_tasks ORDER BY id",
        )?;
        let rows = stmt.query_map([], row_to_task)?;
        let mut tasks = Vec::new();
        for row in rows {
            tasks.push(row?);
        }
        Ok(tasks)
    }

    fn create_db(&self, draft: &RecurringDraft) -> Result<RecurringTask> {
        let conn = self.open()?;
        let created_at = now_iso();
        let (frequency, days, day_of_month, month, day) = flatten_rule(&draft.recurrence);
        conn.execute(
            "INSERT INTO recurring_tasks
                (title, category, pipeline, pillar,
                 recurrence_frequency, recurrence_days, recurrence_day_of_month,
                 recurrence_month, recurrence_day,
                 time_block, priority, context, notes, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                draft.title,
                category_str(draft.category),
                draft.pipeline,
                draft.pillar,
                frequency,
                days,
                day_of_month,
                month,
                day,
                draft.time_block,
                draft.priority,
                draft.context,
                draft.notes,
                created_at,
            ],
        )?;
        Ok(task_from_draft(conn.last_insert_rowid(), draft, created_at))
    }

    fn delete_db(&self, id: i64) -> Result<u64> {
        let conn = self.open()?;
        let changed = conn.execute("DELETE FROM recurring_tasks WHERE id = ?1", params![id])?;
        Ok(changed as u64)
    }

    fn read_json(&self) -> Vec<RecurringTask> {
        read_json_list(&self.paths, JSON_FILE).unwrap_or_else(|err| {
            warn!(%err, "recurring JSON read failed");
            Vec::new()
        })
    }
}

impl RecurringStore for RecurringDb {
    fn list(&self) -> Result<Vec<RecurringTask>> {
        match self.list_db() {
            Ok(tasks) => Ok(tasks),
            Err(err) => {
                warn!(%err, "recurring db read failed, using JSON fallback");
                Ok(self.read_json())
            }
        }
    }

    fn create(&self, draft: RecurringDraft) -> Result<RecurringTask> {
        match self.create_db(&draft) {
            Ok(task) => Ok(task),
            Err(err) => {
                warn!(%err, "recurring db create failed, using JSON fallback");
                let mut all = self.read_json();
                let next_id = all.iter().map(|t| t.id).max().unwrap_or(0) + 1;
                let task = task_from_draft(next_id, &draft, now_iso());
                all.push(task.clone());
                write_json_list(&self.paths, JSON_FILE, &all)?;
                Ok(task)
            }
        }
    }

    fn delete(&self, id: i64) -> Result<u64> {
        match self.delete_db(id) {
            Ok(changed) => Ok(changed),
            Err(err) => {
                warn!(%err, "recurring db delete failed, using JSON fallback");
                let all = self.read_json();
                let kept: Vec<RecurringTask> = all.iter().filter(|t| t.id != id).cloned().collect();
                let removed = (all.len() - kept.len()) as u64;
                write_json_list(&self.paths, JSON_FILE, &kept)?;
                Ok(removed)
            }
        }
    }
}

fn now_iso() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

fn task_from_draft(id: i64, draft: &RecurringDraft, created_at: String) -> RecurringTask {
    RecurringTask {
        id,
        title: draft.title.clone(),
        category: draft.category,
        pipeline: draft.pipeline.clone(),
        pillar: draft.pillar.clone(),
        recurrence: draft.recurrence.clone(),
        time_block: draft.time_block.clone(),
        priority: draft.priority,
        context: draft.context.clone(),
        notes: draft.notes.clone(),
        created_at,
    }
}

fn category_str(category: TaskCategory) -> &'static str {
    match category {
        TaskCategory::Operational => "operational",
        TaskCategory::Retrospective => "retrospective",
        TaskCategory::Strategic => "strategic",
    }
}

fn parse_category(value: &str) -> TaskCategory {
    match value {
        "retrospective" => TaskCategory::Retrospective,
        "strategic" => TaskCategory::Strategic,
        _ => TaskCategory::Operational,
    }
}

/// Column form of a rule: (frequency, days JSON, day_of_month, month, day).
fn flatten_rule(rule: &RecurrenceRule) -> (&'static str, Option<String>, Option<u32>, Option<u32>, Option<u32>) {
    match rule {
        RecurrenceRule::Daily => ("daily", None, None, None, None),
        RecurrenceRule::Weekly { days } => {
            let encoded = days
                .as_ref()
                .and_then(|d| serde_json::to_string(d).ok());
            ("weekly", encoded, None, None, None)
        }
        RecurrenceRule::Monthly { day_of_month } => ("monthly", None, *day_of_month, None, None),
        RecurrenceRule::Yearly { month, day } => ("yearly", None, None, *month, *day),
    }
}

/// Rebuild a rule from its columns. Unknown frequencies collapse to daily
/// so a hand-edited row never breaks scheduling.
fn unflatten_rule(
    frequency: &str,
    days: Option<String>,
    day_of_month: Option<u32>,
    month: Option<u32>,
    day: Option<u32>,
) -> RecurrenceRule {
    match frequency {
        "weekly" => RecurrenceRule::Weekly {
            days: days.and_then(|raw| serde_json::from_str::<Vec<Weekday>>(&raw).ok()),
        },
        "monthly" => RecurrenceRule::Monthly { day_of_month },
        "yearly" => RecurrenceRule::Yearly { month, day },
        _ => RecurrenceRule::Daily,
    }
}

fn row_to_task(row: &Row<'_>) -> rusqlite::Result<RecurringTask> {
    let frequency: String = row.get(5)?;
    let recurrence = unflatten_rule(
        &frequency,
        row.get(6)?,
        row.get(7)?,
        row.get(8)?,
        row.get(9)?,
    );
    Ok(RecurringTask {
        id: row.get(0)?,
        title: row.get(1)?,
        category: parse_category(&row.get::<_, String>(2)?),
        pipeline: row.get(3)?,
        pillar: row.get(4)?,
        recurrence,
        time_block: row.get(10)?,
        priority: row.get(11)?,
        context: row.get(12)?,
        notes: row.get(13)?,
        created_at: row.get(14)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(title: &str, recurrence: RecurrenceRule) -> RecurringDraft {
        RecurringDraft {
            title: title.to_string(),
            category: TaskCategory::Operational,
            pipeline: "maintenance".to_string(),
            pillar: "health".to_string(),
            recurrence,
            time_block: None,
            priority: Some(3),
            context: None,
            notes: None,
        }
    }

    #[test]
    fn create_assigns_ids_and_round_trips_rules() {
        let temp = tempfile::tempdir().unwrap();
        let store = RecurringDb::new(DataPaths::in_dir(temp.path()));

        let daily = store.create(draft("Stretch", RecurrenceRule::Daily)).unwrap();
        let weekly = store
            .create(draft(
                "Weekly review",
                RecurrenceRule::Weekly {
                    days: Some(vec![Weekday::Mon, Weekday::Thu]),
                },
            ))
            .unwrap();
        assert_eq!(daily.id, 1);
        assert_eq!(weekly.id, 2);

        let all = store.list().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].recurrence, RecurrenceRule::Daily);
        assert_eq!(
            all[1].recurrence,
            RecurrenceRule::Weekly {
                days: Some(vec![Weekday::Mon, Weekday::Thu]),
            }
        );
    }

    #[test]
    fn monthly_and_yearly_columns_round_trip() {
        let temp = tempfile::tempdir().unwrap();
        let store = RecurringDb::new(DataPaths::in_dir(temp.path()));
        store
            .create(draft("Pay rent", RecurrenceRule::Monthly { day_of_month: Some(1) }))
            .unwrap();
        store
            .create(draft(
                "Renew insurance",
                RecurrenceRule::Yearly {
                    month: Some(3),
                    day: Some(31),
                },
            ))
            .unwrap();

        let all = store.list().unwrap();
        assert_eq!(all[0].recurrence, RecurrenceRule::Monthly { day_of_month: Some(1) });
        assert_eq!(
            all[1].recurrence,
            RecurrenceRule::Yearly {
                month: Some(3),
                day: Some(31),
            }
        );
    }

    #[test]
    fn delete_reports_removed_rows() {
        let temp = tempfile::tempdir().unwrap();
        let store = RecurringDb::new(DataPaths::in_dir(temp.path()));
        let task = store.create(draft("Stretch", RecurrenceRule::Daily)).unwrap();
        assert_eq!(store.delete(task.id).unwrap(), 1);
        assert_eq!(store.delete(task.id).unwrap(), 0);
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn unknown_frequency_falls_back_to_daily() {
        let rule = unflatten_rule("fortnightly", None, None, None, None);
        assert_eq!(rule, RecurrenceRule::Daily);
    }
}
