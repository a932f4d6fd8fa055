use anyhow::Result;
use chrono::Utc;
use rusqlite::{params, Connection, Row};
use tracing::warn;

use cadence_domain::stores::OneOffStore;
use cadence_domain::task::{OneOffDraft, OneOffTask, TaskCategory};

use crate::db::{open_db, read_json_list, write_json_list};
use crate::paths::DataPaths;

const JSON_FILE: &str = "one_offs.json";

const CREATE_ONE_OFFS: &str = r#"
    CREATE TABLE IF NOT EXISTS one_offs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        category TEXT NOT NULL,
        pipeline TEXT NOT NULL,
        pillar TEXT NOT NULL,
        scheduled_for TEXT NOT NULL,
        time_block TEXT,
        priority INTEGER,
        context TEXT,
        notes TEXT,
        created_at TEXT NOT NULL
    )
"#;

/// One-off task store. Same fail-soft shape as the other stores: SQLite
/// first, JSON fallback on error.
pub struct OneOffDb {
    paths: DataPaths,
}

impl OneOffDb {
    pub fn new(paths: DataPaths) -> Self {
        Self { paths }
    }

    fn open(&self) -> Result<Connection> {
        let conn = open_db(&self.paths)?;
        conn.execute(CREATE_ONE_OFFS, [])?;
        Ok(conn)
    }

    fn list_db(&self) -> Result<Vec<OneOffTask>> {
        let conn = self.open()?;
        let mut stmt = conn.prepare(
            "SELECT id, title, category, pipeline, pillar, scheduled_for,
                    time_block, priority, context, notes, created_at
             FROM one_offs ORDER BY scheduled_for, id",
        )?;
        let rows = stmt.query_map([], row_to_task)?;
        let mut tasks = Vec::new();
        for row in rows {
            tasks.push(row?);
        }
        Ok(tasks)
    }

    fn create_db(&self, draft: &OneOffDraft) -> Result<OneOffTask> {
        let conn = self.open()?;
        let created_at = now_iso();
        conn.execute(
            "INSERT INTO one_offs
                (title, category, pipeline, pillar, scheduled_for,
                 time_block, priority, context, notes, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                draft.title,
                category_str(draft.category),
                draft.pipeline,
                draft.pillar,
                draft.scheduled_for,
                draft.time_block,
                draft.priority,
                draft.context,
                draft.notes,
                created_at,
            ],
        )?;
        Ok(task_from_draft(conn.last_insert_rowid(), draft, created_at))
    }

    fn read_json(&self) -> Vec<OneOffTask> {
        read_json_list(&self.paths, JSON_FILE).unwrap_or_else(|err| {
            warn!(%err, "one-off JSON read failed");
            Vec::new()
        })
    }
}

impl OneOffStore for OneOffDb {
    fn list(&self) -> Result<Vec<OneOffTask>> {
        match self.list_db() {
            Ok(tasks) => Ok(tasks),
            Err(err) => {
                warn!(%err, "one-off db read failed, using JSON fallback");
                Ok(self.read_json())
            }
        }
    }

    fn create(&self, draft: OneOffDraft) -> Result<OneOffTask> {
        match self.create_db(&draft) {
            Ok(task) => Ok(task),
            Err(err) => {
                warn!(%err, "one-off db create failed, using JSON fallback");
                let mut all = self.read_json();
                let next_id = all.iter().map(|t| t.id).max().unwrap_or(0) + 1;
                let task = task_from_draft(next_id, &draft, now_iso());
                all.push(task.clone());
                write_json_list(&self.paths, JSON_FILE, &all)?;
                Ok(task)
            }
        }
    }
}

fn now_iso() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

fn task_from_draft(id: i64, draft: &OneOffDraft, created_at: String) -> OneOffTask {
    OneOffTask {
        id,
        title: draft.title.clone(),
        category: draft.category,
        pipeline: draft.pipeline.clone(),
        pillar: draft.pillar.clone(),
        scheduled_for: draft.scheduled_for.clone(),
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

fn row_to_task(row: &Row<'_>) -> rusqlite::Result<OneOffTask> {
    Ok(OneOffTask {
        id: row.get(0)?,
        title: row.get(1)?,
        category: parse_category(&row.get::<_, String>(2)?),
        pipeline: row.get(3)?,
        pillar: row.get(4)?,
        scheduled_for: row.get(5)?,
        time_block: row.get(6)?,
        priority: row.get(7)?,
        context: row.get(8)?,
        notes: row.get(9)?,
        created_at: row.get(10)?,
    })
}
