use anyhow::Result;
use rusqlite::{params, Connection};
use tracing::warn;

use cadence_domain::history::{EntryStatus, HistoryEntry};
use cadence_domain::stores::HistoryStore;

use crate::db::{open_db, read_json_list, write_json_list};
use crate::paths::DataPaths;

const JSON_FILE: &str = "history.json";

const CREATE_HISTORY: &str = r#"
    CREATE TABLE history (
        taskId TEXT,
        task TEXT NOT NULL,
        subtaskNumber INTEGER NOT NULL,
        durationSeconds INTEGER NOT NULL,
        timestamp TEXT NOT NULL,
        status TEXT,
        occurrenceDate TEXT,
        PRIMARY KEY (task, subtaskNumber, timestamp)
    )
"#;

/// History log backed by the shared SQLite file, with a JSON file fallback
/// when the database cannot be used. Failures are logged here and resolve
/// to best-available data; callers never see them as hard errors.
pub struct HistoryDb {
    paths: DataPaths,
}

impl HistoryDb {
    pub fn new(paths: DataPaths) -> Self {
        Self { paths }
    }

    fn open(&self) -> Result<Connection> {
        let conn = open_db(&self.paths)?;
        ensure_history_table(&conn)?;
        Ok(conn)
    }

    fn read_db(&self) -> Result<Vec<HistoryEntry>> {
        let conn = self.open()?;
        let mut stmt = conn.prepare(
            "SELECT taskId, task, subtaskNumber, durationSeconds, timestamp, status, occurrenceDate
             FROM history ORDER BY datetime(timestamp) DESC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(HistoryEntry {
                task_id: row.get(0)?,
                task: row.get(1)?,
                subtask_number: row.get(2)?,
                duration_seconds: row.get(3)?,
                timestamp: row.get(4)?,
                status: row
                    .get::<_, Option<String>>(5)?
                    .as_deref()
                    .and_then(EntryStatus::parse),
                occurrence_date: row.get(6)?,
            })
        })?;
        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }

    fn append_db(&self, entries: &[HistoryEntry]) -> Result<()> {
        let mut conn = self.open()?;
        let tx = conn.transaction()?;
        for entry in entries {
            insert_entry(&tx, entry)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn replace_db(&self, entries: &[HistoryEntry]) -> Result<()> {
        let mut conn = self.open()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM history", [])?;
        for entry in entries {
            insert_entry(&tx, entry)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn delete_db(&self, task: &str, subtask_number: u32, timestamp: &str) -> Result<u64> {
        let conn = self.open()?;
        let changed = conn.execute(
            "DELETE FROM history WHERE task = ?1 AND subtaskNumber = ?2 AND timestamp = ?3",
            params![task, subtask_number, timestamp],
        )?;
        Ok(changed as u64)
    }

    fn read_json(&self) -> Vec<HistoryEntry> {
        read_json_list(&self.paths, JSON_FILE).unwrap_or_else(|err| {
            warn!(%err, "history JSON read failed");
            Vec::new()
        })
    }

    fn write_json(&self, entries: &[HistoryEntry]) {
        if let Err(err) = write_json_list(&self.paths, JSON_FILE, entries) {
            warn!(%err, "history JSON write failed");
        }
    }
}

impl HistoryStore for HistoryDb {
    fn read(&self) -> Result<Vec<HistoryEntry>> {
        match self.read_db() {
            Ok(entries) => Ok(entries),
            Err(err) => {
                warn!(%err, "history db read failed, using JSON fallback");
                Ok(self.read_json())
            }
        }
    }

    fn append(&self, entries: &[HistoryEntry]) -> Result<()> {
        if let Err(err) = self.append_db(entries) {
            warn!(%err, "history db append failed, using JSON fallback");
            let mut all = entries.to_vec();
            all.extend(self.read_json());
            self.write_json(&all);
        }
        Ok(())
    }

    fn replace(&self, entries: &[HistoryEntry]) -> Result<()> {
        if let Err(err) = self.replace_db(entries) {
            warn!(%err, "history db replace failed, using JSON fallback");
            self.write_json(entries);
        }
        Ok(())
    }

    fn delete_entry(&self, task: &str, subtask_number: u32, timestamp: &str) -> Result<u64> {
        match self.delete_db(task, subtask_number, timestamp) {
            Ok(changed) => Ok(changed),
            Err(err) => {
                warn!(%err, "history db delete failed, using JSON fallback");
                let all = self.read_json();
                let kept: Vec<HistoryEntry> = all
                    .iter()
                    .filter(|e| {
                        !(e.task == task
                            && e.subtask_number == subtask_number
                            && e.timestamp == timestamp)
                    })
                    .cloned()
                    .collect();
                let removed = (all.len() - kept.len()) as u64;
                self.write_json(&kept);
                Ok(removed)
            }
        }
    }
}

fn insert_entry(conn: &Connection, entry: &HistoryEntry) -> Result<()> {
    conn.execute(
        "INSERT INTO history (taskId, task, subtaskNumber, durationSeconds, timestamp, status, occurrenceDate)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            entry.task_id,
            entry.task,
            entry.subtask_number,
            entry.duration_seconds,
            entry.timestamp,
            entry.status.map(|s| s.as_str()),
            entry.occurrence_date,
        ],
    )?;
    Ok(())
}

fn table_columns(conn: &Connection, table: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(1))?;
    let mut columns = Vec::new();
    for name in rows {
        columns.push(name?);
    }
    Ok(columns)
}

/// Create the history table, or bring an existing one up to the current
/// layout. Two legacy shapes exist: the original stretch/holdNumber table,
/// and the later task/subtaskNumber table without status columns.
fn ensure_history_table(conn: &Connection) -> Result<()> {
    let exists = conn
        .prepare("SELECT name FROM sqlite_master WHERE type='table' AND name='history'")?
        .exists([])?;
    if !exists {
        conn.execute(CREATE_HISTORY, [])?;
        return Ok(());
    }

    let columns = table_columns(conn, "history")?;
    let has = |name: &str| columns.iter().any(|c| c == name);

    if has("stretch") && has("holdNumber") {
        conn.execute_batch(&format!(
            r#"
            ALTER TABLE history RENAME TO history_legacy;
            {CREATE_HISTORY};
            INSERT INTO history (task, subtaskNumber, durationSeconds, timestamp)
                SELECT stretch, holdNumber, durationSeconds, timestamp FROM history_legacy;
            DROP TABLE history_legacy;
            "#
        ))?;
        return Ok(());
    }

    for (column, ddl) in [
        ("taskId", "ALTER TABLE history ADD COLUMN taskId TEXT"),
        ("status", "ALTER TABLE history ADD COLUMN status TEXT"),
        (
            "occurrenceDate",
            "ALTER TABLE history ADD COLUMN occurrenceDate TEXT",
        ),
    ] {
        if !has(column) {
            conn.execute(ddl, [])?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(task: &str, subtask: u32, timestamp: &str, status: Option<EntryStatus>) -> HistoryEntry {
        HistoryEntry {
            task_id: Some(format!("id-{task}")),
            task: task.to_string(),
            subtask_number: subtask,
            duration_seconds: 30,
            timestamp: timestamp.to_string(),
            status,
            occurrence_date: None,
        }
    }

    #[test]
    fn append_read_replace_round_trip() {
        let temp = tempfile::tempdir().unwrap();
        let store = HistoryDb::new(DataPaths::in_dir(temp.path()));

        let first = entry("Stretch", 1, "2025-12-25T08:00:00.000Z", Some(EntryStatus::Done));
        let second = entry("Stretch", 2, "2025-12-25T09:00:00.000Z", None);
        store.append(&[first.clone(), second.clone()]).unwrap();

        let all = store.read().unwrap();
        assert_eq!(all.len(), 2);
        // Most recent timestamp first.
        assert_eq!(all[0], second);
        assert_eq!(all[1], first);

        store.replace(&[first.clone()]).unwrap();
        assert_eq!(store.read().unwrap(), vec![first]);
    }

    #[test]
    fn delete_removes_exact_key_only() {
        let temp = tempfile::tempdir().unwrap();
        let store = HistoryDb::new(DataPaths::in_dir(temp.path()));
        let keep = entry("A", 1, "2025-12-25T08:00:00.000Z", Some(EntryStatus::Done));
        let gone = entry("A", 2, "2025-12-25T08:00:00.000Z", Some(EntryStatus::Done));
        store.append(&[keep.clone(), gone]).unwrap();

        let removed = store.delete_entry("A", 2, "2025-12-25T08:00:00.000Z").unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.read().unwrap(), vec![keep]);
    }

    #[test]
    fn upgrades_stretch_era_table() {
        let temp = tempfile::tempdir().unwrap();
        let paths = DataPaths::in_dir(temp.path());
        std::fs::create_dir_all(&paths.data_dir).unwrap();
        let conn = Connection::open(paths.data_dir.join("actions.db")).unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE history (
                stretch TEXT NOT NULL,
                holdNumber INTEGER NOT NULL,
                durationSeconds INTEGER NOT NULL,
                timestamp TEXT NOT NULL,
                PRIMARY KEY (stretch, holdNumber, timestamp)
            );
            INSERT INTO history VALUES ('Neck roll', 1, 45, '2024-06-01T07:00:00.000Z');
            "#,
        )
        .unwrap();
        drop(conn);

        let store = HistoryDb::new(paths);
        let all = store.read().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].task, "Neck roll");
        assert_eq!(all[0].task_id, None);
        assert_eq!(all[0].status, None);
    }

    #[test]
    fn status_survives_persistence() {
        let temp = tempfile::tempdir().unwrap();
        let store = HistoryDb::new(DataPaths::in_dir(temp.path()));
        let scheduled = HistoryEntry {
            task_id: Some("plan-the-day".to_string()),
            task: "Plan the day".to_string(),
            subtask_number: 1,
            duration_seconds: 0,
            timestamp: "2025-12-25T00:00:00.000Z".to_string(),
            status: Some(EntryStatus::Scheduled),
            occurrence_date: Some("2025-12-25".to_string()),
        };
        store.replace(std::slice::from_ref(&scheduled)).unwrap();
        assert_eq!(store.read().unwrap(), vec![scheduled]);
    }
}
