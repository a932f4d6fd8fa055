use std::fs;

use anyhow::Result;
use rusqlite::Connection;

use crate::paths::DataPaths;

/// Open the shared database, creating the data directory and file on first
/// use. Connections are short-lived: each store operation opens, runs, and
/// drops its own, matching the last-writer-wins concurrency model.
pub(crate) fn open_db(paths: &DataPaths) -> Result<Connection> {
    fs::create_dir_all(&paths.data_dir)?;
    let conn = Connection::open(paths.db_file())?;
    conn.execute_batch(
        r#"
        PRAGMA journal_mode=WAL;
        PRAGMA synchronous=NORMAL;
        "#,
    )?;
    Ok(conn)
}

/// Read a JSON fallback file as a list, treating a missing file as empty.
pub(crate) fn read_json_list<T: serde::de::DeserializeOwned>(
    paths: &DataPaths,
    name: &str,
) -> Result<Vec<T>> {
    fs::create_dir_all(&paths.fallback_dir)?;
    let raw = match fs::read_to_string(paths.fallback_file(name)) {
        Ok(raw) => raw,
        Err(_) => return Ok(Vec::new()),
    };
    Ok(serde_json::from_str(&raw)?)
}

pub(crate) fn write_json_list<T: serde::Serialize>(
    paths: &DataPaths,
    name: &str,
    entries: &[T],
) -> Result<()> {
    fs::create_dir_all(&paths.fallback_dir)?;
    let payload = serde_json::to_string_pretty(entries)?;
    fs::write(paths.fallback_file(name), payload)?;
    Ok(())
}
