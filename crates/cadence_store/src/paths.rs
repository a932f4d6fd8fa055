use std::path::{Path, PathBuf};

/// Where durable data lives: the primary directory holding the SQLite
/// database and YAML configuration, and the fallback directory for the JSON
/// files used when the database is unusable. Resolved once at boot from the
/// environment; domain logic never consults env vars itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    pub data_dir: PathBuf,
    pub fallback_dir: PathBuf,
}

impl DataPaths {
    pub fn new(data_dir: impl Into<PathBuf>, fallback_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            fallback_dir: fallback_dir.into(),
        }
    }

    /// `DATA_DIR` overrides the primary directory; `APP_ENV=dev` switches
    /// both directories to their dev-suffixed variants so development data
    /// never mixes with real data.
    pub fn from_env() -> Self {
        let dev = std::env::var("APP_ENV")
            .map(|v| v == "dev" || v == "development")
            .unwrap_or(false);
        let (data_name, fallback_name) = if dev {
            ("data-dev", ".data-dev-fallback")
        } else {
            ("data", ".data-fallback")
        };

        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let data_dir = std::env::var("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| cwd.join(data_name));
        Self {
            data_dir,
            fallback_dir: cwd.join(fallback_name),
        }
    }

    /// The database file all stores share. A legacy `stretch.db` is reused
    /// when present so older installations keep their history.
    pub fn db_file(&self) -> PathBuf {
        let legacy = self.data_dir.join("stretch.db");
        if legacy.exists() {
            legacy
        } else {
            self.data_dir.join("actions.db")
        }
    }

    pub fn fallback_file(&self, name: &str) -> PathBuf {
        self.fallback_dir.join(name)
    }

    pub fn template_file(&self) -> PathBuf {
        self.data_dir.join("tasks.yaml")
    }

    pub fn template_example_file(&self) -> PathBuf {
        self.data_dir.join("tasks.example.yaml")
    }

    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self::new(dir.join("data"), dir.join(".data-fallback"))
    }
}
