use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use anyhow::Result;
use parking_lot::Mutex;
use serde::Deserialize;
use tracing::{info, warn};

use cadence_domain::recurrence::{RecurrenceRule, Weekday};
use cadence_domain::stores::TemplateSource;
use cadence_domain::task::TaskTemplate;

use crate::paths::DataPaths;

const EXAMPLE_YAML: &str = r#"# Task templates. Copy this file to tasks.yaml and edit.
#
# Each entry needs a name; everything else is optional. Recurrence defaults
# to daily when omitted or unrecognized.
tasks:
  - name: Morning stretch
    duration_seconds: 300
    pillar: health
    priority: 5
    subtasks:
      - Neck
      - Shoulders
  - name: Weekly review
    pillar: mental_clarity
    priority: 4
    recurrence:
      frequency: weekly
      days: [Sun]
  - name: Pay rent
    pillar: finances
    recurrence:
      frequency: monthly
      day_of_month: 1
"#;

#[derive(Debug, Deserialize)]
struct RawTemplate {
    name: String,
    #[serde(default)]
    duration_seconds: Option<u64>,
    #[serde(default)]
    subtasks: Option<Vec<String>>,
    #[serde(default)]
    pillar: Option<String>,
    #[serde(default)]
    priority: Option<u32>,
    #[serde(default)]
    recurrence: Option<serde_yaml::Value>,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    tasks: Vec<RawTemplate>,
}

/// YAML-backed template source. The parsed list is cached against the
/// file's mtime so repeated loads only touch the filesystem for a stat.
pub struct TemplateFile {
    paths: DataPaths,
    cache: Mutex<Option<(i64, Vec<TaskTemplate>)>>,
}

impl TemplateFile {
    pub fn new(paths: DataPaths) -> Self {
        Self {
            paths,
            cache: Mutex::new(None),
        }
    }

    /// The file `load` would read: tasks.yaml when present, otherwise the
    /// example file, which is written on first use so there is always
    /// something to copy from.
    fn source_file(&self) -> Result<PathBuf> {
        let primary = self.paths.template_file();
        if primary.exists() {
            return Ok(primary);
        }
        let example = self.paths.template_example_file();
        if !example.exists() {
            fs::create_dir_all(&self.paths.data_dir)?;
            fs::write(&example, EXAMPLE_YAML)?;
            info!(path = %example.display(), "wrote example task templates");
        }
        Ok(example)
    }

    fn load_file(&self, path: &Path) -> Result<Vec<TaskTemplate>> {
        let raw = fs::read_to_string(path)?;
        let config: RawConfig = serde_yaml::from_str(&raw)?;
        Ok(config.tasks.into_iter().map(normalize_template).collect())
    }
}

impl TemplateSource for TemplateFile {
    fn load(&self) -> Result<Vec<TaskTemplate>> {
        let path = self.source_file()?;
        let mtime = mtime_millis(&path);

        let mut cache = self.cache.lock();
        if let (Some(mtime), Some((cached_at, templates))) = (mtime, cache.as_ref()) {
            if *cached_at == mtime {
                return Ok(templates.clone());
            }
        }

        let templates = self.load_file(&path)?;
        if let Some(mtime) = mtime {
            *cache = Some((mtime, templates.clone()));
        }
        Ok(templates)
    }

    fn version(&self) -> Result<Option<i64>> {
        let path = self.source_file()?;
        Ok(mtime_millis(&path))
    }
}

fn mtime_millis(path: &Path) -> Option<i64> {
    let modified = fs::metadata(path).and_then(|m| m.modified()).ok()?;
    let since = modified.duration_since(UNIX_EPOCH).ok()?;
    Some(since.as_millis() as i64)
}

fn normalize_template(raw: RawTemplate) -> TaskTemplate {
    TaskTemplate {
        name: raw.name,
        default_duration_seconds: raw.duration_seconds.unwrap_or(0),
        subtask_labels: raw.subtasks,
        pillar: raw.pillar,
        priority: raw.priority,
        recurrence: raw.recurrence.as_ref().map(normalize_recurrence),
    }
}

/// Accept whatever shape the YAML holds and settle on a valid rule.
/// Malformed or unknown frequencies become daily rather than dropping the
/// template, so a typo in the config never hides a task.
fn normalize_recurrence(value: &serde_yaml::Value) -> RecurrenceRule {
    let frequency = value
        .get("frequency")
        .and_then(|f| f.as_str())
        .unwrap_or("daily");

    match frequency {
        "weekly" => RecurrenceRule::Weekly {
            days: value.get("days").and_then(parse_days),
        },
        "monthly" => RecurrenceRule::Monthly {
            day_of_month: get_u32(value, "day_of_month"),
        },
        "yearly" => RecurrenceRule::Yearly {
            month: get_u32(value, "month"),
            day: get_u32(value, "day"),
        },
        other => {
            if other != "daily" {
                warn!(frequency = other, "unknown recurrence frequency, treating as daily");
            }
            RecurrenceRule::Daily
        }
    }
}

fn parse_days(value: &serde_yaml::Value) -> Option<Vec<Weekday>> {
    let list = value.as_sequence()?;
    Some(
        list.iter()
            .filter_map(|d| d.as_str().and_then(Weekday::parse))
            .collect(),
    )
}

fn get_u32(value: &serde_yaml::Value, key: &str) -> Option<u32> {
    value
        .get(key)
        .and_then(|v| v.as_u64())
        .map(|v| v as u32)
}
