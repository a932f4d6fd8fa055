use std::collections::HashSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::recurrence::{is_active_on_date, RecurrenceRule};
use crate::task::{OneOffTask, RecurringTask, TaskTemplate};

/// One resolved instance of a task being due on a date. Built fresh on every
/// resolution and never persisted; the id stays stable across resolutions
/// for the same logical task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskOccurrence {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pillar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<RecurrenceRule>,
    #[serde(default)]
    pub is_one_off: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub one_off_id: Option<i64>,
    /// YYYY-MM-DD, set for one-offs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    /// Always at least one entry; a single empty string means the task has
    /// no distinct sub-occurrences.
    pub subtask_labels: Vec<String>,
}

impl TaskOccurrence {
    pub fn subtask_count(&self) -> u32 {
        self.subtask_labels.len().max(1) as u32
    }
}

pub fn slugify(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    let mut last_dash = true;
    for ch in value.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    let trimmed = slug.trim_matches('-');
    if trimmed.is_empty() {
        "task".to_string()
    } else {
        trimmed.to_string()
    }
}

fn occurrence_from_template(template: &TaskTemplate) -> TaskOccurrence {
    TaskOccurrence {
        id: String::new(),
        name: template.name.clone(),
        pipeline: None,
        pillar: template.pillar.clone(),
        priority: template.priority,
        recurrence: template.recurrence.clone(),
        is_one_off: false,
        one_off_id: None,
        due_date: None,
        subtask_labels: template
            .subtask_labels
            .clone()
            .filter(|labels| !labels.is_empty())
            .unwrap_or_else(|| vec![String::new()]),
    }
}

fn occurrence_from_recurring(task: &RecurringTask) -> TaskOccurrence {
    TaskOccurrence {
        id: format!("recurring-{}", task.id),
        name: task.title.clone(),
        pipeline: Some(task.pipeline.clone()),
        pillar: Some(task.pillar.clone()),
        priority: task.priority,
        recurrence: Some(task.recurrence.clone()),
        is_one_off: false,
        one_off_id: None,
        due_date: None,
        subtask_labels: vec![String::new()],
    }
}

fn occurrence_from_one_off(task: &OneOffTask) -> TaskOccurrence {
    TaskOccurrence {
        id: format!("oneoff-{}", task.id),
        name: task.title.clone(),
        pipeline: Some(task.pipeline.clone()),
        pillar: Some(task.pillar.clone()),
        priority: task.priority,
        recurrence: Some(RecurrenceRule::Daily),
        is_one_off: true,
        one_off_id: Some(task.id),
        due_date: Some(task.scheduled_for.clone()),
        subtask_labels: vec![String::new()],
    }
}

/// Merge the three task sources into the occurrences due on `target_date`.
///
/// One-offs are included once their due date is on or before the target and
/// never drop out until completed; recurring and template entries are
/// included when their rule is active. Occurrences without a persisted id
/// get a slug of their name, disambiguated with `-2`, `-3`, … suffixes.
pub fn resolve_due_occurrences(
    templates: &[TaskTemplate],
    recurring: &[RecurringTask],
    one_offs: &[OneOffTask],
    target_date: NaiveDate,
) -> Vec<TaskOccurrence> {
    let target_iso = target_date.format("%Y-%m-%d").to_string();

    let mut candidates: Vec<TaskOccurrence> = templates.iter().map(occurrence_from_template).collect();
    candidates.extend(recurring.iter().map(occurrence_from_recurring));
    candidates.extend(one_offs.iter().map(occurrence_from_one_off));

    let mut due: Vec<TaskOccurrence> = candidates
        .into_iter()
        .filter(|occ| {
            if occ.is_one_off {
                occ.due_date
                    .as_deref()
                    .map(|date| date <= target_iso.as_str())
                    .unwrap_or(false)
            } else {
                is_active_on_date(occ.recurrence.as_ref(), target_date)
            }
        })
        .collect();

    let mut taken: HashSet<String> = HashSet::new();
    for (idx, occ) in due.iter_mut().enumerate() {
        let base = if occ.id.is_empty() {
            let slug = slugify(&occ.name);
            if slug == "task" && occ.name.trim().is_empty() {
                format!("task-{}", idx + 1)
            } else {
                slug
            }
        } else {
            occ.id.clone()
        };
        let mut candidate = base.clone();
        let mut counter = 2;
        while !taken.insert(candidate.clone()) {
            candidate = format!("{base}-{counter}");
            counter += 1;
        }
        occ.id = candidate;
    }

    due
}
