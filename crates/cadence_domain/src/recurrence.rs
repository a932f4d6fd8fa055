use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Weekday abbreviations as they appear in task configuration (`days: [Mon, Wed]`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Weekday {
    Sun,
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
}

impl Weekday {
    pub fn from_date(date: NaiveDate) -> Self {
        match date.weekday().num_days_from_sunday() {
            0 => Weekday::Sun,
            1 => Weekday::Mon,
            2 => Weekday::Tue,
            3 => Weekday::Wed,
            4 => Weekday::Thu,
            5 => Weekday::Fri,
            _ => Weekday::Sat,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "Sun" => Some(Weekday::Sun),
            "Mon" => Some(Weekday::Mon),
            "Tue" => Some(Weekday::Tue),
            "Wed" => Some(Weekday::Wed),
            "Thu" => Some(Weekday::Thu),
            "Fri" => Some(Weekday::Fri),
            "Sat" => Some(Weekday::Sat),
            _ => None,
        }
    }
}

/// When a task repeats. Exactly one variant is active; optional parameters
/// default to permissive values so a sparse rule still schedules.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "frequency", rename_all = "lowercase")]
pub enum RecurrenceRule {
    Daily,
    Weekly {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        days: Option<Vec<Weekday>>,
    },
    Monthly {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        day_of_month: Option<u32>,
    },
    Yearly {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        month: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        day: Option<u32>,
    },
}

impl Default for RecurrenceRule {
    fn default() -> Self {
        RecurrenceRule::Daily
    }
}

pub fn last_day_of_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month >= 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
        .unwrap_or(28)
}

/// Clamp a target day-of-month to the last valid day of the given month.
pub fn clamp_day(year: i32, month: u32, day: u32) -> u32 {
    day.min(last_day_of_month(year, month)).max(1)
}

/// Whether a rule schedules an occurrence on `date`. An absent rule means
/// the task is always due, matching the permissive daily default.
pub fn is_active_on_date(rule: Option<&RecurrenceRule>, date: NaiveDate) -> bool {
    let Some(rule) = rule else {
        return true;
    };

    match rule {
        RecurrenceRule::Daily => true,
        RecurrenceRule::Weekly { days } => match days {
            Some(days) if !days.is_empty() => days.contains(&Weekday::from_date(date)),
            _ => true,
        },
        RecurrenceRule::Monthly { day_of_month } => {
            let target = clamp_day(date.year(), date.month(), day_of_month.unwrap_or(1));
            date.day() == target
        }
        RecurrenceRule::Yearly { month, day } => {
            let month_matches = month.map_or(true, |m| date.month() == m);
            let day_matches = day.map_or(true, |d| {
                date.day() == clamp_day(date.year(), month.unwrap_or(date.month()), d)
            });
            month_matches && day_matches
        }
    }
}
