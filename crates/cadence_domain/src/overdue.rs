use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};

use crate::history::{EntryStatus, HistoryEntry};
use crate::occurrence::TaskOccurrence;
use crate::recurrence::{clamp_day, RecurrenceRule, Weekday};

// Window constants tuned for how each cadence should surface. Daily misses
// show near end-of-day only and never the next morning; weekly and
// monthly/yearly misses get a grace delay and then stay visible for a
// bounded stretch before silently expiring.
pub const DAILY_GRACE_HOURS: i64 = 6;
pub const WEEKLY_GRACE_HOURS: i64 = 18;
pub const WEEKLY_VISIBLE_DAYS: i64 = 3;
pub const MONTHLY_GRACE_HOURS: i64 = 48;
pub const MONTHLY_VISIBLE_DAYS: i64 = 7;

fn iso_date(moment: DateTime<Utc>) -> String {
    moment.date_naive().format("%Y-%m-%d").to_string()
}

fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
    let end = NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap();
    date.and_time(end).and_utc()
}

/// A completion, skip, or any other recorded action on `target_iso` clears
/// the overdue flag; `pending` rows and rows without a status do not.
fn has_completion_on_date(
    history: &[HistoryEntry],
    target_iso: &str,
    task_id: Option<&str>,
    task_name: &str,
) -> bool {
    history.iter().any(|entry| {
        entry.matches_task(task_id, task_name)
            && matches!(entry.status, Some(status) if status != EntryStatus::Pending)
            && entry.occurrence_day() == target_iso
    })
}

/// The nearest scheduled weekday on or before `now`, scanning back at most
/// a week. An empty day set means every day qualifies.
fn most_recent_weekly_date(days: Option<&Vec<Weekday>>, now: DateTime<Utc>) -> NaiveDate {
    let today = now.date_naive();
    let Some(days) = days.filter(|list| !list.is_empty()) else {
        return today;
    };
    for offset in 0..7 {
        let candidate = today - Duration::days(offset);
        if days.contains(&Weekday::from_date(candidate)) {
            return candidate;
        }
    }
    today
}

/// This month's target day when it has already passed (or is today),
/// otherwise the previous month's, each clamped to a valid day-of-month.
fn most_recent_monthly_date(day_of_month: Option<u32>, now: DateTime<Utc>) -> NaiveDate {
    let today = now.date_naive();
    let target = clamp_day(today.year(), today.month(), day_of_month.unwrap_or(1));
    if let Some(date) = NaiveDate::from_ymd_opt(today.year(), today.month(), target) {
        if date <= today {
            return date;
        }
    }

    let (prev_year, prev_month) = if today.month() == 1 {
        (today.year() - 1, 12)
    } else {
        (today.year(), today.month() - 1)
    };
    NaiveDate::from_ymd_opt(
        prev_year,
        prev_month,
        clamp_day(prev_year, prev_month, day_of_month.unwrap_or(1)),
    )
    .unwrap_or(today)
}

fn most_recent_yearly_date(
    month: Option<u32>,
    day: Option<u32>,
    now: DateTime<Utc>,
) -> NaiveDate {
    let today = now.date_naive();
    let target_month = month.unwrap_or(1).clamp(1, 12);
    let target_day = day.unwrap_or(1);

    let this_year = NaiveDate::from_ymd_opt(
        today.year(),
        target_month,
        clamp_day(today.year(), target_month, target_day),
    );
    if let Some(date) = this_year {
        if date <= today {
            return date;
        }
    }

    NaiveDate::from_ymd_opt(
        today.year() - 1,
        target_month,
        clamp_day(today.year() - 1, target_month, target_day),
    )
    .unwrap_or(today)
}

/// A one-off is overdue strictly before today; on its due day it is not.
pub fn is_overdue_one_off(due_date: Option<&str>, now: DateTime<Utc>) -> bool {
    match due_date {
        Some(due) => due < iso_date(now).as_str(),
        None => false,
    }
}

/// Whether the most recent due occurrence of a recurring rule should be
/// flagged overdue at `now`, given the recorded history for the task.
pub fn is_overdue_recurring(
    recurrence: &RecurrenceRule,
    history: &[HistoryEntry],
    task_id: Option<&str>,
    task_name: &str,
    now: DateTime<Utc>,
) -> bool {
    match recurrence {
        RecurrenceRule::Daily => {
            let today = now.date_naive();
            if has_completion_on_date(history, &iso_date(now), task_id, task_name) {
                return false;
            }
            let due_end = end_of_day(today);
            let overdue_start = due_end - Duration::hours(DAILY_GRACE_HOURS);
            now >= overdue_start && now <= due_end
        }
        RecurrenceRule::Weekly { days } => {
            let due = most_recent_weekly_date(days.as_ref(), now);
            if has_completion_on_date(history, &due.format("%Y-%m-%d").to_string(), task_id, task_name)
            {
                return false;
            }
            let overdue_start = end_of_day(due) + Duration::hours(WEEKLY_GRACE_HOURS);
            let overdue_end = overdue_start + Duration::days(WEEKLY_VISIBLE_DAYS);
            now >= overdue_start && now <= overdue_end
        }
        RecurrenceRule::Monthly { day_of_month } => {
            let due = most_recent_monthly_date(*day_of_month, now);
            in_monthly_window(due, history, task_id, task_name, now)
        }
        RecurrenceRule::Yearly { month, day } => {
            let due = most_recent_yearly_date(*month, *day, now);
            in_monthly_window(due, history, task_id, task_name, now)
        }
    }
}

// Yearly reuses the monthly grace and visibility constants.
fn in_monthly_window(
    due: NaiveDate,
    history: &[HistoryEntry],
    task_id: Option<&str>,
    task_name: &str,
    now: DateTime<Utc>,
) -> bool {
    if has_completion_on_date(history, &due.format("%Y-%m-%d").to_string(), task_id, task_name) {
        return false;
    }
    let overdue_start = end_of_day(due) + Duration::hours(MONTHLY_GRACE_HOURS);
    let overdue_end = overdue_start + Duration::days(MONTHLY_VISIBLE_DAYS);
    now >= overdue_start && now <= overdue_end
}

/// Combined check for a resolved occurrence: one-offs compare their due
/// date against today, recurring occurrences run the window state machine.
/// An occurrence without a rule follows the permissive daily default.
pub fn is_occurrence_overdue(
    occurrence: &TaskOccurrence,
    history: &[HistoryEntry],
    now: DateTime<Utc>,
) -> bool {
    if occurrence.is_one_off {
        return is_overdue_one_off(occurrence.due_date.as_deref(), now);
    }
    const DAILY: RecurrenceRule = RecurrenceRule::Daily;
    let rule = occurrence.recurrence.as_ref().unwrap_or(&DAILY);
    is_overdue_recurring(rule, history, Some(&occurrence.id), &occurrence.name, now)
}
