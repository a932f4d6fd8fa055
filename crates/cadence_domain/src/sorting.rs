use std::cmp::Ordering;

use crate::history::HistoryEntry;
use crate::occurrence::TaskOccurrence;

/// Decides whether an occurrence should surface as overdue; `ready` lets the
/// caller suppress flags until its data has finished loading.
pub type OverdueCheck<'a> = dyn Fn(&TaskOccurrence, &[HistoryEntry], bool) -> bool + 'a;

fn priority_rank(occurrence: &TaskOccurrence) -> i64 {
    occurrence.priority.map(i64::from).unwrap_or(i64::MIN)
}

/// Order occurrences for display: overdue first, then priority descending,
/// then due date ascending when both sides have one, then name. The sort is
/// stable, so equal keys keep their input order.
pub fn sort_by_overdue(
    items: &[TaskOccurrence],
    history: &[HistoryEntry],
    ready: bool,
    is_overdue: &OverdueCheck<'_>,
) -> Vec<TaskOccurrence> {
    let mut keyed: Vec<(bool, TaskOccurrence)> = items
        .iter()
        .map(|occ| (is_overdue(occ, history, ready), occ.clone()))
        .collect();

    keyed.sort_by(|(a_overdue, a), (b_overdue, b)| {
        b_overdue
            .cmp(a_overdue)
            .then_with(|| priority_rank(b).cmp(&priority_rank(a)))
            .then_with(|| match (&a.due_date, &b.due_date) {
                (Some(a_due), Some(b_due)) if a_due != b_due => a_due.cmp(b_due),
                _ => Ordering::Equal,
            })
            .then_with(|| a.name.cmp(&b.name))
    });

    keyed.into_iter().map(|(_, occ)| occ).collect()
}
