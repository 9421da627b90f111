use std::cmp::Ordering;

use crate::domain::session::SessionRecord;

/// Display order: active sessions first, most recently started first, then the
/// remaining sessions by most recent end date. Missing instants count as oldest.
pub fn compare_for_display(a: &SessionRecord, b: &SessionRecord) -> Ordering {
    match (a.status.is_active(), b.status.is_active()) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (true, true) => b.start_date.cmp(&a.start_date),
        (false, false) => b.end_date.cmp(&a.end_date),
    }
}

/// Orders records for display. Records that compare equal come out in reverse
/// input order.
pub fn order_for_display(records: Vec<SessionRecord>) -> Vec<SessionRecord> {
    let mut indexed: Vec<(usize, SessionRecord)> = records.into_iter().enumerate().collect();
    indexed.sort_by(|(left_index, left), (right_index, right)| {
        compare_for_display(left, right).then_with(|| right_index.cmp(left_index))
    });
    indexed.into_iter().map(|(_, record)| record).collect()
}
