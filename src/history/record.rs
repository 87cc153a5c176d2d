use std::cmp::Ordering;

use crate::foundation::core::Locator;

/// One saved creation. Immutable once appended.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    /// Store-assigned, unique, increasing.
    pub id: i64,
    /// Where the composed artifact lives.
    pub image_uri: Locator,
    /// Label of the template used.
    pub template_name: String,
    /// Creation time in epoch milliseconds.
    pub timestamp: i64,
}

/// Display order: most recent first, ties broken by the higher id.
pub fn newest_first(a: &HistoryRecord, b: &HistoryRecord) -> Ordering {
    b.timestamp
        .cmp(&a.timestamp)
        .then_with(|| b.id.cmp(&a.id))
}

/// Return `true` when `records` are in [`newest_first`] order.
pub fn is_newest_first(records: &[HistoryRecord]) -> bool {
    records
        .windows(2)
        .all(|w| newest_first(&w[0], &w[1]) != Ordering::Greater)
}
