//! Ledger reporting.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use stockledger_core::ItemId;

use crate::movement::MovementEntry;

/// Rows returned by the most-sold report.
pub const MOST_SOLD_LIMIT: usize = 10;

/// One row of the most-sold report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MostSoldRow {
    /// `None` for entries whose item has since been deleted.
    pub item_id: Option<ItemId>,
    pub item_name: String,
    /// Sum of the negative changes; the most sold item has the most negative total.
    pub total_change: i64,
}

impl MostSoldRow {
    pub fn units_out(&self) -> i64 {
        -self.total_change
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum GroupKey {
    Live(ItemId),
    Deleted(String),
}

/// Rank items by outgoing quantity.
///
/// Only entries with a negative change count. Entries are grouped per item
/// and labelled with `current_name`, falling back to the latest snapshot when
/// the lookup has no answer. Entries of deleted items are grouped by their name
/// snapshot. Rows are sorted by ascending total (most negative first), then by
/// name, and capped at `limit`. Totals saturate at `i64::MIN`.
pub fn most_sold<'a>(
    entries: impl IntoIterator<Item = &'a MovementEntry>,
    current_name: impl Fn(ItemId) -> Option<&'a str>,
    limit: usize,
) -> Vec<MostSoldRow> {
    // (total, latest name, timestamp of that name)
    let mut groups: HashMap<GroupKey, (i64, &'a str, DateTime<Utc>)> = HashMap::new();

    for entry in entries.into_iter().filter(|e| e.change < 0) {
        let key = match entry.item_id {
            Some(id) => GroupKey::Live(id),
            None => GroupKey::Deleted(entry.item_name.clone()),
        };
        let slot = groups
            .entry(key)
            .or_insert((0, entry.item_name.as_str(), entry.timestamp));
        slot.0 = slot.0.saturating_add(entry.change);
        if entry.timestamp >= slot.2 {
            slot.1 = entry.item_name.as_str();
            slot.2 = entry.timestamp;
        }
    }

    let mut rows: Vec<MostSoldRow> = groups
        .into_iter()
        .map(|(key, (total, snapshot, _))| {
            let (item_id, name) = match key {
                GroupKey::Live(id) => (Some(id), current_name(id).unwrap_or(snapshot)),
                GroupKey::Deleted(_) => (None, snapshot),
            };
            MostSoldRow {
                item_id,
                item_name: name.to_string(),
                total_change: total,
            }
        })
        .collect();

    rows.sort_by(|a, b| {
        a.total_change
            .cmp(&b.total_change)
            .then_with(|| a.item_name.cmp(&b.item_name))
    });
    rows.truncate(limit);
    rows
}
