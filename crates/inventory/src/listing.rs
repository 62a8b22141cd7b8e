//! Dashboard/listing helpers: filtering, pagination and low-stock flags.

use serde::Serialize;

use stockledger_core::ItemId;

use crate::item::Item;

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based page number actually served.
    pub number: usize,
    pub num_pages: usize,
    pub per_page: usize,
    pub total: usize,
}

impl<T> Page<T> {
    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }
}

/// Slice `items` into the requested page.
///
/// Lenient like a page link should be: a missing or non-numeric page serves
/// page 1, an out-of-range page serves the last page. An empty listing still
/// has one (empty) page.
pub fn paginate<T>(items: Vec<T>, per_page: usize, requested: Option<&str>) -> Page<T> {
    let per_page = per_page.max(1);
    let total = items.len();
    let num_pages = total.div_ceil(per_page).max(1);

    let number = match requested.map(|p| p.trim().parse::<i64>()) {
        None | Some(Err(_)) => 1,
        Some(Ok(n)) if n < 1 || n as usize > num_pages => num_pages,
        Some(Ok(n)) => n as usize,
    };

    let items = items
        .into_iter()
        .skip((number - 1) * per_page)
        .take(per_page)
        .collect();

    Page {
        items,
        number,
        num_pages,
        per_page,
        total,
    }
}

/// Case-insensitive substring match on the item name or its category name.
/// An empty needle matches everything.
pub fn matches_filter(item: &Item, category_name: Option<&str>, needle: &str) -> bool {
    let needle = needle.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    item.name.to_lowercase().contains(&needle)
        || category_name.is_some_and(|c| c.to_lowercase().contains(&needle))
}

/// Ids of the items at or below `threshold`, in input order.
pub fn low_stock<'a>(items: impl IntoIterator<Item = &'a Item>, threshold: i64) -> Vec<ItemId> {
    items
        .into_iter()
        .filter(|item| item.quantity <= threshold)
        .map(|item| item.id)
        .collect()
}

/// Warning banner text for `count` low-stock items, if any.
pub fn low_stock_message(count: usize) -> Option<String> {
    match count {
        0 => None,
        1 => Some("1 item is low on stock".to_string()),
        n => Some(format!("{n} items are low on stock")),
    }
}
