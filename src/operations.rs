/// Tab operations: overflow selection and de-duplication

use std::collections::HashSet;

use crate::tab_data::{TabId, TabInfo};

/// The tabs beyond `limit`, oldest first by creation order
///
/// Chrome hands out tab ids in increasing order, so ascending id is creation
/// order. Last-access time deliberately plays no part.
pub fn select_overflow(tabs: &[TabInfo], limit: usize) -> Vec<TabInfo> {
    if tabs.len() <= limit {
        return Vec::new();
    }

    let mut by_age: Vec<&TabInfo> = tabs.iter().collect();
    by_age.sort_by_key(|tab| tab.id);

    by_age
        .into_iter()
        .take(tabs.len() - limit)
        .cloned()
        .collect()
}

/// Make tabs unique by id (keep first occurrence)
pub fn make_tabs_unique(tabs: &[TabInfo]) -> (Vec<TabInfo>, Vec<TabId>) {
    let mut seen_ids = HashSet::new();
    let mut keep_tabs = Vec::new();
    let mut duplicate_ids = Vec::new();

    for tab in tabs {
        if seen_ids.insert(tab.id) {
            keep_tabs.push(tab.clone());
        } else {
            duplicate_ids.push(tab.id);
        }
    }

    (keep_tabs, duplicate_ids)
}
