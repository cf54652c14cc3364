/// Reopening archived tabs and putting the reader back where they left off
use std::cell::RefCell;
use std::collections::HashMap;

use crate::error::Result;
use crate::host::Browser;
use crate::smart_url::{SmartPosition, decode_smart_url};
use crate::storage::{ArchiveStore, KeyValueStore};
use crate::tab_data::{ArchiveRecord, TabId};

/// Scroll offsets waiting for their tab to finish loading
#[derive(Debug, Default)]
pub struct PendingRestores {
    entries: RefCell<HashMap<TabId, f64>>,
}

impl PendingRestores {
    pub fn new() -> Self {
        PendingRestores::default()
    }

    pub fn register(&self, tab_id: TabId, scroll_y: f64) {
        self.entries.borrow_mut().insert(tab_id, scroll_y);
    }

    pub fn take(&self, tab_id: TabId) -> Option<f64> {
        self.entries.borrow_mut().remove(&tab_id)
    }

    /// The tab closed before it finished loading
    pub fn forget(&self, tab_id: TabId) {
        if self.take(tab_id).is_some() {
            log::debug!("Dropped pending restore for closed tab {}", tab_id);
        }
    }

    pub fn get(&self, tab_id: TabId) -> Option<f64> {
        self.entries.borrow().get(&tab_id).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

/// Scroll offset to apply once the restored tab loads. Records that lost
/// their `scrollY` fall back to the offset carried by the smart URL.
fn resume_offset(record: &ArchiveRecord) -> f64 {
    if record.scroll_y > 0.0 {
        return record.scroll_y;
    }
    match decode_smart_url(record.open_url()).1 {
        SmartPosition::ScrollOffset(offset) => f64::from(offset),
        _ => 0.0,
    }
}

/// Open `record` in a new tab, remembering its scroll offset for when it loads
pub async fn restore<B: Browser>(
    browser: &B,
    pending: &PendingRestores,
    record: &ArchiveRecord,
) -> Result<TabId> {
    let tab_id = browser.create_tab(record.open_url()).await?;
    let offset = resume_offset(record);
    if offset > 0.0 {
        pending.register(tab_id, offset);
    }
    log::debug!("Reopened {} as tab {}", record.url, tab_id);
    Ok(tab_id)
}

/// Reopen `record`, then delete it from the archive. Nothing is deleted if
/// the tab could not be opened. Returns whether an entry was removed.
pub async fn restore_and_remove<B, S>(
    browser: &B,
    pending: &PendingRestores,
    archive: &ArchiveStore<S>,
    record: &ArchiveRecord,
) -> Result<bool>
where
    B: Browser,
    S: KeyValueStore,
{
    restore(browser, pending, record).await?;
    let removed = archive.remove(&record.matcher()).await?;
    if !removed {
        log::debug!("Restored {} had no archive entry left to remove", record.url);
    }
    Ok(removed)
}

/// A tab finished loading: apply its pending scroll once, then forget it
pub async fn on_tab_loaded<B: Browser>(browser: &B, pending: &PendingRestores, tab_id: TabId) {
    let Some(scroll_y) = pending.take(tab_id) else {
        return;
    };

    match browser.scroll_to(tab_id, scroll_y).await {
        Ok(()) => log::debug!("Restored scroll position in tab {} ({} still pending)", tab_id, pending.len()),
        Err(err) => log::warn!("Could not restore scroll position in tab {}: {}", tab_id, err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KEY_ARCHIVED;
    use crate::testing::{FakeBrowser, MemoryStore, record};
    use futures::executor::block_on;
    use std::rc::Rc;

    fn scrolled(id: &str, scroll_y: f64) -> ArchiveRecord {
        let mut r = record(id, "https://example.com/long-read", 1.0);
        r.smart_url = format!("https://example.com/long-read#:~:scroll={scroll_y}");
        r.scroll_y = scroll_y;
        r
    }

    fn archive_with(records: Vec<ArchiveRecord>) -> (Rc<MemoryStore>, ArchiveStore<MemoryStore>) {
        let store = Rc::new(MemoryStore::new());
        store.insert(KEY_ARCHIVED, serde_json::to_value(records).unwrap());
        let archive = ArchiveStore::new(store.clone());
        (store, archive)
    }

    #[test]
    fn test_restore_opens_smart_url() {
        let browser = FakeBrowser::new();
        let pending = PendingRestores::new();
        let mut r = record("a", "https://example.com/post", 1.0);
        r.smart_url = "https://example.com/post#:~:text=Hello%20world".to_string();

        block_on(restore(&browser, &pending, &r)).unwrap();

        assert_eq!(*browser.created.borrow(), vec!["https://example.com/post#:~:text=Hello%20world"]);
        assert!(pending.is_empty());
    }

    #[test]
    fn test_offset_recovered_from_smart_url() {
        let browser = FakeBrowser::new();
        let pending = PendingRestores::new();
        let mut r = scrolled("a", 450.0);
        r.scroll_y = 0.0;

        let tab_id = block_on(restore(&browser, &pending, &r)).unwrap();

        assert_eq!(pending.get(tab_id), Some(450.0));
    }

    #[test]
    fn test_restore_falls_back_to_url() {
        let browser = FakeBrowser::new();

        block_on(restore(&browser, &PendingRestores::new(), &record("a", "https://plain.com", 1.0))).unwrap();

        assert_eq!(*browser.created.borrow(), vec!["https://plain.com"]);
    }

    #[test]
    fn test_scroll_applied_once_on_load() {
        let browser = FakeBrowser::new();
        let pending = PendingRestores::new();

        let tab_id = block_on(restore(&browser, &pending, &scrolled("a", 300.0))).unwrap();
        assert_eq!(pending.get(tab_id), Some(300.0));

        block_on(on_tab_loaded(&browser, &pending, tab_id));
        block_on(on_tab_loaded(&browser, &pending, tab_id));

        assert_eq!(*browser.scrolls.borrow(), vec![(tab_id, 300.0)]);
        assert!(pending.is_empty());
    }

    #[test]
    fn test_pending_cleared_when_scroll_fails() {
        let browser = FakeBrowser::new();
        browser.fail_scroll.set(true);
        let pending = PendingRestores::new();

        let tab_id = block_on(restore(&browser, &pending, &scrolled("a", 300.0))).unwrap();
        block_on(on_tab_loaded(&browser, &pending, tab_id));

        assert_eq!(browser.scrolls.borrow().len(), 1);
        assert_eq!(pending.get(tab_id), None);
    }

    #[test]
    fn test_unrelated_tab_load_ignored() {
        let browser = FakeBrowser::new();
        let pending = PendingRestores::new();
        pending.register(5, 120.0);

        block_on(on_tab_loaded(&browser, &pending, 6));

        assert!(browser.scrolls.borrow().is_empty());
        assert_eq!(pending.len(), 1);
    }

    #[test]
    fn test_forget_on_close() {
        let pending = PendingRestores::new();
        pending.register(5, 120.0);

        pending.forget(5);

        assert!(pending.is_empty());
    }

    #[test]
    fn test_restore_and_remove() {
        let (_store, archive) = archive_with(vec![scrolled("a", 300.0), scrolled("b", 10.0)]);
        let browser = FakeBrowser::new();
        let pending = PendingRestores::new();

        let removed = block_on(restore_and_remove(&browser, &pending, &archive, &scrolled("a", 300.0))).unwrap();

        assert!(removed);
        let remaining = block_on(archive.load()).unwrap();
        assert_eq!(remaining.records.len(), 1);
        assert_eq!(remaining.records[0].id, "b");
    }

    #[test]
    fn test_restore_and_remove_missing_entry() {
        let (store, archive) = archive_with(vec![scrolled("a", 300.0)]);
        let browser = FakeBrowser::new();

        let removed = block_on(restore_and_remove(&browser, &PendingRestores::new(), &archive, &scrolled("zzz", 1.0))).unwrap();

        assert!(!removed);
        assert_eq!(browser.created.borrow().len(), 1);
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn test_failed_open_keeps_archive_entry() {
        let (store, archive) = archive_with(vec![scrolled("a", 300.0)]);
        let browser = FakeBrowser::new();
        browser.fail_create.set(true);
        let pending = PendingRestores::new();

        let result = block_on(restore_and_remove(&browser, &pending, &archive, &scrolled("a", 300.0)));

        assert!(result.is_err());
        assert!(pending.is_empty());
        assert_eq!(store.write_count(), 0);
        assert_eq!(block_on(archive.load()).unwrap().records.len(), 1);
    }
}
