/// Debounced capture of the current window's tabs for the popup picker
use std::cell::RefCell;
use std::future::Future;

use futures::future::{AbortHandle, Abortable, abortable};
use serde_json::Value;

use crate::config::KEY_CURRENT;
use crate::error::Result;
use crate::host::{Browser, Clock};
use crate::storage::{self, KeyValueStore};
use crate::tab_data::{CurrentTabEntry, TabQuery};

/// Keeps at most one scheduled task alive; scheduling a new one aborts the old
#[derive(Default)]
pub struct Debouncer {
    pending: RefCell<Option<AbortHandle>>,
}

impl Debouncer {
    pub fn new() -> Self {
        Debouncer::default()
    }

    /// Wrap `task` so that the next call to `schedule` cancels it
    pub fn schedule<F: Future>(&self, task: F) -> Abortable<F> {
        let (task, handle) = abortable(task);
        if let Some(previous) = self.pending.replace(Some(handle)) {
            previous.abort();
        }
        task
    }
}

/// Replace the stored snapshot with the tabs open right now
pub async fn capture_now<B, S, C>(browser: &B, store: &S, clock: &C) -> Result<usize>
where
    B: Browser,
    S: KeyValueStore,
    C: Clock,
{
    let tabs = browser.query_tabs(TabQuery::UNPINNED_CURRENT_WINDOW).await?;
    let now = clock.now_ms();
    let entries: Vec<CurrentTabEntry> = tabs
        .iter()
        .map(|tab| CurrentTabEntry::from_tab(tab, now))
        .collect();

    storage::save(store, KEY_CURRENT, &entries).await?;
    log::debug!("Captured {} current tabs", entries.len());
    Ok(entries.len())
}

/// The stored snapshot minus entries without a url or title; the cleaned
/// list is written back when anything was dropped
pub async fn load_current_tabs<S: KeyValueStore>(store: &S) -> Result<Vec<CurrentTabEntry>> {
    let entries: Vec<Value> = storage::load(store, KEY_CURRENT).await?.unwrap_or_default();
    let total = entries.len();
    let valid: Vec<CurrentTabEntry> = entries
        .into_iter()
        .filter_map(|entry| serde_json::from_value::<CurrentTabEntry>(entry).ok())
        .filter(CurrentTabEntry::is_valid)
        .collect();

    if valid.len() != total {
        log::info!("Dropping {} invalid current-tab entries", total - valid.len());
        storage::save(store, KEY_CURRENT, &valid).await?;
    }
    Ok(valid)
}
