/// In-memory fakes for the browser, storage, and clock
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use serde_json::Value;

use crate::error::{BrowserError, ProbeError, StorageError};
use crate::host::{Browser, Clock};
use crate::storage::KeyValueStore;
use crate::tab_data::{ArchiveRecord, ProbeData, TabId, TabInfo, TabQuery};

/// Completes on the second poll, letting other joined futures run in between
struct YieldNow(bool);

impl Future for YieldNow {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.0 {
            Poll::Ready(())
        } else {
            self.0 = true;
            cx.waker().wake_by_ref();
            Poll::Pending
        }
    }
}

pub fn yield_now() -> impl Future<Output = ()> {
    YieldNow(false)
}

pub fn record(id: &str, url: &str, date: f64) -> ArchiveRecord {
    ArchiveRecord {
        id: id.to_string(),
        title: format!("Title {id}"),
        url: url.to_string(),
        smart_url: String::new(),
        domain: String::new(),
        favicon_url: None,
        scroll_y: 0.0,
        date,
        note: String::new(),
    }
}

pub fn tab(id: TabId, url: &str) -> TabInfo {
    TabInfo::new(id, url.to_string(), format!("Tab {id}"), false, id)
}

#[derive(Default)]
pub struct MemoryStore {
    values: RefCell<HashMap<String, Value>>,
    writes: Cell<usize>,
    yielding: bool,
    fail_writes: Cell<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    /// Every get/set suspends once, exposing read-modify-write interleavings
    pub fn yielding() -> Self {
        MemoryStore {
            yielding: true,
            ..MemoryStore::default()
        }
    }

    pub fn insert(&self, key: &str, value: Value) {
        self.values.borrow_mut().insert(key.to_string(), value);
    }

    pub fn value(&self, key: &str) -> Option<Value> {
        self.values.borrow().get(key).cloned()
    }

    pub fn write_count(&self) -> usize {
        self.writes.get()
    }

    pub fn fail_writes(&self) {
        self.fail_writes.set(true);
    }
}

impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        if self.yielding {
            yield_now().await;
        }
        Ok(self.value(key))
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        if self.yielding {
            yield_now().await;
        }
        if self.fail_writes.get() {
            return Err(StorageError::Write {
                key: key.to_string(),
                message: "quota exceeded".to_string(),
            });
        }
        self.writes.set(self.writes.get() + 1);
        self.insert(key, value);
        Ok(())
    }
}

/// A single window of tabs plus a log of everything done to it
#[derive(Default)]
pub struct FakeBrowser {
    pub tabs: RefCell<Vec<TabInfo>>,
    pub probes: RefCell<HashMap<TabId, Result<Option<ProbeData>, ProbeError>>>,
    pub created: RefCell<Vec<String>>,
    pub removed: RefCell<Vec<TabId>>,
    pub scrolls: RefCell<Vec<(TabId, f64)>>,
    pub notifications: RefCell<Vec<(String, String)>>,
    pub queries: Cell<usize>,
    pub next_id: Cell<TabId>,
    pub fail_create: Cell<bool>,
    pub fail_scroll: Cell<bool>,
    pub fail_query: Cell<bool>,
}

impl FakeBrowser {
    pub fn new() -> Self {
        FakeBrowser {
            next_id: Cell::new(1000),
            ..FakeBrowser::default()
        }
    }

    pub fn with_tabs(tabs: Vec<TabInfo>) -> Self {
        let browser = FakeBrowser::new();
        *browser.tabs.borrow_mut() = tabs;
        browser
    }

    pub fn set_probe(&self, tab_id: TabId, result: Result<Option<ProbeData>, ProbeError>) {
        self.probes.borrow_mut().insert(tab_id, result);
    }

    pub fn open_ids(&self) -> Vec<TabId> {
        self.tabs.borrow().iter().map(|t| t.id).collect()
    }
}

impl Browser for FakeBrowser {
    async fn query_tabs(&self, query: TabQuery) -> Result<Vec<TabInfo>, BrowserError> {
        self.queries.set(self.queries.get() + 1);
        if self.fail_query.get() {
            return Err(BrowserError::api("tabs.query", "window closed"));
        }
        Ok(self
            .tabs
            .borrow()
            .iter()
            .filter(|t| t.pinned == query.pinned)
            .cloned()
            .collect())
    }

    async fn create_tab(&self, url: &str) -> Result<TabId, BrowserError> {
        if self.fail_create.get() {
            return Err(BrowserError::api("tabs.create", "no window"));
        }
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.created.borrow_mut().push(url.to_string());
        let index = self.tabs.borrow().len() as i32;
        self.tabs
            .borrow_mut()
            .push(TabInfo::new(id, url.to_string(), String::new(), false, index));
        Ok(id)
    }

    async fn remove_tab(&self, tab_id: TabId) -> Result<(), BrowserError> {
        let mut tabs = self.tabs.borrow_mut();
        let before = tabs.len();
        tabs.retain(|t| t.id != tab_id);
        if tabs.len() == before {
            return Err(BrowserError::api("tabs.remove", format!("No tab with id: {tab_id}")));
        }
        self.removed.borrow_mut().push(tab_id);
        Ok(())
    }

    async fn probe_position(&self, tab_id: TabId) -> Result<Option<ProbeData>, ProbeError> {
        // script injection is a round trip to the renderer
        yield_now().await;
        self.probes.borrow().get(&tab_id).cloned().unwrap_or(Ok(None))
    }

    async fn scroll_to(&self, tab_id: TabId, scroll_y: f64) -> Result<(), BrowserError> {
        self.scrolls.borrow_mut().push((tab_id, scroll_y));
        if self.fail_scroll.get() {
            return Err(BrowserError::api("scripting.executeScript", "tab crashed"));
        }
        Ok(())
    }

    async fn notify(&self, title: &str, message: &str) -> Result<(), BrowserError> {
        self.notifications
            .borrow_mut()
            .push((title.to_string(), message.to_string()));
        Ok(())
    }
}

/// Clock that only moves when told to; `sleep` yields once instead of waiting
pub struct ManualClock {
    now: Cell<f64>,
    pub sleeps: RefCell<Vec<u32>>,
}

impl ManualClock {
    pub fn at(now: f64) -> Self {
        ManualClock {
            now: Cell::new(now),
            sleeps: RefCell::new(Vec::new()),
        }
    }

    pub fn advance(&self, ms: f64) {
        self.now.set(self.now.get() + ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> f64 {
        self.now.get()
    }

    async fn sleep(&self, ms: u32) {
        self.sleeps.borrow_mut().push(ms);
        yield_now().await;
    }
}
