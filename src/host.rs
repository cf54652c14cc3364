/// Browser capabilities the background logic depends on
///
/// `chrome.rs` implements these against the extension APIs; tests use the
/// fakes in `testing.rs`.
use crate::error::{BrowserError, ProbeError};
use crate::tab_data::{ProbeData, TabId, TabInfo, TabQuery};

#[allow(async_fn_in_trait)]
pub trait Browser {
    async fn query_tabs(&self, query: TabQuery) -> Result<Vec<TabInfo>, BrowserError>;

    /// Open a tab at `url`, returning the new tab's id
    async fn create_tab(&self, url: &str) -> Result<TabId, BrowserError>;

    async fn remove_tab(&self, tab_id: TabId) -> Result<(), BrowserError>;

    /// Run the read-only position probe in the tab's page.
    /// `Ok(None)` means the script ran but reported nothing.
    async fn probe_position(&self, tab_id: TabId) -> Result<Option<ProbeData>, ProbeError>;

    async fn scroll_to(&self, tab_id: TabId, scroll_y: f64) -> Result<(), BrowserError>;

    async fn notify(&self, title: &str, message: &str) -> Result<(), BrowserError>;
}

#[allow(async_fn_in_trait)]
pub trait Clock {
    /// Milliseconds since the Unix epoch
    fn now_ms(&self) -> f64;

    async fn sleep(&self, ms: u32);
}
