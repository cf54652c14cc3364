/// Archive engine: turns open tabs into archive records and closes them
use std::collections::HashSet;

use futures::future::join_all;
use futures::lock::Mutex;

use crate::config::ARCHIVED_NOTIFICATION_TITLE;
use crate::domain::{domain_label, generate_archive_id};
use crate::error::{ProbeError, Result};
use crate::host::{Browser, Clock};
use crate::operations::{make_tabs_unique, select_overflow};
use crate::smart_url::{PositionContext, encode_smart_url};
use crate::storage::{ArchiveStore, KeyValueStore};
use crate::tab_data::{ArchiveRecord, ProbeData, TabId, TabInfo, TabQuery};

/// What one archive batch did
#[derive(Debug, Default)]
pub struct ArchiveBatch {
    pub records: Vec<ArchiveRecord>,
    /// Tabs archived without position data because the probe could not run
    pub probe_failures: usize,
    /// Tabs that were archived but could not be closed
    pub close_failures: usize,
}

impl ArchiveBatch {
    pub fn archived(&self) -> usize {
        self.records.len()
    }
}

/// Build the record for `tab`. A failed or empty probe yields the plain URL.
pub fn build_record(
    tab: &TabInfo,
    probe: &std::result::Result<Option<ProbeData>, ProbeError>,
    note: &str,
    now: f64,
) -> ArchiveRecord {
    let probe = probe.as_ref().ok().and_then(Option::as_ref);
    let context = PositionContext::from_probe(probe);

    ArchiveRecord {
        id: generate_archive_id(now),
        title: tab.title.clone(),
        url: tab.url.clone(),
        smart_url: encode_smart_url(&tab.url, &context),
        domain: domain_label(&tab.url),
        favicon_url: tab.fav_icon_url.clone().filter(|icon| !icon.is_empty()),
        scroll_y: context.scroll_y,
        date: now,
        note: note.trim().to_string(),
    }
}

/// Archive `tabs` with a shared note, closing each one
///
/// Probes run independently and a failure only costs that tab its position.
/// The archive is written once, after every tab has been handled. An
/// unreadable archive fails the batch before any tab is closed.
pub async fn archive_tabs<B, S, C>(
    browser: &B,
    archive: &ArchiveStore<S>,
    clock: &C,
    tabs: &[TabInfo],
    note: &str,
) -> Result<ArchiveBatch>
where
    B: Browser,
    S: KeyValueStore,
    C: Clock,
{
    let (tabs, duplicates) = make_tabs_unique(tabs);
    if !duplicates.is_empty() {
        log::debug!("Ignoring repeated tabs in archive batch: {:?}", duplicates);
    }
    archive.load().await?;

    let probes = join_all(tabs.iter().map(|tab| browser.probe_position(tab.id))).await;

    let mut batch = ArchiveBatch::default();
    for (tab, probe) in tabs.iter().zip(&probes) {
        if let Err(err) = probe {
            log::debug!("No reading position for {}: {}", tab.url, err);
            batch.probe_failures += 1;
        }

        batch.records.push(build_record(tab, probe, note, clock.now_ms()));

        if let Err(err) = browser.remove_tab(tab.id).await {
            log::warn!("Archived tab {} but could not close it: {}", tab.id, err);
            batch.close_failures += 1;
        }
    }

    archive.append(batch.records.clone()).await?;
    log::info!(
        "Archived {} tabs ({} without position)",
        batch.archived(),
        batch.probe_failures
    );
    Ok(batch)
}

/// Enforces the tab limit when new tabs open, and archives the popup's picks
#[derive(Default)]
pub struct ArchiveEngine {
    // one batch at a time, so overlapping runs cannot archive a tab twice
    gate: Mutex<()>,
}

impl ArchiveEngine {
    pub fn new() -> Self {
        ArchiveEngine::default()
    }

    /// Archive the oldest unpinned tabs until at most `limit` remain
    pub async fn archive_overflow<B, S, C>(
        &self,
        browser: &B,
        archive: &ArchiveStore<S>,
        clock: &C,
        limit: u32,
    ) -> Result<ArchiveBatch>
    where
        B: Browser,
        S: KeyValueStore,
        C: Clock,
    {
        let _gate = self.gate.lock().await;

        let tabs = browser.query_tabs(TabQuery::UNPINNED_CURRENT_WINDOW).await?;
        let overflow = select_overflow(&tabs, limit as usize);
        if overflow.is_empty() {
            return Ok(ArchiveBatch::default());
        }

        log::info!(
            "{} tabs open, limit {}: archiving {}",
            tabs.len(),
            limit,
            overflow.len()
        );
        let batch = archive_tabs(browser, archive, clock, &overflow, "").await?;

        let message = format!(
            "Closed {} tabs to save memory. Check your archive!",
            batch.archived()
        );
        if let Err(err) = browser.notify(ARCHIVED_NOTIFICATION_TITLE, &message).await {
            log::warn!("Archive notification failed: {}", err);
        }
        Ok(batch)
    }

    /// Archive the tabs picked in the popup that are still open
    pub async fn archive_selected<B, S, C>(
        &self,
        browser: &B,
        archive: &ArchiveStore<S>,
        clock: &C,
        selected: &[TabInfo],
        note: &str,
    ) -> Result<ArchiveBatch>
    where
        B: Browser,
        S: KeyValueStore,
        C: Clock,
    {
        let _gate = self.gate.lock().await;

        let open: HashSet<TabId> = browser
            .query_tabs(TabQuery::UNPINNED_CURRENT_WINDOW)
            .await?
            .iter()
            .map(|tab| tab.id)
            .collect();
        let (still_open, gone): (Vec<TabInfo>, Vec<TabInfo>) =
            selected.iter().cloned().partition(|tab| open.contains(&tab.id));
        if !gone.is_empty() {
            log::debug!("{} selected tabs were already closed", gone.len());
        }
        if still_open.is_empty() {
            return Ok(ArchiveBatch::default());
        }

        archive_tabs(browser, archive, clock, &still_open, note).await
    }
}
