/// The background worker's state and its reactions to browser events
///
/// One `Background` is built at startup and shared (via `Rc`) by every
/// listener. Work that outlives a listener call is handed to `spawn`.
use std::rc::Rc;

use futures::future::LocalBoxFuture;

use crate::archive::ArchiveEngine;
use crate::config::{CAPTURE_DEBOUNCE_MS, REMINDER_ALARM};
use crate::error::Result;
use crate::host::{Browser, Clock};
use crate::reminder::check_reminder;
use crate::restore::{PendingRestores, on_tab_loaded, restore, restore_and_remove};
use crate::settings::{Settings, SettingsStore, SettingsUpdate};
use crate::snapshot::{Debouncer, capture_now};
use crate::storage::{ArchiveStore, KeyValueStore};
use crate::tab_data::{ArchiveRecord, TabId, TabInfo};

/// Runs a detached task on the event loop
pub type Spawner = Box<dyn Fn(LocalBoxFuture<'static, ()>)>;

pub struct Background<B, S, C> {
    browser: B,
    store: Rc<S>,
    clock: C,
    spawn: Spawner,
    settings: SettingsStore<S>,
    archive: ArchiveStore<S>,
    engine: ArchiveEngine,
    capture: Debouncer,
    pending: PendingRestores,
}

impl<B, S, C> Background<B, S, C>
where
    B: Browser + 'static,
    S: KeyValueStore + 'static,
    C: Clock + 'static,
{
    pub fn new(browser: B, store: Rc<S>, clock: C, spawn: Spawner) -> Rc<Self> {
        Rc::new(Background {
            browser,
            settings: SettingsStore::new(store.clone()),
            archive: ArchiveStore::new(store.clone()),
            store,
            clock,
            spawn,
            engine: ArchiveEngine::new(),
            capture: Debouncer::new(),
            pending: PendingRestores::new(),
        })
    }

    /// Load settings and take a first snapshot
    pub fn start(self: &Rc<Self>) {
        let bg = Rc::clone(self);
        (self.spawn)(Box::pin(async move {
            bg.settings.ready().await;
            if let Err(err) = capture_now(&bg.browser, bg.store.as_ref(), &bg.clock).await {
                log::warn!("Initial tab capture failed: {}", err);
            }
        }));
    }

    /// Current settings, after the startup load has finished
    pub async fn settings(&self) -> Settings {
        self.settings.ready().await
    }

    #[cfg(test)]
    pub fn browser(&self) -> &B {
        &self.browser
    }

    #[cfg(test)]
    pub fn pending(&self) -> &PendingRestores {
        &self.pending
    }

    /// Schedule a snapshot capture, superseding any not yet run
    pub fn request_capture(self: &Rc<Self>) {
        let bg = Rc::clone(self);
        let task = self.capture.schedule(async move {
            bg.clock.sleep(CAPTURE_DEBOUNCE_MS).await;
            if let Err(err) = capture_now(&bg.browser, bg.store.as_ref(), &bg.clock).await {
                log::warn!("Tab capture failed: {}", err);
            }
        });
        (self.spawn)(Box::pin(async move {
            // Err means a newer request took over
            let _ = task.await;
        }));
    }

    /// The event that wakes a stopped worker arrives before settings are
    /// read, so the limit check waits for them
    pub fn on_tab_created(self: &Rc<Self>) {
        self.request_capture();

        let bg = Rc::clone(self);
        (self.spawn)(Box::pin(async move {
            let settings = bg.settings.ready().await;
            if !settings.auto_close_enabled {
                return;
            }
            let result = bg
                .engine
                .archive_overflow(&bg.browser, &bg.archive, &bg.clock, settings.tab_limit)
                .await;
            if let Err(err) = result {
                log::warn!("Auto-close failed: {}", err);
            }
        }));
    }

    pub fn on_tab_removed(self: &Rc<Self>, tab_id: TabId) {
        self.pending.forget(tab_id);
        self.request_capture();
    }

    /// `status` is the tab's new load status, when it changed
    pub fn on_tab_updated(self: &Rc<Self>, tab_id: TabId, status: Option<&str>) {
        if status != Some("complete") {
            return;
        }
        if self.pending.get(tab_id).is_some() {
            let bg = Rc::clone(self);
            (self.spawn)(Box::pin(async move {
                on_tab_loaded(&bg.browser, &bg.pending, tab_id).await;
            }));
        }
        self.request_capture();
    }

    pub fn on_tab_activated(self: &Rc<Self>) {
        self.request_capture();
    }

    pub fn on_alarm(self: &Rc<Self>, name: &str) {
        if name != REMINDER_ALARM {
            return;
        }
        let bg = Rc::clone(self);
        (self.spawn)(Box::pin(async move {
            match check_reminder(&bg.browser, bg.store.as_ref(), &bg.archive, &bg.clock).await {
                Ok(outcome) => log::debug!("Reminder check: {:?}", outcome),
                Err(err) => log::warn!("Reminder check failed: {}", err),
            }
        }));
    }

    /// Archive the popup's selection in the background
    pub fn archive_selected(self: &Rc<Self>, tabs: Vec<TabInfo>, note: String) {
        let bg = Rc::clone(self);
        (self.spawn)(Box::pin(async move {
            let result = bg
                .engine
                .archive_selected(&bg.browser, &bg.archive, &bg.clock, &tabs, &note)
                .await;
            if let Err(err) = result {
                log::warn!("Archiving selected tabs failed: {}", err);
            }
        }));
    }

    pub async fn open_archived(&self, record: &ArchiveRecord) -> Result<TabId> {
        restore(&self.browser, &self.pending, record).await
    }

    pub async fn restore_archived(&self, record: &ArchiveRecord) -> Result<bool> {
        restore_and_remove(&self.browser, &self.pending, &self.archive, record).await
    }

    pub async fn update_settings(&self, update: &SettingsUpdate) -> Result<Settings> {
        Ok(self.settings.update(update).await?)
    }

    pub async fn clear_archive(&self) -> Result<()> {
        self.archive.clear().await?;
        log::info!("Archive cleared");
        Ok(())
    }
}
