/// Auto-close settings: loaded once at startup, changed only by update requests
use std::cell::Cell;
use std::rc::Rc;

use futures::lock::Mutex;
use serde::{Deserialize, Serialize};

use crate::config::{DEFAULT_TAB_LIMIT, KEY_AUTO_CLOSE, KEY_TAB_LIMIT, MAX_TAB_LIMIT, MIN_TAB_LIMIT};
use crate::error::StorageError;
use crate::storage::{self, KeyValueStore};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub auto_close_enabled: bool,
    pub tab_limit: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            auto_close_enabled: false,
            tab_limit: DEFAULT_TAB_LIMIT,
        }
    }
}

/// Any subset of the settings, as sent by the popup
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdate {
    #[serde(default, alias = "autoClose", skip_serializing_if = "Option::is_none")]
    pub auto_close_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tab_limit: Option<f64>,
}

/// Round and clamp a requested tab limit into `[MIN_TAB_LIMIT, MAX_TAB_LIMIT]`.
/// `None` for NaN or infinity, which cannot be coerced.
pub fn clamp_tab_limit(value: f64) -> Option<u32> {
    if !value.is_finite() {
        return None;
    }
    Some(value.round().clamp(MIN_TAB_LIMIT as f64, MAX_TAB_LIMIT as f64) as u32)
}

impl Settings {
    /// Merge `update` into these settings
    pub fn apply(self, update: &SettingsUpdate) -> Settings {
        Settings {
            auto_close_enabled: update.auto_close_enabled.unwrap_or(self.auto_close_enabled),
            tab_limit: update
                .tab_limit
                .and_then(clamp_tab_limit)
                .unwrap_or(self.tab_limit),
        }
    }
}

pub struct SettingsStore<S> {
    store: Rc<S>,
    current: Cell<Settings>,
    // true once persisted settings are in memory
    loaded: Mutex<bool>,
}

impl<S: KeyValueStore> SettingsStore<S> {
    /// Start with defaults; the first `ready` loads what was persisted
    pub fn new(store: Rc<S>) -> Self {
        SettingsStore {
            store,
            current: Cell::new(Settings::default()),
            loaded: Mutex::new(false),
        }
    }

    /// Settings once the persisted values are in memory. Callers arriving
    /// while the first load runs wait for it. A failed load leaves the
    /// defaults in place and is retried by the next caller.
    pub async fn ready(&self) -> Settings {
        let mut loaded = self.loaded.lock().await;
        if !*loaded {
            match self.load().await {
                Ok(_) => *loaded = true,
                Err(err) => log::warn!("Could not load settings, using current values: {}", err),
            }
        }
        self.get()
    }

    /// Read persisted settings into memory, clamping anything out of range
    pub async fn load(&self) -> Result<Settings, StorageError> {
        let auto_close: Option<bool> = storage::load(self.store.as_ref(), KEY_AUTO_CLOSE).await?;
        let tab_limit: Option<f64> = storage::load(self.store.as_ref(), KEY_TAB_LIMIT).await?;

        let settings = Settings::default().apply(&SettingsUpdate {
            auto_close_enabled: auto_close,
            tab_limit,
        });
        self.current.set(settings);
        log::debug!("Settings loaded: {:?}", settings);
        Ok(settings)
    }

    pub fn get(&self) -> Settings {
        self.current.get()
    }

    /// Merge, then persist the full merged settings. Memory is updated even
    /// if the write fails, so the running worker follows the user's choice.
    pub async fn update(&self, update: &SettingsUpdate) -> Result<Settings, StorageError> {
        let merged = self.ready().await.apply(update);
        self.current.set(merged);

        storage::save(self.store.as_ref(), KEY_AUTO_CLOSE, &merged.auto_close_enabled).await?;
        storage::save(self.store.as_ref(), KEY_TAB_LIMIT, &merged.tab_limit).await?;
        log::info!(
            "Settings updated: auto-close {}, limit {}",
            merged.auto_close_enabled,
            merged.tab_limit
        );
        Ok(merged)
    }
}
