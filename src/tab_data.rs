/// Data structures for Focus Guard
use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

use crate::domain::domain_label;

pub type TabId = i32;

/// Information about a browser tab, as returned by `chrome.tabs.query`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabInfo {
    pub id: TabId,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub index: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fav_icon_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_accessed: Option<f64>,
}

#[cfg(test)]
impl TabInfo {
    pub fn new(id: TabId, url: String, title: String, pinned: bool, index: i32) -> TabInfo {
        TabInfo {
            id,
            url,
            title,
            pinned,
            index,
            fav_icon_url: None,
            last_accessed: None,
        }
    }
}

/// Filter passed to `chrome.tabs.query`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TabQuery {
    pub pinned: bool,
    pub current_window: bool,
}

impl TabQuery {
    /// Non-pinned tabs of the current window: the set the tab limit applies to
    pub const UNPINNED_CURRENT_WINDOW: TabQuery = TabQuery {
        pinned: false,
        current_window: true,
    };
}

/// What the page probe script reports about the reading position
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeData {
    #[serde(default)]
    pub scroll_x: f64,
    #[serde(default)]
    pub scroll_y: f64,
    #[serde(default)]
    pub text_fragment: Option<String>,
}

/// An archived (closed) tab. Never edited after creation, only deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub smart_url: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favicon_url: Option<String>,
    #[serde(default)]
    pub scroll_y: f64,
    #[serde(default, deserialize_with = "lenient_date")]
    pub date: f64,
    #[serde(default)]
    pub note: String,
}

/// Layouts older archives used when `date` was stored as display text
const LEGACY_DATE_FORMATS: &[&str] = &[
    "%m/%d/%Y, %I:%M:%S %p",
    "%m/%d/%Y, %H:%M:%S",
    "%d.%m.%Y, %H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Epoch milliseconds for a stored date string, 0 when it cannot be read.
/// Strings without an offset are taken as UTC.
pub fn parse_legacy_date(text: &str) -> f64 {
    // Newer locale output puts a narrow no-break space before AM/PM
    let text = text.trim().replace(['\u{202f}', '\u{a0}'], " ");

    if let Ok(ms) = text.parse::<f64>() {
        return if ms.is_finite() { ms } else { 0.0 };
    }
    if let Ok(date) = DateTime::parse_from_rfc3339(&text) {
        return date.timestamp_millis() as f64;
    }
    LEGACY_DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(&text, format).ok())
        .map(|date| date.and_utc().timestamp_millis() as f64)
        .unwrap_or(0.0)
}

fn lenient_date<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StoredDate {
        Millis(f64),
        Text(String),
    }

    Ok(match Option::<StoredDate>::deserialize(deserializer)? {
        Some(StoredDate::Millis(ms)) => ms,
        Some(StoredDate::Text(text)) => parse_legacy_date(&text),
        None => 0.0,
    })
}

impl ArchiveRecord {
    /// Cached domain label, recomputed from the URL when it was stripped
    pub fn domain_label(&self) -> String {
        if self.domain.is_empty() {
            domain_label(&self.url)
        } else {
            self.domain.clone()
        }
    }

    /// URL to reopen: the smart URL when present, else the original
    pub fn open_url(&self) -> &str {
        if self.smart_url.is_empty() {
            &self.url
        } else {
            &self.smart_url
        }
    }

    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            &self.url
        } else {
            &self.title
        }
    }

    pub fn matcher(&self) -> RecordMatcher {
        RecordMatcher {
            id: Some(self.id.clone()).filter(|id| !id.is_empty()),
            url: self.url.clone(),
            date: self.date,
        }
    }
}

/// Identifies the archive entry to delete: by id when known, else by (url, date)
#[derive(Debug, Clone, PartialEq)]
pub struct RecordMatcher {
    pub id: Option<String>,
    pub url: String,
    pub date: f64,
}

impl RecordMatcher {
    pub fn matches(&self, record: &ArchiveRecord) -> bool {
        match &self.id {
            Some(id) => record.id == *id,
            None => record.url == self.url && record.date == self.date,
        }
    }
}

/// One row of the "current tabs" snapshot shown in the popup picker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentTabEntry {
    #[serde(default)]
    pub id: Option<TabId>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub date: f64,
}

impl CurrentTabEntry {
    pub fn from_tab(tab: &TabInfo, now: f64) -> CurrentTabEntry {
        CurrentTabEntry {
            id: Some(tab.id),
            title: Some(tab.title.clone()),
            url: Some(tab.url.clone()),
            date: tab.last_accessed.unwrap_or(now),
        }
    }

    pub fn is_valid(&self) -> bool {
        let present = |s: &Option<String>| s.as_deref().is_some_and(|s| !s.is_empty());
        present(&self.url) && present(&self.title)
    }
}
