/// Constants shared by the background worker and the popup

/// chrome.storage.local keys
pub const KEY_ARCHIVED: &str = "archived";
pub const KEY_CURRENT: &str = "current";
pub const KEY_AUTO_CLOSE: &str = "autoCloseEnabled";
pub const KEY_TAB_LIMIT: &str = "tabLimit";
pub const KEY_LAST_REMINDER: &str = "lastReminderTimestamp";

/// Tab limit bounds and default
pub const MIN_TAB_LIMIT: u32 = 2;
pub const MAX_TAB_LIMIT: u32 = 50;
pub const DEFAULT_TAB_LIMIT: u32 = 10;

/// Delay that coalesces bursts of tab events into one snapshot capture
pub const CAPTURE_DEBOUNCE_MS: u32 = 200;

pub const REMINDER_ALARM: &str = "focus-guard-reminder";
pub const REMINDER_INTERVAL_MINUTES: f64 = 6.0 * 60.0;

const HOUR_MS: f64 = 60.0 * 60.0 * 1000.0;
pub const DAY_MS: f64 = 24.0 * HOUR_MS;
pub const REMINDER_COOLDOWN_MS: f64 = DAY_MS;
pub const STALE_AFTER_MS: f64 = 7.0 * DAY_MS;

/// Words of viewport text kept in a text-fragment anchor
pub const TEXT_FRAGMENT_MAX_WORDS: usize = 20;

/// Archive rows shown per "load more" page in the popup
pub const ARCHIVE_PAGE_SIZE: usize = 15;

pub const NOTIFICATION_ICON: &str = "icons/icon128.png";
pub const ARCHIVED_NOTIFICATION_TITLE: &str = "Focus-Guard Active";
pub const REMINDER_NOTIFICATION_TITLE: &str = "Focus-Guard Reminder";

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn extension_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("extension")
    }

    #[test]
    fn test_notification_icon_is_packaged() {
        assert!(extension_dir().join(NOTIFICATION_ICON).is_file());
    }

    #[test]
    fn test_manifest_icons_are_packaged() {
        let manifest = std::fs::read_to_string(extension_dir().join("manifest.json")).unwrap();
        let manifest: serde_json::Value = serde_json::from_str(&manifest).unwrap();

        let mut icons: Vec<&str> = manifest["icons"]
            .as_object()
            .unwrap()
            .values()
            .filter_map(|path| path.as_str())
            .collect();
        icons.extend(manifest["action"]["default_icon"].as_str());

        assert!(!icons.is_empty());
        for icon in icons {
            let bytes = std::fs::read(extension_dir().join(icon)).unwrap();
            assert!(bytes.starts_with(b"\x89PNG\r\n\x1a\n"), "{icon} is not a PNG");
        }
    }
}
