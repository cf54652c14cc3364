/// Periodic nudge about archived tabs that have sat unread for a week
use crate::config::{KEY_LAST_REMINDER, REMINDER_COOLDOWN_MS, REMINDER_NOTIFICATION_TITLE, STALE_AFTER_MS};
use crate::error::Result;
use crate::host::{Browser, Clock};
use crate::storage::{self, ArchiveStore, KeyValueStore};
use crate::tab_data::ArchiveRecord;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReminderOutcome {
    /// The last reminder is less than a cooldown period old
    CoolingDown,
    NothingStale,
    Notified { stale: usize },
}

/// Records older than the staleness threshold at `now`. A date of 0 is
/// unknown and never counts.
pub fn stale_records(records: &[ArchiveRecord], now: f64) -> usize {
    records
        .iter()
        .filter(|record| record.date > 0.0 && now - record.date > STALE_AFTER_MS)
        .count()
}

fn reminder_message(stale: usize) -> String {
    if stale == 1 {
        "1 archived tab has been waiting for over a week.".to_string()
    } else {
        format!("{stale} archived tabs have been waiting for over a week.")
    }
}

/// One alarm tick: notify at most once per cooldown, and only about stale records
pub async fn check_reminder<B, S, C>(
    browser: &B,
    store: &S,
    archive: &ArchiveStore<S>,
    clock: &C,
) -> Result<ReminderOutcome>
where
    B: Browser,
    S: KeyValueStore,
    C: Clock,
{
    let now = clock.now_ms();
    let last: Option<f64> = storage::load(store, KEY_LAST_REMINDER).await?;
    if let Some(last) = last {
        if now - last < REMINDER_COOLDOWN_MS {
            return Ok(ReminderOutcome::CoolingDown);
        }
    }

    let data = archive.load().await?;
    let stale = stale_records(&data.records, now);
    if stale == 0 {
        return Ok(ReminderOutcome::NothingStale);
    }

    browser
        .notify(REMINDER_NOTIFICATION_TITLE, &reminder_message(stale))
        .await?;
    storage::save(store, KEY_LAST_REMINDER, &now).await?;
    log::info!("Reminded about {} stale archived tabs", stale);
    Ok(ReminderOutcome::Notified { stale })
}
