/// Filtering and paging behind the popup's archive browser
use crate::config::{ARCHIVE_PAGE_SIZE, DAY_MS};
use crate::tab_data::ArchiveRecord;

/// Age filter choices offered in the popup, in days
pub const AGE_FILTER_DAYS: [u32; 3] = [1, 7, 30];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArchiveQuery {
    /// Case-insensitive substring of title or URL
    pub search: String,
    /// Exact domain label; `None` for all domains
    pub domain: Option<String>,
    /// Only records archived within this many days
    pub max_age_days: Option<u32>,
}

impl ArchiveQuery {
    pub fn matches(&self, record: &ArchiveRecord, now: f64) -> bool {
        if let Some(domain) = &self.domain {
            if record.domain_label() != *domain {
                return false;
            }
        }

        if let Some(days) = self.max_age_days {
            let cutoff = now - f64::from(days) * DAY_MS;
            if !(record.date.is_finite() && record.date > 0.0 && record.date >= cutoff) {
                return false;
            }
        }

        let needle = self.search.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        format!("{} {}", record.title, record.url)
            .to_lowercase()
            .contains(&needle)
    }
}

/// Records matching `query`, newest first
pub fn filter_archive<'a>(
    records: &'a [ArchiveRecord],
    query: &ArchiveQuery,
    now: f64,
) -> Vec<&'a ArchiveRecord> {
    records
        .iter()
        .rev()
        .filter(|record| query.matches(record, now))
        .collect()
}

/// How many filtered records are on screen. Resets whenever the filters change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArchivePage {
    visible: usize,
}

impl Default for ArchivePage {
    fn default() -> Self {
        ArchivePage {
            visible: ARCHIVE_PAGE_SIZE,
        }
    }
}

impl ArchivePage {
    pub fn visible(&self, total: usize) -> usize {
        self.visible.min(total)
    }

    pub fn remaining(&self, total: usize) -> usize {
        total.saturating_sub(self.visible)
    }

    pub fn load_more(self) -> ArchivePage {
        ArchivePage {
            visible: self.visible + ARCHIVE_PAGE_SIZE,
        }
    }

    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        &items[..self.visible(items.len())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::record;

    const NOW: f64 = 1_700_000_000_000.0;

    fn sample() -> Vec<ArchiveRecord> {
        let mut rust = record("1", "https://www.rust-lang.org/learn", NOW - 10.0 * DAY_MS);
        rust.title = "Learn Rust".to_string();
        let mut docs = record("2", "https://docs.rs/serde", NOW - 2.0 * DAY_MS);
        docs.title = "serde - Docs.rs".to_string();
        let mut news = record("3", "https://news.ycombinator.com/item?id=1", NOW - 0.5 * DAY_MS);
        news.title = "Show HN: Rust in the browser".to_string();
        news.domain = "news.ycombinator.com".to_string();
        vec![rust, docs, news]
    }

    fn ids(records: &[&ArchiveRecord]) -> Vec<String> {
        records.iter().map(|r| r.id.clone()).collect()
    }

    #[test]
    fn test_no_filters_newest_first() {
        let records = sample();
        let result = filter_archive(&records, &ArchiveQuery::default(), NOW);
        assert_eq!(ids(&result), vec!["3", "2", "1"]);
    }

    #[test]
    fn test_search_title_and_url_case_insensitive() {
        let records = sample();
        let query = ArchiveQuery {
            search: "  RUST ".to_string(),
            ..ArchiveQuery::default()
        };

        let result = filter_archive(&records, &query, NOW);

        assert_eq!(ids(&result), vec!["3", "1"]);
    }

    #[test]
    fn test_domain_filter_uses_label() {
        let records = sample();
        let query = ArchiveQuery {
            domain: Some("rust-lang.org".to_string()),
            ..ArchiveQuery::default()
        };

        assert_eq!(ids(&filter_archive(&records, &query, NOW)), vec!["1"]);
    }

    #[test]
    fn test_age_filter() {
        let records = sample();
        let week = ArchiveQuery {
            max_age_days: Some(7),
            ..ArchiveQuery::default()
        };
        let day = ArchiveQuery {
            max_age_days: Some(1),
            ..ArchiveQuery::default()
        };

        assert_eq!(ids(&filter_archive(&records, &week, NOW)), vec!["3", "2"]);
        assert_eq!(ids(&filter_archive(&records, &day, NOW)), vec!["3"]);
    }

    #[test]
    fn test_age_filter_drops_undated_records() {
        let records = vec![record("legacy", "https://a.com", 0.0)];
        let query = ArchiveQuery {
            max_age_days: Some(30),
            ..ArchiveQuery::default()
        };

        assert!(filter_archive(&records, &query, NOW).is_empty());
    }

    #[test]
    fn test_filters_combine() {
        let records = sample();
        let query = ArchiveQuery {
            search: "rust".to_string(),
            domain: Some("news.ycombinator.com".to_string()),
            max_age_days: Some(7),
        };

        assert_eq!(ids(&filter_archive(&records, &query, NOW)), vec!["3"]);
    }

    #[test]
    fn test_paging() {
        let items: Vec<usize> = (0..40).collect();
        let page = ArchivePage::default();

        assert_eq!(page.slice(&items).len(), 15);
        assert_eq!(page.remaining(items.len()), 25);

        let page = page.load_more().load_more();
        assert_eq!(page.slice(&items).len(), 40);
        assert_eq!(page.remaining(items.len()), 0);
    }

    #[test]
    fn test_paging_short_list() {
        let items = vec!["only"];
        let page = ArchivePage::default();

        assert_eq!(page.slice(&items), &["only"]);
        assert_eq!(page.remaining(items.len()), 0);
    }
}
