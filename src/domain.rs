/// Domain labels, archive ids, and per-domain counts for Focus Guard
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use url::Url;

use crate::tab_data::ArchiveRecord;

/// Label used when a URL cannot be parsed at all
pub const UNKNOWN_DOMAIN: &str = "unknown";

/// Hostname of `url` without a leading `www.`
///
/// Examples:
/// - https://www.example.com/x → example.com
/// - https://docs.rs/url → docs.rs
/// - not a url → unknown
///
/// URLs that parse but carry no host (`about:blank`, `file:///...`) give an
/// empty label; they are grouped together rather than reported as unknown.
pub fn domain_label(url: &str) -> String {
    let Ok(parsed) = Url::parse(url.trim()) else {
        return UNKNOWN_DOMAIN.to_string();
    };

    let hostname = parsed.host_str().unwrap_or_default();
    match hostname.strip_prefix("www.") {
        Some(stripped) if !stripped.is_empty() => stripped.to_string(),
        _ => hostname.to_string(),
    }
}

/// Generate a unique id for a new archive record
///
/// A random UUID v4 when the platform RNG is available (`crypto.getRandomValues`
/// under wasm), else a timestamp plus a per-process sequence and mixed suffix.
pub fn generate_archive_id(now_ms: f64) -> String {
    let mut bytes = [0u8; 16];
    match getrandom::getrandom(&mut bytes) {
        Ok(()) => uuid::Builder::from_random_bytes(bytes)
            .into_uuid()
            .to_string(),
        Err(err) => {
            log::warn!("RNG unavailable ({}), using timestamp archive id", err);
            fallback_archive_id(now_ms)
        }
    }
}

fn fallback_archive_id(now_ms: f64) -> String {
    static SEQUENCE: AtomicU64 = AtomicU64::new(0);

    let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
    let millis = now_ms.max(0.0) as u64;

    // splitmix64 finalizer
    let mut z = millis ^ seq.wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^= z >> 31;

    format!("{:x}-{:x}-{:08x}", millis, seq, z as u32)
}

/// Count archive records per domain label
pub fn count_domains(records: &[ArchiveRecord]) -> HashMap<String, usize> {
    records
        .iter()
        .map(ArchiveRecord::domain_label)
        .filter(|domain| !domain.is_empty())
        .fold(HashMap::new(), |mut counts, domain| {
            *counts.entry(domain).or_insert(0) += 1;
            counts
        })
}

/// Distinct domain labels with their counts, sorted by name (for the domain filter)
pub fn domain_facets(records: &[ArchiveRecord]) -> Vec<(String, usize)> {
    let mut facets: Vec<(String, usize)> = count_domains(records).into_iter().collect();
    facets.sort_by(|a, b| a.0.cmp(&b.0));
    facets
}
