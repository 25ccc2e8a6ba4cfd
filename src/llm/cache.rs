//! Short-lived response cache.
//!
//! Keys are fingerprints of (normalized question, rounded readings), so
//! near-duplicate questions under near-identical conditions share a slot.
//! Expiry is lazy: a stale entry is purged by the read that finds it; no
//! background sweep runs.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::sensor::SensorReading;

struct CacheEntry {
    value: String,
    inserted_at: Instant,
}

pub struct ResponseCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, entries: Mutex::new(HashMap::new()) }
    }

    /// Fetch a live entry. A stale entry counts as a miss and is removed.
    pub fn get(&self, fingerprint: &str) -> Option<String> {
        let mut entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        match entries.get(fingerprint) {
            Some(entry) if entry.inserted_at.elapsed() <= self.ttl => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(fingerprint);
                None
            }
            None => None,
        }
    }

    pub fn put(&self, fingerprint: &str, value: &str) {
        let mut entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        entries.insert(
            fingerprint.to_string(),
            CacheEntry { value: value.to_string(), inserted_at: Instant::now() },
        );
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}

/// Canonical form of a question: lowercased, trailing question/exclamation
/// marks stripped, internal whitespace collapsed.
pub fn normalize_text(text: &str) -> String {
    let lowered = text.to_lowercase();
    let stripped = lowered.trim().trim_end_matches(['?', '\u{ff1f}', '!']);
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cache key for a question asked under given conditions. Readings are
/// rounded to the nearest integer per field before keying.
pub fn fingerprint(question: &str, reading: &SensorReading) -> String {
    format!(
        "{}|{}|{}|{}",
        normalize_text(question),
        reading.light.round() as i64,
        reading.temperature.round() as i64,
        reading.humidity.round() as i64,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn reading(light: f64, temperature: f64, humidity: f64) -> SensorReading {
        SensorReading { light, temperature, humidity }
    }

    #[test]
    fn normalization_collapses_near_duplicates() {
        assert_eq!(normalize_text("  Should I  dry clothes NOW?? "), "should i dry clothes now");
        assert_eq!(normalize_text("ตอนนี้ควรตากผ้าไหม?"), "ตอนนี้ควรตากผ้าไหม");
    }

    #[test]
    fn fingerprint_rounds_each_field() {
        let a = fingerprint("dry?", &reading(20_000.4, 31.6, 54.5));
        let b = fingerprint("DRY", &reading(20_000.0, 32.0, 55.0));
        assert_eq!(a, b);
        assert_eq!(a, "dry|20000|32|55");
    }

    #[test]
    fn fingerprint_separates_changed_conditions() {
        let a = fingerprint("dry?", &reading(20_000.0, 32.0, 55.0));
        let b = fingerprint("dry?", &reading(20_000.0, 32.0, 56.0));
        assert_ne!(a, b);
    }

    #[test]
    fn live_entries_hit() {
        let cache = ResponseCache::new(Duration::from_secs(60));
        cache.put("k", "v");
        assert_eq!(cache.get("k").as_deref(), Some("v"));
    }

    #[test]
    fn stale_entries_miss_and_are_purged() {
        let cache = ResponseCache::new(Duration::ZERO);
        cache.put("k", "v");
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(cache.get("k"), None);
        assert_eq!(cache.len(), 0);
    }
}
