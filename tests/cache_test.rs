//! Integration tests for [`RecordCache`] over the filesystem durable
//! tier — TTL boundaries, promotion, corruption handling, sweeps.

use std::sync::Arc;
use std::time::Duration;

use hamstr::{CacheConfig, CacheEntry, FsStore, Record, RecordCache};

fn sample_record(id: u32) -> Record {
    Record {
        id,
        name: format!("item-{id}"),
        categories: vec!["normal".into()],
        numeric_attributes: [("hp".to_string(), 40.0)].into_iter().collect(),
        attribute_groups: Default::default(),
        images: Default::default(),
    }
}

fn fs_cache(dir: &std::path::Path, ttl: Duration) -> RecordCache {
    RecordCache::new(
        &CacheConfig::new().ttl(ttl),
        Arc::new(FsStore::with_dir(dir)),
    )
}

// =============================================================================
// Two-tier round trips
// =============================================================================

#[test]
fn set_writes_both_tiers() {
    let dir = tempfile::tempdir().unwrap();
    let cache = fs_cache(dir.path(), Duration::from_secs(3600));

    cache.set(7, sample_record(7));

    let stats = cache.stats();
    assert_eq!(stats.memory_entries, 1);
    assert_eq!(stats.durable_entries, 1);
    assert!(dir.path().join("catalog_item_7.json").exists());
}

#[test]
fn fresh_durable_entry_survives_a_cold_memory_tier() {
    let dir = tempfile::tempdir().unwrap();
    fs_cache(dir.path(), Duration::from_secs(3600)).set(7, sample_record(7));

    // New cache instance over the same directory: memory tier is cold,
    // the durable tier serves and promotes.
    let cache = fs_cache(dir.path(), Duration::from_secs(3600));
    assert_eq!(cache.get(7), Some(sample_record(7)));
    assert_eq!(cache.stats().memory_entries, 1);
}

#[test]
fn overwrite_replaces_the_whole_entry() {
    let dir = tempfile::tempdir().unwrap();
    let cache = fs_cache(dir.path(), Duration::from_secs(3600));

    cache.set(7, sample_record(7));
    let mut replacement = sample_record(7);
    replacement.name = "renamed".into();
    replacement.categories.clear();
    cache.set(7, replacement.clone());

    assert_eq!(cache.get(7), Some(replacement));
    assert_eq!(cache.stats().durable_entries, 1);
}

// =============================================================================
// TTL boundaries
// =============================================================================

#[test]
fn entry_present_before_ttl_absent_after() {
    let dir = tempfile::tempdir().unwrap();
    let cache = fs_cache(dir.path(), Duration::from_millis(80));

    cache.set(7, sample_record(7));
    assert_eq!(cache.get(7), Some(sample_record(7)));

    std::thread::sleep(Duration::from_millis(120));
    assert_eq!(cache.get(7), None);
    // The expired lookup purged the durable file as well.
    assert!(!dir.path().join("catalog_item_7.json").exists());
}

#[test]
fn expired_memory_entry_falls_through_to_a_fresher_durable_copy() {
    let dir = tempfile::tempdir().unwrap();
    let first = fs_cache(dir.path(), Duration::from_millis(80));
    first.set(7, sample_record(7));
    std::thread::sleep(Duration::from_millis(120));

    // A second instance over the same directory rewrites the entry, so
    // the durable tier is now fresher than `first`'s memory copy.
    let second = fs_cache(dir.path(), Duration::from_millis(80));
    let mut rewritten = sample_record(7);
    rewritten.name = "rewritten".into();
    second.set(7, rewritten.clone());

    assert_eq!(first.get(7), Some(rewritten));
    assert!(dir.path().join("catalog_item_7.json").exists());
}

#[test]
fn stale_durable_entry_is_purged_on_read() {
    let dir = tempfile::tempdir().unwrap();
    fs_cache(dir.path(), Duration::from_millis(40)).set(7, sample_record(7));
    std::thread::sleep(Duration::from_millis(80));

    // Cold memory tier forces the durable read path.
    let cache = fs_cache(dir.path(), Duration::from_millis(40));
    assert_eq!(cache.get(7), None);
    assert!(!dir.path().join("catalog_item_7.json").exists());
}

#[test]
fn is_valid_matches_the_ttl_window() {
    let dir = tempfile::tempdir().unwrap();
    let cache = fs_cache(dir.path(), Duration::from_secs(3600));

    let now_ms = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_millis() as u64;
    let fresh = CacheEntry {
        payload: sample_record(1),
        stored_at_ms: now_ms,
    };
    let stale = CacheEntry {
        payload: sample_record(2),
        stored_at_ms: now_ms - 2 * 3600 * 1000,
    };

    assert!(cache.is_valid(&fresh));
    assert!(!cache.is_valid(&stale));
}

// =============================================================================
// Corruption
// =============================================================================

#[test]
fn corrupt_durable_file_is_treated_as_absent_and_purged() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("catalog_item_3.json");
    std::fs::write(&path, "not valid json {{{").unwrap();

    let cache = fs_cache(dir.path(), Duration::from_secs(3600));
    assert_eq!(cache.get(3), None);
    assert!(!path.exists());
}

#[test]
fn foreign_files_in_the_cache_dir_are_ignored() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("unrelated.json"), "{}").unwrap();
    std::fs::write(dir.path().join("README"), "hello").unwrap();

    let cache = fs_cache(dir.path(), Duration::from_secs(3600));
    cache.set(1, sample_record(1));
    assert_eq!(cache.stats().durable_entries, 1);

    cache.clear();
    assert!(dir.path().join("unrelated.json").exists());
}

// =============================================================================
// Sweeps
// =============================================================================

#[test]
fn clean_expired_removes_only_stale_entries_and_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let cache = fs_cache(dir.path(), Duration::from_millis(60));

    cache.set(1, sample_record(1));
    cache.set(2, sample_record(2));
    std::thread::sleep(Duration::from_millis(100));
    cache.set(3, sample_record(3));

    cache.clean_expired();
    assert_eq!(cache.stats().durable_entries, 1);
    assert_eq!(cache.get(3), Some(sample_record(3)));

    cache.clean_expired();
    assert_eq!(cache.stats().durable_entries, 1);
    assert_eq!(cache.get(3), Some(sample_record(3)));
}

#[test]
fn clean_expired_removes_corrupt_entries() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("catalog_item_9.json"), "garbage").unwrap();

    let cache = fs_cache(dir.path(), Duration::from_secs(3600));
    cache.clean_expired();
    assert_eq!(cache.stats().durable_entries, 0);
}

#[test]
fn clear_empties_both_tiers() {
    let dir = tempfile::tempdir().unwrap();
    let cache = fs_cache(dir.path(), Duration::from_secs(3600));

    cache.set(1, sample_record(1));
    cache.set(2, sample_record(2));
    cache.clear();

    let stats = cache.stats();
    assert_eq!(stats.memory_entries, 0);
    assert_eq!(stats.durable_entries, 0);
    assert_eq!(cache.get(1), None);
}

// =============================================================================
// Stats
// =============================================================================

#[test]
fn hit_rate_is_bounded_and_moves_with_traffic() {
    let dir = tempfile::tempdir().unwrap();
    let cache = fs_cache(dir.path(), Duration::from_secs(3600));

    assert_eq!(cache.stats().approximate_hit_rate, 0.0);

    cache.set(1, sample_record(1));
    cache.get(1);
    cache.get(1);
    cache.get(999);

    let rate = cache.stats().approximate_hit_rate;
    assert!(rate > 0.0);
    assert!(rate <= 100.0);
}
