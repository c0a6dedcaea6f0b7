//! Integration tests for the photo store
//!
//! Covers naming and listing order, deletion semantics and the storage
//! retention policy against a scratch directory.

use chrono::{Duration as ChronoDuration, NaiveDate, NaiveDateTime};
use moonbot_core::*;
use std::sync::Arc;

fn base_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 15)
        .unwrap()
        .and_hms_opt(8, 15, 0)
        .unwrap()
}

async fn test_store() -> (PhotoStore, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let store = PhotoStore::open(dir.path().join("moon_shots")).await.unwrap();
    (store, dir)
}

// ============================================================================
// NAMING AND LISTING
// ============================================================================

#[tokio::test]
async fn test_open_creates_directory() {
    let (store, _dir) = test_store().await;
    assert!(store.dir().is_dir());
    assert!(store.list().await.unwrap().is_empty());
    assert_eq!(store.total_size().await.unwrap(), 0);
}

#[tokio::test]
async fn test_list_is_newest_first_across_tags() {
    let (store, _dir) = test_store().await;
    let t = base_time();

    // Tags chosen so that plain name order would disagree with capture order
    let saves = [
        (PhotoTag::Shot, None, t),
        (PhotoTag::Auto, None, t + ChronoDuration::seconds(1)),
        (PhotoTag::Burst, Some(1), t + ChronoDuration::seconds(2)),
        (PhotoTag::Shot, None, t + ChronoDuration::hours(3)),
        (PhotoTag::Auto, None, t + ChronoDuration::days(1)),
    ];

    let mut saved = Vec::new();
    for (tag, index, at) in saves {
        saved.push(store.save_at(tag, b"jpeg", index, at).await.unwrap().name);
    }

    let listed: Vec<String> = store
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.name)
        .collect();
    saved.reverse();
    assert_eq!(listed, saved);
}

#[tokio::test]
async fn test_same_second_saves_stay_ordered() {
    let (store, _dir) = test_store().await;
    let t = base_time();

    let first = store.save_at(PhotoTag::Shot, b"a", None, t).await.unwrap();
    let second = store.save_at(PhotoTag::Auto, b"b", None, t).await.unwrap();
    let third = store.save_at(PhotoTag::Burst, b"c", Some(1), t).await.unwrap();
    let fourth = store.save_at(PhotoTag::Shot, b"d", None, t).await.unwrap();

    assert_eq!(first.name, "shot_20240315_081500.jpg");
    assert_eq!(second.name, "auto_20240315_081500_01.jpg");
    assert_eq!(third.name, "burst_20240315_081500_02.jpg");
    assert_eq!(fourth.name, "shot_20240315_081500_03.jpg");

    let listed: Vec<String> = store
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.name)
        .collect();
    assert_eq!(
        listed,
        vec![fourth.name, third.name, second.name, first.name]
    );
}

#[tokio::test]
async fn test_burst_members_carry_their_index() {
    let (store, _dir) = test_store().await;
    let t = base_time();

    for index in 1..=3 {
        let at = t + ChronoDuration::seconds(index as i64);
        let record = store
            .save_at(PhotoTag::Burst, b"frame", Some(index), at)
            .await
            .unwrap();
        assert!(record.name.ends_with(&format!("_{index:02}.jpg")));
        assert_eq!(record.tag, Some(PhotoTag::Burst));
        assert_eq!(record.captured_at, Some(at));
    }
}

#[tokio::test]
async fn test_foreign_and_temporary_files() {
    let (store, _dir) = test_store().await;
    store
        .save_at(PhotoTag::Shot, b"1234", None, base_time())
        .await
        .unwrap();

    tokio::fs::write(store.dir().join("holiday.jpg"), b"12").await.unwrap();
    tokio::fs::write(store.dir().join("notes.txt"), b"ignored").await.unwrap();
    tokio::fs::write(store.dir().join(".shot_20240315_081500.jpg.tmp"), b"partial")
        .await
        .unwrap();

    let listed = store.list().await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].name, "shot_20240315_081500.jpg");
    assert_eq!(listed[1].name, "holiday.jpg");
    assert_eq!(listed[1].tag, None);
    assert_eq!(store.total_size().await.unwrap(), 6);
}

#[tokio::test]
async fn test_concurrent_saves_get_unique_names() {
    let (store, _dir) = test_store().await;
    let store = Arc::new(store);
    let t = base_time();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store.save_at(PhotoTag::Auto, b"x", None, t).await.unwrap()
        }));
    }

    let mut names = Vec::new();
    for handle in handles {
        names.push(handle.await.unwrap().name);
    }
    names.sort();
    names.dedup();
    assert_eq!(names.len(), 8);
    assert_eq!(store.list().await.unwrap().len(), 8);
}

// ============================================================================
// READ AND DELETE
// ============================================================================

#[tokio::test]
async fn test_read_returns_saved_bytes() {
    let (store, _dir) = test_store().await;
    let record = store
        .save(PhotoTag::Shot, b"\xFF\xD8jpeg", None)
        .await
        .unwrap();
    assert_eq!(store.read(&record.name).await.unwrap(), b"\xFF\xD8jpeg");
}

#[tokio::test]
async fn test_delete_missing_is_not_found_and_changes_nothing() {
    let (store, _dir) = test_store().await;
    store
        .save_at(PhotoTag::Shot, b"abc", None, base_time())
        .await
        .unwrap();
    let before = store.list().await.unwrap();

    let err = store.delete("shot_19990101_000000.jpg").await.unwrap_err();
    assert!(matches!(err, MoonbotError::NotFound { .. }));
    assert_eq!(store.list().await.unwrap(), before);

    // Deleting twice: the second attempt reports NotFound
    tokio_test::assert_ok!(store.delete(&before[0].name).await);
    assert!(matches!(
        store.delete(&before[0].name).await,
        Err(MoonbotError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_path_traversal_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let outside = dir.path().join("outside.jpg");
    tokio::fs::write(&outside, b"keep me").await.unwrap();

    let store = PhotoStore::open(dir.path().join("moon_shots")).await.unwrap();
    for name in ["../outside.jpg", "..", "/etc/passwd", "sub\\x.jpg"] {
        assert!(matches!(
            store.delete(name).await,
            Err(MoonbotError::NotFound { .. })
        ));
        assert!(matches!(
            store.read(name).await,
            Err(MoonbotError::NotFound { .. })
        ));
    }
    assert!(outside.exists());
}

#[tokio::test]
async fn test_delete_all_counts() {
    let (store, _dir) = test_store().await;
    let t = base_time();
    for i in 0..4 {
        store
            .save_at(PhotoTag::Auto, b"data", None, t + ChronoDuration::seconds(i))
            .await
            .unwrap();
    }

    assert_eq!(store.delete_all().await.unwrap(), 4);
    assert!(store.list().await.unwrap().is_empty());
    assert_eq!(store.delete_all().await.unwrap(), 0);
}

// ============================================================================
// RETENTION
// ============================================================================

async fn fill(store: &PhotoStore, count: i64, size: usize) -> Vec<String> {
    let payload = vec![0u8; size];
    let mut names = Vec::new();
    for i in 0..count {
        let at = base_time() + ChronoDuration::minutes(i);
        names.push(
            store
                .save_at(PhotoTag::Auto, &payload, None, at)
                .await
                .unwrap()
                .name,
        );
    }
    names
}

#[tokio::test]
async fn test_retention_evicts_oldest_down_to_ceiling() {
    let (store, _dir) = test_store().await;
    // 15 photos of 800 kB = 12 MB against a 10 MB ceiling
    let names = fill(&store, 15, 800_000).await;

    let evicted = store.enforce_retention(10_000_000, 10).await.unwrap();

    assert_eq!(evicted, names[..3].to_vec());
    let usage = store.usage().await.unwrap();
    assert_eq!(usage.count, 12);
    assert_eq!(usage.total_size, 9_600_000);
    assert!(usage.total_size <= 10_000_000);
}

#[tokio::test]
async fn test_retention_respects_min_keep() {
    let (store, _dir) = test_store().await;
    let names = fill(&store, 12, 1_000).await;

    let evicted = store.enforce_retention(0, 10).await.unwrap();

    assert_eq!(evicted, names[..2].to_vec());
    let remaining: Vec<String> = store
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.name)
        .collect();
    assert_eq!(remaining.len(), 10);
    assert!(remaining.iter().all(|n| !evicted.contains(n)));
}

#[tokio::test]
async fn test_retention_noop_under_ceiling() {
    let (store, _dir) = test_store().await;
    fill(&store, 5, 100).await;

    assert!(store.enforce_retention(10_000, 0).await.unwrap().is_empty());
    assert_eq!(store.list().await.unwrap().len(), 5);
}

#[tokio::test]
async fn test_retention_postcondition() {
    for (count, size, ceiling, min_keep) in [
        (20, 500, 4_000, 3),
        (20, 500, 4_000, 15),
        (6, 10_000, 1, 0),
        (3, 10, 1_000_000, 1),
    ] {
        let (store, _dir) = test_store().await;
        fill(&store, count, size).await;

        store.enforce_retention(ceiling, min_keep).await.unwrap();

        let usage = store.usage().await.unwrap();
        assert!(usage.total_size <= ceiling || usage.count == min_keep);
        assert!(usage.count >= min_keep.min(count as usize));
    }
}

#[tokio::test]
async fn test_retention_evicts_foreign_files_first() {
    let (store, _dir) = test_store().await;
    fill(&store, 3, 100).await;
    tokio::fs::write(store.dir().join("holiday.jpg"), vec![0u8; 100])
        .await
        .unwrap();

    let evicted = store.enforce_retention(300, 0).await.unwrap();
    assert_eq!(evicted, vec!["holiday.jpg".to_string()]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_delete_racing_list_does_not_fail() {
    let (store, _dir) = test_store().await;
    let store = Arc::new(store);
    fill(&store, 30, 10).await;

    let deleter = {
        let store = store.clone();
        tokio::spawn(async move { store.delete_all().await })
    };
    for _ in 0..10 {
        tokio_test::assert_ok!(store.list().await);
    }
    assert_eq!(deleter.await.unwrap().unwrap(), 30);
}
