// tests/archive_e2e.rs
//
// Whole-pipeline checks: batches in, tagged + searchable store out.

use article_archive::classify::{Classifier, RuleTable, TagRule};
use article_archive::config::ArchiveConfig;
use article_archive::error::StoreError;
use article_archive::ingest::{Batch, Normalizer, RawRecord};
use article_archive::query::{self, Query, SearchField};
use article_archive::store::Store;
use chrono::{TimeZone, Utc};
use std::fs;

fn batch(id: &str, day: u32, records: Vec<RawRecord>) -> Batch {
    Batch::new(id, Utc.with_ymd_and_hms(2024, 6, day, 8, 0, 0).unwrap(), records)
}

fn rec(title: &str, url: &str) -> RawRecord {
    RawRecord::new().with("title", title).with("url", url)
}

#[test]
fn two_variants_become_one_python_article() {
    let mut store = Store::new();
    let report = store.ingest(
        &batch(
            "medium_articles_2024_06_01",
            1,
            vec![
                rec("Intro to Python", "https://x/1"),
                rec("Intro to Python ", "https://x/1?utm=a"),
            ],
        ),
        &Normalizer::default(),
    );
    assert_eq!(store.len(), 1);
    assert_eq!(report.added, 1);

    let table = RuleTable::new(vec![TagRule::new("Python", &["python"], &[])]);
    Classifier::new(&table).classify_store(&mut store);

    let a = store.iter().next().unwrap();
    assert_eq!(a.tags.iter().collect::<Vec<_>>(), ["Python"]);

    let fields = [SearchField::Title];
    let q_and = Query::parse("python and tutorial").unwrap();
    let q_or = Query::parse("python or java").unwrap();
    assert!(!query::matches(&q_and, a, &fields));
    assert!(query::matches(&q_or, a, &fields));
}

#[test]
fn ingesting_the_same_batch_twice_is_a_no_op() {
    let n = Normalizer::default();
    let b = batch(
        "b1",
        3,
        vec![
            rec("A", "https://x/a"),
            RawRecord::new().with("title", "No link"),
            RawRecord::new(),
        ],
    );
    let mut store = Store::new();
    let first = store.ingest(&b, &n);
    assert_eq!((first.added, first.rejected), (2, 1));

    let snapshot = store.clone();
    let second = store.ingest(&b, &n);
    assert_eq!(second.added, 0);
    assert_eq!(second.updated, 0);
    assert_eq!(store, snapshot);
}

#[test]
fn save_then_load_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("master.json");

    let mut store = Store::new();
    store.ingest(
        &batch(
            "b1",
            2,
            vec![
                rec("How to learn Rust", "https://x/rust"),
                RawRecord::new()
                    .with("title", "Untitled digest")
                    .with("published_date", "2024-05-30"),
            ],
        ),
        &Normalizer::default(),
    );
    Classifier::new(&RuleTable::builtin()).classify_store(&mut store);
    store.save(&path).unwrap();

    assert!(!path.with_extension("json.tmp").exists());
    let back = Store::load(&path).unwrap();
    assert_eq!(back, store);
    assert_eq!(back.history().len(), 1);
}

#[test]
fn missing_file_is_empty_but_garbage_is_corruption() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("none.json");
    assert!(Store::load(&missing).unwrap().is_empty());

    let bad = dir.path().join("bad.json");
    fs::write(&bad, "{ this is not json").unwrap();
    match Store::load(&bad) {
        Err(StoreError::Corruption(e)) => assert_eq!(e.path, bad),
        other => panic!("expected corruption, got {other:?}"),
    }
}

#[test]
fn run_ingest_reads_files_classifies_and_saves() {
    let dir = tempfile::tempdir().unwrap();
    let b1 = dir.path().join("medium_articles_2024_06_01.json");
    let b2 = dir.path().join("medium_articles_2024_06_02.json");
    fs::write(
        &b1,
        r#"{"articles": [
            {"title": "Intro to Python", "url": "https://x/1", "email_date": "2024-06-01"},
            {"title": "", "url": ""}
        ]}"#,
    )
    .unwrap();
    fs::write(
        &b2,
        r#"[{"title": "Intro to Python", "url": "https://x/1?utm_source=mail"},
            {"title": "Scaling Postgres with SQL", "url": "https://x/2"}]"#,
    )
    .unwrap();

    let cfg = ArchiveConfig {
        store_path: dir.path().join("master.json"),
        ..ArchiveConfig::default()
    };
    let summary = article_archive::run_ingest(&cfg, &[&b1, &b2]).unwrap();
    assert_eq!(summary.batches, 2);
    assert_eq!(summary.ingest.added, 2);
    assert_eq!(summary.ingest.rejected, 1);
    assert_eq!(summary.ingest.unchanged, 1);
    assert_eq!(summary.classification.articles, 2);

    let store = Store::load(&cfg.store_path).unwrap();
    assert_eq!(store.len(), 2);
    let counts = store.tag_counts();
    assert_eq!(counts.get("Python"), Some(&1));
    assert_eq!(counts.get("Database"), Some(&1));

    // Re-running over the same files adds nothing.
    let again = article_archive::run_ingest(&cfg, &[&b1, &b2]).unwrap();
    assert_eq!(again.ingest.added, 0);
    assert_eq!(Store::load(&cfg.store_path).unwrap().history().len(), 2);
}

#[test]
fn unreadable_batch_aborts_before_writing() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = ArchiveConfig {
        store_path: dir.path().join("master.json"),
        ..ArchiveConfig::default()
    };
    let missing = dir.path().join("nope.json");
    assert!(article_archive::run_ingest(&cfg, &[&missing]).is_err());
    assert!(!cfg.store_path.exists());
}
