// tests/api_http.rs
//
// HTTP-level tests for the browse Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use chrono::{TimeZone, Utc};
use serde_json::Value as Json;
use std::collections::BTreeSet;
use tower::ServiceExt as _; // for `oneshot`

use article_archive::api::{self, AppState};
use article_archive::ingest::{Batch, Normalizer, RawRecord};
use article_archive::query::SearchField;
use article_archive::store::Store;

const BODY_LIMIT: usize = 1024 * 1024;

fn sample_store() -> Store {
    let mut s = Store::new();
    let b = Batch::new(
        "b1",
        Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap(),
        vec![
            RawRecord::new()
                .with("title", "Intro to Python")
                .with("url", "https://x/1")
                .with("published_date", "2024-05-01"),
            RawRecord::new()
                .with("title", "Python performance tricks")
                .with("url", "https://x/2")
                .with("published_date", "2024-05-20"),
            RawRecord::new()
                .with("title", "Rust for Android")
                .with("url", "https://x/3")
                .with("published_date", "2024-05-10"),
        ],
    );
    s.ingest(&b, &Normalizer::default());
    s.retag(|a| {
        let mut t = BTreeSet::new();
        if a.title.contains("Python") {
            t.insert("Python".to_string());
        }
        if a.title.contains("performance") {
            t.insert("Performance".to_string());
        }
        t
    });
    s
}

fn test_router() -> Router {
    api::router(AppState::new(sample_store(), None, vec![SearchField::Title]))
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, Json) {
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("build request");
    let resp = app.oneshot(req).await.expect("oneshot");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body");
    (status, serde_json::from_slice(&bytes).expect("json body"))
}

fn titles(v: &Json) -> Vec<&str> {
    v["articles"]
        .as_array()
        .expect("articles array")
        .iter()
        .map(|a| a["title"].as_str().unwrap_or_default())
        .collect()
}

#[tokio::test]
async fn health_returns_ok() {
    let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let resp = test_router().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT).await.unwrap();
    assert_eq!(&bytes[..], b"OK");
}

#[tokio::test]
async fn articles_default_to_newest_first() {
    let (status, v) = get_json(test_router(), "/articles").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["total"], 3);
    assert_eq!(
        titles(&v),
        ["Python performance tricks", "Rust for Android", "Intro to Python"]
    );

    let (_, rev) = get_json(test_router(), "/articles?reverse=true").await;
    assert_eq!(titles(&rev)[0], "Intro to Python");
}

#[tokio::test]
async fn query_and_tag_filters_combine() {
    let (_, v) = get_json(test_router(), "/articles?q=python%20or%20android").await;
    assert_eq!(v["total"], 3);

    let (_, v) = get_json(test_router(), "/articles?tags=Python,Performance&mode=all").await;
    assert_eq!(titles(&v), ["Python performance tricks"]);

    let (_, v) = get_json(test_router(), "/articles?q=intro&tags=Python").await;
    assert_eq!(titles(&v), ["Intro to Python"]);
}

#[tokio::test]
async fn paging_slices_after_filtering() {
    let (_, v) = get_json(test_router(), "/articles?limit=1&offset=1").await;
    assert_eq!(v["total"], 3);
    assert_eq!(titles(&v), ["Rust for Android"]);
}

#[tokio::test]
async fn bad_query_is_400_with_position() {
    let (status, v) = get_json(test_router(), "/articles?q=(python").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(v["position"], 0);
    assert!(v["error"].as_str().unwrap().contains("unmatched"));

    let (status, _) = get_json(test_router(), "/articles?mode=some").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn deeply_nested_query_is_rejected() {
    let depth = 5_000;
    let uri = format!("/articles?q={}a{}", "%28".repeat(depth), "%29".repeat(depth));
    let (status, v) = get_json(test_router(), &uri).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(v["position"], article_archive::query::MAX_NESTING);
    assert!(v["error"].as_str().unwrap().contains("nested too deeply"));
}

#[tokio::test]
async fn tags_endpoint_counts() {
    let (status, v) = get_json(test_router(), "/tags").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["total_articles"], 3);
    assert_eq!(v["tags"]["Python"], 2);
    assert_eq!(v["tags"]["Performance"], 1);
}

#[tokio::test]
async fn reload_swaps_in_the_file_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("master.json");
    sample_store().save(&path).unwrap();

    let app = api::router(AppState::new(Store::new(), Some(path), vec![SearchField::Title]));
    let (_, before) = get_json(app.clone(), "/articles").await;
    assert_eq!(before["total"], 0);

    let req = Request::builder()
        .method("POST")
        .uri("/admin/reload")
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let (_, after) = get_json(app, "/articles").await;
    assert_eq!(after["total"], 3);
}

#[tokio::test]
async fn reload_without_path_is_conflict() {
    let req = Request::builder()
        .method("POST")
        .uri("/admin/reload")
        .body(Body::empty())
        .unwrap();
    let resp = test_router().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}
