// tests/metrics.rs
use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use chrono::Utc;
use tower::ServiceExt;

use article_archive::ingest::{Batch, Normalizer, RawRecord};
use article_archive::metrics::Metrics;
use article_archive::store::Store;

#[tokio::test]
async fn metrics_endpoint_contains_ingest_series() {
    let metrics = Metrics::init(0).expect("install recorder");
    // A second init shares the same recorder instead of failing.
    assert!(Metrics::init(0).is_ok());

    let mut store = Store::new();
    store.ingest(
        &Batch::new(
            "metrics_batch",
            Utc::now(),
            vec![
                RawRecord::new().with("title", "Counted").with("url", "https://x/m"),
                RawRecord::new(),
            ],
        ),
        &Normalizer::default(),
    );

    let resp = metrics
        .router()
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = body::to_bytes(resp.into_body(), 1_048_576).await.unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    for needle in [
        "archive_ingest_added_total",
        "archive_ingest_rejected_total",
        "archive_store_articles",
    ] {
        assert!(text.contains(needle), "missing {needle} in:\n{text}");
    }
}
