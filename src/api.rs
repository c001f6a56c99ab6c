// src/api.rs
//! Read-only browse API over a shared store snapshot.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::{Arc, RwLock, RwLockReadGuard};

use axum::{
    extract::{Query as QueryParams, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::CorsLayer;

use crate::article::Article;
use crate::config::ArchiveConfig;
use crate::error::QuerySyntaxError;
use crate::filter::{ArticleFilter, TagMode};
use crate::query::{Query, SearchField};
use crate::store::Store;

pub const DEFAULT_PAGE_SIZE: usize = 50;
pub const MAX_PAGE_SIZE: usize = 500;

#[derive(Clone)]
pub struct AppState {
    store: Arc<RwLock<Store>>,
    /// Where `POST /admin/reload` reads from; `None` disables reloading.
    store_path: Option<PathBuf>,
    search_fields: Arc<Vec<SearchField>>,
}

impl AppState {
    pub fn new(store: Store, store_path: Option<PathBuf>, search_fields: Vec<SearchField>) -> Self {
        Self {
            store: Arc::new(RwLock::new(store)),
            store_path,
            search_fields: Arc::new(search_fields),
        }
    }

    /// Load the store named by `cfg` and serve it.
    pub fn from_config(cfg: &ArchiveConfig) -> anyhow::Result<Self> {
        let store = Store::load(&cfg.store_path)?;
        Ok(Self::new(
            store,
            Some(cfg.store_path.clone()),
            cfg.search_fields.clone(),
        ))
    }

    pub fn article_count(&self) -> usize {
        self.store.read().map(|s| s.len()).unwrap_or(0)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Store>, ApiError> {
        self.store
            .read()
            .map_err(|_| ApiError::internal("store lock poisoned"))
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/articles", get(list_articles))
        .route("/tags", get(list_tags))
        .route("/admin/reload", post(admin_reload))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: serde_json::Value,
}

impl ApiError {
    fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: json!({ "error": msg.into() }),
        }
    }

    fn internal(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: json!({ "error": msg.into() }),
        }
    }
}

impl From<QuerySyntaxError> for ApiError {
    fn from(e: QuerySyntaxError) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: json!({ "error": e.to_string(), "position": e.position }),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

#[derive(Debug, Default, Deserialize)]
struct ArticlesParams {
    #[serde(default)]
    q: Option<String>,
    /// Comma-separated tag names.
    #[serde(default)]
    tags: Option<String>,
    #[serde(default)]
    mode: Option<String>,
    #[serde(default)]
    reverse: Option<bool>,
    #[serde(default)]
    limit: Option<usize>,
    #[serde(default)]
    offset: Option<usize>,
}

#[derive(Serialize)]
struct ArticlesOut {
    total: usize,
    offset: usize,
    limit: usize,
    articles: Vec<Article>,
}

async fn list_articles(
    State(state): State<AppState>,
    QueryParams(p): QueryParams<ArticlesParams>,
) -> Result<Json<ArticlesOut>, ApiError> {
    let query = Query::parse(p.q.as_deref().unwrap_or(""))?;
    let tags: BTreeSet<String> = p
        .tags
        .as_deref()
        .unwrap_or("")
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect();
    let mode = match p.mode.as_deref() {
        None | Some("") => TagMode::Any,
        Some(m) => m
            .parse::<TagMode>()
            .map_err(|e| ApiError::bad_request(e.to_string()))?,
    };
    let filter =
        ArticleFilter::new(query, tags, mode).with_fields(state.search_fields.as_ref().clone());

    let offset = p.offset.unwrap_or(0);
    let limit = p.limit.unwrap_or(DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE);

    let store = state.read()?;
    let hits = filter.apply(&store, p.reverse.unwrap_or(false));
    let total = hits.len();
    let articles = hits
        .into_iter()
        .skip(offset)
        .take(limit)
        .cloned()
        .collect();

    Ok(Json(ArticlesOut {
        total,
        offset,
        limit,
        articles,
    }))
}

#[derive(Serialize)]
struct TagsOut {
    total_articles: usize,
    tags: BTreeMap<String, usize>,
}

async fn list_tags(State(state): State<AppState>) -> Result<Json<TagsOut>, ApiError> {
    let store = state.read()?;
    Ok(Json(TagsOut {
        total_articles: store.len(),
        tags: store.tag_counts(),
    }))
}

async fn admin_reload(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let Some(path) = state.store_path.clone() else {
        return Err(ApiError {
            status: StatusCode::CONFLICT,
            body: json!({ "error": "no store path configured" }),
        });
    };

    let fresh = tokio::task::spawn_blocking(move || Store::load(&path))
        .await
        .map_err(|e| ApiError::internal(format!("reload task failed: {e}")))?
        .map_err(|e| ApiError::internal(e.to_string()))?;

    let articles = fresh.len();
    match state.store.write() {
        Ok(mut w) => *w = fresh,
        Err(_) => return Err(ApiError::internal("store lock poisoned")),
    }
    tracing::info!(articles, "store snapshot reloaded");
    Ok(Json(json!({ "reloaded": true, "articles": articles })))
}
