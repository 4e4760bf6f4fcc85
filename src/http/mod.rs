//! HTTP transport.
//!
//! Thin edge over the core: request validation happens here, and malformed
//! caller input is the only thing that ever turns into a request-level error.
//! Core outcomes, including total discovery failure, are always 200 with
//! per-category status inside the catalog.

use crate::cache::{CacheStore, CachedCatalogService};
use crate::k8s::{ApplicationRef, ResourceBackend};
use crate::links::LinkCatalog;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::warn;

/// Header the deployment tool forwards with every extension request,
/// formatted `namespace:app_name`.
pub const APPLICATION_NAME_HEADER: &str = "argocd-application-name";

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<CachedCatalogService>,
    pub backend: Arc<dyn ResourceBackend>,
    pub store: Arc<dyn CacheStore>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/ready", get(ready))
        .route("/api/v1/applications/{app_name}/links", get(application_links))
        .with_state(state)
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.message }))).into_response()
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: DateTime<Utc>,
    version: &'static str,
}

#[derive(Serialize)]
struct ReadyResponse {
    ready: bool,
    checks: BTreeMap<&'static str, bool>,
    timestamp: DateTime<Utc>,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: Utc::now(),
        version: crate::VERSION,
    })
}

async fn ready(State(state): State<AppState>) -> Json<ReadyResponse> {
    let (cache, kubernetes) = tokio::join!(state.store.ping(), state.backend.ping());

    let mut checks = BTreeMap::new();
    checks.insert("cache", cache);
    checks.insert("kubernetes", kubernetes);

    Json(ReadyResponse {
        ready: cache && kubernetes,
        checks,
        timestamp: Utc::now(),
    })
}

async fn application_links(
    State(state): State<AppState>,
    Path(app_name): Path<String>,
    headers: HeaderMap,
) -> Result<Json<LinkCatalog>, ApiError> {
    let app_ref = parse_application_ref(&app_name, &headers)?;
    Ok(Json(state.catalog.get_links(&app_ref).await))
}

/// Validate the application header against the path before the core runs.
fn parse_application_ref(app_name: &str, headers: &HeaderMap) -> Result<ApplicationRef, ApiError> {
    let raw = headers
        .get(APPLICATION_NAME_HEADER)
        .ok_or_else(|| ApiError::bad_request("Missing Argocd-Application-Name header"))?
        .to_str()
        .map_err(|_| ApiError::bad_request("Argocd-Application-Name header is not valid text"))?;

    let Some((namespace, header_app_name)) = raw.split_once(':') else {
        return Err(ApiError::bad_request(format!(
            "Invalid Argocd-Application-Name header format. Expected 'namespace:app_name', got '{raw}'"
        )));
    };

    if namespace.is_empty() || header_app_name.is_empty() {
        return Err(ApiError::bad_request(format!(
            "Invalid Argocd-Application-Name header format. Expected 'namespace:app_name', got '{raw}'"
        )));
    }

    if header_app_name != app_name {
        warn!(
            url_app_name = %app_name,
            header_app_name = %header_app_name,
            "Application name mismatch"
        );
        return Err(ApiError::bad_request(format!(
            "Application name mismatch: URL has '{app_name}' but header has '{header_app_name}'"
        )));
    }

    Ok(ApplicationRef::new(namespace, app_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(APPLICATION_NAME_HEADER, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn rejects_missing_header() {
        let err = parse_application_ref("checkout", &HeaderMap::new()).unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(err.message.contains("Missing"));
    }

    #[test]
    fn rejects_header_without_separator() {
        let err = parse_application_ref("checkout", &headers("checkout")).unwrap_err();
        assert!(err.message.contains("Expected 'namespace:app_name'"));
    }

    #[test]
    fn rejects_empty_namespace() {
        let err = parse_application_ref("checkout", &headers(":checkout")).unwrap_err();
        assert!(err.message.contains("Expected 'namespace:app_name'"));
    }

    #[test]
    fn rejects_name_mismatch() {
        let err = parse_application_ref("checkout", &headers("nonprod:billing")).unwrap_err();
        assert!(err.message.contains("mismatch"));
    }

    #[test]
    fn accepts_valid_header() {
        let app_ref = parse_application_ref("checkout", &headers("nonprod:checkout")).unwrap();
        assert_eq!(app_ref.namespace, "nonprod");
        assert_eq!(app_ref.app_name, "checkout");
    }

    #[test]
    fn app_name_may_itself_contain_colons_only_after_namespace() {
        let app_ref = parse_application_ref("a:b", &headers("ns:a:b")).unwrap();
        assert_eq!(app_ref.namespace, "ns");
        assert_eq!(app_ref.app_name, "a:b");
    }
}
