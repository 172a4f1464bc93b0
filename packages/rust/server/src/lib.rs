//! HTTP endpoint for keyword search over synced reports.
//!
//! One JSON route, `POST /query`, mirroring the interface the original
//! frontend speaks: Spanish-language error and empty-result messages,
//! `incidencias` payload on matches. Storage failures degrade to the
//! empty-result response inside the search service, never to a 500.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use incidesk_shared::{IncideskError, Result};
use incidesk_storage::Storage;

/// Shared handler state.
pub struct AppState {
    pub storage: Storage,
}

// ---------------------------------------------------------------------------
// Request/response bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct QueryRequest {
    #[serde(default)]
    keyword: String,
}

#[derive(Debug, Serialize)]
struct Incidencia {
    titulo: String,
    contenido: String,
}

#[derive(Debug, Serialize)]
struct QueryMatches {
    incidencias: Vec<Incidencia>,
}

#[derive(Debug, Serialize)]
struct QueryMessage {
    response: String,
}

#[derive(Debug, Serialize)]
struct QueryError {
    error: String,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/query", post(handle_query))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state)
}

/// Bind and serve until the process exits.
pub async fn serve(addr: SocketAddr, state: Arc<AppState>) -> Result<()> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| IncideskError::Network(format!("failed to bind {addr}: {e}")))?;

    info!(%addr, "query endpoint listening");

    axum::serve(listener, app)
        .await
        .map_err(|e| IncideskError::Network(format!("server error: {e}")))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn handle_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn handle_query(
    State(state): State<Arc<AppState>>,
    Json(request): Json<QueryRequest>,
) -> Response {
    let keyword = request.keyword.trim();

    if keyword.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(QueryError {
                error: "Debe proporcionar una palabra clave.".into(),
            }),
        )
            .into_response();
    }

    let hits = incidesk_core::search::search_reports(&state.storage, keyword).await;
    info!(keyword, hits = hits.len(), "query handled");

    if hits.is_empty() {
        return Json(QueryMessage {
            response: format!(
                "No se encontraron incidencias relacionadas con la palabra clave '{keyword}'."
            ),
        })
        .into_response();
    }

    Json(QueryMatches {
        incidencias: hits
            .into_iter()
            .map(|hit| Incidencia {
                titulo: hit.title,
                contenido: hit.content,
            })
            .collect(),
    })
    .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, header};
    use http_body_util::BodyExt;
    use incidesk_shared::Report;
    use tower::ServiceExt;
    use uuid::Uuid;

    async fn test_state() -> Arc<AppState> {
        let tmp = std::env::temp_dir().join(format!("incidesk_server_{}.db", Uuid::now_v7()));
        let storage = Storage::open(&tmp).await.expect("open test db");
        Arc::new(AppState { storage })
    }

    fn query_request(body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/query")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[tokio::test]
    async fn missing_keyword_is_rejected_in_spanish() {
        let app = router(test_state().await);

        let response = app
            .oneshot(query_request(serde_json::json!({})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Debe proporcionar una palabra clave.");
    }

    #[tokio::test]
    async fn empty_keyword_is_rejected() {
        let app = router(test_state().await);

        let response = app
            .oneshot(query_request(serde_json::json!({ "keyword": "  " })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn no_matches_returns_message() {
        let app = router(test_state().await);

        let response = app
            .oneshot(query_request(serde_json::json!({ "keyword": "disco" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(
            body["response"],
            "No se encontraron incidencias relacionadas con la palabra clave 'disco'."
        );
    }

    #[tokio::test]
    async fn matches_return_cleaned_incidencias() {
        let state = test_state().await;
        state
            .storage
            .upsert_report(&Report {
                title: "INC-001".into(),
                content: "<p>disk full</p>".into(),
            })
            .await
            .unwrap();

        let app = router(state);
        let response = app
            .oneshot(query_request(serde_json::json!({ "keyword": "disk" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["incidencias"][0]["titulo"], "INC-001");
        assert_eq!(body["incidencias"][0]["contenido"], "disk full");
    }

    #[tokio::test]
    async fn health_endpoint() {
        let app = router(test_state().await);

        let response = app
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
