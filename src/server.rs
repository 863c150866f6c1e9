//! HTTP trigger endpoint.
//!
//! Lets a scheduler or the scrape's downstream hook start normalization
//! over HTTP instead of the command line.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/normalize` | Run normalization for a trigger event |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! `POST /normalize` answers with the `{statusCode, body}` trigger response
//! and uses `statusCode` as the HTTP status. An empty request body is the
//! default event (all stages, no clearing).
//!
//! # Error Contract
//!
//! Requests that never reach the handler (malformed JSON) get:
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "invalid event: ..." } }
//! ```

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::config::Config;
use crate::normalize::{handle_event, NormalizeEvent, TriggerResponse};

#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
}

/// Bind to `[server].bind` and serve until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let app = router(Arc::new(config.clone()));

    println!("Trigger endpoint listening on http://{}", bind_addr);
    info!(bind = %bind_addr, "serving");

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the router. Split out so tests can drive it without a socket.
pub fn router(config: Arc<Config>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/normalize", post(handle_normalize))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(AppState { config })
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

// ============ POST /normalize ============

async fn handle_normalize(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<TriggerResponse>), AppError> {
    let event: NormalizeEvent = if body.iter().all(u8::is_ascii_whitespace) {
        NormalizeEvent::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| bad_request(format!("invalid event: {e}")))?
    };

    let response = handle_event(&state.config, &event).await;
    let status =
        StatusCode::from_u16(response.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    Ok((status, Json(response)))
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn app() -> Router {
        let config: Config = toml::from_str("[db]\npath = \"unused.db\"\n").unwrap();
        router(Arc::new(config))
    }

    async fn send(app: Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = app.oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn post_json(body: &str) -> Request<Body> {
        Request::post("/normalize")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_reports_version() {
        let req = Request::get("/health").body(Body::empty()).unwrap();
        let (status, json) = send(app(), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
        assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn unknown_stage_mirrors_400() {
        let (status, json) = send(app(), post_json(r#"{"stage":"bogus"}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["statusCode"], 400);
        assert!(json["body"].as_str().unwrap().contains("bogus"));
    }

    #[tokio::test]
    async fn malformed_event_is_bad_request() {
        let (status, json) = send(app(), post_json("{not json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "bad_request");
    }

    #[tokio::test]
    async fn empty_body_runs_default_event() {
        // Default event needs the model; with the provider disabled it fails.
        let req = Request::post("/normalize").body(Body::empty()).unwrap();
        let (status, json) = send(app(), req).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["statusCode"], 500);
    }
}
