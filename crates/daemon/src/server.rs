//! Webhook HTTP server
//!
//! `POST /` receives recorder events; `GET /getStatus` serves the liveness probe.

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::dispatch::EventDispatcher;
use crate::events::RecorderEvent;
use crate::status::{StatusError, StatusProbe, StatusReport};

/// Errors that can occur when running the server
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to bind to address {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    #[error("Server error: {0}")]
    Serve(std::io::Error),
}

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<EventDispatcher>,
    pub status: Arc<StatusProbe>,
}

impl IntoResponse for StatusError {
    fn into_response(self) -> Response {
        error!("{}", self);
        StatusCode::INTERNAL_SERVER_ERROR.into_response()
    }
}

/// Handler for POST /
///
/// The body is decoded here rather than through `Json` so a recorder that
/// omits the content type is still accepted.
async fn receive_event(State(state): State<AppState>, body: Bytes) -> StatusCode {
    let event = match RecorderEvent::from_slice(&body) {
        Ok(event) => event,
        Err(e) => {
            warn!("Cannot parse body: {}", e);
            return StatusCode::BAD_REQUEST;
        }
    };

    state.dispatcher.dispatch(&event).await;
    StatusCode::OK
}

/// Handler for GET /getStatus
async fn get_status(State(state): State<AppState>) -> Result<Json<StatusReport>, StatusError> {
    let report = state.status.probe().await?;
    Ok(Json(report))
}

/// Creates the axum Router with both endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", post(receive_event))
        .route("/getStatus", get(get_status))
        .with_state(state)
}

/// Runs the server until it fails
pub async fn run_server(addr: &str, state: AppState) -> Result<(), ServerError> {
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind {
            addr: addr.to_string(),
            source,
        })?;
    info!("Listening at \"{}\"", addr);

    axum::serve(listener, app).await.map_err(ServerError::Serve)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::tests::{CapturingNotifier, CapturingQueue};
    use crate::events::RoomEvent;
    use crate::queue::TranscodeJob;
    use axum::body::Body;
    use axum::http::{Method, Request};
    use std::path::PathBuf;
    use tempfile::TempDir;
    use tower::ServiceExt;

    struct Harness {
        app: Router,
        notifier: Arc<CapturingNotifier>,
        queue: Arc<CapturingQueue>,
        log_dir: TempDir,
    }

    fn harness() -> Harness {
        let notifier = Arc::new(CapturingNotifier::default());
        let queue = Arc::new(CapturingQueue::default());
        let log_dir = TempDir::new().unwrap();
        let state = AppState {
            dispatcher: Arc::new(EventDispatcher::new(
                PathBuf::from("/srv/rec"),
                notifier.clone(),
                queue.clone(),
            )),
            status: Arc::new(StatusProbe::new(log_dir.path().to_path_buf())),
        };
        Harness {
            app: create_router(state),
            notifier,
            queue,
            log_dir,
        }
    }

    fn post_event(body: &str) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri("/")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_status_request() -> Request<Body> {
        Request::builder()
            .uri("/getStatus")
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_session_started_sends_online() {
        let h = harness();

        let response = h
            .app
            .oneshot(post_event(
                r#"{"EventType":"SessionStarted","EventId":"1","EventData":{"RoomId":100}}"#,
            ))
            .await
            .unwrap();

        assert!(response.status().is_success());
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert!(body.is_empty());
        assert_eq!(*h.notifier.calls.lock().await, vec![(100, RoomEvent::Online)]);
        assert!(h.queue.jobs.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_file_closed_enqueues_resolved_path() {
        let h = harness();

        let response = h
            .app
            .oneshot(post_event(
                r#"{"EventType":"FileClosed","EventData":{"RoomId":5,"RelativePath":"5/a.flv"}}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(*h.notifier.calls.lock().await, vec![(5, RoomEvent::Stop)]);
        assert_eq!(
            *h.queue.jobs.lock().await,
            vec![TranscodeJob::new("/srv/rec/5/a.flv")]
        );
    }

    #[tokio::test]
    async fn test_body_without_content_type_is_accepted() {
        let h = harness();

        let request = Request::builder()
            .method(Method::POST)
            .uri("/")
            .body(Body::from(r#"{"EventType":"SessionEnded","EventData":{"RoomId":3}}"#))
            .unwrap();
        let response = h.app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(*h.notifier.calls.lock().await, vec![(3, RoomEvent::Offline)]);
    }

    #[tokio::test]
    async fn test_malformed_body_is_rejected_without_side_effects() {
        let h = harness();

        let response = h.app.oneshot(post_event("{not json")).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(h.notifier.calls.lock().await.is_empty());
        assert!(h.queue.jobs.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_wrong_method_is_rejected() {
        let h = harness();

        let get_root = Request::builder().uri("/").body(Body::empty()).unwrap();
        let response = h.app.clone().oneshot(get_root).await.unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);

        let post_status = Request::builder()
            .method(Method::POST)
            .uri("/getStatus")
            .body(Body::empty())
            .unwrap();
        let response = h.app.oneshot(post_status).await.unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_get_status_returns_json() {
        let h = harness();
        let line = format!(r#"{{"@mt":"started","ProcessId":{},"x":1}}"#, std::process::id());
        std::fs::write(
            h.log_dir.path().join("bilirec20230215.txt"),
            format!("{}\n", line),
        )
        .unwrap();

        let response = h.app.oneshot(get_status_request()).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response
            .headers()
            .get("content-type")
            .expect("should have content-type header");
        assert!(content_type.to_str().unwrap().contains("application/json"));

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let report: StatusReport = serde_json::from_slice(&body).unwrap();
        assert_eq!(report.last_log_line, line);
        #[cfg(unix)]
        assert!(report.running);
    }

    #[tokio::test]
    async fn test_get_status_without_logs_is_server_error() {
        let h = harness();

        let response = h.app.oneshot(get_status_request()).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_get_status_with_unparsable_line_is_server_error() {
        let h = harness();
        std::fs::write(h.log_dir.path().join("bilirec20230215.txt"), "garbage\n").unwrap();

        let response = h.app.oneshot(get_status_request()).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
