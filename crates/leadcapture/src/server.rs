//! HTTP entry points.
//!
//! Two form endpoints adapt JSON requests into intake calls. Everything else
//! (CORS, tracing, panic recovery, static files) is middleware.

use std::any::Any;
use std::path::Path;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{header, HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::{json, Map, Value};
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::{Config, MailConfig};
use crate::error::{Error, Result};
use crate::intake::{IntakeHandler, ValidationError};
use crate::notify::Notifier;
use crate::outcome::Outcome;
use crate::storage::RecordStore;

/// Shared application state.
#[derive(Debug)]
pub struct AppState {
    /// Validates and dispatches submissions.
    pub intake: IntakeHandler,
    /// Fallback base URL for download links.
    pub public_url: Option<String>,
}

/// State handle passed to every handler.
pub type SharedState = Arc<AppState>;

/// Errors a form endpoint can answer with.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The submission failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Anything else that escaped the handler.
    #[error("Internal server error: {0}")]
    Unexpected(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unexpected(msg) => {
                error!(error = %msg, "Error processing request");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Body of a successful form submission.
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    success: bool,
    message: &'static str,
}

impl SuccessResponse {
    fn new(message: &'static str) -> Json<Self> {
        Json(Self {
            success: true,
            message,
        })
    }
}

/// Build the application router.
///
/// When `static_dir` is set, any path not matched by the API is served from
/// that directory.
pub fn router(state: SharedState, static_dir: Option<&Path>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AnyOrigin)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    let mut router = Router::new()
        .route("/health", get(health))
        .route(
            "/api/consultation",
            post(consultation)
                .options(preflight)
                .fallback(method_not_allowed),
        )
        .route(
            "/api/send-download",
            post(send_download)
                .options(preflight)
                .fallback(method_not_allowed),
        )
        .with_state(state);

    if let Some(dir) = static_dir {
        router = router.fallback_service(ServeDir::new(dir));
    }

    router
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Build the application from configuration and serve it until Ctrl-C or
/// SIGTERM.
///
/// # Errors
///
/// Returns an error if the mail transport cannot be built or the listener
/// cannot be bound.
pub async fn serve(config: &Config) -> Result<()> {
    let notifier = Notifier::from_config(&config.mail)?;
    log_mail_config(&config.mail);
    if notifier.is_enabled() {
        let probe = notifier.clone();
        tokio::spawn(async move {
            match probe.verify().await {
                Outcome::Completed => info!("SMTP connection verified successfully"),
                other => warn!(result = %other, "SMTP connection verification failed"),
            }
        });
    }

    let store = RecordStore::new(config.data_file());
    info!(path = %store.path().display(), "Storing submissions");

    let state = Arc::new(AppState {
        intake: IntakeHandler::new(store, notifier, config.intake.consultation_schema),
        public_url: config.server.public_url.clone(),
    });
    let app = router(state, config.server.static_dir.as_deref());

    let addr = config.listen_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| Error::ServerBind {
            addr: addr.clone(),
            source,
        })?;

    info!(
        addr = %addr,
        environment = %config.server.environment,
        "Server running"
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn consultation(
    State(state): State<SharedState>,
    body: Bytes,
) -> std::result::Result<Json<SuccessResponse>, ApiError> {
    let body = parse_body(&body)?;
    state.intake.submit_consultation(&body).await?;
    Ok(SuccessResponse::new(
        "Consultation request submitted successfully",
    ))
}

async fn send_download(
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> std::result::Result<Json<SuccessResponse>, ApiError> {
    let body = parse_body(&body)?;
    let base_url = base_url(&headers, state.public_url.as_deref());
    state.intake.submit_download(&body, &base_url).await?;
    Ok(SuccessResponse::new("Download link sent successfully"))
}

async fn preflight() -> StatusCode {
    StatusCode::OK
}

async fn method_not_allowed() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({ "error": "Method not allowed" })),
    )
        .into_response()
}

#[allow(clippy::needless_pass_by_value)]
fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response<Body> {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!(panic = %detail, "Unhandled error");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Internal server error" })),
    )
        .into_response()
}

/// Parse a request body into a field map.
///
/// An empty body, or JSON that is not an object, has no fields. Malformed
/// JSON is an unexpected error.
fn parse_body(body: &[u8]) -> std::result::Result<Map<String, Value>, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Ok(Map::new()),
        Err(e) => Err(ApiError::Unexpected(e.to_string())),
    }
}

/// Scheme and host download links should point at: the `Origin` header,
/// else `https://` plus the `Host` header, else the configured public URL.
fn base_url(headers: &HeaderMap, public_url: Option<&str>) -> String {
    let header_text = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty() && *v != "null")
    };

    if let Some(origin) = header_text(header::ORIGIN) {
        return origin.to_string();
    }
    if let Some(host) = header_text(header::HOST) {
        return format!("https://{host}");
    }
    public_url.unwrap_or("http://localhost").to_string()
}

fn log_mail_config(mail: &MailConfig) {
    if mail.is_configured() {
        info!(
            host = %mail.host,
            port = mail.port,
            user = mail.username.as_deref().unwrap_or_default(),
            recipient = mail.notification_recipient().unwrap_or_default(),
            password = %mail.masked_password(),
            "Email configuration found"
        );
    } else {
        warn!(
            user = if mail.username.is_some() { "Set" } else { "Not set" },
            password = if mail.password.is_some() { "Set" } else { "Not set" },
            "SMTP credentials not configured, email notifications disabled"
        );
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, shutting down gracefully"),
        () = terminate => info!("Received SIGTERM, shutting down gracefully"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConsultationSchema;
    use crate::notify::testing::{mail_config, FailingTransport, RecordingTransport};
    use crate::notify::MailTransport;
    use axum::http::Request;
    use tempfile::TempDir;
    use tower::ServiceExt;

    struct TestApp {
        _dir: TempDir,
        state: SharedState,
        transport: Arc<RecordingTransport>,
    }

    impl TestApp {
        fn new() -> Self {
            crate::logging::init_test_logging();
            let transport = Arc::new(RecordingTransport::default());
            Self::with_transport(transport.clone(), transport)
        }

        fn with_transport(
            transport: Arc<dyn MailTransport>,
            recording: Arc<RecordingTransport>,
        ) -> Self {
            let dir = TempDir::new().unwrap();
            let intake = IntakeHandler::new(
                RecordStore::new(dir.path().join("consultations.json")),
                Notifier::with_transport(transport, &mail_config()),
                ConsultationSchema::Company,
            );
            let state = Arc::new(AppState {
                intake,
                public_url: None,
            });
            Self {
                _dir: dir,
                state,
                transport: recording,
            }
        }

        fn store(&self) -> &RecordStore {
            self.state.intake.store()
        }

        async fn send(&self, request: Request<Body>) -> (StatusCode, HeaderMap, Bytes) {
            let response = router(self.state.clone(), None)
                .oneshot(request)
                .await
                .unwrap();
            let status = response.status();
            let headers = response.headers().clone();
            let body = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            (status, headers, body)
        }

        async fn post_json(&self, uri: &str, body: Value) -> (StatusCode, Value) {
            let request = Request::builder()
                .method(Method::POST)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::HOST, "emiliateams.com")
                .body(Body::from(body.to_string()))
                .unwrap();
            let (status, _, bytes) = self.send(request).await;
            (status, serde_json::from_slice(&bytes).unwrap())
        }
    }

    fn example_consultation() -> Value {
        json!({
            "name": "A", "email": "a@b.com", "company": "C",
            "country": "US", "employees": "5"
        })
    }

    #[tokio::test]
    async fn test_consultation_example() {
        let app = TestApp::new();

        let (status, body) = app.post_json("/api/consultation", example_consultation()).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({ "success": true, "message": "Consultation request submitted successfully" })
        );

        let records = app.store().records().await;
        assert_eq!(records.len(), 1);
        let stored = serde_json::to_value(&records[0]).unwrap();
        assert_eq!(stored["name"], "A");
        assert_eq!(stored["email"], "a@b.com");
        assert_eq!(stored["company"], "C");
        assert_eq!(stored["country"], "US");
        assert_eq!(stored["employees"], "5");
        assert!(stored["id"].is_string());
        assert!(stored["submittedAt"].is_string());
        assert_eq!(app.transport.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_consultation_missing_field() {
        let app = TestApp::new();
        let mut payload = example_consultation();
        payload.as_object_mut().unwrap().remove("employees");

        let (status, body) = app.post_json("/api/consultation", payload).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "All fields are required" }));
        assert!(app.store().is_empty().await);
        assert!(app.transport.sent().is_empty());
    }

    #[tokio::test]
    async fn test_empty_body_is_rejected_as_missing_fields() {
        let app = TestApp::new();
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/consultation")
            .body(Body::empty())
            .unwrap();

        let (status, _, bytes) = app.send(request).await;
        let body: Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "All fields are required");
    }

    #[tokio::test]
    async fn test_malformed_json_is_internal_error() {
        let app = TestApp::new();
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/consultation")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"name\": "))
            .unwrap();

        let (status, _, bytes) = app.send(request).await;
        let body: Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"]
            .as_str()
            .unwrap()
            .starts_with("Internal server error: "));
    }

    #[tokio::test]
    async fn test_resubmission_creates_two_records() {
        let app = TestApp::new();

        app.post_json("/api/consultation", example_consultation()).await;
        app.post_json("/api/consultation", example_consultation()).await;

        let records = app.store().records().await;
        assert_eq!(records.len(), 2);
        assert_ne!(records[0].id, records[1].id);
    }

    #[tokio::test]
    async fn test_corrupt_store_recovers_on_next_request() {
        let app = TestApp::new();
        tokio::fs::write(app.store().path(), "[{broken").await.unwrap();

        let (status, _) = app.post_json("/api/consultation", example_consultation()).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(app.store().len().await, 1);
    }

    #[tokio::test]
    async fn test_mail_failure_still_succeeds() {
        let app = TestApp::with_transport(
            Arc::new(FailingTransport),
            Arc::new(RecordingTransport::default()),
        );

        let (status, body) = app.post_json("/api/consultation", example_consultation()).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(app.store().len().await, 1);
    }

    #[tokio::test]
    async fn test_download_sends_link_from_host() {
        let app = TestApp::new();

        let (status, body) = app
            .post_json(
                "/api/send-download",
                json!({ "name": "B", "email": "b@c.com", "resource": "service-overview" }),
            )
            .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({ "success": true, "message": "Download link sent successfully" })
        );
        let sent = app.transport.sent();
        assert_eq!(sent[0].to, "b@c.com");
        assert!(sent[0]
            .html
            .contains("https://emiliateams.com/downloads/emiliateams-service-overview.pdf"));
        assert_eq!(app.store().len().await, 1);
    }

    #[tokio::test]
    async fn test_download_prefers_origin_header() {
        let app = TestApp::new();
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/send-download")
            .header(header::ORIGIN, "http://localhost:3000")
            .header(header::HOST, "api.internal")
            .body(Body::from(
                json!({ "name": "B", "email": "b@c.com", "resource": "china-team-guide" })
                    .to_string(),
            ))
            .unwrap();

        let (status, _, _) = app.send(request).await;

        assert_eq!(status, StatusCode::OK);
        assert!(app.transport.sent()[0]
            .html
            .contains("http://localhost:3000/downloads/building-your-china-team-guide.pdf"));
    }

    #[tokio::test]
    async fn test_download_unknown_resource() {
        let app = TestApp::new();

        let (status, body) = app
            .post_json(
                "/api/send-download",
                json!({ "name": "B", "email": "b@c.com", "resource": "pricing-sheet" }),
            )
            .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "Invalid resource specified" }));
        assert!(app.transport.sent().is_empty());
    }

    #[tokio::test]
    async fn test_download_missing_fields() {
        let app = TestApp::new();

        let (status, body) = app
            .post_json("/api/send-download", json!({ "name": "B", "resource": "bogus" }))
            .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            json!({ "error": "Name, email, and resource are required" })
        );
    }

    #[tokio::test]
    async fn test_preflight() {
        let app = TestApp::new();

        for uri in ["/api/consultation", "/api/send-download"] {
            let request = Request::builder()
                .method(Method::OPTIONS)
                .uri(uri)
                .header(header::ORIGIN, "https://emiliateams.com")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
                .body(Body::empty())
                .unwrap();

            let (status, headers, body) = app.send(request).await;

            assert_eq!(status, StatusCode::OK);
            assert!(body.is_empty());
            assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
            let methods = headers[header::ACCESS_CONTROL_ALLOW_METHODS]
                .to_str()
                .unwrap();
            assert!(methods.contains("POST"));
        }
    }

    #[tokio::test]
    async fn test_cors_header_on_post() {
        let app = TestApp::new();
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/consultation")
            .header(header::ORIGIN, "https://emiliateams.com")
            .body(Body::from(example_consultation().to_string()))
            .unwrap();

        let (status, headers, _) = app.send(request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }

    #[tokio::test]
    async fn test_method_not_allowed() {
        let app = TestApp::new();

        for method in [Method::GET, Method::PUT, Method::DELETE] {
            let request = Request::builder()
                .method(method)
                .uri("/api/consultation")
                .body(Body::empty())
                .unwrap();

            let (status, _, bytes) = app.send(request).await;
            let body: Value = serde_json::from_slice(&bytes).unwrap();

            assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
            assert_eq!(body, json!({ "error": "Method not allowed" }));
        }
    }

    #[tokio::test]
    async fn test_health() {
        let app = TestApp::new();
        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let (status, _, bytes) = app.send(request).await;
        let body: Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_static_files_served() {
        let app = TestApp::new();
        let site = TempDir::new().unwrap();
        std::fs::write(site.path().join("index.html"), "<h1>EmiliaTeams</h1>").unwrap();

        let request = Request::builder()
            .uri("/index.html")
            .body(Body::empty())
            .unwrap();
        let response = router(app.state.clone(), Some(site.path()))
            .oneshot(request)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"<h1>EmiliaTeams</h1>");
    }

    #[test]
    fn test_parse_body() {
        assert!(parse_body(b"").unwrap().is_empty());
        assert!(parse_body(b"  \n").unwrap().is_empty());
        assert!(parse_body(b"[1, 2]").unwrap().is_empty());
        assert_eq!(parse_body(br#"{"a": "b"}"#).unwrap()["a"], "b");
        assert!(matches!(parse_body(b"{"), Err(ApiError::Unexpected(_))));
    }

    #[test]
    fn test_base_url_fallbacks() {
        let mut headers = HeaderMap::new();
        assert_eq!(base_url(&headers, None), "http://localhost");
        assert_eq!(
            base_url(&headers, Some("https://emiliateams.com")),
            "https://emiliateams.com"
        );

        headers.insert(header::HOST, "emiliateams.com".parse().unwrap());
        assert_eq!(base_url(&headers, None), "https://emiliateams.com");

        headers.insert(header::ORIGIN, "null".parse().unwrap());
        assert_eq!(base_url(&headers, None), "https://emiliateams.com");

        headers.insert(header::ORIGIN, "http://localhost:3000".parse().unwrap());
        assert_eq!(base_url(&headers, None), "http://localhost:3000");
    }

    #[test]
    fn test_api_error_status() {
        let response =
            ApiError::Validation(ValidationError::UnknownResource("x".into())).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = ApiError::Unexpected("boom".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
