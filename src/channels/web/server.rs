//! Axum HTTP server for the web gateway.
//!
//! Routes: chat (versioned path plus a short alias) and health.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State},
    http::{HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tokio::sync::oneshot;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::agent::{DEFAULT_SESSION_ID, Router as MessageRouter, SessionManager};
use crate::channels::web::types::*;
use crate::config::GatewayConfig;
use crate::error::ChannelError;

/// Simple fixed-window rate limiter.
///
/// Tracks the number of requests in the current window. Resets when the window expires.
/// Process-wide, not per client.
pub struct RateLimiter {
    /// Requests remaining in the current window.
    remaining: AtomicU64,
    /// Epoch second when the current window started.
    window_start: AtomicU64,
    /// Maximum requests per window.
    max_requests: u64,
    /// Window duration in seconds.
    window_secs: u64,
}

impl RateLimiter {
    pub fn new(max_requests: u64, window_secs: u64) -> Self {
        Self {
            remaining: AtomicU64::new(max_requests),
            window_start: AtomicU64::new(now_secs()),
            max_requests,
            window_secs,
        }
    }

    /// Try to consume one request. Returns `true` if allowed, `false` if rate limited.
    pub fn check(&self) -> bool {
        let now = now_secs();

        let window = self.window_start.load(Ordering::Relaxed);
        if now.saturating_sub(window) >= self.window_secs {
            self.window_start.store(now, Ordering::Relaxed);
            self.remaining
                .store(self.max_requests.saturating_sub(1), Ordering::Relaxed);
            return self.max_requests > 0;
        }

        loop {
            let current = self.remaining.load(Ordering::Relaxed);
            if current == 0 {
                return false;
            }
            if self
                .remaining
                .compare_exchange_weak(current, current - 1, Ordering::Relaxed, Ordering::Relaxed)
                .is_ok()
            {
                return true;
            }
        }
    }
}

fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Shared state for all gateway handlers.
pub struct GatewayState {
    pub router: Arc<MessageRouter>,
    pub sessions: Arc<SessionManager>,
    /// Rate limiter for the chat endpoints.
    pub chat_rate_limiter: RateLimiter,
    /// Shutdown signal sender.
    pub shutdown_tx: tokio::sync::RwLock<Option<oneshot::Sender<()>>>,
}

impl GatewayState {
    pub fn new(
        router: Arc<MessageRouter>,
        sessions: Arc<SessionManager>,
        config: &GatewayConfig,
    ) -> Self {
        Self {
            router,
            sessions,
            chat_rate_limiter: RateLimiter::new(config.chat_rate_limit, 60),
            shutdown_tx: tokio::sync::RwLock::new(None),
        }
    }

    /// Ask a running server to stop. Returns false when none is running.
    pub async fn shutdown(&self) -> bool {
        match self.shutdown_tx.write().await.take() {
            Some(tx) => tx.send(()).is_ok(),
            None => false,
        }
    }
}

/// Build the gateway routes without binding.
pub fn build_router(state: Arc<GatewayState>, config: &GatewayConfig) -> Router {
    let chat_path = format!("/api/{}/chat/", config.api_version);

    Router::new()
        .route("/api/health", get(health_handler))
        .route(&chat_path, post(chat_handler))
        .route("/api/chat", post(chat_handler))
        .layer(cors_layer(config))
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(64 * 1024))
        .with_state(state)
}

fn cors_layer(config: &GatewayConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    if config.allows_any_origin() {
        return cors.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    cors.allow_origin(AllowOrigin::list(origins))
}

/// Start the gateway HTTP server.
///
/// Returns the actual bound `SocketAddr` (useful when binding to port 0).
pub async fn start_server(
    addr: SocketAddr,
    state: Arc<GatewayState>,
    config: &GatewayConfig,
) -> Result<SocketAddr, ChannelError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ChannelError::StartupFailed {
            name: "gateway".to_string(),
            reason: format!("Failed to bind to {}: {}", addr, e),
        })?;
    let bound_addr = listener
        .local_addr()
        .map_err(|e| ChannelError::StartupFailed {
            name: "gateway".to_string(),
            reason: format!("Failed to get local addr: {}", e),
        })?;

    let app = build_router(Arc::clone(&state), config);

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    *state.shutdown_tx.write().await = Some(shutdown_tx);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                tracing::info!("Web gateway shutting down");
            })
            .await
        {
            tracing::error!("Web gateway server error: {}", e);
        }
    });

    tracing::info!(addr = %bound_addr, api_version = %config.api_version, "Web gateway listening");
    Ok(bound_addr)
}

fn error_response(status: StatusCode, error: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
        .into_response()
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        channel: "gateway",
    })
}

async fn chat_handler(
    State(state): State<Arc<GatewayState>>,
    Json(req): Json<ChatRequest>,
) -> Response {
    if req.message.is_empty() {
        return error_response(StatusCode::UNPROCESSABLE_ENTITY, "Message must not be empty");
    }
    if !state.chat_rate_limiter.check() {
        return error_response(
            StatusCode::TOO_MANY_REQUESTS,
            "Rate limit exceeded. Try again shortly.",
        );
    }

    let session_id = req
        .session_id
        .as_deref()
        .filter(|id| !id.is_empty())
        .unwrap_or(DEFAULT_SESSION_ID);
    let request_id = Uuid::new_v4();
    tracing::debug!(%request_id, session_id, "chat request");

    let response = state
        .router
        .handle_message(&state.sessions, session_id, &req.message)
        .await;
    tracing::debug!(%request_id, session_id, reply_len = response.len(), "chat reply");

    Json(ChatResponse { response }).into_response()
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use pretty_assertions::assert_eq;
    use tower::ServiceExt;

    use super::*;
    use crate::agent::testing::{RecordingAttestation, RecordingChain, ScriptedLlm};
    use crate::config::AgentConfig;

    fn gateway_config(chat_rate_limit: u64) -> GatewayConfig {
        GatewayConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            api_version: "v1".to_string(),
            cors_origins: vec!["*".to_string()],
            chat_rate_limit,
        }
    }

    fn app(llm: Arc<ScriptedLlm>, chat_rate_limit: u64) -> (Router, Arc<GatewayState>) {
        let router = MessageRouter::new(
            llm,
            Arc::new(RecordingChain::new()),
            Arc::new(RecordingAttestation::new()),
            AgentConfig::default(),
        );
        let config = gateway_config(chat_rate_limit);
        let state = Arc::new(GatewayState::new(
            Arc::new(router),
            Arc::new(SessionManager::new()),
            &config,
        ));
        (build_router(Arc::clone(&state), &config), state)
    }

    fn chat(path: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(path)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn rate_limiter_blocks_after_budget() {
        let limiter = RateLimiter::new(2, 60);
        assert!(limiter.check());
        assert!(limiter.check());
        assert!(!limiter.check());
    }

    #[tokio::test]
    async fn health_reports_gateway() {
        let (app, _) = app(Arc::new(ScriptedLlm::new()), 10);
        let response = app
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"status": "healthy", "channel": "gateway"})
        );
    }

    #[tokio::test]
    async fn chat_routes_message_to_default_session() {
        let llm = Arc::new(ScriptedLlm::new());
        llm.push_ok("Conversational");
        llm.push_ok("Hello there.");
        let (app, state) = app(llm, 10);

        let response = app
            .oneshot(chat("/api/v1/chat/", r#"{"message":"hi"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"response": "Hello there."})
        );
        assert_eq!(state.sessions.session_count().await, 1);
    }

    #[tokio::test]
    async fn router_errors_are_still_200_replies() {
        let (app, _) = app(Arc::new(ScriptedLlm::new()), 10);
        // Classification fails open, the conversational call then fails.
        let response = app
            .oneshot(chat("/api/chat", r#"{"message":"hi","session_id":"s1"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert!(body["response"].as_str().unwrap().starts_with("Error: "));
    }

    #[tokio::test]
    async fn empty_message_is_unprocessable() {
        let llm = Arc::new(ScriptedLlm::new());
        let (app, _) = app(Arc::clone(&llm), 10);
        let response = app
            .oneshot(chat("/api/v1/chat/", r#"{"message":""}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(llm.request_count(), 0);
    }

    #[tokio::test]
    async fn whitespace_message_is_routed_as_nonce() {
        let llm = Arc::new(ScriptedLlm::new());
        let (app, state) = app(Arc::clone(&llm), 10);
        let session = state.sessions.get_or_create_session(DEFAULT_SESSION_ID).await;
        session.lock().await.expect_nonce();

        let nonce = " ".repeat(12);
        let body = serde_json::json!({ "message": nonce }).to_string();
        let response = app.oneshot(chat("/api/chat", &body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({ "response": format!("token-for-{nonce}") })
        );
        assert!(!session.lock().await.awaiting_nonce());
        assert_eq!(llm.request_count(), 0);
    }

    #[tokio::test]
    async fn missing_message_field_is_rejected() {
        let (app, _) = app(Arc::new(ScriptedLlm::new()), 10);
        let response = app
            .oneshot(chat("/api/v1/chat/", r#"{"session_id":"s1"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn rate_limited_requests_get_429() {
        let llm = Arc::new(ScriptedLlm::new());
        let (app, _) = app(Arc::clone(&llm), 1);

        let first = app
            .clone()
            .oneshot(chat("/api/chat", r#"{"message":"/help"}"#))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        let second = app
            .oneshot(chat("/api/chat", r#"{"message":"/help"}"#))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    }
}
