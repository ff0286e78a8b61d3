//! HTTP transport: one request envelope per `POST /`.

use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use sym_rpc::errors::PARSE_ERROR;
use sym_rpc::{MethodRegistry, RpcContext};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::dispatch::handle_message;
use crate::errors::{ServerError, bind_addr};
use crate::health::{self, HealthResponse};

/// Shared state for axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Method registry.
    pub registry: Arc<MethodRegistry>,
    /// Handler context.
    pub ctx: Arc<RpcContext>,
    /// When the server started.
    pub start_time: Instant,
}

/// HTTP server over a registry and context.
pub struct HttpServer {
    state: AppState,
}

impl HttpServer {
    /// Create a new server.
    pub fn new(registry: MethodRegistry, ctx: RpcContext) -> Self {
        Self {
            state: AppState {
                registry: Arc::new(registry),
                ctx: Arc::new(ctx),
                start_time: Instant::now(),
            },
        }
    }

    /// Build the router.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/", post(rpc_handler))
            .route("/health", get(health_handler))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// The method registry.
    pub fn registry(&self) -> &Arc<MethodRegistry> {
        &self.state.registry
    }

    /// Bind `host:port` and serve until `shutdown` is cancelled.
    pub async fn serve(
        &self,
        host: &str,
        port: u16,
        shutdown: CancellationToken,
    ) -> Result<(), ServerError> {
        let addr = bind_addr(host, port);
        let listener =
            TcpListener::bind(addr.as_str()).await.map_err(|e| ServerError::bind(&addr, e))?;
        self.serve_on(listener, shutdown).await
    }

    /// Serve on an already bound listener.
    pub async fn serve_on(
        &self,
        listener: TcpListener,
        shutdown: CancellationToken,
    ) -> Result<(), ServerError> {
        info!(addr = ?listener.local_addr().ok(), "http transport listening");
        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await?;
        info!("http transport stopped");
        Ok(())
    }
}

/// POST /: one envelope in, one envelope out.
async fn rpc_handler(State(state): State<AppState>, body: String) -> Response {
    let result = handle_message(&body, &state.registry, &state.ctx).await;
    let status = match &result.response.error {
        Some(err) if err.code == PARSE_ERROR => StatusCode::BAD_REQUEST,
        _ => StatusCode::OK,
    };
    (status, [(header::CONTENT_TYPE, "application/json")], result.response_json).into_response()
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(health::health_check(state.start_time))
}
