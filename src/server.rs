//! HTTP surface: router, shared state and the `/parse` handler.
//!
//! ## Request lifecycle
//!
//! ```text
//! multipart ──▶ input ──▶ normalize ──▶ parser ──▶ assemble ──▶ deliver
//!             (temp file) (image→PDF)   (VLM)     (## Page n)   (download | summary)
//! ```
//!
//! Every temp file the request creates is registered with a per-request
//! [`Scratch`]. Its last handle drops when the handler returns or when axum
//! drops the handler future after a client disconnect, and the files go with
//! it.

use crate::config::ServerConfig;
use crate::error::ApiError;
use crate::parser::{extract, DocumentParser};
use crate::pipeline::{assemble, deliver, input, normalize};
use crate::scratch::Scratch;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

/// State shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    pub parser: Arc<dyn DocumentParser>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(parser: Arc<dyn DocumentParser>, config: ServerConfig) -> Self {
        Self {
            parser,
            config: Arc::new(config),
        }
    }
}

/// Build the router with all endpoints.
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;
    Router::new()
        .route("/", get(root))
        .route("/parse", post(parse))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `state.config.bind_addr` and serve until Ctrl-C.
pub async fn serve(state: AppState) -> std::io::Result<()> {
    let addr = state.config.bind_addr;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutting down");
    }
}

/// `GET /`: service description.
pub async fn root() -> impl IntoResponse {
    Json(json!({
        "message": "Welcome to PDF Parser API",
        "endpoints": {
            "POST /parse": "Upload a PDF or image file to convert it to markdown"
        }
    }))
}

/// `POST /parse`: convert one uploaded PDF or image to markdown.
pub async fn parse(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let scratch = Scratch::new();
    let config = &state.config;

    let upload = input::receive_upload(multipart, &config.temp_dir, &scratch).await?;
    let document = normalize::normalize(&upload.path, upload.kind, &scratch).await?;
    let pages = extract(state.parser.as_ref(), &document.path).await?;
    let markdown = assemble::assemble(&pages);

    let response = deliver::deliver(markdown, pages.len(), &upload, config).await?;
    info!(
        "Parsed '{}' ({} pages, {:?} mode)",
        upload.filename,
        pages.len(),
        config.output_mode
    );
    Ok(response)
}
