use anyhow::Result;
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::ai::ChatProvider;
use crate::tips::{GatewayError, NO_TIPS, TipsRequest, request_tips};

/// Error text returned by the proxy. Distinct from the client-side fallback.
pub const PROXY_ERROR: &str = "Failed to generate tips";

#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<dyn ChatProvider>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/tips", post(tips_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

pub async fn serve(state: AppState, port: u16) -> Result<()> {
    let addr: SocketAddr = format!("0.0.0.0:{}", port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Tips proxy listening on {addr} (model: {})", state.provider.model_name());
    axum::serve(listener, build_router(state)).await?;
    Ok(())
}

/// GET /health
async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// POST /api/tips
async fn tips_handler(State(state): State<AppState>, Json(request): Json<TipsRequest>) -> Response {
    match request_tips(state.provider.as_ref(), &request).await {
        Ok(tips) => Json(json!({ "tips": tips })).into_response(),
        Err(GatewayError::NoTips) => Json(json!({ "tips": NO_TIPS })).into_response(),
        Err(GatewayError::Failed(_)) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": PROXY_ERROR })),
        )
            .into_response(),
    }
}
