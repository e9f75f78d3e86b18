//! HTTP surface for the watchlist
//!
//! `GET|HEAD|POST|DELETE /api/watchlist`, all answering JSON.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

use super::{WatchlistRequest, WatchlistResponse, WatchlistService};

impl IntoResponse for WatchlistResponse {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.body)).into_response()
    }
}

/// Build the watchlist router around a shared service
pub fn router(service: Arc<WatchlistService>) -> Router {
    Router::new()
        .route(
            "/api/watchlist",
            get(list_handler).post(add_handler).delete(remove_handler),
        )
        .with_state(service)
}

/// Bind `addr` and serve until the process stops
pub async fn serve(addr: SocketAddr, service: Arc<WatchlistService>) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    log::info!(
        "Watchlist server listening on {} (file {:?})",
        listener.local_addr()?,
        service.file().path()
    );
    axum::serve(listener, router(service)).await
}

async fn list_handler(State(service): State<Arc<WatchlistService>>) -> WatchlistResponse {
    service.list().await
}

async fn add_handler(State(service): State<Arc<WatchlistService>>, body: Bytes) -> WatchlistResponse {
    match parse_body(&body) {
        Ok(request) => service.add(request).await,
        Err(response) => response,
    }
}

async fn remove_handler(
    State(service): State<Arc<WatchlistService>>,
    body: Bytes,
) -> WatchlistResponse {
    match parse_body(&body) {
        Ok(request) => service.remove(request).await,
        Err(response) => response,
    }
}

/// Malformed JSON is reported as a 400 with the parser message
fn parse_body(body: &[u8]) -> Result<WatchlistRequest, WatchlistResponse> {
    if body.is_empty() {
        return Ok(WatchlistRequest::default());
    }
    serde_json::from_slice(body).map_err(|e| WatchlistResponse {
        status: 400,
        body: serde_json::json!({ "error": format!("Invalid JSON body: {}", e) }),
    })
}
