//! HTTP surface of the reservation engine.
//!
//! Routes are relative; the outer routing layer decides the prefix.

pub mod actor;
pub mod dto;
pub mod error;
pub mod handlers;

use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::{MatchedPath, Request};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{delete, get, post, put};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::engine::Engine;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/availability/{room_id}", get(handlers::check_availability))
        .route("/booked-dates/{room_id}", get(handlers::booked_dates))
        .route("/auto-complete", post(handlers::auto_complete))
        .route(
            "/",
            post(handlers::create_reservation).get(handlers::list_reservations),
        )
        .route(
            "/{id}",
            get(handlers::get_reservation).delete(handlers::cancel_reservation),
        )
        .route("/{id}/status", put(handlers::update_status))
        .route("/{id}/complete", put(handlers::complete_reservation))
        .route("/{id}/record", delete(handlers::archive_reservation))
        .layer(middleware::from_fn(track_requests))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Request log line plus RED metrics, labelled by route template.
async fn track_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_owned());
    let start = Instant::now();

    let response = next.run(request).await;

    let elapsed = start.elapsed();
    let status = response.status().as_u16();
    metrics::counter!(
        crate::observability::HTTP_REQUESTS_TOTAL,
        "method" => method.to_string(),
        "route" => route.clone(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!(
        crate::observability::HTTP_REQUEST_DURATION_SECONDS,
        "method" => method.to_string(),
        "route" => route.clone()
    )
    .record(elapsed.as_secs_f64());
    info!(
        method = %method,
        route = %route,
        status,
        duration_ms = elapsed.as_millis() as u64,
        "HTTP request"
    );

    response
}
