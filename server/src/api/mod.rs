//! HTTP API
//!
//! All responses use the shared [`ApiResponse`] envelope; errors surface as
//! `AppError` via its `IntoResponse` impl.
//!
//! [`ApiResponse`]: shared::error::ApiResponse

mod orders;

use axum::Router;
use axum::routing::{get, put};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/orders",
            get(orders::list_orders).post(orders::create_order),
        )
        .route("/api/orders/public/{public_id}", get(orders::get_order_by_public_id))
        .route(
            "/api/orders/reference/{reference}",
            get(orders::get_order_by_reference),
        )
        .route(
            "/api/orders/reference/{reference}/proof",
            get(orders::get_order_proof),
        )
        .route("/api/orders/{id}", get(orders::get_order))
        .route("/api/orders/{id}/{key}", put(orders::update_order))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
