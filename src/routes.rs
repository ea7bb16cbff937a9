// routes.rs
use std::sync::Arc;

use axum::{middleware, routing::{get, post}, Extension, Json, Router};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::{
    handler::{
        bookings::{booking_handler, payment_webhook},
        discovery::discovery_handler,
        gigs::gig_handler,
    },
    middleware::auth,
    AppState,
};

// Health check handler
async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "message": "Server is running"
    }))
}

pub fn create_router(app_state: Arc<AppState>) -> Router {
    // Everything except the gateway webhook requires an authenticated actor
    let protected_routes = Router::new()
        .nest("/discovery", discovery_handler())
        .nest("/gigs", gig_handler())
        .nest("/bookings", booking_handler())
        .layer(middleware::from_fn(auth));

    // Public but signature-checked (see handler::bookings::payment_webhook)
    let public_routes = Router::new().route("/payments/webhook", post(payment_webhook));

    let api_route = Router::new()
        .merge(protected_routes)
        .merge(public_routes)
        .layer(TraceLayer::new_for_http())
        .layer(Extension(app_state));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_route)
}
