use std::sync::Arc;

use axum::http::{header::CONTENT_TYPE, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::handlers::analytics_handlers::{get_dashboard_metrics, get_realtime_summary, get_trends};
use crate::handlers::tracker_script::serve_tracker_script;
use crate::handlers::tracking_handlers::{track_batch, track_event, validate_tracking_id};
use crate::store::EventStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn EventStore>,
    pub public_url: String,
}

pub fn create_router(state: AppState, config: &Config) -> Router {
    let cors = create_cors_layer(config);

    Router::new()
        .route("/api/track", post(track_event))
        .route("/api/track/batch", post(track_batch))
        .route("/api/track/validate/{tracking_id}", get(validate_tracking_id))
        .route("/api/analytics/dashboard/{tracking_id}", get(get_dashboard_metrics))
        .route("/api/analytics/realtime/{tracking_id}", get(get_realtime_summary))
        .route("/api/analytics/trends/{tracking_id}", get(get_trends))
        .route("/client/ai-pixel-tracker.js", get(serve_tracker_script))
        .with_state(state)
        .layer(cors)
}

fn create_cors_layer(config: &Config) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE]);

    match config.cors_origin.as_str() {
        "*" => cors.allow_origin(Any),
        origin => cors.allow_origin(origin.parse::<HeaderValue>().unwrap()),
    }
}
