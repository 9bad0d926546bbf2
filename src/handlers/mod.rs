pub mod analytics_handlers;
pub mod tracker_script;
pub mod tracking_handlers;

use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

/// Error body shape shared by every endpoint. Storage internals never
/// leak to the caller; the interesting detail goes to the log instead.
pub(crate) fn error_response(status: StatusCode, message: &str) -> (StatusCode, Json<Value>) {
    (status, Json(json!({ "error": message })))
}
