use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::Json;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use tracing::{error, info};

use crate::bots::classify_user_agent;
use crate::handlers::error_response;
use crate::models::event::{BatchTrackPayload, NewEvent, TrackEventPayload};
use crate::routes::AppState;
use crate::store::TimeRange;

/// Ingestion gate for a single tracking event.
///
/// Guarantees the aggregation engine relies on: every persisted event has a
/// non-empty tracking id and type, a populated timestamp (client clock when
/// supplied, receipt time otherwise), and server-observed ip/user agent.
pub async fn track_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<TrackEventPayload>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if !has_required_fields(&payload) {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "Missing required fields: trackingId and type",
        ));
    }

    let event = build_event(payload, &headers, Utc::now());
    if let Some(bot) = &event.bot_name {
        info!(bot = %bot, url = event.url.as_deref().unwrap_or("-"), "AI bot detected");
    }

    match state.store.insert(event).await {
        Ok(stored) => Ok(Json(json!({
            "success": true,
            "eventId": stored.id,
            "timestamp": stored.timestamp,
        }))),
        Err(err) => {
            error!(error = %err, "failed to persist tracking event");
            Err(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to process event",
            ))
        }
    }
}

/// Batch ingestion: `{ "events": [...] }`. The whole batch is rejected if
/// any member is missing its required fields, so a partially-valid batch
/// never persists partially.
pub async fn track_batch(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<BatchTrackPayload>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if payload.events.is_empty() {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "Events array is required and must not be empty",
        ));
    }
    if !payload.events.iter().all(has_required_fields) {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "Missing required fields: trackingId and type",
        ));
    }

    let received = Utc::now();
    let events: Vec<NewEvent> = payload
        .events
        .into_iter()
        .map(|event| build_event(event, &headers, received))
        .collect();

    match state.store.insert_many(events).await {
        Ok(processed) => Ok(Json(json!({
            "success": true,
            "processedCount": processed,
            "timestamp": received,
        }))),
        Err(err) => {
            error!(error = %err, "failed to persist batch events");
            Err(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to process batch events",
            ))
        }
    }
}

/// Lets a site owner check that their snippet is installed and reporting.
pub async fn validate_tracking_id(
    State(state): State<AppState>,
    Path(tracking_id): Path<String>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let range = TimeRange::all();
    let result = tokio::try_join!(
        state.store.count(&tracking_id, range, None),
        state.store.find_recent(&tracking_id, range, 1),
    );

    match result {
        Ok((event_count, newest)) => Ok(Json(json!({
            "valid": true,
            "trackingId": tracking_id,
            "eventCount": event_count,
            "lastActivity": newest.first().map(|e| e.timestamp),
        }))),
        Err(err) => {
            error!(error = %err, "failed to validate tracking id");
            Err(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to validate tracking ID",
            ))
        }
    }
}

fn has_required_fields(payload: &TrackEventPayload) -> bool {
    !payload.tracking_id.trim().is_empty() && !payload.event_type.trim().is_empty()
}

/// Stamps the server-observed fields onto a client payload. The ip and
/// user agent always come from the request, never from the payload body.
fn build_event(payload: TrackEventPayload, headers: &HeaderMap, received: DateTime<Utc>) -> NewEvent {
    let user_agent = header_value(headers, header::USER_AGENT);

    // Bot-detection events normally carry the classification the snippet
    // made; when it's absent, re-classify from the observed user agent with
    // the same table so both sides agree.
    let bot = payload.data.or_else(|| {
        if payload.event_type == crate::models::event::EVENT_AI_BOT_DETECTED {
            user_agent.as_deref().and_then(classify_user_agent).map(|m| {
                crate::models::event::BotInfo {
                    name: m.name.to_string(),
                    description: Some(m.description.to_string()),
                }
            })
        } else {
            None
        }
    });

    NewEvent {
        tracking_id: payload.tracking_id,
        event_type: payload.event_type,
        url: payload.url,
        timestamp: payload.timestamp.unwrap_or(received),
        server_timestamp: received,
        session_id: payload.session_id,
        bot_name: bot.as_ref().map(|b| b.name.clone()),
        bot_description: bot.and_then(|b| b.description),
        ip: client_ip(headers),
        user_agent,
        referrer: payload.referrer,
    }
}

fn client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .or_else(|| header_value(headers, header::HeaderName::from_static("x-real-ip")))
}

fn header_value(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
}
