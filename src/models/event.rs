use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Well-known event types. `event_type` stays a free-form string on the
/// wire; these are the two values the aggregation queries care about.
pub const EVENT_PAGE_VIEW: &str = "page_view";
pub const EVENT_AI_BOT_DETECTED: &str = "ai_bot_detected";

/// The `data` payload attached to bot-detection events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotInfo {
    pub name: String,
    pub description: Option<String>,
}

/// What the browser snippet POSTs to /api/track.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackEventPayload {
    #[serde(default)]
    pub tracking_id: String,
    #[serde(rename = "type", default)]
    pub event_type: String,
    pub url: Option<String>,
    /// Client clock; ingestion falls back to server receipt time when absent.
    pub timestamp: Option<DateTime<Utc>>,
    pub session_id: Option<String>,
    pub data: Option<BotInfo>,
    pub referrer: Option<String>,
}

/// Batch wrapper for /api/track/batch.
#[derive(Debug, Deserialize)]
pub struct BatchTrackPayload {
    #[serde(default)]
    pub events: Vec<TrackEventPayload>,
}

/// An event as handed to the store for insertion. The store assigns the id.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub tracking_id: String,
    pub event_type: String,
    pub url: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub server_timestamp: DateTime<Utc>,
    pub session_id: Option<String>,
    pub bot_name: Option<String>,
    pub bot_description: Option<String>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub referrer: Option<String>,
}

/// A persisted event. Immutable once written; only the retention sweep
/// ever removes rows.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Event {
    pub id: i64,
    pub tracking_id: String,
    pub event_type: String,
    pub url: Option<String>,
    /// Effective instant of the event; determines bucket placement.
    pub timestamp: DateTime<Utc>,
    pub server_timestamp: DateTime<Utc>,
    pub session_id: Option<String>,
    pub bot_name: Option<String>,
    pub bot_description: Option<String>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub referrer: Option<String>,
}

impl Event {
    pub fn from_new(id: i64, new: NewEvent) -> Self {
        Event {
            id,
            tracking_id: new.tracking_id,
            event_type: new.event_type,
            url: new.url,
            timestamp: new.timestamp,
            server_timestamp: new.server_timestamp,
            session_id: new.session_id,
            bot_name: new.bot_name,
            bot_description: new.bot_description,
            ip: new.ip,
            user_agent: new.user_agent,
            referrer: new.referrer,
        }
    }

    pub fn bot_info(&self) -> Option<BotInfo> {
        self.bot_name.as_ref().map(|name| BotInfo {
            name: name.clone(),
            description: self.bot_description.clone(),
        })
    }

    pub fn is_bot_detection(&self) -> bool {
        self.event_type == EVENT_AI_BOT_DETECTED
    }
}
