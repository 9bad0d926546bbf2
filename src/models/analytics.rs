use chrono::{DateTime, Datelike, Duration, Timelike, Utc};
use serde::Serialize;

use crate::models::event::BotInfo;

/// Dashboard lookback window. Unrecognized tokens silently fall back to
/// seven days rather than failing the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Hours24,
    Days7,
    Days30,
    Days90,
}

impl Period {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "24h" => Period::Hours24,
            "7d" => Period::Days7,
            "30d" => Period::Days30,
            "90d" => Period::Days90,
            _ => Period::Days7,
        }
    }

    pub fn duration(self) -> Duration {
        match self {
            Period::Hours24 => Duration::hours(24),
            Period::Days7 => Duration::days(7),
            Period::Days30 => Duration::days(30),
            Period::Days90 => Duration::days(90),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Period::Hours24 => "24h",
            Period::Days7 => "7d",
            Period::Days30 => "30d",
            Period::Days90 => "90d",
        }
    }
}

impl Default for Period {
    fn default() -> Self {
        Period::Days7
    }
}

/// Trend bucket width. Unrecognized tokens fall back to daily.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Hourly,
    Daily,
}

impl Granularity {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "hourly" => Granularity::Hourly,
            _ => Granularity::Daily,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Granularity::Hourly => "hourly",
            Granularity::Daily => "daily",
        }
    }
}

impl Default for Granularity {
    fn default() -> Self {
        Granularity::Daily
    }
}

/// Calendar grouping key for trend buckets. `hour` is populated only at
/// hourly granularity. Ordering is chronological: year, month, day, hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct BucketKey {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hour: Option<u32>,
}

impl BucketKey {
    /// Every timestamp lands in exactly one bucket per granularity.
    pub fn from_timestamp(ts: DateTime<Utc>, granularity: Granularity) -> Self {
        BucketKey {
            year: ts.year(),
            month: ts.month(),
            day: ts.day(),
            hour: match granularity {
                Granularity::Hourly => Some(ts.hour()),
                Granularity::Daily => None,
            },
        }
    }
}

/// One trend series point. Buckets with zero events are never emitted, so
/// gaps in activity show up as gaps in the series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendBucket {
    #[serde(rename = "_id")]
    pub bucket: BucketKey,
    pub total_events: u64,
    pub page_views: u64,
    pub ai_bots_detected: u64,
    pub unique_sessions: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageStat {
    pub url: String,
    pub views: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BotStat {
    pub name: String,
    pub description: Option<String>,
    pub count: u64,
    pub last_seen: DateTime<Utc>,
}

/// The reduced projection used for the dashboard activity feed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReducedEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<BotInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMetrics {
    pub total_events: u64,
    pub ai_bots_detected: u64,
    pub unique_sessions: u64,
    pub top_pages: Vec<PageStat>,
    pub top_bots: Vec<BotStat>,
    pub recent_activity: Vec<ReducedEvent>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub success: bool,
    pub period: String,
    pub date_range: DateRange,
    pub metrics: DashboardMetrics,
}

/// Projection returned by the realtime feed; slightly wider than
/// `ReducedEvent` because the live view also shows sessions.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<BotInfo>,
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeSummary {
    pub total_events_last_hour: u64,
    pub ai_bots_detected_last_hour: u64,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RealtimeResponse {
    pub success: bool,
    pub data: Vec<RealtimeEvent>,
    pub summary: RealtimeSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendsResponse {
    pub success: bool,
    pub period: String,
    pub date_range: DateRange,
    pub trends: Vec<TrendBucket>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn unknown_period_falls_back_to_seven_days() {
        assert_eq!(Period::parse("forever"), Period::Days7);
        assert_eq!(Period::parse(""), Period::Days7);
        assert_eq!(Period::parse("24h"), Period::Hours24);
    }

    #[test]
    fn unknown_granularity_falls_back_to_daily() {
        assert_eq!(Granularity::parse("weekly"), Granularity::Daily);
        assert_eq!(Granularity::parse("hourly"), Granularity::Hourly);
    }

    #[test]
    fn bucket_keys_order_chronologically() {
        let a = Utc.with_ymd_and_hms(2025, 12, 31, 23, 0, 0).unwrap();
        let b = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let ka = BucketKey::from_timestamp(a, Granularity::Hourly);
        let kb = BucketKey::from_timestamp(b, Granularity::Hourly);
        assert!(ka < kb);
    }

    #[test]
    fn daily_buckets_carry_no_hour() {
        let ts = Utc.with_ymd_and_hms(2026, 8, 7, 15, 30, 0).unwrap();
        let key = BucketKey::from_timestamp(ts, Granularity::Daily);
        assert_eq!(key.hour, None);
        assert_eq!((key.year, key.month, key.day), (2026, 8, 7));
    }
}
