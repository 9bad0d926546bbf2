//! The aggregation engine: windowed dashboard metrics, realtime summaries,
//! and trend series over the event store.
//!
//! The engine is stateless. Each call derives its window, fans out the
//! store queries it needs concurrently, and assembles the response only
//! once every query has succeeded; a single failing query fails the whole
//! call and no partial metrics escape.

use chrono::Duration;

use crate::error::AnalyticsError;
use crate::models::analytics::{
    BotStat, DashboardMetrics, DashboardResponse, DateRange, Granularity, PageStat, Period,
    RealtimeEvent, RealtimeResponse, RealtimeSummary, ReducedEvent, TrendsResponse,
};
use crate::models::event::{Event, EVENT_AI_BOT_DETECTED, EVENT_PAGE_VIEW};
use crate::store::{EventField, EventStore, GroupKey, GroupedCount, TimeRange};

/// Top-N cutoff for pages and bots.
const TOP_LIMIT: usize = 10;
/// Dashboard activity feed length.
const RECENT_ACTIVITY_LIMIT: usize = 50;
/// Realtime feed cap; the realtime summary counts within this cap.
const REALTIME_LIMIT: usize = 20;

/// Default trend horizon in days.
pub const DEFAULT_TREND_DAYS: i64 = 30;

/// Point-in-time dashboard snapshot for `[now - period, now]`.
///
/// The engine never checks that the tracking id exists; an unknown id
/// yields zeros and empty lists, indistinguishable from a quiet site.
pub async fn compute_dashboard_metrics(
    store: &dyn EventStore,
    tracking_id: &str,
    period: Period,
) -> Result<DashboardResponse, AnalyticsError> {
    let range = TimeRange::last(period.duration());

    let (total_events, ai_bots_detected, sessions, pages, bots, recent) = tokio::try_join!(
        store.count(tracking_id, range, None),
        store.count(tracking_id, range, Some(EVENT_AI_BOT_DETECTED)),
        store.distinct_values(EventField::SessionId, tracking_id, range),
        store.group_and_count(tracking_id, range, Some(EVENT_PAGE_VIEW), GroupKey::Url),
        store.group_and_count(tracking_id, range, Some(EVENT_AI_BOT_DETECTED), GroupKey::Bot),
        store.find_recent(tracking_id, range, RECENT_ACTIVITY_LIMIT),
    )?;

    let top_pages = top_n(pages, TOP_LIMIT)
        .into_iter()
        .map(|group| PageStat {
            url: group.key,
            views: group.count,
        })
        .collect();

    let top_bots = top_n(bots, TOP_LIMIT)
        .into_iter()
        .map(|group| BotStat {
            name: group.key,
            description: group.description,
            count: group.count,
            last_seen: group.last_seen,
        })
        .collect();

    Ok(DashboardResponse {
        success: true,
        period: period.as_str().to_string(),
        date_range: DateRange {
            start_date: range.start,
            end_date: range.end,
        },
        metrics: DashboardMetrics {
            total_events,
            ai_bots_detected,
            unique_sessions: sessions.len() as u64,
            top_pages,
            top_bots,
            recent_activity: recent.iter().map(reduce_event).collect(),
        },
    })
}

/// Live view of the trailing hour: the 20 most recent events plus a
/// summary computed over that capped set. An hour with more than 20
/// events therefore reports 20, not the true hourly total; the summary
/// describes the returned feed, and callers wanting exact hourly counts
/// should use the dashboard metrics.
pub async fn compute_realtime_summary(
    store: &dyn EventStore,
    tracking_id: &str,
) -> Result<RealtimeResponse, AnalyticsError> {
    let range = TimeRange::last(Duration::hours(1));
    let events = store.find_recent(tracking_id, range, REALTIME_LIMIT).await?;

    let ai_bots = events.iter().filter(|e| e.is_bot_detection()).count() as u64;
    let summary = RealtimeSummary {
        total_events_last_hour: events.len() as u64,
        ai_bots_detected_last_hour: ai_bots,
        is_active: !events.is_empty(),
    };

    Ok(RealtimeResponse {
        success: true,
        data: events.iter().map(realtime_event).collect(),
        summary,
    })
}

/// Time-bucketed trend series over `[now - days, now]`. Buckets follow the
/// event's own timestamp, come back ascending, and are never zero-filled:
/// charting clients must handle the gaps.
pub async fn compute_trends(
    store: &dyn EventStore,
    tracking_id: &str,
    granularity: Granularity,
    days: i64,
) -> Result<TrendsResponse, AnalyticsError> {
    let range = TimeRange::last(Duration::days(days));
    let trends = store.trend_buckets(tracking_id, range, granularity).await?;

    Ok(TrendsResponse {
        success: true,
        period: granularity.as_str().to_string(),
        date_range: DateRange {
            start_date: range.start,
            end_date: range.end,
        },
        trends,
    })
}

/// Rank groups by count, descending, and keep the first `n`. The sort is
/// stable, so tied groups keep the store's first-seen order and repeated
/// calls over the same data rank identically.
fn top_n(mut groups: Vec<GroupedCount>, n: usize) -> Vec<GroupedCount> {
    groups.sort_by(|a, b| b.count.cmp(&a.count));
    groups.truncate(n);
    groups
}

fn reduce_event(event: &Event) -> ReducedEvent {
    ReducedEvent {
        event_type: event.event_type.clone(),
        timestamp: event.timestamp,
        url: event.url.clone(),
        data: event.bot_info(),
    }
}

fn realtime_event(event: &Event) -> RealtimeEvent {
    RealtimeEvent {
        event_type: event.event_type.clone(),
        timestamp: event.timestamp,
        url: event.url.clone(),
        data: event.bot_info(),
        session_id: event.session_id.clone(),
    }
}
