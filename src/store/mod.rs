pub mod memory;
pub mod postgres;

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::error::StoreError;
use crate::models::analytics::{Granularity, TrendBucket};
use crate::models::event::{Event, NewEvent};

pub use memory::MemoryEventStore;
pub use postgres::PgEventStore;

/// Inclusive time window, `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    /// The trailing window ending now.
    pub fn last(duration: Duration) -> Self {
        let end = Utc::now();
        TimeRange {
            start: end - duration,
            end,
        }
    }

    /// Everything persisted up to now. The epoch lower bound keeps the
    /// range representable in Postgres.
    pub fn all() -> Self {
        TimeRange {
            start: DateTime::UNIX_EPOCH,
            end: Utc::now(),
        }
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts <= self.end
    }
}

/// Event fields a distinct-value query can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventField {
    SessionId,
    Url,
}

/// Grouping key for group-and-count queries. A closure key would not
/// survive the SQL backend, so the supported groupings are enumerated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKey {
    /// Group by `url`.
    Url,
    /// Group by `(bot_name, bot_description)`.
    Bot,
}

/// One group from a group-and-count query. `last_seen` is the max event
/// timestamp observed in the group.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupedCount {
    pub key: String,
    pub description: Option<String>,
    pub count: u64,
    pub last_seen: DateTime<Utc>,
}

/// The query contract the aggregation engine requires from its store.
///
/// Events are immutable once written: reads commute with each other and may
/// run concurrently, a read never observes a half-written event, and the
/// only destructive operation is the retention sweep's `delete_older_than`.
/// Implementations do not retry; a transient failure surfaces as a single
/// `StoreError`.
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn insert(&self, event: NewEvent) -> Result<Event, StoreError>;

    async fn insert_many(&self, events: Vec<NewEvent>) -> Result<u64, StoreError>;

    /// Count events for a tracking id in range, optionally restricted to a
    /// single event type.
    async fn count(
        &self,
        tracking_id: &str,
        range: TimeRange,
        event_type: Option<&str>,
    ) -> Result<u64, StoreError>;

    /// Distinct non-null values of `field` in range. Events where the field
    /// is absent contribute nothing.
    async fn distinct_values(
        &self,
        field: EventField,
        tracking_id: &str,
        range: TimeRange,
    ) -> Result<HashSet<String>, StoreError>;

    /// Group matching events by `key` and count per group. Groups come back
    /// in first-seen order; ranking and truncation are the caller's job.
    async fn group_and_count(
        &self,
        tracking_id: &str,
        range: TimeRange,
        event_type: Option<&str>,
        key: GroupKey,
    ) -> Result<Vec<GroupedCount>, StoreError>;

    /// Per-bucket totals keyed by calendar parts of the event's own
    /// timestamp, ascending. Buckets with no events are never synthesized.
    async fn trend_buckets(
        &self,
        tracking_id: &str,
        range: TimeRange,
        granularity: Granularity,
    ) -> Result<Vec<TrendBucket>, StoreError>;

    /// The `limit` most recent events in range, descending by timestamp.
    async fn find_recent(
        &self,
        tracking_id: &str,
        range: TimeRange,
        limit: usize,
    ) -> Result<Vec<Event>, StoreError>;

    /// Retention sweep. Removes events strictly older than the cutoff and
    /// reports how many were deleted.
    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError>;
}
