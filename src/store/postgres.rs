use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use sqlx::PgPool;

use crate::error::StoreError;
use crate::models::analytics::{BucketKey, Granularity, TrendBucket};
use crate::models::event::{Event, NewEvent};
use crate::store::{EventField, EventStore, GroupKey, GroupedCount, TimeRange};

/// Postgres-backed event store. Grouping, distinct counting, and trend
/// bucketing are pushed down into SQL; the engine only ranks and assembles.
pub struct PgEventStore {
    pool: PgPool,
}

impl PgEventStore {
    pub fn new(pool: PgPool) -> Self {
        PgEventStore { pool }
    }

    /// Creates the events table and its query index if they don't exist.
    /// Run once at startup.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS events (
                id BIGSERIAL PRIMARY KEY,
                tracking_id TEXT NOT NULL,
                event_type TEXT NOT NULL,
                url TEXT,
                timestamp TIMESTAMPTZ NOT NULL,
                server_timestamp TIMESTAMPTZ NOT NULL,
                session_id TEXT,
                bot_name TEXT,
                bot_description TEXT,
                ip TEXT,
                user_agent TEXT,
                referrer TEXT
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS events_tracking_time_idx ON events (tracking_id, timestamp)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

const INSERT_EVENT: &str = r#"
    INSERT INTO events (
        tracking_id, event_type, url, timestamp, server_timestamp,
        session_id, bot_name, bot_description, ip, user_agent, referrer
    )
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
    RETURNING *
"#;

fn bind_new_event<'q>(
    query: sqlx::query::QueryAs<'q, sqlx::Postgres, Event, sqlx::postgres::PgArguments>,
    event: &'q NewEvent,
) -> sqlx::query::QueryAs<'q, sqlx::Postgres, Event, sqlx::postgres::PgArguments> {
    query
        .bind(&event.tracking_id)
        .bind(&event.event_type)
        .bind(&event.url)
        .bind(event.timestamp)
        .bind(event.server_timestamp)
        .bind(&event.session_id)
        .bind(&event.bot_name)
        .bind(&event.bot_description)
        .bind(&event.ip)
        .bind(&event.user_agent)
        .bind(&event.referrer)
}

#[async_trait]
impl EventStore for PgEventStore {
    async fn insert(&self, event: NewEvent) -> Result<Event, StoreError> {
        let inserted = bind_new_event(sqlx::query_as::<_, Event>(INSERT_EVENT), &event)
            .fetch_one(&self.pool)
            .await?;
        Ok(inserted)
    }

    async fn insert_many(&self, events: Vec<NewEvent>) -> Result<u64, StoreError> {
        let mut tx = self.pool.begin().await?;
        for event in &events {
            bind_new_event(sqlx::query_as::<_, Event>(INSERT_EVENT), event)
                .fetch_one(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(events.len() as u64)
    }

    async fn count(
        &self,
        tracking_id: &str,
        range: TimeRange,
        event_type: Option<&str>,
    ) -> Result<u64, StoreError> {
        let count: i64 = match event_type {
            Some(event_type) => {
                sqlx::query_scalar(
                    r#"
                    SELECT COUNT(*) FROM events
                    WHERE tracking_id = $1 AND timestamp >= $2 AND timestamp <= $3
                      AND event_type = $4
                    "#,
                )
                .bind(tracking_id)
                .bind(range.start)
                .bind(range.end)
                .bind(event_type)
                .fetch_one(&self.pool)
                .await?
            }
            None => {
                sqlx::query_scalar(
                    r#"
                    SELECT COUNT(*) FROM events
                    WHERE tracking_id = $1 AND timestamp >= $2 AND timestamp <= $3
                    "#,
                )
                .bind(tracking_id)
                .bind(range.start)
                .bind(range.end)
                .fetch_one(&self.pool)
                .await?
            }
        };
        Ok(count as u64)
    }

    async fn distinct_values(
        &self,
        field: EventField,
        tracking_id: &str,
        range: TimeRange,
    ) -> Result<HashSet<String>, StoreError> {
        let sql = match field {
            EventField::SessionId => {
                r#"
                SELECT DISTINCT session_id FROM events
                WHERE tracking_id = $1 AND timestamp >= $2 AND timestamp <= $3
                  AND session_id IS NOT NULL
                "#
            }
            EventField::Url => {
                r#"
                SELECT DISTINCT url FROM events
                WHERE tracking_id = $1 AND timestamp >= $2 AND timestamp <= $3
                  AND url IS NOT NULL
                "#
            }
        };

        let stream = sqlx::query_scalar::<_, String>(sql)
            .bind(tracking_id)
            .bind(range.start)
            .bind(range.end)
            .fetch(&self.pool);

        let values: Vec<String> = stream.try_collect().await?;
        Ok(values.into_iter().collect())
    }

    async fn group_and_count(
        &self,
        tracking_id: &str,
        range: TimeRange,
        event_type: Option<&str>,
        key: GroupKey,
    ) -> Result<Vec<GroupedCount>, StoreError> {
        // MIN(id) reproduces the first-seen order the memory store yields,
        // so tie order is identical across backends.
        let sql = match (key, event_type.is_some()) {
            (GroupKey::Url, true) => {
                r#"
                SELECT url AS key, NULL::TEXT AS description,
                       COUNT(*) AS count, MAX(timestamp) AS last_seen
                FROM events
                WHERE tracking_id = $1 AND timestamp >= $2 AND timestamp <= $3
                  AND event_type = $4 AND url IS NOT NULL
                GROUP BY url
                ORDER BY MIN(id)
                "#
            }
            (GroupKey::Url, false) => {
                r#"
                SELECT url AS key, NULL::TEXT AS description,
                       COUNT(*) AS count, MAX(timestamp) AS last_seen
                FROM events
                WHERE tracking_id = $1 AND timestamp >= $2 AND timestamp <= $3
                  AND url IS NOT NULL
                GROUP BY url
                ORDER BY MIN(id)
                "#
            }
            (GroupKey::Bot, true) => {
                r#"
                SELECT bot_name AS key, bot_description AS description,
                       COUNT(*) AS count, MAX(timestamp) AS last_seen
                FROM events
                WHERE tracking_id = $1 AND timestamp >= $2 AND timestamp <= $3
                  AND event_type = $4 AND bot_name IS NOT NULL
                GROUP BY bot_name, bot_description
                ORDER BY MIN(id)
                "#
            }
            (GroupKey::Bot, false) => {
                r#"
                SELECT bot_name AS key, bot_description AS description,
                       COUNT(*) AS count, MAX(timestamp) AS last_seen
                FROM events
                WHERE tracking_id = $1 AND timestamp >= $2 AND timestamp <= $3
                  AND bot_name IS NOT NULL
                GROUP BY bot_name, bot_description
                ORDER BY MIN(id)
                "#
            }
        };

        let mut query = sqlx::query_as::<_, (String, Option<String>, i64, DateTime<Utc>)>(sql)
            .bind(tracking_id)
            .bind(range.start)
            .bind(range.end);
        if let Some(event_type) = event_type {
            query = query.bind(event_type);
        }

        let rows: Vec<(String, Option<String>, i64, DateTime<Utc>)> =
            query.fetch(&self.pool).try_collect().await?;

        Ok(rows
            .into_iter()
            .map(|(key, description, count, last_seen)| GroupedCount {
                key,
                description,
                count: count as u64,
                last_seen,
            })
            .collect())
    }

    async fn trend_buckets(
        &self,
        tracking_id: &str,
        range: TimeRange,
        granularity: Granularity,
    ) -> Result<Vec<TrendBucket>, StoreError> {
        let sql = match granularity {
            Granularity::Hourly => {
                r#"
                SELECT EXTRACT(YEAR FROM timestamp)::INT4 AS year,
                       EXTRACT(MONTH FROM timestamp)::INT4 AS month,
                       EXTRACT(DAY FROM timestamp)::INT4 AS day,
                       EXTRACT(HOUR FROM timestamp)::INT4 AS hour,
                       COUNT(*) AS total_events,
                       COUNT(*) FILTER (WHERE event_type = 'page_view') AS page_views,
                       COUNT(*) FILTER (WHERE event_type = 'ai_bot_detected') AS ai_bots_detected,
                       COUNT(DISTINCT session_id) AS unique_sessions
                FROM events
                WHERE tracking_id = $1 AND timestamp >= $2 AND timestamp <= $3
                GROUP BY 1, 2, 3, 4
                ORDER BY 1, 2, 3, 4
                "#
            }
            Granularity::Daily => {
                r#"
                SELECT EXTRACT(YEAR FROM timestamp)::INT4 AS year,
                       EXTRACT(MONTH FROM timestamp)::INT4 AS month,
                       EXTRACT(DAY FROM timestamp)::INT4 AS day,
                       NULL::INT4 AS hour,
                       COUNT(*) AS total_events,
                       COUNT(*) FILTER (WHERE event_type = 'page_view') AS page_views,
                       COUNT(*) FILTER (WHERE event_type = 'ai_bot_detected') AS ai_bots_detected,
                       COUNT(DISTINCT session_id) AS unique_sessions
                FROM events
                WHERE tracking_id = $1 AND timestamp >= $2 AND timestamp <= $3
                GROUP BY 1, 2, 3
                ORDER BY 1, 2, 3
                "#
            }
        };

        type TrendRow = (i32, i32, i32, Option<i32>, i64, i64, i64, i64);
        let rows: Vec<TrendRow> = sqlx::query_as::<_, TrendRow>(sql)
            .bind(tracking_id)
            .bind(range.start)
            .bind(range.end)
            .fetch(&self.pool)
            .try_collect()
            .await?;

        Ok(rows
            .into_iter()
            .map(
                |(year, month, day, hour, total, page_views, bots, sessions)| TrendBucket {
                    bucket: BucketKey {
                        year,
                        month: month as u32,
                        day: day as u32,
                        hour: hour.map(|h| h as u32),
                    },
                    total_events: total as u64,
                    page_views: page_views as u64,
                    ai_bots_detected: bots as u64,
                    unique_sessions: sessions as u64,
                },
            )
            .collect())
    }

    async fn find_recent(
        &self,
        tracking_id: &str,
        range: TimeRange,
        limit: usize,
    ) -> Result<Vec<Event>, StoreError> {
        let stream = sqlx::query_as::<_, Event>(
            r#"
            SELECT * FROM events
            WHERE tracking_id = $1 AND timestamp >= $2 AND timestamp <= $3
            ORDER BY timestamp DESC, id DESC
            LIMIT $4
            "#,
        )
        .bind(tracking_id)
        .bind(range.start)
        .bind(range.end)
        .bind(limit as i64)
        .fetch(&self.pool);

        let events = stream.try_collect().await?;
        Ok(events)
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM events WHERE timestamp < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
