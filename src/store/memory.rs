use std::collections::{BTreeMap, HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::models::analytics::{BucketKey, Granularity, TrendBucket};
use crate::models::event::{Event, NewEvent, EVENT_AI_BOT_DETECTED, EVENT_PAGE_VIEW};
use crate::store::{EventField, EventStore, GroupKey, GroupedCount, TimeRange};

/// In-memory event store.
///
/// The injectable replacement for keeping events in a process-global array:
/// the same contract as the Postgres store, behind one lock, so it can back
/// both tests and single-node deployments that run without a database.
/// Events are append-only; a write holds the lock for the whole insert, so
/// readers never observe a partially-written event.
#[derive(Debug, Default)]
pub struct MemoryEventStore {
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    events: Vec<Event>,
    next_id: i64,
}

impl Inner {
    fn append(&mut self, new: NewEvent) -> Event {
        self.next_id += 1;
        let event = Event::from_new(self.next_id, new);
        self.events.push(event.clone());
        event
    }
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches(event: &Event, tracking_id: &str, range: TimeRange, event_type: Option<&str>) -> bool {
    event.tracking_id == tracking_id
        && range.contains(event.timestamp)
        && event_type.is_none_or(|t| event.event_type == t)
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn insert(&self, event: NewEvent) -> Result<Event, StoreError> {
        let mut inner = self.inner.write().await;
        Ok(inner.append(event))
    }

    async fn insert_many(&self, events: Vec<NewEvent>) -> Result<u64, StoreError> {
        let mut inner = self.inner.write().await;
        let count = events.len() as u64;
        for event in events {
            inner.append(event);
        }
        Ok(count)
    }

    async fn count(
        &self,
        tracking_id: &str,
        range: TimeRange,
        event_type: Option<&str>,
    ) -> Result<u64, StoreError> {
        let inner = self.inner.read().await;
        let count = inner
            .events
            .iter()
            .filter(|e| matches(e, tracking_id, range, event_type))
            .count();
        Ok(count as u64)
    }

    async fn distinct_values(
        &self,
        field: EventField,
        tracking_id: &str,
        range: TimeRange,
    ) -> Result<HashSet<String>, StoreError> {
        let inner = self.inner.read().await;
        let values = inner
            .events
            .iter()
            .filter(|e| matches(e, tracking_id, range, None))
            .filter_map(|e| match field {
                EventField::SessionId => e.session_id.clone(),
                EventField::Url => e.url.clone(),
            })
            .collect();
        Ok(values)
    }

    async fn group_and_count(
        &self,
        tracking_id: &str,
        range: TimeRange,
        event_type: Option<&str>,
        key: GroupKey,
    ) -> Result<Vec<GroupedCount>, StoreError> {
        let inner = self.inner.read().await;

        // Insertion order doubles as the first-seen order the contract
        // promises, so ties stay stable across calls.
        let mut groups: Vec<GroupedCount> = Vec::new();
        let mut index: HashMap<(String, Option<String>), usize> = HashMap::new();

        for event in inner
            .events
            .iter()
            .filter(|e| matches(e, tracking_id, range, event_type))
        {
            let (group_key, description) = match key {
                GroupKey::Url => match &event.url {
                    Some(url) => (url.clone(), None),
                    None => continue,
                },
                GroupKey::Bot => match &event.bot_name {
                    Some(name) => (name.clone(), event.bot_description.clone()),
                    None => continue,
                },
            };

            match index.entry((group_key.clone(), description.clone())) {
                std::collections::hash_map::Entry::Occupied(slot) => {
                    let group = &mut groups[*slot.get()];
                    group.count += 1;
                    group.last_seen = group.last_seen.max(event.timestamp);
                }
                std::collections::hash_map::Entry::Vacant(slot) => {
                    slot.insert(groups.len());
                    groups.push(GroupedCount {
                        key: group_key,
                        description,
                        count: 1,
                        last_seen: event.timestamp,
                    });
                }
            }
        }

        Ok(groups)
    }

    async fn trend_buckets(
        &self,
        tracking_id: &str,
        range: TimeRange,
        granularity: Granularity,
    ) -> Result<Vec<TrendBucket>, StoreError> {
        #[derive(Default)]
        struct Accum {
            total: u64,
            page_views: u64,
            bots: u64,
            sessions: HashSet<String>,
        }

        let inner = self.inner.read().await;
        let mut buckets: BTreeMap<BucketKey, Accum> = BTreeMap::new();

        for event in inner
            .events
            .iter()
            .filter(|e| matches(e, tracking_id, range, None))
        {
            let key = BucketKey::from_timestamp(event.timestamp, granularity);
            let accum = buckets.entry(key).or_default();
            accum.total += 1;
            match event.event_type.as_str() {
                EVENT_PAGE_VIEW => accum.page_views += 1,
                EVENT_AI_BOT_DETECTED => accum.bots += 1,
                _ => {}
            }
            if let Some(session) = &event.session_id {
                accum.sessions.insert(session.clone());
            }
        }

        Ok(buckets
            .into_iter()
            .map(|(bucket, accum)| TrendBucket {
                bucket,
                total_events: accum.total,
                page_views: accum.page_views,
                ai_bots_detected: accum.bots,
                unique_sessions: accum.sessions.len() as u64,
            })
            .collect())
    }

    async fn find_recent(
        &self,
        tracking_id: &str,
        range: TimeRange,
        limit: usize,
    ) -> Result<Vec<Event>, StoreError> {
        let inner = self.inner.read().await;
        let mut recent: Vec<Event> = inner
            .events
            .iter()
            .filter(|e| matches(e, tracking_id, range, None))
            .cloned()
            .collect();
        // Newest first; id breaks timestamp ties so the order is stable.
        recent.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
        recent.truncate(limit);
        Ok(recent)
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut inner = self.inner.write().await;
        let before = inner.events.len();
        inner.events.retain(|e| e.timestamp >= cutoff);
        Ok((before - inner.events.len()) as u64)
    }
}
