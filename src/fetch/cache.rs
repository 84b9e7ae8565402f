//! Memoized fetch results.
//!
//! [`RecordCache`] keeps the last successful fetch in memory so repeated
//! report renders do not hit the API again. Readers share the snapshot;
//! a refresh holds the write lock across fetch and replace, so only one
//! fetch runs at a time and no reader sees a half-replaced dataset.

use crate::error::FetchError;
use crate::fetch::client::{FetchOutcome, StatusClient};
use crate::models::RawRecord;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info};

#[derive(Debug)]
struct Snapshot {
    records: Arc<[RawRecord]>,
    fetched_at: Instant,
}

impl Snapshot {
    fn is_fresh(&self, ttl: Option<Duration>) -> bool {
        match ttl {
            Some(ttl) => self.fetched_at.elapsed() < ttl,
            None => true,
        }
    }
}

/// In-memory cache in front of a [`StatusClient`].
#[derive(Debug)]
pub struct RecordCache {
    client: StatusClient,
    /// `None` keeps the snapshot until it is refreshed or invalidated.
    ttl: Option<Duration>,
    slot: RwLock<Option<Snapshot>>,
}

impl RecordCache {
    pub fn new(client: StatusClient, ttl: Option<Duration>) -> Self {
        Self {
            client,
            ttl,
            slot: RwLock::new(None),
        }
    }

    pub fn client(&self) -> &StatusClient {
        &self.client
    }

    /// Cached records if fresh, otherwise a new fetch.
    pub async fn get(&self) -> Result<Arc<[RawRecord]>, FetchError> {
        {
            let slot = self.slot.read().await;
            if let Some(snapshot) = slot.as_ref().filter(|s| s.is_fresh(self.ttl)) {
                debug!("Serving {} cached records", snapshot.records.len());
                return Ok(snapshot.records.clone());
            }
        }

        let mut slot = self.slot.write().await;
        // Another caller may have refreshed while we waited for the lock
        if let Some(snapshot) = slot.as_ref().filter(|s| s.is_fresh(self.ttl)) {
            return Ok(snapshot.records.clone());
        }
        self.fetch_into(&mut slot).await
    }

    /// Refetch regardless of freshness.
    pub async fn refresh(&self) -> Result<Arc<[RawRecord]>, FetchError> {
        let mut slot = self.slot.write().await;
        info!("Refreshing dataset cache");
        self.fetch_into(&mut slot).await
    }

    /// Drop the snapshot so the next [`get`](Self::get) refetches.
    pub async fn invalidate(&self) {
        self.slot.write().await.take();
        debug!("Dataset cache invalidated");
    }

    /// Best-effort [`get`](Self::get): failures become an empty dataset.
    pub async fn get_or_empty(&self) -> FetchOutcome {
        FetchOutcome::from_result(self.get().await)
    }

    async fn fetch_into(
        &self,
        slot: &mut Option<Snapshot>,
    ) -> Result<Arc<[RawRecord]>, FetchError> {
        // A failed fetch leaves the previous snapshot in place
        let records: Arc<[RawRecord]> = self.client.fetch_records().await?.into();
        *slot = Some(Snapshot {
            records: records.clone(),
            fetched_at: Instant::now(),
        });
        Ok(records)
    }
}
