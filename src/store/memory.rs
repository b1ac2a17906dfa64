use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex, MutexGuard,
    },
    time::Duration,
};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::{CustomValueStore, StoredRecord};
use crate::{charts::ChartType, email::EmailAddress};

type RecordKey = (EmailAddress, ChartType);

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// In-process store. Failures and latency can be injected to exercise the
/// workflow's error paths.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<RecordKey, StoredRecord>>,
    lookup_failure: Mutex<Option<String>>,
    upsert_failure: Mutex<Option<String>>,
    latency: Option<Duration>,
    lookups: AtomicUsize,
    upserts: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call sleeps for `latency` before touching the map.
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency: Some(latency),
            ..Self::default()
        }
    }

    /// Writes a record directly, bypassing failure injection and counters.
    pub fn seed(&self, record: StoredRecord) {
        let key = (record.identifier.clone(), record.chart_type);
        lock(&self.records).insert(key, record);
    }

    pub fn get(&self, identifier: &EmailAddress, chart_type: ChartType) -> Option<StoredRecord> {
        lock(&self.records)
            .get(&(identifier.clone(), chart_type))
            .cloned()
    }

    pub fn len(&self) -> usize {
        lock(&self.records).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The next lookup fails with `message`.
    pub fn fail_next_lookup(&self, message: impl Into<String>) {
        *lock(&self.lookup_failure) = Some(message.into());
    }

    /// The next upsert fails with `message`.
    pub fn fail_next_upsert(&self, message: impl Into<String>) {
        *lock(&self.upsert_failure) = Some(message.into());
    }

    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    pub fn upsert_count(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl CustomValueStore for MemoryStore {
    async fn lookup(
        &self,
        identifier: &EmailAddress,
        chart_type: ChartType,
    ) -> Result<Option<StoredRecord>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;

        if let Some(message) = lock(&self.lookup_failure).take() {
            return Err(anyhow!(message));
        }
        Ok(self.get(identifier, chart_type))
    }

    async fn upsert(&self, record: StoredRecord, cancel: &CancellationToken) -> Result<()> {
        self.upserts.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;

        if let Some(message) = lock(&self.upsert_failure).take() {
            return Err(anyhow!(message));
        }
        if cancel.is_cancelled() {
            return Err(anyhow!("request cancelled"));
        }
        self.seed(record);
        Ok(())
    }
}
