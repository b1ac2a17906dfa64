//! Persistence boundary for saved custom chart values.
//!
//! Records are keyed by `(identifier, chart_type)`; an upsert replaces any
//! previous record for the same key (last write wins, no versioning).

mod memory;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::{
    charts::{ChartData, ChartType},
    email::EmailAddress,
};

pub use memory::MemoryStore;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredRecord {
    pub identifier: EmailAddress,
    pub chart_type: ChartType,
    pub chart_data: ChartData,
    pub updated_at: DateTime<Utc>,
}

impl StoredRecord {
    /// Builds a record stamped with the current time.
    pub fn new(identifier: EmailAddress, chart_data: ChartData) -> Self {
        Self {
            identifier,
            chart_type: chart_data.chart_type(),
            chart_data,
            updated_at: Utc::now(),
        }
    }
}

#[async_trait]
pub trait CustomValueStore: Send + Sync {
    /// Returns `Ok(None)` when nothing has been saved for the key. Errors mean
    /// the read itself failed.
    async fn lookup(
        &self,
        identifier: &EmailAddress,
        chart_type: ChartType,
    ) -> Result<Option<StoredRecord>>;

    /// Writes the record unless `cancel` fires first. Once the token is
    /// cancelled nothing may be committed, so a caller that gave up on the
    /// request can report it as not saved.
    async fn upsert(&self, record: StoredRecord, cancel: &CancellationToken) -> Result<()>;
}
