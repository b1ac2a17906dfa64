//! Row model for the `user_custom_values` table.
//!
//! One row per `(email, chart_type)`. `chart_data` holds the dataset as the
//! bare JSON array the dashboard renders.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    charts::{ChartData, ChartType},
    email::EmailAddress,
    store::StoredRecord,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomValueRow {
    pub id: String,
    pub email: String,
    pub chart_type: ChartType,
    pub chart_data: String, // JSON-serialized ChartData
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CustomValueRow {
    pub fn into_record(self) -> Result<StoredRecord> {
        let identifier = EmailAddress::parse(&self.email)
            .with_context(|| format!("stored email '{}' is invalid", self.email))?;
        let chart_data = ChartData::from_json(self.chart_type, &self.chart_data)
            .with_context(|| format!("failed to decode chart_data for row {}", self.id))?;

        Ok(StoredRecord {
            identifier,
            chart_type: self.chart_type,
            chart_data,
            updated_at: self.updated_at,
        })
    }
}
