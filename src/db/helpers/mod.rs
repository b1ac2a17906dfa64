use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use crate::charts::ChartType;

pub fn parse_datetime(value: &str, field: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("failed to parse {field}"))
}

pub fn parse_chart_type(value: &str) -> Result<ChartType> {
    value
        .parse()
        .with_context(|| format!("unknown chart_type {value}"))
}
