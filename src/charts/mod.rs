//! Chart datasets and the shape strategy the edit workflow is generic over.
//!
//! Two shapes exist: a flat list of duration points and a hierarchical list
//! of sad-path categories. Both implement [`ChartDataset`], which supplies
//! the edit operations, derived-total rules and overwrite preview for that
//! shape. [`ChartData`] is the tagged union used when a dataset crosses the
//! persistence boundary.

pub mod duration;
pub mod input;
pub mod preview;
pub mod sad_path;

use std::{fmt, str::FromStr};

use anyhow::{anyhow, Result};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

pub use duration::{DurationDataset, DurationEdit, DurationField, DurationPoint};
pub use input::coerce_numeric;
pub use preview::OverwritePreview;
pub use sad_path::{RingSlice, SadPathCategory, SadPathDataset, SadPathEdit, Subcategory};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ChartType {
    #[serde(rename = "duration")]
    Duration,
    #[serde(rename = "sad-path")]
    SadPath,
}

impl ChartType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartType::Duration => "duration",
            ChartType::SadPath => "sad-path",
        }
    }

    /// Partition key used by the `user_custom_values` table.
    pub fn storage_key(&self) -> &'static str {
        match self {
            ChartType::Duration => "call_duration",
            ChartType::SadPath => "sad_path",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            ChartType::Duration => "Call Duration Analysis",
            ChartType::SadPath => "Sad Path Analysis",
        }
    }
}

impl fmt::Display for ChartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChartType {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "duration" | "call_duration" | "call-duration" => Ok(ChartType::Duration),
            "sad-path" | "sad_path" => Ok(ChartType::SadPath),
            other => Err(anyhow!("unknown chart type '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("{target} index {index} is out of range ({len} available)")]
    IndexOutOfRange {
        target: &'static str,
        index: usize,
        len: usize,
    },
}

pub(crate) fn check_index(target: &'static str, index: usize, len: usize) -> Result<(), EditError> {
    if index < len {
        Ok(())
    } else {
        Err(EditError::IndexOutOfRange { target, index, len })
    }
}

/// Stored chart payload. Serializes to the bare JSON array the backend
/// table holds; decoding needs the chart type because an empty array is
/// valid for both shapes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ChartData {
    Duration(DurationDataset),
    SadPath(SadPathDataset),
}

impl ChartData {
    pub fn chart_type(&self) -> ChartType {
        match self {
            ChartData::Duration(_) => ChartType::Duration,
            ChartData::SadPath(_) => ChartType::SadPath,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            ChartData::Duration(data) => data.is_empty(),
            ChartData::SadPath(data) => data.is_empty(),
        }
    }

    pub fn from_json(chart_type: ChartType, raw: &str) -> serde_json::Result<Self> {
        Ok(match chart_type {
            ChartType::Duration => ChartData::Duration(serde_json::from_str(raw)?),
            ChartType::SadPath => ChartData::SadPath(serde_json::from_str(raw)?),
        })
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Dataset shape capability for [`crate::workflow::EditWorkflow`].
pub trait ChartDataset:
    Clone + PartialEq + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Field-level mutation accepted by the inline editor.
    type Edit: fmt::Debug + Send;

    const CHART_TYPE: ChartType;

    fn is_empty(&self) -> bool;

    /// Applies one edit, recomputing any derived totals. Must leave `self`
    /// untouched when it returns an error.
    fn apply_edit(&mut self, edit: Self::Edit) -> Result<(), EditError>;

    fn preview(&self) -> OverwritePreview;

    fn into_chart_data(self) -> ChartData;

    /// Returns `None` when `data` holds the other shape.
    fn from_chart_data(data: ChartData) -> Option<Self>;
}
