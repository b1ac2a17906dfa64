use serde::{Deserialize, Serialize};

use super::{
    check_index, input::coerce_numeric, ChartData, ChartDataset, ChartType, EditError,
    OverwritePreview,
};

/// Rows shown by the duration editor table.
pub const EDITOR_VISIBLE_ROWS: usize = 20;

const PREVIEW_POINTS: usize = 5;

const BELL_MEAN_SECS: f64 = 180.0;
const BELL_STD_DEV_SECS: f64 = 60.0;
const BELL_MAX_SECS: u32 = 600;
const BELL_STEP_SECS: u32 = 10;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct DurationPoint {
    /// Call length in seconds.
    pub duration: f64,
    pub frequency: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum DurationField {
    Duration,
    Frequency,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DurationEdit {
    pub index: usize,
    pub field: DurationField,
    pub value: f64,
}

impl DurationEdit {
    /// Builds an edit from raw editor text; unparseable input becomes 0.
    pub fn from_input(index: usize, field: DurationField, raw: &str) -> Self {
        Self {
            index,
            field,
            value: coerce_numeric(raw),
        }
    }
}

/// Call-duration histogram, in x-axis order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct DurationDataset(Vec<DurationPoint>);

impl DurationDataset {
    pub fn new(points: Vec<DurationPoint>) -> Self {
        Self(points)
    }

    /// Normal curve centred on three minutes, sampled every 10s up to 600s.
    pub fn bell_curve() -> Self {
        let points = (0..=BELL_MAX_SECS)
            .step_by(BELL_STEP_SECS as usize)
            .map(|secs| {
                let duration = f64::from(secs);
                let exponent =
                    -(duration - BELL_MEAN_SECS).powi(2) / (2.0 * BELL_STD_DEV_SECS.powi(2));
                DurationPoint {
                    duration,
                    frequency: (exponent.exp() * 100.0).max(0.0),
                }
            })
            .collect();
        Self(points)
    }

    pub fn points(&self) -> &[DurationPoint] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn editor_rows(&self) -> &[DurationPoint] {
        &self.0[..self.0.len().min(EDITOR_VISIBLE_ROWS)]
    }
}

impl Default for DurationDataset {
    fn default() -> Self {
        Self::bell_curve()
    }
}

impl ChartDataset for DurationDataset {
    type Edit = DurationEdit;

    const CHART_TYPE: ChartType = ChartType::Duration;

    fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn apply_edit(&mut self, edit: DurationEdit) -> Result<(), EditError> {
        check_index("point", edit.index, self.0.len())?;
        let point = &mut self.0[edit.index];
        match edit.field {
            DurationField::Duration => point.duration = edit.value,
            DurationField::Frequency => point.frequency = edit.value,
        }
        Ok(())
    }

    fn preview(&self) -> OverwritePreview {
        if self.0.is_empty() {
            return OverwritePreview::placeholder();
        }

        let mut lines: Vec<String> = self
            .0
            .iter()
            .take(PREVIEW_POINTS)
            .map(|point| {
                format!(
                    "Duration: {}s, Frequency: {:.2}",
                    point.duration, point.frequency
                )
            })
            .collect();

        let hidden = self.0.len().saturating_sub(PREVIEW_POINTS);
        if hidden > 0 {
            lines.push(format!("... and {hidden} more points"));
        }

        OverwritePreview::new("Previous Call Duration Values:", lines)
    }

    fn into_chart_data(self) -> ChartData {
        ChartData::Duration(self)
    }

    fn from_chart_data(data: ChartData) -> Option<Self> {
        match data {
            ChartData::Duration(points) => Some(points),
            ChartData::SadPath(_) => None,
        }
    }
}
