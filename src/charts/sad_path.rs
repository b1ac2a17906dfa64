use serde::{Deserialize, Serialize};

use super::{
    check_index, input::coerce_numeric, ChartData, ChartDataset, ChartType, EditError,
    OverwritePreview,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Subcategory {
    pub name: String,
    /// Percentage, 0-100.
    pub value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SadPathCategory {
    pub category: String,
    /// Percentage, 0-100. Equals the subcategory sum after a subcategory edit.
    pub value: f64,
    pub subcategories: Vec<Subcategory>,
}

impl SadPathCategory {
    pub fn subcategory_total(&self) -> f64 {
        self.subcategories.iter().map(|sub| sub.value).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SadPathEdit {
    /// Sets one subcategory and recomputes its category total.
    Subcategory {
        category: usize,
        subcategory: usize,
        value: f64,
    },
    /// Sets a category total. Subcategories are left as they are.
    CategoryTotal { category: usize, value: f64 },
}

impl SadPathEdit {
    /// Editor entry point: `subcategory = None` targets the category total.
    pub fn from_input(category: usize, subcategory: Option<usize>, raw: &str) -> Self {
        let value = coerce_numeric(raw);
        match subcategory {
            Some(subcategory) => SadPathEdit::Subcategory {
                category,
                subcategory,
                value,
            },
            None => SadPathEdit::CategoryTotal { category, value },
        }
    }
}

/// One slice of the two-ring pie chart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RingSlice {
    pub name: String,
    pub value: f64,
    /// Parent category label for outer-ring slices.
    pub category: Option<String>,
    pub category_index: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct SadPathDataset(Vec<SadPathCategory>);

impl SadPathDataset {
    pub fn new(categories: Vec<SadPathCategory>) -> Self {
        Self(categories)
    }

    pub fn categories(&self) -> &[SadPathCategory] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn inner_ring(&self) -> Vec<RingSlice> {
        self.0
            .iter()
            .enumerate()
            .map(|(index, item)| RingSlice {
                name: item.category.clone(),
                value: item.value,
                category: None,
                category_index: index,
            })
            .collect()
    }

    pub fn outer_ring(&self) -> Vec<RingSlice> {
        self.0
            .iter()
            .enumerate()
            .flat_map(|(index, item)| {
                item.subcategories.iter().map(move |sub| RingSlice {
                    name: sub.name.clone(),
                    value: sub.value,
                    category: Some(item.category.clone()),
                    category_index: index,
                })
            })
            .collect()
    }
}

fn category(name: &str, subcategories: &[(&str, f64)]) -> SadPathCategory {
    let subcategories: Vec<Subcategory> = subcategories
        .iter()
        .map(|(name, value)| Subcategory {
            name: (*name).to_string(),
            value: *value,
        })
        .collect();
    SadPathCategory {
        category: name.to_string(),
        value: subcategories.iter().map(|sub| sub.value).sum(),
        subcategories,
    }
}

impl Default for SadPathDataset {
    fn default() -> Self {
        Self(vec![
            category("Customer Hostility", &[("Verbal Agression", 25.0)]),
            category(
                "Unsupported Language",
                &[
                    ("Assistant did not speak French", 15.0),
                    ("Assistant did not speak Spanish", 15.0),
                ],
            ),
            category(
                "Caller Identification Issues",
                &[
                    ("User refused to confirm identity", 15.0),
                    ("Caller Identification", 15.0),
                    ("Incorrect caller identity", 15.0),
                ],
            ),
        ])
    }
}

impl ChartDataset for SadPathDataset {
    type Edit = SadPathEdit;

    const CHART_TYPE: ChartType = ChartType::SadPath;

    fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn apply_edit(&mut self, edit: SadPathEdit) -> Result<(), EditError> {
        match edit {
            SadPathEdit::Subcategory {
                category,
                subcategory,
                value,
            } => {
                check_index("category", category, self.0.len())?;
                let target = &mut self.0[category];
                check_index("subcategory", subcategory, target.subcategories.len())?;
                target.subcategories[subcategory].value = value;
                target.value = target.subcategory_total();
            }
            SadPathEdit::CategoryTotal { category, value } => {
                check_index("category", category, self.0.len())?;
                self.0[category].value = value;
            }
        }
        Ok(())
    }

    fn preview(&self) -> OverwritePreview {
        if self.0.is_empty() {
            return OverwritePreview::placeholder();
        }

        let mut lines = Vec::new();
        for item in &self.0 {
            lines.push(format!("{}: {}%", item.category, item.value));
            for sub in &item.subcategories {
                lines.push(format!("  {}: {}%", sub.name, sub.value));
            }
        }
        OverwritePreview::new("Previous Sad Path Values:", lines)
    }

    fn into_chart_data(self) -> ChartData {
        ChartData::SadPath(self)
    }

    fn from_chart_data(data: ChartData) -> Option<Self> {
        match data {
            ChartData::SadPath(categories) => Some(categories),
            ChartData::Duration(_) => None,
        }
    }
}
