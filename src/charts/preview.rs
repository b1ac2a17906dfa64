use serde::{Deserialize, Serialize};

const PLACEHOLDER: &str = "Previous data available";

/// Read-only summary of a previously saved dataset, shown before the user
/// decides whether to overwrite it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OverwritePreview {
    pub heading: String,
    pub lines: Vec<String>,
}

impl OverwritePreview {
    pub fn new(heading: impl Into<String>, lines: Vec<String>) -> Self {
        Self {
            heading: heading.into(),
            lines,
        }
    }

    /// Used when the saved dataset has nothing to list.
    pub fn placeholder() -> Self {
        Self::new(PLACEHOLDER, Vec::new())
    }

    pub fn render(&self) -> String {
        let mut out = self.heading.clone();
        for line in &self.lines {
            out.push('\n');
            out.push_str(line);
        }
        out
    }
}
