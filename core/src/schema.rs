use serde::{Deserialize, Serialize};

/// Placeholder written into blank designated text fields during cleaning.
pub const SENTINEL: &str = "Not specified";

/// Names of the columns the engine treats specially. Every other column is
/// carried through opaquely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Schema {
    pub company: String,
    pub role: String,
    pub compensation: String,
    /// The placement export spells this header "Stiepend".
    pub stipend: String,
    pub origin: String,
    pub program: String,
    pub gender: String,
}

impl Default for Schema {
    fn default() -> Self {
        Self {
            company: "Company".into(),
            role: "Role".into(),
            compensation: "Compensation: CTC".into(),
            stipend: "Stiepend (per month)".into(),
            origin: "Placement Origin".into(),
            program: "Class".into(),
            gender: "Gender".into(),
        }
    }
}

impl Schema {
    /// Columns that get sentinel-filled and trimmed by the cleaner.
    pub fn text_fields(&self) -> [&str; 5] {
        [&self.company, &self.role, &self.compensation, &self.stipend, &self.origin]
    }
}
