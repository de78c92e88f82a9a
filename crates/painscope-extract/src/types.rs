//! Raw and repaired model output shapes.

use serde::Deserialize;

use painscope_core::{Category, Severity};

/// The model's reply, exactly as parsed — not yet validated against the
/// closed enums. Either `no_pain_point` is set, or the record fields are
/// expected to be present.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelOutput {
    #[serde(default)]
    pub no_pain_point: bool,
    #[serde(default)]
    pub problem_statement: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub opportunity_score: Option<i64>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub context: Option<String>,
}

/// A pain point that has passed the repair policy: every field is within the
/// closed schema and ready for persistence.
#[derive(Debug, Clone)]
pub struct RepairedPainPoint {
    pub problem_statement: String,
    pub category: Category,
    pub severity: Severity,
    pub opportunity_score: i32,
    pub tags: Vec<String>,
    pub context: String,
}
