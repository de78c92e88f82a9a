//! Output repair policy.
//!
//! The engine, not the model, owns schema conformance: scores outside the
//! valid range are clamped, unknown categories fall back to `other` with the
//! original value preserved as a tag, and anything else out of schema is a
//! validation failure that leaves the item eligible for a later retry.

use std::str::FromStr;

use painscope_core::{Category, Severity};

use crate::error::ExtractError;
use crate::types::{ModelOutput, RepairedPainPoint};

/// Applies the repair policy to a raw model record.
///
/// # Errors
///
/// Returns [`ExtractError::Validation`] when a required field is missing or
/// the severity is outside the closed enum — those have no defined repair.
pub fn repair(output: ModelOutput) -> Result<RepairedPainPoint, ExtractError> {
    let problem_statement = output
        .problem_statement
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ExtractError::Validation("missing problem_statement".to_owned()))?;

    let raw_severity = output
        .severity
        .ok_or_else(|| ExtractError::Validation("missing severity".to_owned()))?;
    let severity = Severity::from_str(&raw_severity)
        .map_err(|_| ExtractError::Validation(format!("unknown severity: {raw_severity}")))?;

    let raw_score = output
        .opportunity_score
        .ok_or_else(|| ExtractError::Validation("missing opportunity_score".to_owned()))?;
    #[allow(clippy::cast_possible_truncation)]
    let opportunity_score = raw_score.clamp(0, 100) as i32;

    let mut tags = output.tags.unwrap_or_default();

    let raw_category = output
        .category
        .ok_or_else(|| ExtractError::Validation("missing category".to_owned()))?;
    let category = match Category::from_str(&raw_category) {
        Ok(category) => category,
        Err(_) => {
            // Keep the model's wording for traceability.
            tags.push(raw_category);
            Category::Other
        }
    };

    Ok(RepairedPainPoint {
        problem_statement,
        category,
        severity,
        opportunity_score,
        tags,
        context: output.context.unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_output() -> ModelOutput {
        ModelOutput {
            no_pain_point: false,
            problem_statement: Some("Report exports are too slow to rely on".to_owned()),
            category: Some("performance".to_owned()),
            severity: Some("high".to_owned()),
            opportunity_score: Some(82),
            tags: Some(vec!["performance".to_owned(), "exports".to_owned()]),
            context: Some("takes 5+ minutes and crashes".to_owned()),
        }
    }

    #[test]
    fn valid_output_passes_through() {
        let repaired = repair(valid_output()).unwrap();
        assert_eq!(repaired.category, Category::Performance);
        assert_eq!(repaired.severity, Severity::High);
        assert_eq!(repaired.opportunity_score, 82);
        assert_eq!(repaired.tags.len(), 2);
    }

    #[test]
    fn out_of_range_score_is_clamped() {
        let mut output = valid_output();
        output.opportunity_score = Some(140);
        assert_eq!(repair(output).unwrap().opportunity_score, 100);

        let mut output = valid_output();
        output.opportunity_score = Some(-3);
        assert_eq!(repair(output).unwrap().opportunity_score, 0);
    }

    #[test]
    fn unknown_category_becomes_other_with_tag() {
        let mut output = valid_output();
        output.category = Some("monetization".to_owned());
        let repaired = repair(output).unwrap();
        assert_eq!(repaired.category, Category::Other);
        assert!(
            repaired.tags.contains(&"monetization".to_owned()),
            "original value is preserved as a tag"
        );
    }

    #[test]
    fn unknown_severity_is_a_validation_failure() {
        let mut output = valid_output();
        output.severity = Some("catastrophic".to_owned());
        assert!(matches!(
            repair(output),
            Err(ExtractError::Validation(_))
        ));
    }

    #[test]
    fn missing_problem_statement_is_a_validation_failure() {
        let mut output = valid_output();
        output.problem_statement = None;
        assert!(matches!(repair(output), Err(ExtractError::Validation(_))));

        let mut output = valid_output();
        output.problem_statement = Some("   ".to_owned());
        assert!(matches!(repair(output), Err(ExtractError::Validation(_))));
    }

    #[test]
    fn missing_tags_and_context_default_to_empty() {
        let mut output = valid_output();
        output.tags = None;
        output.context = None;
        let repaired = repair(output).unwrap();
        assert!(repaired.tags.is_empty());
        assert!(repaired.context.is_empty());
    }
}
