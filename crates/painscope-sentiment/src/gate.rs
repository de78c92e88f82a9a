//! Admission policy between classification and extraction.

use painscope_core::SentimentLabel;

use crate::classifier::Classification;

/// Whether a classified item is admitted to extraction.
///
/// An item passes iff its label is `negative` and its confidence is at or
/// above `threshold` — the comparison is inclusive at the cutoff.
#[must_use]
pub fn admits(classification: Classification, threshold: f64) -> bool {
    classification.label == SentimentLabel::Negative && classification.confidence >= threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classified(label: SentimentLabel, confidence: f64) -> Classification {
        Classification { label, confidence }
    }

    #[test]
    fn confident_negative_is_admitted() {
        assert!(admits(classified(SentimentLabel::Negative, 0.95), 0.5));
    }

    #[test]
    fn exactly_at_threshold_is_admitted() {
        assert!(admits(classified(SentimentLabel::Negative, 0.5), 0.5));
    }

    #[test]
    fn just_below_threshold_is_rejected() {
        assert!(!admits(classified(SentimentLabel::Negative, 0.499_999), 0.5));
    }

    #[test]
    fn positive_is_rejected_regardless_of_confidence() {
        assert!(!admits(classified(SentimentLabel::Positive, 1.0), 0.5));
    }

    #[test]
    fn neutral_is_rejected() {
        assert!(!admits(classified(SentimentLabel::Neutral, 0.99), 0.5));
    }
}
