//! Top-1 selection and confidence thresholding

use crate::types::{ClassificationResult, ProbabilityVector};

/// Pick the most probable category and flag it when below `threshold`
///
/// Ties resolve to the lowest index. The index and confidence are returned
/// even when `low_confidence` is set.
#[must_use]
pub fn decide(probabilities: &ProbabilityVector, threshold: f64) -> ClassificationResult {
    decide_scores(probabilities.as_slice(), threshold).unwrap_or(ClassificationResult {
        category_index: 0,
        confidence: 0.0,
        low_confidence: true,
    })
}

/// Top-1 selection over arbitrary scores; `None` for an empty slice
///
/// Linear scan keeping the first maximum found. The reported confidence is
/// clamped to `[0, 1]`.
#[must_use]
pub fn decide_scores(scores: &[f64], threshold: f64) -> Option<ClassificationResult> {
    let (first, rest) = scores.split_first()?;
    let mut best_index = 0;
    let mut best = *first;
    for (offset, &score) in rest.iter().enumerate() {
        if score > best {
            best = score;
            best_index = offset + 1;
        }
    }

    let confidence = best.clamp(0.0, 1.0);
    Some(ClassificationResult {
        category_index: best_index,
        confidence,
        low_confidence: confidence < threshold,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn probs(values: &[f64]) -> ProbabilityVector {
        ProbabilityVector::try_from_vec(values.to_vec()).unwrap()
    }

    #[test]
    fn test_confident_prediction() {
        let result = decide(&probs(&[0.1, 0.7, 0.2]), 0.4);
        assert_eq!(result.category_index, 1);
        assert!((result.confidence - 0.7).abs() < 1e-12);
        assert!(!result.low_confidence);
    }

    #[test]
    fn test_tie_resolves_to_first_maximum() {
        for threshold in [0.0, 0.35, 0.5, 1.0] {
            let result = decide(&probs(&[0.3, 0.35, 0.35]), threshold);
            assert_eq!(result.category_index, 1);
        }
    }

    #[test]
    fn test_low_confidence_flagged() {
        let result = decide_scores(&[0.1, 0.2, 0.15], 0.4).unwrap();
        assert_eq!(result.category_index, 1);
        assert!((result.confidence - 0.2).abs() < 1e-12);
        assert!(result.low_confidence);
    }

    #[test]
    fn test_empty_scores_have_no_decision() {
        assert!(decide_scores(&[], 0.4).is_none());
    }

    #[test]
    fn test_low_confidence_still_reports_index() {
        let result = decide(&probs(&[0.1, 0.2, 0.15, 0.55 - 0.001, 0.001]), 0.6);
        assert_eq!(result.category_index, 3);
        assert!(result.low_confidence);
    }

    #[test]
    fn test_threshold_is_strict() {
        let at = decide(&probs(&[0.4, 0.3, 0.3]), 0.4);
        assert!(!at.low_confidence);

        let zero = decide(&probs(&[0.5, 0.5]), 0.0);
        assert!(!zero.low_confidence);

        let one = decide(&probs(&[0.0, 1.0]), 1.0);
        assert_eq!(one.category_index, 1);
        assert!(!one.low_confidence);
    }

    #[test]
    fn test_confidence_clamped_to_unit_interval() {
        let over = decide(&probs(&[1.0008, -0.0008]), 0.4);
        assert_eq!(over.category_index, 0);
        assert!((over.confidence - 1.0).abs() < f64::EPSILON);

        let result = decide_scores(&[-0.2, -0.1], 0.0).unwrap();
        assert_eq!(result.category_index, 1);
        assert!(result.confidence.abs() < f64::EPSILON);
        assert!(!result.low_confidence);
    }

    #[test]
    fn test_single_category() {
        let result = decide(&probs(&[1.0]), 0.4);
        assert_eq!(result.category_index, 0);
        assert!((result.confidence - 1.0).abs() < f64::EPSILON);
    }
}
