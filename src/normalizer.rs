//! Model output normalization
//!
//! Models may emit raw logits or an already-normalized distribution. The
//! decision between the two is made by [`detect_output_kind`]; logits go
//! through a max-shifted softmax, probabilities pass through unchanged.
//! A pinned output mode skips detection.

use crate::{
    config::OutputMode,
    error::{ClassifierError, Result},
    types::{ProbabilityVector, RawOutputVector},
    utils::NumericValidator,
};
use ndarray::Array1;
use tracing::debug;

/// Tolerance used to recognise an output that is already a distribution
pub const PROBABILITY_TOLERANCE: f64 = 1e-3;

/// What a raw output vector turned out to be
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    /// Every element in `[0, 1]` and the sum is 1, all within tolerance
    ProbabilityDistribution,
    /// Anything else
    Logits,
}

/// Decide whether `values` already satisfy the probability invariants
///
/// Elements may stray below 0 or above 1 by `tolerance`, and the sum may
/// differ from 1 by at most `tolerance`. An empty slice sums to 0 and is
/// therefore reported as logits.
#[must_use]
pub fn detect_output_kind(values: &[f32], tolerance: f64) -> OutputKind {
    let in_range = values.iter().all(|&v| {
        let v = f64::from(v);
        v >= -tolerance && v <= 1.0 + tolerance
    });
    if !in_range {
        return OutputKind::Logits;
    }

    let sum: f64 = values.iter().map(|&v| f64::from(v)).sum();
    if (sum - 1.0).abs() <= tolerance {
        OutputKind::ProbabilityDistribution
    } else {
        OutputKind::Logits
    }
}

/// Numerically stable softmax computed in `f64`
///
/// The maximum is subtracted before exponentiating, so the largest term is
/// `exp(0) = 1` and the denominator is at least 1.
#[must_use]
pub fn softmax(values: &[f32]) -> Array1<f64> {
    let max = values
        .iter()
        .map(|&v| f64::from(v))
        .fold(f64::NEG_INFINITY, f64::max);
    let exps: Array1<f64> = values.iter().map(|&v| (f64::from(v) - max).exp()).collect();
    let total = exps.sum();
    exps / total
}

/// Turns raw model outputs into probability vectors
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutputNormalizer {
    mode: OutputMode,
    tolerance: f64,
}

impl OutputNormalizer {
    #[must_use]
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            tolerance: PROBABILITY_TOLERANCE,
        }
    }

    #[must_use]
    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    /// The interpretation this normalizer applies to `raw`
    #[must_use]
    pub fn classify_output(&self, raw: &RawOutputVector) -> OutputKind {
        match self.mode {
            OutputMode::Auto => detect_output_kind(raw.as_slice(), self.tolerance),
            OutputMode::Logits => OutputKind::Logits,
            OutputMode::Probabilities => OutputKind::ProbabilityDistribution,
        }
    }

    /// Convert a raw output into a probability vector
    ///
    /// Detected distributions pass through unchanged. Under
    /// `OutputMode::Probabilities` the scores are taken as-is without
    /// detection: each is clamped to `[0, 1]` and the vector is rescaled to
    /// sum to 1. Softmax is never applied in that mode.
    ///
    /// # Errors
    /// - `Inference` for an empty output (the model produced no categories)
    /// - `Inference` for non-finite elements
    /// - `Inference` when forced probabilities are all zero after clamping
    pub fn normalize(&self, raw: &RawOutputVector) -> Result<ProbabilityVector> {
        let values = raw.as_slice();
        if values.is_empty() {
            return Err(ClassifierError::inference(
                "model produced an empty output vector",
            ));
        }
        NumericValidator::validate_finite_output(values)?;

        let kind = self.classify_output(raw);
        debug!(?kind, mode = %self.mode, len = values.len(), "normalizing model output");

        let probabilities = match (self.mode, kind) {
            (OutputMode::Probabilities, _) => rescale_scores(values)?,
            (_, OutputKind::ProbabilityDistribution) => {
                values.iter().map(|&v| f64::from(v)).collect()
            },
            (_, OutputKind::Logits) => softmax(values),
        };

        Ok(ProbabilityVector::from_normalized(probabilities))
    }
}

/// Clamp scores to `[0, 1]` and divide by their sum
fn rescale_scores(values: &[f32]) -> Result<Array1<f64>> {
    let clamped: Array1<f64> = values
        .iter()
        .map(|&v| f64::from(v).clamp(0.0, 1.0))
        .collect();
    let total = clamped.sum();
    if total <= 0.0 {
        return Err(ClassifierError::inference(
            "model output has no positive scores to treat as probabilities",
        ));
    }
    if (total - 1.0).abs() > PROBABILITY_TOLERANCE {
        debug!(total, "rescaling forced probabilities");
    }
    Ok(clamped / total)
}

impl Default for OutputNormalizer {
    fn default() -> Self {
        Self::new(OutputMode::Auto)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::s;

    fn raw(values: &[f32]) -> RawOutputVector {
        RawOutputVector::from_vec(values.to_vec())
    }

    fn assert_distribution(probs: &ProbabilityVector) {
        assert!((probs.sum() - 1.0).abs() < 1e-6, "sum was {}", probs.sum());
        assert!(probs.as_slice().iter().all(|p| (0.0..=1.0).contains(p)));
    }

    #[test]
    fn test_detects_probability_distribution() {
        assert_eq!(
            detect_output_kind(&[0.1, 0.7, 0.2], PROBABILITY_TOLERANCE),
            OutputKind::ProbabilityDistribution
        );
        // tiny float noise is tolerated
        assert_eq!(
            detect_output_kind(&[-0.0005, 0.5, 0.5004], PROBABILITY_TOLERANCE),
            OutputKind::ProbabilityDistribution
        );
        assert_eq!(
            detect_output_kind(&[1.0], PROBABILITY_TOLERANCE),
            OutputKind::ProbabilityDistribution
        );
    }

    #[test]
    fn test_detects_logits() {
        assert_eq!(
            detect_output_kind(&[2.0, 1.0, 0.1], PROBABILITY_TOLERANCE),
            OutputKind::Logits
        );
        assert_eq!(
            detect_output_kind(&[-0.5, 0.75, 0.75], PROBABILITY_TOLERANCE),
            OutputKind::Logits
        );
        assert_eq!(
            detect_output_kind(&[0.2, 0.2, 0.2], PROBABILITY_TOLERANCE),
            OutputKind::Logits
        );
        assert_eq!(
            detect_output_kind(&[], PROBABILITY_TOLERANCE),
            OutputKind::Logits
        );
    }

    #[test]
    fn test_probabilities_pass_through_unchanged() {
        let probs = OutputNormalizer::default()
            .normalize(&raw(&[0.1, 0.7, 0.2]))
            .unwrap();
        let expected = [0.1_f32, 0.7, 0.2];
        for (p, e) in probs.as_slice().iter().zip(expected) {
            assert!((p - f64::from(e)).abs() < 1e-12);
        }
    }

    #[test]
    fn test_softmax_applied_to_logits() {
        let probs = OutputNormalizer::default()
            .normalize(&raw(&[2.0, 1.0, 0.1]))
            .unwrap();

        let denom = 2.0_f64.exp() + 1.0_f64.exp() + f64::from(0.1_f32).exp();
        assert!((probs.get(0).unwrap() - 2.0_f64.exp() / denom).abs() < 1e-6);
        assert_distribution(&probs);
    }

    #[test]
    fn test_softmax_is_stable_for_large_logits() {
        let probs = OutputNormalizer::default()
            .normalize(&raw(&[1000.0, 999.0, -1000.0]))
            .unwrap();
        assert_distribution(&probs);
        assert!(probs.get(0).unwrap() > probs.get(1).unwrap());
        assert!(probs.get(2).unwrap() < 1e-300);
    }

    #[test]
    fn test_normalize_arbitrary_vectors_sums_to_one() {
        let cases: [&[f32]; 5] = [
            &[0.0],
            &[-3.0, -3.0, -3.0, -3.0],
            &[12.5, -7.25, 0.0, 3.3, 88.0, -100.0],
            &[5.0; 120],
            &[1e-7, 2e-7, 3e-7],
        ];
        for case in cases {
            let probs = OutputNormalizer::default().normalize(&raw(case)).unwrap();
            assert_eq!(probs.len(), case.len());
            assert_distribution(&probs);
        }
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let normalizer = OutputNormalizer::default();
        for case in [&[2.0_f32, 1.0, 0.1][..], &[0.25, 0.25, 0.5][..], &[-4.0, 9.0][..]] {
            let once = normalizer.normalize(&raw(case)).unwrap();
            let twice = normalizer
                .normalize(&RawOutputVector::from(&once))
                .unwrap();
            for (a, b) in once.as_slice().iter().zip(twice.as_slice()) {
                assert!((a - b).abs() < 1e-6, "{a} != {b}");
            }
        }
    }

    #[test]
    fn test_strided_backend_output_is_normalized() {
        let strided = Array1::from(vec![5.0_f32, 0.0, 1.0, 0.0]).slice_move(s![..;2]);
        let probs = OutputNormalizer::default()
            .normalize(&RawOutputVector::new(strided))
            .unwrap();

        assert_eq!(probs.len(), 2);
        let expected = 1.0 / (1.0 + (-4.0_f64).exp());
        assert!((probs.get(0).unwrap() - expected).abs() < 1e-9);
        assert_distribution(&probs);
    }

    #[test]
    fn test_empty_output_is_inference_error() {
        let err = OutputNormalizer::default().normalize(&raw(&[])).unwrap_err();
        assert!(matches!(err, ClassifierError::Inference(_)));
    }

    #[test]
    fn test_non_finite_output_is_inference_error() {
        for bad in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            let err = OutputNormalizer::default()
                .normalize(&raw(&[0.5, bad]))
                .unwrap_err();
            assert!(matches!(err, ClassifierError::Inference(_)));
        }
    }

    #[test]
    fn test_small_logits_summing_to_one_are_ambiguous() {
        // A logit vector whose values happen to look like a distribution is
        // indistinguishable from one in auto mode.
        let ambiguous = raw(&[0.6, 0.3, 0.1]);

        let auto = OutputNormalizer::new(OutputMode::Auto);
        assert_eq!(
            auto.classify_output(&ambiguous),
            OutputKind::ProbabilityDistribution
        );
        let passed = auto.normalize(&ambiguous).unwrap();
        assert!((passed.get(0).unwrap() - 0.6).abs() < 1e-6);

        // Pinning the mode resolves it
        let pinned = OutputNormalizer::new(OutputMode::Logits);
        let softened = pinned.normalize(&ambiguous).unwrap();
        assert!(softened.get(0).unwrap() < 0.45);
        assert_distribution(&softened);
    }

    #[test]
    fn test_forced_probabilities_skip_softmax() {
        let forced = OutputNormalizer::new(OutputMode::Probabilities);

        let exact = forced.normalize(&raw(&[0.2, 0.8])).unwrap();
        assert!((exact.get(1).unwrap() - 0.8).abs() < 1e-6);

        // scores that do not sum to 1 are rescaled, not rejected
        let loose = forced.normalize(&raw(&[0.9, 0.8, 0.1])).unwrap();
        assert_distribution(&loose);
        assert!((loose.get(0).unwrap() - 0.5).abs() < 1e-6);
        assert!((loose.get(2).unwrap() - 0.1 / 1.8).abs() < 1e-6);

        // out-of-range scores are clamped before rescaling
        let clamped = forced.normalize(&raw(&[2.0, 1.0, -3.0])).unwrap();
        assert_distribution(&clamped);
        assert!((clamped.get(0).unwrap() - 0.5).abs() < 1e-6);
        assert!(clamped.get(2).unwrap().abs() < f64::EPSILON);
    }

    #[test]
    fn test_forced_probabilities_need_a_positive_score() {
        let err = OutputNormalizer::new(OutputMode::Probabilities)
            .normalize(&raw(&[0.0, -1.0, -0.5]))
            .unwrap_err();
        assert!(matches!(err, ClassifierError::Inference(_)));
    }
}
