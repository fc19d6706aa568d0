//! Quality estimation for refinement passes.

use phenex_core::Frame;

/// Estimates perceptual quality of an in-progress image.
///
/// The estimate is an early-stop heuristic, not a correctness guarantee; it
/// is monotonically non-decreasing only in expectation across passes.
pub trait QualityEstimator: Send {
    /// Scores `image` in `[0, 1]`. `ladder_progress` is the fraction of the
    /// scale ladder traversed so far, in `(0, 1]`.
    fn estimate(&self, image: &Frame, ladder_progress: f32) -> f32;
}

/// Default estimator: a weighted combination of pixel variance, edge
/// strength, and ladder progress.
#[derive(Debug, Clone)]
pub struct VarianceEdgeEstimator {
    /// Weight of the normalized pixel variance.
    pub variance_weight: f32,
    /// Weight of the normalized edge strength.
    pub edge_weight: f32,
    /// Weight of the ladder-progress fraction.
    pub progress_weight: f32,
}

impl Default for VarianceEdgeEstimator {
    fn default() -> Self {
        Self {
            variance_weight: 0.4,
            edge_weight: 0.3,
            progress_weight: 0.3,
        }
    }
}

impl QualityEstimator for VarianceEdgeEstimator {
    fn estimate(&self, image: &Frame, ladder_progress: f32) -> f32 {
        // Variance of [0,1] data tops out at 0.25; scale into [0,1].
        let variance_score = (image.variance() * 4.0).min(1.0);
        let edge_score = (edge_strength(image) * 8.0).min(1.0);

        let score = self.variance_weight * variance_score
            + self.edge_weight * edge_score
            + self.progress_weight * ladder_progress.clamp(0.0, 1.0);
        score.clamp(0.0, 1.0)
    }
}

/// Mean absolute horizontal and vertical gradient.
pub(crate) fn edge_strength(image: &Frame) -> f32 {
    let width = image.width();
    let height = image.height();
    if width < 2 || height < 2 {
        return 0.0;
    }

    let data = image.data();
    let mut sum = 0.0f64;
    let mut count = 0u64;

    for y in 0..height {
        for x in 0..width {
            let here = data[y * width + x];
            if x + 1 < width {
                sum += (data[y * width + x + 1] - here).abs() as f64;
                count += 1;
            }
            if y + 1 < height {
                sum += (data[(y + 1) * width + x] - here).abs() as f64;
                count += 1;
            }
        }
    }

    if count == 0 {
        0.0
    } else {
        (sum / count as f64) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_image_scores_only_progress() {
        let estimator = VarianceEdgeEstimator::default();
        let gray = Frame::filled(16, 16, 0.5);

        let score = estimator.estimate(&gray, 0.5);
        assert!((score - 0.3 * 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_textured_image_scores_higher() {
        let estimator = VarianceEdgeEstimator::default();
        let gray = Frame::filled(16, 16, 0.5);
        let data: Vec<f32> = (0..256).map(|i| if i % 2 == 0 { 0.0 } else { 1.0 }).collect();
        let checker = Frame::new(16, 16, data).unwrap();

        assert!(estimator.estimate(&checker, 0.5) > estimator.estimate(&gray, 0.5));
    }

    #[test]
    fn test_edge_strength_of_flat_image_is_zero() {
        assert_eq!(edge_strength(&Frame::filled(8, 8, 0.7)), 0.0);
    }

    #[test]
    fn test_score_clamped_to_unit_interval() {
        let estimator = VarianceEdgeEstimator {
            variance_weight: 5.0,
            edge_weight: 5.0,
            progress_weight: 5.0,
        };
        let data: Vec<f32> = (0..64).map(|i| if i % 2 == 0 { 0.0 } else { 1.0 }).collect();
        let frame = Frame::new(8, 8, data).unwrap();
        assert!(estimator.estimate(&frame, 1.0) <= 1.0);
    }
}
