//! Place-cell forward model used to evaluate recorded parameters.
//!
//! The analyses only need a batch predictor: given one trial's parameters and
//! a set of query points, return a `points x fields` activation matrix.
//! [`GaussianPlaceCells`] is the default; any `Fn(&TrialLog, &[Point2]) -> Result<DMatrix<f64>>`
//! also works, which is how tests inject synthetic densities.

use nalgebra::DMatrix;

use crate::error::{AnalysisError, Result};
use crate::types::{Point2, TrialLog};

/// Batch evaluation of place-field activations.
pub trait PlaceCellPredictor {
    /// Activation of every field at every point; rows are points, columns fields.
    ///
    /// # Errors
    ///
    /// Implementations return an error when the trial parameters cannot be evaluated.
    fn predict_batch(&self, trial: &TrialLog, points: &[Point2]) -> Result<DMatrix<f64>>;
}

impl<F> PlaceCellPredictor for F
where
    F: Fn(&TrialLog, &[Point2]) -> Result<DMatrix<f64>>,
{
    fn predict_batch(&self, trial: &TrialLog, points: &[Point2]) -> Result<DMatrix<f64>> {
        self(trial, points)
    }
}

/// Gaussian place fields: `amplitude² · exp(-½ (x-c)ᵀ Σ⁻¹ (x-c))`.
#[derive(Debug, Clone, Copy, Default)]
pub struct GaussianPlaceCells;

impl PlaceCellPredictor for GaussianPlaceCells {
    fn predict_batch(&self, trial: &TrialLog, points: &[Point2]) -> Result<DMatrix<f64>> {
        trial.validate()?;
        let precisions = trial
            .widths
            .iter()
            .enumerate()
            .map(|(field, w)| w.try_inverse().ok_or(AnalysisError::SingularWidth { field }))
            .collect::<Result<Vec<_>>>()?;

        let fields = trial.num_fields();
        let mut acts = DMatrix::zeros(points.len(), fields);
        for (row, x) in points.iter().enumerate() {
            for field in 0..fields {
                let d = x - trial.centers[field];
                let mahalanobis = d.dot(&(precisions[field] * d));
                let gain = trial.amplitudes[field] * trial.amplitudes[field];
                acts[(row, field)] = gain * (-0.5 * mahalanobis).exp();
            }
        }
        Ok(acts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{DVector, Matrix2};

    fn single_field(amplitude: f64) -> TrialLog {
        TrialLog::isotropic(
            vec![Point2::new(0.25, -0.5)],
            &[0.1],
            vec![amplitude],
            DMatrix::zeros(1, 4),
            DVector::zeros(1),
        )
    }

    #[test]
    fn test_peak_at_center() {
        let trial = single_field(2.0);
        let acts = GaussianPlaceCells
            .predict_batch(&trial, &[Point2::new(0.25, -0.5), Point2::new(0.35, -0.5)])
            .unwrap();
        assert_eq!(acts.shape(), (2, 1));
        assert!((acts[(0, 0)] - 4.0).abs() < 1e-12);
        // One sigma away along x
        assert!((acts[(1, 0)] - 4.0 * (-0.5f64).exp()).abs() < 1e-9);
    }

    #[test]
    fn test_singular_width_rejected() {
        let mut trial = single_field(1.0);
        trial.widths[0] = Matrix2::zeros();
        assert!(matches!(
            GaussianPlaceCells.predict_batch(&trial, &[Point2::zeros()]),
            Err(AnalysisError::SingularWidth { field: 0 })
        ));
    }

    #[test]
    fn test_closure_predictor() {
        let constant = |_: &TrialLog, points: &[Point2]| -> Result<DMatrix<f64>> {
            Ok(DMatrix::from_element(points.len(), 3, 0.5))
        };
        let acts = constant
            .predict_batch(&single_field(1.0), &[Point2::zeros(); 4])
            .unwrap();
        assert_eq!(acts.shape(), (4, 3));
    }
}
