//! Correlation between where the agent goes and where the model fires.
//!
//! A high positive `r` means the place fields have moved to cover the regions
//! the agent actually visits. Tracking `r` over training shows how that
//! alignment develops.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::ArenaConfig;
use crate::error::Result;
use crate::model::PlaceCellPredictor;
use crate::spatial::{FieldReduction, VisitHistogram};
use crate::stats::pearson;
use crate::types::{Point2, RunLog};

/// Per-bin frequency and density with their correlation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FreqDensityCorrelation {
    /// Trial whose preceding window was binned.
    pub trial: usize,
    /// Bin centers.
    pub visits: Vec<Point2>,
    /// Visit count per bin.
    pub frequency: Vec<f64>,
    /// Summed field activation per bin at trial `trial - 1`.
    pub density: Vec<f64>,
    /// Pearson `r`; `None` if either series is constant.
    pub r: Option<f64>,
    /// Two-sided p-value of `r`.
    pub p_value: Option<f64>,
}

/// Bin trials `[trial - gap, trial)` and correlate visit counts with the
/// model output of trial `trial - 1` at each bin center.
///
/// # Errors
///
/// Returns [`crate::AnalysisError::InvalidWindow`] for `gap == 0`,
/// [`crate::AnalysisError::IndexOutOfRange`] if the window leaves the run, and
/// propagates predictor errors.
pub fn get_2d_freq_density_corr<P: PlaceCellPredictor>(
    run: &RunLog,
    predictor: &P,
    trial: usize,
    gap: usize,
    bins: usize,
    arena: &ArenaConfig,
) -> Result<FreqDensityCorrelation> {
    let hist = VisitHistogram::from_run(run, trial, gap, bins, arena.lower, arena.upper)?;
    // from_run guarantees 1 <= gap <= trial
    let density = hist.model_density(run, trial - 1, predictor, FieldReduction::Sum)?;
    let corr = pearson(&hist.frequency, &density)?;
    if corr.is_none() {
        warn!(trial, "frequency or density is constant across bins; correlation undefined");
    }
    debug!(trial, r = corr.map(|c| c.r), "frequency-density correlation");

    Ok(FreqDensityCorrelation {
        trial,
        visits: hist.visits,
        frequency: hist.frequency,
        density,
        r: corr.map(|c| c.r),
        p_value: corr.map(|c| c.p_value),
    })
}

/// One point of a frequency–density sweep.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SweepPoint {
    /// Trial index.
    pub trial: usize,
    /// Correlation at that trial.
    pub r: Option<f64>,
    /// Its p-value.
    pub p_value: Option<f64>,
}

/// Frequency–density correlation at each of `trials`.
///
/// # Errors
///
/// Fails on the first trial that [`get_2d_freq_density_corr`] rejects.
pub fn freq_density_sweep<P: PlaceCellPredictor>(
    run: &RunLog,
    predictor: &P,
    trials: &[usize],
    gap: usize,
    bins: usize,
    arena: &ArenaConfig,
) -> Result<Vec<SweepPoint>> {
    trials
        .iter()
        .map(|&trial| -> Result<SweepPoint> {
            let c = get_2d_freq_density_corr(run, predictor, trial, gap, bins, arena)?;
            Ok(SweepPoint {
                trial,
                r: c.r,
                p_value: c.p_value,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use nalgebra::{DMatrix, DVector};

    use super::*;
    use crate::error::AnalysisError;
    use crate::model::GaussianPlaceCells;
    use crate::types::TrialLog;

    // Field centers sit on bin centers of an 8-bin grid over [-1, 1]
    fn a() -> Point2 {
        Point2::new(0.625, 0.625)
    }

    fn b() -> Point2 {
        Point2::new(-0.375, -0.375)
    }

    fn run_with_coords(coords: Vec<Vec<Point2>>) -> RunLog {
        let trial = TrialLog::isotropic(
            vec![a(), b()],
            &[0.15, 0.15],
            vec![1.0, 1.0],
            DMatrix::zeros(2, 4),
            DVector::zeros(2),
        );
        let n = coords.len();
        RunLog {
            trials: vec![trial; n],
            coords,
            latencies: vec![10.0; n],
            rewards: Vec::new(),
        }
    }

    #[test]
    fn test_visiting_field_centers_correlates_positively() {
        let near_fields: Vec<Point2> = (0..50)
            .map(|i| if i % 2 == 0 { a() } else { b() })
            .collect();
        let run = run_with_coords(vec![near_fields.clone(), near_fields]);
        let c = get_2d_freq_density_corr(&run, &GaussianPlaceCells, 2, 2, 8, &ArenaConfig::default())
            .unwrap();
        assert_eq!(c.visits.len(), 64);
        assert_eq!(c.frequency.len(), c.density.len());
        assert!(c.r.unwrap() > 0.5, "r = {:?}", c.r);
        assert!(c.p_value.unwrap() < 0.05);
    }

    #[test]
    fn test_uniform_density_is_undefined() {
        let flat = |_: &TrialLog, pts: &[Point2]| -> Result<DMatrix<f64>> {
            Ok(DMatrix::from_element(pts.len(), 2, 0.5))
        };
        let run = run_with_coords(vec![vec![Point2::new(0.1, 0.1); 5]]);
        let c = get_2d_freq_density_corr(&run, &flat, 1, 1, 5, &ArenaConfig::default()).unwrap();
        assert!(c.r.is_none());
        assert!(c.p_value.is_none());
    }

    #[test]
    fn test_window_must_fit() {
        let run = run_with_coords(vec![vec![Point2::zeros()]; 3]);
        let arena = ArenaConfig::default();
        assert!(matches!(
            get_2d_freq_density_corr(&run, &GaussianPlaceCells, 2, 3, 5, &arena),
            Err(AnalysisError::IndexOutOfRange { .. })
        ));
        assert!(matches!(
            get_2d_freq_density_corr(&run, &GaussianPlaceCells, 2, 0, 5, &arena),
            Err(AnalysisError::InvalidWindow(0))
        ));
    }

    #[test]
    fn test_sweep_reports_each_trial() {
        let coords = vec![vec![Point2::new(0.5, 0.5), Point2::new(-0.5, -0.5)]; 4];
        let run = run_with_coords(coords);
        let sweep =
            freq_density_sweep(&run, &GaussianPlaceCells, &[1, 2, 4], 1, 6, &ArenaConfig::default())
                .unwrap();
        let trials: Vec<usize> = sweep.iter().map(|p| p.trial).collect();
        assert_eq!(trials, vec![1, 2, 4]);
    }
}
