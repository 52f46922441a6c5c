//! Integration tests for placefield-analysis
//!
//! Tests cover:
//! 1. Histogram mass invariant for arbitrary traces
//! 2. Frequency-density correlation on proportional and uniform maps
//! 3. Parameter variance on a small hand-built run
//! 4. Population-vector correlation on a one-trial window
//! 5. Config persistence
//! 6. End-to-end report on a synthetic run

use nalgebra::{DMatrix, DVector};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use placefield_analysis::config::{ArenaConfig, DriftConfig, SpatialConfig, VarianceConfig};
use placefield_analysis::spatial::anchor_count;
use placefield_analysis::{
    analyze_run, evaluate_loss, get_2d_freq_density_corr, get_param_changes, get_param_variance,
    get_pvcorr, moving_average, AnalysisConfig, AnalysisError, GaussianPlaceCells, Point2, Result,
    RunLog, StateSpaceGrid, SyntheticRun, TrialLog, VisitHistogram,
};

fn trial(centers: Vec<Point2>, amplitudes: Vec<f64>) -> TrialLog {
    let n = centers.len();
    TrialLog::isotropic(
        centers,
        &vec![0.2; n],
        amplitudes,
        DMatrix::zeros(n, 4),
        DVector::zeros(n),
    )
}

fn run_from_coords(coords: Vec<Vec<Point2>>) -> RunLog {
    let n = coords.len();
    RunLog {
        trials: vec![trial(vec![Point2::new(0.2, -0.3), Point2::new(-0.6, 0.4)], vec![1.0, 0.8]); n],
        coords,
        latencies: (0..n).map(|i| 100.0 - i as f64).collect(),
        rewards: Vec::new(),
    }
}

// ============================================================================
// Test 1: Spatial binning mass
// ============================================================================

#[test]
fn test_histogram_mass_for_random_traces() {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    for bins in [1, 5, 23, 31] {
        let len = rng.gen_range(0..400);
        let points: Vec<Point2> = (0..len)
            .map(|_| Point2::new(rng.gen_range(-1.5..1.5), rng.gen_range(-1.5..1.5)))
            .collect();
        let hist = VisitHistogram::from_points(&points, bins, -1.0, 1.0).unwrap();
        assert_eq!(hist.frequency.len(), bins * bins);
        assert_eq!(hist.visits.len(), bins * bins);
        assert_eq!(
            hist.total_mass(),
            (points.len() + anchor_count(bins)) as f64,
            "bins = {bins}"
        );
    }
}

#[test]
fn test_pooled_window_mass() {
    let coords: Vec<Vec<Point2>> = (0..6)
        .map(|t| vec![Point2::new(0.1 * t as f64, -0.1); t + 1])
        .collect();
    let run = run_from_coords(coords);
    // Window [2, 5) pools 3 + 4 + 5 points
    let hist = VisitHistogram::from_run(&run, 5, 3, 10, -1.0, 1.0).unwrap();
    assert_eq!(hist.pooled_points, 12);
    assert_eq!(hist.total_mass(), (12 + anchor_count(10)) as f64);
}

// ============================================================================
// Test 2: Frequency-density correlation
// ============================================================================

#[test]
fn test_proportional_density_gives_unit_correlation() {
    let mut rng = ChaCha8Rng::seed_from_u64(11);
    let coords: Vec<Vec<Point2>> = (0..4)
        .map(|_| {
            (0..200)
                .map(|_| Point2::new(rng.gen_range(-1.0..0.2), rng.gen_range(-0.5..1.0)))
                .collect()
        })
        .collect();
    let run = run_from_coords(coords);
    let arena = ArenaConfig::default();
    let bins = 12;

    // A model whose output is exactly twice the visit count of the bin
    let hist = VisitHistogram::from_run(&run, 4, 4, bins, arena.lower, arena.upper).unwrap();
    let proportional = |_: &TrialLog, pts: &[Point2]| -> Result<DMatrix<f64>> {
        let mut out = DMatrix::zeros(pts.len(), 1);
        for (row, p) in pts.iter().enumerate() {
            let k = hist
                .visits
                .iter()
                .position(|v| v == p)
                .ok_or_else(|| AnalysisError::InvalidInput("not a bin center".into()))?;
            out[(row, 0)] = 2.0 * hist.frequency[k];
        }
        Ok(out)
    };

    let c = get_2d_freq_density_corr(&run, &proportional, 4, 4, bins, &arena).unwrap();
    assert!((c.r.unwrap() - 1.0).abs() < 1e-9, "r = {:?}", c.r);
    assert!(c.p_value.unwrap() < 1e-10);
}

#[test]
fn test_uniform_density_leaves_correlation_undefined() {
    let run = run_from_coords(vec![vec![Point2::new(0.3, 0.3); 20]; 2]);
    let uniform = |_: &TrialLog, pts: &[Point2]| -> Result<DMatrix<f64>> {
        Ok(DMatrix::from_element(pts.len(), 3, 0.25))
    };
    let c = get_2d_freq_density_corr(&run, &uniform, 2, 2, 7, &ArenaConfig::default()).unwrap();
    assert!(c.r.is_none());
    assert!(c.density.iter().all(|&d| (d - 0.75).abs() < 1e-12));
}

// ============================================================================
// Test 3: Parameter variance
// ============================================================================

#[test]
fn test_amplitude_variance_is_raw_delta() {
    let alphas = [[0.9, 1.1], [1.3, 0.7], [0.2, 1.6]];
    let trials = alphas
        .iter()
        .map(|a| trial(vec![Point2::zeros(), Point2::new(0.5, 0.5)], a.to_vec()))
        .collect();
    let run = RunLog {
        trials,
        coords: vec![Vec::new(); 3],
        latencies: vec![1.0; 3],
        rewards: Vec::new(),
    };
    let var = get_param_variance(&get_param_changes(&run, 0, 3).unwrap());
    for (t, row) in alphas.iter().enumerate() {
        for (f, a) in row.iter().enumerate() {
            assert_eq!(var.amplitude_shift[(t, f)], a - alphas[0][f]);
        }
    }
    assert!(var.center_shift.iter().all(|&v| v == 0.0));
}

// ============================================================================
// Test 4: Population-vector correlation
// ============================================================================

#[test]
fn test_pvcorr_single_trial_window() {
    let run = SyntheticRun::default()
        .with_trials(12)
        .with_fields(6)
        .generate(&ArenaConfig::default())
        .unwrap();
    let grid = StateSpaceGrid::new(21).unwrap();
    let pv = get_pvcorr(&run, &GaussianPlaceCells, 7, 8, 1, &grid).unwrap();
    assert_eq!(pv.trials, vec![7]);
    assert!((pv.pv_corr[0] - 1.0).abs() < 1e-12);
    assert!((pv.rep_corr[0] - 1.0).abs() < 1e-12);
}

// ============================================================================
// Test 5: Config persistence
// ============================================================================

#[test]
fn test_config_file_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("analysis.yaml");
    let config = AnalysisConfig::default()
        .with_spatial(SpatialConfig::default().with_gap(10).with_correlation_bins(15))
        .with_drift(DriftConfig::default().with_stable_perf(50));
    config.to_file(&path).unwrap();

    let loaded = AnalysisConfig::from_file(&path).unwrap();
    assert_eq!(loaded.spatial.gap, 10);
    assert_eq!(loaded.spatial.correlation_bins, 15);
    assert_eq!(loaded.drift.stable_perf, 50);
    assert_eq!(loaded.scoring.threshold, config.scoring.threshold);
}

#[test]
fn test_missing_config_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        AnalysisConfig::from_file(dir.path().join("absent.yaml")),
        Err(AnalysisError::Io(_))
    ));
}

// ============================================================================
// Test 6: End-to-end
// ============================================================================

#[test]
fn test_analyze_synthetic_run() {
    let config = AnalysisConfig::default()
        .with_spatial(
            SpatialConfig::default()
                .with_gap(10)
                .with_grid_resolution(21)
                .with_sweep_points(6),
        )
        .with_drift(DriftConfig::default().with_stable_perf(40).with_num_samples(21))
        .with_variance(VarianceConfig::default().with_tracking_samples(8));
    let run = SyntheticRun::default()
        .with_trials(80)
        .with_fields(12)
        .generate(&config.arena)
        .unwrap();

    let report = analyze_run(&run, &config, &GaussianPlaceCells).unwrap();
    assert_eq!(report.total_trials, 80);
    assert_eq!(report.sweep.len(), 6);
    assert_eq!(report.sweep.first().map(|p| p.trial), Some(10));
    assert_eq!(report.sweep.last().map(|p| p.trial), Some(80));
    assert_eq!(report.pv_trials.first(), Some(&40));
    assert_eq!(report.pv_trials.last(), Some(&79));
    assert_eq!(report.variance.amplitudes.len(), 5);

    // Same convergence score as scoring the latencies directly
    let direct = evaluate_loss(&run.latencies, &config.scoring).unwrap();
    assert_eq!(report.convergence, direct);

    let json = serde_json::to_string(&report).unwrap();
    assert!(json.contains("\"pv_corr\""));
    assert!(!report.report().is_empty());
}

#[test]
fn test_smoothing_keeps_length_on_synthetic_latencies() {
    let run = SyntheticRun::default().generate(&ArenaConfig::default()).unwrap();
    for w in [1, 5, 20, run.latencies.len()] {
        assert_eq!(moving_average(&run.latencies, w).unwrap().len(), run.latencies.len());
    }
}
