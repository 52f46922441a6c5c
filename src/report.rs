//! One-call summary of a run: every analysis in the crate, evaluated with a
//! single [`AnalysisConfig`].

use serde::{Deserialize, Serialize};
use tracing::{info, info_span};

use crate::config::AnalysisConfig;
use crate::convergence::{evaluate_loss, ConvergenceScore};
use crate::curve_fit::{characterize_curve, ShapeFit};
use crate::drift::{drift_score, get_pvcorr};
use crate::error::{AnalysisError, Result};
use crate::freq_density::{freq_density_sweep, get_2d_freq_density_corr, SweepPoint};
use crate::grid::{sample_trials, StateSpaceGrid};
use crate::model::PlaceCellPredictor;
use crate::param_change::{get_param_changes, get_param_variance, top_variance_fields, FieldVariance};
use crate::tracking::{
    active_fraction, amplitude_drift, amplitude_l1_norm, field_area_change, field_center_change,
    AmplitudeDrift, FieldTracking,
};
use crate::types::RunLog;

/// Top-variance fields for each parameter family.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VarianceSummary {
    /// Fields whose center moved most.
    pub centers: Vec<FieldVariance>,
    /// Fields whose width changed most.
    pub widths: Vec<FieldVariance>,
    /// Fields whose amplitude changed most.
    pub amplitudes: Vec<FieldVariance>,
}

/// Everything [`analyze_run`] computes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Number of trials analysed.
    pub total_trials: usize,
    /// Convergence score of the latency curve.
    pub convergence: ConvergenceScore,
    /// Learning-curve families fitted to the latencies, best first.
    pub latency_curve: Vec<ShapeFit>,
    /// Frequency–density correlation after the first window.
    pub before: SweepPoint,
    /// Frequency–density correlation at the end of the run.
    pub after: SweepPoint,
    /// Frequency–density correlation over training.
    pub sweep: Vec<SweepPoint>,
    /// Relative field area over training.
    pub field_area: FieldTracking,
    /// Field center displacement over training.
    pub field_center: FieldTracking,
    /// Sampled trials of the population-vector comparison.
    pub pv_trials: Vec<usize>,
    /// Population-vector correlation with the stable-performance trial.
    pub pv_corr: Vec<f64>,
    /// Representational-similarity correlation with the stable-performance trial.
    pub rep_corr: Vec<f64>,
    /// Drift score; `None` when late latencies do not vary.
    pub drift: Option<f64>,
    /// Top-variance fields.
    pub variance: VarianceSummary,
    /// L1 norm of the amplitude change per trial.
    pub amplitude_l1: Vec<f64>,
    /// Amplitude against drift per field.
    pub amplitude_drift: AmplitudeDrift,
    /// Fraction of active fields over training.
    pub active_fraction: Vec<f64>,
}

fn fmt_r(p: &SweepPoint) -> String {
    match (p.r, p.p_value) {
        (Some(r), Some(pv)) => format!("R={r:.3} (p={pv:.3e})"),
        _ => "R undefined".to_string(),
    }
}

impl RunReport {
    /// Human-readable summary.
    #[must_use]
    pub fn report(&self) -> String {
        let c = &self.convergence;
        let mut lines = vec![
            "Place-Field Run Analysis".to_string(),
            "════════════════════════".to_string(),
            format!("Trials: {}", self.total_trials),
            format!(
                "Convergence: epoch {}{} | final {:.2} | stability {:.2} | score {:.2}",
                c.convergence_epoch,
                if c.converged { "" } else { " (not reached)" },
                c.final_loss,
                c.stability,
                c.score
            ),
        ];
        if let Some(best) = self.latency_curve.first() {
            lines.push(format!(
                "Latency curve: {} (R²={:.3})",
                best.fit.shape, best.r_squared
            ));
        }
        lines.push(format!(
            "Frequency vs density: before {} | after {}",
            fmt_r(&self.before),
            fmt_r(&self.after)
        ));
        match self.drift {
            Some(d) => lines.push(format!("Drift: {d:.4}")),
            None => lines.push("Drift: undefined (flat latencies)".to_string()),
        }
        if let (Some(area), Some(shift)) = (self.field_area.mean.last(), self.field_center.mean.last()) {
            lines.push(format!("Final field area ratio: {area:.3} | center shift: {shift:.3}"));
        }
        if let Some(frac) = self.active_fraction.last() {
            lines.push(format!("Active fields at end: {:.1}%", frac * 100.0));
        }

        lines.push(String::new());
        lines.push("Most variable fields:".to_string());
        lines.push("─────────────────────".to_string());
        for (name, fields) in [
            ("centers", &self.variance.centers),
            ("widths", &self.variance.widths),
            ("amplitudes", &self.variance.amplitudes),
        ] {
            let ids: Vec<String> = fields.iter().map(|f| f.field.to_string()).collect();
            lines.push(format!("{name}: [{}]", ids.join(", ")));
        }
        lines.join("\n")
    }
}

/// Run every analysis on `run`.
///
/// # Errors
///
/// Returns [`AnalysisError::InsufficientData`] if the run is shorter than the
/// frequency window, the config and run validation errors, and the first
/// error of any analysis.
pub fn analyze_run<P: PlaceCellPredictor>(
    run: &RunLog,
    config: &AnalysisConfig,
    predictor: &P,
) -> Result<RunReport> {
    config.validate()?;
    run.validate()?;
    let total = run.total_trials();
    let gap = config.spatial.gap;
    if total < gap {
        return Err(AnalysisError::InsufficientData {
            required: gap,
            actual: total,
        });
    }
    if config.drift.stable_perf >= total {
        return Err(AnalysisError::out_of_range(config.drift.stable_perf, total));
    }
    let _span = info_span!("analyze_run", total, fields = run.num_fields()).entered();

    let convergence = evaluate_loss(&run.latencies, &config.scoring)?;
    let latency_curve = characterize_curve(&run.latencies, config.scoring.smoothing_window)?;

    let arena = &config.arena;
    let bins = config.spatial.correlation_bins;
    let point = |trial: usize| -> Result<SweepPoint> {
        let c = get_2d_freq_density_corr(run, predictor, trial, gap, bins, arena)?;
        Ok(SweepPoint {
            trial,
            r: c.r,
            p_value: c.p_value,
        })
    };
    let before = point(gap)?;
    let after = point(total)?;
    let sweep_trials = sample_trials(gap, total, config.spatial.sweep_points);
    let sweep = freq_density_sweep(run, predictor, &sweep_trials, gap, bins, arena)?;
    info!(before = ?before.r, after = ?after.r, "frequency-density correlation");

    let grid = StateSpaceGrid::with_bounds(config.spatial.grid_resolution, arena.lower, arena.upper)?;
    let tracked = sample_trials(0, total - 1, config.variance.tracking_samples);
    let field_area = field_area_change(run, predictor, &grid, &tracked)?;
    let field_center = field_center_change(run, &tracked)?;

    let stable = config.drift.stable_perf;
    let pv = get_pvcorr(run, predictor, stable, total, config.drift.num_samples, &grid)?;
    let drift = drift_score(&pv.pv_corr, &run.latencies, stable, config.drift.latency_samples)?;

    let delta = get_param_changes(run, 0, total)?;
    let variance = get_param_variance(&delta);
    let k = config.variance.top_k;
    let variance_summary = VarianceSummary {
        centers: top_variance_fields(&variance.center_shift, k),
        widths: top_variance_fields(&variance.width_shift, k),
        amplitudes: top_variance_fields(&variance.amplitude_shift, k),
    };
    let amplitude_l1 = amplitude_l1_norm(&delta);
    let late = get_param_changes(run, stable, total)?;
    let amp_drift = amplitude_drift(&late, &get_param_variance(&late))?;

    let active = active_fraction(
        run,
        &sample_trials(0, total - 1, config.variance.active_samples),
        config.variance.active_threshold,
    )?;

    info!(score = convergence.score, drift = ?drift, "run analysed");
    Ok(RunReport {
        total_trials: total,
        convergence,
        latency_curve,
        before,
        after,
        sweep,
        field_area,
        field_center,
        pv_trials: pv.trials,
        pv_corr: pv.pv_corr,
        rep_corr: pv.rep_corr,
        drift,
        variance: variance_summary,
        amplitude_l1,
        amplitude_drift: amp_drift,
        active_fraction: active,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DriftConfig, SpatialConfig, VarianceConfig};
    use crate::model::GaussianPlaceCells;
    use crate::synthetic::SyntheticRun;

    fn small_config() -> AnalysisConfig {
        AnalysisConfig::default()
            .with_spatial(
                SpatialConfig::default()
                    .with_gap(5)
                    .with_correlation_bins(9)
                    .with_grid_resolution(15)
                    .with_sweep_points(5),
            )
            .with_drift(DriftConfig::default().with_stable_perf(10).with_num_samples(11))
            .with_variance(VarianceConfig::default().with_top_k(3).with_tracking_samples(6))
    }

    #[test]
    fn test_report_on_synthetic_run() {
        let config = small_config();
        let run = SyntheticRun::default()
            .with_trials(40)
            .with_fields(9)
            .generate(&config.arena)
            .unwrap();
        let report = analyze_run(&run, &config, &GaussianPlaceCells).unwrap();

        assert_eq!(report.total_trials, 40);
        assert_eq!(report.sweep.len(), 5);
        assert_eq!(report.before.trial, 5);
        assert_eq!(report.after.trial, 40);
        assert_eq!(report.field_area.trials.len(), 6);
        assert!((report.field_area.mean[0] - 1.0).abs() < 1e-12);
        assert_eq!(report.pv_trials.len(), 11);
        assert!((report.pv_corr[0] - 1.0).abs() < 1e-12);
        assert_eq!(report.variance.centers.len(), 3);
        assert_eq!(report.amplitude_l1.len(), 40);
        assert_eq!(report.amplitude_drift.drift.len(), 9);

        let text = report.report();
        assert!(text.contains("Place-Field Run Analysis"));
        assert!(text.contains("Drift"));
    }

    #[test]
    fn test_run_shorter_than_window_rejected() {
        let config = small_config();
        let run = SyntheticRun::default()
            .with_trials(3)
            .generate(&config.arena)
            .unwrap();
        assert!(matches!(
            analyze_run(&run, &config, &GaussianPlaceCells),
            Err(AnalysisError::InsufficientData { required: 5, actual: 3 })
        ));
    }
}
