//! Composite convergence score for a latency curve.
//!
//! The score multiplies three terms of the smoothed latency series:
//! how long it took to drop below a threshold, where it ended, and how much
//! it still fluctuates at the end. Lower is better on every term.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::ScoringConfig;
use crate::error::{AnalysisError, Result};
use crate::smoothing::moving_average;
use crate::stats::std_dev;

/// Multipliers on the three score terms.
///
/// All ones reproduces the plain product `epoch · final · stability`.
/// Because the score is a product, the weights rescale it uniformly; they do
/// not change the ranking of runs scored with the same weights.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    /// Multiplier on the convergence epoch.
    pub speed: f64,
    /// Multiplier on the final smoothed latency.
    pub final_loss: f64,
    /// Multiplier on the late-training standard deviation.
    pub stability: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            speed: 1.0,
            final_loss: 1.0,
            stability: 1.0,
        }
    }
}

/// Breakdown of a convergence score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceScore {
    /// First smoothed index below the threshold; the series length if never reached.
    pub convergence_epoch: usize,
    /// Whether the threshold was reached at all.
    pub converged: bool,
    /// Last smoothed value.
    pub final_loss: f64,
    /// Standard deviation of the final stability window.
    pub stability: f64,
    /// Weighted product of the three terms.
    pub score: f64,
}

/// Score a latency series.
///
/// # Errors
///
/// Returns [`AnalysisError::EmptySeries`] for an empty series and
/// [`AnalysisError::InvalidWindow`] for a zero smoothing window.
#[allow(clippy::cast_precision_loss)]
pub fn evaluate_loss(latencies: &[f64], config: &ScoringConfig) -> Result<ConvergenceScore> {
    if latencies.is_empty() {
        return Err(AnalysisError::EmptySeries("latency series".into()));
    }
    let smoothed = moving_average(latencies, config.smoothing_window)?;

    let hit = smoothed.iter().position(|&v| v < config.threshold);
    let convergence_epoch = hit.unwrap_or(smoothed.len());
    if hit.is_none() {
        warn!(
            threshold = config.threshold,
            trials = smoothed.len(),
            "latency never dropped below convergence threshold"
        );
    }

    let tail = if smoothed.len() >= config.stability_window {
        &smoothed[smoothed.len() - config.stability_window..]
    } else {
        &smoothed[..]
    };
    let stability = std_dev(tail).unwrap_or(0.0);
    let final_loss = smoothed[smoothed.len() - 1];

    let w = config.weights;
    let score = (w.speed * convergence_epoch as f64) * (w.final_loss * final_loss) * (w.stability * stability);
    debug!(convergence_epoch, final_loss, stability, score, "scored latency curve");

    Ok(ConvergenceScore {
        convergence_epoch,
        converged: hit.is_some(),
        final_loss,
        stability,
        score,
    })
}
