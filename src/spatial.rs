//! Visit-frequency histograms and model density over spatial bins.
//!
//! Positions from a window of trials are pooled and binned on a square
//! `bins x bins` grid. Before binning, one synthetic anchor point is added at
//! every node of a `(bins+1) x (bins+1)` lattice spanning the arena. The
//! anchors pin the bin edges to the arena bounds no matter how little of the
//! arena the agent covered, so histograms from different windows share the
//! same bins. Each bin therefore carries at least one anchor count.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ArenaConfig;
use crate::error::{AnalysisError, Result};
use crate::grid::linspace;
use crate::model::PlaceCellPredictor;
use crate::types::{Point2, RunLog};

/// How per-field activations are collapsed into one density per point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldReduction {
    /// Mean activation across fields.
    Mean,
    /// Summed activation across fields.
    Sum,
}

impl FieldReduction {
    /// Collapse each row of a `points x fields` matrix.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn reduce(self, acts: &DMatrix<f64>) -> Vec<f64> {
        let fields = acts.ncols().max(1) as f64;
        acts.row_iter()
            .map(|row| {
                let sum = row.sum();
                match self {
                    Self::Mean => sum / fields,
                    Self::Sum => sum,
                }
            })
            .collect()
    }
}

/// Visit counts on a square grid of bins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisitHistogram {
    /// Bins per axis.
    pub bins: usize,
    /// Bin edges along x (`bins + 1` values).
    pub x_edges: Vec<f64>,
    /// Bin edges along y (`bins + 1` values).
    pub y_edges: Vec<f64>,
    /// Bin centers; entry `i * bins + j` is x-bin `i`, y-bin `j`.
    pub visits: Vec<Point2>,
    /// Counts in the same order as `visits`.
    pub frequency: Vec<f64>,
    /// Real (non-anchor) points that were pooled.
    pub pooled_points: usize,
}

/// Number of synthetic anchor points added for `bins` bins per axis.
#[must_use]
pub const fn anchor_count(bins: usize) -> usize {
    (bins + 1) * (bins + 1)
}

/// Index of the bin holding `v`; the last bin includes its right edge.
fn bin_index(edges: &[f64], v: f64) -> usize {
    let bins = edges.len() - 1;
    let idx = edges.partition_point(|&e| e <= v);
    idx.saturating_sub(1).min(bins - 1)
}

fn edges(lo: f64, hi: f64, bins: usize) -> Vec<f64> {
    // Degenerate extent: widen by half a unit like a 1-D histogram would
    let (lo, hi) = if hi > lo { (lo, hi) } else { (lo - 0.5, hi + 0.5) };
    linspace(lo, hi, bins + 1)
}

impl VisitHistogram {
    /// Bin `points` over the arena `[lower, upper]²`.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::InvalidConfig`] for zero bins or empty bounds
    /// and [`AnalysisError::InvalidInput`] for a non-finite point.
    pub fn from_points(points: &[Point2], bins: usize, lower: f64, upper: f64) -> Result<Self> {
        if bins == 0 {
            return Err(AnalysisError::InvalidConfig("bins must be > 0".into()));
        }
        if !(lower.is_finite() && upper.is_finite() && lower < upper) {
            return Err(AnalysisError::InvalidConfig(
                "arena lower bound must be below upper bound".into(),
            ));
        }
        if let Some(p) = points.iter().find(|p| !(p.x.is_finite() && p.y.is_finite())) {
            return Err(AnalysisError::InvalidInput(format!(
                "non-finite position ({}, {})",
                p.x, p.y
            )));
        }

        let lattice = linspace(lower, upper, bins + 1);
        let anchors = lattice
            .iter()
            .flat_map(|&y| lattice.iter().map(move |&x| Point2::new(x, y)));
        let all: Vec<Point2> = points.iter().copied().chain(anchors).collect();

        let (mut x_lo, mut x_hi, mut y_lo, mut y_hi) =
            (f64::INFINITY, f64::NEG_INFINITY, f64::INFINITY, f64::NEG_INFINITY);
        for p in &all {
            x_lo = x_lo.min(p.x);
            x_hi = x_hi.max(p.x);
            y_lo = y_lo.min(p.y);
            y_hi = y_hi.max(p.y);
        }
        let x_edges = edges(x_lo, x_hi, bins);
        let y_edges = edges(y_lo, y_hi, bins);

        let mut frequency = vec![0.0; bins * bins];
        for p in &all {
            let i = bin_index(&x_edges, p.x);
            let j = bin_index(&y_edges, p.y);
            frequency[i * bins + j] += 1.0;
        }

        let half_x = (x_edges[1] - x_edges[0]) / 2.0;
        let half_y = (y_edges[1] - y_edges[0]) / 2.0;
        let visits = (0..bins)
            .flat_map(|i| {
                let cx = x_edges[i] + half_x;
                let y_edges = &y_edges;
                (0..bins).map(move |j| Point2::new(cx, y_edges[j] + half_y))
            })
            .collect();

        Ok(Self {
            bins,
            x_edges,
            y_edges,
            visits,
            frequency,
            pooled_points: points.len(),
        })
    }

    /// Pool the trajectories of trials `[end - gap, end)` and bin them.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::InvalidWindow`] for `gap == 0` and
    /// [`AnalysisError::IndexOutOfRange`] when the window leaves the recorded trials.
    pub fn from_run(run: &RunLog, end: usize, gap: usize, bins: usize, lower: f64, upper: f64) -> Result<Self> {
        let pooled = pool_coords(run, end, gap)?;
        debug!(end, gap, points = pooled.len(), "pooled trajectory window");
        Self::from_points(&pooled, bins, lower, upper)
    }

    /// Total histogram mass, anchors included.
    #[must_use]
    pub fn total_mass(&self) -> f64 {
        self.frequency.iter().sum()
    }

    /// Counts as a `bins x bins` matrix indexed `(x-bin, y-bin)`.
    #[must_use]
    pub fn as_matrix(&self) -> DMatrix<f64> {
        DMatrix::from_row_slice(self.bins, self.bins, &self.frequency)
    }

    /// Model density at each bin center for one trial's parameters.
    ///
    /// # Errors
    ///
    /// Propagates trial lookup and predictor errors.
    pub fn model_density<P: PlaceCellPredictor>(
        &self,
        run: &RunLog,
        trial: usize,
        predictor: &P,
        reduction: FieldReduction,
    ) -> Result<Vec<f64>> {
        let acts = predictor.predict_batch(run.trial(trial)?, &self.visits)?;
        Ok(reduction.reduce(&acts))
    }
}

/// All positions visited in trials `[end - gap, end)`.
///
/// # Errors
///
/// See [`VisitHistogram::from_run`].
pub fn pool_coords(run: &RunLog, end: usize, gap: usize) -> Result<Vec<Point2>> {
    if gap == 0 {
        return Err(AnalysisError::InvalidWindow(gap));
    }
    if end > run.coords.len() {
        return Err(AnalysisError::out_of_range(end, run.coords.len()));
    }
    if gap > end {
        return Err(AnalysisError::out_of_range(end, gap));
    }
    let mut pooled = Vec::new();
    for t in (end - gap..end).rev() {
        pooled.extend_from_slice(run.coords(t)?);
    }
    Ok(pooled)
}

/// Visit-frequency map of trials `[trial - gap, trial)` as a `bins x bins`
/// matrix indexed `(x-bin, y-bin)`.
///
/// # Errors
///
/// See [`VisitHistogram::from_run`].
pub fn frequency_map(
    run: &RunLog,
    trial: usize,
    gap: usize,
    bins: usize,
    arena: &ArenaConfig,
) -> Result<DMatrix<f64>> {
    Ok(VisitHistogram::from_run(run, trial, gap, bins, arena.lower, arena.upper)?.as_matrix())
}

/// Mean firing rate of one trial over a set of points (usually a state-space grid).
///
/// # Errors
///
/// Propagates trial lookup and predictor errors.
pub fn mean_firing_map<P: PlaceCellPredictor>(
    run: &RunLog,
    trial: usize,
    points: &[Point2],
    predictor: &P,
) -> Result<Vec<f64>> {
    let acts = predictor.predict_batch(run.trial(trial)?, points)?;
    Ok(FieldReduction::Mean.reduce(&acts))
}
