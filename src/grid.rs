//! Evaluation grids and index sampling.

use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};
use crate::types::Point2;

/// `num` evenly spaced values over `[start, end]`, endpoints included.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn linspace(start: f64, end: f64, num: usize) -> Vec<f64> {
    match num {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (num - 1) as f64;
            (0..num)
                .map(|i| if i == num - 1 { end } else { start + step * i as f64 })
                .collect()
        }
    }
}

/// Integer trial indices evenly spaced over `[start, end]` (floored).
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn sample_trials(start: usize, end: usize, num: usize) -> Vec<usize> {
    linspace(start as f64, end as f64, num)
        .into_iter()
        .map(|v| v.floor() as usize)
        .collect()
}

/// Regular sampling grid over a square arena, shared across trials so that
/// per-trial activations are directly comparable.
///
/// Points are ordered row-major with x varying fastest: point `r * n + c`
/// is `(xs[c], xs[r])`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateSpaceGrid {
    resolution: usize,
    points: Vec<Point2>,
}

impl StateSpaceGrid {
    /// Grid over `[-1, 1]²` with `resolution` points per axis.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::InvalidConfig`] if `resolution < 2`.
    pub fn new(resolution: usize) -> Result<Self> {
        Self::with_bounds(resolution, -1.0, 1.0)
    }

    /// Grid over `[lower, upper]²`.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::InvalidConfig`] if `resolution < 2` or the bounds are empty.
    pub fn with_bounds(resolution: usize, lower: f64, upper: f64) -> Result<Self> {
        if resolution < 2 {
            return Err(AnalysisError::InvalidConfig(format!(
                "grid resolution must be >= 2, got {resolution}"
            )));
        }
        if lower >= upper {
            return Err(AnalysisError::InvalidConfig(
                "grid lower bound must be below upper bound".into(),
            ));
        }
        let axis = linspace(lower, upper, resolution);
        let points = axis
            .iter()
            .flat_map(|&y| axis.iter().map(move |&x| Point2::new(x, y)))
            .collect();
        Ok(Self { resolution, points })
    }

    /// Points per axis.
    #[must_use]
    pub fn resolution(&self) -> usize {
        self.resolution
    }

    /// All grid points.
    #[must_use]
    pub fn points(&self) -> &[Point2] {
        &self.points
    }

    /// Total number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the grid is empty (never true for a constructed grid).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
