//! Recorded run data: per-trial parameter snapshots and behaviour.
//!
//! A [`RunLog`] is produced by the (external) training loop and is read-only
//! here. All per-trial sequences are index-aligned with [`RunLog::trials`].

use nalgebra::{DMatrix, DVector, Matrix2, Vector2};
use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};

/// A position in the arena.
pub type Point2 = Vector2<f64>;

/// Agent trajectory recorded during one trial.
pub type CoordTrace = Vec<Point2>;

/// Snapshot of the place-cell model parameters after one trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialLog {
    /// Field centers, one per place field.
    pub centers: Vec<Point2>,
    /// Field widths as symmetric 2x2 covariance matrices.
    pub widths: Vec<Matrix2<f64>>,
    /// Per-field gain.
    pub amplitudes: Vec<f64>,
    /// Fields x actions readout to action logits.
    pub policy_weights: DMatrix<f64>,
    /// Fields readout to the state value.
    pub value_weights: DVector<f64>,
}

impl TrialLog {
    /// Number of place fields in this snapshot.
    #[must_use]
    pub fn num_fields(&self) -> usize {
        self.centers.len()
    }

    /// Number of actions in the policy readout.
    #[must_use]
    pub fn num_actions(&self) -> usize {
        self.policy_weights.ncols()
    }

    /// Build a snapshot with isotropic widths `sigma² I`.
    #[must_use]
    pub fn isotropic(
        centers: Vec<Point2>,
        sigmas: &[f64],
        amplitudes: Vec<f64>,
        policy_weights: DMatrix<f64>,
        value_weights: DVector<f64>,
    ) -> Self {
        let widths = sigmas
            .iter()
            .map(|s| Matrix2::from_diagonal_element(s * s))
            .collect();
        Self {
            centers,
            widths,
            amplitudes,
            policy_weights,
            value_weights,
        }
    }

    /// Check that every per-field sequence has the same length.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::DimensionMismatch`] on the first misaligned field array.
    pub fn validate(&self) -> Result<()> {
        let n = self.num_fields();
        for len in [
            self.widths.len(),
            self.amplitudes.len(),
            self.policy_weights.nrows(),
            self.value_weights.len(),
        ] {
            if len != n {
                return Err(AnalysisError::DimensionMismatch {
                    expected: n,
                    actual: len,
                });
            }
        }
        Ok(())
    }
}

/// Everything recorded for one training run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunLog {
    /// Parameter snapshot per trial.
    pub trials: Vec<TrialLog>,
    /// Agent trajectory per trial.
    pub coords: Vec<CoordTrace>,
    /// Steps to goal per trial.
    pub latencies: Vec<f64>,
    /// Return per trial.
    pub rewards: Vec<f64>,
}

impl RunLog {
    /// Number of recorded trials.
    #[must_use]
    pub fn total_trials(&self) -> usize {
        self.trials.len()
    }

    /// Parameter snapshot of trial `index`.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::IndexOutOfRange`] if `index >= total_trials()`.
    pub fn trial(&self, index: usize) -> Result<&TrialLog> {
        self.trials
            .get(index)
            .ok_or_else(|| AnalysisError::out_of_range(index, self.total_trials()))
    }

    /// Trajectory of trial `index`.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::IndexOutOfRange`] if no trace was recorded for `index`.
    pub fn coords(&self, index: usize) -> Result<&CoordTrace> {
        self.coords
            .get(index)
            .ok_or_else(|| AnalysisError::out_of_range(index, self.coords.len()))
    }

    /// Number of place fields, taken from the first trial.
    #[must_use]
    pub fn num_fields(&self) -> usize {
        self.trials.first().map_or(0, TrialLog::num_fields)
    }

    /// Check run-level invariants: non-empty, constant field count and
    /// index alignment of traces and latencies with the trials.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<()> {
        if self.trials.is_empty() {
            return Err(AnalysisError::EmptySeries("run has no trials".into()));
        }
        let fields = self.num_fields();
        let actions = self.trials[0].num_actions();
        for trial in &self.trials {
            trial.validate()?;
            if trial.num_fields() != fields {
                return Err(AnalysisError::DimensionMismatch {
                    expected: fields,
                    actual: trial.num_fields(),
                });
            }
            if trial.num_actions() != actions {
                return Err(AnalysisError::DimensionMismatch {
                    expected: actions,
                    actual: trial.num_actions(),
                });
            }
        }
        for len in [self.coords.len(), self.latencies.len()] {
            if len != self.total_trials() {
                return Err(AnalysisError::DimensionMismatch {
                    expected: self.total_trials(),
                    actual: len,
                });
            }
        }
        if !self.rewards.is_empty() && self.rewards.len() != self.total_trials() {
            return Err(AnalysisError::DimensionMismatch {
                expected: self.total_trials(),
                actual: self.rewards.len(),
            });
        }
        Ok(())
    }
}
