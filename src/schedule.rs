//! Learning-rate schedules used when replaying or annotating a run.
//!
//! # Example
//!
//! ```rust
//! use placefield_analysis::schedule::{ExponentialDecaySchedule, LearningRateSchedule};
//!
//! let schedule = ExponentialDecaySchedule::new(1e-2, 1e-4, 100).unwrap();
//! assert!((schedule.get_lr(0) - 1e-2).abs() < 1e-15);
//! assert!((schedule.get_lr(100) - 1e-4).abs() < 1e-12);
//! assert_eq!(schedule.rates().len(), 101);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};

/// A learning rate per training step.
pub trait LearningRateSchedule {
    /// Learning rate at `step` (0-indexed).
    fn get_lr(&self, step: u64) -> f64;

    /// Number of steps the schedule spans.
    fn total_steps(&self) -> u64;

    /// Rates for steps `0..=total_steps()`.
    fn rates(&self) -> Vec<f64> {
        (0..=self.total_steps()).map(|s| self.get_lr(s)).collect()
    }
}

/// Geometric decay from `initial_lr` at step 0 to `final_lr` at `total_steps`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExponentialDecaySchedule {
    initial_lr: f64,
    decay_rate: f64,
    total_steps: u64,
}

impl ExponentialDecaySchedule {
    /// Create a schedule.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::InvalidConfig`] if a rate is not positive or
    /// `total_steps` is zero.
    #[allow(clippy::cast_precision_loss)]
    pub fn new(initial_lr: f64, final_lr: f64, total_steps: u64) -> Result<Self> {
        if initial_lr <= 0.0 || final_lr <= 0.0 {
            return Err(AnalysisError::InvalidConfig(
                "learning rates must be positive".into(),
            ));
        }
        if total_steps == 0 {
            return Err(AnalysisError::InvalidConfig("total_steps must be > 0".into()));
        }
        Ok(Self {
            initial_lr,
            decay_rate: (final_lr / initial_lr).powf(1.0 / total_steps as f64),
            total_steps,
        })
    }

    /// Per-step multiplicative factor.
    #[must_use]
    pub const fn decay_rate(&self) -> f64 {
        self.decay_rate
    }
}

impl LearningRateSchedule for ExponentialDecaySchedule {
    #[allow(clippy::cast_precision_loss)]
    fn get_lr(&self, step: u64) -> f64 {
        self.initial_lr * self.decay_rate.powf(step as f64)
    }

    fn total_steps(&self) -> u64 {
        self.total_steps
    }
}
