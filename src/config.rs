//! Configuration types for run analysis.
//!
//! Experiment constants (arena geometry, window sizes, bin counts) live here
//! instead of being scattered across default arguments:
//! - [`ArenaConfig`]: arena bounds, goal/start coordinates and the obstacle
//! - [`ScoringConfig`]: convergence scoring of the latency curve
//! - [`SpatialConfig`]: visit binning and state-space resolution
//! - [`DriftConfig`]: representational drift sampling
//! - [`VarianceConfig`]: parameter-change summaries
//!
//! Every analysis takes the relevant section explicitly.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::convergence::ScoreWeights;
use crate::error::{AnalysisError, Result};

/// Axis-aligned rectangle in arena coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge.
    pub x_min: f64,
    /// Right edge.
    pub x_max: f64,
    /// Bottom edge.
    pub y_min: f64,
    /// Top edge.
    pub y_max: f64,
}

impl Rect {
    /// Whether `(x, y)` lies inside the rectangle (edges inclusive).
    #[must_use]
    pub fn contains(&self, x: f64, y: f64) -> bool {
        (self.x_min..=self.x_max).contains(&x) && (self.y_min..=self.y_max).contains(&y)
    }
}

/// Arena geometry shared by all spatial analyses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArenaConfig {
    /// Lower bound of both axes.
    pub lower: f64,
    /// Upper bound of both axes.
    pub upper: f64,
    /// Goal coordinate.
    pub goal: [f64; 2],
    /// Start coordinate.
    pub start: [f64; 2],
    /// Goal radius used by the reward field.
    pub goal_size: f64,
    /// Obstacle rectangle, if the run had one.
    ///
    /// None of the analyses read it. It is kept so a saved config describes
    /// the whole arena for whatever draws the maps.
    pub obstacle: Option<Rect>,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            lower: -1.0,
            upper: 1.0,
            goal: [0.75, -0.75],
            start: [-0.75, -0.75],
            goal_size: 0.05,
            obstacle: Some(Rect {
                x_min: -0.2,
                x_max: 0.2,
                y_min: -1.0,
                y_max: 0.5,
            }),
        }
    }
}

impl ArenaConfig {
    /// Set the goal coordinate.
    #[must_use]
    pub const fn with_goal(mut self, goal: [f64; 2]) -> Self {
        self.goal = goal;
        self
    }

    /// Set the goal radius.
    #[must_use]
    pub const fn with_goal_size(mut self, goal_size: f64) -> Self {
        self.goal_size = goal_size;
        self
    }

    /// Set or clear the obstacle.
    #[must_use]
    pub const fn with_obstacle(mut self, obstacle: Option<Rect>) -> Self {
        self.obstacle = obstacle;
        self
    }
}

/// Convergence scoring settings for the latency curve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Moving-average window applied before scoring.
    pub smoothing_window: usize,
    /// Smoothed latency below which the run counts as converged.
    pub threshold: f64,
    /// Number of final smoothed samples used for the stability term.
    pub stability_window: usize,
    /// Multipliers on the three score terms.
    pub weights: ScoreWeights,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            smoothing_window: 20,
            threshold: 35.0,
            stability_window: 10_000,
            weights: ScoreWeights::default(),
        }
    }
}

impl ScoringConfig {
    /// Set the smoothing window.
    #[must_use]
    pub const fn with_smoothing_window(mut self, window: usize) -> Self {
        self.smoothing_window = window;
        self
    }

    /// Set the convergence threshold.
    #[must_use]
    pub const fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Set the stability window.
    #[must_use]
    pub const fn with_stability_window(mut self, window: usize) -> Self {
        self.stability_window = window;
        self
    }

    /// Set the score weights.
    #[must_use]
    pub const fn with_weights(mut self, weights: ScoreWeights) -> Self {
        self.weights = weights;
        self
    }
}

/// Visit binning and evaluation-grid settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpatialConfig {
    /// Number of trials pooled before the analysed trial.
    pub gap: usize,
    /// Bins per axis for the frequency/density correlation.
    pub correlation_bins: usize,
    /// Bins per axis for the standalone frequency map.
    pub frequency_bins: usize,
    /// Points per axis of the state-space grid.
    pub grid_resolution: usize,
    /// Number of trials in the correlation sweep.
    pub sweep_points: usize,
}

impl Default for SpatialConfig {
    fn default() -> Self {
        Self {
            gap: 25,
            correlation_bins: 23,
            frequency_bins: 31,
            grid_resolution: 41,
            sweep_points: 21,
        }
    }
}

impl SpatialConfig {
    /// Set the pooling gap.
    #[must_use]
    pub const fn with_gap(mut self, gap: usize) -> Self {
        self.gap = gap;
        self
    }

    /// Set the correlation bin count.
    #[must_use]
    pub const fn with_correlation_bins(mut self, bins: usize) -> Self {
        self.correlation_bins = bins;
        self
    }

    /// Set the state-space grid resolution.
    #[must_use]
    pub const fn with_grid_resolution(mut self, resolution: usize) -> Self {
        self.grid_resolution = resolution;
        self
    }

    /// Set the number of sweep points.
    #[must_use]
    pub const fn with_sweep_points(mut self, points: usize) -> Self {
        self.sweep_points = points;
        self
    }
}

/// Representational drift settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriftConfig {
    /// Trial from which behaviour is considered stable; drift reference.
    pub stable_perf: usize,
    /// Number of trials sampled for the correlation series.
    pub num_samples: usize,
    /// Number of latency samples used to normalise the drift score.
    pub latency_samples: usize,
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            stable_perf: 0,
            num_samples: 41,
            latency_samples: 1001,
        }
    }
}

impl DriftConfig {
    /// Set the stable-performance trial.
    #[must_use]
    pub const fn with_stable_perf(mut self, trial: usize) -> Self {
        self.stable_perf = trial;
        self
    }

    /// Set the number of sampled trials.
    #[must_use]
    pub const fn with_num_samples(mut self, num: usize) -> Self {
        self.num_samples = num;
        self
    }
}

/// Parameter-change summary settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VarianceConfig {
    /// Fields kept per parameter when ranking by variability.
    pub top_k: usize,
    /// Squared amplitude at or above which a field counts as active.
    pub active_threshold: f64,
    /// Trials sampled for the active fraction.
    pub active_samples: usize,
    /// Trials sampled for field area/center tracking.
    pub tracking_samples: usize,
}

impl Default for VarianceConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            active_threshold: 0.25,
            active_samples: 100,
            tracking_samples: 21,
        }
    }
}

impl VarianceConfig {
    /// Set the top-k field count.
    #[must_use]
    pub const fn with_top_k(mut self, k: usize) -> Self {
        self.top_k = k;
        self
    }

    /// Set the number of tracking samples.
    #[must_use]
    pub const fn with_tracking_samples(mut self, samples: usize) -> Self {
        self.tracking_samples = samples;
        self
    }
}

/// Full analysis configuration.
///
/// # Example
///
/// ```
/// use placefield_analysis::AnalysisConfig;
///
/// let config = AnalysisConfig::default();
/// assert!(config.validate().is_ok());
/// assert_eq!(config.spatial.correlation_bins, 23);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Arena geometry.
    #[serde(default)]
    pub arena: ArenaConfig,
    /// Convergence scoring.
    #[serde(default)]
    pub scoring: ScoringConfig,
    /// Spatial binning.
    #[serde(default)]
    pub spatial: SpatialConfig,
    /// Representational drift.
    #[serde(default)]
    pub drift: DriftConfig,
    /// Parameter-change summaries.
    #[serde(default)]
    pub variance: VarianceConfig,
}

impl AnalysisConfig {
    /// Load a configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save the configuration to a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if serialisation or the write fails.
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Set the arena section.
    #[must_use]
    pub fn with_arena(mut self, arena: ArenaConfig) -> Self {
        self.arena = arena;
        self
    }

    /// Set the scoring section.
    #[must_use]
    pub fn with_scoring(mut self, scoring: ScoringConfig) -> Self {
        self.scoring = scoring;
        self
    }

    /// Set the spatial section.
    #[must_use]
    pub fn with_spatial(mut self, spatial: SpatialConfig) -> Self {
        self.spatial = spatial;
        self
    }

    /// Set the drift section.
    #[must_use]
    pub fn with_drift(mut self, drift: DriftConfig) -> Self {
        self.drift = drift;
        self
    }

    /// Set the variance section.
    #[must_use]
    pub fn with_variance(mut self, variance: VarianceConfig) -> Self {
        self.variance = variance;
        self
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::InvalidConfig`] naming the first bad field.
    pub fn validate(&self) -> Result<()> {
        if self.arena.lower >= self.arena.upper {
            return Err(AnalysisError::InvalidConfig(
                "arena.lower must be below arena.upper".into(),
            ));
        }
        if self.arena.goal_size <= 0.0 {
            return Err(AnalysisError::InvalidConfig(
                "arena.goal_size must be > 0".into(),
            ));
        }
        if self.scoring.smoothing_window == 0 {
            return Err(AnalysisError::InvalidConfig(
                "scoring.smoothing_window must be > 0".into(),
            ));
        }
        if self.scoring.stability_window == 0 {
            return Err(AnalysisError::InvalidConfig(
                "scoring.stability_window must be > 0".into(),
            ));
        }
        if self.spatial.gap == 0 {
            return Err(AnalysisError::InvalidConfig("spatial.gap must be > 0".into()));
        }
        if self.spatial.correlation_bins == 0 || self.spatial.frequency_bins == 0 {
            return Err(AnalysisError::InvalidConfig(
                "spatial bin counts must be > 0".into(),
            ));
        }
        if self.spatial.grid_resolution < 2 {
            return Err(AnalysisError::InvalidConfig(
                "spatial.grid_resolution must be >= 2".into(),
            ));
        }
        if self.drift.num_samples == 0 || self.drift.latency_samples == 0 {
            return Err(AnalysisError::InvalidConfig(
                "drift sample counts must be > 0".into(),
            ));
        }
        if self.variance.tracking_samples == 0 || self.variance.active_samples == 0 {
            return Err(AnalysisError::InvalidConfig(
                "variance sample counts must be > 0".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AnalysisConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.scoring.smoothing_window, 20);
        assert_eq!(config.spatial.gap, 25);
        assert_eq!(config.drift.latency_samples, 1001);
        assert_eq!(config.drift.num_samples, 41);
    }

    #[test]
    fn test_config_validation() {
        let mut config = AnalysisConfig::default();
        config.spatial.gap = 0;
        assert!(matches!(
            config.validate(),
            Err(AnalysisError::InvalidConfig(_))
        ));

        let config = AnalysisConfig::default()
            .with_scoring(ScoringConfig::default().with_smoothing_window(0));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_yaml_roundtrip() {
        let config = AnalysisConfig::default()
            .with_spatial(SpatialConfig::default().with_gap(10).with_correlation_bins(11));
        let yaml = serde_yaml::to_string(&config).unwrap();
        let restored: AnalysisConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(restored.spatial.gap, 10);
        assert_eq!(restored.spatial.correlation_bins, 11);
        assert_eq!(restored.arena.goal, [0.75, -0.75]);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let restored: AnalysisConfig = serde_yaml::from_str("drift:\n  stable_perf: 7\n  num_samples: 3\n  latency_samples: 9\n").unwrap();
        assert_eq!(restored.drift.stable_perf, 7);
        assert_eq!(restored.spatial.correlation_bins, 23);
    }

    #[test]
    fn test_obstacle_contains() {
        let arena = ArenaConfig::default();
        let obstacle = arena.obstacle.unwrap();
        assert!(obstacle.contains(0.0, 0.0));
        assert!(!obstacle.contains(0.5, 0.0));
        assert!(!obstacle.contains(0.0, 0.75));
    }
}
