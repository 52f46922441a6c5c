//! # placefield-analysis
//!
//! Post-hoc analysis of training logs from place-cell based navigation agents.
//!
//! A run is recorded as one parameter snapshot per trial (field centers,
//! widths, amplitudes and the policy/value readouts) together with the
//! agent's trajectory, latency and reward per trial. This crate turns such a
//! [`RunLog`] into summaries of how learning went and how the place-field
//! code changed while it did.
//!
//! ## Quick Start
//!
//! ```
//! use placefield_analysis::{analyze_run, AnalysisConfig, GaussianPlaceCells, SyntheticRun};
//! use placefield_analysis::config::SpatialConfig;
//!
//! let config = AnalysisConfig::default()
//!     .with_spatial(SpatialConfig::default().with_gap(5).with_grid_resolution(11));
//! let run = SyntheticRun::default().with_trials(30).with_fields(4).generate(&config.arena)?;
//!
//! let report = analyze_run(&run, &config, &GaussianPlaceCells)?;
//! println!("{}", report.report());
//! # Ok::<(), placefield_analysis::AnalysisError>(())
//! ```
//!
//! ## Modules
//!
//! - [`smoothing`]: edge-padded moving average
//! - [`curve_fit`]: Levenberg–Marquardt fits of learning-curve families
//! - [`convergence`]: composite convergence score of a latency curve
//! - [`spatial`]: visit histograms with anchor lattice, model density
//! - [`freq_density`]: visit frequency vs. model density correlation
//! - [`param_change`]: stacked parameters and per-field drift series
//! - [`tracking`]: field area, center, amplitude and activity over training
//! - [`drift`]: population-vector and representational-similarity drift
//! - [`readout`]: value map, policy flow field, goal reward
//! - [`report`]: everything above in one call
//!
//! The place-cell model itself is abstracted behind [`PlaceCellPredictor`];
//! [`GaussianPlaceCells`] is the stock implementation.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod convergence;
pub mod curve_fit;
pub mod drift;
pub mod error;
pub mod freq_density;
pub mod grid;
pub mod model;
pub mod param_change;
pub mod readout;
pub mod report;
pub mod schedule;
pub mod smoothing;
pub mod spatial;
pub mod stats;
pub mod synthetic;
pub mod tracking;
pub mod types;

// Re-export main types at crate root for convenience
pub use config::AnalysisConfig;
pub use convergence::{evaluate_loss, ConvergenceScore, ScoreWeights};
pub use curve_fit::{characterize_curve, fit_model, CurveFit, CurveShape};
pub use drift::{drift_score, get_pvcorr, PopulationDrift};
pub use error::{AnalysisError, Result};
pub use freq_density::{get_2d_freq_density_corr, FreqDensityCorrelation};
pub use grid::StateSpaceGrid;
pub use model::{GaussianPlaceCells, PlaceCellPredictor};
pub use param_change::{get_param_changes, get_param_variance, ParamDelta, ParamVariance};
pub use report::{analyze_run, RunReport};
pub use smoothing::moving_average;
pub use spatial::VisitHistogram;
pub use synthetic::SyntheticRun;
pub use types::{Point2, RunLog, TrialLog};
