//! Error types for place-field log analysis.

use thiserror::Error;

/// Result type alias for analysis operations.
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Errors that can occur while analysing a recorded run.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Curve fit requested with an unknown function family.
    #[error("unsupported curve shape '{0}': choose from 'linear', 'exp', 'sigmoid' or 'power'")]
    UnsupportedShape(String),

    /// Nonlinear solver exhausted its evaluation budget.
    #[error("curve fit did not converge within {evaluations} evaluations")]
    FitDidNotConverge {
        /// Residual evaluations spent before giving up.
        evaluations: usize,
    },

    /// A zero-length sequence where at least one sample is required.
    #[error("empty series: {0}")]
    EmptySeries(String),

    /// Trial index outside `[0, total_trials)`.
    #[error("trial index {index} out of range for run of {total} trials")]
    IndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of recorded trials.
        total: usize,
    },

    /// Smoothing or pooling window that cannot be applied.
    #[error("invalid window size {0}")]
    InvalidWindow(usize),

    /// Too few samples for the requested statistic.
    #[error("insufficient data: need at least {required} samples, got {actual}")]
    InsufficientData {
        /// Minimum sample count.
        required: usize,
        /// Provided sample count.
        actual: usize,
    },

    /// Dimension mismatch between index-aligned inputs.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension.
        expected: usize,
        /// Actual dimension.
        actual: usize,
    },

    /// Place-field width that cannot be inverted.
    #[error("singular width matrix for field {field}")]
    SingularWidth {
        /// Field index.
        field: usize,
    },

    /// Input that is well-typed but numerically unusable.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Invalid configuration parameter.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// I/O failure while reading or writing a configuration file.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML (de)serialisation failure.
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl AnalysisError {
    /// Shorthand for an [`AnalysisError::IndexOutOfRange`].
    #[must_use]
    pub const fn out_of_range(index: usize, total: usize) -> Self {
        Self::IndexOutOfRange { index, total }
    }
}
