//! Edge-padded moving average for per-trial series.
//!
//! Latency and reward curves are noisy trial to trial; every curve summary in
//! this crate looks at the smoothed series instead.
//!
//! # Example
//! ```
//! use placefield_analysis::smoothing::moving_average;
//!
//! let smoothed = moving_average(&[1.0, 1.0, 4.0, 1.0, 1.0], 2).unwrap();
//! assert_eq!(smoothed.len(), 5);
//! assert_eq!(smoothed[2], 2.5);
//! ```

use crate::error::{AnalysisError, Result};

/// Uniform moving average with edge-value padding.
///
/// The signal is padded at both ends by `window / 2` copies of its first and
/// last sample, averaged with a uniform kernel of width `window`, and cut to
/// the input length. Output sample `i` is the mean of padded samples
/// `i..i + window`, so even windows look half a window back and
/// `window / 2 - 1` samples ahead.
///
/// # Errors
///
/// Returns [`AnalysisError::EmptySeries`] for an empty signal and
/// [`AnalysisError::InvalidWindow`] for `window == 0`.
#[allow(clippy::cast_precision_loss)]
pub fn moving_average(signal: &[f64], window: usize) -> Result<Vec<f64>> {
    if signal.is_empty() {
        return Err(AnalysisError::EmptySeries("moving average input".into()));
    }
    if window == 0 {
        return Err(AnalysisError::InvalidWindow(window));
    }

    let half = window / 2;
    let first = signal[0];
    let last = signal[signal.len() - 1];
    let padded: Vec<f64> = std::iter::repeat(first)
        .take(half)
        .chain(signal.iter().copied())
        .chain(std::iter::repeat(last).take(half))
        .collect();

    let n = signal.len();
    let w = window as f64;
    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        let sum: f64 = padded[i..i + window].iter().sum();
        out.push(sum / w);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_same_length_for_all_windows() {
        let signal: Vec<f64> = (0..17).map(|i| f64::from(i).sin()).collect();
        for w in 1..=signal.len() {
            let out = moving_average(&signal, w).unwrap();
            assert_eq!(out.len(), signal.len(), "window {w}");
        }
    }

    #[test]
    fn test_constant_signal_unchanged() {
        let signal = vec![3.7; 40];
        for w in [1, 2, 5, 20, 40] {
            let out = moving_average(&signal, w).unwrap();
            assert!(out.iter().all(|&v| approx_eq(v, 3.7)), "window {w}");
        }
    }

    #[test]
    fn test_window_one_is_identity() {
        let signal = vec![5.0, 1.0, 9.0, 2.0];
        assert_eq!(moving_average(&signal, 1).unwrap(), signal);
    }

    #[test]
    fn test_edge_padding_even_window() {
        // padded: [1, 1, 1, 2, 3, 4, 4, 4]
        let out = moving_average(&[1.0, 2.0, 3.0, 4.0], 4).unwrap();
        assert!(approx_eq(out[0], 1.25));
        assert!(approx_eq(out[1], 1.75));
        assert!(approx_eq(out[2], 2.5));
        assert!(approx_eq(out[3], 3.25));
    }

    #[test]
    fn test_odd_window_centered() {
        // padded: [1, 1, 2, 3, 4, 4]
        let out = moving_average(&[1.0, 2.0, 3.0, 4.0], 3).unwrap();
        assert!(approx_eq(out[0], 4.0 / 3.0));
        assert!(approx_eq(out[1], 2.0));
        assert!(approx_eq(out[2], 3.0));
        assert!(approx_eq(out[3], 11.0 / 3.0));
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(matches!(
            moving_average(&[], 3),
            Err(AnalysisError::EmptySeries(_))
        ));
        assert!(matches!(
            moving_average(&[1.0], 0),
            Err(AnalysisError::InvalidWindow(0))
        ));
    }
}
