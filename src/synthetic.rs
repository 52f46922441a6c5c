//! Seeded synthetic runs for demos, tests and benchmarks.
//!
//! Fields start scattered over the arena and random-walk with a weak pull
//! towards the goal; the agent walks a jittered path from start to goal whose
//! length shrinks as training proceeds.

use nalgebra::{DMatrix, DVector};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use tracing::debug;

use crate::config::ArenaConfig;
use crate::error::{AnalysisError, Result};
use crate::types::{Point2, RunLog, TrialLog};

/// Parameters of a synthetic run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyntheticRun {
    /// Number of trials.
    pub num_trials: usize,
    /// Number of place fields.
    pub num_fields: usize,
    /// Latency of the first trial.
    pub initial_latency: f64,
    /// Latency the run settles at.
    pub final_latency: f64,
    /// RNG seed.
    pub seed: u64,
}

impl Default for SyntheticRun {
    fn default() -> Self {
        Self {
            num_trials: 200,
            num_fields: 16,
            initial_latency: 150.0,
            final_latency: 20.0,
            seed: 42,
        }
    }
}

impl SyntheticRun {
    /// Set the number of trials.
    #[must_use]
    pub const fn with_trials(mut self, num_trials: usize) -> Self {
        self.num_trials = num_trials;
        self
    }

    /// Set the number of fields.
    #[must_use]
    pub const fn with_fields(mut self, num_fields: usize) -> Self {
        self.num_fields = num_fields;
        self
    }

    /// Set the RNG seed.
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Generate the run.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::InvalidConfig`] for zero trials or fields, empty
    /// arena bounds, or latencies outside `1 <= final <= initial`.
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn generate(&self, arena: &ArenaConfig) -> Result<RunLog> {
        if self.num_trials == 0 || self.num_fields == 0 {
            return Err(AnalysisError::InvalidConfig(
                "synthetic run needs at least one trial and one field".into(),
            ));
        }
        if arena.lower >= arena.upper {
            return Err(AnalysisError::InvalidConfig(
                "arena lower bound must be below upper bound".into(),
            ));
        }
        if self.final_latency < 1.0 || self.initial_latency < self.final_latency {
            return Err(AnalysisError::InvalidConfig(
                "latencies must satisfy 1 <= final <= initial".into(),
            ));
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let noise = Normal::new(0.0, 1.0)
            .map_err(|e| AnalysisError::InvalidConfig(format!("noise distribution: {e}")))?;
        let (lo, hi) = (arena.lower, arena.upper);
        let goal = Point2::new(arena.goal[0], arena.goal[1]);
        let start = Point2::new(arena.start[0], arena.start[1]);
        let clamp = |p: Point2| Point2::new(p.x.clamp(lo, hi), p.y.clamp(lo, hi));

        let f = self.num_fields;
        let mut centers: Vec<Point2> = (0..f)
            .map(|_| Point2::new(rng.gen_range(lo..hi), rng.gen_range(lo..hi)))
            .collect();
        let mut sigmas: Vec<f64> = (0..f).map(|_| rng.gen_range(0.08..0.15)).collect();
        let mut amplitudes: Vec<f64> = (0..f).map(|_| rng.gen_range(0.6..1.2)).collect();
        let mut policy = DMatrix::from_fn(f, 4, |_, _| 0.1 * noise.sample(&mut rng));
        let mut value = DVector::from_fn(f, |_, _| 0.1 * noise.sample(&mut rng));

        let tau = (self.num_trials as f64 / 5.0).max(1.0);
        let mut run = RunLog::default();
        for t in 0..self.num_trials {
            for (c, s) in centers.iter_mut().zip(sigmas.iter_mut()) {
                let jitter = Point2::new(noise.sample(&mut rng), noise.sample(&mut rng)) * 0.01;
                *c = clamp(*c + (goal - *c) * 0.002 + jitter);
                *s = (*s + 0.002 * noise.sample(&mut rng)).clamp(0.05, 0.3);
            }
            for a in &mut amplitudes {
                *a = (*a + 0.02 * noise.sample(&mut rng)).max(0.0);
            }
            policy.apply(|w| *w += 0.01 * noise.sample(&mut rng));
            value.apply(|w| *w += 0.01 * noise.sample(&mut rng));

            run.trials.push(TrialLog::isotropic(
                centers.clone(),
                &sigmas,
                amplitudes.clone(),
                policy.clone(),
                value.clone(),
            ));

            let expected = self.final_latency
                + (self.initial_latency - self.final_latency) * (-(t as f64) / tau).exp();
            let latency = (expected + 3.0 * noise.sample(&mut rng)).round().max(1.0);
            let steps = latency as usize;
            let trace: Vec<Point2> = (1..=steps)
                .map(|k| {
                    let along = start + (goal - start) * (k as f64 / steps as f64);
                    let wobble = Point2::new(noise.sample(&mut rng), noise.sample(&mut rng)) * 0.05;
                    clamp(along + wobble)
                })
                .collect();
            run.coords.push(trace);
            run.latencies.push(latency);
            run.rewards.push(1.0 - latency / (self.initial_latency * 2.0));
        }
        debug!(trials = self.num_trials, fields = f, seed = self.seed, "generated synthetic run");
        Ok(run)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_run_is_valid() {
        let run = SyntheticRun::default()
            .with_trials(30)
            .with_fields(5)
            .generate(&ArenaConfig::default())
            .unwrap();
        run.validate().unwrap();
        assert_eq!(run.total_trials(), 30);
        assert_eq!(run.num_fields(), 5);
        assert!(run
            .coords
            .iter()
            .flatten()
            .all(|p| p.x.abs() <= 1.0 && p.y.abs() <= 1.0));
    }

    #[test]
    fn test_same_seed_same_run() {
        let arena = ArenaConfig::default();
        let a = SyntheticRun::default().with_trials(10).generate(&arena).unwrap();
        let b = SyntheticRun::default().with_trials(10).generate(&arena).unwrap();
        let c = SyntheticRun::default().with_trials(10).with_seed(7).generate(&arena).unwrap();
        assert_eq!(a.latencies, b.latencies);
        assert_eq!(a.trials, b.trials);
        assert_ne!(a.trials, c.trials);
    }

    #[test]
    fn test_latency_decreases() {
        let run = SyntheticRun::default().generate(&ArenaConfig::default()).unwrap();
        let early: f64 = run.latencies[..10].iter().sum();
        let late: f64 = run.latencies[run.latencies.len() - 10..].iter().sum();
        assert!(late < early);
    }

    #[test]
    fn test_rejects_empty_run() {
        assert!(SyntheticRun::default()
            .with_trials(0)
            .generate(&ArenaConfig::default())
            .is_err());
    }
}
