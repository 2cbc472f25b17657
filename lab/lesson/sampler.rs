use std::f32::consts::TAU;

use rand::{distributions::Distribution, Rng};

/// Normal distribution sampled with the Box-Muller transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalSampler {
    mean: f32,
    stddev: f32,
}

impl NormalSampler {
    /// Zero mean, unit variance.
    pub const STANDARD: Self = Self {
        mean: 0.0,
        stddev: 1.0,
    };

    /// Creates a sampler with the given mean and standard deviation.
    #[must_use]
    pub const fn new(mean: f32, stddev: f32) -> Self {
        Self { mean, stddev }
    }

    /// Mean of the distribution.
    #[must_use]
    pub const fn mean(&self) -> f32 {
        self.mean
    }

    /// Standard deviation of the distribution.
    #[must_use]
    pub const fn stddev(&self) -> f32 {
        self.stddev
    }
}

impl Default for NormalSampler {
    fn default() -> Self {
        Self::STANDARD
    }
}

impl Distribution<f32> for NormalSampler {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f32 {
        // ln(0) is -inf; keep u1 in (0, 1).
        let u1 = loop {
            let candidate: f32 = rng.gen();
            if candidate > 0.0 {
                break candidate;
            }
        };
        let u2: f32 = rng.gen();
        self.mean + self.stddev * (-2.0 * u1.ln()).sqrt() * (TAU * u2).sin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::mock::StepRng, rngs::SmallRng, SeedableRng};

    #[test]
    fn zero_draws_are_redrawn() {
        // StepRng starting at zero yields an exact 0.0 first, then positive values.
        let mut rng = StepRng::new(0, 1 << 31);
        let value = NormalSampler::STANDARD.sample(&mut rng);
        assert!(value.is_finite());
    }

    #[test]
    fn moments_are_close_to_parameters() {
        let mut rng = SmallRng::seed_from_u64(11);
        let sampler = NormalSampler::new(3.0, 2.0);
        let draws: Vec<f32> = (0..20_000).map(|_| sampler.sample(&mut rng)).collect();
        let n = draws.len() as f32;
        let mean = draws.iter().sum::<f32>() / n;
        let variance = draws.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / n;
        assert!((mean - 3.0).abs() < 0.1, "mean {mean}");
        assert!((variance.sqrt() - 2.0).abs() < 0.1, "stddev {}", variance.sqrt());
    }

    #[test]
    fn every_draw_is_finite() {
        let mut rng = SmallRng::seed_from_u64(5);
        assert!((0..10_000).all(|_| NormalSampler::STANDARD.sample(&mut rng).is_finite()));
    }
}
