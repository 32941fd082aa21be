// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Random source behind the simulated signal

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

/// Source of the stochastic terms in every sensor's drift model
pub trait NoiseSource: Send {
    /// Draw from N(mean, std_dev)
    fn gaussian(&mut self, mean: f64, std_dev: f64) -> f64;

    /// Draw uniformly from [low, high]
    fn uniform(&mut self, low: f64, high: f64) -> f64;

    /// True with the given probability
    fn chance(&mut self, probability: f64) -> bool;
}

/// ChaCha8-backed noise, reproducible from a seed
pub struct SeededNoise {
    rng: ChaCha8Rng,
}

impl SeededNoise {
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self::from_seed(rand::random())
    }

    /// Independent stream per sensor so adding a sensor does not shift the
    /// sequence of the others
    pub fn for_sensor(seed: Option<u64>, stream: u64) -> Self {
        let mut noise = match seed {
            Some(seed) => Self::from_seed(seed),
            None => Self::from_entropy(),
        };
        noise.rng.set_stream(stream);
        noise
    }
}

impl NoiseSource for SeededNoise {
    fn gaussian(&mut self, mean: f64, std_dev: f64) -> f64 {
        match Normal::new(mean, std_dev) {
            Ok(normal) => normal.sample(&mut self.rng),
            Err(_) => mean,
        }
    }

    fn uniform(&mut self, low: f64, high: f64) -> f64 {
        if low < high {
            self.rng.gen_range(low..=high)
        } else {
            low
        }
    }

    fn chance(&mut self, probability: f64) -> bool {
        self.rng.gen::<f64>() < probability
    }
}
