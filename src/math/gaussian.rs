//! Discrete Gaussian and key sampling
//!
//! All randomness used by key generation and encryption flows through one
//! ChaCha20 stream owned by [`GaussianSampler`], so a session can be made
//! reproducible by seeding it.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

/// Default Gaussian standard deviation
pub const DEFAULT_SIGMA: f64 = 3.2;

/// Discrete Gaussian sampler over Z using rejection sampling
#[derive(Clone)]
pub struct GaussianSampler {
    /// Standard deviation σ
    sigma: f64,
    /// Tailcut: reject samples beyond this many units
    tailcut: usize,
    rng: ChaCha20Rng,
}

impl GaussianSampler {
    /// Create a sampler seeded from OS entropy
    pub fn new(sigma: f64) -> Self {
        Self::from_rng(sigma, ChaCha20Rng::from_entropy())
    }

    /// Create a sampler with a fixed seed for deterministic sampling
    pub fn with_seed(sigma: f64, seed: u64) -> Self {
        Self::from_rng(sigma, ChaCha20Rng::seed_from_u64(seed))
    }

    fn from_rng(sigma: f64, rng: ChaCha20Rng) -> Self {
        let tailcut = (sigma * 6.0).ceil() as usize;
        Self {
            sigma,
            tailcut,
            rng,
        }
    }

    /// Get the standard deviation
    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    /// Sample a single value from the discrete Gaussian D_σ
    pub fn sample(&mut self) -> i64 {
        let sigma_sq_2 = 2.0 * self.sigma * self.sigma;
        let bound = self.tailcut as i64;

        loop {
            let x = self.rng.gen_range(-bound..=bound);
            let prob = (-((x * x) as f64) / sigma_sq_2).exp();
            let u: f64 = self.rng.gen();
            if u < prob {
                return x;
            }
        }
    }

    /// Sample a Gaussian value represented in Z_q
    pub fn sample_centered(&mut self, q: u64) -> u64 {
        let s = self.sample();
        if s >= 0 {
            s as u64
        } else {
            q - ((-s) as u64)
        }
    }

    /// Sample a vector of Gaussian values as unsigned mod q
    pub fn sample_vec_centered(&mut self, len: usize, q: u64) -> Vec<u64> {
        (0..len).map(|_| self.sample_centered(q)).collect()
    }

    /// Sample a vector of uniform ternary values {-1, 0, 1} represented in Z_q
    pub fn sample_ternary_vec(&mut self, len: usize, q: u64) -> Vec<u64> {
        (0..len)
            .map(|_| match self.rng.gen_range(0u8..3) {
                0 => q - 1,
                1 => 0,
                _ => 1,
            })
            .collect()
    }

    /// Sample a vector of uniform values in [0, q)
    pub fn uniform_vec(&mut self, len: usize, q: u64) -> Vec<u64> {
        (0..len).map(|_| self.rng.gen_range(0..q)).collect()
    }
}

impl std::fmt::Debug for GaussianSampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GaussianSampler")
            .field("sigma", &self.sigma)
            .field("tailcut", &self.tailcut)
            .finish()
    }
}
