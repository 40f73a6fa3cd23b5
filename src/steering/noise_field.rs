//! Deterministic seed-keyed gradient noise.
//!
//! Wander and speed variation read smooth noise through a [`NoiseBank`]: an
//! explicit seed → generator map owned by the caller. There is no hidden
//! global generator, so tests can build a fresh bank and get identical
//! samples every run.
//!
//! Sampling takes `&self` so a bank can be shared read-only across a parallel
//! fan-out. Seeds that were never [`prepare`](NoiseBank::prepare)d are built
//! on the fly for that sample instead of being cached.

use std::borrow::Cow;

use noise::{NoiseFn, Perlin};
use rustc_hash::FxHashMap;

/// Second coordinate used for 1-D sampling. Off-lattice so the sampled line
/// never collapses onto Perlin's zero-valued grid points.
const LINE_OFFSET: f64 = 0.371;

/// Seed → Perlin generator map.
#[derive(Debug, Default, Clone)]
pub struct NoiseBank {
    generators: FxHashMap<u32, Perlin>,
}

impl NoiseBank {
    /// Create an empty bank.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build and cache generators for the given seeds.
    pub fn prepare(&mut self, seeds: impl IntoIterator<Item = u32>) {
        for seed in seeds {
            self.generators
                .entry(seed)
                .or_insert_with(|| Perlin::new(seed));
        }
    }

    /// Number of cached generators.
    #[must_use]
    pub fn len(&self) -> usize {
        self.generators.len()
    }

    /// Whether no generators are cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.generators.is_empty()
    }

    /// Drop every cached generator.
    pub fn clear(&mut self) {
        self.generators.clear();
    }

    fn generator(&self, seed: u32) -> Cow<'_, Perlin> {
        match self.generators.get(&seed) {
            Some(generator) => Cow::Borrowed(generator),
            None => Cow::Owned(Perlin::new(seed)),
        }
    }

    /// Sample 1-D noise along `cursor`. Output is in [-1, 1].
    #[must_use]
    pub fn sample_1d(&self, seed: u32, cursor: f32) -> f32 {
        self.sample_2d(seed, f64::from(cursor), LINE_OFFSET)
    }

    /// Sample 2-D noise. Output is in [-1, 1]; non-finite input yields 0.
    #[must_use]
    pub fn sample_2d(&self, seed: u32, x: f64, y: f64) -> f32 {
        if !x.is_finite() || !y.is_finite() {
            return 0.0;
        }
        let value = self.generator(seed).get([x, y]);
        (value as f32).clamp(-1.0, 1.0)
    }
}
