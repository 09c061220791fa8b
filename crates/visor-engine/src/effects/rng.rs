//! Randomness source for effects.
//!
//! Effects draw small amounts of cheap randomness — wiggle retarget
//! intervals and directions, gaussian shake offsets, glare band
//! placement — and every draw must replay identically from a seed so
//! tests can pin their sequences. A xorshift64 walker behind the
//! float-shaped accessors the effects actually use covers that without
//! an external generator.

use std::f32::consts::TAU;

/// Seedable generator handing out uniform floats and normal samples.
#[derive(Debug, Clone)]
pub struct Rng {
    state: u64,
}

impl Rng {
    /// Seeded generator; equal seeds replay the same draw sequence.
    pub fn new(seed: u64) -> Self {
        // Scramble the seed so small neighboring seeds don't start on
        // neighboring orbits. The low bit keeps state nonzero, which
        // would otherwise freeze the walker.
        Rng {
            state: seed.wrapping_mul(0x9E37_79B9_7F4A_7C15) | 1,
        }
    }

    /// Seed from the wall clock, for effects created without a seed.
    pub fn from_time() -> Self {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| u64::from(d.subsec_nanos()) ^ d.as_secs())
            .unwrap_or(0x5EED);
        Self::new(nanos)
    }

    /// One xorshift64 step of the walker.
    fn step(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    /// Uniform float in [0, 1), from the walker's top 24 bits.
    pub fn next_f32(&mut self) -> f32 {
        (self.step() >> 40) as f32 / (1u64 << 24) as f32
    }

    /// Uniform float in [lo, hi).
    pub fn range(&mut self, lo: f32, hi: f32) -> f32 {
        lo + (hi - lo) * self.next_f32()
    }

    /// Standard normal sample (Box–Muller).
    pub fn next_normal(&mut self) -> f32 {
        let u1 = self.next_f32().max(1e-7);
        let u2 = self.next_f32();
        (-2.0 * u1.ln()).sqrt() * (TAU * u2).cos()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_seeds_replay_the_same_draws() {
        // The mix of accessors an effect makes per tick (an interval, a
        // direction component, a jitter sample) must replay verbatim.
        let mut a = Rng::new(42);
        let mut b = Rng::new(42);
        for _ in 0..10 {
            assert_eq!(a.range(1.8, 3.2), b.range(1.8, 3.2));
            assert_eq!(a.next_normal(), b.next_normal());
            assert_eq!(a.next_f32(), b.next_f32());
        }
    }

    #[test]
    fn neighboring_seeds_diverge() {
        let mut a = Rng::new(7);
        let mut b = Rng::new(8);
        let drawn_a: Vec<f32> = (0..4).map(|_| a.next_f32()).collect();
        let drawn_b: Vec<f32> = (0..4).map(|_| b.next_f32()).collect();
        assert_ne!(drawn_a, drawn_b);
    }

    #[test]
    fn zero_seed_still_walks() {
        let mut rng = Rng::new(0);
        let first = rng.next_f32();
        let second = rng.next_f32();
        assert_ne!(first, second);
    }

    #[test]
    fn next_f32_in_unit_interval() {
        let mut rng = Rng::new(7);
        for _ in 0..1000 {
            let v = rng.next_f32();
            assert!((0.0..1.0).contains(&v));
        }
    }

    #[test]
    fn range_respects_bounds() {
        let mut rng = Rng::new(9);
        for _ in 0..1000 {
            let v = rng.range(-2.0, 3.0);
            assert!((-2.0..3.0).contains(&v));
        }
    }

    #[test]
    fn normal_is_roughly_centered() {
        let mut rng = Rng::new(11);
        let mean: f32 = (0..4000).map(|_| rng.next_normal()).sum::<f32>() / 4000.0;
        assert!(mean.abs() < 0.1, "mean was {}", mean);
    }
}
