//! Uniform sampling on top of a raw [`Rng`].
//!
//! Kept local so that every random draw of the simulation goes through
//! the scheduler's single seedable generator.

use rand_core::Rng;
use std::time::Duration;

/// A uniform sample in `[0.0, 1.0)`.
pub(crate) fn unit<R: Rng>(rng: &mut R) -> f64 {
    let bits = rng.next_u64();
    (bits as f64) * (1.0 / (u64::MAX as f64 + 1.0))
}

/// A uniform sample in `[-amplitude, +amplitude)`.
pub(crate) fn symmetric<R: Rng>(rng: &mut R, amplitude: f64) -> f64 {
    if amplitude <= 0.0 {
        return 0.0;
    }
    (unit(rng) * 2.0 - 1.0) * amplitude
}

/// A uniform duration in `[min, max]`, at micro second precision.
pub(crate) fn duration_between<R: Rng>(rng: &mut R, min: Duration, max: Duration) -> Duration {
    let min_us = min.as_micros() as u64;
    let max_us = max.as_micros() as u64;
    if max_us <= min_us {
        return min;
    }
    let span = max_us - min_us + 1;
    Duration::from_micros(min_us + rng.next_u64() % span)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_chacha::ChaChaRng;
    use rand_core::SeedableRng as _;

    #[test]
    fn unit_in_range() {
        let mut rng = ChaChaRng::seed_from_u64(7);
        for _ in 0..10_000 {
            let v = unit(&mut rng);
            assert!((0.0..1.0).contains(&v), "{v} out of range");
        }
    }

    #[test]
    fn symmetric_in_range() {
        let mut rng = ChaChaRng::seed_from_u64(7);
        for _ in 0..10_000 {
            let v = symmetric(&mut rng, 5.0);
            assert!((-5.0..5.0).contains(&v), "{v} out of range");
        }
        assert_eq!(symmetric(&mut rng, 0.0), 0.0);
    }

    #[test]
    fn duration_between_bounds() {
        let mut rng = ChaChaRng::seed_from_u64(7);
        let min = Duration::from_millis(50);
        let max = Duration::from_millis(150);
        for _ in 0..10_000 {
            let d = duration_between(&mut rng, min, max);
            assert!(d >= min && d <= max, "{d:?} out of range");
        }
    }

    #[test]
    fn duration_between_degenerate() {
        let mut rng = ChaChaRng::seed_from_u64(7);
        let d = Duration::from_millis(100);
        assert_eq!(duration_between(&mut rng, d, d), d);
        assert_eq!(duration_between(&mut rng, d, Duration::ZERO), d);
    }
}
