//! Gamma/Beta sampling primitives for the Thompson-sampling weight
//! learner (spec.md §4.3).
//!
//! All sampling takes a `rand::Rng` by reference so tests can seed it
//! (spec.md §9, "Randomness") — the engine never reads the process
//! entropy pool directly.

use rand::Rng;
use rand_distr::StandardNormal;

/// Sample `Gamma(shape, 1)` via Marsaglia–Tsang (2000).
///
/// For `shape >= 1` this is the direct rejection-sampling algorithm.
/// For `shape < 1` we use the boost identity
/// `Gamma(k) = Gamma(k+1) * U^(1/k)` (spec.md §4.3 step 1).
#[must_use]
pub fn sample_gamma<R: Rng + ?Sized>(rng: &mut R, shape: f64) -> f64 {
    if shape < 1.0 {
        let u: f64 = rng.random_range(1e-12..1.0);
        return sample_gamma(rng, shape + 1.0) * u.powf(1.0 / shape);
    }

    let d = shape - 1.0 / 3.0;
    let c = 1.0 / (9.0 * d).sqrt();

    loop {
        let mut v;
        let mut z: f64;
        loop {
            z = rng.sample(StandardNormal);
            v = (1.0 + c * z).powi(3);
            if v > 0.0 {
                break;
            }
        }

        let u: f64 = rng.random_range(0.0..1.0);
        let z4 = z * z * z * z;
        if u < 1.0 - 0.0331 * z4 {
            return d * v;
        }
        if u.ln() < 0.5 * z * z + d * (1.0 - v + v.ln()) {
            return d * v;
        }
    }
}

/// Sample `Beta(alpha, beta)` as `X / (X + Y)` with `X ~ Gamma(alpha,
/// 1)`, `Y ~ Gamma(beta, 1)` (spec.md §4.3 step 2). Guards against a
/// degenerate `X + Y` by returning 0.5.
#[must_use]
pub fn sample_beta<R: Rng + ?Sized>(rng: &mut R, alpha: f64, beta: f64) -> f64 {
    let x = sample_gamma(rng, alpha);
    let y = sample_gamma(rng, beta);
    let sum = x + y;
    if sum < 1e-12 {
        0.5
    } else {
        x / sum
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn beta_samples_stay_in_unit_interval() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        for _ in 0..1000 {
            let s = sample_beta(&mut rng, 2.0, 5.0);
            assert!((0.0..=1.0).contains(&s));
        }
    }

    #[test]
    fn gamma_shape_below_one_is_positive() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..200 {
            assert!(sample_gamma(&mut rng, 0.3) >= 0.0);
        }
    }

    #[test]
    fn beta_mean_converges_to_alpha_over_alpha_plus_beta() {
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        let (alpha, beta) = (3.0, 3.0);
        let n = 20_000;
        let mean: f64 =
            (0..n).map(|_| sample_beta(&mut rng, alpha, beta)).sum::<f64>() / f64::from(n);
        let expected = alpha / (alpha + beta);
        assert!((mean - expected).abs() < 0.02, "mean={mean}");
    }
}
