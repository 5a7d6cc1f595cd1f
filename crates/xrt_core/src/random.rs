//! Seeded random streams.
//!
//! Every stochastic step derives its own `StdRng` from a base seed and a
//! stream index, so the same inputs always give the same photons no matter
//! how a pipeline is split or how often a stage is re-run.

use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;

/// Derive an independent RNG for `stream` from `seed`.
pub fn stream_rng(seed: u64, stream: u64) -> StdRng {
    // splitmix64 finalizer so neighbouring streams do not correlate
    let mut z = seed ^ stream.wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    StdRng::seed_from_u64(z ^ (z >> 31))
}

/// Sample a zero-mean normal deviate with standard deviation `sigma`.
///
/// Returns exactly 0 for `sigma == 0` so that a zero perturbation leaves
/// geometry untouched, but still consumes the same number of draws.
pub fn gaussian<R: Rng + ?Sized>(rng: &mut R, sigma: f64) -> f64 {
    // Box-Muller, U in (0, 1]
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = rng.gen();
    let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    if sigma == 0.0 {
        0.0
    } else {
        z * sigma
    }
}
