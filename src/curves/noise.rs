//! Deterministic gradient noise. No RNG state: a fixed permutation table,
//! offset by the seed.

use crate::model::CurveParams;

use super::{Bound, ParamSpec};

pub const SEED: ParamSpec = ParamSpec::number("seed", 0.0, Bound::NonNegative);
/// Noise features per curve.
pub const FREQUENCY: ParamSpec = ParamSpec::number("frequency", 4.0, Bound::Positive);
pub const OCTAVES: ParamSpec = ParamSpec::within("octaves", 1.0, 1.0, 8.0);

pub(super) const NOISE_PARAMS: &[ParamSpec] = &[SEED, FREQUENCY, OCTAVES];

const P: [u8; 256] = [
    151, 160, 137, 91, 90, 15, 131, 13, 201, 95, 96, 53, 194, 233, 7, 225,
    140, 36, 103, 30, 69, 142, 8, 99, 37, 240, 21, 10, 23, 190, 6, 148,
    247, 120, 234, 75, 0, 26, 197, 62, 94, 252, 219, 203, 117, 35, 11, 32,
    57, 177, 33, 88, 237, 149, 56, 87, 174, 20, 125, 136, 171, 168, 68, 175,
    74, 165, 71, 134, 139, 48, 27, 166, 77, 146, 158, 231, 83, 111, 229, 122,
    60, 211, 133, 230, 220, 105, 92, 41, 55, 46, 245, 40, 244, 102, 143, 54,
    65, 25, 63, 161, 1, 216, 80, 73, 209, 76, 132, 187, 208, 89, 18, 169,
    200, 196, 135, 130, 116, 188, 159, 86, 164, 100, 109, 198, 173, 186, 3, 64,
    52, 217, 226, 250, 124, 123, 5, 202, 38, 147, 118, 126, 255, 82, 85, 212,
    207, 206, 59, 227, 47, 16, 58, 17, 182, 189, 28, 42, 223, 183, 170, 213,
    119, 248, 152, 2, 44, 154, 163, 70, 221, 153, 101, 155, 167, 43, 172, 9,
    129, 22, 39, 253, 19, 98, 108, 110, 79, 113, 224, 232, 178, 185, 112, 104,
    218, 246, 97, 228, 251, 34, 242, 193, 238, 210, 144, 12, 191, 179, 162, 241,
    81, 51, 145, 235, 249, 14, 239, 107, 49, 192, 214, 31, 181, 199, 106, 157,
    184, 84, 204, 176, 115, 121, 50, 45, 127, 4, 150, 254, 138, 236, 205, 93,
    222, 114, 67, 29, 24, 72, 243, 141, 128, 195, 78, 66, 215, 61, 156, 180,
];

#[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
fn perm(i: i64) -> u8 {
    // masked into 0..=255
    P.get((i & 255) as usize).copied().unwrap_or(0)
}

#[inline]
fn fade(t: f64) -> f64 {
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

#[inline]
fn grad(hash: u8, x: f64) -> f64 {
    if hash & 1 == 0 {
        x
    } else {
        -x
    }
}

/// Seed → integer lattice offset, so different seeds read different stretches
/// of the permutation table.
#[allow(clippy::cast_possible_truncation)]
fn seed_offset(seed: f64) -> i64 {
    (seed.floor() as i64).wrapping_mul(37)
}

/// 1D Perlin noise, roughly in [-0.5, 0.5].
#[allow(clippy::cast_possible_truncation)]
pub fn perlin1(x: f64, seed: i64) -> f64 {
    let xi = x.floor() as i64 + seed;
    let xf = x - x.floor();
    let u = fade(xf);
    let a = grad(perm(xi), xf);
    let b = grad(perm(xi + 1), xf - 1.0);
    a + u * (b - a)
}

/// 1D simplex noise, in [-1, 1].
#[allow(clippy::cast_possible_truncation)]
pub fn simplex1(x: f64, seed: i64) -> f64 {
    let i0 = x.floor() as i64;
    let x0 = x - x.floor();
    let x1 = x0 - 1.0;
    let corner = |i: i64, d: f64| {
        let t = 1.0 - d * d;
        if t <= 0.0 {
            return 0.0;
        }
        let h = perm(i + seed) & 15;
        let mut g = 1.0 + f64::from(h & 7);
        if h & 8 != 0 {
            g = -g;
        }
        let t2 = t * t;
        t2 * t2 * g * d
    };
    (0.395 * (corner(i0, x0) + corner(i0 + 1, x1))).clamp(-1.0, 1.0)
}

/// Octave sum with halving amplitude, normalized back to the single-octave range.
fn fractal(x: f64, p: &CurveParams, base: impl Fn(f64, i64) -> f64) -> f64 {
    let seed = seed_offset(SEED.read(p));
    let octaves = OCTAVES.read(p).round().clamp(1.0, 8.0);
    let mut sum = 0.0;
    let mut amplitude = 1.0;
    let mut frequency = 1.0;
    let mut norm = 0.0;
    let mut octave = 0.0;
    while octave < octaves {
        sum += amplitude * base(x * frequency, seed);
        norm += amplitude;
        amplitude *= 0.5;
        frequency *= 2.0;
        octave += 1.0;
    }
    sum / norm
}

pub(super) fn perlin_curve(t: f64, p: &CurveParams) -> f64 {
    let n = fractal(t * FREQUENCY.read(p), p, perlin1);
    (0.5 + n).clamp(0.0, 1.0)
}

pub(super) fn simplex_curve(t: f64, p: &CurveParams) -> f64 {
    let n = fractal(t * FREQUENCY.read(p), p, simplex1);
    (0.5 + 0.5 * n).clamp(0.0, 1.0)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn perlin_is_zero_on_lattice() {
        for i in 0..8 {
            assert!(perlin1(f64::from(i), 0).abs() < 1e-12);
        }
    }

    #[test]
    fn seeds_change_output() {
        let a = CurveParams::new().with_float("seed", 1.0);
        let b = CurveParams::new().with_float("seed", 2.0);
        let differs = (1..32).any(|i| {
            let t = f64::from(i) / 32.0;
            (perlin_curve(t, &a) - perlin_curve(t, &b)).abs() > 1e-6
        });
        assert!(differs);
    }

    #[test]
    fn simplex_stays_in_range() {
        let p = CurveParams::new().with_float("octaves", 4.0);
        for i in 0..=256 {
            let v = simplex_curve(f64::from(i) / 256.0, &p);
            assert!((0.0..=1.0).contains(&v));
        }
    }
}
