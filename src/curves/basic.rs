use std::f64::consts::TAU;

use crate::error::{ChoreoError, Result};
use crate::model::{CurveParams, CurvePoint};

use super::{grid, Bound, ParamSpec};

pub const ASCENDING: ParamSpec = ParamSpec::flag("ascending", true);
pub const VALUE: ParamSpec = ParamSpec::number("value", 0.5, Bound::Any);
pub const CYCLES: ParamSpec = ParamSpec::number("cycles", 1.0, Bound::Positive);
/// Offset in cycles, so 0.25 shifts a sine by a quarter period.
pub const PHASE: ParamSpec = ParamSpec::number("phase", 0.0, Bound::Any);
pub const DUTY: ParamSpec = ParamSpec::within("duty", 0.5, 0.0, 1.0);
pub const WIDTH: ParamSpec = ParamSpec::within("width", 0.5, 0.01, 1.0);

pub(super) const LINEAR_PARAMS: &[ParamSpec] = &[ASCENDING];
pub(super) const HOLD_PARAMS: &[ParamSpec] = &[VALUE];
pub(super) const PERIODIC_PARAMS: &[ParamSpec] = &[CYCLES, PHASE];
pub(super) const SQUARE_PARAMS: &[ParamSpec] = &[CYCLES, PHASE, DUTY];
pub(super) const PULSE_PARAMS: &[ParamSpec] = &[CYCLES, PHASE, WIDTH];

/// Position inside the current period, in [0, 1).
fn cycle_position(t: f64, p: &CurveParams) -> f64 {
    (CYCLES.read(p) * t + PHASE.read(p)).rem_euclid(1.0)
}

pub(super) fn linear(t: f64, p: &CurveParams) -> f64 {
    if ASCENDING.read_flag(p) {
        t
    } else {
        1.0 - t
    }
}

pub(super) fn hold(_t: f64, p: &CurveParams) -> f64 {
    VALUE.read(p).clamp(0.0, 1.0)
}

pub(super) fn sine(t: f64, p: &CurveParams) -> f64 {
    0.5 + 0.5 * (TAU * (CYCLES.read(p) * t + PHASE.read(p))).sin()
}

pub(super) fn cosine(t: f64, p: &CurveParams) -> f64 {
    0.5 + 0.5 * (TAU * (CYCLES.read(p) * t + PHASE.read(p))).cos()
}

/// Rises 0 → 1 over the first half of each period and falls back.
pub(super) fn triangle(t: f64, p: &CurveParams) -> f64 {
    let x = cycle_position(t, p);
    if x < 0.5 {
        2.0 * x
    } else {
        2.0 - 2.0 * x
    }
}

pub(super) fn square(t: f64, p: &CurveParams) -> f64 {
    if cycle_position(t, p) < DUTY.read(p) {
        1.0
    } else {
        0.0
    }
}

/// Raised-cosine window centered in each period; zero outside `width`.
pub(super) fn pulse(t: f64, p: &CurveParams) -> f64 {
    let width = WIDTH.read(p);
    let d = (cycle_position(t, p) - 0.5).abs();
    if d >= width / 2.0 {
        0.0
    } else {
        0.5 * (1.0 + (TAU * d / width).cos())
    }
}

fn check_samples(n: usize) -> Result<()> {
    if n < 2 {
        return Err(ChoreoError::validation(
            "sample count",
            format!("need at least 2 samples, got {n}"),
        ));
    }
    Ok(())
}

/// `n` evenly spaced points from 0 to 1, or 1 to 0 when descending.
pub fn generate_linear(n: usize, ascending: bool) -> Result<Vec<CurvePoint>> {
    check_samples(n)?;
    Ok(grid(n)
        .map(|t| CurvePoint::clamped(t, if ascending { t } else { 1.0 - t }))
        .collect())
}

/// `n` points at a constant value, clamped into [0, 1].
pub fn generate_hold(n: usize, value: f64) -> Result<Vec<CurvePoint>> {
    check_samples(n)?;
    let v = value.clamp(0.0, 1.0);
    Ok(grid(n).map(|t| CurvePoint::clamped(t, v)).collect())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use float_cmp::approx_eq;

    use super::*;

    fn values(points: &[CurvePoint]) -> Vec<f64> {
        points.iter().map(CurvePoint::v).collect()
    }

    #[test]
    fn linear_four_points() {
        let v = values(&generate_linear(4, true).unwrap());
        let expected = [0.0, 1.0 / 3.0, 2.0 / 3.0, 1.0];
        assert_eq!(v.len(), 4);
        for (a, b) in v.iter().zip(expected) {
            assert!(approx_eq!(f64, *a, b, epsilon = 1e-9));
        }
        for pair in v.windows(2) {
            let [a, b] = pair else { continue };
            assert!(b > a);
        }
    }

    #[test]
    fn linear_descending() {
        let v = values(&generate_linear(5, false).unwrap());
        assert!(approx_eq!(f64, v[0], 1.0));
        assert!(approx_eq!(f64, v[4], 0.0));
    }

    #[test]
    fn linear_needs_two_samples() {
        assert!(generate_linear(1, true).is_err());
    }

    #[test]
    fn hold_clamps() {
        assert!(values(&generate_hold(4, 1.5).unwrap()).iter().all(|v| approx_eq!(f64, *v, 1.0)));
        assert!(values(&generate_hold(4, -0.5).unwrap()).iter().all(|v| approx_eq!(f64, *v, 0.0)));
    }

    #[test]
    fn sine_quarter_points() {
        let p = CurveParams::new();
        assert!(approx_eq!(f64, sine(0.0, &p), 0.5, epsilon = 1e-12));
        assert!(approx_eq!(f64, sine(0.25, &p), 1.0, epsilon = 1e-12));
        assert!(approx_eq!(f64, sine(0.75, &p), 0.0, epsilon = 1e-12));
        assert!(approx_eq!(f64, cosine(0.0, &p), 1.0, epsilon = 1e-12));
    }

    #[test]
    fn square_respects_duty() {
        let p = CurveParams::new().with_float("duty", 0.25);
        assert!(approx_eq!(f64, square(0.1, &p), 1.0));
        assert!(approx_eq!(f64, square(0.3, &p), 0.0));
    }

    #[test]
    fn triangle_peaks_mid_period() {
        let p = CurveParams::new().with_float("cycles", 2.0);
        assert!(approx_eq!(f64, triangle(0.25, &p), 1.0, epsilon = 1e-12));
        assert!(approx_eq!(f64, triangle(0.5, &p), 0.0, epsilon = 1e-12));
    }

    #[test]
    fn pulse_is_windowed() {
        let p = CurveParams::new().with_float("width", 0.2);
        assert!(approx_eq!(f64, pulse(0.5, &p), 1.0, epsilon = 1e-12));
        assert!(approx_eq!(f64, pulse(0.1, &p), 0.0));
    }
}
