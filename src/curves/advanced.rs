use std::f64::consts::PI;

use crate::model::{CurveParams, EasingFunction};
use crate::util::lerp;

use super::ParamSpec;

pub const START: ParamSpec = ParamSpec::within("start", 0.2, 0.0, 1.0);
/// Value reached at the bottom of the wind-up.
pub const PULLBACK: ParamSpec = ParamSpec::within("pullback", 0.0, 0.0, 1.0);
pub const AMOUNT: ParamSpec = ParamSpec::within("amount", 0.15, 0.0, 0.5);
pub const OSCILLATIONS: ParamSpec = ParamSpec::within("oscillations", 2.0, 0.5, 8.0);

pub(super) const ANTICIPATE_PARAMS: &[ParamSpec] = &[START, PULLBACK];
pub(super) const OVERSHOOT_PARAMS: &[ParamSpec] = &[AMOUNT, OSCILLATIONS];

/// Share of the curve spent winding back before the main move.
const WIND_UP: f64 = 0.3;
const SETTLE_START: f64 = 0.4;
const SETTLE_END: f64 = 0.9;

/// Dips from `start` to `pullback` over the wind-up, then eases up to 1.
pub(super) fn anticipate(t: f64, p: &CurveParams) -> f64 {
    let start = START.read(p);
    let pullback = PULLBACK.read(p);
    if t < WIND_UP {
        lerp(start, pullback, EasingFunction::EaseOutQuad.evaluate(t / WIND_UP))
    } else {
        let u = (t - WIND_UP) / (1.0 - WIND_UP);
        lerp(pullback, 1.0, EasingFunction::EaseInOutCubic.evaluate(u))
    }
}

/// Smoothstep rise with a damped wobble while settling.
pub(super) fn overshoot(t: f64, p: &CurveParams) -> f64 {
    let base = t * t * (3.0 - 2.0 * t);
    if !(SETTLE_START..=SETTLE_END).contains(&t) {
        return base;
    }
    let w = (t - SETTLE_START) / (SETTLE_END - SETTLE_START);
    let wobble = AMOUNT.read(p) * (PI * OSCILLATIONS.read(p) * w).sin() * (1.0 - w);
    (base + wobble).clamp(0.0, 1.0)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn anticipate_dips_then_rises() {
        let p = CurveParams::new();
        assert!((anticipate(0.0, &p) - 0.2).abs() < 1e-12);
        assert!(anticipate(0.29, &p) < 0.2);
        assert!((anticipate(1.0, &p) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn overshoot_stays_in_unit_range() {
        let p = CurveParams::new().with_float("amount", 0.5);
        for i in 0..=100 {
            let v = overshoot(f64::from(i) / 100.0, &p);
            assert!((0.0..=1.0).contains(&v));
        }
        assert!((overshoot(1.0, &p) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn overshoot_wobbles_inside_window() {
        let p = CurveParams::new();
        let t = 0.525;
        let base = t * t * (3.0 - 2.0 * t);
        assert!((overshoot(t, &p) - base).abs() > 1e-3);
        assert!((overshoot(0.2, &p) - 0.2 * 0.2 * (3.0 - 0.4)).abs() < 1e-12);
    }
}
