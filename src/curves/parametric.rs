use std::f64::consts::TAU;

use crate::model::CurveParams;

use super::{Bound, ParamSpec};

pub const FREQ_A: ParamSpec = ParamSpec::number("freq_a", 3.0, Bound::Positive);
pub const FREQ_B: ParamSpec = ParamSpec::number("freq_b", 2.0, Bound::Positive);
/// Phase of the first axis relative to the second, in cycles.
pub const DELTA: ParamSpec = ParamSpec::number("delta", 0.25, Bound::Any);
/// Emit the second (vertical) axis instead of the first.
pub const Y_AXIS: ParamSpec = ParamSpec::flag("y_axis", false);

pub const C1: ParamSpec = ParamSpec::within("c1", 0.1, 0.0, 1.0);
pub const C2: ParamSpec = ParamSpec::within("c2", 0.9, 0.0, 1.0);

pub const BEATS: ParamSpec = ParamSpec::number("beats", 4.0, Bound::Positive);
pub const DUTY: ParamSpec = ParamSpec::within("duty", 0.25, 0.01, 1.0);
pub const DECAY: ParamSpec = ParamSpec::number("decay", 4.0, Bound::NonNegative);

pub(super) const LISSAJOUS_PARAMS: &[ParamSpec] = &[FREQ_A, FREQ_B, DELTA, Y_AXIS];
pub(super) const BEZIER_PARAMS: &[ParamSpec] = &[C1, C2];
pub(super) const BEAT_PULSE_PARAMS: &[ParamSpec] = &[BEATS, DUTY, DECAY];

/// One axis of a Lissajous figure, normalized to [0, 1].
pub(super) fn lissajous(t: f64, p: &CurveParams) -> f64 {
    let angle = if Y_AXIS.read_flag(p) {
        TAU * FREQ_B.read(p) * t
    } else {
        TAU * (FREQ_A.read(p) * t + DELTA.read(p))
    };
    0.5 + 0.5 * angle.sin()
}

/// Cubic Bézier in value space from 0 to 1 with control values `c1`, `c2`.
pub(super) fn bezier(t: f64, p: &CurveParams) -> f64 {
    let (c1, c2) = (C1.read(p), C2.read(p));
    let u = 1.0 - t;
    3.0 * u * u * t * c1 + 3.0 * u * t * t * c2 + t * t * t
}

/// Beat-synchronized pulses: each beat fires at full level and decays
/// exponentially over the `duty` share of the beat, then stays dark.
pub(super) fn beat_pulse(t: f64, p: &CurveParams) -> f64 {
    let duty = DUTY.read(p);
    let x = (BEATS.read(p) * t).fract();
    if x < duty {
        (-DECAY.read(p) * x / duty).exp()
    } else {
        0.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn lissajous_axes_differ() {
        let p = CurveParams::new();
        let py = CurveParams::new().with_bool("y_axis", true);
        assert!((lissajous(0.0, &p) - 1.0).abs() < 1e-12);
        assert!((lissajous(0.0, &py) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn bezier_endpoints() {
        let p = CurveParams::new().with_float("c1", 0.0).with_float("c2", 1.0);
        assert!(bezier(0.0, &p).abs() < 1e-12);
        assert!((bezier(1.0, &p) - 1.0).abs() < 1e-12);
        assert!((bezier(0.5, &p) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn beat_pulse_fires_on_each_beat() {
        let p = CurveParams::new();
        for beat in 0..4 {
            let t = f64::from(beat) / 4.0 + 1e-9;
            assert!(beat_pulse(t, &p) > 0.99);
        }
        assert!(beat_pulse(0.2, &p).abs() < 1e-12);
    }
}
