use crate::model::easing;
use crate::model::CurveParams;

use super::ParamSpec;

/// Peak height relative to the travel; values below 1 behave as 1.
pub const AMPLITUDE: ParamSpec = ParamSpec::within("amplitude", 1.0, 0.0, 3.0);
pub const PERIOD: ParamSpec = ParamSpec::within("period", 0.3, 0.05, 2.0);

pub(super) const ELASTIC_PARAMS: &[ParamSpec] = &[AMPLITUDE, PERIOD];

pub(super) fn bounce_in(t: f64) -> f64 {
    1.0 - easing::bounce_out(1.0 - t)
}

pub(super) fn bounce_out(t: f64) -> f64 {
    easing::bounce_out(t)
}

pub(super) fn elastic_in(t: f64, p: &CurveParams) -> f64 {
    easing::elastic_in(t, AMPLITUDE.read(p), PERIOD.read(p))
}

pub(super) fn elastic_out(t: f64, p: &CurveParams) -> f64 {
    easing::elastic_out(t, AMPLITUDE.read(p), PERIOD.read(p))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::curves::{evaluate, CurveId};
    use crate::model::OVERSHOOT_MARGIN;

    #[test]
    fn bounce_endpoints() {
        assert!(bounce_in(0.0).abs() < 1e-9);
        assert!((bounce_in(1.0) - 1.0).abs() < 1e-9);
        assert!((bounce_out(1.0) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn strong_elastic_is_bounded() {
        let p = CurveParams::new().with_float("amplitude", 3.0);
        for i in 0..=200 {
            let v = evaluate(CurveId::ElasticOut, f64::from(i) / 200.0, &p);
            assert!(v <= 1.0 + OVERSHOOT_MARGIN && v >= -OVERSHOOT_MARGIN);
        }
    }

    #[test]
    fn elastic_in_dips_below_zero() {
        let p = CurveParams::new();
        let min = (0..=200)
            .map(|i| evaluate(CurveId::ElasticIn, f64::from(i) / 200.0, &p))
            .fold(f64::MAX, f64::min);
        assert!(min < 0.0);
    }
}
