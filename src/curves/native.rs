//! Generators that mirror the device's own parametric curve types.
//!
//! Parameters `p1..p4` use the device's 0–100 scale so a segment driven by
//! one of these can be emitted in the compact native form instead of a
//! sampled point list.

use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};
use strum_macros::EnumIter;

use crate::model::CurveParams;
use crate::util::lerp;

use super::{CurveId, ParamSpec};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter)]
pub enum NativeCurveType {
    #[serde(rename = "Flat")]
    Flat,
    #[serde(rename = "Ramp")]
    Ramp,
    #[serde(rename = "Ramp Up/Down")]
    RampUpDown,
    #[serde(rename = "Sine")]
    Sine,
    #[serde(rename = "Abs Sine")]
    AbsSine,
    #[serde(rename = "Parabolic")]
    Parabolic,
    #[serde(rename = "Logarithmic")]
    Logarithmic,
    #[serde(rename = "Exponential")]
    Exponential,
    #[serde(rename = "Saw Tooth")]
    SawTooth,
}

impl NativeCurveType {
    pub fn device_name(self) -> &'static str {
        match self {
            NativeCurveType::Flat => "Flat",
            NativeCurveType::Ramp => "Ramp",
            NativeCurveType::RampUpDown => "Ramp Up/Down",
            NativeCurveType::Sine => "Sine",
            NativeCurveType::AbsSine => "Abs Sine",
            NativeCurveType::Parabolic => "Parabolic",
            NativeCurveType::Logarithmic => "Logarithmic",
            NativeCurveType::Exponential => "Exponential",
            NativeCurveType::SawTooth => "Saw Tooth",
        }
    }

    pub fn from_curve_id(id: CurveId) -> Option<Self> {
        Some(match id {
            CurveId::NativeFlat => NativeCurveType::Flat,
            CurveId::NativeRamp => NativeCurveType::Ramp,
            CurveId::NativeRampUpDown => NativeCurveType::RampUpDown,
            CurveId::NativeSine => NativeCurveType::Sine,
            CurveId::NativeAbsSine => NativeCurveType::AbsSine,
            CurveId::NativeParabolic => NativeCurveType::Parabolic,
            CurveId::NativeLogarithmic => NativeCurveType::Logarithmic,
            CurveId::NativeExponential => NativeCurveType::Exponential,
            CurveId::NativeSawTooth => NativeCurveType::SawTooth,
            _ => return None,
        })
    }

    /// `p1..p4` as the device expects them, with defaults filled in.
    pub fn device_params(self, params: &CurveParams) -> [f64; 4] {
        let specs = params_for_type(self);
        let mut out = [0.0; 4];
        for (slot, spec) in out.iter_mut().zip(specs) {
            *slot = spec.read(params);
        }
        out
    }
}

const fn p(key: &'static str, default: f64) -> ParamSpec {
    ParamSpec::within(key, default, 0.0, 100.0)
}

/// Rates must stay above zero for the log/exp shapes to be defined.
const fn rate(default: f64) -> ParamSpec {
    ParamSpec::within("p1", default, 1.0, 100.0)
}

const FLAT: &[ParamSpec] = &[p("p1", 50.0)];
const RAMP: &[ParamSpec] = &[p("p1", 0.0), p("p2", 100.0)];
const RAMP_UP_DOWN: &[ParamSpec] = &[p("p1", 0.0), p("p2", 100.0), p("p3", 0.0)];
// p1 phase (% of a period), p2 amplitude, p3 cycles × 10, p4 center.
const SINE: &[ParamSpec] = &[p("p1", 0.0), p("p2", 50.0), p("p3", 10.0), p("p4", 50.0)];
const ABS_SINE: &[ParamSpec] = &[p("p1", 0.0), p("p2", 100.0), p("p3", 5.0), p("p4", 0.0)];
// p1 curvature, p2 vertex position, p3 vertex value.
const PARABOLIC: &[ParamSpec] = &[p("p1", 100.0), p("p2", 50.0), p("p3", 0.0)];
const LOGARITHMIC: &[ParamSpec] = &[rate(50.0), p("p2", 0.0)];
const EXPONENTIAL: &[ParamSpec] = &[rate(50.0)];
const SAW_TOOTH: &[ParamSpec] = &[p("p1", 0.0), p("p2", 100.0), p("p3", 10.0)];

fn params_for_type(kind: NativeCurveType) -> &'static [ParamSpec] {
    match kind {
        NativeCurveType::Flat => FLAT,
        NativeCurveType::Ramp => RAMP,
        NativeCurveType::RampUpDown => RAMP_UP_DOWN,
        NativeCurveType::Sine => SINE,
        NativeCurveType::AbsSine => ABS_SINE,
        NativeCurveType::Parabolic => PARABOLIC,
        NativeCurveType::Logarithmic => LOGARITHMIC,
        NativeCurveType::Exponential => EXPONENTIAL,
        NativeCurveType::SawTooth => SAW_TOOTH,
    }
}

pub(super) fn params_for(id: CurveId) -> &'static [ParamSpec] {
    NativeCurveType::from_curve_id(id).map_or(&[], params_for_type)
}

/// Fractional part that reports 1.0 (not 0.0) at the end of a whole cycle,
/// so the final sample of a one-cycle sawtooth lands on its peak.
fn cycle_fraction(x: f64) -> f64 {
    let f = x.fract();
    if f == 0.0 && x > 0.0 {
        1.0
    } else {
        f
    }
}

pub(super) fn evaluate(id: CurveId, t: f64, params: &CurveParams) -> f64 {
    let Some(kind) = NativeCurveType::from_curve_id(id) else {
        return t;
    };
    let [p1, p2, p3, p4] = kind.device_params(params);
    let v = match kind {
        NativeCurveType::Flat => p1,
        NativeCurveType::Ramp => lerp(p1, p2, t),
        NativeCurveType::RampUpDown => {
            if t < 0.5 {
                lerp(p1, p2, t * 2.0)
            } else {
                lerp(p2, p3, t * 2.0 - 1.0)
            }
        }
        NativeCurveType::Sine => p4 + p2 * (TAU * (p3 / 10.0) * t + p1 / 100.0 * TAU).sin(),
        NativeCurveType::AbsSine => {
            p4 + p2 * (TAU * (p3 / 10.0) * t + p1 / 100.0 * TAU).sin().abs()
        }
        NativeCurveType::Parabolic => {
            let d = t - p2 / 100.0;
            p3 + p1 * 4.0 * d * d
        }
        NativeCurveType::Logarithmic => {
            let k = p1 / 10.0;
            100.0 * (1.0 + k * t).ln() / (1.0 + k).ln() + p2
        }
        NativeCurveType::Exponential => {
            let k = p1 / 10.0;
            100.0 * ((k * t).exp() - 1.0) / (k.exp() - 1.0)
        }
        NativeCurveType::SawTooth => lerp(p1, p2, cycle_fraction(p3 / 10.0 * t)),
    };
    (v / 100.0).clamp(0.0, 1.0)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    fn eval(id: CurveId, t: f64, params: &CurveParams) -> f64 {
        evaluate(id, t, params)
    }

    #[test]
    fn every_type_has_a_curve_id() {
        let mapped: Vec<NativeCurveType> = CurveId::iter()
            .filter_map(NativeCurveType::from_curve_id)
            .collect();
        assert_eq!(mapped.len(), NativeCurveType::iter().count());
    }

    #[test]
    fn device_names_match_serde() {
        for kind in NativeCurveType::iter() {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json.trim_matches('"'), kind.device_name());
        }
    }

    #[test]
    fn ramp_uses_percent_scale() {
        let p = CurveParams::new().with_float("p1", 20.0).with_float("p2", 80.0);
        assert!((eval(CurveId::NativeRamp, 0.0, &p) - 0.2).abs() < 1e-12);
        assert!((eval(CurveId::NativeRamp, 0.5, &p) - 0.5).abs() < 1e-12);
        assert!((eval(CurveId::NativeRamp, 1.0, &p) - 0.8).abs() < 1e-12);
    }

    #[test]
    fn sine_default_is_one_centered_cycle() {
        let p = CurveParams::new();
        assert!((eval(CurveId::NativeSine, 0.0, &p) - 0.5).abs() < 1e-12);
        assert!((eval(CurveId::NativeSine, 0.25, &p) - 1.0).abs() < 1e-12);
        assert!(eval(CurveId::NativeSine, 0.75, &p).abs() < 1e-12);
    }

    #[test]
    fn log_and_exp_span_unit_range() {
        let p = CurveParams::new();
        for id in [CurveId::NativeLogarithmic, CurveId::NativeExponential] {
            assert!(eval(id, 0.0, &p).abs() < 1e-12, "{id:?}");
            assert!((eval(id, 1.0, &p) - 1.0).abs() < 1e-12, "{id:?}");
        }
        assert!(eval(CurveId::NativeLogarithmic, 0.5, &p) > 0.5);
        assert!(eval(CurveId::NativeExponential, 0.5, &p) < 0.5);
    }

    #[test]
    fn saw_tooth_ends_on_peak() {
        let p = CurveParams::new();
        assert!((eval(CurveId::NativeSawTooth, 1.0, &p) - 1.0).abs() < 1e-12);
        let two = CurveParams::new().with_float("p3", 20.0);
        assert!(eval(CurveId::NativeSawTooth, 0.5, &two) > 0.99);
        assert!(eval(CurveId::NativeSawTooth, 0.51, &two) < 0.05);
    }

    #[test]
    fn device_params_fill_defaults() {
        let p = CurveParams::new().with_float("p2", 30.0);
        assert_eq!(NativeCurveType::Sine.device_params(&p), [0.0, 30.0, 10.0, 50.0]);
        assert_eq!(NativeCurveType::Flat.device_params(&CurveParams::new()), [50.0, 0.0, 0.0, 0.0]);
    }
}
