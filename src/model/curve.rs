use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::curves::{self, CurveId};
use crate::error::{ChoreoError, Result};

use super::params::CurveParams;

/// How far the overshooting curve families may leave [0, 1].
pub const OVERSHOOT_MARGIN: f64 = 0.5;

/// A single point on a curve, both axes normalized to [0, 1].
/// Constructed via `CurvePoint::new`, which enforces the bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(try_from = "CurvePointRaw")]
pub struct CurvePoint {
    t: f64,
    v: f64,
}

#[derive(Deserialize, JsonSchema)]
struct CurvePointRaw {
    t: f64,
    v: f64,
}

impl TryFrom<CurvePointRaw> for CurvePoint {
    type Error = ChoreoError;
    fn try_from(raw: CurvePointRaw) -> Result<Self> {
        CurvePoint::new(raw.t, raw.v)
    }
}

impl CurvePoint {
    /// Create a point. Fails if either axis is outside [0, 1] or not finite.
    pub fn new(t: f64, v: f64) -> Result<Self> {
        check_t(t)?;
        if !(0.0..=1.0).contains(&v) {
            return Err(ChoreoError::validation(
                "curve point",
                format!("v={v} is outside [0, 1]"),
            ));
        }
        Ok(Self { t, v })
    }

    /// Create a point whose value may overshoot [0, 1] by at most `OVERSHOOT_MARGIN`.
    pub fn with_overshoot(t: f64, v: f64) -> Result<Self> {
        check_t(t)?;
        if !(-OVERSHOOT_MARGIN..=1.0 + OVERSHOOT_MARGIN).contains(&v) {
            return Err(ChoreoError::validation(
                "curve point",
                format!("v={v} is outside the overshoot bound ±{OVERSHOOT_MARGIN}"),
            ));
        }
        Ok(Self { t, v })
    }

    /// Clamp both axes into range. Generators use this for values they have
    /// already bounded, so the result always satisfies the invariant.
    pub(crate) fn clamped(t: f64, v: f64) -> Self {
        Self {
            t: finite_or(t, 0.0).clamp(0.0, 1.0),
            v: finite_or(v, 0.0).clamp(0.0, 1.0),
        }
    }

    /// Like `clamped`, but keeps values inside the overshoot bound.
    pub(crate) fn clamped_overshoot(t: f64, v: f64) -> Self {
        Self {
            t: finite_or(t, 0.0).clamp(0.0, 1.0),
            v: finite_or(v, 0.5).clamp(-OVERSHOOT_MARGIN, 1.0 + OVERSHOOT_MARGIN),
        }
    }

    pub fn t(&self) -> f64 {
        self.t
    }

    pub fn v(&self) -> f64 {
        self.v
    }

    /// True if the value lies inside [0, 1].
    pub fn in_unit_range(&self) -> bool {
        (0.0..=1.0).contains(&self.v)
    }
}

fn check_t(t: f64) -> Result<()> {
    if (0.0..=1.0).contains(&t) {
        Ok(())
    } else {
        Err(ChoreoError::validation(
            "curve point",
            format!("t={t} is outside [0, 1]"),
        ))
    }
}

fn finite_or(x: f64, fallback: f64) -> f64 {
    if x.is_finite() {
        x
    } else {
        fallback
    }
}

/// Piecewise-linear curve mapping time (t) to value (v).
/// Points are ordered by t. Evaluate via binary search + linear interpolation.
///
/// `overshoot` marks curves realized from an overshooting generator; only
/// those may hold values outside [0, 1], and it round-trips through JSON.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct PointCurve {
    points: Vec<CurvePoint>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    overshoot: bool,
}

impl PointCurve {
    /// Requires at least 2 points with non-decreasing t.
    pub fn new(points: Vec<CurvePoint>) -> Result<Self> {
        if points.len() < 2 {
            return Err(ChoreoError::validation(
                "point curve",
                format!("needs at least 2 points, got {}", points.len()),
            ));
        }
        for pair in points.windows(2) {
            if let [a, b] = pair {
                if b.t < a.t {
                    return Err(ChoreoError::validation(
                        "point curve",
                        format!("t must be non-decreasing, found {} followed by {}", a.t, b.t),
                    ));
                }
            }
        }
        let overshoot = !points.iter().all(CurvePoint::in_unit_range);
        Ok(Self { points, overshoot })
    }

    /// Linear ramp from (0,0) to (1,1).
    pub fn linear() -> Self {
        Self {
            points: vec![CurvePoint { t: 0.0, v: 0.0 }, CurvePoint { t: 1.0, v: 1.0 }],
            overshoot: false,
        }
    }

    /// Ramp between two values, both clamped to [0, 1].
    pub fn ramp(from: f64, to: f64) -> Self {
        Self {
            points: vec![CurvePoint::clamped(0.0, from), CurvePoint::clamped(1.0, to)],
            overshoot: false,
        }
    }

    /// Flat line at the given value.
    pub fn constant(v: f64) -> Self {
        Self::ramp(v, v)
    }

    pub fn points(&self) -> &[CurvePoint] {
        &self.points
    }

    /// Evaluate at `t` (clamped to [0, 1]).
    pub fn evaluate(&self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        let idx = self.points.partition_point(|p| p.t <= t);

        let (Some(first), Some(last)) = (self.points.first(), self.points.last()) else {
            return 0.0;
        };
        if idx == 0 {
            return first.v;
        }
        if idx >= self.points.len() {
            return last.v;
        }
        let (Some(a), Some(b)) = (self.points.get(idx - 1), self.points.get(idx)) else {
            return last.v;
        };
        let dt = b.t - a.t;
        if dt <= 0.0 {
            return a.v;
        }
        a.v + (b.v - a.v) * ((t - a.t) / dt)
    }

    /// Mirror in time: the value at t becomes the value at 1 - t.
    pub fn reversed(&self) -> Self {
        Self {
            points: self
                .points
                .iter()
                .rev()
                .map(|p| CurvePoint { t: 1.0 - p.t, v: p.v })
                .collect(),
            overshoot: self.overshoot,
        }
    }

    pub fn is_within_unit_range(&self) -> bool {
        self.points.iter().all(CurvePoint::in_unit_range)
    }

    /// True if the curve was realized from an overshooting generator.
    pub fn overshoots(&self) -> bool {
        self.overshoot
    }
}

impl<'de> Deserialize<'de> for PointCurve {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Raw {
            points: Vec<CurvePointRaw>,
            #[serde(default)]
            overshoot: bool,
        }
        let raw = Raw::deserialize(deserializer)?;
        let points = raw
            .points
            .into_iter()
            .map(|p| {
                if raw.overshoot {
                    CurvePoint::with_overshoot(p.t, p.v)
                } else {
                    CurvePoint::new(p.t, p.v)
                }
            })
            .collect::<Result<Vec<_>>>()
            .map_err(serde::de::Error::custom)?;
        PointCurve::new(points).map_err(serde::de::Error::custom)
    }
}

/// A normalized curve: either explicit points or a parametric generator
/// reference evaluated analytically. Exactly one form is active.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Curve {
    Points(PointCurve),
    Native(NativeCurve),
}

/// A generator reference with validated parameters.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct NativeCurve {
    curve_id: CurveId,
    #[serde(default)]
    params: CurveParams,
}

impl NativeCurve {
    pub fn new(curve_id: CurveId, params: CurveParams) -> Result<Self> {
        curves::validate_params(curve_id, &params)?;
        Ok(Self { curve_id, params })
    }

    pub fn curve_id(&self) -> CurveId {
        self.curve_id
    }

    pub fn params(&self) -> &CurveParams {
        &self.params
    }
}

impl<'de> Deserialize<'de> for NativeCurve {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Raw {
            curve_id: CurveId,
            #[serde(default)]
            params: CurveParams,
        }
        let raw = Raw::deserialize(deserializer)?;
        NativeCurve::new(raw.curve_id, raw.params).map_err(serde::de::Error::custom)
    }
}

impl Curve {
    /// Explicit point curve. Validates point count and ordering.
    pub fn points(points: Vec<CurvePoint>) -> Result<Self> {
        PointCurve::new(points).map(Self::Points)
    }

    /// Generator reference. Validates parameters against the generator.
    pub fn native(curve_id: CurveId, params: CurveParams) -> Result<Self> {
        NativeCurve::new(curve_id, params).map(Self::Native)
    }

    pub fn linear() -> Self {
        Self::Points(PointCurve::linear())
    }

    pub fn constant(v: f64) -> Self {
        Self::Points(PointCurve::constant(v))
    }

    /// Evaluate at normalized time `t`.
    pub fn evaluate(&self, t: f64) -> f64 {
        match self {
            Self::Points(p) => p.evaluate(t),
            Self::Native(n) => curves::evaluate(n.curve_id, t.clamp(0.0, 1.0), &n.params),
        }
    }

    /// Sample onto a uniform grid of `n` points.
    pub fn sample(&self, n: usize) -> Result<Vec<CurvePoint>> {
        match self {
            Self::Points(p) if n < 2 => Err(ChoreoError::validation(
                "sample count",
                format!("need at least 2 samples, got {n} for a {}-point curve", p.points().len()),
            )),
            Self::Points(p) => Ok(curves::ops::resample(p, n)),
            Self::Native(native) => curves::generate(native.curve_id, n, &native.params),
        }
    }

    /// Convert to an explicit point curve with `n` samples.
    pub fn to_point_curve(&self, n: usize) -> Result<PointCurve> {
        match self {
            Self::Points(p) => Ok(p.clone()),
            Self::Native(_) => PointCurve::new(self.sample(n)?),
        }
    }

    /// Time-mirrored copy. Native curves are realized with `n` samples first.
    pub fn reversed(&self, n: usize) -> Result<Self> {
        Ok(Self::Points(self.to_point_curve(n)?.reversed()))
    }

    /// Rotate the curve in time by `phase` (fraction of the domain, wrapping).
    pub fn phase_shifted(&self, phase: f64, n: usize) -> Result<Self> {
        if phase.rem_euclid(1.0) == 0.0 {
            return Ok(self.clone());
        }
        curves::ops::phase_shift(self, phase, n).map(Self::Points)
    }

    /// The sub-curve covering normalized times [a, b], re-normalized to [0, 1].
    pub fn window(&self, a: f64, b: f64, n: usize) -> Result<Self> {
        if a <= 0.0 && b >= 1.0 {
            return Ok(self.clone());
        }
        curves::ops::window(self, a, b, n).map(Self::Points)
    }

    pub fn as_native(&self) -> Option<&NativeCurve> {
        match self {
            Self::Native(n) => Some(n),
            Self::Points(_) => None,
        }
    }

    /// Inclusive bounds on any value `evaluate` can return. Exact for point
    /// curves; the generator's output range for native ones.
    pub fn value_bounds(&self) -> (f64, f64) {
        match self {
            Self::Points(p) => p
                .points()
                .iter()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), pt| (lo.min(pt.v()), hi.max(pt.v()))),
            Self::Native(n) if n.curve_id.overshoots() => (-OVERSHOOT_MARGIN, 1.0 + OVERSHOOT_MARGIN),
            Self::Native(_) => (0.0, 1.0),
        }
    }
}

impl Default for Curve {
    fn default() -> Self {
        Self::linear()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn pt(t: f64, v: f64) -> CurvePoint {
        CurvePoint::new(t, v).unwrap()
    }

    #[test]
    fn point_bounds_are_enforced() {
        assert!(CurvePoint::new(1.1, 0.0).is_err());
        assert!(CurvePoint::new(-0.1, 0.0).is_err());
        assert!(CurvePoint::new(0.5, 1.2).is_err());
        assert!(CurvePoint::new(0.5, f64::NAN).is_err());
        assert!(CurvePoint::new(0.0, 0.0).is_ok());
        assert!(CurvePoint::new(1.0, 1.0).is_ok());
    }

    #[test]
    fn overshoot_constructor_allows_margin_only() {
        assert!(CurvePoint::with_overshoot(0.5, 1.4).is_ok());
        assert!(CurvePoint::with_overshoot(0.5, -0.4).is_ok());
        assert!(CurvePoint::with_overshoot(0.5, 1.6).is_err());
        assert!(CurvePoint::with_overshoot(1.1, 0.5).is_err());
    }

    #[test]
    fn json_points_stay_in_unit_range() {
        assert!(serde_json::from_str::<CurvePoint>(r#"{"t":0.5,"v":1.4}"#).is_err());
        assert!(serde_json::from_str::<CurvePoint>(r#"{"t":0.5,"v":0.4}"#).is_ok());
        let plain = r#"{"points":[{"t":0.0,"v":0.0},{"t":1.0,"v":1.4}]}"#;
        assert!(serde_json::from_str::<PointCurve>(plain).is_err());
    }

    #[test]
    fn overshooting_curves_round_trip_with_their_flag() {
        let elastic = Curve::native(CurveId::ElasticOut, CurveParams::new()).unwrap();
        let realized = elastic.to_point_curve(64).unwrap();
        assert!(realized.overshoots());
        let json = serde_json::to_string(&realized).unwrap();
        assert!(json.contains("\"overshoot\":true"));
        let back: PointCurve = serde_json::from_str(&json).unwrap();
        assert!(back.overshoots());
        assert_eq!(back.points().len(), realized.points().len());
        assert!(back.points().iter().zip(realized.points()).all(|(x, y)| approx(x.v(), y.v())));

        let flagged = r#"{"points":[{"t":0.0,"v":0.0},{"t":1.0,"v":1.6}],"overshoot":true}"#;
        assert!(serde_json::from_str::<PointCurve>(flagged).is_err());
        assert!(!serde_json::to_string(&PointCurve::linear()).unwrap().contains("overshoot"));
    }

    #[test]
    fn points_must_be_non_decreasing() {
        let err = Curve::points(vec![pt(0.0, 0.0), pt(0.5, 1.0), pt(0.2, 0.5)]);
        assert!(err.is_err());
        assert!(Curve::points(vec![pt(0.0, 0.0), pt(0.5, 1.0), pt(0.5, 0.2), pt(1.0, 0.0)]).is_ok());
    }

    #[test]
    fn points_need_two() {
        assert!(Curve::points(vec![pt(0.0, 0.0)]).is_err());
        assert!(Curve::points(vec![]).is_err());
    }

    #[test]
    fn evaluate_interpolates_and_clamps() {
        let c = Curve::points(vec![pt(0.0, 0.0), pt(0.5, 1.0), pt(1.0, 0.0)]).unwrap();
        assert!(approx(c.evaluate(0.25), 0.5));
        assert!(approx(c.evaluate(0.5), 1.0));
        assert!(approx(c.evaluate(0.75), 0.5));
        assert!(approx(c.evaluate(-1.0), 0.0));
        assert!(approx(c.evaluate(2.0), 0.0));
    }

    #[test]
    fn reversed_mirrors_time() {
        let c = PointCurve::new(vec![pt(0.0, 0.0), pt(0.25, 1.0), pt(1.0, 0.5)]).unwrap();
        let r = c.reversed();
        assert!(approx(r.evaluate(0.0), 0.5));
        assert!(approx(r.evaluate(0.75), 1.0));
        assert!(approx(r.evaluate(1.0), 0.0));
    }

    #[test]
    fn native_evaluates_without_sampling() {
        let c = Curve::native(CurveId::Linear, CurveParams::new()).unwrap();
        assert!(approx(c.evaluate(0.3), 0.3));
    }

    #[test]
    fn native_rejects_bad_cycles() {
        let params = CurveParams::new().with_float("cycles", 0.0);
        assert!(Curve::native(CurveId::Sine, params).is_err());
    }

    #[test]
    fn deserialize_validates() {
        let bad = r#"{"kind":"points","points":[{"t":0.0,"v":0.0},{"t":1.5,"v":1.0}]}"#;
        assert!(serde_json::from_str::<Curve>(bad).is_err());
        let unordered = r#"{"kind":"points","points":[{"t":0.6,"v":0.0},{"t":0.1,"v":1.0}]}"#;
        assert!(serde_json::from_str::<Curve>(unordered).is_err());
        let native = r#"{"kind":"native","curve_id":"sine","params":{"cycles":2.0}}"#;
        let c: Curve = serde_json::from_str(native).unwrap();
        assert!(c.as_native().is_some());
    }
}
