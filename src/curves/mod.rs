//! Curve engine: a closed set of pointwise generators over normalized time.
//!
//! Every `CurveId` maps to a kernel `f(t, params) -> v` plus a parameter
//! table. Kernels are pure and deterministic, so a native curve can be
//! evaluated at any `t` without sampling, and sampling is just the kernel
//! mapped over a uniform grid.

pub mod advanced;
pub mod basic;
pub mod motion;
pub mod native;
pub mod noise;
pub mod ops;
pub mod parametric;

use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::EnumIter;

use crate::error::{ChoreoError, Result};
use crate::model::{CurveParams, CurvePoint, EasingFunction, ParamValue, OVERSHOOT_MARGIN};

pub use basic::{generate_hold, generate_linear};
pub use native::NativeCurveType;

/// Every built-in generator. Tokens use the serde snake_case names.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, EnumIter,
)]
#[serde(rename_all = "snake_case")]
pub enum CurveId {
    // Basic
    Linear,
    Hold,
    Sine,
    Cosine,
    Triangle,
    Square,
    Pulse,
    // Easing
    EaseInSine,
    EaseOutSine,
    EaseInOutSine,
    EaseInQuad,
    EaseOutQuad,
    EaseInOutQuad,
    EaseInCubic,
    EaseOutCubic,
    EaseInOutCubic,
    EaseInExpo,
    EaseOutExpo,
    EaseInOutExpo,
    EaseInBack,
    EaseOutBack,
    EaseInOutBack,
    // Motion
    BounceIn,
    BounceOut,
    ElasticIn,
    ElasticOut,
    // Advanced
    Anticipate,
    Overshoot,
    // Device-native equivalents
    NativeFlat,
    NativeRamp,
    NativeRampUpDown,
    NativeSine,
    NativeAbsSine,
    NativeParabolic,
    NativeLogarithmic,
    NativeExponential,
    NativeSawTooth,
    // Parametric
    Lissajous,
    Bezier,
    BeatPulse,
    // Noise
    Perlin,
    Simplex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter)]
#[serde(rename_all = "snake_case")]
pub enum CurveFamily {
    Basic,
    Easing,
    Motion,
    Advanced,
    Native,
    Parametric,
    Noise,
}

impl CurveId {
    pub fn family(self) -> CurveFamily {
        use CurveId as C;
        match self {
            C::Linear | C::Hold | C::Sine | C::Cosine | C::Triangle | C::Square | C::Pulse => {
                CurveFamily::Basic
            }
            C::EaseInSine
            | C::EaseOutSine
            | C::EaseInOutSine
            | C::EaseInQuad
            | C::EaseOutQuad
            | C::EaseInOutQuad
            | C::EaseInCubic
            | C::EaseOutCubic
            | C::EaseInOutCubic
            | C::EaseInExpo
            | C::EaseOutExpo
            | C::EaseInOutExpo
            | C::EaseInBack
            | C::EaseOutBack
            | C::EaseInOutBack => CurveFamily::Easing,
            C::BounceIn | C::BounceOut | C::ElasticIn | C::ElasticOut => CurveFamily::Motion,
            C::Anticipate | C::Overshoot => CurveFamily::Advanced,
            C::NativeFlat
            | C::NativeRamp
            | C::NativeRampUpDown
            | C::NativeSine
            | C::NativeAbsSine
            | C::NativeParabolic
            | C::NativeLogarithmic
            | C::NativeExponential
            | C::NativeSawTooth => CurveFamily::Native,
            C::Lissajous | C::Bezier | C::BeatPulse => CurveFamily::Parametric,
            C::Perlin | C::Simplex => CurveFamily::Noise,
        }
    }

    /// Only the elastic family may leave [0, 1], and only by `OVERSHOOT_MARGIN`.
    pub fn overshoots(self) -> bool {
        matches!(self, CurveId::ElasticIn | CurveId::ElasticOut)
    }

    /// The device's own parametric curve type, when this generator has one.
    pub fn native_type(self) -> Option<NativeCurveType> {
        NativeCurveType::from_curve_id(self)
    }

    /// Parse a token, failing with a lookup error listing every valid id.
    pub fn parse(token: &str) -> Result<Self> {
        crate::util::parse_token("curve id", token)
    }

    /// Parameters this generator accepts.
    pub fn params(self) -> &'static [ParamSpec] {
        use CurveId as C;
        match self {
            C::Linear => basic::LINEAR_PARAMS,
            C::Hold => basic::HOLD_PARAMS,
            C::Sine | C::Cosine | C::Triangle => basic::PERIODIC_PARAMS,
            C::Square => basic::SQUARE_PARAMS,
            C::Pulse => basic::PULSE_PARAMS,
            C::ElasticIn | C::ElasticOut => motion::ELASTIC_PARAMS,
            C::Anticipate => advanced::ANTICIPATE_PARAMS,
            C::Overshoot => advanced::OVERSHOOT_PARAMS,
            C::NativeFlat
            | C::NativeRamp
            | C::NativeRampUpDown
            | C::NativeSine
            | C::NativeAbsSine
            | C::NativeParabolic
            | C::NativeLogarithmic
            | C::NativeExponential
            | C::NativeSawTooth => native::params_for(self),
            C::Lissajous => parametric::LISSAJOUS_PARAMS,
            C::Bezier => parametric::BEZIER_PARAMS,
            C::BeatPulse => parametric::BEAT_PULSE_PARAMS,
            C::Perlin | C::Simplex => noise::NOISE_PARAMS,
            _ => &[],
        }
    }

    fn easing(self) -> Option<EasingFunction> {
        use CurveId as C;
        use EasingFunction as E;
        Some(match self {
            C::EaseInSine => E::EaseInSine,
            C::EaseOutSine => E::EaseOutSine,
            C::EaseInOutSine => E::EaseInOutSine,
            C::EaseInQuad => E::EaseInQuad,
            C::EaseOutQuad => E::EaseOutQuad,
            C::EaseInOutQuad => E::EaseInOutQuad,
            C::EaseInCubic => E::EaseInCubic,
            C::EaseOutCubic => E::EaseOutCubic,
            C::EaseInOutCubic => E::EaseInOutCubic,
            C::EaseInExpo => E::EaseInExpo,
            C::EaseOutExpo => E::EaseOutExpo,
            C::EaseInOutExpo => E::EaseInOutExpo,
            C::EaseInBack => E::EaseInBack,
            C::EaseOutBack => E::EaseOutBack,
            C::EaseInOutBack => E::EaseInOutBack,
            _ => return None,
        })
    }
}

// ── Parameter tables ────────────────────────────────────────────────

/// Accepted range for a numeric parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Bound {
    Any,
    /// Strictly greater than zero.
    Positive,
    NonNegative,
    /// Inclusive range.
    Within { min: f64, max: f64 },
}

impl Bound {
    fn admits(self, v: f64) -> bool {
        v.is_finite()
            && match self {
                Bound::Any => true,
                Bound::Positive => v > 0.0,
                Bound::NonNegative => v >= 0.0,
                Bound::Within { min, max } => (min..=max).contains(&v),
            }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ParamKind {
    Number { default: f64, bound: Bound },
    Flag { default: bool },
}

/// One parameter a generator reads: key, type, default and valid range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ParamSpec {
    pub key: &'static str,
    #[serde(flatten)]
    pub kind: ParamKind,
}

impl ParamSpec {
    pub const fn number(key: &'static str, default: f64, bound: Bound) -> Self {
        Self {
            key,
            kind: ParamKind::Number { default, bound },
        }
    }

    pub const fn within(key: &'static str, default: f64, min: f64, max: f64) -> Self {
        Self::number(key, default, Bound::Within { min, max })
    }

    pub const fn flag(key: &'static str, default: bool) -> Self {
        Self {
            key,
            kind: ParamKind::Flag { default },
        }
    }

    /// Numeric value from `params`, or this parameter's default.
    pub fn read(&self, params: &CurveParams) -> f64 {
        match self.kind {
            ParamKind::Number { default, .. } => params.float_or(self.key, default),
            ParamKind::Flag { default } => {
                if params.bool_or(self.key, default) {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }

    pub fn read_flag(&self, params: &CurveParams) -> bool {
        match self.kind {
            ParamKind::Flag { default } => params.bool_or(self.key, default),
            ParamKind::Number { default, .. } => params.float_or(self.key, default) != 0.0,
        }
    }

    fn check(&self, value: &ParamValue) -> std::result::Result<(), String> {
        match (self.kind, value) {
            (ParamKind::Number { bound, .. }, ParamValue::Number(v)) => {
                if bound.admits(*v) {
                    Ok(())
                } else {
                    Err(format!("{}={v} violates {bound:?}", self.key))
                }
            }
            (ParamKind::Flag { .. }, ParamValue::Bool(_)) => Ok(()),
            (ParamKind::Number { .. }, _) => Err(format!("{} must be a number", self.key)),
            (ParamKind::Flag { .. }, _) => Err(format!("{} must be a boolean", self.key)),
        }
    }
}

// ── Evaluation ──────────────────────────────────────────────────────

/// Check `params` against the generator's table: every key known, every
/// value of the right type and inside its bound.
pub fn validate_params(id: CurveId, params: &CurveParams) -> Result<()> {
    check_params(id.params(), params, &format!("{id:?}"))
}

/// Check `params` against an arbitrary parameter table. `owner` names the
/// generator or pattern in error messages.
pub fn check_params(specs: &[ParamSpec], params: &CurveParams, owner: &str) -> Result<()> {
    for (key, value) in params.iter() {
        let Some(spec) = specs.iter().find(|s| s.key == key) else {
            return Err(ChoreoError::not_found(
                "parameter",
                format!("{key} (for {owner})"),
                specs.iter().map(|s| s.key.to_string()).collect(),
            ));
        };
        spec.check(value)
            .map_err(|msg| ChoreoError::validation("parameters", format!("{owner}: {msg}")))?;
    }
    Ok(())
}

/// Evaluate a generator at normalized time `t`. Assumes validated params.
pub fn evaluate(id: CurveId, t: f64, params: &CurveParams) -> f64 {
    let t = t.clamp(0.0, 1.0);
    let v = kernel(id, t, params);
    if id.overshoots() {
        v.clamp(-OVERSHOOT_MARGIN, 1.0 + OVERSHOOT_MARGIN)
    } else {
        v.clamp(0.0, 1.0)
    }
}

fn kernel(id: CurveId, t: f64, p: &CurveParams) -> f64 {
    use CurveId as C;
    if let Some(easing) = id.easing() {
        return easing.evaluate(t);
    }
    match id {
        C::Linear => basic::linear(t, p),
        C::Hold => basic::hold(t, p),
        C::Sine => basic::sine(t, p),
        C::Cosine => basic::cosine(t, p),
        C::Triangle => basic::triangle(t, p),
        C::Square => basic::square(t, p),
        C::Pulse => basic::pulse(t, p),
        C::BounceIn => motion::bounce_in(t),
        C::BounceOut => motion::bounce_out(t),
        C::ElasticIn => motion::elastic_in(t, p),
        C::ElasticOut => motion::elastic_out(t, p),
        C::Anticipate => advanced::anticipate(t, p),
        C::Overshoot => advanced::overshoot(t, p),
        C::NativeFlat
        | C::NativeRamp
        | C::NativeRampUpDown
        | C::NativeSine
        | C::NativeAbsSine
        | C::NativeParabolic
        | C::NativeLogarithmic
        | C::NativeExponential
        | C::NativeSawTooth => native::evaluate(id, t, p),
        C::Lissajous => parametric::lissajous(t, p),
        C::Bezier => parametric::bezier(t, p),
        C::BeatPulse => parametric::beat_pulse(t, p),
        C::Perlin => noise::perlin_curve(t, p),
        C::Simplex => noise::simplex_curve(t, p),
        // Easing ids returned above.
        _ => t,
    }
}

/// Uniform grid `t_i = i / (n - 1)` for `n >= 2`.
pub(crate) fn grid(n: usize) -> impl Iterator<Item = f64> {
    let last = n.saturating_sub(1).max(1) as f64;
    (0..n).map(move |i| i as f64 / last)
}

/// Sample a generator onto `n_samples` uniformly spaced points.
pub fn generate(id: CurveId, n_samples: usize, params: &CurveParams) -> Result<Vec<CurvePoint>> {
    if n_samples < 2 {
        return Err(ChoreoError::validation(
            "sample count",
            format!("need at least 2 samples, got {n_samples}"),
        ));
    }
    validate_params(id, params)?;
    Ok(grid(n_samples)
        .map(|t| CurvePoint::clamped_overshoot(t, evaluate(id, t, params)))
        .collect())
}

// ── Registry ────────────────────────────────────────────────────────

/// Catalog entry for one generator.
#[derive(Debug, Clone, Serialize)]
pub struct CurveDef {
    pub id: CurveId,
    pub family: CurveFamily,
    pub params: &'static [ParamSpec],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub native_type: Option<&'static str>,
}

/// Every generator, checked once at construction: each id is registered and
/// produces finite values at its default parameters.
#[derive(Debug, Clone)]
pub struct CurveRegistry {
    defs: IndexMap<CurveId, CurveDef>,
}

impl CurveRegistry {
    pub fn builtin() -> Result<Self> {
        let defs: IndexMap<CurveId, CurveDef> = CurveId::iter()
            .map(|id| {
                (
                    id,
                    CurveDef {
                        id,
                        family: id.family(),
                        params: id.params(),
                        native_type: id.native_type().map(NativeCurveType::device_name),
                    },
                )
            })
            .collect();
        let registry = Self { defs };
        registry.verify()?;
        Ok(registry)
    }

    fn verify(&self) -> Result<()> {
        for id in CurveId::iter() {
            if !self.defs.contains_key(&id) {
                return Err(ChoreoError::validation(
                    "curve registry",
                    format!("{id:?} has no definition"),
                ));
            }
            let defaults = CurveParams::new();
            for t in grid(33) {
                let v = kernel(id, t, &defaults);
                if !v.is_finite() {
                    return Err(ChoreoError::validation(
                        "curve registry",
                        format!("{id:?} produced {v} at t={t} with default parameters"),
                    ));
                }
            }
        }
        Ok(())
    }

    pub fn get(&self, id: CurveId) -> Option<&CurveDef> {
        self.defs.get(&id)
    }

    pub fn defs(&self) -> impl Iterator<Item = &CurveDef> {
        self.defs.values()
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registry_is_complete() {
        let reg = CurveRegistry::builtin().unwrap();
        assert_eq!(reg.len(), CurveId::iter().count());
        assert!(reg.get(CurveId::NativeSawTooth).unwrap().native_type.is_some());
    }

    #[test]
    fn generate_rejects_too_few_samples() {
        assert!(generate(CurveId::Sine, 1, &CurveParams::new()).is_err());
        assert!(generate(CurveId::Sine, 0, &CurveParams::new()).is_err());
    }

    #[test]
    fn cycles_must_be_positive() {
        let p = CurveParams::new().with_float("cycles", 0.0);
        assert!(generate(CurveId::Sine, 8, &p).is_err());
        let p = CurveParams::new().with_float("cycles", -1.0);
        assert!(validate_params(CurveId::Triangle, &p).is_err());
    }

    #[test]
    fn unknown_param_lists_valid_keys() {
        let p = CurveParams::new().with_float("speed", 2.0);
        let err = validate_params(CurveId::Sine, &p).unwrap_err().to_string();
        assert!(err.contains("cycles"), "{err}");
        assert!(err.contains("phase"), "{err}");
    }

    #[test]
    fn wrong_param_type_rejected() {
        let p = CurveParams::new().with_bool("cycles", true);
        assert!(validate_params(CurveId::Sine, &p).is_err());
    }

    #[test]
    fn parse_lists_valid_ids() {
        assert_eq!(CurveId::parse("ease_in_out_cubic").unwrap(), CurveId::EaseInOutCubic);
        let err = CurveId::parse("wobble").unwrap_err().to_string();
        assert!(err.contains("wobble"));
        assert!(err.contains("lissajous"));
    }

    #[test]
    fn generation_is_deterministic() {
        let p = CurveParams::new().with_float("seed", 7.0);
        let a = generate(CurveId::Perlin, 64, &p).unwrap();
        let b = generate(CurveId::Perlin, 64, &p).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn only_elastic_overshoots() {
        for id in CurveId::iter() {
            let pts = generate(id, 101, &CurveParams::new()).unwrap();
            if !id.overshoots() {
                assert!(pts.iter().all(CurvePoint::in_unit_range), "{id:?} left [0, 1]");
            }
        }
        let elastic = generate(CurveId::ElasticOut, 201, &CurveParams::new()).unwrap();
        assert!(elastic.iter().any(|p| p.v() > 1.0));
        assert!(elastic.iter().all(|p| p.v() <= 1.0 + OVERSHOOT_MARGIN));
    }

    #[test]
    fn back_easing_is_clamped() {
        let pts = generate(CurveId::EaseInBack, 101, &CurveParams::new()).unwrap();
        assert!(pts.iter().all(|p| p.v() >= 0.0));
    }

    #[test]
    fn grid_endpoints() {
        let g: Vec<f64> = grid(5).collect();
        assert_eq!(g, vec![0.0, 0.25, 0.5, 0.75, 1.0]);
    }
}
