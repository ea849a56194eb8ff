use crate::curves::{check_params, Bound, CurveId, ParamSpec};
use crate::error::{ChoreoError, Result};
use crate::model::{Curve, CurveParams, DimmerKind, Intensity};

use super::DimmerHandler;

/// Lit share of each pulse period.
pub const WIDTH: ParamSpec = crate::curves::basic::WIDTH;
/// Strobe flashes per pattern cycle, before intensity scaling.
pub const RATE: ParamSpec = ParamSpec::number("rate", 8.0, Bound::Positive);
pub const DUTY: ParamSpec = ParamSpec::within("duty", 0.3, 0.01, 1.0);
pub const SEED: ParamSpec = crate::curves::noise::SEED;
/// Beats per pattern cycle.
pub const BEATS: ParamSpec = crate::curves::parametric::BEATS;
pub const DECAY: ParamSpec = crate::curves::parametric::DECAY;

/// Default dimmer library.
#[derive(Debug, Clone, Copy)]
pub struct PatternDimmer(pub DimmerKind);

impl PatternDimmer {
    pub fn params(self) -> &'static [ParamSpec] {
        match self.0 {
            DimmerKind::Full
            | DimmerKind::Off
            | DimmerKind::Breathe
            | DimmerKind::FadeIn
            | DimmerKind::FadeOut => &[],
            DimmerKind::Pulse => &[WIDTH],
            DimmerKind::Strobe => &[RATE, DUTY],
            DimmerKind::Flicker => &[SEED],
            DimmerKind::BeatPulse => &[BEATS, DUTY, DECAY],
        }
    }
}

impl DimmerHandler for PatternDimmer {
    fn kind(&self) -> DimmerKind {
        self.0
    }

    fn generate(&self, params: &CurveParams, n_samples: usize, cycles: f64, intensity: Intensity) -> Result<Curve> {
        check_params(self.params(), params, &format!("dimmer {:?}", self.0))?;
        if n_samples < 2 {
            return Err(ChoreoError::validation(
                "sample count",
                format!("need at least 2 samples, got {n_samples}"),
            ));
        }
        if !(cycles > 0.0 && cycles.is_finite()) {
            return Err(ChoreoError::validation("dimmer", format!("cycles must be > 0, got {cycles}")));
        }
        let f = cycles * intensity.profile().frequency;

        match self.0 {
            DimmerKind::Full => Ok(Curve::constant(1.0)),
            DimmerKind::Off => Ok(Curve::constant(0.0)),
            DimmerKind::Pulse => Curve::native(
                CurveId::Pulse,
                CurveParams::new()
                    .with_float("cycles", f)
                    .with_float("width", WIDTH.read(params)),
            ),
            // Phase 0.75 starts the breath dark.
            DimmerKind::Breathe => Curve::native(
                CurveId::Sine,
                CurveParams::new().with_float("cycles", f).with_float("phase", 0.75),
            ),
            DimmerKind::Strobe => Curve::native(
                CurveId::Square,
                CurveParams::new()
                    .with_float("cycles", f * RATE.read(params))
                    .with_float("duty", DUTY.read(params)),
            ),
            DimmerKind::FadeIn => Curve::native(CurveId::Linear, CurveParams::new()),
            DimmerKind::FadeOut => Curve::native(CurveId::Linear, CurveParams::new().with_bool("ascending", false)),
            DimmerKind::Flicker => Curve::native(
                CurveId::Simplex,
                CurveParams::new()
                    .with_float("seed", SEED.read(params))
                    .with_float("frequency", 8.0 * f)
                    .with_float("octaves", 3.0),
            ),
            DimmerKind::BeatPulse => Curve::native(
                CurveId::BeatPulse,
                CurveParams::new()
                    .with_float("beats", BEATS.read(params) * f)
                    .with_float("duty", DUTY.read(params))
                    .with_float("decay", DECAY.read(params)),
            ),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn generate(kind: DimmerKind) -> Curve {
        PatternDimmer(kind).generate(&CurveParams::new(), 32, 1.0, Intensity::Medium).unwrap()
    }

    #[test]
    fn every_kind_stays_in_unit_range() {
        for kind in DimmerKind::iter() {
            let c = generate(kind);
            for i in 0..=40 {
                let v = c.evaluate(f64::from(i) / 40.0);
                assert!((0.0..=1.0).contains(&v), "{kind:?} at {i}: {v}");
            }
        }
    }

    #[test]
    fn fades_and_constants() {
        assert!(approx(generate(DimmerKind::Full).evaluate(0.3), 1.0));
        assert!(approx(generate(DimmerKind::Off).evaluate(0.3), 0.0));
        assert!(approx(generate(DimmerKind::FadeIn).evaluate(0.25), 0.25));
        assert!(approx(generate(DimmerKind::FadeOut).evaluate(0.25), 0.75));
    }

    #[test]
    fn breathe_starts_dark_and_peaks_midway() {
        let c = generate(DimmerKind::Breathe);
        assert!(c.evaluate(0.0) < 1e-9);
        assert!(approx(c.evaluate(0.5), 1.0));
    }

    #[test]
    fn strobe_rate_param_is_used() {
        let c = PatternDimmer(DimmerKind::Strobe)
            .generate(&CurveParams::new().with_float("rate", 2.0), 32, 1.0, Intensity::Medium)
            .unwrap();
        let native = c.as_native().unwrap();
        assert!(approx(native.params().float_or("cycles", 0.0), 2.0));
    }

    #[test]
    fn foreign_params_rejected() {
        assert!(PatternDimmer(DimmerKind::Full)
            .generate(&CurveParams::new().with_float("rate", 2.0), 32, 1.0, Intensity::Medium)
            .is_err());
    }
}
