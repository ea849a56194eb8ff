use crate::curves::{check_params, grid, CurveId, ParamSpec};
use crate::error::{ChoreoError, Result};
use crate::model::easing::bounce_out;
use crate::model::{Curve, CurveParams, CurvePoint, Intensity, MovementKind};

use super::{MovementCurves, MovementHandler};

/// Pan travel in degrees that an amplitude fraction of 1.0 corresponds to.
pub const PAN_REFERENCE_DEG: f64 = 180.0;
/// Tilt travel in degrees that an amplitude fraction of 1.0 corresponds to.
pub const TILT_REFERENCE_DEG: f64 = 90.0;

/// Scales pan travel.
pub const WIDTH: ParamSpec = ParamSpec::within("width", 1.0, 0.0, 2.0);
/// Scales tilt travel.
pub const HEIGHT: ParamSpec = ParamSpec::within("height", 1.0, 0.0, 2.0);
pub const SEED: ParamSpec = crate::curves::noise::SEED;

const SHAPE_PARAMS: &[ParamSpec] = &[WIDTH, HEIGHT];
const DRIFT_PARAMS: &[ParamSpec] = &[WIDTH, HEIGHT, SEED];

/// Default movement library.
#[derive(Debug, Clone, Copy)]
pub struct PatternMovement(pub MovementKind);

impl PatternMovement {
    pub fn params(self) -> &'static [ParamSpec] {
        match self.0 {
            MovementKind::Hold => &[],
            MovementKind::Drift => DRIFT_PARAMS,
            _ => SHAPE_PARAMS,
        }
    }
}

fn periodic(id: CurveId, cycles: f64, phase: f64) -> Result<Curve> {
    Curve::native(id, CurveParams::new().with_float("cycles", cycles).with_float("phase", phase))
}

fn drift(seed: f64, frequency: f64) -> Result<Curve> {
    Curve::native(
        CurveId::Perlin,
        CurveParams::new()
            .with_float("seed", seed)
            .with_float("frequency", frequency)
            .with_float("octaves", 2.0),
    )
}

/// Repeated bounce arcs: each cycle falls from the top and settles.
fn bounce(n_samples: usize, cycles: f64) -> Result<Curve> {
    let points = grid(n_samples)
        .map(|t| {
            let x = (cycles * t).fract();
            let x = if t >= 1.0 && x == 0.0 { 1.0 } else { x };
            CurvePoint::clamped(t, 1.0 - bounce_out(x))
        })
        .collect();
    Curve::points(points)
}

impl MovementHandler for PatternMovement {
    fn kind(&self) -> MovementKind {
        self.0
    }

    fn generate(
        &self,
        params: &CurveParams,
        n_samples: usize,
        cycles: f64,
        intensity: Intensity,
    ) -> Result<MovementCurves> {
        check_params(self.params(), params, &format!("movement {:?}", self.0))?;
        if n_samples < 2 {
            return Err(ChoreoError::validation(
                "sample count",
                format!("need at least 2 samples, got {n_samples}"),
            ));
        }
        if !(cycles > 0.0 && cycles.is_finite()) {
            return Err(ChoreoError::validation("movement", format!("cycles must be > 0, got {cycles}")));
        }

        let profile = intensity.profile();
        let f = cycles * profile.frequency;
        let pan_amp = profile.amplitude_fraction * PAN_REFERENCE_DEG * WIDTH.read(params);
        let tilt_amp = profile.amplitude_fraction * TILT_REFERENCE_DEG * HEIGHT.read(params);
        let still = Curve::constant(0.5);

        let (pan, tilt, pan_amp, tilt_amp) = match self.0 {
            MovementKind::Hold => return Ok(MovementCurves::still()),
            MovementKind::Sweep => (periodic(CurveId::Sine, f, 0.0)?, still, pan_amp, 0.0),
            MovementKind::Nod => (still, periodic(CurveId::Sine, f, 0.0)?, 0.0, tilt_amp),
            MovementKind::Circle => (
                periodic(CurveId::Sine, f, 0.0)?,
                periodic(CurveId::Cosine, f, 0.0)?,
                pan_amp,
                tilt_amp,
            ),
            MovementKind::Figure8 => (
                periodic(CurveId::Sine, f, 0.0)?,
                periodic(CurveId::Sine, 2.0 * f, 0.0)?,
                pan_amp,
                tilt_amp / 2.0,
            ),
            // The beam dips at the bottom of each swing.
            MovementKind::Pendulum => (
                periodic(CurveId::Sine, f, 0.0)?,
                periodic(CurveId::Cosine, 2.0 * f, 0.5)?,
                pan_amp,
                tilt_amp * 0.3,
            ),
            MovementKind::Wave => (
                periodic(CurveId::Triangle, f, 0.25)?,
                periodic(CurveId::Sine, 2.0 * f, 0.0)?,
                pan_amp,
                tilt_amp / 2.0,
            ),
            MovementKind::Drift => {
                let seed = SEED.read(params);
                (drift(seed, 2.0 * f)?, drift(seed + 1.0, 2.0 * f)?, pan_amp, tilt_amp)
            }
            MovementKind::Bounce => (still, bounce(n_samples, f)?, 0.0, tilt_amp),
        };

        Ok(MovementCurves {
            pan,
            tilt,
            pan_amplitude_deg: pan_amp,
            tilt_amplitude_deg: tilt_amp,
        })
    }
}
