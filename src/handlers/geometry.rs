use crate::curves::{check_params, Bound, ParamSpec};
use crate::error::Result;
use crate::model::{CurveParams, FixtureCalibration, FixtureId, GeometryKind, RoleToken};

use super::{GeometryHandler, Pose};

/// Total pan spread in degrees between the outermost heads.
pub const SPREAD: ParamSpec = ParamSpec::within("spread", 60.0, 0.0, 360.0);
/// Beam elevation in degrees for the lateral patterns.
pub const TILT: ParamSpec = ParamSpec::within("tilt", 20.0, -90.0, 135.0);
/// Pan added to every head.
pub const PAN_OFFSET: ParamSpec = ParamSpec::number("pan_offset", 0.0, Bound::Any);

const LATERAL_PARAMS: &[ParamSpec] = &[SPREAD, TILT, PAN_OFFSET];
const VERTICAL_PARAMS: &[ParamSpec] = &[SPREAD, PAN_OFFSET];

/// Default geometry library: pose from role, spread and elevation.
#[derive(Debug, Clone, Copy)]
pub struct PatternGeometry(pub GeometryKind);

impl PatternGeometry {
    pub fn params(self) -> &'static [ParamSpec] {
        match self.0 {
            GeometryKind::Ceiling | GeometryKind::Floor => VERTICAL_PARAMS,
            _ => LATERAL_PARAMS,
        }
    }
}

impl GeometryHandler for PatternGeometry {
    fn kind(&self) -> GeometryKind {
        self.0
    }

    fn resolve(
        &self,
        _fixture_id: &FixtureId,
        role: RoleToken,
        params: &CurveParams,
        calibration: &FixtureCalibration,
    ) -> Result<Pose> {
        check_params(self.params(), params, &format!("geometry {:?}", self.0))?;
        calibration.validate()?;
        let lateral = role.lateral();
        let half_spread = SPREAD.read(params) / 2.0;
        let tilt = TILT.read(params);
        let offset = PAN_OFFSET.read(params);

        let (pan, tilt) = match self.0 {
            GeometryKind::Front => (0.0, tilt),
            GeometryKind::Fan => (lateral * half_spread, tilt),
            GeometryKind::Cross => (-lateral * half_spread, tilt),
            // Aim inward just enough to meet at center stage.
            GeometryKind::Converge => (-lateral * half_spread / 2.0, tilt),
            // Slight splay keeps beams distinct when looking up or down.
            GeometryKind::Ceiling => (lateral * half_spread / 4.0, 90.0),
            GeometryKind::Floor => (lateral * half_spread / 4.0, -45.0),
        };

        let pan_limit = calibration.pan_range_deg / 2.0;
        let tilt_limit = calibration.tilt_range_deg / 2.0;
        Ok(Pose {
            pan_deg: (pan + offset).clamp(-pan_limit, pan_limit),
            tilt_deg: tilt.clamp(-tilt_limit, tilt_limit),
        })
    }
}
