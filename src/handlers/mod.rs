//! Pattern handlers: geometry (static aim), movement (pan/tilt motion) and
//! dimmer (intensity shape).
//!
//! Handlers are trait objects keyed by pattern kind so callers can swap in
//! their own. `HandlerRegistry::builtin()` installs the default pattern
//! library and checks that every kind is covered.

pub mod dimmer;
pub mod geometry;
pub mod movement;

use std::sync::Arc;

use indexmap::IndexMap;
use strum::IntoEnumIterator;

use crate::error::{ChoreoError, Result};
use crate::model::{
    Curve, CurveParams, DimmerKind, FixtureCalibration, FixtureId, GeometryKind, Intensity, MovementKind,
    RoleToken,
};
use crate::util::token_names;

/// Aim of a head in degrees. Pan 0° faces the audience, positive toward
/// stage right. Tilt 0° is horizontal, 90° straight up, negative is down.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pose {
    pub pan_deg: f64,
    pub tilt_deg: f64,
}

/// Normalized pan/tilt motion around a pose. A curve value of 0.5 means "at
/// the pose"; 0 and 1 are the pose minus/plus half the amplitude.
#[derive(Debug, Clone, PartialEq)]
pub struct MovementCurves {
    pub pan: Curve,
    pub tilt: Curve,
    /// Peak-to-peak pan travel in degrees.
    pub pan_amplitude_deg: f64,
    /// Peak-to-peak tilt travel in degrees.
    pub tilt_amplitude_deg: f64,
}

impl MovementCurves {
    pub fn still() -> Self {
        Self {
            pan: Curve::constant(0.5),
            tilt: Curve::constant(0.5),
            pan_amplitude_deg: 0.0,
            tilt_amplitude_deg: 0.0,
        }
    }
}

pub trait GeometryHandler: Send + Sync {
    fn kind(&self) -> GeometryKind;

    /// Pose for one fixture. Calibration bounds the result to reachable travel.
    fn resolve(
        &self,
        fixture_id: &FixtureId,
        role: RoleToken,
        params: &CurveParams,
        calibration: &FixtureCalibration,
    ) -> Result<Pose>;
}

pub trait MovementHandler: Send + Sync {
    fn kind(&self) -> MovementKind;

    fn generate(
        &self,
        params: &CurveParams,
        n_samples: usize,
        cycles: f64,
        intensity: Intensity,
    ) -> Result<MovementCurves>;
}

pub trait DimmerHandler: Send + Sync {
    fn kind(&self) -> DimmerKind;

    /// Normalized dimmer shape over the step. Level scaling happens later.
    fn generate(&self, params: &CurveParams, n_samples: usize, cycles: f64, intensity: Intensity) -> Result<Curve>;
}

/// Handlers for every pattern kind.
#[derive(Clone)]
pub struct HandlerRegistry {
    geometry: IndexMap<GeometryKind, Arc<dyn GeometryHandler>>,
    movement: IndexMap<MovementKind, Arc<dyn MovementHandler>>,
    dimmer: IndexMap<DimmerKind, Arc<dyn DimmerHandler>>,
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("geometry", &self.geometry.keys().collect::<Vec<_>>())
            .field("movement", &self.movement.keys().collect::<Vec<_>>())
            .field("dimmer", &self.dimmer.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl HandlerRegistry {
    /// The default pattern library, verified complete.
    pub fn builtin() -> Result<Self> {
        let registry = Self {
            geometry: GeometryKind::iter()
                .map(|k| (k, Arc::new(geometry::PatternGeometry(k)) as Arc<dyn GeometryHandler>))
                .collect(),
            movement: MovementKind::iter()
                .map(|k| (k, Arc::new(movement::PatternMovement(k)) as Arc<dyn MovementHandler>))
                .collect(),
            dimmer: DimmerKind::iter()
                .map(|k| (k, Arc::new(dimmer::PatternDimmer(k)) as Arc<dyn DimmerHandler>))
                .collect(),
        };
        registry.verify()?;
        Ok(registry)
    }

    /// Every kind must have a handler, and each handler must report the kind
    /// it is registered under.
    pub fn verify(&self) -> Result<()> {
        fn check<K, H: ?Sized>(
            label: &'static str,
            map: &IndexMap<K, Arc<H>>,
            kind_of: impl Fn(&H) -> K,
        ) -> Result<()>
        where
            K: IntoEnumIterator + std::hash::Hash + Eq + Copy + std::fmt::Debug,
        {
            for kind in K::iter() {
                let Some(handler) = map.get(&kind) else {
                    return Err(ChoreoError::validation(label, format!("no handler for {kind:?}")));
                };
                if kind_of(handler.as_ref()) != kind {
                    return Err(ChoreoError::validation(
                        label,
                        format!("handler registered for {kind:?} reports {:?}", kind_of(handler.as_ref())),
                    ));
                }
            }
            Ok(())
        }
        check("geometry handlers", &self.geometry, |h| h.kind())?;
        check("movement handlers", &self.movement, |h| h.kind())?;
        check("dimmer handlers", &self.dimmer, |h| h.kind())?;
        Ok(())
    }

    pub fn with_geometry(mut self, handler: Arc<dyn GeometryHandler>) -> Self {
        self.geometry.insert(handler.kind(), handler);
        self
    }

    pub fn with_movement(mut self, handler: Arc<dyn MovementHandler>) -> Self {
        self.movement.insert(handler.kind(), handler);
        self
    }

    pub fn with_dimmer(mut self, handler: Arc<dyn DimmerHandler>) -> Self {
        self.dimmer.insert(handler.kind(), handler);
        self
    }

    pub fn geometry(&self, kind: GeometryKind) -> Result<&dyn GeometryHandler> {
        self.geometry
            .get(&kind)
            .map(AsRef::as_ref)
            .ok_or_else(|| ChoreoError::not_found("geometry", format!("{kind:?}"), token_names::<GeometryKind>()))
    }

    pub fn movement(&self, kind: MovementKind) -> Result<&dyn MovementHandler> {
        self.movement
            .get(&kind)
            .map(AsRef::as_ref)
            .ok_or_else(|| ChoreoError::not_found("movement", format!("{kind:?}"), token_names::<MovementKind>()))
    }

    pub fn dimmer(&self, kind: DimmerKind) -> Result<&dyn DimmerHandler> {
        self.dimmer
            .get(&kind)
            .map(AsRef::as_ref)
            .ok_or_else(|| ChoreoError::not_found("dimmer", format!("{kind:?}"), token_names::<DimmerKind>()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::util::parse_token;

    struct Stuck;

    impl GeometryHandler for Stuck {
        fn kind(&self) -> GeometryKind {
            GeometryKind::Front
        }

        fn resolve(&self, _: &FixtureId, _: RoleToken, _: &CurveParams, _: &FixtureCalibration) -> Result<Pose> {
            Ok(Pose {
                pan_deg: 12.0,
                tilt_deg: 0.0,
            })
        }
    }

    #[test]
    fn builtin_covers_every_kind() {
        let reg = HandlerRegistry::builtin().unwrap();
        for k in GeometryKind::iter() {
            assert_eq!(reg.geometry(k).unwrap().kind(), k);
        }
        for k in MovementKind::iter() {
            assert_eq!(reg.movement(k).unwrap().kind(), k);
        }
        for k in DimmerKind::iter() {
            assert_eq!(reg.dimmer(k).unwrap().kind(), k);
        }
    }

    #[test]
    fn custom_handler_replaces_default() {
        let reg = HandlerRegistry::builtin().unwrap().with_geometry(Arc::new(Stuck));
        reg.verify().unwrap();
        let pose = reg
            .geometry(GeometryKind::Front)
            .unwrap()
            .resolve(&FixtureId::from("a"), RoleToken::Center, &CurveParams::new(), &FixtureCalibration::default())
            .unwrap();
        assert!((pose.pan_deg - 12.0).abs() < 1e-12);
    }

    #[test]
    fn unknown_pattern_token_lists_valid_tokens() {
        let err = parse_token::<MovementKind>("moonwalk", "moonwalk").unwrap_err().to_string();
        assert!(err.contains("moonwalk"));
        assert!(err.contains("figure8"));
    }
}
