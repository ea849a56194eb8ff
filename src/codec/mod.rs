//! Device codec: turns composed fixture timelines into the DMX effect
//! settings of the show-control format.
//!
//! Every present channel of a fixture becomes either a slider (one static
//! value over the whole section) or a value curve spanning the section.

pub mod placement;
pub mod value_curve;

use std::collections::HashMap;
use std::sync::Arc;

use log::debug;
use parking_lot::Mutex;
use rayon::prelude::*;

use crate::compile::CompiledSection;
use crate::engine::boundary::BoundaryEnforcer;
use crate::engine::ComposedFixture;
use crate::error::{ChoreoError, Result};
use crate::model::{ChannelKind, ChannelSegment, CurvePoint, FixtureContext, NativeCurve, Rig, SegmentValue};
use crate::settings::CompilerSettings;

pub use placement::EffectPlacement;
use placement::{slider_key, value_curve_key};
use value_curve::{custom_curve, native_curve, CurveRange};

/// Memoized samples of generator curves. Many fixtures share the same
/// generator, so sampling happens once per curve and sample count.
#[derive(Debug, Default)]
pub struct SampleCache {
    samples: Mutex<HashMap<String, Arc<Vec<CurvePoint>>>>,
}

impl SampleCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sample(&self, curve: &NativeCurve, n: usize) -> Result<Arc<Vec<CurvePoint>>> {
        let key = format!("{}#{n}", serde_json::to_string(curve)?);
        if let Some(hit) = self.samples.lock().get(&key) {
            return Ok(Arc::clone(hit));
        }
        // Sample outside the lock; a racing fixture at worst computes the same points twice.
        let points = Arc::new(crate::curves::generate(curve.curve_id(), n, curve.params())?);
        self.samples.lock().insert(key, Arc::clone(&points));
        Ok(points)
    }

    pub fn len(&self) -> usize {
        self.samples.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Encodes compiled sections into effect placements.
#[derive(Debug)]
pub struct DeviceCodec<'a> {
    settings: &'a CompilerSettings,
    cache: SampleCache,
}

impl<'a> DeviceCodec<'a> {
    pub fn new(settings: &'a CompilerSettings) -> Self {
        Self {
            settings,
            cache: SampleCache::new(),
        }
    }

    pub fn cache(&self) -> &SampleCache {
        &self.cache
    }

    /// One placement per fixture spanning the section.
    pub fn placements(&self, section: &CompiledSection, rig: &Rig) -> Result<Vec<EffectPlacement>> {
        rig.validate()?;
        let encode = |composed: &ComposedFixture| -> Result<EffectPlacement> {
            let fixture = rig.get(&composed.fixture_id).ok_or_else(|| {
                ChoreoError::not_found(
                    "fixture",
                    composed.fixture_id.as_str(),
                    rig.fixtures.iter().map(|f| f.fixture_id.to_string()).collect(),
                )
            })?;
            self.encode_fixture(fixture, composed, (section.start_ms, section.end_ms))
        };
        let placements: Vec<EffectPlacement> = if self.settings.parallel {
            section.fixtures.par_iter().map(encode).collect::<Result<_>>()?
        } else {
            section.fixtures.iter().map(encode).collect::<Result<_>>()?
        };
        debug!(
            "section '{}': encoded {} placements, {} cached curve samples",
            section.section_id,
            placements.len(),
            self.cache.len()
        );
        Ok(placements)
    }

    pub fn encode_fixture(
        &self,
        fixture: &FixtureContext,
        composed: &ComposedFixture,
        window: (f64, f64),
    ) -> Result<EffectPlacement> {
        let mut placement = EffectPlacement::new(fixture.fixture_id.as_str(), 0, window.0, window.1);
        for (&channel, pieces) in &composed.channels {
            let Some(dmx) = fixture.dmx_channel(channel) else {
                continue;
            };
            let n = dmx.get();
            if let Some(v) = constant_value(pieces) {
                placement.settings.insert(slider_key(n), format!("{:.0}", v.clamp(0.0, 255.0).round()));
            } else {
                let curve = self.channel_curve(fixture, channel, pieces, window, &format!("DMX{n}"))?;
                placement.settings.insert(value_curve_key(n), curve);
            }
        }
        Ok(placement)
    }

    /// Value-curve string for one channel's pieces over `window`. Uses the
    /// native form when a single native-compatible generator covers the
    /// whole window inside the fixture's limits.
    pub fn channel_curve(
        &self,
        fixture: &FixtureContext,
        channel: ChannelKind,
        pieces: &[ChannelSegment],
        window: (f64, f64),
        name: &str,
    ) -> Result<String> {
        if let [only] = pieces {
            if let Some(s) = native_form(fixture, channel, only, window, name) {
                return Ok(s);
            }
        }
        let points = self.flatten(pieces, window)?;
        Ok(custom_curve(name, &points, CurveRange::dmx(), self.settings.rdp_epsilon))
    }

    /// Pieces as one normalized point list over `window` (v = dmx / 255).
    fn flatten(&self, pieces: &[ChannelSegment], window: (f64, f64)) -> Result<Vec<CurvePoint>> {
        let span = window.1 - window.0;
        if span <= 0.0 {
            return Err(ChoreoError::validation("codec window", format!("empty window {window:?}")));
        }
        let to_point = |t_ms: f64, dmx: f64| CurvePoint::clamped((t_ms - window.0) / span, dmx / 255.0);

        let mut points = Vec::new();
        for seg in pieces {
            let (t0, d) = (seg.t0_ms(), seg.duration_ms());
            match seg.value() {
                SegmentValue::Static(v) => {
                    points.push(to_point(t0, *v));
                    points.push(to_point(seg.t1_ms(), *v));
                }
                SegmentValue::Curve(curve) => {
                    let sampled = match curve.as_native() {
                        Some(native) => self.cache.sample(native, self.settings.samples_per_curve)?,
                        None => Arc::new(curve.to_point_curve(self.settings.samples_per_curve)?.points().to_vec()),
                    };
                    points.extend(
                        sampled
                            .iter()
                            .map(|p| to_point(t0 + p.t() * d, seg.device_value(p.v()))),
                    );
                }
            }
        }
        Ok(points)
    }
}

/// The single value shared by every piece, if they are all the same static value.
fn constant_value(pieces: &[ChannelSegment]) -> Option<f64> {
    let mut value = None;
    for seg in pieces {
        let SegmentValue::Static(v) = seg.value() else {
            return None;
        };
        match value {
            None => value = Some(*v),
            Some(prev) if (prev - v).abs() < 0.5 => {}
            Some(_) => return None,
        }
    }
    value
}

fn native_form(
    fixture: &FixtureContext,
    channel: ChannelKind,
    seg: &ChannelSegment,
    window: (f64, f64),
    name: &str,
) -> Option<String> {
    let covers = (seg.t0_ms() - window.0).abs() < 1e-6 && (seg.t1_ms() - window.1).abs() < 1e-6;
    let native = match seg.value() {
        SegmentValue::Curve(curve) => curve.as_native()?,
        SegmentValue::Static(_) => return None,
    };
    let kind = native.curve_id().native_type()?;
    if !covers {
        return None;
    }
    let (d0, d1) = (seg.device_value(0.0), seg.device_value(1.0));
    let range = CurveRange {
        min: d0.min(d1),
        max: d0.max(d1),
        reversed: d0 > d1,
    };
    let (lo, hi) = BoundaryEnforcer::new(fixture).limits(channel);
    if range.min < lo || range.max > hi {
        return None;
    }
    Some(native_curve(name, kind, kind.device_params(native.params()), range))
}
