use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{ChoreoError, Result};
use crate::util::lerp;

use super::curve::{Curve, PointCurve};
use super::fixture::{ChannelKind, FixtureId};
use super::template::{BlendMode, Transition};

/// Where a segment came from. Carried through composition for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[ts(export)]
pub enum SegmentSource {
    Authored { step_id: String },
    Filler,
    Gap,
    Transition,
    Remainder,
}

/// What a segment drives its channel with. Exactly one form.
#[derive(Debug, Clone, PartialEq)]
pub enum SegmentValue {
    /// Constant device value in [0, 255].
    Static(f64),
    Curve(Curve),
}

/// Curve values centered on a base: device = base + (v - 0.5) × amplitude.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OffsetCentering {
    pub base_dmx: f64,
    pub amplitude_dmx: f64,
}

/// Flat construction form of a segment. Both value fields are optional here;
/// `ChannelSegment::new` enforces that exactly one is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentDraft {
    pub fixture_id: FixtureId,
    pub channel: ChannelKind,
    pub t0_ms: f64,
    pub t1_ms: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub static_dmx: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub curve: Option<Curve>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_dmx: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amplitude_dmx: Option<f64>,
    #[serde(default)]
    pub offset_centered: bool,
    #[serde(default)]
    pub blend_mode: BlendMode,
    #[serde(default)]
    pub clamp_min: f64,
    #[serde(default = "dmx_max")]
    pub clamp_max: f64,
    #[serde(default)]
    pub priority: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transition_in: Option<Transition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transition_out: Option<Transition>,
    pub source: SegmentSource,
}

fn dmx_max() -> f64 {
    255.0
}

impl SegmentDraft {
    fn base(fixture_id: &FixtureId, channel: ChannelKind, t0_ms: f64, t1_ms: f64, source: SegmentSource) -> Self {
        Self {
            fixture_id: fixture_id.clone(),
            channel,
            t0_ms,
            t1_ms,
            static_dmx: None,
            curve: None,
            base_dmx: None,
            amplitude_dmx: None,
            offset_centered: false,
            blend_mode: BlendMode::Override,
            clamp_min: 0.0,
            clamp_max: 255.0,
            priority: 0,
            transition_in: None,
            transition_out: None,
            source,
        }
    }

    pub fn static_value(
        fixture_id: &FixtureId,
        channel: ChannelKind,
        t0_ms: f64,
        t1_ms: f64,
        dmx: f64,
        source: SegmentSource,
    ) -> Self {
        Self {
            static_dmx: Some(dmx),
            ..Self::base(fixture_id, channel, t0_ms, t1_ms, source)
        }
    }

    /// Curve mapped linearly onto [clamp_min, clamp_max].
    pub fn curve(
        fixture_id: &FixtureId,
        channel: ChannelKind,
        t0_ms: f64,
        t1_ms: f64,
        curve: Curve,
        range: (f64, f64),
        source: SegmentSource,
    ) -> Self {
        Self {
            curve: Some(curve),
            clamp_min: range.0,
            clamp_max: range.1,
            ..Self::base(fixture_id, channel, t0_ms, t1_ms, source)
        }
    }

    /// Curve centered on `base_dmx`, swinging ±amplitude/2.
    pub fn offset_curve(
        fixture_id: &FixtureId,
        channel: ChannelKind,
        t0_ms: f64,
        t1_ms: f64,
        curve: Curve,
        centering: OffsetCentering,
        source: SegmentSource,
    ) -> Self {
        Self {
            curve: Some(curve),
            base_dmx: Some(centering.base_dmx),
            amplitude_dmx: Some(centering.amplitude_dmx),
            offset_centered: true,
            ..Self::base(fixture_id, channel, t0_ms, t1_ms, source)
        }
    }

    pub fn with_priority(mut self, priority: i32, blend_mode: BlendMode) -> Self {
        self.priority = priority;
        self.blend_mode = blend_mode;
        self
    }

    pub fn with_transitions(mut self, transition_in: Option<Transition>, transition_out: Option<Transition>) -> Self {
        self.transition_in = transition_in;
        self.transition_out = transition_out;
        self
    }
}

/// One timed value assignment on one channel of one fixture. The unit every
/// composition stage consumes and produces. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SegmentDraft", into = "SegmentDraft")]
pub struct ChannelSegment {
    fixture_id: FixtureId,
    channel: ChannelKind,
    t0_ms: f64,
    t1_ms: f64,
    value: SegmentValue,
    centering: Option<OffsetCentering>,
    blend_mode: BlendMode,
    clamp_min: f64,
    clamp_max: f64,
    priority: i32,
    transition_in: Option<Transition>,
    transition_out: Option<Transition>,
    source: SegmentSource,
}

impl TryFrom<SegmentDraft> for ChannelSegment {
    type Error = ChoreoError;
    fn try_from(draft: SegmentDraft) -> Result<Self> {
        ChannelSegment::new(draft)
    }
}

impl From<ChannelSegment> for SegmentDraft {
    fn from(s: ChannelSegment) -> SegmentDraft {
        let (static_dmx, curve) = match s.value {
            SegmentValue::Static(v) => (Some(v), None),
            SegmentValue::Curve(c) => (None, Some(c)),
        };
        SegmentDraft {
            fixture_id: s.fixture_id,
            channel: s.channel,
            t0_ms: s.t0_ms,
            t1_ms: s.t1_ms,
            static_dmx,
            curve,
            base_dmx: s.centering.map(|c| c.base_dmx),
            amplitude_dmx: s.centering.map(|c| c.amplitude_dmx),
            offset_centered: s.centering.is_some(),
            blend_mode: s.blend_mode,
            clamp_min: s.clamp_min,
            clamp_max: s.clamp_max,
            priority: s.priority,
            transition_in: s.transition_in,
            transition_out: s.transition_out,
            source: s.source,
        }
    }
}

impl ChannelSegment {
    pub fn new(draft: SegmentDraft) -> Result<Self> {
        let err = |msg: String| {
            ChoreoError::validation(
                "channel segment",
                format!("{}/{:?}: {msg}", draft.fixture_id, draft.channel),
            )
        };
        if !(draft.t0_ms.is_finite() && draft.t1_ms.is_finite()) || draft.t0_ms > draft.t1_ms {
            return Err(err(format!("t0_ms {} must not exceed t1_ms {}", draft.t0_ms, draft.t1_ms)));
        }
        if !(draft.clamp_min.is_finite() && draft.clamp_max.is_finite()) || draft.clamp_min > draft.clamp_max {
            return Err(err(format!(
                "clamp_min {} must be finite and not exceed clamp_max {}",
                draft.clamp_min, draft.clamp_max
            )));
        }
        let value = match (draft.static_dmx, draft.curve) {
            (Some(_), Some(_)) => return Err(err("static_dmx and curve are mutually exclusive".into())),
            (None, None) => return Err(err("one of static_dmx or curve is required".into())),
            (Some(v), None) => {
                if !(0.0..=255.0).contains(&v) {
                    return Err(err(format!("static_dmx {v} is outside [0, 255]")));
                }
                SegmentValue::Static(v)
            }
            (None, Some(c)) => SegmentValue::Curve(c),
        };
        let centering = if draft.offset_centered {
            let (Some(base_dmx), Some(amplitude_dmx)) = (draft.base_dmx, draft.amplitude_dmx) else {
                return Err(err("offset_centered requires base_dmx and amplitude_dmx".into()));
            };
            if !(base_dmx.is_finite() && amplitude_dmx.is_finite()) {
                return Err(err(format!("offset centering {base_dmx} ± {amplitude_dmx} must be finite")));
            }
            if matches!(value, SegmentValue::Static(_)) {
                return Err(err("offset_centered applies to curve segments only".into()));
            }
            Some(OffsetCentering {
                base_dmx,
                amplitude_dmx,
            })
        } else {
            None
        };
        Ok(Self {
            fixture_id: draft.fixture_id,
            channel: draft.channel,
            t0_ms: draft.t0_ms,
            t1_ms: draft.t1_ms,
            value,
            centering,
            blend_mode: draft.blend_mode,
            clamp_min: draft.clamp_min,
            clamp_max: draft.clamp_max,
            priority: draft.priority,
            transition_in: draft.transition_in,
            transition_out: draft.transition_out,
            source: draft.source,
        })
    }

    /// Linear ramp between two device values.
    pub fn ramp(
        fixture_id: &FixtureId,
        channel: ChannelKind,
        t0_ms: f64,
        t1_ms: f64,
        from_dmx: f64,
        to_dmx: f64,
        source: SegmentSource,
    ) -> Result<Self> {
        let curve = Curve::Points(PointCurve::ramp(from_dmx / 255.0, to_dmx / 255.0));
        Self::new(SegmentDraft::curve(fixture_id, channel, t0_ms, t1_ms, curve, (0.0, 255.0), source))
    }

    pub fn fixture_id(&self) -> &FixtureId {
        &self.fixture_id
    }

    pub fn channel(&self) -> ChannelKind {
        self.channel
    }

    pub fn t0_ms(&self) -> f64 {
        self.t0_ms
    }

    pub fn t1_ms(&self) -> f64 {
        self.t1_ms
    }

    pub fn duration_ms(&self) -> f64 {
        self.t1_ms - self.t0_ms
    }

    pub fn value(&self) -> &SegmentValue {
        &self.value
    }

    pub fn centering(&self) -> Option<OffsetCentering> {
        self.centering
    }

    pub fn blend_mode(&self) -> BlendMode {
        self.blend_mode
    }

    pub fn clamp_range(&self) -> (f64, f64) {
        (self.clamp_min, self.clamp_max)
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn transition_in(&self) -> Option<Transition> {
        self.transition_in
    }

    pub fn transition_out(&self) -> Option<Transition> {
        self.transition_out
    }

    pub fn source(&self) -> &SegmentSource {
        &self.source
    }

    pub fn is_static(&self) -> bool {
        matches!(self.value, SegmentValue::Static(_))
    }

    pub fn overlaps(&self, t0_ms: f64, t1_ms: f64) -> bool {
        self.t0_ms < t1_ms && t0_ms < self.t1_ms
    }

    /// Map a normalized curve value to a device value. Unclamped; the
    /// boundary enforcer owns the final clamp.
    pub fn device_value(&self, v: f64) -> f64 {
        match self.centering {
            Some(c) => c.base_dmx + (v - 0.5) * c.amplitude_dmx,
            None => lerp(self.clamp_min, self.clamp_max, v),
        }
    }

    /// Device value at absolute time `t_ms` (clamped into the segment window).
    pub fn value_at(&self, t_ms: f64) -> f64 {
        match &self.value {
            SegmentValue::Static(v) => *v,
            SegmentValue::Curve(c) => self.device_value(c.evaluate(self.local_t(t_ms))),
        }
    }

    fn local_t(&self, t_ms: f64) -> f64 {
        let d = self.duration_ms();
        if d <= 0.0 {
            0.0
        } else {
            ((t_ms - self.t0_ms) / d).clamp(0.0, 1.0)
        }
    }

    /// The part of this segment covering [t0_ms, t1_ms], intersected with
    /// its own window. Curves are re-windowed with `n_samples` points.
    pub fn slice(&self, t0_ms: f64, t1_ms: f64, n_samples: usize) -> Result<Self> {
        let a = t0_ms.max(self.t0_ms);
        let b = t1_ms.min(self.t1_ms).max(a);
        let value = match &self.value {
            SegmentValue::Static(v) => SegmentValue::Static(*v),
            SegmentValue::Curve(c) => SegmentValue::Curve(c.window(self.local_t(a), self.local_t(b), n_samples)?),
        };
        let keeps_start = a <= self.t0_ms;
        let keeps_end = b >= self.t1_ms;
        Ok(Self {
            t0_ms: a,
            t1_ms: b,
            value,
            transition_in: if keeps_start { self.transition_in } else { None },
            transition_out: if keeps_end { self.transition_out } else { None },
            ..self.clone()
        })
    }

    /// Copy with a new source tag.
    pub fn retagged(&self, source: SegmentSource) -> Self {
        Self {
            source,
            ..self.clone()
        }
    }

    /// Copy with transitions replaced.
    pub fn with_transitions(&self, transition_in: Option<Transition>, transition_out: Option<Transition>) -> Self {
        Self {
            transition_in,
            transition_out,
            ..self.clone()
        }
    }
}

/// An interval of the section in which no effect is active on a fixture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Gap {
    pub fixture_id: FixtureId,
    pub channels: Vec<ChannelKind>,
    pub t0_ms: f64,
    pub t1_ms: f64,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn id() -> FixtureId {
        FixtureId::from("mh1")
    }

    #[test]
    fn both_values_rejected() {
        let mut d = SegmentDraft::static_value(&id(), ChannelKind::Dimmer, 0.0, 100.0, 10.0, SegmentSource::Filler);
        d.curve = Some(Curve::linear());
        assert!(ChannelSegment::new(d).is_err());
    }

    #[test]
    fn neither_value_rejected() {
        let mut d = SegmentDraft::static_value(&id(), ChannelKind::Dimmer, 0.0, 100.0, 10.0, SegmentSource::Filler);
        d.static_dmx = None;
        assert!(ChannelSegment::new(d).is_err());
    }

    #[test]
    fn offset_centering_needs_companions() {
        let mut d = SegmentDraft::curve(
            &id(),
            ChannelKind::Pan,
            0.0,
            100.0,
            Curve::linear(),
            (0.0, 255.0),
            SegmentSource::Filler,
        );
        d.offset_centered = true;
        d.base_dmx = Some(128.0);
        assert!(ChannelSegment::new(d.clone()).is_err());
        d.amplitude_dmx = Some(40.0);
        assert!(ChannelSegment::new(d).is_ok());
    }

    #[test]
    fn reversed_window_and_clamps_rejected() {
        let d = SegmentDraft::static_value(&id(), ChannelKind::Dimmer, 10.0, 5.0, 0.0, SegmentSource::Gap);
        assert!(ChannelSegment::new(d).is_err());

        let mut d = SegmentDraft::static_value(&id(), ChannelKind::Dimmer, 0.0, 5.0, 0.0, SegmentSource::Gap);
        d.clamp_min = 200.0;
        d.clamp_max = 100.0;
        assert!(ChannelSegment::new(d.clone()).is_err());
        d.clamp_min = f64::NAN;
        assert!(ChannelSegment::new(d.clone()).is_err());
        d.clamp_min = 0.0;
        d.clamp_max = f64::NAN;
        assert!(ChannelSegment::new(d).is_err());

        let d = SegmentDraft::static_value(&id(), ChannelKind::Dimmer, 0.0, 5.0, 300.0, SegmentSource::Gap);
        assert!(ChannelSegment::new(d).is_err());
    }

    #[test]
    fn offset_centered_value() {
        let seg = ChannelSegment::new(SegmentDraft::offset_curve(
            &id(),
            ChannelKind::Pan,
            0.0,
            1000.0,
            Curve::linear(),
            OffsetCentering {
                base_dmx: 100.0,
                amplitude_dmx: 40.0,
            },
            SegmentSource::Filler,
        ))
        .unwrap();
        assert!(approx(seg.value_at(0.0), 80.0));
        assert!(approx(seg.value_at(500.0), 100.0));
        assert!(approx(seg.value_at(1000.0), 120.0));
    }

    #[test]
    fn ramp_and_slice() {
        let seg = ChannelSegment::ramp(&id(), ChannelKind::Dimmer, 0.0, 1000.0, 0.0, 255.0, SegmentSource::Transition)
            .unwrap();
        assert!(approx(seg.value_at(250.0), 63.75));
        let half = seg.slice(500.0, 2000.0, 32).unwrap();
        assert!(approx(half.t0_ms(), 500.0));
        assert!(approx(half.t1_ms(), 1000.0));
        assert!((half.value_at(500.0) - 127.5).abs() < 1e-6);
        assert!((half.value_at(1000.0) - 255.0).abs() < 1e-6);
    }

    #[test]
    fn slice_drops_cut_transitions() {
        let seg = ChannelSegment::new(
            SegmentDraft::static_value(&id(), ChannelKind::Dimmer, 0.0, 100.0, 50.0, SegmentSource::Filler)
                .with_transitions(Some(Transition::Snap), Some(Transition::Crossfade { duration_ms: 20.0 })),
        )
        .unwrap();
        let head = seg.slice(0.0, 40.0, 8).unwrap();
        assert_eq!(head.transition_in(), Some(Transition::Snap));
        assert_eq!(head.transition_out(), None);
    }

    #[test]
    fn serde_goes_through_validation() {
        let json = r#"{"fixture_id":"mh1","channel":"dimmer","t0_ms":0,"t1_ms":10,
            "static_dmx":5,"curve":{"kind":"points","points":[{"t":0,"v":0},{"t":1,"v":1}]},
            "source":{"kind":"filler"}}"#;
        assert!(serde_json::from_str::<ChannelSegment>(json).is_err());
    }
}
