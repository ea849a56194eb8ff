use crate::curves::grid;
use crate::error::Result;
use crate::model::{
    ChannelKind, ChannelSegment, Curve, CurvePoint, FixtureCalibration, FixtureContext, SegmentDraft, SegmentValue,
};

/// Physical limits of one fixture. Owns every angle to DMX conversion and
/// the final clamp of emitted values; nothing downstream of it may produce
/// a value outside the fixture's channel limits.
#[derive(Debug, Clone, Copy)]
pub struct BoundaryEnforcer<'a> {
    calibration: &'a FixtureCalibration,
}

impl<'a> BoundaryEnforcer<'a> {
    pub fn new(fixture: &'a FixtureContext) -> Self {
        Self::from_calibration(&fixture.calibration)
    }

    pub fn from_calibration(calibration: &'a FixtureCalibration) -> Self {
        Self { calibration }
    }

    fn pan_dmx_per_deg(&self) -> f64 {
        let sign = if self.calibration.pan_inverted { -1.0 } else { 1.0 };
        sign * 255.0 / self.calibration.pan_range_deg
    }

    fn tilt_dmx_per_deg(&self) -> f64 {
        let sign = if self.calibration.tilt_inverted { -1.0 } else { 1.0 };
        sign * (self.calibration.tilt_up_dmx - self.calibration.tilt_zero_dmx) / 90.0
    }

    /// Pan DMX for an angle, 0° being the audience-facing reference.
    pub fn pan_to_dmx(&self, pan_deg: f64) -> f64 {
        self.calibration.pan_front_dmx + pan_deg * self.pan_dmx_per_deg()
    }

    /// Tilt DMX for an angle, 0° horizontal and 90° straight up.
    pub fn tilt_to_dmx(&self, tilt_deg: f64) -> f64 {
        self.calibration.tilt_zero_dmx + tilt_deg * self.tilt_dmx_per_deg()
    }

    /// Peak-to-peak pan travel in DMX. Negative on inverted fixtures, which
    /// mirrors an offset-centered curve around its base.
    pub fn pan_span_dmx(&self, span_deg: f64) -> f64 {
        span_deg * self.pan_dmx_per_deg()
    }

    pub fn tilt_span_dmx(&self, span_deg: f64) -> f64 {
        span_deg * self.tilt_dmx_per_deg()
    }

    /// Inclusive DMX limits of a channel on this fixture.
    pub fn limits(&self, channel: ChannelKind) -> (f64, f64) {
        let c = self.calibration;
        match channel {
            ChannelKind::Pan => (c.pan_min_dmx, c.pan_max_dmx),
            ChannelKind::Tilt => (c.tilt_min_dmx, c.tilt_max_dmx),
            ChannelKind::Dimmer => (c.dimmer_floor_dmx, c.dimmer_ceiling_dmx),
            ChannelKind::Shutter | ChannelKind::Color | ChannelKind::Gobo => (0.0, 255.0),
        }
    }

    pub fn clamp(&self, channel: ChannelKind, dmx: f64) -> f64 {
        let (lo, hi) = self.limits(channel);
        if dmx.is_finite() {
            dmx.max(lo).min(hi)
        } else {
            lo
        }
    }

    /// Device-value range a segment can reach.
    fn reach(segment: &ChannelSegment) -> (f64, f64) {
        match segment.value() {
            SegmentValue::Static(v) => (*v, *v),
            SegmentValue::Curve(c) => {
                let (vlo, vhi) = c.value_bounds();
                let (a, b) = (segment.device_value(vlo), segment.device_value(vhi));
                (a.min(b), a.max(b))
            }
        }
    }

    /// Clamp a segment into its channel's limits. Segments already inside are
    /// returned unchanged, so enforcing twice equals enforcing once. Curves
    /// that leave the limits are realized with `n_samples` points and
    /// remapped onto the limit range.
    pub fn enforce(&self, segment: &ChannelSegment, n_samples: usize) -> Result<ChannelSegment> {
        let channel = segment.channel();
        let (lo, hi) = self.limits(channel);
        let (reach_lo, reach_hi) = Self::reach(segment);
        if reach_lo >= lo && reach_hi <= hi {
            return Ok(segment.clone());
        }

        let mut draft = SegmentDraft::from(segment.clone());
        draft.base_dmx = None;
        draft.amplitude_dmx = None;
        draft.offset_centered = false;
        draft.clamp_min = lo;
        draft.clamp_max = hi;

        match segment.value() {
            SegmentValue::Static(v) => {
                draft.static_dmx = Some(self.clamp(channel, *v));
                draft.curve = None;
            }
            SegmentValue::Curve(curve) => {
                if hi - lo <= f64::EPSILON {
                    draft.static_dmx = Some(lo);
                    draft.curve = None;
                } else {
                    let points = grid(n_samples.max(2))
                        .map(|t| {
                            let dmx = self.clamp(channel, segment.device_value(curve.evaluate(t)));
                            CurvePoint::clamped(t, (dmx - lo) / (hi - lo))
                        })
                        .collect();
                    draft.curve = Some(Curve::points(points)?);
                    draft.static_dmx = None;
                }
            }
        }
        ChannelSegment::new(draft)
    }

    pub fn enforce_all(&self, segments: &[ChannelSegment], n_samples: usize) -> Result<Vec<ChannelSegment>> {
        segments.iter().map(|s| self.enforce(s, n_samples)).collect()
    }
}
