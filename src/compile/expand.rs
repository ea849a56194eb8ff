use indexmap::IndexMap;
use log::{debug, warn};

use crate::engine::boundary::BoundaryEnforcer;
use crate::error::{ChoreoError, Result};
use crate::handlers::HandlerRegistry;
use crate::model::{
    BlendMode, ChannelKind, ChannelSegment, Curve, FixtureContext, FixtureId, OffsetCentering, PhaseOffsetMode,
    PhaseOffsetSpec, Quantize, Rig, SegmentDraft, SegmentSource, ShutterState, Step, Template,
};
use crate::settings::{CompilerSettings, JobDefaults};
use crate::timing::{calculate_fixture_offsets, calculate_normalized_offset, order_fixtures, TimingResolver};
use crate::util::lerp;

use super::layout::Placement;

/// Below this a movement amplitude or a time span counts as zero.
const EPSILON: f64 = 1e-9;

/// Renders placed steps into raw, per-fixture channel segments.
pub struct Expander<'a> {
    pub template: &'a Template,
    pub handlers: &'a HandlerRegistry,
    pub rig: &'a Rig,
    pub resolver: TimingResolver<'a>,
    pub settings: &'a CompilerSettings,
    /// Section window in ms. Everything rendered is clipped to it.
    pub window: (f64, f64),
}

/// Per-fixture adjustments from a phase offset.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Shift {
    window: (f64, f64),
    /// Fraction of the step by which curves lag.
    phase: f64,
}

impl Expander<'_> {
    /// Segments for one placed step on every fixture it targets.
    pub fn expand(&self, placement: &Placement<'_>) -> Result<Vec<ChannelSegment>> {
        let step = placement.step;
        let roles = self.template.target_roles(step.target()).ok_or_else(|| {
            ChoreoError::compilation(self.template.template_id(), format!("unknown target {:?}", step.target()))
        })?;
        let fixtures: Vec<&FixtureContext> = self.rig.with_roles(&roles).collect();
        if fixtures.is_empty() {
            debug!("step '{}': no fixture in the rig plays {:?}", step.step_id(), roles);
            return Ok(Vec::new());
        }

        let (mut t0, mut t1) = self.resolver.resolve_timing(
            &step.timing().base,
            self.template.default_timing(),
            placement.cycle_start_bar,
        )?;
        if placement.mirrored {
            let cs = self.resolver.bars_to_ms(placement.cycle_start_bar, Quantize::None);
            let ce = self
                .resolver
                .bars_to_ms(placement.cycle_start_bar + self.template.repeat().cycle_bars, Quantize::None);
            (t0, t1) = (cs + ce - t1, cs + ce - t0);
        }

        let offsets = match &step.timing().phase_offset {
            Some(spec) if spec.mode == PhaseOffsetMode::GroupOrder => self.phase_offsets(spec)?,
            _ => IndexMap::new(),
        };
        let wrap = step.timing().phase_offset.as_ref().is_some_and(|s| s.wrap);

        let mut out = Vec::new();
        for fixture in fixtures {
            let offset_bars = offsets.get(&fixture.fixture_id).copied().unwrap_or(0.0);
            let shift = self.shift((t0, t1), offset_bars, wrap);
            out.extend(self.render(step, fixture, shift, placement.mirrored)?);
        }
        Ok(out)
    }

    /// Chase offsets in bars for the fixtures of the offset's group.
    fn phase_offsets(&self, spec: &PhaseOffsetSpec) -> Result<IndexMap<FixtureId, f64>> {
        let group = spec.group.as_deref().unwrap_or_default();
        let roles = self.template.groups().get(group).ok_or_else(|| {
            ChoreoError::compilation(
                self.template.template_id(),
                format!("phase offset group '{group}' is not defined"),
            )
        })?;
        let members: Vec<&FixtureContext> = self.rig.with_roles(roles).collect();
        let ordered: Vec<FixtureId> = order_fixtures(&members, spec.order)
            .into_iter()
            .map(|f| f.fixture_id.clone())
            .collect();
        Ok(calculate_fixture_offsets(spec, &ordered))
    }

    /// Wrapped offsets rotate the curves; unwrapped ones delay the window.
    fn shift(&self, window: (f64, f64), offset_bars: f64, wrap: bool) -> Shift {
        if offset_bars.abs() < EPSILON {
            return Shift { window, phase: 0.0 };
        }
        let (t0, t1) = window;
        let start_bar = self.resolver.ms_to_bars(t0);
        if wrap {
            let duration_bars = self.resolver.ms_to_bars(t1) - start_bar;
            Shift {
                window,
                phase: calculate_normalized_offset(offset_bars, duration_bars, true),
            }
        } else {
            let delay = self.resolver.bars_to_ms(start_bar + offset_bars, Quantize::None) - t0;
            Shift {
                window: (t0 + delay, t1 + delay),
                phase: 0.0,
            }
        }
    }

    fn shape(&self, curve: Curve, shift: Shift, mirrored: bool) -> Result<Curve> {
        let n = self.settings.samples_per_curve;
        let curve = if mirrored { curve.reversed(n)? } else { curve };
        if shift.phase.abs() < EPSILON {
            Ok(curve)
        } else {
            curve.phase_shifted(-shift.phase, n)
        }
    }

    /// All channels of one step on one fixture, clipped to the section.
    fn render(&self, step: &Step, fixture: &FixtureContext, shift: Shift, mirrored: bool) -> Result<Vec<ChannelSegment>> {
        let (t0, t1) = shift.window;
        let (a, b) = (t0.max(self.window.0), t1.min(self.window.1));
        if b - a <= EPSILON {
            return Ok(Vec::new());
        }

        let n = self.settings.samples_per_curve;
        let id = &fixture.fixture_id;
        let enforcer = BoundaryEnforcer::new(fixture);
        let source = SegmentSource::Authored {
            step_id: step.step_id().to_string(),
        };
        let (entry, exit) = if mirrored {
            (step.exit_transition(), step.entry_transition())
        } else {
            (step.entry_transition(), step.exit_transition())
        };
        let finish = |draft: SegmentDraft, blend: BlendMode| -> Result<ChannelSegment> {
            let seg = ChannelSegment::new(draft.with_priority(step.priority(), blend).with_transitions(entry, exit))?;
            if a > t0 || b < t1 {
                seg.slice(a, b, n)
            } else {
                Ok(seg)
            }
        };
        let still = |channel: ChannelKind, dmx: f64| {
            SegmentDraft::static_value(id, channel, t0, t1, dmx.clamp(0.0, 255.0), source.clone())
        };

        let mut drafts: Vec<(SegmentDraft, BlendMode)> = Vec::with_capacity(6);

        // ── Pan / tilt ──
        let geometry = step.geometry();
        let pose = self.handlers.geometry(geometry.geometry_id)?.resolve(
            id,
            fixture.role,
            &geometry.params,
            &fixture.calibration,
        )?;
        let movement = step.movement();
        let motion = self.handlers.movement(movement.movement_id)?.generate(
            &movement.params,
            n,
            movement.cycles,
            movement.intensity,
        )?;
        let axes = [
            (
                ChannelKind::Pan,
                enforcer.pan_to_dmx(pose.pan_deg),
                enforcer.pan_span_dmx(motion.pan_amplitude_deg),
                motion.pan,
            ),
            (
                ChannelKind::Tilt,
                enforcer.tilt_to_dmx(pose.tilt_deg),
                enforcer.tilt_span_dmx(motion.tilt_amplitude_deg),
                motion.tilt,
            ),
        ];
        for (channel, base_dmx, amplitude_dmx, curve) in axes {
            let draft = if amplitude_dmx.abs() < EPSILON {
                still(channel, base_dmx)
            } else {
                SegmentDraft::offset_curve(
                    id,
                    channel,
                    t0,
                    t1,
                    self.shape(curve, shift, mirrored)?,
                    OffsetCentering {
                        base_dmx,
                        amplitude_dmx,
                    },
                    source.clone(),
                )
            };
            drafts.push((draft, BlendMode::Override));
        }

        // ── Dimmer ──
        let dimmer = step.dimmer();
        let shape = self.handlers.dimmer(dimmer.dimmer_id)?.generate(
            &dimmer.params,
            n,
            dimmer.cycles,
            dimmer.intensity,
        )?;
        let defaults = self.template.defaults();
        let lo = lerp(defaults.dimmer_floor_dmx, defaults.dimmer_ceiling_dmx, dimmer.min_level);
        let hi = lerp(defaults.dimmer_floor_dmx, defaults.dimmer_ceiling_dmx, dimmer.max_level);
        let (v_lo, v_hi) = shape.value_bounds();
        let (dimmer_draft, lit) = if v_hi - v_lo <= EPSILON {
            let level = lerp(lo, hi, v_lo);
            (still(ChannelKind::Dimmer, level), level > 0.0)
        } else {
            let curve = self.shape(shape, shift, mirrored)?;
            (
                SegmentDraft::curve(id, ChannelKind::Dimmer, t0, t1, curve, (lo, hi), source.clone()),
                hi > 0.0,
            )
        };
        drafts.push((dimmer_draft, step.blend_mode()));

        // ── Shutter / color / gobo ──
        let job = self.settings.job_defaults;
        let overrides = step.overrides().copied().unwrap_or_default();
        let context = format!("{}/{}", step.step_id(), id);
        let shutter = shutter_dmx(fixture, overrides.shutter, lit, job, &context);
        drafts.push((still(ChannelKind::Shutter, shutter), BlendMode::Override));
        drafts.push((
            still(ChannelKind::Color, overrides.color_dmx.unwrap_or(job.color_dmx)),
            BlendMode::Override,
        ));
        drafts.push((
            still(ChannelKind::Gobo, overrides.gobo_dmx.unwrap_or(job.gobo_dmx)),
            BlendMode::Override,
        ));

        drafts
            .into_iter()
            .filter(|(d, _)| fixture.has_channel(d.channel))
            .map(|(d, blend)| finish(d, blend))
            .collect()
    }
}

/// Shutter value for a step, falling back to the job default when the
/// request cannot be honored on this fixture.
fn shutter_dmx(
    fixture: &FixtureContext,
    requested: Option<ShutterState>,
    lit: bool,
    job: JobDefaults,
    context: &str,
) -> f64 {
    let cal = &fixture.calibration;
    let fallback = if job.shutter_open {
        cal.shutter_open_dmx
    } else {
        cal.shutter_closed_dmx
    };
    match requested {
        None => fallback,
        Some(ShutterState::Open) => cal.shutter_open_dmx,
        Some(ShutterState::Closed) if lit => {
            warn!("{context}: shutter closed while the dimmer is lit, using job default");
            fallback
        }
        Some(ShutterState::Closed) => cal.shutter_closed_dmx,
        Some(ShutterState::Strobe { rate_dmx }) => match cal.strobe_range_dmx {
            None => {
                warn!("{context}: fixture has no strobe range, using job default shutter");
                fallback
            }
            Some((lo, hi)) if !(lo..=hi).contains(&rate_dmx) => {
                warn!("{context}: strobe rate {rate_dmx} outside [{lo}, {hi}], using job default shutter");
                fallback
            }
            Some(_) => rate_dmx,
        },
    }
}

/// Hold every fixture channel at its last value from `at_ms` to `end_ms`.
/// With `fade`, the dimmer ramps from that value to 0 instead.
pub fn remainder(segments: &[ChannelSegment], at_ms: f64, end_ms: f64, fade: bool) -> Result<Vec<ChannelSegment>> {
    if end_ms - at_ms <= EPSILON {
        return Ok(Vec::new());
    }
    // Latest-ending (then highest-priority) segment per fixture channel.
    let mut last: IndexMap<(FixtureId, ChannelKind), (f64, &ChannelSegment)> = IndexMap::new();
    for seg in segments.iter().filter(|s| s.t0_ms() < at_ms) {
        let t = seg.t1_ms().min(at_ms);
        let key = (seg.fixture_id().clone(), seg.channel());
        let replace = match last.get(&key) {
            Some((prev_t, prev)) => (t, seg.priority()) >= (*prev_t, prev.priority()),
            None => true,
        };
        if replace {
            last.insert(key, (t, seg));
        }
    }

    last.into_iter()
        .map(|((fixture_id, channel), (t, seg))| {
            let v = seg.value_at(t).clamp(0.0, 255.0);
            let draft = if fade && channel == ChannelKind::Dimmer {
                SegmentDraft::from(ChannelSegment::ramp(
                    &fixture_id,
                    channel,
                    at_ms,
                    end_ms,
                    v,
                    0.0,
                    SegmentSource::Remainder,
                )?)
            } else {
                SegmentDraft::static_value(&fixture_id, channel, at_ms, end_ms, v, SegmentSource::Remainder)
            };
            // Stays under anything authored that runs into the remainder.
            ChannelSegment::new(draft.with_priority(i32::MIN, BlendMode::Override))
        })
        .collect()
}
