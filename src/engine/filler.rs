use indexmap::IndexMap;
use log::debug;

use crate::curves::grid;
use crate::error::Result;
use crate::model::{
    BlendMode, ChannelKind, ChannelSegment, Curve, CurvePoint, FixtureContext, SegmentDraft, SegmentSource,
};

use super::{covered, mixer, subtract, TIME_EPSILON_MS};

/// One fixture's channels after merging: per present channel, a time-sorted
/// list of non-overlapping segments.
pub type ChannelTimeline = IndexMap<ChannelKind, Vec<ChannelSegment>>;

/// Merge a fixture's authored segments channel by channel and default the
/// channels nobody drove.
///
/// Overlaps on one channel are cut at every segment edge; within each piece
/// the layers stack by priority and blend with their own mode. Wherever any
/// segment is active on the fixture, present channels with no segment get a
/// static 0.
pub fn fill(fixture: &FixtureContext, segments: Vec<ChannelSegment>, n_samples: usize) -> Result<ChannelTimeline> {
    let before = segments.len();
    let segments: Vec<ChannelSegment> = segments
        .into_iter()
        .filter(|s| fixture.has_channel(s.channel()) && s.fixture_id() == &fixture.fixture_id)
        .collect();
    if segments.len() < before {
        debug!(
            "{}: skipped {} segments for channels the fixture lacks",
            fixture.fixture_id,
            before - segments.len()
        );
    }

    let active = covered(segments.iter().map(|s| (s.t0_ms(), s.t1_ms())));
    let mut timeline = ChannelTimeline::new();
    for channel in fixture.present_channels() {
        let layers: Vec<&ChannelSegment> = segments.iter().filter(|s| s.channel() == channel).collect();
        let mut pieces = resolve_channel(&layers, n_samples)?;

        let held: Vec<(f64, f64)> = pieces.iter().map(|p| (p.t0_ms(), p.t1_ms())).collect();
        for &span in &active {
            for (t0, t1) in subtract(span, &held) {
                pieces.push(ChannelSegment::new(SegmentDraft::static_value(
                    &fixture.fixture_id,
                    channel,
                    t0,
                    t1,
                    0.0,
                    SegmentSource::Filler,
                ))?);
            }
        }
        pieces.sort_by(|a, b| a.t0_ms().total_cmp(&b.t0_ms()));
        timeline.insert(channel, pieces);
    }
    Ok(timeline)
}

/// Non-overlapping pieces for one channel's layers.
fn resolve_channel(layers: &[&ChannelSegment], n_samples: usize) -> Result<Vec<ChannelSegment>> {
    let mut edges: Vec<f64> = layers.iter().flat_map(|s| [s.t0_ms(), s.t1_ms()]).collect();
    edges.sort_by(f64::total_cmp);
    edges.dedup_by(|a, b| (*a - *b).abs() <= TIME_EPSILON_MS);

    let mut pieces = Vec::new();
    for pair in edges.windows(2) {
        let &[a, b] = pair else { continue };
        if b - a <= TIME_EPSILON_MS {
            continue;
        }
        let mut active: Vec<&ChannelSegment> = layers.iter().copied().filter(|s| s.overlaps(a, b)).collect();
        if active.is_empty() {
            continue;
        }
        // Stable: equal priorities keep authored order, later on top.
        active.sort_by_key(|s| s.priority());
        pieces.push(stack(&active, a, b, n_samples)?);
    }
    Ok(pieces)
}

/// Blend a priority-ordered stack of layers over [a, b].
fn stack(layers: &[&ChannelSegment], a: f64, b: f64, n_samples: usize) -> Result<ChannelSegment> {
    // Nothing under the topmost Override layer is visible.
    let base = layers
        .iter()
        .rposition(|s| s.blend_mode() == BlendMode::Override)
        .unwrap_or(0);
    let visible = layers.get(base..).unwrap_or_default();
    let (Some(bottom), Some(top)) = (visible.first(), visible.last()) else {
        return Err(crate::error::ChoreoError::validation("filler", "empty layer stack"));
    };
    if visible.len() == 1 {
        return bottom.slice(a, b, n_samples);
    }

    let n = n_samples.max(2);
    let values: Vec<(f64, f64)> = grid(n)
        .map(|u| {
            let t_ms = a + (b - a) * u;
            let v = visible
                .iter()
                .skip(1)
                .fold(bottom.value_at(t_ms), |acc, layer| mixer::blend(acc, layer.value_at(t_ms), layer.blend_mode()));
            (u, v)
        })
        .collect();

    let lo = values.iter().map(|(_, v)| *v).fold(0.0_f64, f64::min);
    let hi = values.iter().map(|(_, v)| *v).fold(255.0_f64, f64::max);
    let points = values
        .iter()
        .map(|&(u, v)| CurvePoint::clamped(u, (v - lo) / (hi - lo)))
        .collect();

    let edge = top.slice(a, b, 2)?;
    let draft = SegmentDraft::curve(
        top.fixture_id(),
        top.channel(),
        a,
        b,
        Curve::points(points)?,
        (lo, hi),
        top.source().clone(),
    )
    .with_priority(top.priority(), top.blend_mode())
    .with_transitions(edge.transition_in(), edge.transition_out());
    ChannelSegment::new(draft)
}
