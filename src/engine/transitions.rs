use crate::error::Result;
use crate::model::{ChannelKind, ChannelSegment, SegmentSource, Transition};

use super::TIME_EPSILON_MS;

/// The transition that governs the boundary between two abutting segments:
/// the incoming segment's entry wins over the outgoing segment's exit.
pub fn boundary_transition(prev: &ChannelSegment, next: &ChannelSegment) -> Transition {
    next.transition_in()
        .or(prev.transition_out())
        .unwrap_or(Transition::Snap)
}

/// Rewrite one channel's sorted, non-overlapping pieces so every abutting
/// boundary carries its transition.
///
/// A crossfade replaces `duration_ms` centered on the boundary with a ramp
/// between the neighbours' values there, never eating more than half of
/// either neighbour. Fade-through-black dips the dimmer to 0 and back over
/// the same window; on other channels it snaps.
pub fn resolve(channel: ChannelKind, pieces: Vec<ChannelSegment>, n_samples: usize) -> Result<Vec<ChannelSegment>> {
    let mut out = Vec::with_capacity(pieces.len());
    let mut iter = pieces.into_iter();
    let Some(mut prev) = iter.next() else {
        return Ok(out);
    };

    for next in iter {
        let abutting = (next.t0_ms() - prev.t1_ms()).abs() <= TIME_EPSILON_MS;
        let transition = boundary_transition(&prev, &next);
        let half = (transition.duration_ms() / 2.0)
            .min(prev.duration_ms() / 2.0)
            .min(next.duration_ms() / 2.0);

        let bridged = match transition {
            _ if !abutting || half <= TIME_EPSILON_MS => None,
            Transition::Snap => None,
            Transition::FadeThroughBlack { .. } if channel != ChannelKind::Dimmer => None,
            Transition::Crossfade { .. } | Transition::FadeThroughBlack { .. } => Some(transition),
        };
        let Some(transition) = bridged else {
            out.push(prev);
            prev = next;
            continue;
        };

        let b = prev.t1_ms();
        let (a, c) = (b - half, b + half);
        let from = prev.value_at(a).clamp(0.0, 255.0);
        let to = next.value_at(c).clamp(0.0, 255.0);
        let id = prev.fixture_id().clone();

        out.push(prev.slice(prev.t0_ms(), a, n_samples)?);
        match transition {
            Transition::FadeThroughBlack { .. } => {
                out.push(ChannelSegment::ramp(&id, channel, a, b, from, 0.0, SegmentSource::Transition)?);
                out.push(ChannelSegment::ramp(&id, channel, b, c, 0.0, to, SegmentSource::Transition)?);
            }
            _ => out.push(ChannelSegment::ramp(&id, channel, a, c, from, to, SegmentSource::Transition)?),
        }
        prev = next.slice(c, next.t1_ms(), n_samples)?;
    }
    out.push(prev);
    Ok(out)
}
