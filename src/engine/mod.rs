//! Composition: turns the raw, possibly-overlapping segments of a section
//! into one clean timeline per fixture.
//!
//! Each fixture runs the same chain independently:
//! filler → gap filler → transition resolver → boundary enforcer.

pub mod boundary;
pub mod filler;
pub mod gaps;
pub mod mixer;
pub mod transitions;

use std::collections::HashMap;

use log::debug;
use rayon::prelude::*;
use serde::Serialize;

use crate::error::{ChoreoError, Result};
use crate::model::{ChannelSegment, FixtureContext, FixtureId, Gap, Rig};
use crate::settings::CompilerSettings;

use boundary::BoundaryEnforcer;
use filler::ChannelTimeline;

/// Two instants closer than this are the same instant.
pub(crate) const TIME_EPSILON_MS: f64 = 1e-6;

// ── Interval helpers ─────────────────────────────────────────────

/// Union of spans, sorted and merged. Empty spans are dropped.
pub(crate) fn covered(spans: impl IntoIterator<Item = (f64, f64)>) -> Vec<(f64, f64)> {
    let mut spans: Vec<(f64, f64)> = spans.into_iter().filter(|(a, b)| b - a > TIME_EPSILON_MS).collect();
    spans.sort_by(|x, y| x.0.total_cmp(&y.0));

    let mut merged: Vec<(f64, f64)> = Vec::with_capacity(spans.len());
    for (a, b) in spans {
        match merged.last_mut() {
            Some(last) if a <= last.1 + TIME_EPSILON_MS => last.1 = last.1.max(b),
            _ => merged.push((a, b)),
        }
    }
    merged
}

/// Parts of `span` not inside any of `covered` (which must be sorted and
/// merged). Slivers shorter than the time epsilon are dropped.
pub(crate) fn subtract(span: (f64, f64), covered: &[(f64, f64)]) -> Vec<(f64, f64)> {
    let (start, end) = span;
    let mut holes = Vec::new();
    let mut cursor = start;
    for &(a, b) in covered {
        if b <= cursor {
            continue;
        }
        if a >= end {
            break;
        }
        if a - cursor > TIME_EPSILON_MS {
            holes.push((cursor, a));
        }
        cursor = cursor.max(b);
    }
    if end - cursor > TIME_EPSILON_MS {
        holes.push((cursor, end));
    }
    holes
}

// ── Composition ──────────────────────────────────────────────────

/// A fixture's final, clamped timeline plus the idle stretches that were
/// filled with its home position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComposedFixture {
    pub fixture_id: FixtureId,
    pub channels: ChannelTimeline,
    pub gaps: Vec<Gap>,
}

impl ComposedFixture {
    pub fn segment_count(&self) -> usize {
        self.channels.values().map(Vec::len).sum()
    }

    /// Every segment, channel by channel.
    pub fn segments(&self) -> impl Iterator<Item = &ChannelSegment> {
        self.channels.values().flatten()
    }
}

/// Run one fixture's segments through the full chain.
pub fn compose_fixture(
    fixture: &FixtureContext,
    segments: Vec<ChannelSegment>,
    window: (f64, f64),
    settings: &CompilerSettings,
) -> Result<ComposedFixture> {
    fixture.calibration.validate()?;
    let n = settings.samples_per_curve;
    let mut channels = filler::fill(fixture, segments, n)?;
    let gaps = gaps::fill_gaps(fixture, &mut channels, window, settings.job_defaults)?;

    let enforcer = BoundaryEnforcer::new(fixture);
    let mut composed = ChannelTimeline::with_capacity(channels.len());
    for (channel, pieces) in channels {
        let pieces = transitions::resolve(channel, pieces, n)?;
        composed.insert(channel, enforcer.enforce_all(&pieces, n)?);
    }
    Ok(ComposedFixture {
        fixture_id: fixture.fixture_id.clone(),
        channels: composed,
        gaps,
    })
}

/// Compose every fixture of the rig over `window`. Fixtures are independent
/// and run on the rayon pool when `settings.parallel` is set. Output follows
/// rig order either way.
pub fn compose(
    rig: &Rig,
    segments: Vec<ChannelSegment>,
    window: (f64, f64),
    settings: &CompilerSettings,
) -> Result<Vec<ComposedFixture>> {
    rig.validate()?;
    let mut by_fixture: HashMap<FixtureId, Vec<ChannelSegment>> = HashMap::new();
    for seg in segments {
        if rig.get(seg.fixture_id()).is_none() {
            return Err(ChoreoError::validation(
                "compose",
                format!("segment targets unknown fixture '{}'", seg.fixture_id()),
            ));
        }
        by_fixture.entry(seg.fixture_id().clone()).or_default().push(seg);
    }

    let jobs: Vec<(&FixtureContext, Vec<ChannelSegment>)> = rig
        .fixtures
        .iter()
        .map(|f| (f, by_fixture.remove(&f.fixture_id).unwrap_or_default()))
        .collect();

    let composed: Vec<ComposedFixture> = if settings.parallel {
        jobs.into_par_iter()
            .map(|(f, segs)| compose_fixture(f, segs, window, settings))
            .collect::<Result<_>>()?
    } else {
        jobs.into_iter()
            .map(|(f, segs)| compose_fixture(f, segs, window, settings))
            .collect::<Result<_>>()?
    };

    debug!(
        "composed {} fixtures over {:.0}..{:.0} ms: {} segments, {} gaps",
        composed.len(),
        window.0,
        window.1,
        composed.iter().map(ComposedFixture::segment_count).sum::<usize>(),
        composed.iter().map(|c| c.gaps.len()).sum::<usize>()
    );
    Ok(composed)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::model::fixture::test_support::four_head_rig;
    use crate::model::{ChannelKind, SegmentDraft, SegmentSource, Transition};

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    fn dimmer(id: &str, t0: f64, t1: f64, dmx: f64) -> ChannelSegment {
        ChannelSegment::new(SegmentDraft::static_value(
            &FixtureId::from(id),
            ChannelKind::Dimmer,
            t0,
            t1,
            dmx,
            SegmentSource::Authored { step_id: "s".into() },
        ))
        .unwrap()
    }

    #[test]
    fn covered_merges_and_drops_empty() {
        let c = covered([(5.0, 6.0), (0.0, 2.0), (1.0, 3.0), (4.0, 4.0)]);
        assert_eq!(c, vec![(0.0, 3.0), (5.0, 6.0)]);
    }

    #[test]
    fn subtract_finds_holes() {
        let holes = subtract((0.0, 10.0), &[(2.0, 3.0), (5.0, 12.0)]);
        assert_eq!(holes, vec![(0.0, 2.0), (3.0, 5.0)]);
        assert!(subtract((0.0, 1.0), &[(0.0, 1.0)]).is_empty());
        assert_eq!(subtract((0.0, 1.0), &[]), vec![(0.0, 1.0)]);
    }

    #[test]
    fn every_fixture_covers_the_window() {
        let rig = four_head_rig();
        let segs = vec![dimmer("mh1", 0.0, 1000.0, 200.0), dimmer("mh2", 500.0, 1500.0, 100.0)];
        let out = compose(&rig, segs, (0.0, 2000.0), &CompilerSettings::default()).unwrap();
        assert_eq!(out.len(), 4);
        assert_eq!(out[0].fixture_id, FixtureId::from("mh1"));

        for fixture in &out {
            for (channel, pieces) in &fixture.channels {
                let spans = covered(pieces.iter().map(|s| (s.t0_ms(), s.t1_ms())));
                assert_eq!(spans.len(), 1, "{}/{channel:?}", fixture.fixture_id);
                assert!(approx(spans[0].0, 0.0));
                assert!(approx(spans[0].1, 2000.0));
            }
        }
        // idle fixtures are one gap
        assert_eq!(out[2].gaps.len(), 1);
        assert_eq!(out[0].gaps.len(), 1);
    }

    #[test]
    fn sequential_and_parallel_agree() {
        let rig = four_head_rig();
        let segs = || {
            vec![
                dimmer("mh1", 0.0, 1000.0, 200.0),
                ChannelSegment::new(
                    SegmentDraft::static_value(
                        &FixtureId::from("mh1"),
                        ChannelKind::Dimmer,
                        1000.0,
                        2000.0,
                        50.0,
                        SegmentSource::Authored { step_id: "b".into() },
                    )
                    .with_transitions(Some(Transition::Crossfade { duration_ms: 300.0 }), None),
                )
                .unwrap(),
            ]
        };
        let parallel = compose(&rig, segs(), (0.0, 2000.0), &CompilerSettings::default()).unwrap();
        let sequential = compose(
            &rig,
            segs(),
            (0.0, 2000.0),
            &CompilerSettings {
                parallel: false,
                ..CompilerSettings::default()
            },
        )
        .unwrap();
        assert_eq!(parallel, sequential);

        let d = parallel[0].channels.get(&ChannelKind::Dimmer).unwrap();
        assert!(d.iter().any(|s| s.source() == &SegmentSource::Transition));
    }

    #[test]
    fn unknown_fixture_is_rejected() {
        let rig = four_head_rig();
        let err = compose(&rig, vec![dimmer("ghost", 0.0, 10.0, 0.0)], (0.0, 10.0), &CompilerSettings::default());
        assert!(err.is_err());
    }

    #[test]
    fn output_stays_inside_limits() {
        let mut rig = four_head_rig();
        rig.fixtures[0].calibration.dimmer_ceiling_dmx = 180.0;
        let segs = vec![dimmer("mh1", 0.0, 1000.0, 255.0)];
        let out = compose(&rig, segs, (0.0, 1000.0), &CompilerSettings::default()).unwrap();
        let d = out[0].channels.get(&ChannelKind::Dimmer).unwrap();
        assert!(approx(d[0].value_at(500.0), 180.0));
    }

    #[test]
    fn reversed_calibration_is_a_validation_error() {
        let mut rig = four_head_rig();
        if let Some(f) = rig.fixtures.first_mut() {
            f.calibration.pan_min_dmx = 200.0;
            f.calibration.pan_max_dmx = 100.0;
        }
        let settings = CompilerSettings::default();
        let err = compose(&rig, vec![dimmer("mh1", 0.0, 500.0, 255.0)], (0.0, 1000.0), &settings).unwrap_err();
        assert!(matches!(err, ChoreoError::Validation { .. }), "{err}");
    }
}
