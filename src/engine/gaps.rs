use crate::error::Result;
use crate::model::{ChannelKind, ChannelSegment, FixtureContext, Gap, SegmentDraft, SegmentSource};
use crate::settings::JobDefaults;

use super::boundary::BoundaryEnforcer;
use super::filler::ChannelTimeline;
use super::{covered, subtract};

/// Soft-home device value for a channel: beam at 0°/0°, shutter closed,
/// dimmer dark, color and gobo open.
pub fn home_value(fixture: &FixtureContext, channel: ChannelKind, job: JobDefaults) -> f64 {
    let enforcer = BoundaryEnforcer::new(fixture);
    let v = match channel {
        ChannelKind::Pan => enforcer.pan_to_dmx(0.0),
        ChannelKind::Tilt => enforcer.tilt_to_dmx(0.0),
        ChannelKind::Dimmer => 0.0,
        ChannelKind::Shutter => fixture.calibration.shutter_closed_dmx,
        ChannelKind::Color => job.color_dmx,
        ChannelKind::Gobo => job.gobo_dmx,
    };
    enforcer.clamp(channel, v)
}

/// Fill every stretch of `window` with no active segment with soft-home
/// segments on all present channels. Returns one `Gap` per stretch.
pub fn fill_gaps(
    fixture: &FixtureContext,
    timeline: &mut ChannelTimeline,
    window: (f64, f64),
    job: JobDefaults,
) -> Result<Vec<Gap>> {
    let active = covered(timeline.values().flatten().map(|s| (s.t0_ms(), s.t1_ms())));
    let holes = subtract(window, &active);
    let channels: Vec<ChannelKind> = fixture.present_channels().collect();

    let mut gaps = Vec::with_capacity(holes.len());
    for (t0, t1) in holes {
        for &channel in &channels {
            let seg = ChannelSegment::new(SegmentDraft::static_value(
                &fixture.fixture_id,
                channel,
                t0,
                t1,
                home_value(fixture, channel, job),
                SegmentSource::Gap,
            ))?;
            timeline.entry(channel).or_default().push(seg);
        }
        gaps.push(Gap {
            fixture_id: fixture.fixture_id.clone(),
            channels: channels.clone(),
            t0_ms: t0,
            t1_ms: t1,
        });
    }
    for pieces in timeline.values_mut() {
        pieces.sort_by(|a, b| a.t0_ms().total_cmp(&b.t0_ms()));
    }
    Ok(gaps)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::engine::filler::fill;
    use crate::model::fixture::test_support::moving_head;
    use crate::model::RoleToken;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn gaps_between_effects_go_home() {
        let f = moving_head("mh1", RoleToken::Center, 0.0);
        let seg = ChannelSegment::new(SegmentDraft::static_value(
            &f.fixture_id,
            ChannelKind::Dimmer,
            1000.0,
            2000.0,
            255.0,
            SegmentSource::Authored { step_id: "a".into() },
        ))
        .unwrap();
        let mut timeline = fill(&f, vec![seg], 8).unwrap();
        let gaps = fill_gaps(&f, &mut timeline, (0.0, 3000.0), JobDefaults::default()).unwrap();

        assert_eq!(gaps.len(), 2);
        assert!(approx(gaps[0].t1_ms, 1000.0));
        assert!(approx(gaps[1].t0_ms, 2000.0));
        assert_eq!(gaps[0].channels.len(), 6);

        let pan = timeline.get(&ChannelKind::Pan).unwrap();
        assert_eq!(pan.len(), 3);
        assert_eq!(pan[0].source(), &SegmentSource::Gap);
        assert!(approx(pan[0].value_at(0.0), 127.5));
        let tilt = timeline.get(&ChannelKind::Tilt).unwrap();
        assert!(approx(tilt[0].value_at(0.0), 42.5));
    }

    #[test]
    fn idle_fixture_is_one_gap() {
        let f = moving_head("mh1", RoleToken::Center, 0.0);
        let mut timeline = fill(&f, Vec::new(), 8).unwrap();
        let gaps = fill_gaps(&f, &mut timeline, (0.0, 500.0), JobDefaults::default()).unwrap();
        assert_eq!(gaps.len(), 1);
        let shutter = timeline.get(&ChannelKind::Shutter).unwrap();
        assert!(approx(shutter[0].value_at(10.0), 0.0));
    }
}
