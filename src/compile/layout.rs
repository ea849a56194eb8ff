use crate::model::{RemainderPolicy, RepeatMode, Step, Template};

/// Tolerance when counting whole cycles in a section.
const BAR_EPSILON: f64 = 1e-9;

/// One step played in one cycle.
#[derive(Debug, Clone, Copy)]
pub struct Placement<'t> {
    pub step: &'t Step,
    /// Zero-based cycle index.
    pub cycle: usize,
    /// Absolute bar at which the cycle starts.
    pub cycle_start_bar: f64,
    /// Ping-pong odd cycle: window mirrored inside the cycle, curves reversed.
    pub mirrored: bool,
}

/// What happens in the part of the section after the last full cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RemainderPlan {
    /// Nothing left over, or a partial cycle was already placed and clips at the section end.
    None,
    /// Hold each channel's last value from `start_bar` to the section end.
    Hold { start_bar: f64 },
    /// As `Hold`, with the dimmer ramping to 0.
    Fade { start_bar: f64 },
}

#[derive(Debug, Clone)]
pub struct Layout<'t> {
    pub placements: Vec<Placement<'t>>,
    /// Full cycles laid out.
    pub cycles: usize,
    pub remainder: RemainderPlan,
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn whole_cycles(duration_bars: f64, cycle_bars: f64) -> usize {
    (duration_bars / cycle_bars + BAR_EPSILON).floor().max(0.0) as usize
}

/// Lay out a template's cycles over `duration_bars` starting at `start_bar`.
///
/// The first cycle plays every step, later ones only the loop steps. A
/// template that is not repeatable plays once. Truncate fills the remainder
/// with one more cycle that the caller clips to the section end; Hold and
/// Fade need at least one full cycle to hold from and otherwise degrade to
/// Truncate.
pub fn layout(template: &Template, start_bar: f64, duration_bars: f64) -> Layout<'_> {
    let repeat = template.repeat();
    let cycle_bars = repeat.cycle_bars;

    let full = if repeat.repeatable {
        whole_cycles(duration_bars, cycle_bars)
    } else {
        usize::from(duration_bars > BAR_EPSILON)
    };
    let played_bars = full as f64 * cycle_bars;
    let leftover = duration_bars - played_bars > BAR_EPSILON;

    let mut policy = repeat.remainder_policy;
    if full == 0 && policy != RemainderPolicy::Truncate {
        policy = RemainderPolicy::Truncate;
    }
    // Nothing repeats after a one-shot template, so truncation leaves the rest idle.
    let extra = usize::from(leftover && policy == RemainderPolicy::Truncate && (repeat.repeatable || full == 0));

    let mut placements = Vec::new();
    for cycle in 0..full + extra {
        let cycle_start_bar = start_bar + cycle as f64 * cycle_bars;
        let mirrored = repeat.mode == RepeatMode::PingPong && cycle % 2 == 1;
        for step in template.steps() {
            let looped = repeat.loop_step_ids.iter().any(|id| id == step.step_id());
            if cycle == 0 || looped {
                placements.push(Placement {
                    step,
                    cycle,
                    cycle_start_bar,
                    mirrored,
                });
            }
        }
    }

    let remainder_start = start_bar + played_bars;
    let remainder = match policy {
        _ if !leftover => RemainderPlan::None,
        RemainderPolicy::Truncate => RemainderPlan::None,
        RemainderPolicy::HoldLastPose => RemainderPlan::Hold {
            start_bar: remainder_start,
        },
        RemainderPolicy::FadeOut => RemainderPlan::Fade {
            start_bar: remainder_start,
        },
    };

    Layout {
        placements,
        cycles: full,
        remainder,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::model::template::test_support::{repeat, simple_draft};
    use crate::model::{BaseTiming, RepeatContract, StepDraft, StepTarget, TemplateDraft};

    fn two_steps(contract: RepeatContract) -> Template {
        let mut draft: TemplateDraft = simple_draft("t");
        draft.steps.push(StepDraft::new(
            "intro",
            StepTarget::Group("all".into()),
            BaseTiming::musical(0.0, 0.5),
        ));
        draft.repeat = contract;
        Template::new(draft).unwrap()
    }

    fn ids(l: &Layout<'_>) -> Vec<(usize, String)> {
        l.placements
            .iter()
            .map(|p| (p.cycle, p.step.step_id().to_string()))
            .collect()
    }

    #[test]
    fn later_cycles_play_loop_steps_only() {
        let t = two_steps(repeat(1.0, &["main"]));
        let l = layout(&t, 8.0, 3.0);
        assert_eq!(l.cycles, 3);
        assert_eq!(
            ids(&l),
            vec![
                (0, "main".to_string()),
                (0, "intro".to_string()),
                (1, "main".to_string()),
                (2, "main".to_string())
            ]
        );
        assert_eq!(l.placements[3].cycle_start_bar, 10.0);
        assert_eq!(l.remainder, RemainderPlan::None);
    }

    #[test]
    fn ping_pong_mirrors_odd_cycles() {
        let mut contract = repeat(1.0, &["main"]);
        contract.mode = RepeatMode::PingPong;
        let t = two_steps(contract);
        let l = layout(&t, 0.0, 3.0);
        let mirrored: Vec<bool> = l.placements.iter().filter(|p| p.step.step_id() == "main").map(|p| p.mirrored).collect();
        assert_eq!(mirrored, vec![false, true, false]);
    }

    #[test]
    fn truncate_adds_a_partial_cycle() {
        let t = two_steps(repeat(2.0, &["main"]));
        let l = layout(&t, 0.0, 5.0);
        assert_eq!(l.cycles, 2);
        assert_eq!(l.placements.iter().filter(|p| p.cycle == 2).count(), 1);
        assert_eq!(l.remainder, RemainderPlan::None);
    }

    #[test]
    fn hold_and_fade_plan_the_remainder() {
        let mut contract = repeat(2.0, &["main"]);
        contract.remainder_policy = RemainderPolicy::HoldLastPose;
        let t = two_steps(contract.clone());
        let l_hold = layout(&t, 0.0, 5.0);
        assert_eq!(l_hold.remainder, RemainderPlan::Hold { start_bar: 4.0 });

        contract.remainder_policy = RemainderPolicy::FadeOut;
        let t = two_steps(contract);
        let l = layout(&t, 0.0, 5.0);
        assert_eq!(l.remainder, RemainderPlan::Fade { start_bar: 4.0 });
        assert!(l.placements.iter().all(|p| p.cycle < 2));
    }

    #[test]
    fn short_sections_degrade_to_truncate() {
        let mut contract = repeat(4.0, &["main"]);
        contract.remainder_policy = RemainderPolicy::HoldLastPose;
        let t = two_steps(contract);
        let l = layout(&t, 0.0, 2.0);
        assert_eq!(l.cycles, 0);
        assert_eq!(l.remainder, RemainderPlan::None);
        assert_eq!(l.placements.len(), 2);
    }

    #[test]
    fn one_shot_plays_once() {
        let mut contract = repeat(1.0, &["main"]);
        contract.repeatable = false;
        let t = two_steps(contract);
        let l = layout(&t, 0.0, 4.0);
        assert_eq!(l.cycles, 1);
        assert_eq!(l.placements.len(), 2);
        assert_eq!(l.remainder, RemainderPlan::None);
    }
}
