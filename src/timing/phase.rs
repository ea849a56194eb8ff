use indexmap::IndexMap;

use crate::model::{ChaseOrder, Distribution, FixtureContext, FixtureId, PhaseOffsetMode, PhaseOffsetSpec};

/// Offset in bars for each fixture, in chase order. `ordered` must already
/// be sorted by `order_fixtures`.
pub fn calculate_fixture_offsets(spec: &PhaseOffsetSpec, ordered: &[FixtureId]) -> IndexMap<FixtureId, f64> {
    let n = ordered.len();
    ordered
        .iter()
        .enumerate()
        .map(|(i, id)| {
            let offset = match (spec.mode, spec.distribution) {
                (PhaseOffsetMode::None, _) => 0.0,
                (PhaseOffsetMode::GroupOrder, Distribution::Linear) => {
                    if n <= 1 {
                        0.0
                    } else {
                        spec.spread_bars * i as f64 / (n - 1) as f64
                    }
                }
            };
            (id.clone(), offset)
        })
        .collect()
}

/// Offset as a fraction of the step duration. With `wrap` the fraction is
/// taken modulo 1 so it can rotate a periodic curve; without it the raw
/// ratio is returned for delaying the step window.
pub fn calculate_normalized_offset(offset: f64, duration: f64, wrap: bool) -> f64 {
    if duration <= 0.0 {
        return 0.0;
    }
    let ratio = offset / duration;
    if wrap {
        ratio.rem_euclid(1.0)
    } else {
        ratio
    }
}

/// Sort fixtures by position (ties broken by id) and arrange them in chase order.
pub fn order_fixtures<'a>(fixtures: &[&'a FixtureContext], order: ChaseOrder) -> Vec<&'a FixtureContext> {
    let mut by_position: Vec<&FixtureContext> = fixtures.to_vec();
    by_position.sort_by(|a, b| {
        a.position
            .total_cmp(&b.position)
            .then_with(|| a.fixture_id.cmp(&b.fixture_id))
    });

    match order {
        ChaseOrder::LeftToRight => by_position,
        ChaseOrder::RightToLeft => by_position.into_iter().rev().collect(),
        ChaseOrder::OutsideIn => outside_in(&by_position),
        ChaseOrder::InsideOut => outside_in(&by_position).into_iter().rev().collect(),
        ChaseOrder::OddEven => {
            let (odd, even): (Vec<_>, Vec<_>) =
                by_position.into_iter().enumerate().partition(|(i, _)| i % 2 == 0);
            odd.into_iter().chain(even).map(|(_, f)| f).collect()
        }
    }
}

/// Alternate from both ends toward the middle: first, last, second, second-to-last...
fn outside_in<'a>(sorted: &[&'a FixtureContext]) -> Vec<&'a FixtureContext> {
    let mut out = Vec::with_capacity(sorted.len());
    let mut front = sorted.iter();
    let mut take_front = true;
    loop {
        let next = if take_front { front.next() } else { front.next_back() };
        match next {
            Some(f) => out.push(*f),
            None => break,
        }
        take_front = !take_front;
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use float_cmp::approx_eq;

    use super::*;
    use crate::model::fixture::test_support::moving_head;
    use crate::model::RoleToken;

    fn ids(fixtures: &[&FixtureContext]) -> Vec<String> {
        fixtures.iter().map(|f| f.fixture_id.to_string()).collect()
    }

    fn five() -> Vec<FixtureContext> {
        // deliberately out of position order
        vec![
            moving_head("c", RoleToken::Center, 2.0),
            moving_head("a", RoleToken::OuterLeft, 0.0),
            moving_head("e", RoleToken::OuterRight, 4.0),
            moving_head("b", RoleToken::InnerLeft, 1.0),
            moving_head("d", RoleToken::InnerRight, 3.0),
        ]
    }

    #[test]
    fn linear_offsets_span_the_spread() {
        let spec = PhaseOffsetSpec::group_order("all", ChaseOrder::LeftToRight, 1.0, false);
        let order: Vec<FixtureId> = ["a", "b", "c", "d"].into_iter().map(FixtureId::from).collect();
        let offsets: Vec<f64> = calculate_fixture_offsets(&spec, &order).values().copied().collect();
        let expected = [0.0, 1.0 / 3.0, 2.0 / 3.0, 1.0];
        for (got, want) in offsets.iter().zip(expected) {
            assert!(approx_eq!(f64, *got, want, epsilon = 1e-12));
        }
    }

    #[test]
    fn single_fixture_and_none_mode_are_zero() {
        let spec = PhaseOffsetSpec::group_order("all", ChaseOrder::LeftToRight, 2.0, false);
        let one = calculate_fixture_offsets(&spec, &[FixtureId::from("a")]);
        assert_eq!(one.values().copied().collect::<Vec<_>>(), vec![0.0]);

        let none = PhaseOffsetSpec::none();
        let ids: Vec<FixtureId> = ["a", "b"].into_iter().map(FixtureId::from).collect();
        assert!(calculate_fixture_offsets(&none, &ids).values().all(|v| *v == 0.0));
    }

    #[test]
    fn normalized_offset_wraps() {
        assert!(approx_eq!(f64, calculate_normalized_offset(5.0, 4.0, true), 0.25));
        assert!(approx_eq!(f64, calculate_normalized_offset(5.0, 4.0, false), 1.25));
        assert!(approx_eq!(f64, calculate_normalized_offset(1.0, 0.0, true), 0.0));
    }

    #[test]
    fn chase_orders() {
        let fixtures = five();
        let refs: Vec<&FixtureContext> = fixtures.iter().collect();
        assert_eq!(ids(&order_fixtures(&refs, ChaseOrder::LeftToRight)), ["a", "b", "c", "d", "e"]);
        assert_eq!(ids(&order_fixtures(&refs, ChaseOrder::RightToLeft)), ["e", "d", "c", "b", "a"]);
        assert_eq!(ids(&order_fixtures(&refs, ChaseOrder::OutsideIn)), ["a", "e", "b", "d", "c"]);
        assert_eq!(ids(&order_fixtures(&refs, ChaseOrder::InsideOut)), ["c", "d", "b", "e", "a"]);
        assert_eq!(ids(&order_fixtures(&refs, ChaseOrder::OddEven)), ["a", "c", "e", "b", "d"]);
    }
}
