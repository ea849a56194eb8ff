use crate::error::Result;
use crate::model::{BaseTiming, DefaultTiming, Quantize, TimingContext, TimingSpan};

/// Converts between musical time (bars) and wall-clock milliseconds over a
/// song's bar grid.
///
/// Between known bar boundaries the mapping is piecewise linear. Outside
/// them (or when no boundaries are known) the nominal tempo extrapolates
/// from the nearest boundary, or from 0 ms.
#[derive(Debug, Clone, Copy)]
pub struct TimingResolver<'a> {
    ctx: &'a TimingContext,
}

impl<'a> TimingResolver<'a> {
    pub fn new(ctx: &'a TimingContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &'a TimingContext {
        self.ctx
    }

    /// Snap `bars` to the nearest grid point of `quantize`.
    pub fn quantize_bars(&self, bars: f64, quantize: Quantize) -> f64 {
        match quantize.resolution_bars(self.ctx.beats_per_bar()) {
            Some(res) => (bars / res).round() * res,
            None => bars,
        }
    }

    pub fn bars_to_ms(&self, bars: f64, quantize: Quantize) -> f64 {
        let bars = self.quantize_bars(bars, quantize);
        let bounds = self.ctx.bar_boundaries_ms();
        let per_bar = self.ctx.ms_per_bar();
        let (Some(&first), Some(&last)) = (bounds.first(), bounds.last()) else {
            return bars * per_bar;
        };
        let last_bar = (bounds.len() - 1) as f64;
        if bars <= 0.0 {
            return first + bars * per_bar;
        }
        if bars >= last_bar {
            return last + (bars - last_bar) * per_bar;
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let i = bars.floor() as usize;
        match (bounds.get(i), bounds.get(i + 1)) {
            (Some(&a), Some(&b)) => a + (b - a) * (bars - bars.floor()),
            _ => last + (bars - last_bar) * per_bar,
        }
    }

    pub fn ms_to_bars(&self, ms: f64) -> f64 {
        let bounds = self.ctx.bar_boundaries_ms();
        let per_bar = self.ctx.ms_per_bar();
        let (Some(&first), Some(&last)) = (bounds.first(), bounds.last()) else {
            return ms / per_bar;
        };
        let last_bar = (bounds.len() - 1) as f64;
        if ms <= first {
            return (ms - first) / per_bar;
        }
        if ms >= last {
            return last_bar + (ms - last) / per_bar;
        }
        // first boundary strictly greater than ms; ms > first so idx >= 1
        let idx = bounds.partition_point(|b| *b <= ms);
        match (bounds.get(idx - 1), bounds.get(idx)) {
            (Some(&a), Some(&b)) => (idx - 1) as f64 + (ms - a) / (b - a),
            _ => last_bar + (ms - last) / per_bar,
        }
    }

    /// Snap a millisecond time to a musical grid, via bar space.
    pub fn quantize_ms(&self, ms: f64, quantize: Quantize) -> f64 {
        if quantize == Quantize::None {
            return ms;
        }
        self.bars_to_ms(self.ms_to_bars(ms), quantize)
    }

    /// Absolute `(start_ms, end_ms)` of a step whose offsets are relative to
    /// `cycle_start_bar`. Start and end quantize independently; unset
    /// quantize fields inherit `defaults`. If snapping collapses the window,
    /// the unquantized duration is kept from the snapped start.
    pub fn resolve_timing(
        &self,
        timing: &BaseTiming,
        defaults: DefaultTiming,
        cycle_start_bar: f64,
    ) -> Result<(f64, f64)> {
        let q_start = timing.quantize_start.unwrap_or(defaults.quantize_start);
        let q_end = timing.quantize_end.unwrap_or(defaults.quantize_end);

        let (raw_start, raw_end) = match timing.span()? {
            TimingSpan::Musical {
                start_offset_bars,
                duration_bars,
            } => {
                let start_bar = cycle_start_bar + start_offset_bars;
                (
                    self.bars_to_ms(start_bar, Quantize::None),
                    self.bars_to_ms(start_bar + duration_bars, Quantize::None),
                )
            }
            TimingSpan::AbsoluteMs {
                start_offset_ms,
                duration_ms,
            } => {
                let start = self.bars_to_ms(cycle_start_bar, Quantize::None) + start_offset_ms;
                (start, start + duration_ms)
            }
        };

        let start = self.quantize_ms(raw_start, q_start);
        let end = self.quantize_ms(raw_end, q_end);
        if end > start {
            Ok((start, end))
        } else {
            Ok((start, start + (raw_end - raw_start)))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use float_cmp::approx_eq;

    use super::*;

    fn constant_120() -> TimingContext {
        TimingContext::constant(120.0, 4).unwrap()
    }

    fn uneven() -> TimingContext {
        TimingContext::new(vec![1000.0, 3000.0, 4000.0, 7000.0], 4, 120.0).unwrap()
    }

    #[test]
    fn constant_tempo_formula() {
        let ctx = constant_120();
        let r = TimingResolver::new(&ctx);
        assert!(approx_eq!(f64, r.bars_to_ms(1.0, Quantize::None), 2000.0));
        assert!(approx_eq!(f64, r.bars_to_ms(2.5, Quantize::None), 5000.0));
        assert!(approx_eq!(f64, r.ms_to_bars(3000.0), 1.5));
    }

    #[test]
    fn interpolates_between_boundaries() {
        let ctx = uneven();
        let r = TimingResolver::new(&ctx);
        assert!(approx_eq!(f64, r.bars_to_ms(0.0, Quantize::None), 1000.0));
        assert!(approx_eq!(f64, r.bars_to_ms(0.5, Quantize::None), 2000.0));
        assert!(approx_eq!(f64, r.bars_to_ms(1.5, Quantize::None), 3500.0));
        assert!(approx_eq!(f64, r.bars_to_ms(3.0, Quantize::None), 7000.0));
    }

    #[test]
    fn extrapolates_outside_boundaries() {
        let ctx = uneven();
        let r = TimingResolver::new(&ctx);
        assert!(approx_eq!(f64, r.bars_to_ms(4.0, Quantize::None), 9000.0));
        assert!(approx_eq!(f64, r.bars_to_ms(-0.25, Quantize::None), 500.0));
        assert!(approx_eq!(f64, r.ms_to_bars(9000.0), 4.0));
        assert!(approx_eq!(f64, r.ms_to_bars(0.0), -0.5));
    }

    #[test]
    fn round_trip_without_quantize() {
        for ctx in [constant_120(), uneven()] {
            let r = TimingResolver::new(&ctx);
            for i in -8..40 {
                let bars = f64::from(i) * 0.137;
                let back = r.ms_to_bars(r.bars_to_ms(bars, Quantize::None));
                assert!((back - bars).abs() < 1e-6, "{bars} -> {back}");
            }
        }
    }

    #[test]
    fn quantize_snaps_to_nearest_grid_point() {
        let ctx = constant_120();
        let r = TimingResolver::new(&ctx);
        assert!(approx_eq!(f64, r.quantize_bars(1.3, Quantize::Downbeat), 1.0));
        assert!(approx_eq!(f64, r.quantize_bars(1.3, Quantize::HalfBar), 1.5));
        assert!(approx_eq!(f64, r.quantize_bars(1.3, Quantize::Beat), 1.25));
        assert!(approx_eq!(f64, r.bars_to_ms(1.3, Quantize::Downbeat), 2000.0));
    }

    #[test]
    fn resolve_musical_step() {
        let ctx = constant_120();
        let r = TimingResolver::new(&ctx);
        let timing = BaseTiming::musical(0.5, 1.0);
        let (s, e) = r.resolve_timing(&timing, DefaultTiming::default(), 2.0).unwrap();
        assert!(approx_eq!(f64, s, 5000.0));
        assert!(approx_eq!(f64, e, 7000.0));
    }

    #[test]
    fn resolve_inherits_default_quantize() {
        let ctx = constant_120();
        let r = TimingResolver::new(&ctx);
        let defaults = DefaultTiming {
            quantize_start: Quantize::Downbeat,
            quantize_end: Quantize::Downbeat,
        };
        let timing = BaseTiming::musical(0.2, 1.6);
        let (s, e) = r.resolve_timing(&timing, defaults, 0.0).unwrap();
        assert!(approx_eq!(f64, s, 0.0));
        assert!(approx_eq!(f64, e, 4000.0));

        // explicit step fields win over the defaults
        let timing = BaseTiming::musical(0.2, 1.6).with_quantize(Quantize::None, Quantize::None);
        let (s, _) = r.resolve_timing(&timing, defaults, 0.0).unwrap();
        assert!(approx_eq!(f64, s, 400.0));
    }

    #[test]
    fn resolve_absolute_step() {
        let ctx = constant_120();
        let r = TimingResolver::new(&ctx);
        let timing = BaseTiming::absolute_ms(250.0, 500.0);
        let (s, e) = r.resolve_timing(&timing, DefaultTiming::default(), 1.0).unwrap();
        assert!(approx_eq!(f64, s, 2250.0));
        assert!(approx_eq!(f64, e, 2750.0));
    }

    #[test]
    fn collapsed_quantize_keeps_duration() {
        let ctx = constant_120();
        let r = TimingResolver::new(&ctx);
        let timing = BaseTiming::musical(0.1, 0.2).with_quantize(Quantize::Downbeat, Quantize::Downbeat);
        let (s, e) = r.resolve_timing(&timing, DefaultTiming::default(), 0.0).unwrap();
        assert!(approx_eq!(f64, s, 0.0));
        assert!(approx_eq!(f64, e, 400.0, epsilon = 1e-9));
    }
}
