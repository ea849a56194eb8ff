use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum_macros::EnumIter;

use crate::error::{ChoreoError, Result};

/// Bar/beat grid for one song, built once per render request from external
/// audio analysis. Empty or short boundary lists fall back to constant tempo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(try_from = "TimingContextRaw")]
pub struct TimingContext {
    bar_boundaries_ms: Vec<f64>,
    beats_per_bar: u32,
    tempo_bpm: f64,
}

#[derive(Deserialize)]
struct TimingContextRaw {
    #[serde(default)]
    bar_boundaries_ms: Vec<f64>,
    beats_per_bar: u32,
    tempo_bpm: f64,
}

impl TryFrom<TimingContextRaw> for TimingContext {
    type Error = ChoreoError;
    fn try_from(raw: TimingContextRaw) -> Result<Self> {
        TimingContext::new(raw.bar_boundaries_ms, raw.beats_per_bar, raw.tempo_bpm)
    }
}

impl TimingContext {
    /// Boundaries must be strictly increasing; tempo and meter must be positive.
    pub fn new(bar_boundaries_ms: Vec<f64>, beats_per_bar: u32, tempo_bpm: f64) -> Result<Self> {
        if beats_per_bar == 0 {
            return Err(ChoreoError::validation("timing context", "beats_per_bar must be > 0"));
        }
        if !(tempo_bpm.is_finite() && tempo_bpm > 0.0) {
            return Err(ChoreoError::validation(
                "timing context",
                format!("tempo_bpm must be positive, got {tempo_bpm}"),
            ));
        }
        if let Some(bad) = bar_boundaries_ms.iter().find(|b| !b.is_finite()) {
            return Err(ChoreoError::validation(
                "timing context",
                format!("bar boundaries must be finite, got {bad}"),
            ));
        }
        for pair in bar_boundaries_ms.windows(2) {
            if let [a, b] = pair {
                if b <= a {
                    return Err(ChoreoError::validation(
                        "timing context",
                        format!("bar boundaries must increase strictly ({a} then {b})"),
                    ));
                }
            }
        }
        Ok(Self {
            bar_boundaries_ms,
            beats_per_bar,
            tempo_bpm,
        })
    }

    /// Constant-tempo grid with no audio-derived boundaries.
    pub fn constant(tempo_bpm: f64, beats_per_bar: u32) -> Result<Self> {
        Self::new(Vec::new(), beats_per_bar, tempo_bpm)
    }

    pub fn bar_boundaries_ms(&self) -> &[f64] {
        &self.bar_boundaries_ms
    }

    pub fn beats_per_bar(&self) -> u32 {
        self.beats_per_bar
    }

    pub fn tempo_bpm(&self) -> f64 {
        self.tempo_bpm
    }

    /// Bar length implied by the nominal tempo.
    pub fn ms_per_bar(&self) -> f64 {
        60_000.0 / self.tempo_bpm * f64::from(self.beats_per_bar)
    }
}

/// Grid a musical time snaps to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema, EnumIter,
)]
#[serde(rename_all = "snake_case")]
pub enum Quantize {
    #[default]
    None,
    Beat,
    Downbeat,
    HalfBar,
    QuarterBar,
    EighthBar,
    SixteenthBar,
}

impl Quantize {
    /// Grid resolution in bars, or None when no snapping applies.
    pub fn resolution_bars(self, beats_per_bar: u32) -> Option<f64> {
        match self {
            Quantize::None => None,
            Quantize::Beat => Some(1.0 / f64::from(beats_per_bar.max(1))),
            Quantize::Downbeat => Some(1.0),
            Quantize::HalfBar => Some(0.5),
            Quantize::QuarterBar => Some(0.25),
            Quantize::EighthBar => Some(0.125),
            Quantize::SixteenthBar => Some(0.0625),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_increasing_boundaries() {
        assert!(TimingContext::new(vec![0.0, 500.0, 500.0], 4, 120.0).is_err());
        assert!(TimingContext::new(vec![0.0, 2000.0, 4000.0], 4, 120.0).is_ok());
        assert!(TimingContext::new(vec![0.0, f64::NAN, 4000.0], 4, 120.0).is_err());
        assert!(TimingContext::new(vec![f64::NAN], 4, 120.0).is_err());
    }

    #[test]
    fn rejects_bad_tempo_and_meter() {
        assert!(TimingContext::constant(0.0, 4).is_err());
        assert!(TimingContext::constant(120.0, 0).is_err());
    }

    #[test]
    fn ms_per_bar_formula() {
        let ctx = TimingContext::constant(120.0, 4).unwrap();
        assert!((ctx.ms_per_bar() - 2000.0).abs() < 1e-9);
    }

    #[test]
    fn quantize_resolutions() {
        assert_eq!(Quantize::Beat.resolution_bars(4), Some(0.25));
        assert_eq!(Quantize::Beat.resolution_bars(3), Some(1.0 / 3.0));
        assert_eq!(Quantize::Downbeat.resolution_bars(4), Some(1.0));
        assert_eq!(Quantize::SixteenthBar.resolution_bars(4), Some(0.0625));
        assert_eq!(Quantize::None.resolution_bars(4), None);
    }

    #[test]
    fn deserialize_defaults_boundaries() {
        let ctx: TimingContext =
            serde_json::from_str(r#"{"beats_per_bar":4,"tempo_bpm":128.0}"#).unwrap();
        assert!(ctx.bar_boundaries_ms().is_empty());
    }
}
