use std::path::Path;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{ChoreoError, Result};
use crate::files::read_json;
use crate::model::TimingContext;

// ── Job defaults ─────────────────────────────────────────────────

/// Guaranteed-valid values for the non-movement channels. Used when a step
/// leaves a channel unspecified, and as the soft fallback when a requested
/// override cannot be honored on a fixture.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct JobDefaults {
    /// Whether the shutter sits open while a step is lit.
    pub shutter_open: bool,
    /// Open color wheel slot.
    pub color_dmx: f64,
    /// Open gobo slot.
    pub gobo_dmx: f64,
}

impl Default for JobDefaults {
    fn default() -> Self {
        Self {
            shutter_open: true,
            color_dmx: 0.0,
            gobo_dmx: 0.0,
        }
    }
}

// ── Compiler settings ────────────────────────────────────────────

/// Tunables for a compilation run. Every field has a default, so a settings
/// file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct CompilerSettings {
    /// Samples used whenever a curve has to be realized as points.
    pub samples_per_curve: usize,
    /// RDP tolerance for codec output, in normalized value units.
    pub rdp_epsilon: f64,
    /// Tempo used when no timing context is supplied.
    pub fallback_tempo_bpm: f64,
    pub fallback_beats_per_bar: u32,
    /// Compose fixtures on the rayon pool.
    pub parallel: bool,
    pub job_defaults: JobDefaults,
}

impl Default for CompilerSettings {
    fn default() -> Self {
        Self {
            samples_per_curve: 64,
            rdp_epsilon: 1.0 / 255.0,
            fallback_tempo_bpm: 120.0,
            fallback_beats_per_bar: 4,
            parallel: true,
            job_defaults: JobDefaults::default(),
        }
    }
}

impl CompilerSettings {
    /// Load from a JSON file. Missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let settings: Self = read_json(path)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        let err = |msg: String| ChoreoError::validation("settings", msg);
        if self.samples_per_curve < 2 {
            return Err(err(format!("samples_per_curve must be >= 2, got {}", self.samples_per_curve)));
        }
        if !(self.rdp_epsilon >= 0.0) {
            return Err(err(format!("rdp_epsilon must be >= 0, got {}", self.rdp_epsilon)));
        }
        let jd = self.job_defaults;
        for (name, v) in [("color_dmx", jd.color_dmx), ("gobo_dmx", jd.gobo_dmx)] {
            if !(0.0..=255.0).contains(&v) {
                return Err(err(format!("job_defaults.{name}={v} is outside [0, 255]")));
            }
        }
        self.fallback_timing().map(|_| ())
    }

    /// Constant-tempo grid built from the fallback tempo and meter.
    pub fn fallback_timing(&self) -> Result<TimingContext> {
        TimingContext::constant(self.fallback_tempo_bpm, self.fallback_beats_per_bar)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_fills_defaults() {
        let s: CompilerSettings = serde_json::from_str(r#"{"samples_per_curve": 128}"#).unwrap();
        assert_eq!(s.samples_per_curve, 128);
        assert!(s.parallel);
        assert!(s.job_defaults.shutter_open);
        assert!((s.rdp_epsilon - 1.0 / 255.0).abs() < 1e-12);
    }

    #[test]
    fn invalid_settings_rejected() {
        let mut s = CompilerSettings::default();
        s.samples_per_curve = 1;
        assert!(s.validate().is_err());

        let mut s = CompilerSettings::default();
        s.job_defaults.color_dmx = 300.0;
        assert!(s.validate().is_err());

        let mut s = CompilerSettings::default();
        s.fallback_tempo_bpm = 0.0;
        assert!(s.validate().is_err());
    }

    #[test]
    fn fallback_timing_uses_tempo() {
        let t = CompilerSettings::default().fallback_timing().unwrap();
        assert!((t.ms_per_bar() - 2000.0).abs() < 1e-9);
    }
}
