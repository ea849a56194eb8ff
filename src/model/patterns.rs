use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum_macros::EnumIter;

/// Static aiming patterns. Resolved per fixture from its role.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, EnumIter,
)]
#[serde(rename_all = "snake_case")]
pub enum GeometryKind {
    /// Every head faces the audience at the same tilt.
    Front,
    /// Pan spreads outward with the fixture's lateral position.
    Fan,
    /// Left heads aim right and right heads aim left.
    Cross,
    /// All beams meet at one point on stage.
    Converge,
    /// Beams point straight up.
    Ceiling,
    /// Beams point down onto the stage floor.
    Floor,
}

/// Movement patterns layered on top of the geometry pose.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, EnumIter,
)]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    Hold,
    Sweep,
    Nod,
    Circle,
    Figure8,
    Pendulum,
    Wave,
    Drift,
    Bounce,
}

/// Dimmer patterns.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, EnumIter,
)]
#[serde(rename_all = "snake_case")]
pub enum DimmerKind {
    Full,
    Off,
    Pulse,
    Breathe,
    Strobe,
    FadeIn,
    FadeOut,
    Flicker,
    BeatPulse,
}

/// How hard a pattern is driven. Higher levels use more of the fixture's
/// travel and move faster.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Default,
    Serialize,
    Deserialize,
    JsonSchema,
    EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Intensity {
    Slow,
    Smooth,
    #[default]
    Medium,
    Dramatic,
    Intense,
}

/// Amplitude/frequency scaling applied by the default pattern handlers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntensityProfile {
    /// Fraction of the full mechanical range a movement may use.
    pub amplitude_fraction: f64,
    /// Multiplier on the pattern's cycle count.
    pub frequency: f64,
}

impl Intensity {
    pub fn profile(self) -> IntensityProfile {
        let (amplitude_fraction, frequency) = match self {
            Intensity::Slow => (0.10, 0.5),
            Intensity::Smooth => (0.18, 0.75),
            Intensity::Medium => (0.25, 1.0),
            Intensity::Dramatic => (0.35, 1.5),
            Intensity::Intense => (0.45, 2.0),
        };
        IntensityProfile {
            amplitude_fraction,
            frequency,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn intensity_profiles_increase() {
        let profiles: Vec<IntensityProfile> = Intensity::iter().map(Intensity::profile).collect();
        for pair in profiles.windows(2) {
            let [a, b] = pair else { continue };
            assert!(b.amplitude_fraction > a.amplitude_fraction);
            assert!(b.frequency > a.frequency);
        }
    }

    #[test]
    fn tokens_use_serde_names() {
        assert_eq!(serde_json::to_string(&MovementKind::Figure8).unwrap(), "\"figure8\"");
        assert_eq!(serde_json::to_string(&Intensity::Dramatic).unwrap(), "\"DRAMATIC\"");
        assert_eq!(serde_json::to_string(&DimmerKind::BeatPulse).unwrap(), "\"beat_pulse\"");
    }
}
