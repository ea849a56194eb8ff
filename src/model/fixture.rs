use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum_macros::EnumIter;
use ts_rs::TS;

use crate::error::{ChoreoError, Result};

/// Newtype for fixture identity. Prevents mixing up fixture IDs with other strings.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema, TS,
)]
#[serde(transparent)]
#[ts(export)]
pub struct FixtureId(pub String);

impl FixtureId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FixtureId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FixtureId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// ── Channels ────────────────────────────────────────────────────────

/// The channel kinds the compiler drives on a moving head.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
    EnumIter, TS,
)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum ChannelKind {
    Pan,
    Tilt,
    Dimmer,
    Shutter,
    Color,
    Gobo,
}

impl ChannelKind {
    pub const ALL: [ChannelKind; 6] = [
        ChannelKind::Pan,
        ChannelKind::Tilt,
        ChannelKind::Dimmer,
        ChannelKind::Shutter,
        ChannelKind::Color,
        ChannelKind::Gobo,
    ];
}

/// DMX channel number within a fixture's footprint. Valid range: 1..=512.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(try_from = "u16")]
pub struct DmxChannel(u16);

impl TryFrom<u16> for DmxChannel {
    type Error = ChoreoError;
    fn try_from(n: u16) -> Result<Self> {
        DmxChannel::new(n).ok_or_else(|| {
            ChoreoError::validation("dmx channel", format!("{n} is outside 1..=512"))
        })
    }
}

impl DmxChannel {
    /// Create a DMX channel number. Returns None if out of valid range (1-512).
    pub fn new(n: u16) -> Option<Self> {
        if (1..=512).contains(&n) {
            Some(Self(n))
        } else {
            None
        }
    }

    pub fn get(self) -> u16 {
        self.0
    }
}

// ── Roles ───────────────────────────────────────────────────────────

/// Spatial role of a fixture across the rig, stage left to stage right.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
    EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoleToken {
    OuterLeft,
    InnerLeft,
    CenterLeft,
    Center,
    CenterRight,
    InnerRight,
    OuterRight,
}

impl RoleToken {
    /// Lateral position in [-1, 1]: -1 is far stage left, 1 is far stage right.
    pub fn lateral(self) -> f64 {
        match self {
            RoleToken::OuterLeft => -1.0,
            RoleToken::InnerLeft => -2.0 / 3.0,
            RoleToken::CenterLeft => -1.0 / 3.0,
            RoleToken::Center => 0.0,
            RoleToken::CenterRight => 1.0 / 3.0,
            RoleToken::InnerRight => 2.0 / 3.0,
            RoleToken::OuterRight => 1.0,
        }
    }
}

// ── Calibration ─────────────────────────────────────────────────────

/// Per-fixture physical calibration. Supplied by the external fixture
/// configuration; the compiler only reads it. Deserialization validates, so
/// a loaded calibration always has ordered, finite ranges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(try_from = "CalibrationRaw")]
pub struct FixtureCalibration {
    pub pan_min_dmx: f64,
    pub pan_max_dmx: f64,
    pub tilt_min_dmx: f64,
    pub tilt_max_dmx: f64,
    /// Total mechanical pan travel in degrees across the full DMX range.
    pub pan_range_deg: f64,
    /// Total mechanical tilt travel in degrees across the full DMX range.
    pub tilt_range_deg: f64,
    pub pan_inverted: bool,
    pub tilt_inverted: bool,
    /// Pan DMX value at which the head faces the audience (0°).
    pub pan_front_dmx: f64,
    /// Tilt DMX value at which the beam is horizontal (0°).
    pub tilt_zero_dmx: f64,
    /// Tilt DMX value at which the beam points straight up (90°).
    pub tilt_up_dmx: f64,
    pub dimmer_floor_dmx: f64,
    pub dimmer_ceiling_dmx: f64,
    pub shutter_open_dmx: f64,
    pub shutter_closed_dmx: f64,
    /// Inclusive DMX range of the shutter's strobe slot, if the fixture has one.
    pub strobe_range_dmx: Option<(f64, f64)>,
}

/// Wire form of `FixtureCalibration`; omitted fields take the defaults.
#[derive(Deserialize, JsonSchema)]
#[serde(default)]
struct CalibrationRaw {
    pan_min_dmx: f64,
    pan_max_dmx: f64,
    tilt_min_dmx: f64,
    tilt_max_dmx: f64,
    pan_range_deg: f64,
    tilt_range_deg: f64,
    pan_inverted: bool,
    tilt_inverted: bool,
    pan_front_dmx: f64,
    tilt_zero_dmx: f64,
    tilt_up_dmx: f64,
    dimmer_floor_dmx: f64,
    dimmer_ceiling_dmx: f64,
    shutter_open_dmx: f64,
    shutter_closed_dmx: f64,
    strobe_range_dmx: Option<(f64, f64)>,
}

impl Default for CalibrationRaw {
    fn default() -> Self {
        Self {
            pan_min_dmx: 0.0,
            pan_max_dmx: 255.0,
            tilt_min_dmx: 0.0,
            tilt_max_dmx: 255.0,
            pan_range_deg: 540.0,
            tilt_range_deg: 270.0,
            pan_inverted: false,
            tilt_inverted: false,
            pan_front_dmx: 127.5,
            tilt_zero_dmx: 42.5,
            tilt_up_dmx: 127.5,
            dimmer_floor_dmx: 0.0,
            dimmer_ceiling_dmx: 255.0,
            shutter_open_dmx: 255.0,
            shutter_closed_dmx: 0.0,
            strobe_range_dmx: None,
        }
    }
}

impl FixtureCalibration {
    fn from_raw(raw: CalibrationRaw) -> Self {
        Self {
            pan_min_dmx: raw.pan_min_dmx,
            pan_max_dmx: raw.pan_max_dmx,
            tilt_min_dmx: raw.tilt_min_dmx,
            tilt_max_dmx: raw.tilt_max_dmx,
            pan_range_deg: raw.pan_range_deg,
            tilt_range_deg: raw.tilt_range_deg,
            pan_inverted: raw.pan_inverted,
            tilt_inverted: raw.tilt_inverted,
            pan_front_dmx: raw.pan_front_dmx,
            tilt_zero_dmx: raw.tilt_zero_dmx,
            tilt_up_dmx: raw.tilt_up_dmx,
            dimmer_floor_dmx: raw.dimmer_floor_dmx,
            dimmer_ceiling_dmx: raw.dimmer_ceiling_dmx,
            shutter_open_dmx: raw.shutter_open_dmx,
            shutter_closed_dmx: raw.shutter_closed_dmx,
            strobe_range_dmx: raw.strobe_range_dmx,
        }
    }
}

impl TryFrom<CalibrationRaw> for FixtureCalibration {
    type Error = ChoreoError;
    fn try_from(raw: CalibrationRaw) -> Result<Self> {
        let calibration = Self::from_raw(raw);
        calibration.validate()?;
        Ok(calibration)
    }
}

impl Default for FixtureCalibration {
    fn default() -> Self {
        Self::from_raw(CalibrationRaw::default())
    }
}

impl FixtureCalibration {
    /// Check the ranges are ordered and inside the 8-bit DMX domain.
    pub fn validate(&self) -> Result<()> {
        let values = [
            self.pan_range_deg,
            self.tilt_range_deg,
            self.pan_front_dmx,
            self.tilt_zero_dmx,
            self.tilt_up_dmx,
            self.shutter_open_dmx,
            self.shutter_closed_dmx,
        ];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ChoreoError::validation("calibration", "values must be finite"));
        }
        let ranges = [
            ("pan", self.pan_min_dmx, self.pan_max_dmx),
            ("tilt", self.tilt_min_dmx, self.tilt_max_dmx),
            ("dimmer", self.dimmer_floor_dmx, self.dimmer_ceiling_dmx),
        ];
        for (name, lo, hi) in ranges {
            if !(0.0..=255.0).contains(&lo) || !(0.0..=255.0).contains(&hi) || lo > hi {
                return Err(ChoreoError::validation(
                    "calibration",
                    format!("{name} range [{lo}, {hi}] must be ordered within [0, 255]"),
                ));
            }
        }
        if self.pan_range_deg <= 0.0 || self.tilt_range_deg <= 0.0 {
            return Err(ChoreoError::validation(
                "calibration",
                "pan/tilt travel in degrees must be positive",
            ));
        }
        if (self.tilt_up_dmx - self.tilt_zero_dmx).abs() < f64::EPSILON {
            return Err(ChoreoError::validation(
                "calibration",
                "tilt_up_dmx and tilt_zero_dmx must differ",
            ));
        }
        if let Some((lo, hi)) = self.strobe_range_dmx {
            if !(lo.is_finite() && hi.is_finite()) || lo > hi {
                return Err(ChoreoError::validation(
                    "calibration",
                    format!("strobe range [{lo}, {hi}] is reversed or not finite"),
                ));
            }
        }
        Ok(())
    }
}

// ── Fixtures ────────────────────────────────────────────────────────

/// A fixture as the compiler sees it: identity, spatial role, which channels
/// it physically has (and where), and its calibration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FixtureContext {
    pub fixture_id: FixtureId,
    pub role: RoleToken,
    /// Left-to-right position across the rig, used for chase ordering.
    #[serde(default)]
    pub position: f64,
    /// Channel kind → DMX channel number within the fixture's footprint.
    /// Channels absent here do not exist on the fixture.
    pub channels: IndexMap<ChannelKind, DmxChannel>,
    #[serde(default)]
    pub calibration: FixtureCalibration,
}

impl FixtureContext {
    pub fn has_channel(&self, channel: ChannelKind) -> bool {
        self.channels.contains_key(&channel)
    }

    pub fn dmx_channel(&self, channel: ChannelKind) -> Option<DmxChannel> {
        self.channels.get(&channel).copied()
    }

    /// Channels physically present, in canonical order.
    pub fn present_channels(&self) -> impl Iterator<Item = ChannelKind> + '_ {
        ChannelKind::ALL.into_iter().filter(|c| self.has_channel(*c))
    }
}

/// The set of fixtures a compilation targets.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct Rig {
    pub fixtures: Vec<FixtureContext>,
}

impl Rig {
    pub fn new(fixtures: Vec<FixtureContext>) -> Result<Self> {
        let rig = Self { fixtures };
        rig.validate()?;
        Ok(rig)
    }

    /// Fixture ids must be unique and every calibration well-formed.
    pub fn validate(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for f in &self.fixtures {
            if !seen.insert(&f.fixture_id) {
                return Err(ChoreoError::validation(
                    "rig",
                    format!("duplicate fixture id '{}'", f.fixture_id),
                ));
            }
            f.calibration.validate()?;
        }
        Ok(())
    }

    pub fn get(&self, id: &FixtureId) -> Option<&FixtureContext> {
        self.fixtures.iter().find(|f| &f.fixture_id == id)
    }

    /// Fixtures whose role is in `roles`, in rig order.
    pub fn with_roles<'a>(&'a self, roles: &'a [RoleToken]) -> impl Iterator<Item = &'a FixtureContext> + 'a {
        self.fixtures.iter().filter(move |f| roles.contains(&f.role))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
pub(crate) mod test_support {
    use super::*;

    /// A fully-equipped moving head with default calibration.
    pub fn moving_head(id: &str, role: RoleToken, position: f64) -> FixtureContext {
        let mut channels = IndexMap::new();
        for (i, c) in ChannelKind::ALL.into_iter().enumerate() {
            let n = u16::try_from(i + 1).unwrap();
            channels.insert(c, DmxChannel::new(n).unwrap());
        }
        FixtureContext {
            fixture_id: FixtureId(id.to_string()),
            role,
            position,
            channels,
            calibration: FixtureCalibration::default(),
        }
    }

    pub fn four_head_rig() -> Rig {
        Rig::new(vec![
            moving_head("mh1", RoleToken::OuterLeft, 0.0),
            moving_head("mh2", RoleToken::InnerLeft, 1.0),
            moving_head("mh3", RoleToken::InnerRight, 2.0),
            moving_head("mh4", RoleToken::OuterRight, 3.0),
        ])
        .unwrap()
    }
}
