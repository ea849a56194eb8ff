use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{ChoreoError, Result};

use super::params::CurveParams;
use super::patterns::{DimmerKind, GeometryKind, Intensity, MovementKind};
use super::template::PhaseOffsetSpec;
use super::timing::Quantize;

/// A named overlay on a template: partial defaults plus per-step patches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Preset {
    pub preset_id: String,
    pub name: String,
    #[serde(default)]
    pub defaults: DefaultsPatch,
    /// step_id → patch. Every key must name a step of the target template.
    #[serde(default)]
    pub step_patches: IndexMap<String, StepPatch>,
}

impl Preset {
    pub fn new(preset_id: &str, name: &str) -> Self {
        Self {
            preset_id: preset_id.to_string(),
            name: name.to_string(),
            defaults: DefaultsPatch::default(),
            step_patches: IndexMap::new(),
        }
    }

    pub fn with_patch(mut self, step_id: &str, patch: StepPatch) -> Self {
        self.step_patches.insert(step_id.to_string(), patch);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.preset_id.trim().is_empty() {
            return Err(ChoreoError::validation("preset", "preset_id must not be empty"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct DefaultsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimmer_floor_dmx: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimmer_ceiling_dmx: Option<f64>,
}

/// Field-level overrides for one step. `None` leaves the field as authored;
/// param maps merge key by key.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct StepPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timing: Option<TimingPatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<GeometryPatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub movement: Option<MovementPatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimmer: Option<DimmerPatch>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct TimingPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_offset_bars: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_bars: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_offset_ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantize_start: Option<Quantize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantize_end: Option<Quantize>,
    /// Replaces the step's phase offset wholesale.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase_offset: Option<PhaseOffsetSpec>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct GeometryPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry_id: Option<GeometryKind>,
    #[serde(default, skip_serializing_if = "CurveParams::is_empty")]
    pub params: CurveParams,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct MovementPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub movement_id: Option<MovementKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intensity: Option<Intensity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cycles: Option<f64>,
    #[serde(default, skip_serializing_if = "CurveParams::is_empty")]
    pub params: CurveParams,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct DimmerPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimmer_id: Option<DimmerKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intensity: Option<Intensity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cycles: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_level: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_level: Option<f64>,
    #[serde(default, skip_serializing_if = "CurveParams::is_empty")]
    pub params: CurveParams,
}
