use std::collections::HashSet;

use indexmap::{IndexMap, IndexSet};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum_macros::EnumIter;

use crate::error::{ChoreoError, Result};

use super::fixture::RoleToken;
use super::params::CurveParams;
use super::patterns::{DimmerKind, GeometryKind, Intensity, MovementKind};
use super::timing::Quantize;

// ── Timing ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimingMode {
    Musical,
    AbsoluteMs,
}

/// Start/duration of a step relative to its cycle. Exactly one of the
/// bars/ms pairs is populated, matching `mode`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BaseTiming {
    pub mode: TimingMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_offset_bars: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_bars: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_offset_ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<f64>,
    /// None inherits the template's default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantize_start: Option<Quantize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantize_end: Option<Quantize>,
}

/// The validated form of a step's start/duration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimingSpan {
    Musical { start_offset_bars: f64, duration_bars: f64 },
    AbsoluteMs { start_offset_ms: f64, duration_ms: f64 },
}

impl BaseTiming {
    pub fn musical(start_offset_bars: f64, duration_bars: f64) -> Self {
        Self {
            mode: TimingMode::Musical,
            start_offset_bars: Some(start_offset_bars),
            duration_bars: Some(duration_bars),
            start_offset_ms: None,
            duration_ms: None,
            quantize_start: None,
            quantize_end: None,
        }
    }

    pub fn absolute_ms(start_offset_ms: f64, duration_ms: f64) -> Self {
        Self {
            mode: TimingMode::AbsoluteMs,
            start_offset_bars: None,
            duration_bars: None,
            start_offset_ms: Some(start_offset_ms),
            duration_ms: Some(duration_ms),
            quantize_start: None,
            quantize_end: None,
        }
    }

    /// Check the mode/field pairing and ranges, returning the validated span.
    pub fn span(&self) -> Result<TimingSpan> {
        let err = |msg: String| ChoreoError::validation("step timing", msg);
        match self.mode {
            TimingMode::Musical => {
                if self.start_offset_ms.is_some() || self.duration_ms.is_some() {
                    return Err(err("MUSICAL timing must not set ms fields".into()));
                }
                let (Some(start), Some(duration)) = (self.start_offset_bars, self.duration_bars) else {
                    return Err(err("MUSICAL timing needs start_offset_bars and duration_bars".into()));
                };
                if !(start >= 0.0) || !(duration > 0.0) {
                    return Err(err(format!(
                        "need start_offset_bars >= 0 and duration_bars > 0, got {start} / {duration}"
                    )));
                }
                Ok(TimingSpan::Musical {
                    start_offset_bars: start,
                    duration_bars: duration,
                })
            }
            TimingMode::AbsoluteMs => {
                if self.start_offset_bars.is_some() || self.duration_bars.is_some() {
                    return Err(err("ABSOLUTE_MS timing must not set bar fields".into()));
                }
                let (Some(start), Some(duration)) = (self.start_offset_ms, self.duration_ms) else {
                    return Err(err("ABSOLUTE_MS timing needs start_offset_ms and duration_ms".into()));
                };
                if !(start >= 0.0) || !(duration > 0.0) {
                    return Err(err(format!(
                        "need start_offset_ms >= 0 and duration_ms > 0, got {start} / {duration}"
                    )));
                }
                Ok(TimingSpan::AbsoluteMs {
                    start_offset_ms: start,
                    duration_ms: duration,
                })
            }
        }
    }

    pub fn with_quantize(mut self, start: Quantize, end: Quantize) -> Self {
        self.quantize_start = Some(start);
        self.quantize_end = Some(end);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PhaseOffsetMode {
    #[default]
    None,
    GroupOrder,
}

/// Order in which a group's fixtures receive increasing offsets.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema, EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChaseOrder {
    #[default]
    LeftToRight,
    RightToLeft,
    OutsideIn,
    InsideOut,
    OddEven,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Distribution {
    #[default]
    Linear,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PhaseOffsetSpec {
    #[serde(default)]
    pub mode: PhaseOffsetMode,
    /// Template group the chase runs across. Required for GROUP_ORDER.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default)]
    pub order: ChaseOrder,
    #[serde(default)]
    pub spread_bars: f64,
    #[serde(default)]
    pub distribution: Distribution,
    #[serde(default)]
    pub wrap: bool,
}

impl PhaseOffsetSpec {
    pub fn none() -> Self {
        Self {
            mode: PhaseOffsetMode::None,
            group: None,
            order: ChaseOrder::LeftToRight,
            spread_bars: 0.0,
            distribution: Distribution::Linear,
            wrap: false,
        }
    }

    pub fn group_order(group: &str, order: ChaseOrder, spread_bars: f64, wrap: bool) -> Self {
        Self {
            mode: PhaseOffsetMode::GroupOrder,
            group: Some(group.to_string()),
            order,
            spread_bars,
            distribution: Distribution::Linear,
            wrap,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.spread_bars >= 0.0) {
            return Err(ChoreoError::validation(
                "phase offset",
                format!("spread_bars must be >= 0, got {}", self.spread_bars),
            ));
        }
        if self.mode == PhaseOffsetMode::GroupOrder && self.group.is_none() {
            return Err(ChoreoError::validation(
                "phase offset",
                "GROUP_ORDER requires a group",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StepTiming {
    pub base: BaseTiming,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase_offset: Option<PhaseOffsetSpec>,
}

/// Quantization applied when a step leaves its quantize fields unset.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct DefaultTiming {
    #[serde(default)]
    pub quantize_start: Quantize,
    #[serde(default)]
    pub quantize_end: Quantize,
}

// ── Step content ────────────────────────────────────────────────────

/// A step aims at one role or at a named template group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum StepTarget {
    Role(RoleToken),
    Group(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GeometrySpec {
    pub geometry_id: GeometryKind,
    #[serde(default, skip_serializing_if = "CurveParams::is_empty")]
    pub params: CurveParams,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MovementSpec {
    pub movement_id: MovementKind,
    #[serde(default)]
    pub intensity: Intensity,
    #[serde(default = "one")]
    pub cycles: f64,
    #[serde(default, skip_serializing_if = "CurveParams::is_empty")]
    pub params: CurveParams,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DimmerSpec {
    pub dimmer_id: DimmerKind,
    #[serde(default)]
    pub intensity: Intensity,
    #[serde(default = "one")]
    pub cycles: f64,
    /// Normalized level range the pattern moves between.
    #[serde(default)]
    pub min_level: f64,
    #[serde(default = "one")]
    pub max_level: f64,
    #[serde(default, skip_serializing_if = "CurveParams::is_empty")]
    pub params: CurveParams,
}

fn one() -> f64 {
    1.0
}

impl GeometrySpec {
    pub fn new(geometry_id: GeometryKind) -> Self {
        Self {
            geometry_id,
            params: CurveParams::new(),
        }
    }
}

impl MovementSpec {
    pub fn new(movement_id: MovementKind, intensity: Intensity, cycles: f64) -> Self {
        Self {
            movement_id,
            intensity,
            cycles,
            params: CurveParams::new(),
        }
    }

    pub fn hold() -> Self {
        Self::new(MovementKind::Hold, Intensity::Medium, 1.0)
    }
}

impl DimmerSpec {
    pub fn new(dimmer_id: DimmerKind, intensity: Intensity, cycles: f64) -> Self {
        Self {
            dimmer_id,
            intensity,
            cycles,
            min_level: 0.0,
            max_level: 1.0,
            params: CurveParams::new(),
        }
    }

    pub fn full() -> Self {
        Self::new(DimmerKind::Full, Intensity::Medium, 1.0)
    }
}

/// How a step enters or leaves.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "mode", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Transition {
    Snap,
    Crossfade { duration_ms: f64 },
    FadeThroughBlack { duration_ms: f64 },
}

impl Transition {
    pub fn duration_ms(self) -> f64 {
        match self {
            Transition::Snap => 0.0,
            Transition::Crossfade { duration_ms } | Transition::FadeThroughBlack { duration_ms } => {
                duration_ms
            }
        }
    }
}

/// How a segment combines with lower-priority segments on the same channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlendMode {
    /// Top segment fully replaces the one below.
    #[default]
    Override,
    /// Per-sample maximum.
    Max,
    /// Additive blend, clamped later by the boundary enforcer.
    Add,
}

/// Shutter behavior requested by a step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "state", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShutterState {
    Open,
    Closed,
    /// Strobe at a rate expressed as a DMX value inside the fixture's strobe slot.
    Strobe { rate_dmx: f64 },
}

/// Optional per-step values for the non-movement channels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct ChannelOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shutter: Option<ShutterState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_dmx: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gobo_dmx: Option<f64>,
}

// ── Step ────────────────────────────────────────────────────────────

/// Authoring form of a step. Converted to an immutable `Step` via `Step::new`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StepDraft {
    pub step_id: String,
    pub target: StepTarget,
    pub timing: StepTiming,
    pub geometry: GeometrySpec,
    pub movement: MovementSpec,
    pub dimmer: DimmerSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_transition: Option<Transition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_transition: Option<Transition>,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub blend_mode: BlendMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overrides: Option<ChannelOverrides>,
}

impl StepDraft {
    pub fn new(step_id: &str, target: StepTarget, timing: BaseTiming) -> Self {
        Self {
            step_id: step_id.to_string(),
            target,
            timing: StepTiming {
                base: timing,
                phase_offset: None,
            },
            geometry: GeometrySpec::new(GeometryKind::Front),
            movement: MovementSpec::hold(),
            dimmer: DimmerSpec::full(),
            entry_transition: None,
            exit_transition: None,
            priority: 0,
            blend_mode: BlendMode::Override,
            overrides: None,
        }
    }
}

/// One timed unit of a template. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StepDraft", into = "StepDraft")]
pub struct Step {
    draft: StepDraft,
    span: TimingSpan,
}

impl TryFrom<StepDraft> for Step {
    type Error = ChoreoError;
    fn try_from(draft: StepDraft) -> Result<Self> {
        Step::new(draft)
    }
}

impl From<Step> for StepDraft {
    fn from(step: Step) -> StepDraft {
        step.draft
    }
}

impl Step {
    pub fn new(draft: StepDraft) -> Result<Self> {
        let err = |msg: String| {
            ChoreoError::validation("step", format!("'{}': {msg}", draft.step_id))
        };
        if draft.step_id.trim().is_empty() {
            return Err(ChoreoError::validation("step", "step_id must not be empty"));
        }
        let span = draft.timing.base.span().map_err(|e| err(e.to_string()))?;
        if let Some(phase) = &draft.timing.phase_offset {
            phase.validate().map_err(|e| err(e.to_string()))?;
        }
        let cycles_ok = |c: f64| c > 0.0 && c.is_finite();
        if !cycles_ok(draft.movement.cycles) || !cycles_ok(draft.dimmer.cycles) {
            return Err(err("movement and dimmer cycles must be finite and > 0".into()));
        }
        let (lo, hi) = (draft.dimmer.min_level, draft.dimmer.max_level);
        if !(0.0..=1.0).contains(&lo) || !(0.0..=1.0).contains(&hi) || lo > hi {
            return Err(err(format!("dimmer levels [{lo}, {hi}] must be ordered within [0, 1]")));
        }
        for t in [draft.entry_transition, draft.exit_transition].into_iter().flatten() {
            if !(t.duration_ms() >= 0.0 && t.duration_ms().is_finite()) {
                return Err(err(format!("transition duration must be >= 0, got {}", t.duration_ms())));
            }
        }
        if let Some(overrides) = &draft.overrides {
            for (name, v) in [("color_dmx", overrides.color_dmx), ("gobo_dmx", overrides.gobo_dmx)] {
                if let Some(v) = v {
                    if !(0.0..=255.0).contains(&v) {
                        return Err(err(format!("{name}={v} is outside [0, 255]")));
                    }
                }
            }
        }
        Ok(Self {
            draft,
            span,
        })
    }

    pub fn step_id(&self) -> &str {
        &self.draft.step_id
    }

    pub fn target(&self) -> &StepTarget {
        &self.draft.target
    }

    pub fn timing(&self) -> &StepTiming {
        &self.draft.timing
    }

    pub fn span(&self) -> TimingSpan {
        self.span
    }

    pub fn geometry(&self) -> &GeometrySpec {
        &self.draft.geometry
    }

    pub fn movement(&self) -> &MovementSpec {
        &self.draft.movement
    }

    pub fn dimmer(&self) -> &DimmerSpec {
        &self.draft.dimmer
    }

    pub fn entry_transition(&self) -> Option<Transition> {
        self.draft.entry_transition
    }

    pub fn exit_transition(&self) -> Option<Transition> {
        self.draft.exit_transition
    }

    pub fn priority(&self) -> i32 {
        self.draft.priority
    }

    pub fn blend_mode(&self) -> BlendMode {
        self.draft.blend_mode
    }

    pub fn overrides(&self) -> Option<&ChannelOverrides> {
        self.draft.overrides.as_ref()
    }

    /// Authoring form of this step, for patching.
    pub fn to_draft(&self) -> StepDraft {
        self.draft.clone()
    }
}

// ── Repeat contract ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RepeatMode {
    /// Odd cycles play the loop steps mirrored in time.
    PingPong,
    /// Every cycle plays the loop steps in authored order.
    Joiner,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RemainderPolicy {
    HoldLastPose,
    FadeOut,
    Truncate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RepeatContract {
    pub repeatable: bool,
    pub mode: RepeatMode,
    pub cycle_bars: f64,
    pub loop_step_ids: Vec<String>,
    pub remainder_policy: RemainderPolicy,
}

/// Shortest cycle a template may declare: one sixteenth-bar grid step.
pub const MIN_CYCLE_BARS: f64 = 1.0 / 16.0;

impl RepeatContract {
    pub fn validate(&self) -> Result<()> {
        if !(self.cycle_bars >= MIN_CYCLE_BARS && self.cycle_bars.is_finite()) {
            return Err(ChoreoError::validation(
                "repeat contract",
                format!("cycle_bars must be finite and >= {MIN_CYCLE_BARS}, got {}", self.cycle_bars),
            ));
        }
        if self.loop_step_ids.is_empty() {
            return Err(ChoreoError::validation(
                "repeat contract",
                "loop_step_ids must not be empty",
            ));
        }
        Ok(())
    }
}

// ── Template ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TemplateDefaults {
    pub dimmer_floor_dmx: f64,
    pub dimmer_ceiling_dmx: f64,
}

impl Default for TemplateDefaults {
    fn default() -> Self {
        Self {
            dimmer_floor_dmx: 0.0,
            dimmer_ceiling_dmx: 255.0,
        }
    }
}

/// Authoring form of a template. Converted to an immutable `Template` via `Template::new`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TemplateDraft {
    pub template_id: String,
    #[serde(default = "first_version")]
    pub version: u32,
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub roles: IndexSet<RoleToken>,
    #[serde(default)]
    pub groups: IndexMap<String, Vec<RoleToken>>,
    #[serde(default)]
    pub default_timing: DefaultTiming,
    pub repeat: RepeatContract,
    #[serde(default)]
    pub defaults: TemplateDefaults,
    pub steps: Vec<StepDraft>,
    #[serde(default)]
    pub metadata: IndexMap<String, String>,
    /// Composition history, e.g. `["template:fan_sweep", "preset:wide"]`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub provenance: Vec<String>,
}

fn first_version() -> u32 {
    1
}

/// A named, versioned choreography definition. Immutable once constructed;
/// `clone()` yields a structurally independent deep copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TemplateDraft", into = "TemplateDraft")]
pub struct Template {
    template_id: String,
    version: u32,
    name: String,
    category: String,
    roles: IndexSet<RoleToken>,
    groups: IndexMap<String, Vec<RoleToken>>,
    default_timing: DefaultTiming,
    repeat: RepeatContract,
    defaults: TemplateDefaults,
    steps: Vec<Step>,
    metadata: IndexMap<String, String>,
    provenance: Vec<String>,
}

impl TryFrom<TemplateDraft> for Template {
    type Error = ChoreoError;
    fn try_from(draft: TemplateDraft) -> Result<Self> {
        Template::new(draft)
    }
}

impl From<Template> for TemplateDraft {
    fn from(t: Template) -> TemplateDraft {
        TemplateDraft {
            template_id: t.template_id,
            version: t.version,
            name: t.name,
            category: t.category,
            roles: t.roles,
            groups: t.groups,
            default_timing: t.default_timing,
            repeat: t.repeat,
            defaults: t.defaults,
            steps: t.steps.into_iter().map(StepDraft::from).collect(),
            metadata: t.metadata,
            provenance: t.provenance,
        }
    }
}

impl Template {
    pub fn new(draft: TemplateDraft) -> Result<Self> {
        if draft.template_id.trim().is_empty() {
            return Err(ChoreoError::validation("template", "template_id must not be empty"));
        }
        let err = |msg: String| {
            ChoreoError::validation("template", format!("'{}': {msg}", draft.template_id))
        };
        if draft.steps.is_empty() {
            return Err(err("needs at least one step".into()));
        }
        validate_defaults(&draft.defaults).map_err(|e| err(e.to_string()))?;
        draft.repeat.validate().map_err(|e| err(e.to_string()))?;
        for (name, roles) in &draft.groups {
            if roles.is_empty() {
                return Err(err(format!("group '{name}' has no roles")));
            }
        }

        let mut seen = HashSet::new();
        let mut steps = Vec::with_capacity(draft.steps.len());
        for step in draft.steps {
            if !seen.insert(step.step_id.clone()) {
                return Err(err(format!("duplicate step id '{}'", step.step_id)));
            }
            steps.push(Step::new(step)?);
        }

        let provenance = if draft.provenance.is_empty() {
            vec![format!("template:{}", draft.template_id)]
        } else {
            draft.provenance
        };

        Ok(Self {
            template_id: draft.template_id,
            version: draft.version,
            name: draft.name,
            category: draft.category,
            roles: draft.roles,
            groups: draft.groups,
            default_timing: draft.default_timing,
            repeat: draft.repeat,
            defaults: draft.defaults,
            steps,
            metadata: draft.metadata,
            provenance,
        })
    }

    pub fn template_id(&self) -> &str {
        &self.template_id
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn roles(&self) -> &IndexSet<RoleToken> {
        &self.roles
    }

    pub fn groups(&self) -> &IndexMap<String, Vec<RoleToken>> {
        &self.groups
    }

    pub fn default_timing(&self) -> DefaultTiming {
        self.default_timing
    }

    pub fn repeat(&self) -> &RepeatContract {
        &self.repeat
    }

    pub fn defaults(&self) -> TemplateDefaults {
        self.defaults
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn step(&self, step_id: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.step_id() == step_id)
    }

    pub fn metadata(&self) -> &IndexMap<String, String> {
        &self.metadata
    }

    pub fn provenance(&self) -> &[String] {
        &self.provenance
    }

    /// Roles a step target expands to. Unknown groups resolve to None.
    pub fn target_roles(&self, target: &StepTarget) -> Option<Vec<RoleToken>> {
        match target {
            StepTarget::Role(role) => Some(vec![*role]),
            StepTarget::Group(name) => self.groups.get(name).cloned(),
        }
    }

    /// Build a derived template with new defaults and steps and one more
    /// provenance entry. `self` is left untouched.
    pub(crate) fn derive(
        &self,
        defaults: TemplateDefaults,
        steps: Vec<Step>,
        provenance_entry: String,
    ) -> Result<Self> {
        validate_defaults(&defaults)?;
        let mut provenance = self.provenance.clone();
        provenance.push(provenance_entry);
        Ok(Self {
            defaults,
            steps,
            provenance,
            ..self.clone()
        })
    }
}

fn validate_defaults(d: &TemplateDefaults) -> Result<()> {
    let (lo, hi) = (d.dimmer_floor_dmx, d.dimmer_ceiling_dmx);
    if !(0.0..=255.0).contains(&lo) || !(0.0..=255.0).contains(&hi) || lo > hi {
        return Err(ChoreoError::validation(
            "template defaults",
            format!("dimmer floor/ceiling [{lo}, {hi}] must be ordered within [0, 255]"),
        ));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
pub(crate) mod test_support {
    use super::*;

    pub fn repeat(cycle_bars: f64, loop_ids: &[&str]) -> RepeatContract {
        RepeatContract {
            repeatable: true,
            mode: RepeatMode::Joiner,
            cycle_bars,
            loop_step_ids: loop_ids.iter().map(|s| (*s).to_string()).collect(),
            remainder_policy: RemainderPolicy::Truncate,
        }
    }

    /// Single-step, one-bar-cycle template aimed at a group of all roles.
    pub fn simple_draft(id: &str) -> TemplateDraft {
        use strum::IntoEnumIterator;
        let all: Vec<RoleToken> = RoleToken::iter().collect();
        let mut groups = IndexMap::new();
        groups.insert("all".to_string(), all.clone());
        TemplateDraft {
            template_id: id.to_string(),
            version: 1,
            name: id.to_string(),
            category: "test".to_string(),
            roles: all.into_iter().collect(),
            groups,
            default_timing: DefaultTiming::default(),
            repeat: repeat(1.0, &["main"]),
            defaults: TemplateDefaults::default(),
            steps: vec![StepDraft::new(
                "main",
                StepTarget::Group("all".into()),
                BaseTiming::musical(0.0, 1.0),
            )],
            metadata: IndexMap::new(),
            provenance: Vec::new(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn timing_mode_must_match_fields() {
        let mut t = BaseTiming::musical(0.0, 1.0);
        t.start_offset_ms = Some(10.0);
        assert!(t.span().is_err());

        let mut t = BaseTiming::absolute_ms(0.0, 500.0);
        t.duration_ms = None;
        assert!(t.span().is_err());

        assert!(BaseTiming::musical(0.0, 0.0).span().is_err());
        assert!(BaseTiming::musical(-1.0, 1.0).span().is_err());
        assert_eq!(
            BaseTiming::absolute_ms(250.0, 500.0).span().unwrap(),
            TimingSpan::AbsoluteMs {
                start_offset_ms: 250.0,
                duration_ms: 500.0
            }
        );
    }

    #[test]
    fn group_order_needs_group() {
        let mut p = PhaseOffsetSpec::group_order("all", ChaseOrder::LeftToRight, 1.0, false);
        assert!(p.validate().is_ok());
        p.group = None;
        assert!(p.validate().is_err());
    }

    #[test]
    fn template_gets_initial_provenance() {
        let t = Template::new(simple_draft("fan")).unwrap();
        assert_eq!(t.provenance(), &["template:fan".to_string()]);
    }

    #[test]
    fn duplicate_step_ids_rejected() {
        let mut d = simple_draft("dup");
        let again = d.steps.first().cloned().unwrap();
        d.steps.push(again);
        assert!(Template::new(d).is_err());
    }

    #[test]
    fn empty_loop_ids_rejected() {
        let mut d = simple_draft("noloop");
        d.repeat.loop_step_ids.clear();
        assert!(Template::new(d).is_err());
    }

    #[test]
    fn cycle_bars_needs_a_grid_step() {
        let mut d = simple_draft("tiny");
        d.repeat.cycle_bars = 1e-9;
        assert!(Template::new(d.clone()).is_err());
        d.repeat.cycle_bars = f64::INFINITY;
        assert!(Template::new(d.clone()).is_err());
        d.repeat.cycle_bars = MIN_CYCLE_BARS;
        assert!(Template::new(d).is_ok());
    }

    #[test]
    fn infinite_step_cycles_rejected() {
        let mut d = simple_draft("inf");
        if let Some(step) = d.steps.first_mut() {
            step.movement.cycles = f64::INFINITY;
        }
        assert!(Template::new(d).is_err());
    }

    #[test]
    fn reversed_dimmer_defaults_rejected() {
        let mut d = simple_draft("dim");
        d.defaults.dimmer_floor_dmx = 200.0;
        d.defaults.dimmer_ceiling_dmx = 100.0;
        assert!(Template::new(d).is_err());
    }

    #[test]
    fn clone_is_independent() {
        let a = Template::new(simple_draft("iso")).unwrap();
        let mut draft = TemplateDraft::from(a.clone());
        draft.name = "changed".into();
        let b = Template::new(draft).unwrap();
        assert_eq!(a.name(), "iso");
        assert_eq!(b.name(), "changed");
    }

    #[test]
    fn serde_round_trip_revalidates() {
        let t = Template::new(simple_draft("rt")).unwrap();
        let json = serde_json::to_string(&t).unwrap();
        let back: Template = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t);

        let broken = json.replace("\"duration_bars\":1.0", "\"duration_bars\":0.0");
        assert!(serde_json::from_str::<Template>(&broken).is_err());
    }
}
