//! Section compiler: expands a resolved template over one song section into
//! channel segments and composes them per fixture.

pub mod expand;
pub mod layout;

use log::debug;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::catalog::TemplateCatalog;
use crate::engine::{self, ComposedFixture};
use crate::error::{ChoreoError, Result};
use crate::handlers::HandlerRegistry;
use crate::model::{PhaseOffsetMode, Quantize, Rig, StepTarget, Template, TimingContext};
use crate::settings::CompilerSettings;
use crate::timing::TimingResolver;

use expand::Expander;
use layout::{layout, RemainderPlan};

/// Most template cycles one section may lay out.
pub const MAX_CYCLES: f64 = 10_000.0;

/// One song section to fill with a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SectionRequest {
    pub section_id: String,
    /// Template id or alias.
    pub template_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset_id: Option<String>,
    pub start_bar: f64,
    pub duration_bars: f64,
}

impl SectionRequest {
    pub fn validate(&self) -> Result<()> {
        let err = |msg: String| ChoreoError::validation("section request", msg);
        if self.section_id.trim().is_empty() {
            return Err(err("section_id must not be empty".into()));
        }
        if !(self.start_bar >= 0.0 && self.start_bar.is_finite()) {
            return Err(err(format!("start_bar must be >= 0, got {}", self.start_bar)));
        }
        if !(self.duration_bars > 0.0 && self.duration_bars.is_finite()) {
            return Err(err(format!("duration_bars must be > 0, got {}", self.duration_bars)));
        }
        Ok(())
    }
}

/// Output of one section: the composed per-fixture timelines plus what
/// produced them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledSection {
    pub section_id: String,
    pub template_id: String,
    pub provenance: Vec<String>,
    pub start_ms: f64,
    pub end_ms: f64,
    /// Full template cycles laid out.
    pub cycles: usize,
    pub fixtures: Vec<ComposedFixture>,
}

/// Loop steps and every referenced group must exist in the template.
fn check_template(template: &Template) -> Result<()> {
    let id = template.template_id();
    for loop_id in &template.repeat().loop_step_ids {
        if template.step(loop_id).is_none() {
            return Err(ChoreoError::compilation(id, format!("loop step '{loop_id}' is not a step of the template"))
                .in_context(None, Some(loop_id)));
        }
    }
    for step in template.steps() {
        let fail = |msg: String| ChoreoError::compilation(id, msg).in_context(None, Some(step.step_id()));
        if let StepTarget::Group(name) = step.target() {
            if !template.groups().contains_key(name) {
                return Err(fail(format!("target group '{name}' is not defined")));
            }
        }
        if let Some(spec) = &step.timing().phase_offset {
            let group = spec.group.as_deref().unwrap_or_default();
            if spec.mode == PhaseOffsetMode::GroupOrder && !template.groups().contains_key(group) {
                return Err(fail(format!("phase offset group '{group}' is not defined")));
            }
        }
    }
    Ok(())
}

/// Compile one section of a song.
///
/// Resolves the template (and preset), lays out its cycles over the
/// section, renders every placed step on every targeted fixture, applies
/// the remainder policy and runs the composition chain.
pub fn compile_section(
    catalog: &TemplateCatalog,
    handlers: &HandlerRegistry,
    request: &SectionRequest,
    rig: &Rig,
    timing: &TimingContext,
    settings: &CompilerSettings,
) -> Result<CompiledSection> {
    request.validate()?;
    settings.validate()?;
    rig.validate()?;

    let section = Some(request.section_id.as_str());
    let template = catalog.resolve(&request.template_id, request.preset_id.as_deref())?;
    check_template(&template).map_err(|e| e.in_context(section, None))?;
    let repeat = template.repeat();
    let cycle_count = request.duration_bars / repeat.cycle_bars;
    if repeat.repeatable && cycle_count > MAX_CYCLES {
        return Err(ChoreoError::compilation(
            template.template_id(),
            format!("{cycle_count:.0} cycles of {} bars exceed the limit of {MAX_CYCLES}", repeat.cycle_bars),
        )
        .in_context(section, None));
    }

    let resolver = TimingResolver::new(timing);
    let end_bar = request.start_bar + request.duration_bars;
    let window = (
        resolver.bars_to_ms(request.start_bar, Quantize::None),
        resolver.bars_to_ms(end_bar, Quantize::None),
    );

    let plan = layout(&template, request.start_bar, request.duration_bars);
    let expander = Expander {
        template: &template,
        handlers,
        rig,
        resolver,
        settings,
        window,
    };
    let mut segments = Vec::new();
    for placement in &plan.placements {
        let rendered = expander
            .expand(placement)
            .map_err(|e| e.in_context(section, Some(placement.step.step_id())))?;
        segments.extend(rendered);
    }

    let held = match plan.remainder {
        RemainderPlan::None => Vec::new(),
        RemainderPlan::Hold { start_bar } => {
            expand::remainder(&segments, resolver.bars_to_ms(start_bar, Quantize::None), window.1, false)?
        }
        RemainderPlan::Fade { start_bar } => {
            expand::remainder(&segments, resolver.bars_to_ms(start_bar, Quantize::None), window.1, true)?
        }
    };
    debug!(
        "section '{}': {} placements over {} cycles, {} segments, {} remainder segments",
        request.section_id,
        plan.placements.len(),
        plan.cycles,
        segments.len(),
        held.len()
    );
    segments.extend(held);

    let fixtures = engine::compose(rig, segments, window, settings)?;
    Ok(CompiledSection {
        section_id: request.section_id.clone(),
        template_id: template.template_id().to_string(),
        provenance: template.provenance().to_vec(),
        start_ms: window.0,
        end_ms: window.1,
        cycles: plan.cycles,
        fixtures,
    })
}
