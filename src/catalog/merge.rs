use log::debug;

use crate::error::{ChoreoError, Result};
use crate::model::{
    DefaultsPatch, DimmerPatch, GeometryPatch, MovementPatch, Preset, Step, StepDraft, StepPatch, Template,
    TemplateDefaults, TimingPatch,
};

/// Apply a preset to a template, producing a new template. The input is not
/// modified. Every patched step is rebuilt and revalidated.
pub fn apply_preset(template: &Template, preset: &Preset) -> Result<Template> {
    for step_id in preset.step_patches.keys() {
        if template.step(step_id).is_none() {
            return Err(ChoreoError::not_found(
                "step",
                format!("{step_id} (patched by preset '{}')", preset.preset_id),
                template.steps().iter().map(|s| s.step_id().to_string()).collect(),
            ));
        }
    }

    let defaults = merge_defaults(template.defaults(), &preset.defaults);
    let steps = template
        .steps()
        .iter()
        .map(|step| match preset.step_patches.get(step.step_id()) {
            Some(patch) => {
                let mut draft = step.to_draft();
                patch.apply(&mut draft);
                Step::new(draft)
            }
            None => Ok(step.clone()),
        })
        .collect::<Result<Vec<_>>>()?;

    debug!(
        "applied preset '{}' to '{}' ({} step patches)",
        preset.preset_id,
        template.template_id(),
        preset.step_patches.len()
    );
    template.derive(defaults, steps, format!("preset:{}", preset.preset_id))
}

fn merge_defaults(base: TemplateDefaults, patch: &DefaultsPatch) -> TemplateDefaults {
    TemplateDefaults {
        dimmer_floor_dmx: patch.dimmer_floor_dmx.unwrap_or(base.dimmer_floor_dmx),
        dimmer_ceiling_dmx: patch.dimmer_ceiling_dmx.unwrap_or(base.dimmer_ceiling_dmx),
    }
}

fn set<T: Clone>(slot: &mut T, value: Option<&T>) {
    if let Some(v) = value {
        *slot = v.clone();
    }
}

fn set_some<T: Clone>(slot: &mut Option<T>, value: Option<&T>) {
    if let Some(v) = value {
        *slot = Some(v.clone());
    }
}

impl StepPatch {
    /// Overlay this patch onto a step draft, field by field.
    pub fn apply(&self, draft: &mut StepDraft) {
        if let Some(t) = &self.timing {
            t.apply(draft);
        }
        if let Some(g) = &self.geometry {
            g.apply(draft);
        }
        if let Some(m) = &self.movement {
            m.apply(draft);
        }
        if let Some(d) = &self.dimmer {
            d.apply(draft);
        }
    }
}

impl TimingPatch {
    fn apply(&self, draft: &mut StepDraft) {
        let base = &mut draft.timing.base;
        set_some(&mut base.start_offset_bars, self.start_offset_bars.as_ref());
        set_some(&mut base.duration_bars, self.duration_bars.as_ref());
        set_some(&mut base.start_offset_ms, self.start_offset_ms.as_ref());
        set_some(&mut base.duration_ms, self.duration_ms.as_ref());
        set_some(&mut base.quantize_start, self.quantize_start.as_ref());
        set_some(&mut base.quantize_end, self.quantize_end.as_ref());
        set_some(&mut draft.timing.phase_offset, self.phase_offset.as_ref());
    }
}

impl GeometryPatch {
    fn apply(&self, draft: &mut StepDraft) {
        set(&mut draft.geometry.geometry_id, self.geometry_id.as_ref());
        draft.geometry.params = draft.geometry.params.overlay(&self.params);
    }
}

impl MovementPatch {
    fn apply(&self, draft: &mut StepDraft) {
        let m = &mut draft.movement;
        set(&mut m.movement_id, self.movement_id.as_ref());
        set(&mut m.intensity, self.intensity.as_ref());
        set(&mut m.cycles, self.cycles.as_ref());
        m.params = m.params.overlay(&self.params);
    }
}

impl DimmerPatch {
    fn apply(&self, draft: &mut StepDraft) {
        let d = &mut draft.dimmer;
        set(&mut d.dimmer_id, self.dimmer_id.as_ref());
        set(&mut d.intensity, self.intensity.as_ref());
        set(&mut d.cycles, self.cycles.as_ref());
        set(&mut d.min_level, self.min_level.as_ref());
        set(&mut d.max_level, self.max_level.as_ref());
        d.params = d.params.overlay(&self.params);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::model::template::test_support::simple_draft;
    use crate::model::{CurveParams, Intensity, MovementKind};

    fn base() -> Template {
        let mut draft = simple_draft("fan");
        if let Some(step) = draft.steps.first_mut() {
            step.movement.params = CurveParams::new().with_float("width", 0.5).with_float("tilt", 0.1);
        }
        Template::new(draft).unwrap()
    }

    fn widen() -> Preset {
        let mut p = Preset::new("wide", "Wide");
        p.defaults.dimmer_ceiling_dmx = Some(200.0);
        p.with_patch(
            "main",
            StepPatch {
                movement: Some(MovementPatch {
                    movement_id: Some(MovementKind::Sweep),
                    intensity: Some(Intensity::Dramatic),
                    params: CurveParams::new().with_float("width", 0.9),
                    ..MovementPatch::default()
                }),
                ..StepPatch::default()
            },
        )
    }

    #[test]
    fn patches_fields_and_merges_params() {
        let t = base();
        let out = apply_preset(&t, &widen()).unwrap();
        let m = out.step("main").unwrap().movement();
        assert_eq!(m.movement_id, MovementKind::Sweep);
        assert_eq!(m.intensity, Intensity::Dramatic);
        assert!((m.params.float_or("width", 0.0) - 0.9).abs() < 1e-12);
        assert!((m.params.float_or("tilt", 0.0) - 0.1).abs() < 1e-12);
        assert!((out.defaults().dimmer_ceiling_dmx - 200.0).abs() < 1e-12);
        assert!((out.defaults().dimmer_floor_dmx - 0.0).abs() < 1e-12);
    }

    #[test]
    fn input_template_is_untouched() {
        let t = base();
        let before = t.clone();
        let _ = apply_preset(&t, &widen()).unwrap();
        assert_eq!(t, before);
    }

    #[test]
    fn provenance_records_preset() {
        let out = apply_preset(&base(), &widen()).unwrap();
        assert_eq!(out.provenance(), &["template:fan".to_string(), "preset:wide".to_string()]);
    }

    #[test]
    fn unknown_step_patch_is_lookup_error() {
        let p = Preset::new("bad", "Bad").with_patch("nope", StepPatch::default());
        let err = apply_preset(&base(), &p).unwrap_err();
        assert!(matches!(err, ChoreoError::NotFound { .. }));
        assert!(err.to_string().contains("main"));
    }

    #[test]
    fn invalid_patch_fails_revalidation() {
        let p = Preset::new("ms", "Ms").with_patch(
            "main",
            StepPatch {
                timing: Some(TimingPatch {
                    duration_ms: Some(500.0),
                    ..TimingPatch::default()
                }),
                ..StepPatch::default()
            },
        );
        assert!(matches!(apply_preset(&base(), &p), Err(ChoreoError::Validation { .. })));
    }

    #[test]
    fn same_preset_on_two_copies_is_equal() {
        let a = apply_preset(&base(), &widen()).unwrap();
        let b = apply_preset(&base(), &widen()).unwrap();
        assert_eq!(a, b);
    }
}
