use indexmap::IndexMap;

use crate::error::Result;
use crate::model::{
    BaseTiming, ChannelOverrides, ChaseOrder, CurveParams, DefaultTiming, DimmerKind, DimmerPatch, DimmerSpec,
    GeometryKind, GeometryPatch, GeometrySpec, Intensity, MovementKind, MovementPatch, MovementSpec,
    PhaseOffsetSpec, Preset, Quantize, RemainderPolicy, RepeatContract, RepeatMode, RoleToken, ShutterState,
    StepDraft, StepPatch, StepTarget, Template, TemplateDefaults, TemplateDraft, TimingPatch, Transition,
};

use super::CatalogBuilder;

const LINE: [RoleToken; 4] = [
    RoleToken::OuterLeft,
    RoleToken::InnerLeft,
    RoleToken::InnerRight,
    RoleToken::OuterRight,
];

fn groups(extra_center: bool) -> IndexMap<String, Vec<RoleToken>> {
    let mut all = LINE.to_vec();
    if extra_center {
        all.insert(2, RoleToken::Center);
    }
    let mut groups = IndexMap::new();
    groups.insert("all".to_string(), all);
    groups.insert("left".to_string(), vec![RoleToken::OuterLeft, RoleToken::InnerLeft]);
    groups.insert("right".to_string(), vec![RoleToken::InnerRight, RoleToken::OuterRight]);
    groups
}

fn draft(id: &str, name: &str, category: &str, repeat: RepeatContract, steps: Vec<StepDraft>) -> TemplateDraft {
    let groups = groups(false);
    TemplateDraft {
        template_id: id.to_string(),
        version: 1,
        name: name.to_string(),
        category: category.to_string(),
        roles: LINE.into_iter().collect(),
        groups,
        default_timing: DefaultTiming {
            quantize_start: Quantize::Beat,
            quantize_end: Quantize::Beat,
        },
        repeat,
        defaults: TemplateDefaults::default(),
        steps,
        metadata: IndexMap::new(),
        provenance: Vec::new(),
    }
}

fn repeat(mode: RepeatMode, cycle_bars: f64, loop_ids: &[&str], remainder: RemainderPolicy) -> RepeatContract {
    RepeatContract {
        repeatable: true,
        mode,
        cycle_bars,
        loop_step_ids: loop_ids.iter().map(|s| (*s).to_string()).collect(),
        remainder_policy: remainder,
    }
}

fn all() -> StepTarget {
    StepTarget::Group("all".into())
}

// ── Templates ───────────────────────────────────────────────────────

/// Heads fan out, fade up, then sweep side to side.
fn fan_sweep() -> Result<Template> {
    let mut open = StepDraft::new("open", all(), BaseTiming::musical(0.0, 1.0));
    open.geometry = GeometrySpec::new(GeometryKind::Fan);
    open.dimmer = DimmerSpec::new(DimmerKind::FadeIn, Intensity::Medium, 1.0);
    open.priority = 1;

    let mut sweep = StepDraft::new("sweep", all(), BaseTiming::musical(0.0, 4.0));
    sweep.geometry = GeometrySpec::new(GeometryKind::Fan);
    sweep.movement = MovementSpec::new(MovementKind::Sweep, Intensity::Medium, 2.0);
    sweep.entry_transition = Some(Transition::Crossfade { duration_ms: 250.0 });

    let mut d = draft(
        "fan_sweep",
        "Fan Sweep",
        "movement",
        repeat(RepeatMode::Joiner, 4.0, &["sweep"], RemainderPolicy::HoldLastPose),
        vec![open, sweep],
    );
    d.metadata.insert("energy".into(), "medium".into());
    Template::new(d)
}

/// Nods chase across the rig, then come back mirrored.
fn ping_pong_chase() -> Result<Template> {
    let mut chase = StepDraft::new("chase", all(), BaseTiming::musical(0.0, 1.0));
    chase.geometry = GeometrySpec {
        geometry_id: GeometryKind::Front,
        params: CurveParams::new().with_float("tilt", 10.0),
    };
    chase.movement = MovementSpec::new(MovementKind::Nod, Intensity::Dramatic, 1.0);
    chase.dimmer = DimmerSpec::new(DimmerKind::Pulse, Intensity::Medium, 2.0);
    chase.timing.phase_offset = Some(PhaseOffsetSpec::group_order("all", ChaseOrder::LeftToRight, 0.5, true));

    let mut back = StepDraft::new("return", all(), BaseTiming::musical(1.0, 1.0));
    back.geometry = GeometrySpec::new(GeometryKind::Fan);
    back.movement = MovementSpec::new(MovementKind::Sweep, Intensity::Smooth, 1.0);
    back.dimmer = DimmerSpec::new(DimmerKind::BeatPulse, Intensity::Medium, 1.0);

    let d = draft(
        "ping_pong_chase",
        "Ping-Pong Chase",
        "chase",
        repeat(RepeatMode::PingPong, 2.0, &["chase", "return"], RemainderPolicy::Truncate),
        vec![chase, back],
    );
    Template::new(d)
}

/// A short strobe burst over a static ceiling look.
fn strobe_hit() -> Result<Template> {
    let mut hit = StepDraft::new("hit", all(), BaseTiming::absolute_ms(0.0, 500.0));
    hit.dimmer = DimmerSpec::new(DimmerKind::Strobe, Intensity::Intense, 1.0);
    hit.priority = 2;
    hit.overrides = Some(ChannelOverrides {
        shutter: Some(ShutterState::Strobe { rate_dmx: 200.0 }),
        ..ChannelOverrides::default()
    });

    let mut hold = StepDraft::new("hold", all(), BaseTiming::musical(0.0, 1.0));
    hold.geometry = GeometrySpec::new(GeometryKind::Ceiling);
    hold.overrides = Some(ChannelOverrides {
        color_dmx: Some(40.0),
        ..ChannelOverrides::default()
    });

    let mut d = draft(
        "strobe_hit",
        "Strobe Hit",
        "accent",
        RepeatContract {
            repeatable: false,
            ..repeat(RepeatMode::Joiner, 1.0, &["hold"], RemainderPolicy::HoldLastPose)
        },
        vec![hit, hold],
    );
    d.default_timing = DefaultTiming::default();
    Template::new(d)
}

/// Slow wandering floor wash that breathes.
fn breathe_wash() -> Result<Template> {
    let mut wash = StepDraft::new("wash", all(), BaseTiming::musical(0.0, 4.0));
    wash.geometry = GeometrySpec::new(GeometryKind::Floor);
    wash.movement = MovementSpec::new(MovementKind::Drift, Intensity::Slow, 1.0);
    wash.dimmer = DimmerSpec {
        min_level: 0.1,
        ..DimmerSpec::new(DimmerKind::Breathe, Intensity::Smooth, 2.0)
    };
    wash.exit_transition = Some(Transition::FadeThroughBlack { duration_ms: 400.0 });

    let mut d = draft(
        "breathe_wash",
        "Breathe Wash",
        "ambient",
        repeat(RepeatMode::Joiner, 4.0, &["wash"], RemainderPolicy::FadeOut),
        vec![wash],
    );
    d.defaults.dimmer_ceiling_dmx = 200.0;
    Template::new(d)
}

/// Side pairs circle toward a shared focus while the center head points up.
fn circle_converge() -> Result<Template> {
    let converge = || GeometrySpec {
        geometry_id: GeometryKind::Converge,
        params: CurveParams::new().with_float("spread", 40.0),
    };

    let mut left = StepDraft::new("left_circle", StepTarget::Group("left".into()), BaseTiming::musical(0.0, 2.0));
    left.geometry = converge();
    left.movement = MovementSpec::new(MovementKind::Circle, Intensity::Dramatic, 1.0);

    let mut right = StepDraft::new("right_circle", StepTarget::Group("right".into()), BaseTiming::musical(0.0, 2.0));
    right.geometry = converge();
    right.movement = MovementSpec {
        params: CurveParams::new().with_float("width", 0.8),
        ..MovementSpec::new(MovementKind::Circle, Intensity::Dramatic, 1.0)
    };

    let mut spot = StepDraft::new("center_spot", StepTarget::Role(RoleToken::Center), BaseTiming::musical(0.0, 2.0));
    spot.geometry = GeometrySpec::new(GeometryKind::Ceiling);
    spot.dimmer = DimmerSpec::new(DimmerKind::Breathe, Intensity::Slow, 1.0);

    let mut d = draft(
        "circle_converge",
        "Circle Converge",
        "movement",
        repeat(
            RepeatMode::Joiner,
            2.0,
            &["left_circle", "right_circle", "center_spot"],
            RemainderPolicy::HoldLastPose,
        ),
        vec![left, right, spot],
    );
    d.roles.insert(RoleToken::Center);
    d.groups = groups(true);
    Template::new(d)
}

// ── Presets ─────────────────────────────────────────────────────────

fn fan_sweep_wide() -> Preset {
    Preset::new("fan_sweep_wide", "Fan Sweep (wide)").with_patch(
        "sweep",
        StepPatch {
            geometry: Some(GeometryPatch {
                params: CurveParams::new().with_float("spread", 100.0),
                ..GeometryPatch::default()
            }),
            movement: Some(MovementPatch {
                intensity: Some(Intensity::Dramatic),
                params: CurveParams::new().with_float("width", 1.5),
                ..MovementPatch::default()
            }),
            ..StepPatch::default()
        },
    )
}

fn fan_sweep_dim() -> Preset {
    let mut p = Preset::new("fan_sweep_dim", "Fan Sweep (dim)");
    p.defaults.dimmer_ceiling_dmx = Some(160.0);
    p.with_patch(
        "sweep",
        StepPatch {
            dimmer: Some(DimmerPatch {
                max_level: Some(0.8),
                ..DimmerPatch::default()
            }),
            ..StepPatch::default()
        },
    )
}

fn chase_fast() -> Preset {
    Preset::new("chase_fast", "Chase (fast)").with_patch(
        "chase",
        StepPatch {
            timing: Some(TimingPatch {
                phase_offset: Some(PhaseOffsetSpec::group_order("all", ChaseOrder::OutsideIn, 0.25, true)),
                ..TimingPatch::default()
            }),
            movement: Some(MovementPatch {
                cycles: Some(2.0),
                intensity: Some(Intensity::Intense),
                ..MovementPatch::default()
            }),
            ..StepPatch::default()
        },
    )
}

/// Builder holding every shipped template, alias and preset.
pub fn builder() -> Result<CatalogBuilder> {
    let mut b = CatalogBuilder::new();
    for template in [fan_sweep()?, ping_pong_chase()?, strobe_hit()?, breathe_wash()?, circle_converge()?] {
        b.register_template(template)?;
    }
    b.register_alias("fan", "fan_sweep")?;
    b.register_alias("chase", "ping_pong_chase")?;
    b.register_alias("wash", "breathe_wash")?;
    for preset in [fan_sweep_wide(), fan_sweep_dim(), chase_fast()] {
        b.register_preset(preset)?;
    }
    Ok(b)
}
