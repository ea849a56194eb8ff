pub mod curve;
pub mod easing;
pub mod fixture;
pub mod params;
pub mod patterns;
pub mod preset;
pub mod segment;
pub mod template;
pub mod timing;

// Re-export commonly used types at the model level.
pub use curve::{Curve, CurvePoint, NativeCurve, PointCurve, OVERSHOOT_MARGIN};
pub use easing::EasingFunction;
pub use fixture::{
    ChannelKind, DmxChannel, FixtureCalibration, FixtureContext, FixtureId, Rig, RoleToken,
};
pub use params::{CurveParams, ParamValue};
pub use patterns::{DimmerKind, GeometryKind, Intensity, IntensityProfile, MovementKind};
pub use preset::{
    DefaultsPatch, DimmerPatch, GeometryPatch, MovementPatch, Preset, StepPatch, TimingPatch,
};
pub use segment::{ChannelSegment, Gap, OffsetCentering, SegmentDraft, SegmentSource, SegmentValue};
pub use template::{
    BaseTiming, BlendMode, ChannelOverrides, ChaseOrder, DefaultTiming, DimmerSpec, Distribution,
    GeometrySpec, MovementSpec, PhaseOffsetMode, PhaseOffsetSpec, RemainderPolicy, RepeatContract,
    RepeatMode, ShutterState, Step, StepDraft, StepTarget, StepTiming, Template, TemplateDefaults,
    TemplateDraft, TimingMode, TimingSpan, Transition,
};
pub use timing::{Quantize, TimingContext};
