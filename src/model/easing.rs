use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum_macros::EnumIter;

/// Easing function over normalized time.
///
/// Standard easing curves following the Penner conventions.
/// `evaluate(t)` maps normalized input [0,1] to eased output.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema, EnumIter,
)]
#[serde(rename_all = "snake_case")]
pub enum EasingFunction {
    /// Constant-speed interpolation.
    #[default]
    Linear,
    // Sinusoidal
    EaseInSine,
    EaseOutSine,
    EaseInOutSine,
    // Quadratic
    EaseInQuad,
    EaseOutQuad,
    EaseInOutQuad,
    // Cubic
    EaseInCubic,
    EaseOutCubic,
    EaseInOutCubic,
    // Exponential
    EaseInExpo,
    EaseOutExpo,
    EaseInOutExpo,
    // Back (overshoot)
    EaseInBack,
    EaseOutBack,
    EaseInOutBack,
    // Elastic (spring)
    EaseInElastic,
    EaseOutElastic,
    // Bounce
    EaseInBounce,
    EaseOutBounce,
}

impl EasingFunction {
    /// Evaluate the easing function at normalized time `t` (clamped to [0,1]).
    /// Returns the eased value, typically in [0,1] but may overshoot for
    /// Back and Elastic easings.
    #[allow(clippy::float_cmp, clippy::unreadable_literal)]
    pub fn evaluate(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,

            // Sinusoidal
            Self::EaseInSine => 1.0 - (t * std::f64::consts::FRAC_PI_2).cos(),
            Self::EaseOutSine => (t * std::f64::consts::FRAC_PI_2).sin(),
            Self::EaseInOutSine => 0.5 * (1.0 - (std::f64::consts::PI * t).cos()),

            // Quadratic
            Self::EaseInQuad => t * t,
            Self::EaseOutQuad => t * (2.0 - t),
            Self::EaseInOutQuad => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    -1.0 + (4.0 - 2.0 * t) * t
                }
            }

            // Cubic
            Self::EaseInCubic => t * t * t,
            Self::EaseOutCubic => {
                let u = t - 1.0;
                u * u * u + 1.0
            }
            Self::EaseInOutCubic => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    let u = 2.0 * t - 2.0;
                    0.5 * u * u * u + 1.0
                }
            }

            // Exponential
            Self::EaseInExpo => {
                if t == 0.0 { 0.0 } else { (2.0f64).powf(10.0 * (t - 1.0)) }
            }
            Self::EaseOutExpo => {
                if t == 1.0 { 1.0 } else { 1.0 - (2.0f64).powf(-10.0 * t) }
            }
            Self::EaseInOutExpo => {
                if t == 0.0 {
                    0.0
                } else if t == 1.0 {
                    1.0
                } else if t < 0.5 {
                    0.5 * (2.0f64).powf(20.0 * t - 10.0)
                } else {
                    1.0 - 0.5 * (2.0f64).powf(-20.0 * t + 10.0)
                }
            }

            // Back (overshoot)
            Self::EaseInBack => {
                const C: f64 = 1.70158;
                (C + 1.0) * t * t * t - C * t * t
            }
            Self::EaseOutBack => {
                const C: f64 = 1.70158;
                let u = t - 1.0;
                1.0 + (C + 1.0) * u * u * u + C * u * u
            }
            Self::EaseInOutBack => {
                const C: f64 = 1.70158 * 1.525;
                if t < 0.5 {
                    let u = 2.0 * t;
                    0.5 * (u * u * ((C + 1.0) * u - C))
                } else {
                    let u = 2.0 * t - 2.0;
                    0.5 * (u * u * ((C + 1.0) * u + C) + 2.0)
                }
            }

            // Elastic (spring), default period 0.3
            Self::EaseInElastic => elastic_in(t, 1.0, 0.3),
            Self::EaseOutElastic => elastic_out(t, 1.0, 0.3),

            // Bounce
            Self::EaseInBounce => 1.0 - bounce_out(1.0 - t),
            Self::EaseOutBounce => bounce_out(t),
        }
    }

    /// True for easings whose output leaves [0, 1].
    pub fn overshoots(self) -> bool {
        matches!(
            self,
            Self::EaseInBack
                | Self::EaseOutBack
                | Self::EaseInOutBack
                | Self::EaseInElastic
                | Self::EaseOutElastic
        )
    }
}

/// Elastic ease-in: a damped sinusoid growing toward t = 1.
/// `amplitude` below 1 is raised to 1 (the Penner convention).
#[allow(clippy::float_cmp)]
pub fn elastic_in(t: f64, amplitude: f64, period: f64) -> f64 {
    if t == 0.0 || t == 1.0 {
        return t;
    }
    let (a, s) = elastic_shape(amplitude, period);
    let u = t - 1.0;
    -(a * (2.0f64).powf(10.0 * u) * ((u - s) * std::f64::consts::TAU / period).sin())
}

/// Elastic ease-out: a damped sinusoid settling onto 1.
#[allow(clippy::float_cmp)]
pub fn elastic_out(t: f64, amplitude: f64, period: f64) -> f64 {
    if t == 0.0 || t == 1.0 {
        return t;
    }
    let (a, s) = elastic_shape(amplitude, period);
    a * (2.0f64).powf(-10.0 * t) * ((t - s) * std::f64::consts::TAU / period).sin() + 1.0
}

fn elastic_shape(amplitude: f64, period: f64) -> (f64, f64) {
    if amplitude < 1.0 {
        (1.0, period / 4.0)
    } else {
        let s = period / std::f64::consts::TAU * (1.0 / amplitude).asin();
        (amplitude, s)
    }
}

/// Bounce-out helper: Penner's four piecewise quadratic segments.
#[allow(clippy::unreadable_literal)]
pub fn bounce_out(t: f64) -> f64 {
    const N: f64 = 7.5625;
    const D: f64 = 2.75;

    if t < 1.0 / D {
        N * t * t
    } else if t < 2.0 / D {
        let t = t - 1.5 / D;
        N * t * t + 0.75
    } else if t < 2.5 / D {
        let t = t - 2.25 / D;
        N * t * t + 0.9375
    } else {
        let t = t - 2.625 / D;
        N * t * t + 0.984375
    }
}
