// SPDX-License-Identifier: MIT OR Apache-2.0
//! Tween data and easing curves.

use crate::clip::AnimationError;
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;
use std::str::FromStr;

/// Easing curve applied to normalized tween progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum Ease {
    /// Constant speed
    #[default]
    Linear,
    /// Quadratic, accelerating
    QuadIn,
    /// Quadratic, decelerating
    QuadOut,
    /// Quadratic, both ends
    QuadInOut,
    /// Cubic, accelerating
    CubicIn,
    /// Cubic, decelerating
    CubicOut,
    /// Cubic, both ends
    CubicInOut,
    /// Quartic, accelerating
    QuartIn,
    /// Quartic, decelerating
    QuartOut,
    /// Quartic, both ends
    QuartInOut,
    /// Quintic, accelerating
    QuintIn,
    /// Quintic, decelerating
    QuintOut,
    /// Quintic, both ends
    QuintInOut,
    /// Sinusoidal, accelerating
    SineIn,
    /// Sinusoidal, decelerating
    SineOut,
    /// Sinusoidal, both ends
    SineInOut,
    /// Overshooting back-off at the start
    BackIn,
    /// Overshooting back-off at the end
    BackOut,
    /// Overshooting back-off at both ends
    BackInOut,
    /// Circular, accelerating
    CircIn,
    /// Circular, decelerating
    CircOut,
    /// Circular, both ends
    CircInOut,
    /// Bounce at the start
    BounceIn,
    /// Bounce at the end
    BounceOut,
    /// Bounce at both ends
    BounceInOut,
    /// Spring at the start
    ElasticIn,
    /// Spring at the end
    ElasticOut,
    /// Spring at both ends
    ElasticInOut,
}

const BACK: f32 = 1.70158;

impl Ease {
    /// Every ease, in the order the editor lists them
    pub const ALL: [Ease; 28] = [
        Ease::Linear,
        Ease::QuadIn,
        Ease::QuadOut,
        Ease::QuadInOut,
        Ease::CubicIn,
        Ease::CubicOut,
        Ease::CubicInOut,
        Ease::QuartIn,
        Ease::QuartOut,
        Ease::QuartInOut,
        Ease::QuintIn,
        Ease::QuintOut,
        Ease::QuintInOut,
        Ease::SineIn,
        Ease::SineOut,
        Ease::SineInOut,
        Ease::BackIn,
        Ease::BackOut,
        Ease::BackInOut,
        Ease::CircIn,
        Ease::CircOut,
        Ease::CircInOut,
        Ease::BounceIn,
        Ease::BounceOut,
        Ease::BounceInOut,
        Ease::ElasticIn,
        Ease::ElasticOut,
        Ease::ElasticInOut,
    ];

    /// Name used in documents
    pub fn name(&self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::QuadIn => "quadIn",
            Self::QuadOut => "quadOut",
            Self::QuadInOut => "quadInOut",
            Self::CubicIn => "cubicIn",
            Self::CubicOut => "cubicOut",
            Self::CubicInOut => "cubicInOut",
            Self::QuartIn => "quartIn",
            Self::QuartOut => "quartOut",
            Self::QuartInOut => "quartInOut",
            Self::QuintIn => "quintIn",
            Self::QuintOut => "quintOut",
            Self::QuintInOut => "quintInOut",
            Self::SineIn => "sineIn",
            Self::SineOut => "sineOut",
            Self::SineInOut => "sineInOut",
            Self::BackIn => "backIn",
            Self::BackOut => "backOut",
            Self::BackInOut => "backInOut",
            Self::CircIn => "circIn",
            Self::CircOut => "circOut",
            Self::CircInOut => "circInOut",
            Self::BounceIn => "bounceIn",
            Self::BounceOut => "bounceOut",
            Self::BounceInOut => "bounceInOut",
            Self::ElasticIn => "elasticIn",
            Self::ElasticOut => "elasticOut",
            Self::ElasticInOut => "elasticInOut",
        }
    }

    /// Map progress `t` in `[0, 1]` through the curve
    pub fn apply(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::QuadIn => t * t,
            Self::QuadOut => t * (2.0 - t),
            Self::QuadInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    -1.0 + (4.0 - 2.0 * t) * t
                }
            }
            Self::CubicIn => t.powi(3),
            Self::CubicOut => (t - 1.0).powi(3) + 1.0,
            Self::CubicInOut => {
                if t < 0.5 {
                    4.0 * t.powi(3)
                } else {
                    (t - 1.0) * (2.0 * t - 2.0) * (2.0 * t - 2.0) + 1.0
                }
            }
            Self::QuartIn => t.powi(4),
            Self::QuartOut => 1.0 - (t - 1.0).powi(4),
            Self::QuartInOut => {
                if t < 0.5 {
                    8.0 * t.powi(4)
                } else {
                    1.0 - 8.0 * (t - 1.0).powi(4)
                }
            }
            Self::QuintIn => t.powi(5),
            Self::QuintOut => 1.0 + (t - 1.0).powi(5),
            Self::QuintInOut => {
                if t < 0.5 {
                    16.0 * t.powi(5)
                } else {
                    1.0 + 16.0 * (t - 1.0).powi(5)
                }
            }
            Self::SineIn => 1.0 - (t * PI / 2.0).cos(),
            Self::SineOut => (t * PI / 2.0).sin(),
            Self::SineInOut => -((PI * t).cos() - 1.0) / 2.0,
            Self::BackIn => t * t * ((BACK + 1.0) * t - BACK),
            Self::BackOut => {
                let u = t - 1.0;
                u * u * ((BACK + 1.0) * u + BACK) + 1.0
            }
            Self::BackInOut => {
                let s = BACK * 1.525;
                let k = t * 2.0;
                if k < 1.0 {
                    0.5 * (k * k * ((s + 1.0) * k - s))
                } else {
                    let k = k - 2.0;
                    0.5 * (k * k * ((s + 1.0) * k + s) + 2.0)
                }
            }
            Self::CircIn => 1.0 - (1.0 - t * t).sqrt(),
            Self::CircOut => (1.0 - (t - 1.0) * (t - 1.0)).sqrt(),
            Self::CircInOut => {
                let k = t * 2.0;
                if k < 1.0 {
                    -0.5 * ((1.0 - k * k).sqrt() - 1.0)
                } else {
                    let k = k - 2.0;
                    0.5 * ((1.0 - k * k).sqrt() + 1.0)
                }
            }
            Self::BounceIn => 1.0 - bounce_out(1.0 - t),
            Self::BounceOut => bounce_out(t),
            Self::BounceInOut => {
                if t < 0.5 {
                    (1.0 - bounce_out(1.0 - 2.0 * t)) * 0.5
                } else {
                    bounce_out(2.0 * t - 1.0) * 0.5 + 0.5
                }
            }
            Self::ElasticIn | Self::ElasticOut | Self::ElasticInOut if t == 0.0 || t == 1.0 => t,
            Self::ElasticIn => -(2.0_f32.powf(10.0 * (t - 1.0))) * ((t - 1.1) * 5.0 * PI).sin(),
            Self::ElasticOut => 2.0_f32.powf(-10.0 * t) * ((t - 0.1) * 5.0 * PI).sin() + 1.0,
            Self::ElasticInOut => {
                let k = t * 2.0;
                if k < 1.0 {
                    -0.5 * 2.0_f32.powf(10.0 * (k - 1.0)) * ((k - 1.1) * 5.0 * PI).sin()
                } else {
                    0.5 * 2.0_f32.powf(-10.0 * (k - 1.0)) * ((k - 1.1) * 5.0 * PI).sin() + 1.0
                }
            }
        }
    }
}

fn bounce_out(t: f32) -> f32 {
    const N: f32 = 7.5625;
    const D: f32 = 2.75;
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

impl FromStr for Ease {
    type Err = AnimationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|ease| ease.name() == s)
            .ok_or_else(|| AnimationError::UnknownEase(s.to_string()))
    }
}

/// Where a tween endpoint takes its transform from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum StatusMode {
    /// The target's transform at the moment the clip starts
    #[default]
    Current,
    /// The transform stored in the tween
    Custom,
}

/// Position, rotation and scale of a tween endpoint
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransformStatus {
    /// Position
    pub position: [f32; 3],
    /// Euler rotation in radians
    pub rotation: [f32; 3],
    /// Scale
    pub scale: [f32; 3],
}

impl Default for TransformStatus {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            rotation: [0.0; 3],
            scale: [1.0; 3],
        }
    }
}

impl TransformStatus {
    /// Component-wise linear interpolation
    pub fn lerp(&self, other: &Self, t: f32) -> Self {
        Self {
            position: lerp3(self.position, other.position, t),
            rotation: lerp3(self.rotation, other.rotation, t),
            scale: lerp3(self.scale, other.scale, t),
        }
    }
}

fn lerp3(a: [f32; 3], b: [f32; 3], t: f32) -> [f32; 3] {
    [
        a[0] + (b[0] - a[0]) * t,
        a[1] + (b[1] - a[1]) * t,
        a[2] + (b[2] - a[2]) * t,
    ]
}

/// Transform tween between two endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Tween {
    /// Source of the start transform
    #[serde(default)]
    pub begin_status: StatusMode,
    /// Start transform when `begin_status` is custom
    #[serde(default)]
    pub begin: TransformStatus,
    /// Easing curve
    #[serde(default)]
    pub ease: Ease,
    /// Source of the end transform
    #[serde(default)]
    pub end_status: StatusMode,
    /// End transform when `end_status` is custom
    #[serde(default)]
    pub end: TransformStatus,
}

impl Tween {
    /// Tween from the target's current transform to `end`
    pub fn to(end: TransformStatus, ease: Ease) -> Self {
        Self {
            begin_status: StatusMode::Current,
            begin: TransformStatus::default(),
            ease,
            end_status: StatusMode::Custom,
            end,
        }
    }

    /// Sample the tween at progress `t`, resolving `Current` endpoints to `current`
    pub fn sample(&self, t: f32, current: &TransformStatus) -> TransformStatus {
        let begin = match self.begin_status {
            StatusMode::Current => current,
            StatusMode::Custom => &self.begin,
        };
        let end = match self.end_status {
            StatusMode::Current => current,
            StatusMode::Custom => &self.end,
        };
        begin.lerp(end, self.ease.apply(t))
    }
}
