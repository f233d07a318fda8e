// SPDX-License-Identifier: MIT OR Apache-2.0
//! Animation clips placed on a group's timeline.

use crate::binding::TargetBinding;
use crate::tween::{TransformStatus, Tween};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Animation errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnimationError {
    /// Clip ends before it begins
    #[error("Clip {clip} ends at {end} before it begins at {begin}")]
    InvalidSpan {
        /// Clip identifier
        clip: String,
        /// Begin time
        begin: f32,
        /// End time
        end: f32,
    },

    /// Unknown clip kind tag
    #[error("Unknown animation kind: {0}")]
    UnknownKind(String),

    /// Unknown ease name
    #[error("Unknown ease: {0}")]
    UnknownEase(String),
}

/// Kind of clip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClipKind {
    /// Transform tween
    Tween,
    /// Skeletal animation of a loaded model
    Skeletal,
    /// Audio playback
    Audio,
    /// Post-processing filter
    Filter,
    /// Particle emitter
    Particle,
}

impl ClipKind {
    /// Every clip kind
    pub const ALL: [ClipKind; 5] = [
        ClipKind::Tween,
        ClipKind::Skeletal,
        ClipKind::Audio,
        ClipKind::Filter,
        ClipKind::Particle,
    ];

    /// Type tag used in documents
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Tween => "Tween",
            Self::Skeletal => "Skeletal",
            Self::Audio => "Audio",
            Self::Filter => "Filter",
            Self::Particle => "Particle",
        }
    }

    /// Look up a kind from its type tag
    pub fn from_tag(tag: &str) -> Result<Self, AnimationError> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.tag() == tag)
            .ok_or_else(|| AnimationError::UnknownKind(tag.to_string()))
    }
}

/// Kind-specific clip payload
#[derive(Debug, Clone, PartialEq)]
pub enum ClipData {
    /// Tween endpoints and ease
    Tween(Tween),
    /// Payload the editor stores without interpreting
    Opaque(serde_json::Value),
}

impl ClipData {
    /// Default payload for a clip kind
    pub fn for_kind(kind: ClipKind) -> Self {
        match kind {
            ClipKind::Tween => Self::Tween(Tween::default()),
            _ => Self::Opaque(serde_json::Value::Object(serde_json::Map::new())),
        }
    }
}

/// A clip spanning `[begin_time, end_time]` on one layer
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationClip {
    /// Unique clip ID
    pub uuid: String,
    /// Clip name
    pub name: String,
    /// Clip kind
    pub kind: ClipKind,
    /// Animated object, if bound
    pub target: Option<TargetBinding>,
    /// Start time in seconds
    pub begin_time: f32,
    /// End time in seconds
    pub end_time: f32,
    /// Timeline layer
    pub layer: u32,
    /// Kind-specific payload
    pub data: ClipData,
}

impl AnimationClip {
    /// Create a ten second clip on layer 0
    pub fn new(name: impl Into<String>, kind: ClipKind) -> Self {
        Self {
            uuid: Uuid::new_v4().to_string().to_uppercase(),
            name: name.into(),
            kind,
            target: None,
            begin_time: 0.0,
            end_time: 10.0,
            layer: 0,
            data: ClipData::for_kind(kind),
        }
    }

    /// Set the clip's time span
    pub fn with_span(mut self, begin_time: f32, end_time: f32) -> Result<Self, AnimationError> {
        if end_time < begin_time {
            return Err(AnimationError::InvalidSpan {
                clip: self.uuid,
                begin: begin_time,
                end: end_time,
            });
        }
        self.begin_time = begin_time;
        self.end_time = end_time;
        Ok(self)
    }

    /// Bind the clip to a target
    pub fn with_target(mut self, target: TargetBinding) -> Self {
        self.target = Some(target);
        self
    }

    /// Length of the clip in seconds
    pub fn duration(&self) -> f32 {
        self.end_time - self.begin_time
    }

    /// Whether `time` falls inside the clip
    pub fn contains(&self, time: f32) -> bool {
        time >= self.begin_time && time <= self.end_time
    }

    /// Normalized progress at `time`, or `None` outside the clip
    pub fn progress(&self, time: f32) -> Option<f32> {
        if !self.contains(time) {
            return None;
        }
        let duration = self.duration();
        if duration <= f32::EPSILON {
            return Some(1.0);
        }
        Some((time - self.begin_time) / duration)
    }

    /// Sample a tween clip at `time`
    pub fn sample(&self, time: f32, current: &TransformStatus) -> Option<TransformStatus> {
        let ClipData::Tween(tween) = &self.data else {
            return None;
        };
        self.progress(time).map(|t| tween.sample(t, current))
    }
}
