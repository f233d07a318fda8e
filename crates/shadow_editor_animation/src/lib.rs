// SPDX-License-Identifier: MIT OR Apache-2.0
//! Animation model for the shadow editor.
//!
//! This crate provides the data the editor persists for animations:
//! - Animation groups referencing clips by identifier
//! - Clips of several kinds placed on timeline layers
//! - Transform tweens with named easing curves
//! - Target bindings to scene objects
//!
//! ## Architecture
//!
//! Groups and clips live side by side in an [`AnimationSet`]. Groups only
//! hold clip identifiers, so a group can outlive a clip; [`AnimationSet::resolve`]
//! returns the clips that still exist.

pub mod binding;
pub mod clip;
pub mod group;
pub mod tween;

pub use binding::TargetBinding;
pub use clip::{AnimationClip, AnimationError, ClipData, ClipKind};
pub use group::{AnimationGroup, AnimationSet};
pub use tween::{Ease, StatusMode, TransformStatus, Tween};
