// Copyright 2026 the Proscenium Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Double-buffered property storage.
//!
//! Every animatable property of a scene node lives in a [`PropertyBank`]: a
//! pair of parallel arrays holding the pending `base` slot and the committed
//! `current` slot for each node. Setters write `base` synchronously;
//! the update pass copies `base` into `current` exactly once per frame for
//! dirty nodes. Between frames `current` never changes, so rendering and
//! cross-node composition always observe a stable snapshot.
//!
//! Constraints are the one writer allowed to mutate `current` directly:
//! their output must not be re-committed from a stale `base`, so the update
//! pass applies them after the commit step (see
//! [`stage`](crate::stage)).

use alloc::vec::Vec;

use crate::math::{Color, Quaternion, Vector3};
use crate::node::{ColorMode, DrawMode, PositionInheritanceMode};

/// Identifies one animatable property of a scene node.
///
/// The property set is closed and built at compile time; there is no
/// runtime registration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PropertyIndex {
    /// Attachment point within the parent's rect (relative coordinates).
    ParentOrigin,
    /// Pivot within the node's own rect (relative coordinates).
    AnchorPoint,
    /// Extent of the node's rect.
    Size,
    /// Local position.
    Position,
    /// Local rotation.
    Rotation,
    /// Local scale.
    Scale,
    /// Local color.
    Color,
    /// Visibility flag.
    Visible,
    /// Hit-test sensitivity flag.
    Sensitive,
    /// Draw mode.
    DrawMode,
    /// Color inheritance mode.
    ColorMode,
    /// Position inheritance mode.
    PositionInheritance,
    /// Whether the parent's world rotation is inherited.
    InheritRotation,
    /// Whether the parent's world scale is inherited.
    InheritScale,
}

/// A dynamically-typed property value.
///
/// Used at the constraint boundary and by the generic property accessors;
/// the typed setters/getters on the store are the primary API.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PropertyValue {
    /// A 3-component vector.
    Vector3(Vector3),
    /// A rotation.
    Quaternion(Quaternion),
    /// An RGBA color.
    Color(Color),
    /// A boolean flag.
    Bool(bool),
    /// A draw mode.
    DrawMode(DrawMode),
    /// A color mode.
    ColorMode(ColorMode),
    /// A position inheritance mode.
    PositionInheritance(PositionInheritanceMode),
}

impl PropertyValue {
    /// Blends from `pre` toward `target` by `weight` in `[0, 1]`.
    ///
    /// Continuous types interpolate (rotations via normalized lerp on the
    /// shorter arc); discrete types hold `pre` until the weight reaches 1.
    /// Mismatched types return `pre` unchanged.
    #[must_use]
    pub fn blend(pre: Self, target: Self, weight: f32) -> Self {
        match (pre, target) {
            (Self::Vector3(a), Self::Vector3(b)) => Self::Vector3(Vector3::lerp(a, b, weight)),
            (Self::Quaternion(a), Self::Quaternion(b)) => {
                Self::Quaternion(Quaternion::nlerp(a, b, weight))
            }
            (Self::Color(a), Self::Color(b)) => Self::Color(Color::lerp(a, b, weight)),
            (Self::Bool(_), Self::Bool(b)) if weight >= 1.0 => Self::Bool(b),
            (Self::DrawMode(_), Self::DrawMode(m)) if weight >= 1.0 => Self::DrawMode(m),
            (Self::ColorMode(_), Self::ColorMode(m)) if weight >= 1.0 => Self::ColorMode(m),
            (Self::PositionInheritance(_), Self::PositionInheritance(m)) if weight >= 1.0 => {
                Self::PositionInheritance(m)
            }
            _ => pre,
        }
    }
}

/// Double-buffered storage for one property across all nodes.
///
/// Slot `idx` of both arrays belongs to the node occupying arena slot `idx`.
/// Recycled slots are reset to the bank's default value.
#[derive(Clone, Debug)]
pub struct PropertyBank<T: Copy> {
    base: Vec<T>,
    current: Vec<T>,
    default: T,
}

impl<T: Copy> PropertyBank<T> {
    /// Creates an empty bank whose slots start as (and reset to) `default`.
    #[must_use]
    pub const fn new(default: T) -> Self {
        Self {
            base: Vec::new(),
            current: Vec::new(),
            default,
        }
    }

    /// Appends a slot initialized to the default value.
    pub fn push(&mut self) {
        self.base.push(self.default);
        self.current.push(self.default);
    }

    /// Resets a recycled slot to the default value in both buffers.
    pub fn reset(&mut self, idx: u32) {
        self.base[idx as usize] = self.default;
        self.current[idx as usize] = self.default;
    }

    /// Writes the pending value. Never touches `current`.
    #[inline]
    pub fn set_base(&mut self, idx: u32, value: T) {
        self.base[idx as usize] = value;
    }

    /// Returns the pending value: the last write this frame, or the
    /// committed value if nothing was written since the last commit.
    #[inline]
    #[must_use]
    pub fn base(&self, idx: u32) -> T {
        self.base[idx as usize]
    }

    /// Returns the committed value from the most recent update pass.
    #[inline]
    #[must_use]
    pub fn current(&self, idx: u32) -> T {
        self.current[idx as usize]
    }

    /// Commits the pending value: `current ← base`.
    #[inline]
    pub fn commit(&mut self, idx: u32) {
        self.current[idx as usize] = self.base[idx as usize];
    }

    /// Overwrites the committed value directly, bypassing `base`.
    ///
    /// Reserved for constraint outputs; see the module docs.
    #[inline]
    pub fn write_current(&mut self, idx: u32, value: T) {
        self.current[idx as usize] = value;
    }

    /// Number of slots in the bank.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.base.len()
    }

    /// Whether the bank has no slots.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.base.is_empty()
    }
}
