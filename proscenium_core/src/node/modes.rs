// Copyright 2026 the Proscenium Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-node policy enums for drawing, color, and position inheritance.
//!
//! Each policy is a small closed enum with a pure function per mode,
//! selected by `match`. The policy sets are fixed and evaluated for every
//! node every frame, so there is no trait-object dispatch here.

use crate::math::{Color, Vector3};

/// How a node participates in its task's draw ordering.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DrawMode {
    /// Drawn in tree traversal order.
    #[default]
    Normal,
    /// Drawn after all `Normal` nodes of the same task, in relative
    /// traversal order.
    Overlay,
    /// Excluded from the color pass entirely; contributes to the stencil
    /// buffer instead.
    Stencil,
}

/// How a node's world color is derived from its local color and its
/// parent's world color.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ColorMode {
    /// Local color only.
    UseOwnColor,
    /// Local RGB, alpha multiplied by the parent's world alpha.
    #[default]
    UseOwnMultiplyParentAlpha,
    /// Component-wise product of local color and parent world color.
    UseOwnMultiplyParentColor,
    /// Parent's world color entirely; local color ignored.
    UseParentColor,
}

impl ColorMode {
    /// Composes a world color from the node's committed local color and its
    /// parent's already-computed world color.
    ///
    /// The result is not clamped; composition clamps once when storing the
    /// world value.
    #[must_use]
    pub fn compose(self, local: Color, parent_world: Color) -> Color {
        match self {
            Self::UseOwnColor => local,
            Self::UseOwnMultiplyParentAlpha => {
                Color::new(local.r, local.g, local.b, local.a * parent_world.a)
            }
            Self::UseOwnMultiplyParentColor => local.mul_elem(parent_world),
            Self::UseParentColor => parent_world,
        }
    }
}

/// How a node's world position is derived from its local position and its
/// parent's world position.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PositionInheritanceMode {
    /// Parent's world position plus the local offset (the default).
    #[default]
    Inherit,
    /// Parent's world position only; the local position is ignored.
    UseParent,
    /// Same as [`Inherit`](Self::Inherit), spelled explicitly.
    UseParentPlusLocal,
    /// Local position only; the parent is ignored.
    DontInherit,
}

impl PositionInheritanceMode {
    /// Composes a world position.
    ///
    /// `origin_offset` is the parent-origin contribution (zero under the
    /// centered default) and `local_in_parent` is the local position already
    /// transformed into the parent's world basis. `local` is the raw local
    /// position, used by [`DontInherit`](Self::DontInherit).
    #[must_use]
    pub fn compose(
        self,
        parent_world: Vector3,
        origin_offset: Vector3,
        local_in_parent: Vector3,
        local: Vector3,
    ) -> Vector3 {
        match self {
            Self::Inherit | Self::UseParentPlusLocal => {
                parent_world + origin_offset + local_in_parent
            }
            Self::UseParent => parent_world,
            Self::DontInherit => local,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_mode_default_multiplies_alpha_only() {
        let parent = Color::new(1.0, 0.5, 0.0, 0.8);
        let local = Color::new(0.5, 0.6, 0.5, 1.0);
        let out = ColorMode::UseOwnMultiplyParentAlpha.compose(local, parent);
        assert_eq!(out, Color::new(0.5, 0.6, 0.5, 0.8));
    }

    #[test]
    fn color_mode_parent_color_ignores_local() {
        let parent = Color::new(0.1, 0.2, 0.3, 0.4);
        let local = Color::new(0.9, 0.9, 0.9, 0.9);
        assert_eq!(ColorMode::UseParentColor.compose(local, parent), parent);
    }

    #[test]
    fn color_mode_multiply_parent_color() {
        let parent = Color::new(0.5, 0.5, 0.5, 0.5);
        let local = Color::new(1.0, 0.5, 0.0, 1.0);
        assert_eq!(
            ColorMode::UseOwnMultiplyParentColor.compose(local, parent),
            Color::new(0.5, 0.25, 0.0, 0.5)
        );
    }

    #[test]
    fn position_modes() {
        let parent = Vector3::new(10.0, 20.0, 0.0);
        let local = Vector3::new(1.0, 2.0, 3.0);

        let inherit = PositionInheritanceMode::Inherit.compose(
            parent,
            Vector3::ZERO,
            local,
            local,
        );
        assert_eq!(inherit, Vector3::new(11.0, 22.0, 3.0));

        let explicit = PositionInheritanceMode::UseParentPlusLocal.compose(
            parent,
            Vector3::ZERO,
            local,
            local,
        );
        assert_eq!(explicit, inherit, "Inherit and UseParentPlusLocal agree");

        let parent_only = PositionInheritanceMode::UseParent.compose(
            parent,
            Vector3::ZERO,
            local,
            local,
        );
        assert_eq!(parent_only, parent);

        let detached = PositionInheritanceMode::DontInherit.compose(
            parent,
            Vector3::ZERO,
            local,
            local,
        );
        assert_eq!(detached, local);
    }
}
