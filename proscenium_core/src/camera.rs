// Copyright 2026 the Proscenium Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Camera projection parameters and screen/world mapping.
//!
//! A render task pairs a [`Camera`] with a camera *node* whose world
//! position anchors the view. The camera looks along −Z: a node's view
//! depth is the camera's world Z minus the node's world Z, and the near/far
//! planes bound hit testing along that axis.

use kurbo::{Point, Rect};

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;

use crate::math::Vector3;

/// Projection mode.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Projection {
    /// Parallel projection covering `width` × `height` world units,
    /// centered on the camera, at every depth.
    Orthographic {
        /// Horizontal extent in world units.
        width: f32,
        /// Vertical extent in world units.
        height: f32,
    },
    /// Perspective projection with the given vertical field of view in
    /// radians. The horizontal extent follows the viewport's aspect ratio.
    Perspective {
        /// Vertical field of view in radians.
        vertical_fov: f32,
    },
}

/// Camera parameters for a render task.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    /// Projection mode.
    pub projection: Projection,
    /// Near clipping plane distance (inclusive bound for hit testing).
    pub near: f32,
    /// Far clipping plane distance (exclusive bound for hit testing).
    pub far: f32,
}

impl Camera {
    /// Creates an orthographic camera covering `width` × `height` world
    /// units, with default near/far planes.
    #[must_use]
    pub const fn orthographic(width: f32, height: f32) -> Self {
        Self {
            projection: Projection::Orthographic { width, height },
            near: 0.1,
            far: 1000.0,
        }
    }

    /// Creates a perspective camera with the given vertical field of view
    /// in radians, with default near/far planes.
    #[must_use]
    pub const fn perspective(vertical_fov: f32) -> Self {
        Self {
            projection: Projection::Perspective { vertical_fov },
            near: 0.1,
            far: 1000.0,
        }
    }

    /// Returns the view depth of a point at world Z `world_z`, as seen from
    /// a camera positioned at `cam_pos` looking along −Z.
    #[inline]
    #[must_use]
    pub fn depth_of(cam_pos: Vector3, world_z: f32) -> f32 {
        cam_pos.z - world_z
    }

    /// Whether a view depth lies within `[near, far)`.
    #[inline]
    #[must_use]
    pub fn depth_in_range(&self, depth: f32) -> bool {
        depth >= self.near && depth < self.far
    }

    /// Maps a screen point through `viewport` to world X/Y coordinates on
    /// the plane at view depth `depth`.
    ///
    /// The screen point is normalized against the viewport rect; callers
    /// are expected to have rejected points outside it. A degenerate
    /// (empty) viewport returns `None`.
    #[must_use]
    pub fn screen_to_world(
        &self,
        cam_pos: Vector3,
        viewport: Rect,
        screen: Point,
        depth: f32,
    ) -> Option<(f32, f32)> {
        let vw = viewport.width();
        let vh = viewport.height();
        if vw <= 0.0 || vh <= 0.0 {
            return None;
        }
        #[expect(
            clippy::cast_possible_truncation,
            reason = "normalized screen coordinates fit comfortably in f32"
        )]
        let (nx, ny) = (
            ((screen.x - viewport.x0) / vw) as f32,
            ((screen.y - viewport.y0) / vh) as f32,
        );

        match self.projection {
            Projection::Orthographic { width, height } => Some((
                cam_pos.x + (nx - 0.5) * width,
                cam_pos.y + (ny - 0.5) * height,
            )),
            Projection::Perspective { vertical_fov } => {
                let half_h = (vertical_fov * 0.5).tan() * depth;
                #[expect(
                    clippy::cast_possible_truncation,
                    reason = "viewport aspect ratio fits comfortably in f32"
                )]
                let aspect = (vw / vh) as f32;
                Some((
                    cam_pos.x + (nx - 0.5) * 2.0 * half_h * aspect,
                    cam_pos.y + (ny - 0.5) * 2.0 * half_h,
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-4;

    #[test]
    fn ortho_center_maps_to_camera_position() {
        let cam = Camera::orthographic(200.0, 100.0);
        let viewport = Rect::new(0.0, 0.0, 400.0, 200.0);
        let pos = Vector3::new(10.0, 20.0, 500.0);

        let (wx, wy) = cam
            .screen_to_world(pos, viewport, Point::new(200.0, 100.0), 500.0)
            .unwrap();
        assert!((wx - 10.0).abs() < EPS);
        assert!((wy - 20.0).abs() < EPS);
    }

    #[test]
    fn ortho_corners_span_projection_extent() {
        let cam = Camera::orthographic(200.0, 100.0);
        let viewport = Rect::new(0.0, 0.0, 400.0, 200.0);
        let pos = Vector3::ZERO;

        let (wx, wy) = cam
            .screen_to_world(pos, viewport, Point::new(0.0, 0.0), 1.0)
            .unwrap();
        assert!((wx + 100.0).abs() < EPS);
        assert!((wy + 50.0).abs() < EPS);

        let (wx, wy) = cam
            .screen_to_world(pos, viewport, Point::new(400.0, 200.0), 1.0)
            .unwrap();
        assert!((wx - 100.0).abs() < EPS);
        assert!((wy - 50.0).abs() < EPS);
    }

    #[test]
    fn ortho_mapping_ignores_depth() {
        let cam = Camera::orthographic(100.0, 100.0);
        let viewport = Rect::new(0.0, 0.0, 100.0, 100.0);
        let near = cam
            .screen_to_world(Vector3::ZERO, viewport, Point::new(75.0, 50.0), 1.0)
            .unwrap();
        let far = cam
            .screen_to_world(Vector3::ZERO, viewport, Point::new(75.0, 50.0), 900.0)
            .unwrap();
        assert_eq!(near, far);
    }

    #[test]
    fn perspective_extent_grows_with_depth() {
        let cam = Camera::perspective(core::f32::consts::FRAC_PI_2);
        let viewport = Rect::new(0.0, 0.0, 100.0, 100.0);
        // At fov 90°, half-height equals depth.
        let (_, wy) = cam
            .screen_to_world(Vector3::ZERO, viewport, Point::new(50.0, 100.0), 10.0)
            .unwrap();
        assert!((wy - 10.0).abs() < 1e-3);

        let (_, wy) = cam
            .screen_to_world(Vector3::ZERO, viewport, Point::new(50.0, 100.0), 20.0)
            .unwrap();
        assert!((wy - 20.0).abs() < 1e-3);
    }

    #[test]
    fn depth_range_is_half_open() {
        let cam = Camera::orthographic(1.0, 1.0);
        assert!(cam.depth_in_range(cam.near));
        assert!(cam.depth_in_range(cam.far - 0.001));
        assert!(!cam.depth_in_range(cam.far));
        assert!(!cam.depth_in_range(0.0));
    }

    #[test]
    fn empty_viewport_yields_no_mapping() {
        let cam = Camera::orthographic(1.0, 1.0);
        let viewport = Rect::new(10.0, 10.0, 10.0, 10.0);
        assert!(
            cam.screen_to_world(Vector3::ZERO, viewport, Point::new(10.0, 10.0), 1.0)
                .is_none()
        );
    }
}
