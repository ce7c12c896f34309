// Copyright 2026 the Proscenium Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Hit-test traversal.
//!
//! Maps a screen point through a render task's viewport and camera onto the
//! task's source sub-tree and finds the topmost node under it. Candidates
//! are visited in *reverse* draw order — last-drawn first — so `Overlay`
//! nodes across the whole task are tested before any `Normal` node, and
//! later siblings win ties. Per candidate the test requires: on-stage,
//! effectively visible (invisible subtrees never enter the draw order),
//! sensitive, view depth within the camera's `[near, far)`, and the mapped
//! point inside the node's world rect (size and anchor, widened by scale).
//! A node under a clipping ancestor is only hit if the point also lies
//! within that ancestor's rect.
//!
//! A node that consumes touch swallows hits for its whole subtree: the
//! traversal stops descending past it and reports the consuming node
//! itself, even when no descendant overlaps the point precisely. This is a
//! deliberate early-termination behavior, not a fallback.

use kurbo::Point;

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;

use crate::camera::Camera;
use crate::math::Vector3;
use crate::node::{INVALID, NodeId, NodeStore};
use crate::task::{RenderTaskList, TaskId};

/// Phase of a raw input event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TouchPhase {
    /// Contact began.
    Down,
    /// Contact moved.
    Motion,
    /// Contact ended.
    Up,
    /// Contact was cancelled by the system.
    Interrupted,
}

/// One raw input event, as delivered by the windowing integration once per
/// frame batch. Each event costs one hit test.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TouchEvent {
    /// Screen coordinate of the contact.
    pub screen: Point,
    /// Phase of the contact.
    pub phase: TouchPhase,
}

/// A successful hit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hit {
    /// The topmost node under the point.
    pub node: NodeId,
    /// The point in the node's local coordinates: `(0, 0)` at the rect's
    /// top-left corner, `size` at the bottom-right. A touch-consuming node
    /// reported on behalf of a descendant may yield coordinates outside
    /// that range.
    pub local: Point,
}

/// Hit tests one render task at a screen point.
///
/// Returns `None` when the task is unknown, has input disabled, its source
/// or camera is destroyed or off-stage, or the point misses the viewport or
/// every node.
#[must_use]
pub fn hit_test(
    store: &NodeStore,
    tasks: &RenderTaskList,
    task: TaskId,
    screen: Point,
) -> Option<Hit> {
    let task = tasks.task(task)?;
    if !task.input_enabled() {
        return None;
    }
    let source = task.source();
    if !store.is_alive(source) || !store.is_on_stage(source) {
        return None;
    }
    let camera_node = task.camera_node();
    if !store.is_alive(camera_node) || !store.is_on_stage(camera_node) {
        return None;
    }
    let viewport = task.viewport();
    if !viewport.contains(screen) {
        return None;
    }

    let camera = task.camera();
    let cam_pos = store.world_position(camera_node);
    let order = tasks.draw_order(store, task.id());

    for &idx in order.color.iter().rev() {
        if !store.sensitive_at(idx) {
            continue;
        }
        let depth = Camera::depth_of(cam_pos, store.world_position_at(idx).z);
        if !camera.depth_in_range(depth) {
            continue;
        }
        let Some((wx, wy)) = camera.screen_to_world(cam_pos, viewport, screen, depth) else {
            continue;
        };
        let Some(rect) = world_rect(store, idx) else {
            continue;
        };
        if !rect.contains(wx, wy) {
            continue;
        }
        if !clip_chain_allows(store, idx, source.index(), &camera, cam_pos, viewport, screen) {
            continue;
        }

        // A touch-consuming ancestor swallows the hit; the outermost one
        // (closest to the task's source) wins.
        let hit_idx = outermost_consumer(store, idx, source.index()).unwrap_or(idx);
        let rect = if hit_idx == idx {
            rect
        } else {
            world_rect(store, hit_idx).unwrap_or(rect)
        };
        return Some(Hit {
            node: store.id_at(hit_idx),
            local: rect.to_local(wx, wy),
        });
    }
    None
}

/// Hit tests every input-enabled task, topmost (last-listed) first.
#[must_use]
pub fn hit_test_any(store: &NodeStore, tasks: &RenderTaskList, screen: Point) -> Option<Hit> {
    let ids: alloc::vec::Vec<TaskId> = tasks.iter().map(|t| t.id()).collect();
    for id in ids.into_iter().rev() {
        if let Some(hit) = hit_test(store, tasks, id, screen) {
            return Some(hit);
        }
    }
    None
}

/// A node's world-space bounding rect, axis-aligned, with the scale factors
/// needed to convert back to local coordinates.
#[derive(Clone, Copy, Debug)]
struct WorldRect {
    x0: f32,
    y0: f32,
    x1: f32,
    y1: f32,
    sx: f32,
    sy: f32,
}

impl WorldRect {
    fn contains(&self, wx: f32, wy: f32) -> bool {
        wx >= self.x0 && wx <= self.x1 && wy >= self.y0 && wy <= self.y1
    }

    fn to_local(&self, wx: f32, wy: f32) -> Point {
        Point::new(
            f64::from((wx - self.x0) / self.sx),
            f64::from((wy - self.y0) / self.sy),
        )
    }
}

/// Computes a node's world rect from committed size and anchor, widened by
/// world scale. Nodes without positive area are not hittable.
fn world_rect(store: &NodeStore, idx: u32) -> Option<WorldRect> {
    let size = store.size_at(idx);
    let scale = store.world_scale_at(idx);
    let (sx, sy) = (scale.x.abs(), scale.y.abs());
    let (w, h) = (size.x * sx, size.y * sy);
    if w <= 0.0 || h <= 0.0 {
        return None;
    }
    let anchor = store.anchor_point_at(idx);
    let pos = store.world_position_at(idx);
    let x0 = pos.x - anchor.x * w;
    let y0 = pos.y - anchor.y * h;
    Some(WorldRect {
        x0,
        y0,
        x1: x0 + w,
        y1: y0 + h,
        sx,
        sy,
    })
}

/// Checks every clipping ancestor between `idx` (exclusive) and the task
/// source (inclusive): the mapped point must lie within each clipping
/// ancestor's own rect, evaluated at that ancestor's view depth.
fn clip_chain_allows(
    store: &NodeStore,
    idx: u32,
    source_idx: u32,
    camera: &Camera,
    cam_pos: Vector3,
    viewport: kurbo::Rect,
    screen: Point,
) -> bool {
    let mut cursor = if idx == source_idx {
        INVALID
    } else {
        store.parent_at(idx)
    };
    while cursor != INVALID {
        if store.clips_children_at(cursor) {
            let depth = Camera::depth_of(cam_pos, store.world_position_at(cursor).z);
            let inside = camera
                .screen_to_world(cam_pos, viewport, screen, depth)
                .and_then(|(wx, wy)| world_rect(store, cursor).map(|r| r.contains(wx, wy)))
                .unwrap_or(false);
            if !inside {
                return false;
            }
        }
        if cursor == source_idx {
            break;
        }
        cursor = store.parent_at(cursor);
    }
    true
}

/// Returns the outermost touch-consuming node on the path from `idx` up to
/// the task source, including `idx` itself.
fn outermost_consumer(store: &NodeStore, idx: u32, source_idx: u32) -> Option<u32> {
    let mut consumer = None;
    let mut cursor = idx;
    loop {
        if store.consumes_touch_at(cursor) {
            consumer = Some(cursor);
        }
        if cursor == source_idx {
            break;
        }
        let p = store.parent_at(cursor);
        if p == INVALID {
            break;
        }
        cursor = p;
    }
    consumer
}
