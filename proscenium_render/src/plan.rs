// Copyright 2026 the Proscenium Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Render plan: an ordered sequence of draw items for one task.

use alloc::vec::Vec;

use kurbo::Rect;

use proscenium_core::math::{Color, Quaternion, Vector3};
use proscenium_core::node::{NodeId, NodeStore, TextureId};
use proscenium_core::task::{RenderTaskList, TaskId};

/// A single draw command with resolved world values.
///
/// Items are produced in back-to-front order: `Normal` nodes in traversal
/// order, then `Overlay` nodes in traversal order.
#[derive(Clone, Debug)]
pub struct RenderItem {
    /// The node this item originates from.
    pub node: NodeId,
    /// The texture to draw (grouping nodes have `None`).
    pub texture: Option<TextureId>,
    /// Computed world position.
    pub position: Vector3,
    /// Computed world rotation.
    pub rotation: Quaternion,
    /// Computed world scale.
    pub scale: Vector3,
    /// Node size (committed), in local units.
    pub size: Vector3,
    /// Computed world color, clamped to `[0, 1]` per channel.
    pub color: Color,
    /// Whether descendants are scissored to this node's rect.
    pub clips_children: bool,
}

/// The ordered draw commands for a single render task.
#[derive(Clone, Debug)]
pub struct RenderPlan {
    /// The task this plan was built for.
    pub task: TaskId,
    /// Offscreen target, or `None` for onscreen.
    pub target: Option<TextureId>,
    /// Viewport rectangle in screen coordinates.
    pub viewport: Rect,
    /// Clear color, if clearing is enabled for the task.
    pub clear_color: Option<Color>,
    /// Color-pass items, back to front.
    pub items: Vec<RenderItem>,
    /// Stencil-pass items, kept out of the color pass.
    pub stencil_items: Vec<RenderItem>,
}

impl RenderPlan {
    /// Clears the item lists for reuse.
    pub fn clear(&mut self) {
        self.items.clear();
        self.stencil_items.clear();
    }
}

/// Builds the render plan for one task.
///
/// Returns `None` for an unknown task handle. A task with a destroyed
/// source yields a plan with no items.
#[must_use]
pub fn build_plan(store: &NodeStore, tasks: &RenderTaskList, id: TaskId) -> Option<RenderPlan> {
    let task = tasks.task(id)?;
    let order = tasks.draw_order(store, id);

    let mut plan = RenderPlan {
        task: id,
        target: task.target(),
        viewport: task.viewport(),
        clear_color: task.clear_enabled().then(|| task.clear_color()),
        items: Vec::with_capacity(order.color.len()),
        stencil_items: Vec::with_capacity(order.stencil.len()),
    };
    for &idx in &order.color {
        plan.items.push(item_at(store, idx));
    }
    for &idx in &order.stencil {
        plan.stencil_items.push(item_at(store, idx));
    }
    Some(plan)
}

/// Builds plans for the tasks a frame's schedule decided to draw, in draw
/// order.
#[must_use]
pub fn build_plans(store: &NodeStore, tasks: &RenderTaskList, draws: &[TaskId]) -> Vec<RenderPlan> {
    draws
        .iter()
        .filter_map(|&id| build_plan(store, tasks, id))
        .collect()
}

fn item_at(store: &NodeStore, idx: u32) -> RenderItem {
    RenderItem {
        node: store.id_at(idx),
        texture: store.texture_at(idx),
        position: store.world_position_at(idx),
        rotation: store.world_rotation_at(idx),
        scale: store.world_scale_at(idx),
        size: store.size_at(idx),
        color: store.world_color_at(idx),
        clips_children: store.clips_children_at(idx),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proscenium_core::camera::Camera;
    use proscenium_core::node::DrawMode;
    use proscenium_core::stage::Stage;
    use proscenium_core::task::RenderTask;

    fn scene() -> (Stage, TaskId) {
        let mut stage = Stage::new();
        let root = stage.root();
        let camera = stage.create_node();
        stage.add_child(root, camera).unwrap();
        let task = stage.add_render_task(RenderTask::new(
            root,
            camera,
            Camera::orthographic(100.0, 100.0),
            Rect::new(0.0, 0.0, 100.0, 100.0),
        ));
        (stage, task)
    }

    #[test]
    fn plan_carries_world_values_and_content() {
        let (mut stage, task) = scene();
        let root = stage.root();
        let node = stage.create_node();
        stage.add_child(root, node).unwrap();
        stage.set_position(node, Vector3::new(5.0, 6.0, 0.0));
        stage.set_size(node, Vector3::new(10.0, 10.0, 0.0));
        stage.set_color(node, Color::new(1.0, 0.0, 0.0, 0.5));
        stage.set_texture(node, Some(TextureId(4)));
        stage.update(0.016);

        let plan = build_plan(stage.store(), stage.render_tasks(), task).unwrap();
        let item = plan.items.iter().find(|i| i.node == node).unwrap();
        assert_eq!(item.position, Vector3::new(5.0, 6.0, 0.0));
        assert_eq!(item.size, Vector3::new(10.0, 10.0, 0.0));
        assert_eq!(item.color, Color::new(1.0, 0.0, 0.0, 0.5));
        assert_eq!(item.texture, Some(TextureId(4)));
    }

    #[test]
    fn overlay_items_come_after_normal_items() {
        let (mut stage, task) = scene();
        let root = stage.root();
        let overlay = stage.create_node();
        let normal = stage.create_node();
        stage.add_child(root, overlay).unwrap();
        stage.add_child(root, normal).unwrap();
        stage.set_draw_mode(overlay, DrawMode::Overlay);
        stage.update(0.016);

        let plan = build_plan(stage.store(), stage.render_tasks(), task).unwrap();
        let oi = plan.items.iter().position(|i| i.node == overlay).unwrap();
        let ni = plan.items.iter().position(|i| i.node == normal).unwrap();
        assert!(ni < oi, "overlay draws after normal");
    }

    #[test]
    fn stencil_items_stay_out_of_the_color_pass() {
        let (mut stage, task) = scene();
        let root = stage.root();
        let mask = stage.create_node();
        stage.add_child(root, mask).unwrap();
        stage.set_draw_mode(mask, DrawMode::Stencil);
        stage.update(0.016);

        let plan = build_plan(stage.store(), stage.render_tasks(), task).unwrap();
        assert!(plan.items.iter().all(|i| i.node != mask));
        assert_eq!(plan.stencil_items.len(), 1);
        assert_eq!(plan.stencil_items[0].node, mask);
    }

    #[test]
    fn clear_color_present_only_when_enabled() {
        let (mut stage, task) = scene();
        stage.update(0.016);

        let plan = build_plan(stage.store(), stage.render_tasks(), task).unwrap();
        assert_eq!(plan.clear_color, None);

        let t = stage.render_task_mut(task).unwrap();
        t.set_clear_enabled(true);
        t.set_clear_color(Color::new(0.0, 0.0, 0.2, 1.0));
        let plan = build_plan(stage.store(), stage.render_tasks(), task).unwrap();
        assert_eq!(plan.clear_color, Some(Color::new(0.0, 0.0, 0.2, 1.0)));
    }

    #[test]
    fn removed_task_yields_no_plan() {
        let (mut stage, task) = scene();
        stage.remove_render_task(task);
        assert!(build_plan(stage.store(), stage.render_tasks(), task).is_none());
    }

    #[test]
    fn build_plans_follows_schedule_order() {
        let (mut stage, first) = scene();
        let root = stage.root();
        let camera = stage.render_task(first).unwrap().camera_node();
        let second = stage.add_render_task(RenderTask::new(
            root,
            camera,
            Camera::orthographic(50.0, 50.0),
            Rect::new(0.0, 0.0, 50.0, 50.0),
        ));

        let out = stage.update(0.016);
        let plans = build_plans(stage.store(), stage.render_tasks(), &out.draws);
        assert_eq!(plans.len(), 2);
        assert_eq!(plans[0].task, first);
        assert_eq!(plans[1].task, second);
    }
}
