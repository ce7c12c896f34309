// Copyright 2026 the Proscenium Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The per-frame update pass.
//!
//! [`Stage`] owns the node store, the constraint set, the render-task list,
//! and the resource tracker, and drives the strictly ordered frame pass:
//!
//! 1. **Commit** — for every dirty property, `current ← base`.
//! 2. **Constraints** — evaluated in declaration order against committed
//!    values; outputs written directly to `current`.
//! 3. **Composition** — world position/rotation/scale/color/visibility
//!    computed root-to-leaf from committed locals and parent world values.
//! 4. **Scheduling** — the render-task list decides which tasks draw and
//!    which one-shot completions fire.
//!
//! The pass runs on a single logical thread to completion; rendering reads
//! the committed snapshot afterwards and never mutates it (see
//! [`backend`](crate::backend)).
//!
//! # Notifications
//!
//! On-stage/off-stage transitions dispatch synchronously at topology-change
//! time, parent-before-child on attach and child-before-parent on detach.
//! The per-property set hook fires synchronously on every `base` write,
//! whether or not the value changed. Everything the pass itself produces —
//! changed nodes, lifecycle lists, constraint completions, draws, finished
//! tasks — is returned in [`FrameOutput`] for the embedder to consume after
//! the pass.

use alloc::vec::Vec;

use kurbo::Point;

use crate::backend::{FenceProvider, NullFences};
use crate::constraint::{Constraint, ConstraintError, ConstraintId, ConstraintSet};
use crate::dirty;
use crate::hit::{self, Hit, TouchEvent};
use crate::math::{Color, Quaternion, Vector3};
use crate::node::{
    ColorMode, DrawMode, NodeId, NodeStore, PositionInheritanceMode, TextureId, TreeError,
};
use crate::property::{PropertyIndex, PropertyValue};
use crate::resource::ResourceTracker;
use crate::signal::Signal;
use crate::task::{RenderTask, RenderTaskList, TaskId};
use crate::trace::{CommitEvent, FrameBeginEvent, FrameEndEvent, Tracer};

/// Payload of the per-property set hook.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PropertyWrite {
    /// The node whose property was written.
    pub node: NodeId,
    /// Which property was written.
    pub property: PropertyIndex,
}

/// The set of changes produced by a single [`Stage::update`] call.
///
/// Node fields contain raw slot indices in parent-before-child order, for
/// use with the store's `*_at()` accessors.
#[derive(Clone, Debug, Default)]
pub struct FrameEvents {
    /// Nodes whose world transform was recomputed.
    pub transforms: Vec<u32>,
    /// Nodes whose world color was recomputed.
    pub colors: Vec<u32>,
    /// Nodes whose content group changed (sensitivity, draw mode, clip,
    /// texture).
    pub content: Vec<u32>,
    /// Nodes that transitioned from visible to effectively hidden.
    pub hidden: Vec<u32>,
    /// Nodes that transitioned from effectively hidden to visible.
    pub unhidden: Vec<u32>,
    /// Nodes created since the last update.
    pub added: Vec<u32>,
    /// Nodes destroyed since the last update (slots already recycled).
    pub removed: Vec<u32>,
    /// Whether the tree topology changed (traversal order was rebuilt).
    pub topology_changed: bool,
    /// Constraints whose apply weight first reached full this frame.
    pub constraints_completed: Vec<ConstraintId>,
}

/// Everything one frame of [`Stage::update`] produced.
#[derive(Clone, Debug, Default)]
pub struct FrameOutput {
    /// Property, lifecycle, and constraint changes.
    pub events: FrameEvents,
    /// Tasks that draw this frame, in list order.
    pub draws: Vec<TaskId>,
    /// One-shot task completions, in list order.
    pub finished: Vec<TaskId>,
}

/// The scene: node tree, constraints, render tasks, and the update pass.
#[derive(Debug)]
pub struct Stage {
    store: NodeStore,
    constraints: ConstraintSet,
    tasks: RenderTaskList,
    resources: ResourceTracker,
    frame: u64,
    staged_signal: Signal<NodeId>,
    unstaged_signal: Signal<NodeId>,
    property_signal: Signal<PropertyWrite>,
    staged_scratch: Vec<NodeId>,
    unstaged_scratch: Vec<NodeId>,
}

impl Default for Stage {
    fn default() -> Self {
        Self::new()
    }
}

impl Stage {
    /// Creates a stage containing only the root node.
    #[must_use]
    pub fn new() -> Self {
        let mut store = NodeStore::new();
        // The root's own staging event predates any observer.
        let (mut staged, mut unstaged) = (Vec::new(), Vec::new());
        store.take_staging_events(&mut staged, &mut unstaged);

        Self {
            store,
            constraints: ConstraintSet::new(),
            tasks: RenderTaskList::new(),
            resources: ResourceTracker::new(),
            frame: 0,
            staged_signal: Signal::new(),
            unstaged_signal: Signal::new(),
            property_signal: Signal::new(),
            staged_scratch: Vec::new(),
            unstaged_scratch: Vec::new(),
        }
    }

    /// Returns the root node.
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.store.root()
    }

    /// Read access to the node store (getters, world values, traversal).
    #[must_use]
    pub fn store(&self) -> &NodeStore {
        &self.store
    }

    /// The number of completed update passes.
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frame
    }

    // -- Node lifecycle and topology (staging notifications dispatch
    //    synchronously from these) --

    /// Creates a detached node.
    pub fn create_node(&mut self) -> NodeId {
        self.store.create_node()
    }

    /// Destroys a node and its subtree.
    ///
    /// # Errors
    ///
    /// [`TreeError::Root`] if `id` is the root.
    pub fn destroy_node(&mut self, id: NodeId) -> Result<(), TreeError> {
        self.store.destroy_node(id)?;
        self.dispatch_staging();
        Ok(())
    }

    /// Adds (or moves) `child` under `parent`. See
    /// [`NodeStore::add_child`].
    ///
    /// # Errors
    ///
    /// Propagates the store's tree-shape errors; no state changes on error.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        self.store.add_child(parent, child)?;
        self.dispatch_staging();
        Ok(())
    }

    /// Removes `child` from `parent`. See [`NodeStore::remove_child`].
    ///
    /// # Errors
    ///
    /// Propagates the store's tree-shape errors.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        self.store.remove_child(parent, child)?;
        self.dispatch_staging();
        Ok(())
    }

    /// Inserts `child` before `sibling`. See [`NodeStore::insert_before`].
    ///
    /// # Errors
    ///
    /// Propagates the store's tree-shape errors.
    pub fn insert_before(&mut self, child: NodeId, sibling: NodeId) -> Result<(), TreeError> {
        self.store.insert_before(child, sibling)?;
        self.dispatch_staging();
        Ok(())
    }

    /// Raises a node above its siblings. See [`NodeStore::raise_to_top`].
    ///
    /// # Errors
    ///
    /// Propagates the store's tree-shape errors.
    pub fn raise_to_top(&mut self, id: NodeId) -> Result<(), TreeError> {
        self.store.raise_to_top(id)
    }

    /// Lowers a node below its siblings. See
    /// [`NodeStore::lower_to_bottom`].
    ///
    /// # Errors
    ///
    /// Propagates the store's tree-shape errors.
    pub fn lower_to_bottom(&mut self, id: NodeId) -> Result<(), TreeError> {
        self.store.lower_to_bottom(id)
    }

    // -- Property setters (fire the set hook synchronously) --

    /// Sets the pending parent-origin.
    pub fn set_parent_origin(&mut self, id: NodeId, v: Vector3) {
        self.store.set_parent_origin(id, v);
        self.notify_write(id, PropertyIndex::ParentOrigin);
    }

    /// Sets the pending anchor point.
    pub fn set_anchor_point(&mut self, id: NodeId, v: Vector3) {
        self.store.set_anchor_point(id, v);
        self.notify_write(id, PropertyIndex::AnchorPoint);
    }

    /// Sets the pending size.
    pub fn set_size(&mut self, id: NodeId, v: Vector3) {
        self.store.set_size(id, v);
        self.notify_write(id, PropertyIndex::Size);
    }

    /// Sets the pending position.
    pub fn set_position(&mut self, id: NodeId, v: Vector3) {
        self.store.set_position(id, v);
        self.notify_write(id, PropertyIndex::Position);
    }

    /// Sets the pending rotation.
    pub fn set_rotation(&mut self, id: NodeId, q: Quaternion) {
        self.store.set_rotation(id, q);
        self.notify_write(id, PropertyIndex::Rotation);
    }

    /// Sets the pending scale.
    pub fn set_scale(&mut self, id: NodeId, v: Vector3) {
        self.store.set_scale(id, v);
        self.notify_write(id, PropertyIndex::Scale);
    }

    /// Sets the pending color.
    pub fn set_color(&mut self, id: NodeId, c: Color) {
        self.store.set_color(id, c);
        self.notify_write(id, PropertyIndex::Color);
    }

    /// Sets the pending visibility flag.
    pub fn set_visible(&mut self, id: NodeId, v: bool) {
        self.store.set_visible(id, v);
        self.notify_write(id, PropertyIndex::Visible);
    }

    /// Sets the pending sensitivity flag.
    pub fn set_sensitive(&mut self, id: NodeId, v: bool) {
        self.store.set_sensitive(id, v);
        self.notify_write(id, PropertyIndex::Sensitive);
    }

    /// Sets the pending draw mode.
    pub fn set_draw_mode(&mut self, id: NodeId, mode: DrawMode) {
        self.store.set_draw_mode(id, mode);
        self.notify_write(id, PropertyIndex::DrawMode);
    }

    /// Sets the pending color mode.
    pub fn set_color_mode(&mut self, id: NodeId, mode: ColorMode) {
        self.store.set_color_mode(id, mode);
        self.notify_write(id, PropertyIndex::ColorMode);
    }

    /// Sets the pending position-inheritance mode.
    pub fn set_position_inheritance(&mut self, id: NodeId, mode: PositionInheritanceMode) {
        self.store.set_position_inheritance(id, mode);
        self.notify_write(id, PropertyIndex::PositionInheritance);
    }

    /// Sets whether the node inherits its parent's world rotation.
    pub fn set_inherit_rotation(&mut self, id: NodeId, inherit: bool) {
        self.store.set_inherit_rotation(id, inherit);
        self.notify_write(id, PropertyIndex::InheritRotation);
    }

    /// Sets whether the node inherits its parent's world scale.
    pub fn set_inherit_scale(&mut self, id: NodeId, inherit: bool) {
        self.store.set_inherit_scale(id, inherit);
        self.notify_write(id, PropertyIndex::InheritScale);
    }

    /// Writes a pending property by index.
    ///
    /// # Errors
    ///
    /// [`TreeError::TypeMismatch`] if the value's type does not match; no
    /// write and no hook in that case.
    pub fn set_property(
        &mut self,
        id: NodeId,
        index: PropertyIndex,
        value: PropertyValue,
    ) -> Result<(), TreeError> {
        self.store.set_property(id, index, value)?;
        self.notify_write(id, index);
        Ok(())
    }

    /// Sets or clears the node's name.
    pub fn set_name(&mut self, id: NodeId, name: Option<alloc::string::String>) {
        self.store.set_name(id, name);
    }

    /// Sets or clears the node's texture content.
    pub fn set_texture(&mut self, id: NodeId, texture: Option<TextureId>) {
        self.store.set_texture(id, texture);
    }

    /// Sets whether descendants are clipped to the node's rect.
    pub fn set_clips_children(&mut self, id: NodeId, clips: bool) {
        self.store.set_clips_children(id, clips);
    }

    /// Sets whether the node consumes touch for its subtree.
    pub fn set_consumes_touch(&mut self, id: NodeId, consumes: bool) {
        self.store.set_consumes_touch(id, consumes);
    }

    // -- Signals --

    /// The on-stage signal; fires synchronously when a node becomes
    /// reachable from the root, parent before child.
    pub fn on_staged(&mut self) -> &mut Signal<NodeId> {
        &mut self.staged_signal
    }

    /// The off-stage signal; fires synchronously when a node stops being
    /// reachable from the root, child before parent. Handles from
    /// destroy-driven transitions are already stale.
    pub fn on_unstaged(&mut self) -> &mut Signal<NodeId> {
        &mut self.unstaged_signal
    }

    /// The per-property set hook; fires synchronously on every `base`
    /// write, whether or not the value changed.
    pub fn on_property_set(&mut self) -> &mut Signal<PropertyWrite> {
        &mut self.property_signal
    }

    // -- Constraints --

    /// Registers a constraint and returns its handle.
    pub fn apply_constraint(&mut self, constraint: Constraint) -> ConstraintId {
        self.constraints.apply(constraint)
    }

    /// Removes one constraint by handle. Removing an already-removed
    /// handle is a no-op.
    ///
    /// # Errors
    ///
    /// [`ConstraintError::Unknown`] if the handle was never applied.
    pub fn remove_constraint(&mut self, id: ConstraintId) -> Result<(), ConstraintError> {
        self.constraints.remove(id)
    }

    /// Removes every constraint targeting `node`; other nodes' constraints
    /// are untouched.
    pub fn remove_constraints(&mut self, node: NodeId) {
        self.constraints.remove_for_target(node);
    }

    // -- Render tasks and resources --

    /// Appends a render task; list position is draw order.
    pub fn add_render_task(&mut self, task: RenderTask) -> TaskId {
        self.tasks.add_task(task)
    }

    /// Removes a render task. Unknown handles are a no-op.
    pub fn remove_render_task(&mut self, id: TaskId) {
        self.tasks.remove_task(id);
    }

    /// Returns a render task by handle.
    #[must_use]
    pub fn render_task(&self, id: TaskId) -> Option<&RenderTask> {
        self.tasks.task(id)
    }

    /// Returns a render task by handle, mutably (for reconfiguration and
    /// one-shot re-arming).
    pub fn render_task_mut(&mut self, id: TaskId) -> Option<&mut RenderTask> {
        self.tasks.task_mut(id)
    }

    /// Read access to the task list (draw ordering, iteration).
    #[must_use]
    pub fn render_tasks(&self) -> &RenderTaskList {
        &self.tasks
    }

    /// Read access to the resource readiness tracker.
    #[must_use]
    pub fn resources(&self) -> &ResourceTracker {
        &self.resources
    }

    /// Write access to the resource readiness tracker (loader
    /// notifications).
    pub fn resources_mut(&mut self) -> &mut ResourceTracker {
        &mut self.resources
    }

    // -- Hit testing --

    /// Hit tests one render task at a screen point.
    #[must_use]
    pub fn hit_test(&self, task: TaskId, screen: Point) -> Option<Hit> {
        hit::hit_test(&self.store, &self.tasks, task, screen)
    }

    /// Hit tests all input-enabled tasks, topmost (last-listed) first.
    #[must_use]
    pub fn hit_test_any(&self, screen: Point) -> Option<Hit> {
        hit::hit_test_any(&self.store, &self.tasks, screen)
    }

    /// Resolves one raw input event to the node under it, if any.
    ///
    /// The phase does not affect targeting; gesture state lives with the
    /// windowing integration that delivers the events.
    #[must_use]
    pub fn process_touch(&self, event: &TouchEvent) -> Option<Hit> {
        self.hit_test_any(event.screen)
    }

    // -- The update pass --

    /// Runs one frame of the update pass, advancing constraint clocks by
    /// `dt_seconds`. Fences signal immediately (no GPU sync); use
    /// [`update_with`](Self::update_with) to supply a real provider.
    pub fn update(&mut self, dt_seconds: f32) -> FrameOutput {
        let mut fences = NullFences::new();
        self.update_with(dt_seconds, &mut fences, &mut Tracer::none())
    }

    /// Runs one frame of the update pass with an explicit fence provider
    /// and tracer.
    pub fn update_with(
        &mut self,
        dt_seconds: f32,
        fences: &mut dyn FenceProvider,
        tracer: &mut Tracer<'_>,
    ) -> FrameOutput {
        let frame = self.frame;
        tracer.frame_begin(&FrameBeginEvent { frame });

        let mut events = FrameEvents::default();

        // Rebuild traversal order if topology changed.
        if self.store.traversal_dirty {
            self.store.rebuild_traversal_order();
            events.topology_changed = true;
        }

        let slots = self.store.slot_count() as usize;
        let mut needs_transform = alloc::vec![false; slots];
        let mut needs_color = alloc::vec![false; slots];
        let mut needs_visible = alloc::vec![false; slots];

        // Phase 1: commit `current ← base` for every dirty property.
        let drained: Vec<u32> = self
            .store
            .dirty
            .drain(dirty::TRANSFORM)
            .affected()
            .deterministic()
            .run()
            .collect();
        for &idx in &drained {
            self.store.commit_transform_at(idx);
            needs_transform[idx as usize] = true;
        }
        let transform_count = drained.len();

        let drained: Vec<u32> = self
            .store
            .dirty
            .drain(dirty::COLOR)
            .affected()
            .deterministic()
            .run()
            .collect();
        for &idx in &drained {
            self.store.commit_color_at(idx);
            needs_color[idx as usize] = true;
        }
        let color_count = drained.len();

        let drained: Vec<u32> = self
            .store
            .dirty
            .drain(dirty::VISIBILITY)
            .affected()
            .deterministic()
            .run()
            .collect();
        for &idx in &drained {
            self.store.commit_visibility_at(idx);
            needs_visible[idx as usize] = true;
        }
        let visibility_count = drained.len();

        let drained: Vec<u32> = self
            .store
            .dirty
            .drain(dirty::CONTENT)
            .deterministic()
            .run()
            .collect();
        for &idx in &drained {
            self.store.commit_content_at(idx);
        }
        events.content = drained;

        // Drain TOPOLOGY (just consume; handled via the traversal rebuild).
        let _: Vec<u32> = self
            .store
            .dirty
            .drain(dirty::TOPOLOGY)
            .deterministic()
            .run()
            .collect();

        #[expect(
            clippy::cast_possible_truncation,
            reason = "per-frame change counts fit in u32"
        )]
        tracer.commit(&CommitEvent {
            frame,
            transforms: transform_count as u32,
            colors: color_count as u32,
            visibility: visibility_count as u32,
            content: events.content.len() as u32,
        });

        // Phase 2: constraints, in declaration order, against committed
        // values. Outputs land in `current` and re-mark their channels, so
        // a second drain flags the affected nodes (and their descendants)
        // for composition without re-committing them.
        self.constraints
            .evaluate(&mut self.store, dt_seconds, &mut events.constraints_completed);
        for id in &events.constraints_completed {
            tracer.constraint_completed(&crate::trace::ConstraintCompletedEvent {
                frame,
                constraint: *id,
            });
        }

        for idx in self
            .store
            .dirty
            .drain(dirty::TRANSFORM)
            .affected()
            .deterministic()
            .run()
        {
            needs_transform[idx as usize] = true;
        }
        for idx in self
            .store
            .dirty
            .drain(dirty::COLOR)
            .affected()
            .deterministic()
            .run()
        {
            needs_color[idx as usize] = true;
        }
        for idx in self
            .store
            .dirty
            .drain(dirty::VISIBILITY)
            .affected()
            .deterministic()
            .run()
        {
            needs_visible[idx as usize] = true;
        }
        for idx in self.store.dirty.drain(dirty::CONTENT).deterministic().run() {
            events.content.push(idx);
        }

        // Phase 3: composition, root-to-leaf over the cached traversal
        // order so every parent is composed before its children.
        for i in 0..self.store.traversal_order.len() {
            let idx = self.store.traversal_order[i];
            let recompute = needs_transform[idx as usize]
                || needs_color[idx as usize]
                || needs_visible[idx as usize];
            if !recompute {
                continue;
            }
            let was_visible = self.store.world_visible[idx as usize];
            self.store.compose_world_at(idx);
            if needs_transform[idx as usize] {
                events.transforms.push(idx);
            }
            if needs_color[idx as usize] {
                events.colors.push(idx);
            }
            let now_visible = self.store.world_visible[idx as usize];
            if now_visible != was_visible {
                if now_visible {
                    events.unhidden.push(idx);
                } else {
                    events.hidden.push(idx);
                }
            }
        }

        #[cfg(feature = "trace-rich")]
        {
            use crate::trace::{NodeChange, NodeField};
            let mut changes = Vec::new();
            for &idx in &events.transforms {
                changes.push(NodeChange {
                    node: idx,
                    field: NodeField::Transform,
                });
            }
            for &idx in &events.colors {
                changes.push(NodeChange {
                    node: idx,
                    field: NodeField::Color,
                });
            }
            for &idx in events.hidden.iter().chain(&events.unhidden) {
                changes.push(NodeChange {
                    node: idx,
                    field: NodeField::Visibility,
                });
            }
            tracer.node_changes(frame, &changes);
        }

        // Move lifecycle lists.
        core::mem::swap(&mut self.store.pending_added, &mut events.added);
        core::mem::swap(&mut self.store.pending_removed, &mut events.removed);

        // Phase 4: render-task scheduling.
        let sched = self
            .tasks
            .schedule(frame, &self.store, &self.resources, fences);
        for id in &sched.draws {
            tracer.task_draw(&crate::trace::TaskDrawEvent { frame, task: *id });
        }
        for id in &sched.finished {
            tracer.task_finished(&crate::trace::TaskFinishedEvent { frame, task: *id });
        }

        #[expect(
            clippy::cast_possible_truncation,
            reason = "per-frame task counts fit in u32"
        )]
        tracer.frame_end(&FrameEndEvent {
            frame,
            draws: sched.draws.len() as u32,
            finished: sched.finished.len() as u32,
        });

        self.frame += 1;
        FrameOutput {
            events,
            draws: sched.draws,
            finished: sched.finished,
        }
    }

    // -- Internal --

    fn notify_write(&mut self, node: NodeId, property: PropertyIndex) {
        self.property_signal.emit(&PropertyWrite { node, property });
    }

    /// Dispatches staging transitions recorded by the last topology op.
    fn dispatch_staging(&mut self) {
        self.store
            .take_staging_events(&mut self.staged_scratch, &mut self.unstaged_scratch);
        // Drain local buffers so observer re-entry cannot observe them.
        let staged: Vec<NodeId> = self.staged_scratch.drain(..).collect();
        let unstaged: Vec<NodeId> = self.unstaged_scratch.drain(..).collect();
        for id in staged {
            self.staged_signal.emit(&id);
        }
        for id in unstaged {
            self.unstaged_signal.emit(&id);
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::rc::Rc;
    use alloc::vec;
    use core::cell::RefCell;

    use super::*;

    const EPS: f32 = 1e-4;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < EPS
    }

    fn vec_close(a: Vector3, b: Vector3) -> bool {
        close(a.x, b.x) && close(a.y, b.y) && close(a.z, b.z)
    }

    // -- Double buffering --

    #[test]
    fn current_is_stable_until_update_commits() {
        let mut stage = Stage::new();
        let root = stage.root();
        let node = stage.create_node();
        stage.add_child(root, node).unwrap();
        stage.update(0.016);

        stage.set_position(node, Vector3::new(1.0, 0.0, 0.0));
        stage.set_position(node, Vector3::new(2.0, 0.0, 0.0));
        stage.set_position(node, Vector3::new(3.0, 0.0, 0.0));

        // Base reflects the last write immediately; current does not move.
        assert_eq!(stage.store().position(node), Vector3::new(3.0, 0.0, 0.0));
        assert_eq!(stage.store().current_position(node), Vector3::ZERO);

        stage.update(0.016);
        assert_eq!(
            stage.store().current_position(node),
            Vector3::new(3.0, 0.0, 0.0),
            "commit observes only the last write before the frame"
        );
    }

    #[test]
    fn base_getter_returns_committed_value_when_untouched() {
        let mut stage = Stage::new();
        let node = stage.create_node();
        stage.set_position(node, Vector3::new(5.0, 0.0, 0.0));
        stage.update(0.016);
        assert_eq!(stage.store().position(node), Vector3::new(5.0, 0.0, 0.0));
    }

    // -- Inheritance modes --

    fn parent_child_at(
        stage: &mut Stage,
        parent_pos: Vector3,
        child_pos: Vector3,
    ) -> (NodeId, NodeId) {
        let root = stage.root();
        let parent = stage.create_node();
        let child = stage.create_node();
        stage.add_child(root, parent).unwrap();
        stage.add_child(parent, child).unwrap();
        stage.set_position(parent, parent_pos);
        stage.set_position(child, child_pos);
        (parent, child)
    }

    #[test]
    fn position_inheritance_modes_compose_world_positions() {
        let p = Vector3::new(10.0, 20.0, 0.0);
        let c = Vector3::new(1.0, 2.0, 0.0);

        // Default (Inherit): world = P + C.
        let mut stage = Stage::new();
        let (_, child) = parent_child_at(&mut stage, p, c);
        stage.update(0.016);
        assert!(vec_close(
            stage.store().world_position(child),
            Vector3::new(11.0, 22.0, 0.0)
        ));

        // UseParentPlusLocal: identical result.
        let mut stage = Stage::new();
        let (_, child) = parent_child_at(&mut stage, p, c);
        stage.set_position_inheritance(child, PositionInheritanceMode::UseParentPlusLocal);
        stage.update(0.016);
        assert!(vec_close(
            stage.store().world_position(child),
            Vector3::new(11.0, 22.0, 0.0)
        ));

        // UseParent: child world = P.
        let mut stage = Stage::new();
        let (_, child) = parent_child_at(&mut stage, p, c);
        stage.set_position_inheritance(child, PositionInheritanceMode::UseParent);
        stage.update(0.016);
        assert!(vec_close(stage.store().world_position(child), p));

        // DontInherit: child world = C.
        let mut stage = Stage::new();
        let (_, child) = parent_child_at(&mut stage, p, c);
        stage.set_position_inheritance(child, PositionInheritanceMode::DontInherit);
        stage.update(0.016);
        assert!(vec_close(stage.store().world_position(child), c));
    }

    #[test]
    fn inherit_flags_gate_rotation_and_scale() {
        let mut stage = Stage::new();
        let root = stage.root();
        let parent = stage.create_node();
        let child = stage.create_node();
        stage.add_child(root, parent).unwrap();
        stage.add_child(parent, child).unwrap();

        stage.set_scale(parent, Vector3::new(2.0, 2.0, 2.0));
        stage.set_scale(child, Vector3::new(3.0, 3.0, 3.0));
        stage.update(0.016);
        assert!(vec_close(
            stage.store().world_scale(child),
            Vector3::new(6.0, 6.0, 6.0)
        ));

        stage.set_inherit_scale(child, false);
        stage.update(0.016);
        assert!(vec_close(
            stage.store().world_scale(child),
            Vector3::new(3.0, 3.0, 3.0)
        ));

        let quarter = Quaternion::from_axis_angle(
            Vector3::new(0.0, 0.0, 1.0),
            core::f32::consts::FRAC_PI_2,
        );
        stage.set_rotation(parent, quarter);
        stage.set_inherit_rotation(child, false);
        stage.update(0.016);
        assert_eq!(stage.store().world_rotation(child), Quaternion::IDENTITY);
    }

    // -- Color composition --

    #[test]
    fn color_modes_compose_world_colors() {
        let mut stage = Stage::new();
        let root = stage.root();
        let parent = stage.create_node();
        let child = stage.create_node();
        stage.add_child(root, parent).unwrap();
        stage.add_child(parent, child).unwrap();

        stage.set_color(parent, Color::new(1.0, 0.5, 0.0, 0.8));
        stage.set_color(child, Color::new(0.5, 0.6, 0.5, 1.0));
        stage.update(0.016);

        // Default: alpha multiplied, RGB untouched.
        assert_eq!(
            stage.store().world_color(child),
            Color::new(0.5, 0.6, 0.5, 0.8)
        );

        stage.set_color_mode(child, ColorMode::UseParentColor);
        stage.update(0.016);
        assert_eq!(
            stage.store().world_color(child),
            stage.store().world_color(parent)
        );

        stage.set_color_mode(child, ColorMode::UseOwnColor);
        stage.update(0.016);
        assert_eq!(
            stage.store().world_color(child),
            Color::new(0.5, 0.6, 0.5, 1.0)
        );
    }

    #[test]
    fn local_color_is_unclamped_world_color_saturates() {
        let mut stage = Stage::new();
        let root = stage.root();
        let node = stage.create_node();
        stage.add_child(root, node).unwrap();
        stage.set_color_mode(node, ColorMode::UseOwnColor);

        stage.set_color(node, Color::new(1.5, 2.0, -0.5, 1.0));
        stage.update(0.016);

        assert_eq!(
            stage.store().current_color(node),
            Color::new(1.5, 2.0, -0.5, 1.0),
            "local color keeps out-of-range channels"
        );
        assert_eq!(
            stage.store().world_color(node),
            Color::new(1.0, 1.0, 0.0, 1.0),
            "world color clamps per channel"
        );
    }

    // -- Visibility --

    #[test]
    fn hiding_a_parent_hides_the_subtree() {
        let mut stage = Stage::new();
        let root = stage.root();
        let parent = stage.create_node();
        let child = stage.create_node();
        stage.add_child(root, parent).unwrap();
        stage.add_child(parent, child).unwrap();
        stage.update(0.016);

        stage.set_visible(parent, false);
        let out = stage.update(0.016);
        assert!(!stage.store().world_visible(parent));
        assert!(!stage.store().world_visible(child));
        assert!(out.events.hidden.contains(&parent.index()));
        assert!(out.events.hidden.contains(&child.index()));

        stage.set_visible(parent, true);
        let out = stage.update(0.016);
        assert!(stage.store().world_visible(child));
        assert!(out.events.unhidden.contains(&child.index()));
    }

    // -- Constraints --

    #[test]
    fn constraint_ramp_is_linear_and_completes_once() {
        let mut stage = Stage::new();
        let root = stage.root();
        let node = stage.create_node();
        stage.add_child(root, node).unwrap();
        stage.update(1.0);

        let id = stage.apply_constraint(
            Constraint::new(node, PropertyIndex::Position, |_| {
                PropertyValue::Vector3(Vector3::new(10.0, 0.0, 0.0))
            })
            .with_time_window(2.0, 5.0),
        );

        let mut completions = Vec::new();
        let mut progress = Vec::new();
        // Evaluation i sees elapsed = i seconds (1s steps, clock advances
        // after each evaluation).
        for _ in 0..9 {
            let out = stage.update(1.0);
            progress.push(stage.store().current_position(node).x / 10.0);
            completions.extend(out.events.constraints_completed.clone());
        }

        // elapsed 0,1,2 → 0%; 3 → 20%; …; 7,8 → 100%.
        assert!(close(progress[0], 0.0));
        assert!(close(progress[1], 0.0));
        assert!(close(progress[2], 0.0), "exactly 0% at elapsed == delay");
        assert!(close(progress[3], 0.2));
        assert!(close(progress[4], 0.4));
        assert!(close(progress[5], 0.6));
        assert!(close(progress[6], 0.8));
        assert!(close(progress[7], 1.0), "clamped at 100%");
        assert!(close(progress[8], 1.0));

        assert_eq!(
            completions,
            vec![id],
            "completion fires exactly once, on the first full-weight frame"
        );
    }

    #[test]
    fn constraint_reads_source_current_values() {
        let mut stage = Stage::new();
        let root = stage.root();
        let source = stage.create_node();
        let target = stage.create_node();
        stage.add_child(root, source).unwrap();
        stage.add_child(root, target).unwrap();

        stage.apply_constraint(
            Constraint::new(target, PropertyIndex::Position, |sources| {
                let PropertyValue::Vector3(v) = sources[0] else {
                    return PropertyValue::Vector3(Vector3::ZERO);
                };
                PropertyValue::Vector3(v * 2.0)
            })
            .with_source(source, PropertyIndex::Position),
        );

        stage.set_position(source, Vector3::new(4.0, 0.0, 0.0));
        stage.update(0.016);
        assert!(vec_close(
            stage.store().current_position(target),
            Vector3::new(8.0, 0.0, 0.0)
        ));

        // A pending write on the source is invisible until committed.
        stage.set_position(source, Vector3::new(100.0, 0.0, 0.0));
        assert!(vec_close(
            stage.store().current_position(target),
            Vector3::new(8.0, 0.0, 0.0)
        ));
        stage.update(0.016);
        assert!(vec_close(
            stage.store().current_position(target),
            Vector3::new(200.0, 0.0, 0.0)
        ));
    }

    #[test]
    fn constraint_output_feeds_world_composition() {
        let mut stage = Stage::new();
        let root = stage.root();
        let parent = stage.create_node();
        let child = stage.create_node();
        stage.add_child(root, parent).unwrap();
        stage.add_child(parent, child).unwrap();
        stage.set_position(child, Vector3::new(1.0, 0.0, 0.0));
        stage.update(0.016);

        stage.apply_constraint(Constraint::new(parent, PropertyIndex::Position, |_| {
            PropertyValue::Vector3(Vector3::new(50.0, 0.0, 0.0))
        }));
        stage.update(0.016);

        assert!(
            vec_close(
                stage.store().world_position(child),
                Vector3::new(51.0, 0.0, 0.0)
            ),
            "constrained parent position flows into the child's world"
        );
    }

    #[test]
    fn constraint_pauses_while_target_is_off_stage() {
        let mut stage = Stage::new();
        let root = stage.root();
        let node = stage.create_node();

        let id = stage.apply_constraint(
            Constraint::new(node, PropertyIndex::Position, |_| {
                PropertyValue::Vector3(Vector3::new(10.0, 0.0, 0.0))
            })
            .with_time_window(0.0, 2.0),
        );

        // Off-stage: the ramp clock does not advance.
        for _ in 0..10 {
            let out = stage.update(1.0);
            assert!(out.events.constraints_completed.is_empty());
        }
        assert_eq!(stage.store().current_position(node), Vector3::ZERO);

        // Staged: ramp starts from zero elapsed.
        stage.add_child(root, node).unwrap();
        stage.update(1.0); // elapsed 0 → weight 0
        let out = stage.update(1.0); // elapsed 1 → weight 0.5
        assert!(vec_close(
            stage.store().current_position(node),
            Vector3::new(5.0, 0.0, 0.0)
        ));
        assert!(out.events.constraints_completed.is_empty());
        let out = stage.update(1.0); // elapsed 2 → weight 1
        assert_eq!(out.events.constraints_completed, vec![id]);
    }

    #[test]
    fn destroyed_source_skips_the_frame_without_unregistering() {
        let mut stage = Stage::new();
        let root = stage.root();
        let source = stage.create_node();
        let target = stage.create_node();
        stage.add_child(root, source).unwrap();
        stage.add_child(root, target).unwrap();
        stage.set_position(source, Vector3::new(3.0, 0.0, 0.0));

        stage.apply_constraint(
            Constraint::new(target, PropertyIndex::Position, |sources| sources[0])
                .with_source(source, PropertyIndex::Position),
        );
        stage.update(0.016);
        assert!(vec_close(
            stage.store().current_position(target),
            Vector3::new(3.0, 0.0, 0.0)
        ));

        stage.destroy_node(source).unwrap();
        // No-op frames: the target keeps its last constrained value.
        stage.update(0.016);
        assert!(vec_close(
            stage.store().current_position(target),
            Vector3::new(3.0, 0.0, 0.0)
        ));
    }

    #[test]
    fn remove_constraints_is_scoped_to_one_node() {
        let mut stage = Stage::new();
        let root = stage.root();
        let a = stage.create_node();
        let b = stage.create_node();
        stage.add_child(root, a).unwrap();
        stage.add_child(root, b).unwrap();

        stage.apply_constraint(Constraint::new(a, PropertyIndex::Position, |_| {
            PropertyValue::Vector3(Vector3::new(1.0, 0.0, 0.0))
        }));
        stage.apply_constraint(Constraint::new(b, PropertyIndex::Position, |_| {
            PropertyValue::Vector3(Vector3::new(2.0, 0.0, 0.0))
        }));

        stage.remove_constraints(a);
        stage.update(0.016);

        assert_eq!(stage.store().current_position(a), Vector3::ZERO);
        assert!(vec_close(
            stage.store().current_position(b),
            Vector3::new(2.0, 0.0, 0.0)
        ));
    }

    // -- Staging notifications --

    #[test]
    fn staging_signal_fires_parent_before_child() {
        let mut stage = Stage::new();
        let root = stage.root();
        let parent = stage.create_node();
        let child = stage.create_node();
        stage.add_child(parent, child).unwrap();

        let order = Rc::new(RefCell::new(Vec::new()));
        let seen = order.clone();
        stage
            .on_staged()
            .connect(move |id: &NodeId| seen.borrow_mut().push(*id));

        stage.add_child(root, parent).unwrap();
        assert_eq!(*order.borrow(), vec![parent, child]);
    }

    #[test]
    fn unstaging_signal_fires_child_before_parent() {
        let mut stage = Stage::new();
        let root = stage.root();
        let parent = stage.create_node();
        let child = stage.create_node();
        stage.add_child(parent, child).unwrap();
        stage.add_child(root, parent).unwrap();

        let order = Rc::new(RefCell::new(Vec::new()));
        let seen = order.clone();
        stage
            .on_unstaged()
            .connect(move |id: &NodeId| seen.borrow_mut().push(*id));

        stage.remove_child(root, parent).unwrap();
        assert_eq!(*order.borrow(), vec![child, parent]);
    }

    #[test]
    fn staging_fires_once_per_transition() {
        let mut stage = Stage::new();
        let root = stage.root();
        let node = stage.create_node();

        let count = Rc::new(RefCell::new(0));
        let c = count.clone();
        stage.on_staged().connect(move |_: &NodeId| {
            *c.borrow_mut() += 1;
        });

        stage.add_child(root, node).unwrap();
        // Redundant add: no transition, no notification.
        stage.add_child(root, node).unwrap();
        assert_eq!(*count.borrow(), 1);
    }

    // -- Property-set hook --

    #[test]
    fn property_hook_fires_on_every_write_even_without_change() {
        let mut stage = Stage::new();
        let node = stage.create_node();

        let writes = Rc::new(RefCell::new(Vec::new()));
        let seen = writes.clone();
        stage
            .on_property_set()
            .connect(move |w: &PropertyWrite| seen.borrow_mut().push(*w));

        stage.set_size(node, Vector3::new(10.0, 10.0, 0.0));
        stage.set_size(node, Vector3::new(10.0, 10.0, 0.0));
        stage.set_visible(node, true);

        let writes = writes.borrow();
        assert_eq!(writes.len(), 3, "unchanged values still notify");
        assert_eq!(writes[0].property, PropertyIndex::Size);
        assert_eq!(writes[2].property, PropertyIndex::Visible);
        assert_eq!(writes[0].node, node);
    }

    // -- Frame events --

    #[test]
    fn transform_events_list_parents_before_children() {
        let mut stage = Stage::new();
        let root = stage.root();
        let parent = stage.create_node();
        let child = stage.create_node();
        stage.add_child(root, parent).unwrap();
        stage.add_child(parent, child).unwrap();
        stage.update(0.016);

        stage.set_position(parent, Vector3::new(1.0, 0.0, 0.0));
        let out = stage.update(0.016);

        let pi = out
            .events
            .transforms
            .iter()
            .position(|&i| i == parent.index())
            .unwrap();
        let ci = out
            .events
            .transforms
            .iter()
            .position(|&i| i == child.index())
            .unwrap();
        assert!(pi < ci, "eager propagation reaches the child, parent first");
    }

    #[test]
    fn added_and_removed_lifecycle_events() {
        let mut stage = Stage::new();
        let node = stage.create_node();

        let out = stage.update(0.016);
        assert!(out.events.added.contains(&node.index()));
        assert!(out.events.removed.is_empty());

        let out = stage.update(0.016);
        assert!(out.events.added.is_empty());

        stage.destroy_node(node).unwrap();
        let out = stage.update(0.016);
        assert!(out.events.removed.contains(&node.index()));
    }

    #[test]
    fn update_schedules_render_tasks() {
        use crate::camera::Camera;
        use crate::task::RefreshRate;
        use kurbo::Rect;

        let mut stage = Stage::new();
        let root = stage.root();
        let camera = stage.create_node();
        stage.add_child(root, camera).unwrap();

        let mut task = RenderTask::new(
            root,
            camera,
            Camera::orthographic(100.0, 100.0),
            Rect::new(0.0, 0.0, 100.0, 100.0),
        );
        task.set_refresh_rate(RefreshRate::Once);
        let id = stage.add_render_task(task);

        let out = stage.update(0.016);
        assert_eq!(out.draws, vec![id]);
        assert_eq!(out.finished, vec![id]);

        let out = stage.update(0.016);
        assert!(out.draws.is_empty());
    }
}
