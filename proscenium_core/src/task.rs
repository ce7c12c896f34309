// Copyright 2026 the Proscenium Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Render-task list and per-frame scheduling.
//!
//! A render task binds a source sub-tree, a camera, an optional target
//! texture, a viewport, and a refresh policy. The list is ordered: earlier
//! tasks draw first, and chained completions fire in list order.
//!
//! # Task state machine
//!
//! ```text
//!   Idle ──► Active ──► (AwaitingSync) ──► Finished ──► Idle
//! ```
//!
//! - **Idle** — not due this frame, or the one-shot cycle is consumed.
//! - **Active** — due and drawable: the source root is on-stage and
//!   visible, the camera is on-stage, and an offscreen target is not still
//!   loading. An undrawable due task skips the frame silently; the due
//!   latch is kept, so gates are rechecked every frame without losing
//!   cadence.
//! - **AwaitingSync** — a fence was inserted after the draw; the task does
//!   not redraw (even if otherwise due) until the fence signals. Fences are
//!   polled once per frame, non-blocking, with no timeout.
//! - **Finished** — only [`RefreshRate::Once`] tasks reach this state; the
//!   completion fires exactly once per activation cycle. Re-arming via
//!   [`RenderTask::set_refresh_rate`] schedules exactly one more cycle.
//!
//! `Active` and `Finished` are transient within one
//! [`RenderTaskList::schedule`] call; between calls a task rests in `Idle`
//! or `AwaitingSync`.

use alloc::vec::Vec;
use core::fmt;

use kurbo::Rect;

use crate::backend::{FenceId, FenceProvider};
use crate::camera::Camera;
use crate::math::Color;
use crate::node::{DrawMode, NodeId, NodeStore, TextureId};
use crate::resource::ResourceTracker;

/// A handle to a task in a [`RenderTaskList`].
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(pub(crate) u32);

impl fmt::Debug for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TaskId({})", self.0)
    }
}

/// How often a task draws.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum RefreshRate {
    /// Draw every frame.
    #[default]
    Always,
    /// Draw on frames where `frame % n == 0`. `Interval(0)` and
    /// `Interval(1)` behave like [`Always`](Self::Always).
    Interval(u32),
    /// Draw exactly once per activation, then notify completion.
    Once,
}

/// Scheduling state of a task. See the module docs for the state machine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TaskState {
    /// Not due, or cycle consumed.
    #[default]
    Idle,
    /// Due and drawable this frame.
    Active,
    /// Drawn; waiting for the GPU fence to signal.
    AwaitingSync,
    /// One-shot cycle complete; notification firing.
    Finished,
}

/// A single render pass configuration.
#[derive(Debug)]
pub struct RenderTask {
    id: TaskId,
    source: NodeId,
    camera_node: NodeId,
    camera: Camera,
    viewport: Rect,
    target: Option<TextureId>,
    clear_color: Color,
    clear_enabled: bool,
    refresh: RefreshRate,
    exclusive: bool,
    input_enabled: bool,
    sync_required: bool,

    // Scheduling state.
    state: TaskState,
    due: bool,
    armed: bool,
    pending_fence: Option<FenceId>,
    draw_count: u64,
    finished_count: u64,
}

impl RenderTask {
    /// Creates a task drawing `source`'s sub-tree through `camera`
    /// (anchored at `camera_node`) into `viewport`.
    ///
    /// Defaults: onscreen (no target), refresh every frame, clear disabled,
    /// input enabled, not exclusive, no GPU sync.
    #[must_use]
    pub fn new(source: NodeId, camera_node: NodeId, camera: Camera, viewport: Rect) -> Self {
        Self {
            id: TaskId(u32::MAX),
            source,
            camera_node,
            camera,
            viewport,
            target: None,
            clear_color: Color::BLACK,
            clear_enabled: false,
            refresh: RefreshRate::Always,
            exclusive: false,
            input_enabled: true,
            sync_required: false,
            state: TaskState::Idle,
            due: false,
            armed: false,
            pending_fence: None,
            draw_count: 0,
            finished_count: 0,
        }
    }

    /// Returns the task's handle (valid once added to a list).
    #[must_use]
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Returns the source sub-tree root.
    #[must_use]
    pub fn source(&self) -> NodeId {
        self.source
    }

    /// Replaces the source sub-tree root.
    pub fn set_source(&mut self, source: NodeId) {
        self.source = source;
    }

    /// Returns the camera anchor node.
    #[must_use]
    pub fn camera_node(&self) -> NodeId {
        self.camera_node
    }

    /// Returns the camera parameters.
    #[must_use]
    pub fn camera(&self) -> Camera {
        self.camera
    }

    /// Replaces the camera parameters.
    pub fn set_camera(&mut self, camera: Camera) {
        self.camera = camera;
    }

    /// Returns the viewport rectangle in screen coordinates.
    #[must_use]
    pub fn viewport(&self) -> Rect {
        self.viewport
    }

    /// Replaces the viewport rectangle.
    pub fn set_viewport(&mut self, viewport: Rect) {
        self.viewport = viewport;
    }

    /// Returns the offscreen target texture, if any.
    #[must_use]
    pub fn target(&self) -> Option<TextureId> {
        self.target
    }

    /// Sets or clears the offscreen target texture.
    pub fn set_target(&mut self, target: Option<TextureId>) {
        self.target = target;
    }

    /// Returns the clear color.
    #[must_use]
    pub fn clear_color(&self) -> Color {
        self.clear_color
    }

    /// Sets the clear color.
    pub fn set_clear_color(&mut self, color: Color) {
        self.clear_color = color;
    }

    /// Returns whether the target is cleared before drawing.
    #[must_use]
    pub fn clear_enabled(&self) -> bool {
        self.clear_enabled
    }

    /// Enables or disables the pre-draw clear.
    pub fn set_clear_enabled(&mut self, enabled: bool) {
        self.clear_enabled = enabled;
    }

    /// Returns the refresh policy.
    #[must_use]
    pub fn refresh_rate(&self) -> RefreshRate {
        self.refresh
    }

    /// Sets the refresh policy.
    ///
    /// Setting [`RefreshRate::Once`] arms exactly one activation cycle:
    /// one draw and one completion, even across multiple frames of sync
    /// waiting. Calling it again after the completion fires arms a fresh
    /// cycle.
    pub fn set_refresh_rate(&mut self, refresh: RefreshRate) {
        self.refresh = refresh;
        match refresh {
            RefreshRate::Once => self.armed = true,
            RefreshRate::Always | RefreshRate::Interval(_) => {
                self.armed = false;
                self.due = false;
            }
        }
    }

    /// Returns whether this task claims its source sub-tree exclusively.
    #[must_use]
    pub fn is_exclusive(&self) -> bool {
        self.exclusive
    }

    /// Sets the exclusive claim. While set, nodes under this task's source
    /// are skipped by every other task's draw order.
    pub fn set_exclusive(&mut self, exclusive: bool) {
        self.exclusive = exclusive;
    }

    /// Returns whether this task participates in hit testing.
    #[must_use]
    pub fn input_enabled(&self) -> bool {
        self.input_enabled
    }

    /// Enables or disables hit-test participation.
    pub fn set_input_enabled(&mut self, enabled: bool) {
        self.input_enabled = enabled;
    }

    /// Returns whether a GPU fence gates this task's completion.
    #[must_use]
    pub fn sync_required(&self) -> bool {
        self.sync_required
    }

    /// Requires (or stops requiring) a GPU fence after each draw.
    pub fn set_sync_required(&mut self, required: bool) {
        self.sync_required = required;
    }

    /// Returns the current scheduling state.
    #[must_use]
    pub fn state(&self) -> TaskState {
        self.state
    }

    /// Total draws issued over the task's lifetime.
    #[must_use]
    pub fn draw_count(&self) -> u64 {
        self.draw_count
    }

    /// Total completions fired over the task's lifetime.
    #[must_use]
    pub fn finished_count(&self) -> u64 {
        self.finished_count
    }

    /// Whether the task may draw this frame.
    fn drawable(&self, store: &NodeStore, resources: &ResourceTracker) -> bool {
        store.is_alive(self.source)
            && store.is_on_stage(self.source)
            && store.world_visible(self.source)
            && store.is_alive(self.camera_node)
            && store.is_on_stage(self.camera_node)
            && self.target.is_none_or(|t| resources.unblocks(t))
    }
}

/// Per-task draw ordering for one frame.
///
/// `color` holds raw slot indices in back-to-front paint order: `Normal`
/// nodes in traversal order, then `Overlay` nodes in traversal order.
/// `Stencil` nodes are kept apart in `stencil`, in traversal order.
#[derive(Clone, Debug, Default)]
pub struct DrawOrder {
    /// Color-pass nodes, back to front.
    pub color: Vec<u32>,
    /// Stencil-pass nodes.
    pub stencil: Vec<u32>,
}

/// The scheduling decision for one frame.
#[derive(Clone, Debug, Default)]
pub struct ScheduleOutput {
    /// Tasks that draw this frame, in list order.
    pub draws: Vec<TaskId>,
    /// Tasks whose one-shot completion fires this frame, in list order.
    pub finished: Vec<TaskId>,
}

/// The ordered list of render tasks.
#[derive(Debug, Default)]
pub struct RenderTaskList {
    tasks: Vec<RenderTask>,
    next_id: u32,
}

impl RenderTaskList {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tasks: Vec::new(),
            next_id: 0,
        }
    }

    /// Appends a task and returns its handle. List position is draw order.
    pub fn add_task(&mut self, mut task: RenderTask) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        task.id = id;
        if matches!(task.refresh, RefreshRate::Once) {
            task.armed = true;
        }
        self.tasks.push(task);
        id
    }

    /// Removes a task. Removing an unknown handle is a silent no-op.
    pub fn remove_task(&mut self, id: TaskId) {
        self.tasks.retain(|t| t.id != id);
    }

    /// Returns a task by handle.
    #[must_use]
    pub fn task(&self, id: TaskId) -> Option<&RenderTask> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Returns a task by handle, mutably.
    pub fn task_mut(&mut self, id: TaskId) -> Option<&mut RenderTask> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    /// Iterates tasks in list (draw) order.
    pub fn iter(&self) -> impl Iterator<Item = &RenderTask> {
        self.tasks.iter()
    }

    /// Number of tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether the list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Decides which tasks draw and which complete on frame `frame`.
    ///
    /// Runs once per frame after composition. Polls pending fences
    /// (non-blocking, at most one query per fence), latches due tasks per
    /// their refresh policy, applies the drawability gates, inserts fences
    /// for freshly drawn sync tasks, and fires one-shot completions in list
    /// order.
    pub fn schedule(
        &mut self,
        frame: u64,
        store: &NodeStore,
        resources: &ResourceTracker,
        fences: &mut dyn FenceProvider,
    ) -> ScheduleOutput {
        let mut out = ScheduleOutput::default();

        for task in &mut self.tasks {
            // Resolve a pending fence before anything else this frame.
            if task.state == TaskState::AwaitingSync {
                if let Some(fence) = task.pending_fence {
                    if fences.fence_signalled(fence) {
                        task.pending_fence = None;
                        task.state = if matches!(task.refresh, RefreshRate::Once) {
                            TaskState::Finished
                        } else {
                            TaskState::Idle
                        };
                    }
                }
            }

            // Latch the due flag per refresh policy. The latch survives
            // undrawable frames so cadence is not lost.
            match task.refresh {
                RefreshRate::Always => task.due = true,
                RefreshRate::Interval(n) => {
                    if n <= 1 || frame % u64::from(n) == 0 {
                        task.due = true;
                    }
                }
                RefreshRate::Once => {
                    if task.armed && task.state == TaskState::Idle {
                        task.due = true;
                    }
                }
            }

            // Draw if due and not blocked by a pending fence.
            if task.due
                && task.state != TaskState::AwaitingSync
                && task.state != TaskState::Finished
                && task.drawable(store, resources)
            {
                task.due = false;
                task.state = TaskState::Active;
                task.draw_count += 1;
                out.draws.push(task.id);

                if matches!(task.refresh, RefreshRate::Once) {
                    // Activation consumed at the draw.
                    task.armed = false;
                }

                task.state = if task.sync_required {
                    task.pending_fence = Some(fences.insert_fence());
                    TaskState::AwaitingSync
                } else if matches!(task.refresh, RefreshRate::Once) {
                    TaskState::Finished
                } else {
                    TaskState::Idle
                };
            }

            // Fire one-shot completions. Processing tasks in list order
            // guarantees chained completions fire earlier-before-later.
            if task.state == TaskState::Finished {
                task.state = TaskState::Idle;
                task.finished_count += 1;
                out.finished.push(task.id);
            }
        }

        out
    }

    /// Computes the draw order for one task.
    ///
    /// Depth-first over the task's source sub-tree, honoring exclusive
    /// claims by *other* tasks and pruning effectively invisible subtrees.
    /// Returns an empty order for an unknown task or a destroyed source.
    #[must_use]
    pub fn draw_order(&self, store: &NodeStore, id: TaskId) -> DrawOrder {
        let mut order = DrawOrder::default();
        let Some(task) = self.task(id) else {
            return order;
        };
        if !store.is_alive(task.source) {
            return order;
        }

        // Sub-tree roots claimed exclusively by other tasks.
        let mut claimed: Vec<u32> = Vec::new();
        for other in &self.tasks {
            if other.exclusive && other.id != id && store.is_alive(other.source) {
                claimed.push(other.source.index());
            }
        }

        let mut overlay = Vec::new();
        collect_draws(
            store,
            task.source.index(),
            &claimed,
            &mut order.color,
            &mut overlay,
            &mut order.stencil,
        );
        order.color.append(&mut overlay);
        order
    }
}

/// Depth-first collection of a task's paintable nodes.
fn collect_draws(
    store: &NodeStore,
    idx: u32,
    claimed: &[u32],
    normal: &mut Vec<u32>,
    overlay: &mut Vec<u32>,
    stencil: &mut Vec<u32>,
) {
    if claimed.contains(&idx) {
        return;
    }
    // Invisibility is inherited: prune the whole subtree.
    if !store.world_visible_at(idx) {
        return;
    }
    match store.draw_mode_at(idx) {
        DrawMode::Normal => normal.push(idx),
        DrawMode::Overlay => overlay.push(idx),
        DrawMode::Stencil => stencil.push(idx),
    }
    let mut child = store.first_child[idx as usize];
    while child != crate::node::INVALID {
        collect_draws(store, child, claimed, normal, overlay, stencil);
        child = store.next_sibling[child as usize];
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;
    use crate::backend::NullFences;

    /// Fence provider whose fences signal only when released by the test.
    #[derive(Debug, Default)]
    struct ManualFences {
        next: u64,
        released: Vec<u64>,
        polls: Vec<u64>,
    }

    impl ManualFences {
        fn release(&mut self, fence: FenceId) {
            self.released.push(fence.0);
        }
    }

    impl FenceProvider for ManualFences {
        fn insert_fence(&mut self) -> FenceId {
            let id = FenceId(self.next);
            self.next += 1;
            id
        }

        fn fence_signalled(&mut self, fence: FenceId) -> bool {
            self.polls.push(fence.0);
            self.released.contains(&fence.0)
        }
    }

    fn staged_scene() -> (NodeStore, NodeId, NodeId) {
        let mut store = NodeStore::new();
        let root = store.root();
        let source = store.create_node();
        let camera = store.create_node();
        store.add_child(root, source).unwrap();
        store.add_child(root, camera).unwrap();
        (store, source, camera)
    }

    fn simple_task(source: NodeId, camera: NodeId) -> RenderTask {
        RenderTask::new(
            source,
            camera,
            Camera::orthographic(100.0, 100.0),
            Rect::new(0.0, 0.0, 100.0, 100.0),
        )
    }

    #[test]
    fn always_task_draws_every_frame() {
        let (store, source, camera) = staged_scene();
        let resources = ResourceTracker::new();
        let mut fences = NullFences::new();
        let mut list = RenderTaskList::new();
        let id = list.add_task(simple_task(source, camera));

        for frame in 0..4 {
            let out = list.schedule(frame, &store, &resources, &mut fences);
            assert_eq!(out.draws, vec![id]);
            assert!(out.finished.is_empty(), "Always never finishes");
        }
    }

    #[test]
    fn interval_task_draws_on_multiples() {
        let (store, source, camera) = staged_scene();
        let resources = ResourceTracker::new();
        let mut fences = NullFences::new();
        let mut list = RenderTaskList::new();
        let mut task = simple_task(source, camera);
        task.set_refresh_rate(RefreshRate::Interval(3));
        let id = list.add_task(task);

        let mut drawn = Vec::new();
        for frame in 0..7 {
            let out = list.schedule(frame, &store, &resources, &mut fences);
            if !out.draws.is_empty() {
                drawn.push(frame);
            }
        }
        assert_eq!(drawn, vec![0, 3, 6]);
        assert_eq!(list.task(id).unwrap().draw_count(), 3);
    }

    #[test]
    fn once_task_draws_and_finishes_exactly_once() {
        let (store, source, camera) = staged_scene();
        let resources = ResourceTracker::new();
        let mut fences = NullFences::new();
        let mut list = RenderTaskList::new();
        let mut task = simple_task(source, camera);
        task.set_refresh_rate(RefreshRate::Once);
        let id = list.add_task(task);

        let out = list.schedule(0, &store, &resources, &mut fences);
        assert_eq!(out.draws, vec![id]);
        assert_eq!(out.finished, vec![id]);

        for frame in 1..4 {
            let out = list.schedule(frame, &store, &resources, &mut fences);
            assert!(out.draws.is_empty());
            assert!(out.finished.is_empty());
        }
        assert_eq!(list.task(id).unwrap().draw_count(), 1);
        assert_eq!(list.task(id).unwrap().finished_count(), 1);
    }

    #[test]
    fn once_task_can_be_rearmed_for_one_more_cycle() {
        let (store, source, camera) = staged_scene();
        let resources = ResourceTracker::new();
        let mut fences = NullFences::new();
        let mut list = RenderTaskList::new();
        let mut task = simple_task(source, camera);
        task.set_refresh_rate(RefreshRate::Once);
        let id = list.add_task(task);

        let out = list.schedule(0, &store, &resources, &mut fences);
        assert_eq!(out.finished, vec![id]);

        // Re-arm (as a finished callback would, after dispatch returns).
        list.task_mut(id)
            .unwrap()
            .set_refresh_rate(RefreshRate::Once);

        let out = list.schedule(1, &store, &resources, &mut fences);
        assert_eq!(out.draws, vec![id]);
        assert_eq!(out.finished, vec![id]);

        let out = list.schedule(2, &store, &resources, &mut fences);
        assert!(out.finished.is_empty(), "re-arm buys exactly one cycle");
    }

    #[test]
    fn undrawable_task_keeps_due_latch() {
        let mut store = NodeStore::new();
        let root = store.root();
        let source = store.create_node();
        let camera = store.create_node();
        store.add_child(root, camera).unwrap();
        // Source stays off-stage for now.

        let resources = ResourceTracker::new();
        let mut fences = NullFences::new();
        let mut list = RenderTaskList::new();
        let mut task = simple_task(source, camera);
        task.set_refresh_rate(RefreshRate::Once);
        let id = list.add_task(task);

        let out = list.schedule(0, &store, &resources, &mut fences);
        assert!(out.draws.is_empty(), "skipped silently");
        let out = list.schedule(1, &store, &resources, &mut fences);
        assert!(out.draws.is_empty());

        // Stage the source: the latched activation draws without re-arming.
        store.add_child(root, source).unwrap();
        let out = list.schedule(2, &store, &resources, &mut fences);
        assert_eq!(out.draws, vec![id]);
        assert_eq!(out.finished, vec![id]);
    }

    #[test]
    fn loading_target_blocks_failed_target_unblocks() {
        let (store, source, camera) = staged_scene();
        let mut resources = ResourceTracker::new();
        let mut fences = NullFences::new();
        let target = TextureId(9);
        resources.begin_load(target);

        let mut list = RenderTaskList::new();
        let mut task = simple_task(source, camera);
        task.set_target(Some(target));
        task.set_refresh_rate(RefreshRate::Once);
        let id = list.add_task(task);

        let out = list.schedule(0, &store, &resources, &mut fences);
        assert!(out.draws.is_empty(), "loading target gates the draw");

        resources.notify_failed(target);
        let out = list.schedule(1, &store, &resources, &mut fences);
        assert_eq!(out.draws, vec![id], "failed load still draws");
        assert_eq!(out.finished, vec![id], "and still finishes on schedule");
    }

    #[test]
    fn sync_task_defers_completion_until_fence_signals() {
        let (store, source, camera) = staged_scene();
        let resources = ResourceTracker::new();
        let mut fences = ManualFences::default();

        let mut list = RenderTaskList::new();
        let mut task = simple_task(source, camera);
        task.set_refresh_rate(RefreshRate::Once);
        task.set_sync_required(true);
        let id = list.add_task(task);

        let out = list.schedule(0, &store, &resources, &mut fences);
        assert_eq!(out.draws, vec![id]);
        assert!(out.finished.is_empty(), "completion waits on the fence");
        assert_eq!(list.task(id).unwrap().state(), TaskState::AwaitingSync);

        // Fence unsignalled: no redraw, no completion, one poll per frame.
        let out = list.schedule(1, &store, &resources, &mut fences);
        assert!(out.draws.is_empty());
        assert!(out.finished.is_empty());
        assert_eq!(fences.polls, vec![0]);

        fences.release(FenceId(0));
        let out = list.schedule(2, &store, &resources, &mut fences);
        assert!(out.draws.is_empty());
        assert_eq!(out.finished, vec![id]);
        assert_eq!(list.task(id).unwrap().state(), TaskState::Idle);
    }

    #[test]
    fn always_task_with_sync_skips_draws_while_awaiting() {
        let (store, source, camera) = staged_scene();
        let resources = ResourceTracker::new();
        let mut fences = ManualFences::default();

        let mut list = RenderTaskList::new();
        let mut task = simple_task(source, camera);
        task.set_sync_required(true);
        let id = list.add_task(task);

        let out = list.schedule(0, &store, &resources, &mut fences);
        assert_eq!(out.draws, vec![id]);

        let out = list.schedule(1, &store, &resources, &mut fences);
        assert!(out.draws.is_empty(), "no redraw during sync wait");

        fences.release(FenceId(0));
        let out = list.schedule(2, &store, &resources, &mut fences);
        assert_eq!(out.draws, vec![id], "redraws once the fence clears");
        assert!(out.finished.is_empty(), "repeating tasks never finish");
    }

    #[test]
    fn chained_completions_fire_in_list_order() {
        let (mut store, source, camera) = staged_scene();
        let root = store.root();
        let consumer = store.create_node();
        store.add_child(root, consumer).unwrap();

        let texture = TextureId(3);
        store.set_texture(consumer, Some(texture));

        let resources = ResourceTracker::new();
        let mut fences = ManualFences::default();
        let mut list = RenderTaskList::new();

        let mut offscreen = simple_task(source, camera);
        offscreen.set_target(Some(texture));
        offscreen.set_refresh_rate(RefreshRate::Once);
        offscreen.set_sync_required(true);
        let first = list.add_task(offscreen);

        let mut onscreen = simple_task(consumer, camera);
        onscreen.set_refresh_rate(RefreshRate::Once);
        onscreen.set_sync_required(true);
        let second = list.add_task(onscreen);

        let out = list.schedule(0, &store, &resources, &mut fences);
        assert_eq!(out.draws, vec![first, second]);
        assert!(out.finished.is_empty());

        // Both fences signal before the next frame: completions fire on
        // the same frame, earlier task first.
        fences.release(FenceId(0));
        fences.release(FenceId(1));
        let out = list.schedule(1, &store, &resources, &mut fences);
        assert_eq!(out.finished, vec![first, second]);
    }

    #[test]
    fn exclusive_task_claims_its_subtree() {
        let mut store = NodeStore::new();
        let root = store.root();
        let shared = store.create_node();
        let claimed_root = store.create_node();
        let claimed_child = store.create_node();
        let camera = store.create_node();
        store.add_child(root, shared).unwrap();
        store.add_child(root, claimed_root).unwrap();
        store.add_child(claimed_root, claimed_child).unwrap();
        store.add_child(root, camera).unwrap();

        let mut list = RenderTaskList::new();
        let full = list.add_task(simple_task(root, camera));
        let mut excl = simple_task(claimed_root, camera);
        excl.set_exclusive(true);
        let excl_id = list.add_task(excl);

        let full_order = list.draw_order(&store, full);
        assert!(!full_order.color.contains(&claimed_root.index()));
        assert!(!full_order.color.contains(&claimed_child.index()));
        assert!(full_order.color.contains(&shared.index()));

        let excl_order = list.draw_order(&store, excl_id);
        assert!(excl_order.color.contains(&claimed_root.index()));
        assert!(excl_order.color.contains(&claimed_child.index()));
    }

    #[test]
    fn draw_order_puts_overlay_after_normal_and_stencil_apart() {
        let mut store = NodeStore::new();
        let root = store.root();
        let overlay_early = store.create_node();
        let normal = store.create_node();
        let stencil = store.create_node();
        store.add_child(root, overlay_early).unwrap();
        store.add_child(root, normal).unwrap();
        store.add_child(root, stencil).unwrap();
        store.set_draw_mode(overlay_early, DrawMode::Overlay);
        store.set_draw_mode(stencil, DrawMode::Stencil);
        // Commit the modes.
        store.commit_content_at(overlay_early.index());
        store.commit_content_at(stencil.index());

        let camera = store.create_node();
        store.add_child(root, camera).unwrap();

        let mut list = RenderTaskList::new();
        let id = list.add_task(simple_task(root, camera));

        let order = list.draw_order(&store, id);
        assert_eq!(
            order.color,
            vec![
                root.index(),
                normal.index(),
                camera.index(),
                overlay_early.index()
            ],
            "overlay draws last despite earlier traversal position"
        );
        assert_eq!(order.stencil, vec![stencil.index()]);
    }

    #[test]
    fn removing_unknown_task_is_a_noop() {
        let mut list = RenderTaskList::new();
        list.remove_task(TaskId(42));
        assert!(list.is_empty());
    }
}
