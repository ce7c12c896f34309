// Copyright 2026 the Proscenium Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for the update pass.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that
//! the update pass calls at each phase. All method bodies default to no-ops,
//! so implementing only the events you care about is fine.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. When the `trace`
//! feature is **off**, every `Tracer` method compiles to nothing (zero
//! overhead). When **on**, each method performs a single `Option` branch
//! before dispatching.
//!
//! # Crate features
//!
//! - `trace` — enables the `Tracer` method bodies (one branch per call).
//! - `trace-rich` (implies `trace`) — gates [`NodeChange`] events and the
//!   corresponding `TraceSink` method.

use crate::constraint::ConstraintId;
use crate::task::TaskId;

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted at the start of an update pass.
#[derive(Clone, Copy, Debug)]
pub struct FrameBeginEvent {
    /// Monotonic frame counter.
    pub frame: u64,
}

/// Emitted after the commit phase.
#[derive(Clone, Copy, Debug)]
pub struct CommitEvent {
    /// Frame counter.
    pub frame: u64,
    /// Nodes whose transform group was committed.
    pub transforms: u32,
    /// Nodes whose color group was committed.
    pub colors: u32,
    /// Nodes whose visibility was committed.
    pub visibility: u32,
    /// Nodes whose content group was committed.
    pub content: u32,
}

/// Emitted when a constraint's apply weight first reaches full.
#[derive(Clone, Copy, Debug)]
pub struct ConstraintCompletedEvent {
    /// Frame counter.
    pub frame: u64,
    /// The completed constraint.
    pub constraint: ConstraintId,
}

/// Emitted when a render task draws.
#[derive(Clone, Copy, Debug)]
pub struct TaskDrawEvent {
    /// Frame counter.
    pub frame: u64,
    /// The drawing task.
    pub task: TaskId,
}

/// Emitted when a one-shot render task's completion fires.
#[derive(Clone, Copy, Debug)]
pub struct TaskFinishedEvent {
    /// Frame counter.
    pub frame: u64,
    /// The finished task.
    pub task: TaskId,
}

/// Emitted at the end of an update pass.
#[derive(Clone, Copy, Debug)]
pub struct FrameEndEvent {
    /// Frame counter.
    pub frame: u64,
    /// Number of tasks drawing this frame.
    pub draws: u32,
    /// Number of completions fired this frame.
    pub finished: u32,
}

/// Which computed field of a node changed.
#[cfg(feature = "trace-rich")]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeField {
    /// World position, rotation, or scale.
    Transform,
    /// World color.
    Color,
    /// Effective visibility.
    Visibility,
}

/// A per-frame node change record.
#[cfg(feature = "trace-rich")]
#[derive(Clone, Copy, Debug)]
pub struct NodeChange {
    /// Raw slot index of the node that changed.
    pub node: u32,
    /// Which field changed.
    pub field: NodeField,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the update pass.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called at the start of an update pass.
    fn on_frame_begin(&mut self, e: &FrameBeginEvent) {
        _ = e;
    }

    /// Called after the commit phase.
    fn on_commit(&mut self, e: &CommitEvent) {
        _ = e;
    }

    /// Called for each constraint completion edge.
    fn on_constraint_completed(&mut self, e: &ConstraintCompletedEvent) {
        _ = e;
    }

    /// Called for each task that draws.
    fn on_task_draw(&mut self, e: &TaskDrawEvent) {
        _ = e;
    }

    /// Called for each one-shot completion.
    fn on_task_finished(&mut self, e: &TaskFinishedEvent) {
        _ = e;
    }

    /// Called at the end of an update pass.
    fn on_frame_end(&mut self, e: &FrameEndEvent) {
        _ = e;
    }

    /// Called with per-frame node changes (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    fn on_node_changes(&mut self, frame: u64, changes: &[NodeChange]) {
        _ = (frame, changes);
    }
}

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing.
/// When **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Emits a [`FrameBeginEvent`].
    #[inline]
    pub fn frame_begin(&mut self, e: &FrameBeginEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_frame_begin(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`CommitEvent`].
    #[inline]
    pub fn commit(&mut self, e: &CommitEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_commit(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`ConstraintCompletedEvent`].
    #[inline]
    pub fn constraint_completed(&mut self, e: &ConstraintCompletedEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_constraint_completed(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`TaskDrawEvent`].
    #[inline]
    pub fn task_draw(&mut self, e: &TaskDrawEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_task_draw(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`TaskFinishedEvent`].
    #[inline]
    pub fn task_finished(&mut self, e: &TaskFinishedEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_task_finished(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`FrameEndEvent`].
    #[inline]
    pub fn frame_end(&mut self, e: &FrameEndEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_frame_end(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits per-frame node changes.
    #[cfg(feature = "trace-rich")]
    #[inline]
    pub fn node_changes(&mut self, frame: u64, changes: &[NodeChange]) {
        if let Some(s) = &mut self.sink {
            s.on_node_changes(frame, changes);
        }
    }
}

#[cfg(all(test, feature = "trace"))]
mod tests {
    use alloc::vec::Vec;

    use super::*;

    #[derive(Default)]
    struct Recorder {
        frames: Vec<u64>,
    }

    impl TraceSink for Recorder {
        fn on_frame_begin(&mut self, e: &FrameBeginEvent) {
            self.frames.push(e.frame);
        }
    }

    #[test]
    fn tracer_dispatches_to_sink() {
        let mut sink = Recorder::default();
        let mut tracer = Tracer::new(&mut sink);
        tracer.frame_begin(&FrameBeginEvent { frame: 3 });
        drop(tracer);
        assert_eq!(sink.frames, [3]);
    }

    #[test]
    fn none_tracer_discards() {
        let mut tracer = Tracer::none();
        tracer.frame_begin(&FrameBeginEvent { frame: 1 });
    }
}
