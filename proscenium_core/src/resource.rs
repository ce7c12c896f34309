// Copyright 2026 the Proscenium Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Resource readiness tracking for the render-task gate.
//!
//! The loader (external to this core) notifies readiness per texture id;
//! render tasks targeting a texture stay undrawable only while it is still
//! loading. A *failed* load unblocks scheduling: the task draws an empty or
//! stale result and still finishes on schedule — resource failure is not a
//! task failure.

use alloc::collections::BTreeMap;

use crate::node::TextureId;

/// Load state of an externally-managed texture.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceState {
    /// Load in progress; gates any render task targeting the texture.
    Loading,
    /// Load complete.
    Ready,
    /// Load failed; tasks proceed and draw nothing meaningful.
    Failed,
}

/// Tracks readiness for textures the embedder has registered.
///
/// Textures that were never registered are treated as [`Ready`]
/// (readiness tracking is opt-in per texture).
///
/// [`Ready`]: ResourceState::Ready
#[derive(Debug, Default)]
pub struct ResourceTracker {
    states: BTreeMap<u32, ResourceState>,
}

impl ResourceTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self {
            states: BTreeMap::new(),
        }
    }

    /// Registers a texture as loading. Tasks targeting it will not draw
    /// until [`notify_ready`](Self::notify_ready) or
    /// [`notify_failed`](Self::notify_failed) arrives.
    pub fn begin_load(&mut self, id: TextureId) {
        self.states.insert(id.0, ResourceState::Loading);
    }

    /// Records a successful load.
    pub fn notify_ready(&mut self, id: TextureId) {
        self.states.insert(id.0, ResourceState::Ready);
    }

    /// Records a failed load.
    pub fn notify_failed(&mut self, id: TextureId) {
        self.states.insert(id.0, ResourceState::Failed);
    }

    /// Returns the tracked state, or [`ResourceState::Ready`] for textures
    /// that were never registered.
    #[must_use]
    pub fn state(&self, id: TextureId) -> ResourceState {
        self.states
            .get(&id.0)
            .copied()
            .unwrap_or(ResourceState::Ready)
    }

    /// Whether a task targeting `id` may draw this frame.
    #[must_use]
    pub fn unblocks(&self, id: TextureId) -> bool {
        self.state(id) != ResourceState::Loading
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unregistered_texture_is_ready() {
        let tracker = ResourceTracker::new();
        assert_eq!(tracker.state(TextureId(7)), ResourceState::Ready);
        assert!(tracker.unblocks(TextureId(7)));
    }

    #[test]
    fn loading_blocks_until_notified() {
        let mut tracker = ResourceTracker::new();
        let id = TextureId(1);
        tracker.begin_load(id);
        assert!(!tracker.unblocks(id));

        tracker.notify_ready(id);
        assert!(tracker.unblocks(id));
    }

    #[test]
    fn failed_load_unblocks_scheduling() {
        let mut tracker = ResourceTracker::new();
        let id = TextureId(2);
        tracker.begin_load(id);
        tracker.notify_failed(id);
        assert_eq!(tracker.state(id), ResourceState::Failed);
        assert!(tracker.unblocks(id), "failure is not a task failure");
    }
}
