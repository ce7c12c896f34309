// Copyright 2026 the Proscenium Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dirty-tracking channel constants.
//!
//! Proscenium uses multi-channel dirty tracking (via [`understory_dirty`]) to
//! drive the per-frame commit and to propagate invalidation through the node
//! tree. Each channel represents an independent category of change.
//!
//! # Propagation semantics
//!
//! Channels differ in whether dirtiness propagates to descendants:
//!
//! - **Propagating** — [`TRANSFORM`], [`COLOR`], and [`VISIBILITY`] use
//!   [`EagerPolicy`](understory_dirty::EagerPolicy) and have dependency
//!   edges from child to parent. Marking a parent dirty automatically marks
//!   all descendants, because world positions, world colors, and effective
//!   visibility are inherited properties.
//!
//! - **Local-only** — [`CONTENT`] is marked with the default policy. Only
//!   the explicitly marked node appears in the drain output, since
//!   sensitivity, draw mode, clipping, and texture content are per-node.
//!
//! - **Structural** — [`TOPOLOGY`] is marked on topology mutations
//!   (add/remove child, create/destroy node, sibling reorder). It triggers
//!   a traversal-order rebuild during the update pass but does not
//!   propagate to descendants.
//!
//! # Consumption
//!
//! Callers never need to query dirty state directly. Each
//! [`Stage::update`](crate::stage::Stage::update) call drains all channels:
//! drained nodes get their pending property values committed, their world
//! values recomputed in root-to-leaf order, and their slot indices surfaced
//! in [`FrameEvents`](crate::stage::FrameEvents) for backends to apply
//! incremental updates.

use understory_dirty::Channel;

/// Spatial property changed (parent-origin, anchor, size, position,
/// rotation, scale, or an inheritance switch) — requires world transform
/// recomputation for descendants.
pub const TRANSFORM: Channel = Channel::new(0);

/// Color or color mode changed — requires world color recomputation for
/// descendants.
pub const COLOR: Channel = Channel::new(1);

/// Visibility flag changed — requires effective visibility recomputation
/// for descendants.
pub const VISIBILITY: Channel = Channel::new(2);

/// Per-node content changed (sensitivity, draw mode, clipping, texture) —
/// no propagation needed.
pub const CONTENT: Channel = Channel::new(3);

/// Tree topology changed — triggers traversal order rebuild.
pub const TOPOLOGY: Channel = Channel::new(4);
