// Copyright 2026 the Proscenium Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scene-node tree data model.
//!
//! A *node* (an "actor" at the public API level) is a positionable element
//! of the scene graph. Each node has:
//!
//! - An identity ([`NodeId`]) — a generational handle that becomes stale
//!   when the node is destroyed, preventing use-after-free bugs at the API
//!   level.
//! - Topology — parent, first-child, and sibling links forming an ordered
//!   tree. Insertion order is paint and traversal order.
//! - **Double-buffered properties** set by the caller: parent-origin,
//!   anchor-point, size, position, rotation, scale, color, visibility,
//!   sensitivity, draw mode, color mode, position-inheritance mode, and the
//!   inherit-rotation/inherit-scale switches. Setters write the pending
//!   `base` slot; the update pass commits `base` into `current`.
//! - **Computed properties** produced by the update pass: world position,
//!   world rotation, world scale, world color (clamped), and effective
//!   visibility.
//! - Per-node content configuration (not buffered): optional name, optional
//!   texture, child clipping, and touch consumption.
//!
//! Nodes are stored in struct-of-arrays layout with index-based handles for
//! cache-friendly traversal. The store always contains a root node; a node
//! is *on-stage* exactly when it is reachable from the root by parent links.
//!
//! # Dirty tracking
//!
//! Property mutations automatically mark the corresponding dirty channel
//! (see [`dirty`](crate::dirty)):
//!
//! - **TRANSFORM** / **COLOR** / **VISIBILITY** — propagate to all
//!   descendants, since the computed world values are inherited.
//! - **CONTENT** — local-only.
//! - **TOPOLOGY** — structural changes that trigger a traversal-order
//!   rebuild.

mod id;
mod modes;
mod store;
mod traverse;

pub use id::{INVALID, NodeId, TextureId};
pub use modes::{ColorMode, DrawMode, PositionInheritanceMode};
pub use store::{NodeStore, TreeError};
pub use traverse::Children;
