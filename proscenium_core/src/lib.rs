// Copyright 2026 the Proscenium Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Update core for a retained-mode 2-D/3-D scene graph.
//!
//! `proscenium_core` provides the per-frame machinery that turns property
//! writes, constraints, and render-task configuration into an immutable
//! committed scene snapshot plus a scheduling decision. It is `no_std`
//! compatible (with `alloc`) and uses array-based struct-of-arrays storage
//! with index handles for cache-friendly traversal.
//!
//! # Architecture
//!
//! The crate is organized around a single-threaded update pass that runs to
//! completion once per frame:
//!
//! ```text
//!   setters ──► base slots (pending)          RenderTaskList
//!       │                                          │
//!       ▼                                          ▼
//!   Stage::update() ── commit ── constraints ── compose ── schedule
//!       │                                          │
//!       ▼                                          ▼
//!   FrameEvents (changed/staged/completed)    draws + finished
//! ```
//!
//! **[`property`]** — Double-buffered property storage. Every animatable
//! property has a pending `base` slot (written by setters and visible
//! immediately) and a committed `current` slot (overwritten from `base` once
//! per frame, read by composition and rendering).
//!
//! **[`node`]** — Struct-of-arrays scene-node tree with generational
//! handles. Local properties are set by the caller; world position,
//! rotation, scale, color, and visibility are computed by the update pass.
//!
//! **[`constraint`]** — Pure functions recomputing one property from other
//! properties' committed values, with a timed linear activation ramp and
//! one-shot completion notification.
//!
//! **[`stage`]** — The update-pass driver: commit, constraint evaluation,
//! root-to-leaf world composition, and render-task scheduling, in that
//! strict order.
//!
//! **[`task`]** — Render-task list with per-task refresh policies (every
//! frame, every Nth frame, exactly once), drawability gates, exclusive
//! sub-tree claims, and fence-gated completion.
//!
//! **[`hit`]** — Stateless hit-test traversal over a render task's camera
//! and source sub-tree, honoring overlay ordering, clipping, sensitivity,
//! and near/far planes.
//!
//! **[`dirty`]** — Multi-channel dirty tracking via `understory_dirty`.
//! TRANSFORM, COLOR, and VISIBILITY propagate to descendants; CONTENT is
//! local-only; TOPOLOGY triggers a traversal rebuild.
//!
//! **[`backend`]** — The [`FenceProvider`](backend::FenceProvider) trait
//! that GPU backends implement for non-blocking sync-object polling.
//!
//! **[`trace`]** — [`TraceSink`](trace::TraceSink) trait and event types
//! for frame-loop instrumentation, with zero-overhead
//! [`Tracer`](trace::Tracer) wrapper.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one
//!   branch per call site).
//! - `trace-rich` (disabled by default, implies `trace`): Gates per-node
//!   world-change events.

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod backend;
pub mod camera;
pub mod constraint;
pub mod dirty;
pub mod hit;
pub mod math;
pub mod node;
pub mod property;
pub mod resource;
pub mod signal;
pub mod stage;
pub mod task;
pub mod trace;
