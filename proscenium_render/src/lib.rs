// Copyright 2026 the Proscenium Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Render-plan definitions for the proscenium scene-graph core.
//!
//! This crate provides the intermediate representation between
//! [`proscenium_core`]'s update pass and backend-specific rendering. It
//! defines:
//!
//! - [`RenderItem`] — a single draw command with resolved world values
//! - [`RenderPlan`] — the ordered draw commands for one render task
//! - [`build_plan`] / [`build_plans`] — plan construction from the core's
//!   per-task draw ordering
//!
//! Backends translate plans into native compositor operations or GPU draw
//! calls; they read committed state only and never mutate it.

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

mod plan;

pub use plan::{RenderItem, RenderPlan, build_plan, build_plans};
