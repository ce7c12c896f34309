// Copyright 2026 the Proscenium Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Constraints: pure functions recomputing one property from others.
//!
//! A constraint binds a target `(node, property)` pair to a pure function of
//! one or more source `(node, property)` snapshots. Sources are always read
//! from committed `current` values — never pending `base` values — so
//! evaluation order between constraints cannot change results within one
//! frame.
//!
//! # Apply-time ramp
//!
//! Each constraint carries a window `[delay, delay + duration)` measured in
//! seconds of elapsed evaluation time. The apply weight ramps linearly from
//! 0 at `delay` to 1 at `delay + duration` and is clamped outside the
//! window. The constraint's output is blended between the property's
//! pre-constraint committed value and the function result by that weight.
//! Once the weight first reaches 1, a completion notification fires exactly
//! once (edge-triggered); it never re-fires.
//!
//! # Pausing and failure
//!
//! A constraint whose target is off-stage is paused: it is not evaluated
//! and its ramp clock does not advance until the target is staged again.
//! A constraint whose source (or target) node has been destroyed
//! contributes nothing that frame but stays registered — never fatal.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;

use crate::node::{NodeId, NodeStore};
use crate::property::{PropertyIndex, PropertyValue};

/// The pure function at the heart of a constraint.
///
/// Receives the committed values of the constraint's sources, in
/// declaration order, and returns the new value for the target property.
pub type ConstraintFn = Box<dyn Fn(&[PropertyValue]) -> PropertyValue>;

/// A handle to an applied constraint.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConstraintId(pub(crate) u32);

impl fmt::Debug for ConstraintId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConstraintId({})", self.0)
    }
}

/// A rejected constraint operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConstraintError {
    /// The handle was never issued by [`ConstraintSet::apply`].
    #[error("constraint handle was never applied")]
    Unknown,
}

/// A constraint descriptor, built by the caller and handed to
/// [`ConstraintSet::apply`].
pub struct Constraint {
    target: NodeId,
    target_property: PropertyIndex,
    sources: Vec<(NodeId, PropertyIndex)>,
    func: ConstraintFn,
    delay: f32,
    duration: f32,
}

impl Constraint {
    /// Creates a constraint on `target`'s `property`, applied immediately at
    /// full weight (no ramp).
    #[must_use]
    pub fn new(
        target: NodeId,
        property: PropertyIndex,
        func: impl Fn(&[PropertyValue]) -> PropertyValue + 'static,
    ) -> Self {
        Self {
            target,
            target_property: property,
            sources: Vec::new(),
            func: Box::new(func),
            delay: 0.0,
            duration: 0.0,
        }
    }

    /// Adds a source snapshot passed to the function on every evaluation.
    #[must_use]
    pub fn with_source(mut self, node: NodeId, property: PropertyIndex) -> Self {
        self.sources.push((node, property));
        self
    }

    /// Sets the apply-time window: weight 0 until `delay` seconds of
    /// evaluation time, ramping linearly to 1 at `delay + duration`.
    #[must_use]
    pub fn with_time_window(mut self, delay: f32, duration: f32) -> Self {
        self.delay = delay;
        self.duration = duration;
        self
    }
}

impl fmt::Debug for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constraint")
            .field("target", &self.target)
            .field("target_property", &self.target_property)
            .field("sources", &self.sources)
            .field("delay", &self.delay)
            .field("duration", &self.duration)
            .finish_non_exhaustive()
    }
}

struct Entry {
    id: ConstraintId,
    constraint: Constraint,
    /// Seconds of evaluation time accumulated while the target was staged.
    elapsed: f32,
    /// Completion notification already fired.
    completed: bool,
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("id", &self.id)
            .field("elapsed", &self.elapsed)
            .field("completed", &self.completed)
            .finish_non_exhaustive()
    }
}

/// The ordered list of active constraints for one stage.
///
/// Constraints are evaluated in declaration order, at most once per frame
/// each. Declaration order is sufficient for determinism because sources
/// are read from `current` values only.
#[derive(Debug, Default)]
pub struct ConstraintSet {
    entries: Vec<Entry>,
    next_id: u32,
}

impl ConstraintSet {
    /// Creates an empty constraint set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_id: 0,
        }
    }

    /// Registers a constraint and returns its handle.
    pub fn apply(&mut self, constraint: Constraint) -> ConstraintId {
        let id = ConstraintId(self.next_id);
        self.next_id += 1;
        self.entries.push(Entry {
            id,
            constraint,
            elapsed: 0.0,
            completed: false,
        });
        id
    }

    /// Removes a single constraint by handle.
    ///
    /// Removing a handle that was already removed is a silent no-op.
    ///
    /// # Errors
    ///
    /// [`ConstraintError::Unknown`] if the handle was never issued by this
    /// set.
    pub fn remove(&mut self, id: ConstraintId) -> Result<(), ConstraintError> {
        if id.0 >= self.next_id {
            return Err(ConstraintError::Unknown);
        }
        self.entries.retain(|e| e.id != id);
        Ok(())
    }

    /// Removes every constraint targeting `node`.
    ///
    /// Constraints targeting other nodes are untouched, including ones on
    /// the same property index.
    pub fn remove_for_target(&mut self, node: NodeId) {
        self.entries.retain(|e| e.constraint.target != node);
    }

    /// Number of registered constraints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Evaluates all constraints in declaration order against the store's
    /// committed values, advancing ramp clocks by `dt` seconds.
    ///
    /// Constraint outputs are written directly to `current` slots (they
    /// must not be re-committed from a stale `base`), and the affected
    /// channels are marked dirty so the composition step recomputes world
    /// values. Completion edges are appended to `completed`.
    pub(crate) fn evaluate(
        &mut self,
        store: &mut NodeStore,
        dt: f32,
        completed: &mut Vec<ConstraintId>,
    ) {
        for entry in &mut self.entries {
            let c = &entry.constraint;

            // Destroyed or off-stage target: paused, clock frozen.
            if !store.is_alive(c.target) || !store.is_on_stage(c.target) {
                continue;
            }
            // A destroyed source skips this frame without advancing.
            if c.sources.iter().any(|&(node, _)| !store.is_alive(node)) {
                continue;
            }

            let weight = apply_weight(entry.elapsed, c.delay, c.duration);

            let mut snapshots = Vec::with_capacity(c.sources.len());
            for &(node, property) in &c.sources {
                snapshots.push(store.current_property(node, property));
            }

            let pre = store.current_property(c.target, c.target_property);
            let result = (c.func)(&snapshots);
            let blended = PropertyValue::blend(pre, result, weight);
            let target_idx = c.target.index();
            if store.write_current_property(target_idx, c.target_property, blended) {
                store.mark_property_dirty(target_idx, c.target_property);
            } else {
                debug_assert!(false, "constraint output type mismatch");
                continue;
            }

            if weight >= 1.0 && !entry.completed {
                entry.completed = true;
                completed.push(entry.id);
            }

            entry.elapsed += dt;
        }
    }
}

/// Linear apply-weight ramp: 0 at `delay`, 1 at `delay + duration`, clamped
/// outside the window.
///
/// A non-positive duration is a step function at `delay`.
fn apply_weight(elapsed: f32, delay: f32, duration: f32) -> f32 {
    if duration <= 0.0 {
        if elapsed >= delay { 1.0 } else { 0.0 }
    } else {
        ((elapsed - delay) / duration).clamp(0.0, 1.0)
    }
}
