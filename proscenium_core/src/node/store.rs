// Copyright 2026 the Proscenium Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Struct-of-arrays node storage with allocation, topology, staging, and
//! property management.

use alloc::string::String;
use alloc::vec::Vec;

use understory_dirty::{CycleHandling, DirtyTracker, EagerPolicy};

use crate::dirty;
use crate::math::{Color, Quaternion, Vector3};
use crate::property::{PropertyBank, PropertyIndex, PropertyValue};

use super::id::{INVALID, NodeId, TextureId};
use super::modes::{ColorMode, DrawMode, PositionInheritanceMode};
use super::traverse::Children;

/// A rejected tree operation.
///
/// These are caller contract violations: the operation is refused
/// synchronously and no state changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    /// A node cannot be made its own parent.
    #[error("a node cannot be its own parent")]
    SelfParent,
    /// The operation would make a node an ancestor of itself.
    #[error("operation would create a cycle in the tree")]
    Cycle,
    /// The root node cannot be reparented, reordered, or destroyed.
    #[error("the root node cannot be reparented or removed")]
    Root,
    /// The node already has a parent.
    #[error("node already has a parent")]
    HasParent,
    /// The node has no parent.
    #[error("node has no parent")]
    NoParent,
    /// The supplied value does not match the property's type.
    #[error("value type does not match the property")]
    TypeMismatch,
}

/// Struct-of-arrays storage for all scene nodes.
///
/// Nodes are addressed by [`NodeId`] handles. Internally, each node occupies
/// a slot in parallel arrays. Destroyed nodes are recycled via a free list,
/// and generation counters prevent stale handle access.
///
/// The store always contains a root node (created by [`new`](Self::new)); a
/// node is *on-stage* exactly when it is reachable from the root by parent
/// links.
#[derive(Debug)]
pub struct NodeStore {
    // -- Topology --
    pub(crate) parent: Vec<u32>,
    pub(crate) first_child: Vec<u32>,
    pub(crate) next_sibling: Vec<u32>,
    pub(crate) prev_sibling: Vec<u32>,

    // -- Double-buffered properties (base written by callers,
    //    current committed by the update pass) --
    pub(crate) parent_origin: PropertyBank<Vector3>,
    pub(crate) anchor_point: PropertyBank<Vector3>,
    pub(crate) size: PropertyBank<Vector3>,
    pub(crate) position: PropertyBank<Vector3>,
    pub(crate) rotation: PropertyBank<Quaternion>,
    pub(crate) scale: PropertyBank<Vector3>,
    pub(crate) color: PropertyBank<Color>,
    pub(crate) visible: PropertyBank<bool>,
    pub(crate) sensitive: PropertyBank<bool>,
    pub(crate) draw_mode: PropertyBank<DrawMode>,
    pub(crate) color_mode: PropertyBank<ColorMode>,
    pub(crate) position_mode: PropertyBank<PositionInheritanceMode>,
    pub(crate) inherit_rotation: PropertyBank<bool>,
    pub(crate) inherit_scale: PropertyBank<bool>,

    // -- Content configuration (single-slot) --
    pub(crate) name: Vec<Option<String>>,
    pub(crate) texture: Vec<Option<TextureId>>,
    pub(crate) clips_children: Vec<bool>,
    pub(crate) consumes_touch: Vec<bool>,

    // -- Computed properties (written by the update pass) --
    pub(crate) world_position: Vec<Vector3>,
    pub(crate) world_rotation: Vec<Quaternion>,
    pub(crate) world_scale: Vec<Vector3>,
    pub(crate) world_color: Vec<Color>,
    pub(crate) world_visible: Vec<bool>,

    // -- Staging --
    pub(crate) on_stage: Vec<bool>,
    root: u32,

    // -- Allocation --
    pub(crate) generation: Vec<u32>,
    pub(crate) free_list: Vec<u32>,
    pub(crate) len: u32,

    // -- Dirty tracking --
    pub(crate) dirty: DirtyTracker<u32>,

    // -- Traversal cache --
    pub(crate) traversal_order: Vec<u32>,
    pub(crate) traversal_dirty: bool,

    // -- Lifecycle tracking --
    pub(crate) pending_added: Vec<u32>,
    pub(crate) pending_removed: Vec<u32>,
    // Staging transitions in notification order: parent-before-child on
    // attach, child-before-parent on detach. Handles are captured at
    // transition time, so destroy-driven off-stage entries are already
    // stale by the time they are dispatched.
    pub(crate) pending_staged: Vec<NodeId>,
    pub(crate) pending_unstaged: Vec<NodeId>,
}

impl Default for NodeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeStore {
    /// Creates a store containing only the root node.
    #[must_use]
    pub fn new() -> Self {
        let mut store = Self {
            parent: Vec::new(),
            first_child: Vec::new(),
            next_sibling: Vec::new(),
            prev_sibling: Vec::new(),
            parent_origin: PropertyBank::new(Vector3::CENTER),
            anchor_point: PropertyBank::new(Vector3::CENTER),
            size: PropertyBank::new(Vector3::ZERO),
            position: PropertyBank::new(Vector3::ZERO),
            rotation: PropertyBank::new(Quaternion::IDENTITY),
            scale: PropertyBank::new(Vector3::ONE),
            color: PropertyBank::new(Color::WHITE),
            visible: PropertyBank::new(true),
            sensitive: PropertyBank::new(true),
            draw_mode: PropertyBank::new(DrawMode::Normal),
            color_mode: PropertyBank::new(ColorMode::UseOwnMultiplyParentAlpha),
            position_mode: PropertyBank::new(PositionInheritanceMode::Inherit),
            inherit_rotation: PropertyBank::new(true),
            inherit_scale: PropertyBank::new(true),
            name: Vec::new(),
            texture: Vec::new(),
            clips_children: Vec::new(),
            consumes_touch: Vec::new(),
            world_position: Vec::new(),
            world_rotation: Vec::new(),
            world_scale: Vec::new(),
            world_color: Vec::new(),
            world_visible: Vec::new(),
            on_stage: Vec::new(),
            root: 0,
            generation: Vec::new(),
            free_list: Vec::new(),
            len: 0,
            dirty: DirtyTracker::with_cycle_handling(CycleHandling::Error),
            traversal_order: Vec::new(),
            traversal_dirty: true,
            pending_added: Vec::new(),
            pending_removed: Vec::new(),
            pending_staged: Vec::new(),
            pending_unstaged: Vec::new(),
        };
        let root = store.create_node();
        store.root = root.idx;
        store.on_stage[root.idx as usize] = true;
        store.pending_staged.push(root);
        store
    }

    /// Returns the root node.
    ///
    /// The root is always on-stage and cannot be reparented or destroyed.
    #[must_use]
    pub fn root(&self) -> NodeId {
        NodeId {
            idx: self.root,
            generation: self.generation[self.root as usize],
        }
    }

    // -- Allocation API --

    /// Creates a new node and returns its handle.
    ///
    /// The node starts detached (off-stage) with default property values:
    /// centered parent-origin and anchor, zero size and position, identity
    /// rotation, unit scale, opaque white color, visible and sensitive.
    pub fn create_node(&mut self) -> NodeId {
        let idx = if let Some(idx) = self.free_list.pop() {
            // Reuse a freed slot.
            self.generation[idx as usize] += 1;
            self.parent[idx as usize] = INVALID;
            self.first_child[idx as usize] = INVALID;
            self.next_sibling[idx as usize] = INVALID;
            self.prev_sibling[idx as usize] = INVALID;
            self.reset_properties(idx);
            idx
        } else {
            // Allocate a new slot.
            let idx = self.len;
            self.len += 1;
            self.parent.push(INVALID);
            self.first_child.push(INVALID);
            self.next_sibling.push(INVALID);
            self.prev_sibling.push(INVALID);
            self.parent_origin.push();
            self.anchor_point.push();
            self.size.push();
            self.position.push();
            self.rotation.push();
            self.scale.push();
            self.color.push();
            self.visible.push();
            self.sensitive.push();
            self.draw_mode.push();
            self.color_mode.push();
            self.position_mode.push();
            self.inherit_rotation.push();
            self.inherit_scale.push();
            self.name.push(None);
            self.texture.push(None);
            self.clips_children.push(false);
            self.consumes_touch.push(false);
            self.world_position.push(Vector3::ZERO);
            self.world_rotation.push(Quaternion::IDENTITY);
            self.world_scale.push(Vector3::ONE);
            self.world_color.push(Color::WHITE);
            self.world_visible.push(true);
            self.on_stage.push(false);
            self.generation.push(0);
            idx
        };

        self.traversal_dirty = true;
        self.pending_added.push(idx);
        self.dirty.mark(idx, dirty::TOPOLOGY);

        NodeId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    /// Destroys a node and its entire subtree, freeing the slots for reuse.
    ///
    /// Children never outlive their parent's ownership: the whole subtree is
    /// released in one operation, with off-stage notifications recorded
    /// child-before-parent.
    ///
    /// # Errors
    ///
    /// [`TreeError::Root`] if `id` is the root node.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    pub fn destroy_node(&mut self, id: NodeId) -> Result<(), TreeError> {
        self.validate(id);
        if id.idx == self.root {
            return Err(TreeError::Root);
        }

        // Collect the subtree children-first so that staging notifications
        // and slot release run child-before-parent.
        let mut subtree = Vec::new();
        self.collect_postorder(id.idx, &mut subtree);

        if self.parent[id.idx as usize] != INVALID {
            let p = self.parent[id.idx as usize];
            self.unlink_from_parent(id.idx);
            self.remove_inherited_deps(id.idx, p);
            self.dirty.mark(p, dirty::TOPOLOGY);
        }

        for &idx in &subtree {
            if self.on_stage[idx as usize] {
                self.on_stage[idx as usize] = false;
                self.pending_unstaged.push(NodeId {
                    idx,
                    generation: self.generation[idx as usize],
                });
            }
        }
        for &idx in &subtree {
            self.dirty.remove_key(idx);
            self.generation[idx as usize] += 1;
            self.free_list.push(idx);
            self.pending_removed.push(idx);
            // Detach interior links so recycled slots start clean.
            self.parent[idx as usize] = INVALID;
            self.first_child[idx as usize] = INVALID;
            self.next_sibling[idx as usize] = INVALID;
            self.prev_sibling[idx as usize] = INVALID;
        }

        self.traversal_dirty = true;
        Ok(())
    }

    /// Returns whether the given handle refers to a live node.
    #[must_use]
    pub fn is_alive(&self, id: NodeId) -> bool {
        (id.idx < self.len)
            && self.generation[id.idx as usize] == id.generation
            && !self.free_list.contains(&id.idx)
    }

    /// Returns whether the node is reachable from the root by parent links.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    #[must_use]
    pub fn is_on_stage(&self, id: NodeId) -> bool {
        self.validate(id);
        self.on_stage[id.idx as usize]
    }

    // -- Topology API --

    /// Adds `child` as the last child of `parent`.
    ///
    /// If `child` already has a different parent it is moved. Adding a node
    /// to its current parent is a no-op. On-stage transitions for the
    /// child's subtree are recorded parent-before-child.
    ///
    /// # Errors
    ///
    /// - [`TreeError::SelfParent`] if `parent == child`.
    /// - [`TreeError::Root`] if `child` is the root node.
    /// - [`TreeError::Cycle`] if `child` is an ancestor of `parent`.
    ///
    /// No state changes on error.
    ///
    /// # Panics
    ///
    /// Panics if either handle is stale.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        self.validate(parent);
        self.validate(child);
        if parent.idx == child.idx {
            return Err(TreeError::SelfParent);
        }
        if child.idx == self.root {
            return Err(TreeError::Root);
        }
        if self.is_ancestor_of(child.idx, parent.idx) {
            return Err(TreeError::Cycle);
        }
        if self.parent[child.idx as usize] == parent.idx {
            // Redundant add: already a child of this parent.
            return Ok(());
        }

        if self.parent[child.idx as usize] != INVALID {
            let old_p = self.parent[child.idx as usize];
            self.unlink_from_parent(child.idx);
            self.remove_inherited_deps(child.idx, old_p);
            self.dirty.mark(old_p, dirty::TOPOLOGY);
        }

        self.link_last(parent.idx, child.idx);
        self.add_inherited_deps(child.idx, parent.idx);
        self.update_subtree_staging(child.idx, self.on_stage[parent.idx as usize]);
        self.mark_subtree_inherited_dirty(child.idx);
        self.traversal_dirty = true;
        self.dirty.mark(parent.idx, dirty::TOPOLOGY);
        Ok(())
    }

    /// Removes `child` from `parent`.
    ///
    /// Removing a node that is not currently a child of `parent` is a
    /// silent no-op. Off-stage transitions for the child's subtree are
    /// recorded child-before-parent.
    ///
    /// # Errors
    ///
    /// [`TreeError::Root`] if `child` is the root node.
    ///
    /// # Panics
    ///
    /// Panics if either handle is stale.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        self.validate(parent);
        self.validate(child);
        if child.idx == self.root {
            return Err(TreeError::Root);
        }
        if self.parent[child.idx as usize] != parent.idx {
            // Redundant remove: not a child of this parent.
            return Ok(());
        }

        self.unlink_from_parent(child.idx);
        self.remove_inherited_deps(child.idx, parent.idx);
        self.update_subtree_staging(child.idx, false);
        self.mark_subtree_inherited_dirty(child.idx);
        self.traversal_dirty = true;
        self.dirty.mark(parent.idx, dirty::TOPOLOGY);
        Ok(())
    }

    /// Inserts `child` before `sibling` in the sibling list.
    ///
    /// # Errors
    ///
    /// - [`TreeError::HasParent`] if `child` already has a parent.
    /// - [`TreeError::NoParent`] if `sibling` has no parent.
    /// - [`TreeError::Root`] if `child` is the root node.
    /// - [`TreeError::Cycle`] if `child` is an ancestor of `sibling`.
    ///
    /// # Panics
    ///
    /// Panics if either handle is stale.
    pub fn insert_before(&mut self, child: NodeId, sibling: NodeId) -> Result<(), TreeError> {
        self.validate(child);
        self.validate(sibling);
        if child.idx == self.root {
            return Err(TreeError::Root);
        }
        if self.parent[child.idx as usize] != INVALID {
            return Err(TreeError::HasParent);
        }
        let p = self.parent[sibling.idx as usize];
        if p == INVALID {
            return Err(TreeError::NoParent);
        }
        if child.idx == p || self.is_ancestor_of(child.idx, p) {
            return Err(TreeError::Cycle);
        }

        let c = child.idx;
        let s = sibling.idx;
        self.parent[c as usize] = p;
        self.next_sibling[c as usize] = s;
        self.prev_sibling[c as usize] = self.prev_sibling[s as usize];
        if self.prev_sibling[s as usize] != INVALID {
            self.next_sibling[self.prev_sibling[s as usize] as usize] = c;
        } else {
            // `sibling` was the first child.
            self.first_child[p as usize] = c;
        }
        self.prev_sibling[s as usize] = c;

        self.add_inherited_deps(c, p);
        self.update_subtree_staging(c, self.on_stage[p as usize]);
        self.mark_subtree_inherited_dirty(c);
        self.traversal_dirty = true;
        self.dirty.mark(p, dirty::TOPOLOGY);
        Ok(())
    }

    /// Moves a node to the end of its parent's child list (drawn last, on
    /// top of its siblings).
    ///
    /// # Errors
    ///
    /// [`TreeError::NoParent`] if the node has no parent.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    pub fn raise_to_top(&mut self, id: NodeId) -> Result<(), TreeError> {
        self.validate(id);
        let p = self.parent[id.idx as usize];
        if p == INVALID {
            return Err(TreeError::NoParent);
        }
        self.unlink_from_parent(id.idx);
        self.link_last(p, id.idx);
        self.traversal_dirty = true;
        self.dirty.mark(p, dirty::TOPOLOGY);
        Ok(())
    }

    /// Moves a node to the front of its parent's child list (drawn first,
    /// below its siblings).
    ///
    /// # Errors
    ///
    /// [`TreeError::NoParent`] if the node has no parent.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    pub fn lower_to_bottom(&mut self, id: NodeId) -> Result<(), TreeError> {
        self.validate(id);
        let p = self.parent[id.idx as usize];
        if p == INVALID {
            return Err(TreeError::NoParent);
        }
        self.unlink_from_parent(id.idx);

        let c = id.idx;
        let old_first = self.first_child[p as usize];
        self.parent[c as usize] = p;
        self.next_sibling[c as usize] = old_first;
        self.prev_sibling[c as usize] = INVALID;
        if old_first != INVALID {
            self.prev_sibling[old_first as usize] = c;
        }
        self.first_child[p as usize] = c;

        self.traversal_dirty = true;
        self.dirty.mark(p, dirty::TOPOLOGY);
        Ok(())
    }

    /// Returns the parent of a node, if any.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.validate(id);
        let p = self.parent[id.idx as usize];
        if p == INVALID {
            None
        } else {
            Some(NodeId {
                idx: p,
                generation: self.generation[p as usize],
            })
        }
    }

    /// Returns an iterator over the direct children of a node.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    #[must_use]
    pub fn children(&self, id: NodeId) -> Children<'_> {
        self.validate(id);
        Children::new(self, self.first_child[id.idx as usize])
    }

    /// Searches the on-stage tree depth-first for a node with the given
    /// name. Names are not unique; the first match in traversal order wins.
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        self.find_in(self.root, name).map(|idx| NodeId {
            idx,
            generation: self.generation[idx as usize],
        })
    }

    fn find_in(&self, idx: u32, name: &str) -> Option<u32> {
        if self.name[idx as usize].as_deref() == Some(name) {
            return Some(idx);
        }
        let mut child = self.first_child[idx as usize];
        while child != INVALID {
            if let Some(found) = self.find_in(child, name) {
                return Some(found);
            }
            child = self.next_sibling[child as usize];
        }
        None
    }

    // -- Property setters (write `base`, auto-mark dirty) --

    /// Sets the pending parent-origin (relative to the parent's rect).
    pub fn set_parent_origin(&mut self, id: NodeId, v: Vector3) {
        self.validate(id);
        self.parent_origin.set_base(id.idx, v);
        self.dirty.mark_with(id.idx, dirty::TRANSFORM, &EagerPolicy);
    }

    /// Sets the pending anchor point (relative to the node's own rect).
    pub fn set_anchor_point(&mut self, id: NodeId, v: Vector3) {
        self.validate(id);
        self.anchor_point.set_base(id.idx, v);
        self.dirty.mark_with(id.idx, dirty::TRANSFORM, &EagerPolicy);
    }

    /// Sets the pending size.
    pub fn set_size(&mut self, id: NodeId, v: Vector3) {
        self.validate(id);
        self.size.set_base(id.idx, v);
        self.dirty.mark_with(id.idx, dirty::TRANSFORM, &EagerPolicy);
    }

    /// Sets the pending position.
    pub fn set_position(&mut self, id: NodeId, v: Vector3) {
        self.validate(id);
        self.position.set_base(id.idx, v);
        self.dirty.mark_with(id.idx, dirty::TRANSFORM, &EagerPolicy);
    }

    /// Sets the pending rotation.
    pub fn set_rotation(&mut self, id: NodeId, q: Quaternion) {
        self.validate(id);
        self.rotation.set_base(id.idx, q);
        self.dirty.mark_with(id.idx, dirty::TRANSFORM, &EagerPolicy);
    }

    /// Sets the pending scale.
    pub fn set_scale(&mut self, id: NodeId, v: Vector3) {
        self.validate(id);
        self.scale.set_base(id.idx, v);
        self.dirty.mark_with(id.idx, dirty::TRANSFORM, &EagerPolicy);
    }

    /// Sets the pending color. Local colors are not clamped.
    pub fn set_color(&mut self, id: NodeId, c: Color) {
        self.validate(id);
        self.color.set_base(id.idx, c);
        self.dirty.mark_with(id.idx, dirty::COLOR, &EagerPolicy);
    }

    /// Sets the pending visibility flag.
    pub fn set_visible(&mut self, id: NodeId, v: bool) {
        self.validate(id);
        self.visible.set_base(id.idx, v);
        self.dirty.mark_with(id.idx, dirty::VISIBILITY, &EagerPolicy);
    }

    /// Sets the pending sensitivity flag (hit-test participation).
    pub fn set_sensitive(&mut self, id: NodeId, v: bool) {
        self.validate(id);
        self.sensitive.set_base(id.idx, v);
        self.dirty.mark(id.idx, dirty::CONTENT);
    }

    /// Sets the pending draw mode.
    pub fn set_draw_mode(&mut self, id: NodeId, mode: DrawMode) {
        self.validate(id);
        self.draw_mode.set_base(id.idx, mode);
        self.dirty.mark(id.idx, dirty::CONTENT);
    }

    /// Sets the pending color mode.
    pub fn set_color_mode(&mut self, id: NodeId, mode: ColorMode) {
        self.validate(id);
        self.color_mode.set_base(id.idx, mode);
        self.dirty.mark_with(id.idx, dirty::COLOR, &EagerPolicy);
    }

    /// Sets the pending position-inheritance mode.
    pub fn set_position_inheritance(&mut self, id: NodeId, mode: PositionInheritanceMode) {
        self.validate(id);
        self.position_mode.set_base(id.idx, mode);
        self.dirty.mark_with(id.idx, dirty::TRANSFORM, &EagerPolicy);
    }

    /// Sets whether the node inherits its parent's world rotation.
    pub fn set_inherit_rotation(&mut self, id: NodeId, inherit: bool) {
        self.validate(id);
        self.inherit_rotation.set_base(id.idx, inherit);
        self.dirty.mark_with(id.idx, dirty::TRANSFORM, &EagerPolicy);
    }

    /// Sets whether the node inherits its parent's world scale.
    pub fn set_inherit_scale(&mut self, id: NodeId, inherit: bool) {
        self.validate(id);
        self.inherit_scale.set_base(id.idx, inherit);
        self.dirty.mark_with(id.idx, dirty::TRANSFORM, &EagerPolicy);
    }

    // -- Content configuration (immediate, not buffered) --

    /// Sets or clears the node's name.
    pub fn set_name(&mut self, id: NodeId, name: Option<String>) {
        self.validate(id);
        self.name[id.idx as usize] = name;
    }

    /// Sets or clears the node's texture content.
    pub fn set_texture(&mut self, id: NodeId, texture: Option<TextureId>) {
        self.validate(id);
        self.texture[id.idx as usize] = texture;
        self.dirty.mark(id.idx, dirty::CONTENT);
    }

    /// Sets whether descendants are clipped to this node's rect.
    pub fn set_clips_children(&mut self, id: NodeId, clips: bool) {
        self.validate(id);
        self.clips_children[id.idx as usize] = clips;
        self.dirty.mark(id.idx, dirty::CONTENT);
    }

    /// Sets whether this node consumes touch for its whole subtree.
    ///
    /// Hit testing stops descending at a consuming node and reports the
    /// node itself.
    pub fn set_consumes_touch(&mut self, id: NodeId, consumes: bool) {
        self.validate(id);
        self.consumes_touch[id.idx as usize] = consumes;
        self.dirty.mark(id.idx, dirty::CONTENT);
    }

    // -- Property getters --

    /// Returns the pending parent-origin.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale (all getters below share this
    /// contract).
    #[must_use]
    pub fn parent_origin(&self, id: NodeId) -> Vector3 {
        self.validate(id);
        self.parent_origin.base(id.idx)
    }

    /// Returns the pending anchor point.
    #[must_use]
    pub fn anchor_point(&self, id: NodeId) -> Vector3 {
        self.validate(id);
        self.anchor_point.base(id.idx)
    }

    /// Returns the pending size.
    #[must_use]
    pub fn size(&self, id: NodeId) -> Vector3 {
        self.validate(id);
        self.size.base(id.idx)
    }

    /// Returns the pending position.
    #[must_use]
    pub fn position(&self, id: NodeId) -> Vector3 {
        self.validate(id);
        self.position.base(id.idx)
    }

    /// Returns the committed position.
    #[must_use]
    pub fn current_position(&self, id: NodeId) -> Vector3 {
        self.validate(id);
        self.position.current(id.idx)
    }

    /// Returns the pending rotation.
    #[must_use]
    pub fn rotation(&self, id: NodeId) -> Quaternion {
        self.validate(id);
        self.rotation.base(id.idx)
    }

    /// Returns the committed rotation.
    #[must_use]
    pub fn current_rotation(&self, id: NodeId) -> Quaternion {
        self.validate(id);
        self.rotation.current(id.idx)
    }

    /// Returns the pending scale.
    #[must_use]
    pub fn scale(&self, id: NodeId) -> Vector3 {
        self.validate(id);
        self.scale.base(id.idx)
    }

    /// Returns the committed scale.
    #[must_use]
    pub fn current_scale(&self, id: NodeId) -> Vector3 {
        self.validate(id);
        self.scale.current(id.idx)
    }

    /// Returns the pending color.
    #[must_use]
    pub fn color(&self, id: NodeId) -> Color {
        self.validate(id);
        self.color.base(id.idx)
    }

    /// Returns the committed color.
    #[must_use]
    pub fn current_color(&self, id: NodeId) -> Color {
        self.validate(id);
        self.color.current(id.idx)
    }

    /// Returns the pending visibility flag.
    #[must_use]
    pub fn visible(&self, id: NodeId) -> bool {
        self.validate(id);
        self.visible.base(id.idx)
    }

    /// Returns the committed visibility flag.
    #[must_use]
    pub fn current_visible(&self, id: NodeId) -> bool {
        self.validate(id);
        self.visible.current(id.idx)
    }

    /// Returns the pending sensitivity flag.
    #[must_use]
    pub fn sensitive(&self, id: NodeId) -> bool {
        self.validate(id);
        self.sensitive.base(id.idx)
    }

    /// Returns the pending draw mode.
    #[must_use]
    pub fn draw_mode(&self, id: NodeId) -> DrawMode {
        self.validate(id);
        self.draw_mode.base(id.idx)
    }

    /// Returns the node's name, if set.
    #[must_use]
    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.validate(id);
        self.name[id.idx as usize].as_deref()
    }

    /// Returns the node's texture content, if set.
    #[must_use]
    pub fn texture(&self, id: NodeId) -> Option<TextureId> {
        self.validate(id);
        self.texture[id.idx as usize]
    }

    /// Returns a pending property by index (the generic form of the typed
    /// getters above).
    #[must_use]
    pub fn property(&self, id: NodeId, index: PropertyIndex) -> PropertyValue {
        self.validate(id);
        self.property_at(id.idx, index, false)
    }

    /// Returns a committed property by index.
    #[must_use]
    pub fn current_property(&self, id: NodeId, index: PropertyIndex) -> PropertyValue {
        self.validate(id);
        self.property_at(id.idx, index, true)
    }

    /// Writes a pending property by index.
    ///
    /// # Errors
    ///
    /// [`TreeError::TypeMismatch`] if the value's type does not match the
    /// property.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    pub fn set_property(
        &mut self,
        id: NodeId,
        index: PropertyIndex,
        value: PropertyValue,
    ) -> Result<(), TreeError> {
        self.validate(id);
        match (index, value) {
            (PropertyIndex::ParentOrigin, PropertyValue::Vector3(v)) => {
                self.set_parent_origin(id, v);
            }
            (PropertyIndex::AnchorPoint, PropertyValue::Vector3(v)) => {
                self.set_anchor_point(id, v);
            }
            (PropertyIndex::Size, PropertyValue::Vector3(v)) => self.set_size(id, v),
            (PropertyIndex::Position, PropertyValue::Vector3(v)) => self.set_position(id, v),
            (PropertyIndex::Rotation, PropertyValue::Quaternion(q)) => self.set_rotation(id, q),
            (PropertyIndex::Scale, PropertyValue::Vector3(v)) => self.set_scale(id, v),
            (PropertyIndex::Color, PropertyValue::Color(c)) => self.set_color(id, c),
            (PropertyIndex::Visible, PropertyValue::Bool(b)) => self.set_visible(id, b),
            (PropertyIndex::Sensitive, PropertyValue::Bool(b)) => self.set_sensitive(id, b),
            (PropertyIndex::DrawMode, PropertyValue::DrawMode(m)) => self.set_draw_mode(id, m),
            (PropertyIndex::ColorMode, PropertyValue::ColorMode(m)) => self.set_color_mode(id, m),
            (PropertyIndex::PositionInheritance, PropertyValue::PositionInheritance(m)) => {
                self.set_position_inheritance(id, m);
            }
            (PropertyIndex::InheritRotation, PropertyValue::Bool(b)) => {
                self.set_inherit_rotation(id, b);
            }
            (PropertyIndex::InheritScale, PropertyValue::Bool(b)) => self.set_inherit_scale(id, b),
            _ => return Err(TreeError::TypeMismatch),
        }
        Ok(())
    }

    // -- Computed property getters --

    /// Returns the computed world position.
    ///
    /// Only valid after the update pass has run.
    #[must_use]
    pub fn world_position(&self, id: NodeId) -> Vector3 {
        self.validate(id);
        self.world_position[id.idx as usize]
    }

    /// Returns the computed world rotation.
    #[must_use]
    pub fn world_rotation(&self, id: NodeId) -> Quaternion {
        self.validate(id);
        self.world_rotation[id.idx as usize]
    }

    /// Returns the computed world scale.
    #[must_use]
    pub fn world_scale(&self, id: NodeId) -> Vector3 {
        self.validate(id);
        self.world_scale[id.idx as usize]
    }

    /// Returns the computed world color, clamped to `[0, 1]` per channel.
    #[must_use]
    pub fn world_color(&self, id: NodeId) -> Color {
        self.validate(id);
        self.world_color[id.idx as usize]
    }

    /// Returns the computed effective visibility (including ancestors).
    #[must_use]
    pub fn world_visible(&self, id: NodeId) -> bool {
        self.validate(id);
        self.world_visible[id.idx as usize]
    }

    // -- Raw-index accessors for backends --
    //
    // These accept raw slot indices (as found in `FrameEvents` or
    // `traversal_order()`) rather than `NodeId` handles, skipping generation
    // validation. Only use with indices that came from those sources.

    /// Reconstructs the handle for the node at raw slot `idx`.
    ///
    /// # Panics
    ///
    /// Panics if `idx >= self.len` (all `*_at` accessors share this
    /// contract).
    #[must_use]
    pub fn id_at(&self, idx: u32) -> NodeId {
        self.check_slot(idx);
        NodeId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    /// Returns the computed world position at raw slot `idx`.
    #[must_use]
    pub fn world_position_at(&self, idx: u32) -> Vector3 {
        self.check_slot(idx);
        self.world_position[idx as usize]
    }

    /// Returns the computed world rotation at raw slot `idx`.
    #[must_use]
    pub fn world_rotation_at(&self, idx: u32) -> Quaternion {
        self.check_slot(idx);
        self.world_rotation[idx as usize]
    }

    /// Returns the computed world scale at raw slot `idx`.
    #[must_use]
    pub fn world_scale_at(&self, idx: u32) -> Vector3 {
        self.check_slot(idx);
        self.world_scale[idx as usize]
    }

    /// Returns the computed world color at raw slot `idx`.
    #[must_use]
    pub fn world_color_at(&self, idx: u32) -> Color {
        self.check_slot(idx);
        self.world_color[idx as usize]
    }

    /// Returns the computed effective visibility at raw slot `idx`.
    #[must_use]
    pub fn world_visible_at(&self, idx: u32) -> bool {
        self.check_slot(idx);
        self.world_visible[idx as usize]
    }

    /// Returns the committed size at raw slot `idx`.
    #[must_use]
    pub fn size_at(&self, idx: u32) -> Vector3 {
        self.check_slot(idx);
        self.size.current(idx)
    }

    /// Returns the committed anchor point at raw slot `idx`.
    #[must_use]
    pub fn anchor_point_at(&self, idx: u32) -> Vector3 {
        self.check_slot(idx);
        self.anchor_point.current(idx)
    }

    /// Returns the committed draw mode at raw slot `idx`.
    #[must_use]
    pub fn draw_mode_at(&self, idx: u32) -> DrawMode {
        self.check_slot(idx);
        self.draw_mode.current(idx)
    }

    /// Returns the committed sensitivity flag at raw slot `idx`.
    #[must_use]
    pub fn sensitive_at(&self, idx: u32) -> bool {
        self.check_slot(idx);
        self.sensitive.current(idx)
    }

    /// Returns the texture content at raw slot `idx`.
    #[must_use]
    pub fn texture_at(&self, idx: u32) -> Option<TextureId> {
        self.check_slot(idx);
        self.texture[idx as usize]
    }

    /// Returns whether the node at raw slot `idx` clips its descendants.
    #[must_use]
    pub fn clips_children_at(&self, idx: u32) -> bool {
        self.check_slot(idx);
        self.clips_children[idx as usize]
    }

    /// Returns whether the node at raw slot `idx` consumes touch.
    #[must_use]
    pub fn consumes_touch_at(&self, idx: u32) -> bool {
        self.check_slot(idx);
        self.consumes_touch[idx as usize]
    }

    /// Returns whether the node at raw slot `idx` is on-stage.
    #[must_use]
    pub fn on_stage_at(&self, idx: u32) -> bool {
        self.check_slot(idx);
        self.on_stage[idx as usize]
    }

    /// Returns the parent slot of raw slot `idx`, or [`INVALID`].
    #[must_use]
    pub fn parent_at(&self, idx: u32) -> u32 {
        self.check_slot(idx);
        self.parent[idx as usize]
    }

    /// Returns the current traversal order (depth-first pre-order).
    ///
    /// Only valid after the update pass has run at least once.
    #[must_use]
    pub fn traversal_order(&self) -> &[u32] {
        &self.traversal_order
    }

    // -- Internal: commit, composition, traversal --

    pub(crate) fn slot_count(&self) -> u32 {
        self.len
    }

    /// Commits all transform-group pending values at `idx`.
    pub(crate) fn commit_transform_at(&mut self, idx: u32) {
        self.parent_origin.commit(idx);
        self.anchor_point.commit(idx);
        self.size.commit(idx);
        self.position.commit(idx);
        self.rotation.commit(idx);
        self.scale.commit(idx);
        self.position_mode.commit(idx);
        self.inherit_rotation.commit(idx);
        self.inherit_scale.commit(idx);
    }

    /// Commits the color-group pending values at `idx`.
    pub(crate) fn commit_color_at(&mut self, idx: u32) {
        self.color.commit(idx);
        self.color_mode.commit(idx);
    }

    /// Commits the visibility pending value at `idx`.
    pub(crate) fn commit_visibility_at(&mut self, idx: u32) {
        self.visible.commit(idx);
    }

    /// Commits the content-group pending values at `idx`.
    pub(crate) fn commit_content_at(&mut self, idx: u32) {
        self.sensitive.commit(idx);
        self.draw_mode.commit(idx);
    }

    /// Recomputes the world values at `idx` from its committed locals and
    /// its parent's already-computed world values.
    ///
    /// The caller must visit parents before children (the cached traversal
    /// order guarantees this).
    pub(crate) fn compose_world_at(&mut self, idx: u32) {
        let p = self.parent[idx as usize];
        let (parent_pos, parent_rot, parent_scale, parent_color, parent_visible, parent_size) =
            if p != INVALID {
                (
                    self.world_position[p as usize],
                    self.world_rotation[p as usize],
                    self.world_scale[p as usize],
                    self.world_color[p as usize],
                    self.world_visible[p as usize],
                    self.size.current(p),
                )
            } else {
                (
                    Vector3::ZERO,
                    Quaternion::IDENTITY,
                    Vector3::ONE,
                    Color::WHITE,
                    true,
                    Vector3::ZERO,
                )
            };

        let local_scale = self.scale.current(idx);
        let world_scale = if self.inherit_scale.current(idx) {
            parent_scale.mul_elem(local_scale)
        } else {
            local_scale
        };

        let local_rot = self.rotation.current(idx);
        let world_rot = if self.inherit_rotation.current(idx) {
            parent_rot * local_rot
        } else {
            local_rot
        };

        let local_pos = self.position.current(idx);
        let origin_offset = parent_rot.rotate(
            parent_scale.mul_elem(
                (self.parent_origin.current(idx) - Vector3::CENTER).mul_elem(parent_size),
            ),
        );
        let local_in_parent = parent_rot.rotate(parent_scale.mul_elem(local_pos));
        let world_pos = self.position_mode.current(idx).compose(
            parent_pos,
            origin_offset,
            local_in_parent,
            local_pos,
        );

        let world_color = self
            .color_mode
            .current(idx)
            .compose(self.color.current(idx), parent_color)
            .clamped();

        self.world_position[idx as usize] = world_pos;
        self.world_rotation[idx as usize] = world_rot;
        self.world_scale[idx as usize] = world_scale;
        self.world_color[idx as usize] = world_color;
        self.world_visible[idx as usize] = parent_visible && self.visible.current(idx);
    }

    /// Reads a property at a raw slot, from `current` or `base`.
    fn property_at(&self, idx: u32, index: PropertyIndex, current: bool) -> PropertyValue {
        macro_rules! read {
            ($bank:ident, $variant:ident) => {
                if current {
                    PropertyValue::$variant(self.$bank.current(idx))
                } else {
                    PropertyValue::$variant(self.$bank.base(idx))
                }
            };
        }
        match index {
            PropertyIndex::ParentOrigin => read!(parent_origin, Vector3),
            PropertyIndex::AnchorPoint => read!(anchor_point, Vector3),
            PropertyIndex::Size => read!(size, Vector3),
            PropertyIndex::Position => read!(position, Vector3),
            PropertyIndex::Rotation => read!(rotation, Quaternion),
            PropertyIndex::Scale => read!(scale, Vector3),
            PropertyIndex::Color => read!(color, Color),
            PropertyIndex::Visible => read!(visible, Bool),
            PropertyIndex::Sensitive => read!(sensitive, Bool),
            PropertyIndex::DrawMode => read!(draw_mode, DrawMode),
            PropertyIndex::ColorMode => read!(color_mode, ColorMode),
            PropertyIndex::PositionInheritance => read!(position_mode, PositionInheritance),
            PropertyIndex::InheritRotation => read!(inherit_rotation, Bool),
            PropertyIndex::InheritScale => read!(inherit_scale, Bool),
        }
    }

    /// Overwrites a committed property directly (constraint output path).
    ///
    /// Returns `false` on a type mismatch without writing.
    pub(crate) fn write_current_property(
        &mut self,
        idx: u32,
        index: PropertyIndex,
        value: PropertyValue,
    ) -> bool {
        match (index, value) {
            (PropertyIndex::ParentOrigin, PropertyValue::Vector3(v)) => {
                self.parent_origin.write_current(idx, v);
            }
            (PropertyIndex::AnchorPoint, PropertyValue::Vector3(v)) => {
                self.anchor_point.write_current(idx, v);
            }
            (PropertyIndex::Size, PropertyValue::Vector3(v)) => self.size.write_current(idx, v),
            (PropertyIndex::Position, PropertyValue::Vector3(v)) => {
                self.position.write_current(idx, v);
            }
            (PropertyIndex::Rotation, PropertyValue::Quaternion(q)) => {
                self.rotation.write_current(idx, q);
            }
            (PropertyIndex::Scale, PropertyValue::Vector3(v)) => self.scale.write_current(idx, v),
            (PropertyIndex::Color, PropertyValue::Color(c)) => self.color.write_current(idx, c),
            (PropertyIndex::Visible, PropertyValue::Bool(b)) => self.visible.write_current(idx, b),
            (PropertyIndex::Sensitive, PropertyValue::Bool(b)) => {
                self.sensitive.write_current(idx, b);
            }
            (PropertyIndex::DrawMode, PropertyValue::DrawMode(m)) => {
                self.draw_mode.write_current(idx, m);
            }
            (PropertyIndex::ColorMode, PropertyValue::ColorMode(m)) => {
                self.color_mode.write_current(idx, m);
            }
            (PropertyIndex::PositionInheritance, PropertyValue::PositionInheritance(m)) => {
                self.position_mode.write_current(idx, m);
            }
            (PropertyIndex::InheritRotation, PropertyValue::Bool(b)) => {
                self.inherit_rotation.write_current(idx, b);
            }
            (PropertyIndex::InheritScale, PropertyValue::Bool(b)) => {
                self.inherit_scale.write_current(idx, b);
            }
            _ => return false,
        }
        true
    }

    /// Marks the channel for a constraint-written property dirty with eager
    /// propagation, so the following composition step recomputes the target
    /// and its descendants.
    pub(crate) fn mark_property_dirty(&mut self, idx: u32, index: PropertyIndex) {
        let channel = match index {
            PropertyIndex::Color | PropertyIndex::ColorMode => dirty::COLOR,
            PropertyIndex::Visible => dirty::VISIBILITY,
            PropertyIndex::Sensitive | PropertyIndex::DrawMode => dirty::CONTENT,
            _ => dirty::TRANSFORM,
        };
        self.dirty.mark_with(idx, channel, &EagerPolicy);
    }

    /// Rebuilds the depth-first pre-order traversal of all live nodes.
    pub(crate) fn rebuild_traversal_order(&mut self) {
        self.traversal_order.clear();
        for idx in 0..self.len {
            if self.parent[idx as usize] == INVALID && !self.free_list.contains(&idx) {
                self.dfs_collect(idx);
            }
        }
        self.traversal_dirty = false;
    }

    pub(crate) fn take_staging_events(
        &mut self,
        staged: &mut Vec<NodeId>,
        unstaged: &mut Vec<NodeId>,
    ) {
        staged.append(&mut self.pending_staged);
        unstaged.append(&mut self.pending_unstaged);
    }

    /// Depth-first pre-order collection starting from `idx`.
    fn dfs_collect(&mut self, idx: u32) {
        self.traversal_order.push(idx);
        let mut child = self.first_child[idx as usize];
        while child != INVALID {
            self.dfs_collect(child);
            child = self.next_sibling[child as usize];
        }
    }

    // -- Internal helpers --

    /// Panics if the handle is stale.
    fn validate(&self, id: NodeId) {
        assert!(
            id.idx < self.len && self.generation[id.idx as usize] == id.generation,
            "stale NodeId: {id:?} (current gen: {})",
            if id.idx < self.len {
                self.generation[id.idx as usize]
            } else {
                u32::MAX
            }
        );
    }

    /// Panics if a raw slot index is out of range.
    fn check_slot(&self, idx: u32) {
        assert!(
            idx < self.len,
            "slot index {idx} out of range (len {})",
            self.len
        );
    }

    /// Restores a recycled slot's properties to their defaults.
    fn reset_properties(&mut self, idx: u32) {
        self.parent_origin.reset(idx);
        self.anchor_point.reset(idx);
        self.size.reset(idx);
        self.position.reset(idx);
        self.rotation.reset(idx);
        self.scale.reset(idx);
        self.color.reset(idx);
        self.visible.reset(idx);
        self.sensitive.reset(idx);
        self.draw_mode.reset(idx);
        self.color_mode.reset(idx);
        self.position_mode.reset(idx);
        self.inherit_rotation.reset(idx);
        self.inherit_scale.reset(idx);
        self.name[idx as usize] = None;
        self.texture[idx as usize] = None;
        self.clips_children[idx as usize] = false;
        self.consumes_touch[idx as usize] = false;
        self.world_position[idx as usize] = Vector3::ZERO;
        self.world_rotation[idx as usize] = Quaternion::IDENTITY;
        self.world_scale[idx as usize] = Vector3::ONE;
        self.world_color[idx as usize] = Color::WHITE;
        self.world_visible[idx as usize] = true;
        self.on_stage[idx as usize] = false;
    }

    /// Whether `a` is an ancestor of `b` (or `a == b`).
    fn is_ancestor_of(&self, a: u32, b: u32) -> bool {
        let mut cursor = b;
        while cursor != INVALID {
            if cursor == a {
                return true;
            }
            cursor = self.parent[cursor as usize];
        }
        false
    }

    /// Links `c` as the last child of `p` without touching dirty state.
    fn link_last(&mut self, p: u32, c: u32) {
        self.parent[c as usize] = p;
        self.prev_sibling[c as usize] = INVALID;
        self.next_sibling[c as usize] = INVALID;

        if self.first_child[p as usize] == INVALID {
            self.first_child[p as usize] = c;
        } else {
            // Walk to last child.
            let mut last = self.first_child[p as usize];
            while self.next_sibling[last as usize] != INVALID {
                last = self.next_sibling[last as usize];
            }
            self.next_sibling[last as usize] = c;
            self.prev_sibling[c as usize] = last;
        }
    }

    /// Removes `idx` from its parent's child list without touching dirty
    /// state.
    fn unlink_from_parent(&mut self, idx: u32) {
        let p = self.parent[idx as usize];
        let prev = self.prev_sibling[idx as usize];
        let next = self.next_sibling[idx as usize];

        if prev != INVALID {
            self.next_sibling[prev as usize] = next;
        } else {
            // Was first child.
            self.first_child[p as usize] = next;
        }

        if next != INVALID {
            self.prev_sibling[next as usize] = prev;
        }

        self.parent[idx as usize] = INVALID;
        self.prev_sibling[idx as usize] = INVALID;
        self.next_sibling[idx as usize] = INVALID;
    }

    fn add_inherited_deps(&mut self, c: u32, p: u32) {
        let _ = self.dirty.add_dependency(c, p, dirty::TRANSFORM);
        let _ = self.dirty.add_dependency(c, p, dirty::COLOR);
        let _ = self.dirty.add_dependency(c, p, dirty::VISIBILITY);
    }

    fn remove_inherited_deps(&mut self, c: u32, p: u32) {
        self.dirty.remove_dependency(c, p, dirty::TRANSFORM);
        self.dirty.remove_dependency(c, p, dirty::COLOR);
        self.dirty.remove_dependency(c, p, dirty::VISIBILITY);
    }

    /// Marks the subtree rooted at `idx` dirty for inherited channels.
    fn mark_subtree_inherited_dirty(&mut self, idx: u32) {
        self.dirty.mark_with(idx, dirty::TRANSFORM, &EagerPolicy);
        self.dirty.mark_with(idx, dirty::COLOR, &EagerPolicy);
        self.dirty.mark_with(idx, dirty::VISIBILITY, &EagerPolicy);
    }

    /// Sets the on-stage flag for the subtree rooted at `idx`, recording
    /// transitions: pre-order (parent-before-child) when staging, post-order
    /// (child-before-parent) when unstaging.
    fn update_subtree_staging(&mut self, idx: u32, staged: bool) {
        if staged {
            self.stage_preorder(idx);
        } else {
            self.unstage_postorder(idx);
        }
    }

    fn stage_preorder(&mut self, idx: u32) {
        if !self.on_stage[idx as usize] {
            self.on_stage[idx as usize] = true;
            self.pending_staged.push(NodeId {
                idx,
                generation: self.generation[idx as usize],
            });
        }
        let mut child = self.first_child[idx as usize];
        while child != INVALID {
            self.stage_preorder(child);
            child = self.next_sibling[child as usize];
        }
    }

    fn unstage_postorder(&mut self, idx: u32) {
        let mut child = self.first_child[idx as usize];
        while child != INVALID {
            self.unstage_postorder(child);
            child = self.next_sibling[child as usize];
        }
        if self.on_stage[idx as usize] {
            self.on_stage[idx as usize] = false;
            self.pending_unstaged.push(NodeId {
                idx,
                generation: self.generation[idx as usize],
            });
        }
    }

    fn collect_postorder(&self, idx: u32, out: &mut Vec<u32>) {
        let mut child = self.first_child[idx as usize];
        while child != INVALID {
            self.collect_postorder(child, out);
            child = self.next_sibling[child as usize];
        }
        out.push(idx);
    }
}
