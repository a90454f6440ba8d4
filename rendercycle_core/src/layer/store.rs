// Copyright 2026 the Rendercycle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Struct-of-arrays paint layer storage with allocation, topology, and
//! invalidation flags.

use alloc::vec;
use alloc::vec::Vec;

use kurbo::Vec2;

use super::id::{INVALID, LayerId};
use super::traverse::{Children, Subtree};
use crate::cull_rect::{CullRect, CullRectConfig};
use crate::property::{PropertyChanges, PropertyTreeState, PropertyTrees, TransformId};

/// Which pair of invalidation flags an operation targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Flag {
    Repaint,
    CullRectUpdate,
}

/// Struct-of-arrays storage for all paint layers of a frame tree.
///
/// Layers are addressed by [`LayerId`] handles. Internally, each layer occupies
/// a slot in parallel arrays. Destroyed layers are recycled via a free list,
/// and generation counters prevent stale handle access.
///
/// Setting a `needs_*` flag also sets the matching `descendant_needs_*` flag
/// on every ancestor, so that walks can skip clean subtrees. Frames are
/// separate layer trees; their root layers have no parent here, and the link
/// to the owner layer in the parent frame is kept by the frame tree.
#[derive(Debug)]
pub struct LayerStore {
    // -- Topology --
    pub(crate) parent: Vec<u32>,
    pub(crate) first_child: Vec<u32>,
    pub(crate) next_sibling: Vec<u32>,
    pub(crate) prev_sibling: Vec<u32>,

    // -- Property tree states (set by callers) --
    pub(crate) local_state: Vec<PropertyTreeState>,
    pub(crate) contents_state: Vec<PropertyTreeState>,

    // -- Cull rects (written by the cull-rect updater) --
    pub(crate) cull_rect: Vec<Option<CullRect>>,
    pub(crate) contents_cull_rect: Vec<Option<CullRect>>,

    // -- Invalidation --
    pub(crate) needs_repaint: Vec<bool>,
    pub(crate) descendant_needs_repaint: Vec<bool>,
    pub(crate) needs_cull_rect_update: Vec<bool>,
    pub(crate) descendant_needs_cull_rect_update: Vec<bool>,

    // -- Allocation --
    pub(crate) generation: Vec<u32>,
    pub(crate) alive: Vec<bool>,
    pub(crate) free_list: Vec<u32>,
    pub(crate) len: u32,
}

impl Default for LayerStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LayerStore {
    /// Creates an empty layer store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            parent: Vec::new(),
            first_child: Vec::new(),
            next_sibling: Vec::new(),
            prev_sibling: Vec::new(),
            local_state: Vec::new(),
            contents_state: Vec::new(),
            cull_rect: Vec::new(),
            contents_cull_rect: Vec::new(),
            needs_repaint: Vec::new(),
            descendant_needs_repaint: Vec::new(),
            needs_cull_rect_update: Vec::new(),
            descendant_needs_cull_rect_update: Vec::new(),
            generation: Vec::new(),
            alive: Vec::new(),
            free_list: Vec::new(),
            len: 0,
        }
    }

    // -- Allocation API --

    /// Creates a new layer and returns its handle.
    ///
    /// `local` is the state the layer itself paints in; `contents` is the
    /// state its children and contents paint in (below its own clips and
    /// scroll translation). The layer starts without cull rects and needing
    /// both a cull-rect update and a repaint.
    pub fn create_layer(
        &mut self,
        local: PropertyTreeState,
        contents: PropertyTreeState,
    ) -> LayerId {
        let idx = if let Some(idx) = self.free_list.pop() {
            // Reuse a freed slot.
            let i = idx as usize;
            self.generation[i] += 1;
            self.parent[i] = INVALID;
            self.first_child[i] = INVALID;
            self.next_sibling[i] = INVALID;
            self.prev_sibling[i] = INVALID;
            self.local_state[i] = local;
            self.contents_state[i] = contents;
            self.cull_rect[i] = None;
            self.contents_cull_rect[i] = None;
            self.needs_repaint[i] = true;
            self.descendant_needs_repaint[i] = false;
            self.needs_cull_rect_update[i] = true;
            self.descendant_needs_cull_rect_update[i] = false;
            self.alive[i] = true;
            idx
        } else {
            // Allocate a new slot.
            let idx = self.len;
            self.len += 1;
            self.parent.push(INVALID);
            self.first_child.push(INVALID);
            self.next_sibling.push(INVALID);
            self.prev_sibling.push(INVALID);
            self.local_state.push(local);
            self.contents_state.push(contents);
            self.cull_rect.push(None);
            self.contents_cull_rect.push(None);
            self.needs_repaint.push(true);
            self.descendant_needs_repaint.push(false);
            self.needs_cull_rect_update.push(true);
            self.descendant_needs_cull_rect_update.push(false);
            self.generation.push(0);
            self.alive.push(true);
            idx
        };

        LayerId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    /// Destroys a layer, freeing its slot for reuse.
    ///
    /// The former parent is marked for repaint.
    ///
    /// # Panics
    ///
    /// Panics if the layer has children (remove them first) or if the handle
    /// is stale.
    pub fn destroy_layer(&mut self, id: LayerId) {
        self.validate(id);
        let idx = id.idx;
        assert!(
            self.first_child[idx as usize] == INVALID,
            "cannot destroy layer with children"
        );

        let p = self.parent[idx as usize];
        if p != INVALID {
            self.unlink_from_parent(idx);
            self.mark(p, Flag::Repaint);
        }

        // Bump generation so old handles immediately fail validation.
        self.generation[idx as usize] += 1;
        self.alive[idx as usize] = false;
        self.free_list.push(idx);
    }

    /// Returns whether the given handle refers to a live layer.
    #[must_use]
    pub fn is_alive(&self, id: LayerId) -> bool {
        id.idx < self.len
            && self.generation[id.idx as usize] == id.generation
            && self.alive[id.idx as usize]
    }

    /// Number of live layers.
    #[must_use]
    pub fn layer_count(&self) -> usize {
        self.alive.iter().filter(|alive| **alive).count()
    }

    // -- Topology API --

    /// Adds `child` as the last child of `parent`.
    ///
    /// The child is painted in a new context, so it needs a cull-rect update
    /// and a repaint; both are propagated to the new ancestors.
    ///
    /// # Panics
    ///
    /// Panics if either handle is stale, or if `child` already has a parent.
    pub fn add_child(&mut self, parent: LayerId, child: LayerId) {
        self.validate(parent);
        self.validate(child);
        let p = parent.idx;
        let c = child.idx;
        assert!(
            self.parent[c as usize] == INVALID,
            "child already has a parent"
        );

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

        self.mark(c, Flag::CullRectUpdate);
        self.mark(c, Flag::Repaint);
        if self.descendant_needs_repaint[c as usize] {
            self.mark_ancestors(c, Flag::Repaint);
        }
        if self.descendant_needs_cull_rect_update[c as usize] {
            self.mark_ancestors(c, Flag::CullRectUpdate);
        }
    }

    /// Removes `child` from its current parent, which is marked for repaint.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale or the layer has no parent.
    pub fn remove_from_parent(&mut self, child: LayerId) {
        self.validate(child);
        let c = child.idx;
        assert!(self.parent[c as usize] != INVALID, "layer has no parent");

        let p = self.parent[c as usize];
        self.unlink_from_parent(c);
        self.mark(p, Flag::Repaint);
    }

    /// Returns the parent of a layer, if any.
    #[must_use]
    pub fn parent(&self, id: LayerId) -> Option<LayerId> {
        self.validate(id);
        let p = self.parent[id.idx as usize];
        if p == INVALID {
            None
        } else {
            Some(LayerId {
                idx: p,
                generation: self.generation[p as usize],
            })
        }
    }

    /// Returns an iterator over the direct children of a layer.
    #[must_use]
    pub fn children(&self, id: LayerId) -> Children<'_> {
        self.validate(id);
        Children::new(self, self.first_child[id.idx as usize])
    }

    // -- Property tree states --

    /// Returns the state the layer paints in.
    #[must_use]
    pub fn local_state(&self, id: LayerId) -> PropertyTreeState {
        self.validate(id);
        self.local_state[id.idx as usize]
    }

    /// Returns the state the layer's contents and children paint in.
    #[must_use]
    pub fn contents_state(&self, id: LayerId) -> PropertyTreeState {
        self.validate(id);
        self.contents_state[id.idx as usize]
    }

    /// Sets the local state. Marks the layer for a cull-rect update if it
    /// changed.
    pub fn set_local_state(&mut self, id: LayerId, state: PropertyTreeState) {
        self.validate(id);
        let slot = &mut self.local_state[id.idx as usize];
        if *slot != state {
            *slot = state;
            self.mark(id.idx, Flag::CullRectUpdate);
        }
    }

    /// Sets the contents state. Marks the layer for a cull-rect update if it
    /// changed.
    pub fn set_contents_state(&mut self, id: LayerId, state: PropertyTreeState) {
        self.validate(id);
        let slot = &mut self.contents_state[id.idx as usize];
        if *slot != state {
            *slot = state;
            self.mark(id.idx, Flag::CullRectUpdate);
        }
    }

    /// Returns the scroll translation this layer scrolls its contents with,
    /// if its contents state sits below one that its local state does not.
    #[must_use]
    pub fn scroll_translation(&self, trees: &PropertyTrees, id: LayerId) -> Option<TransformId> {
        self.validate(id);
        self.scroll_translation_at(trees, id.idx)
    }

    pub(crate) fn scroll_translation_at(&self, trees: &PropertyTrees, idx: u32) -> Option<TransformId> {
        let local = self.local_state[idx as usize].transform;
        let contents = self.contents_state[idx as usize].transform;
        (contents != local && trees.scroll_node(contents).is_some()).then_some(contents)
    }

    // -- Cull rects --

    /// The cull rect in the local state, once computed.
    #[must_use]
    pub fn cull_rect(&self, id: LayerId) -> Option<CullRect> {
        self.validate(id);
        self.cull_rect[id.idx as usize]
    }

    /// The cull rect in the contents state, once computed.
    #[must_use]
    pub fn contents_cull_rect(&self, id: LayerId) -> Option<CullRect> {
        self.validate(id);
        self.contents_cull_rect[id.idx as usize]
    }

    // -- Repaint flags --

    /// Marks a layer as needing repaint.
    pub fn set_needs_repaint(&mut self, id: LayerId) {
        self.validate(id);
        self.mark(id.idx, Flag::Repaint);
    }

    /// Marks a layer and every layer below it as needing repaint.
    pub fn set_needs_repaint_recursively(&mut self, id: LayerId) {
        self.validate(id);
        let subtree: Vec<u32> = Subtree::new(self, id.idx).collect();
        for idx in subtree {
            self.needs_repaint[idx as usize] = true;
            if self.first_child[idx as usize] != INVALID {
                self.descendant_needs_repaint[idx as usize] = true;
            }
        }
        self.mark_ancestors(id.idx, Flag::Repaint);
    }

    /// Marks a layer as having a descendant that needs repaint, for content
    /// that lives outside this store's topology (a child frame).
    pub fn set_descendant_needs_repaint(&mut self, id: LayerId) {
        self.validate(id);
        self.descendant_needs_repaint[id.idx as usize] = true;
        self.mark_ancestors(id.idx, Flag::Repaint);
    }

    /// Whether the layer itself needs repaint.
    #[must_use]
    pub fn needs_repaint(&self, id: LayerId) -> bool {
        self.validate(id);
        self.needs_repaint[id.idx as usize]
    }

    /// Whether some layer below this one needs repaint.
    #[must_use]
    pub fn descendant_needs_repaint(&self, id: LayerId) -> bool {
        self.validate(id);
        self.descendant_needs_repaint[id.idx as usize]
    }

    /// Whether this layer or any layer below it needs repaint.
    #[must_use]
    pub fn self_or_descendant_needs_repaint(&self, id: LayerId) -> bool {
        self.validate(id);
        self.needs_repaint[id.idx as usize] || self.descendant_needs_repaint[id.idx as usize]
    }

    /// Clears both repaint flags on a layer and its whole subtree.
    pub fn clear_needs_repaint_recursively(&mut self, id: LayerId) {
        self.validate(id);
        let subtree: Vec<u32> = Subtree::new(self, id.idx).collect();
        for idx in subtree {
            self.needs_repaint[idx as usize] = false;
            self.descendant_needs_repaint[idx as usize] = false;
        }
    }

    // -- Cull-rect update flags --

    /// Marks a layer as needing its cull rects recomputed.
    pub fn set_needs_cull_rect_update(&mut self, id: LayerId) {
        self.validate(id);
        self.mark(id.idx, Flag::CullRectUpdate);
    }

    /// Marks a layer as having a descendant (possibly in a child frame) that
    /// needs its cull rects recomputed.
    pub fn set_descendant_needs_cull_rect_update(&mut self, id: LayerId) {
        self.validate(id);
        self.descendant_needs_cull_rect_update[id.idx as usize] = true;
        self.mark_ancestors(id.idx, Flag::CullRectUpdate);
    }

    /// Whether the layer's own cull rects are stale.
    #[must_use]
    pub fn needs_cull_rect_update(&self, id: LayerId) -> bool {
        self.validate(id);
        self.needs_cull_rect_update[id.idx as usize]
    }

    /// Whether some layer below this one has stale cull rects.
    #[must_use]
    pub fn descendant_needs_cull_rect_update(&self, id: LayerId) -> bool {
        self.validate(id);
        self.descendant_needs_cull_rect_update[id.idx as usize]
    }

    // -- Invalidation from property changes --

    /// Handles a scroll of the layer's contents by `delta`.
    ///
    /// Schedules a cull-rect update only if the current contents cull rect
    /// may no longer cover what the scroll exposes. Returns whether one was
    /// scheduled.
    pub fn did_scroll(
        &mut self,
        trees: &PropertyTrees,
        config: &CullRectConfig,
        id: LayerId,
        delta: Vec2,
    ) -> bool {
        self.validate(id);
        let Some(scroll_translation) = self.scroll_translation_at(trees, id.idx) else {
            return false;
        };
        self.did_scroll_at(trees, config, id.idx, scroll_translation, delta)
    }

    fn did_scroll_at(
        &mut self,
        trees: &PropertyTrees,
        config: &CullRectConfig,
        idx: u32,
        scroll_translation: TransformId,
        delta: Vec2,
    ) -> bool {
        let needs_update = match self.contents_cull_rect[idx as usize] {
            Some(contents) => {
                contents.has_scrolled_enough(trees, config, delta, scroll_translation)
            }
            // Never computed; the update is already pending.
            None => false,
        };
        if needs_update {
            self.mark(idx, Flag::CullRectUpdate);
        }
        needs_update
    }

    /// Marks every layer whose states reference a changed node for a
    /// cull-rect update. Scrolls only invalidate the scrolling layer, and
    /// only when [`did_scroll`](Self::did_scroll) would.
    ///
    /// Returns the number of layers newly marked.
    pub fn invalidate_for_property_changes(
        &mut self,
        trees: &PropertyTrees,
        config: &CullRectConfig,
        changes: &PropertyChanges,
    ) -> usize {
        if changes.is_empty() {
            return 0;
        }

        let mut transform_changed = vec![false; trees.transform_count()];
        for &t in &changes.transforms {
            transform_changed[t as usize] = true;
        }
        let mut clip_changed = vec![false; trees.clip_count()];
        for &c in &changes.clips {
            clip_changed[c as usize] = true;
        }

        let mut marked = 0;
        for idx in 0..self.len {
            let i = idx as usize;
            if !self.alive[i] || self.needs_cull_rect_update[i] {
                continue;
            }
            let local = self.local_state[i];
            let contents = self.contents_state[i];
            let stale = transform_changed[local.transform.index() as usize]
                || transform_changed[contents.transform.index() as usize]
                || clip_changed[local.clip.index() as usize]
                || clip_changed[contents.clip.index() as usize];
            if stale {
                self.mark(idx, Flag::CullRectUpdate);
                marked += 1;
            }
        }

        for &(scroll_translation, delta) in &changes.scrolls {
            for idx in 0..self.len {
                let i = idx as usize;
                if !self.alive[i]
                    || self.needs_cull_rect_update[i]
                    || self.contents_state[i].transform != scroll_translation
                    || self.local_state[i].transform == scroll_translation
                {
                    continue;
                }
                if self.did_scroll_at(trees, config, idx, scroll_translation, delta) {
                    marked += 1;
                }
            }
        }
        marked
    }

    // -- Raw-index accessors --
    //
    // These accept raw slot indices (as found in trace events) rather than
    // `LayerId` handles, skipping generation validation.

    /// Returns the cull rect at raw slot `idx`.
    ///
    /// # Panics
    ///
    /// Panics if `idx >= self.len`.
    #[must_use]
    pub fn cull_rect_at(&self, idx: u32) -> Option<CullRect> {
        assert!(
            idx < self.len,
            "slot index {idx} out of range (len {})",
            self.len
        );
        self.cull_rect[idx as usize]
    }

    /// Returns the contents cull rect at raw slot `idx`.
    ///
    /// # Panics
    ///
    /// Panics if `idx >= self.len`.
    #[must_use]
    pub fn contents_cull_rect_at(&self, idx: u32) -> Option<CullRect> {
        assert!(
            idx < self.len,
            "slot index {idx} out of range (len {})",
            self.len
        );
        self.contents_cull_rect[idx as usize]
    }

    // -- Internal helpers --

    /// Panics if the handle is stale.
    pub(crate) fn validate(&self, id: LayerId) {
        assert!(
            id.idx < self.len && self.generation[id.idx as usize] == id.generation,
            "stale LayerId: {id:?} (current gen: {})",
            if id.idx < self.len {
                self.generation[id.idx as usize]
            } else {
                u32::MAX
            }
        );
    }

    /// Marks every scrolling layer in the subtree of `root` for a cull-rect
    /// update. Returns how many were marked.
    pub(crate) fn invalidate_scrollers(&mut self, trees: &PropertyTrees, root: LayerId) -> usize {
        self.validate(root);
        let scrollers: Vec<u32> = Subtree::new(self, root.idx)
            .filter(|&idx| self.scroll_translation_at(trees, idx).is_some())
            .collect();
        for &idx in &scrollers {
            self.mark(idx, Flag::CullRectUpdate);
        }
        scrollers.len()
    }

    pub(crate) fn mark_repaint_at(&mut self, idx: u32) {
        self.mark(idx, Flag::Repaint);
    }

    /// Sets the `needs_*` flag on `idx` and the descendant flag above it.
    fn mark(&mut self, idx: u32, flag: Flag) {
        match flag {
            Flag::Repaint => self.needs_repaint[idx as usize] = true,
            Flag::CullRectUpdate => self.needs_cull_rect_update[idx as usize] = true,
        }
        self.mark_ancestors(idx, flag);
    }

    /// Sets the descendant flag on every ancestor of `idx`, stopping at the
    /// first one that already has it.
    fn mark_ancestors(&mut self, idx: u32, flag: Flag) {
        let descendant = match flag {
            Flag::Repaint => &mut self.descendant_needs_repaint,
            Flag::CullRectUpdate => &mut self.descendant_needs_cull_rect_update,
        };
        let mut p = self.parent[idx as usize];
        while p != INVALID && !descendant[p as usize] {
            descendant[p as usize] = true;
            p = self.parent[p as usize];
        }
    }

    /// Removes `idx` from its parent's child list.
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
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use kurbo::Rect;

    use super::*;
    use crate::geometry::PixelRect;
    use crate::property::ScrollNode;
    use crate::transform::Transform3d;

    fn root() -> PropertyTreeState {
        PropertyTreeState::ROOT
    }

    fn clean(store: &mut LayerStore, id: LayerId) {
        store.clear_needs_repaint_recursively(id);
        let subtree: Vec<u32> = Subtree::new(store, id.idx).collect();
        for idx in subtree {
            store.needs_cull_rect_update[idx as usize] = false;
            store.descendant_needs_cull_rect_update[idx as usize] = false;
        }
    }

    #[test]
    fn create_and_destroy() {
        let mut store = LayerStore::new();
        let id = store.create_layer(root(), root());
        assert!(store.is_alive(id));
        assert_eq!(store.layer_count(), 1);
        store.destroy_layer(id);
        assert!(!store.is_alive(id));
        assert_eq!(store.layer_count(), 0);
    }

    #[test]
    fn generation_prevents_stale_access() {
        let mut store = LayerStore::new();
        let id1 = store.create_layer(root(), root());
        store.destroy_layer(id1);
        let id2 = store.create_layer(root(), root());
        // id2 reuses the same slot but has a different generation.
        assert!(!store.is_alive(id1));
        assert!(store.is_alive(id2));
        assert_eq!(id1.idx, id2.idx);
        assert_ne!(id1.generation, id2.generation);
    }

    #[test]
    fn new_layers_need_everything() {
        let mut store = LayerStore::new();
        let id = store.create_layer(root(), root());
        assert!(store.needs_repaint(id));
        assert!(store.needs_cull_rect_update(id));
        assert_eq!(store.cull_rect(id), None);
        assert_eq!(store.contents_cull_rect(id), None);
    }

    #[test]
    fn add_child_and_query() {
        let mut store = LayerStore::new();
        let parent = store.create_layer(root(), root());
        let a = store.create_layer(root(), root());
        let b = store.create_layer(root(), root());

        store.add_child(parent, a);
        store.add_child(parent, b);

        assert_eq!(store.parent(a), Some(parent));
        let kids: Vec<_> = store.children(parent).collect();
        assert_eq!(kids, vec![a, b]);
        assert!(store.descendant_needs_repaint(parent));
        assert!(store.descendant_needs_cull_rect_update(parent));
    }

    #[test]
    fn remove_from_parent_marks_old_parent() {
        let mut store = LayerStore::new();
        let parent = store.create_layer(root(), root());
        let child = store.create_layer(root(), root());
        store.add_child(parent, child);
        clean(&mut store, parent);

        store.remove_from_parent(child);
        assert_eq!(store.parent(child), None);
        assert!(store.children(parent).next().is_none());
        assert!(store.needs_repaint(parent), "removed content must be repainted");
    }

    #[test]
    fn repaint_propagates_to_ancestors_only() {
        let mut store = LayerStore::new();
        let a = store.create_layer(root(), root());
        let b = store.create_layer(root(), root());
        let c = store.create_layer(root(), root());
        let sibling = store.create_layer(root(), root());
        store.add_child(a, b);
        store.add_child(b, c);
        store.add_child(a, sibling);
        clean(&mut store, a);

        store.set_needs_repaint(c);
        assert!(store.needs_repaint(c));
        assert!(!store.needs_repaint(b));
        assert!(store.descendant_needs_repaint(b));
        assert!(store.descendant_needs_repaint(a));
        assert!(store.self_or_descendant_needs_repaint(a));
        assert!(!store.self_or_descendant_needs_repaint(sibling));
    }

    #[test]
    fn repaint_recursively_then_clear() {
        let mut store = LayerStore::new();
        let a = store.create_layer(root(), root());
        let b = store.create_layer(root(), root());
        let c = store.create_layer(root(), root());
        store.add_child(a, b);
        store.add_child(b, c);
        clean(&mut store, a);

        store.set_needs_repaint_recursively(b);
        assert!(store.needs_repaint(b));
        assert!(store.needs_repaint(c));
        assert!(!store.needs_repaint(a));
        assert!(store.descendant_needs_repaint(a));

        store.clear_needs_repaint_recursively(a);
        for id in [a, b, c] {
            assert!(!store.self_or_descendant_needs_repaint(id), "{id:?} still dirty");
        }
    }

    #[test]
    fn unchanged_state_does_not_invalidate() {
        let mut store = LayerStore::new();
        let id = store.create_layer(root(), root());
        clean(&mut store, id);
        store.set_local_state(id, root());
        assert!(!store.needs_cull_rect_update(id));

        let mut trees = PropertyTrees::new();
        let t = trees.create_transform(TransformId::ROOT, Transform3d::from_translation(1.0, 0.0, 0.0));
        store.set_contents_state(id, PropertyTreeState::new(t, root().clip, root().effect));
        assert!(store.needs_cull_rect_update(id));
    }

    #[test]
    fn property_changes_invalidate_referencing_layers() {
        let mut trees = PropertyTrees::new();
        let moved = trees.create_transform(TransformId::ROOT, Transform3d::IDENTITY);
        let still = trees.create_transform(TransformId::ROOT, Transform3d::IDENTITY);
        let _ = trees.evaluate();

        let mut store = LayerStore::new();
        let state = |t| PropertyTreeState::new(t, root().clip, root().effect);
        let top = store.create_layer(root(), root());
        let a = store.create_layer(state(moved), state(moved));
        let b = store.create_layer(state(still), state(still));
        store.add_child(top, a);
        store.add_child(top, b);
        clean(&mut store, top);

        trees.set_local_transform(moved, Transform3d::from_translation(5.0, 0.0, 0.0));
        let changes = trees.evaluate();
        let config = CullRectConfig::new();
        let marked = store.invalidate_for_property_changes(&trees, &config, &changes);

        assert_eq!(marked, 1);
        assert!(store.needs_cull_rect_update(a));
        assert!(!store.needs_cull_rect_update(b));
        assert!(store.descendant_needs_cull_rect_update(top));
    }

    #[test]
    fn small_scrolls_keep_expanded_contents_cull_rect() {
        let mut trees = PropertyTrees::new();
        let scroll = ScrollNode::new(
            PixelRect::new(0, 0, 100, 100),
            PixelRect::new(0, 0, 100, 10_000),
        );
        let st = trees.create_scroll_translation(TransformId::ROOT, scroll);
        let clip = trees.create_clip(
            crate::property::ClipId::ROOT,
            TransformId::ROOT,
            Some(Rect::new(0.0, 0.0, 100.0, 100.0)),
        );
        let _ = trees.evaluate();

        let mut store = LayerStore::new();
        let contents = PropertyTreeState::new(st, clip, root().effect);
        let scroller = store.create_layer(root(), contents);
        assert_eq!(store.scroll_translation(&trees, scroller), Some(st));
        store.contents_cull_rect[scroller.idx as usize] =
            Some(CullRect::new(PixelRect::new(0, 0, 100, 4100)));
        clean(&mut store, scroller);

        let config = CullRectConfig::new();
        trees.set_scroll_offset(st, Vec2::new(0.0, 100.0));
        let changes = trees.evaluate();
        assert_eq!(store.invalidate_for_property_changes(&trees, &config, &changes), 0);
        assert!(!store.needs_cull_rect_update(scroller));

        assert!(store.did_scroll(&trees, &config, scroller, Vec2::new(0.0, 3000.0)));
        assert!(store.needs_cull_rect_update(scroller));
    }

    #[test]
    fn raw_accessors_match_handles() {
        let mut store = LayerStore::new();
        let id = store.create_layer(root(), root());
        store.cull_rect[id.idx as usize] = Some(CullRect::INFINITE);
        assert_eq!(store.cull_rect_at(id.index()), store.cull_rect(id));
        assert_eq!(store.contents_cull_rect_at(id.index()), None);
    }

    #[test]
    #[should_panic(expected = "cannot destroy layer with children")]
    fn destroy_with_children_panics() {
        let mut store = LayerStore::new();
        let parent = store.create_layer(root(), root());
        let child = store.create_layer(root(), root());
        store.add_child(parent, child);
        store.destroy_layer(parent);
    }

    #[test]
    #[should_panic(expected = "stale LayerId")]
    fn destroyed_handle_panics_on_set_needs_repaint() {
        let mut store = LayerStore::new();
        let id = store.create_layer(root(), root());
        store.destroy_layer(id);
        store.set_needs_repaint(id);
    }

    #[test]
    #[should_panic(expected = "stale LayerId")]
    fn destroyed_handle_panics_on_add_child() {
        let mut store = LayerStore::new();
        let top = store.create_layer(root(), root());
        let id = store.create_layer(root(), root());
        store.destroy_layer(id);
        store.add_child(top, id);
    }

    #[test]
    #[should_panic(expected = "slot index 3 out of range")]
    fn raw_accessor_out_of_range_panics() {
        let store = LayerStore::new();
        let _ = store.cull_rect_at(3);
    }
}
