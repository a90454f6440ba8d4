// Copyright 2026 the Rendercycle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Top-down cull-rect propagation through the layer tree.

use alloc::vec;
use alloc::vec::Vec;

use super::LayerId;
use super::id::INVALID;
use super::store::LayerStore;
use crate::cull_rect::{CullRect, CullRectConfig};
use crate::property::{PropertyTreeState, PropertyTrees};
use crate::trace::Tracer;

/// Recomputes cull rects for the layers that need it.
///
/// A layer's cull rect is its parent's contents cull rect mapped into the
/// layer's local state; its contents cull rect is that mapped on into the
/// contents state. The walk starts from an infinite rect at the root layer
/// and only enters subtrees flagged as needing an update. A layer whose
/// contents cull rect changes forces an update of all its children.
///
/// Child frames keep separate layer trees. Their root layers are reached
/// through the owner-layer pairs given to [`with_embedded_roots`].
///
/// [`with_embedded_roots`]: Self::with_embedded_roots
#[derive(Debug)]
pub struct CullRectUpdater<'a> {
    trees: &'a PropertyTrees,
    config: &'a CullRectConfig,
    embedded: &'a [(LayerId, LayerId)],
    disable_expansion: bool,
}

impl<'a> CullRectUpdater<'a> {
    /// Creates an updater over the given property trees.
    #[must_use]
    pub fn new(trees: &'a PropertyTrees, config: &'a CullRectConfig) -> Self {
        Self {
            trees,
            config,
            embedded: &[],
            disable_expansion: false,
        }
    }

    /// Adds `(owner layer, child root layer)` pairs. The walk continues from
    /// each owner into the paired root as if it were a child.
    #[must_use]
    pub fn with_embedded_roots(mut self, embedded: &'a [(LayerId, LayerId)]) -> Self {
        self.embedded = embedded;
        self
    }

    /// Computes exact cull rects only.
    #[must_use]
    pub fn with_expansion_disabled(mut self, disable: bool) -> Self {
        self.disable_expansion = disable;
        self
    }

    /// Walks from `root` and updates every flagged layer. Returns the number
    /// of layers whose cull rects were recomputed.
    ///
    /// # Panics
    ///
    /// Panics if `root` is stale.
    pub fn update(&self, layers: &mut LayerStore, root: LayerId, tracer: &mut Tracer<'_>) -> usize {
        layers.validate(root);
        let root_state = layers.local_state[root.idx as usize];

        let mut updated = 0;
        // (slot, parent slot or INVALID, forced by the parent)
        let mut stack: Vec<(u32, u32, bool)> = vec![(root.idx, INVALID, false)];
        while let Some((idx, parent, force)) = stack.pop() {
            let i = idx as usize;
            let mut force_children = false;
            if force || layers.needs_cull_rect_update[i] {
                force_children = self.update_layer(layers, &root_state, idx, parent, tracer);
                updated += 1;
            }

            if force_children || layers.descendant_needs_cull_rect_update[i] {
                let first = stack.len();
                let mut child = layers.first_child[i];
                while child != INVALID {
                    stack.push((child, idx, force_children));
                    child = layers.next_sibling[child as usize];
                }
                for &(owner, embedded_root) in self.embedded {
                    if owner.idx == idx && layers.is_alive(embedded_root) {
                        stack.push((embedded_root.idx, idx, force_children));
                    }
                }
                // Visit children in order.
                stack[first..].reverse();
            }

            layers.needs_cull_rect_update[i] = false;
            layers.descendant_needs_cull_rect_update[i] = false;
        }
        updated
    }

    /// Recomputes both cull rects of one layer. Returns whether its contents
    /// cull rect changed.
    fn update_layer(
        &self,
        layers: &mut LayerStore,
        root_state: &PropertyTreeState,
        idx: u32,
        parent: u32,
        tracer: &mut Tracer<'_>,
    ) -> bool {
        let i = idx as usize;
        let local = layers.local_state[i];
        let contents = layers.contents_state[i];
        let old = layers.cull_rect[i];
        let old_contents = layers.contents_cull_rect[i];

        let mut cull_rect = CullRect::INFINITE;
        if parent != INVALID {
            let p = parent as usize;
            if let Some(parent_contents) = layers.contents_cull_rect[p] {
                cull_rect = parent_contents;
            }
            let parent_state = layers.contents_state[p];
            if parent_state != local {
                cull_rect.apply_paint_properties(
                    self.trees,
                    self.config,
                    root_state,
                    &parent_state,
                    &local,
                    old.as_ref(),
                    self.disable_expansion,
                );
            }
        }

        let mut contents_cull_rect = cull_rect;
        if contents != local {
            contents_cull_rect.apply_paint_properties(
                self.trees,
                self.config,
                root_state,
                &local,
                &contents,
                old_contents.as_ref(),
                self.disable_expansion,
            );
        }

        let changed = old != Some(cull_rect);
        let contents_changed = old_contents != Some(contents_cull_rect);
        layers.cull_rect[i] = Some(cull_rect);
        layers.contents_cull_rect[i] = Some(contents_cull_rect);
        if changed || contents_changed {
            layers.mark_repaint_at(idx);
        }

        #[cfg(feature = "trace-rich")]
        tracer.cull_rect_update(&crate::trace::CullRectUpdateEvent {
            layer_index: idx,
            cull_rect,
            contents_cull_rect,
            changed: changed || contents_changed,
        });
        #[cfg(not(feature = "trace-rich"))]
        let _ = tracer;

        contents_changed
    }
}
