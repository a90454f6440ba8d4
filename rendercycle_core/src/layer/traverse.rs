// Copyright 2026 the Rendercycle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tree traversal utilities.

use super::id::{INVALID, LayerId};
use super::store::LayerStore;

/// An iterator over the direct children of a layer.
///
/// Created by [`LayerStore::children`].
#[derive(Debug)]
pub struct Children<'a> {
    store: &'a LayerStore,
    current: u32,
}

impl<'a> Children<'a> {
    pub(crate) fn new(store: &'a LayerStore, first: u32) -> Self {
        Self {
            store,
            current: first,
        }
    }
}

impl Iterator for Children<'_> {
    type Item = LayerId;

    fn next(&mut self) -> Option<LayerId> {
        if self.current == INVALID {
            return None;
        }
        let idx = self.current;
        self.current = self.store.next_sibling[idx as usize];
        Some(LayerId {
            idx,
            generation: self.store.generation[idx as usize],
        })
    }
}

/// Pre-order walk over a subtree, yielding raw slot indices.
///
/// The walk does not allocate: it follows first-child, next-sibling and
/// parent links and stops when it climbs back to the starting layer.
#[derive(Debug)]
pub(crate) struct Subtree<'a> {
    store: &'a LayerStore,
    root: u32,
    next: u32,
}

impl<'a> Subtree<'a> {
    pub(crate) fn new(store: &'a LayerStore, root: u32) -> Self {
        Self {
            store,
            root,
            next: root,
        }
    }
}

impl Iterator for Subtree<'_> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        if self.next == INVALID {
            return None;
        }
        let idx = self.next;
        let s = self.store;

        let child = s.first_child[idx as usize];
        self.next = if child != INVALID {
            child
        } else {
            let mut cur = idx;
            loop {
                if cur == self.root {
                    break INVALID;
                }
                let sibling = s.next_sibling[cur as usize];
                if sibling != INVALID {
                    break sibling;
                }
                cur = s.parent[cur as usize];
            }
        };
        Some(idx)
    }
}
