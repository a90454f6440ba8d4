// Copyright 2026 the Rendercycle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-frame pending-update queues.
//!
//! Each queue is a set drained exactly once per lifecycle pass at a fixed
//! point. A drain takes the whole set before calling out, so an entry added
//! during the drain is left for the next one.

use alloc::collections::BTreeSet;
use core::mem;

use super::id::{ElementId, FrameId, ObjectId, ScrollableAreaId};
use super::store::FrameTree;
use super::traverse::TraversalOrder;
use crate::lifecycle::{IntersectionObservationState, UpdateContext};

#[derive(Clone, Debug, Default)]
pub(crate) struct PendingUpdates {
    pub(crate) sticky: BTreeSet<ScrollableAreaId>,
    pub(crate) snap: BTreeSet<ScrollableAreaId>,
    pub(crate) perform_snap: BTreeSet<ScrollableAreaId>,
    pub(crate) transform: BTreeSet<ObjectId>,
    pub(crate) opacity: BTreeSet<ObjectId>,
    pub(crate) disconnected_with_remembered_size: BTreeSet<ElementId>,
}

impl FrameTree {
    // -- Queueing --

    /// Queues a sticky-constraint update, run after the frame's next layout.
    pub fn add_pending_sticky_update(&mut self, frame: FrameId, area: ScrollableAreaId) {
        self.validate(frame);
        self.pending[frame.idx as usize].sticky.insert(area);
    }

    /// Whether a sticky-constraint update is queued for `area`.
    #[must_use]
    pub fn has_pending_sticky_update(&self, frame: FrameId, area: ScrollableAreaId) -> bool {
        self.validate(frame);
        self.pending[frame.idx as usize].sticky.contains(&area)
    }

    /// Queues a snap-container data update, run after the next layout.
    pub fn add_pending_snap_update(&mut self, frame: FrameId, area: ScrollableAreaId) {
        self.validate(frame);
        self.pending[frame.idx as usize].snap.insert(area);
    }

    /// Drops a queued snap update and any snap it scheduled. Returns whether
    /// anything was queued.
    pub fn remove_pending_snap_update(&mut self, frame: FrameId, area: ScrollableAreaId) -> bool {
        self.validate(frame);
        let pending = &mut self.pending[frame.idx as usize];
        let snap = pending.snap.remove(&area);
        let perform = pending.perform_snap.remove(&area);
        snap || perform
    }

    /// Queues a direct transform update for `object`, applied in pre-paint.
    pub fn add_pending_transform_update(&mut self, frame: FrameId, object: ObjectId) {
        self.validate(frame);
        self.pending[frame.idx as usize].transform.insert(object);
        self.schedule_visual_update();
    }

    /// Drops a queued transform update. Returns whether one was queued.
    pub fn remove_pending_transform_update(&mut self, frame: FrameId, object: ObjectId) -> bool {
        self.validate(frame);
        self.pending[frame.idx as usize].transform.remove(&object)
    }

    /// Queues a direct opacity update for `object`, applied in pre-paint.
    pub fn add_pending_opacity_update(&mut self, frame: FrameId, object: ObjectId) {
        self.validate(frame);
        self.pending[frame.idx as usize].opacity.insert(object);
        self.schedule_visual_update();
    }

    /// Drops a queued opacity update. Returns whether one was queued.
    pub fn remove_pending_opacity_update(&mut self, frame: FrameId, object: ObjectId) -> bool {
        self.validate(frame);
        self.pending[frame.idx as usize].opacity.remove(&object)
    }

    /// Records that an element with a remembered size left the document.
    /// Its remembered size is cleared in the next resize-observer step unless
    /// it is reconnected by then.
    pub fn notify_element_with_remembered_size_disconnected(
        &mut self,
        frame: FrameId,
        element: ElementId,
    ) {
        self.validate(frame);
        self.pending[frame.idx as usize]
            .disconnected_with_remembered_size
            .insert(element);
    }

    /// Whether any direct transform or opacity update is queued.
    #[must_use]
    pub fn has_pending_direct_updates(&self, frame: FrameId) -> bool {
        self.validate(frame);
        let pending = &self.pending[frame.idx as usize];
        !pending.transform.is_empty() || !pending.opacity.is_empty()
    }

    // -- Draining --

    /// Drops every queued transform and opacity update, marking each object
    /// for a full paint-property update instead.
    pub fn remove_all_pending_updates(&mut self, frame: FrameId, cx: &mut UpdateContext<'_, '_>) {
        self.validate(frame);
        let i = frame.idx as usize;
        let transforms = mem::take(&mut self.pending[i].transform);
        let opacities = mem::take(&mut self.pending[i].opacity);
        for object in transforms.into_iter().chain(opacities) {
            cx.client.mark_needs_paint_property_update(self, frame, object);
        }
        if self.is_alive(frame) {
            self.flags[i].needs_paint_property_update = true;
        }
    }

    /// Applies queued transform and opacity updates directly to the cached
    /// paint properties. Returns whether any transform was applied.
    ///
    /// Falls back to [`remove_all_pending_updates`] if the frame's paint
    /// properties are being rebuilt anyway, and per object whenever a direct
    /// update is refused.
    ///
    /// [`remove_all_pending_updates`]: Self::remove_all_pending_updates
    pub(crate) fn execute_pending_direct_updates(
        &mut self,
        frame: FrameId,
        cx: &mut UpdateContext<'_, '_>,
    ) -> bool {
        let i = frame.idx as usize;
        if self.pending[i].transform.is_empty() && self.pending[i].opacity.is_empty() {
            return false;
        }
        if self.flags[i].needs_paint_property_update {
            self.remove_all_pending_updates(frame, cx);
            return false;
        }

        let mut transformed = false;
        let mut fell_back = false;
        let transforms = mem::take(&mut self.pending[i].transform);
        for object in transforms {
            if cx.client.directly_update_transform(self, frame, object) {
                transformed = true;
            } else {
                cx.client.mark_needs_paint_property_update(self, frame, object);
                fell_back = true;
            }
        }
        let opacities = mem::take(&mut self.pending[i].opacity);
        for object in opacities {
            if !cx.client.directly_update_opacity(self, frame, object) {
                cx.client.mark_needs_paint_property_update(self, frame, object);
                fell_back = true;
            }
        }

        if !self.is_alive(frame) {
            return transformed;
        }
        if fell_back {
            self.flags[i].needs_paint_property_update = true;
        }
        if transformed {
            self.set_intersection_observation_state(
                frame,
                IntersectionObservationState::Desired,
            );
        }
        transformed
    }

    /// Runs queued sticky-constraint updates for one frame.
    pub(crate) fn execute_pending_sticky_updates(
        &mut self,
        frame: FrameId,
        cx: &mut UpdateContext<'_, '_>,
    ) {
        let areas = mem::take(&mut self.pending[frame.idx as usize].sticky);
        for area in areas {
            cx.client.update_sticky_constraints(self, frame, area);
        }
    }

    /// Refreshes snap-container data across the unthrottled frames under
    /// `root`, then snaps the containers whose data changed unless a scroll
    /// gesture is in progress.
    pub(crate) fn execute_pending_snap_updates(
        &mut self,
        root: FrameId,
        cx: &mut UpdateContext<'_, '_>,
    ) {
        for frame in self.non_throttled_local_frames(root, TraversalOrder::PreOrder) {
            if !self.is_alive(frame) {
                continue;
            }
            let i = frame.idx as usize;
            let areas = mem::take(&mut self.pending[i].snap);
            for area in areas {
                if cx.client.update_snap_container_data(self, frame, area) && self.is_alive(frame) {
                    self.pending[i].perform_snap.insert(area);
                }
            }
            if !self.is_alive(frame) || self.pending[i].perform_snap.is_empty() {
                continue;
            }
            if cx.client.is_scroll_gesture_active(self, frame) {
                tracing::debug!(?frame, "deferring snap after layout during a scroll gesture");
                continue;
            }
            let areas = mem::take(&mut self.pending[i].perform_snap);
            for area in areas {
                cx.client.snap_after_layout(self, frame, area);
            }
        }
    }

    /// Clears the remembered size of every element that left the document
    /// and was not reconnected.
    pub(crate) fn clear_disconnected_remembered_sizes(
        &mut self,
        frame: FrameId,
        cx: &mut UpdateContext<'_, '_>,
    ) {
        let elements = mem::take(&mut self.pending[frame.idx as usize].disconnected_with_remembered_size);
        for element in elements {
            if !cx.client.is_element_connected(self, frame, element) {
                cx.client.clear_remembered_size(self, frame, element);
            }
        }
    }
}
