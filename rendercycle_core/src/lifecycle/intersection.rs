// Copyright 2026 the Rendercycle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Intersection-observer glue and paint-invalidation scheduling.

use bitflags::bitflags;
use kurbo::Vec2;

use super::scope::ThrottlingScope;
use super::state::{LifecycleState, UpdateReason};
use super::throttle::IntersectionObservationState;
use super::update::UpdateContext;
use crate::client::DeliveryTiming;
use crate::frame::{FrameId, FrameTree};

bitflags! {
    /// Options for one intersection computation, passed to
    /// [`ObserverHost::compute_intersections`](crate::client::ObserverHost::compute_intersections).
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct IntersectionUpdateFlags: u8 {
        /// Observers with an implicit root may report root bounds.
        const REPORT_IMPLICIT_ROOT_BOUNDS = 1 << 0;
        /// An ancestor frame has no layout box; targets are not intersecting.
        const ANCESTOR_FRAME_DETACHED = 1 << 1;
        /// Observers with an explicit root must be recomputed.
        const EXPLICIT_ROOT_OBSERVERS_NEED_UPDATE = 1 << 2;
        /// Observers with an implicit root must be recomputed.
        const IMPLICIT_ROOT_OBSERVERS_NEED_UPDATE = 1 << 3;
        /// Only scroll offsets and visibility changed since the last update.
        const SCROLL_AND_VISIBILITY_ONLY = 1 << 4;
        /// Ignore the observers' update delay.
        const IGNORE_DELAY = 1 << 5;
        /// Only observers that deliver right after layout.
        const POST_LAYOUT_DELIVERY_ONLY = 1 << 6;
    }
}

impl FrameTree {
    /// Computes intersections for `frame` and every local frame below it.
    /// Returns whether any frame needs occlusion tracking.
    ///
    /// Frames that still need layout keep their observation state for the
    /// next update. Inactive documents are skipped along with their
    /// subtrees.
    pub fn update_viewport_intersections_for_subtree(
        &mut self,
        frame: FrameId,
        flags: IntersectionUpdateFlags,
        cx: &mut UpdateContext<'_, '_>,
    ) -> bool {
        self.validate(frame);
        let inherited = IntersectionUpdateFlags::IMPLICIT_ROOT_OBSERVERS_NEED_UPDATE;
        let mut needs_occlusion_tracking = false;
        // (frame, flags of the frame embedding it)
        let mut stack = alloc::vec![(frame, flags)];
        while let Some((frame, parent_flags)) = stack.pop() {
            if !self.is_alive(frame) || !self.active[frame.idx as usize] {
                continue;
            }
            let frame_flags = self.intersection_flags(frame, flags, parent_flags);

            let i = frame.idx as usize;
            let mut frame_occlusion = false;
            if !self.flags[i].needs_layout {
                let delta = core::mem::replace(&mut self.scroll_delta_since_intersection[i], Vec2::ZERO);
                frame_occlusion = cx.client.compute_intersections(self, frame, frame_flags, delta);
                if !self.is_alive(frame) {
                    continue;
                }
                self.intersection_state[i] = IntersectionObservationState::NotNeeded;
            }
            self.flags[i].needs_occlusion_tracking = frame_occlusion;
            needs_occlusion_tracking |= frame_occlusion;

            let child_flags = if frame_flags.contains(inherited) {
                flags | inherited
            } else {
                flags
            };
            let first = stack.len();
            stack.extend(
                self.child_local_frames(frame)
                    .into_iter()
                    .map(|child| (child, child_flags)),
            );
            // Visit children in order.
            stack[first..].reverse();
        }
        needs_occlusion_tracking
    }

    fn intersection_flags(
        &self,
        frame: FrameId,
        base: IntersectionUpdateFlags,
        parent_flags: IntersectionUpdateFlags,
    ) -> IntersectionUpdateFlags {
        let i = frame.idx as usize;
        let state = self.intersection_state[i];
        let mut flags = base;
        let is_main_frame = self.parent(frame).is_none();
        if is_main_frame || !self.throttle[i].cross_origin_to_nearest_main_frame {
            flags |= IntersectionUpdateFlags::REPORT_IMPLICIT_ROOT_BOUNDS;
        }
        if !self.is_local_root(frame) && self.owner_layer[i].is_none() {
            flags |= IntersectionUpdateFlags::ANCESTOR_FRAME_DETACHED;
        }
        if state != IntersectionObservationState::NotNeeded {
            flags |= IntersectionUpdateFlags::EXPLICIT_ROOT_OBSERVERS_NEED_UPDATE;
        }
        if parent_flags.contains(IntersectionUpdateFlags::IMPLICIT_ROOT_OBSERVERS_NEED_UPDATE)
            || state >= IntersectionObservationState::Desired
        {
            flags |= IntersectionUpdateFlags::IMPLICIT_ROOT_OBSERVERS_NEED_UPDATE;
        }
        if state == IntersectionObservationState::ScrollAndVisibilityOnly {
            flags |= IntersectionUpdateFlags::SCROLL_AND_VISIBILITY_ONLY;
        }
        flags
    }

    /// Runs the intersection-observer steps that follow a full update and
    /// delivers synchronous observations. Returns whether any frame needs
    /// occlusion tracking.
    pub fn run_post_lifecycle_steps(
        &mut self,
        frame: FrameId,
        cx: &mut UpdateContext<'_, '_>,
    ) -> bool {
        self.validate(frame);
        let root = self.local_root(frame);
        let mut scope = ThrottlingScope::allow(self, root);
        if scope.should_throttle_rendering_at(root.idx) || !scope.active[root.idx as usize] {
            return false;
        }
        let needs_occlusion_tracking = scope.update_viewport_intersections_for_subtree(
            root,
            IntersectionUpdateFlags::empty(),
            cx,
        );
        for frame in scope.local_frames(root) {
            if scope.is_alive(frame) && scope.active[frame.idx as usize] {
                cx.client
                    .deliver_intersection_observations(&mut scope, frame, DeliveryTiming::Synchronous);
            }
        }
        needs_occlusion_tracking
    }

    /// Brings every frame under `frame`'s local root, throttled or not, to
    /// [`PrePaintClean`](LifecycleState::PrePaintClean) and recomputes
    /// implicit-root intersections without delay.
    pub fn force_update_viewport_intersections(
        &mut self,
        frame: FrameId,
        cx: &mut UpdateContext<'_, '_>,
    ) -> bool {
        self.validate(frame);
        let root = self.local_root(frame);
        let mut scope = ThrottlingScope::disallow(self, root);
        scope.update_lifecycle_to_pre_paint_clean(root, UpdateReason::IntersectionObservation, cx);
        if !scope.is_alive(root) {
            return false;
        }
        scope.update_viewport_intersections_for_subtree(
            root,
            IntersectionUpdateFlags::IMPLICIT_ROOT_OBSERVERS_NEED_UPDATE
                | IntersectionUpdateFlags::IGNORE_DELAY,
            cx,
        )
    }

    /// Schedules a visual update for a paint invalidation, unless the update
    /// in progress will still pick it up in pre-paint and then paint.
    pub fn schedule_visual_update_for_paint_invalidation_if_needed(&mut self, frame: FrameId) {
        self.validate(frame);
        let root = self.local_root_idx(frame.idx);
        let target = self.root_state[root as usize].target_state;
        // Only an update that paints clears pending paint invalidations.
        if target < LifecycleState::PaintClean
            || self.lifecycle[frame.idx as usize].state() >= LifecycleState::PrePaintClean
        {
            // The local root schedules unless it is throttled.
            if !self.should_throttle_rendering_at(root) {
                self.schedule_visual_update();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::format;

    use super::*;
    use crate::property::PropertyTreeState;
    use crate::testing::{Call, RecordingClient};

    fn computed_flags(client: &RecordingClient, frame: FrameId) -> Option<IntersectionUpdateFlags> {
        client.calls.iter().find_map(|c| match c {
            Call::ComputeIntersections(f, flags) if *f == frame => Some(*flags),
            _ => None,
        })
    }

    #[test]
    fn flags_combine_and_print() {
        let flags = IntersectionUpdateFlags::IGNORE_DELAY
            | IntersectionUpdateFlags::IMPLICIT_ROOT_OBSERVERS_NEED_UPDATE;
        assert!(flags.contains(IntersectionUpdateFlags::IGNORE_DELAY));
        assert!(!flags.contains(IntersectionUpdateFlags::POST_LAYOUT_DELIVERY_ONLY));
        assert_eq!(
            format!("{flags:?}"),
            "IntersectionUpdateFlags(IMPLICIT_ROOT_OBSERVERS_NEED_UPDATE | IGNORE_DELAY)"
        );
    }

    #[test]
    fn subtree_update_derives_per_frame_flags() {
        let mut tree = FrameTree::new();
        let state = PropertyTreeState::ROOT;
        let owner = tree.layers_mut().create_layer(state, state);
        let main = tree.create_main_frame(None);
        let embedded = tree.create_local_frame(main, Some(owner), None);
        let orphan = tree.create_local_frame(main, None, None);
        tree.set_cross_origin_to_nearest_main_frame(orphan, true);
        for frame in [main, embedded, orphan] {
            tree.flags[frame.idx as usize].needs_layout = false;
        }
        tree.set_intersection_observation_state(main, IntersectionObservationState::Desired);
        tree.update_intersection_observation_state_on_scroll(embedded, Vec2::new(0.0, -30.0));

        let mut client = RecordingClient::new();
        let mut cx = UpdateContext::new(&mut client);
        tree.update_viewport_intersections_for_subtree(main, IntersectionUpdateFlags::empty(), &mut cx);

        let Some(main_flags) = computed_flags(&client, main) else {
            panic!("main frame not computed");
        };
        assert!(main_flags.contains(
            IntersectionUpdateFlags::REPORT_IMPLICIT_ROOT_BOUNDS
                | IntersectionUpdateFlags::EXPLICIT_ROOT_OBSERVERS_NEED_UPDATE
                | IntersectionUpdateFlags::IMPLICIT_ROOT_OBSERVERS_NEED_UPDATE
        ));

        let Some(embedded_flags) = computed_flags(&client, embedded) else {
            panic!("embedded frame not computed");
        };
        assert!(embedded_flags.contains(
            IntersectionUpdateFlags::SCROLL_AND_VISIBILITY_ONLY
                | IntersectionUpdateFlags::IMPLICIT_ROOT_OBSERVERS_NEED_UPDATE
        ));
        assert!(!embedded_flags.contains(IntersectionUpdateFlags::ANCESTOR_FRAME_DETACHED));
        assert!(client.calls.contains(&Call::ScrollDelta(embedded, Vec2::new(0.0, 30.0))));
        assert_eq!(tree.scroll_delta_since_intersection(embedded), Vec2::ZERO);

        let Some(orphan_flags) = computed_flags(&client, orphan) else {
            panic!("orphan frame not computed");
        };
        assert!(orphan_flags.contains(IntersectionUpdateFlags::ANCESTOR_FRAME_DETACHED));
        assert!(!orphan_flags.contains(IntersectionUpdateFlags::REPORT_IMPLICIT_ROOT_BOUNDS));

        for frame in [main, embedded, orphan] {
            assert_eq!(
                tree.intersection_observation_state(frame),
                IntersectionObservationState::NotNeeded
            );
        }
    }

    #[test]
    fn frames_needing_layout_keep_their_state() {
        let mut tree = FrameTree::new();
        let main = tree.create_main_frame(None);
        tree.set_intersection_observation_state(main, IntersectionObservationState::Desired);
        let mut client = RecordingClient::new();
        let mut cx = UpdateContext::new(&mut client);
        tree.update_viewport_intersections_for_subtree(main, IntersectionUpdateFlags::empty(), &mut cx);
        assert!(computed_flags(&client, main).is_none());
        assert_eq!(
            tree.intersection_observation_state(main),
            IntersectionObservationState::Desired
        );
    }

    #[test]
    fn post_lifecycle_steps_deliver_synchronously() {
        let mut tree = FrameTree::new();
        let main = tree.create_main_frame(None);
        let mut client = RecordingClient::new();
        client.occlusion_tracking = true;
        let mut cx = UpdateContext::new(&mut client);
        tree.update_all_lifecycle_phases(main, UpdateReason::BeginMainFrame, &mut cx);
        client.calls.clear();

        let mut cx = UpdateContext::new(&mut client);
        assert!(tree.run_post_lifecycle_steps(main, &mut cx));
        assert!(tree.flags(main).needs_occlusion_tracking);
        assert!(client.calls.contains(&Call::DeliverIntersections(main, DeliveryTiming::Synchronous)));
    }

    #[test]
    fn forced_intersection_update_reaches_throttled_frames() {
        let mut tree = FrameTree::new();
        let main = tree.create_main_frame(None);
        let child = tree.create_local_frame(main, None, None);
        let mut client = RecordingClient::new();
        let mut cx = UpdateContext::new(&mut client);
        tree.force_update_viewport_intersections(main, &mut cx);

        assert_eq!(tree.lifecycle_state(child), LifecycleState::PrePaintClean);
        let Some(flags) = computed_flags(&client, child) else {
            panic!("child frame not computed");
        };
        assert!(flags.contains(
            IntersectionUpdateFlags::IMPLICIT_ROOT_OBSERVERS_NEED_UPDATE
                | IntersectionUpdateFlags::IGNORE_DELAY
        ));
        assert!(!tree.root_state[main.idx as usize].allow_throttling);
    }

    #[test]
    fn paint_invalidations_schedule_outside_pre_paint() {
        let mut tree = FrameTree::new();
        let main = tree.create_main_frame(None);
        let _ = tree.take_visual_update_request();
        tree.set_should_check_for_paint_invalidation(main);
        assert!(tree.take_visual_update_request());

        // During an update heading for paint, pre-paint still picks it up.
        tree.root_state[main.idx as usize].target_state = LifecycleState::PaintClean;
        tree.set_needs_paint_property_update(main);
        assert!(!tree.take_visual_update_request());

        // Past pre-paint, it waits for the next frame.
        tree.lifecycle[main.idx as usize].advance_to(LifecycleState::PrePaintClean);
        tree.mark_wheel_handler_changed(main);
        assert!(tree.take_visual_update_request());

        // An update that stops before paint leaves the invalidation pending.
        tree.lifecycle[main.idx as usize].ensure_state_at_most(LifecycleState::VisualUpdatePending);
        tree.root_state[main.idx as usize].target_state = LifecycleState::PrePaintClean;
        tree.mark_touch_action_changed(main);
        assert!(tree.take_visual_update_request());
    }
}
