// Copyright 2026 the Rendercycle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Render throttling and intersection-observation state.
//!
//! A frame *can* throttle when one of its [`ThrottleInputs`] says so. It is
//! actually throttled only while its local frame root allows throttling (see
//! [`ThrottlingScope`](super::ThrottlingScope)), and a frame that must run
//! intersection observation during an update is let through until it reaches
//! [`PrePaintClean`](LifecycleState::PrePaintClean).

use kurbo::Vec2;

use super::phases::Pass;
use super::scope::ThrottlingScope;
use super::state::{LifecycleState, UpdateReason};
use super::update::UpdateContext;
use crate::frame::{FrameId, FrameKind, FrameTree};
use crate::trace::{ThrottlingChangedEvent, UpdateBeginEvent};

/// The inputs deciding whether a frame can throttle rendering.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ThrottleInputs {
    /// The frame is scrolled out of view or hidden.
    pub hidden_for_throttling: bool,
    /// An ancestor frame can throttle.
    pub subtree_throttled: bool,
    /// The frame's owner is locked by `content-visibility` or similar.
    pub display_locked: bool,
    /// Updates are held back until the first commit of the frame.
    pub lifecycle_updates_throttled: bool,
    /// A view transition holds rendering back.
    pub throttled_for_view_transition: bool,
    /// The frame is cross-origin to the nearest main frame. Only such frames
    /// throttle when hidden.
    pub cross_origin_to_nearest_main_frame: bool,
}

impl ThrottleInputs {
    /// Whether these inputs allow throttling.
    #[must_use]
    pub const fn can_throttle(&self) -> bool {
        self.lifecycle_updates_throttled
            || self.subtree_throttled
            || self.display_locked
            || self.throttled_for_view_transition
            || (self.hidden_for_throttling && self.cross_origin_to_nearest_main_frame)
    }
}

/// How urgently a frame's intersection observations need recomputing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IntersectionObservationState {
    /// Nothing changed.
    #[default]
    NotNeeded,
    /// Only scroll position and visibility changed.
    ScrollAndVisibilityOnly,
    /// Geometry may have changed; update with the next unthrottled update.
    Desired,
    /// Update even if the frame is throttled.
    Required,
}

impl FrameTree {
    // -- Queries --

    /// Whether the frame's inputs allow it to throttle rendering.
    #[must_use]
    pub fn can_throttle_rendering(&self, frame: FrameId) -> bool {
        self.validate(frame);
        self.throttle[frame.idx as usize].can_throttle()
    }

    /// Whether the frame is skipped by lifecycle updates right now.
    #[must_use]
    pub fn should_throttle_rendering(&self, frame: FrameId) -> bool {
        self.validate(frame);
        self.should_throttle_rendering_at(frame.idx)
    }

    pub(crate) fn should_throttle_rendering_at(&self, idx: u32) -> bool {
        let i = idx as usize;
        let root = &self.root_state[self.local_root_idx(idx) as usize];
        if root.force_throttling {
            return true;
        }
        if !root.allow_throttling || !self.throttle[i].can_throttle() {
            return false;
        }
        // Let a frame that must compute intersections run up to pre-paint.
        if root.target_state != LifecycleState::Uninitialized
            && self.intersection_state[i] == IntersectionObservationState::Required
            && !self.throttle[i].display_locked
        {
            return self.lifecycle[i].state() >= LifecycleState::PrePaintClean;
        }
        true
    }

    /// The frame's current throttling inputs.
    #[must_use]
    pub fn throttle_inputs(&self, frame: FrameId) -> ThrottleInputs {
        self.validate(frame);
        self.throttle[frame.idx as usize]
    }

    // -- Inputs --

    /// Updates the frame's visibility-related inputs and, with `recurse`,
    /// recomputes `subtree_throttled` for every descendant from its parent.
    pub fn update_render_throttling_status(
        &mut self,
        frame: FrameId,
        hidden_for_throttling: bool,
        subtree_throttled: bool,
        display_locked: bool,
        recurse: bool,
        cx: &mut UpdateContext<'_, '_>,
    ) {
        self.validate(frame);
        let i = frame.idx as usize;
        let was_throttled = self.throttle[i].can_throttle();
        let inputs = &mut self.throttle[i];
        inputs.hidden_for_throttling = hidden_for_throttling;
        inputs.subtree_throttled = subtree_throttled;
        inputs.display_locked = display_locked;
        let throttled = inputs.can_throttle();

        if recurse {
            let attached = !self.detached[i];
            let children: alloc::vec::Vec<FrameId> = self.children(frame).collect();
            for child in children {
                if !self.is_alive(child) {
                    continue;
                }
                let inputs = self.throttle[child.idx as usize];
                self.update_render_throttling_status(
                    child,
                    inputs.hidden_for_throttling,
                    attached && throttled,
                    inputs.display_locked,
                    true,
                    cx,
                );
            }
        }

        if self.is_alive(frame)
            && self.kind[i] == FrameKind::Local
            && was_throttled != self.throttle[i].can_throttle()
        {
            self.render_throttling_status_changed(frame, cx);
        }
    }

    /// Holds rendering of the frame back for a view transition.
    pub fn set_throttled_for_view_transition(
        &mut self,
        frame: FrameId,
        throttled: bool,
        cx: &mut UpdateContext<'_, '_>,
    ) {
        self.validate(frame);
        let i = frame.idx as usize;
        let was_throttled = self.throttle[i].can_throttle();
        self.throttle[i].throttled_for_view_transition = throttled;
        if was_throttled != self.throttle[i].can_throttle() {
            self.render_throttling_status_changed(frame, cx);
        }
    }

    /// Holds back or resumes all lifecycle updates of the frame.
    pub fn set_lifecycle_updates_throttled(
        &mut self,
        frame: FrameId,
        throttled: bool,
        cx: &mut UpdateContext<'_, '_>,
    ) {
        self.validate(frame);
        let i = frame.idx as usize;
        let was_throttled = self.throttle[i].can_throttle();
        self.throttle[i].lifecycle_updates_throttled = throttled;
        if was_throttled != self.throttle[i].can_throttle() {
            self.render_throttling_status_changed(frame, cx);
        }
    }

    /// Records whether the frame is cross-origin to its nearest main frame.
    /// Takes effect at the next throttling status update.
    pub fn set_cross_origin_to_nearest_main_frame(&mut self, frame: FrameId, cross_origin: bool) {
        self.validate(frame);
        self.throttle[frame.idx as usize].cross_origin_to_nearest_main_frame = cross_origin;
    }

    /// Lets a newly committed frame start running lifecycle updates.
    pub fn begin_lifecycle_updates(&mut self, frame: FrameId) {
        self.validate(frame);
        let i = frame.idx as usize;
        self.throttle[i].lifecycle_updates_throttled = false;
        // A frame that never laid out still needs its first layout.
        if !self.flags[i].did_first_layout && !self.flags[i].needs_layout {
            self.set_needs_layout(frame);
        }
        self.schedule_visual_update();
        self.set_intersection_observation_state(frame, IntersectionObservationState::Required);
    }

    /// Reacts to a flip of [`can_throttle_rendering`](Self::can_throttle_rendering).
    ///
    /// Painted output is discarded in both directions. A frame that stopped
    /// throttling schedules an update that must reach it; a local root that
    /// started throttling paints once so it shows its throttled state.
    pub(crate) fn render_throttling_status_changed(
        &mut self,
        frame: FrameId,
        cx: &mut UpdateContext<'_, '_>,
    ) {
        let i = frame.idx as usize;
        if let Some(layer) = self.root_layer[i].filter(|l| self.layers.is_alive(*l)) {
            self.layers.set_needs_repaint(layer);
        }
        if let Some(owner) = self.owner_layer[i].filter(|l| self.layers.is_alive(*l)) {
            self.layers.set_needs_repaint(owner);
        }

        let throttled = self.throttle[i].can_throttle();
        cx.tracer
            .throttling_changed(&ThrottlingChangedEvent { frame, throttled });

        if !throttled {
            self.schedule_visual_update();
            self.set_intersection_observation_state(frame, IntersectionObservationState::Required);
        } else if self.is_local_root(frame) {
            debug_assert!(
                !self.is_updating_at(frame.idx),
                "throttling changed on a local root while it is updating"
            );
            let begin = UpdateBeginEvent {
                update_index: self.update_count,
                frame,
                target: LifecycleState::PaintClean,
                reason: UpdateReason::Other,
            };
            let mut pass = Pass::new(&begin);
            let mut scope = ThrottlingScope::force(self, frame);
            scope.run_paint_lifecycle_phase(frame, &mut pass, cx);
        }
    }

    // -- Intersection observation --

    /// The frame's intersection-observation state.
    #[must_use]
    pub fn intersection_observation_state(&self, frame: FrameId) -> IntersectionObservationState {
        self.validate(frame);
        self.intersection_state[frame.idx as usize]
    }

    /// Raises the frame's intersection-observation state. Never lowers it.
    ///
    /// [`Required`](IntersectionObservationState::Required) also applies to
    /// every local ancestor, so an update cannot stop at a throttled ancestor
    /// before reaching this frame.
    pub fn set_intersection_observation_state(
        &mut self,
        frame: FrameId,
        state: IntersectionObservationState,
    ) {
        self.validate(frame);
        let mut idx = frame.idx;
        loop {
            let current = &mut self.intersection_state[idx as usize];
            if *current >= state {
                return;
            }
            *current = state;
            if state != IntersectionObservationState::Required {
                return;
            }
            match self.handle(self.parent[idx as usize]) {
                Some(p) if self.kind[p.idx as usize] == FrameKind::Local => idx = p.idx,
                _ => return,
            }
        }
    }

    /// Accumulates a scroll of the frame's viewport for the next
    /// intersection update.
    pub fn update_intersection_observation_state_on_scroll(
        &mut self,
        frame: FrameId,
        scroll_delta: Vec2,
    ) {
        self.validate(frame);
        self.scroll_delta_since_intersection[frame.idx as usize] +=
            Vec2::new(scroll_delta.x.abs(), scroll_delta.y.abs());
        self.set_intersection_observation_state(
            frame,
            IntersectionObservationState::ScrollAndVisibilityOnly,
        );
    }

    /// Absolute scroll distance accumulated since the last intersection
    /// update of the frame.
    #[must_use]
    pub fn scroll_delta_since_intersection(&self, frame: FrameId) -> Vec2 {
        self.validate(frame);
        self.scroll_delta_since_intersection[frame.idx as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::PropertyTreeState;
    use crate::testing::RecordingClient;

    fn allow(tree: &mut FrameTree, root: FrameId) {
        tree.root_state[root.idx as usize].allow_throttling = true;
    }

    #[test]
    fn hidden_frames_throttle_only_when_cross_origin() {
        let mut inputs = ThrottleInputs {
            hidden_for_throttling: true,
            ..ThrottleInputs::default()
        };
        assert!(!inputs.can_throttle());
        inputs.cross_origin_to_nearest_main_frame = true;
        assert!(inputs.can_throttle());
    }

    #[test]
    fn throttling_needs_the_root_to_allow_it() {
        let mut tree = FrameTree::new();
        let main = tree.create_main_frame(None);
        let child = tree.create_local_frame(main, None, None);
        assert!(tree.can_throttle_rendering(child), "new child frames wait for commit");
        assert!(!tree.should_throttle_rendering(child));
        allow(&mut tree, main);
        assert!(tree.should_throttle_rendering(child));

        tree.begin_lifecycle_updates(child);
        assert!(!tree.should_throttle_rendering(child));
    }

    #[test]
    fn forced_throttling_throttles_everything() {
        let mut tree = FrameTree::new();
        let main = tree.create_main_frame(None);
        tree.root_state[main.idx as usize].force_throttling = true;
        assert!(tree.should_throttle_rendering(main));
    }

    #[test]
    fn required_frames_run_until_pre_paint_during_updates() {
        let mut tree = FrameTree::new();
        let main = tree.create_main_frame(None);
        let child = tree.create_local_frame(main, None, None);
        allow(&mut tree, main);
        tree.set_intersection_observation_state(child, IntersectionObservationState::Required);
        assert!(tree.should_throttle_rendering(child), "idle roots throttle");

        tree.root_state[main.idx as usize].target_state = LifecycleState::PaintClean;
        assert!(!tree.should_throttle_rendering(child));
        tree.lifecycle[child.idx as usize].advance_to(LifecycleState::PrePaintClean);
        assert!(tree.should_throttle_rendering(child));
    }

    #[test]
    fn required_observation_climbs_local_ancestors() {
        let mut tree = FrameTree::new();
        let main = tree.create_main_frame(None);
        let remote = tree.create_remote_frame(main, None);
        let inner = tree.create_local_frame(remote, None, None);
        let leaf = tree.create_local_frame(inner, None, None);

        tree.set_intersection_observation_state(leaf, IntersectionObservationState::Required);
        assert_eq!(
            tree.intersection_observation_state(inner),
            IntersectionObservationState::Required
        );
        assert_eq!(
            tree.intersection_observation_state(main),
            IntersectionObservationState::NotNeeded,
            "remote frames stop the climb"
        );

        tree.set_intersection_observation_state(leaf, IntersectionObservationState::Desired);
        assert_eq!(
            tree.intersection_observation_state(leaf),
            IntersectionObservationState::Required,
            "states are never lowered"
        );
    }

    #[test]
    fn scroll_deltas_accumulate_absolute_values() {
        let mut tree = FrameTree::new();
        let main = tree.create_main_frame(None);
        tree.update_intersection_observation_state_on_scroll(main, Vec2::new(-10.0, 5.0));
        tree.update_intersection_observation_state_on_scroll(main, Vec2::new(3.0, -5.0));
        assert_eq!(tree.scroll_delta_since_intersection(main), Vec2::new(13.0, 10.0));
        assert_eq!(
            tree.intersection_observation_state(main),
            IntersectionObservationState::ScrollAndVisibilityOnly
        );
    }

    #[test]
    fn subtree_throttling_propagates_on_recurse() {
        let mut tree = FrameTree::new();
        let main = tree.create_main_frame(None);
        let child = tree.create_local_frame(main, None, None);
        let grandchild = tree.create_local_frame(child, None, None);
        tree.begin_lifecycle_updates(child);
        tree.begin_lifecycle_updates(grandchild);

        let mut client = RecordingClient::new();
        let mut cx = UpdateContext::new(&mut client);
        tree.update_render_throttling_status(child, false, false, true, true, &mut cx);
        assert!(tree.throttle_inputs(grandchild).subtree_throttled);
        assert!(tree.can_throttle_rendering(grandchild));

        let mut cx = UpdateContext::new(&mut client);
        tree.update_render_throttling_status(child, false, false, false, true, &mut cx);
        assert!(!tree.throttle_inputs(grandchild).subtree_throttled);
    }

    #[test]
    fn unthrottling_repaints_and_requires_observation() {
        let mut tree = FrameTree::new();
        let state = PropertyTreeState::ROOT;
        let owner = tree.layers_mut().create_layer(state, state);
        let inner = tree.layers_mut().create_layer(state, state);
        let main = tree.create_main_frame(None);
        let child = tree.create_local_frame(main, Some(owner), Some(inner));
        tree.layers_mut().clear_needs_repaint_recursively(owner);
        tree.layers_mut().clear_needs_repaint_recursively(inner);
        let _ = tree.take_visual_update_request();

        let mut client = RecordingClient::new();
        let mut cx = UpdateContext::new(&mut client);
        tree.set_lifecycle_updates_throttled(child, false, &mut cx);

        assert!(tree.layers().needs_repaint(owner));
        assert!(tree.layers().needs_repaint(inner));
        assert!(tree.take_visual_update_request());
        assert_eq!(
            tree.intersection_observation_state(child),
            IntersectionObservationState::Required
        );
    }

    #[test]
    fn throttling_a_local_root_paints_once() {
        let mut tree = FrameTree::new();
        let main = tree.create_main_frame(None);

        let mut client = RecordingClient::new();
        let mut cx = UpdateContext::new(&mut client);
        tree.set_throttled_for_view_transition(main, true, &mut cx);
        assert_eq!(tree.paint_frame_count(main), 1);
        assert!(!tree.root_state[main.idx as usize].force_throttling);
        assert!(client.calls.contains(&crate::testing::Call::PushPaintArtifact(main, false)));
    }
}
