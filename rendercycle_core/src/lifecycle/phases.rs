// Copyright 2026 the Rendercycle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The phases of a lifecycle update.
//!
//! Style, layout, compositing inputs and pre-paint run in a loop. After
//! pre-paint, observer deliveries and view transitions may dirty layout
//! again, which sends the loop back to style. Only once nothing is dirty
//! does paint run.
//!
//! Every phase works on a snapshot of frames taken when the phase starts
//! and re-checks liveness after each collaborator call.

use alloc::vec::Vec;

use super::intersection::IntersectionUpdateFlags;
use super::state::LifecycleState;
use super::update::UpdateContext;
use crate::client::{DeliveryTiming, ViewTransitionStage};
use crate::frame::{FrameId, FrameTree, TraversalOrder};
use crate::layer::{CullRectUpdater, LayerId};
use crate::trace::{
    LifecycleSummaryBuilder, LoopRepeatCause, LoopRepeatEvent, PhaseBeginEvent, PhaseEndEvent,
    PhaseKind, ResizeObserverLoopLimitEvent, Tracer, UpdateBeginEvent,
};

/// Bookkeeping for one run of the phase loop.
#[derive(Debug)]
pub(crate) struct Pass {
    pub(crate) update_index: u64,
    pub(crate) iteration: u32,
    pub(crate) summary: LifecycleSummaryBuilder,
}

impl Pass {
    pub(crate) fn new(begin: &UpdateBeginEvent) -> Self {
        Self {
            update_index: begin.update_index,
            iteration: 0,
            summary: LifecycleSummaryBuilder::new(begin),
        }
    }

    fn phase_begin(&mut self, phase: PhaseKind, tracer: &mut Tracer<'_>) {
        self.summary.phase_begin(phase);
        tracer.phase_begin(&PhaseBeginEvent {
            update_index: self.update_index,
            phase,
            iteration: self.iteration,
        });
    }

    fn phase_end(&self, phase: PhaseKind, tracer: &mut Tracer<'_>) {
        tracer.phase_end(&PhaseEndEvent {
            update_index: self.update_index,
            phase,
            iteration: self.iteration,
        });
    }

    fn iteration_begin(&mut self) {
        self.iteration += 1;
        self.summary.iteration_begin();
    }

    fn loop_repeat(&mut self, cause: LoopRepeatCause, tracer: &mut Tracer<'_>) {
        self.summary.loop_repeat();
        tracer.loop_repeat(&LoopRepeatEvent {
            update_index: self.update_index,
            iteration: self.iteration,
            cause,
        });
    }
}

impl FrameTree {
    /// Runs the phase loop for the local root `root` up to the target held
    /// in its root state.
    pub(crate) fn update_lifecycle_phases_internal(
        &mut self,
        root: FrameId,
        pass: &mut Pass,
        cx: &mut UpdateContext<'_, '_>,
    ) {
        let target = self.root_state[root.idx as usize].target_state;
        let mut scroll_snapshot_pending = self.config.run_scroll_snapshot_steps;
        // Frames that start throttling mid-loop keep being updated until the
        // loop ends.
        let unthrottled = self.non_throttled_local_frames(root, TraversalOrder::PreOrder);

        loop {
            pass.iteration_begin();
            for &frame in &unthrottled {
                if self.is_alive(frame) {
                    self.lifecycle[frame.idx as usize]
                        .ensure_state_at_most(LifecycleState::VisualUpdatePending);
                }
            }
            self.run_style_and_layout_lifecycle_phases(root, pass, cx);
            if !self.is_alive(root) || target == LifecycleState::LayoutClean {
                return;
            }

            // Snapshots are taken once per update, after the first layout.
            if scroll_snapshot_pending {
                scroll_snapshot_pending = false;
                if self.run_scroll_snapshot_client_steps(root, pass, cx) {
                    pass.loop_repeat(LoopRepeatCause::ScrollSnapshot, &mut cx.tracer);
                    continue;
                }
            }

            if !self.run_compositing_inputs_lifecycle_phase(root, pass, cx) {
                return;
            }

            if !self.run_pre_paint_lifecycle_phase(root, pass, cx) {
                if self.is_alive(root) && self.run_view_transition_steps(root, pass, cx) {
                    pass.loop_repeat(LoopRepeatCause::ViewTransition, &mut cx.tracer);
                    continue;
                }
                return;
            }

            if !self.is_alive(root)
                || self.should_throttle_rendering_at(root.idx)
                || !self.active[root.idx as usize]
            {
                return;
            }

            if self.run_post_layout_intersection_observer_steps(root, pass, cx) {
                pass.loop_repeat(LoopRepeatCause::PostLayoutIntersection, &mut cx.tracer);
                continue;
            }

            if self.run_resize_observer_steps(root, pass, cx) {
                pass.loop_repeat(LoopRepeatCause::ResizeObserver, &mut cx.tracer);
                continue;
            }

            if !self.run_view_transition_steps(root, pass, cx) {
                break;
            }
            pass.loop_repeat(LoopRepeatCause::ViewTransition, &mut cx.tracer);
        }

        if !self.is_alive(root) {
            return;
        }
        self.clear_resize_observer_limit(root);
        for remote in self.remote_frames(root) {
            if self.is_alive(remote) {
                cx.client.update_compositing_rect(self, remote);
            }
        }
        if self.is_alive(root) {
            self.run_paint_lifecycle_phase(root, pass, cx);
        }
    }

    // -- Style and layout --

    fn run_style_and_layout_lifecycle_phases(
        &mut self,
        root: FrameId,
        pass: &mut Pass,
        cx: &mut UpdateContext<'_, '_>,
    ) {
        pass.phase_begin(PhaseKind::StyleAndLayout, &mut cx.tracer);
        self.update_style_and_layout_if_needed_recursive(root, cx);

        let target = self.root_state[root.idx as usize].target_state;
        if self.is_alive(root) && target > LifecycleState::LayoutClean {
            for frame in self.non_throttled_local_frames(root, TraversalOrder::PreOrder) {
                if self.is_alive(frame) && self.active[frame.idx as usize] {
                    cx.client.perform_scroll_anchoring_adjustments(self, frame);
                }
            }
            if self.is_alive(root) {
                self.execute_pending_snap_updates(root, cx);
            }
            if target == LifecycleState::PaintClean && self.is_alive(root) {
                for frame in self.non_throttled_local_frames(root, TraversalOrder::PreOrder) {
                    if self.is_alive(frame) {
                        self.notify_frame_rects_changed_if_needed(frame, cx);
                    }
                }
            }
        }
        pass.phase_end(PhaseKind::StyleAndLayout, &mut cx.tracer);
    }

    /// Style and layout for every unthrottled frame under `root`, parents
    /// before children.
    fn update_style_and_layout_if_needed_recursive(
        &mut self,
        root: FrameId,
        cx: &mut UpdateContext<'_, '_>,
    ) {
        let mut stack = alloc::vec![root];
        while let Some(frame) = stack.pop() {
            if !self.is_alive(frame) || self.should_throttle_rendering_at(frame.idx) {
                continue;
            }
            if self.active[frame.idx as usize] {
                self.update_style_and_layout_for_frame(frame, cx);
                if !self.is_alive(frame) {
                    continue;
                }
            }
            let first = stack.len();
            stack.extend(self.child_local_frames(frame));
            // Visit children in order.
            stack[first..].reverse();
        }
    }

    fn update_style_and_layout_for_frame(&mut self, frame: FrameId, cx: &mut UpdateContext<'_, '_>) {
        let i = frame.idx as usize;
        let mut did_layout = false;
        // A second round picks up style invalidated by the first layout.
        for _ in 0..2 {
            let flags = &mut self.flags[i];
            if !flags.needs_style_recalc && !flags.needs_layout {
                break;
            }
            did_layout |= flags.needs_layout;
            flags.needs_style_recalc = false;
            flags.needs_layout = false;
            cx.client.update_style_and_layout(self, frame);
            if !self.is_alive(frame) {
                return;
            }
        }

        if did_layout {
            let flags = &mut self.flags[i];
            flags.did_first_layout = true;
            flags.needs_update_geometries = true;
            self.execute_pending_sticky_updates(frame, cx);
            if !self.is_alive(frame) {
                return;
            }
            self.update_geometries_if_needed(frame, cx);
            if !self.is_alive(frame) {
                return;
            }
        }

        for plugin in self.plugins[i].clone() {
            cx.client.update_plugin_lifecycle(self, frame, plugin);
            if !self.is_alive(frame) {
                return;
            }
        }

        self.advance_lifecycle(frame, LifecycleState::StyleClean, &mut cx.tracer);
        self.advance_lifecycle(frame, LifecycleState::LayoutClean, &mut cx.tracer);
    }

    fn run_scroll_snapshot_client_steps(
        &mut self,
        root: FrameId,
        pass: &mut Pass,
        cx: &mut UpdateContext<'_, '_>,
    ) -> bool {
        pass.phase_begin(PhaseKind::ScrollSnapshot, &mut cx.tracer);
        let mut rerun = false;
        for frame in self.non_throttled_local_frames(root, TraversalOrder::PreOrder) {
            if !self.is_alive(frame) || !self.active[frame.idx as usize] {
                continue;
            }
            if !cx.client.validate_scroll_snapshot_clients(self, frame) && self.is_alive(frame) {
                self.set_needs_style_recalc(frame);
                rerun = true;
            }
        }
        pass.phase_end(PhaseKind::ScrollSnapshot, &mut cx.tracer);
        rerun
    }

    // -- Compositing inputs and pre-paint --

    /// Returns whether the update continues past compositing inputs.
    fn run_compositing_inputs_lifecycle_phase(
        &mut self,
        root: FrameId,
        pass: &mut Pass,
        cx: &mut UpdateContext<'_, '_>,
    ) -> bool {
        pass.phase_begin(PhaseKind::CompositingInputs, &mut cx.tracer);
        for frame in self.non_throttled_local_frames(root, TraversalOrder::PreOrder) {
            if !self.is_alive(frame) || !self.active[frame.idx as usize] {
                continue;
            }
            self.advance_lifecycle(frame, LifecycleState::InCompositingInputsUpdate, &mut cx.tracer);
            cx.client.update_compositing_inputs(self, frame);
            if self.is_alive(frame) {
                self.advance_lifecycle(frame, LifecycleState::CompositingInputsClean, &mut cx.tracer);
            }
        }
        pass.phase_end(PhaseKind::CompositingInputs, &mut cx.tracer);
        self.is_alive(root)
            && self.root_state[root.idx as usize].target_state > LifecycleState::CompositingInputsClean
    }

    /// Returns whether the update continues past pre-paint.
    fn run_pre_paint_lifecycle_phase(
        &mut self,
        root: FrameId,
        pass: &mut Pass,
        cx: &mut UpdateContext<'_, '_>,
    ) -> bool {
        pass.phase_begin(PhaseKind::PrePaint, &mut cx.tracer);

        // Children first, so their dirty bits reach the frames embedding them.
        let post_order = self.non_throttled_local_frames(root, TraversalOrder::PostOrder);
        for &frame in &post_order {
            if !self.is_alive(frame) || !self.active[frame.idx as usize] {
                continue;
            }
            self.advance_lifecycle(frame, LifecycleState::InPrePaint, &mut cx.tracer);
            self.execute_pending_direct_updates(frame, cx);
            if self.is_alive(frame) {
                self.propagate_dirty_into_owner(frame.idx);
            }
        }

        for frame in self.non_throttled_local_frames(root, TraversalOrder::PreOrder) {
            if !self.is_alive(frame) || !self.flags[frame.idx as usize].needs_pre_paint() {
                continue;
            }
            cx.client.pre_paint_tree_walk(self, frame);
            if self.is_alive(frame) {
                self.flags[frame.idx as usize].clear_pre_paint();
            }
        }

        if self.is_alive(root) {
            let changes = self.properties.evaluate();
            self.layers
                .invalidate_for_property_changes(&self.properties, &self.config.cull_rect, &changes);
            let disable = self.root_state[root.idx as usize].disable_cull_rect_expansion;
            self.set_cull_rect_needs_update_for_frames(root, disable);
            self.update_cull_rects(root, disable, &mut cx.tracer);
        }

        for frame in post_order {
            if self.is_alive(frame) && self.active[frame.idx as usize] {
                self.advance_lifecycle(frame, LifecycleState::PrePaintClean, &mut cx.tracer);
            }
        }
        pass.phase_end(PhaseKind::PrePaint, &mut cx.tracer);
        self.is_alive(root)
            && self.root_state[root.idx as usize].target_state > LifecycleState::PrePaintClean
    }

    /// Carries cull-rect update flags of child frames into the owner layers
    /// in their parents. With expansion disabled, every scroller recomputes.
    fn set_cull_rect_needs_update_for_frames(&mut self, root: FrameId, disable_expansion: bool) {
        for frame in self.non_throttled_local_frames(root, TraversalOrder::PostOrder) {
            let i = frame.idx as usize;
            let Some(layer) = self.root_layer[i].filter(|l| self.layers.is_alive(*l)) else {
                continue;
            };
            if disable_expansion {
                self.layers.invalidate_scrollers(&self.properties, layer);
            }
            let Some(owner) = self.owner_layer[i].filter(|l| self.layers.is_alive(*l)) else {
                continue;
            };
            if self.layers.needs_cull_rect_update(layer)
                || self.layers.descendant_needs_cull_rect_update(layer)
            {
                self.layers.set_descendant_needs_cull_rect_update(owner);
            }
        }
    }

    fn update_cull_rects(&mut self, root: FrameId, disable_expansion: bool, tracer: &mut Tracer<'_>) {
        let Some(root_layer) = self.root_layer[root.idx as usize].filter(|l| self.layers.is_alive(*l))
        else {
            return;
        };
        let embedded: Vec<(LayerId, LayerId)> = self
            .non_throttled_local_frames(root, TraversalOrder::PreOrder)
            .into_iter()
            .filter(|&frame| frame != root)
            .filter_map(|frame| {
                let i = frame.idx as usize;
                let owner = self.owner_layer[i]?;
                let layer = self.root_layer[i]?;
                (self.layers.is_alive(owner) && self.layers.is_alive(layer)).then_some((owner, layer))
            })
            .collect();
        let updated = CullRectUpdater::new(&self.properties, &self.config.cull_rect)
            .with_embedded_roots(&embedded)
            .with_expansion_disabled(disable_expansion)
            .update(&mut self.layers, root_layer, tracer);
        tracing::trace!(?root, updated, "updated cull rects");
    }

    // -- Post-layout steps --

    /// Whether a frame taking part in the update fell behind pre-paint.
    fn needs_another_pass(&self, root: FrameId) -> bool {
        self.non_throttled_local_frames(root, TraversalOrder::PreOrder)
            .into_iter()
            .any(|frame| {
                let i = frame.idx as usize;
                self.active[i]
                    && (self.lifecycle[i].state() < LifecycleState::PrePaintClean
                        || self.flags[i].needs_layout)
            })
    }

    /// Returns whether the transition dirtied a frame.
    fn run_view_transition_steps(
        &mut self,
        root: FrameId,
        pass: &mut Pass,
        cx: &mut UpdateContext<'_, '_>,
    ) -> bool {
        let target = self.root_state[root.idx as usize].target_state;
        if target < LifecycleState::PrePaintClean {
            return false;
        }
        pass.phase_begin(PhaseKind::ViewTransition, &mut cx.tracer);
        let stage = if target == LifecycleState::PaintClean {
            ViewTransitionStage::DuringMainFrame
        } else {
            ViewTransitionStage::OutsideMainFrame
        };
        for frame in self.non_throttled_local_frames(root, TraversalOrder::PreOrder) {
            if self.is_alive(frame) && self.active[frame.idx as usize] {
                cx.client.run_view_transition_steps(self, frame, stage);
            }
        }
        let rerun = self.is_alive(root) && self.needs_another_pass(root);
        pass.phase_end(PhaseKind::ViewTransition, &mut cx.tracer);
        rerun
    }

    /// Computes and delivers intersection observations that asked for
    /// post-layout delivery. Returns whether a delivery dirtied a frame.
    fn run_post_layout_intersection_observer_steps(
        &mut self,
        root: FrameId,
        pass: &mut Pass,
        cx: &mut UpdateContext<'_, '_>,
    ) -> bool {
        pass.phase_begin(PhaseKind::PostLayoutIntersection, &mut cx.tracer);
        self.update_viewport_intersections_for_subtree(
            root,
            IntersectionUpdateFlags::POST_LAYOUT_DELIVERY_ONLY,
            cx,
        );
        for frame in self.non_throttled_local_frames(root, TraversalOrder::PreOrder) {
            if self.is_alive(frame) && self.active[frame.idx as usize] {
                cx.client
                    .deliver_intersection_observations(self, frame, DeliveryTiming::PostLayout);
            }
        }
        let rerun = self.is_alive(root) && self.needs_another_pass(root);
        pass.phase_end(PhaseKind::PostLayoutIntersection, &mut cx.tracer);
        rerun
    }

    /// Gathers and delivers resize observations. Returns whether layout
    /// has to run again.
    fn run_resize_observer_steps(
        &mut self,
        root: FrameId,
        pass: &mut Pass,
        cx: &mut UpdateContext<'_, '_>,
    ) -> bool {
        if self.root_state[root.idx as usize].target_state != LifecycleState::PaintClean {
            return false;
        }
        pass.phase_begin(PhaseKind::ResizeObserver, &mut cx.tracer);
        let frames = self.non_throttled_local_frames(root, TraversalOrder::PreOrder);
        for &frame in &frames {
            if self.is_alive(frame) {
                self.clear_disconnected_remembered_sizes(frame, cx);
            }
        }

        let mut rerun = false;
        for &frame in &frames {
            if self.is_alive(frame) && self.active[frame.idx as usize] {
                rerun |= cx.client.update_last_successful_position_options(self, frame);
            }
        }
        if !rerun {
            for &frame in &frames {
                if self.is_alive(frame) && self.active[frame.idx as usize] {
                    rerun |= self.notify_resize_observers(frame, pass, cx);
                }
            }
        }
        pass.phase_end(PhaseKind::ResizeObserver, &mut cx.tracer);
        rerun
    }

    fn notify_resize_observers(
        &mut self,
        frame: FrameId,
        pass: &Pass,
        cx: &mut UpdateContext<'_, '_>,
    ) -> bool {
        let i = frame.idx as usize;
        let min_depth = self.resize_min_depth[i];
        let observations = cx.client.gather_resize_observations(self, frame, min_depth);
        if !self.is_alive(frame) {
            return false;
        }
        if let Some(depth) = observations.shallowest_depth {
            self.resize_min_depth[i] = depth;
            cx.client.deliver_resize_observations(self, frame);
            return true;
        }

        if observations.skipped && !self.resize_loop_limit_dispatched[i] {
            tracing::warn!(
                ?frame,
                min_depth,
                "ResizeObserver loop completed with undelivered notifications"
            );
            self.resize_loop_limit_dispatched[i] = true;
            cx.tracer
                .resize_observer_loop_limit(&ResizeObserverLoopLimitEvent {
                    update_index: pass.update_index,
                    frame,
                });
            cx.client.dispatch_resize_observer_loop_error(self, frame);
            // Skipped observations are delivered next frame.
            self.schedule_visual_update();
            if !self.is_alive(frame) {
                return false;
            }
        }
        self.lifecycle[i].state() < LifecycleState::PrePaintClean
    }

    fn clear_resize_observer_limit(&mut self, root: FrameId) {
        for frame in self.non_throttled_local_frames(root, TraversalOrder::PreOrder) {
            let i = frame.idx as usize;
            self.resize_min_depth[i] = 0;
            self.resize_loop_limit_dispatched[i] = false;
        }
    }

    // -- Paint --

    /// Paints the local frame tree of `root` and pushes the result to the
    /// compositor.
    pub(crate) fn run_paint_lifecycle_phase(
        &mut self,
        root: FrameId,
        pass: &mut Pass,
        cx: &mut UpdateContext<'_, '_>,
    ) {
        pass.phase_begin(PhaseKind::Paint, &mut cx.tracer);
        // Printing and paint previews record into their own canvas.
        for frame in self.local_frames(root) {
            if self.is_alive(frame) && cx.client.is_printing_or_painting_preview(self, frame) {
                pass.phase_end(PhaseKind::Paint, &mut cx.tracer);
                return;
            }
        }

        let repainted = self.paint_tree(root, cx);
        pass.summary.set_repainted(repainted);
        if self.is_alive(root) {
            cx.client.push_paint_artifact(self, root, repainted);
            for frame in self.non_throttled_local_frames(root, TraversalOrder::PreOrder) {
                if self.is_alive(frame) {
                    cx.client.update_animations(self, frame);
                }
            }
        }
        pass.phase_end(PhaseKind::Paint, &mut cx.tracer);
    }

    /// Returns whether new paint output was recorded.
    fn paint_tree(&mut self, root: FrameId, cx: &mut UpdateContext<'_, '_>) -> bool {
        let r = root.idx as usize;
        let state = &mut self.root_state[r];
        if state.paint_debug_info_enabled != state.paint_debug_info_desired {
            state.paint_debug_info_enabled = state.paint_debug_info_desired;
            cx.client.set_needs_update(self, root);
            for frame in self.local_frames(root) {
                if let Some(layer) = self.root_layer[frame.idx as usize]
                    .filter(|l| self.layers.is_alive(*l))
                {
                    self.layers.set_needs_repaint_recursively(layer);
                }
            }
        }
        self.root_state[r].paint_frame_count += 1;

        let frames = self.non_throttled_local_frames(root, TraversalOrder::PostOrder);
        for &frame in &frames {
            let i = frame.idx as usize;
            self.eligible_to_paint[i] = true;
            self.advance_lifecycle(frame, LifecycleState::InPaint, &mut cx.tracer);
            let Some(layer) = self.root_layer[i].filter(|l| self.layers.is_alive(*l)) else {
                continue;
            };
            // A child frame's repaint reaches the parent through its owner.
            if self.layers.self_or_descendant_needs_repaint(layer) {
                if let Some(owner) = self.owner_layer[i].filter(|l| self.layers.is_alive(*l)) {
                    self.layers.set_descendant_needs_repaint(owner);
                }
            }
        }
        for frame in self.throttled_local_frames(root) {
            self.eligible_to_paint[frame.idx as usize] = false;
        }

        let needs_paint = self.root_state[r].visual_viewport_or_overlay_needs_repaint
            || self.root_layer[r]
                .filter(|l| self.layers.is_alive(*l))
                .is_some_and(|l| self.layers.self_or_descendant_needs_repaint(l));
        if needs_paint {
            cx.client.paint(self, root);
        }
        if !self.is_alive(root) {
            return needs_paint;
        }
        self.root_state[r].visual_viewport_or_overlay_needs_repaint = false;

        for frame in frames {
            if !self.is_alive(frame) {
                continue;
            }
            self.advance_lifecycle(frame, LifecycleState::PaintClean, &mut cx.tracer);
            if needs_paint {
                if let Some(layer) = self.root_layer[frame.idx as usize]
                    .filter(|l| self.layers.is_alive(*l))
                {
                    self.layers.clear_needs_repaint_recursively(layer);
                }
            }
        }
        needs_paint
    }

    // -- Helpers --

    /// Moves the frame's lifecycle forward to `to`. Frames already there or
    /// beyond are left alone.
    fn advance_lifecycle(&mut self, frame: FrameId, to: LifecycleState, tracer: &mut Tracer<'_>) {
        let lifecycle = &mut self.lifecycle[frame.idx as usize];
        let from = lifecycle.state();
        if from >= to {
            return;
        }
        lifecycle.advance_to(to);
        #[cfg(feature = "trace-rich")]
        tracer.state_transition(&crate::trace::StateTransitionEvent { frame, from, to });
        #[cfg(not(feature = "trace-rich"))]
        let _ = tracer;
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;
    use crate::client::ResizeObservations;
    use crate::geometry::PixelRect;
    use crate::lifecycle::UpdateReason;
    use crate::property::{ClipId, EffectId, PropertyTreeState, ScrollNode, TransformId};
    use kurbo::{Rect, Vec2};
    use crate::testing::{Call, RecordingClient};

    fn update(tree: &mut FrameTree, frame: FrameId, client: &mut RecordingClient) -> bool {
        let mut cx = UpdateContext::new(client);
        tree.update_all_lifecycle_phases(frame, UpdateReason::BeginMainFrame, &mut cx)
    }

    fn tree_with_layers() -> (FrameTree, FrameId, LayerId) {
        let mut tree = FrameTree::new();
        let state = PropertyTreeState::ROOT;
        let layer = tree.layers_mut().create_layer(state, state);
        let main = tree.create_main_frame(Some(layer));
        (tree, main, layer)
    }

    #[test]
    fn phases_run_in_order() {
        let mut tree = FrameTree::new();
        let main = tree.create_main_frame(None);
        let mut client = RecordingClient::new();
        assert!(update(&mut tree, main, &mut client));
        let phases: Vec<Call> = client
            .calls
            .iter()
            .filter(|c| {
                matches!(
                    c,
                    Call::StyleAndLayout(_)
                        | Call::CompositingInputs(_)
                        | Call::ViewTransition(..)
                        | Call::PushPaintArtifact(..)
                )
            })
            .cloned()
            .collect();
        assert_eq!(
            phases,
            vec![
                Call::StyleAndLayout(main),
                Call::CompositingInputs(main),
                Call::ViewTransition(main, ViewTransitionStage::DuringMainFrame),
                Call::PushPaintArtifact(main, false),
            ]
        );
    }

    #[test]
    fn resize_observations_repeat_the_loop_until_settled() {
        let mut tree = FrameTree::new();
        let main = tree.create_main_frame(None);
        let mut client = RecordingClient::new();
        client.resize_observations = vec![
            ResizeObservations {
                shallowest_depth: Some(2),
                skipped: false,
            },
            ResizeObservations {
                shallowest_depth: Some(4),
                skipped: false,
            },
        ];
        client.relayout_on_resize_delivery = true;
        assert!(update(&mut tree, main, &mut client));

        let gathers: Vec<&Call> = client
            .calls
            .iter()
            .filter(|c| matches!(c, Call::GatherResize(..)))
            .collect();
        assert_eq!(
            gathers,
            vec![
                &Call::GatherResize(main, 0),
                &Call::GatherResize(main, 2),
                &Call::GatherResize(main, 4),
            ]
        );
        let layouts = client
            .calls
            .iter()
            .filter(|c| matches!(c, Call::StyleAndLayout(_)))
            .count();
        assert_eq!(layouts, 3, "every delivery dirtied layout");
        assert_eq!(tree.resize_min_depth[main.idx as usize], 0, "limit is reset after the loop");
    }

    #[test]
    fn repeated_passes_rewind_every_participating_frame() {
        let mut tree = FrameTree::new();
        let main = tree.create_main_frame(None);
        let child = tree.create_local_frame(main, None, None);
        tree.begin_lifecycle_updates(child);
        let mut client = RecordingClient::new();
        client.resize_observations = vec![ResizeObservations {
            shallowest_depth: Some(1),
            skipped: false,
        }];
        client.relayout_on_resize_delivery = true;
        client.invalidate_paint_on_layout = Some(child);
        client.watched = vec![child];
        assert!(update(&mut tree, main, &mut client));

        let layouts = client
            .calls
            .iter()
            .filter(|c| **c == Call::StyleAndLayout(main))
            .count();
        assert_eq!(layouts, 2, "the delivery dirtied main");
        assert!(client.invalidation_scheduled.len() >= 2);
        assert!(
            client.invalidation_scheduled.iter().all(|scheduled| !scheduled),
            "pre-paint of the running update handles the invalidation"
        );
        // Main's second layout ran while the child was rewound.
        let layout_states: Vec<LifecycleState> = client
            .calls
            .iter()
            .filter(|c| {
                matches!(
                    c,
                    Call::StyleAndLayout(_)
                        | Call::CompositingInputs(_)
                        | Call::PrePaintWalk(_)
                        | Call::PushPaintArtifact(..)
                )
            })
            .zip(&client.state_log)
            .filter(|(c, _)| **c == Call::StyleAndLayout(main))
            .map(|(_, states)| states[0])
            .collect();
        assert_eq!(layout_states.len(), 2);
        assert_eq!(layout_states[1], LifecycleState::VisualUpdatePending);
        assert_eq!(tree.lifecycle_state(child), LifecycleState::PaintClean);
    }

    #[test]
    fn resize_loop_limit_reports_once() {
        let mut tree = FrameTree::new();
        let main = tree.create_main_frame(None);
        let mut client = RecordingClient::new();
        client.resize_observations = vec![
            ResizeObservations {
                shallowest_depth: None,
                skipped: true,
            },
        ];
        let _ = tree.take_visual_update_request();
        assert!(update(&mut tree, main, &mut client));
        assert!(client.calls.contains(&Call::ResizeLoopError(main)));
        assert!(tree.take_visual_update_request(), "skipped observations need another frame");
        assert!(!tree.resize_loop_limit_dispatched[main.idx as usize]);
    }

    #[test]
    fn position_fallback_changes_repeat_the_loop() {
        let mut tree = FrameTree::new();
        let main = tree.create_main_frame(None);
        let mut client = RecordingClient::new();
        client.position_option_changes = 1;
        assert!(update(&mut tree, main, &mut client));
        let compositing = client
            .calls
            .iter()
            .filter(|c| matches!(c, Call::CompositingInputs(_)))
            .count();
        assert_eq!(compositing, 2);
    }

    #[test]
    fn stale_scroll_snapshots_rerun_style_once() {
        let mut tree = FrameTree::new();
        let main = tree.create_main_frame(None);
        let mut client = RecordingClient::new();
        client.invalid_scroll_snapshots = 5;
        assert!(update(&mut tree, main, &mut client));
        let snapshots = client
            .calls
            .iter()
            .filter(|c| matches!(c, Call::ScrollSnapshot(_)))
            .count();
        assert_eq!(snapshots, 1, "snapshots validate once per update");
        let layouts = client
            .calls
            .iter()
            .filter(|c| matches!(c, Call::StyleAndLayout(_)))
            .count();
        assert_eq!(layouts, 2);
    }

    #[test]
    fn paint_is_skipped_when_nothing_needs_repaint() {
        let (mut tree, main, layer) = tree_with_layers();
        let mut client = RecordingClient::new();
        assert!(update(&mut tree, main, &mut client));
        assert!(client.calls.contains(&Call::Paint(main)));
        assert!(client.calls.contains(&Call::PushPaintArtifact(main, true)));
        assert!(!tree.layers().self_or_descendant_needs_repaint(layer));

        client.calls.clear();
        tree.set_needs_layout(main);
        assert!(update(&mut tree, main, &mut client));
        assert!(!client.calls.contains(&Call::Paint(main)));
        assert!(client.calls.contains(&Call::PushPaintArtifact(main, false)));

        client.calls.clear();
        tree.set_visual_viewport_or_overlay_needs_repaint(main);
        tree.set_needs_layout(main);
        assert!(update(&mut tree, main, &mut client));
        assert!(client.calls.contains(&Call::Paint(main)));
        assert!(!tree.visual_viewport_or_overlay_needs_repaint(main));
        assert_eq!(tree.paint_frame_count(main), 3);
    }

    #[test]
    fn child_frame_repaint_reaches_the_owner() {
        let (mut tree, main, main_layer) = tree_with_layers();
        let state = PropertyTreeState::ROOT;
        let owner = tree.layers_mut().create_layer(state, state);
        tree.layers_mut().add_child(main_layer, owner);
        let child_layer = tree.layers_mut().create_layer(state, state);
        let child = tree.create_local_frame(main, Some(owner), Some(child_layer));
        tree.begin_lifecycle_updates(child);
        let mut client = RecordingClient::new();
        assert!(update(&mut tree, main, &mut client));
        assert!(tree.is_eligible_to_paint(child));

        tree.layers_mut().set_needs_repaint(child_layer);
        tree.set_needs_layout(main);
        client.calls.clear();
        assert!(update(&mut tree, main, &mut client));
        assert!(client.calls.contains(&Call::Paint(main)));
        assert!(!tree.layers().needs_repaint(child_layer));
        assert!(!tree.layers().descendant_needs_repaint(owner));
    }

    #[test]
    fn throttled_children_are_skipped_and_ineligible() {
        let mut tree = FrameTree::new();
        let main = tree.create_main_frame(None);
        let child = tree.create_local_frame(main, None, None);
        let mut client = RecordingClient::new();
        assert!(update(&mut tree, main, &mut client));
        assert!(!client.calls.contains(&Call::StyleAndLayout(child)));
        assert!(!tree.is_eligible_to_paint(child));
        assert_eq!(tree.lifecycle_state(child), LifecycleState::Uninitialized);

        tree.set_needs_layout(child);
        tree.set_needs_paint_property_update(child);
        let before = tree.flags(child);
        assert!(before.needs_layout && before.needs_paint_property_update);
        tree.set_needs_layout(main);
        assert!(update(&mut tree, main, &mut client));
        assert_eq!(tree.flags(child), before, "throttled frames keep their dirty bits");
        assert_eq!(tree.lifecycle_state(child), LifecycleState::Uninitialized);
    }

    #[test]
    fn states_only_advance_and_unthrottled_frames_reach_paint() {
        let mut tree = FrameTree::new();
        let main = tree.create_main_frame(None);
        let visible = tree.create_local_frame(main, None, None);
        tree.begin_lifecycle_updates(visible);
        let hidden = tree.create_local_frame(main, None, None);
        let mut client = RecordingClient::new();
        let mut cx = UpdateContext::new(&mut client);
        tree.update_render_throttling_status(hidden, true, false, false, false, &mut cx);
        tree.set_cross_origin_to_nearest_main_frame(hidden, true);
        tree.set_intersection_observation_state(
            hidden,
            crate::lifecycle::IntersectionObservationState::Required,
        );
        client.watched = vec![main, visible, hidden];

        assert!(update(&mut tree, main, &mut client));
        assert!(client.state_log.len() >= 4);
        for pair in client.state_log.windows(2) {
            for (before, after) in pair[0].iter().zip(&pair[1]) {
                assert!(before <= after, "state went back: {pair:?}");
            }
        }
        assert_eq!(tree.lifecycle_state(main), LifecycleState::PaintClean);
        assert_eq!(tree.lifecycle_state(visible), LifecycleState::PaintClean);
        // Ran only far enough to compute intersections.
        assert_eq!(tree.lifecycle_state(hidden), LifecycleState::PrePaintClean);
    }

    #[test]
    fn required_throttled_frames_run_up_to_pre_paint() {
        let mut tree = FrameTree::new();
        let main = tree.create_main_frame(None);
        let child = tree.create_local_frame(main, None, None);
        let mut client = RecordingClient::new();
        let mut cx = UpdateContext::new(&mut client);
        tree.update_render_throttling_status(child, true, false, false, false, &mut cx);
        tree.set_cross_origin_to_nearest_main_frame(child, true);
        tree.set_intersection_observation_state(
            child,
            crate::lifecycle::IntersectionObservationState::Required,
        );

        assert!(update(&mut tree, main, &mut client));
        assert!(client.calls.contains(&Call::StyleAndLayout(child)));
        assert!(client.calls.iter().any(|c| matches!(c, Call::ComputeIntersections(f, _) if *f == child)));
        assert_eq!(tree.lifecycle_state(child), LifecycleState::PrePaintClean);
        assert!(!tree.is_eligible_to_paint(child));
        assert_eq!(
            tree.intersection_observation_state(child),
            crate::lifecycle::IntersectionObservationState::NotNeeded
        );
    }

    #[test]
    fn child_frames_resize_after_parent_layout() {
        let mut tree = FrameTree::new();
        let main = tree.create_main_frame(None);
        let child = tree.create_local_frame(main, None, None);
        tree.begin_lifecycle_updates(child);
        let mut client = RecordingClient::new();
        client.embedded_rect = Some(PixelRect::new(0, 0, 300, 150));
        assert!(update(&mut tree, main, &mut client));
        assert_eq!(tree.frame_rect(child), PixelRect::new(0, 0, 300, 150));
        let order: Vec<&Call> = client
            .calls
            .iter()
            .filter(|c| matches!(c, Call::StyleAndLayout(_) | Call::FrameSizeChanged(_)))
            .collect();
        assert_eq!(
            order,
            vec![
                &Call::StyleAndLayout(main),
                &Call::FrameSizeChanged(child),
                &Call::StyleAndLayout(child),
            ]
        );
    }

    /// A main frame whose root layer clips to an 800x600 viewport, holding
    /// one 200x200 scroller over 20000px of contents.
    fn tree_with_scroller() -> (FrameTree, FrameId, LayerId, TransformId) {
        let mut tree = FrameTree::new();
        let trees = tree.properties_mut();
        let viewport_clip = trees.create_clip(
            ClipId::ROOT,
            TransformId::ROOT,
            Some(Rect::new(0.0, 0.0, 800.0, 600.0)),
        );
        let viewport = PropertyTreeState::new(TransformId::ROOT, viewport_clip, EffectId::ROOT);
        let scroll = trees.create_scroll_translation(
            TransformId::ROOT,
            ScrollNode::new(PixelRect::new(0, 0, 200, 200), PixelRect::new(0, 0, 200, 20_000)),
        );
        let scroll_clip = trees.create_clip(
            viewport_clip,
            TransformId::ROOT,
            Some(Rect::new(0.0, 0.0, 200.0, 200.0)),
        );
        let scrolled = PropertyTreeState::new(scroll, scroll_clip, EffectId::ROOT);

        let layers = tree.layers_mut();
        let root_layer = layers.create_layer(PropertyTreeState::ROOT, viewport);
        let scroller = layers.create_layer(viewport, scrolled);
        layers.add_child(root_layer, scroller);
        let main = tree.create_main_frame(Some(root_layer));
        (tree, main, scroller, scroll)
    }

    #[test]
    fn long_scrolls_move_the_cull_rect() {
        let (mut tree, main, scroller, scroll) = tree_with_scroller();
        let mut client = RecordingClient::new();
        assert!(update(&mut tree, main, &mut client));
        let Some(first) = tree.layers().contents_cull_rect(scroller) else {
            panic!("contents cull rect not computed");
        };
        assert!(!first.is_infinite());

        tree.properties_mut()
            .set_scroll_offset(scroll, Vec2::new(0.0, 8000.0));
        tree.set_needs_paint_property_update(main);
        client.calls.clear();
        assert!(update(&mut tree, main, &mut client));
        let Some(second) = tree.layers().contents_cull_rect(scroller) else {
            panic!("contents cull rect not computed");
        };
        assert_ne!(first, second);
        assert!(client.calls.contains(&Call::Paint(main)));
    }

    #[test]
    fn disabling_expansion_recomputes_exact_cull_rects() {
        let (mut tree, main, scroller, _) = tree_with_scroller();
        let mut client = RecordingClient::new();
        assert!(update(&mut tree, main, &mut client));
        let Some(expanded) = tree.layers().contents_cull_rect(scroller) else {
            panic!("contents cull rect not computed");
        };
        assert!(expanded.rect().height() > 200, "got {expanded:?}");

        tree.set_disable_cull_rect_expansion(main, true);
        assert!(tree.cull_rect_expansion_disabled(main));
        assert!(update(&mut tree, main, &mut client));
        let Some(exact) = tree.layers().contents_cull_rect(scroller) else {
            panic!("contents cull rect not computed");
        };
        assert_eq!(exact.rect().height(), 200, "got {exact:?}");
    }
}
