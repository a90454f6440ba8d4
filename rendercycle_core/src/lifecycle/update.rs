// Copyright 2026 the Rendercycle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Entry points of a lifecycle update.

use core::fmt;

use super::phases::Pass;
use super::scope::{TargetStateScope, ThrottlingScope};
use super::state::{LifecycleState, UpdateReason};
use super::throttle::IntersectionObservationState;
use crate::client::LifecycleClient;
use crate::error::LifecycleUpdateError;
use crate::frame::{FrameId, FrameKind, FrameTree};
use crate::trace::{Tracer, UpdateBeginEvent, UpdateEndEvent, UpdateRejectedEvent};

/// The collaborators of one call into the lifecycle: a client and a tracer.
pub struct UpdateContext<'c, 't> {
    /// Layout, observer and compositor hooks.
    pub client: &'c mut dyn LifecycleClient,
    /// Structured instrumentation.
    pub tracer: Tracer<'t>,
}

impl fmt::Debug for UpdateContext<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdateContext")
            .field("tracer", &self.tracer)
            .finish_non_exhaustive()
    }
}

impl<'c, 't> UpdateContext<'c, 't> {
    /// A context without tracing.
    pub fn new(client: &'c mut dyn LifecycleClient) -> Self {
        Self {
            client,
            tracer: Tracer::none(),
        }
    }

    /// A context that reports to `tracer`.
    pub fn with_tracer(client: &'c mut dyn LifecycleClient, tracer: Tracer<'t>) -> Self {
        Self { client, tracer }
    }
}

impl FrameTree {
    /// Runs the lifecycle of `frame`'s local frame tree up to `target`.
    ///
    /// Returns `Ok(true)` if `frame` ended exactly at `target`. A throttled
    /// local root that does not need intersection observation does no work
    /// and reports whether it already was there.
    ///
    /// # Errors
    ///
    /// Returns an error without doing any work if `target` is not a
    /// supported target, if the frame is not a local frame root (or a
    /// detached frame being printed), if its document is inactive or
    /// postponed, or if an update is already running on the frame.
    ///
    /// # Panics
    ///
    /// Panics if `frame` is stale.
    pub fn try_update_lifecycle_phases(
        &mut self,
        frame: FrameId,
        target: LifecycleState,
        reason: UpdateReason,
        cx: &mut UpdateContext<'_, '_>,
    ) -> Result<bool, LifecycleUpdateError> {
        self.validate(frame);
        if let Err(error) = self.check_update(frame, target, reason) {
            cx.tracer.update_rejected(&UpdateRejectedEvent {
                frame,
                target,
                error,
            });
            return Err(error);
        }

        let i = frame.idx as usize;
        if self.should_throttle_rendering_at(frame.idx)
            && self.intersection_state[i] < IntersectionObservationState::Required
        {
            return Ok(self.lifecycle[i].state() == target);
        }

        self.prepare_for_lifecycle_update_recursive(frame);

        let mut scope = TargetStateScope::new(self, frame, target);
        scope.update_count += 1;
        let begin = UpdateBeginEvent {
            update_index: scope.update_count,
            frame,
            target,
            reason,
        };
        cx.tracer.update_begin(&begin);
        let mut pass = Pass::new(&begin);

        if target == LifecycleState::PaintClean {
            scope.notify_lifecycle_start(frame, cx);
        }

        let forced_debug_info = reason == UpdateReason::Test;
        let previous_debug_info = scope.root_state[i].paint_debug_info_desired;
        if forced_debug_info {
            scope.root_state[i].paint_debug_info_desired = true;
        }

        scope.update_lifecycle_phases_internal(frame, &mut pass, cx);

        if scope.is_alive(frame) {
            if forced_debug_info {
                scope.root_state[i].paint_debug_info_desired = previous_debug_info;
            }
            if target == LifecycleState::PaintClean {
                for f in scope.local_frames(frame) {
                    if scope.is_alive(f) {
                        cx.client.did_finish_lifecycle_update(&mut scope, f);
                    }
                }
            }
        }

        let reached = scope.is_alive(frame) && scope.lifecycle[i].state() == target;
        cx.tracer.update_end(&UpdateEndEvent {
            update_index: begin.update_index,
            frame,
            reached,
            iterations: pass.summary.iterations(),
        });
        cx.tracer.lifecycle_summary(&pass.summary.finish(reached));
        Ok(reached)
    }

    /// Runs the lifecycle up to `target` and reports whether `frame` got
    /// there. Rejected updates report `false`.
    pub fn update_lifecycle_phases(
        &mut self,
        frame: FrameId,
        target: LifecycleState,
        reason: UpdateReason,
        cx: &mut UpdateContext<'_, '_>,
    ) -> bool {
        self.try_update_lifecycle_phases(frame, target, reason, cx)
            .unwrap_or(false)
    }

    /// Runs every phase through paint on `frame`'s local frame tree, skipping
    /// throttled frames.
    pub fn update_all_lifecycle_phases(
        &mut self,
        frame: FrameId,
        reason: UpdateReason,
        cx: &mut UpdateContext<'_, '_>,
    ) -> bool {
        let root = self.update_root(frame);
        let mut scope = ThrottlingScope::allow(self, root);
        scope.update_lifecycle_phases(root, LifecycleState::PaintClean, reason, cx)
    }

    /// Runs every phase except paint.
    pub fn update_all_lifecycle_phases_except_paint(
        &mut self,
        frame: FrameId,
        reason: UpdateReason,
        cx: &mut UpdateContext<'_, '_>,
    ) -> bool {
        let root = self.update_root(frame);
        self.update_lifecycle_phases(root, LifecycleState::PrePaintClean, reason, cx)
    }

    /// Runs the lifecycle through pre-paint.
    pub fn update_lifecycle_to_pre_paint_clean(
        &mut self,
        frame: FrameId,
        reason: UpdateReason,
        cx: &mut UpdateContext<'_, '_>,
    ) -> bool {
        let root = self.update_root(frame);
        self.update_lifecycle_phases(root, LifecycleState::PrePaintClean, reason, cx)
    }

    /// Runs the lifecycle through compositing inputs.
    pub fn update_lifecycle_to_compositing_inputs_clean(
        &mut self,
        frame: FrameId,
        reason: UpdateReason,
        cx: &mut UpdateContext<'_, '_>,
    ) -> bool {
        let root = self.update_root(frame);
        self.update_lifecycle_phases(root, LifecycleState::CompositingInputsClean, reason, cx)
    }

    /// Runs style and layout only.
    pub fn update_lifecycle_to_layout_clean(
        &mut self,
        frame: FrameId,
        reason: UpdateReason,
        cx: &mut UpdateContext<'_, '_>,
    ) -> bool {
        let root = self.update_root(frame);
        self.update_lifecycle_phases(root, LifecycleState::LayoutClean, reason, cx)
    }

    // -- Local-root settings --

    /// Forces the next paint of `frame`'s local root to repaint even if no
    /// layer asked for it.
    pub fn set_visual_viewport_or_overlay_needs_repaint(&mut self, frame: FrameId) {
        self.validate(frame);
        let root = self.local_root_idx(frame.idx);
        self.root_state[root as usize].visual_viewport_or_overlay_needs_repaint = true;
        self.schedule_visual_update_for_paint_invalidation_if_needed(frame);
    }

    /// Whether the next paint repaints regardless of layer flags.
    #[must_use]
    pub fn visual_viewport_or_overlay_needs_repaint(&self, frame: FrameId) -> bool {
        self.validate(frame);
        let root = self.local_root_idx(frame.idx);
        self.root_state[root as usize].visual_viewport_or_overlay_needs_repaint
    }

    /// Asks for paint debug info on `frame`'s local root. A change takes
    /// effect at the next paint, which then repaints everything.
    pub fn set_paint_debug_info_enabled(&mut self, frame: FrameId, enabled: bool) {
        self.validate(frame);
        let root = self.local_root_idx(frame.idx);
        self.root_state[root as usize].paint_debug_info_desired = enabled;
        self.schedule_visual_update();
    }

    /// Whether the last paint of `frame`'s local root recorded debug info.
    #[must_use]
    pub fn paint_debug_info_enabled(&self, frame: FrameId) -> bool {
        self.validate(frame);
        let root = self.local_root_idx(frame.idx);
        self.root_state[root as usize].paint_debug_info_enabled
    }

    /// Turns cull-rect expansion off (or back on) for `frame`'s local root.
    /// Every scrolling layer recomputes its cull rects at the next pre-paint.
    pub fn set_disable_cull_rect_expansion(&mut self, frame: FrameId, disable: bool) {
        self.validate(frame);
        let root = self.local_root_idx(frame.idx);
        let state = &mut self.root_state[root as usize];
        if state.disable_cull_rect_expansion == disable {
            return;
        }
        state.disable_cull_rect_expansion = disable;
        self.set_needs_paint_property_update(self.id_at(root));
    }

    /// Whether cull-rect expansion is off for `frame`'s local root.
    #[must_use]
    pub fn cull_rect_expansion_disabled(&self, frame: FrameId) -> bool {
        self.validate(frame);
        let root = self.local_root_idx(frame.idx);
        self.root_state[root as usize].disable_cull_rect_expansion
    }

    // -- Internals --

    /// Where the convenience wrappers start: the local root, unless the
    /// frame is detached.
    fn update_root(&self, frame: FrameId) -> FrameId {
        self.validate(frame);
        if self.detached[frame.idx as usize] {
            frame
        } else {
            self.local_root(frame)
        }
    }

    fn check_update(
        &self,
        frame: FrameId,
        target: LifecycleState,
        reason: UpdateReason,
    ) -> Result<(), LifecycleUpdateError> {
        let i = frame.idx as usize;
        if self.kind[i] == FrameKind::Remote {
            return Err(LifecycleUpdateError::NotLocalRoot(frame));
        }
        if !target.is_supported_target() {
            return Err(LifecycleUpdateError::UnsupportedTarget(target));
        }
        if self.lifecycle[i].is_postponed() {
            return Err(LifecycleUpdateError::LifecyclePostponed(frame));
        }
        if self.is_updating_at(frame.idx) {
            tracing::debug!(?frame, ?target, "rejecting re-entrant lifecycle update");
            return Err(LifecycleUpdateError::Reentrant);
        }
        if self.detached[i] {
            if reason != UpdateReason::Printing {
                return Err(LifecycleUpdateError::Detached(frame));
            }
        } else if !self.is_local_root(frame) {
            return Err(LifecycleUpdateError::NotLocalRoot(frame));
        }
        if !self.active[i] {
            return Err(LifecycleUpdateError::InactiveDocument(frame));
        }
        Ok(())
    }

    /// Rewinds every frame that will take part in the update to at most
    /// [`VisualUpdatePending`](LifecycleState::VisualUpdatePending).
    fn prepare_for_lifecycle_update_recursive(&mut self, root: FrameId) {
        for frame in self.local_frames(root) {
            let i = frame.idx as usize;
            if !self.should_throttle_rendering_at(frame.idx)
                || self.intersection_state[i] == IntersectionObservationState::Required
            {
                self.lifecycle[i].ensure_state_at_most(LifecycleState::VisualUpdatePending);
            }
        }
    }

    /// Tells observers a full update starts and runs queued one-shot tasks.
    fn notify_lifecycle_start(&mut self, root: FrameId, cx: &mut UpdateContext<'_, '_>) {
        for frame in self.local_frames(root) {
            if self.is_alive(frame) && !self.should_throttle_rendering_at(frame.idx) {
                cx.client.will_start_lifecycle_update(self, frame);
            }
        }
        for frame in self.local_frames(root) {
            if !self.is_alive(frame) || self.should_throttle_rendering_at(frame.idx) {
                continue;
            }
            let tasks = core::mem::take(&mut self.start_of_lifecycle_tasks[frame.idx as usize].0);
            for task in tasks {
                task(self);
            }
        }
    }
}
