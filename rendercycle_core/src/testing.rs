// Copyright 2026 the Rendercycle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A scripted [`LifecycleClient`](crate::client::LifecycleClient) for tests.
//!
//! [`RecordingClient`] logs every hook that acts (queries are not logged)
//! and answers queries from its public fields.

use alloc::vec::Vec;

use kurbo::Vec2;

use crate::client::{
    Compositor, DeliveryTiming, LayoutEngine, NoopClient, ObserverHost, ResizeObservations,
    ViewTransitionStage,
};
use crate::error::LifecycleUpdateError;
use crate::frame::{ElementId, FrameId, FrameTree, ObjectId, PluginId, ScrollableAreaId};
use crate::geometry::PixelRect;
use crate::lifecycle::{IntersectionUpdateFlags, LifecycleState, UpdateContext, UpdateReason};

/// One logged hook call.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Call {
    StyleAndLayout(FrameId),
    ScrollAnchoring(FrameId),
    StickyConstraints(FrameId, ScrollableAreaId),
    SnapAfterLayout(FrameId, ScrollableAreaId),
    PluginGeometry(FrameId, PluginId),
    PluginLifecycle(FrameId, PluginId),
    FrameSizeChanged(FrameId),
    ScrollSnapshot(FrameId),
    CompositingInputs(FrameId),
    PrePaintWalk(FrameId),
    DirectTransform(FrameId, ObjectId),
    DirectOpacity(FrameId, ObjectId),
    MarkNeedsPaintPropertyUpdate(FrameId, ObjectId),
    ClearRememberedSize(FrameId, ElementId),
    ComputeIntersections(FrameId, IntersectionUpdateFlags),
    ScrollDelta(FrameId, Vec2),
    DeliverIntersections(FrameId, DeliveryTiming),
    GatherResize(FrameId, u32),
    DeliverResize(FrameId),
    ResizeLoopError(FrameId),
    ViewTransition(FrameId, ViewTransitionStage),
    WillStart(FrameId),
    DidFinish(FrameId),
    Paint(FrameId),
    PushPaintArtifact(FrameId, bool),
    SetNeedsUpdate(FrameId),
    CompositingRect(FrameId),
    Animations(FrameId),
}

#[derive(Debug, Default)]
pub(crate) struct RecordingClient {
    pub(crate) calls: Vec<Call>,
    /// Direct transform and opacity updates succeed.
    pub(crate) accept_direct_updates: bool,
    /// Snap-container data always reports a change.
    pub(crate) snap_data_changes: bool,
    pub(crate) scroll_gesture_active: bool,
    /// Sticky updates queue themselves again while being drained.
    pub(crate) re_add_sticky: bool,
    pub(crate) connected_elements: Vec<ElementId>,
    pub(crate) embedded_rect: Option<PixelRect>,
    /// Number of scroll-snapshot validations still to fail.
    pub(crate) invalid_scroll_snapshots: u32,
    /// Number of position-option updates still to report a change.
    pub(crate) position_option_changes: u32,
    /// Answers for successive resize gathers; then nothing.
    pub(crate) resize_observations: Vec<ResizeObservations>,
    /// Resize deliveries dirty layout.
    pub(crate) relayout_on_resize_delivery: bool,
    pub(crate) occlusion_tracking: bool,
    /// Start a nested update from the next layout.
    pub(crate) reenter_during_layout: bool,
    pub(crate) reentry_result: Option<Result<bool, LifecycleUpdateError>>,
    /// Every layout invalidates this frame's paint.
    pub(crate) invalidate_paint_on_layout: Option<FrameId>,
    /// Whether each of those invalidations asked for a visual update.
    pub(crate) invalidation_scheduled: Vec<bool>,
    /// Frames whose states are logged at each phase hook.
    pub(crate) watched: Vec<FrameId>,
    pub(crate) state_log: Vec<Vec<LifecycleState>>,
}

impl RecordingClient {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn log_states(&mut self, tree: &FrameTree) {
        if !self.watched.is_empty() {
            let states = self.watched.iter().map(|&f| tree.lifecycle_state(f)).collect();
            self.state_log.push(states);
        }
    }
}

impl LayoutEngine for RecordingClient {
    fn update_style_and_layout(&mut self, tree: &mut FrameTree, frame: FrameId) {
        self.calls.push(Call::StyleAndLayout(frame));
        self.log_states(tree);
        if let Some(target) = self.invalidate_paint_on_layout {
            let _ = tree.take_visual_update_request();
            tree.set_should_check_for_paint_invalidation(target);
            self.invalidation_scheduled.push(tree.take_visual_update_request());
        }
        if core::mem::take(&mut self.reenter_during_layout) {
            let mut noop = NoopClient;
            let mut cx = UpdateContext::new(&mut noop);
            self.reentry_result = Some(tree.try_update_lifecycle_phases(
                frame,
                LifecycleState::LayoutClean,
                UpdateReason::Script,
                &mut cx,
            ));
        }
    }

    fn perform_scroll_anchoring_adjustments(&mut self, _: &mut FrameTree, frame: FrameId) {
        self.calls.push(Call::ScrollAnchoring(frame));
    }

    fn update_sticky_constraints(
        &mut self,
        tree: &mut FrameTree,
        frame: FrameId,
        area: ScrollableAreaId,
    ) {
        self.calls.push(Call::StickyConstraints(frame, area));
        if self.re_add_sticky {
            tree.add_pending_sticky_update(frame, area);
        }
    }

    fn update_snap_container_data(
        &mut self,
        _: &mut FrameTree,
        _: FrameId,
        _: ScrollableAreaId,
    ) -> bool {
        self.snap_data_changes
    }

    fn snap_after_layout(&mut self, _: &mut FrameTree, frame: FrameId, area: ScrollableAreaId) {
        self.calls.push(Call::SnapAfterLayout(frame, area));
    }

    fn is_scroll_gesture_active(&mut self, _: &mut FrameTree, _: FrameId) -> bool {
        self.scroll_gesture_active
    }

    fn embedded_content_rect(&mut self, _: &mut FrameTree, _: FrameId) -> Option<PixelRect> {
        self.embedded_rect
    }

    fn update_plugin_geometry(&mut self, _: &mut FrameTree, frame: FrameId, plugin: PluginId) {
        self.calls.push(Call::PluginGeometry(frame, plugin));
    }

    fn update_plugin_lifecycle(&mut self, _: &mut FrameTree, frame: FrameId, plugin: PluginId) {
        self.calls.push(Call::PluginLifecycle(frame, plugin));
    }

    fn frame_size_changed(&mut self, _: &mut FrameTree, frame: FrameId) {
        self.calls.push(Call::FrameSizeChanged(frame));
    }

    fn validate_scroll_snapshot_clients(&mut self, _: &mut FrameTree, frame: FrameId) -> bool {
        self.calls.push(Call::ScrollSnapshot(frame));
        if self.invalid_scroll_snapshots > 0 {
            self.invalid_scroll_snapshots -= 1;
            return false;
        }
        true
    }

    fn update_compositing_inputs(&mut self, tree: &mut FrameTree, frame: FrameId) {
        self.calls.push(Call::CompositingInputs(frame));
        self.log_states(tree);
    }

    fn pre_paint_tree_walk(&mut self, tree: &mut FrameTree, frame: FrameId) {
        self.calls.push(Call::PrePaintWalk(frame));
        self.log_states(tree);
    }

    fn directly_update_transform(
        &mut self,
        _: &mut FrameTree,
        frame: FrameId,
        object: ObjectId,
    ) -> bool {
        self.calls.push(Call::DirectTransform(frame, object));
        self.accept_direct_updates
    }

    fn directly_update_opacity(
        &mut self,
        _: &mut FrameTree,
        frame: FrameId,
        object: ObjectId,
    ) -> bool {
        self.calls.push(Call::DirectOpacity(frame, object));
        self.accept_direct_updates
    }

    fn mark_needs_paint_property_update(
        &mut self,
        _: &mut FrameTree,
        frame: FrameId,
        object: ObjectId,
    ) {
        self.calls.push(Call::MarkNeedsPaintPropertyUpdate(frame, object));
    }

    fn update_last_successful_position_options(&mut self, _: &mut FrameTree, _: FrameId) -> bool {
        if self.position_option_changes > 0 {
            self.position_option_changes -= 1;
            return true;
        }
        false
    }

    fn is_element_connected(&mut self, _: &mut FrameTree, _: FrameId, element: ElementId) -> bool {
        self.connected_elements.contains(&element)
    }

    fn clear_remembered_size(&mut self, _: &mut FrameTree, frame: FrameId, element: ElementId) {
        self.calls.push(Call::ClearRememberedSize(frame, element));
    }
}

impl ObserverHost for RecordingClient {
    fn compute_intersections(
        &mut self,
        _: &mut FrameTree,
        frame: FrameId,
        flags: IntersectionUpdateFlags,
        scroll_delta: Vec2,
    ) -> bool {
        self.calls.push(Call::ComputeIntersections(frame, flags));
        if scroll_delta != Vec2::ZERO {
            self.calls.push(Call::ScrollDelta(frame, scroll_delta));
        }
        self.occlusion_tracking
    }

    fn deliver_intersection_observations(
        &mut self,
        _: &mut FrameTree,
        frame: FrameId,
        timing: DeliveryTiming,
    ) {
        self.calls.push(Call::DeliverIntersections(frame, timing));
    }

    fn gather_resize_observations(
        &mut self,
        _: &mut FrameTree,
        frame: FrameId,
        deeper_than: u32,
    ) -> ResizeObservations {
        self.calls.push(Call::GatherResize(frame, deeper_than));
        if self.resize_observations.is_empty() {
            ResizeObservations::default()
        } else {
            self.resize_observations.remove(0)
        }
    }

    fn deliver_resize_observations(&mut self, tree: &mut FrameTree, frame: FrameId) {
        self.calls.push(Call::DeliverResize(frame));
        if self.relayout_on_resize_delivery {
            tree.set_needs_layout(frame);
        }
    }

    fn dispatch_resize_observer_loop_error(&mut self, _: &mut FrameTree, frame: FrameId) {
        self.calls.push(Call::ResizeLoopError(frame));
    }

    fn run_view_transition_steps(
        &mut self,
        _: &mut FrameTree,
        frame: FrameId,
        stage: ViewTransitionStage,
    ) {
        self.calls.push(Call::ViewTransition(frame, stage));
    }

    fn will_start_lifecycle_update(&mut self, _: &mut FrameTree, frame: FrameId) {
        self.calls.push(Call::WillStart(frame));
    }

    fn did_finish_lifecycle_update(&mut self, _: &mut FrameTree, frame: FrameId) {
        self.calls.push(Call::DidFinish(frame));
    }
}

impl Compositor for RecordingClient {
    fn paint(&mut self, _: &mut FrameTree, frame: FrameId) {
        self.calls.push(Call::Paint(frame));
    }

    fn push_paint_artifact(&mut self, tree: &mut FrameTree, frame: FrameId, repainted: bool) {
        self.calls.push(Call::PushPaintArtifact(frame, repainted));
        self.log_states(tree);
    }

    fn set_needs_update(&mut self, _: &mut FrameTree, frame: FrameId) {
        self.calls.push(Call::SetNeedsUpdate(frame));
    }

    fn update_compositing_rect(&mut self, _: &mut FrameTree, frame: FrameId) {
        self.calls.push(Call::CompositingRect(frame));
    }

    fn update_animations(&mut self, _: &mut FrameTree, frame: FrameId) {
        self.calls.push(Call::Animations(frame));
    }
}
