// Copyright 2026 the Rendercycle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Collaborators consumed by the lifecycle driver.
//!
//! Layout, observers and compositing live outside this crate. The driver
//! reaches them through three traits, bundled as [`LifecycleClient`]. Every
//! hook has a default that does nothing (or reports "nothing changed"), so a
//! client only implements the hooks it cares about.
//!
//! Hooks receive the [`FrameTree`] mutably: a collaborator may dirty frames,
//! queue pending updates or even create and destroy frames. The driver
//! re-checks liveness after each call.

use crate::frame::{ElementId, FrameId, FrameTree, ObjectId, PluginId, ScrollableAreaId};
use crate::geometry::PixelRect;
use crate::lifecycle::IntersectionUpdateFlags;
use kurbo::Vec2;

/// When intersection observations are delivered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DeliveryTiming {
    /// Observers that asked for delivery right after layout.
    PostLayout,
    /// Everything else, after the update finished.
    Synchronous,
}

/// Which view-transition step is running.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ViewTransitionStage {
    /// An update that does not paint, such as a forced layout.
    OutsideMainFrame,
    /// The main-frame update heading for paint.
    DuringMainFrame,
}

/// What a resize-observer gathering pass found.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ResizeObservations {
    /// Depth of the shallowest observed target with a pending observation
    /// deeper than the requested depth, if any.
    pub shallowest_depth: Option<u32>,
    /// Whether observations were skipped because they were not deeper than
    /// the requested depth.
    pub skipped: bool,
}

/// Style, layout and paint-property hooks.
pub trait LayoutEngine {
    /// Recalculates style and runs layout for one frame. Clear the flags that
    /// were acted on; the driver has already cleared `needs_style_recalc` and
    /// `needs_layout` and retries once if they are set again.
    fn update_style_and_layout(&mut self, tree: &mut FrameTree, frame: FrameId) {
        let _ = (tree, frame);
    }

    /// Applies scroll-anchoring adjustments after layout.
    fn perform_scroll_anchoring_adjustments(&mut self, tree: &mut FrameTree, frame: FrameId) {
        let _ = (tree, frame);
    }

    /// Recomputes the sticky-position constraints of a scroller.
    fn update_sticky_constraints(
        &mut self,
        tree: &mut FrameTree,
        frame: FrameId,
        area: ScrollableAreaId,
    ) {
        let _ = (tree, frame, area);
    }

    /// Recomputes snap-container data. Returns whether it changed, in which
    /// case the scroller is snapped again.
    fn update_snap_container_data(
        &mut self,
        tree: &mut FrameTree,
        frame: FrameId,
        area: ScrollableAreaId,
    ) -> bool {
        let _ = (tree, frame, area);
        false
    }

    /// Snaps a scroller to its snap positions after layout.
    fn snap_after_layout(&mut self, tree: &mut FrameTree, frame: FrameId, area: ScrollableAreaId) {
        let _ = (tree, frame, area);
    }

    /// Whether the user is scrolling the frame right now.
    fn is_scroll_gesture_active(&mut self, tree: &mut FrameTree, frame: FrameId) -> bool {
        let _ = (tree, frame);
        false
    }

    /// The laid-out rect of an embedded frame in its parent, or `None` if
    /// its owner has no layout box.
    fn embedded_content_rect(&mut self, tree: &mut FrameTree, frame: FrameId) -> Option<PixelRect> {
        let _ = (tree, frame);
        None
    }

    /// Repositions a plugin after its owner frame's layout.
    fn update_plugin_geometry(&mut self, tree: &mut FrameTree, frame: FrameId, plugin: PluginId) {
        let _ = (tree, frame, plugin);
    }

    /// Gives a plugin a chance to run its own lifecycle after layout.
    fn update_plugin_lifecycle(&mut self, tree: &mut FrameTree, frame: FrameId, plugin: PluginId) {
        let _ = (tree, frame, plugin);
    }

    /// An embedded local frame changed size.
    fn frame_size_changed(&mut self, tree: &mut FrameTree, frame: FrameId) {
        let _ = (tree, frame);
    }

    /// Validates scroll-linked timeline snapshots. Returns `false` if a
    /// snapshot was stale, which dirties style and repeats the loop.
    fn validate_scroll_snapshot_clients(&mut self, tree: &mut FrameTree, frame: FrameId) -> bool {
        let _ = (tree, frame);
        true
    }

    /// Updates descendant-dependent flags and commits pending selection.
    fn update_compositing_inputs(&mut self, tree: &mut FrameTree, frame: FrameId) {
        let _ = (tree, frame);
    }

    /// Runs the paint-property tree walk for one frame.
    fn pre_paint_tree_walk(&mut self, tree: &mut FrameTree, frame: FrameId) {
        let _ = (tree, frame);
    }

    /// Writes a new transform straight into the object's cached transform
    /// node. Returns `false` if the object needs a full property update.
    fn directly_update_transform(
        &mut self,
        tree: &mut FrameTree,
        frame: FrameId,
        object: ObjectId,
    ) -> bool {
        let _ = (tree, frame, object);
        false
    }

    /// Writes a new opacity straight into the object's cached effect node.
    /// Returns `false` if the object needs a full property update.
    fn directly_update_opacity(
        &mut self,
        tree: &mut FrameTree,
        frame: FrameId,
        object: ObjectId,
    ) -> bool {
        let _ = (tree, frame, object);
        false
    }

    /// Marks one object for a full paint-property update.
    fn mark_needs_paint_property_update(
        &mut self,
        tree: &mut FrameTree,
        frame: FrameId,
        object: ObjectId,
    ) {
        let _ = (tree, frame, object);
    }

    /// Re-resolves `position-try` fallbacks. Returns whether any anchored
    /// element changed its last successful option.
    fn update_last_successful_position_options(
        &mut self,
        tree: &mut FrameTree,
        frame: FrameId,
    ) -> bool {
        let _ = (tree, frame);
        false
    }

    /// Whether the element is connected to its document again.
    fn is_element_connected(
        &mut self,
        tree: &mut FrameTree,
        frame: FrameId,
        element: ElementId,
    ) -> bool {
        let _ = (tree, frame, element);
        false
    }

    /// Forgets the remembered size of a disconnected element.
    fn clear_remembered_size(&mut self, tree: &mut FrameTree, frame: FrameId, element: ElementId) {
        let _ = (tree, frame, element);
    }

    /// Whether the frame is being printed or captured as a paint preview.
    /// Such frames are painted elsewhere; the paint phase is skipped.
    fn is_printing_or_painting_preview(&mut self, tree: &mut FrameTree, frame: FrameId) -> bool {
        let _ = (tree, frame);
        false
    }
}

/// Observer and view-transition hooks.
pub trait ObserverHost {
    /// Computes intersections for the frame's observers. `scroll_delta` is
    /// the absolute scroll distance accumulated since the last computation.
    /// Returns whether occlusion tracking is needed.
    fn compute_intersections(
        &mut self,
        tree: &mut FrameTree,
        frame: FrameId,
        flags: IntersectionUpdateFlags,
        scroll_delta: Vec2,
    ) -> bool {
        let _ = (tree, frame, flags, scroll_delta);
        false
    }

    /// Delivers queued intersection observations.
    fn deliver_intersection_observations(
        &mut self,
        tree: &mut FrameTree,
        frame: FrameId,
        timing: DeliveryTiming,
    ) {
        let _ = (tree, frame, timing);
    }

    /// Gathers active resize observations whose targets are deeper than
    /// `deeper_than`.
    fn gather_resize_observations(
        &mut self,
        tree: &mut FrameTree,
        frame: FrameId,
        deeper_than: u32,
    ) -> ResizeObservations {
        let _ = (tree, frame, deeper_than);
        ResizeObservations::default()
    }

    /// Delivers the gathered resize observations.
    fn deliver_resize_observations(&mut self, tree: &mut FrameTree, frame: FrameId) {
        let _ = (tree, frame);
    }

    /// Reports "ResizeObserver loop completed with undelivered notifications".
    fn dispatch_resize_observer_loop_error(&mut self, tree: &mut FrameTree, frame: FrameId) {
        let _ = (tree, frame);
    }

    /// Runs view-transition steps for one frame.
    fn run_view_transition_steps(
        &mut self,
        tree: &mut FrameTree,
        frame: FrameId,
        stage: ViewTransitionStage,
    ) {
        let _ = (tree, frame, stage);
    }

    /// A full update is about to run on the frame.
    fn will_start_lifecycle_update(&mut self, tree: &mut FrameTree, frame: FrameId) {
        let _ = (tree, frame);
    }

    /// A full update finished on the frame.
    fn did_finish_lifecycle_update(&mut self, tree: &mut FrameTree, frame: FrameId) {
        let _ = (tree, frame);
    }
}

/// Paint and compositor hooks.
pub trait Compositor {
    /// Records paint output for the local root `frame` and the unthrottled
    /// frames below it.
    fn paint(&mut self, tree: &mut FrameTree, frame: FrameId) {
        let _ = (tree, frame);
    }

    /// Hands the paint output to the compositor. `repainted` is false when
    /// the previous output was reused.
    fn push_paint_artifact(&mut self, tree: &mut FrameTree, frame: FrameId, repainted: bool) {
        let _ = (tree, frame, repainted);
    }

    /// The compositor must rebuild its layers from the next paint artifact.
    fn set_needs_update(&mut self, tree: &mut FrameTree, frame: FrameId) {
        let _ = (tree, frame);
    }

    /// Refreshes the compositing rect of a remote frame.
    fn update_compositing_rect(&mut self, tree: &mut FrameTree, frame: FrameId) {
        let _ = (tree, frame);
    }

    /// Ticks animations after paint.
    fn update_animations(&mut self, tree: &mut FrameTree, frame: FrameId) {
        let _ = (tree, frame);
    }
}

/// Everything the lifecycle driver calls out to.
pub trait LifecycleClient: LayoutEngine + ObserverHost + Compositor {}

impl<T: LayoutEngine + ObserverHost + Compositor> LifecycleClient for T {}

/// A client that implements every hook with its default.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopClient;

impl LayoutEngine for NoopClient {}
impl ObserverHost for NoopClient {}
impl Compositor for NoopClient {}
