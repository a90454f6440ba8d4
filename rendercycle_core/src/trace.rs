// Copyright 2026 the Rendercycle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for lifecycle updates.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that the
//! lifecycle driver calls at each step. All method bodies default to no-ops,
//! so implementing only the events you care about is fine.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. When the `trace` feature
//! is **off**, every `Tracer` method compiles to nothing (zero overhead). When
//! **on**, each method performs a single `Option` branch before dispatching.
//!
//! [`LifecycleSummaryBuilder`] collects per-phase counts while an update runs
//! and produces a [`LifecycleSummary`] at the end. The driver emits one summary
//! per completed update.
//!
//! # Crate features
//!
//! - `trace` enables the `Tracer` method bodies (one branch per call).
//! - `trace-rich` (implies `trace`) gates [`StateTransitionEvent`] and
//!   [`CullRectUpdateEvent`] plus the corresponding `TraceSink` methods.

#[cfg(feature = "trace-rich")]
use crate::cull_rect::CullRect;
use crate::error::LifecycleUpdateError;
use crate::frame::FrameId;
use crate::lifecycle::{LifecycleState, UpdateReason};

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Which step of a lifecycle update is running.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PhaseKind {
    /// Style recalc and layout, plus the post-layout steps.
    StyleAndLayout,
    /// Validation of scroll-linked timeline snapshots.
    ScrollSnapshot,
    /// Descendant-dependent flags and pending selection.
    CompositingInputs,
    /// Paint-property update, pending direct updates and cull rects.
    PrePaint,
    /// View-transition bookkeeping.
    ViewTransition,
    /// Intersection observations delivered before paint.
    PostLayoutIntersection,
    /// Resize-observer gathering and delivery.
    ResizeObserver,
    /// Recording paint output and pushing it to the compositor.
    Paint,
}

impl PhaseKind {
    /// Every phase, in the order a full update first visits them.
    pub const ALL: [Self; 8] = [
        Self::StyleAndLayout,
        Self::ScrollSnapshot,
        Self::CompositingInputs,
        Self::PrePaint,
        Self::ViewTransition,
        Self::PostLayoutIntersection,
        Self::ResizeObserver,
        Self::Paint,
    ];

    /// Short human-readable name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::StyleAndLayout => "style+layout",
            Self::ScrollSnapshot => "scroll-snapshot",
            Self::CompositingInputs => "compositing-inputs",
            Self::PrePaint => "pre-paint",
            Self::ViewTransition => "view-transition",
            Self::PostLayoutIntersection => "post-layout-intersection",
            Self::ResizeObserver => "resize-observer",
            Self::Paint => "paint",
        }
    }
}

/// Why the style-through-pre-paint loop ran again.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LoopRepeatCause {
    /// A scroll snapshot client was invalid after layout.
    ScrollSnapshot,
    /// A view transition dirtied style or layout.
    ViewTransition,
    /// A post-layout intersection delivery dirtied a frame.
    PostLayoutIntersection,
    /// A resize-observer delivery dirtied a frame.
    ResizeObserver,
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when an update starts running.
#[derive(Clone, Copy, Debug)]
pub struct UpdateBeginEvent {
    /// Monotonic update counter of the frame tree.
    pub update_index: u64,
    /// The local frame root driving the update.
    pub frame: FrameId,
    /// Requested target state.
    pub target: LifecycleState,
    /// Why the update was requested.
    pub reason: UpdateReason,
}

/// Emitted when an update finishes.
#[derive(Clone, Copy, Debug)]
pub struct UpdateEndEvent {
    /// Update counter.
    pub update_index: u64,
    /// The local frame root.
    pub frame: FrameId,
    /// Whether the root reached exactly the target state.
    pub reached: bool,
    /// Number of passes through the style-through-pre-paint loop.
    pub iterations: u32,
}

/// Emitted when an update is refused before doing any work.
#[derive(Clone, Copy, Debug)]
pub struct UpdateRejectedEvent {
    /// The frame the update was requested on.
    pub frame: FrameId,
    /// Requested target state.
    pub target: LifecycleState,
    /// Why it was refused.
    pub error: LifecycleUpdateError,
}

/// Marks the beginning of a phase.
#[derive(Clone, Copy, Debug)]
pub struct PhaseBeginEvent {
    /// Update counter.
    pub update_index: u64,
    /// Which phase is starting.
    pub phase: PhaseKind,
    /// Loop iteration, starting at 1.
    pub iteration: u32,
}

/// Marks the end of a phase.
#[derive(Clone, Copy, Debug)]
pub struct PhaseEndEvent {
    /// Update counter.
    pub update_index: u64,
    /// Which phase is ending.
    pub phase: PhaseKind,
    /// Loop iteration, starting at 1.
    pub iteration: u32,
}

/// Emitted when the loop goes back to style and layout.
#[derive(Clone, Copy, Debug)]
pub struct LoopRepeatEvent {
    /// Update counter.
    pub update_index: u64,
    /// The iteration that is ending.
    pub iteration: u32,
    /// What dirtied the frames.
    pub cause: LoopRepeatCause,
}

/// Emitted when a frame's throttling eligibility flips.
#[derive(Clone, Copy, Debug)]
pub struct ThrottlingChangedEvent {
    /// The frame.
    pub frame: FrameId,
    /// New value of `can_throttle_rendering`.
    pub throttled: bool,
}

/// Emitted once when resize observations are skipped at the depth limit.
#[derive(Clone, Copy, Debug)]
pub struct ResizeObserverLoopLimitEvent {
    /// Update counter.
    pub update_index: u64,
    /// The frame whose observations were skipped.
    pub frame: FrameId,
}

/// A single frame's lifecycle state change.
#[cfg(feature = "trace-rich")]
#[derive(Clone, Copy, Debug)]
pub struct StateTransitionEvent {
    /// The frame.
    pub frame: FrameId,
    /// State before.
    pub from: LifecycleState,
    /// State after.
    pub to: LifecycleState,
}

/// A paint layer's cull rects after the cull-rect updater visited it.
#[cfg(feature = "trace-rich")]
#[derive(Clone, Copy, Debug)]
pub struct CullRectUpdateEvent {
    /// Raw slot index of the layer.
    pub layer_index: u32,
    /// Cull rect in the layer's local state.
    pub cull_rect: CullRect,
    /// Cull rect in the layer's contents state.
    pub contents_cull_rect: CullRect,
    /// Whether either rect changed.
    pub changed: bool,
}

/// Per-update summary produced by [`LifecycleSummaryBuilder`].
#[derive(Clone, Copy, Debug)]
pub struct LifecycleSummary {
    /// Update counter.
    pub update_index: u64,
    /// The local frame root.
    pub frame: FrameId,
    /// Requested target state.
    pub target: LifecycleState,
    /// Why the update was requested.
    pub reason: UpdateReason,
    /// Whether the root reached the target state.
    pub reached: bool,
    /// Passes through the style-through-pre-paint loop.
    pub iterations: u32,
    /// How many of those passes were repeats.
    pub loop_repeats: u32,
    /// Whether paint recorded new output.
    pub repainted: bool,
    /// How many times each phase ran, indexed like [`PhaseKind::ALL`].
    pub phase_counts: [u32; 8],
}

impl LifecycleSummary {
    /// How many times `phase` ran.
    #[must_use]
    pub const fn phase_count(&self, phase: PhaseKind) -> u32 {
        self.phase_counts[phase_index(phase)]
    }
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the lifecycle driver.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called when an update starts.
    fn on_update_begin(&mut self, e: &UpdateBeginEvent) {
        _ = e;
    }

    /// Called when an update finishes.
    fn on_update_end(&mut self, e: &UpdateEndEvent) {
        _ = e;
    }

    /// Called when an update is refused.
    fn on_update_rejected(&mut self, e: &UpdateRejectedEvent) {
        _ = e;
    }

    /// Called at the beginning of a phase.
    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        _ = e;
    }

    /// Called at the end of a phase.
    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        _ = e;
    }

    /// Called when the loop repeats.
    fn on_loop_repeat(&mut self, e: &LoopRepeatEvent) {
        _ = e;
    }

    /// Called when throttling eligibility changes.
    fn on_throttling_changed(&mut self, e: &ThrottlingChangedEvent) {
        _ = e;
    }

    /// Called when the resize-observer loop limit is hit.
    fn on_resize_observer_loop_limit(&mut self, e: &ResizeObserverLoopLimitEvent) {
        _ = e;
    }

    /// Called with the summary of a completed update.
    fn on_lifecycle_summary(&mut self, s: &LifecycleSummary) {
        _ = s;
    }

    /// Called on each frame state change (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    fn on_state_transition(&mut self, e: &StateTransitionEvent) {
        _ = e;
    }

    /// Called for each layer the cull-rect updater visits (requires
    /// `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    fn on_cull_rect_update(&mut self, e: &CullRectUpdateEvent) {
        _ = e;
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing. When
/// **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl Default for Tracer<'_> {
    fn default() -> Self {
        Self::none()
    }
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Emits an [`UpdateBeginEvent`].
    #[inline]
    pub fn update_begin(&mut self, e: &UpdateBeginEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_update_begin(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits an [`UpdateEndEvent`].
    #[inline]
    pub fn update_end(&mut self, e: &UpdateEndEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_update_end(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits an [`UpdateRejectedEvent`].
    #[inline]
    pub fn update_rejected(&mut self, e: &UpdateRejectedEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_update_rejected(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`PhaseBeginEvent`].
    #[inline]
    pub fn phase_begin(&mut self, e: &PhaseBeginEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_phase_begin(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`PhaseEndEvent`].
    #[inline]
    pub fn phase_end(&mut self, e: &PhaseEndEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_phase_end(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`LoopRepeatEvent`].
    #[inline]
    pub fn loop_repeat(&mut self, e: &LoopRepeatEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_loop_repeat(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`ThrottlingChangedEvent`].
    #[inline]
    pub fn throttling_changed(&mut self, e: &ThrottlingChangedEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_throttling_changed(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`ResizeObserverLoopLimitEvent`].
    #[inline]
    pub fn resize_observer_loop_limit(&mut self, e: &ResizeObserverLoopLimitEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_resize_observer_loop_limit(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`LifecycleSummary`].
    #[inline]
    pub fn lifecycle_summary(&mut self, s: &LifecycleSummary) {
        #[cfg(feature = "trace")]
        if let Some(sink) = &mut self.sink {
            sink.on_lifecycle_summary(s);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = s;
        }
    }

    /// Emits a [`StateTransitionEvent`] (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    #[inline]
    pub fn state_transition(&mut self, e: &StateTransitionEvent) {
        if let Some(s) = &mut self.sink {
            s.on_state_transition(e);
        }
    }

    /// Emits a [`CullRectUpdateEvent`] (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    #[inline]
    pub fn cull_rect_update(&mut self, e: &CullRectUpdateEvent) {
        if let Some(s) = &mut self.sink {
            s.on_cull_rect_update(e);
        }
    }
}

// ---------------------------------------------------------------------------
// LifecycleSummaryBuilder
// ---------------------------------------------------------------------------

/// Collects phase counts during an update and produces a [`LifecycleSummary`].
#[derive(Debug)]
pub struct LifecycleSummaryBuilder {
    begin: UpdateBeginEvent,
    phase_counts: [u32; 8],
    iterations: u32,
    loop_repeats: u32,
    repainted: bool,
}

impl LifecycleSummaryBuilder {
    /// Starts building a summary for the given update.
    #[must_use]
    pub fn new(begin: &UpdateBeginEvent) -> Self {
        Self {
            begin: *begin,
            phase_counts: [0; 8],
            iterations: 0,
            loop_repeats: 0,
            repainted: false,
        }
    }

    /// Records that a phase started.
    pub fn phase_begin(&mut self, phase: PhaseKind) {
        self.phase_counts[phase_index(phase)] += 1;
    }

    /// Records the start of a loop iteration.
    pub fn iteration_begin(&mut self) {
        self.iterations += 1;
    }

    /// Records a loop repeat.
    pub fn loop_repeat(&mut self) {
        self.loop_repeats += 1;
    }

    /// Sets whether paint recorded new output.
    pub fn set_repainted(&mut self, repainted: bool) {
        self.repainted = repainted;
    }

    /// Number of loop iterations recorded so far.
    #[must_use]
    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Consumes the builder and produces the final [`LifecycleSummary`].
    #[must_use]
    pub fn finish(self, reached: bool) -> LifecycleSummary {
        LifecycleSummary {
            update_index: self.begin.update_index,
            frame: self.begin.frame,
            target: self.begin.target,
            reason: self.begin.reason,
            reached,
            iterations: self.iterations,
            loop_repeats: self.loop_repeats,
            repainted: self.repainted,
            phase_counts: self.phase_counts,
        }
    }
}

/// Maps a [`PhaseKind`] to an array index.
const fn phase_index(phase: PhaseKind) -> usize {
    match phase {
        PhaseKind::StyleAndLayout => 0,
        PhaseKind::ScrollSnapshot => 1,
        PhaseKind::CompositingInputs => 2,
        PhaseKind::PrePaint => 3,
        PhaseKind::ViewTransition => 4,
        PhaseKind::PostLayoutIntersection => 5,
        PhaseKind::ResizeObserver => 6,
        PhaseKind::Paint => 7,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
