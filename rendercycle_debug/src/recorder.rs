// Copyright 2026 the Rendercycle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a
//! `Vec<u8>` as fixed-size little-endian records, each prefixed with the
//! nanoseconds elapsed since the recorder was created. [`decode`] reads them
//! back as an iterator of [`TimedEvent`].
//!
//! Frame handles are recorded as their raw slot index and generation and come
//! back as [`FrameRef`], since a recording outlives the tree it came from.

use std::fmt;
use std::time::Instant;

use rendercycle_core::error::LifecycleUpdateError;
use rendercycle_core::frame::FrameId;
use rendercycle_core::geometry::PixelRect;
use rendercycle_core::lifecycle::{LifecycleState, UpdateReason};
use rendercycle_core::trace::{
    CullRectUpdateEvent, LifecycleSummary, LoopRepeatCause, LoopRepeatEvent, PhaseBeginEvent,
    PhaseEndEvent, PhaseKind, ResizeObserverLoopLimitEvent, StateTransitionEvent,
    ThrottlingChangedEvent, TraceSink, UpdateBeginEvent, UpdateEndEvent, UpdateRejectedEvent,
};

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_UPDATE_BEGIN: u8 = 1;
const TAG_UPDATE_END: u8 = 2;
const TAG_UPDATE_REJECTED: u8 = 3;
const TAG_PHASE_BEGIN: u8 = 4;
const TAG_PHASE_END: u8 = 5;
const TAG_LOOP_REPEAT: u8 = 6;
const TAG_THROTTLING_CHANGED: u8 = 7;
const TAG_RESIZE_LOOP_LIMIT: u8 = 8;
const TAG_SUMMARY: u8 = 9;
const TAG_STATE_TRANSITION: u8 = 10;
const TAG_CULL_RECT_UPDATE: u8 = 11;

const STATES: [LifecycleState; 10] = [
    LifecycleState::Uninitialized,
    LifecycleState::VisualUpdatePending,
    LifecycleState::StyleClean,
    LifecycleState::LayoutClean,
    LifecycleState::InCompositingInputsUpdate,
    LifecycleState::CompositingInputsClean,
    LifecycleState::InPrePaint,
    LifecycleState::PrePaintClean,
    LifecycleState::InPaint,
    LifecycleState::PaintClean,
];

const REASONS: [UpdateReason; 8] = [
    UpdateReason::BeginMainFrame,
    UpdateReason::Test,
    UpdateReason::HitTest,
    UpdateReason::Printing,
    UpdateReason::IntersectionObservation,
    UpdateReason::Script,
    UpdateReason::Inspector,
    UpdateReason::Other,
];

const CAUSES: [LoopRepeatCause; 4] = [
    LoopRepeatCause::ScrollSnapshot,
    LoopRepeatCause::ViewTransition,
    LoopRepeatCause::PostLayoutIntersection,
    LoopRepeatCause::ResizeObserver,
];

// ---------------------------------------------------------------------------
// Decoded value types
// ---------------------------------------------------------------------------

/// A frame handle as it was recorded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FrameRef {
    /// Raw slot index.
    pub index: u32,
    /// Generation of the slot at recording time.
    pub generation: u32,
}

impl From<FrameId> for FrameRef {
    fn from(id: FrameId) -> Self {
        Self {
            index: id.index(),
            generation: id.generation(),
        }
    }
}

impl fmt::Display for FrameRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "frame#{}@{}", self.index, self.generation)
    }
}

/// A recorded [`LifecycleUpdateError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordedRejection {
    /// See [`LifecycleUpdateError::Reentrant`].
    Reentrant,
    /// See [`LifecycleUpdateError::InactiveDocument`].
    InactiveDocument(FrameRef),
    /// See [`LifecycleUpdateError::LifecyclePostponed`].
    LifecyclePostponed(FrameRef),
    /// See [`LifecycleUpdateError::NotLocalRoot`].
    NotLocalRoot(FrameRef),
    /// See [`LifecycleUpdateError::UnsupportedTarget`].
    UnsupportedTarget(LifecycleState),
    /// See [`LifecycleUpdateError::Detached`].
    Detached(FrameRef),
}

impl From<LifecycleUpdateError> for RecordedRejection {
    fn from(error: LifecycleUpdateError) -> Self {
        match error {
            LifecycleUpdateError::Reentrant => Self::Reentrant,
            LifecycleUpdateError::InactiveDocument(f) => Self::InactiveDocument(f.into()),
            LifecycleUpdateError::LifecyclePostponed(f) => Self::LifecyclePostponed(f.into()),
            LifecycleUpdateError::NotLocalRoot(f) => Self::NotLocalRoot(f.into()),
            LifecycleUpdateError::UnsupportedTarget(s) => Self::UnsupportedTarget(s),
            LifecycleUpdateError::Detached(f) => Self::Detached(f.into()),
        }
    }
}

impl RecordedRejection {
    /// Short name of the rejection kind.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Reentrant => "reentrant",
            Self::InactiveDocument(_) => "inactive-document",
            Self::LifecyclePostponed(_) => "postponed",
            Self::NotLocalRoot(_) => "not-local-root",
            Self::UnsupportedTarget(_) => "unsupported-target",
            Self::Detached(_) => "detached",
        }
    }

    const fn tag(self) -> u8 {
        match self {
            Self::Reentrant => 0,
            Self::InactiveDocument(_) => 1,
            Self::LifecyclePostponed(_) => 2,
            Self::NotLocalRoot(_) => 3,
            Self::UnsupportedTarget(_) => 4,
            Self::Detached(_) => 5,
        }
    }

    const fn frame(self) -> Option<FrameRef> {
        match self {
            Self::InactiveDocument(f)
            | Self::LifecyclePostponed(f)
            | Self::NotLocalRoot(f)
            | Self::Detached(f) => Some(f),
            Self::Reentrant | Self::UnsupportedTarget(_) => None,
        }
    }
}

/// A recorded [`LifecycleSummary`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecordedSummary {
    /// Update counter.
    pub update_index: u64,
    /// The local frame root.
    pub frame: FrameRef,
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

/// A decoded event from a binary recording.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RecordedEvent {
    /// An [`UpdateBeginEvent`].
    UpdateBegin {
        /// Update counter.
        update_index: u64,
        /// The local frame root.
        frame: FrameRef,
        /// Requested target state.
        target: LifecycleState,
        /// Why the update was requested.
        reason: UpdateReason,
    },
    /// An [`UpdateEndEvent`].
    UpdateEnd {
        /// Update counter.
        update_index: u64,
        /// The local frame root.
        frame: FrameRef,
        /// Whether the root reached the target.
        reached: bool,
        /// Loop iterations.
        iterations: u32,
    },
    /// An [`UpdateRejectedEvent`].
    UpdateRejected {
        /// The frame the update was requested on.
        frame: FrameRef,
        /// Requested target state.
        target: LifecycleState,
        /// Why it was refused.
        rejection: RecordedRejection,
    },
    /// A [`PhaseBeginEvent`].
    PhaseBegin {
        /// Update counter.
        update_index: u64,
        /// Which phase.
        phase: PhaseKind,
        /// Loop iteration.
        iteration: u32,
    },
    /// A [`PhaseEndEvent`].
    PhaseEnd {
        /// Update counter.
        update_index: u64,
        /// Which phase.
        phase: PhaseKind,
        /// Loop iteration.
        iteration: u32,
    },
    /// A [`LoopRepeatEvent`].
    LoopRepeat {
        /// Update counter.
        update_index: u64,
        /// The iteration that ended.
        iteration: u32,
        /// What dirtied the frames.
        cause: LoopRepeatCause,
    },
    /// A [`ThrottlingChangedEvent`].
    ThrottlingChanged {
        /// The frame.
        frame: FrameRef,
        /// New throttling eligibility.
        throttled: bool,
    },
    /// A [`ResizeObserverLoopLimitEvent`].
    ResizeObserverLoopLimit {
        /// Update counter.
        update_index: u64,
        /// The frame whose observations were skipped.
        frame: FrameRef,
    },
    /// A [`LifecycleSummary`].
    Summary(RecordedSummary),
    /// A [`StateTransitionEvent`].
    StateTransition {
        /// The frame.
        frame: FrameRef,
        /// State before.
        from: LifecycleState,
        /// State after.
        to: LifecycleState,
    },
    /// A [`CullRectUpdateEvent`]. Only the local cull rect is kept.
    CullRectUpdate {
        /// Raw slot index of the layer.
        layer_index: u32,
        /// Whether the cull rect was infinite.
        infinite: bool,
        /// The cull rect, meaningless when `infinite` is set.
        rect: PixelRect,
        /// Whether either rect changed.
        changed: bool,
    },
}

/// A decoded event with its recording time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimedEvent {
    /// Nanoseconds since the recorder was created.
    pub at_nanos: u64,
    /// The event.
    pub event: RecordedEvent,
}

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug)]
pub struct RecorderSink {
    buf: Vec<u8>,
    start: Instant,
}

impl Default for RecorderSink {
    fn default() -> Self {
        Self::new()
    }
}

impl RecorderSink {
    /// Creates an empty recorder. Timestamps count from now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: Vec::new(),
            start: Instant::now(),
        }
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    // -- encoding helpers --------------------------------------------------

    fn begin_record(&mut self, tag: u8) {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "u64 nanoseconds cover centuries of recording"
        )]
        let nanos = self.start.elapsed().as_nanos() as u64;
        self.write_u8(tag);
        self.write_u64(nanos);
    }

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_bool(&mut self, v: bool) {
        self.write_u8(u8::from(v));
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_frame(&mut self, f: impl Into<FrameRef>) {
        let f = f.into();
        self.write_u32(f.index);
        self.write_u32(f.generation);
    }

    fn write_state(&mut self, s: LifecycleState) {
        self.write_u8(s as u8);
    }

    fn write_reason(&mut self, r: UpdateReason) {
        self.write_u8(r as u8);
    }

    fn write_phase(&mut self, p: PhaseKind) {
        self.write_u8(p as u8);
    }
}

impl TraceSink for RecorderSink {
    fn on_update_begin(&mut self, e: &UpdateBeginEvent) {
        self.begin_record(TAG_UPDATE_BEGIN);
        self.write_u64(e.update_index);
        self.write_frame(e.frame);
        self.write_state(e.target);
        self.write_reason(e.reason);
    }

    fn on_update_end(&mut self, e: &UpdateEndEvent) {
        self.begin_record(TAG_UPDATE_END);
        self.write_u64(e.update_index);
        self.write_frame(e.frame);
        self.write_bool(e.reached);
        self.write_u32(e.iterations);
    }

    fn on_update_rejected(&mut self, e: &UpdateRejectedEvent) {
        let rejection = RecordedRejection::from(e.error);
        self.begin_record(TAG_UPDATE_REJECTED);
        self.write_frame(e.frame);
        self.write_state(e.target);
        self.write_u8(rejection.tag());
        self.write_frame(rejection.frame().unwrap_or(FrameRef {
            index: 0,
            generation: 0,
        }));
        let unsupported = match rejection {
            RecordedRejection::UnsupportedTarget(s) => s,
            _ => LifecycleState::Uninitialized,
        };
        self.write_state(unsupported);
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        self.begin_record(TAG_PHASE_BEGIN);
        self.write_u64(e.update_index);
        self.write_phase(e.phase);
        self.write_u32(e.iteration);
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        self.begin_record(TAG_PHASE_END);
        self.write_u64(e.update_index);
        self.write_phase(e.phase);
        self.write_u32(e.iteration);
    }

    fn on_loop_repeat(&mut self, e: &LoopRepeatEvent) {
        self.begin_record(TAG_LOOP_REPEAT);
        self.write_u64(e.update_index);
        self.write_u32(e.iteration);
        self.write_u8(e.cause as u8);
    }

    fn on_throttling_changed(&mut self, e: &ThrottlingChangedEvent) {
        self.begin_record(TAG_THROTTLING_CHANGED);
        self.write_frame(e.frame);
        self.write_bool(e.throttled);
    }

    fn on_resize_observer_loop_limit(&mut self, e: &ResizeObserverLoopLimitEvent) {
        self.begin_record(TAG_RESIZE_LOOP_LIMIT);
        self.write_u64(e.update_index);
        self.write_frame(e.frame);
    }

    fn on_lifecycle_summary(&mut self, s: &LifecycleSummary) {
        self.begin_record(TAG_SUMMARY);
        self.write_u64(s.update_index);
        self.write_frame(s.frame);
        self.write_state(s.target);
        self.write_reason(s.reason);
        self.write_bool(s.reached);
        self.write_u32(s.iterations);
        self.write_u32(s.loop_repeats);
        self.write_bool(s.repainted);
        for count in s.phase_counts {
            self.write_u32(count);
        }
    }

    fn on_state_transition(&mut self, e: &StateTransitionEvent) {
        self.begin_record(TAG_STATE_TRANSITION);
        self.write_frame(e.frame);
        self.write_state(e.from);
        self.write_state(e.to);
    }

    fn on_cull_rect_update(&mut self, e: &CullRectUpdateEvent) {
        self.begin_record(TAG_CULL_RECT_UPDATE);
        self.write_u32(e.layer_index);
        self.write_bool(e.cull_rect.is_infinite());
        let rect = e.cull_rect.rect();
        self.write_i32(rect.x());
        self.write_i32(rect.y());
        self.write_i32(rect.width());
        self.write_i32(rect.height());
        self.write_bool(e.changed);
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`TimedEvent`].
///
/// Iteration stops at the first truncated record or unknown tag.
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Iterator over decoded events.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn read_array<const N: usize>(&mut self) -> Option<[u8; N]> {
        let bytes = self.data.get(self.pos..self.pos + N)?;
        self.pos += N;
        bytes.try_into().ok()
    }

    fn read_u8(&mut self) -> Option<u8> {
        let [v] = self.read_array::<1>()?;
        Some(v)
    }

    fn read_bool(&mut self) -> Option<bool> {
        Some(self.read_u8()? != 0)
    }

    fn read_u32(&mut self) -> Option<u32> {
        Some(u32::from_le_bytes(self.read_array()?))
    }

    fn read_i32(&mut self) -> Option<i32> {
        Some(i32::from_le_bytes(self.read_array()?))
    }

    fn read_u64(&mut self) -> Option<u64> {
        Some(u64::from_le_bytes(self.read_array()?))
    }

    fn read_frame(&mut self) -> Option<FrameRef> {
        Some(FrameRef {
            index: self.read_u32()?,
            generation: self.read_u32()?,
        })
    }

    fn read_state(&mut self) -> Option<LifecycleState> {
        STATES.get(usize::from(self.read_u8()?)).copied()
    }

    fn read_reason(&mut self) -> Option<UpdateReason> {
        REASONS.get(usize::from(self.read_u8()?)).copied()
    }

    fn read_phase(&mut self) -> Option<PhaseKind> {
        PhaseKind::ALL.get(usize::from(self.read_u8()?)).copied()
    }

    fn read_cause(&mut self) -> Option<LoopRepeatCause> {
        CAUSES.get(usize::from(self.read_u8()?)).copied()
    }

    fn decode_rejected(&mut self) -> Option<RecordedEvent> {
        let frame = self.read_frame()?;
        let target = self.read_state()?;
        let tag = self.read_u8()?;
        let culprit = self.read_frame()?;
        let unsupported = self.read_state()?;
        let rejection = match tag {
            0 => RecordedRejection::Reentrant,
            1 => RecordedRejection::InactiveDocument(culprit),
            2 => RecordedRejection::LifecyclePostponed(culprit),
            3 => RecordedRejection::NotLocalRoot(culprit),
            4 => RecordedRejection::UnsupportedTarget(unsupported),
            5 => RecordedRejection::Detached(culprit),
            _ => return None,
        };
        Some(RecordedEvent::UpdateRejected {
            frame,
            target,
            rejection,
        })
    }

    fn decode_summary(&mut self) -> Option<RecordedEvent> {
        let update_index = self.read_u64()?;
        let frame = self.read_frame()?;
        let target = self.read_state()?;
        let reason = self.read_reason()?;
        let reached = self.read_bool()?;
        let iterations = self.read_u32()?;
        let loop_repeats = self.read_u32()?;
        let repainted = self.read_bool()?;
        let mut phase_counts = [0; 8];
        for count in &mut phase_counts {
            *count = self.read_u32()?;
        }
        Some(RecordedEvent::Summary(RecordedSummary {
            update_index,
            frame,
            target,
            reason,
            reached,
            iterations,
            loop_repeats,
            repainted,
            phase_counts,
        }))
    }

    fn decode_event(&mut self, tag: u8) -> Option<RecordedEvent> {
        Some(match tag {
            TAG_UPDATE_BEGIN => RecordedEvent::UpdateBegin {
                update_index: self.read_u64()?,
                frame: self.read_frame()?,
                target: self.read_state()?,
                reason: self.read_reason()?,
            },
            TAG_UPDATE_END => RecordedEvent::UpdateEnd {
                update_index: self.read_u64()?,
                frame: self.read_frame()?,
                reached: self.read_bool()?,
                iterations: self.read_u32()?,
            },
            TAG_UPDATE_REJECTED => self.decode_rejected()?,
            TAG_PHASE_BEGIN => RecordedEvent::PhaseBegin {
                update_index: self.read_u64()?,
                phase: self.read_phase()?,
                iteration: self.read_u32()?,
            },
            TAG_PHASE_END => RecordedEvent::PhaseEnd {
                update_index: self.read_u64()?,
                phase: self.read_phase()?,
                iteration: self.read_u32()?,
            },
            TAG_LOOP_REPEAT => RecordedEvent::LoopRepeat {
                update_index: self.read_u64()?,
                iteration: self.read_u32()?,
                cause: self.read_cause()?,
            },
            TAG_THROTTLING_CHANGED => RecordedEvent::ThrottlingChanged {
                frame: self.read_frame()?,
                throttled: self.read_bool()?,
            },
            TAG_RESIZE_LOOP_LIMIT => RecordedEvent::ResizeObserverLoopLimit {
                update_index: self.read_u64()?,
                frame: self.read_frame()?,
            },
            TAG_SUMMARY => self.decode_summary()?,
            TAG_STATE_TRANSITION => RecordedEvent::StateTransition {
                frame: self.read_frame()?,
                from: self.read_state()?,
                to: self.read_state()?,
            },
            TAG_CULL_RECT_UPDATE => {
                let layer_index = self.read_u32()?;
                let infinite = self.read_bool()?;
                let rect = PixelRect::new(
                    self.read_i32()?,
                    self.read_i32()?,
                    self.read_i32()?,
                    self.read_i32()?,
                );
                RecordedEvent::CullRectUpdate {
                    layer_index,
                    infinite,
                    rect,
                    changed: self.read_bool()?,
                }
            }
            _ => return None, // unknown tag → stop iteration
        })
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = TimedEvent;

    fn next(&mut self) -> Option<Self::Item> {
        let tag = self.read_u8()?;
        let at_nanos = self.read_u64()?;
        let event = self.decode_event(tag)?;
        Some(TimedEvent { at_nanos, event })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
