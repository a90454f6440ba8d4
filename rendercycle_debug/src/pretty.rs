// Copyright 2026 the Rendercycle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr). Phase events
//! are indented by loop iteration so repeated passes stand out.

use std::io::Write;

use rendercycle_core::trace::{
    CullRectUpdateEvent, LifecycleSummary, LoopRepeatCause, LoopRepeatEvent, PhaseBeginEvent,
    PhaseEndEvent, PhaseKind, ResizeObserverLoopLimitEvent, StateTransitionEvent,
    ThrottlingChangedEvent, TraceSink, UpdateBeginEvent, UpdateEndEvent, UpdateRejectedEvent,
};

use crate::recorder::FrameRef;

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
    /// Print per-frame state transitions and per-layer cull rects.
    rich: bool,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink")
            .field("rich", &self.rich)
            .finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
            rich: false,
        }
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self {
            writer,
            rich: false,
        }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self {
            writer,
            rich: false,
        }
    }

    /// Also prints state transitions and cull-rect updates, which are
    /// emitted per frame and per layer.
    #[must_use]
    pub fn rich(mut self) -> Self {
        self.rich = true;
        self
    }

    /// Consumes the sink and returns the writer.
    #[must_use]
    pub fn into_inner(self) -> W {
        self.writer
    }
}

fn cause_name(cause: LoopRepeatCause) -> &'static str {
    match cause {
        LoopRepeatCause::ScrollSnapshot => "scroll-snapshot",
        LoopRepeatCause::ViewTransition => "view-transition",
        LoopRepeatCause::PostLayoutIntersection => "intersection",
        LoopRepeatCause::ResizeObserver => "resize-observer",
    }
}

fn indent(iteration: u32) -> usize {
    2 * iteration.saturating_sub(1) as usize
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_update_begin(&mut self, e: &UpdateBeginEvent) {
        let _ = writeln!(
            self.writer,
            "[update:begin] #{} {} target={} reason={:?}",
            e.update_index,
            FrameRef::from(e.frame),
            e.target.name(),
            e.reason,
        );
    }

    fn on_update_end(&mut self, e: &UpdateEndEvent) {
        let reached = if e.reached { "reached" } else { "STOPPED" };
        let _ = writeln!(
            self.writer,
            "[update:end] #{} {} {reached} iterations={}",
            e.update_index,
            FrameRef::from(e.frame),
            e.iterations,
        );
    }

    fn on_update_rejected(&mut self, e: &UpdateRejectedEvent) {
        let _ = writeln!(
            self.writer,
            "[update:rejected] {} target={}: {}",
            FrameRef::from(e.frame),
            e.target.name(),
            e.error,
        );
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        let _ = writeln!(
            self.writer,
            "{:pad$}[phase:begin] #{} {} iteration={}",
            "",
            e.update_index,
            e.phase.name(),
            e.iteration,
            pad = indent(e.iteration),
        );
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        let _ = writeln!(
            self.writer,
            "{:pad$}[phase:end] #{} {}",
            "",
            e.update_index,
            e.phase.name(),
            pad = indent(e.iteration),
        );
    }

    fn on_loop_repeat(&mut self, e: &LoopRepeatEvent) {
        let _ = writeln!(
            self.writer,
            "[loop:repeat] #{} after iteration {} cause={}",
            e.update_index,
            e.iteration,
            cause_name(e.cause),
        );
    }

    fn on_throttling_changed(&mut self, e: &ThrottlingChangedEvent) {
        let state = if e.throttled { "throttled" } else { "unthrottled" };
        let _ = writeln!(self.writer, "[throttle] {} {state}", FrameRef::from(e.frame));
    }

    fn on_resize_observer_loop_limit(&mut self, e: &ResizeObserverLoopLimitEvent) {
        let _ = writeln!(
            self.writer,
            "[resize:limit] #{} {} skipped observations",
            e.update_index,
            FrameRef::from(e.frame),
        );
    }

    fn on_lifecycle_summary(&mut self, s: &LifecycleSummary) {
        let reached = if s.reached { "ok" } else { "STOPPED" };
        let _ = write!(
            self.writer,
            "[summary] #{} {} target={} {reached} iterations={} repeats={} repainted={}",
            s.update_index,
            FrameRef::from(s.frame),
            s.target.name(),
            s.iterations,
            s.loop_repeats,
            s.repainted,
        );
        for phase in PhaseKind::ALL {
            let count = s.phase_count(phase);
            if count > 0 {
                let _ = write!(self.writer, " {}={count}", phase.name());
            }
        }
        let _ = writeln!(self.writer);
    }

    fn on_state_transition(&mut self, e: &StateTransitionEvent) {
        if !self.rich {
            return;
        }
        let _ = writeln!(
            self.writer,
            "[state] {} {} -> {}",
            FrameRef::from(e.frame),
            e.from.name(),
            e.to.name(),
        );
    }

    fn on_cull_rect_update(&mut self, e: &CullRectUpdateEvent) {
        if !self.rich {
            return;
        }
        let changed = if e.changed { " changed" } else { "" };
        let _ = writeln!(
            self.writer,
            "[cull] layer={} {:?} contents={:?}{changed}",
            e.layer_index, e.cull_rect, e.contents_cull_rect,
        );
    }
}
