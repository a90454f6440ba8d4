// Copyright 2026 the Rendercycle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] reads recorded bytes from a [`RecorderSink`](super::recorder::RecorderSink)
//! and writes [Chrome Trace Event Format][format] JSON to the given writer.
//!
//! Updates and phases become nested duration slices on one track; everything
//! else becomes an instant event.
//!
//! [format]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use serde_json::{Value, json};

use crate::recorder::{RecordedEvent, decode};

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of trace event objects, suitable for
/// loading into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
/// Timestamps are the recorder's elapsed time in microseconds.
pub fn export(bytes: &[u8], writer: &mut dyn Write) -> io::Result<()> {
    let mut events: Vec<Value> = Vec::new();

    for recorded in decode(bytes) {
        let ts = recorded.at_nanos as f64 / 1000.0;
        let event = match recorded.event {
            RecordedEvent::UpdateBegin {
                update_index,
                frame,
                target,
                reason,
            } => json!({
                "ph": "B",
                "name": format!("update #{update_index}"),
                "cat": "Lifecycle",
                "ts": ts,
                "pid": 0,
                "tid": 0,
                "args": {
                    "frame": frame.to_string(),
                    "target": target.name(),
                    "reason": format!("{reason:?}"),
                }
            }),
            RecordedEvent::UpdateEnd {
                update_index,
                reached,
                iterations,
                ..
            } => json!({
                "ph": "E",
                "name": format!("update #{update_index}"),
                "cat": "Lifecycle",
                "ts": ts,
                "pid": 0,
                "tid": 0,
                "args": {
                    "reached": reached,
                    "iterations": iterations,
                }
            }),
            RecordedEvent::UpdateRejected {
                frame,
                target,
                rejection,
            } => json!({
                "ph": "i",
                "name": "UpdateRejected",
                "cat": "Lifecycle",
                "ts": ts,
                "pid": 0,
                "tid": 0,
                "s": "t",
                "args": {
                    "frame": frame.to_string(),
                    "target": target.name(),
                    "rejection": rejection.name(),
                }
            }),
            RecordedEvent::PhaseBegin {
                phase, iteration, ..
            } => json!({
                "ph": "B",
                "name": phase.name(),
                "cat": "Phase",
                "ts": ts,
                "pid": 0,
                "tid": 0,
                "args": {
                    "iteration": iteration,
                }
            }),
            RecordedEvent::PhaseEnd { phase, .. } => json!({
                "ph": "E",
                "name": phase.name(),
                "cat": "Phase",
                "ts": ts,
                "pid": 0,
                "tid": 0,
            }),
            RecordedEvent::LoopRepeat {
                iteration, cause, ..
            } => json!({
                "ph": "i",
                "name": "LoopRepeat",
                "cat": "Phase",
                "ts": ts,
                "pid": 0,
                "tid": 0,
                "s": "t",
                "args": {
                    "iteration": iteration,
                    "cause": format!("{cause:?}"),
                }
            }),
            RecordedEvent::ThrottlingChanged { frame, throttled } => json!({
                "ph": "i",
                "name": "ThrottlingChanged",
                "cat": "Throttling",
                "ts": ts,
                "pid": 0,
                "tid": 0,
                "s": "p",
                "args": {
                    "frame": frame.to_string(),
                    "throttled": throttled,
                }
            }),
            RecordedEvent::ResizeObserverLoopLimit { frame, .. } => json!({
                "ph": "i",
                "name": "ResizeObserverLoopLimit",
                "cat": "Phase",
                "ts": ts,
                "pid": 0,
                "tid": 0,
                "s": "t",
                "args": {
                    "frame": frame.to_string(),
                }
            }),
            RecordedEvent::Summary(s) => json!({
                "ph": "i",
                "name": "LifecycleSummary",
                "cat": "Summary",
                "ts": ts,
                "pid": 0,
                "tid": 0,
                "s": "g",
                "args": {
                    "update_index": s.update_index,
                    "frame": s.frame.to_string(),
                    "target": s.target.name(),
                    "reached": s.reached,
                    "iterations": s.iterations,
                    "loop_repeats": s.loop_repeats,
                    "repainted": s.repainted,
                    "phase_counts": s.phase_counts,
                }
            }),
            RecordedEvent::StateTransition { frame, from, to } => json!({
                "ph": "i",
                "name": "StateTransition",
                "cat": "Rich",
                "ts": ts,
                "pid": 0,
                "tid": 0,
                "s": "t",
                "args": {
                    "frame": frame.to_string(),
                    "from": from.name(),
                    "to": to.name(),
                }
            }),
            RecordedEvent::CullRectUpdate {
                layer_index,
                infinite,
                rect,
                changed,
            } => {
                let rect = if infinite {
                    Value::from("infinite")
                } else {
                    json!([rect.x(), rect.y(), rect.width(), rect.height()])
                };
                json!({
                    "ph": "i",
                    "name": "CullRectUpdate",
                    "cat": "Rich",
                    "ts": ts,
                    "pid": 0,
                    "tid": 0,
                    "s": "t",
                    "args": {
                        "layer": layer_index,
                        "rect": rect,
                        "changed": changed,
                    }
                })
            }
        };
        events.push(event);
    }

    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::RecorderSink;
    use rendercycle_core::client::NoopClient;
    use rendercycle_core::frame::FrameTree;
    use rendercycle_core::lifecycle::{UpdateContext, UpdateReason};
    use rendercycle_core::trace::Tracer;

    #[test]
    fn export_nests_phases_inside_updates() {
        let mut tree = FrameTree::new();
        let main = tree.create_main_frame(None);
        let mut rec = RecorderSink::new();
        let mut client = NoopClient;
        let mut cx = UpdateContext::with_tracer(&mut client, Tracer::new(&mut rec));
        assert!(
            tree.update_all_lifecycle_phases(main, UpdateReason::BeginMainFrame, &mut cx),
            "update reaches paint"
        );
        drop(cx);

        let mut out = Vec::new();
        export(rec.as_bytes(), &mut out).unwrap();
        let parsed: Vec<Value> = serde_json::from_slice(&out).unwrap();

        assert_eq!(parsed[0]["ph"], "B");
        assert_eq!(parsed[0]["name"], "update #1");
        assert_eq!(parsed[0]["args"]["target"], "PaintClean");

        // Begin and end slices balance like brackets.
        let mut depth = 0_i32;
        for event in &parsed {
            match event["ph"].as_str() {
                Some("B") => depth += 1,
                Some("E") => {
                    depth -= 1;
                    assert!(depth >= 0, "unbalanced end: {event}");
                }
                _ => {}
            }
        }
        assert_eq!(depth, 0, "every slice is closed");

        let Some(summary) = parsed.iter().find(|e| e["name"] == "LifecycleSummary") else {
            panic!("no summary exported");
        };
        assert_eq!(summary["args"]["reached"], true);
    }

    #[test]
    fn export_empty_recording() {
        let mut out = Vec::new();
        export(&[], &mut out).unwrap();
        let parsed: Vec<Value> = serde_json::from_slice(&out).unwrap();
        assert!(parsed.is_empty());
    }
}
