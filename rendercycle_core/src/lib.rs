// Copyright 2026 the Rendercycle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Rendering lifecycle scheduling for trees of nested frames.
//!
//! `rendercycle_core` drives the rendering lifecycle of a tree of frames
//! (documents and the frames they embed) from style and layout through
//! paint. It decides which frames are throttled, drains per-frame pending
//! updates at fixed points, repeats the early phases while observers keep
//! dirtying layout, and keeps per-layer cull rects current. It is `no_std`
//! compatible (with `alloc`) and stores frames, layers and property nodes in
//! struct-of-arrays tables addressed by generational handles.
//!
//! # Architecture
//!
//! ```text
//!   FrameTree::update_all_lifecycle_phases(frame, reason, cx)
//!       │
//!       ▼
//!   style + layout ──► compositing inputs ──► pre-paint ──┐
//!       ▲                                                 │
//!       └──── observers / view transitions dirtied? ◄─────┘
//!                              │ no
//!                              ▼
//!                            paint ──► Compositor::push_paint_artifact
//! ```
//!
//! **[`frame`]**: The frame tree, its dirty bits, pending-update queues and
//! embedded content views.
//!
//! **[`lifecycle`]**: Lifecycle states, the update driver, throttling and
//! intersection-observer glue.
//!
//! **[`client`]**: The collaborator traits the driver calls into for layout,
//! observers and compositing.
//!
//! **[`property`]**: Transform, clip and effect trees with a geometry mapper.
//! Mutations are tracked per channel (see [`dirty`]).
//!
//! **[`cull_rect`]**: The [`CullRect`](cull_rect::CullRect) value type and
//! its expansion heuristics.
//!
//! **[`layer`]**: Paint layers with repaint flags and the cull-rect updater.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and event types for
//! lifecycle instrumentation, with a zero-overhead
//! [`Tracer`](trace::Tracer) wrapper.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).
//! - `trace-rich` (disabled by default, implies `trace`): Gates per-frame
//!   lifecycle transitions and per-layer cull-rect events.

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod client;
pub mod config;
pub mod cull_rect;
pub mod dirty;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod layer;
pub mod lifecycle;
pub mod property;
pub mod trace;
pub mod transform;

#[cfg(test)]
mod testing;
