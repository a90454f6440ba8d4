// Copyright 2026 the Rendercycle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The frame tree.
//!
//! A *frame* is a nested rendering context. Each frame has:
//!
//! - An identity ([`FrameId`]), a generational handle that becomes stale when
//!   the frame is destroyed.
//! - A [`FrameKind`]. Local frames run a document lifecycle here; remote
//!   frames are rendered elsewhere and only have their compositing rect
//!   updated.
//! - Topology: parent, first-child, and sibling links. A local frame whose
//!   parent is absent or remote is a *local frame root*; lifecycle updates
//!   always start at one and walk down.
//! - Dirty bits ([`FrameFlags`]), throttling inputs, pending-update queues and
//!   a root paint layer hanging off an owner layer in the parent frame.
//!
//! Walks over the tree return snapshots (see [`TraversalOrder`]) so that
//! collaborator callbacks may change the tree mid-walk.

mod embedded;
mod id;
mod pending;
mod store;
mod traverse;

pub use embedded::EmbeddedView;
pub use id::{ElementId, FrameId, FrameKind, ObjectId, PluginId, ScrollableAreaId};
pub use store::{DirtyKind, FrameFlags, FrameTree, LifecycleTask};
pub use traverse::{ChildFrames, TraversalOrder};
