// Copyright 2026 the Rendercycle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dirty-tracking channel constants for the paint property trees.
//!
//! Property-node mutations are tracked with [`understory_dirty`] so that the
//! pre-paint phase can find the paint layers whose cull rects may be stale.
//! Transform and clip nodes live in separate trackers keyed by node index.
//!
//! # Propagation semantics
//!
//! - **Propagating**: [`TRANSFORM`] and [`CLIP`] use
//!   [`EagerPolicy`](understory_dirty::EagerPolicy) over child-to-parent
//!   dependency edges. Changing a node's local matrix or clip rect changes the
//!   mapping for every descendant node, so all of them are drained.
//!
//! - **Local-only**: [`SCROLL`] is marked without propagation. Scrolling moves
//!   content inside a scroll container but leaves every mapping *below* the
//!   scroll translation unchanged, so only the scroll translation itself is
//!   reported, together with the accumulated scroll delta.
//!
//! # Consumption
//!
//! [`PropertyTrees::evaluate`](crate::property::PropertyTrees::evaluate)
//! drains every channel into a
//! [`PropertyChanges`](crate::property::PropertyChanges), which the
//! pre-paint phase turns into cull-rect invalidations on paint layers.

use understory_dirty::Channel;

/// Local matrix, scroll geometry, or expansion flag changed on a transform
/// node. Propagates to descendant transform nodes.
pub const TRANSFORM: Channel = Channel::new(0);

/// Scroll offset changed. Local to the scroll translation node.
pub const SCROLL: Channel = Channel::new(1);

/// Clip rect or transform space changed on a clip node. Propagates to
/// descendant clip nodes.
pub const CLIP: Channel = Channel::new(2);
