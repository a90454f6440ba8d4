// Copyright 2026 the Rendercycle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Paint layer tree.
//!
//! A *paint layer* is a unit of painting with its own cull rects. Each layer
//! has:
//!
//! - An identity ([`LayerId`]), a generational handle that becomes stale when
//!   the layer is destroyed.
//! - Topology: parent, first-child, and sibling links forming an ordered tree.
//!   Each frame has its own tree; the frame tree links a child frame's root
//!   layer to its owner layer in the parent frame.
//! - Two property tree states set by the caller: the **local** state the
//!   layer paints in, and the **contents** state its children paint in.
//! - Two cull rects computed by [`CullRectUpdater`], one per state.
//!
//! # Invalidation
//!
//! Layers carry a *needs repaint* flag and a *needs cull-rect update* flag,
//! each with a *descendant* counterpart kept on every ancestor. Property
//! changes reach layers through
//! [`invalidate_for_property_changes`](LayerStore::invalidate_for_property_changes).

mod cull_rect_updater;
mod id;
mod store;
mod traverse;

pub use cull_rect_updater::CullRectUpdater;
pub use id::{INVALID, LayerId};
pub use store::LayerStore;
pub use traverse::Children;
