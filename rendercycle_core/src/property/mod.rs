// Copyright 2026 the Rendercycle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Paint property trees.
//!
//! Three trees describe how painted content maps onto the screen:
//!
//! - **Transform** nodes ([`TransformId`]) carry a local matrix into their
//!   parent's space. A node that also carries a [`ScrollNode`] is a *scroll
//!   translation*: its matrix is the negated scroll offset.
//! - **Clip** nodes ([`ClipId`]) carry an optional rect in some transform
//!   space (their *local transform space*).
//! - **Effect** nodes ([`EffectId`]) carry opacity. Effects never narrow a
//!   cull rect.
//!
//! A [`PropertyTreeState`] names one node of each tree. Mapping between two
//! states is done by [`PropertyTrees`] itself (see the `*_rect` methods), so
//! a [`CullRect`](crate::cull_rect::CullRect) only needs the trees and two
//! states.
//!
//! # Dirty tracking
//!
//! Mutations mark [`dirty`](crate::dirty) channels:
//!
//! - **TRANSFORM** / **CLIP**: propagate to all descendant nodes.
//! - **SCROLL**: local to the scroll translation, with the delta kept
//!   alongside so that small scrolls can be ignored.
//!
//! [`PropertyTrees::evaluate`] drains them into [`PropertyChanges`].

mod evaluate;
mod id;
mod mapper;
mod scroll;
mod store;

pub use evaluate::PropertyChanges;
pub use id::{ClipId, EffectId, PropertyTreeState, TransformId};
pub use mapper::FloatClipRect;
pub use scroll::{CompositedScrollingPreference, ScrollNode};
pub use store::PropertyTrees;
