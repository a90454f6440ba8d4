// Copyright 2026 the Rendercycle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Frame identity and the opaque handles frames hand to their collaborators.

use core::fmt;

/// Sentinel value indicating "no frame" in index fields.
pub(crate) const INVALID: u32 = u32::MAX;

/// A handle to a frame in a [`FrameTree`](super::FrameTree).
///
/// Contains both a slot index and a generation counter so that stale handles
/// can be detected after a frame is destroyed and the slot is reused.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId {
    pub(crate) idx: u32,
    pub(crate) generation: u32,
}

impl FrameId {
    /// Returns the raw slot index (for diagnostics only).
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.idx
    }

    /// Returns the generation counter.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FrameId({}@gen{})", self.idx, self.generation)
    }
}

/// Whether a frame runs its lifecycle in this tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FrameKind {
    /// Rendered here; has a document lifecycle and paint layers.
    Local,
    /// Rendered elsewhere; only its compositing rect is kept up to date.
    Remote,
}

/// A layout object known to the embedder, for direct transform and opacity
/// updates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u32);

/// An element known to the embedder, for remembered-size bookkeeping.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub u32);

/// A scrollable area known to the embedder, for sticky and snap updates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScrollableAreaId(pub u32);

/// A plugin embedded in a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PluginId(pub u32);
