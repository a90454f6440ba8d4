// Copyright 2026 the Rendercycle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Property node identity types.

use core::fmt;

/// Handle to a transform node in [`PropertyTrees`](super::PropertyTrees).
///
/// Property nodes are never destroyed, so handles stay valid for the lifetime
/// of the trees that created them.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransformId(pub(crate) u32);

/// Handle to a clip node in [`PropertyTrees`](super::PropertyTrees).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClipId(pub(crate) u32);

/// Handle to an effect node in [`PropertyTrees`](super::PropertyTrees).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EffectId(pub(crate) u32);

impl TransformId {
    /// The root of the transform tree.
    pub const ROOT: Self = Self(0);

    /// Returns the raw slot index (for diagnostics only).
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl ClipId {
    /// The root of the clip tree. It never clips.
    pub const ROOT: Self = Self(0);

    /// Returns the raw slot index (for diagnostics only).
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl EffectId {
    /// The root of the effect tree.
    pub const ROOT: Self = Self(0);

    /// Returns the raw slot index (for diagnostics only).
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for TransformId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TransformId({})", self.0)
    }
}

impl fmt::Debug for ClipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClipId({})", self.0)
    }
}

impl fmt::Debug for EffectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EffectId({})", self.0)
    }
}

/// The transform, clip and effect a piece of content is painted under.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PropertyTreeState {
    /// Coordinate space.
    pub transform: TransformId,
    /// Innermost clip.
    pub clip: ClipId,
    /// Innermost effect.
    pub effect: EffectId,
}

impl PropertyTreeState {
    /// The state made of the three tree roots.
    pub const ROOT: Self = Self {
        transform: TransformId::ROOT,
        clip: ClipId::ROOT,
        effect: EffectId::ROOT,
    };

    /// Creates a state from its three nodes.
    #[inline]
    #[must_use]
    pub const fn new(transform: TransformId, clip: ClipId, effect: EffectId) -> Self {
        Self {
            transform,
            clip,
            effect,
        }
    }
}
