// Copyright 2026 the Rendercycle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Errors reported by lifecycle updates.

use crate::frame::FrameId;
use crate::lifecycle::LifecycleState;

/// Why [`FrameTree::try_update_lifecycle_phases`] did no work.
///
/// None of these leave the tree in a different state than before the call.
///
/// [`FrameTree::try_update_lifecycle_phases`]: crate::frame::FrameTree::try_update_lifecycle_phases
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleUpdateError {
    /// An update is already running for the same local frame root.
    #[error("a lifecycle update is already in progress for this local frame root")]
    Reentrant,
    /// The frame's document is not active.
    #[error("the document of {0:?} is not active")]
    InactiveDocument(FrameId),
    /// Lifecycle updates are postponed for the frame's document.
    #[error("lifecycle updates are postponed for {0:?}")]
    LifecyclePostponed(FrameId),
    /// The update was requested on a frame that is neither a local frame root
    /// nor detached.
    #[error("{0:?} is not a local frame root")]
    NotLocalRoot(FrameId),
    /// Only `LayoutClean`, `CompositingInputsClean`, `PrePaintClean` and
    /// `PaintClean` can be targeted.
    #[error("{0:?} is not a supported target state")]
    UnsupportedTarget(LifecycleState),
    /// The frame is detached and the update is not for printing.
    #[error("{0:?} is detached from the frame tree")]
    Detached(FrameId),
}
