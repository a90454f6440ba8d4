// Copyright 2026 the Rendercycle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Document lifecycle states.

/// How far a document has progressed through the rendering lifecycle.
///
/// States are totally ordered. The `In*` states mark a phase in progress.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LifecycleState {
    /// Never updated, or no update in progress (as an update target).
    #[default]
    Uninitialized,
    /// Something changed; a visual update is needed.
    VisualUpdatePending,
    /// Style is up to date.
    StyleClean,
    /// Layout is up to date.
    LayoutClean,
    /// Compositing inputs are being updated.
    InCompositingInputsUpdate,
    /// Compositing inputs are up to date.
    CompositingInputsClean,
    /// Pre-paint is running.
    InPrePaint,
    /// Paint properties and cull rects are up to date.
    PrePaintClean,
    /// Paint is running.
    InPaint,
    /// Paint output is up to date.
    PaintClean,
}

impl LifecycleState {
    /// Whether an update can target this state.
    #[must_use]
    pub const fn is_supported_target(self) -> bool {
        matches!(
            self,
            Self::LayoutClean | Self::CompositingInputsClean | Self::PrePaintClean | Self::PaintClean
        )
    }

    /// A short stable name, for diagnostics.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Uninitialized => "Uninitialized",
            Self::VisualUpdatePending => "VisualUpdatePending",
            Self::StyleClean => "StyleClean",
            Self::LayoutClean => "LayoutClean",
            Self::InCompositingInputsUpdate => "InCompositingInputsUpdate",
            Self::CompositingInputsClean => "CompositingInputsClean",
            Self::InPrePaint => "InPrePaint",
            Self::PrePaintClean => "PrePaintClean",
            Self::InPaint => "InPaint",
            Self::PaintClean => "PaintClean",
        }
    }
}

/// A document's lifecycle state plus its postponement bit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DocumentLifecycle {
    state: LifecycleState,
    postponed: bool,
}

impl DocumentLifecycle {
    /// A new, uninitialized lifecycle.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: LifecycleState::Uninitialized,
            postponed: false,
        }
    }

    /// The current state.
    #[must_use]
    pub const fn state(&self) -> LifecycleState {
        self.state
    }

    /// Moves forward to `next`.
    ///
    /// Going backwards is a bug in the caller; use
    /// [`ensure_state_at_most`](Self::ensure_state_at_most) to rewind.
    pub fn advance_to(&mut self, next: LifecycleState) {
        debug_assert!(
            next >= self.state,
            "lifecycle cannot go back from {:?} to {next:?}",
            self.state
        );
        self.state = next;
    }

    /// Rewinds to `state` if the lifecycle is past it.
    pub fn ensure_state_at_most(&mut self, state: LifecycleState) {
        if self.state > state {
            self.state = state;
        }
    }

    /// Whether lifecycle updates are postponed.
    #[must_use]
    pub const fn is_postponed(&self) -> bool {
        self.postponed
    }

    /// Postpones or resumes lifecycle updates.
    pub fn set_postponed(&mut self, postponed: bool) {
        self.postponed = postponed;
    }
}

/// Why a lifecycle update was requested.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum UpdateReason {
    /// The regular per-frame update.
    #[default]
    BeginMainFrame,
    /// A test asked for it. Forces paint debug info on for the update.
    Test,
    /// Hit testing needs up-to-date geometry.
    HitTest,
    /// Printing; the only reason a detached frame accepts.
    Printing,
    /// Intersection observers need geometry for a throttled frame.
    IntersectionObservation,
    /// Script read layout-dependent state.
    Script,
    /// Developer tools asked for it.
    Inspector,
    /// Anything else.
    Other,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn states_are_ordered() {
        assert!(LifecycleState::Uninitialized < LifecycleState::VisualUpdatePending);
        assert!(LifecycleState::LayoutClean < LifecycleState::InCompositingInputsUpdate);
        assert!(LifecycleState::InPrePaint < LifecycleState::PrePaintClean);
        assert!(LifecycleState::InPaint < LifecycleState::PaintClean);
    }

    #[test]
    fn supported_targets() {
        let supported = [
            LifecycleState::LayoutClean,
            LifecycleState::CompositingInputsClean,
            LifecycleState::PrePaintClean,
            LifecycleState::PaintClean,
        ];
        for state in supported {
            assert!(state.is_supported_target(), "{} should be a target", state.name());
        }
        assert!(!LifecycleState::StyleClean.is_supported_target());
        assert!(!LifecycleState::InPaint.is_supported_target());
    }

    #[test]
    fn ensure_state_at_most_only_rewinds() {
        let mut lifecycle = DocumentLifecycle::new();
        lifecycle.advance_to(LifecycleState::LayoutClean);
        lifecycle.ensure_state_at_most(LifecycleState::PaintClean);
        assert_eq!(lifecycle.state(), LifecycleState::LayoutClean);
        lifecycle.ensure_state_at_most(LifecycleState::VisualUpdatePending);
        assert_eq!(lifecycle.state(), LifecycleState::VisualUpdatePending);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "lifecycle cannot go back")]
    fn advancing_backwards_is_caught() {
        let mut lifecycle = DocumentLifecycle::new();
        lifecycle.advance_to(LifecycleState::PaintClean);
        lifecycle.advance_to(LifecycleState::LayoutClean);
    }
}
