// Copyright 2026 the Rendercycle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The rendering lifecycle driver.
//!
//! An update always starts at a local frame root and walks every frame
//! below it that is not throttled:
//!
//! 1. Style and layout, then post-layout tasks (sticky constraints, embedded
//!    geometry, scroll anchoring, snapping).
//! 2. Scroll-snapshot validation, once per update.
//! 3. Compositing inputs.
//! 4. Pre-paint: dirty-bit propagation into embedding frames, direct
//!    transform and opacity updates, the paint-property walk and cull rects.
//! 5. Post-layout intersection observations, resize observations and view
//!    transitions. Any of these may dirty layout and restart the loop at 1.
//! 6. Paint, skipped when no layer needs it.
//!
//! Partial targets stop early: [`LayoutClean`](LifecycleState::LayoutClean)
//! after step 1, [`CompositingInputsClean`](LifecycleState::CompositingInputsClean)
//! after step 3 and [`PrePaintClean`](LifecycleState::PrePaintClean) after
//! step 4 plus an early view-transition check.
//!
//! Collaborators are reached through an [`UpdateContext`].

mod intersection;
mod phases;
mod scope;
mod state;
mod throttle;
mod update;

pub use intersection::IntersectionUpdateFlags;
pub use scope::ThrottlingScope;
pub use state::{DocumentLifecycle, LifecycleState, UpdateReason};
pub use throttle::{IntersectionObservationState, ThrottleInputs};
pub use update::UpdateContext;
