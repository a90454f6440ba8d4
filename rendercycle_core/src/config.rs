// Copyright 2026 the Rendercycle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Frame-tree configuration.

use crate::cull_rect::CullRectConfig;

/// Configuration installed with [`FrameTree::with_config`].
///
/// [`FrameTree::with_config`]: crate::frame::FrameTree::with_config
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LifecycleConfig {
    /// Cull-rect expansion and reuse tuning.
    pub cull_rect: CullRectConfig,
    /// Validate scroll snapshot clients once per update, after the first
    /// layout.
    pub run_scroll_snapshot_steps: bool,
}

impl LifecycleConfig {
    /// The default configuration.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            cull_rect: CullRectConfig::new(),
            run_scroll_snapshot_steps: true,
        }
    }

    /// Replaces the cull-rect tuning.
    #[must_use]
    pub const fn with_cull_rect(mut self, cull_rect: CullRectConfig) -> Self {
        self.cull_rect = cull_rect;
        self
    }
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self::new()
    }
}
