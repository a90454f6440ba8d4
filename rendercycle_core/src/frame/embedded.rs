// Copyright 2026 the Rendercycle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Embedded content views: child frames and plugins inside a frame.

use alloc::vec::Vec;

use super::id::{FrameId, FrameKind, PluginId};
use super::store::FrameTree;
use crate::lifecycle::{IntersectionObservationState, UpdateContext};

/// Content embedded in a frame that has geometry of its own.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EmbeddedView {
    /// A child frame rendered in this tree.
    LocalFrame(FrameId),
    /// A child frame rendered elsewhere.
    RemoteFrame(FrameId),
    /// A plugin owned by the given frame.
    Plugin(FrameId, PluginId),
}

impl EmbeddedView {
    /// Recomputes the view's rect from its owner's layout.
    pub fn update_geometry(self, tree: &mut FrameTree, cx: &mut UpdateContext<'_, '_>) {
        match self {
            Self::LocalFrame(frame) | Self::RemoteFrame(frame) => {
                let Some(rect) = cx.client.embedded_content_rect(tree, frame) else {
                    return;
                };
                if !tree.is_alive(frame) {
                    return;
                }
                let old = tree.frame_rect(frame);
                tree.set_frame_rect(frame, rect);
                let resized = old.width() != rect.width() || old.height() != rect.height();
                if resized && matches!(self, Self::LocalFrame(_)) {
                    cx.client.frame_size_changed(tree, frame);
                }
            }
            Self::Plugin(owner, plugin) => cx.client.update_plugin_geometry(tree, owner, plugin),
        }
    }

    /// Calls `f` with every frame directly below this view.
    pub fn for_each_child(self, tree: &FrameTree, mut f: impl FnMut(FrameId)) {
        match self {
            Self::LocalFrame(frame) | Self::RemoteFrame(frame) => {
                for child in tree.children(frame) {
                    f(child);
                }
            }
            Self::Plugin(..) => {}
        }
    }

    /// Tells the view that the rects of the frames above it moved.
    pub fn propagate_frame_rects(self, tree: &mut FrameTree, cx: &mut UpdateContext<'_, '_>) {
        match self {
            Self::LocalFrame(frame) => {
                // Viewport intersections of the whole subtree may have moved.
                tree.set_intersection_observation_state(
                    frame,
                    IntersectionObservationState::Desired,
                );
                for view in tree.embedded_views(frame) {
                    if view.is_alive(tree) {
                        view.propagate_frame_rects(tree, cx);
                    }
                }
            }
            Self::RemoteFrame(frame) => cx.client.update_compositing_rect(tree, frame),
            Self::Plugin(owner, plugin) => cx.client.update_plugin_geometry(tree, owner, plugin),
        }
    }

    fn is_alive(self, tree: &FrameTree) -> bool {
        match self {
            Self::LocalFrame(frame) | Self::RemoteFrame(frame) | Self::Plugin(frame, _) => {
                tree.is_alive(frame)
            }
        }
    }
}

impl FrameTree {
    /// The child frames and plugins embedded in `frame`, in order.
    #[must_use]
    pub fn embedded_views(&self, frame: FrameId) -> Vec<EmbeddedView> {
        let mut views: Vec<EmbeddedView> = self
            .children(frame)
            .map(|child| match self.kind[child.idx as usize] {
                FrameKind::Local => EmbeddedView::LocalFrame(child),
                FrameKind::Remote => EmbeddedView::RemoteFrame(child),
            })
            .collect();
        views.extend(
            self.plugins[frame.idx as usize]
                .iter()
                .map(|plugin| EmbeddedView::Plugin(frame, *plugin)),
        );
        views
    }

    /// Updates the geometry of every embedded view if layout asked for it.
    pub fn update_geometries_if_needed(&mut self, frame: FrameId, cx: &mut UpdateContext<'_, '_>) {
        self.validate(frame);
        let flags = &mut self.flags[frame.idx as usize];
        if !flags.needs_update_geometries {
            return;
        }
        flags.needs_update_geometries = false;
        for view in self.embedded_views(frame) {
            if view.is_alive(self) {
                view.update_geometry(self, cx);
            }
        }
    }

    /// Propagates moved frame rects into the embedded views of `frame`, if
    /// they moved since the last time.
    pub(crate) fn notify_frame_rects_changed_if_needed(
        &mut self,
        frame: FrameId,
        cx: &mut UpdateContext<'_, '_>,
    ) {
        let flags = &mut self.flags[frame.idx as usize];
        if !flags.frame_rects_changed {
            return;
        }
        flags.frame_rects_changed = false;
        for view in self.embedded_views(frame) {
            if view.is_alive(self) {
                view.propagate_frame_rects(self, cx);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;
    use crate::geometry::PixelRect;
    use crate::testing::{Call, RecordingClient};

    #[test]
    fn views_list_frames_then_plugins() {
        let mut tree = FrameTree::new();
        let main = tree.create_main_frame(None);
        let local = tree.create_local_frame(main, None, None);
        let remote = tree.create_remote_frame(main, None);
        tree.add_plugin(main, PluginId(4));
        assert_eq!(
            tree.embedded_views(main),
            vec![
                EmbeddedView::LocalFrame(local),
                EmbeddedView::RemoteFrame(remote),
                EmbeddedView::Plugin(main, PluginId(4)),
            ]
        );

        let mut seen = Vec::new();
        EmbeddedView::LocalFrame(main).for_each_child(&tree, |f| seen.push(f));
        assert_eq!(seen, vec![local, remote]);
    }

    #[test]
    fn geometry_update_resizes_local_children() {
        let mut tree = FrameTree::new();
        let main = tree.create_main_frame(None);
        let child = tree.create_local_frame(main, None, None);
        tree.add_plugin(main, PluginId(1));

        let mut client = RecordingClient::new();
        client.embedded_rect = Some(PixelRect::new(10, 10, 320, 240));
        let mut cx = UpdateContext::new(&mut client);
        tree.update_geometries_if_needed(main, &mut cx);

        assert_eq!(tree.frame_rect(child), PixelRect::new(10, 10, 320, 240));
        assert!(!tree.flags(main).needs_update_geometries);
        assert!(client.calls.contains(&Call::FrameSizeChanged(child)));
        assert!(client.calls.contains(&Call::PluginGeometry(main, PluginId(1))));

        // Nothing to do until layout asks again.
        client.calls.clear();
        let mut cx = UpdateContext::new(&mut client);
        tree.update_geometries_if_needed(main, &mut cx);
        assert!(client.calls.is_empty());
    }

    #[test]
    fn frame_rects_reach_remote_descendants() {
        let mut tree = FrameTree::new();
        let main = tree.create_main_frame(None);
        let child = tree.create_local_frame(main, None, None);
        let remote = tree.create_remote_frame(child, None);
        tree.flags[main.idx as usize].frame_rects_changed = true;

        let mut client = RecordingClient::new();
        let mut cx = UpdateContext::new(&mut client);
        tree.notify_frame_rects_changed_if_needed(main, &mut cx);

        assert_eq!(client.calls, vec![Call::CompositingRect(remote)]);
        assert_eq!(
            tree.intersection_observation_state(child),
            IntersectionObservationState::Desired
        );
        assert!(!tree.flags(main).frame_rects_changed);
    }
}
