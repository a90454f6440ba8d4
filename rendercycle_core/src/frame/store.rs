// Copyright 2026 the Rendercycle Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Struct-of-arrays frame storage with allocation, topology, and dirty bits.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;

use kurbo::Vec2;

use super::id::{FrameId, FrameKind, INVALID, PluginId};
use super::pending::PendingUpdates;
use super::traverse::ChildFrames;
use crate::config::LifecycleConfig;
use crate::geometry::PixelRect;
use crate::layer::{LayerId, LayerStore};
use crate::lifecycle::{
    DocumentLifecycle, IntersectionObservationState, LifecycleState, ThrottleInputs,
};
use crate::property::PropertyTrees;

/// Per-frame dirty bits.
///
/// The `descendant_*` bits are set on a frame when a child frame it embeds
/// has the corresponding bit, so that the pre-paint walk reaches into the
/// child.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameFlags {
    /// Style must be recomputed.
    pub needs_style_recalc: bool,
    /// Layout must run.
    pub needs_layout: bool,
    /// Paint properties of this frame must be rebuilt.
    pub needs_paint_property_update: bool,
    /// Paint properties of an embedded frame must be rebuilt.
    pub descendant_needs_paint_property_update: bool,
    /// The pre-paint walk must check this frame for paint invalidations.
    pub should_check_for_paint_invalidation: bool,
    /// Effective touch-action regions changed.
    pub touch_action_changed: bool,
    /// Touch-action regions changed in an embedded frame.
    pub descendant_touch_action_changed: bool,
    /// Blocking wheel-event handler regions changed.
    pub wheel_handler_changed: bool,
    /// Wheel-event handler regions changed in an embedded frame.
    pub descendant_wheel_handler_changed: bool,
    /// Embedded views need their geometry recomputed after layout.
    pub needs_update_geometries: bool,
    /// Frame rects moved and must be propagated to embedded views.
    pub frame_rects_changed: bool,
    /// Layout has run at least once.
    pub did_first_layout: bool,
    /// The last intersection update found observers tracking occlusion.
    pub needs_occlusion_tracking: bool,
}

impl FrameFlags {
    /// Whether the pre-paint walk has anything to do in this frame.
    #[must_use]
    pub const fn needs_pre_paint(&self) -> bool {
        self.needs_paint_property_update
            || self.descendant_needs_paint_property_update
            || self.should_check_for_paint_invalidation
            || self.touch_action_changed
            || self.descendant_touch_action_changed
            || self.wheel_handler_changed
            || self.descendant_wheel_handler_changed
    }

    pub(crate) fn clear_pre_paint(&mut self) {
        self.needs_paint_property_update = false;
        self.descendant_needs_paint_property_update = false;
        self.should_check_for_paint_invalidation = false;
        self.touch_action_changed = false;
        self.descendant_touch_action_changed = false;
        self.wheel_handler_changed = false;
        self.descendant_wheel_handler_changed = false;
    }
}

/// A dirty bit carried from a frame into the frame that embeds it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DirtyKind {
    /// The frame or something in it needs a paint-property update.
    PaintPropertyUpdate,
    /// The frame must be checked for paint invalidations.
    PaintInvalidationCheck,
    /// Touch-action regions changed.
    TouchAction,
    /// Wheel-event handler regions changed.
    WheelHandler,
}

/// State kept on local frame roots. Unused on other frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct LocalRootState {
    /// Target of the update in progress; `Uninitialized` when idle.
    pub(crate) target_state: LifecycleState,
    pub(crate) allow_throttling: bool,
    pub(crate) force_throttling: bool,
    pub(crate) visual_viewport_or_overlay_needs_repaint: bool,
    pub(crate) paint_frame_count: u64,
    pub(crate) paint_debug_info_enabled: bool,
    pub(crate) paint_debug_info_desired: bool,
    pub(crate) disable_cull_rect_expansion: bool,
}

impl LocalRootState {
    const fn new() -> Self {
        Self {
            target_state: LifecycleState::Uninitialized,
            allow_throttling: false,
            force_throttling: false,
            visual_viewport_or_overlay_needs_repaint: false,
            paint_frame_count: 0,
            paint_debug_info_enabled: false,
            paint_debug_info_desired: false,
            disable_cull_rect_expansion: false,
        }
    }
}

/// A one-shot task run at the start of the next full lifecycle update.
pub type LifecycleTask = Box<dyn FnOnce(&mut FrameTree)>;

#[derive(Default)]
pub(crate) struct TaskQueue(pub(crate) Vec<LifecycleTask>);

impl fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskQueue")
            .field("len", &self.0.len())
            .finish()
    }
}

/// Struct-of-arrays storage for a tree of frames.
///
/// Frames are addressed by [`FrameId`] handles. Each frame occupies a slot in
/// parallel arrays; destroyed frames are recycled via a free list, and
/// generation counters prevent stale handle access.
///
/// The tree also owns the [`LayerStore`] and [`PropertyTrees`] shared by all
/// of its frames, so a lifecycle update can walk paint layers across frame
/// boundaries.
#[derive(Debug)]
pub struct FrameTree {
    // -- Topology --
    pub(crate) kind: Vec<FrameKind>,
    pub(crate) parent: Vec<u32>,
    pub(crate) first_child: Vec<u32>,
    pub(crate) next_sibling: Vec<u32>,
    pub(crate) prev_sibling: Vec<u32>,
    pub(crate) detached: Vec<bool>,

    // -- Document --
    pub(crate) lifecycle: Vec<DocumentLifecycle>,
    pub(crate) active: Vec<bool>,
    pub(crate) flags: Vec<FrameFlags>,

    // -- Throttling and intersection observation --
    pub(crate) throttle: Vec<ThrottleInputs>,
    pub(crate) intersection_state: Vec<IntersectionObservationState>,
    pub(crate) scroll_delta_since_intersection: Vec<Vec2>,

    // -- Layers and geometry --
    pub(crate) root_layer: Vec<Option<LayerId>>,
    pub(crate) owner_layer: Vec<Option<LayerId>>,
    pub(crate) frame_rect: Vec<PixelRect>,
    pub(crate) plugins: Vec<Vec<PluginId>>,
    pub(crate) eligible_to_paint: Vec<bool>,

    // -- Pending updates --
    pub(crate) pending: Vec<PendingUpdates>,

    // -- Resize observation --
    pub(crate) resize_min_depth: Vec<u32>,
    pub(crate) resize_loop_limit_dispatched: Vec<bool>,

    // -- Local roots --
    pub(crate) root_state: Vec<LocalRootState>,
    pub(crate) start_of_lifecycle_tasks: Vec<TaskQueue>,

    // -- Shared --
    pub(crate) layers: LayerStore,
    pub(crate) properties: PropertyTrees,
    pub(crate) config: LifecycleConfig,
    pub(crate) update_count: u64,
    pub(crate) visual_update_requested: bool,

    // -- Allocation --
    pub(crate) generation: Vec<u32>,
    pub(crate) alive: Vec<bool>,
    pub(crate) free_list: Vec<u32>,
    pub(crate) len: u32,
}

impl Default for FrameTree {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameTree {
    /// Creates an empty tree with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(LifecycleConfig::new())
    }

    /// Creates an empty tree with the given configuration.
    #[must_use]
    pub fn with_config(config: LifecycleConfig) -> Self {
        Self {
            kind: Vec::new(),
            parent: Vec::new(),
            first_child: Vec::new(),
            next_sibling: Vec::new(),
            prev_sibling: Vec::new(),
            detached: Vec::new(),
            lifecycle: Vec::new(),
            active: Vec::new(),
            flags: Vec::new(),
            throttle: Vec::new(),
            intersection_state: Vec::new(),
            scroll_delta_since_intersection: Vec::new(),
            root_layer: Vec::new(),
            owner_layer: Vec::new(),
            frame_rect: Vec::new(),
            plugins: Vec::new(),
            eligible_to_paint: Vec::new(),
            pending: Vec::new(),
            resize_min_depth: Vec::new(),
            resize_loop_limit_dispatched: Vec::new(),
            root_state: Vec::new(),
            start_of_lifecycle_tasks: Vec::new(),
            layers: LayerStore::new(),
            properties: PropertyTrees::new(),
            config,
            update_count: 0,
            visual_update_requested: false,
            generation: Vec::new(),
            alive: Vec::new(),
            free_list: Vec::new(),
            len: 0,
        }
    }

    /// The installed configuration.
    #[must_use]
    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    /// The paint layers of every frame.
    #[must_use]
    pub fn layers(&self) -> &LayerStore {
        &self.layers
    }

    /// Mutable access to the paint layers.
    pub fn layers_mut(&mut self) -> &mut LayerStore {
        &mut self.layers
    }

    /// The paint property trees shared by every frame.
    #[must_use]
    pub fn properties(&self) -> &PropertyTrees {
        &self.properties
    }

    /// Mutable access to the paint property trees.
    pub fn properties_mut(&mut self) -> &mut PropertyTrees {
        &mut self.properties
    }

    /// Number of lifecycle updates started on this tree.
    #[must_use]
    pub fn update_count(&self) -> u64 {
        self.update_count
    }

    // -- Allocation API --

    /// Creates the main frame of a new frame tree.
    ///
    /// Main frames are local, start unthrottled and need style and layout.
    pub fn create_main_frame(&mut self, root_layer: Option<LayerId>) -> FrameId {
        let id = self.allocate(FrameKind::Local, None, root_layer);
        self.throttle[id.idx as usize].lifecycle_updates_throttled = false;
        id
    }

    /// Creates a local child frame of `parent`, embedded by `owner_layer`.
    ///
    /// Child frames start with lifecycle updates throttled until
    /// [`begin_lifecycle_updates`](Self::begin_lifecycle_updates).
    ///
    /// # Panics
    ///
    /// Panics if `parent` is stale.
    pub fn create_local_frame(
        &mut self,
        parent: FrameId,
        owner_layer: Option<LayerId>,
        root_layer: Option<LayerId>,
    ) -> FrameId {
        self.validate(parent);
        let id = self.allocate(FrameKind::Local, owner_layer, root_layer);
        self.link_child(parent.idx, id.idx);
        self.flags[parent.idx as usize].needs_update_geometries = true;
        id
    }

    /// Creates a remote child frame of `parent`, embedded by `owner_layer`.
    ///
    /// # Panics
    ///
    /// Panics if `parent` is stale.
    pub fn create_remote_frame(&mut self, parent: FrameId, owner_layer: Option<LayerId>) -> FrameId {
        self.validate(parent);
        let id = self.allocate(FrameKind::Remote, owner_layer, None);
        let i = id.idx as usize;
        self.flags[i] = FrameFlags::default();
        self.throttle[i].lifecycle_updates_throttled = false;
        self.link_child(parent.idx, id.idx);
        self.flags[parent.idx as usize].needs_update_geometries = true;
        id
    }

    fn allocate(
        &mut self,
        kind: FrameKind,
        owner_layer: Option<LayerId>,
        root_layer: Option<LayerId>,
    ) -> FrameId {
        let flags = FrameFlags {
            needs_style_recalc: true,
            needs_layout: true,
            ..FrameFlags::default()
        };
        let throttle = ThrottleInputs {
            lifecycle_updates_throttled: true,
            ..ThrottleInputs::default()
        };
        let idx = if let Some(idx) = self.free_list.pop() {
            // Reuse a freed slot.
            let i = idx as usize;
            self.generation[i] += 1;
            self.kind[i] = kind;
            self.parent[i] = INVALID;
            self.first_child[i] = INVALID;
            self.next_sibling[i] = INVALID;
            self.prev_sibling[i] = INVALID;
            self.detached[i] = false;
            self.lifecycle[i] = DocumentLifecycle::new();
            self.active[i] = true;
            self.flags[i] = flags;
            self.throttle[i] = throttle;
            self.intersection_state[i] = IntersectionObservationState::NotNeeded;
            self.scroll_delta_since_intersection[i] = Vec2::ZERO;
            self.root_layer[i] = root_layer;
            self.owner_layer[i] = owner_layer;
            self.frame_rect[i] = PixelRect::ZERO;
            self.plugins[i].clear();
            self.eligible_to_paint[i] = false;
            self.pending[i] = PendingUpdates::default();
            self.resize_min_depth[i] = 0;
            self.resize_loop_limit_dispatched[i] = false;
            self.root_state[i] = LocalRootState::new();
            self.start_of_lifecycle_tasks[i] = TaskQueue::default();
            self.alive[i] = true;
            idx
        } else {
            // Allocate a new slot.
            let idx = self.len;
            self.len += 1;
            self.kind.push(kind);
            self.parent.push(INVALID);
            self.first_child.push(INVALID);
            self.next_sibling.push(INVALID);
            self.prev_sibling.push(INVALID);
            self.detached.push(false);
            self.lifecycle.push(DocumentLifecycle::new());
            self.active.push(true);
            self.flags.push(flags);
            self.throttle.push(throttle);
            self.intersection_state
                .push(IntersectionObservationState::NotNeeded);
            self.scroll_delta_since_intersection.push(Vec2::ZERO);
            self.root_layer.push(root_layer);
            self.owner_layer.push(owner_layer);
            self.frame_rect.push(PixelRect::ZERO);
            self.plugins.push(Vec::new());
            self.eligible_to_paint.push(false);
            self.pending.push(PendingUpdates::default());
            self.resize_min_depth.push(0);
            self.resize_loop_limit_dispatched.push(false);
            self.root_state.push(LocalRootState::new());
            self.start_of_lifecycle_tasks.push(TaskQueue::default());
            self.generation.push(0);
            self.alive.push(true);
            idx
        };
        self.visual_update_requested = true;

        FrameId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    /// Destroys a frame, freeing its slot for reuse.
    ///
    /// The frame's layers are left to the caller.
    ///
    /// # Panics
    ///
    /// Panics if the frame has children (destroy them first) or if the
    /// handle is stale.
    pub fn destroy_frame(&mut self, id: FrameId) {
        self.validate(id);
        let idx = id.idx;
        assert!(
            self.first_child[idx as usize] == INVALID,
            "cannot destroy frame with children"
        );

        if self.parent[idx as usize] != INVALID {
            self.unlink_from_parent(idx);
        }

        let i = idx as usize;
        self.plugins[i].clear();
        self.pending[i] = PendingUpdates::default();
        self.start_of_lifecycle_tasks[i] = TaskQueue::default();
        // Bump generation so old handles immediately fail validation.
        self.generation[i] += 1;
        self.alive[i] = false;
        self.free_list.push(idx);
    }

    /// Detaches a frame from its parent.
    ///
    /// A detached frame roots its own subtree but only accepts lifecycle
    /// updates for printing.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    pub fn detach_frame(&mut self, id: FrameId) {
        self.validate(id);
        let p = self.parent[id.idx as usize];
        if p != INVALID {
            self.unlink_from_parent(id.idx);
            self.flags[p as usize].needs_update_geometries = true;
        }
        self.detached[id.idx as usize] = true;
    }

    /// Returns whether the given handle refers to a live frame.
    #[must_use]
    pub fn is_alive(&self, id: FrameId) -> bool {
        id.idx < self.len
            && self.generation[id.idx as usize] == id.generation
            && self.alive[id.idx as usize]
    }

    /// Number of live frames.
    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.alive.iter().filter(|alive| **alive).count()
    }

    // -- Topology API --

    /// Returns whether the frame is local or remote.
    #[must_use]
    pub fn kind(&self, id: FrameId) -> FrameKind {
        self.validate(id);
        self.kind[id.idx as usize]
    }

    /// Returns whether the frame is local.
    #[must_use]
    pub fn is_local(&self, id: FrameId) -> bool {
        self.kind(id) == FrameKind::Local
    }

    /// Returns the parent of a frame, if any.
    #[must_use]
    pub fn parent(&self, id: FrameId) -> Option<FrameId> {
        self.validate(id);
        self.handle(self.parent[id.idx as usize])
    }

    /// Returns an iterator over the direct children of a frame.
    #[must_use]
    pub fn children(&self, id: FrameId) -> ChildFrames<'_> {
        self.validate(id);
        ChildFrames::new(self, self.first_child[id.idx as usize])
    }

    /// Whether the frame has been detached.
    #[must_use]
    pub fn is_detached(&self, id: FrameId) -> bool {
        self.validate(id);
        self.detached[id.idx as usize]
    }

    /// The highest local ancestor reachable from `id` without crossing a
    /// remote frame.
    #[must_use]
    pub fn local_root(&self, id: FrameId) -> FrameId {
        self.validate(id);
        self.id_at(self.local_root_idx(id.idx))
    }

    /// Whether `id` is a local frame whose parent is absent or remote.
    #[must_use]
    pub fn is_local_root(&self, id: FrameId) -> bool {
        self.validate(id);
        let i = id.idx as usize;
        self.kind[i] == FrameKind::Local
            && (self.parent[i] == INVALID || self.kind[self.parent[i] as usize] == FrameKind::Remote)
    }

    pub(crate) fn local_root_idx(&self, mut idx: u32) -> u32 {
        loop {
            let p = self.parent[idx as usize];
            if p == INVALID || self.kind[p as usize] != FrameKind::Local {
                return idx;
            }
            idx = p;
        }
    }

    // -- Layers and geometry --

    /// The root paint layer of a local frame.
    #[must_use]
    pub fn root_layer(&self, id: FrameId) -> Option<LayerId> {
        self.validate(id);
        self.root_layer[id.idx as usize]
    }

    /// Replaces the root paint layer of a frame.
    pub fn set_root_layer(&mut self, id: FrameId, layer: Option<LayerId>) {
        self.validate(id);
        self.root_layer[id.idx as usize] = layer;
    }

    /// The layer in the parent frame that embeds this frame.
    #[must_use]
    pub fn owner_layer(&self, id: FrameId) -> Option<LayerId> {
        self.validate(id);
        self.owner_layer[id.idx as usize]
    }

    /// Replaces the owner layer of a frame.
    pub fn set_owner_layer(&mut self, id: FrameId, layer: Option<LayerId>) {
        self.validate(id);
        self.owner_layer[id.idx as usize] = layer;
    }

    /// The frame's rect in its parent frame.
    #[must_use]
    pub fn frame_rect(&self, id: FrameId) -> PixelRect {
        self.validate(id);
        self.frame_rect[id.idx as usize]
    }

    /// Moves or resizes the frame within its parent.
    ///
    /// A size change of a local frame needs layout. Any change marks the frame
    /// rects as changed so they are propagated to embedded views.
    pub fn set_frame_rect(&mut self, id: FrameId, rect: PixelRect) {
        self.validate(id);
        let i = id.idx as usize;
        let old = self.frame_rect[i];
        if old == rect {
            return;
        }
        self.frame_rect[i] = rect;
        self.flags[i].frame_rects_changed = true;
        if self.kind[i] == FrameKind::Local
            && (old.width() != rect.width() || old.height() != rect.height())
        {
            self.set_needs_layout(id);
        }
    }

    /// Registers a plugin embedded in the frame.
    pub fn add_plugin(&mut self, id: FrameId, plugin: PluginId) {
        self.validate(id);
        let plugins = &mut self.plugins[id.idx as usize];
        if !plugins.contains(&plugin) {
            plugins.push(plugin);
            self.flags[id.idx as usize].needs_update_geometries = true;
        }
    }

    /// Unregisters a plugin. Returns whether it was registered.
    pub fn remove_plugin(&mut self, id: FrameId, plugin: PluginId) -> bool {
        self.validate(id);
        let plugins = &mut self.plugins[id.idx as usize];
        let before = plugins.len();
        plugins.retain(|p| *p != plugin);
        before != plugins.len()
    }

    /// The plugins embedded in the frame.
    #[must_use]
    pub fn plugins(&self, id: FrameId) -> &[PluginId] {
        self.validate(id);
        &self.plugins[id.idx as usize]
    }

    /// Whether the last paint treated the frame as eligible to paint.
    #[must_use]
    pub fn is_eligible_to_paint(&self, id: FrameId) -> bool {
        self.validate(id);
        self.eligible_to_paint[id.idx as usize]
    }

    // -- Document state --

    /// The frame's document lifecycle state.
    #[must_use]
    pub fn lifecycle_state(&self, id: FrameId) -> LifecycleState {
        self.validate(id);
        self.lifecycle[id.idx as usize].state()
    }

    /// Whether the frame's document is active.
    #[must_use]
    pub fn is_document_active(&self, id: FrameId) -> bool {
        self.validate(id);
        self.active[id.idx as usize]
    }

    /// Activates or deactivates the frame's document.
    pub fn set_document_active(&mut self, id: FrameId, active: bool) {
        self.validate(id);
        self.active[id.idx as usize] = active;
    }

    /// Whether lifecycle updates are postponed for the frame's document.
    #[must_use]
    pub fn is_lifecycle_postponed(&self, id: FrameId) -> bool {
        self.validate(id);
        self.lifecycle[id.idx as usize].is_postponed()
    }

    /// Postpones or resumes lifecycle updates for the frame's document.
    pub fn set_lifecycle_postponed(&mut self, id: FrameId, postponed: bool) {
        self.validate(id);
        self.lifecycle[id.idx as usize].set_postponed(postponed);
    }

    /// The frame's dirty bits.
    #[must_use]
    pub fn flags(&self, id: FrameId) -> FrameFlags {
        self.validate(id);
        self.flags[id.idx as usize]
    }

    /// Whether an update is running on the frame's local root.
    #[must_use]
    pub fn is_updating_lifecycle(&self, id: FrameId) -> bool {
        self.validate(id);
        self.is_updating_at(id.idx)
    }

    pub(crate) fn is_updating_at(&self, idx: u32) -> bool {
        let root = self.local_root_idx(idx);
        self.root_state[root as usize].target_state != LifecycleState::Uninitialized
    }

    /// How many times the frame's local root ran the paint phase.
    #[must_use]
    pub fn paint_frame_count(&self, id: FrameId) -> u64 {
        self.validate(id);
        let root = self.local_root_idx(id.idx);
        self.root_state[root as usize].paint_frame_count
    }

    // -- Dirty bits --

    /// Marks the frame's style as dirty.
    pub fn set_needs_style_recalc(&mut self, id: FrameId) {
        self.validate(id);
        let i = id.idx as usize;
        self.flags[i].needs_style_recalc = true;
        self.lifecycle[i].ensure_state_at_most(LifecycleState::VisualUpdatePending);
        self.schedule_visual_update();
    }

    /// Marks the frame as needing layout.
    pub fn set_needs_layout(&mut self, id: FrameId) {
        self.validate(id);
        let i = id.idx as usize;
        self.flags[i].needs_layout = true;
        self.lifecycle[i].ensure_state_at_most(LifecycleState::StyleClean);
        self.schedule_visual_update();
    }

    /// Marks the frame's paint properties for rebuild in the next pre-paint.
    pub fn set_needs_paint_property_update(&mut self, id: FrameId) {
        self.validate(id);
        self.flags[id.idx as usize].needs_paint_property_update = true;
        self.schedule_visual_update_for_paint_invalidation_if_needed(id);
    }

    /// Asks the next pre-paint to check the frame for paint invalidations.
    pub fn set_should_check_for_paint_invalidation(&mut self, id: FrameId) {
        self.validate(id);
        self.flags[id.idx as usize].should_check_for_paint_invalidation = true;
        self.schedule_visual_update_for_paint_invalidation_if_needed(id);
    }

    /// Records a change of the frame's effective touch-action regions.
    pub fn mark_touch_action_changed(&mut self, id: FrameId) {
        self.validate(id);
        self.flags[id.idx as usize].touch_action_changed = true;
        self.schedule_visual_update_for_paint_invalidation_if_needed(id);
    }

    /// Records a change of the frame's blocking wheel-handler regions.
    pub fn mark_wheel_handler_changed(&mut self, id: FrameId) {
        self.validate(id);
        self.flags[id.idx as usize].wheel_handler_changed = true;
        self.schedule_visual_update_for_paint_invalidation_if_needed(id);
    }

    /// Carries one dirty bit from `child` into the local frame embedding it.
    pub(crate) fn propagate_dirty(&mut self, child: u32, kind: DirtyKind) {
        let p = self.parent[child as usize];
        if p == INVALID || self.kind[p as usize] != FrameKind::Local {
            return;
        }
        let flags = &mut self.flags[p as usize];
        match kind {
            DirtyKind::PaintPropertyUpdate => flags.descendant_needs_paint_property_update = true,
            DirtyKind::PaintInvalidationCheck => flags.should_check_for_paint_invalidation = true,
            DirtyKind::TouchAction => flags.descendant_touch_action_changed = true,
            DirtyKind::WheelHandler => flags.descendant_wheel_handler_changed = true,
        }
    }

    /// Carries every pre-paint dirty bit of `idx` into its embedding frame.
    pub(crate) fn propagate_dirty_into_owner(&mut self, idx: u32) {
        let flags = self.flags[idx as usize];
        if flags.needs_paint_property_update || flags.descendant_needs_paint_property_update {
            self.propagate_dirty(idx, DirtyKind::PaintPropertyUpdate);
        }
        if flags.should_check_for_paint_invalidation {
            self.propagate_dirty(idx, DirtyKind::PaintInvalidationCheck);
        }
        if flags.touch_action_changed || flags.descendant_touch_action_changed {
            self.propagate_dirty(idx, DirtyKind::TouchAction);
        }
        if flags.wheel_handler_changed || flags.descendant_wheel_handler_changed {
            self.propagate_dirty(idx, DirtyKind::WheelHandler);
        }
    }

    // -- Visual updates --

    /// Requests another animation frame from the embedder.
    pub fn schedule_visual_update(&mut self) {
        self.visual_update_requested = true;
    }

    /// Returns and clears the pending visual update request.
    pub fn take_visual_update_request(&mut self) -> bool {
        core::mem::take(&mut self.visual_update_requested)
    }

    /// Whether a visual update has been requested and not yet taken.
    #[must_use]
    pub fn visual_update_requested(&self) -> bool {
        self.visual_update_requested
    }

    /// Queues a task to run at the start of the next update to
    /// [`PaintClean`](LifecycleState::PaintClean) that includes this frame.
    pub fn add_start_of_lifecycle_task(
        &mut self,
        id: FrameId,
        task: impl FnOnce(&mut Self) + 'static,
    ) {
        self.validate(id);
        self.start_of_lifecycle_tasks[id.idx as usize]
            .0
            .push(Box::new(task));
        self.schedule_visual_update();
    }

    // -- Internal helpers --

    /// Panics if the handle is stale.
    pub(crate) fn validate(&self, id: FrameId) {
        assert!(
            self.is_alive(id),
            "stale FrameId: {id:?} (current gen: {})",
            if id.idx < self.len {
                self.generation[id.idx as usize]
            } else {
                u32::MAX
            }
        );
    }

    /// The current handle for raw slot `idx`.
    pub(crate) fn id_at(&self, idx: u32) -> FrameId {
        FrameId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    /// The current handle for raw slot `idx`, or `None` for [`INVALID`].
    pub(crate) fn handle(&self, idx: u32) -> Option<FrameId> {
        (idx != INVALID).then(|| self.id_at(idx))
    }

    fn link_child(&mut self, p: u32, c: u32) {
        self.parent[c as usize] = p;
        if self.first_child[p as usize] == INVALID {
            self.first_child[p as usize] = c;
        } else {
            // Walk to last child.
            let mut last = self.first_child[p as usize];
            while self.next_sibling[last as usize] != INVALID {
                last = self.next_sibling[last as usize];
            }
            self.next_sibling[last as usize] = c;
            self.prev_sibling[c as usize] = last;
        }
    }

    /// Removes `idx` from its parent's child list.
    fn unlink_from_parent(&mut self, idx: u32) {
        let p = self.parent[idx as usize];
        let prev = self.prev_sibling[idx as usize];
        let next = self.next_sibling[idx as usize];

        if prev != INVALID {
            self.next_sibling[prev as usize] = next;
        } else {
            // Was first child.
            self.first_child[p as usize] = next;
        }

        if next != INVALID {
            self.prev_sibling[next as usize] = prev;
        }

        self.parent[idx as usize] = INVALID;
        self.prev_sibling[idx as usize] = INVALID;
        self.next_sibling[idx as usize] = INVALID;
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;

    #[test]
    fn create_and_destroy() {
        let mut tree = FrameTree::new();
        let main = tree.create_main_frame(None);
        let child = tree.create_local_frame(main, None, None);
        assert_eq!(tree.frame_count(), 2);
        assert_eq!(tree.parent(child), Some(main));

        tree.destroy_frame(child);
        assert!(!tree.is_alive(child));
        assert!(tree.children(main).next().is_none());
        assert_eq!(tree.frame_count(), 1);
    }

    #[test]
    fn generation_prevents_stale_access() {
        let mut tree = FrameTree::new();
        let main = tree.create_main_frame(None);
        let a = tree.create_local_frame(main, None, None);
        tree.destroy_frame(a);
        let b = tree.create_local_frame(main, None, None);
        assert!(!tree.is_alive(a));
        assert!(tree.is_alive(b));
        assert_eq!(a.index(), b.index());
        assert_ne!(a.generation(), b.generation());
    }

    #[test]
    fn children_keep_insertion_order() {
        let mut tree = FrameTree::new();
        let main = tree.create_main_frame(None);
        let a = tree.create_local_frame(main, None, None);
        let b = tree.create_remote_frame(main, None);
        let c = tree.create_local_frame(main, None, None);
        let kids: Vec<_> = tree.children(main).collect();
        assert_eq!(kids, vec![a, b, c]);

        tree.destroy_frame(b);
        let kids: Vec<_> = tree.children(main).collect();
        assert_eq!(kids, vec![a, c]);
    }

    #[test]
    fn local_roots_stop_at_remote_frames() {
        let mut tree = FrameTree::new();
        let main = tree.create_main_frame(None);
        let local = tree.create_local_frame(main, None, None);
        let remote = tree.create_remote_frame(local, None);
        let inner = tree.create_local_frame(remote, None, None);
        let leaf = tree.create_local_frame(inner, None, None);

        assert!(tree.is_local_root(main));
        assert!(!tree.is_local_root(local));
        assert!(!tree.is_local_root(remote));
        assert!(tree.is_local_root(inner));
        assert_eq!(tree.local_root(local), main);
        assert_eq!(tree.local_root(leaf), inner);
    }

    #[test]
    fn new_frames_start_dirty() {
        let mut tree = FrameTree::new();
        let main = tree.create_main_frame(None);
        let flags = tree.flags(main);
        assert!(flags.needs_style_recalc);
        assert!(flags.needs_layout);
        assert!(!flags.did_first_layout);
        assert_eq!(tree.lifecycle_state(main), LifecycleState::Uninitialized);
        assert!(tree.take_visual_update_request());
        assert!(!tree.take_visual_update_request());
    }

    #[test]
    fn set_needs_layout_rewinds_lifecycle() {
        let mut tree = FrameTree::new();
        let main = tree.create_main_frame(None);
        let i = main.index() as usize;
        tree.lifecycle[i].advance_to(LifecycleState::PaintClean);
        tree.set_needs_layout(main);
        assert_eq!(tree.lifecycle_state(main), LifecycleState::StyleClean);
        tree.set_needs_style_recalc(main);
        assert_eq!(tree.lifecycle_state(main), LifecycleState::VisualUpdatePending);
    }

    #[test]
    fn resizing_a_local_frame_needs_layout() {
        let mut tree = FrameTree::new();
        let main = tree.create_main_frame(None);
        let child = tree.create_local_frame(main, None, None);
        tree.flags[child.index() as usize] = FrameFlags::default();

        tree.set_frame_rect(child, PixelRect::new(0, 0, 300, 150));
        assert!(tree.flags(child).needs_layout);
        assert!(tree.flags(child).frame_rects_changed);

        tree.flags[child.index() as usize] = FrameFlags::default();
        tree.set_frame_rect(child, PixelRect::new(20, 20, 300, 150));
        assert!(!tree.flags(child).needs_layout, "moving alone does not need layout");
        assert!(tree.flags(child).frame_rects_changed);
    }

    #[test]
    fn dirty_bits_propagate_into_local_parent_only() {
        let mut tree = FrameTree::new();
        let main = tree.create_main_frame(None);
        let child = tree.create_local_frame(main, None, None);
        let remote = tree.create_remote_frame(main, None);
        let grandchild = tree.create_local_frame(remote, None, None);

        tree.flags[child.index() as usize].needs_paint_property_update = true;
        tree.flags[child.index() as usize].wheel_handler_changed = true;
        tree.propagate_dirty_into_owner(child.index());
        let flags = tree.flags(main);
        assert!(flags.descendant_needs_paint_property_update);
        assert!(flags.descendant_wheel_handler_changed);
        assert!(!flags.descendant_touch_action_changed);

        tree.flags[grandchild.index() as usize].touch_action_changed = true;
        tree.propagate_dirty_into_owner(grandchild.index());
        assert!(!tree.flags(remote).descendant_touch_action_changed);
    }

    #[test]
    fn detaching_makes_the_frame_its_own_root() {
        let mut tree = FrameTree::new();
        let main = tree.create_main_frame(None);
        let child = tree.create_local_frame(main, None, None);
        tree.detach_frame(child);
        assert!(tree.is_detached(child));
        assert_eq!(tree.parent(child), None);
        assert!(tree.is_local_root(child));
        assert!(tree.flags(main).needs_update_geometries);
    }

    #[test]
    fn plugins_are_registered_once() {
        let mut tree = FrameTree::new();
        let main = tree.create_main_frame(None);
        tree.add_plugin(main, PluginId(7));
        tree.add_plugin(main, PluginId(7));
        assert_eq!(tree.plugins(main), &[PluginId(7)]);
        assert!(tree.remove_plugin(main, PluginId(7)));
        assert!(!tree.remove_plugin(main, PluginId(7)));
    }

    #[test]
    #[should_panic(expected = "cannot destroy frame with children")]
    fn destroy_with_children_panics() {
        let mut tree = FrameTree::new();
        let main = tree.create_main_frame(None);
        let _child = tree.create_local_frame(main, None, None);
        tree.destroy_frame(main);
    }

    #[test]
    #[should_panic(expected = "stale FrameId")]
    fn destroyed_handle_panics() {
        let mut tree = FrameTree::new();
        let main = tree.create_main_frame(None);
        tree.destroy_frame(main);
        tree.set_needs_layout(main);
    }
}
