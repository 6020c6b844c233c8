// Copyright 2026 the Easel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Struct-of-arrays node storage with allocation, topology, and attribute
//! management.

use std::sync::Arc;

use hashbrown::HashMap;
use image::RgbaImage;
use kurbo::{Affine, Circle, Point, Rect};
use serde::Serialize;
use understory_dirty::{CycleHandling, DirtyTracker, EagerPolicy};

use super::dirty;
use super::id::{INVALID, NodeId};
use super::traverse::Children;
use super::{CompositeOp, DrawingSurface, Geometry, NodeKind, Stroke};
use crate::geom::distance_sq_to_polyline;
use crate::state::Rgba;

/// Counters describing how a [`SceneGraph`] has been driven.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SceneStats {
    /// Nodes created since construction.
    pub nodes_created: u64,
    /// Nodes destroyed since construction.
    pub nodes_destroyed: u64,
    /// Attribute and ordering calls since construction.
    pub setter_calls: u64,
}

impl SceneStats {
    /// Nodes currently alive.
    #[must_use]
    pub fn live_nodes(&self) -> u64 {
        self.nodes_created - self.nodes_destroyed
    }
}

/// Struct-of-arrays storage for all nodes.
///
/// Nodes are addressed by [`NodeId`] handles. Destroyed nodes are recycled
/// via a free list, and generation counters prevent stale handle access.
#[derive(Debug)]
pub struct SceneGraph {
    // -- Topology --
    pub(crate) parent: Vec<u32>,
    pub(crate) first_child: Vec<u32>,
    pub(crate) next_sibling: Vec<u32>,
    pub(crate) prev_sibling: Vec<u32>,

    // -- Local attributes --
    pub(crate) kind: Vec<NodeKind>,
    pub(crate) name: Vec<Option<String>>,
    pub(crate) local_transform: Vec<Affine>,
    pub(crate) local_opacity: Vec<f32>,
    pub(crate) visible: Vec<bool>,
    pub(crate) clip: Vec<Option<Rect>>,
    pub(crate) geometry: Vec<Geometry>,
    pub(crate) stroke: Vec<Stroke>,
    pub(crate) fill: Vec<Option<Rgba>>,
    pub(crate) composite: Vec<CompositeOp>,

    // -- Computed attributes (written by evaluate) --
    pub(crate) world_transform: Vec<Affine>,
    pub(crate) effective_opacity: Vec<f32>,
    pub(crate) effective_hidden: Vec<bool>,

    // -- Allocation --
    pub(crate) generation: Vec<u32>,
    pub(crate) live: Vec<bool>,
    pub(crate) free_list: Vec<u32>,
    pub(crate) len: u32,

    names: HashMap<String, u32>,

    // -- Dirty tracking --
    pub(crate) dirty: DirtyTracker<u32>,

    // -- Traversal cache --
    pub(crate) traversal_order: Vec<u32>,
    pub(crate) traversal_dirty: bool,

    // -- Lifecycle tracking --
    pub(crate) pending_added: Vec<u32>,
    pub(crate) pending_removed: Vec<u32>,

    stats: SceneStats,
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneGraph {
    /// Creates an empty scene graph.
    #[must_use]
    pub fn new() -> Self {
        Self {
            parent: Vec::new(),
            first_child: Vec::new(),
            next_sibling: Vec::new(),
            prev_sibling: Vec::new(),
            kind: Vec::new(),
            name: Vec::new(),
            local_transform: Vec::new(),
            local_opacity: Vec::new(),
            visible: Vec::new(),
            clip: Vec::new(),
            geometry: Vec::new(),
            stroke: Vec::new(),
            fill: Vec::new(),
            composite: Vec::new(),
            world_transform: Vec::new(),
            effective_opacity: Vec::new(),
            effective_hidden: Vec::new(),
            generation: Vec::new(),
            live: Vec::new(),
            free_list: Vec::new(),
            len: 0,
            names: HashMap::new(),
            dirty: DirtyTracker::with_cycle_handling(CycleHandling::Error),
            traversal_order: Vec::new(),
            traversal_dirty: true,
            pending_added: Vec::new(),
            pending_removed: Vec::new(),
            stats: SceneStats::default(),
        }
    }

    /// Returns the driving counters.
    #[must_use]
    pub fn stats(&self) -> SceneStats {
        self.stats
    }

    // -- Queries --

    /// Returns the kind of a node.
    #[must_use]
    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.validate(id);
        self.kind[id.idx as usize]
    }

    /// Returns the diagnostic name of a node.
    #[must_use]
    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.validate(id);
        self.name[id.idx as usize].as_deref()
    }

    /// Finds a live node by diagnostic name.
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        self.names.get(name).map(|&idx| self.handle(idx))
    }

    /// Returns an iterator over the direct children of a node, bottom to top.
    #[must_use]
    pub fn children(&self, id: NodeId) -> Children<'_> {
        self.validate(id);
        Children::new(self, self.first_child[id.idx as usize])
    }

    /// Returns the live nodes with no parent.
    #[must_use]
    pub fn roots(&self) -> Vec<NodeId> {
        (0..self.len)
            .filter(|&idx| self.live[idx as usize] && self.parent[idx as usize] == INVALID)
            .map(|idx| self.handle(idx))
            .collect()
    }

    /// Returns the number of live nodes.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.live.iter().filter(|&&l| l).count()
    }

    /// Returns the geometry of a node.
    #[must_use]
    pub fn geometry(&self, id: NodeId) -> &Geometry {
        self.validate(id);
        &self.geometry[id.idx as usize]
    }

    /// Returns the polyline points of a node, if it has any.
    #[must_use]
    pub fn points(&self, id: NodeId) -> Option<&[Point]> {
        match self.geometry(id) {
            Geometry::Polyline(points) => Some(points),
            _ => None,
        }
    }

    /// Returns the stroke of a node.
    #[must_use]
    pub fn stroke(&self, id: NodeId) -> Stroke {
        self.validate(id);
        self.stroke[id.idx as usize]
    }

    /// Returns the fill of a node.
    #[must_use]
    pub fn fill(&self, id: NodeId) -> Option<Rgba> {
        self.validate(id);
        self.fill[id.idx as usize]
    }

    /// Returns the clip rectangle of a node.
    #[must_use]
    pub fn clip(&self, id: NodeId) -> Option<Rect> {
        self.validate(id);
        self.clip[id.idx as usize]
    }

    /// Returns the composite operation of a node.
    #[must_use]
    pub fn composite(&self, id: NodeId) -> CompositeOp {
        self.validate(id);
        self.composite[id.idx as usize]
    }

    /// Returns the local visibility flag of a node.
    #[must_use]
    pub fn is_visible(&self, id: NodeId) -> bool {
        self.validate(id);
        self.visible[id.idx as usize]
    }

    /// Returns the local opacity of a node.
    #[must_use]
    pub fn local_opacity(&self, id: NodeId) -> f32 {
        self.validate(id);
        self.local_opacity[id.idx as usize]
    }

    /// Returns the local transform of a node.
    #[must_use]
    pub fn local_transform(&self, id: NodeId) -> Affine {
        self.validate(id);
        self.local_transform[id.idx as usize]
    }

    /// Returns the computed world transform of a node.
    ///
    /// Only valid after [`evaluate`](Self::evaluate) has been called.
    #[must_use]
    pub fn world_transform(&self, id: NodeId) -> Affine {
        self.validate(id);
        self.world_transform[id.idx as usize]
    }

    /// Returns the computed effective opacity of a node.
    ///
    /// Only valid after [`evaluate`](Self::evaluate) has been called.
    #[must_use]
    pub fn effective_opacity(&self, id: NodeId) -> f32 {
        self.validate(id);
        self.effective_opacity[id.idx as usize]
    }

    /// Returns whether the node is hidden, directly or by an ancestor.
    ///
    /// Only valid after [`evaluate`](Self::evaluate) has been called.
    #[must_use]
    pub fn effective_hidden(&self, id: NodeId) -> bool {
        self.validate(id);
        self.effective_hidden[id.idx as usize]
    }

    /// Whether the node and every ancestor are visible, computed from local
    /// flags without requiring an evaluate pass.
    #[must_use]
    pub fn is_shown(&self, id: NodeId) -> bool {
        self.validate(id);
        self.ancestry(id.idx).all(|idx| self.visible[idx as usize])
    }

    // -- Raw-index accessors for presenters --
    //
    // These accept raw slot indices (as found in `SceneChanges`) and skip
    // generation validation.

    /// Returns the kind at raw slot `idx`.
    ///
    /// # Panics
    ///
    /// Panics if `idx >= self.len`.
    #[must_use]
    pub fn kind_at(&self, idx: u32) -> NodeKind {
        self.check_index(idx);
        self.kind[idx as usize]
    }

    /// Returns the geometry at raw slot `idx`.
    ///
    /// # Panics
    ///
    /// Panics if `idx >= self.len`.
    #[must_use]
    pub fn geometry_at(&self, idx: u32) -> &Geometry {
        self.check_index(idx);
        &self.geometry[idx as usize]
    }

    /// Returns the computed world transform at raw slot `idx`.
    ///
    /// # Panics
    ///
    /// Panics if `idx >= self.len`.
    #[must_use]
    pub fn world_transform_at(&self, idx: u32) -> Affine {
        self.check_index(idx);
        self.world_transform[idx as usize]
    }

    /// Returns the computed effective opacity at raw slot `idx`.
    ///
    /// # Panics
    ///
    /// Panics if `idx >= self.len`.
    #[must_use]
    pub fn effective_opacity_at(&self, idx: u32) -> f32 {
        self.check_index(idx);
        self.effective_opacity[idx as usize]
    }

    /// Returns whether the node at raw slot `idx` is effectively hidden.
    ///
    /// # Panics
    ///
    /// Panics if `idx >= self.len`.
    #[must_use]
    pub fn effective_hidden_at(&self, idx: u32) -> bool {
        self.check_index(idx);
        self.effective_hidden[idx as usize]
    }

    // -- Internal helpers --

    pub(crate) fn handle(&self, idx: u32) -> NodeId {
        NodeId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    /// Panics if the handle is stale.
    fn validate(&self, id: NodeId) {
        assert!(
            self.is_alive(id),
            "stale NodeId: {id:?} (current gen: {})",
            if id.idx < self.len {
                self.generation[id.idx as usize]
            } else {
                u32::MAX
            }
        );
    }

    fn check_index(&self, idx: u32) {
        assert!(
            idx < self.len,
            "slot index {idx} out of range (len {})",
            self.len
        );
    }

    /// Iterates `idx` and its ancestors, nearest first.
    fn ancestry(&self, idx: u32) -> impl Iterator<Item = u32> + '_ {
        core::iter::successors(Some(idx), |&i| {
            let p = self.parent[i as usize];
            (p != INVALID).then_some(p)
        })
    }

    /// Product of local transforms from the root down to `idx`.
    fn compose_world_transform(&self, idx: u32) -> Affine {
        self.ancestry(idx)
            .fold(Affine::IDENTITY, |acc, i| self.local_transform[i as usize] * acc)
    }

    fn alloc_slot(&mut self, kind: NodeKind) -> u32 {
        if let Some(idx) = self.free_list.pop() {
            let i = idx as usize;
            self.generation[i] += 1;
            self.parent[i] = INVALID;
            self.first_child[i] = INVALID;
            self.next_sibling[i] = INVALID;
            self.prev_sibling[i] = INVALID;
            self.kind[i] = kind;
            self.name[i] = None;
            self.local_transform[i] = Affine::IDENTITY;
            self.local_opacity[i] = 1.0;
            self.visible[i] = true;
            self.clip[i] = None;
            self.geometry[i] = Geometry::None;
            self.stroke[i] = Stroke::default();
            self.fill[i] = None;
            self.composite[i] = CompositeOp::SourceOver;
            self.world_transform[i] = Affine::IDENTITY;
            self.effective_opacity[i] = 1.0;
            self.effective_hidden[i] = false;
            self.live[i] = true;
            idx
        } else {
            let idx = self.len;
            self.len += 1;
            self.parent.push(INVALID);
            self.first_child.push(INVALID);
            self.next_sibling.push(INVALID);
            self.prev_sibling.push(INVALID);
            self.kind.push(kind);
            self.name.push(None);
            self.local_transform.push(Affine::IDENTITY);
            self.local_opacity.push(1.0);
            self.visible.push(true);
            self.clip.push(None);
            self.geometry.push(Geometry::None);
            self.stroke.push(Stroke::default());
            self.fill.push(None);
            self.composite.push(CompositeOp::SourceOver);
            self.world_transform.push(Affine::IDENTITY);
            self.effective_opacity.push(1.0);
            self.effective_hidden.push(false);
            self.generation.push(0);
            self.live.push(true);
            idx
        }
    }

    /// Links `c` as the last child of `p`.
    fn link_last(&mut self, p: u32, c: u32) {
        self.parent[c as usize] = p;
        self.prev_sibling[c as usize] = INVALID;
        self.next_sibling[c as usize] = INVALID;

        if self.first_child[p as usize] == INVALID {
            self.first_child[p as usize] = c;
        } else {
            let mut last = self.first_child[p as usize];
            while self.next_sibling[last as usize] != INVALID {
                last = self.next_sibling[last as usize];
            }
            self.next_sibling[last as usize] = c;
            self.prev_sibling[c as usize] = last;
        }
    }

    /// Removes `idx` from its parent's child list without touching dirty state.
    fn unlink_from_parent(&mut self, idx: u32) {
        let p = self.parent[idx as usize];
        let prev = self.prev_sibling[idx as usize];
        let next = self.next_sibling[idx as usize];

        if prev != INVALID {
            self.next_sibling[prev as usize] = next;
        } else {
            self.first_child[p as usize] = next;
        }

        if next != INVALID {
            self.prev_sibling[next as usize] = prev;
        }

        self.parent[idx as usize] = INVALID;
        self.prev_sibling[idx as usize] = INVALID;
        self.next_sibling[idx as usize] = INVALID;
    }

    /// Detaches `c` from its parent and drops its inherited-channel edges.
    fn detach_idx(&mut self, c: u32) {
        let p = self.parent[c as usize];
        if p == INVALID {
            return;
        }
        self.unlink_from_parent(c);
        self.dirty.remove_dependency(c, p, dirty::TRANSFORM);
        self.dirty.remove_dependency(c, p, dirty::OPACITY);
        self.mark_subtree_inherited_dirty(c);
        self.traversal_dirty = true;
        self.dirty.mark(p, dirty::TOPOLOGY);
    }

    /// Collects the subtree rooted at `idx`, children before parents.
    fn collect_post_order(&self, idx: u32, out: &mut Vec<u32>) {
        let mut child = self.first_child[idx as usize];
        while child != INVALID {
            self.collect_post_order(child, out);
            child = self.next_sibling[child as usize];
        }
        out.push(idx);
    }

    /// Marks the subtree rooted at `idx` dirty for inherited channels.
    fn mark_subtree_inherited_dirty(&mut self, idx: u32) {
        self.dirty.mark_with(idx, dirty::TRANSFORM, &EagerPolicy);
        self.dirty.mark_with(idx, dirty::OPACITY, &EagerPolicy);
    }

    fn touch(&mut self, id: NodeId) -> usize {
        self.validate(id);
        self.stats.setter_calls += 1;
        id.idx as usize
    }

    fn set_geometry(&mut self, id: NodeId, geometry: Geometry) {
        let i = self.touch(id);
        self.geometry[i] = geometry;
        self.dirty.mark(id.idx, dirty::GEOMETRY);
    }

    fn hits(&self, idx: u32, point: Point) -> bool {
        let i = idx as usize;
        if self.kind[i] == NodeKind::Group || self.composite[i] == CompositeOp::DestinationOut {
            return false;
        }
        if !self.ancestry(idx).all(|a| self.visible[a as usize]) {
            return false;
        }
        let local = self.compose_world_transform(idx).inverse() * point;
        if self.clip[i].is_some_and(|clip| !clip.contains(local)) {
            return false;
        }
        let half_width = self.stroke[i].width / 2.0;
        match &self.geometry[i] {
            Geometry::None => false,
            Geometry::Polyline(points) => distance_sq_to_polyline(local, points)
                .is_some_and(|d| d <= half_width * half_width),
            Geometry::Rect(rect) if self.fill[i].is_some() => rect.contains(local),
            Geometry::Rect(rect) => {
                rect.inflate(half_width, half_width).contains(local)
                    && !rect.inflate(-half_width, -half_width).contains(local)
            }
            Geometry::Circle(circle) => {
                let reach = circle.radius + if self.fill[i].is_some() { 0.0 } else { half_width };
                (local - circle.center).hypot() <= reach
            }
            Geometry::Image { position, image } => Rect::from_origin_size(
                *position,
                (f64::from(image.width()), f64::from(image.height())),
            )
            .contains(local),
        }
    }

    fn dfs_collect_into(&self, idx: u32, out: &mut Vec<u32>) {
        out.push(idx);
        let mut child = self.first_child[idx as usize];
        while child != INVALID {
            self.dfs_collect_into(child, out);
            child = self.next_sibling[child as usize];
        }
    }
}

impl DrawingSurface for SceneGraph {
    fn create_node(&mut self, kind: NodeKind) -> NodeId {
        let idx = self.alloc_slot(kind);
        self.traversal_dirty = true;
        self.pending_added.push(idx);
        self.dirty.mark(idx, dirty::TOPOLOGY);
        self.stats.nodes_created += 1;
        self.handle(idx)
    }

    fn destroy_node(&mut self, id: NodeId) -> bool {
        if !self.is_alive(id) {
            return false;
        }
        self.detach_idx(id.idx);

        let mut doomed = Vec::new();
        self.collect_post_order(id.idx, &mut doomed);
        for idx in doomed {
            let i = idx as usize;
            let p = self.parent[i];
            if p != INVALID {
                self.unlink_from_parent(idx);
            }
            self.first_child[i] = INVALID;
            self.dirty.remove_key(idx);
            if let Some(name) = self.name[i].take() {
                self.names.remove(&name);
            }
            self.generation[i] += 1;
            self.live[i] = false;
            self.free_list.push(idx);
            self.pending_removed.push(idx);
            self.stats.nodes_destroyed += 1;
        }
        self.traversal_dirty = true;
        true
    }

    fn is_alive(&self, id: NodeId) -> bool {
        id.idx < self.len
            && self.live[id.idx as usize]
            && self.generation[id.idx as usize] == id.generation
    }

    fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.validate(parent);
        self.validate(child);
        let p = parent.idx;
        let c = child.idx;
        assert!(
            !self.ancestry(p).any(|a| a == c),
            "cannot attach a node under itself or its descendant"
        );

        self.detach_idx(c);
        self.link_last(p, c);

        let _ = self.dirty.add_dependency(c, p, dirty::TRANSFORM);
        let _ = self.dirty.add_dependency(c, p, dirty::OPACITY);

        self.mark_subtree_inherited_dirty(c);
        self.traversal_dirty = true;
        self.dirty.mark(p, dirty::TOPOLOGY);
    }

    fn detach(&mut self, id: NodeId) {
        self.validate(id);
        self.detach_idx(id.idx);
    }

    fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.validate(id);
        let p = self.parent[id.idx as usize];
        (p != INVALID).then(|| self.handle(p))
    }

    fn set_child_order(&mut self, parent: NodeId, order: &[NodeId]) {
        self.validate(parent);
        let current: Vec<NodeId> = self.children(parent).collect();
        let tail = current.len().saturating_sub(order.len());
        if current.get(tail..) == Some(order) {
            return;
        }
        self.stats.setter_calls += 1;
        for &child in order {
            self.validate(child);
            if self.parent[child.idx as usize] != parent.idx {
                continue;
            }
            self.unlink_from_parent(child.idx);
            self.link_last(parent.idx, child.idx);
        }
        self.traversal_dirty = true;
        self.dirty.mark(parent.idx, dirty::TOPOLOGY);
    }

    fn set_name(&mut self, id: NodeId, name: &str) {
        let i = self.touch(id);
        if let Some(old) = self.name[i].take() {
            self.names.remove(&old);
        }
        self.names.insert(name.to_owned(), id.idx);
        self.name[i] = Some(name.to_owned());
    }

    fn set_points(&mut self, id: NodeId, points: &[Point]) {
        self.set_geometry(id, Geometry::Polyline(points.to_vec()));
    }

    fn set_rect(&mut self, id: NodeId, rect: Rect) {
        self.set_geometry(id, Geometry::Rect(rect));
    }

    fn set_circle(&mut self, id: NodeId, circle: Circle) {
        self.set_geometry(id, Geometry::Circle(circle));
    }

    fn set_image(&mut self, id: NodeId, position: Point, image: Arc<RgbaImage>) {
        self.set_geometry(id, Geometry::Image { position, image });
    }

    fn set_stroke_width(&mut self, id: NodeId, width: f64) {
        let i = self.touch(id);
        self.stroke[i].width = width;
        self.dirty.mark(id.idx, dirty::STYLE);
    }

    fn set_stroke_color(&mut self, id: NodeId, color: Rgba) {
        let i = self.touch(id);
        self.stroke[i].color = color;
        self.dirty.mark(id.idx, dirty::STYLE);
    }

    fn set_fill(&mut self, id: NodeId, fill: Option<Rgba>) {
        let i = self.touch(id);
        self.fill[i] = fill;
        self.dirty.mark(id.idx, dirty::STYLE);
    }

    fn set_clip(&mut self, id: NodeId, clip: Option<Rect>) {
        let i = self.touch(id);
        self.clip[i] = clip;
        self.dirty.mark(id.idx, dirty::CLIP);
    }

    fn set_composite(&mut self, id: NodeId, op: CompositeOp) {
        let i = self.touch(id);
        self.composite[i] = op;
        self.dirty.mark(id.idx, dirty::STYLE);
    }

    fn set_visible(&mut self, id: NodeId, visible: bool) {
        let i = self.touch(id);
        self.visible[i] = visible;
        self.dirty.mark_with(id.idx, dirty::TRANSFORM, &EagerPolicy);
    }

    fn set_opacity(&mut self, id: NodeId, opacity: f32) {
        let i = self.touch(id);
        self.local_opacity[i] = opacity;
        self.dirty.mark_with(id.idx, dirty::OPACITY, &EagerPolicy);
    }

    fn set_transform(&mut self, id: NodeId, transform: Affine) {
        let i = self.touch(id);
        self.local_transform[i] = transform;
        self.dirty.mark_with(id.idx, dirty::TRANSFORM, &EagerPolicy);
    }

    fn hit_test(&self, point: Point) -> Option<NodeId> {
        let mut order = Vec::new();
        for root in self.roots() {
            self.dfs_collect_into(root.idx, &mut order);
        }
        order
            .into_iter()
            .rev()
            .find(|&idx| self.hits(idx, point))
            .map(|idx| self.handle(idx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_and_destroy() {
        let mut scene = SceneGraph::new();
        let id = scene.create_node(NodeKind::Group);
        assert!(scene.is_alive(id));
        assert!(scene.destroy_node(id));
        assert!(!scene.is_alive(id));
        assert!(!scene.destroy_node(id), "second destroy is a no-op");
    }

    #[test]
    fn generation_prevents_stale_access() {
        let mut scene = SceneGraph::new();
        let id1 = scene.create_node(NodeKind::Line);
        scene.destroy_node(id1);
        let id2 = scene.create_node(NodeKind::Line);
        assert!(!scene.is_alive(id1));
        assert!(scene.is_alive(id2));
        assert_eq!(id1.idx, id2.idx);
        assert_ne!(id1.generation, id2.generation);
    }

    #[test]
    fn destroy_takes_the_subtree() {
        let mut scene = SceneGraph::new();
        let root = scene.create_node(NodeKind::Group);
        let group = scene.create_node(NodeKind::Group);
        let leaf = scene.create_node(NodeKind::Line);
        scene.append_child(root, group);
        scene.append_child(group, leaf);
        scene.set_name(leaf, "leaf");

        scene.destroy_node(group);
        assert!(!scene.is_alive(leaf));
        assert!(scene.children(root).next().is_none());
        assert!(scene.find_by_name("leaf").is_none());
        assert_eq!(scene.stats().live_nodes(), 1);
    }

    #[test]
    fn append_child_reparents() {
        let mut scene = SceneGraph::new();
        let a = scene.create_node(NodeKind::Group);
        let b = scene.create_node(NodeKind::Group);
        let child = scene.create_node(NodeKind::Rect);

        scene.append_child(a, child);
        scene.append_child(b, child);
        assert_eq!(scene.parent(child), Some(b));
        assert!(scene.children(a).next().is_none());
    }

    #[test]
    #[should_panic(expected = "cannot attach a node under itself")]
    fn append_child_rejects_cycles() {
        let mut scene = SceneGraph::new();
        let a = scene.create_node(NodeKind::Group);
        let b = scene.create_node(NodeKind::Group);
        scene.append_child(a, b);
        scene.append_child(b, a);
    }

    #[test]
    #[should_panic(expected = "stale NodeId")]
    fn destroyed_handle_panics_on_setter() {
        let mut scene = SceneGraph::new();
        let id = scene.create_node(NodeKind::Line);
        scene.destroy_node(id);
        scene.set_stroke_width(id, 2.0);
    }

    #[test]
    fn child_order_is_applied_once() {
        let mut scene = SceneGraph::new();
        let parent = scene.create_node(NodeKind::Group);
        let a = scene.create_node(NodeKind::Line);
        let b = scene.create_node(NodeKind::Line);
        let c = scene.create_node(NodeKind::Line);
        for n in [a, b, c] {
            scene.append_child(parent, n);
        }

        scene.set_child_order(parent, &[c, a, b]);
        assert_eq!(scene.children(parent).collect::<Vec<_>>(), vec![c, a, b]);

        let calls = scene.stats().setter_calls;
        scene.set_child_order(parent, &[c, a, b]);
        assert_eq!(scene.stats().setter_calls, calls, "matching order is a no-op");
    }

    #[test]
    fn hit_test_finds_topmost_visible_leaf() {
        let mut scene = SceneGraph::new();
        let root = scene.create_node(NodeKind::Group);
        let bottom = scene.create_node(NodeKind::Rect);
        let top = scene.create_node(NodeKind::Rect);
        scene.append_child(root, bottom);
        scene.append_child(root, top);
        scene.set_rect(bottom, Rect::new(0.0, 0.0, 100.0, 100.0));
        scene.set_rect(top, Rect::new(0.0, 0.0, 10.0, 10.0));
        scene.set_fill(bottom, Some(Rgba::WHITE));
        scene.set_fill(top, Some(Rgba::WHITE));
        scene.set_transform(root, Affine::translate((50.0, 50.0)));

        assert_eq!(scene.hit_test(Point::new(55.0, 55.0)), Some(top));
        assert_eq!(scene.hit_test(Point::new(120.0, 120.0)), Some(bottom));
        assert_eq!(scene.hit_test(Point::new(5.0, 5.0)), None);

        scene.set_visible(top, false);
        assert_eq!(scene.hit_test(Point::new(55.0, 55.0)), Some(bottom));
    }

    #[test]
    fn unfilled_rects_hit_on_their_outline() {
        let mut scene = SceneGraph::new();
        let frame = scene.create_node(NodeKind::Rect);
        scene.set_rect(frame, Rect::new(0.0, 0.0, 100.0, 100.0));
        scene.set_stroke_width(frame, 4.0);
        assert_eq!(scene.hit_test(Point::new(1.0, 50.0)), Some(frame));
        assert_eq!(scene.hit_test(Point::new(101.5, 50.0)), Some(frame));
        assert_eq!(scene.hit_test(Point::new(50.0, 50.0)), None);
    }

    #[test]
    fn hit_test_uses_stroke_width_for_lines() {
        let mut scene = SceneGraph::new();
        let line = scene.create_node(NodeKind::Line);
        scene.set_points(line, &[Point::new(0.0, 0.0), Point::new(100.0, 0.0)]);
        scene.set_stroke_width(line, 10.0);
        assert_eq!(scene.hit_test(Point::new(50.0, 4.0)), Some(line));
        assert_eq!(scene.hit_test(Point::new(50.0, 6.0)), None);

        scene.set_composite(line, CompositeOp::DestinationOut);
        assert_eq!(scene.hit_test(Point::new(50.0, 0.0)), None, "erasers are not targets");
    }

    #[test]
    fn setters_count_calls() {
        let mut scene = SceneGraph::new();
        let id = scene.create_node(NodeKind::Circle);
        scene.set_circle(id, Circle::new((0.0, 0.0), 4.0));
        scene.set_fill(id, Some(Rgba::WHITE));
        scene.set_opacity(id, 0.5);
        assert_eq!(scene.stats().setter_calls, 3);
    }
}
