// Copyright 2026 the Easel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Entity adapters.
//!
//! An [`EntityAdapter`] owns the node subtree of one entity:
//!
//! ```text
//! group (named after the entity, carries position, opacity and visibility)
//! ├── objects group
//! │   ├── renderer group ── shape     (one per drawable object, list order)
//! │   └── ...
//! └── filter preview image            (only while previewing a filter)
//! ```
//!
//! The four entity kinds share this shape. Their differences (filterability,
//! mask tint) are read off [`EntityKind`] and [`EntityState`] rather than
//! expressed through separate types.

use hashbrown::HashMap;
use kurbo::{Affine, Vec2};
use serde::Serialize;

use crate::context::LogContext;
use crate::filter::Filterer;
use crate::id::{EntityIdentifier, EntityKind, ObjectId};
use crate::renderer::{ObjectRenderer, RendererRepr};
use crate::scene::{DrawingSurface, NodeId, NodeKind};
use crate::state::{EntityState, Rgba};
use crate::trace::{FilterPhase, SyncStats};
use crate::version::Versioned;

/// Debug snapshot of one adapter.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AdapterRepr {
    /// The entity.
    pub identifier: EntityIdentifier,
    /// Generation of the cached entity snapshot.
    pub generation: u64,
    /// Whether the entity is visible.
    pub is_enabled: bool,
    /// Whether the entity is locked.
    pub is_locked: bool,
    /// Entity opacity.
    pub opacity: f32,
    /// Renderers in paint order.
    pub renderers: Vec<RendererRepr>,
    /// Filter phase, for filterable kinds.
    pub filter: Option<FilterPhase>,
}

/// Owns the renderers and nodes of one entity.
#[derive(Debug)]
pub struct EntityAdapter {
    identifier: EntityIdentifier,
    log: LogContext,
    group: NodeId,
    objects_group: NodeId,
    state: Versioned<EntityState>,
    renderers: Vec<ObjectRenderer>,
    tint: Option<Rgba>,
    transform_offset: Option<Vec2>,
    filterer: Option<Filterer>,
    is_first_render: bool,
    destroyed: bool,
}

impl EntityAdapter {
    /// Creates the adapter's nodes under `parent`. Nothing is painted until
    /// the first [`update`](Self::update).
    pub fn new(
        state: Versioned<EntityState>,
        parent: NodeId,
        log: &LogContext,
        surface: &mut dyn DrawingSurface,
    ) -> Self {
        let identifier = state.identifier();
        let log = log.child("adapter", &identifier.id);

        let group = surface.create_node(NodeKind::Group);
        surface.set_name(group, identifier.id.as_str());
        let objects_group = surface.create_node(NodeKind::Group);
        surface.append_child(group, objects_group);
        surface.append_child(parent, group);

        let filterer = identifier
            .is_filterable()
            .then(|| Filterer::new(identifier.clone(), group, objects_group, &log));

        log::debug!("{log}: created");
        Self {
            tint: state.fill(),
            identifier,
            log,
            group,
            objects_group,
            state,
            renderers: Vec::new(),
            transform_offset: None,
            filterer,
            is_first_render: true,
            destroyed: false,
        }
    }

    /// Reconciles the adapter against `state`.
    ///
    /// Does nothing unless forced, never painted, or `state` is a new
    /// snapshot. Otherwise applies the entity attributes to the group and
    /// reconciles renderers: objects new to the list get a renderer painted
    /// with `force`, vanished objects lose theirs, and surviving renderers
    /// are updated without `force` so unchanged objects stay untouched. An
    /// object whose id survives with a different variant is recreated.
    pub fn update(
        &mut self,
        state: &Versioned<EntityState>,
        force: bool,
        surface: &mut dyn DrawingSurface,
    ) -> SyncStats {
        let mut stats = SyncStats::default();
        if self.destroyed {
            log::warn!("{}: update after destroy", self.log);
            return stats;
        }
        if !force && !self.is_first_render && self.state.is_same(state) {
            stats.skipped = len_u32(self.renderers.len());
            return stats;
        }
        self.is_first_render = false;

        surface.set_visible(self.group, state.is_enabled);
        surface.set_opacity(self.group, state.opacity);
        self.apply_position(state, surface);

        let tint = state.fill();
        if tint != self.tint {
            self.tint = tint;
            for renderer in &mut self.renderers {
                renderer.set_tint(tint, surface);
            }
        }

        let mut existing: HashMap<ObjectId, ObjectRenderer> = self
            .renderers
            .drain(..)
            .map(|r| (r.id().clone(), r))
            .collect();
        let mut next = Vec::with_capacity(state.objects.len());
        for object in &state.objects {
            match existing.remove(object.id()) {
                Some(mut renderer) if renderer.kind() == object.kind() => {
                    if renderer.update(object, false, surface) {
                        stats.updated += 1;
                    } else {
                        stats.skipped += 1;
                    }
                    next.push(renderer);
                }
                stale => {
                    if let Some(mut renderer) = stale {
                        renderer.destroy(surface);
                        stats.destroyed += 1;
                    }
                    let mut renderer =
                        ObjectRenderer::create(object, self.objects_group, tint, &self.log, surface);
                    renderer.update(object, true, surface);
                    stats.created += 1;
                    next.push(renderer);
                }
            }
        }
        for (_, mut renderer) in existing {
            renderer.destroy(surface);
            stats.destroyed += 1;
        }

        let order: Vec<NodeId> = next.iter().map(ObjectRenderer::group).collect();
        surface.set_child_order(self.objects_group, &order);
        self.renderers = next;
        self.state = state.clone();

        if stats.changed() {
            log::trace!("{}: {stats:?}", self.log);
        }
        stats
    }

    /// Offsets the group from the entity's stored position while a transform
    /// is in progress. `None` snaps back to the stored position.
    pub fn set_transform_offset(&mut self, offset: Option<Vec2>, surface: &mut dyn DrawingSurface) {
        if self.destroyed || self.transform_offset == offset {
            return;
        }
        self.transform_offset = offset;
        let state = self.state.clone();
        self.apply_position(&state, surface);
    }

    /// The in-progress transform offset.
    #[must_use]
    pub fn transform_offset(&self) -> Option<Vec2> {
        self.transform_offset
    }

    /// Destroys every renderer and the adapter's nodes. Idempotent.
    pub fn destroy(&mut self, surface: &mut dyn DrawingSurface) {
        if self.destroyed {
            return;
        }
        if let Some(filterer) = &mut self.filterer {
            filterer.reset(surface);
        }
        for renderer in &mut self.renderers {
            renderer.destroy(surface);
        }
        self.renderers.clear();
        surface.destroy_node(self.group);
        self.destroyed = true;
        log::debug!("{}: destroyed", self.log);
    }

    /// The entity this adapter draws.
    #[must_use]
    pub fn identifier(&self) -> &EntityIdentifier {
        &self.identifier
    }

    /// The entity kind.
    #[must_use]
    pub fn kind(&self) -> EntityKind {
        self.identifier.kind
    }

    /// The last snapshot applied.
    #[must_use]
    pub fn state(&self) -> &Versioned<EntityState> {
        &self.state
    }

    /// The adapter's root node.
    #[must_use]
    pub fn group(&self) -> NodeId {
        self.group
    }

    /// The node holding the renderer groups.
    #[must_use]
    pub fn objects_group(&self) -> NodeId {
        self.objects_group
    }

    /// Renderers in paint order.
    #[must_use]
    pub fn renderers(&self) -> &[ObjectRenderer] {
        &self.renderers
    }

    /// The renderer for `id`.
    #[must_use]
    pub fn renderer(&self, id: &ObjectId) -> Option<&ObjectRenderer> {
        self.renderers.iter().find(|r| r.id() == id)
    }

    /// The filter state machine, for filterable kinds.
    #[must_use]
    pub fn filterer(&self) -> Option<&Filterer> {
        self.filterer.as_ref()
    }

    pub(crate) fn filterer_mut(&mut self) -> Option<&mut Filterer> {
        self.filterer.as_mut()
    }

    /// Whether [`destroy`](Self::destroy) has run.
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Debug snapshot.
    #[must_use]
    pub fn repr(&self) -> AdapterRepr {
        AdapterRepr {
            identifier: self.identifier.clone(),
            generation: self.state.generation().get(),
            is_enabled: self.state.is_enabled,
            is_locked: self.state.is_locked,
            opacity: self.state.opacity,
            renderers: self.renderers.iter().map(ObjectRenderer::repr).collect(),
            filter: self.filterer.as_ref().map(Filterer::phase),
        }
    }

    fn apply_position(&self, state: &EntityState, surface: &mut dyn DrawingSurface) {
        let offset = state.position.to_vec2() + self.transform_offset.unwrap_or_default();
        surface.set_transform(self.group, Affine::translate(offset));
    }
}

fn len_u32(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use kurbo::{Point, Rect};

    use super::*;
    use crate::id::EntityId;
    use crate::scene::SceneGraph;
    use crate::state::{BrushLine, CanvasObject, EraserLine, RectShape};

    fn eraser(id: &str, points: Vec<Point>) -> CanvasObject {
        CanvasObject::EraserLine(Versioned::new(EraserLine {
            id: ObjectId::new(id),
            points,
            stroke_width: 10.0,
            clip: None,
        }))
    }

    fn brush(id: &str) -> CanvasObject {
        CanvasObject::BrushLine(Versioned::new(BrushLine {
            id: ObjectId::new(id),
            points: vec![Point::ZERO, Point::new(5.0, 5.0)],
            stroke_width: 4.0,
            color: Rgba::BLACK,
            clip: None,
        }))
    }

    fn setup(kind: EntityKind) -> (SceneGraph, NodeId, LogContext, Versioned<EntityState>) {
        let mut scene = SceneGraph::new();
        let root = scene.create_node(NodeKind::Group);
        let state = Versioned::new(EntityState::new(kind).with_id(EntityId::new("e")));
        (scene, root, LogContext::root("test", "adapter"), state)
    }

    #[test]
    fn renderer_follows_object_list() {
        let (mut scene, root, log, state) = setup(EntityKind::RasterLayer);
        let mut adapter = EntityAdapter::new(state.clone(), root, &log, &mut scene);
        adapter.update(&state, true, &mut scene);
        assert!(adapter.renderers().is_empty());

        let with_line = state.map(|s| s.objects.push(eraser("eraser_line:a", vec![Point::ZERO])));
        let stats = adapter.update(&with_line, false, &mut scene);
        assert_eq!(stats.created, 1, "exactly one renderer for one object");
        let shape = adapter.renderers()[0].shape();
        assert_eq!(
            scene.points(shape),
            Some(&[Point::ZERO, Point::ZERO][..]),
            "single point is drawn as a zero-length segment"
        );

        let emptied = with_line.map(|s| s.objects.clear());
        let stats = adapter.update(&emptied, false, &mut scene);
        assert_eq!(stats.destroyed, 1);
        assert!(adapter.renderers().is_empty());
        assert!(!scene.is_alive(shape), "renderer nodes are released");
    }

    #[test]
    fn unchanged_snapshot_is_skipped() {
        let (mut scene, root, log, state) = setup(EntityKind::RasterLayer);
        let state = state.map(|s| s.objects.push(brush("brush_line:a")));
        let mut adapter = EntityAdapter::new(state.clone(), root, &log, &mut scene);
        adapter.update(&state, true, &mut scene);

        let before = scene.stats().setter_calls;
        let stats = adapter.update(&state, false, &mut scene);
        assert_eq!(scene.stats().setter_calls, before, "same generation touches nothing");
        assert_eq!(stats.skipped, 1);
    }

    #[test]
    fn surviving_objects_are_not_repainted() {
        let (mut scene, root, log, state) = setup(EntityKind::RasterLayer);
        let state = state.map(|s| s.objects.push(brush("brush_line:a")));
        let mut adapter = EntityAdapter::new(state.clone(), root, &log, &mut scene);
        adapter.update(&state, true, &mut scene);

        let moved = state.map(|s| s.position = Point::new(10.0, 20.0));
        let stats = adapter.update(&moved, false, &mut scene);
        assert_eq!(stats.updated, 0);
        assert_eq!(stats.skipped, 1);
        assert_eq!(
            scene.local_transform(adapter.group()),
            Affine::translate((10.0, 20.0))
        );
    }

    #[test]
    fn variant_change_recreates_renderer() {
        let (mut scene, root, log, state) = setup(EntityKind::RasterLayer);
        let state = state.map(|s| s.objects.push(brush("shared")));
        let mut adapter = EntityAdapter::new(state.clone(), root, &log, &mut scene);
        adapter.update(&state, true, &mut scene);

        let rect = CanvasObject::Rect(Versioned::new(RectShape {
            id: ObjectId::new("shared"),
            rect: Rect::new(0.0, 0.0, 4.0, 4.0),
            color: Rgba::WHITE,
        }));
        let swapped = state.map(|s| s.objects = vec![rect]);
        let stats = adapter.update(&swapped, false, &mut scene);
        assert_eq!((stats.created, stats.destroyed), (1, 1));
        assert_eq!(adapter.renderers()[0].kind(), crate::state::ObjectKind::Rect);
    }

    #[test]
    fn node_order_follows_object_list() {
        let (mut scene, root, log, state) = setup(EntityKind::RasterLayer);
        let state = state.map(|s| {
            s.objects.push(brush("a"));
            s.objects.push(brush("b"));
        });
        let mut adapter = EntityAdapter::new(state.clone(), root, &log, &mut scene);
        adapter.update(&state, true, &mut scene);

        let reversed = state.map(|s| s.objects.reverse());
        adapter.update(&reversed, false, &mut scene);
        let names: Vec<_> = scene
            .children(adapter.objects_group())
            .filter_map(|n| scene.name(n).map(str::to_owned))
            .collect();
        assert_eq!(names, vec!["b".to_owned(), "a".to_owned()]);
    }

    #[test]
    fn mask_fill_tints_renderers() {
        let (mut scene, root, log, state) = setup(EntityKind::InpaintMask);
        let state = state.map(|s| s.objects.push(brush("a")));
        let mut adapter = EntityAdapter::new(state.clone(), root, &log, &mut scene);
        adapter.update(&state, true, &mut scene);
        let shape = adapter.renderers()[0].shape();
        assert_eq!(Some(scene.stroke(shape).color), state.fill());

        let recoloured = state.map(|s| {
            s.data = crate::state::EntityData::InpaintMask { fill: Rgba::WHITE };
        });
        adapter.update(&recoloured, false, &mut scene);
        assert_eq!(scene.stroke(shape).color, Rgba::WHITE);
    }

    #[test]
    fn only_filterable_kinds_get_a_filterer() {
        for kind in EntityKind::ALL {
            let (mut scene, root, log, state) = setup(kind);
            let adapter = EntityAdapter::new(state, root, &log, &mut scene);
            assert_eq!(adapter.filterer().is_some(), kind.is_filterable(), "{kind}");
        }
    }

    #[test]
    fn destroy_releases_everything_once() {
        let (mut scene, root, log, state) = setup(EntityKind::RasterLayer);
        let state = state.map(|s| s.objects.push(brush("a")));
        let mut adapter = EntityAdapter::new(state.clone(), root, &log, &mut scene);
        adapter.update(&state, true, &mut scene);
        assert_eq!(scene.live_count(), 5);

        adapter.destroy(&mut scene);
        adapter.destroy(&mut scene);
        assert_eq!(scene.live_count(), 1, "only the parent remains");
        assert!(adapter.is_destroyed());
        let stats = adapter.update(&state, true, &mut scene);
        assert!(!stats.changed(), "destroyed adapters ignore updates");
    }

    #[test]
    fn transform_offset_moves_group() {
        let (mut scene, root, log, state) = setup(EntityKind::RasterLayer);
        let state = state.map(|s| s.position = Point::new(5.0, 5.0));
        let mut adapter = EntityAdapter::new(state.clone(), root, &log, &mut scene);
        adapter.update(&state, true, &mut scene);

        adapter.set_transform_offset(Some(Vec2::new(1.0, 2.0)), &mut scene);
        assert_eq!(scene.local_transform(adapter.group()), Affine::translate((6.0, 7.0)));
        adapter.set_transform_offset(None, &mut scene);
        assert_eq!(scene.local_transform(adapter.group()), Affine::translate((5.0, 5.0)));
    }
}
