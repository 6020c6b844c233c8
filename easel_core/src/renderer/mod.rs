// Copyright 2026 the Easel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Object renderers.
//!
//! A renderer owns the nodes for exactly one drawable object: a group node
//! attached under its entity's object group, and one shape node inside it.
//! [`ObjectRenderer::update`] is the only way geometry reaches the surface,
//! and it does nothing unless forced, painting for the first time, or handed
//! a snapshot with a different generation.

mod brush_line;
mod eraser_line;
mod image_object;
mod rect;

use serde::Serialize;

use crate::context::LogContext;
use crate::id::ObjectId;
use crate::scene::{DrawingSurface, NodeId, NodeKind};
use crate::state::{CanvasObject, ObjectKind, Rgba};

pub use brush_line::BrushLineRenderer;
pub use eraser_line::EraserLineRenderer;
pub use image_object::ImageRenderer;
pub use rect::RectRenderer;

/// The group and shape node owned by one renderer.
#[derive(Debug)]
pub(crate) struct RendererNodes {
    pub(crate) group: NodeId,
    pub(crate) shape: NodeId,
    visible: bool,
    destroyed: bool,
}

impl RendererNodes {
    pub(crate) fn new(
        kind: NodeKind,
        parent: NodeId,
        name: &str,
        surface: &mut dyn DrawingSurface,
    ) -> Self {
        let group = surface.create_node(NodeKind::Group);
        let shape = surface.create_node(kind);
        surface.set_name(group, name);
        surface.append_child(group, shape);
        surface.append_child(parent, group);
        Self {
            group,
            shape,
            visible: true,
            destroyed: false,
        }
    }

    fn set_visibility(&mut self, visible: bool, surface: &mut dyn DrawingSurface) {
        if self.destroyed || self.visible == visible {
            return;
        }
        self.visible = visible;
        surface.set_visible(self.group, visible);
    }

    /// Destroys the group and its children. Returns `false` if already
    /// destroyed.
    fn destroy(&mut self, surface: &mut dyn DrawingSurface) -> bool {
        if self.destroyed {
            return false;
        }
        self.destroyed = true;
        surface.destroy_node(self.group);
        true
    }
}

/// Debug snapshot of one renderer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RendererRepr {
    /// Object id.
    pub id: ObjectId,
    /// Object variant.
    pub kind: ObjectKind,
    /// Generation of the cached snapshot.
    pub generation: u64,
    /// Whether the renderer has not painted yet.
    pub is_first_render: bool,
    /// Whether the renderer is visible.
    pub visible: bool,
}

/// One renderer per drawable object.
#[derive(Debug)]
pub enum ObjectRenderer {
    /// Brush stroke.
    BrushLine(BrushLineRenderer),
    /// Eraser stroke.
    EraserLine(EraserLineRenderer),
    /// Rectangle.
    Rect(RectRenderer),
    /// Image.
    Image(ImageRenderer),
}

impl ObjectRenderer {
    /// Builds the renderer and its nodes under `parent`. Nothing is painted
    /// until the first [`update`](Self::update).
    pub fn create(
        object: &CanvasObject,
        parent: NodeId,
        tint: Option<Rgba>,
        log: &LogContext,
        surface: &mut dyn DrawingSurface,
    ) -> Self {
        match object {
            CanvasObject::BrushLine(s) => Self::BrushLine(BrushLineRenderer::new(
                s.clone(),
                parent,
                tint,
                log,
                surface,
            )),
            CanvasObject::EraserLine(s) => {
                Self::EraserLine(EraserLineRenderer::new(s.clone(), parent, log, surface))
            }
            CanvasObject::Rect(s) => {
                Self::Rect(RectRenderer::new(s.clone(), parent, tint, log, surface))
            }
            CanvasObject::Image(s) => {
                Self::Image(ImageRenderer::new(s.clone(), parent, log, surface))
            }
        }
    }

    /// Reconciles the renderer against `object`. Returns whether anything was
    /// repainted.
    ///
    /// An object of a different variant is a caller error; it is logged and
    /// ignored.
    pub fn update(
        &mut self,
        object: &CanvasObject,
        force: bool,
        surface: &mut dyn DrawingSurface,
    ) -> bool {
        match (self, object) {
            (Self::BrushLine(r), CanvasObject::BrushLine(s)) => r.update(s, force, surface),
            (Self::EraserLine(r), CanvasObject::EraserLine(s)) => r.update(s, force, surface),
            (Self::Rect(r), CanvasObject::Rect(s)) => r.update(s, force, surface),
            (Self::Image(r), CanvasObject::Image(s)) => r.update(s, force, surface),
            (this, _) => {
                log::warn!(
                    "renderer {}: refusing {:?} state for a {:?} renderer",
                    object.id(),
                    object.kind(),
                    this.kind()
                );
                false
            }
        }
    }

    /// Shows or hides the renderer without destroying its nodes.
    pub fn set_visibility(&mut self, visible: bool, surface: &mut dyn DrawingSurface) {
        self.nodes_mut().set_visibility(visible, surface);
    }

    /// Overrides the paint colour. Mask entities paint every object in their
    /// fill colour; erasers and images ignore the tint.
    pub fn set_tint(&mut self, tint: Option<Rgba>, surface: &mut dyn DrawingSurface) {
        match self {
            Self::BrushLine(r) => r.set_tint(tint, surface),
            Self::Rect(r) => r.set_tint(tint, surface),
            Self::EraserLine(_) | Self::Image(_) => {}
        }
    }

    /// Destroys the renderer's nodes. Idempotent.
    pub fn destroy(&mut self, surface: &mut dyn DrawingSurface) {
        let id = self.id().clone();
        if self.nodes_mut().destroy(surface) {
            log::trace!("renderer {id}: destroyed");
        }
    }

    /// The object id.
    #[must_use]
    pub fn id(&self) -> &ObjectId {
        match self {
            Self::BrushLine(r) => &r.state().id,
            Self::EraserLine(r) => &r.state().id,
            Self::Rect(r) => &r.state().id,
            Self::Image(r) => &r.state().id,
        }
    }

    /// The object variant this renderer draws.
    #[must_use]
    pub fn kind(&self) -> ObjectKind {
        match self {
            Self::BrushLine(_) => ObjectKind::BrushLine,
            Self::EraserLine(_) => ObjectKind::EraserLine,
            Self::Rect(_) => ObjectKind::Rect,
            Self::Image(_) => ObjectKind::Image,
        }
    }

    /// The renderer's group node.
    #[must_use]
    pub fn group(&self) -> NodeId {
        self.nodes().group
    }

    /// The renderer's shape node.
    #[must_use]
    pub fn shape(&self) -> NodeId {
        self.nodes().shape
    }

    /// Debug snapshot.
    #[must_use]
    pub fn repr(&self) -> RendererRepr {
        let (generation, is_first_render) = match self {
            Self::BrushLine(r) => (r.state().generation(), r.is_first_render()),
            Self::EraserLine(r) => (r.state().generation(), r.is_first_render()),
            Self::Rect(r) => (r.state().generation(), r.is_first_render()),
            Self::Image(r) => (r.state().generation(), r.is_first_render()),
        };
        RendererRepr {
            id: self.id().clone(),
            kind: self.kind(),
            generation: generation.get(),
            is_first_render,
            visible: self.nodes().visible,
        }
    }

    fn nodes(&self) -> &RendererNodes {
        match self {
            Self::BrushLine(r) => &r.nodes,
            Self::EraserLine(r) => &r.nodes,
            Self::Rect(r) => &r.nodes,
            Self::Image(r) => &r.nodes,
        }
    }

    fn nodes_mut(&mut self) -> &mut RendererNodes {
        match self {
            Self::BrushLine(r) => &mut r.nodes,
            Self::EraserLine(r) => &mut r.nodes,
            Self::Rect(r) => &mut r.nodes,
            Self::Image(r) => &mut r.nodes,
        }
    }
}

#[cfg(test)]
mod tests {
    use kurbo::{Point, Rect};

    use super::*;
    use crate::scene::SceneGraph;
    use crate::state::{BrushLine, RectShape};
    use crate::version::Versioned;

    fn brush(points: Vec<Point>) -> CanvasObject {
        CanvasObject::BrushLine(Versioned::new(BrushLine {
            id: ObjectId::new("brush_line:1"),
            points,
            stroke_width: 8.0,
            color: Rgba::BLACK,
            clip: None,
        }))
    }

    #[test]
    fn mismatched_variant_is_ignored() {
        let mut scene = SceneGraph::new();
        let parent = scene.create_node(NodeKind::Group);
        let log = LogContext::root("test", "r");
        let object = brush(vec![Point::ZERO]);
        let mut renderer = ObjectRenderer::create(&object, parent, None, &log, &mut scene);
        renderer.update(&object, true, &mut scene);

        let rect = CanvasObject::Rect(Versioned::new(RectShape {
            id: ObjectId::new("brush_line:1"),
            rect: Rect::new(0.0, 0.0, 1.0, 1.0),
            color: Rgba::WHITE,
        }));
        assert!(!renderer.update(&rect, true, &mut scene));
    }

    #[test]
    fn destroy_is_idempotent() {
        let mut scene = SceneGraph::new();
        let parent = scene.create_node(NodeKind::Group);
        let log = LogContext::root("test", "r");
        let mut renderer =
            ObjectRenderer::create(&brush(vec![Point::ZERO]), parent, None, &log, &mut scene);
        assert_eq!(scene.stats().live_nodes(), 3);

        renderer.destroy(&mut scene);
        renderer.destroy(&mut scene);
        assert_eq!(scene.stats().live_nodes(), 1);
        assert_eq!(scene.stats().nodes_destroyed, 2);
    }

    #[test]
    fn visibility_toggles_group_only() {
        let mut scene = SceneGraph::new();
        let parent = scene.create_node(NodeKind::Group);
        let log = LogContext::root("test", "r");
        let object = brush(vec![Point::ZERO]);
        let mut renderer = ObjectRenderer::create(&object, parent, None, &log, &mut scene);
        renderer.update(&object, true, &mut scene);

        renderer.set_visibility(false, &mut scene);
        assert!(!scene.is_visible(renderer.group()));
        assert!(scene.is_alive(renderer.shape()), "hiding keeps the node tree");
        assert!(!renderer.repr().visible);
    }
}
