// Copyright 2026 the Easel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Eraser-line renderer.

use crate::context::LogContext;
use crate::scene::{CompositeOp, DrawingSurface, NodeId, NodeKind};
use crate::state::{EraserLine, Rgba, renderable_points};
use crate::version::Versioned;

use super::RendererNodes;

/// Draws one [`EraserLine`] as a `DestinationOut` stroke, which clears the
/// entity content beneath it.
#[derive(Debug)]
pub struct EraserLineRenderer {
    log: LogContext,
    pub(super) nodes: RendererNodes,
    state: Versioned<EraserLine>,
    is_first_render: bool,
}

impl EraserLineRenderer {
    /// Creates the renderer's nodes under `parent`.
    pub fn new(
        state: Versioned<EraserLine>,
        parent: NodeId,
        log: &LogContext,
        surface: &mut dyn DrawingSurface,
    ) -> Self {
        let log = log.child("renderer", &state.id);
        let nodes = RendererNodes::new(NodeKind::Line, parent, state.id.as_str(), surface);
        // The stroke colour only matters for debugging; the composite op
        // discards it.
        surface.set_stroke_color(nodes.shape, Rgba::RED);
        surface.set_composite(nodes.shape, CompositeOp::DestinationOut);
        log::trace!("{log}: created");
        Self {
            log,
            nodes,
            state,
            is_first_render: true,
        }
    }

    /// Repaints if forced, never painted, or `state` is a new snapshot.
    pub fn update(
        &mut self,
        state: &Versioned<EraserLine>,
        force: bool,
        surface: &mut dyn DrawingSurface,
    ) -> bool {
        if !force && !self.is_first_render && self.state.is_same(state) {
            return false;
        }
        self.is_first_render = false;

        let points = renderable_points(&state.points);
        surface.set_points(self.nodes.shape, &points);
        surface.set_stroke_width(self.nodes.shape, state.stroke_width);
        surface.set_clip(self.nodes.group, state.clip);
        self.state = state.clone();
        log::trace!("{}: painted {} points", self.log, points.len());
        true
    }

    /// The cached snapshot.
    #[must_use]
    pub fn state(&self) -> &Versioned<EraserLine> {
        &self.state
    }

    /// Whether the renderer has not painted yet.
    #[must_use]
    pub fn is_first_render(&self) -> bool {
        self.is_first_render
    }
}

#[cfg(test)]
mod tests {
    use kurbo::{Point, Rect};

    use super::*;
    use crate::id::ObjectId;
    use crate::scene::SceneGraph;

    fn setup(points: Vec<Point>) -> (SceneGraph, EraserLineRenderer, Versioned<EraserLine>) {
        let mut scene = SceneGraph::new();
        let parent = scene.create_node(NodeKind::Group);
        let state = Versioned::new(EraserLine {
            id: ObjectId::new("eraser_line:a"),
            points,
            stroke_width: 10.0,
            clip: None,
        });
        let log = LogContext::root("test", "eraser");
        let renderer = EraserLineRenderer::new(state.clone(), parent, &log, &mut scene);
        (scene, renderer, state)
    }

    #[test]
    fn single_point_renders_as_duplicated_pair() {
        let origin = Point::new(0.0, 0.0);
        let (mut scene, mut renderer, state) = setup(vec![origin]);
        assert!(renderer.update(&state, true, &mut scene));
        assert_eq!(scene.points(renderer.nodes.shape), Some(&[origin, origin][..]));
    }

    #[test]
    fn duplication_is_reapplied_on_every_update() {
        let (mut scene, mut renderer, state) = setup(vec![Point::ZERO, Point::new(5.0, 5.0)]);
        renderer.update(&state, true, &mut scene);

        let p = Point::new(7.0, 7.0);
        let next = state.map(|s| s.points = vec![p]);
        assert!(renderer.update(&next, false, &mut scene));
        assert_eq!(scene.points(renderer.nodes.shape), Some(&[p, p][..]));
    }

    #[test]
    fn same_snapshot_skips_the_surface() {
        let (mut scene, mut renderer, state) = setup(vec![Point::ZERO]);
        renderer.update(&state, true, &mut scene);
        let calls = scene.stats().setter_calls;

        assert!(!renderer.update(&state, false, &mut scene));
        assert!(!renderer.update(&state.clone(), false, &mut scene));
        assert_eq!(scene.stats().setter_calls, calls, "no setter may run");
    }

    #[test]
    fn first_render_paints_without_force() {
        let (mut scene, mut renderer, state) = setup(vec![Point::ZERO]);
        assert!(renderer.update(&state, false, &mut scene));
        assert!(!renderer.is_first_render());
    }

    #[test]
    fn erases_and_applies_clip() {
        let (mut scene, mut renderer, state) = setup(vec![Point::ZERO]);
        let clip = Rect::new(0.0, 0.0, 4.0, 4.0);
        let clipped = state.map(|s| s.clip = Some(clip));
        renderer.update(&clipped, false, &mut scene);
        assert_eq!(scene.composite(renderer.nodes.shape), CompositeOp::DestinationOut);
        assert_eq!(scene.clip(renderer.nodes.group), Some(clip));
        assert_eq!(scene.stroke(renderer.nodes.shape).width, 10.0);
    }
}
