// Copyright 2026 the Easel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Brush-line renderer.

use crate::context::LogContext;
use crate::scene::{DrawingSurface, NodeId, NodeKind};
use crate::state::{BrushLine, Rgba, renderable_points};
use crate::version::Versioned;

use super::RendererNodes;

/// Draws one [`BrushLine`].
#[derive(Debug)]
pub struct BrushLineRenderer {
    log: LogContext,
    pub(super) nodes: RendererNodes,
    state: Versioned<BrushLine>,
    tint: Option<Rgba>,
    is_first_render: bool,
}

impl BrushLineRenderer {
    /// Creates the renderer's nodes under `parent`.
    pub fn new(
        state: Versioned<BrushLine>,
        parent: NodeId,
        tint: Option<Rgba>,
        log: &LogContext,
        surface: &mut dyn DrawingSurface,
    ) -> Self {
        let log = log.child("renderer", &state.id);
        let nodes = RendererNodes::new(NodeKind::Line, parent, state.id.as_str(), surface);
        log::trace!("{log}: created");
        Self {
            log,
            nodes,
            state,
            tint,
            is_first_render: true,
        }
    }

    /// Repaints if forced, never painted, or `state` is a new snapshot.
    pub fn update(
        &mut self,
        state: &Versioned<BrushLine>,
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
        surface.set_stroke_color(self.nodes.shape, self.tint.unwrap_or(state.color));
        surface.set_clip(self.nodes.group, state.clip);
        self.state = state.clone();
        log::trace!("{}: painted {} points", self.log, points.len());
        true
    }

    pub(super) fn set_tint(&mut self, tint: Option<Rgba>, surface: &mut dyn DrawingSurface) {
        if self.tint == tint {
            return;
        }
        self.tint = tint;
        if !self.is_first_render {
            surface.set_stroke_color(self.nodes.shape, tint.unwrap_or(self.state.color));
        }
    }

    /// The cached snapshot.
    #[must_use]
    pub fn state(&self) -> &Versioned<BrushLine> {
        &self.state
    }

    /// Whether the renderer has not painted yet.
    #[must_use]
    pub fn is_first_render(&self) -> bool {
        self.is_first_render
    }
}
