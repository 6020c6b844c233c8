// Copyright 2026 the Easel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Rectangle renderer.

use crate::context::LogContext;
use crate::scene::{DrawingSurface, NodeId, NodeKind};
use crate::state::{RectShape, Rgba};
use crate::version::Versioned;

use super::RendererNodes;

/// Draws one filled [`RectShape`].
#[derive(Debug)]
pub struct RectRenderer {
    log: LogContext,
    pub(super) nodes: RendererNodes,
    state: Versioned<RectShape>,
    tint: Option<Rgba>,
    is_first_render: bool,
}

impl RectRenderer {
    /// Creates the renderer's nodes under `parent`.
    pub fn new(
        state: Versioned<RectShape>,
        parent: NodeId,
        tint: Option<Rgba>,
        log: &LogContext,
        surface: &mut dyn DrawingSurface,
    ) -> Self {
        let log = log.child("renderer", &state.id);
        let nodes = RendererNodes::new(NodeKind::Rect, parent, state.id.as_str(), surface);
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
        state: &Versioned<RectShape>,
        force: bool,
        surface: &mut dyn DrawingSurface,
    ) -> bool {
        if !force && !self.is_first_render && self.state.is_same(state) {
            return false;
        }
        self.is_first_render = false;

        surface.set_rect(self.nodes.shape, state.rect);
        surface.set_fill(self.nodes.shape, Some(self.tint.unwrap_or(state.color)));
        self.state = state.clone();
        log::trace!("{}: painted {:?}", self.log, state.rect);
        true
    }

    pub(super) fn set_tint(&mut self, tint: Option<Rgba>, surface: &mut dyn DrawingSurface) {
        if self.tint == tint {
            return;
        }
        self.tint = tint;
        if !self.is_first_render {
            surface.set_fill(self.nodes.shape, Some(tint.unwrap_or(self.state.color)));
        }
    }

    /// The cached snapshot.
    #[must_use]
    pub fn state(&self) -> &Versioned<RectShape> {
        &self.state
    }

    /// Whether the renderer has not painted yet.
    #[must_use]
    pub fn is_first_render(&self) -> bool {
        self.is_first_render
    }
}
