// Copyright 2026 the Easel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Image renderer.

use std::sync::Arc;

use crate::context::LogContext;
use crate::scene::{DrawingSurface, NodeId, NodeKind};
use crate::state::ImageObject;
use crate::version::Versioned;

use super::RendererNodes;

/// Draws one [`ImageObject`].
#[derive(Debug)]
pub struct ImageRenderer {
    log: LogContext,
    pub(super) nodes: RendererNodes,
    state: Versioned<ImageObject>,
    is_first_render: bool,
}

impl ImageRenderer {
    /// Creates the renderer's nodes under `parent`.
    pub fn new(
        state: Versioned<ImageObject>,
        parent: NodeId,
        log: &LogContext,
        surface: &mut dyn DrawingSurface,
    ) -> Self {
        let log = log.child("renderer", &state.id);
        let nodes = RendererNodes::new(NodeKind::Image, parent, state.id.as_str(), surface);
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
        state: &Versioned<ImageObject>,
        force: bool,
        surface: &mut dyn DrawingSurface,
    ) -> bool {
        if !force && !self.is_first_render && self.state.is_same(state) {
            return false;
        }
        self.is_first_render = false;

        surface.set_image(self.nodes.shape, state.position, Arc::clone(&state.image));
        self.state = state.clone();
        log::trace!(
            "{}: painted {}x{} image",
            self.log,
            state.image.width(),
            state.image.height()
        );
        true
    }

    /// The cached snapshot.
    #[must_use]
    pub fn state(&self) -> &Versioned<ImageObject> {
        &self.state
    }

    /// Whether the renderer has not painted yet.
    #[must_use]
    pub fn is_first_render(&self) -> bool {
        self.is_first_render
    }
}
