// Copyright 2026 the Easel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! In-progress generation preview.

use std::sync::Arc;

use image::RgbaImage;
use kurbo::Point;
use serde::Serialize;

use crate::context::LogContext;
use crate::scene::{DrawingSurface, NodeId, NodeKind};

/// One intermediate image from a running generation.
#[derive(Clone, Debug)]
pub struct ProgressImage {
    /// The generation session this image belongs to.
    pub session: String,
    /// Pixels.
    pub image: Arc<RgbaImage>,
}

/// Debug snapshot of the progress image.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProgressRepr {
    /// Session of the shown image.
    pub session: Option<String>,
    /// Shown image size.
    pub size: Option<(u32, u32)>,
}

/// Draws the latest progress image over the generation bbox.
#[derive(Debug)]
pub struct ProgressImageModule {
    log: LogContext,
    group: NodeId,
    image_node: NodeId,
    current: Option<ProgressImage>,
    origin: Point,
    destroyed: bool,
}

impl ProgressImageModule {
    /// Creates the progress nodes under `parent`. Starts hidden.
    pub fn new(parent: NodeId, log: &LogContext, surface: &mut dyn DrawingSurface) -> Self {
        let group = surface.create_node(NodeKind::Group);
        surface.set_name(group, "progress_image");
        let image_node = surface.create_node(NodeKind::Image);
        surface.append_child(group, image_node);
        surface.append_child(parent, group);
        surface.set_visible(group, false);
        Self {
            log: log.child("progress", "image"),
            group,
            image_node,
            current: None,
            origin: Point::ZERO,
            destroyed: false,
        }
    }

    /// Shows `progress`, replacing any earlier image.
    pub fn on_progress(&mut self, progress: ProgressImage, surface: &mut dyn DrawingSurface) {
        if self.destroyed {
            return;
        }
        surface.set_image(self.image_node, self.origin, Arc::clone(&progress.image));
        surface.set_visible(self.group, true);
        log::trace!("{}: progress for {}", self.log, progress.session);
        self.current = Some(progress);
    }

    /// Hides the image, e.g. when a session completes or is cancelled.
    pub fn clear(&mut self, surface: &mut dyn DrawingSurface) {
        if self.destroyed || self.current.take().is_none() {
            return;
        }
        surface.set_visible(self.group, false);
    }

    /// Moves the drawn image to `origin`, the bbox's top-left corner.
    pub fn set_origin(&mut self, origin: Point, surface: &mut dyn DrawingSurface) {
        if self.destroyed || self.origin == origin {
            return;
        }
        self.origin = origin;
        if let Some(current) = &self.current {
            surface.set_image(self.image_node, origin, Arc::clone(&current.image));
        }
    }

    /// The shown image.
    #[must_use]
    pub fn current(&self) -> Option<&ProgressImage> {
        self.current.as_ref()
    }

    /// The progress group node.
    #[must_use]
    pub fn group(&self) -> NodeId {
        self.group
    }

    /// Destroys the progress nodes. Idempotent.
    pub fn destroy(&mut self, surface: &mut dyn DrawingSurface) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        self.current = None;
        surface.destroy_node(self.group);
    }

    /// Debug snapshot.
    #[must_use]
    pub fn repr(&self) -> ProgressRepr {
        ProgressRepr {
            session: self.current.as_ref().map(|c| c.session.clone()),
            size: self.current.as_ref().map(|c| c.image.dimensions()),
        }
    }
}
