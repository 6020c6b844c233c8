// Copyright 2026 the Easel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The stage: the root node and the pan/zoom transform between screen and
//! canvas coordinates.
//!
//! The root transform is `translate(offset) * scale(scale)`, so a canvas
//! point `c` appears on screen at `offset + c * scale`.

use kurbo::{Affine, Point, Rect, Size, Vec2};
use serde::Serialize;

use crate::config::CanvasConfig;
use crate::context::LogContext;
use crate::scene::{DrawingSurface, NodeId, NodeKind};

/// Debug snapshot of the stage.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct StageRepr {
    /// Current zoom.
    pub scale: f64,
    /// Screen position of the canvas origin.
    pub offset: (f64, f64),
    /// Container size in screen pixels.
    pub container: (f64, f64),
}

/// Owns the root node and the view transform.
#[derive(Debug)]
pub struct Stage {
    log: LogContext,
    config: CanvasConfig,
    root: NodeId,
    scale: f64,
    offset: Vec2,
    container: Size,
    destroyed: bool,
}

impl Stage {
    /// Creates the root node.
    pub fn new(config: &CanvasConfig, log: &LogContext, surface: &mut dyn DrawingSurface) -> Self {
        let root = surface.create_node(NodeKind::Group);
        surface.set_name(root, "stage");
        Self {
            log: log.child("stage", "root"),
            config: config.clone(),
            root,
            scale: 1.0,
            offset: Vec2::ZERO,
            container: Size::ZERO,
            destroyed: false,
        }
    }

    /// The root node every other canvas node hangs under.
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Current zoom.
    #[must_use]
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Screen position of the canvas origin.
    #[must_use]
    pub fn offset(&self) -> Vec2 {
        self.offset
    }

    /// Container size in screen pixels.
    #[must_use]
    pub fn container_size(&self) -> Size {
        self.container
    }

    /// The screen-from-canvas transform.
    #[must_use]
    pub fn transform(&self) -> Affine {
        Affine::translate(self.offset) * Affine::scale(self.scale)
    }

    /// Applies the current transform to the root.
    pub fn initialize(&mut self, surface: &mut dyn DrawingSurface) {
        self.apply(surface);
        log::debug!("{}: initialized at scale {}", self.log, self.scale);
    }

    /// Records the container size.
    pub fn set_container_size(&mut self, size: Size) {
        self.container = size;
    }

    /// Sets the zoom about the canvas origin, clamped to the configured range.
    pub fn set_scale(&mut self, scale: f64, surface: &mut dyn DrawingSurface) {
        self.scale = self.config.clamp_scale(scale);
        self.apply(surface);
    }

    /// Zooms to `scale` keeping the canvas point under `screen` fixed.
    pub fn zoom_at(&mut self, screen: Point, scale: f64, surface: &mut dyn DrawingSurface) {
        let anchor = self.screen_to_canvas(screen);
        self.scale = self.config.clamp_scale(scale);
        self.offset = screen.to_vec2() - anchor.to_vec2() * self.scale;
        self.apply(surface);
    }

    /// Moves the view by `delta` screen pixels.
    pub fn pan(&mut self, delta: Vec2, surface: &mut dyn DrawingSurface) {
        self.offset += delta;
        self.apply(surface);
    }

    /// Scales and centres the view so `rect` fits inside the container,
    /// leaving the configured padding on every side.
    pub fn fit_rect(&mut self, rect: Rect, surface: &mut dyn DrawingSurface) {
        if rect.width() <= 0.0 || rect.height() <= 0.0 {
            log::warn!("{}: refusing to fit empty rect {rect:?}", self.log);
            return;
        }
        let pad = self.config.fit_padding * 2.0;
        let avail_w = (self.container.width - pad).max(1.0);
        let avail_h = (self.container.height - pad).max(1.0);
        self.scale = self
            .config
            .clamp_scale((avail_w / rect.width()).min(avail_h / rect.height()));
        let screen_center = Vec2::new(self.container.width / 2.0, self.container.height / 2.0);
        self.offset = screen_center - rect.center().to_vec2() * self.scale;
        self.apply(surface);
    }

    /// Converts a screen point to canvas coordinates.
    #[must_use]
    pub fn screen_to_canvas(&self, screen: Point) -> Point {
        ((screen.to_vec2() - self.offset) / self.scale).to_point()
    }

    /// Converts a canvas point to screen coordinates.
    #[must_use]
    pub fn canvas_to_screen(&self, canvas: Point) -> Point {
        (canvas.to_vec2() * self.scale + self.offset).to_point()
    }

    /// The canvas region currently visible in the container.
    #[must_use]
    pub fn visible_rect(&self) -> Rect {
        Rect::from_points(
            self.screen_to_canvas(Point::ZERO),
            self.screen_to_canvas(self.container.to_vec2().to_point()),
        )
    }

    /// Destroys the root and everything under it. Idempotent.
    pub fn destroy(&mut self, surface: &mut dyn DrawingSurface) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        surface.destroy_node(self.root);
        log::debug!("{}: destroyed", self.log);
    }

    /// Debug snapshot.
    #[must_use]
    pub fn repr(&self) -> StageRepr {
        StageRepr {
            scale: self.scale,
            offset: (self.offset.x, self.offset.y),
            container: (self.container.width, self.container.height),
        }
    }

    fn apply(&self, surface: &mut dyn DrawingSurface) {
        if !self.destroyed {
            surface.set_transform(self.root, self.transform());
        }
    }
}
