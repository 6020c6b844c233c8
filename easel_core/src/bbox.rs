// Copyright 2026 the Easel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The generation bbox overlay.
//!
//! The bbox is owned by the store; this module only mirrors it onto a rect
//! node and turns pointer drags into [`CanvasAction::BboxChanged`]. The
//! outline keeps a constant on-screen width by dividing by the stage scale.

use kurbo::{Point, Rect, Vec2};
use serde::Serialize;

use crate::context::LogContext;
use crate::scene::{DrawingSurface, NodeId, NodeKind};
use crate::state::Rgba;
use crate::store::CanvasAction;

/// Outline width in screen pixels.
const OUTLINE_WIDTH: f64 = 1.0;
/// Outline colour.
const OUTLINE_COLOR: Rgba = Rgba::new(255, 255, 255, 200);
/// Extra grab distance around the outline, in screen pixels.
const GRAB_SLOP: f64 = 4.0;

/// Debug snapshot of the bbox overlay.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct BboxRepr {
    /// Drawn rect as `(x0, y0, x1, y1)`.
    pub rect: (f64, f64, f64, f64),
    /// Whether a drag is in progress.
    pub dragging: bool,
}

#[derive(Clone, Copy, Debug)]
struct Drag {
    start: Point,
    origin: Rect,
}

/// Draws the generation bbox and lets it be dragged.
#[derive(Debug)]
pub struct BboxModule {
    log: LogContext,
    group: NodeId,
    outline: NodeId,
    rect: Rect,
    grid: f64,
    scale: f64,
    drag: Option<Drag>,
    destroyed: bool,
}

impl BboxModule {
    /// Creates the bbox nodes under `parent`. `grid` is the snap size for
    /// dragged positions; zero or less disables snapping.
    pub fn new(
        parent: NodeId,
        grid: f64,
        log: &LogContext,
        surface: &mut dyn DrawingSurface,
    ) -> Self {
        let group = surface.create_node(NodeKind::Group);
        surface.set_name(group, "bbox");
        let outline = surface.create_node(NodeKind::Rect);
        surface.append_child(group, outline);
        surface.append_child(parent, group);
        surface.set_stroke_color(outline, OUTLINE_COLOR);
        surface.set_stroke_width(outline, OUTLINE_WIDTH);
        surface.set_fill(outline, None);
        Self {
            log: log.child("bbox", "module"),
            group,
            outline,
            rect: Rect::ZERO,
            grid,
            scale: 1.0,
            drag: None,
            destroyed: false,
        }
    }

    /// Mirrors the store's bbox onto the outline.
    pub fn sync(&mut self, rect: Rect, surface: &mut dyn DrawingSurface) {
        if self.destroyed || self.rect == rect {
            return;
        }
        self.rect = rect;
        surface.set_rect(self.outline, rect);
    }

    /// Keeps the outline width constant on screen.
    pub fn set_scale(&mut self, scale: f64, surface: &mut dyn DrawingSurface) {
        if self.destroyed || self.scale == scale || scale <= 0.0 {
            return;
        }
        self.scale = scale;
        surface.set_stroke_width(self.outline, OUTLINE_WIDTH / scale);
    }

    /// Starts a drag if `point` (canvas coordinates) lies on or inside the
    /// bbox. Returns whether a drag started.
    pub fn begin_drag(&mut self, point: Point) -> bool {
        if self.destroyed {
            return false;
        }
        let slop = GRAB_SLOP / self.scale;
        if !self.rect.inflate(slop, slop).contains(point) {
            return false;
        }
        self.drag = Some(Drag {
            start: point,
            origin: self.rect,
        });
        log::trace!("{}: drag started at {point:?}", self.log);
        true
    }

    /// Moves the dragged bbox so the grab point follows `point`. The new
    /// origin is snapped to the grid. `None` when not dragging or nothing
    /// moved.
    pub fn drag_to(&mut self, point: Point) -> Option<CanvasAction> {
        let drag = self.drag?;
        let delta = point - drag.start;
        let origin = self.snap(drag.origin.origin() + delta);
        let rect = Rect::from_origin_size(origin, drag.origin.size());
        if rect == self.rect {
            return None;
        }
        Some(CanvasAction::BboxChanged { rect })
    }

    /// Ends the drag. Returns whether one was in progress.
    pub fn end_drag(&mut self) -> bool {
        self.drag.take().is_some()
    }

    /// Whether a drag is in progress.
    #[must_use]
    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// The drawn rect.
    #[must_use]
    pub fn rect(&self) -> Rect {
        self.rect
    }

    /// The bbox group node.
    #[must_use]
    pub fn group(&self) -> NodeId {
        self.group
    }

    /// Destroys the bbox nodes. Idempotent.
    pub fn destroy(&mut self, surface: &mut dyn DrawingSurface) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        self.drag = None;
        surface.destroy_node(self.group);
    }

    /// Debug snapshot.
    #[must_use]
    pub fn repr(&self) -> BboxRepr {
        BboxRepr {
            rect: (self.rect.x0, self.rect.y0, self.rect.x1, self.rect.y1),
            dragging: self.drag.is_some(),
        }
    }

    fn snap(&self, point: Point) -> Point {
        if self.grid <= 0.0 {
            return point;
        }
        let snapped = Vec2::new(
            (point.x / self.grid).round() * self.grid,
            (point.y / self.grid).round() * self.grid,
        );
        snapped.to_point()
    }
}
