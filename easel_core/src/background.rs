// Copyright 2026 the Easel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The background grid drawn behind every entity.

use kurbo::{Point, Rect};
use serde::Serialize;

use crate::context::LogContext;
use crate::scene::{DrawingSurface, NodeId, NodeKind};
use crate::state::Rgba;

const MINOR_COLOR: Rgba = Rgba::new(255, 255, 255, 20);
const MAJOR_COLOR: Rgba = Rgba::new(255, 255, 255, 48);
/// Every n-th line is a major line.
const MAJOR_EVERY: i64 = 4;
/// Upper bound on lines per axis.
const MAX_LINES_PER_AXIS: usize = 256;

/// Debug snapshot of the grid.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct BackgroundRepr {
    /// Grid spacing in canvas pixels.
    pub spacing: f64,
    /// Lines currently shown.
    pub lines: usize,
}

/// Grid spacing in canvas pixels for a stage `scale`. Coarser when zoomed
/// out so lines stay between 32 and 64 screen pixels apart where possible.
#[must_use]
pub fn grid_spacing(scale: f64) -> f64 {
    match scale {
        s if s < 0.25 => 256.0,
        s if s < 0.5 => 128.0,
        s if s < 1.0 => 64.0,
        s if s < 2.0 => 32.0,
        s if s < 4.0 => 16.0,
        _ => 8.0,
    }
}

/// Draws a grid covering the visible canvas region.
#[derive(Debug)]
pub struct BackgroundModule {
    log: LogContext,
    group: NodeId,
    lines: Vec<NodeId>,
    shown: usize,
    spacing: f64,
    visible: Rect,
    scale: f64,
    destroyed: bool,
}

impl BackgroundModule {
    /// Creates the grid group under `parent`. Lines appear on the first
    /// [`update`](Self::update).
    pub fn new(parent: NodeId, log: &LogContext, surface: &mut dyn DrawingSurface) -> Self {
        let group = surface.create_node(NodeKind::Group);
        surface.set_name(group, "background");
        surface.append_child(parent, group);
        Self {
            log: log.child("background", "grid"),
            group,
            lines: Vec::new(),
            shown: 0,
            spacing: grid_spacing(1.0),
            visible: Rect::ZERO,
            scale: 1.0,
            destroyed: false,
        }
    }

    /// Redraws the grid over `visible` (canvas coordinates) at stage
    /// `scale`. Line nodes are reused; surplus ones are hidden.
    pub fn update(&mut self, visible: Rect, scale: f64, surface: &mut dyn DrawingSurface) {
        if self.destroyed || scale <= 0.0 || (self.visible == visible && self.scale == scale) {
            return;
        }
        self.visible = visible;
        self.scale = scale;
        self.spacing = grid_spacing(scale);

        let segments = grid_segments(visible, self.spacing);
        while self.lines.len() < segments.len() {
            let line = surface.create_node(NodeKind::Line);
            surface.append_child(self.group, line);
            self.lines.push(line);
        }
        let width = 1.0 / scale;
        for (&node, (segment, major)) in self.lines.iter().zip(&segments) {
            surface.set_points(node, segment);
            surface.set_stroke_width(node, width);
            surface.set_stroke_color(node, if *major { MAJOR_COLOR } else { MINOR_COLOR });
            surface.set_visible(node, true);
        }
        for &node in &self.lines[segments.len()..] {
            surface.set_visible(node, false);
        }
        self.shown = segments.len();
        log::trace!(
            "{}: {} lines at spacing {}",
            self.log,
            self.shown,
            self.spacing
        );
    }

    /// The grid group node.
    #[must_use]
    pub fn group(&self) -> NodeId {
        self.group
    }

    /// Destroys the grid. Idempotent.
    pub fn destroy(&mut self, surface: &mut dyn DrawingSurface) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        self.lines.clear();
        self.shown = 0;
        surface.destroy_node(self.group);
    }

    /// Debug snapshot.
    #[must_use]
    pub fn repr(&self) -> BackgroundRepr {
        BackgroundRepr {
            spacing: self.spacing,
            lines: self.shown,
        }
    }
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "grid indices are bounded by MAX_LINES_PER_AXIS"
)]
fn grid_segments(visible: Rect, spacing: f64) -> Vec<([Point; 2], bool)> {
    let mut out = Vec::new();
    if visible.width() <= 0.0 || visible.height() <= 0.0 {
        return out;
    }
    let axis = |lo: f64, hi: f64| {
        let first = (lo / spacing).floor() as i64;
        let last = (hi / spacing).ceil() as i64;
        (first..=last).take(MAX_LINES_PER_AXIS)
    };
    for i in axis(visible.x0, visible.x1) {
        let x = i as f64 * spacing;
        out.push((
            [Point::new(x, visible.y0), Point::new(x, visible.y1)],
            i % MAJOR_EVERY == 0,
        ));
    }
    for i in axis(visible.y0, visible.y1) {
        let y = i as f64 * spacing;
        out.push((
            [Point::new(visible.x0, y), Point::new(visible.x1, y)],
            i % MAJOR_EVERY == 0,
        ));
    }
    out
}
