// Copyright 2026 the Easel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Retained drawing surface.
//!
//! Adapters and renderers never paint pixels themselves. They drive a
//! retained node tree through the [`DrawingSurface`] trait: create nodes,
//! attach them, and push attribute changes. [`SceneGraph`] is the bundled
//! implementation; hosts with their own rendering library implement the trait
//! over it instead.
//!
//! A node has:
//!
//! - An identity ([`NodeId`]), a generational handle that becomes stale when
//!   the node is destroyed.
//! - Topology: parent, first-child and sibling links forming an ordered tree.
//!   Later siblings paint over earlier ones.
//! - Local attributes: geometry, stroke, fill, clip, composite operation,
//!   visibility, opacity and transform.
//! - Computed attributes produced by [`SceneGraph::evaluate`]: world
//!   transform, effective opacity and effective hidden state.

mod dirty;
mod evaluate;
mod graph;
mod id;
mod traverse;

use std::sync::Arc;

use core::fmt;

use image::RgbaImage;
use kurbo::{Affine, Circle, Point, Rect};
use serde::Serialize;

use crate::state::Rgba;

pub use evaluate::SceneChanges;
pub use graph::{SceneGraph, SceneStats};
pub use id::{INVALID, NodeId};
pub use traverse::Children;

/// What a node draws.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// A container with no geometry of its own.
    Group,
    /// A stroked polyline.
    Line,
    /// A filled or stroked rectangle.
    Rect,
    /// A filled or stroked circle.
    Circle,
    /// A raster image.
    Image,
}

/// How a node's pixels combine with what is beneath it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositeOp {
    /// Paint over.
    #[default]
    SourceOver,
    /// Clear the destination where the node paints.
    DestinationOut,
}

/// Stroke attributes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Stroke {
    /// Width in local units.
    pub width: f64,
    /// Colour.
    pub color: Rgba,
}

impl Default for Stroke {
    fn default() -> Self {
        Self {
            width: 1.0,
            color: Rgba::BLACK,
        }
    }
}

/// Node geometry in local coordinates.
#[derive(Clone, Default)]
pub enum Geometry {
    /// No geometry (groups, fresh nodes).
    #[default]
    None,
    /// Polyline points, stroked with round caps and joins.
    Polyline(Vec<Point>),
    /// A rectangle.
    Rect(Rect),
    /// A circle.
    Circle(Circle),
    /// An image with its top-left corner at `position`.
    Image {
        /// Top-left corner.
        position: Point,
        /// Pixels.
        image: Arc<RgbaImage>,
    },
}

impl fmt::Debug for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Polyline(points) => f.debug_tuple("Polyline").field(points).finish(),
            Self::Rect(rect) => f.debug_tuple("Rect").field(rect).finish(),
            Self::Circle(circle) => f.debug_tuple("Circle").field(circle).finish(),
            Self::Image { position, image } => f
                .debug_struct("Image")
                .field("position", position)
                .field("size", &image.dimensions())
                .finish(),
        }
    }
}

/// A retained scene-graph API.
///
/// Mutating calls on a stale [`NodeId`] are programming errors and may
/// panic; [`destroy_node`](Self::destroy_node) is the exception and accepts
/// stale ids so that teardown is idempotent.
pub trait DrawingSurface {
    /// Creates a detached node.
    fn create_node(&mut self, kind: NodeKind) -> NodeId;

    /// Destroys a node and its whole subtree. Returns `false` if the node
    /// was already gone.
    fn destroy_node(&mut self, id: NodeId) -> bool;

    /// Whether `id` refers to a live node.
    fn is_alive(&self, id: NodeId) -> bool;

    /// Appends `child` as the topmost child of `parent`, detaching it from
    /// any previous parent.
    fn append_child(&mut self, parent: NodeId, child: NodeId);

    /// Detaches a node from its parent. Detached nodes do not paint.
    fn detach(&mut self, id: NodeId);

    /// Returns the parent of a node.
    fn parent(&self, id: NodeId) -> Option<NodeId>;

    /// Reorders the children of `parent` so that the listed nodes come last,
    /// bottom to top, in the given order. Does nothing if the order already
    /// matches.
    fn set_child_order(&mut self, parent: NodeId, order: &[NodeId]);

    /// Sets a diagnostic name, replacing any previous one.
    fn set_name(&mut self, id: NodeId, name: &str);

    /// Sets polyline points.
    fn set_points(&mut self, id: NodeId, points: &[Point]);

    /// Sets rectangle geometry.
    fn set_rect(&mut self, id: NodeId, rect: Rect);

    /// Sets circle geometry.
    fn set_circle(&mut self, id: NodeId, circle: Circle);

    /// Sets image content.
    fn set_image(&mut self, id: NodeId, position: Point, image: Arc<RgbaImage>);

    /// Sets the stroke width.
    fn set_stroke_width(&mut self, id: NodeId, width: f64);

    /// Sets the stroke colour.
    fn set_stroke_color(&mut self, id: NodeId, color: Rgba);

    /// Sets or clears the fill colour.
    fn set_fill(&mut self, id: NodeId, fill: Option<Rgba>);

    /// Sets or clears the clip rectangle, in local coordinates.
    fn set_clip(&mut self, id: NodeId, clip: Option<Rect>);

    /// Sets the composite operation.
    fn set_composite(&mut self, id: NodeId, op: CompositeOp);

    /// Shows or hides a node and its subtree.
    fn set_visible(&mut self, id: NodeId, visible: bool);

    /// Sets the local opacity.
    fn set_opacity(&mut self, id: NodeId, opacity: f32);

    /// Sets the local transform.
    fn set_transform(&mut self, id: NodeId, transform: Affine);

    /// Returns the topmost visible leaf under `point`, given in the
    /// coordinate space of the tree roots.
    fn hit_test(&self, point: Point) -> Option<NodeId>;
}

/// Applies evaluated scene changes to a host presentation tree.
pub trait Presenter {
    /// Applies `changes`, reading current attribute values from `scene`.
    fn apply(&mut self, scene: &SceneGraph, changes: &SceneChanges);
}
