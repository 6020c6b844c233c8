// Copyright 2026 the Easel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Entity and drawable-object state records.
//!
//! These are the shapes held by the external store. The canvas never mutates
//! them; every change arrives as a replacement snapshot (see
//! [`Versioned`](crate::version::Versioned)).

use std::sync::Arc;

use image::RgbaImage;
use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};

use crate::id::{EntityId, EntityIdentifier, EntityKind, ObjectId};
use crate::version::{Generation, Versioned};

/// An 8-bit straight-alpha colour.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgba {
    /// Red.
    pub r: u8,
    /// Green.
    pub g: u8,
    /// Blue.
    pub b: u8,
    /// Alpha.
    pub a: u8,
}

impl Rgba {
    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self::new(0, 0, 0, 0);
    /// Opaque black.
    pub const BLACK: Self = Self::new(0, 0, 0, 255);
    /// Opaque white.
    pub const WHITE: Self = Self::new(255, 255, 255, 255);
    /// Opaque red, the stroke colour of eraser lines.
    pub const RED: Self = Self::new(255, 0, 0, 255);

    /// Creates a colour from components.
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Converts to an `image` pixel.
    #[must_use]
    pub const fn to_pixel(self) -> image::Rgba<u8> {
        image::Rgba([self.r, self.g, self.b, self.a])
    }
}

/// A freehand brush stroke.
#[derive(Clone, Debug, PartialEq)]
pub struct BrushLine {
    /// Object id.
    pub id: ObjectId,
    /// Stroke points in entity-local coordinates.
    pub points: Vec<Point>,
    /// Stroke width in canvas units.
    pub stroke_width: f64,
    /// Stroke colour.
    pub color: Rgba,
    /// Optional clip rectangle in entity-local coordinates.
    pub clip: Option<Rect>,
}

/// A freehand eraser stroke. Erases the content beneath it within its entity.
#[derive(Clone, Debug, PartialEq)]
pub struct EraserLine {
    /// Object id.
    pub id: ObjectId,
    /// Stroke points in entity-local coordinates.
    pub points: Vec<Point>,
    /// Stroke width in canvas units.
    pub stroke_width: f64,
    /// Optional clip rectangle in entity-local coordinates.
    pub clip: Option<Rect>,
}

/// A filled axis-aligned rectangle.
#[derive(Clone, Debug, PartialEq)]
pub struct RectShape {
    /// Object id.
    pub id: ObjectId,
    /// The rectangle in entity-local coordinates.
    pub rect: Rect,
    /// Fill colour.
    pub color: Rgba,
}

/// A raster image placed in the entity.
#[derive(Clone, Debug)]
pub struct ImageObject {
    /// Object id.
    pub id: ObjectId,
    /// Top-left corner in entity-local coordinates.
    pub position: Point,
    /// Pixel data.
    pub image: Arc<RgbaImage>,
}

impl ImageObject {
    /// Bounds of the image in entity-local coordinates.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        Rect::from_origin_size(
            self.position,
            (f64::from(self.image.width()), f64::from(self.image.height())),
        )
    }
}

/// Discriminant of [`CanvasObject`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    /// [`BrushLine`].
    BrushLine,
    /// [`EraserLine`].
    EraserLine,
    /// [`RectShape`].
    Rect,
    /// [`ImageObject`].
    Image,
}

impl ObjectKind {
    /// Prefix used for generated object ids.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::BrushLine => "brush_line",
            Self::EraserLine => "eraser_line",
            Self::Rect => "rect",
            Self::Image => "image",
        }
    }
}

/// One drawable object inside an entity.
#[derive(Clone, Debug, PartialEq)]
pub enum CanvasObject {
    /// A brush stroke.
    BrushLine(Versioned<BrushLine>),
    /// An eraser stroke.
    EraserLine(Versioned<EraserLine>),
    /// A rectangle.
    Rect(Versioned<RectShape>),
    /// An image.
    Image(Versioned<ImageObject>),
}

impl CanvasObject {
    /// Returns the object id.
    #[must_use]
    pub fn id(&self) -> &ObjectId {
        match self {
            Self::BrushLine(s) => &s.id,
            Self::EraserLine(s) => &s.id,
            Self::Rect(s) => &s.id,
            Self::Image(s) => &s.id,
        }
    }

    /// Returns the variant.
    #[must_use]
    pub fn kind(&self) -> ObjectKind {
        match self {
            Self::BrushLine(_) => ObjectKind::BrushLine,
            Self::EraserLine(_) => ObjectKind::EraserLine,
            Self::Rect(_) => ObjectKind::Rect,
            Self::Image(_) => ObjectKind::Image,
        }
    }

    /// Returns the generation of the wrapped snapshot.
    #[must_use]
    pub fn generation(&self) -> Generation {
        match self {
            Self::BrushLine(s) => s.generation(),
            Self::EraserLine(s) => s.generation(),
            Self::Rect(s) => s.generation(),
            Self::Image(s) => s.generation(),
        }
    }

    /// Local-space bounds covered by the object, or `None` when it has no
    /// geometry.
    #[must_use]
    pub fn bounds(&self) -> Option<Rect> {
        match self {
            Self::BrushLine(s) => line_bounds(&s.points, s.stroke_width),
            Self::EraserLine(s) => line_bounds(&s.points, s.stroke_width),
            Self::Rect(s) => (s.rect.area() > 0.0).then_some(s.rect),
            Self::Image(s) => (s.image.width() > 0 && s.image.height() > 0).then(|| s.bounds()),
        }
    }
}

/// Returns the points a line should be drawn with.
///
/// A single point cannot be stroked on its own, so it is duplicated into a
/// zero-length segment that still renders its round cap.
#[must_use]
pub fn renderable_points(points: &[Point]) -> Vec<Point> {
    match points {
        [p] => vec![*p, *p],
        _ => points.to_vec(),
    }
}

fn line_bounds(points: &[Point], stroke_width: f64) -> Option<Rect> {
    let (first, rest) = points.split_first()?;
    let bounds = rest
        .iter()
        .fold(Rect::from_points(*first, *first), |acc, p| acc.union_pt(*p));
    Some(bounds.inflate(stroke_width / 2.0, stroke_width / 2.0))
}

/// The base architecture of a generation model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaseModel {
    /// Stable Diffusion 1.x.
    Sd1,
    /// Stable Diffusion 2.x.
    Sd2,
    /// Stable Diffusion XL.
    Sdxl,
    /// FLUX.
    Flux,
}

/// The control model assigned to a control layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlModelConfig {
    /// Model key in the backend's model registry.
    pub key: String,
    /// Architecture the model targets.
    pub base: BaseModel,
    /// Name of the filter the model was trained against, if declared.
    pub default_preprocessor: Option<String>,
}

/// Kind-specific entity attributes.
#[derive(Clone, Debug, PartialEq)]
pub enum EntityData {
    /// Raster layers carry nothing extra.
    RasterLayer,
    /// Control layer attributes.
    ControlLayer {
        /// Assigned control model, if any.
        model: Option<ControlModelConfig>,
        /// Whether the layer is displayed with its black pixels made
        /// transparent.
        with_transparency_effect: bool,
    },
    /// Regional guidance attributes.
    RegionalGuidance {
        /// Display colour of the mask.
        fill: Rgba,
    },
    /// Inpaint mask attributes.
    InpaintMask {
        /// Display colour of the mask.
        fill: Rgba,
    },
}

impl EntityData {
    /// Default attributes for `kind`.
    #[must_use]
    pub fn default_for(kind: EntityKind) -> Self {
        match kind {
            EntityKind::RasterLayer => Self::RasterLayer,
            EntityKind::ControlLayer => Self::ControlLayer {
                model: None,
                with_transparency_effect: true,
            },
            EntityKind::RegionalGuidance => Self::RegionalGuidance {
                fill: Rgba::new(121, 157, 219, 255),
            },
            EntityKind::InpaintMask => Self::InpaintMask {
                fill: Rgba::new(224, 117, 117, 255),
            },
        }
    }

    /// Returns the entity kind these attributes belong to.
    #[must_use]
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::RasterLayer => EntityKind::RasterLayer,
            Self::ControlLayer { .. } => EntityKind::ControlLayer,
            Self::RegionalGuidance { .. } => EntityKind::RegionalGuidance,
            Self::InpaintMask { .. } => EntityKind::InpaintMask,
        }
    }
}

/// The persisted attributes of one entity.
#[derive(Clone, Debug, PartialEq)]
pub struct EntityState {
    /// Entity id.
    pub id: EntityId,
    /// User-facing name.
    pub name: Option<String>,
    /// Whether the entity is visible.
    pub is_enabled: bool,
    /// Whether the entity refuses edits.
    pub is_locked: bool,
    /// Offset of the entity's local origin in canvas coordinates.
    pub position: Point,
    /// Opacity in `0.0..=1.0`.
    pub opacity: f32,
    /// Drawable objects, back to front.
    pub objects: Vec<CanvasObject>,
    /// Kind-specific attributes.
    pub data: EntityData,
}

impl EntityState {
    /// Creates an empty, visible entity of `kind` with a generated id.
    #[must_use]
    pub fn new(kind: EntityKind) -> Self {
        Self {
            id: EntityId::generate(kind),
            name: None,
            is_enabled: true,
            is_locked: false,
            position: Point::ZERO,
            opacity: 1.0,
            objects: Vec::new(),
            data: EntityData::default_for(kind),
        }
    }

    /// Sets the id.
    #[must_use]
    pub fn with_id(mut self, id: EntityId) -> Self {
        self.id = id;
        self
    }

    /// Appends an object.
    #[must_use]
    pub fn with_object(mut self, object: CanvasObject) -> Self {
        self.objects.push(object);
        self
    }

    /// Returns the entity kind.
    #[must_use]
    pub fn kind(&self) -> EntityKind {
        self.data.kind()
    }

    /// Returns the fully qualified identifier.
    #[must_use]
    pub fn identifier(&self) -> EntityIdentifier {
        EntityIdentifier::new(self.kind(), self.id.clone())
    }

    /// Returns the mask fill colour for mask kinds.
    #[must_use]
    pub fn fill(&self) -> Option<Rgba> {
        match &self.data {
            EntityData::RegionalGuidance { fill } | EntityData::InpaintMask { fill } => Some(*fill),
            _ => None,
        }
    }

    /// Returns the control model for control layers.
    #[must_use]
    pub fn control_model(&self) -> Option<&ControlModelConfig> {
        match &self.data {
            EntityData::ControlLayer { model, .. } => model.as_ref(),
            _ => None,
        }
    }

    /// Returns the object with the given id.
    #[must_use]
    pub fn object(&self, id: &ObjectId) -> Option<&CanvasObject> {
        self.objects.iter().find(|o| o.id() == id)
    }

    /// Union of all object bounds in entity-local coordinates.
    #[must_use]
    pub fn local_bounds(&self) -> Option<Rect> {
        self.objects
            .iter()
            .filter_map(CanvasObject::bounds)
            .reduce(|a, b| a.union(b))
    }

    /// Union of all object bounds in canvas coordinates.
    #[must_use]
    pub fn canvas_bounds(&self) -> Option<Rect> {
        self.local_bounds()
            .map(|r| r + self.position.to_vec2())
    }

    /// Converts a canvas-space point into this entity's local space.
    #[must_use]
    pub fn to_local(&self, canvas: Point) -> Point {
        canvas - self.position.to_vec2()
    }

    /// Converts an entity-local point into canvas space.
    #[must_use]
    pub fn to_canvas(&self, local: Point) -> Point {
        local + self.position.to_vec2()
    }

    /// Moves the entity by `offset`.
    pub fn translate(&mut self, offset: Vec2) {
        self.position += offset;
    }
}

/// The canvas slice of the external store.
#[derive(Clone, Debug, PartialEq)]
pub struct CanvasState {
    /// Raster layers, back to front.
    pub raster_layers: Vec<Versioned<EntityState>>,
    /// Control layers, back to front.
    pub control_layers: Vec<Versioned<EntityState>>,
    /// Regional guidance masks, back to front.
    pub regional_guidance: Vec<Versioned<EntityState>>,
    /// Inpaint masks, back to front.
    pub inpaint_masks: Vec<Versioned<EntityState>>,
    /// The selected entity.
    pub selected_entity: Option<EntityIdentifier>,
    /// The generation bounding box in canvas coordinates.
    pub bbox: Rect,
}

impl Default for CanvasState {
    fn default() -> Self {
        Self {
            raster_layers: Vec::new(),
            control_layers: Vec::new(),
            regional_guidance: Vec::new(),
            inpaint_masks: Vec::new(),
            selected_entity: None,
            bbox: Rect::new(0.0, 0.0, 512.0, 512.0),
        }
    }
}

impl CanvasState {
    /// Entities of one kind, back to front.
    #[must_use]
    pub fn entities(&self, kind: EntityKind) -> &[Versioned<EntityState>] {
        match kind {
            EntityKind::RasterLayer => &self.raster_layers,
            EntityKind::ControlLayer => &self.control_layers,
            EntityKind::RegionalGuidance => &self.regional_guidance,
            EntityKind::InpaintMask => &self.inpaint_masks,
        }
    }

    /// Mutable entity list of one kind.
    pub fn entities_mut(&mut self, kind: EntityKind) -> &mut Vec<Versioned<EntityState>> {
        match kind {
            EntityKind::RasterLayer => &mut self.raster_layers,
            EntityKind::ControlLayer => &mut self.control_layers,
            EntityKind::RegionalGuidance => &mut self.regional_guidance,
            EntityKind::InpaintMask => &mut self.inpaint_masks,
        }
    }

    /// Looks up an entity.
    #[must_use]
    pub fn entity(&self, identifier: &EntityIdentifier) -> Option<&Versioned<EntityState>> {
        self.entities(identifier.kind)
            .iter()
            .find(|e| e.id == identifier.id)
    }

    /// All entities in kind order.
    pub fn all_entities(&self) -> impl Iterator<Item = &Versioned<EntityState>> {
        EntityKind::ALL
            .into_iter()
            .flat_map(|kind| self.entities(kind).iter())
    }

    /// The selected entity's state, if it still exists.
    #[must_use]
    pub fn selected(&self) -> Option<&Versioned<EntityState>> {
        self.selected_entity.as_ref().and_then(|id| self.entity(id))
    }
}

/// Interaction tools.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tool {
    /// Freehand painting.
    #[default]
    Brush,
    /// Freehand erasing.
    Eraser,
    /// Filled rectangles.
    Rect,
    /// Dragging the selected entity.
    Move,
    /// Navigation only.
    View,
}

/// User tool settings held by the external store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CanvasSettings {
    /// Brush stroke width.
    pub brush_width: f64,
    /// Eraser stroke width.
    pub eraser_width: f64,
    /// Paint colour for brush strokes and rectangles.
    pub color: Rgba,
    /// Whether new lines are clipped to the generation bbox.
    pub clip_to_bbox: bool,
}

impl Default for CanvasSettings {
    fn default() -> Self {
        Self {
            brush_width: 50.0,
            eraser_width: 50.0,
            color: Rgba::BLACK,
            clip_to_bbox: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eraser(points: Vec<Point>) -> CanvasObject {
        CanvasObject::EraserLine(Versioned::new(EraserLine {
            id: ObjectId::new("eraser_line:a"),
            points,
            stroke_width: 4.0,
            clip: None,
        }))
    }

    #[test]
    fn single_point_is_duplicated() {
        let p = Point::new(3.0, 4.0);
        assert_eq!(renderable_points(&[p]), vec![p, p]);
        assert!(renderable_points(&[]).is_empty());
        let two = [p, Point::new(5.0, 6.0)];
        assert_eq!(renderable_points(&two), two.to_vec());
    }

    #[test]
    fn line_bounds_include_stroke() {
        let obj = eraser(vec![Point::new(10.0, 10.0)]);
        assert_eq!(obj.bounds(), Some(Rect::new(8.0, 8.0, 12.0, 12.0)));
        assert_eq!(eraser(Vec::new()).bounds(), None);
    }

    #[test]
    fn canvas_bounds_follow_position() {
        let mut entity = EntityState::new(EntityKind::RasterLayer)
            .with_object(eraser(vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0)]));
        entity.position = Point::new(100.0, 50.0);
        assert_eq!(
            entity.canvas_bounds(),
            Some(Rect::new(98.0, 48.0, 112.0, 52.0))
        );
        assert_eq!(entity.to_local(Point::new(101.0, 51.0)), Point::new(1.0, 1.0));
    }

    #[test]
    fn entity_lookup_by_identifier() {
        let entity = Versioned::new(EntityState::new(EntityKind::ControlLayer));
        let identifier = entity.identifier();
        let mut state = CanvasState::default();
        state.control_layers.push(entity.clone());
        assert!(state.entity(&identifier).is_some_and(|e| e.is_same(&entity)));
        let wrong_kind = EntityIdentifier::new(EntityKind::RasterLayer, identifier.id.clone());
        assert!(state.entity(&wrong_kind).is_none());
    }
}
