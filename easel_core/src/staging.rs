// Copyright 2026 the Easel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Staging area: generation results waiting to be accepted or discarded.

use std::sync::Arc;

use core::fmt;

use flo_binding::{BindRef, Binding, MutableBound, bind};
use image::RgbaImage;
use kurbo::Point;
use serde::Serialize;

use crate::context::LogContext;
use crate::scene::{DrawingSurface, NodeId, NodeKind};

/// One staged generation result.
#[derive(Clone, Debug)]
pub struct StagedImage {
    /// Backend image name.
    pub name: String,
    /// Pixels.
    pub image: Arc<RgbaImage>,
}

/// Debug snapshot of the staging area.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StagingRepr {
    /// Names of staged images.
    pub images: Vec<String>,
    /// Index of the selected image.
    pub selected: Option<usize>,
    /// Whether the selection is drawn.
    pub visible: bool,
}

/// Shows the selected staged image over the generation bbox.
pub struct StagingArea {
    log: LogContext,
    group: NodeId,
    image_node: NodeId,
    images: Vec<StagedImage>,
    selected: usize,
    origin: Point,
    visible: bool,
    is_staging: Binding<bool>,
    destroyed: bool,
}

impl fmt::Debug for StagingArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StagingArea")
            .field("log", &self.log)
            .field("group", &self.group)
            .field("images", &self.images.len())
            .field("selected", &self.selected)
            .field("origin", &self.origin)
            .field("visible", &self.visible)
            .field("destroyed", &self.destroyed)
            .finish_non_exhaustive()
    }
}

impl StagingArea {
    /// Creates the staging nodes under `parent`. Starts empty.
    pub fn new(parent: NodeId, log: &LogContext, surface: &mut dyn DrawingSurface) -> Self {
        let group = surface.create_node(NodeKind::Group);
        surface.set_name(group, "staging_area");
        let image_node = surface.create_node(NodeKind::Image);
        surface.append_child(group, image_node);
        surface.append_child(parent, group);
        surface.set_visible(group, false);
        Self {
            log: log.child("staging", "area"),
            group,
            image_node,
            images: Vec::new(),
            selected: 0,
            origin: Point::ZERO,
            visible: true,
            is_staging: bind(false),
            destroyed: false,
        }
    }

    /// Whether any image is staged.
    #[must_use]
    pub fn is_staging(&self) -> BindRef<bool> {
        BindRef::from(self.is_staging.clone())
    }

    /// Replaces the staged images and selects the first.
    pub fn set_images(&mut self, images: Vec<StagedImage>, surface: &mut dyn DrawingSurface) {
        self.images = images;
        self.selected = 0;
        log::debug!("{}: {} staged", self.log, self.images.len());
        self.render(surface);
    }

    /// Selects the next image, wrapping around.
    pub fn select_next(&mut self, surface: &mut dyn DrawingSurface) {
        if self.images.is_empty() {
            return;
        }
        self.selected = (self.selected + 1) % self.images.len();
        self.render(surface);
    }

    /// Selects the previous image, wrapping around.
    pub fn select_prev(&mut self, surface: &mut dyn DrawingSurface) {
        if self.images.is_empty() {
            return;
        }
        self.selected = (self.selected + self.images.len() - 1) % self.images.len();
        self.render(surface);
    }

    /// The selected image.
    #[must_use]
    pub fn selected(&self) -> Option<&StagedImage> {
        self.images.get(self.selected)
    }

    /// Number of staged images.
    #[must_use]
    pub fn len(&self) -> usize {
        self.images.len()
    }

    /// Whether nothing is staged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Removes and returns the selected image. The selection stays at the
    /// same index, clamped to the new end.
    pub fn discard_selected(&mut self, surface: &mut dyn DrawingSurface) -> Option<StagedImage> {
        if self.selected >= self.images.len() {
            return None;
        }
        let discarded = self.images.remove(self.selected);
        self.selected = self.selected.min(self.images.len().saturating_sub(1));
        self.render(surface);
        Some(discarded)
    }

    /// Drops every staged image.
    pub fn clear(&mut self, surface: &mut dyn DrawingSurface) {
        self.images.clear();
        self.selected = 0;
        self.render(surface);
    }

    /// Shows or hides the selection without discarding anything.
    pub fn set_visible(&mut self, visible: bool, surface: &mut dyn DrawingSurface) {
        self.visible = visible;
        self.render(surface);
    }

    /// Moves the drawn image to `origin`, the bbox's top-left corner.
    pub fn set_origin(&mut self, origin: Point, surface: &mut dyn DrawingSurface) {
        if self.origin != origin {
            self.origin = origin;
            self.render(surface);
        }
    }

    /// The staging group node.
    #[must_use]
    pub fn group(&self) -> NodeId {
        self.group
    }

    /// Destroys the staging nodes. Idempotent.
    pub fn destroy(&mut self, surface: &mut dyn DrawingSurface) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        self.images.clear();
        surface.destroy_node(self.group);
        self.is_staging.set(false);
        log::debug!("{}: destroyed", self.log);
    }

    /// Debug snapshot.
    #[must_use]
    pub fn repr(&self) -> StagingRepr {
        StagingRepr {
            images: self.images.iter().map(|i| i.name.clone()).collect(),
            selected: (!self.images.is_empty()).then_some(self.selected),
            visible: self.visible,
        }
    }

    fn render(&self, surface: &mut dyn DrawingSurface) {
        if self.destroyed {
            return;
        }
        self.is_staging.set(!self.images.is_empty());
        match self.selected() {
            Some(staged) if self.visible => {
                surface.set_image(self.image_node, self.origin, Arc::clone(&staged.image));
                surface.set_visible(self.group, true);
            }
            _ => surface.set_visible(self.group, false),
        }
    }
}

#[cfg(test)]
mod tests {
    use flo_binding::Bound;

    use super::*;
    use crate::scene::{Geometry, SceneGraph};

    fn staged(name: &str) -> StagedImage {
        StagedImage {
            name: name.to_owned(),
            image: Arc::new(RgbaImage::new(2, 2)),
        }
    }

    fn area(scene: &mut SceneGraph) -> StagingArea {
        let root = scene.create_node(NodeKind::Group);
        StagingArea::new(root, &LogContext::root("test", "staging"), scene)
    }

    #[test]
    fn selection_wraps() {
        let mut scene = SceneGraph::new();
        let mut area = area(&mut scene);
        area.set_images(vec![staged("a"), staged("b"), staged("c")], &mut scene);
        area.select_prev(&mut scene);
        assert_eq!(area.selected().map(|s| s.name.as_str()), Some("c"));
        area.select_next(&mut scene);
        assert_eq!(area.selected().map(|s| s.name.as_str()), Some("a"));
    }

    #[test]
    fn discard_keeps_index_in_range() {
        let mut scene = SceneGraph::new();
        let mut area = area(&mut scene);
        area.set_images(vec![staged("a"), staged("b")], &mut scene);
        area.select_next(&mut scene);
        assert_eq!(area.discard_selected(&mut scene).map(|s| s.name), Some("b".to_owned()));
        assert_eq!(area.selected().map(|s| s.name.as_str()), Some("a"));
        area.discard_selected(&mut scene);
        assert!(area.is_empty());
        assert!(!area.is_staging().get());
        assert!(!scene.is_visible(area.group()), "empty staging area is hidden");
    }

    #[test]
    fn renders_at_bbox_origin() {
        let mut scene = SceneGraph::new();
        let mut area = area(&mut scene);
        area.set_origin(Point::new(64.0, 32.0), &mut scene);
        area.set_images(vec![staged("a")], &mut scene);
        assert!(area.is_staging().get());
        assert!(scene.is_visible(area.group()));
        let image_node = scene.children(area.group()).next().expect("image node");
        assert!(matches!(
            scene.geometry(image_node),
            Geometry::Image { position, .. } if *position == Point::new(64.0, 32.0)
        ));

        area.set_visible(false, &mut scene);
        assert!(!scene.is_visible(area.group()));
        assert_eq!(area.len(), 1, "hiding keeps the images");
    }
}
