// Copyright 2026 the Easel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-entity filter state machine.
//!
//! ```text
//! Idle --start--> Filtering --process--> Processing --result Ok--> Previewing
//!  ^                  |                      |                         |
//!  +---cancel/apply---+------result Err------+------cancel/apply-------+
//! ```
//!
//! Re-processing from `Previewing` goes back through `Processing` and keeps
//! the old preview until the new result lands.

use std::sync::Arc;

use image::RgbaImage;
use kurbo::Point;

use crate::context::LogContext;
use crate::id::EntityIdentifier;
use crate::scene::{DrawingSurface, NodeId, NodeKind};
use crate::trace::FilterPhase;

use super::{FilterConfig, JobId};

/// A processed preview waiting to be applied.
#[derive(Clone, Debug)]
pub struct FilterPreview {
    /// Processed pixels.
    pub image: Arc<RgbaImage>,
    /// Top-left corner in entity-local coordinates.
    pub origin: Point,
}

/// Filter state for one filterable entity. Owned by its adapter.
#[derive(Debug)]
pub struct Filterer {
    entity: EntityIdentifier,
    log: LogContext,
    group: NodeId,
    objects_group: NodeId,
    phase: FilterPhase,
    config: Option<FilterConfig>,
    job: Option<JobId>,
    job_origin: Point,
    preview: Option<FilterPreview>,
    preview_node: Option<NodeId>,
}

impl Filterer {
    pub(crate) fn new(
        entity: EntityIdentifier,
        group: NodeId,
        objects_group: NodeId,
        log: &LogContext,
    ) -> Self {
        Self {
            log: log.child("filterer", &entity.id),
            entity,
            group,
            objects_group,
            phase: FilterPhase::Idle,
            config: None,
            job: None,
            job_origin: Point::ZERO,
            preview: None,
            preview_node: None,
        }
    }

    /// The entity this filterer belongs to.
    #[must_use]
    pub fn entity(&self) -> &EntityIdentifier {
        &self.entity
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> FilterPhase {
        self.phase
    }

    /// Whether the filterer is anywhere but idle.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.phase != FilterPhase::Idle
    }

    /// The config in use, or the one last used. Canny defaults when the
    /// entity has never been filtered.
    #[must_use]
    pub fn config(&self) -> FilterConfig {
        self.config.clone().unwrap_or_default()
    }

    /// The in-flight job, if any.
    #[must_use]
    pub fn job(&self) -> Option<JobId> {
        self.job
    }

    /// The processed preview, if any.
    #[must_use]
    pub fn preview(&self) -> Option<&FilterPreview> {
        self.preview.as_ref()
    }

    /// The node showing the preview, if any.
    #[must_use]
    pub fn preview_node(&self) -> Option<NodeId> {
        self.preview_node
    }

    pub(crate) fn start(&mut self, config: Option<FilterConfig>) {
        if let Some(config) = config {
            self.config = Some(config);
        }
        self.phase = FilterPhase::Filtering;
        log::debug!("{}: started {}", self.log, self.config().filter_type());
    }

    pub(crate) fn set_config(&mut self, config: FilterConfig) {
        self.config = Some(config);
    }

    /// Records `job` as the one whose result will be previewed. `origin` is
    /// where the submitted raster sits in entity-local space.
    pub(crate) fn begin_processing(&mut self, job: JobId, origin: Point) {
        self.job = Some(job);
        self.job_origin = origin;
        self.phase = FilterPhase::Processing;
        log::debug!("{}: submitted {job:?}", self.log);
    }

    /// Forgets the in-flight job and goes back to waiting for a preview
    /// request.
    pub(crate) fn abandon_job(&mut self) {
        if self.phase == FilterPhase::Processing {
            self.job = None;
            self.phase = FilterPhase::Filtering;
        }
    }

    pub(crate) fn is_current_job(&self, job: JobId) -> bool {
        self.phase == FilterPhase::Processing && self.job == Some(job)
    }

    /// Shows the processed `image` in place of the entity's objects.
    pub(crate) fn show_preview(&mut self, image: Arc<RgbaImage>, surface: &mut dyn DrawingSurface) {
        let preview = FilterPreview {
            image,
            origin: self.job_origin,
        };
        let node = match self.preview_node {
            Some(node) if surface.is_alive(node) => node,
            _ => {
                let node = surface.create_node(NodeKind::Image);
                surface.append_child(self.group, node);
                node
            }
        };
        surface.set_image(node, preview.origin, Arc::clone(&preview.image));
        surface.set_visible(self.objects_group, false);
        self.preview_node = Some(node);
        self.preview = Some(preview);
        self.job = None;
        self.phase = FilterPhase::Previewing;
    }

    /// Drops any preview and job and returns to idle. Returns the phase that
    /// was left.
    pub(crate) fn reset(&mut self, surface: &mut dyn DrawingSurface) -> FilterPhase {
        let from = self.phase;
        if let Some(node) = self.preview_node.take() {
            surface.destroy_node(node);
        }
        if surface.is_alive(self.objects_group) {
            surface.set_visible(self.objects_group, true);
        }
        self.preview = None;
        self.job = None;
        self.phase = FilterPhase::Idle;
        if from != FilterPhase::Idle {
            log::debug!("{}: reset from {from:?}", self.log);
        }
        from
    }
}

#[cfg(test)]
mod tests {
    use image::Rgba as Pixel;

    use super::*;
    use crate::id::{EntityId, EntityKind};
    use crate::scene::SceneGraph;

    fn setup() -> (SceneGraph, Filterer) {
        let mut scene = SceneGraph::new();
        let group = scene.create_node(NodeKind::Group);
        let objects = scene.create_node(NodeKind::Group);
        scene.append_child(group, objects);
        let entity = EntityIdentifier::new(EntityKind::ControlLayer, EntityId::new("c"));
        let filterer = Filterer::new(entity, group, objects, &LogContext::root("test", "f"));
        (scene, filterer)
    }

    #[test]
    fn config_defaults_to_canny_and_is_remembered() {
        let (_, mut filterer) = setup();
        assert_eq!(filterer.config(), FilterConfig::default());
        filterer.start(Some(FilterConfig::Hed { scribble: true }));
        filterer.start(None);
        assert_eq!(filterer.config(), FilterConfig::Hed { scribble: true });
    }

    #[test]
    fn preview_replaces_objects_until_reset() {
        let (mut scene, mut filterer) = setup();
        filterer.start(None);
        filterer.begin_processing(JobId(7), Point::new(3.0, 4.0));
        assert!(filterer.is_current_job(JobId(7)));
        assert!(!filterer.is_current_job(JobId(6)));

        let image = Arc::new(RgbaImage::from_pixel(2, 2, Pixel([1, 2, 3, 255])));
        filterer.show_preview(image, &mut scene);
        assert_eq!(filterer.phase(), FilterPhase::Previewing);
        assert_eq!(filterer.preview().map(|p| p.origin), Some(Point::new(3.0, 4.0)));
        assert!(!scene.is_visible(filterer.objects_group));
        let node = filterer.preview_node().expect("preview node");

        assert_eq!(filterer.reset(&mut scene), FilterPhase::Previewing);
        assert!(!scene.is_alive(node));
        assert!(scene.is_visible(filterer.objects_group));
        assert!(filterer.preview().is_none());
    }

    #[test]
    fn abandoned_job_returns_to_filtering() {
        let (_, mut filterer) = setup();
        filterer.start(None);
        filterer.abandon_job();
        assert_eq!(filterer.phase(), FilterPhase::Filtering, "no job to abandon");

        filterer.begin_processing(JobId(1), Point::ZERO);
        filterer.abandon_job();
        assert_eq!(filterer.phase(), FilterPhase::Filtering);
        assert!(!filterer.is_current_job(JobId(1)));
    }
}
