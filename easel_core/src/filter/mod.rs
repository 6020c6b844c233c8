// Copyright 2026 the Easel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Filtering: typed filter configs, the per-entity [`Filterer`] and the
//! global filtering cursor.
//!
//! Processing is asynchronous. The manager rasterizes the entity, hands a
//! [`FilterRequest`] to the host's [`ImageProcessor`] together with a fresh
//! [`JobId`], and later receives the outcome through
//! [`CanvasManager::on_filter_result`](crate::manager::CanvasManager::on_filter_result).
//! Only the most recent job of the entity being filtered is accepted.

mod config;
mod filterer;

use core::cell::RefCell;
use core::fmt;
use std::rc::Rc;
use std::sync::Arc;

use flo_binding::{BindRef, Binding, Bound, MutableBound, bind, computed};
use image::RgbaImage;
use kurbo::Point;

use crate::id::EntityIdentifier;

pub use config::{DepthAnythingModelSize, FilterConfig, FilterType};
pub use filterer::{FilterPreview, Filterer};

/// Identifies one submitted processing job.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(pub u64);

/// A processing request handed to the backend.
#[derive(Clone, Debug)]
pub struct FilterRequest {
    /// The entity being filtered.
    pub entity: EntityIdentifier,
    /// Filter and parameters.
    pub config: FilterConfig,
    /// The entity's content, rasterized at its local bounds.
    pub image: Arc<RgbaImage>,
    /// Top-left corner of `image` in entity-local coordinates.
    pub origin: Point,
}

/// The asynchronous image-processing backend.
///
/// `submit` must return promptly. The outcome is delivered later by calling
/// `CanvasManager::on_filter_result` with the same job id.
pub trait ImageProcessor {
    /// Queues `request` under `job`.
    fn submit(&mut self, job: JobId, request: FilterRequest);
}

impl<P: ImageProcessor> ImageProcessor for Rc<RefCell<P>> {
    fn submit(&mut self, job: JobId, request: FilterRequest) {
        self.borrow_mut().submit(job, request);
    }
}

/// A processor that drops every request. Filters started against it stay in
/// the processing phase until cancelled.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullProcessor;

impl ImageProcessor for NullProcessor {
    fn submit(&mut self, job: JobId, request: FilterRequest) {
        log::debug!(
            "null processor: dropping {job:?} ({} for {})",
            request.config.filter_type(),
            request.entity
        );
    }
}

/// Global filtering state shared by all adapters.
pub struct FilterModule {
    filtering_entity: Binding<Option<EntityIdentifier>>,
    is_filtering: BindRef<bool>,
    is_processing: Binding<bool>,
    next_job: u64,
}

impl fmt::Debug for FilterModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterModule")
            .field("filtering_entity", &self.filtering_entity.get())
            .field("is_processing", &self.is_processing.get())
            .field("next_job", &self.next_job)
            .finish_non_exhaustive()
    }
}

impl Default for FilterModule {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterModule {
    /// Creates an idle module.
    #[must_use]
    pub fn new() -> Self {
        let filtering_entity = bind(None::<EntityIdentifier>);
        let entity = filtering_entity.clone();
        let is_filtering = BindRef::from(computed(move || entity.get().is_some()));
        Self {
            filtering_entity,
            is_filtering,
            is_processing: bind(false),
            next_job: 0,
        }
    }

    /// The entity currently being filtered.
    #[must_use]
    pub fn filtering_entity(&self) -> BindRef<Option<EntityIdentifier>> {
        BindRef::from(self.filtering_entity.clone())
    }

    /// Whether any entity is being filtered.
    #[must_use]
    pub fn is_filtering(&self) -> BindRef<bool> {
        self.is_filtering.clone()
    }

    /// Whether a processing job is in flight.
    #[must_use]
    pub fn is_processing(&self) -> BindRef<bool> {
        BindRef::from(self.is_processing.clone())
    }

    /// Whether `entity` is the one being filtered.
    #[must_use]
    pub fn is_filtering_entity(&self, entity: &EntityIdentifier) -> bool {
        self.filtering_entity.get().as_ref() == Some(entity)
    }

    pub(crate) fn begin(&self, entity: EntityIdentifier) {
        self.filtering_entity.set(Some(entity));
    }

    pub(crate) fn set_processing(&self, processing: bool) {
        self.is_processing.set(processing);
    }

    pub(crate) fn next_job(&mut self) -> JobId {
        self.next_job += 1;
        JobId(self.next_job)
    }

    /// Returns to idle.
    pub(crate) fn end(&self) {
        self.is_processing.set(false);
        self.filtering_entity.set(None);
    }

    pub(crate) fn destroy(&self) {
        self.end();
    }
}
