// Copyright 2026 the Easel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Diagnostics hooks for canvas lifecycle events.
//!
//! [`CanvasManager`](crate::manager::CanvasManager) reports adapter and
//! renderer churn, filter transitions and composites to a [`TraceSink`]. All
//! methods default to no-ops, so a sink only overrides the events it cares
//! about. `easel_debug` ships a pretty printer and a recorder.

use core::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;

use crate::id::EntityIdentifier;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// A manager lifecycle step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecyclePhase {
    /// `initialize()` completed.
    Initialized,
    /// `destroy()` completed.
    Destroyed,
}

/// State of one entity's filterer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterPhase {
    /// Not filtering.
    #[default]
    Idle,
    /// Filtering started, no job in flight and no preview.
    Filtering,
    /// A processing job is in flight.
    Processing,
    /// A processed preview is shown.
    Previewing,
}

/// What a composite flattened.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositeTarget {
    /// All raster layers.
    RasterLayers,
    /// All inpaint masks.
    InpaintMasks,
    /// A single entity, for filtering.
    Entity,
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when a manager is initialized or destroyed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LifecycleEvent {
    /// Manager id.
    pub manager: String,
    /// Which step.
    pub phase: LifecyclePhase,
}

/// Renderer churn produced by one adapter update.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SyncStats {
    /// Renderers constructed.
    pub created: u32,
    /// Renderers that repainted.
    pub updated: u32,
    /// Renderers whose state was unchanged.
    pub skipped: u32,
    /// Renderers destroyed.
    pub destroyed: u32,
}

impl SyncStats {
    /// Whether any renderer was created, repainted or destroyed.
    #[must_use]
    pub fn changed(&self) -> bool {
        self.created + self.updated + self.destroyed > 0
    }
}

/// Emitted when an adapter reconciles its renderers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EntitySyncEvent {
    /// The entity.
    pub entity: EntityIdentifier,
    /// Whether the adapter was created by this sync.
    pub adapter_created: bool,
    /// Renderer churn.
    pub stats: SyncStats,
}

/// Emitted when a filterer changes phase.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FilterTransitionEvent {
    /// The entity.
    pub entity: EntityIdentifier,
    /// Previous phase.
    pub from: FilterPhase,
    /// New phase.
    pub to: FilterPhase,
}

/// Emitted after a composite is produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct CompositeEvent {
    /// What was flattened.
    pub target: CompositeTarget,
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Number of entity rasters combined.
    pub entities: u32,
    /// Of those, how many came from the cache.
    pub cache_hits: u32,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives diagnostics events from a canvas manager.
///
/// All methods have default no-op implementations.
pub trait TraceSink {
    /// Called after `initialize()` or `destroy()`.
    fn on_lifecycle(&mut self, e: &LifecycleEvent) {
        _ = e;
    }

    /// Called when an adapter is created or its renderers change.
    fn on_entity_sync(&mut self, e: &EntitySyncEvent) {
        _ = e;
    }

    /// Called when an adapter is destroyed.
    fn on_entity_destroyed(&mut self, entity: &EntityIdentifier) {
        _ = entity;
    }

    /// Called on every filterer phase change.
    fn on_filter_transition(&mut self, e: &FilterTransitionEvent) {
        _ = e;
    }

    /// Called after a composite.
    fn on_composite(&mut self, e: &CompositeEvent) {
        _ = e;
    }
}

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

/// Lets a caller keep a handle on a sink it hands to the manager.
impl<S: TraceSink> TraceSink for Rc<RefCell<S>> {
    fn on_lifecycle(&mut self, e: &LifecycleEvent) {
        self.borrow_mut().on_lifecycle(e);
    }

    fn on_entity_sync(&mut self, e: &EntitySyncEvent) {
        self.borrow_mut().on_entity_sync(e);
    }

    fn on_entity_destroyed(&mut self, entity: &EntityIdentifier) {
        self.borrow_mut().on_entity_destroyed(entity);
    }

    fn on_filter_transition(&mut self, e: &FilterTransitionEvent) {
        self.borrow_mut().on_filter_transition(e);
    }

    fn on_composite(&mut self, e: &CompositeEvent) {
        self.borrow_mut().on_composite(e);
    }
}
