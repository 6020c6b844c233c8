// Copyright 2026 the Easel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The canvas manager.
//!
//! [`CanvasManager`] owns the drawing surface and every canvas module, and is
//! the only thing that mutates them. Each host interaction follows the same
//! shape: the manager asks a module what should happen, dispatches the
//! resulting actions through the [`StateApi`], then [`sync`](CanvasManager::sync)s
//! the adapters against the new store snapshot.
//!
//! Node layout under the stage root, back to front:
//!
//! ```text
//! stage
//! ├── background      (grid, spacing follows the zoom)
//! ├── entities        (one group per adapter, raster → control → regional → inpaint)
//! ├── staging_area
//! ├── progress_image
//! ├── bbox
//! └── tool_preview
//! ```

use core::fmt;
use std::collections::BTreeMap;
use std::sync::Arc;

use flo_binding::{BindRef, Bound, computed};
use image::RgbaImage;
use kurbo::{Point, Rect, Size, Vec2};
use serde::Serialize;

use crate::adapter::{AdapterRepr, EntityAdapter};
use crate::background::{BackgroundModule, BackgroundRepr};
use crate::bbox::{BboxModule, BboxRepr};
use crate::cache::{CacheKey, CacheModule};
use crate::compositor::{composite_with, rasterize_entity};
use crate::context::{CanvasContext, LogContext, NotificationKind};
use crate::error::{CanvasError, FilterError, ProcessError, ToolError};
use crate::filter::{
    FilterConfig, FilterModule, FilterRequest, FilterType, Filterer, ImageProcessor, JobId,
};
use crate::id::{EntityId, EntityIdentifier, EntityKind, ObjectId, prefixed_id};
use crate::progress::{ProgressImage, ProgressImageModule, ProgressRepr};
use crate::scene::{DrawingSurface, NodeId, NodeKind, Presenter, SceneGraph, SceneStats};
use crate::stage::{Stage, StageRepr};
use crate::staging::{StagedImage, StagingArea, StagingRepr};
use crate::state::{CanvasObject, ControlModelConfig, EntityState, ImageObject, Tool};
use crate::state_api::{StateApi, StateApiRepr};
use crate::store::{CanvasAction, StateStore};
use crate::tool::{PointerEvent, ToolModule, ToolRepr};
use crate::trace::{
    CompositeEvent, CompositeTarget, EntitySyncEvent, FilterPhase, FilterTransitionEvent,
    LifecycleEvent, LifecyclePhase, NoopSink, TraceSink,
};
use crate::version::Versioned;

// ---------------------------------------------------------------------------
// Adapter registry
// ---------------------------------------------------------------------------

/// Live adapters, partitioned by entity kind.
#[derive(Debug, Default)]
pub struct AdapterRegistry {
    raster_layers: BTreeMap<EntityId, EntityAdapter>,
    control_layers: BTreeMap<EntityId, EntityAdapter>,
    regional_guidance: BTreeMap<EntityId, EntityAdapter>,
    inpaint_masks: BTreeMap<EntityId, EntityAdapter>,
}

impl AdapterRegistry {
    fn partition(&self, kind: EntityKind) -> &BTreeMap<EntityId, EntityAdapter> {
        match kind {
            EntityKind::RasterLayer => &self.raster_layers,
            EntityKind::ControlLayer => &self.control_layers,
            EntityKind::RegionalGuidance => &self.regional_guidance,
            EntityKind::InpaintMask => &self.inpaint_masks,
        }
    }

    fn partition_mut(&mut self, kind: EntityKind) -> &mut BTreeMap<EntityId, EntityAdapter> {
        match kind {
            EntityKind::RasterLayer => &mut self.raster_layers,
            EntityKind::ControlLayer => &mut self.control_layers,
            EntityKind::RegionalGuidance => &mut self.regional_guidance,
            EntityKind::InpaintMask => &mut self.inpaint_masks,
        }
    }

    /// Looks up the adapter of `identifier`.
    #[must_use]
    pub fn get(&self, identifier: &EntityIdentifier) -> Option<&EntityAdapter> {
        self.partition(identifier.kind).get(&identifier.id)
    }

    pub(crate) fn get_mut(&mut self, identifier: &EntityIdentifier) -> Option<&mut EntityAdapter> {
        self.partition_mut(identifier.kind).get_mut(&identifier.id)
    }

    /// Every adapter: raster layers, then control layers, regional guidance
    /// and inpaint masks.
    #[must_use]
    pub fn get_all(&self) -> Vec<&EntityAdapter> {
        EntityKind::ALL
            .into_iter()
            .flat_map(|kind| self.partition(kind).values())
            .collect()
    }

    /// Adapters of one kind.
    pub fn of_kind(&self, kind: EntityKind) -> impl Iterator<Item = &EntityAdapter> + '_ {
        self.partition(kind).values()
    }

    /// Number of live adapters.
    #[must_use]
    pub fn len(&self) -> usize {
        EntityKind::ALL
            .into_iter()
            .map(|kind| self.partition(kind).len())
            .sum()
    }

    /// Whether no adapter is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn insert(&mut self, adapter: EntityAdapter) {
        let identifier = adapter.identifier().clone();
        self.partition_mut(identifier.kind)
            .insert(identifier.id, adapter);
    }

    fn remove(&mut self, identifier: &EntityIdentifier) -> Option<EntityAdapter> {
        self.partition_mut(identifier.kind).remove(&identifier.id)
    }

    fn identifiers(&self) -> Vec<EntityIdentifier> {
        self.get_all()
            .into_iter()
            .map(|a| a.identifier().clone())
            .collect()
    }

    fn drain(&mut self) -> Vec<EntityAdapter> {
        EntityKind::ALL
            .into_iter()
            .flat_map(|kind| core::mem::take(self.partition_mut(kind)).into_values())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Debug snapshot
// ---------------------------------------------------------------------------

/// Serializable snapshot of a whole manager.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ManagerRepr {
    /// Manager id.
    pub id: String,
    /// Whether [`CanvasManager::initialize`] has run.
    pub initialized: bool,
    /// Whether [`CanvasManager::destroy`] has run.
    pub destroyed: bool,
    /// Current busy flag.
    pub is_busy: bool,
    /// Entity being filtered.
    pub filtering_entity: Option<EntityIdentifier>,
    /// Adapters in registry order.
    pub adapters: Vec<AdapterRepr>,
    /// State API cursors.
    pub state_api: StateApiRepr,
    /// View transform.
    pub stage: StageRepr,
    /// Tool state.
    pub tool: ToolRepr,
    /// Staged images.
    pub staging: StagingRepr,
    /// Progress image.
    pub progress: ProgressRepr,
    /// Bbox overlay.
    pub bbox: BboxRepr,
    /// Background grid.
    pub background: BackgroundRepr,
    /// Raster cache occupancy.
    pub cached_rasters: usize,
}

// ---------------------------------------------------------------------------
// CanvasManager
// ---------------------------------------------------------------------------

/// Owns every canvas module for one editor session.
pub struct CanvasManager<S, D> {
    id: String,
    ctx: CanvasContext,
    log: LogContext,
    surface: D,
    state_api: StateApi<S>,
    stage: Stage,
    entities_group: NodeId,
    adapters: AdapterRegistry,
    filter: FilterModule,
    processor: Box<dyn ImageProcessor>,
    cache: CacheModule,
    tool: ToolModule,
    staging: StagingArea,
    progress: ProgressImageModule,
    bbox: BboxModule,
    background: BackgroundModule,
    trace: Box<dyn TraceSink>,
    is_busy: BindRef<bool>,
    initialized: bool,
    destroyed: bool,
    debugging: bool,
}

impl<S, D> fmt::Debug for CanvasManager<S, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CanvasManager")
            .field("id", &self.id)
            .field("adapters", &self.adapters.len())
            .field("initialized", &self.initialized)
            .field("destroyed", &self.destroyed)
            .finish_non_exhaustive()
    }
}

impl<S: StateStore, D: DrawingSurface> CanvasManager<S, D> {
    /// Builds every module on `surface`. Nothing reads the store until
    /// [`initialize`](Self::initialize).
    pub fn new(
        ctx: CanvasContext,
        store: S,
        mut surface: D,
        processor: impl ImageProcessor + 'static,
    ) -> Self {
        let id = prefixed_id("manager");
        let log = LogContext::root("canvas", &id);
        let config = ctx.config().clone();

        let stage = Stage::new(&config, &log, &mut surface);
        let background = BackgroundModule::new(stage.root(), &log, &mut surface);
        let entities_group = surface.create_node(NodeKind::Group);
        surface.set_name(entities_group, "entities");
        surface.append_child(stage.root(), entities_group);
        let staging = StagingArea::new(stage.root(), &log, &mut surface);
        let progress = ProgressImageModule::new(stage.root(), &log, &mut surface);
        let bbox = BboxModule::new(stage.root(), config.bbox_grid, &log, &mut surface);
        let tool = ToolModule::new(stage.root(), &log, &mut surface);

        let state_api = StateApi::new(store, &log);
        let filter = FilterModule::new();
        let is_busy = busy_binding(filter.is_filtering(), state_api.is_transforming());

        log::debug!("{log}: created");
        Self {
            id,
            ctx,
            log,
            surface,
            state_api,
            stage,
            entities_group,
            adapters: AdapterRegistry::default(),
            filter,
            processor: Box::new(processor),
            cache: CacheModule::new(config.cache_capacity),
            tool,
            staging,
            progress,
            bbox,
            background,
            trace: Box::new(NoopSink),
            is_busy,
            initialized: false,
            destroyed: false,
            debugging: false,
        }
    }

    /// Manager id, as published through [`CanvasContext::active_manager`].
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Populates the state API, applies the view transform, creates an
    /// adapter for every entity and publishes this manager as the active
    /// one. A second call only logs a warning.
    pub fn initialize(&mut self) {
        if self.destroyed {
            log::warn!("{}: initialize after destroy", self.log);
            return;
        }
        if self.initialized {
            log::warn!("{}: already initialized", self.log);
            return;
        }
        self.initialized = true;
        self.state_api.initialize();
        self.stage.initialize(&mut self.surface);
        self.sync();
        self.view_changed();
        self.ctx.set_active_manager(Some(self.id.clone()));
        self.trace.on_lifecycle(&LifecycleEvent {
            manager: self.id.clone(),
            phase: LifecyclePhase::Initialized,
        });
        log::debug!("{}: initialized", self.log);
    }

    /// Tears everything down: adapters first, then the overlay modules, the
    /// state API, the filter and finally the stage. Results that arrive
    /// afterwards are dropped. Idempotent.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        log::debug!("{}: destroying", self.log);
        for mut adapter in self.adapters.drain() {
            adapter.destroy(&mut self.surface);
            self.trace.on_entity_destroyed(adapter.identifier());
        }
        self.staging.destroy(&mut self.surface);
        self.progress.destroy(&mut self.surface);
        self.bbox.destroy(&mut self.surface);
        self.tool.destroy(&mut self.surface);
        self.background.destroy(&mut self.surface);
        self.state_api.destroy();
        self.filter.destroy();
        self.cache.clear();
        self.stage.destroy(&mut self.surface);
        self.destroyed = true;

        if self.ctx.active_manager().get().as_deref() == Some(self.id.as_str()) {
            self.ctx.set_active_manager(None);
        }
        self.ctx.mark_dead();
        self.trace.on_lifecycle(&LifecycleEvent {
            manager: self.id.clone(),
            phase: LifecyclePhase::Destroyed,
        });
    }

    /// Whether [`destroy`](Self::destroy) has run.
    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    // -- Entity renderer --

    /// Reconciles the adapter registry against the store.
    ///
    /// Adapters of vanished entities are destroyed, new entities get an
    /// adapter painted with `force`, and every other adapter is updated
    /// without `force`, which is a no-op for unchanged snapshots. Afterwards
    /// the adapter groups are reordered to match the store lists.
    pub fn sync(&mut self) {
        if self.destroyed {
            return;
        }
        let state = self.state_api.canvas_state();
        self.state_api.refresh(&state);

        for identifier in self.adapters.identifiers() {
            if state.entity(&identifier).is_none() {
                self.remove_adapter(&identifier);
            }
        }

        for entity in state.all_entities() {
            let identifier = entity.identifier();
            let (adapter_created, stats) = match self.adapters.get_mut(&identifier) {
                Some(adapter) => (false, adapter.update(entity, false, &mut self.surface)),
                None => {
                    let mut adapter = EntityAdapter::new(
                        entity.clone(),
                        self.entities_group,
                        &self.log,
                        &mut self.surface,
                    );
                    let stats = adapter.update(entity, true, &mut self.surface);
                    self.adapters.insert(adapter);
                    (true, stats)
                }
            };
            if adapter_created || stats.changed() {
                self.trace.on_entity_sync(&EntitySyncEvent {
                    entity: identifier,
                    adapter_created,
                    stats,
                });
            }
        }

        let order: Vec<NodeId> = state
            .all_entities()
            .filter_map(|e| self.adapters.get(&e.identifier()).map(EntityAdapter::group))
            .collect();
        self.surface.set_child_order(self.entities_group, &order);

        self.bbox.sync(state.bbox, &mut self.surface);
        let origin = state.bbox.origin();
        self.staging.set_origin(origin, &mut self.surface);
        self.progress.set_origin(origin, &mut self.surface);
    }

    fn remove_adapter(&mut self, identifier: &EntityIdentifier) {
        let Some(mut adapter) = self.adapters.remove(identifier) else {
            return;
        };
        let phase = adapter.filterer().map_or(FilterPhase::Idle, Filterer::phase);
        adapter.destroy(&mut self.surface);
        self.cache.invalidate_entity(&identifier.id);
        if self.filter.is_filtering_entity(identifier) {
            self.filter.end();
            self.trace_filter(identifier, phase, FilterPhase::Idle);
        }
        if self.state_api.transforming_entity().get().as_ref() == Some(identifier) {
            self.state_api.set_transforming(None);
        }
        self.trace.on_entity_destroyed(identifier);
    }

    /// Forwards `action` to the store and syncs.
    pub fn dispatch(&mut self, action: CanvasAction) {
        if self.destroyed {
            return;
        }
        self.state_api.dispatch(action);
        self.sync();
    }

    /// Removes an entity from the store. Refused while busy; an unknown
    /// identifier is a no-op.
    pub fn delete_entity(&mut self, identifier: &EntityIdentifier) -> Result<(), CanvasError> {
        self.ensure_live()?;
        if self.is_busy.get() {
            return Err(CanvasError::Busy);
        }
        if self.state_api.entity(identifier).is_none() {
            log::debug!("{}: delete of unknown {identifier} ignored", self.log);
            return Ok(());
        }
        self.dispatch(CanvasAction::EntityRemoved {
            entity: identifier.clone(),
        });
        Ok(())
    }

    /// The adapter of `identifier`.
    #[must_use]
    pub fn get_adapter(&self, identifier: &EntityIdentifier) -> Option<&EntityAdapter> {
        self.adapters.get(identifier)
    }

    /// All live adapters.
    #[must_use]
    pub fn adapters(&self) -> &AdapterRegistry {
        &self.adapters
    }

    /// The entity drawn at `screen`, if any.
    #[must_use]
    pub fn entity_at(&self, screen: Point) -> Option<EntityIdentifier> {
        let adapters = self.adapters.get_all();
        let mut node = self.surface.hit_test(screen)?;
        loop {
            if let Some(adapter) = adapters.iter().find(|a| a.group() == node) {
                return Some(adapter.identifier().clone());
            }
            node = self.surface.parent(node)?;
        }
    }

    // -- Derived state --

    /// `true` while an entity is being filtered or transformed.
    #[must_use]
    pub fn is_busy(&self) -> BindRef<bool> {
        self.is_busy.clone()
    }

    /// The state API.
    #[must_use]
    pub fn state_api(&self) -> &StateApi<S> {
        &self.state_api
    }

    /// The filter module.
    #[must_use]
    pub fn filter(&self) -> &FilterModule {
        &self.filter
    }

    /// The raster cache.
    #[must_use]
    pub fn cache(&self) -> &CacheModule {
        &self.cache
    }

    // -- Tool --

    /// Handles a pointer event given in screen coordinates, dispatching
    /// whatever the active tool produces.
    pub fn handle_pointer(&mut self, event: PointerEvent) -> Result<(), ToolError> {
        if self.destroyed {
            return Err(ToolError::Destroyed);
        }
        let to_canvas = |p: Point| self.stage.screen_to_canvas(p);
        let event = match event {
            PointerEvent::Down(p) => PointerEvent::Down(to_canvas(p)),
            PointerEvent::Move(p) => PointerEvent::Move(to_canvas(p)),
            PointerEvent::Up(p) => PointerEvent::Up(to_canvas(p)),
            PointerEvent::Leave => PointerEvent::Leave,
        };
        let state = self.state_api.canvas_state();
        let settings = self.state_api.settings();
        let actions = self.tool.handle_pointer(
            event,
            &state,
            &settings,
            self.is_busy.get(),
            &mut self.surface,
        )?;
        if actions.is_empty() {
            return Ok(());
        }
        for action in actions {
            self.state_api.dispatch(action);
        }
        self.sync();
        Ok(())
    }

    /// Switches the active tool.
    pub fn set_tool(&mut self, tool: Tool) {
        self.tool.set_tool(tool, &mut self.surface);
    }

    /// The active tool.
    #[must_use]
    pub fn tool(&self) -> BindRef<Tool> {
        self.tool.tool()
    }

    // -- Stage --

    /// The stage.
    #[must_use]
    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    /// Records the host container size.
    pub fn set_container_size(&mut self, size: Size) {
        self.stage.set_container_size(size);
        self.view_changed();
    }

    /// Zooms to `scale` about the screen point `screen`.
    pub fn zoom_at(&mut self, screen: Point, scale: f64) {
        self.stage.zoom_at(screen, scale, &mut self.surface);
        self.view_changed();
    }

    /// Pans by `delta` screen pixels.
    pub fn pan(&mut self, delta: Vec2) {
        self.stage.pan(delta, &mut self.surface);
        self.view_changed();
    }

    /// Fits the generation bbox into the container.
    pub fn fit_bbox(&mut self) {
        let bbox = self.state_api.canvas_state().bbox;
        self.stage.fit_rect(bbox, &mut self.surface);
        self.view_changed();
    }

    fn view_changed(&mut self) {
        if self.destroyed || !self.initialized {
            return;
        }
        let scale = self.stage.scale();
        self.background
            .update(self.stage.visible_rect(), scale, &mut self.surface);
        self.bbox.set_scale(scale, &mut self.surface);
    }

    // -- Bbox --

    /// The bbox overlay.
    #[must_use]
    pub fn bbox(&self) -> &BboxModule {
        &self.bbox
    }

    /// The background grid.
    #[must_use]
    pub fn background(&self) -> &BackgroundModule {
        &self.background
    }

    /// Starts dragging the bbox if `screen` lies on it. Refused while busy.
    /// Returns whether a drag started.
    pub fn begin_bbox_drag(&mut self, screen: Point) -> Result<bool, CanvasError> {
        self.ensure_live()?;
        if self.is_busy.get() {
            return Err(CanvasError::Busy);
        }
        Ok(self.bbox.begin_drag(self.stage.screen_to_canvas(screen)))
    }

    /// Moves the dragged bbox under `screen`, dispatching
    /// [`CanvasAction::BboxChanged`] when it moved.
    pub fn drag_bbox(&mut self, screen: Point) -> Result<(), CanvasError> {
        self.ensure_live()?;
        if let Some(action) = self.bbox.drag_to(self.stage.screen_to_canvas(screen)) {
            self.dispatch(action);
        }
        Ok(())
    }

    /// Ends a bbox drag.
    pub fn end_bbox_drag(&mut self) {
        if self.bbox.end_drag() {
            log::trace!("{}: bbox drag ended", self.log);
        }
    }

    // -- Filter --

    /// Starts filtering `identifier`. `config` replaces the filterer's
    /// remembered config; `None` keeps it.
    pub fn start_filter(
        &mut self,
        identifier: &EntityIdentifier,
        config: Option<FilterConfig>,
    ) -> Result<(), FilterError> {
        if self.destroyed {
            return Err(FilterError::Destroyed);
        }
        if self.is_busy.get() {
            return Err(FilterError::Busy);
        }
        if self.staging.is_staging().get() {
            return Err(FilterError::Staging);
        }
        let adapter = self
            .adapters
            .get_mut(identifier)
            .ok_or_else(|| FilterError::UnknownEntity(identifier.clone()))?;
        let filterer = adapter
            .filterer_mut()
            .ok_or_else(|| FilterError::NotFilterable(identifier.clone()))?;
        let from = filterer.phase();
        filterer.start(config);
        self.filter.begin(identifier.clone());
        self.trace_filter(identifier, from, FilterPhase::Filtering);
        Ok(())
    }

    /// Rasterizes the entity at its pixel-aligned bounds and submits it to
    /// the processor with the current config.
    pub fn preview_filter(&mut self, identifier: &EntityIdentifier) -> Result<JobId, FilterError> {
        if self.destroyed {
            return Err(FilterError::Destroyed);
        }
        if !self.filter.is_filtering_entity(identifier) {
            return Err(FilterError::NotFiltering(identifier.clone()));
        }
        let state = self
            .state_api
            .entity(identifier)
            .ok_or_else(|| FilterError::UnknownEntity(identifier.clone()))?;
        let rect = state
            .canvas_bounds()
            .ok_or_else(|| FilterError::EmptyEntity(identifier.clone()))?
            .expand();

        let misses = self.cache.misses();
        let image = self.cache.get_or_rasterize(
            CacheKey::new(state.id.clone(), state.generation(), rect),
            || rasterize_entity(&state, rect),
        );
        let (width, height) = image.dimensions();
        self.trace.on_composite(&CompositeEvent {
            target: CompositeTarget::Entity,
            width,
            height,
            entities: 1,
            cache_hits: u32::from(self.cache.misses() == misses),
        });

        let job = self.filter.next_job();
        let origin = state.to_local(rect.origin());
        let filterer = self
            .adapters
            .get_mut(identifier)
            .and_then(EntityAdapter::filterer_mut)
            .ok_or_else(|| FilterError::NotFilterable(identifier.clone()))?;
        let from = filterer.phase();
        let config = filterer.config();
        filterer.begin_processing(job, origin);
        self.filter.set_processing(true);
        self.processor.submit(
            job,
            FilterRequest {
                entity: identifier.clone(),
                config,
                image,
                origin,
            },
        );
        self.trace_filter(identifier, from, FilterPhase::Processing);
        Ok(job)
    }

    /// Delivers the processor's outcome for `job`.
    ///
    /// Dropped when the manager is destroyed or `job` is no longer the one
    /// the filtering entity waits for. A failure abandons filtering and
    /// raises an error notification; a cancellation returns to waiting for a
    /// new preview request.
    pub fn on_filter_result(&mut self, job: JobId, result: Result<RgbaImage, ProcessError>) {
        if self.destroyed || !self.ctx.is_alive() {
            log::debug!("{}: dropping {job:?} after destroy", self.log);
            return;
        }
        let Some(identifier) = self.filter.filtering_entity().get() else {
            log::debug!("{}: dropping {job:?}, nothing is filtering", self.log);
            return;
        };
        let Some(filterer) = self
            .adapters
            .get_mut(&identifier)
            .and_then(EntityAdapter::filterer_mut)
        else {
            return;
        };
        if !filterer.is_current_job(job) {
            log::debug!("{}: dropping stale {job:?}", self.log);
            return;
        }
        self.filter.set_processing(false);
        match result {
            Ok(image) => {
                filterer.show_preview(Arc::new(image), &mut self.surface);
                self.trace_filter(&identifier, FilterPhase::Processing, FilterPhase::Previewing);
            }
            Err(ProcessError::Cancelled) => {
                filterer.abandon_job();
                self.trace_filter(&identifier, FilterPhase::Processing, FilterPhase::Filtering);
            }
            Err(err) => {
                filterer.reset(&mut self.surface);
                self.filter.end();
                log::warn!("{}: filtering {identifier} failed: {err}", self.log);
                self.ctx
                    .notify(NotificationKind::Error, &format!("Filtering failed: {err}"));
                self.trace_filter(&identifier, FilterPhase::Processing, FilterPhase::Idle);
            }
        }
    }

    /// Replaces the entity's objects with the previewed image.
    pub fn apply_filter(&mut self, identifier: &EntityIdentifier) -> Result<(), FilterError> {
        if self.destroyed {
            return Err(FilterError::Destroyed);
        }
        if !self.filter.is_filtering_entity(identifier) {
            return Err(FilterError::NotFiltering(identifier.clone()));
        }
        let filterer = self
            .adapters
            .get_mut(identifier)
            .and_then(EntityAdapter::filterer_mut)
            .ok_or_else(|| FilterError::NotFilterable(identifier.clone()))?;
        let preview = filterer
            .preview()
            .cloned()
            .ok_or_else(|| FilterError::NoPreview(identifier.clone()))?;
        let from = filterer.reset(&mut self.surface);
        self.filter.end();

        let object = CanvasObject::Image(Versioned::new(ImageObject {
            id: ObjectId::generate("image"),
            position: preview.origin,
            image: preview.image,
        }));
        self.state_api.dispatch(CanvasAction::ObjectsReplaced {
            entity: identifier.clone(),
            objects: vec![object],
        });
        self.ctx.notify(NotificationKind::Success, "Filter applied");
        self.trace_filter(identifier, from, FilterPhase::Idle);
        self.sync();
        Ok(())
    }

    /// Abandons filtering without touching the entity's objects.
    pub fn cancel_filter(&mut self, identifier: &EntityIdentifier) -> Result<(), FilterError> {
        if self.destroyed {
            return Err(FilterError::Destroyed);
        }
        if !self.filter.is_filtering_entity(identifier) {
            return Err(FilterError::NotFiltering(identifier.clone()));
        }
        let from = match self
            .adapters
            .get_mut(identifier)
            .and_then(EntityAdapter::filterer_mut)
        {
            Some(filterer) => filterer.reset(&mut self.surface),
            None => FilterPhase::Idle,
        };
        self.filter.end();
        self.trace_filter(identifier, from, FilterPhase::Idle);
        Ok(())
    }

    /// Changes the config used by the next [`preview_filter`](Self::preview_filter).
    pub fn set_filter_config(
        &mut self,
        identifier: &EntityIdentifier,
        config: FilterConfig,
    ) -> Result<(), FilterError> {
        if !self.filter.is_filtering_entity(identifier) {
            return Err(FilterError::NotFiltering(identifier.clone()));
        }
        let filterer = self
            .adapters
            .get_mut(identifier)
            .and_then(EntityAdapter::filterer_mut)
            .ok_or_else(|| FilterError::NotFilterable(identifier.clone()))?;
        filterer.set_config(config);
        Ok(())
    }

    /// Assigns a control model to a control layer.
    ///
    /// The first model a layer receives starts filtering it with the
    /// model's preferred filter and submits a preview, unless some entity is
    /// already being filtered. An unknown identifier is a no-op.
    pub fn set_control_model(
        &mut self,
        identifier: &EntityIdentifier,
        model: Option<ControlModelConfig>,
    ) -> Result<(), CanvasError> {
        self.ensure_live()?;
        if identifier.kind != EntityKind::ControlLayer {
            return Err(CanvasError::NotControlLayer(identifier.clone()));
        }
        let Some(state) = self.state_api.entity(identifier) else {
            log::debug!("{}: control model for unknown {identifier} ignored", self.log);
            return Ok(());
        };
        let first_model = state.control_model().is_none();

        self.dispatch(CanvasAction::ControlModelChanged {
            entity: identifier.clone(),
            model: model.clone(),
        });

        if let Some(model) = model
            && first_model
            && !self.filter.is_filtering().get()
        {
            let config = FilterType::preferred_for(&model).build_defaults();
            match self.start_filter(identifier, Some(config)) {
                Ok(()) => {
                    if let Err(err) = self.preview_filter(identifier) {
                        log::debug!("{}: no initial preview: {err}", self.log);
                    }
                }
                Err(err) => log::debug!("{}: not auto-filtering: {err}", self.log),
            }
        }
        Ok(())
    }

    fn trace_filter(&mut self, entity: &EntityIdentifier, from: FilterPhase, to: FilterPhase) {
        if from != to {
            self.trace.on_filter_transition(&FilterTransitionEvent {
                entity: entity.clone(),
                from,
                to,
            });
        }
    }

    // -- Transform --

    /// Begins transforming `identifier`. Refused while busy or when the
    /// entity is locked; an unknown identifier is a no-op.
    pub fn start_transform(&mut self, identifier: &EntityIdentifier) -> Result<(), CanvasError> {
        self.ensure_live()?;
        if self.is_busy.get() {
            return Err(CanvasError::Busy);
        }
        let Some(state) = self.state_api.entity(identifier) else {
            log::debug!("{}: transform of unknown {identifier} ignored", self.log);
            return Ok(());
        };
        if state.is_locked {
            return Err(CanvasError::Locked(identifier.clone()));
        }
        self.state_api.set_transforming(Some(identifier.clone()));
        log::debug!("{}: transforming {identifier}", self.log);
        Ok(())
    }

    /// Moves the transformed entity by `delta` without touching the store.
    pub fn nudge_transform(&mut self, delta: Vec2) -> Result<(), CanvasError> {
        let identifier = self.transforming()?;
        let adapter = self
            .adapters
            .get_mut(&identifier)
            .ok_or(CanvasError::UnknownEntity(identifier))?;
        let offset = adapter.transform_offset().unwrap_or(Vec2::ZERO) + delta;
        adapter.set_transform_offset(Some(offset), &mut self.surface);
        Ok(())
    }

    /// Commits the accumulated offset as an [`CanvasAction::EntityMoved`].
    pub fn apply_transform(&mut self) -> Result<(), CanvasError> {
        let identifier = self.transforming()?;
        let offset = self
            .adapters
            .get(&identifier)
            .and_then(EntityAdapter::transform_offset);
        let position = self.state_api.entity(&identifier).map(|e| e.position);
        self.end_transform(&identifier);
        if let (Some(offset), Some(position)) = (offset, position)
            && offset != Vec2::ZERO
        {
            self.state_api.dispatch(CanvasAction::EntityMoved {
                entity: identifier,
                position: position + offset,
            });
        }
        self.sync();
        Ok(())
    }

    /// Drops the accumulated offset.
    pub fn cancel_transform(&mut self) -> Result<(), CanvasError> {
        let identifier = self.transforming()?;
        self.end_transform(&identifier);
        Ok(())
    }

    fn transforming(&self) -> Result<EntityIdentifier, CanvasError> {
        self.ensure_live()?;
        self.state_api
            .transforming_entity()
            .get()
            .ok_or(CanvasError::NotTransforming)
    }

    fn end_transform(&mut self, identifier: &EntityIdentifier) {
        if let Some(adapter) = self.adapters.get_mut(identifier) {
            adapter.set_transform_offset(None, &mut self.surface);
        }
        self.state_api.set_transforming(None);
    }

    // -- Compositing --

    /// Flattens every enabled raster layer over `rect`, the bbox when
    /// `None`.
    pub fn composite_raster_layers(&mut self, rect: Option<Rect>) -> Result<RgbaImage, CanvasError> {
        self.composite_kind(EntityKind::RasterLayer, CompositeTarget::RasterLayers, rect)
    }

    /// Flattens every enabled inpaint mask over `rect`, the bbox when
    /// `None`.
    pub fn composite_inpaint_masks(&mut self, rect: Option<Rect>) -> Result<RgbaImage, CanvasError> {
        self.composite_kind(EntityKind::InpaintMask, CompositeTarget::InpaintMasks, rect)
    }

    fn composite_kind(
        &mut self,
        kind: EntityKind,
        target: CompositeTarget,
        rect: Option<Rect>,
    ) -> Result<RgbaImage, CanvasError> {
        self.ensure_live()?;
        let state = self.state_api.canvas_state();
        let rect = rect.unwrap_or(state.bbox);
        let hits = self.cache.hits();
        let mut entities = 0_u32;
        let cache = &mut self.cache;
        let image = composite_with(
            state.entities(kind).iter().cloned(),
            rect,
            |entity: &Versioned<EntityState>| {
                entities += 1;
                cache.get_or_rasterize(
                    CacheKey::new(entity.id.clone(), entity.generation(), rect),
                    || rasterize_entity(entity, rect),
                )
            },
        );
        let (width, height) = image.dimensions();
        self.trace.on_composite(&CompositeEvent {
            target,
            width,
            height,
            entities,
            cache_hits: u32::try_from(self.cache.hits() - hits).unwrap_or(u32::MAX),
        });
        Ok(image)
    }

    // -- Staging and progress --

    /// Whether generation results are staged.
    #[must_use]
    pub fn is_staging(&self) -> BindRef<bool> {
        self.staging.is_staging()
    }

    /// Replaces the staged results.
    pub fn set_staged_images(&mut self, images: Vec<StagedImage>) {
        self.staging.set_images(images, &mut self.surface);
    }

    /// Selects the next staged result.
    pub fn select_next_staged(&mut self) {
        self.staging.select_next(&mut self.surface);
    }

    /// Selects the previous staged result.
    pub fn select_prev_staged(&mut self) {
        self.staging.select_prev(&mut self.surface);
    }

    /// Shows or hides the staged selection.
    pub fn set_staging_visible(&mut self, visible: bool) {
        self.staging.set_visible(visible, &mut self.surface);
    }

    /// Drops the selected staged result.
    pub fn discard_staged(&mut self) -> Option<StagedImage> {
        self.staging.discard_selected(&mut self.surface)
    }

    /// Turns the selected staged result into a new raster layer at the
    /// bbox origin and clears the staging area. Returns the new layer.
    pub fn accept_staged(&mut self) -> Result<Option<EntityIdentifier>, CanvasError> {
        self.ensure_live()?;
        let Some(staged) = self.staging.selected().cloned() else {
            return Ok(None);
        };
        let bbox = self.state_api.canvas_state().bbox;
        let mut layer = EntityState::new(EntityKind::RasterLayer);
        layer.name = Some(staged.name);
        layer.position = bbox.origin();
        let layer = layer.with_object(CanvasObject::Image(Versioned::new(ImageObject {
            id: ObjectId::generate("image"),
            position: Point::ZERO,
            image: staged.image,
        })));
        let identifier = layer.identifier();
        self.staging.clear(&mut self.surface);
        self.dispatch(CanvasAction::EntityAdded { state: layer });
        Ok(Some(identifier))
    }

    /// Drops every staged result.
    pub fn clear_staging(&mut self) {
        self.staging.clear(&mut self.surface);
    }

    /// Shows an intermediate generation image.
    pub fn on_progress(&mut self, progress: ProgressImage) {
        self.progress.on_progress(progress, &mut self.surface);
    }

    /// Hides the progress image.
    pub fn clear_progress(&mut self) {
        self.progress.clear(&mut self.surface);
    }

    // -- Diagnostics --

    /// Installs the diagnostics sink.
    pub fn set_trace_sink(&mut self, sink: impl TraceSink + 'static) {
        self.trace = Box::new(sink);
    }

    /// Enables or disables debug logging of the manager snapshot.
    pub fn set_debugging(&mut self, debugging: bool) {
        self.debugging = debugging;
        if debugging {
            self.log_repr();
        }
    }

    /// Logs the manager snapshot when debugging is enabled.
    pub fn log_repr(&self) {
        if self.debugging {
            log::debug!("{}: {:?}", self.log, self.repr());
        }
    }

    /// Serializable snapshot of the whole manager.
    #[must_use]
    pub fn repr(&self) -> ManagerRepr {
        ManagerRepr {
            id: self.id.clone(),
            initialized: self.initialized,
            destroyed: self.destroyed,
            is_busy: self.is_busy.get(),
            filtering_entity: self.filter.filtering_entity().get(),
            adapters: self
                .adapters
                .get_all()
                .into_iter()
                .map(EntityAdapter::repr)
                .collect(),
            state_api: self.state_api.repr(),
            stage: self.stage.repr(),
            tool: self.tool.repr(),
            staging: self.staging.repr(),
            progress: self.progress.repr(),
            bbox: self.bbox.repr(),
            background: self.background.repr(),
            cached_rasters: self.cache.len(),
        }
    }

    /// The drawing surface.
    #[must_use]
    pub fn surface(&self) -> &D {
        &self.surface
    }

    /// Mutable access to the drawing surface.
    pub fn surface_mut(&mut self) -> &mut D {
        &mut self.surface
    }

    fn ensure_live(&self) -> Result<(), CanvasError> {
        if self.destroyed {
            Err(CanvasError::Destroyed)
        } else {
            Ok(())
        }
    }
}

impl<S: StateStore> CanvasManager<S, SceneGraph> {
    /// Evaluates the scene and hands the changes to `presenter`.
    pub fn present(&mut self, presenter: &mut dyn Presenter) {
        let changes = self.surface.evaluate();
        presenter.apply(&self.surface, &changes);
    }

    /// Scene-graph counters.
    #[must_use]
    pub fn scene_stats(&self) -> SceneStats {
        self.surface.stats()
    }
}

/// Derives the busy flag from the filter and transform cursors.
fn busy_binding(is_filtering: BindRef<bool>, is_transforming: BindRef<bool>) -> BindRef<bool> {
    BindRef::from(computed(move || {
        is_filtering.get() || is_transforming.get()
    }))
}

#[cfg(test)]
mod tests {
    use core::cell::RefCell;
    use std::rc::Rc;

    use image::Rgba as Pixel;

    use super::*;
    use crate::context::test_util::RecordingNotifier;
    use crate::scene::SceneChanges;
    use crate::state::{BaseModel, BrushLine, Rgba};
    use crate::store::MemoryStore;

    #[derive(Debug, Default)]
    struct RecordingProcessor {
        jobs: Vec<(JobId, FilterRequest)>,
    }

    impl ImageProcessor for RecordingProcessor {
        fn submit(&mut self, job: JobId, request: FilterRequest) {
            self.jobs.push((job, request));
        }
    }

    #[derive(Debug, Default)]
    struct RecordingSink {
        transitions: Vec<(FilterPhase, FilterPhase)>,
        destroyed: Vec<EntityIdentifier>,
        lifecycle: Vec<LifecyclePhase>,
        composites: Vec<CompositeEvent>,
    }

    impl TraceSink for RecordingSink {
        fn on_lifecycle(&mut self, e: &LifecycleEvent) {
            self.lifecycle.push(e.phase);
        }

        fn on_entity_destroyed(&mut self, entity: &EntityIdentifier) {
            self.destroyed.push(entity.clone());
        }

        fn on_filter_transition(&mut self, e: &FilterTransitionEvent) {
            self.transitions.push((e.from, e.to));
        }

        fn on_composite(&mut self, e: &CompositeEvent) {
            self.composites.push(*e);
        }
    }

    type Manager = CanvasManager<Rc<RefCell<MemoryStore>>, SceneGraph>;

    struct Harness {
        manager: Manager,
        store: Rc<RefCell<MemoryStore>>,
        processor: Rc<RefCell<RecordingProcessor>>,
        notifier: Rc<RecordingNotifier>,
        sink: Rc<RefCell<RecordingSink>>,
        ctx: CanvasContext,
    }

    impl Harness {
        fn new() -> Self {
            let store = Rc::new(RefCell::new(MemoryStore::default()));
            let processor = Rc::new(RefCell::new(RecordingProcessor::default()));
            let notifier = Rc::new(RecordingNotifier::default());
            let ctx = CanvasContext::new(notifier.clone(), crate::config::CanvasConfig::default());
            let sink = Rc::new(RefCell::new(RecordingSink::default()));
            let mut manager = CanvasManager::new(
                ctx.clone(),
                Rc::clone(&store),
                SceneGraph::new(),
                Rc::clone(&processor),
            );
            manager.set_trace_sink(Rc::clone(&sink));
            manager.initialize();
            Self {
                manager,
                store,
                processor,
                notifier,
                sink,
                ctx,
            }
        }

        fn add(&mut self, state: EntityState) -> EntityIdentifier {
            let identifier = state.identifier();
            self.manager.dispatch(CanvasAction::EntityAdded { state });
            identifier
        }

        fn select(&mut self, entity: &EntityIdentifier) {
            self.manager.dispatch(CanvasAction::EntitySelected {
                entity: Some(entity.clone()),
            });
        }
    }

    fn brush(points: Vec<Point>) -> CanvasObject {
        CanvasObject::BrushLine(Versioned::new(BrushLine {
            id: ObjectId::generate("brush_line"),
            points,
            stroke_width: 4.0,
            color: Rgba::new(255, 0, 0, 255),
            clip: None,
        }))
    }

    fn control_layer() -> EntityState {
        EntityState::new(EntityKind::ControlLayer).with_object(brush(vec![
            Point::new(2.0, 2.0),
            Point::new(10.0, 10.0),
        ]))
    }

    fn result_image() -> RgbaImage {
        RgbaImage::from_pixel(4, 4, Pixel([0, 255, 0, 255]))
    }

    #[test]
    fn initialize_creates_adapters_and_publishes_manager() {
        let store = Rc::new(RefCell::new(MemoryStore::default()));
        let layer = EntityState::new(EntityKind::RasterLayer).with_object(brush(vec![
            Point::new(0.0, 0.0),
            Point::new(5.0, 5.0),
        ]));
        let identifier = layer.identifier();
        store
            .borrow_mut()
            .dispatch(CanvasAction::EntityAdded { state: layer });
        let ctx = CanvasContext::default();
        let mut manager = CanvasManager::new(
            ctx.clone(),
            store,
            SceneGraph::new(),
            crate::filter::NullProcessor,
        );
        assert!(manager.get_adapter(&identifier).is_none(), "nothing before initialize");

        manager.initialize();
        let adapter = manager.get_adapter(&identifier).expect("adapter");
        assert_eq!(adapter.renderers().len(), 1);
        assert_eq!(ctx.active_manager().get().as_deref(), Some(manager.id()));

        let created = manager.scene_stats().nodes_created;
        manager.initialize();
        assert_eq!(manager.scene_stats().nodes_created, created, "second initialize is a no-op");
    }

    #[test]
    fn busy_follows_filtering_and_transforming() {
        let mut h = Harness::new();
        let layer = h.add(control_layer());
        let busy = h.manager.is_busy();
        assert!(!busy.get());

        h.manager.start_filter(&layer, None).expect("start");
        assert!(busy.get());
        h.manager.cancel_filter(&layer).expect("cancel");
        assert!(!busy.get());

        h.manager.start_transform(&layer).expect("transform");
        assert!(busy.get());
        h.manager.cancel_transform().expect("cancel transform");
        assert!(!busy.get());
    }

    #[test]
    fn busy_binding_releases_its_sources() {
        use flo_binding::{MutableBound, bind};

        let marker = Arc::new(());
        let weak = Arc::downgrade(&marker);
        let filtering = bind(false);
        let source = {
            let filtering = filtering.clone();
            BindRef::from(computed(move || {
                let _held = &marker;
                filtering.get()
            }))
        };
        let busy = busy_binding(source, BindRef::from(bind(false)));
        assert!(!busy.get());
        filtering.set(true);
        assert!(busy.get());

        drop(busy);
        drop(filtering);
        assert!(weak.upgrade().is_none(), "derived bindings leaked their closures");
    }

    #[test]
    fn dropping_the_manager_releases_its_collaborators() {
        let h = Harness::new();
        let Harness {
            mut manager,
            store,
            processor,
            sink,
            ..
        } = h;
        manager.destroy();
        drop(manager);
        assert_eq!(Rc::strong_count(&store), 1);
        assert_eq!(Rc::strong_count(&processor), 1);
        assert_eq!(Rc::strong_count(&sink), 1);
    }

    #[test]
    fn second_filter_is_rejected_while_busy() {
        let mut h = Harness::new();
        let a = h.add(control_layer());
        let b = h.add(EntityState::new(EntityKind::RasterLayer));
        h.manager.start_filter(&a, None).expect("start");

        assert!(matches!(h.manager.start_filter(&b, None), Err(FilterError::Busy)));
        assert_eq!(h.manager.filter().filtering_entity().get(), Some(a));
        assert_eq!(
            h.manager
                .get_adapter(&b)
                .and_then(EntityAdapter::filterer)
                .map(Filterer::phase),
            Some(FilterPhase::Idle)
        );
    }

    #[test]
    fn masks_are_not_filterable() {
        let mut h = Harness::new();
        let mask = h.add(EntityState::new(EntityKind::InpaintMask));
        assert!(matches!(
            h.manager.start_filter(&mask, None),
            Err(FilterError::NotFilterable(_))
        ));
        assert!(!h.manager.is_busy().get());
    }

    #[test]
    fn filtering_is_refused_while_staging() {
        let mut h = Harness::new();
        let layer = h.add(control_layer());
        h.manager.set_staged_images(vec![StagedImage {
            name: "gen".to_owned(),
            image: Arc::new(RgbaImage::new(2, 2)),
        }]);
        assert!(matches!(
            h.manager.start_filter(&layer, None),
            Err(FilterError::Staging)
        ));
    }

    #[test]
    fn filter_round_trip_replaces_objects() {
        let mut h = Harness::new();
        let layer = h.add(control_layer());
        h.manager.start_filter(&layer, None).expect("start");
        let job = h.manager.preview_filter(&layer).expect("preview");
        assert!(h.manager.filter().is_processing().get());

        let request_origin = {
            let processor = h.processor.borrow();
            let (_, request) = processor.jobs.last().expect("submitted");
            assert_eq!(request.entity, layer);
            assert_eq!(request.config.filter_type(), FilterType::Canny);
            request.origin
        };

        h.manager.on_filter_result(job, Ok(result_image()));
        assert!(!h.manager.filter().is_processing().get());
        let adapter = h.manager.get_adapter(&layer).expect("adapter");
        assert_eq!(
            adapter.filterer().map(Filterer::phase),
            Some(FilterPhase::Previewing)
        );
        assert!(!h.manager.surface().is_visible(adapter.objects_group()));

        h.manager.apply_filter(&layer).expect("apply");
        assert!(!h.manager.is_busy().get());
        let state = h.store.borrow().state().entity(&layer).cloned().expect("entity");
        assert_eq!(state.objects.len(), 1);
        assert!(matches!(
            &state.objects[0],
            CanvasObject::Image(image) if image.position == request_origin
        ));
        assert_eq!(h.notifier.kinds(), vec![NotificationKind::Success]);
        assert_eq!(
            h.sink.borrow().transitions,
            vec![
                (FilterPhase::Idle, FilterPhase::Filtering),
                (FilterPhase::Filtering, FilterPhase::Processing),
                (FilterPhase::Processing, FilterPhase::Previewing),
                (FilterPhase::Previewing, FilterPhase::Idle),
            ]
        );
    }

    #[test]
    fn stale_and_failed_results() {
        let mut h = Harness::new();
        let layer = h.add(control_layer());
        h.manager.start_filter(&layer, None).expect("start");
        let first = h.manager.preview_filter(&layer).expect("first");
        let second = h.manager.preview_filter(&layer).expect("second");
        assert!(second > first);

        h.manager.on_filter_result(first, Ok(result_image()));
        assert_eq!(
            h.manager
                .get_adapter(&layer)
                .and_then(EntityAdapter::filterer)
                .map(Filterer::phase),
            Some(FilterPhase::Processing),
            "superseded job is ignored"
        );

        h.manager
            .on_filter_result(second, Err(ProcessError::Failed("oom".to_owned())));
        assert!(!h.manager.is_busy().get());
        assert_eq!(h.notifier.kinds(), vec![NotificationKind::Error]);
    }

    #[test]
    fn cancelled_job_keeps_filtering() {
        let mut h = Harness::new();
        let layer = h.add(control_layer());
        h.manager.start_filter(&layer, None).expect("start");
        let job = h.manager.preview_filter(&layer).expect("preview");
        h.manager.on_filter_result(job, Err(ProcessError::Cancelled));
        assert!(h.manager.filter().is_filtering().get());
        assert!(!h.manager.filter().is_processing().get());
        assert!(h.notifier.kinds().is_empty());
    }

    #[test]
    fn empty_entity_cannot_be_previewed() {
        let mut h = Harness::new();
        let layer = h.add(EntityState::new(EntityKind::ControlLayer));
        h.manager.start_filter(&layer, None).expect("start");
        assert!(matches!(
            h.manager.preview_filter(&layer),
            Err(FilterError::EmptyEntity(_))
        ));
        assert!(matches!(
            h.manager.apply_filter(&layer),
            Err(FilterError::NoPreview(_))
        ));
    }

    #[test]
    fn unknown_identifiers_are_ignored() {
        let mut h = Harness::new();
        let kept = h.add(control_layer());
        let ghost = EntityState::new(EntityKind::ControlLayer).identifier();
        let before = h.store.borrow().state().clone();

        h.manager.delete_entity(&ghost).expect("delete is a no-op");
        h.manager.start_transform(&ghost).expect("transform is a no-op");
        h.manager
            .set_control_model(
                &ghost,
                Some(ControlModelConfig {
                    key: "depth-model".to_owned(),
                    base: BaseModel::Sdxl,
                    default_preprocessor: None,
                }),
            )
            .expect("control model is a no-op");

        assert_eq!(*h.store.borrow().state(), before);
        assert!(!h.manager.is_busy().get());
        assert_eq!(h.manager.state_api().transforming_entity().get(), None);
        assert!(h.manager.get_adapter(&kept).is_some());
    }

    #[test]
    fn bbox_and_background_nodes_follow_the_lifecycle() {
        let mut h = Harness::new();
        let bbox = h.manager.surface().find_by_name("bbox").expect("bbox group");
        let grid = h
            .manager
            .surface()
            .find_by_name("background")
            .expect("background group");
        assert_eq!(h.manager.bbox().rect(), h.store.borrow().state().bbox);
        assert_eq!(h.manager.repr().background.lines, 0, "no container yet");

        h.manager.set_container_size(Size::new(256.0, 128.0));
        assert_eq!(h.manager.repr().background.lines, 14);
        h.manager.zoom_at(Point::ZERO, 4.0);
        let repr = h.manager.repr().background;
        assert_eq!(repr.spacing, 8.0);
        assert_eq!(repr.lines, 14);

        h.manager.destroy();
        assert!(!h.manager.surface().is_alive(bbox));
        assert!(!h.manager.surface().is_alive(grid));
        assert_eq!(h.manager.scene_stats().live_nodes(), 0);
    }

    #[test]
    fn dragging_the_bbox_dispatches_snapped_moves() {
        let mut h = Harness::new();
        assert!(!h.manager.begin_bbox_drag(Point::new(900.0, 900.0)).expect("live"));
        assert!(h.manager.begin_bbox_drag(Point::new(100.0, 100.0)).expect("live"));
        h.manager.drag_bbox(Point::new(141.0, 100.0)).expect("drag");
        h.manager.end_bbox_drag();

        let moved = Rect::new(40.0, 0.0, 552.0, 512.0);
        assert_eq!(h.store.borrow().state().bbox, moved);
        assert_eq!(h.manager.bbox().rect(), moved, "overlay synced from the store");
        assert!(!h.manager.repr().bbox.dragging);
    }

    #[test]
    fn bbox_drag_is_refused_while_busy() {
        let mut h = Harness::new();
        let layer = h.add(control_layer());
        h.manager.start_transform(&layer).expect("transform");
        assert!(matches!(
            h.manager.begin_bbox_drag(Point::new(10.0, 10.0)),
            Err(CanvasError::Busy)
        ));
    }

    #[test]
    fn late_result_after_destroy_is_dropped() {
        let mut h = Harness::new();
        let layer = h.add(control_layer());
        h.manager.start_filter(&layer, None).expect("start");
        let job = h.manager.preview_filter(&layer).expect("preview");

        h.manager.destroy();
        let stats = h.manager.scene_stats();
        assert_eq!(stats.live_nodes(), 0, "destroy releases every node");
        assert!(!h.ctx.is_alive());
        assert_eq!(h.ctx.active_manager().get(), None);

        h.manager.on_filter_result(job, Ok(result_image()));
        assert_eq!(h.manager.scene_stats(), stats, "late result touches nothing");
        assert!(h.notifier.kinds().is_empty());

        h.manager.destroy();
        assert_eq!(
            h.sink.borrow().lifecycle,
            vec![LifecyclePhase::Initialized, LifecyclePhase::Destroyed]
        );
        assert!(matches!(
            h.manager.start_filter(&layer, None),
            Err(FilterError::Destroyed)
        ));
    }

    #[test]
    fn first_control_model_starts_filtering() {
        let mut h = Harness::new();
        let layer = h.add(control_layer());
        let model = ControlModelConfig {
            key: "depth-model".to_owned(),
            base: BaseModel::Sdxl,
            default_preprocessor: Some("depth_anything_image_processor".to_owned()),
        };
        h.manager
            .set_control_model(&layer, Some(model.clone()))
            .expect("set model");
        assert_eq!(h.manager.filter().filtering_entity().get(), Some(layer.clone()));
        {
            let processor = h.processor.borrow();
            let (_, request) = processor.jobs.last().expect("preview submitted");
            assert_eq!(request.config.filter_type(), FilterType::DepthAnything);
        }

        h.manager.cancel_filter(&layer).expect("cancel");
        h.manager
            .set_control_model(&layer, Some(model))
            .expect("change model");
        assert!(
            !h.manager.filter().is_filtering().get(),
            "only the first model starts filtering"
        );
    }

    #[test]
    fn control_model_only_for_control_layers() {
        let mut h = Harness::new();
        let raster = h.add(EntityState::new(EntityKind::RasterLayer));
        assert!(matches!(
            h.manager.set_control_model(&raster, None),
            Err(CanvasError::NotControlLayer(_))
        ));
    }

    #[test]
    fn single_point_stroke_renders_as_segment() {
        let mut h = Harness::new();
        let layer = h.add(EntityState::new(EntityKind::RasterLayer));
        h.select(&layer);
        h.manager
            .handle_pointer(PointerEvent::Down(Point::new(10.0, 10.0)))
            .expect("down");
        h.manager
            .handle_pointer(PointerEvent::Up(Point::new(10.0, 10.0)))
            .expect("up");

        let adapter = h.manager.get_adapter(&layer).expect("adapter");
        let renderer = &adapter.renderers()[0];
        let shape = renderer.shape();
        assert_eq!(
            h.manager.surface().points(shape),
            Some(&[Point::new(10.0, 10.0), Point::new(10.0, 10.0)][..])
        );
    }

    #[test]
    fn pointer_events_are_mapped_through_the_stage() {
        let mut h = Harness::new();
        let layer = h.add(EntityState::new(EntityKind::RasterLayer));
        h.select(&layer);
        h.manager.zoom_at(Point::ZERO, 2.0);
        h.manager
            .handle_pointer(PointerEvent::Down(Point::new(20.0, 40.0)))
            .expect("down");

        let state = h.store.borrow().state().entity(&layer).cloned().expect("entity");
        assert!(matches!(
            &state.objects[0],
            CanvasObject::BrushLine(line) if line.points == vec![Point::new(10.0, 20.0)]
        ));
    }

    #[test]
    fn tool_refuses_while_busy() {
        let mut h = Harness::new();
        let layer = h.add(control_layer());
        h.select(&layer);
        h.manager.start_filter(&layer, None).expect("start");
        assert!(matches!(
            h.manager.handle_pointer(PointerEvent::Down(Point::new(1.0, 1.0))),
            Err(ToolError::Busy)
        ));
    }

    #[test]
    fn removed_entity_loses_adapter_and_filter() {
        let mut h = Harness::new();
        let layer = h.add(control_layer());
        h.manager.start_filter(&layer, None).expect("start");
        assert!(matches!(
            h.manager.delete_entity(&layer),
            Err(CanvasError::Busy)
        ));

        // A removal the manager did not initiate still cleans up.
        h.manager
            .dispatch(CanvasAction::EntityRemoved { entity: layer.clone() });
        assert!(h.manager.get_adapter(&layer).is_none());
        assert!(!h.manager.is_busy().get());
        assert_eq!(h.sink.borrow().destroyed, vec![layer]);
    }

    #[test]
    fn transform_commits_offset() {
        let mut h = Harness::new();
        let layer = h.add(control_layer());
        h.manager.start_transform(&layer).expect("start");
        h.manager.nudge_transform(Vec2::new(5.0, 0.0)).expect("nudge");
        h.manager.nudge_transform(Vec2::new(0.0, 3.0)).expect("nudge");
        assert_eq!(
            h.store.borrow().state().entity(&layer).map(|e| e.position),
            Some(Point::ZERO),
            "store untouched until applied"
        );

        h.manager.apply_transform().expect("apply");
        assert_eq!(
            h.store.borrow().state().entity(&layer).map(|e| e.position),
            Some(Point::new(5.0, 3.0))
        );
        assert!(!h.manager.is_busy().get());
        assert!(matches!(
            h.manager.apply_transform(),
            Err(CanvasError::NotTransforming)
        ));
    }

    #[test]
    fn locked_entity_cannot_be_transformed() {
        let mut h = Harness::new();
        let layer = h.add(control_layer());
        h.manager.dispatch(CanvasAction::EntityIsLockedChanged {
            entity: layer.clone(),
            is_locked: true,
        });
        assert!(matches!(
            h.manager.start_transform(&layer),
            Err(CanvasError::Locked(_))
        ));
    }

    #[test]
    fn composite_reuses_cached_rasters() {
        let mut h = Harness::new();
        h.add(EntityState::new(EntityKind::RasterLayer).with_object(brush(vec![
            Point::new(0.0, 0.0),
            Point::new(16.0, 16.0),
        ])));
        let rect = Rect::new(0.0, 0.0, 16.0, 16.0);

        let first = h.manager.composite_raster_layers(Some(rect)).expect("first");
        let second = h.manager.composite_raster_layers(Some(rect)).expect("second");
        assert_eq!(first, second);
        assert_eq!(first.dimensions(), (16, 16));

        let sink = h.sink.borrow();
        assert_eq!(sink.composites.len(), 2);
        assert_eq!(sink.composites[0].cache_hits, 0);
        assert_eq!(sink.composites[1].cache_hits, 1);
    }

    #[test]
    fn adapters_follow_store_order() {
        let mut h = Harness::new();
        let mask = h.add(EntityState::new(EntityKind::InpaintMask));
        let a = h.add(EntityState::new(EntityKind::RasterLayer));
        let b = h.add(EntityState::new(EntityKind::RasterLayer));

        let groups: Vec<NodeId> = h
            .manager
            .surface()
            .children(h.manager.entities_group)
            .collect();
        let expected: Vec<NodeId> = [&a, &b, &mask]
            .into_iter()
            .map(|id| h.manager.get_adapter(id).map(EntityAdapter::group).expect("adapter"))
            .collect();
        assert_eq!(groups, expected, "raster layers stay below masks");
        assert_eq!(h.manager.adapters().len(), 3);
    }

    #[test]
    fn accepting_staged_image_adds_raster_layer() {
        let mut h = Harness::new();
        h.manager.set_staged_images(vec![StagedImage {
            name: "gen-1".to_owned(),
            image: Arc::new(RgbaImage::new(8, 8)),
        }]);
        let layer = h
            .manager
            .accept_staged()
            .expect("live")
            .expect("something staged");
        assert!(!h.manager.is_staging().get());
        assert!(h.manager.get_adapter(&layer).is_some());
        assert_eq!(h.manager.accept_staged().expect("live"), None);
    }

    #[test]
    fn present_hands_changes_to_presenter() {
        #[derive(Default)]
        struct Counting {
            calls: u32,
        }
        impl Presenter for Counting {
            fn apply(&mut self, _scene: &SceneGraph, _changes: &SceneChanges) {
                self.calls += 1;
            }
        }

        let mut h = Harness::new();
        let mut presenter = Counting::default();
        h.manager.present(&mut presenter);
        assert_eq!(presenter.calls, 1);
    }

    #[test]
    fn repr_lists_every_adapter() {
        let mut h = Harness::new();
        let layer = h.add(control_layer());
        h.manager.set_debugging(true);
        let repr = h.manager.repr();
        assert!(repr.initialized);
        assert_eq!(repr.adapters.len(), 1);
        assert_eq!(repr.adapters[0].identifier, layer);
        assert_eq!(repr.adapters[0].filter, Some(FilterPhase::Idle));
    }
}
