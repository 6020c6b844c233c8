// Copyright 2026 the Easel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layer and entity composition for an image-generation canvas.
//!
//! `easel_core` keeps a retained scene of drawable nodes in step with an
//! external state store. The store owns the document: four lists of entities
//! (raster layers, control layers, regional guidance and inpaint masks), each
//! holding drawable objects. This crate owns everything derived from it.
//!
//! # Architecture
//!
//! ```text
//!   host input ──► CanvasManager ──► ToolModule / filter / transform
//!                        │                    │
//!                        │              CanvasAction
//!                        │                    ▼
//!                        │              StateApi ──► StateStore
//!                        ▼
//!                  sync() ──► EntityAdapter::update() ──► ObjectRenderer::update()
//!                                                               │
//!                                                               ▼
//!                                                        DrawingSurface
//!                                                               │
//!                  SceneGraph::evaluate() ──► SceneChanges ──► Presenter::apply()
//! ```
//!
//! **[`manager`]** — [`CanvasManager`](manager::CanvasManager): lifecycle,
//! the adapter registry, and every host-facing operation.
//!
//! **[`adapter`]** — One adapter per entity. Reconciles renderers against
//! the entity's object list, skipping unchanged snapshots.
//!
//! **[`renderer`]** — One renderer per drawable object, mirroring a brush
//! line, eraser line, rectangle or image onto scene nodes.
//!
//! **[`scene`]** — The [`DrawingSurface`](scene::DrawingSurface) trait and
//! the bundled struct-of-arrays [`SceneGraph`](scene::SceneGraph) with dirty
//! tracking via `understory_dirty`.
//!
//! **[`filter`]** — Filter configs, the per-entity filter state machine and
//! the asynchronous [`ImageProcessor`](filter::ImageProcessor) seam.
//!
//! **[`compositor`]** and **[`cache`]** — CPU rasterization of entities on `vello_cpu`
//! and a bounded raster memo keyed by snapshot generation.
//!
//! **[`stage`]**, **[`tool`]**, **[`staging`]**, **[`progress`]** — View
//! transform, pointer tools and the transient generation overlays.
//!
//! **[`bbox`]** and **[`background`]** — The draggable generation frame and
//! the zoom-scaled grid behind the entities.
//!
//! **[`state_api`]**, **[`store`]**, **[`state`]** — The store seam, its
//! actions and the immutable snapshot types.
//!
//! **[`version`]** — Generation-stamped snapshots used for change
//! detection. Observable cursors are `flo_binding` bindings.
//!
//! **[`trace`]** — [`TraceSink`](trace::TraceSink) diagnostics events.

pub mod adapter;
pub mod background;
pub mod bbox;
pub mod cache;
pub mod compositor;
pub mod config;
pub mod context;
pub mod error;
pub mod filter;
mod geom;
pub mod id;
pub mod manager;
pub mod progress;
pub mod renderer;
pub mod scene;
pub mod stage;
pub mod staging;
pub mod state;
pub mod state_api;
pub mod store;
pub mod tool;
pub mod trace;
pub mod version;
