// Copyright 2026 the Easel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types.
//!
//! Rejections caused by stale UI events (unknown entities, busy canvas) are
//! returned as errors so callers can inspect them, but they never leave the
//! canvas in a partially updated state.

use thiserror::Error;

use crate::id::EntityIdentifier;

/// Errors returned by filter operations.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum FilterError {
    /// Another filter or a transform is in progress.
    #[error("canvas is busy")]
    Busy,
    /// No adapter exists for the entity.
    #[error("no adapter for {0}")]
    UnknownEntity(EntityIdentifier),
    /// The entity kind does not support filtering.
    #[error("{0} cannot be filtered")]
    NotFilterable(EntityIdentifier),
    /// The entity is not the one currently being filtered.
    #[error("{0} is not being filtered")]
    NotFiltering(EntityIdentifier),
    /// The entity has nothing to rasterize.
    #[error("{0} has no content to filter")]
    EmptyEntity(EntityIdentifier),
    /// There is no processed preview to apply.
    #[error("no filter preview for {0}")]
    NoPreview(EntityIdentifier),
    /// Generation results are waiting in the staging area.
    #[error("cannot filter while staging")]
    Staging,
    /// The manager has been destroyed.
    #[error("canvas manager has been destroyed")]
    Destroyed,
}

/// Errors reported by an [`ImageProcessor`](crate::filter::ImageProcessor).
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ProcessError {
    /// The backend rejected or failed the job.
    #[error("image processing failed: {0}")]
    Failed(String),
    /// The backend dropped the job.
    #[error("image processing was cancelled")]
    Cancelled,
}

/// Errors returned by pointer handling.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ToolError {
    /// A filter or transform is in progress.
    #[error("canvas is busy")]
    Busy,
    /// No entity is selected.
    #[error("no entity selected")]
    NoSelection,
    /// The selected entity is locked.
    #[error("{0} is locked")]
    Locked(EntityIdentifier),
    /// The selected entity is hidden.
    #[error("{0} is disabled")]
    Disabled(EntityIdentifier),
    /// The manager has been destroyed.
    #[error("canvas manager has been destroyed")]
    Destroyed,
}

/// Errors returned by entity-level manager operations.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum CanvasError {
    /// A filter or transform is in progress.
    #[error("canvas is busy")]
    Busy,
    /// No adapter exists for the entity.
    #[error("no adapter for {0}")]
    UnknownEntity(EntityIdentifier),
    /// The entity is locked.
    #[error("{0} is locked")]
    Locked(EntityIdentifier),
    /// The entity is not a control layer.
    #[error("{0} is not a control layer")]
    NotControlLayer(EntityIdentifier),
    /// No transform is in progress.
    #[error("no transform in progress")]
    NotTransforming,
    /// The manager has been destroyed.
    #[error("canvas manager has been destroyed")]
    Destroyed,
}
