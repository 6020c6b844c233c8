// Copyright 2026 the Easel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Entity and object identity types.

use core::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Separator between an id's kind prefix and its random part.
pub const ID_SEPARATOR: char = ':';

/// Returns a fresh id of the form `<prefix>:<random>`.
#[must_use]
pub fn prefixed_id(prefix: &str) -> String {
    format!("{prefix}{ID_SEPARATOR}{}", Uuid::new_v4().simple())
}

/// The closed set of entity kinds.
///
/// The declaration order is the registry order used by
/// [`AdapterRegistry::get_all`](crate::manager::AdapterRegistry::get_all).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// A plain raster layer.
    RasterLayer,
    /// A layer whose content conditions generation through a control model.
    ControlLayer,
    /// A region mask carrying regional prompts.
    RegionalGuidance,
    /// The mask of areas to regenerate.
    InpaintMask,
}

impl EntityKind {
    /// All kinds in registry order.
    pub const ALL: [Self; 4] = [
        Self::RasterLayer,
        Self::ControlLayer,
        Self::RegionalGuidance,
        Self::InpaintMask,
    ];

    /// The prefix used for generated ids of this kind.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::RasterLayer => "raster_layer",
            Self::ControlLayer => "control_layer",
            Self::RegionalGuidance => "regional_guidance",
            Self::InpaintMask => "inpaint_mask",
        }
    }

    /// Whether entities of this kind can be run through a filter.
    #[must_use]
    pub const fn is_filterable(self) -> bool {
        matches!(self, Self::RasterLayer | Self::ControlLayer)
    }

    /// Whether entities of this kind are masks drawn in a single fill colour.
    #[must_use]
    pub const fn is_mask(self) -> bool {
        matches!(self, Self::RegionalGuidance | Self::InpaintMask)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// Identifier of one entity, unique within its kind.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Wraps an existing id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh id for an entity of `kind`.
    #[must_use]
    pub fn generate(kind: EntityKind) -> Self {
        Self(prefixed_id(kind.prefix()))
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({})", self.0)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of one drawable object inside an entity.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(String);

impl ObjectId {
    /// Wraps an existing id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh id with the given object-type prefix.
    #[must_use]
    pub fn generate(prefix: &str) -> Self {
        Self(prefixed_id(prefix))
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.0)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fully qualified entity reference: kind plus id.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityIdentifier {
    /// Entity kind.
    pub kind: EntityKind,
    /// Entity id within that kind.
    pub id: EntityId,
}

impl EntityIdentifier {
    /// Creates an identifier.
    #[must_use]
    pub fn new(kind: EntityKind, id: EntityId) -> Self {
        Self { kind, id }
    }

    /// Whether the referenced entity can be filtered.
    #[must_use]
    pub fn is_filterable(&self) -> bool {
        self.kind.is_filterable()
    }
}

impl fmt::Display for EntityIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.id)
    }
}
