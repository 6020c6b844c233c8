// Copyright 2026 the Easel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The external state store contract and an in-memory reducer.
//!
//! The canvas treats the store as the single source of truth. It reads
//! snapshots through [`StateStore::canvas_state`] and requests every change
//! through [`StateStore::dispatch`]; it never edits an entity record itself.

use core::cell::RefCell;
use std::rc::Rc;

use kurbo::{Point, Rect};

use crate::id::{EntityIdentifier, ObjectId};
use crate::state::{
    CanvasObject, CanvasSettings, CanvasState, ControlModelConfig, EntityData, EntityState, Rgba,
};
use crate::version::Versioned;

/// A requested state transition.
#[derive(Clone, Debug, PartialEq)]
pub enum CanvasAction {
    /// Appends a new entity to its kind's list.
    EntityAdded {
        /// The new entity.
        state: EntityState,
    },
    /// Removes an entity.
    EntityRemoved {
        /// Target entity.
        entity: EntityIdentifier,
    },
    /// Changes the selection.
    EntitySelected {
        /// New selection.
        entity: Option<EntityIdentifier>,
    },
    /// Shows or hides an entity.
    EntityIsEnabledChanged {
        /// Target entity.
        entity: EntityIdentifier,
        /// New visibility.
        is_enabled: bool,
    },
    /// Locks or unlocks an entity.
    EntityIsLockedChanged {
        /// Target entity.
        entity: EntityIdentifier,
        /// New lock state.
        is_locked: bool,
    },
    /// Changes an entity's opacity.
    EntityOpacityChanged {
        /// Target entity.
        entity: EntityIdentifier,
        /// New opacity, clamped to `0.0..=1.0`.
        opacity: f32,
    },
    /// Moves an entity.
    EntityMoved {
        /// Target entity.
        entity: EntityIdentifier,
        /// New position.
        position: Point,
    },
    /// Appends an object to an entity.
    ObjectAdded {
        /// Target entity.
        entity: EntityIdentifier,
        /// The new object.
        object: CanvasObject,
    },
    /// Replaces the object with the same id.
    ObjectReplaced {
        /// Target entity.
        entity: EntityIdentifier,
        /// Replacement object.
        object: CanvasObject,
    },
    /// Replaces all objects of an entity.
    ObjectsReplaced {
        /// Target entity.
        entity: EntityIdentifier,
        /// New object list.
        objects: Vec<CanvasObject>,
    },
    /// Removes one object.
    ObjectRemoved {
        /// Target entity.
        entity: EntityIdentifier,
        /// Object to remove.
        object: ObjectId,
    },
    /// Removes every object from an entity.
    EntityReset {
        /// Target entity.
        entity: EntityIdentifier,
    },
    /// Assigns a control model to a control layer.
    ControlModelChanged {
        /// Target entity.
        entity: EntityIdentifier,
        /// New model.
        model: Option<ControlModelConfig>,
    },
    /// Changes a mask's display colour.
    FillChanged {
        /// Target entity.
        entity: EntityIdentifier,
        /// New fill.
        fill: Rgba,
    },
    /// Moves or resizes the generation bbox.
    BboxChanged {
        /// New bbox.
        rect: Rect,
    },
    /// Changes the brush width.
    BrushWidthChanged {
        /// New width.
        width: f64,
    },
    /// Changes the eraser width.
    EraserWidthChanged {
        /// New width.
        width: f64,
    },
    /// Changes the paint colour.
    ColorChanged {
        /// New colour.
        color: Rgba,
    },
    /// Toggles clipping of new lines to the bbox.
    ClipToBboxChanged {
        /// New value.
        clip_to_bbox: bool,
    },
}

/// Read/write access to the external state store.
pub trait StateStore {
    /// Returns the current canvas snapshot.
    fn canvas_state(&self) -> CanvasState;

    /// Returns the current tool settings.
    fn settings(&self) -> CanvasSettings;

    /// Requests a state transition.
    fn dispatch(&mut self, action: CanvasAction);
}

impl<S: StateStore> StateStore for Rc<RefCell<S>> {
    fn canvas_state(&self) -> CanvasState {
        self.borrow().canvas_state()
    }

    fn settings(&self) -> CanvasSettings {
        self.borrow().settings()
    }

    fn dispatch(&mut self, action: CanvasAction) {
        self.borrow_mut().dispatch(action);
    }
}

/// A reducer-backed store holding everything in memory.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    state: CanvasState,
    settings: CanvasSettings,
    dispatched: usize,
}

impl MemoryStore {
    /// Creates a store with the given initial state.
    #[must_use]
    pub fn new(state: CanvasState, settings: CanvasSettings) -> Self {
        Self {
            state,
            settings,
            dispatched: 0,
        }
    }

    /// Creates a shareable store, the form most hosts pass to the manager.
    #[must_use]
    pub fn shared(state: CanvasState, settings: CanvasSettings) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self::new(state, settings)))
    }

    /// Direct access to the current snapshot.
    #[must_use]
    pub fn state(&self) -> &CanvasState {
        &self.state
    }

    /// Number of actions dispatched so far.
    #[must_use]
    pub fn dispatched(&self) -> usize {
        self.dispatched
    }

    /// Replaces the entity with a copy modified by `f`. Unknown entities are
    /// ignored.
    fn update_entity(&mut self, entity: &EntityIdentifier, f: impl FnOnce(&mut EntityState)) {
        let list = self.state.entities_mut(entity.kind);
        match list.iter_mut().find(|e| e.id == entity.id) {
            Some(slot) => *slot = slot.map(f),
            None => log::warn!("store: ignoring action for unknown entity {entity}"),
        }
    }

    fn reduce(&mut self, action: CanvasAction) {
        match action {
            CanvasAction::EntityAdded { state } => {
                let kind = state.kind();
                self.state.entities_mut(kind).push(Versioned::new(state));
            }
            CanvasAction::EntityRemoved { entity } => {
                self.state
                    .entities_mut(entity.kind)
                    .retain(|e| e.id != entity.id);
                if self.state.selected_entity.as_ref() == Some(&entity) {
                    self.state.selected_entity = None;
                }
            }
            CanvasAction::EntitySelected { entity } => {
                self.state.selected_entity = entity;
            }
            CanvasAction::EntityIsEnabledChanged { entity, is_enabled } => {
                self.update_entity(&entity, |e| e.is_enabled = is_enabled);
            }
            CanvasAction::EntityIsLockedChanged { entity, is_locked } => {
                self.update_entity(&entity, |e| e.is_locked = is_locked);
            }
            CanvasAction::EntityOpacityChanged { entity, opacity } => {
                self.update_entity(&entity, |e| e.opacity = opacity.clamp(0.0, 1.0));
            }
            CanvasAction::EntityMoved { entity, position } => {
                self.update_entity(&entity, |e| e.position = position);
            }
            CanvasAction::ObjectAdded { entity, object } => {
                self.update_entity(&entity, |e| e.objects.push(object));
            }
            CanvasAction::ObjectReplaced { entity, object } => {
                self.update_entity(&entity, |e| {
                    if let Some(slot) = e.objects.iter_mut().find(|o| o.id() == object.id()) {
                        *slot = object;
                    }
                });
            }
            CanvasAction::ObjectsReplaced { entity, objects } => {
                self.update_entity(&entity, |e| e.objects = objects);
            }
            CanvasAction::ObjectRemoved { entity, object } => {
                self.update_entity(&entity, |e| e.objects.retain(|o| *o.id() != object));
            }
            CanvasAction::EntityReset { entity } => {
                self.update_entity(&entity, |e| e.objects.clear());
            }
            CanvasAction::ControlModelChanged { entity, model } => {
                self.update_entity(&entity, |e| {
                    if let EntityData::ControlLayer { model: slot, .. } = &mut e.data {
                        *slot = model;
                    }
                });
            }
            CanvasAction::FillChanged { entity, fill } => {
                self.update_entity(&entity, |e| match &mut e.data {
                    EntityData::RegionalGuidance { fill: slot }
                    | EntityData::InpaintMask { fill: slot } => *slot = fill,
                    _ => {}
                });
            }
            CanvasAction::BboxChanged { rect } => self.state.bbox = rect,
            CanvasAction::BrushWidthChanged { width } => self.settings.brush_width = width,
            CanvasAction::EraserWidthChanged { width } => self.settings.eraser_width = width,
            CanvasAction::ColorChanged { color } => self.settings.color = color,
            CanvasAction::ClipToBboxChanged { clip_to_bbox } => {
                self.settings.clip_to_bbox = clip_to_bbox;
            }
        }
    }
}

impl StateStore for MemoryStore {
    fn canvas_state(&self) -> CanvasState {
        self.state.clone()
    }

    fn settings(&self) -> CanvasSettings {
        self.settings.clone()
    }

    fn dispatch(&mut self, action: CanvasAction) {
        log::trace!("store: {action:?}");
        self.dispatched += 1;
        self.reduce(action);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::EntityKind;

    #[test]
    fn entity_updates_stamp_new_generations() {
        let mut store = MemoryStore::default();
        let entity = EntityState::new(EntityKind::RasterLayer);
        let identifier = entity.identifier();
        store.dispatch(CanvasAction::EntityAdded { state: entity });
        let before = store.state().entity(&identifier).map(Versioned::generation);

        store.dispatch(CanvasAction::EntityOpacityChanged {
            entity: identifier.clone(),
            opacity: 2.0,
        });
        let after = store.state().entity(&identifier);
        assert!(after.is_some_and(|e| Some(e.generation()) != before));
        assert!(after.is_some_and(|e| e.opacity == 1.0), "opacity is clamped");
    }

    #[test]
    fn untouched_entities_keep_their_snapshot() {
        let mut store = MemoryStore::default();
        let a = EntityState::new(EntityKind::RasterLayer);
        let b = EntityState::new(EntityKind::RasterLayer);
        let (a_id, b_id) = (a.identifier(), b.identifier());
        store.dispatch(CanvasAction::EntityAdded { state: a });
        store.dispatch(CanvasAction::EntityAdded { state: b });
        let b_before = store.state().entity(&b_id).cloned();

        store.dispatch(CanvasAction::EntityMoved {
            entity: a_id,
            position: Point::new(5.0, 5.0),
        });
        assert_eq!(store.state().entity(&b_id).cloned(), b_before);
    }

    #[test]
    fn removing_selected_entity_clears_selection() {
        let mut store = MemoryStore::default();
        let entity = EntityState::new(EntityKind::InpaintMask);
        let identifier = entity.identifier();
        store.dispatch(CanvasAction::EntityAdded { state: entity });
        store.dispatch(CanvasAction::EntitySelected {
            entity: Some(identifier.clone()),
        });
        store.dispatch(CanvasAction::EntityRemoved { entity: identifier });
        assert!(store.state().selected_entity.is_none());
        assert_eq!(store.dispatched(), 3);
    }

    #[test]
    fn unknown_entity_is_ignored() {
        let mut store = MemoryStore::default();
        let ghost = EntityState::new(EntityKind::RasterLayer).identifier();
        store.dispatch(CanvasAction::EntityReset { entity: ghost });
        assert!(store.state().raster_layers.is_empty());
    }
}
