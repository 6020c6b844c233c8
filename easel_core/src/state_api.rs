// Copyright 2026 the Easel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The gateway between the external store and the canvas.
//!
//! Every read of store state and every dispatch goes through [`StateApi`].
//! It also publishes the observable cursors consumers bind to. Cursors start
//! out [`Cursor::NotReady`] and only become [`Cursor::Ready`] once the
//! manager is initialized, so "no selection yet known" is never confused
//! with "nothing selected".

use core::fmt;

use flo_binding::{BindRef, Binding, Bound, MutableBound, bind, computed};
use serde::Serialize;

use crate::context::LogContext;
use crate::id::EntityIdentifier;
use crate::state::{CanvasSettings, CanvasState, EntityState, Rgba};
use crate::store::{CanvasAction, StateStore};
use crate::version::Versioned;

/// A value that is unknown until the manager is initialized.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Cursor<T> {
    /// Not populated yet.
    #[default]
    NotReady,
    /// Populated.
    Ready(T),
}

impl<T> Cursor<T> {
    /// The value, if populated.
    #[must_use]
    pub fn ready(&self) -> Option<&T> {
        match self {
            Self::NotReady => None,
            Self::Ready(value) => Some(value),
        }
    }

    /// Whether the value has been populated.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }
}

/// Debug snapshot of the state API.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StateApiRepr {
    /// Whether the cursors have been populated.
    pub ready: bool,
    /// Selected entity.
    pub selected: Option<EntityIdentifier>,
    /// Entity being transformed.
    pub transforming: Option<EntityIdentifier>,
    /// Current fill colour.
    pub current_fill: Option<Rgba>,
}

/// Owns the store and publishes bindings derived from it.
pub struct StateApi<S> {
    store: S,
    log: LogContext,
    selected_entity_identifier: Binding<Cursor<Option<EntityIdentifier>>>,
    selected_entity: Binding<Cursor<Option<Versioned<EntityState>>>>,
    settings: Binding<Cursor<CanvasSettings>>,
    current_fill: Binding<Cursor<Rgba>>,
    transforming_entity: Binding<Option<EntityIdentifier>>,
    is_transforming: BindRef<bool>,
    destroyed: bool,
}

impl<S: fmt::Debug> fmt::Debug for StateApi<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateApi")
            .field("store", &self.store)
            .field("log", &self.log)
            .field("selected", &self.selected_entity_identifier.get())
            .field("transforming", &self.transforming_entity.get())
            .field("destroyed", &self.destroyed)
            .finish_non_exhaustive()
    }
}

impl<S: StateStore> StateApi<S> {
    /// Wraps `store`. Cursors stay unpopulated until
    /// [`initialize`](Self::initialize).
    pub fn new(store: S, log: &LogContext) -> Self {
        let transforming_entity = bind(None::<EntityIdentifier>);
        let entity = transforming_entity.clone();
        let is_transforming = BindRef::from(computed(move || entity.get().is_some()));
        Self {
            store,
            log: log.child("state_api", "store"),
            selected_entity_identifier: bind(Cursor::NotReady),
            selected_entity: bind(Cursor::NotReady),
            settings: bind(Cursor::NotReady),
            current_fill: bind(Cursor::NotReady),
            transforming_entity,
            is_transforming,
            destroyed: false,
        }
    }

    /// Populates every cursor from the store.
    pub fn initialize(&mut self) {
        self.transforming_entity.set(None);
        let state = self.store.canvas_state();
        self.refresh(&state);
        log::debug!("{}: initialized", self.log);
    }

    /// Recomputes every cursor from `state` and the store's settings.
    /// Watchers only hear about values that changed.
    pub fn refresh(&self, state: &CanvasState) {
        if self.destroyed {
            return;
        }
        let settings = self.store.settings();
        let selected = state.selected().cloned();
        let fill = selected
            .as_ref()
            .and_then(|e| e.fill())
            .unwrap_or(settings.color);

        self.selected_entity_identifier
            .set(Cursor::Ready(state.selected_entity.clone()));
        self.selected_entity.set(Cursor::Ready(selected));
        self.settings.set(Cursor::Ready(settings));
        self.current_fill.set(Cursor::Ready(fill));
    }

    /// The current canvas snapshot.
    #[must_use]
    pub fn canvas_state(&self) -> CanvasState {
        self.store.canvas_state()
    }

    /// The current tool settings.
    #[must_use]
    pub fn settings(&self) -> CanvasSettings {
        self.store.settings()
    }

    /// The current snapshot of one entity.
    #[must_use]
    pub fn entity(&self, identifier: &EntityIdentifier) -> Option<Versioned<EntityState>> {
        self.store.canvas_state().entity(identifier).cloned()
    }

    /// Forwards `action` to the store. Ignored after destroy.
    pub fn dispatch(&mut self, action: CanvasAction) {
        if self.destroyed {
            log::warn!("{}: dropping {action:?} after destroy", self.log);
            return;
        }
        self.store.dispatch(action);
    }

    /// Selected entity identifier.
    #[must_use]
    pub fn selected_entity_identifier(&self) -> BindRef<Cursor<Option<EntityIdentifier>>> {
        BindRef::from(self.selected_entity_identifier.clone())
    }

    /// Selected entity snapshot.
    #[must_use]
    pub fn selected_entity(&self) -> BindRef<Cursor<Option<Versioned<EntityState>>>> {
        BindRef::from(self.selected_entity.clone())
    }

    /// Tool settings.
    #[must_use]
    pub fn settings_binding(&self) -> BindRef<Cursor<CanvasSettings>> {
        BindRef::from(self.settings.clone())
    }

    /// The colour new content will be painted in: the selected mask's fill,
    /// otherwise the brush colour.
    #[must_use]
    pub fn current_fill(&self) -> BindRef<Cursor<Rgba>> {
        BindRef::from(self.current_fill.clone())
    }

    /// The entity being transformed.
    #[must_use]
    pub fn transforming_entity(&self) -> BindRef<Option<EntityIdentifier>> {
        BindRef::from(self.transforming_entity.clone())
    }

    /// Whether any entity is being transformed.
    #[must_use]
    pub fn is_transforming(&self) -> BindRef<bool> {
        self.is_transforming.clone()
    }

    pub(crate) fn set_transforming(&self, entity: Option<EntityIdentifier>) {
        self.transforming_entity.set(entity);
    }

    /// Direct access to the store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Resets the transform cursor and stops refreshing. Idempotent.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.transforming_entity.set(None);
        self.destroyed = true;
        log::debug!("{}: destroyed", self.log);
    }

    /// Debug snapshot.
    #[must_use]
    pub fn repr(&self) -> StateApiRepr {
        let selected = self.selected_entity_identifier.get();
        StateApiRepr {
            ready: selected.is_ready(),
            selected: selected.ready().cloned().flatten(),
            transforming: self.transforming_entity.get(),
            current_fill: self.current_fill.get().ready().copied(),
        }
    }
}
