// Copyright 2026 the Easel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The shared context handed to every canvas module.
//!
//! A [`CanvasContext`] carries what would otherwise be process-wide state:
//! the notification service, static configuration, the "active manager"
//! cursor and the liveness flag that late asynchronous callbacks check before
//! touching any node. The host creates one context per editor session and
//! passes it to [`CanvasManager::new`](crate::manager::CanvasManager::new).

use core::cell::Cell;
use core::fmt;
use std::rc::Rc;

use flo_binding::{BindRef, Binding, Bound, MutableBound, bind};

use crate::config::CanvasConfig;

/// Category of a user-facing notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    /// Neutral information.
    Info,
    /// A completed action.
    Success,
    /// A recoverable problem.
    Warning,
    /// A failed action.
    Error,
}

/// Toast-style notification service.
pub trait Notifier {
    /// Shows `message` to the user.
    fn notify(&self, kind: NotificationKind, message: &str);
}

/// A [`Notifier`] that forwards to the `log` facade.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, kind: NotificationKind, message: &str) {
        match kind {
            NotificationKind::Info | NotificationKind::Success => log::info!("{message}"),
            NotificationKind::Warning => log::warn!("{message}"),
            NotificationKind::Error => log::error!("{message}"),
        }
    }
}

/// A slash-separated path naming a module instance in log output, e.g.
/// `canvas:manager:1a2b/adapter:raster_layer:3c4d`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LogContext {
    path: String,
}

impl LogContext {
    /// Creates a root context.
    #[must_use]
    pub fn root(kind: &str, id: impl fmt::Display) -> Self {
        Self {
            path: format!("{kind}:{id}"),
        }
    }

    /// Creates a context nested under this one.
    #[must_use]
    pub fn child(&self, kind: &str, id: impl fmt::Display) -> Self {
        Self {
            path: format!("{}/{kind}:{id}", self.path),
        }
    }

    /// Returns the full path.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.path
    }
}

impl fmt::Display for LogContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

struct Inner {
    notifier: Rc<dyn Notifier>,
    config: CanvasConfig,
    active_manager: Binding<Option<String>>,
    alive: Cell<bool>,
}

/// Dependency-injected session context. Cheap to clone.
#[derive(Clone)]
pub struct CanvasContext {
    inner: Rc<Inner>,
}

impl fmt::Debug for CanvasContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CanvasContext")
            .field("config", &self.inner.config)
            .field("active_manager", &self.inner.active_manager.get())
            .field("alive", &self.inner.alive.get())
            .finish_non_exhaustive()
    }
}

impl Default for CanvasContext {
    fn default() -> Self {
        Self::new(Rc::new(LogNotifier), CanvasConfig::default())
    }
}

impl CanvasContext {
    /// Creates a live context.
    #[must_use]
    pub fn new(notifier: Rc<dyn Notifier>, config: CanvasConfig) -> Self {
        Self {
            inner: Rc::new(Inner {
                notifier,
                config,
                active_manager: bind(None),
                alive: Cell::new(true),
            }),
        }
    }

    /// Static configuration.
    #[must_use]
    pub fn config(&self) -> &CanvasConfig {
        &self.inner.config
    }

    /// Sends a user-facing notification.
    pub fn notify(&self, kind: NotificationKind, message: &str) {
        self.inner.notifier.notify(kind, message);
    }

    /// Id of the manager currently driving the canvas, if any.
    #[must_use]
    pub fn active_manager(&self) -> BindRef<Option<String>> {
        BindRef::from(self.inner.active_manager.clone())
    }

    pub(crate) fn set_active_manager(&self, id: Option<String>) {
        self.inner.active_manager.set(id);
    }

    /// Whether the session is still live. Late asynchronous results must be
    /// discarded once this returns `false`.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.inner.alive.get()
    }

    pub(crate) fn mark_dead(&self) {
        self.inner.alive.set(false);
    }
}
