// Copyright 2026 the Easel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable event printing.

use std::io::Write;

use easel_core::id::EntityIdentifier;
use easel_core::trace::{
    CompositeEvent, EntitySyncEvent, FilterTransitionEvent, LifecycleEvent, TraceSink,
};

/// A [`TraceSink`] that writes one line per event.
///
/// Write errors are ignored; a diagnostics sink must never disturb the
/// canvas.
#[derive(Debug)]
pub struct PrettyPrintSink<W> {
    out: W,
    quiet_syncs: bool,
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink writing to `out`.
    pub fn new(out: W) -> Self {
        Self {
            out,
            quiet_syncs: false,
        }
    }

    /// Suppresses sync events that only skipped renderers.
    #[must_use]
    pub fn quiet_syncs(mut self, quiet: bool) -> Self {
        self.quiet_syncs = quiet;
        self
    }

    /// Consumes the sink and returns the writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_lifecycle(&mut self, e: &LifecycleEvent) {
        let _ = writeln!(self.out, "[lifecycle] {} {:?}", e.manager, e.phase);
    }

    fn on_entity_sync(&mut self, e: &EntitySyncEvent) {
        if self.quiet_syncs && !e.adapter_created && !e.stats.changed() {
            return;
        }
        let s = e.stats;
        let _ = writeln!(
            self.out,
            "[sync] {}{} +{} ~{} ={} -{}",
            e.entity,
            if e.adapter_created { " (new)" } else { "" },
            s.created,
            s.updated,
            s.skipped,
            s.destroyed,
        );
    }

    fn on_entity_destroyed(&mut self, entity: &EntityIdentifier) {
        let _ = writeln!(self.out, "[destroy] {entity}");
    }

    fn on_filter_transition(&mut self, e: &FilterTransitionEvent) {
        let _ = writeln!(self.out, "[filter] {} {:?} -> {:?}", e.entity, e.from, e.to);
    }

    fn on_composite(&mut self, e: &CompositeEvent) {
        let _ = writeln!(
            self.out,
            "[composite] {:?} {}x{} entities={} cached={}",
            e.target, e.width, e.height, e.entities, e.cache_hits
        );
    }
}
