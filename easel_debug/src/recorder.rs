// Copyright 2026 the Easel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a
//! `Vec<u8>` as little-endian records. Strings are stored as a `u32` byte
//! length followed by UTF-8. [`decode`] reads them back as an iterator of
//! [`RecordedEvent`].

use easel_core::id::{EntityId, EntityIdentifier, EntityKind};
use easel_core::trace::{
    CompositeEvent, CompositeTarget, EntitySyncEvent, FilterPhase, FilterTransitionEvent,
    LifecycleEvent, LifecyclePhase, SyncStats, TraceSink,
};
use serde::Serialize;

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_LIFECYCLE: u8 = 1;
const TAG_ENTITY_SYNC: u8 = 2;
const TAG_ENTITY_DESTROYED: u8 = 3;
const TAG_FILTER_TRANSITION: u8 = 4;
const TAG_COMPOSITE: u8 = 5;

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug, Default)]
pub struct RecorderSink {
    buf: Vec<u8>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    // -- encoding helpers --------------------------------------------------

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_str(&mut self, s: &str) {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "ids and names are far shorter than u32::MAX bytes"
        )]
        self.write_u32(s.len() as u32);
        self.buf.extend_from_slice(s.as_bytes());
    }

    fn write_entity(&mut self, entity: &EntityIdentifier) {
        self.write_u8(match entity.kind {
            EntityKind::RasterLayer => 0,
            EntityKind::ControlLayer => 1,
            EntityKind::RegionalGuidance => 2,
            EntityKind::InpaintMask => 3,
        });
        self.write_str(entity.id.as_str());
    }

    fn write_filter_phase(&mut self, p: FilterPhase) {
        self.write_u8(match p {
            FilterPhase::Idle => 0,
            FilterPhase::Filtering => 1,
            FilterPhase::Processing => 2,
            FilterPhase::Previewing => 3,
        });
    }

    fn write_stats(&mut self, s: SyncStats) {
        self.write_u32(s.created);
        self.write_u32(s.updated);
        self.write_u32(s.skipped);
        self.write_u32(s.destroyed);
    }
}

impl TraceSink for RecorderSink {
    fn on_lifecycle(&mut self, e: &LifecycleEvent) {
        self.write_u8(TAG_LIFECYCLE);
        self.write_str(&e.manager);
        self.write_u8(match e.phase {
            LifecyclePhase::Initialized => 0,
            LifecyclePhase::Destroyed => 1,
        });
    }

    fn on_entity_sync(&mut self, e: &EntitySyncEvent) {
        self.write_u8(TAG_ENTITY_SYNC);
        self.write_entity(&e.entity);
        self.write_u8(u8::from(e.adapter_created));
        self.write_stats(e.stats);
    }

    fn on_entity_destroyed(&mut self, entity: &EntityIdentifier) {
        self.write_u8(TAG_ENTITY_DESTROYED);
        self.write_entity(entity);
    }

    fn on_filter_transition(&mut self, e: &FilterTransitionEvent) {
        self.write_u8(TAG_FILTER_TRANSITION);
        self.write_entity(&e.entity);
        self.write_filter_phase(e.from);
        self.write_filter_phase(e.to);
    }

    fn on_composite(&mut self, e: &CompositeEvent) {
        self.write_u8(TAG_COMPOSITE);
        self.write_u8(match e.target {
            CompositeTarget::RasterLayers => 0,
            CompositeTarget::InpaintMasks => 1,
            CompositeTarget::Entity => 2,
        });
        self.write_u32(e.width);
        self.write_u32(e.height);
        self.write_u32(e.entities);
        self.write_u32(e.cache_hits);
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// A decoded event from a binary recording.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", content = "args", rename_all = "snake_case")]
pub enum RecordedEvent {
    /// A [`LifecycleEvent`].
    Lifecycle(LifecycleEvent),
    /// An [`EntitySyncEvent`].
    EntitySync(EntitySyncEvent),
    /// An adapter was destroyed.
    EntityDestroyed(EntityIdentifier),
    /// A [`FilterTransitionEvent`].
    FilterTransition(FilterTransitionEvent),
    /// A [`CompositeEvent`].
    Composite(CompositeEvent),
}

impl RecordedEvent {
    /// Short event name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Lifecycle(_) => "Lifecycle",
            Self::EntitySync(_) => "EntitySync",
            Self::EntityDestroyed(_) => "EntityDestroyed",
            Self::FilterTransition(_) => "FilterTransition",
            Self::Composite(_) => "Composite",
        }
    }
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`RecordedEvent`].
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Iterator over decoded events.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn read_u8(&mut self) -> Option<u8> {
        if self.remaining() < 1 {
            return None;
        }
        let v = self.data[self.pos];
        self.pos += 1;
        Some(v)
    }

    fn read_u32(&mut self) -> Option<u32> {
        if self.remaining() < 4 {
            return None;
        }
        let v = u32::from_le_bytes(self.data[self.pos..self.pos + 4].try_into().ok()?);
        self.pos += 4;
        Some(v)
    }

    fn read_string(&mut self) -> Option<String> {
        let len = usize::try_from(self.read_u32()?).ok()?;
        if self.remaining() < len {
            return None;
        }
        let s = core::str::from_utf8(&self.data[self.pos..self.pos + len]).ok()?;
        self.pos += len;
        Some(s.to_owned())
    }

    fn read_entity(&mut self) -> Option<EntityIdentifier> {
        let kind = match self.read_u8()? {
            0 => EntityKind::RasterLayer,
            1 => EntityKind::ControlLayer,
            2 => EntityKind::RegionalGuidance,
            _ => EntityKind::InpaintMask,
        };
        Some(EntityIdentifier::new(kind, EntityId::new(self.read_string()?)))
    }

    fn read_filter_phase(&mut self) -> Option<FilterPhase> {
        Some(match self.read_u8()? {
            0 => FilterPhase::Idle,
            1 => FilterPhase::Filtering,
            2 => FilterPhase::Processing,
            _ => FilterPhase::Previewing,
        })
    }

    fn read_stats(&mut self) -> Option<SyncStats> {
        Some(SyncStats {
            created: self.read_u32()?,
            updated: self.read_u32()?,
            skipped: self.read_u32()?,
            destroyed: self.read_u32()?,
        })
    }

    fn decode_lifecycle(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Lifecycle(LifecycleEvent {
            manager: self.read_string()?,
            phase: match self.read_u8()? {
                0 => LifecyclePhase::Initialized,
                _ => LifecyclePhase::Destroyed,
            },
        }))
    }

    fn decode_entity_sync(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::EntitySync(EntitySyncEvent {
            entity: self.read_entity()?,
            adapter_created: self.read_u8()? != 0,
            stats: self.read_stats()?,
        }))
    }

    fn decode_filter_transition(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::FilterTransition(FilterTransitionEvent {
            entity: self.read_entity()?,
            from: self.read_filter_phase()?,
            to: self.read_filter_phase()?,
        }))
    }

    fn decode_composite(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Composite(CompositeEvent {
            target: match self.read_u8()? {
                0 => CompositeTarget::RasterLayers,
                1 => CompositeTarget::InpaintMasks,
                _ => CompositeTarget::Entity,
            },
            width: self.read_u32()?,
            height: self.read_u32()?,
            entities: self.read_u32()?,
            cache_hits: self.read_u32()?,
        }))
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = RecordedEvent;

    fn next(&mut self) -> Option<Self::Item> {
        match self.read_u8()? {
            TAG_LIFECYCLE => self.decode_lifecycle(),
            TAG_ENTITY_SYNC => self.decode_entity_sync(),
            TAG_ENTITY_DESTROYED => self.read_entity().map(RecordedEvent::EntityDestroyed),
            TAG_FILTER_TRANSITION => self.decode_filter_transition(),
            TAG_COMPOSITE => self.decode_composite(),
            _ => None, // unknown tag → stop iteration
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn control_layer() -> EntityIdentifier {
        EntityIdentifier::new(EntityKind::ControlLayer, EntityId::new("control_layer:abc"))
    }

    #[test]
    fn filter_session_decodes_in_order() {
        let mut rec = RecorderSink::new();
        rec.on_lifecycle(&LifecycleEvent {
            manager: "manager:1".to_owned(),
            phase: LifecyclePhase::Initialized,
        });
        rec.on_entity_sync(&EntitySyncEvent {
            entity: control_layer(),
            adapter_created: true,
            stats: SyncStats {
                created: 2,
                ..SyncStats::default()
            },
        });
        rec.on_filter_transition(&FilterTransitionEvent {
            entity: control_layer(),
            from: FilterPhase::Processing,
            to: FilterPhase::Previewing,
        });
        rec.on_entity_destroyed(&control_layer());

        let events: Vec<_> = decode(rec.as_bytes()).collect();
        assert_eq!(events.len(), 4);
        match &events[1] {
            RecordedEvent::EntitySync(e) => {
                assert_eq!(e.entity, control_layer());
                assert!(e.adapter_created);
                assert_eq!(e.stats.created, 2);
            }
            other => panic!("expected EntitySync, got {other:?}"),
        }
        match &events[2] {
            RecordedEvent::FilterTransition(e) => {
                assert_eq!(e.from, FilterPhase::Processing);
                assert_eq!(e.to, FilterPhase::Previewing);
            }
            other => panic!("expected FilterTransition, got {other:?}"),
        }
        assert_eq!(events[3], RecordedEvent::EntityDestroyed(control_layer()));
    }

    #[test]
    fn composite_keeps_counts() {
        let mut rec = RecorderSink::new();
        let orig = CompositeEvent {
            target: CompositeTarget::InpaintMasks,
            width: 512,
            height: 768,
            entities: 3,
            cache_hits: 2,
        };
        rec.on_composite(&orig);
        let events: Vec<_> = decode(rec.as_bytes()).collect();
        assert_eq!(events, vec![RecordedEvent::Composite(orig)]);
    }

    #[test]
    fn truncated_record_stops_iteration() {
        let mut rec = RecorderSink::new();
        rec.on_entity_destroyed(&control_layer());
        rec.on_entity_destroyed(&control_layer());
        let bytes = rec.into_bytes();
        let events: Vec<_> = decode(&bytes[..bytes.len() - 1]).collect();
        assert_eq!(events.len(), 1, "the partial second record is dropped");
    }

    #[test]
    fn records_a_manager_session() {
        use std::cell::RefCell;
        use std::rc::Rc;

        use easel_core::context::CanvasContext;
        use easel_core::filter::NullProcessor;
        use easel_core::manager::CanvasManager;
        use easel_core::scene::SceneGraph;
        use easel_core::state::EntityState;
        use easel_core::store::{CanvasAction, MemoryStore};

        let rec = Rc::new(RefCell::new(RecorderSink::new()));
        let mut manager = CanvasManager::new(
            CanvasContext::default(),
            MemoryStore::default(),
            SceneGraph::new(),
            NullProcessor,
        );
        manager.set_trace_sink(Rc::clone(&rec));
        manager.initialize();
        let layer = EntityState::new(EntityKind::RasterLayer);
        let identifier = layer.identifier();
        manager.dispatch(CanvasAction::EntityAdded { state: layer });
        manager.destroy();

        let events: Vec<_> = decode(rec.borrow().as_bytes()).collect();
        let names: Vec<_> = events.iter().map(RecordedEvent::name).collect();
        assert_eq!(
            names,
            vec!["Lifecycle", "EntitySync", "EntityDestroyed", "Lifecycle"]
        );
        assert_eq!(events[2], RecordedEvent::EntityDestroyed(identifier));
    }

    #[test]
    fn empty_buffer_decodes_to_nothing() {
        let events: Vec<_> = decode(&[]).collect();
        assert!(events.is_empty(), "no bytes, no events");
    }
}
