// Copyright 2026 the Easel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! JSON exporter.
//!
//! [`export`] reads recorded bytes from a [`RecorderSink`](super::recorder::RecorderSink)
//! and writes them as a JSON array, one object per event, numbered in
//! recording order.

use std::io::{self, Write};

use serde_json::{Value, json};

use crate::recorder::decode;

/// Exports recorded events as a pretty-printed JSON array.
///
/// Each element has the shape
/// `{"seq": n, "name": "FilterTransition", "event": "filter_transition", "args": {...}}`.
pub fn export(bytes: &[u8], writer: &mut dyn Write) -> io::Result<()> {
    let mut events: Vec<Value> = Vec::new();

    for (seq, recorded) in decode(bytes).enumerate() {
        let mut value = serde_json::to_value(&recorded)?;
        if let Value::Object(map) = &mut value {
            map.insert("seq".to_owned(), json!(seq));
            map.insert("name".to_owned(), json!(recorded.name()));
        }
        events.push(value);
    }

    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::RecorderSink;
    use easel_core::id::{EntityId, EntityIdentifier, EntityKind};
    use easel_core::trace::{
        FilterPhase, FilterTransitionEvent, LifecycleEvent, LifecyclePhase, TraceSink,
    };

    #[test]
    fn export_produces_valid_json() {
        let mut rec = RecorderSink::new();
        rec.on_lifecycle(&LifecycleEvent {
            manager: "manager:1".to_owned(),
            phase: LifecyclePhase::Initialized,
        });
        rec.on_filter_transition(&FilterTransitionEvent {
            entity: EntityIdentifier::new(EntityKind::RasterLayer, EntityId::new("r")),
            from: FilterPhase::Idle,
            to: FilterPhase::Filtering,
        });

        let mut out = Vec::new();
        export(rec.as_bytes(), &mut out).unwrap();
        let parsed: Vec<Value> = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed.len(), 2);

        assert_eq!(parsed[0]["seq"], 0);
        assert_eq!(parsed[0]["event"], "lifecycle");
        assert_eq!(parsed[0]["args"]["manager"], "manager:1");

        assert_eq!(parsed[1]["name"], "FilterTransition");
        assert_eq!(parsed[1]["args"]["entity"]["id"], "r");
    }

    #[test]
    fn export_empty_recording() {
        let mut out = Vec::new();
        export(&[], &mut out).unwrap();
        let parsed: Vec<Value> = serde_json::from_slice(&out).unwrap();
        assert!(parsed.is_empty());
    }
}
