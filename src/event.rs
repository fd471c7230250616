//! Events and the demultiplexer that produces them.
//!
//! Events arrive either as JSON batches over the host stream or as native
//! binary buffers read through an [`EventDispatchTable`]. Both end up as the
//! same [`Event`]: a kind plus an optional parameter record.
//!
//! # Example
//!
//! ```
//! use canvaswire_client::event::EventDemux;
//!
//! let batch = br#"["quit", {"mouse_wheel": {"x": 0, "y": -1}}]"#;
//! let events = EventDemux::decode_batch(batch).unwrap();
//! assert_eq!(events.len(), 2);
//! assert!(events[0].is("quit"));
//! assert_eq!(events[1].get("y"), Some(&serde_json::json!(-1)));
//! ```

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::codec::JsonCodec;
use crate::error::Result;
use crate::layout::{sdl_event_table, Dispatch, EventDispatchTable, MemoryWindow};
use crate::task::{deserialize_tagged, serialize_tagged, Params};

/// Kind of the synthetic per-cycle event.
pub const DRAW: &str = "draw";

/// Kind given to native records whose tag is not in the dispatch table.
pub const UNKNOWN: &str = "unknown";

/// An input or lifecycle event.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Event kind, e.g. `"key_down"`.
    pub kind: String,
    /// Event fields, absent for bare events.
    pub params: Option<Params>,
}

impl Event {
    pub fn new(kind: impl Into<String>, params: Option<Params>) -> Self {
        Self {
            kind: kind.into(),
            params,
        }
    }

    /// The synthetic tick yielded once per cycle. Carries no parameters.
    pub fn draw() -> Self {
        Self::new(DRAW, None)
    }

    #[inline]
    pub fn is(&self, kind: &str) -> bool {
        self.kind == kind
    }

    #[inline]
    pub fn is_draw(&self) -> bool {
        self.is(DRAW)
    }

    #[inline]
    pub fn is_quit(&self) -> bool {
        self.is("quit")
    }

    /// Look up one parameter.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.params.as_ref().and_then(|p| p.get(field))
    }

    /// Build an event from a dispatch result.
    pub fn from_dispatch(dispatch: Dispatch<'_>) -> Self {
        match dispatch {
            Dispatch::Recognized { name, record, .. } => Self::new(name, Some(record.to_params())),
            Dispatch::Unrecognized { tag } => {
                let mut params = Params::new();
                params.insert("type".to_string(), Value::from(tag));
                Self::new(UNKNOWN, Some(params))
            }
        }
    }
}

impl Serialize for Event {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serialize_tagged(&self.kind, self.params.as_ref(), serializer)
    }
}

impl<'de> Deserialize<'de> for Event {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let (kind, params) = deserialize_tagged(deserializer)?;
        Ok(Self { kind, params })
    }
}

/// Turns raw event payloads into [`Event`]s.
#[derive(Debug, Clone)]
pub struct EventDemux {
    table: EventDispatchTable,
}

impl Default for EventDemux {
    fn default() -> Self {
        Self::new(sdl_event_table())
    }
}

impl EventDemux {
    /// Demultiplexer for native buffers laid out per `table`.
    pub fn new(table: EventDispatchTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &EventDispatchTable {
        &self.table
    }

    /// Size of the buffer native code should fill per poll.
    pub fn buffer_size(&self) -> usize {
        self.table.buffer_size()
    }

    /// Decode a JSON event batch, one event per element, in order.
    pub fn decode_batch(payload: &[u8]) -> Result<Vec<Event>> {
        JsonCodec::decode(payload)
    }

    /// Decode one native buffer.
    pub fn decode_native(&self, window: &dyn MemoryWindow) -> Result<Event> {
        let dispatch = self.table.dispatch(window)?;
        if let Dispatch::Unrecognized { tag } = dispatch {
            tracing::debug!(tag, "Native event with unmapped tag");
        }
        Ok(Event::from_dispatch(dispatch))
    }
}
