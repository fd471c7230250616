//! Tag dispatch over fixed-size native event buffers.
//!
//! A native event buffer starts with a u32 tag (LE) naming the record kind.
//! The table maps each known tag to a name and the schema of the bytes
//! that follow the tag. Unknown tags are reported as such; no schema is
//! ever guessed.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Buf;

use super::schema::{FieldType, Record, StructSchema};
use super::window::{MemoryWindow, SliceWindow};
use crate::error::{CanvasError, Result};

/// Size of the leading tag in bytes.
pub const TAG_SIZE: usize = 4;

/// Size of one native event buffer in the SDL table.
pub const SDL_EVENT_BUFFER_SIZE: usize = 56;

/// SDL event tags.
pub mod event_type {
    pub const QUIT: u32 = 0x100;
    pub const APP_TERMINATING: u32 = 0x101;
    pub const APP_LOW_MEMORY: u32 = 0x102;
    pub const APP_WILL_ENTER_BACKGROUND: u32 = 0x103;
    pub const APP_DID_ENTER_BACKGROUND: u32 = 0x104;
    pub const APP_WILL_ENTER_FOREGROUND: u32 = 0x105;
    pub const APP_DID_ENTER_FOREGROUND: u32 = 0x106;
    pub const WINDOW_EVENT: u32 = 0x200;
    pub const KEY_DOWN: u32 = 0x300;
    pub const KEY_UP: u32 = 0x301;
    pub const TEXT_EDITING: u32 = 0x302;
    pub const TEXT_INPUT: u32 = 0x303;
    pub const MOUSE_MOTION: u32 = 0x400;
    pub const MOUSE_BUTTON_DOWN: u32 = 0x401;
    pub const MOUSE_BUTTON_UP: u32 = 0x402;
    pub const MOUSE_WHEEL: u32 = 0x403;
    pub const AUDIO_DEVICE_ADDED: u32 = 0x1100;
    pub const AUDIO_DEVICE_REMOVED: u32 = 0x1101;
    pub const USER: u32 = 0x8000;
}

/// Result of dispatching one buffer.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch<'t> {
    /// The tag is in the table and the record was read.
    Recognized {
        tag: u32,
        name: &'t str,
        record: Record,
    },
    /// The tag is not in the table.
    Unrecognized { tag: u32 },
}

#[derive(Debug, Clone)]
struct Entry {
    name: String,
    schema: Arc<StructSchema>,
}

/// Maps tags to record schemas.
#[derive(Debug, Clone, Default)]
pub struct EventDispatchTable {
    entries: HashMap<u32, Entry>,
    min_buffer_size: usize,
}

impl EventDispatchTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table whose buffers are at least `size` bytes, for native
    /// unions wider than any registered schema.
    pub fn with_buffer_size(size: usize) -> Self {
        Self {
            entries: HashMap::new(),
            min_buffer_size: size,
        }
    }

    /// Register the schema for `tag`. The schema describes the bytes after
    /// the tag. Re-registering a tag replaces it.
    pub fn register(&mut self, tag: u32, name: impl Into<String>, schema: Arc<StructSchema>) {
        self.entries.insert(
            tag,
            Entry {
                name: name.into(),
                schema,
            },
        );
    }

    /// Bytes needed to hold any record in the table, tag included.
    pub fn buffer_size(&self) -> usize {
        self.entries
            .values()
            .map(|e| TAG_SIZE + e.schema.size())
            .max()
            .unwrap_or(TAG_SIZE)
            .max(self.min_buffer_size)
    }

    /// Name registered for `tag`.
    pub fn name(&self, tag: u32) -> Option<&str> {
        self.entries.get(&tag).map(|e| e.name.as_str())
    }

    pub fn contains(&self, tag: u32) -> bool {
        self.entries.contains_key(&tag)
    }

    /// Read the tag at offset 0 and the matching record from offset 4.
    pub fn dispatch(&self, window: &dyn MemoryWindow) -> Result<Dispatch<'_>> {
        let mut head = window.bytes().get(..TAG_SIZE).ok_or_else(|| {
            CanvasError::Layout(format!(
                "Event buffer of {} bytes has no room for a tag",
                window.bytes().len()
            ))
        })?;
        let tag = head.get_u32_le();

        let Some(entry) = self.entries.get(&tag) else {
            tracing::trace!(tag, "Unrecognized event tag");
            return Ok(Dispatch::Unrecognized { tag });
        };

        let record = entry.schema.read(window, TAG_SIZE)?;
        Ok(Dispatch::Recognized {
            tag,
            name: &entry.name,
            record,
        })
    }

    /// Dispatch a buffer that holds no pointer fields.
    pub fn dispatch_bytes(&self, buf: &[u8]) -> Result<Dispatch<'_>> {
        self.dispatch(&SliceWindow::new(buf))
    }
}

/// The SDL2 event table.
///
/// Every record starts with its timestamp, since the tag has already been
/// consumed.
pub fn sdl_event_table() -> EventDispatchTable {
    use event_type::*;

    let common = Arc::new(StructSchema::new("CommonEvent", [("timestamp", FieldType::U32)]));

    let window = Arc::new(StructSchema::new(
        "WindowEvent",
        [
            ("timestamp", FieldType::U32),
            ("windowID", FieldType::U32),
            ("event", FieldType::U8),
            ("padding", FieldType::Padding(3)),
            ("data1", FieldType::I32),
            ("data2", FieldType::I32),
        ],
    ));

    let keysym = StructSchema::new(
        "Keysym",
        [
            ("scancode", FieldType::U32),
            ("sym", FieldType::U32),
            ("mod", FieldType::U16),
            ("unicode", FieldType::U32),
        ],
    );
    let keyboard = Arc::new(StructSchema::new(
        "KeyboardEvent",
        [
            ("timestamp", FieldType::U32),
            ("windowID", FieldType::U32),
            ("state", FieldType::U8),
            ("repeat", FieldType::U8),
            ("padding", FieldType::Padding(2)),
            ("keysym", FieldType::nested(keysym)),
        ],
    ));

    let text_editing = Arc::new(StructSchema::new(
        "TextEditingEvent",
        [
            ("timestamp", FieldType::U32),
            ("windowID", FieldType::U32),
            ("text", FieldType::CString),
            ("start", FieldType::I32),
            ("length", FieldType::I32),
        ],
    ));

    let text_input = Arc::new(StructSchema::new(
        "TextInputEvent",
        [
            ("timestamp", FieldType::U32),
            ("windowID", FieldType::U32),
            ("text", FieldType::CString),
        ],
    ));

    let mouse_motion = Arc::new(StructSchema::new(
        "MouseMotionEvent",
        [
            ("timestamp", FieldType::U32),
            ("windowID", FieldType::U32),
            ("which", FieldType::U32),
            ("state", FieldType::U32),
            ("x", FieldType::I32),
            ("y", FieldType::I32),
            ("xrel", FieldType::I32),
            ("yrel", FieldType::I32),
        ],
    ));

    let mouse_button = Arc::new(StructSchema::new(
        "MouseButtonEvent",
        [
            ("timestamp", FieldType::U32),
            ("windowID", FieldType::U32),
            ("which", FieldType::U32),
            ("button", FieldType::U8),
            ("state", FieldType::U8),
            ("padding", FieldType::Padding(2)),
            ("x", FieldType::I32),
            ("y", FieldType::I32),
        ],
    ));

    let mouse_wheel = Arc::new(StructSchema::new(
        "MouseWheelEvent",
        [
            ("timestamp", FieldType::U32),
            ("windowID", FieldType::U32),
            ("which", FieldType::U32),
            ("x", FieldType::I32),
            ("y", FieldType::I32),
        ],
    ));

    let audio_device = Arc::new(StructSchema::new(
        "AudioDeviceEvent",
        [
            ("timestamp", FieldType::U32),
            ("which", FieldType::U32),
            ("event", FieldType::U8),
            ("padding", FieldType::Padding(3)),
            ("data1", FieldType::I32),
            ("data2", FieldType::I32),
        ],
    ));

    let mut table = EventDispatchTable::with_buffer_size(SDL_EVENT_BUFFER_SIZE);
    table.register(QUIT, "quit", common.clone());
    table.register(APP_TERMINATING, "app_terminating", common.clone());
    table.register(APP_LOW_MEMORY, "app_low_memory", common.clone());
    table.register(APP_WILL_ENTER_BACKGROUND, "app_will_enter_background", common.clone());
    table.register(APP_DID_ENTER_BACKGROUND, "app_did_enter_background", common.clone());
    table.register(APP_WILL_ENTER_FOREGROUND, "app_will_enter_foreground", common.clone());
    table.register(APP_DID_ENTER_FOREGROUND, "app_did_enter_foreground", common.clone());
    table.register(WINDOW_EVENT, "window_event", window);
    table.register(KEY_DOWN, "key_down", keyboard.clone());
    table.register(KEY_UP, "key_up", keyboard);
    table.register(TEXT_EDITING, "text_editing", text_editing);
    table.register(TEXT_INPUT, "text_input", text_input);
    table.register(MOUSE_MOTION, "mouse_motion", mouse_motion);
    table.register(MOUSE_BUTTON_DOWN, "mouse_button_down", mouse_button.clone());
    table.register(MOUSE_BUTTON_UP, "mouse_button_up", mouse_button);
    table.register(MOUSE_WHEEL, "mouse_wheel", mouse_wheel);
    table.register(AUDIO_DEVICE_ADDED, "audio_device_added", audio_device.clone());
    table.register(AUDIO_DEVICE_REMOVED, "audio_device_removed", audio_device);
    table.register(USER, "user", common);
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{FieldValue, RawWindow};
    use std::ffi::CString;

    fn buffer(tag: u32, body: &[u8]) -> [u8; SDL_EVENT_BUFFER_SIZE] {
        let mut buf = [0u8; SDL_EVENT_BUFFER_SIZE];
        buf[..4].copy_from_slice(&tag.to_le_bytes());
        buf[4..4 + body.len()].copy_from_slice(body);
        buf
    }

    fn le(values: &[i32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    #[test]
    fn test_sdl_buffer_size() {
        assert_eq!(sdl_event_table().buffer_size(), 56);
    }

    #[test]
    fn test_buffer_size_is_widest_schema() {
        let mut table = EventDispatchTable::new();
        assert_eq!(table.buffer_size(), TAG_SIZE);
        table.register(1, "small", Arc::new(StructSchema::new("S", [("a", FieldType::U8)])));
        table.register(2, "big", Arc::new(StructSchema::new("B", [("a", FieldType::U64)])));
        assert_eq!(table.buffer_size(), 12);
    }

    #[test]
    fn test_mouse_motion_record() {
        // timestamp, windowID, which, state, x, y, xrel, yrel
        let body = le(&[1000, 1, 0, 1, 10, 20, -1, 2]);
        let buf = buffer(event_type::MOUSE_MOTION, &body);

        let table = sdl_event_table();
        let Dispatch::Recognized { tag, name, record } = table.dispatch_bytes(&buf).unwrap() else {
            panic!("expected a recognized record");
        };
        assert_eq!(tag, 0x400);
        assert_eq!(name, "mouse_motion");
        assert_eq!(record.schema, "MouseMotionEvent");

        let values: Vec<i64> = ["timestamp", "windowID", "which", "state", "x", "y", "xrel", "yrel"]
            .iter()
            .map(|f| record.get(f).and_then(FieldValue::as_i64).unwrap())
            .collect();
        assert_eq!(values, [1000, 1, 0, 1, 10, 20, -1, 2]);
    }

    #[test]
    fn test_keyboard_record_reads_nested_keysym() {
        let mut body = le(&[5, 2]);
        body.extend_from_slice(&[1, 0, 0, 0]); // state, repeat, padding
        body.extend_from_slice(&44u32.to_le_bytes());
        body.extend_from_slice(&32u32.to_le_bytes());
        body.extend_from_slice(&1u16.to_le_bytes());
        let buf = buffer(event_type::KEY_DOWN, &body);

        let table = sdl_event_table();
        let Dispatch::Recognized { name, record, .. } = table.dispatch_bytes(&buf).unwrap() else {
            panic!("expected a recognized record");
        };
        assert_eq!(name, "key_down");
        assert_eq!(record.get("state").and_then(FieldValue::as_u64), Some(1));
        let params = record.to_params();
        assert_eq!(params["keysym"]["scancode"], 44);
        assert_eq!(params["keysym"]["sym"], 32);
        assert_eq!(params["keysym"]["mod"], 1);
    }

    #[test]
    fn test_window_event_skips_padding() {
        let mut body = le(&[7, 3]);
        body.extend_from_slice(&[5, 0xee, 0xee, 0xee]);
        body.extend(le(&[800, 600]));
        let buf = buffer(event_type::WINDOW_EVENT, &body);

        let table = sdl_event_table();
        let Dispatch::Recognized { record, .. } = table.dispatch_bytes(&buf).unwrap() else {
            panic!("expected a recognized record");
        };
        let names: Vec<&str> = record.fields.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["timestamp", "windowID", "event", "data1", "data2"]);
        assert_eq!(record.get("data1").and_then(FieldValue::as_i64), Some(800));
    }

    #[test]
    fn test_unknown_tag_is_unrecognized() {
        let buf = buffer(0x7777, &[1, 2, 3]);
        let table = sdl_event_table();
        assert_eq!(
            table.dispatch_bytes(&buf).unwrap(),
            Dispatch::Unrecognized { tag: 0x7777 }
        );
        assert!(!table.contains(0x7777));
    }

    #[test]
    fn test_short_buffer_is_layout_error() {
        let table = sdl_event_table();
        assert!(matches!(
            table.dispatch_bytes(&[0, 1]),
            Err(CanvasError::Layout(_))
        ));
    }

    #[test]
    fn test_text_input_follows_pointer() {
        let text = CString::new("ą").unwrap();
        let mut body = le(&[9, 1]);
        body.extend_from_slice(&(text.as_ptr() as usize).to_le_bytes());
        let buf = buffer(event_type::TEXT_INPUT, &body);

        let table = sdl_event_table();
        let window = unsafe { RawWindow::new(&buf) };
        let Dispatch::Recognized { record, .. } = table.dispatch(&window).unwrap() else {
            panic!("expected a recognized record");
        };
        assert_eq!(record.get("text").and_then(FieldValue::as_str), Some("ą"));

        // Without a raw window the pointer cannot be followed.
        assert!(table.dispatch_bytes(&buf).is_err());
    }
}
