//! Layout module - schema-driven reads of native binary records.
//!
//! - [`StructSchema`] / [`FieldType`] describe packed little-endian layouts
//! - [`MemoryWindow`] abstracts where the bytes (and pointed-to strings) live
//! - [`EventDispatchTable`] picks a schema by the leading u32 tag

mod dispatch;
mod schema;
mod window;

pub use dispatch::{
    event_type, sdl_event_table, Dispatch, EventDispatchTable, SDL_EVENT_BUFFER_SIZE, TAG_SIZE,
};
pub use schema::{Field, FieldType, FieldValue, FlagWidth, Record, StructSchema, POINTER_WIDTH};
pub use window::{MemoryWindow, RawWindow, SliceWindow};
