//! Struct schemas and the records read through them.
//!
//! A [`StructSchema`] is an ordered list of named fields packed back to back:
//! a field's offset is the sum of the widths of every field before it, and
//! there is no implicit alignment. Gaps the native layout leaves must be
//! spelled out with [`FieldType::Padding`].
//!
//! All multi-byte numbers are little endian.
//!
//! # Example
//!
//! ```
//! use canvaswire_client::layout::{FieldType, SliceWindow, StructSchema};
//!
//! let schema = StructSchema::new("Wheel", [
//!     ("windowID", FieldType::U32),
//!     ("x", FieldType::I32),
//!     ("y", FieldType::I32),
//! ]);
//! assert_eq!(schema.size(), 12);
//!
//! let mut buf = Vec::new();
//! buf.extend_from_slice(&7u32.to_le_bytes());
//! buf.extend_from_slice(&(-1i32).to_le_bytes());
//! buf.extend_from_slice(&2i32.to_le_bytes());
//!
//! let record = schema.read(&SliceWindow::new(&buf), 0).unwrap();
//! assert_eq!(record.get("y").and_then(|v| v.as_i64()), Some(2));
//! ```

use std::sync::Arc;

use bytes::Buf;
use serde_json::Value;

use super::window::MemoryWindow;
use crate::error::{CanvasError, Result};
use crate::task::Params;

/// Width of a native pointer in bytes.
pub const POINTER_WIDTH: usize = std::mem::size_of::<usize>();

/// Integer width backing a bit-flag field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagWidth {
    W8,
    W16,
    W32,
}

impl FlagWidth {
    fn bytes(self) -> usize {
        match self {
            FlagWidth::W8 => 1,
            FlagWidth::W16 => 2,
            FlagWidth::W32 => 4,
        }
    }
}

/// How a field's bytes are interpreted.
#[derive(Debug, Clone)]
pub enum FieldType {
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
    /// One byte, true only when it equals 1.
    Bool,
    /// `n` consecutive elements of the inner type.
    Array(Box<FieldType>, usize),
    /// A nested schema, read in place.
    Struct(Arc<StructSchema>),
    /// An integer decoded into named booleans, one per mask. A name is set
    /// when every bit of its mask is set.
    Flags {
        width: FlagWidth,
        masks: Vec<(String, u64)>,
    },
    /// A pointer to a NUL-terminated string in native memory.
    CString,
    /// `n` bytes of inline text, cut at the first NUL.
    FixedString(usize),
    /// `n` bytes that are skipped and do not appear in the record.
    Padding(usize),
}

impl FieldType {
    /// Fixed array of `len` elements.
    pub fn array(inner: FieldType, len: usize) -> Self {
        FieldType::Array(Box::new(inner), len)
    }

    /// Nested schema.
    pub fn nested(schema: StructSchema) -> Self {
        FieldType::Struct(Arc::new(schema))
    }

    /// Bit-flag field over an integer of the given width.
    pub fn flags<'a>(width: FlagWidth, masks: impl IntoIterator<Item = (&'a str, u64)>) -> Self {
        FieldType::Flags {
            width,
            masks: masks
                .into_iter()
                .map(|(name, mask)| (name.to_string(), mask))
                .collect(),
        }
    }

    /// Width in bytes.
    pub fn width(&self) -> usize {
        match self {
            FieldType::U8 | FieldType::I8 | FieldType::Bool => 1,
            FieldType::U16 | FieldType::I16 => 2,
            FieldType::U32 | FieldType::I32 | FieldType::F32 => 4,
            FieldType::U64 | FieldType::I64 | FieldType::F64 => 8,
            FieldType::Array(inner, len) => inner.width() * len,
            FieldType::Struct(schema) => schema.size(),
            FieldType::Flags { width, .. } => width.bytes(),
            FieldType::CString => POINTER_WIDTH,
            FieldType::FixedString(len) | FieldType::Padding(len) => *len,
        }
    }

    /// Read one value at `offset`.
    pub fn read(&self, window: &dyn MemoryWindow, offset: usize) -> Result<FieldValue> {
        let width = self.width();
        let mut src = window
            .bytes()
            .get(offset..offset + width)
            .ok_or_else(|| {
                CanvasError::Layout(format!(
                    "Field of {} bytes at offset {} overruns a {} byte buffer",
                    width,
                    offset,
                    window.bytes().len()
                ))
            })?;

        let value = match self {
            FieldType::U8 => FieldValue::Unsigned(src.get_u8().into()),
            FieldType::U16 => FieldValue::Unsigned(src.get_u16_le().into()),
            FieldType::U32 => FieldValue::Unsigned(src.get_u32_le().into()),
            FieldType::U64 => FieldValue::Unsigned(src.get_u64_le()),
            FieldType::I8 => FieldValue::Signed(src.get_i8().into()),
            FieldType::I16 => FieldValue::Signed(src.get_i16_le().into()),
            FieldType::I32 => FieldValue::Signed(src.get_i32_le().into()),
            FieldType::I64 => FieldValue::Signed(src.get_i64_le()),
            FieldType::F32 => FieldValue::Float(src.get_f32_le().into()),
            FieldType::F64 => FieldValue::Float(src.get_f64_le()),
            FieldType::Bool => FieldValue::Bool(src.get_u8() == 1),
            FieldType::Array(inner, len) => {
                let step = inner.width();
                let items = (0..*len)
                    .map(|i| inner.read(window, offset + i * step))
                    .collect::<Result<Vec<_>>>()?;
                FieldValue::Array(items)
            }
            FieldType::Struct(schema) => FieldValue::Struct(schema.read(window, offset)?),
            FieldType::Flags { width, masks } => {
                let bits = src.get_uint_le(width.bytes());
                FieldValue::Flags(
                    masks
                        .iter()
                        .map(|(name, mask)| (name.clone(), bits & mask == *mask))
                        .collect(),
                )
            }
            FieldType::CString => {
                let addr = src.get_uint_le(POINTER_WIDTH) as usize;
                FieldValue::String(window.read_c_string(addr)?)
            }
            FieldType::FixedString(len) => {
                let end = src.iter().position(|b| *b == 0).unwrap_or(*len);
                FieldValue::String(String::from_utf8_lossy(&src[..end]).into_owned())
            }
            FieldType::Padding(_) => FieldValue::Unsigned(0),
        };
        Ok(value)
    }
}

/// A named field at a fixed offset.
#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub ty: FieldType,
    pub offset: usize,
}

/// Ordered, packed field layout.
#[derive(Debug, Clone)]
pub struct StructSchema {
    name: String,
    fields: Vec<Field>,
    size: usize,
}

impl StructSchema {
    /// Lay out `fields` in order with no gaps.
    pub fn new<'a>(
        name: impl Into<String>,
        fields: impl IntoIterator<Item = (&'a str, FieldType)>,
    ) -> Self {
        let mut offset = 0;
        let fields = fields
            .into_iter()
            .map(|(name, ty)| {
                let field = Field {
                    name: name.to_string(),
                    offset,
                    ty,
                };
                offset += field.ty.width();
                field
            })
            .collect();
        Self {
            name: name.into(),
            fields,
            size: offset,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Total width in bytes.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Find a field by name.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Read a record whose first byte is at `base`.
    pub fn read(&self, window: &dyn MemoryWindow, base: usize) -> Result<Record> {
        let mut values = Vec::with_capacity(self.fields.len());
        for field in &self.fields {
            if matches!(field.ty, FieldType::Padding(_)) {
                continue;
            }
            let value = field.ty.read(window, base + field.offset)?;
            values.push((field.name.clone(), value));
        }
        Ok(Record {
            schema: self.name.clone(),
            fields: values,
        })
    }
}

/// A decoded field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Unsigned(u64),
    Signed(i64),
    Float(f64),
    Bool(bool),
    String(String),
    Array(Vec<FieldValue>),
    Struct(Record),
    /// Mask name and whether it was set, in declaration order.
    Flags(Vec<(String, bool)>),
}

impl FieldValue {
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            FieldValue::Unsigned(v) => Some(*v),
            FieldValue::Signed(v) => u64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Signed(v) => Some(*v),
            FieldValue::Unsigned(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Whether the named flag is set. `None` if this is not a flag field
    /// or has no such mask.
    pub fn flag(&self, name: &str) -> Option<bool> {
        match self {
            FieldValue::Flags(flags) => flags.iter().find(|(n, _)| n == name).map(|(_, set)| *set),
            _ => None,
        }
    }

    /// Convert to JSON. Non-finite floats become `null`.
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Unsigned(v) => Value::from(*v),
            FieldValue::Signed(v) => Value::from(*v),
            FieldValue::Float(v) => serde_json::Number::from_f64(*v)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            FieldValue::Bool(v) => Value::Bool(*v),
            FieldValue::String(s) => Value::String(s.clone()),
            FieldValue::Array(items) => {
                Value::Array(items.iter().map(FieldValue::to_json).collect())
            }
            FieldValue::Struct(record) => Value::Object(record.to_params()),
            FieldValue::Flags(flags) => Value::Object(
                flags
                    .iter()
                    .map(|(name, set)| (name.clone(), Value::Bool(*set)))
                    .collect(),
            ),
        }
    }
}

/// Field values read through one schema, in schema order.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub schema: String,
    pub fields: Vec<(String, FieldValue)>,
}

impl Record {
    /// Look up a field by name.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Convert to a JSON parameter record.
    pub fn to_params(&self) -> Params {
        self.fields
            .iter()
            .map(|(name, value)| (name.clone(), value.to_json()))
            .collect()
    }
}
