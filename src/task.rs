//! Tagged messages: the shape shared by commands and events.
//!
//! On the wire a message is either a bare string (an operation with no
//! arguments) or an object with exactly one key, mapping the tag to its
//! parameter record:
//!
//! ```text
//! "present"
//! { "drawPoint": { "x": 3, "y": 4 } }
//! ```
//!
//! The shape is decided only by whether the value is a string. Everything
//! else about the parameters is opaque to the protocol layer.
//!
//! # Example
//!
//! ```
//! use canvaswire_client::task::{Point, Task};
//!
//! let bare = Task::bare("present");
//! assert_eq!(serde_json::to_string(&bare).unwrap(), r#""present""#);
//!
//! let draw = Task::with_params("drawPoint", &Point { x: 3, y: 4 }).unwrap();
//! assert_eq!(
//!     serde_json::to_string(&draw).unwrap(),
//!     r#"{"drawPoint":{"x":3,"y":4}}"#
//! );
//! ```

use serde::de::Error as _;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::{CanvasError, Result};

/// Parameter record of a tagged message.
pub type Params = Map<String, Value>;

/// One drawing or window operation queued for the host.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    /// Operation name, e.g. `"present"` or `"fillRect"`.
    pub tag: String,
    /// Parameters, absent for zero-argument operations.
    pub params: Option<Params>,
}

impl Task {
    /// A zero-argument operation, sent as a bare string.
    pub fn bare(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            params: None,
        }
    }

    /// An operation with a parameter record.
    ///
    /// # Errors
    ///
    /// Returns `CanvasError::Protocol` if `params` does not serialize to a
    /// JSON object.
    pub fn with_params<P: Serialize>(tag: impl Into<String>, params: &P) -> Result<Self> {
        let tag = tag.into();
        match serde_json::to_value(params)? {
            Value::Object(map) => Ok(Self {
                tag,
                params: Some(map),
            }),
            other => Err(CanvasError::Protocol(format!(
                "Parameters of '{}' must be an object, got {}",
                tag, other
            ))),
        }
    }

    /// Check the tag.
    #[inline]
    pub fn is(&self, tag: &str) -> bool {
        self.tag == tag
    }
}

impl Serialize for Task {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serialize_tagged(&self.tag, self.params.as_ref(), serializer)
    }
}

impl<'de> Deserialize<'de> for Task {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let (tag, params) = deserialize_tagged(deserializer)?;
        Ok(Self { tag, params })
    }
}

/// Write a tag and optional parameters in the bare-or-single-key shape.
pub(crate) fn serialize_tagged<S: Serializer>(
    tag: &str,
    params: Option<&Params>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match params {
        None => serializer.serialize_str(tag),
        Some(params) => {
            let mut map = serializer.serialize_map(Some(1))?;
            map.serialize_entry(tag, params)?;
            map.end()
        }
    }
}

/// Read the bare-or-single-key shape.
///
/// Anything other than a string or a one-key object whose value is an
/// object is rejected.
pub(crate) fn deserialize_tagged<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<(String, Option<Params>), D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(tag) => Ok((tag, None)),
        Value::Object(map) => {
            if map.len() != 1 {
                return Err(D::Error::custom(format!(
                    "tagged message must have exactly one key, found {}",
                    map.len()
                )));
            }
            let Some((tag, params)) = map.into_iter().next() else {
                return Err(D::Error::custom("tagged message is empty"));
            };
            match params {
                Value::Object(params) => Ok((tag, Some(params))),
                other => Err(D::Error::custom(format!(
                    "parameters of '{}' must be an object, got {}",
                    tag, other
                ))),
            }
        }
        other => Err(D::Error::custom(format!(
            "tagged message must be a string or an object, got {}",
            other
        ))),
    }
}

/// A point in window coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// An axis-aligned rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// An RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

/// How text is rasterized by `renderFont`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontRender {
    /// Fast, no antialiasing.
    Solid { color: Color },
    /// Antialiased against a background color.
    Shaded { color: Color, background: Color },
    /// Antialiased with alpha.
    Blended { color: Color },
}

/// Font style requested at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontStyle {
    Normal,
    Bold,
    Italic,
    Underline,
    Strikethrough,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bare_task_is_string() {
        let value = serde_json::to_value(Task::bare("clear")).unwrap();
        assert_eq!(value, json!("clear"));
    }

    #[test]
    fn test_param_task_is_single_key_object() {
        let task = Task::with_params("fillRect", &Rect::new(1, 2, 30, 40)).unwrap();
        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(
            value,
            json!({"fillRect": {"x": 1, "y": 2, "width": 30, "height": 40}})
        );
    }

    #[test]
    fn test_empty_params_keep_object_shape() {
        let task = Task {
            tag: "show".into(),
            params: Some(Params::new()),
        };
        assert_eq!(serde_json::to_value(&task).unwrap(), json!({"show": {}}));
    }

    #[test]
    fn test_with_params_rejects_non_object() {
        let result = Task::with_params("setTitle", &"not an object");
        assert!(matches!(result, Err(CanvasError::Protocol(_))));
    }

    #[test]
    fn test_deserialize_both_shapes() {
        let batch: Vec<Task> =
            serde_json::from_value(json!(["present", {"setScale": {"x": 2.0, "y": 2.0}}])).unwrap();
        assert_eq!(batch[0], Task::bare("present"));
        assert!(batch[1].is("setScale"));
        let params = batch[1].params.as_ref().unwrap();
        assert_eq!(params["x"], json!(2.0));
    }

    #[test]
    fn test_deserialize_rejects_bad_shapes() {
        for bad in [
            json!({"a": {}, "b": {}}),
            json!({}),
            json!({"a": 1}),
            json!(42),
            json!(null),
            json!(["present"]),
        ] {
            assert!(serde_json::from_value::<Task>(bad.clone()).is_err(), "{}", bad);
        }
    }

    #[test]
    fn test_font_render_wire_shape() {
        let render = FontRender::Shaded {
            color: Color::rgba(255, 255, 255, 255),
            background: Color::rgba(0, 0, 0, 255),
        };
        let value = serde_json::to_value(render).unwrap();
        assert_eq!(
            value,
            json!({"shaded": {
                "color": {"r": 255, "g": 255, "b": 255, "a": 255},
                "background": {"r": 0, "g": 0, "b": 0, "a": 255}
            }})
        );
        assert_eq!(serde_json::to_value(FontStyle::Bold).unwrap(), json!("bold"));
    }
}
