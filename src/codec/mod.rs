//! Codec module - serialization/deserialization for frame payloads.
//!
//! Every payload on the host stream is UTF-8 JSON, encoded with
//! [`JsonCodec`].
//!
//! # Design
//!
//! Codecs are implemented as marker structs with static methods rather than trait objects.
//!
//! # Example
//!
//! ```
//! use canvaswire_client::codec::JsonCodec;
//!
//! let encoded = JsonCodec::encode(&"present").unwrap();
//! assert_eq!(encoded, br#""present""#);
//! let decoded: String = JsonCodec::decode(&encoded).unwrap();
//! assert_eq!(decoded, "present");
//! ```

mod json;

pub use json::JsonCodec;
