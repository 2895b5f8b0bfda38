//! Schema-driven binary encoder.
//!
//! A [`Schema`] graph describes the shape of a [`Value`]; [`serialize`]
//! turns the pair into a compact little-endian byte sequence that a decoder
//! holding the same schema can read back without any other context.

mod array;
pub mod buffer;
pub mod error;
pub mod primitives;
mod record;
pub mod resolver;
pub mod schema;
pub mod serialization;
pub mod types;
pub mod value;

pub use buffer::WriteBuffer;
pub use error::{EncodeError, SchemaError};
pub use resolver::{Encoder, resolve};
pub use schema::{Field, FieldLayout, Placement, Primitive, RecordLayout, RecordSchema, Schema, SchemaKind};
pub use serialization::{EncodeConfig, header_words, serialize, serialize_into, serialize_into_with, serialize_with};
pub use value::{FastMap, Number, Pattern, Value};

#[cfg(test)]
mod tests;
