use super::buffer::WriteBuffer;
use super::error::EncodeError;
use super::resolver::resolve;
use super::schema::{Schema, SchemaKind};
use super::types::*;
use super::value::Value;
use serde::{Deserialize, Serialize};

// ─── Config ─────────────────────────────────────────────────────────────────

/// Tuning knobs for an encode. Neither setting changes the output bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodeConfig {
    /// Starting size of the write buffer (clamped to at least 16).
    pub initial_capacity: usize,
    /// Scratch window each record reserves before writing its fields.
    pub record_reserve: usize,
}

impl Default for EncodeConfig {
    fn default() -> Self {
        Self {
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            record_reserve: DEFAULT_RECORD_RESERVE,
        }
    }
}

impl EncodeConfig {
    fn buffer(&self, backing: Vec<u8>) -> WriteBuffer {
        WriteBuffer::from_vec(backing, self.initial_capacity).with_record_reserve(self.record_reserve)
    }
}

// ─── Header ─────────────────────────────────────────────────────────────────

/// The two header words for `schema`: the terminal type index (with
/// [`ARRAY_FLAG`] for arrays) and the array nesting depth.
pub fn header_words(schema: &Schema) -> Result<(u32, u32), EncodeError> {
    let mut node = schema.terminal().ok_or(EncodeError::UnboundAlias)?;
    let mut depth = 0u32;
    let index = loop {
        match node.kind() {
            SchemaKind::Array(element) => {
                depth += 1;
                node = element.terminal().ok_or(EncodeError::UnboundAlias)?;
            }
            SchemaKind::Primitive(p) => break p.index(),
            SchemaKind::Record(record) => break record.type_index(),
            SchemaKind::Alias(_) => return Err(EncodeError::UnboundAlias),
        }
    };
    Ok(if depth > 0 {
        (index | ARRAY_FLAG, depth)
    } else {
        (index, 0)
    })
}

fn encode_into(buf: &mut WriteBuffer, value: &Value, schema: &Schema) -> Result<usize, EncodeError> {
    let (type_word, depth_word) = header_words(schema)?;
    buf.ensure(0, HEADER_SIZE);
    buf.write_u32(0, type_word);
    buf.write_u32(4, depth_word);
    resolve(schema)?.encode(buf, HEADER_SIZE, value)
}

// ════════════════════════════════════════════════════════════════════════
// Entry points
// ════════════════════════════════════════════════════════════════════════

/// Encode `value` as described by `schema`: an 8-byte header followed by the
/// payload. The result holds exactly the written bytes.
pub fn serialize(value: &Value, schema: &Schema) -> Result<Vec<u8>, EncodeError> {
    serialize_with(value, schema, &EncodeConfig::default())
}

pub fn serialize_with(value: &Value, schema: &Schema, config: &EncodeConfig) -> Result<Vec<u8>, EncodeError> {
    let mut buf = config.buffer(Vec::new());
    let len = encode_into(&mut buf, value, schema)?;
    Ok(buf.into_written(len))
}

/// Identical to `serialize`, but reuses the caller's Vec to avoid an
/// allocation per value when encoding many in sequence. On success `out`
/// holds the encoding and its length is returned; on error `out` is empty.
pub fn serialize_into(value: &Value, schema: &Schema, out: &mut Vec<u8>) -> Result<usize, EncodeError> {
    serialize_into_with(value, schema, out, &EncodeConfig::default())
}

pub fn serialize_into_with(
    value: &Value,
    schema: &Schema,
    out: &mut Vec<u8>,
    config: &EncodeConfig,
) -> Result<usize, EncodeError> {
    let mut buf = config.buffer(std::mem::take(out));
    let result = encode_into(&mut buf, value, schema);
    *out = buf.into_written(*result.as_ref().unwrap_or(&0));
    result
}
