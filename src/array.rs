use super::buffer::WriteBuffer;
use super::error::EncodeError;
use super::resolver::{ChildEncoder, Encoder};
use super::schema::{Schema, SchemaKind};
use super::types::*;
use super::value::Value;
use log::debug;
use std::sync::Arc;

/// Static facts about an array's element schema, fixed when the array
/// encoder is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ElementLayout {
    /// 0 when elements are dynamically sized (an offset table is written).
    pub fixed_size: usize,
    /// Nullable elements get a presence bitmap.
    pub nullable: bool,
    /// Payload alignment; 1 means none.
    pub align: usize,
}

impl ElementLayout {
    pub fn of(element: &Schema) -> Result<Self, EncodeError> {
        let terminal = element.terminal().ok_or(EncodeError::UnboundAlias)?;
        let fixed_size = element.fixed_size().ok_or(EncodeError::UnboundAlias)?;
        let nullable = element.is_nullable();
        // Only numeric primitives are padded; records and nested arrays pack
        // back to back.
        let align = match terminal.kind() {
            SchemaKind::Primitive(p) if !nullable && p.is_aligned_in_arrays() => p.width(),
            _ => 1,
        };
        Ok(Self {
            fixed_size,
            nullable,
            align,
        })
    }
}

/// Build the encoder for `array<element>`.
pub(crate) fn build(element: &Arc<Schema>) -> Result<Encoder, EncodeError> {
    let layout = ElementLayout::of(element)?;
    let encoder = ChildEncoder::of(element)?;
    debug!("built array encoder for {:?} ({:?})", element, layout);
    Ok(Encoder::Compiled(Arc::new(
        move |buf: &mut WriteBuffer, cursor: usize, value: &Value| {
            encode_array(&encoder, layout, buf, cursor, value)
        },
    )))
}

pub(crate) fn encode_array(
    encoder: &ChildEncoder,
    layout: ElementLayout,
    buf: &mut WriteBuffer,
    mut cursor: usize,
    value: &Value,
) -> Result<usize, EncodeError> {
    let items = value.as_array().ok_or(EncodeError::TypeMismatch {
        expected: "array",
        actual: value.kind_name(),
    })?;
    let count = items.len();

    buf.ensure(cursor, LENGTH_SIZE);
    buf.write_u32(cursor, count as u32);
    cursor += LENGTH_SIZE;

    let dynamic = layout.fixed_size == 0;
    let offsets_at = cursor;
    if dynamic {
        cursor += buf.ensure(cursor, OFFSET_SIZE * count);
    }

    let nulls_at = cursor;
    if layout.nullable {
        cursor += buf.ensure(cursor, bitmap_len(count));
    } else if layout.align > 1 {
        cursor += cursor.wrapping_neg() & (layout.align - 1);
    }

    // Only meaningful for fixed-size elements; dynamic ones reserve as they go.
    buf.ensure(cursor, layout.fixed_size * count);

    let data_start = cursor;
    for (i, item) in items.iter().enumerate() {
        if dynamic {
            buf.write_u32(offsets_at + OFFSET_SIZE * i, (cursor - data_start) as u32);
        }
        if layout.nullable && item.is_null() {
            buf.set_bit(nulls_at, i);
            cursor += layout.fixed_size;
        } else {
            cursor = encoder.encode(buf, cursor, item)?;
        }
    }
    Ok(cursor)
}
