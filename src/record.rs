use super::buffer::WriteBuffer;
use super::error::EncodeError;
use super::resolver::{ChildEncoder, Encoder};
use super::schema::{Placement, RecordSchema};
use super::types::*;
use super::value::Value;
use log::debug;
use smol_str::SmolStr;
use std::sync::Arc;

// ─── Compiled Record ────────────────────────────────────────────────────────

/// Where a step writes, relative to the record start.
#[derive(Debug, Clone, Copy)]
enum Target {
    Fixed { offset: usize },
    /// `slot_at` is the byte position of the field's offset-table slot.
    Dynamic { slot_at: usize },
}

#[derive(Debug, Clone, Copy)]
struct NullBit {
    byte: usize,
    mask: u8,
}

#[derive(Debug)]
struct FieldStep {
    name: SmolStr,
    encoder: ChildEncoder,
    target: Target,
    null: Option<NullBit>,
}

/// A record's field list flattened into straight-line steps with every
/// position precomputed.
#[derive(Debug)]
struct CompiledRecord {
    type_index: u32,
    head_len: usize,
    steps: Vec<FieldStep>,
}

/// Flatten `record` into a cached encode procedure.
///
/// Field encoders are resolved here, once, except for fields behind an alias,
/// which may name this record again and are looked up when first written.
pub(crate) fn compile(record: &RecordSchema) -> Result<Encoder, EncodeError> {
    let layout = record.layout().ok_or(EncodeError::UnboundAlias)?;
    let bitmap_at = layout.fixed_width;
    let table_at = layout.fixed_byte_span;

    let steps = record
        .fields()
        .iter()
        .zip(&layout.fields)
        .map(|(field, field_layout)| {
            Ok(FieldStep {
                name: field.name.clone(),
                encoder: ChildEncoder::of(&field.schema)?,
                target: match field_layout.placement {
                    Placement::Fixed { offset, .. } => Target::Fixed { offset },
                    Placement::Dynamic { slot } => Target::Dynamic {
                        slot_at: table_at + slot * OFFSET_SIZE,
                    },
                },
                null: field_layout.null_bit.map(|bit| NullBit {
                    byte: bitmap_at + (bit >> 3),
                    mask: 1 << (bit & 7),
                }),
            })
        })
        .collect::<Result<Vec<_>, EncodeError>>()?;

    let compiled = CompiledRecord {
        type_index: record.type_index(),
        head_len: layout.head_len(),
        steps,
    };
    debug!(
        "compiled record #{}: {} fields, {} dynamic, {} nullable, head {} bytes",
        compiled.type_index,
        compiled.steps.len(),
        layout.dynamic_field_count,
        layout.nullable_field_count,
        compiled.head_len
    );

    Ok(Encoder::Compiled(Arc::new(
        move |buf: &mut WriteBuffer, cursor: usize, value: &Value| compiled.encode(buf, cursor, value),
    )))
}

impl CompiledRecord {
    fn encode(&self, buf: &mut WriteBuffer, start: usize, value: &Value) -> Result<usize, EncodeError> {
        let fields = value.as_record().ok_or(EncodeError::TypeMismatch {
            expected: "record",
            actual: value.kind_name(),
        })?;

        // Scratch window so typical records never hit a growth check below.
        buf.ensure(start, self.head_len + buf.record_reserve());
        let marker = start + self.head_len;
        let mut cursor = marker;

        for step in &self.steps {
            let present = fields.get(step.name.as_str()).filter(|v| !v.is_null());
            if let Target::Dynamic { slot_at } = step.target {
                buf.write_u32(start + slot_at, (cursor - marker) as u32);
            }
            match (present, step.null) {
                (Some(v), _) => match step.target {
                    Target::Fixed { offset } => {
                        step.encoder.encode(buf, start + offset, v)?;
                    }
                    Target::Dynamic { .. } => {
                        cursor = step.encoder.encode(buf, cursor, v)?;
                    }
                },
                (None, Some(bit)) => buf.or_byte(start + bit.byte, bit.mask),
                (None, None) => return Err(EncodeError::MissingField(step.name.clone())),
            }
        }
        Ok(cursor)
    }
}
