use super::array;
use super::buffer::WriteBuffer;
use super::error::EncodeError;
use super::primitives;
use super::record;
use super::schema::{Schema, SchemaKind};
use super::value::Value;
use std::sync::Arc;

/// Writes `value` at `cursor` and returns the cursor past the last byte written.
pub type EncodeFn = fn(&mut WriteBuffer, usize, &Value) -> Result<usize, EncodeError>;

pub(crate) type CompiledFn =
    dyn Fn(&mut WriteBuffer, usize, &Value) -> Result<usize, EncodeError> + Send + Sync;

// ─── Encoder ────────────────────────────────────────────────────────────────

/// A resolved encode procedure for one schema node.
#[derive(Clone)]
pub enum Encoder {
    /// Entry of the fixed primitive table.
    Primitive(EncodeFn),
    /// Procedure built for an array or record node.
    Compiled(Arc<CompiledFn>),
}

impl Encoder {
    #[inline]
    pub fn encode(&self, buf: &mut WriteBuffer, cursor: usize, value: &Value) -> Result<usize, EncodeError> {
        match self {
            Encoder::Primitive(f) => f(buf, cursor, value),
            Encoder::Compiled(f) => f(buf, cursor, value),
        }
    }
}

impl std::fmt::Debug for Encoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Encoder::Primitive(_) => f.write_str("Encoder::Primitive"),
            Encoder::Compiled(_) => f.write_str("Encoder::Compiled"),
        }
    }
}

// ─── Resolver ───────────────────────────────────────────────────────────────

/// Look up (or build and memoize) the encoder for `schema`.
///
/// Building happens outside the memo's lock: two threads resolving the same
/// node for the first time both build an identical encoder and the first one
/// published is kept. Aliases cache their target's encoder on themselves, so
/// a chain is walked once per node. Primitives come straight from the static
/// table.
pub fn resolve(schema: &Schema) -> Result<&Encoder, EncodeError> {
    if let Some(encoder) = schema.memo().get() {
        return Ok(encoder);
    }
    let encoder = match schema.kind() {
        SchemaKind::Primitive(p) => return Ok(primitives::encoder_for(*p)),
        SchemaKind::Array(element) => array::build(element)?,
        SchemaKind::Alias(target) => resolve(target.get().ok_or(EncodeError::UnboundAlias)?)?.clone(),
        SchemaKind::Record(record) => record::compile(record)?,
    };
    Ok(schema.memo().get_or_init(|| encoder))
}

// ─── Child Encoders ─────────────────────────────────────────────────────────

/// Encoder for an array element or record field, fixed when the parent's
/// encoder is built.
///
/// Children reached through an alias may lead back to the parent (a list
/// node's `next`, a tree's `children`), and the parent has no encoder until
/// this build finishes. Those are looked up through the child's memo on each
/// call instead; after the first call that is a single load.
#[derive(Debug, Clone)]
pub(crate) enum ChildEncoder {
    Ready(Encoder),
    Deferred(Arc<Schema>),
}

impl ChildEncoder {
    pub fn of(child: &Arc<Schema>) -> Result<Self, EncodeError> {
        let leads_back = match child.kind() {
            SchemaKind::Alias(_) => !matches!(child.terminal().map(Schema::kind), Some(SchemaKind::Primitive(_))),
            _ => false,
        };
        if leads_back {
            Ok(ChildEncoder::Deferred(Arc::clone(child)))
        } else {
            Ok(ChildEncoder::Ready(resolve(child)?.clone()))
        }
    }

    #[inline]
    pub fn encode(&self, buf: &mut WriteBuffer, cursor: usize, value: &Value) -> Result<usize, EncodeError> {
        match self {
            ChildEncoder::Ready(encoder) => encoder.encode(buf, cursor, value),
            ChildEncoder::Deferred(schema) => resolve(schema)?.encode(buf, cursor, value),
        }
    }
}
