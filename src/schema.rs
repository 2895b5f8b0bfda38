use super::error::SchemaError;
use super::resolver::Encoder;
use super::types::*;
use rustc_hash::FxHashSet;
use smol_str::SmolStr;
use std::sync::{Arc, OnceLock};

// ─── Primitive ──────────────────────────────────────────────────────────────

/// Scalar wire types, in primitive-encoder table order.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    I8 = 0,
    I16 = 1,
    I32 = 2,
    I64 = 3,
    U8 = 4,
    U16 = 5,
    U32 = 6,
    U64 = 7,
    F32 = 8,
    F64 = 9,
    Bool = 10,
    /// Loosely-typed numeric field, written as f64.
    Number = 11,
    String = 12,
    Pattern = 13,
}

impl Primitive {
    pub const ALL: [Primitive; PRIMITIVE_COUNT] = [
        Primitive::I8,
        Primitive::I16,
        Primitive::I32,
        Primitive::I64,
        Primitive::U8,
        Primitive::U16,
        Primitive::U32,
        Primitive::U64,
        Primitive::F32,
        Primitive::F64,
        Primitive::Bool,
        Primitive::Number,
        Primitive::String,
        Primitive::Pattern,
    ];

    #[inline]
    pub fn index(self) -> u32 {
        self as u32
    }

    pub fn from_index(index: u32) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    /// Encoded width in bytes; 0 for the variable-length kinds.
    pub fn width(self) -> usize {
        match self {
            Primitive::I8 | Primitive::U8 | Primitive::Bool => 1,
            Primitive::I16 | Primitive::U16 => 2,
            Primitive::I32 | Primitive::U32 | Primitive::F32 => 4,
            Primitive::I64 | Primitive::U64 | Primitive::F64 | Primitive::Number => 8,
            Primitive::String | Primitive::Pattern => 0,
        }
    }

    /// Whether arrays of this type pad their payload to `width()`: the
    /// fixed-width numeric kinds, everything ordered before `Bool`.
    #[inline]
    pub fn is_aligned_in_arrays(self) -> bool {
        self.index() < Primitive::Bool.index()
    }

    pub fn name(self) -> &'static str {
        match self {
            Primitive::I8 => "i8",
            Primitive::I16 => "i16",
            Primitive::I32 => "i32",
            Primitive::I64 => "i64",
            Primitive::U8 => "u8",
            Primitive::U16 => "u16",
            Primitive::U32 => "u32",
            Primitive::U64 => "u64",
            Primitive::F32 => "f32",
            Primitive::F64 => "f64",
            Primitive::Bool => "bool",
            Primitive::Number => "number",
            Primitive::String => "string",
            Primitive::Pattern => "pattern",
        }
    }
}

// ─── Schema Node ────────────────────────────────────────────────────────────

/// Immutable description of a value's shape.
///
/// Nodes are shared through `Arc` and never change after construction, apart
/// from two write-once slots: an alias target (see [`Schema::bind`]) and the
/// resolved encoder memo.
pub struct Schema {
    kind: SchemaKind,
    nullable: bool,
    encoder: OnceLock<Encoder>,
}

pub enum SchemaKind {
    Primitive(Primitive),
    Array(Arc<Schema>),
    /// Transparent forwarder. Unbound until [`Schema::bind`] for recursive
    /// types.
    Alias(OnceLock<Arc<Schema>>),
    Record(RecordSchema),
}

impl Schema {
    fn new(kind: SchemaKind, nullable: bool) -> Arc<Self> {
        Arc::new(Self {
            kind,
            nullable,
            encoder: OnceLock::new(),
        })
    }

    pub fn primitive(primitive: Primitive) -> Arc<Self> {
        Self::new(SchemaKind::Primitive(primitive), false)
    }

    pub fn array(element: Arc<Schema>) -> Arc<Self> {
        Self::new(SchemaKind::Array(element), false)
    }

    /// A branded wrapper forwarding to `target`.
    pub fn alias_of(target: Arc<Schema>) -> Arc<Self> {
        Self::new(SchemaKind::Alias(OnceLock::from(target)), false)
    }

    /// An alias whose target is supplied later, for types that refer to
    /// themselves by name.
    pub fn alias() -> Arc<Self> {
        Self::new(SchemaKind::Alias(OnceLock::new()), false)
    }

    /// Wraps `inner` so that array elements and record fields of this schema
    /// may be absent.
    pub fn nullable(inner: Arc<Schema>) -> Arc<Self> {
        Self::new(SchemaKind::Alias(OnceLock::from(inner)), true)
    }

    /// Builds a record. Field order fixes the wire layout, which is computed
    /// on first use so fields may name aliases that are bound afterwards.
    pub fn record<N: Into<SmolStr>>(
        type_index: u32,
        fields: impl IntoIterator<Item = (N, Arc<Schema>)>,
    ) -> Result<Arc<Self>, SchemaError> {
        if type_index < FIRST_RECORD_INDEX {
            return Err(SchemaError::ReservedTypeIndex(type_index));
        }
        let fields: Vec<Field> = fields
            .into_iter()
            .map(|(name, schema)| Field {
                name: name.into(),
                schema,
            })
            .collect();

        let mut seen = FxHashSet::default();
        for field in &fields {
            if !seen.insert(field.name.as_str()) {
                return Err(SchemaError::DuplicateField(field.name.clone()));
            }
        }

        Ok(Self::new(
            SchemaKind::Record(RecordSchema {
                type_index,
                fields,
                layout: OnceLock::new(),
            }),
            false,
        ))
    }

    /// Supply the target of an alias created with [`Schema::alias`].
    pub fn bind(&self, target: Arc<Schema>) -> Result<(), SchemaError> {
        let SchemaKind::Alias(slot) = &self.kind else {
            return Err(SchemaError::AlreadyBound);
        };
        let mut cursor: &Schema = &target;
        loop {
            if std::ptr::eq(cursor, self) {
                return Err(SchemaError::AliasCycle);
            }
            match &cursor.kind {
                SchemaKind::Alias(next) => match next.get() {
                    Some(next) => cursor = next,
                    None => break,
                },
                _ => break,
            }
        }
        slot.set(target).map_err(|_| SchemaError::AlreadyBound)
    }

    #[inline]
    pub fn kind(&self) -> &SchemaKind {
        &self.kind
    }

    /// Follow alias links to the first non-alias node. `None` if the chain
    /// ends at an unbound alias.
    pub fn terminal(&self) -> Option<&Schema> {
        let mut node = self;
        while let SchemaKind::Alias(target) = &node.kind {
            node = target.get()?;
        }
        Some(node)
    }

    /// Whether this node or any alias it forwards through is flagged nullable.
    pub fn is_nullable(&self) -> bool {
        let mut node = self;
        loop {
            if node.nullable {
                return true;
            }
            match &node.kind {
                SchemaKind::Alias(target) => match target.get() {
                    Some(next) => node = next,
                    None => return false,
                },
                _ => return false,
            }
        }
    }

    /// Statically known encoded size; `Some(0)` when it depends on the value.
    /// `None` if the alias chain, or any field of a record it reaches, is
    /// unbound.
    pub fn fixed_size(&self) -> Option<usize> {
        self.fixed_size_in(&mut Vec::new())
    }

    /// `visiting` holds the records whose layout is being computed further up
    /// the stack. Reaching one of them again means the record contains
    /// itself, which only a variable-size encoding can hold.
    fn fixed_size_in<'a>(&'a self, visiting: &mut Vec<&'a RecordSchema>) -> Option<usize> {
        Some(match &self.terminal()?.kind {
            SchemaKind::Primitive(p) => p.width(),
            SchemaKind::Array(_) => 0,
            SchemaKind::Record(record) if visiting.iter().any(|r| std::ptr::eq(*r, record)) => 0,
            SchemaKind::Record(record) => record.layout_in(visiting)?.fixed_size(),
            SchemaKind::Alias(_) => return None,
        })
    }

    /// Header type index of a primitive or record node (after alias chasing).
    pub fn type_index(&self) -> Option<u32> {
        match &self.terminal()?.kind {
            SchemaKind::Primitive(p) => Some(p.index()),
            SchemaKind::Record(record) => Some(record.type_index),
            SchemaKind::Array(_) | SchemaKind::Alias(_) => None,
        }
    }

    #[inline]
    pub(crate) fn memo(&self) -> &OnceLock<Encoder> {
        &self.encoder
    }
}

impl std::fmt::Debug for Schema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.nullable {
            write!(f, "Nullable(")?;
        }
        match &self.kind {
            SchemaKind::Primitive(p) => write!(f, "{}", p.name())?,
            SchemaKind::Array(element) => write!(f, "Array({:?})", element)?,
            SchemaKind::Alias(target) if self.nullable && target.get().is_some() => {
                if let Some(inner) = target.get() {
                    write!(f, "{:?}", inner)?;
                }
            }
            // Targets may point back at an enclosing record.
            SchemaKind::Alias(target) => match target.get().and_then(|t| t.type_index()) {
                Some(index) => write!(f, "Alias(#{})", index)?,
                None if target.get().is_some() => write!(f, "Alias(..)")?,
                None => write!(f, "Alias(unbound)")?,
            },
            SchemaKind::Record(record) => {
                let mut s = f.debug_struct("Record");
                s.field("type_index", &record.type_index);
                for field in &record.fields {
                    s.field(field.name.as_str(), &field.schema);
                }
                s.finish()?;
            }
        }
        if self.nullable {
            write!(f, ")")?;
        }
        Ok(())
    }
}

// ─── Records ────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct Field {
    pub name: SmolStr,
    pub schema: Arc<Schema>,
}

pub struct RecordSchema {
    type_index: u32,
    fields: Vec<Field>,
    layout: OnceLock<RecordLayout>,
}

impl RecordSchema {
    #[inline]
    pub fn type_index(&self) -> u32 {
        self.type_index
    }

    /// Fields in declared (wire) order.
    #[inline]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Byte layout, derived on first call. `None` while a field still
    /// forwards to an unbound alias.
    pub fn layout(&self) -> Option<&RecordLayout> {
        self.layout_in(&mut Vec::new())
    }

    fn layout_in<'a>(&'a self, visiting: &mut Vec<&'a RecordSchema>) -> Option<&'a RecordLayout> {
        if let Some(layout) = self.layout.get() {
            return Some(layout);
        }
        visiting.push(self);
        let computed = RecordLayout::compute(&self.fields, visiting);
        visiting.pop();
        let computed = computed?;
        Some(self.layout.get_or_init(|| computed))
    }
}

/// Where a field's bytes live inside its record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// At `offset` from the record start, `width` bytes.
    Fixed { offset: usize, width: usize },
    /// Located through offset-table slot `slot`.
    Dynamic { slot: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldLayout {
    pub placement: Placement,
    /// Ordinal among the record's nullable fields.
    pub null_bit: Option<usize>,
}

/// Byte layout of a record, derived once from its field list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordLayout {
    /// Bytes taken by the fixed-size fields.
    pub fixed_width: usize,
    pub bitmap_len: usize,
    /// `fixed_width + bitmap_len`.
    pub fixed_byte_span: usize,
    pub dynamic_field_count: usize,
    pub nullable_field_count: usize,
    pub fields: Vec<FieldLayout>,
}

impl RecordLayout {
    fn compute<'a>(fields: &'a [Field], visiting: &mut Vec<&'a RecordSchema>) -> Option<Self> {
        let mut fixed_width = 0;
        let mut dynamic_field_count = 0;
        let mut nullable_field_count = 0;
        let mut layouts = Vec::with_capacity(fields.len());

        for field in fields {
            let size = field.schema.fixed_size_in(visiting)?;
            let placement = if size > 0 {
                let placement = Placement::Fixed {
                    offset: fixed_width,
                    width: size,
                };
                fixed_width += size;
                placement
            } else {
                dynamic_field_count += 1;
                Placement::Dynamic {
                    slot: dynamic_field_count - 1,
                }
            };
            let null_bit = field.schema.is_nullable().then(|| {
                nullable_field_count += 1;
                nullable_field_count - 1
            });
            layouts.push(FieldLayout {
                placement,
                null_bit,
            });
        }

        let bitmap_len = bitmap_len(nullable_field_count);
        Some(Self {
            fixed_width,
            bitmap_len,
            fixed_byte_span: fixed_width + bitmap_len,
            dynamic_field_count,
            nullable_field_count,
            fields: layouts,
        })
    }

    /// Size of the offset table that follows the fixed span.
    #[inline]
    pub fn offset_table_len(&self) -> usize {
        self.dynamic_field_count * OFFSET_SIZE
    }

    /// Bytes before the first dynamic field.
    #[inline]
    pub fn head_len(&self) -> usize {
        self.fixed_byte_span + self.offset_table_len()
    }

    /// The record's static size, or 0 when any field is dynamic.
    pub fn fixed_size(&self) -> usize {
        if self.dynamic_field_count == 0 {
            self.fixed_byte_span
        } else {
            0
        }
    }
}
