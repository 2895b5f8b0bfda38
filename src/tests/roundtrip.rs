use super::decoder::decode;
use crate::error::EncodeError;
use crate::record;
use crate::schema::{Primitive, Schema, SchemaKind};
use crate::serialization::{EncodeConfig, serialize, serialize_into, serialize_with};
use crate::types::*;
use crate::value::{Pattern, Value};
use proptest::prelude::*;
use smol_str::SmolStr;
use std::sync::{Arc, LazyLock};

fn prim(p: Primitive) -> Arc<Schema> {
    Schema::primitive(p)
}

// ─── Fixture schemas ────────────────────────────────────────────────────────

/// Every primitive, nullable and not, plus nested records and arrays.
static KITCHEN_SINK: LazyLock<Arc<Schema>> = LazyLock::new(|| {
    let point = Schema::record(100, [("x", prim(Primitive::F32)), ("y", prim(Primitive::F32))]).unwrap();
    let tagged = Schema::record(
        101,
        [
            ("label", prim(Primitive::String)),
            ("weight", Schema::nullable(prim(Primitive::U16))),
        ],
    )
    .unwrap();
    let mut fields: Vec<(SmolStr, Arc<Schema>)> = Primitive::ALL
        .iter()
        .map(|p| (SmolStr::from(p.name()), prim(*p)))
        .collect();
    fields.extend(
        Primitive::ALL
            .iter()
            .map(|p| (SmolStr::from(format!("opt_{}", p.name())), Schema::nullable(prim(*p)))),
    );
    fields.push(("origin".into(), point.clone()));
    fields.push(("maybe_point".into(), Schema::nullable(point.clone())));
    fields.push(("path".into(), Schema::array(point)));
    fields.push(("tags".into(), Schema::array(Schema::nullable(tagged))));
    fields.push((
        "grid".into(),
        Schema::array(Schema::array(Schema::nullable(prim(Primitive::I16)))),
    ));
    fields.push(("branded".into(), Schema::alias_of(prim(Primitive::U64))));
    Schema::record(102, fields).unwrap()
});

/// `Tree { value: i32, label: string?, children: [Tree] }`
static TREE: LazyLock<Arc<Schema>> = LazyLock::new(|| {
    let node = Schema::alias();
    let tree = Schema::record(
        110,
        [
            ("value", prim(Primitive::I32)),
            ("label", Schema::nullable(prim(Primitive::String))),
            ("children", Schema::array(node.clone())),
        ],
    )
    .unwrap();
    node.bind(tree.clone()).unwrap();
    tree
});

/// `Node { value: i32, next: Node? }`
static LINKED_LIST: LazyLock<Arc<Schema>> = LazyLock::new(|| {
    let node = Schema::alias();
    let list = Schema::record(
        111,
        [
            ("value", prim(Primitive::I32)),
            ("next", Schema::nullable(node.clone())),
        ],
    )
    .unwrap();
    node.bind(list.clone()).unwrap();
    list
});

fn linked_list(items: &[i32]) -> Value {
    items
        .iter()
        .rev()
        .fold(Value::Null, |next, &v| record!({ "value" => (v as i64), "next" => next }))
}

// ─── Value strategies ───────────────────────────────────────────────────────

fn arb_primitive(p: Primitive) -> BoxedStrategy<Value> {
    match p {
        Primitive::I8 => any::<i8>().prop_map(|v| Value::from(v as i64)).boxed(),
        Primitive::I16 => any::<i16>().prop_map(|v| Value::from(v as i64)).boxed(),
        Primitive::I32 => any::<i32>().prop_map(|v| Value::from(v as i64)).boxed(),
        Primitive::I64 => any::<i64>().prop_map(Value::from).boxed(),
        Primitive::U8 => any::<u8>().prop_map(|v| Value::from(v as u64)).boxed(),
        Primitive::U16 => any::<u16>().prop_map(|v| Value::from(v as u64)).boxed(),
        Primitive::U32 => any::<u32>().prop_map(|v| Value::from(v as u64)).boxed(),
        Primitive::U64 => any::<u64>().prop_map(Value::from).boxed(),
        Primitive::F32 => (-1.0e6f32..1.0e6f32).prop_map(|v| Value::from(v as f64)).boxed(),
        Primitive::F64 | Primitive::Number => (-1.0e12f64..1.0e12f64).prop_map(Value::from).boxed(),
        Primitive::Bool => any::<bool>().prop_map(Value::from).boxed(),
        Primitive::String => any::<String>().prop_map(Value::from).boxed(),
        Primitive::Pattern => ("[gimsuy]{0,3}", any::<String>())
            .prop_map(|(flags, source)| Value::Pattern(Pattern::new(source, flags)))
            .boxed(),
    }
}

/// Values conforming to `schema`. Arrays below `depth` 0 are empty so
/// recursive schemas stay finite.
fn arb_value(schema: &Arc<Schema>, depth: u32) -> BoxedStrategy<Value> {
    match schema.kind() {
        SchemaKind::Primitive(p) => arb_primitive(*p),
        SchemaKind::Alias(target) => {
            let target = target.get().expect("bound alias").clone();
            let inner = arb_value(&target, depth);
            if schema.is_nullable() && !target.is_nullable() {
                prop_oneof![1 => Just(Value::Null), 3 => inner].boxed()
            } else {
                inner
            }
        }
        SchemaKind::Array(_) if depth == 0 => Just(Value::Array(vec![])).boxed(),
        SchemaKind::Array(element) => prop::collection::vec(arb_value(element, depth - 1), 0..6)
            .prop_map(Value::Array)
            .boxed(),
        SchemaKind::Record(record) => {
            let fields: Vec<BoxedStrategy<(SmolStr, Value)>> = record
                .fields()
                .iter()
                .map(|field| {
                    let name = field.name.clone();
                    arb_value(&field.schema, depth)
                        .prop_map(move |v| (name.clone(), v))
                        .boxed()
                })
                .collect();
            fields.prop_map(|pairs| Value::Record(pairs.into_iter().collect())).boxed()
        }
    }
}

fn small_buffers() -> EncodeConfig {
    EncodeConfig {
        initial_capacity: 16,
        record_reserve: 0,
    }
}

fn roomy_buffers() -> EncodeConfig {
    EncodeConfig {
        initial_capacity: 1 << 20,
        record_reserve: 4096,
    }
}

proptest! {
    #[test]
    fn prop_kitchen_sink_roundtrips(value in arb_value(&KITCHEN_SINK, 2)) {
        let out = serialize(&value, &KITCHEN_SINK).unwrap();
        prop_assert_eq!(decode(&out, &KITCHEN_SINK), value);
    }

    #[test]
    fn prop_tree_roundtrips(value in arb_value(&TREE, 3)) {
        let out = serialize(&value, &TREE).unwrap();
        prop_assert_eq!(decode(&out, &TREE), value);
    }

    #[test]
    fn prop_linked_list_roundtrips(items in prop::collection::vec(any::<i32>(), 1..24)) {
        let value = linked_list(&items);
        let small = serialize_with(&value, &LINKED_LIST, &small_buffers()).unwrap();
        prop_assert_eq!(&small, &serialize(&value, &LINKED_LIST).unwrap());
        prop_assert_eq!(decode(&small, &LINKED_LIST), value);
    }

    #[test]
    fn prop_growth_is_transparent(value in arb_value(&KITCHEN_SINK, 2)) {
        let small = serialize_with(&value, &KITCHEN_SINK, &small_buffers()).unwrap();
        let roomy = serialize_with(&value, &KITCHEN_SINK, &roomy_buffers()).unwrap();
        prop_assert_eq!(small, roomy);
    }

    #[test]
    fn prop_string_arrays_roundtrip(items in prop::collection::vec(prop::option::of(any::<String>()), 0..40)) {
        let schema = Schema::array(Schema::nullable(prim(Primitive::String)));
        let value = Value::Array(items.into_iter().map(Value::from).collect());
        let out = serialize(&value, &schema).unwrap();
        prop_assert_eq!(decode(&out, &schema), value);
    }
}

// ─── Length accounting & buffer reuse ───────────────────────────────────────

#[test]
fn test_output_never_includes_spare_capacity() {
    let schema = prim(Primitive::U8);
    let out = serialize(&Value::from(1u64), &schema).unwrap();
    assert_eq!(out.len(), HEADER_SIZE + 1);

    // A single long string forces several doublings past the initial size.
    let schema = prim(Primitive::String);
    let text = "x".repeat(5000);
    let out = serialize_with(&Value::from(text.as_str()), &schema, &small_buffers()).unwrap();
    assert_eq!(out.len(), HEADER_SIZE + LENGTH_SIZE + 5000);
}

#[test]
fn test_large_array_of_records_grows_transparently() {
    let row = Schema::record(
        120,
        [
            ("id", prim(Primitive::U64)),
            ("name", prim(Primitive::String)),
            ("score", Schema::nullable(prim(Primitive::F64))),
        ],
    )
    .unwrap();
    let schema = Schema::array(row);
    let value = Value::Array(
        (0..500u64)
            .map(|i| {
                record!({
                    "id" => i,
                    "name" => (format!("row-{}-ü", i)),
                    "score" => (if i % 3 == 0 { Value::Null } else { Value::from(i as f64 / 2.0) }),
                })
            })
            .collect(),
    );
    let small = serialize_with(&value, &schema, &small_buffers()).unwrap();
    let roomy = serialize_with(&value, &schema, &roomy_buffers()).unwrap();
    assert_eq!(small, roomy);
    assert_eq!(decode(&small, &schema), value);
}

#[test]
fn test_serialize_into_reuses_and_truncates() {
    let schema = Schema::record(121, [("id", prim(Primitive::U32)), ("name", prim(Primitive::String))]).unwrap();
    let value = record!({ "id" => 7u64, "name" => "ok" });
    let expected = serialize(&value, &schema).unwrap();

    let mut buf = vec![0xAB; 4096];
    let len = serialize_into(&value, &schema, &mut buf).unwrap();
    assert_eq!(len, expected.len());
    assert_eq!(buf, expected);

    let err = serialize_into(&record!({ "name" => "no id" }), &schema, &mut buf).unwrap_err();
    assert_eq!(err, EncodeError::MissingField("id".into()));
    assert!(buf.is_empty());

    serialize_into(&value, &schema, &mut buf).unwrap();
    assert_eq!(buf, expected);
}

#[test]
fn test_unbound_recursive_alias_fails_at_encode() {
    let node = Schema::alias();
    let schema = Schema::record(122, [("children", Schema::array(node.clone()))]).unwrap();
    let err = serialize(&record!({ "children" => (Value::Array(vec![])) }), &schema).unwrap_err();
    assert_eq!(err, EncodeError::UnboundAlias);

    // Nothing was cached, so binding afterwards still works.
    node.bind(schema.clone()).unwrap();
    let value = record!({ "children" => (Value::Array(vec![record!({ "children" => (Value::Array(vec![])) })])) });
    let out = serialize(&value, &schema).unwrap();
    assert_eq!(decode(&out, &schema), value);
}

#[test]
fn test_nullable_self_reference_binds_after_construction() {
    let node = Schema::alias();
    let schema = Schema::record(
        124,
        [
            ("label", prim(Primitive::String)),
            ("next", Schema::nullable(node.clone())),
        ],
    )
    .unwrap();
    let value = record!({ "label" => "head", "next" => { "label" => "tail", "next" => (Value::Null) } });
    assert_eq!(serialize(&value, &schema).unwrap_err(), EncodeError::UnboundAlias);

    node.bind(schema.clone()).unwrap();
    let out = serialize(&value, &schema).unwrap();
    assert_eq!(decode(&out, &schema), value);
}

#[test]
fn test_records_referring_to_each_other_roundtrip() {
    let outer_ref = Schema::alias();
    let inner = Schema::record(
        126,
        [
            ("tag", prim(Primitive::U8)),
            ("outer", Schema::nullable(outer_ref.clone())),
        ],
    )
    .unwrap();
    let outer = Schema::record(125, [("id", prim(Primitive::U16)), ("inner", inner)]).unwrap();
    outer_ref.bind(outer.clone()).unwrap();

    let value = record!({
        "id" => 1u64,
        "inner" => {
            "tag" => 2u64,
            "outer" => { "id" => 3u64, "inner" => { "tag" => 4u64, "outer" => (Value::Null) } },
        },
    });
    let out = serialize(&value, &outer).unwrap();
    assert_eq!(decode(&out, &outer), value);
}

#[test]
fn test_concurrent_first_use_produces_identical_output() {
    let schema = Schema::array(Schema::record(123, [("s", prim(Primitive::String)), ("n", prim(Primitive::I64))]).unwrap());
    let value = Value::Array(
        (0..50i64)
            .map(|i| record!({ "s" => (i.to_string()), "n" => i }))
            .collect(),
    );
    let outputs: Vec<Vec<u8>> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| serialize(&value, &schema).unwrap()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    assert!(outputs.windows(2).all(|pair| pair[0] == pair[1]));
    assert_eq!(decode(&outputs[0], &schema), value);
}
