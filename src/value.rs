use smol_str::SmolStr;
use std::collections::BTreeMap;

pub type FastMap<K, V> = BTreeMap<K, V>;

// ─── Number ─────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, PartialEq)]
pub enum Number {
    I64(i64),
    U64(u64),
    F64(f64),
}

impl std::fmt::Debug for Number {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Number::I64(i) => write!(f, "I64({})", i),
            Number::U64(u) => write!(f, "U64({})", u),
            Number::F64(v) => write!(f, "F64({})", v),
        }
    }
}

impl Number {
    pub fn as_f64(self) -> f64 {
        match self {
            Number::I64(i) => i as f64,
            Number::U64(u) => u as f64,
            Number::F64(f) => f,
        }
    }

    /// Integer view used by the fixed-width encoders. Floats truncate toward
    /// zero and saturate; NaN becomes 0. Callers narrow with `as`, which wraps.
    pub fn to_i128(self) -> i128 {
        match self {
            Number::I64(i) => i as i128,
            Number::U64(u) => u as i128,
            Number::F64(f) => f as i128,
        }
    }
}

// ─── Pattern ────────────────────────────────────────────────────────────────

/// A regular-expression-like value: source text plus its flag letters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    pub source: SmolStr,
    pub flags: SmolStr,
}

impl Pattern {
    pub fn new(source: impl Into<SmolStr>, flags: impl Into<SmolStr>) -> Self {
        Self {
            source: source.into(),
            flags: flags.into(),
        }
    }
}

// ─── Value ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    Str(SmolStr),
    Pattern(Pattern),
    Array(Vec<Value>),
    Record(FastMap<SmolStr, Value>),
}

impl Value {
    /// Short name of the variant, used in mismatch errors.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::Pattern(_) => "pattern",
            Value::Array(_) => "array",
            Value::Record(_) => "record",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&FastMap<SmolStr, Value>> {
        match self {
            Value::Record(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(arr) => Some(arr),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_record()?.get(key)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

// ─── From impls ─────────────────────────────────────────────────────────────

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(Number::F64(n))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(Number::I64(n))
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::Number(Number::U64(n))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(SmolStr::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(SmolStr::from(s))
    }
}

impl From<Pattern> for Value {
    fn from(p: Pattern) -> Self {
        Value::Pattern(p)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Value::Null, Into::into)
    }
}

// ─── From<cbor4ii::core::Value> ─────────────────────────────────────────────

impl From<cbor4ii::core::Value> for Value {
    fn from(v: cbor4ii::core::Value) -> Self {
        use cbor4ii::core::Value as Cbor;
        match v {
            Cbor::Null => Value::Null,
            Cbor::Bool(b) => Value::Bool(b),
            Cbor::Integer(i) => {
                if let Ok(val) = i64::try_from(i) {
                    Value::Number(Number::I64(val))
                } else if let Ok(val) = u64::try_from(i) {
                    Value::Number(Number::U64(val))
                } else {
                    Value::Number(Number::F64(i as f64))
                }
            }
            Cbor::Float(f) => Value::Number(Number::F64(f)),
            Cbor::Text(s) => Value::Str(SmolStr::from(s)),
            Cbor::Bytes(bytes) => Value::Array(
                bytes
                    .into_iter()
                    .map(|b| Value::Number(Number::U64(b as u64)))
                    .collect(),
            ),
            Cbor::Array(arr) => Value::Array(arr.into_iter().map(Value::from).collect()),
            Cbor::Map(entries) => Value::Record(
                entries
                    .into_iter()
                    .map(|(k, v)| {
                        let key = match k {
                            Cbor::Text(s) => SmolStr::from(s),
                            Cbor::Integer(i) => SmolStr::from(i.to_string()),
                            other => SmolStr::from(format!("{:?}", other)),
                        };
                        (key, Value::from(v))
                    })
                    .collect(),
            ),
            Cbor::Tag(_, inner) => Value::from(*inner),
            #[allow(unreachable_patterns)]
            _ => Value::Null,
        }
    }
}

// ─── From serde_json::Value ─────────────────────────────────────────────────

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Number(Number::I64(i))
                } else if let Some(u) = n.as_u64() {
                    Value::Number(Number::U64(u))
                } else {
                    Value::Number(Number::F64(n.as_f64().unwrap_or(0.0)))
                }
            }
            serde_json::Value::String(s) => Value::Str(SmolStr::from(s)),
            serde_json::Value::Array(arr) => Value::Array(arr.into_iter().map(Value::from).collect()),
            serde_json::Value::Object(obj) => Value::Record(
                obj.into_iter()
                    .map(|(k, v)| (SmolStr::from(k), Value::from(v)))
                    .collect(),
            ),
        }
    }
}

/// Build a `Value::Record` from `key => value` pairs. Nested `{ ... }`
/// blocks become nested records.
#[macro_export]
macro_rules! record {
    ({ $($key:expr => $val:tt),* $(,)? }) => {{
        #[allow(unused_mut)]
        let mut map = $crate::value::FastMap::default();
        $(
            map.insert(
                ::smol_str::SmolStr::new($key),
                $crate::value::Value::from($crate::record!(@value $val)),
            );
        )*
        $crate::value::Value::Record(map)
    }};

    (@value { $($inner:tt)* }) => {
        $crate::record!({ $($inner)* })
    };

    (@value $val:expr) => {
        $val
    };
}
