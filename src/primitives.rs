use super::buffer::WriteBuffer;
use super::error::EncodeError;
use super::resolver::Encoder;
use super::schema::Primitive;
use super::types::*;
use super::value::Value;

// ─── Table ──────────────────────────────────────────────────────────────────

/// Primitive encoders, indexed by [`Primitive::index`].
pub static ENCODERS: [Encoder; PRIMITIVE_COUNT] = [
    Encoder::Primitive(encode_i8),
    Encoder::Primitive(encode_i16),
    Encoder::Primitive(encode_i32),
    Encoder::Primitive(encode_i64),
    Encoder::Primitive(encode_u8),
    Encoder::Primitive(encode_u16),
    Encoder::Primitive(encode_u32),
    Encoder::Primitive(encode_u64),
    Encoder::Primitive(encode_f32),
    Encoder::Primitive(encode_f64),
    Encoder::Primitive(encode_bool),
    Encoder::Primitive(encode_number),
    Encoder::Primitive(encode_string),
    Encoder::Primitive(encode_pattern),
];

#[inline]
pub fn encoder_for(primitive: Primitive) -> &'static Encoder {
    &ENCODERS[primitive.index() as usize]
}

#[inline]
fn mismatch(expected: &'static str, value: &Value) -> EncodeError {
    EncodeError::TypeMismatch {
        expected,
        actual: value.kind_name(),
    }
}

// ─── Integers ───────────────────────────────────────────────────────────────

#[inline]
fn integer(value: &Value, expected: &'static str) -> Result<i128, EncodeError> {
    match value {
        Value::Number(n) => Ok(n.to_i128()),
        Value::Bool(b) => Ok(*b as i128),
        _ => Err(mismatch(expected, value)),
    }
}

// Out-of-range values wrap to the target width.
macro_rules! int_encoder {
    ($name:ident, $ty:ty, $expected:literal) => {
        fn $name(buf: &mut WriteBuffer, at: usize, value: &Value) -> Result<usize, EncodeError> {
            const WIDTH: usize = std::mem::size_of::<$ty>();
            let bits = integer(value, $expected)? as $ty;
            buf.ensure(at, WIDTH);
            buf.write(at, bits.to_le_bytes());
            Ok(at + WIDTH)
        }
    };
}

int_encoder!(encode_i8, i8, "i8");
int_encoder!(encode_i16, i16, "i16");
int_encoder!(encode_i32, i32, "i32");
int_encoder!(encode_i64, i64, "i64");
int_encoder!(encode_u8, u8, "u8");
int_encoder!(encode_u16, u16, "u16");
int_encoder!(encode_u32, u32, "u32");
int_encoder!(encode_u64, u64, "u64");

// ─── Floats ─────────────────────────────────────────────────────────────────

#[inline]
fn float(value: &Value, expected: &'static str) -> Result<f64, EncodeError> {
    match value {
        Value::Number(n) => Ok(n.as_f64()),
        Value::Bool(b) => Ok(*b as u8 as f64),
        _ => Err(mismatch(expected, value)),
    }
}

fn encode_f32(buf: &mut WriteBuffer, at: usize, value: &Value) -> Result<usize, EncodeError> {
    let v = float(value, "f32")? as f32;
    buf.ensure(at, 4);
    buf.write(at, v.to_le_bytes());
    Ok(at + 4)
}

fn encode_f64(buf: &mut WriteBuffer, at: usize, value: &Value) -> Result<usize, EncodeError> {
    let v = float(value, "f64")?;
    buf.ensure(at, 8);
    buf.write(at, v.to_le_bytes());
    Ok(at + 8)
}

/// Loose numeric coercion: null is 0, strings are parsed (blank is 0,
/// garbage is NaN).
pub fn coerce_number(value: &Value) -> Result<f64, EncodeError> {
    Ok(match value {
        Value::Null => 0.0,
        Value::Bool(b) => *b as u8 as f64,
        Value::Number(n) => n.as_f64(),
        Value::Str(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                0.0
            } else {
                trimmed.parse().unwrap_or(f64::NAN)
            }
        }
        Value::Pattern(_) | Value::Array(_) | Value::Record(_) => return Err(mismatch("number", value)),
    })
}

fn encode_number(buf: &mut WriteBuffer, at: usize, value: &Value) -> Result<usize, EncodeError> {
    let v = coerce_number(value)?;
    buf.ensure(at, 8);
    buf.write(at, v.to_le_bytes());
    Ok(at + 8)
}

// ─── Bool ───────────────────────────────────────────────────────────────────

fn encode_bool(buf: &mut WriteBuffer, at: usize, value: &Value) -> Result<usize, EncodeError> {
    let truthy = match value {
        Value::Bool(b) => *b,
        Value::Number(n) => {
            let f = n.as_f64();
            f != 0.0 && !f.is_nan()
        }
        Value::Str(s) => !s.is_empty(),
        _ => return Err(mismatch("bool", value)),
    };
    buf.ensure(at, 1);
    buf.write_byte(at, truthy as u8);
    Ok(at + 1)
}

// ─── Strings ────────────────────────────────────────────────────────────────

fn encode_string(buf: &mut WriteBuffer, at: usize, value: &Value) -> Result<usize, EncodeError> {
    let text = value.as_str().ok_or_else(|| mismatch("string", value))?;
    Ok(write_str(buf, at, text))
}

/// Length-prefixed UTF-8. Leading ASCII is copied byte for byte; from the
/// first wider code point on, the rest goes through [`write_utf8`].
///
/// Reserves `len * 3 + 4` up front; only the real length is recorded.
pub fn write_str(buf: &mut WriteBuffer, at: usize, text: &str) -> usize {
    buf.ensure(at, LENGTH_SIZE + text.len() * 3);
    let body = at + LENGTH_SIZE;
    let bytes = text.as_bytes();

    let mut len = 0;
    while len < bytes.len() {
        let b = bytes[len];
        if b > 0x7f {
            break;
        }
        buf.write_byte(body + len, b);
        len += 1;
    }

    if len != bytes.len() {
        // Everything before `len` is ASCII, so it is a char boundary.
        len += write_utf8(buf, body + len, &text[len..]);
    }

    buf.write_u32(at, len as u32);
    body + len
}

/// General UTF-8 path; returns the number of bytes written. The caller has
/// already reserved room.
pub fn write_utf8(buf: &mut WriteBuffer, at: usize, text: &str) -> usize {
    let mut cursor = at;
    let mut scratch = [0u8; 4];
    for ch in text.chars() {
        let encoded = ch.encode_utf8(&mut scratch);
        buf.write_slice(cursor, encoded.as_bytes());
        cursor += encoded.len();
    }
    cursor - at
}

fn encode_pattern(buf: &mut WriteBuffer, at: usize, value: &Value) -> Result<usize, EncodeError> {
    let Value::Pattern(pattern) = value else {
        return Err(mismatch("pattern", value));
    };
    let text = format!("{}\0{}", pattern.flags, pattern.source);
    Ok(write_str(buf, at, &text))
}
