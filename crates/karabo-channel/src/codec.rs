//! Karabo binary Hash serialization
//!
//! Layout (all integers little-endian): `u32` entry count, then per entry a
//! `u8`-length key, a `u32` type code, a `u32` attribute count followed by the
//! attributes (key, type, value) and finally the value. Strings, byte arrays
//! and vectors are prefixed with a `u32` element count.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::HashError;
use crate::hash::{Hash, HashValue, Node, ValueType};

type Result<T> = std::result::Result<T, HashError>;

/// Deepest nesting of `HASH`/`VECTOR_HASH` values accepted by [`decode`]
pub const MAX_DEPTH: usize = 128;

/// Encode a [`Hash`] into its binary form
pub fn encode(hash: &Hash) -> Result<Bytes> {
    let mut buf = BytesMut::new();
    put_hash(&mut buf, hash)?;
    Ok(buf.freeze())
}

/// Decode a complete binary Hash
///
/// Trailing bytes after the record are ignored. Records nested deeper than
/// [`MAX_DEPTH`] are rejected with [`HashError::TooDeep`].
pub fn decode(mut data: &[u8]) -> Result<Hash> {
    get_hash(&mut data, 0)
}

fn put_len(buf: &mut BytesMut, len: usize) -> Result<()> {
    let len = u32::try_from(len).map_err(|_| HashError::TooLarge(len))?;
    buf.put_u32_le(len);
    Ok(())
}

fn put_key(buf: &mut BytesMut, key: &str) -> Result<()> {
    let len = u8::try_from(key.len()).map_err(|_| HashError::KeyTooLong(key.len()))?;
    buf.put_u8(len);
    buf.put_slice(key.as_bytes());
    Ok(())
}

fn put_str(buf: &mut BytesMut, s: &str) -> Result<()> {
    put_len(buf, s.len())?;
    buf.put_slice(s.as_bytes());
    Ok(())
}

fn put_hash(buf: &mut BytesMut, hash: &Hash) -> Result<()> {
    put_len(buf, hash.len())?;
    for node in hash.iter() {
        put_key(buf, &node.key)?;
        buf.put_u32_le(node.value.value_type().code());
        put_len(buf, node.attributes.len())?;
        for (key, value) in &node.attributes {
            put_key(buf, key)?;
            buf.put_u32_le(value.value_type().code());
            put_value(buf, value)?;
        }
        put_value(buf, &node.value)?;
    }
    Ok(())
}

macro_rules! put_vec {
    ($buf:expr, $v:expr, $put:ident) => {{
        put_len($buf, $v.len())?;
        for &x in $v.iter() {
            $buf.$put(x);
        }
    }};
}

fn put_value(buf: &mut BytesMut, value: &HashValue) -> Result<()> {
    match value {
        // NONE carries an empty placeholder word
        HashValue::None => buf.put_u32_le(0),
        HashValue::Bool(v) => buf.put_u8(u8::from(*v)),
        HashValue::Char(v) | HashValue::UInt8(v) => buf.put_u8(*v),
        HashValue::Int8(v) => buf.put_i8(*v),
        HashValue::Int16(v) => buf.put_i16_le(*v),
        HashValue::UInt16(v) => buf.put_u16_le(*v),
        HashValue::Int32(v) => buf.put_i32_le(*v),
        HashValue::UInt32(v) => buf.put_u32_le(*v),
        HashValue::Int64(v) => buf.put_i64_le(*v),
        HashValue::UInt64(v) => buf.put_u64_le(*v),
        HashValue::Float(v) => buf.put_f32_le(*v),
        HashValue::Double(v) => buf.put_f64_le(*v),
        HashValue::String(v) => put_str(buf, v)?,
        HashValue::VectorBool(v) => {
            put_len(buf, v.len())?;
            for &x in v {
                buf.put_u8(u8::from(x));
            }
        }
        HashValue::VectorInt8(v) => put_vec!(buf, v, put_i8),
        HashValue::VectorUInt8(v) => {
            put_len(buf, v.len())?;
            buf.put_slice(v);
        }
        HashValue::VectorInt16(v) => put_vec!(buf, v, put_i16_le),
        HashValue::VectorUInt16(v) => put_vec!(buf, v, put_u16_le),
        HashValue::VectorInt32(v) => put_vec!(buf, v, put_i32_le),
        HashValue::VectorUInt32(v) => put_vec!(buf, v, put_u32_le),
        HashValue::VectorInt64(v) => put_vec!(buf, v, put_i64_le),
        HashValue::VectorUInt64(v) => put_vec!(buf, v, put_u64_le),
        HashValue::VectorFloat(v) => put_vec!(buf, v, put_f32_le),
        HashValue::VectorDouble(v) => put_vec!(buf, v, put_f64_le),
        HashValue::VectorString(v) => {
            put_len(buf, v.len())?;
            for s in v {
                put_str(buf, s)?;
            }
        }
        HashValue::Hash(h) => put_hash(buf, h)?,
        HashValue::VectorHash(v) => {
            put_len(buf, v.len())?;
            for h in v {
                put_hash(buf, h)?;
            }
        }
        HashValue::ByteArray(v) => {
            put_len(buf, v.len())?;
            buf.put_slice(v);
        }
    }
    Ok(())
}

fn ensure(data: &[u8], needed: usize) -> Result<()> {
    if data.len() < needed {
        return Err(HashError::Truncated {
            needed,
            remaining: data.len(),
        });
    }
    Ok(())
}

fn get_len(data: &mut &[u8]) -> Result<usize> {
    ensure(data, 4)?;
    Ok(data.get_u32_le() as usize)
}

fn get_bytes(data: &mut &[u8], len: usize) -> Result<Vec<u8>> {
    ensure(data, len)?;
    let out = data[..len].to_vec();
    data.advance(len);
    Ok(out)
}

fn get_key(data: &mut &[u8]) -> Result<String> {
    ensure(data, 1)?;
    let len = usize::from(data.get_u8());
    Ok(String::from_utf8(get_bytes(data, len)?)?)
}

fn get_str(data: &mut &[u8]) -> Result<String> {
    let len = get_len(data)?;
    Ok(String::from_utf8(get_bytes(data, len)?)?)
}

fn get_type(data: &mut &[u8]) -> Result<ValueType> {
    ensure(data, 4)?;
    let code = data.get_u32_le();
    ValueType::from_code(code).ok_or(HashError::UnknownType(code))
}

fn get_hash(data: &mut &[u8], depth: usize) -> Result<Hash> {
    if depth > MAX_DEPTH {
        return Err(HashError::TooDeep(MAX_DEPTH));
    }
    let count = get_len(data)?;
    let mut hash = Hash::new();
    for _ in 0..count {
        let key = get_key(data)?;
        let ty = get_type(data)?;
        let attr_count = get_len(data)?;
        let mut attributes = Vec::new();
        for _ in 0..attr_count {
            let attr_key = get_key(data)?;
            let attr_ty = get_type(data)?;
            attributes.push((attr_key, get_value(data, attr_ty, depth)?));
        }
        let value = get_value(data, ty, depth)?;
        hash.push_node(Node {
            key,
            value,
            attributes,
        });
    }
    Ok(hash)
}

macro_rules! get_vec {
    ($data:expr, $size:expr, $get:ident) => {{
        let len = get_len($data)?;
        ensure($data, len.saturating_mul($size))?;
        (0..len).map(|_| $data.$get()).collect()
    }};
}

macro_rules! get_scalar {
    ($data:expr, $size:expr, $get:ident) => {{
        ensure($data, $size)?;
        $data.$get()
    }};
}

fn get_value(data: &mut &[u8], ty: ValueType, depth: usize) -> Result<HashValue> {
    let value = match ty {
        ValueType::None => {
            get_len(data)?;
            HashValue::None
        }
        ValueType::Bool => HashValue::Bool(get_scalar!(data, 1, get_u8) != 0),
        ValueType::Char => HashValue::Char(get_scalar!(data, 1, get_u8)),
        ValueType::Int8 => HashValue::Int8(get_scalar!(data, 1, get_i8)),
        ValueType::UInt8 => HashValue::UInt8(get_scalar!(data, 1, get_u8)),
        ValueType::Int16 => HashValue::Int16(get_scalar!(data, 2, get_i16_le)),
        ValueType::UInt16 => HashValue::UInt16(get_scalar!(data, 2, get_u16_le)),
        ValueType::Int32 => HashValue::Int32(get_scalar!(data, 4, get_i32_le)),
        ValueType::UInt32 => HashValue::UInt32(get_scalar!(data, 4, get_u32_le)),
        ValueType::Int64 => HashValue::Int64(get_scalar!(data, 8, get_i64_le)),
        ValueType::UInt64 => HashValue::UInt64(get_scalar!(data, 8, get_u64_le)),
        ValueType::Float => HashValue::Float(get_scalar!(data, 4, get_f32_le)),
        ValueType::Double => HashValue::Double(get_scalar!(data, 8, get_f64_le)),
        ValueType::String => HashValue::String(get_str(data)?),
        ValueType::VectorBool => {
            let len = get_len(data)?;
            HashValue::VectorBool(get_bytes(data, len)?.into_iter().map(|b| b != 0).collect())
        }
        ValueType::VectorInt8 => HashValue::VectorInt8(get_vec!(data, 1, get_i8)),
        ValueType::VectorUInt8 => {
            let len = get_len(data)?;
            HashValue::VectorUInt8(get_bytes(data, len)?)
        }
        ValueType::VectorInt16 => HashValue::VectorInt16(get_vec!(data, 2, get_i16_le)),
        ValueType::VectorUInt16 => HashValue::VectorUInt16(get_vec!(data, 2, get_u16_le)),
        ValueType::VectorInt32 => HashValue::VectorInt32(get_vec!(data, 4, get_i32_le)),
        ValueType::VectorUInt32 => HashValue::VectorUInt32(get_vec!(data, 4, get_u32_le)),
        ValueType::VectorInt64 => HashValue::VectorInt64(get_vec!(data, 8, get_i64_le)),
        ValueType::VectorUInt64 => HashValue::VectorUInt64(get_vec!(data, 8, get_u64_le)),
        ValueType::VectorFloat => HashValue::VectorFloat(get_vec!(data, 4, get_f32_le)),
        ValueType::VectorDouble => HashValue::VectorDouble(get_vec!(data, 8, get_f64_le)),
        ValueType::VectorString => {
            let len = get_len(data)?;
            let mut out = Vec::new();
            for _ in 0..len {
                out.push(get_str(data)?);
            }
            HashValue::VectorString(out)
        }
        ValueType::Hash => HashValue::Hash(get_hash(data, depth + 1)?),
        ValueType::VectorHash => {
            let len = get_len(data)?;
            let mut out = Vec::new();
            for _ in 0..len {
                out.push(get_hash(data, depth + 1)?);
            }
            HashValue::VectorHash(out)
        }
        ValueType::ByteArray => {
            let len = get_len(data)?;
            HashValue::ByteArray(Bytes::from(get_bytes(data, len)?))
        }
    };
    Ok(value)
}
