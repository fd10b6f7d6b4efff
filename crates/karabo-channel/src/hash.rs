//! Karabo `Hash`: an ordered, self-describing key/value record
//!
//! Every entry keeps its insertion position and may carry attributes of its
//! own. Keys are flat; no path expansion is performed.

use bytes::Bytes;

/// Binary type codes of the Karabo Hash serialization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ValueType {
    Bool = 0,
    VectorBool = 1,
    Char = 2,
    Int8 = 4,
    VectorInt8 = 5,
    UInt8 = 6,
    VectorUInt8 = 7,
    Int16 = 8,
    VectorInt16 = 9,
    UInt16 = 10,
    VectorUInt16 = 11,
    Int32 = 12,
    VectorInt32 = 13,
    UInt32 = 14,
    VectorUInt32 = 15,
    Int64 = 16,
    VectorInt64 = 17,
    UInt64 = 18,
    VectorUInt64 = 19,
    Float = 20,
    VectorFloat = 21,
    Double = 22,
    VectorDouble = 23,
    String = 28,
    VectorString = 29,
    Hash = 30,
    VectorHash = 31,
    ByteArray = 37,
    None = 50,
}

impl ValueType {
    pub fn code(self) -> u32 {
        self as u32
    }

    pub fn from_code(code: u32) -> Option<Self> {
        let ty = match code {
            0 => Self::Bool,
            1 => Self::VectorBool,
            2 => Self::Char,
            4 => Self::Int8,
            5 => Self::VectorInt8,
            6 => Self::UInt8,
            7 => Self::VectorUInt8,
            8 => Self::Int16,
            9 => Self::VectorInt16,
            10 => Self::UInt16,
            11 => Self::VectorUInt16,
            12 => Self::Int32,
            13 => Self::VectorInt32,
            14 => Self::UInt32,
            15 => Self::VectorUInt32,
            16 => Self::Int64,
            17 => Self::VectorInt64,
            18 => Self::UInt64,
            19 => Self::VectorUInt64,
            20 => Self::Float,
            21 => Self::VectorFloat,
            22 => Self::Double,
            23 => Self::VectorDouble,
            28 => Self::String,
            29 => Self::VectorString,
            30 => Self::Hash,
            31 => Self::VectorHash,
            37 => Self::ByteArray,
            50 => Self::None,
            _ => return None,
        };
        Some(ty)
    }
}

/// A value stored in a [`Hash`]
#[derive(Debug, Clone, PartialEq)]
pub enum HashValue {
    None,
    Bool(bool),
    Char(u8),
    Int8(i8),
    UInt8(u8),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Float(f32),
    Double(f64),
    String(String),
    VectorBool(Vec<bool>),
    VectorInt8(Vec<i8>),
    VectorUInt8(Vec<u8>),
    VectorInt16(Vec<i16>),
    VectorUInt16(Vec<u16>),
    VectorInt32(Vec<i32>),
    VectorUInt32(Vec<u32>),
    VectorInt64(Vec<i64>),
    VectorUInt64(Vec<u64>),
    VectorFloat(Vec<f32>),
    VectorDouble(Vec<f64>),
    VectorString(Vec<String>),
    Hash(Hash),
    VectorHash(Vec<Hash>),
    ByteArray(Bytes),
}

impl HashValue {
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::None => ValueType::None,
            Self::Bool(_) => ValueType::Bool,
            Self::Char(_) => ValueType::Char,
            Self::Int8(_) => ValueType::Int8,
            Self::UInt8(_) => ValueType::UInt8,
            Self::Int16(_) => ValueType::Int16,
            Self::UInt16(_) => ValueType::UInt16,
            Self::Int32(_) => ValueType::Int32,
            Self::UInt32(_) => ValueType::UInt32,
            Self::Int64(_) => ValueType::Int64,
            Self::UInt64(_) => ValueType::UInt64,
            Self::Float(_) => ValueType::Float,
            Self::Double(_) => ValueType::Double,
            Self::String(_) => ValueType::String,
            Self::VectorBool(_) => ValueType::VectorBool,
            Self::VectorInt8(_) => ValueType::VectorInt8,
            Self::VectorUInt8(_) => ValueType::VectorUInt8,
            Self::VectorInt16(_) => ValueType::VectorInt16,
            Self::VectorUInt16(_) => ValueType::VectorUInt16,
            Self::VectorInt32(_) => ValueType::VectorInt32,
            Self::VectorUInt32(_) => ValueType::VectorUInt32,
            Self::VectorInt64(_) => ValueType::VectorInt64,
            Self::VectorUInt64(_) => ValueType::VectorUInt64,
            Self::VectorFloat(_) => ValueType::VectorFloat,
            Self::VectorDouble(_) => ValueType::VectorDouble,
            Self::VectorString(_) => ValueType::VectorString,
            Self::Hash(_) => ValueType::Hash,
            Self::VectorHash(_) => ValueType::VectorHash,
            Self::ByteArray(_) => ValueType::ByteArray,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Signed integer value of any integral scalar that fits in an `i64`
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Self::Int8(v) => Some(v.into()),
            Self::UInt8(v) => Some(v.into()),
            Self::Int16(v) => Some(v.into()),
            Self::UInt16(v) => Some(v.into()),
            Self::Int32(v) => Some(v.into()),
            Self::UInt32(v) => Some(v.into()),
            Self::Int64(v) => Some(v),
            Self::UInt64(v) => i64::try_from(v).ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Self::Float(v) => Some(v.into()),
            Self::Double(v) => Some(v),
            _ => self.as_i64().map(|v| v as f64),
        }
    }

    pub fn as_hash(&self) -> Option<&Hash> {
        match self {
            Self::Hash(h) => Some(h),
            _ => None,
        }
    }

    pub fn as_hashes(&self) -> Option<&[Hash]> {
        match self {
            Self::VectorHash(v) => Some(v),
            _ => None,
        }
    }

    /// Elements of any unsigned or signed integer vector as sizes
    ///
    /// Returns `None` for non-integer vectors or negative elements.
    pub fn to_sizes(&self) -> Option<Vec<usize>> {
        fn convert<T: Copy>(v: &[T]) -> Option<Vec<usize>>
        where
            usize: TryFrom<T>,
        {
            v.iter().map(|&x| usize::try_from(x).ok()).collect()
        }

        match self {
            Self::VectorUInt32(v) => convert(v.as_slice()),
            Self::VectorUInt64(v) => convert(v.as_slice()),
            Self::VectorInt32(v) => convert(v.as_slice()),
            Self::VectorInt64(v) => convert(v.as_slice()),
            Self::VectorUInt16(v) => convert(v.as_slice()),
            Self::VectorInt16(v) => convert(v.as_slice()),
            _ => None,
        }
    }
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for HashValue {
                fn from(v: $ty) -> Self {
                    Self::$variant(v)
                }
            }
        )*
    };
}

impl_from! {
    bool => Bool,
    i8 => Int8,
    u8 => UInt8,
    i16 => Int16,
    u16 => UInt16,
    i32 => Int32,
    u32 => UInt32,
    i64 => Int64,
    u64 => UInt64,
    f32 => Float,
    f64 => Double,
    String => String,
    Vec<bool> => VectorBool,
    Vec<i8> => VectorInt8,
    Vec<u8> => VectorUInt8,
    Vec<i16> => VectorInt16,
    Vec<u16> => VectorUInt16,
    Vec<i32> => VectorInt32,
    Vec<u32> => VectorUInt32,
    Vec<i64> => VectorInt64,
    Vec<u64> => VectorUInt64,
    Vec<f32> => VectorFloat,
    Vec<f64> => VectorDouble,
    Vec<String> => VectorString,
    Hash => Hash,
    Vec<Hash> => VectorHash,
    Bytes => ByteArray,
}

impl From<&str> for HashValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

/// One entry of a [`Hash`]
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub key: String,
    pub value: HashValue,
    pub attributes: Vec<(String, HashValue)>,
}

impl Node {
    pub fn attribute(&self, key: &str) -> Option<&HashValue> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }
}

/// Ordered key/value record with per-entry attributes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Hash {
    nodes: Vec<Node>,
}

impl Hash {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`insert`](Self::insert)
    pub fn with(mut self, key: impl Into<String>, value: impl Into<HashValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Set `key` to `value`
    ///
    /// An existing entry keeps its position and attributes.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<HashValue>) {
        let key = key.into();
        let value = value.into();
        match self.nodes.iter_mut().find(|n| n.key == key) {
            Some(node) => node.value = value,
            None => self.nodes.push(Node {
                key,
                value,
                attributes: Vec::new(),
            }),
        }
    }

    /// Set an attribute on an existing entry; returns `false` if `key` is absent
    pub fn set_attribute(
        &mut self,
        key: &str,
        attribute: impl Into<String>,
        value: impl Into<HashValue>,
    ) -> bool {
        let Some(node) = self.nodes.iter_mut().find(|n| n.key == key) else {
            return false;
        };
        let attribute = attribute.into();
        let value = value.into();
        match node.attributes.iter_mut().find(|(k, _)| *k == attribute) {
            Some((_, v)) => *v = value,
            None => node.attributes.push((attribute, value)),
        }
        true
    }

    pub fn get(&self, key: &str) -> Option<&HashValue> {
        self.node(key).map(|n| &n.value)
    }

    pub fn node(&self, key: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.key == key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.node(key).is_some()
    }

    pub fn remove(&mut self, key: &str) -> Option<HashValue> {
        let pos = self.nodes.iter().position(|n| n.key == key)?;
        Some(self.nodes.remove(pos).value)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|n| n.key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    pub(crate) fn push_node(&mut self, node: Node) {
        self.nodes.push(node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_preserves_order_and_replaces() {
        let mut hash = Hash::new().with("b", 1i32).with("a", "x");
        hash.insert("b", 2i32);
        assert_eq!(hash.keys().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(hash.get("b"), Some(&HashValue::Int32(2)));
        assert_eq!(hash.len(), 2);
    }

    #[test]
    fn test_attributes() {
        let mut hash = Hash::new().with("value", 1.5f64);
        assert!(hash.set_attribute("value", "unit", "mm"));
        assert!(!hash.set_attribute("missing", "unit", "mm"));
        let node = hash.node("value").unwrap();
        assert_eq!(node.attribute("unit").and_then(HashValue::as_str), Some("mm"));
    }

    #[test]
    fn test_sizes_from_integer_vectors() {
        assert_eq!(
            HashValue::VectorUInt32(vec![3, 4]).to_sizes(),
            Some(vec![3, 4])
        );
        assert_eq!(HashValue::VectorInt64(vec![-1]).to_sizes(), None);
        assert_eq!(HashValue::VectorString(vec![]).to_sizes(), None);
    }

    #[test]
    fn test_type_codes_round_trip() {
        for code in 0..64 {
            if let Some(ty) = ValueType::from_code(code) {
                assert_eq!(ty.code(), code);
            }
        }
        assert_eq!(ValueType::from_code(3), None);
    }
}
