//! Request and response types for the WebProxy client

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

// =============================================================================
// Attribute Values
// =============================================================================

/// A schema-less attribute as returned by the WebProxy
///
/// Topology entries, device schemas and slot replies are open-ended maps.
/// This closed set of kinds keeps them typed without fixing their keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<AttributeValue>),
    Map(AttributeMap),
}

/// Open-ended key to attribute mapping
pub type AttributeMap = HashMap<String, AttributeValue>;

impl AttributeValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric value, widening integers
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&AttributeMap> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }
}

impl PartialEq<i64> for AttributeValue {
    fn eq(&self, other: &i64) -> bool {
        self.as_i64() == Some(*other)
    }
}

impl PartialEq<&str> for AttributeValue {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == Some(*other)
    }
}

// =============================================================================
// Topology Types
// =============================================================================

/// Devices, servers, clients and macros known to the topology
///
/// All four sections must be present; a response missing any of them is
/// rejected as an invalid format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopologyInfo {
    #[serde(rename = "device")]
    pub devices: HashMap<String, AttributeMap>,
    #[serde(rename = "server")]
    pub servers: HashMap<String, AttributeMap>,
    #[serde(rename = "client")]
    pub clients: HashMap<String, AttributeMap>,
    #[serde(rename = "macro")]
    pub macros: HashMap<String, AttributeMap>,
}

/// Devices in the topology
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DevicesInfo {
    #[serde(rename = "device")]
    pub devices: HashMap<String, AttributeMap>,
}

// =============================================================================
// Property Types
// =============================================================================

/// Value of a single device property
///
/// Mirrors the value types a WebProxy can carry in a configuration: scalars
/// and homogeneous lists of scalars.
///
/// JSON carries no element type for `[]`, so an empty list always decodes as
/// `BoolList`. Equality therefore treats empty lists of any element type as
/// equal; check [`is_empty_list`](Self::is_empty_list) rather than matching
/// a list variant when the list may be empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    BoolList(Vec<bool>),
    IntList(Vec<i64>),
    FloatList(Vec<f64>),
    StringList(Vec<String>),
}

impl PropertyValue {
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// A list variant without elements
    pub fn is_empty_list(&self) -> bool {
        match self {
            Self::BoolList(v) => v.is_empty(),
            Self::IntList(v) => v.is_empty(),
            Self::FloatList(v) => v.is_empty(),
            Self::StringList(v) => v.is_empty(),
            _ => false,
        }
    }
}

impl PartialEq for PropertyValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (a, b) if a.is_empty_list() && b.is_empty_list() => true,
            (Self::None, Self::None) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::BoolList(a), Self::BoolList(b)) => a == b,
            (Self::IntList(a), Self::IntList(b)) => a == b,
            (Self::FloatList(a), Self::FloatList(b)) => a == b,
            (Self::StringList(a), Self::StringList(b)) => a == b,
            _ => false,
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for PropertyValue {
    fn from(v: i32) -> Self {
        Self::Int(v.into())
    }
}

impl From<i64> for PropertyValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u32> for PropertyValue {
    fn from(v: u32) -> Self {
        Self::Int(v.into())
    }
}

impl From<f64> for PropertyValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<Vec<bool>> for PropertyValue {
    fn from(v: Vec<bool>) -> Self {
        Self::BoolList(v)
    }
}

impl From<Vec<i64>> for PropertyValue {
    fn from(v: Vec<i64>) -> Self {
        Self::IntList(v)
    }
}

impl From<Vec<f64>> for PropertyValue {
    fn from(v: Vec<f64>) -> Self {
        Self::FloatList(v)
    }
}

impl From<Vec<String>> for PropertyValue {
    fn from(v: Vec<String>) -> Self {
        Self::StringList(v)
    }
}

impl<T: Into<PropertyValue>> From<Option<T>> for PropertyValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::None, Into::into)
    }
}

/// A property sample: value, timestamp (seconds since epoch) and train id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyInfo {
    pub value: PropertyValue,
    pub timestamp: f64,
    pub tid: u64,
}

impl PropertyInfo {
    pub fn new(value: impl Into<PropertyValue>, timestamp: f64, tid: u64) -> Self {
        Self {
            value: value.into(),
            timestamp,
            tid,
        }
    }
}

/// Configuration of a device: property name to its current sample
pub type DeviceConfigInfo = HashMap<String, PropertyInfo>;

/// Schema of a device: property name to its descriptive attributes
pub type DeviceSchema = HashMap<String, AttributeMap>;

// =============================================================================
// Write Types
// =============================================================================

/// Outcome of a write operation (configuration, property, slot, injection)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteResponse {
    pub success: bool,
    #[serde(default)]
    pub reason: String,
    /// Return values of a slot execution, if the slot replied
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply: Option<AttributeMap>,
}

impl WriteResponse {
    /// A successful write with no reply
    pub fn ok() -> Self {
        Self {
            success: true,
            reason: String::new(),
            reply: None,
        }
    }

    /// A failed write carrying `reason`
    pub fn failure(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            reason: reason.into(),
            reply: None,
        }
    }

    /// Drop any reply attached to an unsuccessful write
    pub(crate) fn normalized(mut self) -> Self {
        if !self.success {
            self.reply = None;
        }
        self
    }
}
