//! CBOR encoding and decoding for CTAP parameter and response maps
//!
//! CTAP uses CBOR (RFC 8949) maps keyed by small integers for every command
//! argument and every response. Requests are built with [`ParameterMap`], which
//! keeps its keys in ascending order so the encoding is canonical (the signed
//! transcript of an authenticated command depends on it). Responses are read
//! through [`ResponseMap`].

use crate::error::{Error, Result};

use std::collections::BTreeMap;

use ciborium::Value;
use serde::{de::DeserializeOwned, Serialize};

/// Encode a value to CBOR bytes
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    ciborium::into_writer(value, &mut buffer).map_err(|e| Error::InvalidCbor(e.to_string()))?;
    Ok(buffer)
}

/// Decode CBOR bytes to a value
pub fn decode<T: DeserializeOwned>(data: &[u8]) -> Result<T> {
    ciborium::from_reader(data).map_err(|e| Error::InvalidCbor(e.to_string()))
}

/// Integer-keyed argument map sent with a CTAP (sub-)command
///
/// Built fresh for every call and never shared.
///
/// # Example
///
/// ```
/// # use biokey_ctap::ParameterMap;
/// let params = ParameterMap::new()
///     .insert_bytes(0x01, &[0xaa, 0xbb])
///     .insert_uint(0x03, 10_000);
/// assert_eq!(params.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterMap {
    entries: BTreeMap<u8, Value>,
}

impl ParameterMap {
    /// Create an empty parameter map
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a byte string
    pub fn insert_bytes(mut self, key: u8, bytes: &[u8]) -> Self {
        self.entries.insert(key, Value::Bytes(bytes.to_vec()));
        self
    }

    /// Insert an unsigned integer
    pub fn insert_uint(mut self, key: u8, value: u64) -> Self {
        self.entries.insert(key, Value::Integer(value.into()));
        self
    }

    /// Insert an unsigned integer only if present
    pub fn insert_uint_opt(self, key: u8, value: Option<u64>) -> Self {
        match value {
            Some(v) => self.insert_uint(key, v),
            None => self,
        }
    }

    /// Insert a text string
    pub fn insert_text(mut self, key: u8, text: impl Into<String>) -> Self {
        self.entries.insert(key, Value::Text(text.into()));
        self
    }

    /// Insert an already-built CBOR value
    pub fn insert_value(mut self, key: u8, value: Value) -> Self {
        self.entries.insert(key, value);
        self
    }

    /// Get the value stored under `key`
    pub fn get(&self, key: u8) -> Option<&Value> {
        self.entries.get(&key)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the map has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Build the map as a CBOR value, keys ascending
    pub fn to_value(&self) -> Value {
        Value::Map(
            self.entries
                .iter()
                .map(|(k, v)| (Value::Integer((*k).into()), v.clone()))
                .collect(),
        )
    }

    /// Encode the map to canonical CBOR bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        encode(&self.to_value())
    }
}

/// Decoded integer-keyed response map
///
/// Accessors come in two flavours: `get_*` treats an absent key as
/// [`Error::MissingField`], `get_*_opt` returns `None` for it. Both report a
/// present value of the wrong CBOR type as [`Error::UnexpectedType`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponseMap {
    map: BTreeMap<i128, Value>,
}

impl ResponseMap {
    /// Create an empty response map
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry (used to assemble responses by hand, e.g. in simulators)
    pub fn with(mut self, key: i128, value: impl Into<Value>) -> Self {
        self.map.insert(key, value.into());
        self
    }

    /// Parse from CBOR bytes
    ///
    /// An empty payload is an empty map: authenticators answer many
    /// commands with a bare success status.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.is_empty() {
            return Ok(Self::new());
        }
        let value: Value = decode(data)?;
        Self::from_value(value)
    }

    /// Parse from a CBOR value
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Map(pairs) => {
                let mut map = BTreeMap::new();
                for (k, v) in pairs {
                    if let Value::Integer(int_key) = k {
                        map.insert(int_key.into(), v);
                    } else {
                        return Err(Error::InvalidCbor("non-integer map key".into()));
                    }
                }
                Ok(Self { map })
            }
            _ => Err(Error::InvalidCbor("expected a map".into())),
        }
    }

    /// Encode back into a CBOR value
    pub fn to_value(&self) -> Value {
        Value::Map(
            self.map
                .iter()
                .map(|(k, v)| {
                    // Keys originate from CBOR integers, so the conversion cannot fail
                    let key = ciborium::value::Integer::try_from(*k)
                        .map(Value::Integer)
                        .unwrap_or(Value::Null);
                    (key, v.clone())
                })
                .collect(),
        )
    }

    /// Encode to CBOR bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        encode(&self.to_value())
    }

    /// Check if a key exists
    pub fn contains_key(&self, key: i128) -> bool {
        self.map.contains_key(&key)
    }

    /// Check if the map has no entries
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Get raw value
    pub fn get(&self, key: i128) -> Option<&Value> {
        self.map.get(&key)
    }

    fn require(&self, key: i128) -> Result<&Value> {
        self.map.get(&key).ok_or(Error::MissingField(key))
    }

    /// Get a required byte string
    pub fn get_bytes(&self, key: i128) -> Result<Vec<u8>> {
        match self.require(key)? {
            Value::Bytes(bytes) => Ok(bytes.clone()),
            _ => Err(Error::UnexpectedType {
                key,
                expected: "byte string",
            }),
        }
    }

    /// Get an optional byte string
    pub fn get_bytes_opt(&self, key: i128) -> Result<Option<Vec<u8>>> {
        self.optional(key, |m| m.get_bytes(key))
    }

    /// Get a required unsigned integer
    pub fn get_uint(&self, key: i128) -> Result<u64> {
        match self.require(key)? {
            Value::Integer(i) => u64::try_from(*i).map_err(|_| Error::UnexpectedType {
                key,
                expected: "unsigned integer",
            }),
            _ => Err(Error::UnexpectedType {
                key,
                expected: "unsigned integer",
            }),
        }
    }

    /// Get an optional unsigned integer
    pub fn get_uint_opt(&self, key: i128) -> Result<Option<u64>> {
        self.optional(key, |m| m.get_uint(key))
    }

    /// Get a required text string
    pub fn get_text(&self, key: i128) -> Result<String> {
        match self.require(key)? {
            Value::Text(text) => Ok(text.clone()),
            _ => Err(Error::UnexpectedType {
                key,
                expected: "text string",
            }),
        }
    }

    /// Get an optional text string
    pub fn get_text_opt(&self, key: i128) -> Result<Option<String>> {
        self.optional(key, |m| m.get_text(key))
    }

    /// Get a required array
    pub fn get_array(&self, key: i128) -> Result<&[Value]> {
        match self.require(key)? {
            Value::Array(items) => Ok(items),
            _ => Err(Error::UnexpectedType {
                key,
                expected: "array",
            }),
        }
    }

    /// Get a required nested map
    pub fn get_map(&self, key: i128) -> Result<ResponseMap> {
        match self.require(key)? {
            value @ Value::Map(_) => Self::from_value(value.clone()),
            _ => Err(Error::UnexpectedType { key, expected: "map" }),
        }
    }

    fn optional<T>(&self, key: i128, get: impl FnOnce(&Self) -> Result<T>) -> Result<Option<T>> {
        if self.contains_key(key) {
            get(self).map(Some)
        } else {
            Ok(None)
        }
    }
}
