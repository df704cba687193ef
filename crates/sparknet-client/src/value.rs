//! Conversion between native values and the ledger's tagged value encoding.
//!
//! [`ScVal`] is the wire form: an externally tagged JSON object such as
//! `{"u64": 5}` or `{"u128": {"hi": 0, "lo": 5}}`. [`Value`] is what the rest
//! of the crate works with. Large integers always travel as 64-bit halves.

use crate::address::Address;
use crate::error::CodecError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// High/low halves of an unsigned 128-bit integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UInt128Parts {
    /// Upper 64 bits.
    pub hi: u64,
    /// Lower 64 bits.
    pub lo: u64,
}

impl From<u128> for UInt128Parts {
    fn from(v: u128) -> Self {
        Self {
            hi: (v >> 64) as u64,
            lo: v as u64,
        }
    }
}

impl From<UInt128Parts> for u128 {
    fn from(p: UInt128Parts) -> Self {
        (u128::from(p.hi) << 64) | u128::from(p.lo)
    }
}

/// High/low halves of a signed 128-bit integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Int128Parts {
    /// Upper 64 bits, carrying the sign.
    pub hi: i64,
    /// Lower 64 bits.
    pub lo: u64,
}

impl From<i128> for Int128Parts {
    fn from(v: i128) -> Self {
        Self {
            hi: (v >> 64) as i64,
            lo: v as u64,
        }
    }
}

impl From<Int128Parts> for i128 {
    fn from(p: Int128Parts) -> Self {
        (i128::from(p.hi) << 64) | i128::from(p.lo)
    }
}

/// One key/value pair of a ledger map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScMapEntry {
    /// Entry key.
    pub key: ScVal,
    /// Entry value.
    pub val: ScVal,
}

/// A ledger value as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScVal {
    /// Boolean.
    Bool(bool),
    /// Unit / no value.
    Void,
    /// Unsigned 32-bit integer.
    U32(u32),
    /// Signed 32-bit integer.
    I32(i32),
    /// Unsigned 64-bit integer.
    U64(u64),
    /// Signed 64-bit integer.
    I64(i64),
    /// Point in time (seconds).
    Timepoint(u64),
    /// Duration (seconds).
    Duration(u64),
    /// Unsigned 128-bit integer.
    U128(UInt128Parts),
    /// Signed 128-bit integer.
    I128(Int128Parts),
    /// Opaque bytes, hex encoded.
    Bytes(String),
    /// UTF-8 string.
    String(String),
    /// Short identifier, used for struct field names.
    Symbol(String),
    /// Ordered sequence.
    Vec(Vec<ScVal>),
    /// Ordered map.
    Map(Vec<ScMapEntry>),
    /// Account or contract address.
    Address(String),
}

impl ScVal {
    /// Wire tag of this value.
    #[must_use]
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Void => "void",
            Self::U32(_) => "u32",
            Self::I32(_) => "i32",
            Self::U64(_) => "u64",
            Self::I64(_) => "i64",
            Self::Timepoint(_) => "timepoint",
            Self::Duration(_) => "duration",
            Self::U128(_) => "u128",
            Self::I128(_) => "i128",
            Self::Bytes(_) => "bytes",
            Self::String(_) => "string",
            Self::Symbol(_) => "symbol",
            Self::Vec(_) => "vec",
            Self::Map(_) => "map",
            Self::Address(_) => "address",
        }
    }

    /// Parse a wire value from JSON, mapping unknown tags to
    /// [`CodecError::Unsupported`].
    ///
    /// # Errors
    ///
    /// Returns error if the JSON is not a recognizable ledger value.
    pub fn from_json(json: &serde_json::Value) -> Result<Self, CodecError> {
        serde_json::from_value(json.clone()).map_err(|e| match json {
            serde_json::Value::Object(map) if map.len() == 1 => {
                let tag = map.keys().next().cloned().unwrap_or_default();
                if KNOWN_TAGS.contains(&tag.as_str()) {
                    CodecError::malformed(format!("{tag}: {e}"))
                } else {
                    CodecError::Unsupported { tag }
                }
            }
            serde_json::Value::String(tag) if tag != "void" => CodecError::Unsupported {
                tag: tag.clone(),
            },
            _ => CodecError::malformed(e.to_string()),
        })
    }
}

const KNOWN_TAGS: &[&str] = &[
    "bool", "void", "u32", "i32", "u64", "i64", "timepoint", "duration", "u128", "i128",
    "bytes", "string", "symbol", "vec", "map", "address",
];

/// A native value that can cross the contract boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// No value.
    Void,
    /// Boolean.
    Bool(bool),
    /// Unsigned 32-bit integer (ledger sequence numbers).
    U32(u32),
    /// Unsigned 64-bit integer.
    U64(u64),
    /// Unsigned 128-bit integer (prices, costs).
    U128(u128),
    /// Signed 128-bit integer (token amounts).
    I128(i128),
    /// String.
    String(String),
    /// Symbol.
    Symbol(String),
    /// Address.
    Address(Address),
    /// Ordered sequence.
    Vec(Vec<Value>),
    /// Ordered map with unique keys.
    Map(Vec<(Value, Value)>),
}

impl Value {
    /// Short name of the native type, for error messages.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Void => "void",
            Self::Bool(_) => "bool",
            Self::U32(_) => "u32",
            Self::U64(_) => "u64",
            Self::U128(_) => "u128",
            Self::I128(_) => "i128",
            Self::String(_) => "string",
            Self::Symbol(_) => "symbol",
            Self::Address(_) => "address",
            Self::Vec(_) => "vec",
            Self::Map(_) => "map",
        }
    }

    /// Build a contract-struct style map: symbol keys in the given order.
    #[must_use]
    pub fn record<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Self::Map(
            fields
                .into_iter()
                .map(|(k, v)| (Self::Symbol(k.into()), v))
                .collect(),
        )
    }

    fn mismatch(&self, expected: &'static str) -> CodecError {
        CodecError::TypeMismatch {
            expected,
            found: self.type_name(),
        }
    }

    /// Extract a bool.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::TypeMismatch`] for any other type.
    pub fn as_bool(&self) -> Result<bool, CodecError> {
        match self {
            Self::Bool(b) => Ok(*b),
            other => Err(other.mismatch("bool")),
        }
    }

    /// Extract a u64. Accepts `u32` as well.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::TypeMismatch`] for any other type.
    pub fn as_u64(&self) -> Result<u64, CodecError> {
        match self {
            Self::U64(v) => Ok(*v),
            Self::U32(v) => Ok(u64::from(*v)),
            other => Err(other.mismatch("u64")),
        }
    }

    /// Extract a u128. Accepts narrower unsigned integers.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::TypeMismatch`] for any other type.
    pub fn as_u128(&self) -> Result<u128, CodecError> {
        match self {
            Self::U128(v) => Ok(*v),
            Self::U64(v) => Ok(u128::from(*v)),
            Self::U32(v) => Ok(u128::from(*v)),
            other => Err(other.mismatch("u128")),
        }
    }

    /// Extract a string (or symbol) slice.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::TypeMismatch`] for any other type.
    pub fn as_str(&self) -> Result<&str, CodecError> {
        match self {
            Self::String(s) | Self::Symbol(s) => Ok(s),
            other => Err(other.mismatch("string")),
        }
    }

    /// Extract an address.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::TypeMismatch`] for any other type.
    pub fn as_address(&self) -> Result<&Address, CodecError> {
        match self {
            Self::Address(a) => Ok(a),
            other => Err(other.mismatch("address")),
        }
    }

    /// Extract a sequence.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::TypeMismatch`] for any other type.
    pub fn as_vec(&self) -> Result<&[Value], CodecError> {
        match self {
            Self::Vec(items) => Ok(items),
            other => Err(other.mismatch("vec")),
        }
    }

    /// Look up a struct field in a symbol-keyed map.
    ///
    /// # Errors
    ///
    /// Returns error if this is not a map or the field is absent.
    pub fn field(&self, name: &str) -> Result<&Value, CodecError> {
        let Self::Map(entries) = self else {
            return Err(self.mismatch("map"));
        };
        entries
            .iter()
            .find(|(k, _)| matches!(k, Self::Symbol(s) | Self::String(s) if s == name))
            .map(|(_, v)| v)
            .ok_or_else(|| CodecError::MissingField {
                field: name.to_string(),
            })
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Self::U32(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Self::U64(v)
    }
}

impl From<u128> for Value {
    fn from(v: u128) -> Self {
        Self::U128(v)
    }
}

impl From<i128> for Value {
    fn from(v: i128) -> Self {
        Self::I128(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<Address> for Value {
    fn from(v: Address) -> Self {
        Self::Address(v)
    }
}

impl From<&Address> for Value {
    fn from(v: &Address) -> Self {
        Self::Address(v.clone())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Self::Vec(items.into_iter().map(Into::into).collect())
    }
}

/// Encode a native value into its ledger representation.
///
/// # Errors
///
/// Returns [`CodecError::Malformed`] if a map contains duplicate keys.
pub fn encode(value: &Value) -> Result<ScVal, CodecError> {
    Ok(match value {
        Value::Void => ScVal::Void,
        Value::Bool(b) => ScVal::Bool(*b),
        Value::U32(v) => ScVal::U32(*v),
        Value::U64(v) => ScVal::U64(*v),
        Value::U128(v) => ScVal::U128((*v).into()),
        Value::I128(v) => ScVal::I128((*v).into()),
        Value::String(s) => ScVal::String(s.clone()),
        Value::Symbol(s) => ScVal::Symbol(s.clone()),
        Value::Address(a) => ScVal::Address(a.as_str().to_string()),
        Value::Vec(items) => ScVal::Vec(items.iter().map(encode).collect::<Result<_, _>>()?),
        Value::Map(entries) => {
            let mut seen = HashSet::with_capacity(entries.len());
            let mut out = Vec::with_capacity(entries.len());
            for (k, v) in entries {
                let key = encode(k)?;
                let repr = serde_json::to_string(&key).map_err(|e| CodecError::malformed(e.to_string()))?;
                if !seen.insert(repr) {
                    return Err(CodecError::malformed(format!(
                        "duplicate map key of type {}",
                        k.type_name()
                    )));
                }
                out.push(ScMapEntry { key, val: encode(v)? });
            }
            ScVal::Map(out)
        }
    })
}

/// Encode a list of call arguments.
///
/// # Errors
///
/// Returns the first encoding error.
pub fn encode_args(args: &[Value]) -> Result<Vec<ScVal>, CodecError> {
    args.iter().map(encode).collect()
}

/// Decode a ledger value into a native value.
///
/// # Errors
///
/// Returns [`CodecError::Unsupported`] for tags without a native counterpart
/// and [`CodecError::Malformed`] for invalid addresses.
pub fn decode(value: &ScVal) -> Result<Value, CodecError> {
    Ok(match value {
        ScVal::Void => Value::Void,
        ScVal::Bool(b) => Value::Bool(*b),
        ScVal::U32(v) => Value::U32(*v),
        ScVal::U64(v) => Value::U64(*v),
        ScVal::U128(parts) => Value::U128((*parts).into()),
        ScVal::I128(parts) => Value::I128((*parts).into()),
        ScVal::String(s) => Value::String(s.clone()),
        ScVal::Symbol(s) => Value::Symbol(s.clone()),
        ScVal::Address(s) => Value::Address(
            Address::parse(s).map_err(|e| CodecError::malformed(e.to_string()))?,
        ),
        ScVal::Vec(items) => Value::Vec(items.iter().map(decode).collect::<Result<_, _>>()?),
        ScVal::Map(entries) => Value::Map(
            entries
                .iter()
                .map(|e| Ok((decode(&e.key)?, decode(&e.val)?)))
                .collect::<Result<_, CodecError>>()?,
        ),
        ScVal::I32(_)
        | ScVal::I64(_)
        | ScVal::Timepoint(_)
        | ScVal::Duration(_)
        | ScVal::Bytes(_) => {
            return Err(CodecError::Unsupported {
                tag: value.tag().to_string(),
            });
        }
    })
}
