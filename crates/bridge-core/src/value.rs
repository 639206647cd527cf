// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Dynamically typed values exchanged with sources and stored in variables.
//!
//! Sources hand out values whose runtime type is only known at read time.
//! [`Value`] carries them unchanged; [`FromValue`] performs the checked cast
//! a caller asks for and reports a [`ClientError::TagCast`] when the runtime
//! type does not fit.
//!
//! # Cast Rules
//!
//! | Target            | Accepted runtime types                         |
//! |-------------------|------------------------------------------------|
//! | `bool`            | `Bool`                                         |
//! | integer types     | any integer variant whose value fits           |
//! | `f32`, `f64`      | any numeric variant                            |
//! | `String`          | `String`                                       |
//! | `DateTime<Utc>`   | `DateTime`                                     |
//! | `Vec<u8>`         | `Bytes`                                        |
//! | `Value`           | anything                                       |

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, ClientResult};

// =============================================================================
// Value
// =============================================================================

/// A dynamically typed value slot.
///
/// # Examples
///
/// ```
/// use bridge_core::value::Value;
///
/// let level = Value::Float64(42.5);
/// assert_eq!(level.as_f64(), Some(42.5));
/// assert_eq!(Value::from(true).type_name(), "bool");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    /// Boolean value
    Bool(bool),

    /// Signed 8-bit integer
    Int8(i8),

    /// Signed 16-bit integer
    Int16(i16),

    /// Signed 32-bit integer
    Int32(i32),

    /// Signed 64-bit integer
    Int64(i64),

    /// Unsigned 8-bit integer
    UInt8(u8),

    /// Unsigned 16-bit integer
    UInt16(u16),

    /// Unsigned 32-bit integer
    UInt32(u32),

    /// Unsigned 64-bit integer
    UInt64(u64),

    /// 32-bit floating point
    Float32(f32),

    /// 64-bit floating point
    Float64(f64),

    /// UTF-8 string
    String(String),

    /// Raw bytes
    Bytes(Vec<u8>),

    /// Array of values
    Array(Vec<Value>),

    /// Date and time
    DateTime(DateTime<Utc>),

    /// No value
    #[default]
    Null,
}

impl Value {
    /// Returns the type name of this value.
    #[inline]
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int8(_) => "int8",
            Value::Int16(_) => "int16",
            Value::Int32(_) => "int32",
            Value::Int64(_) => "int64",
            Value::UInt8(_) => "uint8",
            Value::UInt16(_) => "uint16",
            Value::UInt32(_) => "uint32",
            Value::UInt64(_) => "uint64",
            Value::Float32(_) => "float32",
            Value::Float64(_) => "float64",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Array(_) => "array",
            Value::DateTime(_) => "datetime",
            Value::Null => "null",
        }
    }

    /// Returns `true` if this is a null value.
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns `true` if this is a numeric value.
    #[inline]
    pub fn is_numeric(&self) -> bool {
        self.is_integer() || matches!(self, Value::Float32(_) | Value::Float64(_))
    }

    /// Returns `true` if this is an integer value.
    #[inline]
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            Value::Int8(_)
                | Value::Int16(_)
                | Value::Int32(_)
                | Value::Int64(_)
                | Value::UInt8(_)
                | Value::UInt16(_)
                | Value::UInt32(_)
                | Value::UInt64(_)
        )
    }

    /// Returns the boolean, if this is a `Bool`.
    #[inline]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the value as an `i128` if it is an integer variant.
    fn as_i128(&self) -> Option<i128> {
        match self {
            Value::Int8(v) => Some(*v as i128),
            Value::Int16(v) => Some(*v as i128),
            Value::Int32(v) => Some(*v as i128),
            Value::Int64(v) => Some(*v as i128),
            Value::UInt8(v) => Some(*v as i128),
            Value::UInt16(v) => Some(*v as i128),
            Value::UInt32(v) => Some(*v as i128),
            Value::UInt64(v) => Some(*v as i128),
            _ => None,
        }
    }

    /// Returns the value as an `i64` if it is an integer that fits.
    pub fn as_i64(&self) -> Option<i64> {
        self.as_i128().and_then(|v| i64::try_from(v).ok())
    }

    /// Returns any numeric value widened to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float32(v) => Some(*v as f64),
            Value::Float64(v) => Some(*v),
            other => other.as_i128().map(|v| v as f64),
        }
    }

    /// Returns the string slice, if this is a `String`.
    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v),
            _ => None,
        }
    }

    /// Casts this value to `T`, naming `tag` in the error on mismatch.
    pub fn cast<T: FromValue>(&self, tag: &str) -> ClientResult<T> {
        T::from_value(self).ok_or_else(|| ClientError::tag_cast(tag, T::TYPE_NAME, self.type_name()))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int8(v) => write!(f, "{}", v),
            Value::Int16(v) => write!(f, "{}", v),
            Value::Int32(v) => write!(f, "{}", v),
            Value::Int64(v) => write!(f, "{}", v),
            Value::UInt8(v) => write!(f, "{}", v),
            Value::UInt16(v) => write!(f, "{}", v),
            Value::UInt32(v) => write!(f, "{}", v),
            Value::UInt64(v) => write!(f, "{}", v),
            Value::Float32(v) => write!(f, "{}", v),
            Value::Float64(v) => write!(f, "{}", v),
            Value::String(v) => write!(f, "{}", v),
            Value::Bytes(v) => write!(f, "<{} bytes>", v.len()),
            Value::Array(v) => write!(f, "[{} items]", v.len()),
            Value::DateTime(v) => write!(f, "{}", v.to_rfc3339()),
            Value::Null => write!(f, "null"),
        }
    }
}

macro_rules! impl_from_for_value {
    ($variant:ident, $type:ty) => {
        impl From<$type> for Value {
            fn from(v: $type) -> Self {
                Value::$variant(v)
            }
        }
    };
}

impl_from_for_value!(Bool, bool);
impl_from_for_value!(Int8, i8);
impl_from_for_value!(Int16, i16);
impl_from_for_value!(Int32, i32);
impl_from_for_value!(Int64, i64);
impl_from_for_value!(UInt8, u8);
impl_from_for_value!(UInt16, u16);
impl_from_for_value!(UInt32, u32);
impl_from_for_value!(UInt64, u64);
impl_from_for_value!(Float32, f32);
impl_from_for_value!(Float64, f64);
impl_from_for_value!(String, String);
impl_from_for_value!(Bytes, Vec<u8>);
impl_from_for_value!(Array, Vec<Value>);
impl_from_for_value!(DateTime, DateTime<Utc>);

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Plain JSON scalars as found in configuration documents.
///
/// Integers become `Int64` (or `UInt64` above `i64::MAX`), other numbers
/// `Float64`. Objects have no counterpart and become their JSON text.
impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int64(i)
                } else if let Some(u) = n.as_u64() {
                    Value::UInt64(u)
                } else {
                    Value::Float64(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            object @ serde_json::Value::Object(_) => Value::String(object.to_string()),
        }
    }
}

// =============================================================================
// FromValue
// =============================================================================

/// Checked conversion out of a [`Value`].
pub trait FromValue: Sized {
    /// Name reported as the expected type in cast errors.
    const TYPE_NAME: &'static str;

    /// Returns `None` when the runtime type is incompatible.
    fn from_value(value: &Value) -> Option<Self>;
}

impl FromValue for Value {
    const TYPE_NAME: &'static str = "value";

    fn from_value(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}

impl FromValue for bool {
    const TYPE_NAME: &'static str = "bool";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_bool()
    }
}

macro_rules! impl_from_value_for_int {
    ($type:ty, $name:literal) => {
        impl FromValue for $type {
            const TYPE_NAME: &'static str = $name;

            fn from_value(value: &Value) -> Option<Self> {
                value.as_i128().and_then(|v| <$type>::try_from(v).ok())
            }
        }
    };
}

impl_from_value_for_int!(i8, "int8");
impl_from_value_for_int!(i16, "int16");
impl_from_value_for_int!(i32, "int32");
impl_from_value_for_int!(i64, "int64");
impl_from_value_for_int!(u8, "uint8");
impl_from_value_for_int!(u16, "uint16");
impl_from_value_for_int!(u32, "uint32");
impl_from_value_for_int!(u64, "uint64");

impl FromValue for f64 {
    const TYPE_NAME: &'static str = "float64";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_f64()
    }
}

impl FromValue for f32 {
    const TYPE_NAME: &'static str = "float32";

    fn from_value(value: &Value) -> Option<Self> {
        value
            .as_f64()
            .filter(|v| !v.is_finite() || v.abs() <= f64::from(f32::MAX))
            .map(|v| v as f32)
    }
}

impl FromValue for String {
    const TYPE_NAME: &'static str = "string";

    fn from_value(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_string)
    }
}

impl FromValue for DateTime<Utc> {
    const TYPE_NAME: &'static str = "datetime";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::DateTime(v) => Some(*v),
            _ => None,
        }
    }
}

impl FromValue for Vec<u8> {
    const TYPE_NAME: &'static str = "bytes";

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bytes(v) => Some(v.clone()),
            _ => None,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json_scalars() {
        assert_eq!(Value::from(serde_json::json!(true)), Value::Bool(true));
        assert_eq!(Value::from(serde_json::json!(-3)), Value::Int64(-3));
        assert_eq!(Value::from(serde_json::json!(2.5)), Value::Float64(2.5));
        assert_eq!(Value::from(serde_json::json!(null)), Value::Null);
        assert_eq!(
            Value::from(serde_json::json!([1, "a"])),
            Value::Array(vec![Value::Int64(1), Value::String("a".into())])
        );
    }

    #[test]
    fn test_value_type_name() {
        assert_eq!(Value::Int32(100).type_name(), "int32");
        assert_eq!(Value::Float64(100.5).type_name(), "float64");
        assert_eq!(Value::Bool(true).type_name(), "bool");
        assert_eq!(Value::Null.type_name(), "null");
    }

    #[test]
    fn test_cast_bool_is_strict() {
        assert!(Value::Bool(true).cast::<bool>("A.B").unwrap());

        let err = Value::Int32(1).cast::<bool>("A.B").unwrap_err();
        assert!(matches!(
            err,
            ClientError::TagCast {
                expected: "bool",
                actual: "int32",
                ..
            }
        ));
    }

    #[test]
    fn test_cast_integer_range() {
        assert_eq!(Value::UInt8(200).cast::<i32>("t").unwrap(), 200);
        assert_eq!(Value::Int64(-1).cast::<i16>("t").unwrap(), -1);
        assert!(Value::Int64(-1).cast::<u32>("t").is_err());
        assert!(Value::Int32(300).cast::<u8>("t").is_err());
        assert!(Value::Float64(1.0).cast::<i32>("t").is_err());
    }

    #[test]
    fn test_cast_float_widens_integers() {
        assert_eq!(Value::Int16(7).cast::<f64>("t").unwrap(), 7.0);
        assert_eq!(Value::Float32(1.5).cast::<f64>("t").unwrap(), 1.5);
        assert!(Value::String("1.5".into()).cast::<f64>("t").is_err());
    }

    #[test]
    fn test_cast_float32_range() {
        assert_eq!(Value::Float64(2.5).cast::<f32>("t").unwrap(), 2.5);
        assert!(Value::Float64(f64::INFINITY).cast::<f32>("t").unwrap().is_infinite());

        let err = Value::Float64(1e300).cast::<f32>("t").unwrap_err();
        assert!(matches!(
            err,
            ClientError::TagCast {
                expected: "float32",
                actual: "float64",
                ..
            }
        ));
        assert!(Value::Float64(-1e39).cast::<f32>("t").is_err());
    }

    #[test]
    fn test_cast_null_fails_except_value() {
        assert!(Value::Null.cast::<String>("t").is_err());
        assert_eq!(Value::Null.cast::<Value>("t").unwrap(), Value::Null);
    }

    #[test]
    fn test_from_option() {
        assert_eq!(Value::from(Some(3i32)), Value::Int32(3));
        assert_eq!(Value::from(None::<bool>), Value::Null);
    }
}
