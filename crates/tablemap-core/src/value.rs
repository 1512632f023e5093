//! Dynamic SQL values and conversions to and from Rust types.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{BindError, BindErrorKind, Result};

/// A single SQL value, used for bind parameters and result cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// SQL NULL
    Null,
    /// Boolean
    Bool(bool),
    /// 32-bit integer
    Int(i32),
    /// 64-bit integer
    BigInt(i64),
    /// 64-bit float
    Double(f64),
    /// UTF-8 text
    Text(String),
    /// Raw bytes
    Bytes(Vec<u8>),
    /// JSON document
    Json(serde_json::Value),
}

impl Value {
    /// Whether this value is NULL.
    pub const fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Name of the variant, for error messages.
    pub const fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Bool(_) => "BOOL",
            Value::Int(_) => "INT",
            Value::BigInt(_) => "BIGINT",
            Value::Double(_) => "DOUBLE",
            Value::Text(_) => "TEXT",
            Value::Bytes(_) => "BYTES",
            Value::Json(_) => "JSON",
        }
    }

    /// Integer view of this value. Booleans count as 0/1.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(i64::from(*v)),
            Value::BigInt(v) => Some(*v),
            Value::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    /// Float view of this value.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(v) => Some(*v),
            Value::Int(v) => Some(f64::from(*v)),
            Value::BigInt(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Text view of this value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::BigInt(v) => write!(f, "{v}"),
            Value::Double(v) => write!(f, "{v}"),
            Value::Text(s) => write!(f, "{s:?}"),
            Value::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Value::Json(j) => write!(f, "{j}"),
        }
    }
}

fn conversion_error(value: &Value, target: &str) -> crate::Error {
    BindError::new(
        BindErrorKind::Conversion,
        format!("cannot convert {} to {target}", value.type_name()),
    )
    .into()
}

/// Convert a Rust value into a [`Value`] for binding.
pub trait ToValue {
    fn to_value(&self) -> Value;
}

/// Convert a [`Value`] read from the database into a Rust value.
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Result<Self>;
}

impl<T: ToValue + ?Sized> ToValue for &T {
    fn to_value(&self) -> Value {
        (**self).to_value()
    }
}

impl<T: ToValue> ToValue for Option<T> {
    fn to_value(&self) -> Value {
        self.as_ref().map_or(Value::Null, ToValue::to_value)
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl ToValue for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self> {
        Ok(value)
    }
}

impl ToValue for bool {
    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Bool(b) => Ok(b),
            Value::Int(v) => Ok(v != 0),
            Value::BigInt(v) => Ok(v != 0),
            other => Err(conversion_error(&other, "bool")),
        }
    }
}

macro_rules! impl_int {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl ToValue for $ty {
                fn to_value(&self) -> Value {
                    Value::$variant((*self).into())
                }
            }

            impl FromValue for $ty {
                fn from_value(value: Value) -> Result<Self> {
                    let wide = match &value {
                        Value::Int(v) => i64::from(*v),
                        Value::BigInt(v) => *v,
                        Value::Bool(b) => i64::from(*b),
                        _ => return Err(conversion_error(&value, stringify!($ty))),
                    };
                    <$ty>::try_from(wide).map_err(|_| {
                        BindError::new(
                            BindErrorKind::Conversion,
                            format!("{wide} out of range for {}", stringify!($ty)),
                        )
                        .into()
                    })
                }
            }
        )*
    };
}

impl_int!(i16 => Int, i32 => Int, i64 => BigInt, u32 => BigInt);

impl ToValue for f32 {
    fn to_value(&self) -> Value {
        Value::Double(f64::from(*self))
    }
}

impl FromValue for f32 {
    #[allow(clippy::cast_possible_truncation)]
    fn from_value(value: Value) -> Result<Self> {
        value
            .as_f64()
            .map(|v| v as f32)
            .ok_or_else(|| conversion_error(&value, "f32"))
    }
}

impl ToValue for f64 {
    fn to_value(&self) -> Value {
        Value::Double(*self)
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> Result<Self> {
        value.as_f64().ok_or_else(|| conversion_error(&value, "f64"))
    }
}

impl ToValue for str {
    fn to_value(&self) -> Value {
        Value::Text(self.to_string())
    }
}

impl ToValue for String {
    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Text(s) => Ok(s),
            Value::Json(j) => Ok(j.to_string()),
            other => Err(conversion_error(&other, "String")),
        }
    }
}

impl ToValue for [u8] {
    fn to_value(&self) -> Value {
        Value::Bytes(self.to_vec())
    }
}

impl ToValue for Vec<u8> {
    fn to_value(&self) -> Value {
        Value::Bytes(self.clone())
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Bytes(b) => Ok(b),
            Value::Text(s) => Ok(s.into_bytes()),
            other => Err(conversion_error(&other, "Vec<u8>")),
        }
    }
}

impl ToValue for serde_json::Value {
    fn to_value(&self) -> Value {
        Value::Json(self.clone())
    }
}

impl FromValue for serde_json::Value {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Json(j) => Ok(j),
            // Engines without a JSON type hand the document back as text.
            Value::Text(s) => serde_json::from_str(&s).map_err(|e| {
                BindError::new(BindErrorKind::Conversion, format!("invalid JSON: {e}")).into()
            }),
            other => Err(conversion_error(&other, "JSON")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_widening_and_narrowing() {
        assert_eq!(i32::from_value(Value::BigInt(42)).unwrap(), 42);
        assert_eq!(i64::from_value(Value::Int(-3)).unwrap(), -3);
        let err = i32::from_value(Value::BigInt(i64::MAX)).unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn test_option_maps_null() {
        assert_eq!(Option::<String>::from_value(Value::Null).unwrap(), None);
        assert_eq!(
            Option::<String>::from_value(Value::Text("x".into())).unwrap(),
            Some("x".to_string())
        );
        assert_eq!(None::<i64>.to_value(), Value::Null);
    }

    #[test]
    fn test_bool_from_sqlite_integer() {
        assert!(bool::from_value(Value::BigInt(1)).unwrap());
        assert!(!bool::from_value(Value::BigInt(0)).unwrap());
    }

    #[test]
    fn test_json_from_text() {
        let v = serde_json::Value::from_value(Value::Text("{\"a\":1}".into())).unwrap();
        assert_eq!(v["a"], 1);
    }

    #[test]
    fn test_conversion_error_kind() {
        let err = i64::from_value(Value::Text("abc".into())).unwrap_err();
        assert_eq!(err.bind_kind(), Some(BindErrorKind::Conversion));
    }

    #[test]
    fn test_str_reference_to_value() {
        assert_eq!("memo".to_value(), Value::Text("memo".into()));
        assert_eq!((&"memo").to_value(), Value::Text("memo".into()));
    }
}
