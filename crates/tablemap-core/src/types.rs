//! Semantic SQL types and the Rust field types that map onto them.

use serde::{Deserialize, Serialize};

use crate::value::{FromValue, ToValue};

/// Engine-independent column type. Each dialect renders it to a concrete type name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SqlType {
    /// 32-bit integer
    Integer,
    /// 64-bit integer
    BigInt,
    /// Boolean
    Boolean,
    /// Double-precision float
    Double,
    /// Text, rendered as VARCHAR(n) when a size hint is present
    Text,
    /// Binary data
    Blob,
    /// JSON document
    Json,
}

impl SqlType {
    /// Whether values of this type are integers (eligible for auto-increment and versioning).
    pub const fn is_integer(self) -> bool {
        matches!(self, SqlType::Integer | SqlType::BigInt)
    }
}

/// A Rust type usable as a mapped record field.
///
/// The derive macro reads `SQL_TYPE` and `NULLABLE` to describe each field, and uses the
/// [`ToValue`]/[`FromValue`] halves as the field's typed accessor.
pub trait FieldType: ToValue + FromValue {
    const SQL_TYPE: SqlType;
    const NULLABLE: bool = false;
}

macro_rules! impl_field_type {
    ($($ty:ty => $sql:ident),* $(,)?) => {
        $(
            impl FieldType for $ty {
                const SQL_TYPE: SqlType = SqlType::$sql;
            }
        )*
    };
}

impl_field_type!(
    bool => Boolean,
    i16 => Integer,
    i32 => Integer,
    i64 => BigInt,
    u32 => BigInt,
    f32 => Double,
    f64 => Double,
    String => Text,
    Vec<u8> => Blob,
    serde_json::Value => Json,
);

impl<T: FieldType> FieldType for Option<T> {
    const SQL_TYPE: SqlType = T::SQL_TYPE;
    const NULLABLE: bool = true;
}
