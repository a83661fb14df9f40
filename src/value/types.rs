//! Stored types and the `ValueType` mapping between Rust types and `sea_query::Value`.
//!
//! Every value that crosses the driver boundary is carried as a `sea_query::Value`
//! together with the [`StoredType`] of the column it is bound to. `ValueType` tells
//! the rest of the crate which `Value` variant a Rust type maps to and which column
//! type it is stored as when nothing more specific is declared.
//!
//! ## Usage
//!
//! ```rust
//! use buoy::{StoredType, ValueType};
//! use sea_query::Value;
//!
//! let value = 42i32.into_value();
//! assert!(matches!(value, Value::Int(Some(42))));
//! assert_eq!(<i32 as ValueType>::stored_type(), Some(StoredType::Integer));
//! ```

use sea_query::Value;
use std::fmt;

/// Column types a value can be stored as.
///
/// This is the "declared stored type" of a field: it decides how a bound value is
/// handed to the driver and is reported next to every bind parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoredType {
    SmallInt,
    Integer,
    BigInt,
    Real,
    Double,
    Boolean,
    Text,
    Varchar,
    Bytea,
    Json,
    Jsonb,
    /// `text[]`, only ever rendered inline as an array literal
    TextArray,
}

impl StoredType {
    /// PostgreSQL name of the type, usable in casts.
    pub fn sql_name(self) -> &'static str {
        match self {
            StoredType::SmallInt => "smallint",
            StoredType::Integer => "integer",
            StoredType::BigInt => "bigint",
            StoredType::Real => "real",
            StoredType::Double => "double precision",
            StoredType::Boolean => "boolean",
            StoredType::Text => "text",
            StoredType::Varchar => "varchar",
            StoredType::Bytea => "bytea",
            StoredType::Json => "json",
            StoredType::Jsonb => "jsonb",
            StoredType::TextArray => "text[]",
        }
    }

    /// Whether values of this type are JSON documents.
    pub fn is_json(self) -> bool {
        matches!(self, StoredType::Json | StoredType::Jsonb)
    }
}

impl fmt::Display for StoredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sql_name())
    }
}

/// Trait for mapping Rust types to their corresponding `sea_query::Value` variant.
///
/// ## Example
///
/// ```rust
/// use buoy::ValueType;
/// use sea_query::Value;
///
/// let value = ValueType::into_value(Some(42i32));
/// assert!(matches!(value, Value::Int(Some(42))));
///
/// let value = ValueType::into_value(None::<i32>);
/// assert!(matches!(value, Value::Int(None)));
/// ```
pub trait ValueType: Sized {
    /// Convert this value into a `sea_query::Value`.
    fn into_value(self) -> Value;

    /// Convert a `sea_query::Value` into this type, if possible.
    ///
    /// Returns `None` if the value doesn't match the expected variant or is null.
    fn from_value(value: Value) -> Option<Self>;

    /// Return the null variant for this type.
    fn null_value() -> Value;

    /// Column type this Rust type is stored as by default.
    ///
    /// `None` means the type carries no mapping of its own; a field of such a type
    /// must declare its stored type explicitly before values can be bound to it.
    fn stored_type() -> Option<StoredType>;
}

macro_rules! impl_value_type {
    ($type:ty, $variant:ident, $stored:expr) => {
        impl ValueType for $type {
            fn into_value(self) -> Value {
                Value::from(self)
            }

            fn from_value(value: Value) -> Option<Self> {
                match value {
                    Value::$variant(Some(v)) => Some(v),
                    _ => None,
                }
            }

            fn null_value() -> Value {
                Value::$variant(None)
            }

            fn stored_type() -> Option<StoredType> {
                Some($stored)
            }
        }
    };
}

impl_value_type!(i16, SmallInt, StoredType::SmallInt);
impl_value_type!(i32, Int, StoredType::Integer);
impl_value_type!(i64, BigInt, StoredType::BigInt);
impl_value_type!(f32, Float, StoredType::Real);
impl_value_type!(f64, Double, StoredType::Double);
impl_value_type!(bool, Bool, StoredType::Boolean);

impl ValueType for String {
    fn into_value(self) -> Value {
        Value::from(self)
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::String(Some(v)) => Some(v.to_string()),
            _ => None,
        }
    }

    fn null_value() -> Value {
        Value::String(None)
    }

    fn stored_type() -> Option<StoredType> {
        Some(StoredType::Text)
    }
}

impl ValueType for Vec<u8> {
    fn into_value(self) -> Value {
        Value::from(self)
    }

    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Bytes(Some(v)) => Some(v.to_vec()),
            _ => None,
        }
    }

    fn null_value() -> Value {
        Value::Bytes(None)
    }

    fn stored_type() -> Option<StoredType> {
        Some(StoredType::Bytea)
    }
}

/// Raw values pass through untouched and carry no stored type.
impl ValueType for Value {
    fn into_value(self) -> Value {
        self
    }

    fn from_value(value: Value) -> Option<Self> {
        Some(value)
    }

    fn null_value() -> Value {
        Value::String(None)
    }

    fn stored_type() -> Option<StoredType> {
        None
    }
}

impl<T: ValueType> ValueType for Option<T> {
    fn into_value(self) -> Value {
        match self {
            Some(v) => T::into_value(v),
            None => T::null_value(),
        }
    }

    fn from_value(value: Value) -> Option<Self> {
        match T::from_value(value.clone()) {
            Some(v) => Some(Some(v)),
            None => {
                if value == T::null_value() {
                    Some(None)
                } else {
                    None
                }
            }
        }
    }

    fn null_value() -> Value {
        T::null_value()
    }

    fn stored_type() -> Option<StoredType> {
        T::stored_type()
    }
}

/// Whether a value is the null variant of whatever type it holds.
pub fn is_null(value: &Value) -> bool {
    matches!(
        value,
        Value::Bool(None)
            | Value::TinyInt(None)
            | Value::SmallInt(None)
            | Value::Int(None)
            | Value::BigInt(None)
            | Value::TinyUnsigned(None)
            | Value::SmallUnsigned(None)
            | Value::Unsigned(None)
            | Value::BigUnsigned(None)
            | Value::Float(None)
            | Value::Double(None)
            | Value::String(None)
            | Value::Char(None)
            | Value::Bytes(None)
            | Value::Json(None)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_i32_value_type() {
        let value = 42i32.into_value();
        assert!(matches!(value, Value::Int(Some(42))));

        let extracted = ValueType::from_value(value);
        assert_eq!(extracted, Some(42i32));
    }

    #[test]
    fn test_string_value_type() {
        let value = "hello".to_string().into_value();
        assert!(matches!(value, Value::String(Some(ref s)) if s.as_str() == "hello"));

        let extracted = ValueType::from_value(value);
        assert_eq!(extracted, Some("hello".to_string()));
    }

    #[test]
    fn test_option_value_type() {
        let value = Some(42i32).into_value();
        assert!(matches!(value, Value::Int(Some(42))));

        let extracted = <Option<i32> as ValueType>::from_value(value);
        assert_eq!(extracted, Some(Some(42i32)));

        let extracted = <Option<i32> as ValueType>::from_value(Value::Int(None));
        assert_eq!(extracted, Some(None));

        // wrong variant is neither a value nor a null
        let extracted = <Option<i32> as ValueType>::from_value(Value::Bool(Some(true)));
        assert_eq!(extracted, None);
    }

    #[test]
    fn test_default_stored_types() {
        assert_eq!(<i64 as ValueType>::stored_type(), Some(StoredType::BigInt));
        assert_eq!(<String as ValueType>::stored_type(), Some(StoredType::Text));
        assert_eq!(<Option<bool> as ValueType>::stored_type(), Some(StoredType::Boolean));
        assert_eq!(<Value as ValueType>::stored_type(), None);
    }

    #[test]
    fn test_is_null() {
        assert!(is_null(&Value::Int(None)));
        assert!(is_null(&Value::String(None)));
        assert!(!is_null(&Value::Int(Some(0))));
        assert!(!is_null(&Value::from(String::new())));
    }

    #[test]
    fn test_sql_names() {
        assert_eq!(StoredType::Jsonb.to_string(), "jsonb");
        assert_eq!(StoredType::TextArray.sql_name(), "text[]");
        assert!(StoredType::Json.is_json());
        assert!(!StoredType::Text.is_json());
    }
}
