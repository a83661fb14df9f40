//! `TryGetable` and `ConversionError` for safe value extraction.
//!
//! `ValueType::from_value` answers "does this fit"; `TryGetable` answers "why not".
//! Every stored value decoded by a field goes through `try_get`, so a NULL or a
//! value of the wrong variant surfaces as a `ConversionError` instead of a default.

use crate::value::ValueType;
use sea_query::Value;

/// Error type for conversions between stored and semantic values
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionError {
    /// The value is null but the target type cannot represent null
    NullValue,
    /// The value type doesn't match the expected type
    TypeMismatch {
        expected: String,
        actual: String,
    },
    /// The stored representation is not a valid encoding of the semantic type
    Malformed {
        expected: String,
        value: String,
        reason: String,
    },
    /// A semantic value could not be encoded into its stored representation
    Unencodable(String),
    /// Any of the above, attributed to a column
    Column {
        column: String,
        source: Box<ConversionError>,
    },
}

impl ConversionError {
    /// Attribute this error to a column. Already attributed errors are left alone.
    pub fn in_column(self, column: &str) -> Self {
        match self {
            ConversionError::Column { .. } => self,
            other => ConversionError::Column {
                column: column.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// The column this error is attributed to, if any.
    pub fn column(&self) -> Option<&str> {
        match self {
            ConversionError::Column { column, .. } => Some(column),
            _ => None,
        }
    }

    /// The underlying error with column attribution stripped.
    pub fn root(&self) -> &ConversionError {
        match self {
            ConversionError::Column { source, .. } => source.root(),
            other => other,
        }
    }
}

impl std::fmt::Display for ConversionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConversionError::NullValue => write!(f, "Value is null"),
            ConversionError::TypeMismatch { expected, actual } => {
                write!(f, "Type mismatch: expected {}, got {}", expected, actual)
            }
            ConversionError::Malformed {
                expected,
                value,
                reason,
            } => write!(f, "Malformed {} value {}: {}", expected, value, reason),
            ConversionError::Unencodable(msg) => write!(f, "Cannot encode value: {}", msg),
            ConversionError::Column { column, source } => {
                write!(f, "Conversion error in column {}: {}", column, source)
            }
        }
    }
}

impl std::error::Error for ConversionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConversionError::Column { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

/// Trait for safe value extraction with error handling
///
/// ## Usage
///
/// ```rust
/// use buoy::{ConversionError, TryGetable};
/// use sea_query::Value;
///
/// let result: Result<i32, ConversionError> = TryGetable::try_get(Value::Int(Some(42)));
/// assert_eq!(result, Ok(42));
///
/// let result: Result<i32, ConversionError> = TryGetable::try_get(Value::Int(None));
/// assert!(matches!(result, Err(ConversionError::NullValue)));
/// ```
pub trait TryGetable: ValueType {
    /// Try to extract a value from `sea_query::Value`, returning an error if extraction fails.
    ///
    /// Returns:
    /// - `Ok(T)` if the value matches the expected type and is not null
    /// - `Err(ConversionError::NullValue)` if the value is null
    /// - `Err(ConversionError::TypeMismatch)` if the value type doesn't match
    fn try_get(value: Value) -> Result<Self, ConversionError>;
}

fn mismatch(expected: &str, actual: &Value) -> ConversionError {
    ConversionError::TypeMismatch {
        expected: expected.to_string(),
        actual: format!("{:?}", actual),
    }
}

macro_rules! impl_try_getable {
    ($type:ty, $variant:ident, $expected:expr) => {
        impl TryGetable for $type {
            fn try_get(value: Value) -> Result<Self, ConversionError> {
                match value {
                    Value::$variant(Some(v)) => Ok(v),
                    Value::$variant(None) => Err(ConversionError::NullValue),
                    _ => Err(mismatch($expected, &value)),
                }
            }
        }
    };
}

impl_try_getable!(i16, SmallInt, "SmallInt");
impl_try_getable!(i32, Int, "Int");
impl_try_getable!(i64, BigInt, "BigInt");
impl_try_getable!(f32, Float, "Float");
impl_try_getable!(f64, Double, "Double");
impl_try_getable!(bool, Bool, "Bool");

impl TryGetable for String {
    fn try_get(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::String(Some(v)) => Ok(v.to_string()),
            Value::String(None) => Err(ConversionError::NullValue),
            _ => Err(mismatch("String", &value)),
        }
    }
}

impl TryGetable for Vec<u8> {
    fn try_get(value: Value) -> Result<Self, ConversionError> {
        match value {
            Value::Bytes(Some(v)) => Ok(v.to_vec()),
            Value::Bytes(None) => Err(ConversionError::NullValue),
            _ => Err(mismatch("Bytes", &value)),
        }
    }
}

impl TryGetable for Value {
    fn try_get(value: Value) -> Result<Self, ConversionError> {
        Ok(value)
    }
}

impl<T: TryGetable> TryGetable for Option<T> {
    fn try_get(value: Value) -> Result<Self, ConversionError> {
        if crate::value::is_null(&value) {
            return Ok(None);
        }
        T::try_get(value).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_get_success() {
        assert_eq!(<i64 as TryGetable>::try_get(Value::BigInt(Some(7))), Ok(7));
        assert_eq!(
            <String as TryGetable>::try_get(Value::from("abc".to_string())),
            Ok("abc".to_string())
        );
        assert_eq!(<bool as TryGetable>::try_get(Value::Bool(Some(false))), Ok(false));
    }

    #[test]
    fn test_try_get_null() {
        assert_eq!(
            <String as TryGetable>::try_get(Value::String(None)),
            Err(ConversionError::NullValue)
        );
        assert_eq!(<Option<String> as TryGetable>::try_get(Value::String(None)), Ok(None));
    }

    #[test]
    fn test_try_get_type_mismatch() {
        let result = <i32 as TryGetable>::try_get(Value::from("42".to_string()));
        match result {
            Err(ConversionError::TypeMismatch { expected, actual }) => {
                assert_eq!(expected, "Int");
                assert!(actual.contains("42"));
            }
            other => panic!("Expected TypeMismatch, got: {:?}", other),
        }
    }

    #[test]
    fn test_column_attribution() {
        let err = ConversionError::NullValue.in_column("value");
        assert_eq!(err.column(), Some("value"));
        assert_eq!(err.root(), &ConversionError::NullValue);
        assert!(err.to_string().contains("column value"));

        // attributing twice keeps the innermost column
        let err = err.in_column("other");
        assert_eq!(err.column(), Some("value"));
    }
}
