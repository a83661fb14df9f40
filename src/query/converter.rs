//! Converters between stored and semantic column values.
//!
//! A [`Converter`] is a pure, deterministic pair of functions between the type a
//! column is stored as (`Stored`, e.g. text-encoded JSON) and the type application
//! code works with (`Semantic`, e.g. a parsed JSON tree). Fields hold their
//! converter behind the crate-private [`Codec`] trait so statements can carry
//! values of any semantic type without knowing the stored type statically.

use crate::value::{ConversionError, TryGetable, ValueType};
use sea_query::Value;
use std::marker::PhantomData;

/// Bidirectional mapping between a stored representation and a semantic type
///
/// Implementations must be total and lossless for the values they accept:
/// `from_stored(to_stored(v)?)` returns `v`. A stored value that is not a valid
/// encoding must be rejected with a [`ConversionError`], never replaced by a default.
///
/// # Example
///
/// ```rust
/// use buoy::{ConversionError, Converter};
///
/// /// Cents stored as `bigint`, handled as a decimal string.
/// struct Cents;
///
/// impl Converter for Cents {
///     type Stored = i64;
///     type Semantic = String;
///
///     fn from_stored(&self, stored: i64) -> Result<String, ConversionError> {
///         Ok(format!("{}.{:02}", stored / 100, stored % 100))
///     }
///
///     fn to_stored(&self, value: &String) -> Result<i64, ConversionError> {
///         let (units, cents) = value
///             .split_once('.')
///             .ok_or_else(|| ConversionError::Unencodable(value.clone()))?;
///         let units: i64 = units.parse().map_err(|_| ConversionError::Unencodable(value.clone()))?;
///         let cents: i64 = cents.parse().map_err(|_| ConversionError::Unencodable(value.clone()))?;
///         Ok(units * 100 + cents)
///     }
/// }
///
/// assert_eq!(Cents.from_stored(1250).unwrap(), "12.50");
/// assert_eq!(Cents.to_stored(&"12.50".to_string()).unwrap(), 1250);
/// ```
pub trait Converter: Send + Sync + 'static {
    /// Representation in the database
    type Stored: TryGetable;
    /// Representation in application code
    type Semantic;

    /// Decode a stored value. Fails on malformed input.
    fn from_stored(&self, stored: Self::Stored) -> Result<Self::Semantic, ConversionError>;

    /// Encode a semantic value for storage.
    fn to_stored(&self, value: &Self::Semantic) -> Result<Self::Stored, ConversionError>;
}

/// The converter of unconverted fields: stored and semantic types are the same.
pub struct Identity<T>(PhantomData<fn() -> T>);

impl<T> Identity<T> {
    pub fn new() -> Self {
        Identity(PhantomData)
    }
}

impl<T> Default for Identity<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Converter for Identity<T>
where
    T: TryGetable + Clone + 'static,
{
    type Stored = T;
    type Semantic = T;

    fn from_stored(&self, stored: T) -> Result<T, ConversionError> {
        Ok(stored)
    }

    fn to_stored(&self, value: &T) -> Result<T, ConversionError> {
        Ok(value.clone())
    }
}

/// Lifts a converter over `Option`, mapping SQL NULL to `None` in both directions.
///
/// ```rust
/// use buoy::{Converter, JsonConverter, Nullable};
///
/// let converter = Nullable::new(JsonConverter::<serde_json::Value>::new());
/// assert_eq!(converter.from_stored(None).unwrap(), None);
/// assert_eq!(converter.to_stored(&None).unwrap(), None);
/// ```
pub struct Nullable<C>(C);

impl<C> Nullable<C> {
    pub fn new(inner: C) -> Self {
        Nullable(inner)
    }
}

impl<C: Converter> Converter for Nullable<C> {
    type Stored = Option<C::Stored>;
    type Semantic = Option<C::Semantic>;

    fn from_stored(&self, stored: Self::Stored) -> Result<Self::Semantic, ConversionError> {
        stored.map(|s| self.0.from_stored(s)).transpose()
    }

    fn to_stored(&self, value: &Self::Semantic) -> Result<Self::Stored, ConversionError> {
        value.as_ref().map(|v| self.0.to_stored(v)).transpose()
    }
}

/// Type-erased converter working directly on `sea_query::Value`.
pub(crate) trait Codec<T>: Send + Sync {
    fn decode(&self, value: Value) -> Result<T, ConversionError>;
    fn encode(&self, value: &T) -> Result<Value, ConversionError>;
}

impl<C: Converter> Codec<C::Semantic> for C {
    fn decode(&self, value: Value) -> Result<C::Semantic, ConversionError> {
        let stored = <C::Stored as TryGetable>::try_get(value)?;
        self.from_stored(stored)
    }

    fn encode(&self, value: &C::Semantic) -> Result<Value, ConversionError> {
        self.to_stored(value).map(ValueType::into_value)
    }
}
