//! Typed fields.
//!
//! A [`Field<T>`] identifies a column, its declared stored type and the converter
//! between what is stored and the semantic type `T` application code reads and
//! writes. In SQL position a converted field renders exactly like a plain column;
//! the converter only runs when values are bound or fetched.
//!
//! # Example
//!
//! ```no_run
//! use buoy::{Field, JsonConverter, StoredType};
//!
//! let id: Field<i32> = Field::column("id");
//! let value: Field<serde_json::Value> =
//!     Field::converted("value", JsonConverter::new()).stored_as(StoredType::Jsonb);
//!
//! // Type-safe: id.eq() accepts i32, value.eq() accepts a JSON tree
//! let by_id = id.eq(1);
//! let empty = value.eq(serde_json::json!({}));
//! ```

use crate::query::converter::{Codec, Converter, Identity};
use crate::query::expr::{BinOper, ColumnRef, Condition, Expr, Expression, Param, UnOper};
use crate::value::{ConversionError, StoredType, TryGetable, ValueType};
use sea_query::Value;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Typed reference to a column
///
/// Cloning is cheap; clones share the converter. Fields are immutable once built
/// and can be shared freely across threads and statements.
pub struct Field<T> {
    column: ColumnRef,
    codec: Arc<dyn Codec<T>>,
}

impl<T> Clone for Field<T> {
    fn clone(&self) -> Self {
        Self {
            column: self.column.clone(),
            codec: Arc::clone(&self.codec),
        }
    }
}

impl<T> fmt::Debug for Field<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.column.name())
            .field("stored_type", &self.column.stored_type())
            .finish()
    }
}

impl<T> Field<T>
where
    T: fmt::Debug + Send + Sync + 'static,
{
    /// Field with an explicit converter and stored type.
    pub fn new<C>(name: &str, stored_type: Option<StoredType>, converter: C) -> Self
    where
        C: Converter<Semantic = T>,
    {
        Self {
            column: ColumnRef::new(name, stored_type),
            codec: Arc::new(converter),
        }
    }

    /// Unconverted column stored as `T`'s default type.
    pub fn column(name: &str) -> Self
    where
        T: TryGetable + Clone,
    {
        Self::new(name, T::stored_type(), Identity::<T>::new())
    }

    /// Converted column stored as the converter's stored type default.
    pub fn converted<C>(name: &str, converter: C) -> Self
    where
        C: Converter<Semantic = T>,
    {
        let stored_type = <C::Stored as ValueType>::stored_type();
        Self::new(name, stored_type, converter)
    }

    /// Override the declared stored type, e.g. `jsonb` for text-encoded JSON.
    pub fn stored_as(self, stored_type: StoredType) -> Self {
        Self {
            column: self.column.with_stored_type(Some(stored_type)),
            codec: self.codec,
        }
    }

    pub fn name(&self) -> &str {
        self.column.name()
    }

    pub fn stored_type(&self) -> Option<StoredType> {
        self.column.stored_type()
    }

    pub fn column_ref(&self) -> &ColumnRef {
        &self.column
    }

    /// Decode a stored value through this field's converter.
    ///
    /// # Errors
    ///
    /// Returns `ConversionError` (attributed to this column) if the stored value
    /// is null, of the wrong variant or malformed.
    pub fn decode(&self, value: Value) -> Result<T, ConversionError> {
        self.codec
            .decode(value)
            .map_err(|e| e.in_column(self.name()))
    }

    /// Encode a semantic value into its stored form.
    pub fn encode(&self, value: &T) -> Result<Value, ConversionError> {
        self.codec
            .encode(value)
            .map_err(|e| e.in_column(self.name()))
    }

    /// This field as an expression node.
    pub fn expr(&self) -> Expr {
        Expr::Column(self.column.clone())
    }

    /// A value bound through this field's converter.
    ///
    /// Encoding happens when the statement is rendered, so a conversion failure
    /// surfaces from rendering rather than from building.
    pub fn val(&self, value: T) -> Expr {
        Expr::Param(Param::pending(Arc::clone(&self.codec), value, &self.column))
    }

    /// Create an equality filter: `column = value`
    pub fn eq(&self, value: impl IntoExpr<T>) -> Condition {
        self.compare(BinOper::Equal, value)
    }

    /// Create a not-equal filter: `column <> value`
    pub fn ne(&self, value: impl IntoExpr<T>) -> Condition {
        self.compare(BinOper::NotEqual, value)
    }

    /// Create a less-than filter: `column < value`
    pub fn lt(&self, value: impl IntoExpr<T>) -> Condition {
        self.compare(BinOper::SmallerThan, value)
    }

    /// Create a less-than-or-equal filter: `column <= value`
    pub fn lte(&self, value: impl IntoExpr<T>) -> Condition {
        self.compare(BinOper::SmallerThanOrEqual, value)
    }

    /// Create a greater-than filter: `column > value`
    pub fn gt(&self, value: impl IntoExpr<T>) -> Condition {
        self.compare(BinOper::GreaterThan, value)
    }

    /// Create a greater-than-or-equal filter: `column >= value`
    pub fn gte(&self, value: impl IntoExpr<T>) -> Condition {
        self.compare(BinOper::GreaterThanOrEqual, value)
    }

    /// Create an IS NULL filter: `column IS NULL`
    pub fn is_null(&self) -> Condition {
        Condition::new(Expr::unary(UnOper::IsNull, self.expr()))
    }

    /// Create an IS NOT NULL filter: `column IS NOT NULL`
    pub fn is_not_null(&self) -> Condition {
        Condition::new(Expr::unary(UnOper::IsNotNull, self.expr()))
    }

    fn compare(&self, op: BinOper, value: impl IntoExpr<T>) -> Condition {
        Condition::new(Expr::binary(self.expr(), op, value.into_expr(self)))
    }
}

/// Anything that can stand on the right-hand side of a `Field<T>`: a plain `T`
/// (bound through the field's converter), an `Expression<T>` or another field.
pub trait IntoExpr<T> {
    fn into_expr(self, field: &Field<T>) -> Expr;
}

impl<T> IntoExpr<T> for T
where
    T: fmt::Debug + Send + Sync + 'static,
{
    fn into_expr(self, field: &Field<T>) -> Expr {
        field.val(self)
    }
}

impl<T> IntoExpr<T> for Expression<T> {
    fn into_expr(self, _field: &Field<T>) -> Expr {
        Expression::into_expr(self)
    }
}

impl<T> IntoExpr<T> for &Field<T>
where
    T: fmt::Debug + Send + Sync + 'static,
{
    fn into_expr(self, _field: &Field<T>) -> Expr {
        self.expr()
    }
}

/// A field with its semantic type erased, as held by tables and records.
pub trait AnyField: Send + Sync + fmt::Debug {
    fn column_ref(&self) -> &ColumnRef;

    /// Decode a stored value into a boxed semantic value.
    fn decode_any(&self, value: Value) -> Result<Box<dyn Any + Send + Sync>, ConversionError>;

    fn name(&self) -> &str {
        self.column_ref().name()
    }
}

impl<T> AnyField for Field<T>
where
    T: fmt::Debug + Send + Sync + 'static,
{
    fn column_ref(&self) -> &ColumnRef {
        &self.column
    }

    fn decode_any(&self, value: Value) -> Result<Box<dyn Any + Send + Sync>, ConversionError> {
        let decoded = self.decode(value)?;
        Ok(Box::new(decoded))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json::JsonConverter;

    #[test]
    fn test_plain_field_uses_default_stored_type() {
        let id: Field<i32> = Field::column("id");
        assert_eq!(id.name(), "id");
        assert_eq!(id.stored_type(), Some(StoredType::Integer));
    }

    #[test]
    fn test_converted_field_declares_override() {
        let value: Field<serde_json::Value> = Field::converted("value", JsonConverter::new());
        assert_eq!(value.stored_type(), Some(StoredType::Text));

        let value = value.stored_as(StoredType::Jsonb);
        assert_eq!(value.stored_type(), Some(StoredType::Jsonb));
        assert!(matches!(value.expr(), Expr::Column(ref c) if c.name() == "value"));
    }

    #[test]
    fn test_decode_attributes_errors_to_column() {
        let id: Field<i32> = Field::column("id");
        let err = id.decode(Value::from("x".to_string())).unwrap_err();
        assert_eq!(err.column(), Some("id"));
        assert!(matches!(err.root(), ConversionError::TypeMismatch { .. }));
    }

    #[test]
    fn test_val_defers_encoding() {
        let id: Field<i32> = Field::column("id");
        match id.val(5) {
            Expr::Param(param) => {
                assert_eq!(param.column(), Some("id"));
                assert_eq!(param.stored_type(), Some(StoredType::Integer));
                assert_eq!(param.encode(), Ok(Value::Int(Some(5))));
            }
            other => panic!("expected a bind parameter, got {:?}", other),
        }
    }

    #[test]
    fn test_comparisons_accept_fields_and_values() {
        let a: Field<i32> = Field::column("a");
        let b: Field<i32> = Field::column("b");

        let by_value = a.eq(1);
        assert!(matches!(
            by_value.expr(),
            Expr::Binary(_, BinOper::Equal, rhs) if matches!(**rhs, Expr::Param(_))
        ));

        let by_field = a.gt(&b);
        assert!(matches!(
            by_field.expr(),
            Expr::Binary(_, BinOper::GreaterThan, rhs) if matches!(**rhs, Expr::Column(_))
        ));
    }

    #[test]
    fn test_any_field_decodes_into_box() {
        let id: Field<i32> = Field::column("id");
        let erased: &dyn AnyField = &id;
        let decoded = erased.decode_any(Value::Int(Some(3))).expect("decode");
        assert_eq!(decoded.downcast_ref::<i32>(), Some(&3));
        assert_eq!(erased.name(), "id");
    }
}
