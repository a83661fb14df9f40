//! Expression trees.
//!
//! An [`Expr`] is an immutable tree of column references, literals and function
//! calls, built bottom-up and never mutated afterwards. Building one never touches
//! the database; values bound through a field keep their semantic form until the
//! renderer encodes them with the field's converter.
//!
//! Vendor functions the builder knows nothing about are expressed with
//! [`Expr::template`]: a SQL snippet with indexed slots `{0}`, `{1}`, … filled with
//! the rendered children in order. No catalog check is done; slot references are
//! validated when the expression is rendered.
//!
//! ```rust
//! use buoy::{json_field, Expr, StoredType};
//!
//! let value = json_field("value");
//! let call = Expr::template(
//!     "jsonb_set({0}, {1}, {2})",
//!     StoredType::Jsonb,
//!     [value.expr(), Expr::text_array(["name"]), value.val(serde_json::json!("x"))],
//! );
//! assert_eq!(call.result_type(), Some(StoredType::Jsonb));
//! ```

use crate::query::converter::Codec;
use crate::value::{ConversionError, StoredType, ValueType};
use sea_query::Value;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// A node of an expression tree
#[derive(Debug, Clone)]
pub enum Expr {
    /// Reference to a column
    Column(ColumnRef),
    /// Value sent out-of-band as a bind parameter
    Param(Param),
    /// Value written into the SQL text as a literal
    Inline(Literal),
    /// Named or templated function call
    Function(FunctionCall),
    /// Comparison or logical connective
    Binary(Box<Expr>, BinOper, Box<Expr>),
    /// `NOT`, `IS NULL`, `IS NOT NULL`
    Unary(UnOper, Box<Expr>),
}

impl Expr {
    /// Reference a column by name and stored type.
    pub fn column(name: &str, stored_type: Option<StoredType>) -> Self {
        Expr::Column(ColumnRef::new(name, stored_type))
    }

    /// Bind an already stored-form value, typed by its Rust type's default mapping.
    pub fn value<V: ValueType>(value: V) -> Self {
        Expr::Param(Param::encoded(value.into_value(), V::stored_type()))
    }

    /// Bind a raw stored value with an explicit stored type.
    pub fn stored(value: Value, stored_type: StoredType) -> Self {
        Expr::Param(Param::encoded(value, Some(stored_type)))
    }

    /// Write a value into the SQL text as a literal instead of binding it.
    pub fn inline<V: ValueType>(value: V) -> Self {
        Expr::Inline(Literal {
            value: value.into_value(),
            stored_type: V::stored_type(),
        })
    }

    /// Inline `text[]` literal, e.g. `'{name}'` for a JSON path.
    pub fn text_array<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Expr::Inline(Literal {
            value: Value::from(array_literal(items)),
            stored_type: Some(StoredType::TextArray),
        })
    }

    /// `name(arg0, arg1, …)`
    pub fn function<I>(name: &str, result: StoredType, args: I) -> Self
    where
        I: IntoIterator<Item = Expr>,
    {
        Expr::Function(FunctionCall {
            kind: FunctionKind::Named(name.to_string()),
            args: args.into_iter().collect(),
            result: Some(result),
        })
    }

    /// Template call: `{n}` in `template` is replaced by the n-th rendered argument.
    pub fn template<I>(template: &str, result: StoredType, args: I) -> Self
    where
        I: IntoIterator<Item = Expr>,
    {
        Expr::Function(FunctionCall {
            kind: FunctionKind::Template(template.to_string()),
            args: args.into_iter().collect(),
            result: Some(result),
        })
    }

    pub fn binary(lhs: Expr, op: BinOper, rhs: Expr) -> Self {
        Expr::Binary(Box::new(lhs), op, Box::new(rhs))
    }

    pub fn unary(op: UnOper, operand: Expr) -> Self {
        Expr::Unary(op, Box::new(operand))
    }

    /// Result type of this node. Predicates are boolean.
    pub fn result_type(&self) -> Option<StoredType> {
        match self {
            Expr::Column(column) => column.stored_type(),
            Expr::Param(param) => param.stored_type(),
            Expr::Inline(literal) => literal.stored_type(),
            Expr::Function(call) => call.result,
            Expr::Binary(..) | Expr::Unary(..) => Some(StoredType::Boolean),
        }
    }
}

/// Column name plus declared stored type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    name: Arc<str>,
    stored_type: Option<StoredType>,
}

impl ColumnRef {
    pub fn new(name: &str, stored_type: Option<StoredType>) -> Self {
        Self {
            name: Arc::from(name),
            stored_type,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stored_type(&self) -> Option<StoredType> {
        self.stored_type
    }

    pub(crate) fn with_stored_type(&self, stored_type: Option<StoredType>) -> Self {
        Self {
            name: Arc::clone(&self.name),
            stored_type,
        }
    }
}

/// A bind parameter waiting to be encoded
#[derive(Debug, Clone)]
pub struct Param {
    source: Arc<dyn Bindable>,
    stored_type: Option<StoredType>,
}

impl Param {
    pub(crate) fn encoded(value: Value, stored_type: Option<StoredType>) -> Self {
        Self {
            source: Arc::new(Encoded(value)),
            stored_type,
        }
    }

    pub(crate) fn pending<T>(
        codec: Arc<dyn Codec<T>>,
        value: T,
        column: &ColumnRef,
    ) -> Self
    where
        T: fmt::Debug + Send + Sync + 'static,
    {
        Self {
            source: Arc::new(Pending {
                codec,
                value,
                column: Arc::clone(&column.name),
            }),
            stored_type: column.stored_type(),
        }
    }

    pub fn stored_type(&self) -> Option<StoredType> {
        self.stored_type
    }

    /// Column whose converter encodes this value, if it came from a field.
    pub fn column(&self) -> Option<&str> {
        self.source.column()
    }

    /// Stored representation of the value.
    pub fn encode(&self) -> Result<Value, ConversionError> {
        self.source.encode()
    }
}

pub(crate) trait Bindable: Send + Sync + fmt::Debug {
    fn encode(&self) -> Result<Value, ConversionError>;
    fn column(&self) -> Option<&str>;
}

#[derive(Debug)]
struct Encoded(Value);

impl Bindable for Encoded {
    fn encode(&self) -> Result<Value, ConversionError> {
        Ok(self.0.clone())
    }

    fn column(&self) -> Option<&str> {
        None
    }
}

/// Semantic value plus the converter that will store it.
struct Pending<T> {
    codec: Arc<dyn Codec<T>>,
    value: T,
    column: Arc<str>,
}

impl<T: fmt::Debug> fmt::Debug for Pending<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pending")
            .field("column", &self.column)
            .field("value", &self.value)
            .finish()
    }
}

impl<T> Bindable for Pending<T>
where
    T: fmt::Debug + Send + Sync + 'static,
{
    fn encode(&self) -> Result<Value, ConversionError> {
        self.codec
            .encode(&self.value)
            .map_err(|e| e.in_column(&self.column))
    }

    fn column(&self) -> Option<&str> {
        Some(&self.column)
    }
}

/// Inline literal
#[derive(Debug, Clone, PartialEq)]
pub struct Literal {
    value: Value,
    stored_type: Option<StoredType>,
}

impl Literal {
    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn stored_type(&self) -> Option<StoredType> {
        self.stored_type
    }
}

#[derive(Debug, Clone)]
pub struct FunctionCall {
    pub(crate) kind: FunctionKind,
    pub(crate) args: Vec<Expr>,
    pub(crate) result: Option<StoredType>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FunctionKind {
    Named(String),
    Template(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOper {
    Equal,
    NotEqual,
    SmallerThan,
    SmallerThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    And,
    Or,
}

impl BinOper {
    pub fn as_str(self) -> &'static str {
        match self {
            BinOper::Equal => "=",
            BinOper::NotEqual => "<>",
            BinOper::SmallerThan => "<",
            BinOper::SmallerThanOrEqual => "<=",
            BinOper::GreaterThan => ">",
            BinOper::GreaterThanOrEqual => ">=",
            BinOper::And => "AND",
            BinOper::Or => "OR",
        }
    }

    pub(crate) fn is_logical(self) -> bool {
        matches!(self, BinOper::And | BinOper::Or)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOper {
    Not,
    IsNull,
    IsNotNull,
}

/// An expression whose semantic result type is `T`
///
/// This is what vendor-function helpers such as [`set_by_key`](crate::set_by_key)
/// return, so the result can be assigned to a `Field<T>` in an update.
pub struct Expression<T> {
    expr: Expr,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Expression<T> {
    /// Wrap an untyped node. The caller vouches for the semantic type.
    pub fn new(expr: Expr) -> Self {
        Self {
            expr,
            _marker: PhantomData,
        }
    }

    pub fn template<I>(template: &str, result: StoredType, args: I) -> Self
    where
        I: IntoIterator<Item = Expr>,
    {
        Self::new(Expr::template(template, result, args))
    }

    pub fn function<I>(name: &str, result: StoredType, args: I) -> Self
    where
        I: IntoIterator<Item = Expr>,
    {
        Self::new(Expr::function(name, result, args))
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    pub fn into_expr(self) -> Expr {
        self.expr
    }

    pub fn result_type(&self) -> Option<StoredType> {
        self.expr.result_type()
    }
}

impl<T> Clone for Expression<T> {
    fn clone(&self) -> Self {
        Self::new(self.expr.clone())
    }
}

impl<T> fmt::Debug for Expression<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Expression").field(&self.expr).finish()
    }
}

/// A boolean expression usable as a `WHERE` predicate
#[derive(Debug, Clone)]
pub struct Condition(Expr);

impl Condition {
    pub fn new(expr: Expr) -> Self {
        Condition(expr)
    }

    pub fn and(self, other: Condition) -> Self {
        Condition(Expr::binary(self.0, BinOper::And, other.0))
    }

    pub fn or(self, other: Condition) -> Self {
        Condition(Expr::binary(self.0, BinOper::Or, other.0))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Condition(Expr::unary(UnOper::Not, self.0))
    }

    pub fn expr(&self) -> &Expr {
        &self.0
    }

    pub fn into_expr(self) -> Expr {
        self.0
    }
}

/// Format a PostgreSQL array literal body, e.g. `{name,"first name"}`.
pub(crate) fn array_literal<I, S>(items: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let elements: Vec<String> = items
        .into_iter()
        .map(|item| {
            let item = item.as_ref();
            let needs_quotes = item.is_empty()
                || item.eq_ignore_ascii_case("null")
                || item
                    .chars()
                    .any(|c| matches!(c, '{' | '}' | ',' | '"' | '\\') || c.is_whitespace());
            if needs_quotes {
                let escaped = item.replace('\\', "\\\\").replace('"', "\\\"");
                format!("\"{}\"", escaped)
            } else {
                item.to_string()
            }
        })
        .collect();
    format!("{{{}}}", elements.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_array_literal_plain() {
        assert_eq!(array_literal(["name"]), "{name}");
        assert_eq!(array_literal(["name", "first"]), "{name,first}");
        assert_eq!(array_literal(Vec::<String>::new()), "{}");
    }

    #[test]
    fn test_array_literal_quoting() {
        assert_eq!(array_literal(["first name"]), r#"{"first name"}"#);
        assert_eq!(array_literal(["a,b"]), r#"{"a,b"}"#);
        assert_eq!(array_literal([r#"say "hi""#]), r#"{"say \"hi\""}"#);
        assert_eq!(array_literal(["NULL"]), r#"{"NULL"}"#);
        assert_eq!(array_literal([""]), r#"{""}"#);
    }

    #[test]
    fn test_result_types() {
        assert_eq!(Expr::value(1i64).result_type(), Some(StoredType::BigInt));
        assert_eq!(Expr::text_array(["a"]).result_type(), Some(StoredType::TextArray));
        assert_eq!(
            Expr::function("now", StoredType::Text, []).result_type(),
            Some(StoredType::Text)
        );
        let predicate = Expr::binary(
            Expr::column("id", Some(StoredType::Integer)),
            BinOper::Equal,
            Expr::value(1i32),
        );
        assert_eq!(predicate.result_type(), Some(StoredType::Boolean));
        assert_eq!(Expr::value(Value::Int(Some(1))).result_type(), None);
    }

    #[test]
    fn test_function_preserves_argument_order() {
        let call = Expr::function(
            "f",
            StoredType::Text,
            [Expr::value(1i32), Expr::value(2i32), Expr::value(3i32)],
        );
        let Expr::Function(call) = call else {
            panic!("expected a function call");
        };
        let encoded: Vec<Value> = call
            .args
            .iter()
            .map(|arg| match arg {
                Expr::Param(param) => param.encode().expect("encode"),
                other => panic!("unexpected node {:?}", other),
            })
            .collect();
        assert_eq!(
            encoded,
            vec![Value::Int(Some(1)), Value::Int(Some(2)), Value::Int(Some(3))]
        );
    }
}
