//! JSON columns.
//!
//! [`JsonConverter`] stores any serde type as text-encoded JSON, the same way a
//! `varchar` column would hold it. Declare the field as `jsonb` (see
//! [`json_field`]) and the driver layer writes and reads the `jsonb` wire format
//! around that text, so the converter never sees anything but JSON text.
//!
//! The helpers at the bottom build partial updates with PostgreSQL's JSON
//! functions. They are ordinary template expressions and can be nested:
//!
//! ```rust
//! use buoy::{json_field, set_by_key, Renderer, RenderOptions, Placeholder};
//! use serde_json::json;
//!
//! let value = json_field("value");
//! let expr = set_by_key(&value, "name", json!({"first": "Christian", "last": "Smith"}));
//!
//! let renderer = Renderer::new(RenderOptions { placeholder: Placeholder::Question });
//! let query = renderer.render_expr(expr.expr()).unwrap();
//! assert_eq!(query.sql, "jsonb_set(value, '{name}', ?)");
//! assert_eq!(query.params.len(), 1);
//! ```

use crate::query::column::Field;
use crate::query::converter::Converter;
use crate::query::expr::{Expr, Expression};
use crate::value::{ConversionError, StoredType};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::marker::PhantomData;

/// Longest prefix of an offending stored value quoted in error messages.
const MAX_QUOTED_LEN: usize = 64;

/// Converter between text-encoded JSON and a serde type
pub struct JsonConverter<T = serde_json::Value>(PhantomData<fn() -> T>);

impl<T> JsonConverter<T> {
    pub fn new() -> Self {
        JsonConverter(PhantomData)
    }
}

impl<T> Default for JsonConverter<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Converter for JsonConverter<T>
where
    T: Serialize + DeserializeOwned + 'static,
{
    type Stored = String;
    type Semantic = T;

    fn from_stored(&self, stored: String) -> Result<T, ConversionError> {
        serde_json::from_str(&stored).map_err(|e| ConversionError::Malformed {
            expected: "JSON".to_string(),
            value: quote_prefix(&stored),
            reason: e.to_string(),
        })
    }

    fn to_stored(&self, value: &T) -> Result<String, ConversionError> {
        serde_json::to_string(value).map_err(|e| ConversionError::Unencodable(e.to_string()))
    }
}

fn quote_prefix(stored: &str) -> String {
    match stored.char_indices().nth(MAX_QUOTED_LEN) {
        Some((end, _)) => format!("{:?}…", &stored[..end]),
        None => format!("{:?}", stored),
    }
}

/// A `jsonb` column holding arbitrary JSON.
pub fn json_field(name: &str) -> Field<serde_json::Value> {
    Field::converted(name, JsonConverter::new()).stored_as(StoredType::Jsonb)
}

fn debug_assert_jsonb<T>(field: &Field<T>, helper: &str) {
    debug_assert!(
        field.stored_type() == Some(StoredType::Jsonb),
        "{} needs a jsonb field, but {} is stored as {:?}",
        helper,
        field.name(),
        field.stored_type()
    );
}

/// Set the value at a top-level key: `jsonb_set(field, '{key}', value)`.
///
/// The key is written inline as a `text[]` path; the value is bound through the
/// field's converter.
pub fn set_by_key<T>(field: &Field<T>, key: &str, value: T) -> Expression<T>
where
    T: fmt::Debug + Send + Sync + 'static,
{
    set_by_path(field, &[key], value)
}

/// Set the value at a nested path: `jsonb_set(field, '{a,b}', value)`.
///
/// Like the other helpers, this panics in debug builds if `field` is not
/// declared `jsonb`.
pub fn set_by_path<T>(field: &Field<T>, path: &[&str], value: T) -> Expression<T>
where
    T: fmt::Debug + Send + Sync + 'static,
{
    debug_assert_jsonb(field, "jsonb_set");
    Expression::template(
        "jsonb_set({0}, {1}, {2})",
        StoredType::Jsonb,
        [field.expr(), Expr::text_array(path), field.val(value)],
    )
}

/// Remove a top-level key: `(field - 'key')`.
pub fn remove_key<T>(field: &Field<T>, key: &str) -> Expression<T>
where
    T: fmt::Debug + Send + Sync + 'static,
{
    debug_assert_jsonb(field, "remove_key");
    Expression::template(
        "({0} - {1})",
        StoredType::Jsonb,
        [field.expr(), Expr::inline(key.to_string())],
    )
}

/// Shallow-merge an object into the column: `(field || value)`.
pub fn merge<T>(field: &Field<T>, value: T) -> Expression<T>
where
    T: fmt::Debug + Send + Sync + 'static,
{
    debug_assert_jsonb(field, "merge");
    Expression::template(
        "({0} || {1})",
        StoredType::Jsonb,
        [field.expr(), field.val(value)],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::render::{Placeholder, RenderOptions, Renderer};
    use sea_query::Value;
    use serde::Deserialize;
    use serde_json::json;

    fn question() -> Renderer {
        Renderer::new(RenderOptions {
            placeholder: Placeholder::Question,
        })
    }

    #[test]
    fn test_round_trip_json_tree() {
        let converter = JsonConverter::<serde_json::Value>::new();
        let doc = json!({
            "age": 35,
            "eyeColor": "brown",
            "name": {"first": "Alice", "last": "Smith"}
        });
        let stored = converter.to_stored(&doc).expect("encode");
        assert_eq!(converter.from_stored(stored).expect("decode"), doc);
    }

    #[test]
    fn test_round_trip_typed_document() {
        #[derive(Debug, PartialEq, Serialize, Deserialize)]
        struct Name {
            first: String,
            last: String,
        }

        let converter = JsonConverter::<Name>::new();
        let name = Name {
            first: "Bob".to_string(),
            last: "Smith".to_string(),
        };
        let stored = converter.to_stored(&name).expect("encode");
        assert_eq!(converter.from_stored(stored).expect("decode"), name);
    }

    #[test]
    fn test_malformed_stored_value_is_an_error() {
        let field = json_field("value");
        let err = field
            .decode(Value::from("{\"age\": 35,".to_string()))
            .unwrap_err();
        assert_eq!(err.column(), Some("value"));
        match err.root() {
            ConversionError::Malformed { expected, value, .. } => {
                assert_eq!(expected, "JSON");
                assert!(value.contains("age"));
            }
            other => panic!("Expected Malformed, got: {:?}", other),
        }
    }

    #[test]
    fn test_null_stored_value_is_an_error() {
        let field = json_field("value");
        let err = field.decode(Value::String(None)).unwrap_err();
        assert_eq!(err.root(), &ConversionError::NullValue);
    }

    #[test]
    fn test_long_values_are_truncated_in_errors() {
        let quoted = quote_prefix(&"x".repeat(200));
        assert!(quoted.len() < 100);
        assert!(quoted.ends_with('…'));
    }

    #[test]
    fn test_json_field_is_jsonb() {
        assert_eq!(json_field("value").stored_type(), Some(StoredType::Jsonb));
    }

    #[test]
    fn test_set_by_key_renders_jsonb_set() {
        let value = json_field("value");
        let expr = set_by_key(&value, "name", json!({"first": "Christian", "last": "Smith"}));
        let query = question().render_expr(expr.expr()).expect("render");

        assert_eq!(query.sql, "jsonb_set(value, '{name}', ?)");
        assert_eq!(query.params.len(), 1);
        assert_eq!(query.params[0].stored_type, StoredType::Jsonb);
        let text = match &query.params[0].value {
            Value::String(Some(s)) => s.to_string(),
            other => panic!("expected JSON text, got {:?}", other),
        };
        let bound: serde_json::Value = serde_json::from_str(&text).expect("bound JSON");
        assert_eq!(bound["first"], "Christian");
    }

    #[test]
    fn test_set_by_path_quotes_path_elements() {
        let value = json_field("value");
        let expr = set_by_path(&value, &["name", "first name"], json!("Christian"));
        let query = question().render_expr(expr.expr()).expect("render");
        assert_eq!(query.sql, r#"jsonb_set(value, '{name,"first name"}', ?)"#);
    }

    #[test]
    fn test_remove_key_and_merge() {
        let value = json_field("value");

        let removed = question()
            .render_expr(remove_key(&value, "eyeColor").expr())
            .expect("render");
        assert_eq!(removed.sql, "(value - 'eyeColor')");
        assert!(removed.params.is_empty());

        let merged = question()
            .render_expr(merge(&value, json!({"age": 36})).expr())
            .expect("render");
        assert_eq!(merged.sql, "(value || ?)");
        assert_eq!(merged.params.len(), 1);
    }

    #[test]
    fn test_helpers_nest() {
        let value = json_field("value");
        let inner = remove_key(&value, "eyeColor");
        let outer = Expression::<serde_json::Value>::template(
            "jsonb_set({0}, {1}, {2})",
            StoredType::Jsonb,
            [inner.into_expr(), Expr::text_array(["age"]), value.val(json!(36))],
        );
        let query = question().render_expr(outer.expr()).expect("render");
        assert_eq!(query.sql, "jsonb_set((value - 'eyeColor'), '{age}', ?)");
        assert_eq!(query.params.len(), 1);
    }

    #[test]
    fn test_nested_set_binds_both_levels_in_order() {
        let value = json_field("value");
        let inner = set_by_key(&value, "a", json!(1));
        let outer = Expression::<serde_json::Value>::template(
            "jsonb_set({0}, {1}, {2})",
            StoredType::Jsonb,
            [inner.into_expr(), Expr::text_array(["b"]), value.val(json!(2))],
        );

        let query = Renderer::default().render_expr(outer.expr()).expect("render");
        assert_eq!(query.sql, "jsonb_set(jsonb_set(value, '{a}', $1), '{b}', $2)");
        let bound: Vec<Value> = query.params.into_iter().map(|p| p.value).collect();
        assert_eq!(
            bound,
            vec![Value::from("1".to_string()), Value::from("2".to_string())]
        );

        let query = question().render_expr(outer.expr()).expect("render");
        assert_eq!(query.sql, "jsonb_set(jsonb_set(value, '{a}', ?), '{b}', ?)");
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "jsonb_set needs a jsonb field")]
    fn test_set_by_key_rejects_non_jsonb_field() {
        let id: Field<i32> = Field::column("id");
        let _ = set_by_key(&id, "k", 1);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "merge needs a jsonb field")]
    fn test_merge_rejects_text_field() {
        let text = Field::converted("doc", JsonConverter::<serde_json::Value>::new());
        let _ = merge(&text, json!({}));
    }
}
