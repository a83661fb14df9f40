//! Fetched rows.

use crate::error::BuoyError;
use crate::executor::{DriverError, Executor};
use crate::query::column::{AnyField, Field};
use crate::query::execution::Dsl;
use crate::query::expr::{BinOper, Condition, Expr, Param};
use crate::query::table::Table;
use sea_query::Value;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A typed row
///
/// Every value is decoded through its field's converter when the row is
/// fetched, so a malformed stored value fails the fetch instead of surfacing
/// later. The record is a snapshot: it only changes when it is refreshed.
pub struct Record {
    table: Table,
    fields: Vec<Arc<dyn AnyField>>,
    stored: Vec<Value>,
    values: Vec<Box<dyn Any + Send + Sync>>,
}

impl Record {
    /// Decode a raw row selected as `fields` from `table`.
    pub(crate) fn decode(
        table: &Table,
        fields: &[Arc<dyn AnyField>],
        row: Vec<Value>,
    ) -> Result<Self, BuoyError> {
        if row.len() != fields.len() {
            return Err(DriverError::RowWidth {
                expected: fields.len(),
                actual: row.len(),
            }
            .into());
        }
        let values = fields
            .iter()
            .zip(row.iter())
            .map(|(field, value)| field.decode_any(value.clone()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            table: table.clone(),
            fields: fields.to_vec(),
            stored: row,
            values,
        })
    }

    /// The decoded value of `field`, or `None` if it was not selected.
    pub fn get<T>(&self, field: &Field<T>) -> Option<&T>
    where
        T: fmt::Debug + Send + Sync + 'static,
    {
        let index = self.position(field.name())?;
        let value: &(dyn Any + Send + Sync) = &*self.values[index];
        value.downcast_ref::<T>()
    }

    /// The stored form of a column as it came from the database.
    pub fn stored(&self, column: &str) -> Option<&Value> {
        self.position(column).map(|index| &self.stored[index])
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    /// Names of the columns this record holds, in select order.
    pub fn columns(&self) -> impl Iterator<Item = &str> + '_ {
        self.fields.iter().map(|f| f.name())
    }

    pub(crate) fn fields(&self) -> &[Arc<dyn AnyField>] {
        &self.fields
    }

    /// Re-read this record by primary key, replacing its values in place.
    ///
    /// # Errors
    ///
    /// Returns `BuoyError::RecordNotFound` if the row no longer exists and
    /// `BuoyError::MissingPrimaryKey` if the record cannot be identified.
    pub fn refresh<E>(&mut self, dsl: &Dsl<'_, E>) -> Result<(), BuoyError>
    where
        E: Executor + ?Sized,
    {
        dsl.refresh(self)
    }

    /// `pk1 = $1 AND pk2 = $2 …` over the stored key values.
    pub(crate) fn primary_key_condition(&self) -> Result<Condition, BuoyError> {
        let missing = || BuoyError::MissingPrimaryKey {
            table: self.table.name().to_string(),
        };
        let mut condition: Option<Condition> = None;
        for key in self.table.primary_key() {
            let index = self.position(key).ok_or_else(missing)?;
            let column = self.fields[index].column_ref().clone();
            let value = Expr::Param(Param::encoded(
                self.stored[index].clone(),
                column.stored_type(),
            ));
            let term = Condition::new(Expr::binary(Expr::Column(column), BinOper::Equal, value));
            condition = Some(match condition {
                Some(existing) => existing.and(term),
                None => term,
            });
        }
        condition.ok_or_else(missing)
    }

    pub(crate) fn replace_with(&mut self, fresh: Record) {
        self.stored = fresh.stored;
        self.values = fresh.values;
    }

    fn position(&self, column: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name() == column)
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (field, value) in self.fields.iter().zip(&self.stored) {
            map.entry(&field.name(), value);
        }
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json::json_field;
    use crate::query::render::Renderer;
    use crate::value::{ConversionError, StoredType};
    use serde_json::json;

    struct Schema {
        id: Field<i32>,
        value: Field<serde_json::Value>,
        table: Table,
    }

    fn schema() -> Schema {
        let id: Field<i32> = Field::column("id");
        let value = json_field("value");
        let table = Table::builder("test").primary_key(&id).field(&value).build();
        Schema { id, value, table }
    }

    fn row(id: i32, json: &str) -> Vec<Value> {
        vec![Value::Int(Some(id)), Value::from(json.to_string())]
    }

    #[test]
    fn test_decode_and_get() {
        let s = schema();
        let record = Record::decode(&s.table, s.table.fields(), row(1, r#"{"age":35}"#))
            .expect("decode");
        assert_eq!(record.get(&s.id), Some(&1));
        assert_eq!(record.get(&s.value), Some(&json!({"age": 35})));
        assert_eq!(record.stored("id"), Some(&Value::Int(Some(1))));
        assert_eq!(record.columns().collect::<Vec<_>>(), vec!["id", "value"]);
    }

    #[test]
    fn test_get_unselected_field() {
        let s = schema();
        let other: Field<i32> = Field::column("other");
        let record = Record::decode(&s.table, &s.table.fields()[..1], vec![Value::Int(Some(1))])
            .expect("decode");
        assert_eq!(record.get(&other), None);
        assert_eq!(record.get(&s.value), None);
    }

    #[test]
    fn test_malformed_value_fails_decode() {
        let s = schema();
        let err = Record::decode(&s.table, s.table.fields(), row(1, "{not json"))
            .expect_err("malformed JSON must not decode");
        match err {
            BuoyError::Conversion(e) => {
                assert_eq!(e.column(), Some("value"));
                assert!(matches!(e.root(), ConversionError::Malformed { .. }));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_row_width_is_checked() {
        let s = schema();
        let err = Record::decode(&s.table, s.table.fields(), vec![Value::Int(Some(1))])
            .expect_err("short row");
        assert!(matches!(
            err,
            BuoyError::Driver(DriverError::RowWidth {
                expected: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn test_primary_key_condition() {
        let s = schema();
        let record =
            Record::decode(&s.table, s.table.fields(), row(7, "{}")).expect("decode");
        let condition = record.primary_key_condition().expect("condition");
        let query = Renderer::default()
            .render_expr(condition.expr())
            .expect("render");
        assert_eq!(query.sql, "id = $1");
        assert_eq!(query.params[0].value, Value::Int(Some(7)));
        assert_eq!(query.params[0].stored_type, StoredType::Integer);
    }

    #[test]
    fn test_missing_primary_key() {
        let s = schema();
        let keyless = Table::builder("keyless").field(&s.value).build();
        let record = Record::decode(&keyless, keyless.fields(), vec![Value::from("{}".to_string())])
            .expect("decode");
        assert!(matches!(
            record.primary_key_condition(),
            Err(BuoyError::MissingPrimaryKey { .. })
        ));
    }
}
