//! Statements and their staged builders.
//!
//! Each builder stage only exposes the calls that make sense next, so an
//! `INSERT` without a column list or an `UPDATE` without a `SET` cannot be
//! written. A finished builder converts into a [`Statement`] and is not touched
//! again after it is handed to the renderer.
//!
//! # Example
//!
//! ```rust
//! use buoy::{insert_into, json_field, select_from, update, Field, Renderer, Statement, Table};
//! use serde_json::json;
//!
//! let id: Field<i32> = Field::column("id");
//! let value = json_field("value");
//! let test = Table::builder("test").primary_key(&id).field(&value).build();
//!
//! let insert: Statement = insert_into(&test)
//!     .columns((&id, &value))
//!     .values((1, json!({"age": 35})))
//!     .into();
//! let query = Renderer::default().render(&insert).unwrap();
//! assert_eq!(query.sql, "INSERT INTO test (id, value) VALUES ($1, $2)");
//!
//! let change: Statement = update(&test)
//!     .set(&value, json!({"age": 36}))
//!     .filter(id.eq(1))
//!     .into();
//! let query = Renderer::default().render(&change).unwrap();
//! assert_eq!(query.sql, "UPDATE test SET value = $1 WHERE id = $2");
//!
//! let query = Renderer::default().render(&select_from(&test).filter(id.eq(1)).into()).unwrap();
//! assert_eq!(query.sql, "SELECT id, value FROM test WHERE id = $1");
//! ```

use crate::query::column::{AnyField, Field, IntoExpr};
use crate::query::expr::{ColumnRef, Condition, Expr};
use crate::query::table::Table;
use std::fmt;
use std::sync::Arc;

/// A statement ready to render
#[derive(Debug, Clone)]
pub enum Statement {
    Insert(Insert),
    Update(Update),
    Select(Select),
    Truncate(Truncate),
}

impl Statement {
    pub fn kind(&self) -> &'static str {
        match self {
            Statement::Insert(_) => "INSERT",
            Statement::Update(_) => "UPDATE",
            Statement::Select(_) => "SELECT",
            Statement::Truncate(_) => "TRUNCATE",
        }
    }

    pub fn table(&self) -> &Table {
        match self {
            Statement::Insert(s) => &s.table,
            Statement::Update(s) => &s.table,
            Statement::Select(s) => &s.table,
            Statement::Truncate(s) => &s.table,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Insert {
    pub(crate) table: Table,
    pub(crate) columns: Vec<ColumnRef>,
    pub(crate) rows: Vec<Vec<Expr>>,
}

#[derive(Debug, Clone)]
pub struct Update {
    pub(crate) table: Table,
    pub(crate) assignments: Vec<(ColumnRef, Expr)>,
    pub(crate) predicate: Option<Condition>,
}

#[derive(Debug, Clone)]
pub struct Select {
    pub(crate) table: Table,
    pub(crate) fields: Vec<Arc<dyn AnyField>>,
    pub(crate) predicate: Option<Condition>,
    pub(crate) limit: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct Truncate {
    pub(crate) table: Table,
    pub(crate) restart_identity: bool,
}

/// A tuple of field references usable as a column list
///
/// Implemented for tuples of one to six `&Field<_>`; `Values` is the matching
/// tuple of semantic values, so a row can only be built with the right types.
pub trait ColumnList {
    type Values;

    fn columns(&self) -> Vec<ColumnRef>;

    fn fields(&self) -> Vec<Arc<dyn AnyField>>;

    fn row(&self, values: Self::Values) -> Vec<Expr>;
}

macro_rules! impl_column_list {
    ($($T:ident $idx:tt),+) => {
        impl<'a, $($T),+> ColumnList for ($(&'a Field<$T>,)+)
        where
            $($T: fmt::Debug + Send + Sync + 'static,)+
        {
            type Values = ($($T,)+);

            fn columns(&self) -> Vec<ColumnRef> {
                vec![$(self.$idx.column_ref().clone()),+]
            }

            fn fields(&self) -> Vec<Arc<dyn AnyField>> {
                vec![$(Arc::new(self.$idx.clone()) as Arc<dyn AnyField>),+]
            }

            fn row(&self, values: Self::Values) -> Vec<Expr> {
                vec![$(self.$idx.val(values.$idx)),+]
            }
        }
    };
}

impl_column_list!(A 0);
impl_column_list!(A 0, B 1);
impl_column_list!(A 0, B 1, C 2);
impl_column_list!(A 0, B 1, C 2, D 3);
impl_column_list!(A 0, B 1, C 2, D 3, E 4);
impl_column_list!(A 0, B 1, C 2, D 3, E 4, F 5);

/// `INSERT INTO table`
pub fn insert_into(table: &Table) -> InsertInto {
    InsertInto {
        table: table.clone(),
    }
}

/// `UPDATE table`
pub fn update(table: &Table) -> UpdateTable {
    UpdateTable {
        table: table.clone(),
    }
}

/// `SELECT <all fields> FROM table`
pub fn select_from(table: &Table) -> Select {
    Select {
        table: table.clone(),
        fields: table.fields().to_vec(),
        predicate: None,
        limit: None,
    }
}

/// `SELECT <columns>`, completed with [`SelectColumns::from`].
pub fn select<C: ColumnList>(columns: C) -> SelectColumns {
    SelectColumns {
        fields: columns.fields(),
    }
}

/// `TRUNCATE table`
pub fn truncate(table: &Table) -> Truncate {
    Truncate {
        table: table.clone(),
        restart_identity: false,
    }
}

pub struct InsertInto {
    table: Table,
}

impl InsertInto {
    pub fn columns<C: ColumnList>(self, columns: C) -> InsertColumns<C> {
        InsertColumns {
            table: self.table,
            columns,
        }
    }
}

pub struct InsertColumns<C> {
    table: Table,
    columns: C,
}

impl<C: ColumnList> InsertColumns<C> {
    pub fn values(self, values: C::Values) -> InsertValues<C> {
        let row = self.columns.row(values);
        InsertValues {
            table: self.table,
            columns: self.columns,
            rows: vec![row],
        }
    }
}

pub struct InsertValues<C> {
    table: Table,
    columns: C,
    rows: Vec<Vec<Expr>>,
}

impl<C: ColumnList> InsertValues<C> {
    /// Add another row.
    pub fn values(mut self, values: C::Values) -> Self {
        self.rows.push(self.columns.row(values));
        self
    }

    pub fn build(self) -> Insert {
        Insert {
            columns: self.columns.columns(),
            table: self.table,
            rows: self.rows,
        }
    }
}

impl<C: ColumnList> From<InsertValues<C>> for Statement {
    fn from(insert: InsertValues<C>) -> Self {
        Statement::Insert(insert.build())
    }
}

impl From<Insert> for Statement {
    fn from(insert: Insert) -> Self {
        Statement::Insert(insert)
    }
}

pub struct UpdateTable {
    table: Table,
}

impl UpdateTable {
    /// `SET field = value`; `value` is a `T`, an `Expression<T>` or a field.
    pub fn set<T>(self, field: &Field<T>, value: impl IntoExpr<T>) -> Update
    where
        T: fmt::Debug + Send + Sync + 'static,
    {
        Update {
            table: self.table,
            assignments: Vec::new(),
            predicate: None,
        }
        .set(field, value)
    }
}

impl Update {
    /// Another assignment. Assigning the same column again replaces it.
    pub fn set<T>(mut self, field: &Field<T>, value: impl IntoExpr<T>) -> Self
    where
        T: fmt::Debug + Send + Sync + 'static,
    {
        let expr = value.into_expr(field);
        let column = field.column_ref().clone();
        match self
            .assignments
            .iter_mut()
            .find(|(existing, _)| existing.name() == column.name())
        {
            Some(slot) => slot.1 = expr,
            None => self.assignments.push((column, expr)),
        }
        self
    }

    /// `WHERE condition`; repeated filters are combined with `AND`.
    pub fn filter(mut self, condition: Condition) -> Self {
        self.predicate = Some(match self.predicate.take() {
            Some(existing) => existing.and(condition),
            None => condition,
        });
        self
    }
}

impl From<Update> for Statement {
    fn from(update: Update) -> Self {
        Statement::Update(update)
    }
}

pub struct SelectColumns {
    fields: Vec<Arc<dyn AnyField>>,
}

impl SelectColumns {
    pub fn from(self, table: &Table) -> Select {
        Select {
            table: table.clone(),
            fields: self.fields,
            predicate: None,
            limit: None,
        }
    }
}

impl Select {
    /// `WHERE condition`; repeated filters are combined with `AND`.
    pub fn filter(mut self, condition: Condition) -> Self {
        self.predicate = Some(match self.predicate.take() {
            Some(existing) => existing.and(condition),
            None => condition,
        });
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    /// Selected fields, in result-column order.
    pub fn fields(&self) -> &[Arc<dyn AnyField>] {
        &self.fields
    }
}

impl From<Select> for Statement {
    fn from(select: Select) -> Self {
        Statement::Select(select)
    }
}

impl Truncate {
    /// `RESTART IDENTITY`: reset sequences owned by the table's columns.
    pub fn restart_identity(mut self) -> Self {
        self.restart_identity = true;
        self
    }
}

impl From<Truncate> for Statement {
    fn from(truncate: Truncate) -> Self {
        Statement::Truncate(truncate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BuoyError;
    use crate::json::{json_field, set_by_key};
    use crate::query::render::{Placeholder, RenderError, RenderOptions, Renderer};
    use crate::value::StoredType;
    use sea_query::Value;
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

    fn render(statement: impl Into<Statement>) -> Result<crate::Query, BuoyError> {
        Renderer::default().render(&statement.into())
    }

    #[test]
    fn test_insert_multiple_rows() {
        let s = schema();
        let query = render(
            insert_into(&s.table)
                .columns((&s.id, &s.value))
                .values((1, json!({"a": 1})))
                .values((2, json!({"b": 2}))),
        )
        .expect("render");
        assert_eq!(
            query.sql,
            "INSERT INTO test (id, value) VALUES ($1, $2), ($3, $4)"
        );
        assert_eq!(query.params.len(), 4);
        assert_eq!(query.params[0].value, Value::Int(Some(1)));
        assert_eq!(query.params[1].stored_type, StoredType::Jsonb);
        match &query.params[1].value {
            Value::String(Some(text)) => assert_eq!(text.as_str(), r#"{"a":1}"#),
            other => panic!("unexpected bind {:?}", other),
        }
    }

    #[test]
    fn test_insert_row_width_is_checked() {
        let s = schema();
        let insert = Insert {
            table: s.table.clone(),
            columns: vec![s.id.column_ref().clone(), s.value.column_ref().clone()],
            rows: vec![vec![s.id.val(1)]],
        };
        match render(insert) {
            Err(BuoyError::Render(RenderError::RowWidthMismatch {
                row,
                expected,
                actual,
            })) => {
                assert_eq!((row, expected, actual), (0, 2, 1));
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_update_with_vendor_function() {
        let s = schema();
        let statement = update(&s.table)
            .set(
                &s.value,
                set_by_key(&s.value, "name", json!({"first": "Christian", "last": "Smith"})),
            )
            .filter(s.id.eq(1));
        let query = Renderer::new(RenderOptions {
            placeholder: Placeholder::Question,
        })
        .render(&statement.into())
        .expect("render");
        assert_eq!(
            query.sql,
            "UPDATE test SET value = jsonb_set(value, '{name}', ?) WHERE id = ?"
        );
        assert_eq!(query.params.len(), 2);
        assert_eq!(query.params[0].stored_type, StoredType::Jsonb);
        assert_eq!(query.params[1].value, Value::Int(Some(1)));
    }

    #[test]
    fn test_update_reassignment_replaces() {
        let s = schema();
        let query = render(
            update(&s.table)
                .set(&s.value, json!(1))
                .set(&s.value, json!(2))
                .set(&s.id, 5),
        )
        .expect("render");
        assert_eq!(query.sql, "UPDATE test SET value = $1, id = $2");
        match &query.params[0].value {
            Value::String(Some(text)) => assert_eq!(text.as_str(), "2"),
            other => panic!("unexpected bind {:?}", other),
        }
    }

    #[test]
    fn test_filters_are_anded() {
        let s = schema();
        let query = render(
            select_from(&s.table)
                .filter(s.id.gt(1))
                .filter(s.id.lt(10))
                .limit(5),
        )
        .expect("render");
        assert_eq!(
            query.sql,
            "SELECT id, value FROM test WHERE id > $1 AND id < $2 LIMIT 5"
        );
    }

    #[test]
    fn test_select_columns() {
        let s = schema();
        let query = render(select((&s.value,)).from(&s.table)).expect("render");
        assert_eq!(query.sql, "SELECT value FROM test");
        assert!(query.params.is_empty());
    }

    #[test]
    fn test_truncate() {
        let s = schema();
        assert_eq!(render(truncate(&s.table)).expect("render").sql, "TRUNCATE test");
        assert_eq!(
            render(truncate(&s.table).restart_identity())
                .expect("render")
                .sql,
            "TRUNCATE test RESTART IDENTITY"
        );
    }

    #[test]
    fn test_empty_select_is_rejected() {
        let s = schema();
        let empty = Table::builder("empty").build();
        assert!(matches!(
            render(select_from(&empty)),
            Err(BuoyError::Render(RenderError::EmptyStatement(_)))
        ));
        assert_eq!(render(select_from(&s.table)).expect("render").params.len(), 0);
    }

    #[test]
    fn test_statement_kind() {
        let s = schema();
        let statement: Statement = truncate(&s.table).into();
        assert_eq!(statement.kind(), "TRUNCATE");
        assert_eq!(statement.table().name(), "test");
    }
}
