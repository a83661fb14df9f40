//! Typed statement building, rendering and execution.
//!
//! # Architecture
//!
//! - **Converter**: stored ↔ semantic value mapping (`Converter`, `Identity`, `Nullable`)
//! - **Column**: typed fields (`Field<T>`) and their comparison operators
//! - **Expr**: immutable expression trees, including template calls for vendor functions
//! - **Table / Statement**: table descriptors and staged `INSERT`/`UPDATE`/`SELECT`/`TRUNCATE` builders
//! - **Render**: SQL text plus ordered bind parameters
//! - **Execution / Record**: running statements through an `Executor` and decoding rows
//! - **Value Conversion**: bind parameters and result rows to and from `may_postgres`

pub mod column;
pub mod converter;
pub mod execution;
pub mod expr;
pub mod record;
pub mod render;
pub mod statement;
pub mod table;
mod template;
pub mod value_conversion;

pub use column::{AnyField, Field, IntoExpr};
pub use converter::{Converter, Identity, Nullable};
pub use execution::Dsl;
pub use expr::{BinOper, ColumnRef, Condition, Expr, Expression, UnOper};
pub use record::Record;
pub use render::{BindParam, Placeholder, Query, RenderError, RenderOptions, Renderer};
pub use statement::{
    insert_into, select, select_from, truncate, update, ColumnList, Insert, Select, Statement,
    Truncate, Update,
};
pub use table::{Table, TableBuilder};
pub use value_conversion::JsonText;
