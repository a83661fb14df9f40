//! # Buoy
//!
//! Typed SQL statement building for PostgreSQL with pluggable value converters.
//!
//! Columns are described once as [`Field<T>`]s: a name, a declared stored type and
//! a [`Converter`] between what the database stores and the type `T` the
//! application works with. Statements are built from fields with staged builders,
//! rendered into SQL text plus ordered bind parameters, and run through an
//! [`Executor`]. Fetched rows come back as [`Record`]s decoded through the same
//! converters.
//!
//! Vendor functions such as `jsonb_set` are expressed as template expressions;
//! see [`set_by_key`] and the other JSON helpers.
//!
//! ```rust
//! use buoy::{json_field, set_by_key, update, Field, Renderer, Statement, Table};
//! use serde_json::json;
//!
//! let id: Field<i32> = Field::column("id");
//! let value = json_field("value");
//! let test = Table::builder("test").primary_key(&id).field(&value).build();
//!
//! let statement: Statement = update(&test)
//!     .set(&value, set_by_key(&value, "name", json!({"first": "Christian", "last": "Smith"})))
//!     .filter(id.eq(1))
//!     .into();
//! let query = Renderer::default().render(&statement).unwrap();
//! assert_eq!(query.sql, "UPDATE test SET value = jsonb_set(value, '{name}', $1) WHERE id = $2");
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod executor;
pub mod json;
pub mod metrics;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod query;
pub mod value;

pub use config::DatabaseConfig;
pub use connection::{connect, with_connection, Connection, ConnectionError};
pub use error::BuoyError;
pub use executor::{DriverError, Executor, PgExecutor, RawRow};
pub use json::{json_field, merge, remove_key, set_by_key, set_by_path, JsonConverter};
pub use query::{
    insert_into, select, select_from, truncate, update, AnyField, BindParam, Condition,
    Converter, Dsl, Expr, Expression, Field, Identity, IntoExpr, Nullable, Placeholder, Query,
    Record, RenderError, RenderOptions, Renderer, Statement, Table,
};
pub use value::{ConversionError, StoredType, TryGetable, ValueType};
