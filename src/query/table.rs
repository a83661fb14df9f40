//! Table descriptors.

use crate::query::column::{AnyField, Field};
use std::fmt;
use std::sync::Arc;

/// A table: its name, the fields it exposes and its primary key
///
/// Cheap to clone; records keep a clone so they can refresh themselves.
///
/// # Example
///
/// ```rust
/// use buoy::{json_field, Field, Table};
///
/// let id: Field<i32> = Field::column("id");
/// let value = json_field("value");
/// let test = Table::builder("test").primary_key(&id).field(&value).build();
///
/// assert_eq!(test.name(), "test");
/// assert_eq!(test.primary_key(), ["id".to_string()]);
/// ```
#[derive(Clone)]
pub struct Table {
    inner: Arc<TableInner>,
}

struct TableInner {
    name: String,
    fields: Vec<Arc<dyn AnyField>>,
    primary_key: Vec<String>,
}

impl Table {
    pub fn builder(name: &str) -> TableBuilder {
        TableBuilder {
            name: name.to_string(),
            fields: Vec::new(),
            primary_key: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// All fields in declaration order.
    pub fn fields(&self) -> &[Arc<dyn AnyField>] {
        &self.inner.fields
    }

    /// Primary-key column names.
    pub fn primary_key(&self) -> &[String] {
        &self.inner.primary_key
    }

    pub fn field(&self, name: &str) -> Option<&Arc<dyn AnyField>> {
        self.inner.fields.iter().find(|f| f.name() == name)
    }
}

impl fmt::Debug for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<&str> = self.inner.fields.iter().map(|f| f.name()).collect();
        f.debug_struct("Table")
            .field("name", &self.inner.name)
            .field("fields", &fields)
            .field("primary_key", &self.inner.primary_key)
            .finish()
    }
}

pub struct TableBuilder {
    name: String,
    fields: Vec<Arc<dyn AnyField>>,
    primary_key: Vec<String>,
}

impl TableBuilder {
    /// Register a field. Registering the same column twice keeps the first.
    pub fn field<T>(mut self, field: &Field<T>) -> Self
    where
        T: fmt::Debug + Send + Sync + 'static,
    {
        if !self.fields.iter().any(|f| f.name() == field.name()) {
            self.fields.push(Arc::new(field.clone()));
        }
        self
    }

    /// Register a field and add it to the primary key.
    pub fn primary_key<T>(mut self, field: &Field<T>) -> Self
    where
        T: fmt::Debug + Send + Sync + 'static,
    {
        if !self.primary_key.iter().any(|name| name == field.name()) {
            self.primary_key.push(field.name().to_string());
        }
        self.field(field)
    }

    pub fn build(self) -> Table {
        Table {
            inner: Arc::new(TableInner {
                name: self.name,
                fields: self.fields,
                primary_key: self.primary_key,
            }),
        }
    }
}
