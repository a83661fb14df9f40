//! Rendering of statements and expressions to SQL text plus bind parameters.
//!
//! Rendering is a pure function of the statement and the [`RenderOptions`]: the
//! same input always produces the same SQL and the same parameter list. Values
//! bound through a converted field are encoded here, so a conversion failure
//! surfaces as [`BuoyError::Conversion`] before anything reaches the database.
//!
//! Bind parameters are appended in the order their placeholders appear in the
//! text, depth first and left to right, so nested template calls and repeated
//! slots line up with `$1, $2, …` (or `?`).

use crate::error::BuoyError;
use crate::query::expr::{BinOper, Expr, FunctionKind, Literal, Param, UnOper};
use crate::query::statement::{Insert, Select, Statement, Truncate, Update};
use crate::query::template::{self, Segment};
use crate::value::{is_null, StoredType};
use sea_query::Value;
use serde::Deserialize;
use std::fmt;

/// Bind-parameter marker style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Placeholder {
    /// `$1`, `$2`, … as PostgreSQL expects
    #[default]
    Numbered,
    /// `?` for every parameter
    ///
    /// Render-only: PostgreSQL does not accept `?` markers, so a
    /// [`Connection`](crate::Connection) refuses this style.
    Question,
}

/// Rendering options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub struct RenderOptions {
    #[serde(default)]
    pub placeholder: Placeholder,
}

/// A value to bind, already in stored form, with its declared stored type
#[derive(Debug, Clone, PartialEq)]
pub struct BindParam {
    pub value: Value,
    pub stored_type: StoredType,
}

/// Rendered SQL and its bind parameters in placeholder order
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub sql: String,
    pub params: Vec<BindParam>,
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}

/// Errors raised while turning a statement into SQL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// A bind parameter has no declared stored type
    MissingStoredType { column: Option<String> },
    /// A template references a slot with no argument
    MissingSlot {
        template: String,
        slot: usize,
        args: usize,
    },
    /// An `INSERT` row does not match its column list
    RowWidthMismatch {
        row: usize,
        expected: usize,
        actual: usize,
    },
    /// A statement with nothing to do, e.g. `INSERT` without rows
    EmptyStatement(&'static str),
    /// A value that has no SQL literal form
    UnsupportedLiteral(String),
    /// Template text holds a `?` that would read as a bind marker
    BareQuestionMark { template: String },
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::MissingStoredType { column: Some(column) } => {
                write!(f, "Bind parameter for column {} has no stored type", column)
            }
            RenderError::MissingStoredType { column: None } => {
                write!(f, "Bind parameter has no stored type")
            }
            RenderError::MissingSlot {
                template,
                slot,
                args,
            } => write!(
                f,
                "Template {:?} references slot {{{}}} but only {} argument(s) were given",
                template, slot, args
            ),
            RenderError::RowWidthMismatch {
                row,
                expected,
                actual,
            } => write!(
                f,
                "Insert row {} has {} value(s), expected {}",
                row, actual, expected
            ),
            RenderError::EmptyStatement(what) => write!(f, "Empty statement: {}", what),
            RenderError::UnsupportedLiteral(value) => {
                write!(f, "Value cannot be written as a SQL literal: {}", value)
            }
            RenderError::BareQuestionMark { template } => write!(
                f,
                "Template {:?} contains `?`, which cannot be told apart from a `?` bind marker",
                template
            ),
        }
    }
}

impl std::error::Error for RenderError {}

/// Renders statements for one placeholder style
#[derive(Debug, Clone, Copy, Default)]
pub struct Renderer {
    options: RenderOptions,
}

impl Renderer {
    pub fn new(options: RenderOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> RenderOptions {
        self.options
    }

    /// Render a complete statement.
    ///
    /// # Errors
    ///
    /// Returns `BuoyError::Conversion` if a bound value fails to encode and
    /// `BuoyError::Render` if the statement is malformed.
    pub fn render(&self, statement: &Statement) -> Result<Query, BuoyError> {
        let mut writer = Writer::new(self.options.placeholder);
        match statement {
            Statement::Insert(insert) => writer.insert(insert)?,
            Statement::Update(update) => writer.update(update)?,
            Statement::Select(select) => writer.select(select)?,
            Statement::Truncate(truncate) => writer.truncate(truncate),
        }
        let query = writer.finish();
        log::debug!(
            "Rendered {} on {} with {} bind parameter(s)",
            statement.kind(),
            statement.table().name(),
            query.params.len()
        );
        Ok(query)
    }

    /// Render a single expression, e.g. to inspect a template call.
    pub fn render_expr(&self, expr: &Expr) -> Result<Query, BuoyError> {
        let mut writer = Writer::new(self.options.placeholder);
        writer.expr(expr)?;
        Ok(writer.finish())
    }
}

struct Writer {
    sql: String,
    params: Vec<BindParam>,
    placeholder: Placeholder,
}

impl Writer {
    fn new(placeholder: Placeholder) -> Self {
        Self {
            sql: String::new(),
            params: Vec::new(),
            placeholder,
        }
    }

    fn finish(self) -> Query {
        Query {
            sql: self.sql,
            params: self.params,
        }
    }

    fn push(&mut self, text: &str) {
        self.sql.push_str(text);
    }

    fn ident(&mut self, name: &str) {
        let quoted = quote_ident(name);
        self.sql.push_str(&quoted);
    }

    fn insert(&mut self, insert: &Insert) -> Result<(), BuoyError> {
        if insert.rows.is_empty() {
            return Err(RenderError::EmptyStatement("INSERT without VALUES").into());
        }
        if insert.columns.is_empty() {
            return Err(RenderError::EmptyStatement("INSERT without columns").into());
        }
        self.push("INSERT INTO ");
        self.ident(insert.table.name());
        self.push(" (");
        for (i, column) in insert.columns.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.ident(column.name());
        }
        self.push(") VALUES ");
        for (row_index, row) in insert.rows.iter().enumerate() {
            if row.len() != insert.columns.len() {
                return Err(RenderError::RowWidthMismatch {
                    row: row_index,
                    expected: insert.columns.len(),
                    actual: row.len(),
                }
                .into());
            }
            if row_index > 0 {
                self.push(", ");
            }
            self.push("(");
            self.list(row)?;
            self.push(")");
        }
        Ok(())
    }

    fn update(&mut self, update: &Update) -> Result<(), BuoyError> {
        if update.assignments.is_empty() {
            return Err(RenderError::EmptyStatement("UPDATE without SET").into());
        }
        self.push("UPDATE ");
        self.ident(update.table.name());
        self.push(" SET ");
        for (i, (column, value)) in update.assignments.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.ident(column.name());
            self.push(" = ");
            self.expr(value)?;
        }
        if let Some(predicate) = &update.predicate {
            self.push(" WHERE ");
            self.expr(predicate.expr())?;
        }
        Ok(())
    }

    fn select(&mut self, select: &Select) -> Result<(), BuoyError> {
        if select.fields.is_empty() {
            return Err(RenderError::EmptyStatement("SELECT without columns").into());
        }
        self.push("SELECT ");
        for (i, field) in select.fields.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.ident(field.name());
        }
        self.push(" FROM ");
        self.ident(select.table.name());
        if let Some(predicate) = &select.predicate {
            self.push(" WHERE ");
            self.expr(predicate.expr())?;
        }
        if let Some(limit) = select.limit {
            self.push(&format!(" LIMIT {}", limit));
        }
        Ok(())
    }

    fn truncate(&mut self, truncate: &Truncate) {
        self.push("TRUNCATE ");
        self.ident(truncate.table.name());
        if truncate.restart_identity {
            self.push(" RESTART IDENTITY");
        }
    }

    fn list(&mut self, exprs: &[Expr]) -> Result<(), BuoyError> {
        for (i, expr) in exprs.iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.expr(expr)?;
        }
        Ok(())
    }

    fn expr(&mut self, expr: &Expr) -> Result<(), BuoyError> {
        match expr {
            Expr::Column(column) => self.ident(column.name()),
            Expr::Param(param) => self.param(param)?,
            Expr::Inline(literal) => {
                let text = literal_sql(literal)?;
                self.push(&text);
            }
            Expr::Function(call) => match &call.kind {
                FunctionKind::Named(name) => {
                    self.push(name);
                    self.push("(");
                    self.list(&call.args)?;
                    self.push(")");
                }
                FunctionKind::Template(tpl) => {
                    if self.placeholder == Placeholder::Question
                        && template::has_bare_question_mark(tpl)
                    {
                        return Err(RenderError::BareQuestionMark {
                            template: tpl.clone(),
                        }
                        .into());
                    }
                    for segment in template::parse(tpl) {
                        match segment {
                            Segment::Text(text) => self.push(text),
                            Segment::Slot(slot) => {
                                let arg = call.args.get(slot).ok_or_else(|| {
                                    RenderError::MissingSlot {
                                        template: tpl.clone(),
                                        slot,
                                        args: call.args.len(),
                                    }
                                })?;
                                self.expr(arg)?;
                            }
                        }
                    }
                }
            },
            Expr::Binary(lhs, op, rhs) => {
                self.operand(lhs, *op)?;
                self.push(" ");
                self.push(op.as_str());
                self.push(" ");
                self.operand(rhs, *op)?;
            }
            Expr::Unary(UnOper::Not, operand) => {
                self.push("NOT (");
                self.expr(operand)?;
                self.push(")");
            }
            Expr::Unary(op, operand) => {
                self.wrapped(operand, matches!(**operand, Expr::Binary(..)))?;
                self.push(match op {
                    UnOper::IsNull => " IS NULL",
                    _ => " IS NOT NULL",
                });
            }
        }
        Ok(())
    }

    /// Operand of a binary operator; nested connectives are parenthesized.
    fn operand(&mut self, expr: &Expr, parent: BinOper) -> Result<(), BuoyError> {
        let nested = match expr {
            Expr::Binary(_, op, _) => op.is_logical() || !parent.is_logical(),
            _ => false,
        };
        self.wrapped(expr, nested)
    }

    fn wrapped(&mut self, expr: &Expr, parens: bool) -> Result<(), BuoyError> {
        if parens {
            self.push("(");
            self.expr(expr)?;
            self.push(")");
        } else {
            self.expr(expr)?;
        }
        Ok(())
    }

    fn param(&mut self, param: &Param) -> Result<(), BuoyError> {
        let stored_type = param
            .stored_type()
            .ok_or_else(|| RenderError::MissingStoredType {
                column: param.column().map(str::to_string),
            })?;
        let value = param.encode()?;
        self.params.push(BindParam { value, stored_type });
        match self.placeholder {
            Placeholder::Question => self.push("?"),
            Placeholder::Numbered => {
                let marker = format!("${}", self.params.len());
                self.push(&marker);
            }
        }
        Ok(())
    }
}

const RESERVED: &[&str] = &[
    "all", "and", "any", "array", "as", "asc", "both", "case", "cast", "check", "collate",
    "column", "constraint", "create", "default", "desc", "distinct", "do", "else", "end",
    "except", "false", "for", "foreign", "from", "grant", "group", "having", "in", "into",
    "is", "join", "leading", "limit", "not", "null", "offset", "on", "only", "or", "order",
    "primary", "references", "select", "set", "table", "then", "to", "trailing", "true",
    "union", "unique", "update", "user", "using", "values", "when", "where", "with",
];

/// Identifier as written in SQL: bare when it is a plain lower-case name,
/// double-quoted otherwise.
pub fn quote_ident(name: &str) -> String {
    let mut chars = name.chars();
    let plain = matches!(chars.next(), Some(c) if c.is_ascii_lowercase() || c == '_')
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        && !RESERVED.contains(&name);
    if plain {
        name.to_string()
    } else {
        format!("\"{}\"", name.replace('"', "\"\""))
    }
}

fn quote_text(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

/// SQL literal text for an inline value.
fn literal_sql(literal: &Literal) -> Result<String, RenderError> {
    let value = literal.value();
    if is_null(value) {
        return Ok("NULL".to_string());
    }
    let text = match value {
        Value::Bool(Some(b)) => (if *b { "TRUE" } else { "FALSE" }).to_string(),
        Value::TinyInt(Some(i)) => i.to_string(),
        Value::SmallInt(Some(i)) => i.to_string(),
        Value::Int(Some(i)) => i.to_string(),
        Value::BigInt(Some(i)) => i.to_string(),
        Value::TinyUnsigned(Some(u)) => u.to_string(),
        Value::SmallUnsigned(Some(u)) => u.to_string(),
        Value::Unsigned(Some(u)) => u.to_string(),
        Value::BigUnsigned(Some(u)) => u.to_string(),
        Value::Float(Some(f)) => float_literal(f64::from(*f)),
        Value::Double(Some(d)) => float_literal(*d),
        Value::String(Some(s)) => quote_text(&s.to_string()),
        Value::Bytes(Some(b)) => {
            let hex: String = b.iter().map(|byte| format!("{:02x}", byte)).collect();
            format!("'\\x{}'", hex)
        }
        Value::Json(Some(j)) => {
            let json = serde_json::Value::clone(j);
            quote_text(&json.to_string())
        }
        other => return Err(RenderError::UnsupportedLiteral(format!("{:?}", other))),
    };
    Ok(text)
}

fn float_literal(value: f64) -> String {
    if value.is_finite() {
        value.to_string()
    } else if value.is_nan() {
        "'NaN'".to_string()
    } else if value > 0.0 {
        "'Infinity'".to_string()
    } else {
        "'-Infinity'".to_string()
    }
}
