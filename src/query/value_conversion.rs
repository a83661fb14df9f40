//! Conversion between bind parameters / result rows and `may_postgres` types.
//!
//! Binding goes by the parameter's declared stored type, not only by the value's
//! variant: a `NULL` is bound with the column's type so PostgreSQL never has to
//! guess it, and JSON text is bound with the `json`/`jsonb` wire format.
//!
//! Decoding goes by the result column's PostgreSQL type and produces the stored
//! representation converters expect (`jsonb` columns come back as JSON text).

use crate::executor::DriverError;
use crate::query::expr::array_literal;
use crate::query::render::BindParam;
use crate::value::{is_null, StoredType};
use bytes::{BufMut, BytesMut};
use may_postgres::types::{FromSql, IsNull, ToSql, Type};
use may_postgres::Row;
use sea_query::Value;
use std::error::Error;

/// JSON document carried as text, bound and read as `json` or `jsonb`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonText(pub String);

/// `jsonb` binary format version
const JSONB_VERSION: u8 = 1;

impl ToSql for JsonText {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        if *ty == Type::JSONB {
            out.put_u8(JSONB_VERSION);
        }
        out.put_slice(self.0.as_bytes());
        Ok(IsNull::No)
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::JSON || *ty == Type::JSONB
    }

    fn to_sql_checked(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        if !<Self as ToSql>::accepts(ty) {
            return Err(format!("cannot bind JSON text to a parameter of type {}", ty).into());
        }
        self.to_sql(ty, out)
    }
}

impl<'a> FromSql<'a> for JsonText {
    fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn Error + Sync + Send>> {
        let body = if *ty == Type::JSONB {
            match raw.split_first() {
                Some((&JSONB_VERSION, rest)) => rest,
                Some((version, _)) => {
                    return Err(format!("unsupported jsonb version {}", version).into())
                }
                None => return Err("empty jsonb value".into()),
            }
        } else {
            raw
        };
        Ok(JsonText(std::str::from_utf8(body)?.to_string()))
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::JSON || *ty == Type::JSONB
    }
}

type BoxedParam = Box<dyn ToSql + Sync>;

/// Convert bind parameters and run `f` with them.
///
/// # Errors
///
/// Returns `DriverError::UnsupportedParam` if a value cannot be bound as its
/// stored type, or whatever `f` returns.
pub fn with_converted_params<F, R>(params: &[BindParam], f: F) -> Result<R, DriverError>
where
    F: FnOnce(&[&dyn ToSql]) -> Result<R, DriverError>,
{
    let boxed = params
        .iter()
        .enumerate()
        .map(|(index, param)| to_sql_param(index, param))
        .collect::<Result<Vec<_>, _>>()?;
    let refs: Vec<&dyn ToSql> = boxed.iter().map(|p| p.as_ref() as &dyn ToSql).collect();
    f(&refs)
}

fn to_sql_param(index: usize, param: &BindParam) -> Result<BoxedParam, DriverError> {
    let value = &param.value;
    if is_null(value) {
        return typed_null(index, param);
    }
    let unsupported = || DriverError::UnsupportedParam {
        index,
        stored_type: param.stored_type,
        value: format!("{:?}", value),
    };
    let boxed: BoxedParam = match param.stored_type {
        StoredType::SmallInt => Box::new(
            integer(value)
                .and_then(|i| i16::try_from(i).ok())
                .ok_or_else(unsupported)?,
        ),
        StoredType::Integer => Box::new(
            integer(value)
                .and_then(|i| i32::try_from(i).ok())
                .ok_or_else(unsupported)?,
        ),
        StoredType::BigInt => Box::new(integer(value).ok_or_else(unsupported)?),
        StoredType::Real => match value {
            Value::Float(Some(f)) => Box::new(*f),
            _ => return Err(unsupported()),
        },
        StoredType::Double => match value {
            Value::Float(Some(f)) => Box::new(f64::from(*f)),
            Value::Double(Some(d)) => Box::new(*d),
            _ => return Err(unsupported()),
        },
        StoredType::Boolean => match value {
            Value::Bool(Some(b)) => Box::new(*b),
            _ => return Err(unsupported()),
        },
        StoredType::Text | StoredType::Varchar => match value {
            Value::String(Some(s)) => Box::new(s.to_string()),
            _ => return Err(unsupported()),
        },
        StoredType::Bytea => match value {
            Value::Bytes(Some(b)) => Box::new(b.to_vec()),
            _ => return Err(unsupported()),
        },
        StoredType::Json | StoredType::Jsonb => match value {
            Value::String(Some(s)) => Box::new(JsonText(s.to_string())),
            Value::Json(Some(j)) => Box::new(JsonText(serde_json::Value::clone(j).to_string())),
            _ => return Err(unsupported()),
        },
        // Paths are written into the SQL text as literals
        StoredType::TextArray => return Err(unsupported()),
    };
    Ok(boxed)
}

fn typed_null(index: usize, param: &BindParam) -> Result<BoxedParam, DriverError> {
    let boxed: BoxedParam = match param.stored_type {
        StoredType::SmallInt => Box::new(None::<i16>),
        StoredType::Integer => Box::new(None::<i32>),
        StoredType::BigInt => Box::new(None::<i64>),
        StoredType::Real => Box::new(None::<f32>),
        StoredType::Double => Box::new(None::<f64>),
        StoredType::Boolean => Box::new(None::<bool>),
        StoredType::Text | StoredType::Varchar => Box::new(None::<String>),
        StoredType::Bytea => Box::new(None::<Vec<u8>>),
        StoredType::Json | StoredType::Jsonb => Box::new(None::<JsonText>),
        StoredType::TextArray => {
            return Err(DriverError::UnsupportedParam {
                index,
                stored_type: param.stored_type,
                value: format!("{:?}", param.value),
            })
        }
    };
    Ok(boxed)
}

fn integer(value: &Value) -> Option<i64> {
    match value {
        Value::TinyInt(Some(i)) => Some(i64::from(*i)),
        Value::SmallInt(Some(i)) => Some(i64::from(*i)),
        Value::Int(Some(i)) => Some(i64::from(*i)),
        Value::BigInt(Some(i)) => Some(*i),
        Value::TinyUnsigned(Some(u)) => Some(i64::from(*u)),
        Value::SmallUnsigned(Some(u)) => Some(i64::from(*u)),
        Value::Unsigned(Some(u)) => Some(i64::from(*u)),
        Value::BigUnsigned(Some(u)) => i64::try_from(*u).ok(),
        _ => None,
    }
}

/// Decode a result row into stored values, one per column.
///
/// # Errors
///
/// Returns `DriverError::UnsupportedColumn` for column types with no stored
/// representation, or the driver's error if a value fails to decode.
pub fn row_values(row: &Row) -> Result<Vec<Value>, DriverError> {
    let mut values = Vec::with_capacity(row.len());
    for (index, column) in row.columns().iter().enumerate() {
        let ty = column.type_();
        let value = if *ty == Type::INT2 {
            Value::SmallInt(row.try_get::<_, Option<i16>>(index)?)
        } else if *ty == Type::INT4 {
            Value::Int(row.try_get::<_, Option<i32>>(index)?)
        } else if *ty == Type::INT8 {
            Value::BigInt(row.try_get::<_, Option<i64>>(index)?)
        } else if *ty == Type::FLOAT4 {
            Value::Float(row.try_get::<_, Option<f32>>(index)?)
        } else if *ty == Type::FLOAT8 {
            Value::Double(row.try_get::<_, Option<f64>>(index)?)
        } else if *ty == Type::BOOL {
            Value::Bool(row.try_get::<_, Option<bool>>(index)?)
        } else if *ty == Type::TEXT
            || *ty == Type::VARCHAR
            || *ty == Type::BPCHAR
            || *ty == Type::NAME
        {
            Value::String(row.try_get::<_, Option<String>>(index)?.map(Into::into))
        } else if *ty == Type::BYTEA {
            Value::Bytes(row.try_get::<_, Option<Vec<u8>>>(index)?.map(Into::into))
        } else if *ty == Type::JSON || *ty == Type::JSONB {
            let text = row.try_get::<_, Option<JsonText>>(index)?;
            Value::String(text.map(|t| t.0.into()))
        } else if *ty == Type::TEXT_ARRAY || *ty == Type::VARCHAR_ARRAY {
            let items = row.try_get::<_, Option<Vec<String>>>(index)?;
            Value::String(items.map(|items| array_literal(items).into()))
        } else {
            return Err(DriverError::UnsupportedColumn {
                index,
                column: column.name().to_string(),
                type_name: ty.name().to_string(),
            });
        };
        values.push(value);
    }
    Ok(values)
}
