//! SQL value and row types
//!
//! Values cross two boundaries: host-supplied prepared-statement parameters
//! going into the driver, and driver rows coming back out as display rows for
//! the host. Both directions live here, together with the column-name
//! normalization applied to execution output.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A SQL value held by a row or bound as a statement parameter
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// SQL NULL
    Null,
    /// BOOLEAN
    Bool(bool),
    /// SMALLINT
    Int16(i16),
    /// INTEGER
    Int32(i32),
    /// BIGINT
    Int64(i64),
    /// REAL
    Float32(f32),
    /// DOUBLE PRECISION
    Float64(f64),
    /// NUMERIC, DECIMAL
    Decimal(Decimal),
    /// VARCHAR, TEXT, CHAR
    String(String),
    /// DATE
    Date(NaiveDate),
    /// TIME
    Time(NaiveTime),
    /// TIMESTAMP
    DateTime(NaiveDateTime),
    /// TIMESTAMPTZ
    DateTimeTz(DateTime<Utc>),
    /// UUID
    Uuid(Uuid),
    /// JSON, JSONB (SUPER on Redshift)
    Json(serde_json::Value),
}

impl Value {
    /// Check if value is NULL
    #[inline]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Try to view as a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Try to convert to i64
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int16(n) => Some(i64::from(*n)),
            Self::Int32(n) => Some(i64::from(*n)),
            Self::Int64(n) => Some(*n),
            _ => None,
        }
    }

    /// Convert to a boxed driver parameter
    fn to_sql_param(&self) -> Box<dyn tokio_postgres::types::ToSql + Sync + Send> {
        match self {
            Self::Null => Box::new(Option::<String>::None),
            Self::Bool(b) => Box::new(*b),
            Self::Int16(n) => Box::new(*n),
            Self::Int32(n) => Box::new(*n),
            Self::Int64(n) => Box::new(*n),
            Self::Float32(n) => Box::new(*n),
            Self::Float64(n) => Box::new(*n),
            Self::Decimal(d) => Box::new(*d),
            Self::String(s) => Box::new(s.clone()),
            Self::Date(d) => Box::new(*d),
            Self::Time(t) => Box::new(*t),
            Self::DateTime(dt) => Box::new(*dt),
            Self::DateTimeTz(dt) => Box::new(*dt),
            Self::Uuid(u) => Box::new(*u),
            Self::Json(j) => Box::new(j.clone()),
        }
    }
}

/// Map a host-supplied JSON parameter onto a SQL value.
///
/// The host templates statement parameters out of widget bindings, so they
/// arrive as plain JSON. Integers bind as BIGINT, other numbers as DOUBLE
/// PRECISION; arrays and objects bind as JSON.
impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Int64(i)
                } else {
                    Self::Float64(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Self::String(s),
            other => Self::Json(other),
        }
    }
}

/// Values serialize as the natural JSON the host renders in result tables
impl Serialize for Value {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_none(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Int16(n) => serializer.serialize_i16(*n),
            Self::Int32(n) => serializer.serialize_i32(*n),
            Self::Int64(n) => serializer.serialize_i64(*n),
            Self::Float32(n) => serializer.serialize_f32(*n),
            Self::Float64(n) => serializer.serialize_f64(*n),
            Self::Decimal(d) => serializer.serialize_str(&d.to_string()),
            Self::String(s) => serializer.serialize_str(s),
            Self::Date(d) => serializer.serialize_str(&d.to_string()),
            Self::Time(t) => serializer.serialize_str(&t.to_string()),
            Self::DateTime(dt) => serializer.serialize_str(&dt.to_string()),
            Self::DateTimeTz(dt) => serializer.serialize_str(&dt.to_rfc3339()),
            Self::Uuid(u) => serializer.serialize_str(&u.to_string()),
            Self::Json(j) => j.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let json = serde_json::Value::deserialize(deserializer)?;
        Ok(Self::from(json))
    }
}

/// Box a parameter slice for the driver's `&[&dyn ToSql]` call shape
pub(crate) fn bind_params(
    params: &[Value],
) -> Vec<Box<dyn tokio_postgres::types::ToSql + Sync + Send>> {
    params.iter().map(Value::to_sql_param).collect()
}

/// An ordered mapping of column name to value, one warehouse record
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl Row {
    /// Create a new row
    pub fn new(columns: Vec<String>, values: Vec<Value>) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        Self { columns, values }
    }

    /// Get column count
    #[inline]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Check if row has no columns
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Get column names in result order
    #[inline]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Get values in column order
    #[inline]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Get value by column name (case-insensitive)
    pub fn get_by_name(&self, name: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
            .and_then(|idx| self.values.get(idx))
    }
}

/// Rows serialize as JSON objects in column order
impl Serialize for Row {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (column, value) in self.columns.iter().zip(&self.values) {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

/// Convert a driver row to a plugin row
pub(crate) fn decode_row(pg_row: &tokio_postgres::Row) -> Row {
    let columns: Vec<String> = pg_row
        .columns()
        .iter()
        .map(|c| c.name().to_string())
        .collect();

    let values: Vec<Value> = pg_row
        .columns()
        .iter()
        .enumerate()
        .map(|(i, col)| decode_value(pg_row, i, col.type_()))
        .collect();

    Row::new(columns, values)
}

/// Decode one driver column into a plugin value
fn decode_value(row: &tokio_postgres::Row, idx: usize, pg_type: &tokio_postgres::types::Type) -> Value {
    use tokio_postgres::types::Type;

    match *pg_type {
        Type::BOOL => row
            .try_get::<_, Option<bool>>(idx)
            .ok()
            .flatten()
            .map(Value::Bool)
            .unwrap_or(Value::Null),
        Type::INT2 => row
            .try_get::<_, Option<i16>>(idx)
            .ok()
            .flatten()
            .map(Value::Int16)
            .unwrap_or(Value::Null),
        Type::INT4 => row
            .try_get::<_, Option<i32>>(idx)
            .ok()
            .flatten()
            .map(Value::Int32)
            .unwrap_or(Value::Null),
        Type::INT8 => row
            .try_get::<_, Option<i64>>(idx)
            .ok()
            .flatten()
            .map(Value::Int64)
            .unwrap_or(Value::Null),
        Type::FLOAT4 => row
            .try_get::<_, Option<f32>>(idx)
            .ok()
            .flatten()
            .map(Value::Float32)
            .unwrap_or(Value::Null),
        Type::FLOAT8 => row
            .try_get::<_, Option<f64>>(idx)
            .ok()
            .flatten()
            .map(Value::Float64)
            .unwrap_or(Value::Null),
        Type::NUMERIC => row
            .try_get::<_, Option<Decimal>>(idx)
            .ok()
            .flatten()
            .map(Value::Decimal)
            .unwrap_or(Value::Null),
        Type::VARCHAR | Type::TEXT | Type::BPCHAR | Type::NAME => row
            .try_get::<_, Option<String>>(idx)
            .ok()
            .flatten()
            .map(Value::String)
            .unwrap_or(Value::Null),
        Type::DATE => row
            .try_get::<_, Option<NaiveDate>>(idx)
            .ok()
            .flatten()
            .map(Value::Date)
            .unwrap_or(Value::Null),
        Type::TIME => row
            .try_get::<_, Option<NaiveTime>>(idx)
            .ok()
            .flatten()
            .map(Value::Time)
            .unwrap_or(Value::Null),
        Type::TIMESTAMP => row
            .try_get::<_, Option<NaiveDateTime>>(idx)
            .ok()
            .flatten()
            .map(Value::DateTime)
            .unwrap_or(Value::Null),
        Type::TIMESTAMPTZ => row
            .try_get::<_, Option<DateTime<Utc>>>(idx)
            .ok()
            .flatten()
            .map(Value::DateTimeTz)
            .unwrap_or(Value::Null),
        Type::UUID => row
            .try_get::<_, Option<Uuid>>(idx)
            .ok()
            .flatten()
            .map(Value::Uuid)
            .unwrap_or(Value::Null),
        Type::JSON | Type::JSONB => row
            .try_get::<_, Option<serde_json::Value>>(idx)
            .ok()
            .flatten()
            .map(Value::Json)
            .unwrap_or(Value::Null),
        _ => {
            // Unknown vendor types come back as text when the driver allows it
            row.try_get::<_, Option<String>>(idx)
                .ok()
                .flatten()
                .map(Value::String)
                .unwrap_or(Value::Null)
        }
    }
}

/// Normalize execution output for the host.
///
/// Column-name casing is made consistent (lowercased) across all rows; row
/// count, row order, and values pass through untouched. Redshift already
/// folds unquoted identifiers to lowercase, so this only changes columns that
/// were quoted with mixed case in the statement.
pub fn normalize_output(rows: Vec<Row>) -> Vec<Row> {
    rows.into_iter()
        .map(|row| {
            let Row { columns, values } = row;
            let columns = columns.into_iter().map(|c| c.to_lowercase()).collect();
            Row { columns, values }
        })
        .collect()
}
