//! Dynamic column values.
//!
//! The set of columns of a table is only known at runtime, so record state is
//! stored as [`Value`]s rather than typed struct fields. A `Value` decodes from
//! any supported result column and encodes into whatever parameter type the
//! server inferred, coercing text the way a loosely typed driver would
//! (`Value::Text("42")` binds fine to an `int4` parameter).

use crate::error::{OrmError, OrmResult};
use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::Serialize;
use std::error::Error;
use std::fmt;
use tokio_postgres::Row;
use tokio_postgres::types::{FromSql, IsNull, Kind, ToSql, Type, to_sql_checked};
use uuid::Uuid;

type BoxError = Box<dyn Error + Sync + Send>;

/// A single column value.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Json(serde_json::Value),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
    Uuid(Uuid),
    #[cfg(feature = "rust_decimal")]
    Decimal(rust_decimal::Decimal),
    /// One-dimensional array; `NULL` elements are [`Value::Null`].
    Array(Vec<Value>),
    /// A column type without a dedicated variant (`interval`, `inet`, ...),
    /// kept in wire format so it can be written back unchanged.
    Raw(RawValue),
}

/// Binary wire value of a column whose type has no dedicated [`Value`] variant.
///
/// It binds only to a parameter of the same type.
#[derive(Debug, Clone, PartialEq)]
pub struct RawValue {
    ty: Type,
    bytes: Vec<u8>,
}

impl RawValue {
    pub fn type_(&self) -> &Type {
        &self.ty
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_hex(f, &self.bytes)
    }
}

impl Serialize for RawValue {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A value that cannot be bound to the parameter type the server inferred.
#[derive(Debug)]
pub(crate) struct EncodeError {
    kind: &'static str,
    ty: Type,
    source: BoxError,
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cannot bind {} value to a parameter of type {}: {}",
            self.kind, self.ty, self.source
        )
    }
}

impl Error for EncodeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(self.source.as_ref())
    }
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Whether the value counts as "empty".
    ///
    /// Empty identifiers mark a record as not yet persisted: `NULL`, `""`,
    /// `"0"`, `0`, `0.0`, `false` and empty bytes are all empty.
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Bool(b) => !b,
            Value::Int(i) => *i == 0,
            Value::Float(f) => *f == 0.0,
            Value::Text(s) => s.is_empty() || s == "0",
            Value::Bytes(b) => b.is_empty(),
            Value::Array(items) => items.is_empty(),
            #[cfg(feature = "rust_decimal")]
            Value::Decimal(d) => d.is_zero(),
            _ => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Short name of the variant, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
            Value::Json(_) => "json",
            Value::Date(_) => "date",
            Value::Time(_) => "time",
            Value::Timestamp(_) => "timestamp",
            Value::TimestampTz(_) => "timestamptz",
            Value::Uuid(_) => "uuid",
            #[cfg(feature = "rust_decimal")]
            Value::Decimal(_) => "decimal",
            Value::Array(_) => "array",
            Value::Raw(_) => "raw",
        }
    }

    /// Decode column `idx` of `row`, choosing the variant from the column type.
    ///
    /// Types without a dedicated variant decode to [`Value::Raw`]; arrays the
    /// element decoder cannot handle (several dimensions, exotic elements)
    /// do as well.
    pub fn from_column(row: &Row, idx: usize) -> OrmResult<Self> {
        let column = row
            .columns()
            .get(idx)
            .ok_or_else(|| OrmError::decode(idx.to_string(), "column index out of range"))?;
        let name = column.name();
        let ty = column.type_();

        let value = match *ty {
            Type::BOOL => get::<bool>(row, idx, name)?.map(Value::Bool),
            Type::INT2 => get::<i16>(row, idx, name)?.map(|v| Value::Int(v.into())),
            Type::INT4 => get::<i32>(row, idx, name)?.map(|v| Value::Int(v.into())),
            Type::INT8 => get::<i64>(row, idx, name)?.map(Value::Int),
            Type::OID => get::<u32>(row, idx, name)?.map(|v| Value::Int(v.into())),
            Type::FLOAT4 => get::<f32>(row, idx, name)?.map(|v| Value::Float(v.into())),
            Type::FLOAT8 => get::<f64>(row, idx, name)?.map(Value::Float),
            #[cfg(feature = "rust_decimal")]
            Type::NUMERIC => get::<rust_decimal::Decimal>(row, idx, name)?.map(Value::Decimal),
            Type::BYTEA => get::<Vec<u8>>(row, idx, name)?.map(Value::Bytes),
            Type::JSON | Type::JSONB => get::<serde_json::Value>(row, idx, name)?.map(Value::Json),
            Type::DATE => get::<NaiveDate>(row, idx, name)?.map(Value::Date),
            Type::TIME => get::<NaiveTime>(row, idx, name)?.map(Value::Time),
            Type::TIMESTAMP => get::<NaiveDateTime>(row, idx, name)?.map(Value::Timestamp),
            Type::TIMESTAMPTZ => get::<DateTime<Utc>>(row, idx, name)?.map(Value::TimestampTz),
            Type::UUID => get::<Uuid>(row, idx, name)?.map(Value::Uuid),
            _ if is_textual(ty) => get::<RawText>(row, idx, name)?.map(|t| Value::Text(t.0)),
            _ => match ty.kind() {
                Kind::Array(elem) => match decode_array(row, idx, name, elem) {
                    Ok(value) => value,
                    Err(_) => decode_raw(row, idx, name, ty)?,
                },
                _ => decode_raw(row, idx, name, ty)?,
            },
        };

        Ok(value.unwrap_or(Value::Null))
    }

    fn encode(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(b) => match *ty {
                Type::BOOL => b.to_sql(ty, out),
                Type::INT2 | Type::INT4 | Type::INT8 => encode_int(i64::from(*b), ty, out),
                _ if is_textual(ty) => encode_text(if *b { "true" } else { "false" }, ty, out),
                _ => Err(no_conversion()),
            },
            Value::Int(i) => encode_int(*i, ty, out),
            Value::Float(f) => encode_float(*f, ty, out),
            Value::Text(s) => encode_text(s, ty, out),
            Value::Bytes(b) => match *ty {
                Type::BYTEA => b.to_sql(ty, out),
                _ if is_textual(ty) => encode_text(std::str::from_utf8(b)?, ty, out),
                _ => Err(no_conversion()),
            },
            Value::Json(j) => match *ty {
                Type::JSON | Type::JSONB => j.to_sql(ty, out),
                _ if is_textual(ty) => encode_text(&j.to_string(), ty, out),
                _ => Err(no_conversion()),
            },
            Value::Date(d) => match *ty {
                Type::DATE => d.to_sql(ty, out),
                Type::TIMESTAMP => d.and_time(NaiveTime::MIN).to_sql(ty, out),
                _ if is_textual(ty) => encode_text(&d.to_string(), ty, out),
                _ => Err(no_conversion()),
            },
            Value::Time(t) => match *ty {
                Type::TIME => t.to_sql(ty, out),
                _ if is_textual(ty) => encode_text(&t.to_string(), ty, out),
                _ => Err(no_conversion()),
            },
            Value::Timestamp(ts) => match *ty {
                Type::TIMESTAMP => ts.to_sql(ty, out),
                Type::TIMESTAMPTZ => ts.and_utc().to_sql(ty, out),
                _ if is_textual(ty) => encode_text(&ts.to_string(), ty, out),
                _ => Err(no_conversion()),
            },
            Value::TimestampTz(ts) => match *ty {
                Type::TIMESTAMPTZ => ts.to_sql(ty, out),
                Type::TIMESTAMP => ts.naive_utc().to_sql(ty, out),
                _ if is_textual(ty) => encode_text(&ts.to_rfc3339(), ty, out),
                _ => Err(no_conversion()),
            },
            Value::Uuid(u) => match *ty {
                Type::UUID => u.to_sql(ty, out),
                _ if is_textual(ty) => encode_text(&u.to_string(), ty, out),
                _ => Err(no_conversion()),
            },
            #[cfg(feature = "rust_decimal")]
            Value::Decimal(d) => match *ty {
                Type::NUMERIC => d.to_sql(ty, out),
                Type::FLOAT4 | Type::FLOAT8 => {
                    use rust_decimal::prelude::ToPrimitive;
                    let f = d.to_f64().ok_or_else(no_conversion)?;
                    encode_float(f, ty, out)
                }
                _ if is_textual(ty) => encode_text(&d.to_string(), ty, out),
                _ => Err(no_conversion()),
            },
            Value::Array(items) => match ty.kind() {
                Kind::Array(_) => items.to_sql(ty, out),
                _ => Err(no_conversion()),
            },
            Value::Raw(raw) if raw.ty == *ty => {
                out.extend_from_slice(&raw.bytes);
                Ok(IsNull::No)
            }
            Value::Raw(_) => Err(no_conversion()),
        }
    }
}

fn get<'a, T: FromSql<'a>>(row: &'a Row, idx: usize, name: &str) -> OrmResult<Option<T>> {
    row.try_get::<_, Option<T>>(idx)
        .map_err(|e| OrmError::decode(name, e.to_string()))
}

fn decode_array(row: &Row, idx: usize, name: &str, elem: &Type) -> OrmResult<Option<Value>> {
    fn items<'a, T: FromSql<'a>>(
        row: &'a Row,
        idx: usize,
        name: &str,
        f: impl Fn(T) -> Value,
    ) -> OrmResult<Option<Value>> {
        Ok(get::<Vec<Option<T>>>(row, idx, name)?.map(|items| {
            Value::Array(
                items
                    .into_iter()
                    .map(|item| item.map_or(Value::Null, &f))
                    .collect(),
            )
        }))
    }

    match *elem {
        Type::BOOL => items::<bool>(row, idx, name, Value::Bool),
        Type::INT2 => items::<i16>(row, idx, name, |v| Value::Int(v.into())),
        Type::INT4 => items::<i32>(row, idx, name, |v| Value::Int(v.into())),
        Type::INT8 => items::<i64>(row, idx, name, Value::Int),
        Type::FLOAT4 => items::<f32>(row, idx, name, |v| Value::Float(v.into())),
        Type::FLOAT8 => items::<f64>(row, idx, name, Value::Float),
        #[cfg(feature = "rust_decimal")]
        Type::NUMERIC => items::<rust_decimal::Decimal>(row, idx, name, Value::Decimal),
        Type::BYTEA => items::<Vec<u8>>(row, idx, name, Value::Bytes),
        Type::JSON | Type::JSONB => items::<serde_json::Value>(row, idx, name, Value::Json),
        Type::DATE => items::<NaiveDate>(row, idx, name, Value::Date),
        Type::TIME => items::<NaiveTime>(row, idx, name, Value::Time),
        Type::TIMESTAMP => items::<NaiveDateTime>(row, idx, name, Value::Timestamp),
        Type::TIMESTAMPTZ => items::<DateTime<Utc>>(row, idx, name, Value::TimestampTz),
        Type::UUID => items::<Uuid>(row, idx, name, Value::Uuid),
        _ if is_textual(elem) => items::<RawText>(row, idx, name, |t| Value::Text(t.0)),
        _ => Err(OrmError::decode(name, format!("no element decoder for {elem}"))),
    }
}

fn decode_raw(row: &Row, idx: usize, name: &str, ty: &Type) -> OrmResult<Option<Value>> {
    Ok(get::<RawBytes>(row, idx, name)?.map(|raw| {
        Value::Raw(RawValue {
            ty: ty.clone(),
            bytes: raw.0,
        })
    }))
}

/// Text-like types: their binary wire format is the UTF-8 text itself.
fn is_textual(ty: &Type) -> bool {
    matches!(
        *ty,
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME | Type::UNKNOWN
    ) || ty.name() == "citext"
        || matches!(ty.kind(), Kind::Enum(_))
}

/// Decodes any text-like column, enums included.
struct RawText(String);

impl<'a> FromSql<'a> for RawText {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> Result<Self, BoxError> {
        Ok(RawText(std::str::from_utf8(raw)?.to_string()))
    }

    fn accepts(ty: &Type) -> bool {
        is_textual(ty)
    }
}

/// Accepts every type; used for columns kept as [`Value::Raw`].
struct RawBytes(Vec<u8>);

impl<'a> FromSql<'a> for RawBytes {
    fn from_sql(_ty: &Type, raw: &'a [u8]) -> Result<Self, BoxError> {
        Ok(RawBytes(raw.to_vec()))
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }
}

fn no_conversion() -> BoxError {
    "no conversion between these types".into()
}

fn write_hex(f: &mut fmt::Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    f.write_str("\\x")?;
    for byte in bytes {
        write!(f, "{byte:02x}")?;
    }
    Ok(())
}

fn parse_bool(s: &str) -> Result<bool, BoxError> {
    match s.trim().to_ascii_lowercase().as_str() {
        "t" | "true" | "1" | "y" | "yes" | "on" => Ok(true),
        "f" | "false" | "0" | "n" | "no" | "off" | "" => Ok(false),
        other => Err(format!("invalid boolean literal '{other}'").into()),
    }
}

fn parse_timestamp(s: &str) -> Result<NaiveDateTime, BoxError> {
    let s = s.trim();
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
        .or_else(|_| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map(|d| d.and_time(NaiveTime::MIN))
        })
        .map_err(Into::into)
}

fn encode_int(i: i64, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    match *ty {
        Type::INT2 => i16::try_from(i)?.to_sql(ty, out),
        Type::INT4 => i32::try_from(i)?.to_sql(ty, out),
        Type::INT8 => i.to_sql(ty, out),
        Type::OID => u32::try_from(i)?.to_sql(ty, out),
        Type::FLOAT4 => (i as f32).to_sql(ty, out),
        Type::FLOAT8 => (i as f64).to_sql(ty, out),
        Type::BOOL => (i != 0).to_sql(ty, out),
        #[cfg(feature = "rust_decimal")]
        Type::NUMERIC => rust_decimal::Decimal::from(i).to_sql(ty, out),
        _ if is_textual(ty) => i.to_string().to_sql(ty, out),
        _ => Err(no_conversion()),
    }
}

fn encode_float(f: f64, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    match *ty {
        Type::FLOAT4 => (f as f32).to_sql(ty, out),
        Type::FLOAT8 => f.to_sql(ty, out),
        Type::INT2 | Type::INT4 | Type::INT8 | Type::OID if f.fract() == 0.0 => {
            encode_int(f as i64, ty, out)
        }
        #[cfg(feature = "rust_decimal")]
        Type::NUMERIC => rust_decimal::Decimal::try_from(f)?.to_sql(ty, out),
        _ if is_textual(ty) => f.to_string().to_sql(ty, out),
        _ => Err(no_conversion()),
    }
}

fn encode_text(s: &str, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    match *ty {
        Type::INT2 | Type::INT4 | Type::INT8 | Type::OID => {
            encode_int(s.trim().parse::<i64>()?, ty, out)
        }
        Type::FLOAT4 | Type::FLOAT8 => encode_float(s.trim().parse::<f64>()?, ty, out),
        Type::BOOL => parse_bool(s)?.to_sql(ty, out),
        #[cfg(feature = "rust_decimal")]
        Type::NUMERIC => s.trim().parse::<rust_decimal::Decimal>()?.to_sql(ty, out),
        Type::JSON | Type::JSONB => serde_json::from_str::<serde_json::Value>(s)?.to_sql(ty, out),
        Type::DATE => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")?.to_sql(ty, out),
        Type::TIME => NaiveTime::parse_from_str(s.trim(), "%H:%M:%S%.f")?.to_sql(ty, out),
        Type::TIMESTAMP => parse_timestamp(s)?.to_sql(ty, out),
        Type::TIMESTAMPTZ => match DateTime::parse_from_rfc3339(s.trim()) {
            Ok(dt) => dt.with_timezone(&Utc).to_sql(ty, out),
            Err(_) => parse_timestamp(s)?.and_utc().to_sql(ty, out),
        },
        Type::UUID => Uuid::parse_str(s.trim())?.to_sql(ty, out),
        Type::BYTEA => s.as_bytes().to_sql(ty, out),
        _ if is_textual(ty) => {
            out.extend_from_slice(s.as_bytes());
            Ok(IsNull::No)
        }
        _ => Err(no_conversion()),
    }
}

impl ToSql for Value {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        self.encode(ty, out).map_err(|source| {
            Box::new(EncodeError {
                kind: self.kind(),
                ty: ty.clone(),
                source,
            }) as BoxError
        })
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Text(s) => f.write_str(s),
            Value::Bytes(b) => write_hex(f, b),
            Value::Json(j) => write!(f, "{j}"),
            Value::Date(d) => write!(f, "{d}"),
            Value::Time(t) => write!(f, "{t}"),
            Value::Timestamp(ts) => write!(f, "{ts}"),
            Value::TimestampTz(ts) => write!(f, "{}", ts.to_rfc3339()),
            Value::Uuid(u) => write!(f, "{u}"),
            #[cfg(feature = "rust_decimal")]
            Value::Decimal(d) => write!(f, "{d}"),
            Value::Array(items) => {
                f.write_str("{")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("}")
            }
            Value::Raw(raw) => write!(f, "{raw}"),
        }
    }
}

macro_rules! impl_from {
    ($($ty:ty => $variant:ident $(via $conv:ty)?),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v $(as $conv)?)
                }
            }
        )*
    };
}

impl_from! {
    bool => Bool,
    i16 => Int via i64,
    i32 => Int via i64,
    i64 => Int,
    u32 => Int via i64,
    f32 => Float via f64,
    f64 => Float,
    String => Text,
    Vec<u8> => Bytes,
    NaiveDate => Date,
    NaiveTime => Time,
    NaiveDateTime => Timestamp,
    DateTime<Utc> => TimestampTz,
    Uuid => Uuid,
    Vec<Value> => Array,
}

#[cfg(feature = "rust_decimal")]
impl From<rust_decimal::Decimal> for Value {
    fn from(v: rust_decimal::Decimal) -> Self {
        Value::Decimal(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<&String> for Value {
    fn from(v: &String) -> Self {
        Value::Text(v.clone())
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Bytes(v.to_vec())
    }
}

impl From<&Value> for Value {
    fn from(v: &Value) -> Self {
        v.clone()
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// Scalars map to their natural variant; arrays and objects stay JSON.
impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => n.as_f64().map_or(Value::Null, Value::Float),
            },
            serde_json::Value::String(s) => Value::Text(s),
            other => Value::Json(other),
        }
    }
}
