//! Decoding sqlx rows into kernel rows.

use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{Column, Row as _, TypeInfo};

use roster_core::error::ErrorKind;
use roster_core::types::{Row, Value};
use roster_core::{KernelError, KernelResult};

/// Decode one PostgreSQL row into a kernel row, mapping column types onto
/// the kernel's value enum.
pub(crate) fn decode_row(row: &PgRow) -> KernelResult<Row> {
    let mut out = Row::new();
    for (index, column) in row.columns().iter().enumerate() {
        let value = decode_cell(row, index, column.type_info().name())
            .map_err(|e| map_decode_error(column.name(), e))?;
        out.push(column.name(), value);
    }
    Ok(out)
}

fn decode_cell(row: &PgRow, index: usize, type_name: &str) -> Result<Value, sqlx::Error> {
    let value = match type_name {
        "INT2" => row
            .try_get::<Option<i16>, _>(index)?
            .map(|v| Value::Int(v as i64)),
        "INT4" => row
            .try_get::<Option<i32>, _>(index)?
            .map(|v| Value::Int(v as i64)),
        "INT8" => row.try_get::<Option<i64>, _>(index)?.map(Value::Int),
        "FLOAT4" => row
            .try_get::<Option<f32>, _>(index)?
            .map(|v| Value::Float(v as f64)),
        "FLOAT8" => row.try_get::<Option<f64>, _>(index)?.map(Value::Float),
        "BOOL" => row.try_get::<Option<bool>, _>(index)?.map(Value::Bool),
        "TIMESTAMPTZ" => row
            .try_get::<Option<DateTime<Utc>>, _>(index)?
            .map(Value::Timestamp),
        "TIMESTAMP" => row
            .try_get::<Option<NaiveDateTime>, _>(index)?
            .map(|v| Value::Timestamp(v.and_utc())),
        "UUID" => row
            .try_get::<Option<sqlx::types::Uuid>, _>(index)?
            .map(|v| Value::Text(v.to_string())),
        // Everything else decodes as text.
        _ => row.try_get::<Option<String>, _>(index)?.map(Value::Text),
    };
    Ok(value.unwrap_or(Value::Null))
}

fn map_decode_error(column: &str, error: sqlx::Error) -> KernelError {
    KernelError::with_source(
        ErrorKind::SchemaMismatch,
        format!("Failed to decode column '{column}'"),
        error,
    )
}
