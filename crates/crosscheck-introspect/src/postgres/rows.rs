use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use sqlx::postgres::PgRow;
use sqlx::{Column, Row, TypeInfo};

use crosscheck_core::{QueryError, ResultRow, ScalarValue};

/// Decode one Postgres row into an ordered `ResultRow`.
pub fn decode_row(row: &PgRow) -> Result<ResultRow, QueryError> {
    let mut out = ResultRow::with_capacity(row.len());
    for (index, column) in row.columns().iter().enumerate() {
        let value = decode_cell(row, index, column.type_info().name())
            .map_err(|err| QueryError::Decode(format!("column {}: {err}", column.name())))?;
        out.push(column.name(), value);
    }
    Ok(out)
}

fn decode_cell(row: &PgRow, index: usize, type_name: &str) -> Result<ScalarValue, sqlx::Error> {
    let value = match type_name {
        "BOOL" => row.try_get::<Option<bool>, _>(index)?.map(ScalarValue::Bool),
        "INT2" => row
            .try_get::<Option<i16>, _>(index)?
            .map(|v| ScalarValue::Int(v.into())),
        "INT4" => row
            .try_get::<Option<i32>, _>(index)?
            .map(|v| ScalarValue::Int(v.into())),
        "INT8" => row.try_get::<Option<i64>, _>(index)?.map(ScalarValue::Int),
        "FLOAT4" => row
            .try_get::<Option<f32>, _>(index)?
            .map(|v| ScalarValue::Float(v.into())),
        "FLOAT8" => row.try_get::<Option<f64>, _>(index)?.map(ScalarValue::Float),
        "NUMERIC" => row.try_get::<Option<Decimal>, _>(index)?.map(decimal_value),
        "UUID" => row
            .try_get::<Option<uuid::Uuid>, _>(index)?
            .map(|v| ScalarValue::Text(v.to_string())),
        "DATE" => row
            .try_get::<Option<NaiveDate>, _>(index)?
            .map(|v| ScalarValue::Text(v.to_string())),
        "TIME" => row
            .try_get::<Option<NaiveTime>, _>(index)?
            .map(|v| ScalarValue::Text(v.to_string())),
        "TIMESTAMP" => row
            .try_get::<Option<NaiveDateTime>, _>(index)?
            .map(|v| ScalarValue::Text(v.to_string())),
        "TIMESTAMPTZ" => row
            .try_get::<Option<DateTime<Utc>>, _>(index)?
            .map(|v| ScalarValue::Text(v.to_rfc3339())),
        "JSON" | "JSONB" => row
            .try_get::<Option<serde_json::Value>, _>(index)?
            .map(|v| ScalarValue::Text(v.to_string())),
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" | "CHAR" => {
            row.try_get::<Option<String>, _>(index)?.map(ScalarValue::Text)
        }
        // enums and domains arrive as text on the wire
        other => match row.try_get_unchecked::<Option<String>, _>(index) {
            Ok(value) => value.map(ScalarValue::Text),
            Err(_) => Some(ScalarValue::Text(format!("<{}>", other.to_ascii_lowercase()))),
        },
    };
    Ok(value.unwrap_or(ScalarValue::Null))
}

fn decimal_value(value: Decimal) -> ScalarValue {
    if value.fract().is_zero() {
        if let Some(int) = value.to_i64() {
            return ScalarValue::Int(int);
        }
    }
    value
        .to_f64()
        .map(ScalarValue::Float)
        .unwrap_or_else(|| ScalarValue::Text(value.to_string()))
}
