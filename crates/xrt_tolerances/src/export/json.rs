//! `{"columns": [{"name", "unit"}], "rows": [[...]]}`.
//!
//! `null` marks a value missing from a row. JSON has no non-finite numbers,
//! so NaN and infinities are written as the strings `"NaN"`, `"inf"` and
//! `"-inf"`.

use serde::Serialize;
use serde_json::Value;

use super::flatten::{ColumnData, FlatTable};
use crate::error::ToleranceError;

#[derive(Serialize)]
struct JsonColumn<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    unit: Option<&'static str>,
}

#[derive(Serialize)]
struct JsonTable<'a> {
    columns: Vec<JsonColumn<'a>>,
    rows: Vec<Vec<Value>>,
}

pub(crate) fn write_json_impl(
    table: &FlatTable,
    file: std::fs::File,
) -> Result<(), ToleranceError> {
    let columns = table
        .columns
        .iter()
        .map(|c| JsonColumn {
            name: &c.name,
            unit: c.unit_symbol(),
        })
        .collect();
    let rows = (0..table.n_rows)
        .map(|row| table.columns.iter().map(|c| cell(&c.data, row)).collect())
        .collect();
    serde_json::to_writer_pretty(file, &JsonTable { columns, rows })?;
    Ok(())
}

fn cell(data: &ColumnData, row: usize) -> Value {
    match data {
        ColumnData::Float(values) => values[row].map(number).unwrap_or(Value::Null),
        ColumnData::Int(values) => values[row].map(Value::from).unwrap_or(Value::Null),
        ColumnData::List(values) => values[row]
            .as_ref()
            .map(|items| Value::Array(items.iter().copied().map(number).collect()))
            .unwrap_or(Value::Null),
    }
}

fn number(v: f64) -> Value {
    if v.is_nan() {
        Value::from("NaN")
    } else if v.is_infinite() {
        Value::from(if v > 0.0 { "inf" } else { "-inf" })
    } else {
        Value::from(v)
    }
}
