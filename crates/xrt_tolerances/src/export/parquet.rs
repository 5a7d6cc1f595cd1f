use std::collections::HashMap;
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Float64Builder, Int64Array, ListBuilder};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::file::metadata::KeyValue;
use parquet::file::properties::WriterProperties;

use super::flatten::{ColumnData, FlatColumn, FlatTable};
use crate::error::ToleranceError;

/// Field metadata key holding a column's unit symbol.
pub const UNIT_KEY: &str = "unit";

pub(crate) fn write_parquet_impl(
    table: &FlatTable,
    file: std::fs::File,
) -> Result<(), ToleranceError> {
    let batch = build_record_batch(table)?;
    let props = WriterProperties::builder()
        .set_key_value_metadata(Some(unit_key_values(table)))
        .build();
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;
    writer.write(&batch)?;
    writer.close()?;

    Ok(())
}

fn build_record_batch(table: &FlatTable) -> Result<RecordBatch, arrow::error::ArrowError> {
    let schema = Arc::new(parquet_schema(table));
    let arrays = table.columns.iter().map(build_array).collect();

    RecordBatch::try_new(schema, arrays)
}

fn parquet_schema(table: &FlatTable) -> Schema {
    let fields: Vec<Field> = table
        .columns
        .iter()
        .map(|column| {
            let field = Field::new(&column.name, data_type(&column.data), true);
            match column.unit_symbol() {
                Some(symbol) => field.with_metadata(HashMap::from([(
                    UNIT_KEY.to_string(),
                    symbol.to_string(),
                )])),
                None => field,
            }
        })
        .collect();
    Schema::new(fields)
}

fn data_type(data: &ColumnData) -> DataType {
    match data {
        ColumnData::Float(_) => DataType::Float64,
        ColumnData::Int(_) => DataType::Int64,
        ColumnData::List(_) => {
            DataType::List(Arc::new(Field::new("item", DataType::Float64, true)))
        }
    }
}

fn build_array(column: &FlatColumn) -> ArrayRef {
    match &column.data {
        ColumnData::Float(values) => Arc::new(Float64Array::from(values.clone())),
        ColumnData::Int(values) => Arc::new(Int64Array::from(values.clone())),
        ColumnData::List(values) => {
            let mut builder = ListBuilder::new(Float64Builder::new());
            for value in values {
                match value {
                    Some(items) => {
                        builder.values().append_slice(items);
                        builder.append(true);
                    }
                    None => builder.append(false),
                }
            }
            Arc::new(builder.finish())
        }
    }
}

/// `unit:<column>` entries for the parquet footer.
fn unit_key_values(table: &FlatTable) -> Vec<KeyValue> {
    table
        .columns
        .iter()
        .filter_map(|column| {
            column
                .unit_symbol()
                .map(|symbol| KeyValue::new(format!("unit:{}", column.name), symbol.to_string()))
        })
        .collect()
}
