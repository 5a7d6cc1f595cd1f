use super::flatten::{ColumnData, FlatTable};
use crate::error::ToleranceError;

/// Separator between the elements of an array cell.
const LIST_SEPARATOR: &str = ";";

pub(crate) fn write_csv_impl(table: &FlatTable, file: std::fs::File) -> Result<(), ToleranceError> {
    let mut wtr = csv::Writer::from_writer(file);

    wtr.write_record(table.columns.iter().map(|c| c.name.as_str()))?;

    for row in 0..table.n_rows {
        wtr.write_record(table.columns.iter().map(|c| cell(&c.data, row)))?;
    }

    wtr.flush().map_err(csv::Error::from)?;
    Ok(())
}

fn cell(data: &ColumnData, row: usize) -> String {
    match data {
        ColumnData::Float(values) => values[row].map(|v| v.to_string()).unwrap_or_default(),
        ColumnData::Int(values) => values[row].map(|v| v.to_string()).unwrap_or_default(),
        ColumnData::List(values) => values[row]
            .as_ref()
            .map(|items| {
                items
                    .iter()
                    .map(f64::to_string)
                    .collect::<Vec<_>>()
                    .join(LIST_SEPARATOR)
            })
            .unwrap_or_default(),
    }
}
