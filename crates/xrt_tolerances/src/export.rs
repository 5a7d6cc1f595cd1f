//! Result table export.
//!
//! Tables are flattened first: quantities become plain floats with their
//! unit kept as metadata, selector objects become their named scalar, and
//! values missing from some rows become nulls. The flat table is then
//! written as Parquet, CSV or JSON depending on the file extension.

use std::path::Path;

use crate::error::ToleranceError;
use crate::record::ResultTable;

#[path = "export/csv.rs"]
mod csv;
#[path = "export/flatten.rs"]
mod flatten;
#[path = "export/json.rs"]
mod json;
#[path = "export/parquet.rs"]
mod parquet;
#[path = "export/writer_utils.rs"]
mod writer_utils;

pub use self::flatten::{flatten, ColumnData, FlatColumn, FlatTable, REQUIRED_COLUMNS};
pub use self::parquet::UNIT_KEY;

/// On-disk format of a result table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Parquet,
    Csv,
    Json,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Parquet => "parquet",
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
        }
    }

    /// Format implied by the extension of `path`; Parquet when there is none.
    pub fn from_path(path: &Path) -> Result<Self, ToleranceError> {
        match path.extension().and_then(|e| e.to_str()) {
            None | Some("parquet") => Ok(OutputFormat::Parquet),
            Some("csv") => Ok(OutputFormat::Csv),
            Some("json") => Ok(OutputFormat::Json),
            Some(other) => Err(ToleranceError::InvalidInput(format!(
                "unsupported output extension `.{other}` for {}",
                path.display()
            ))),
        }
    }
}

/// Write `table` to `path`, choosing the format from the extension.
///
/// An existing file is overwritten.
///
/// # Errors
///
/// Returns an error if the table is empty, cannot be flattened, or the file
/// cannot be written.
pub fn write_table(table: &ResultTable, path: impl AsRef<Path>) -> Result<(), ToleranceError> {
    let path = path.as_ref();
    let format = OutputFormat::from_path(path)?;
    write_table_as(table, path, format)
}

/// Write `table` to `path` in an explicit format.
pub fn write_table_as(
    table: &ResultTable,
    path: impl AsRef<Path>,
    format: OutputFormat,
) -> Result<(), ToleranceError> {
    let path = path.as_ref();
    writer_utils::ensure_not_empty(table)?;
    let flat = flatten(table)?;
    let file = writer_utils::create_output_file(path)?;
    match format {
        OutputFormat::Parquet => parquet::write_parquet_impl(&flat, file)?,
        OutputFormat::Csv => csv::write_csv_impl(&flat, file)?,
        OutputFormat::Json => json::write_json_impl(&flat, file)?,
    }
    log::info!("Writing {}", path.display());
    Ok(())
}
