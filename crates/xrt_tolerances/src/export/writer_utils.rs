use std::fs::File;
use std::path::Path;

use crate::error::ToleranceError;
use crate::record::ResultTable;

pub(crate) fn ensure_not_empty(table: &ResultTable) -> Result<(), ToleranceError> {
    if table.is_empty() {
        return Err(ToleranceError::InvalidInput(
            "No results to export".to_string(),
        ));
    }

    Ok(())
}

/// Create (or truncate) the output file, creating missing parent directories.
pub(crate) fn create_output_file(path: &Path) -> Result<File, ToleranceError> {
    let io_err = |source| ToleranceError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    File::create(path).map_err(io_err)
}
