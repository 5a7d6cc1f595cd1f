//! Turns measurement records into typed, unit-free columns.

use xrt_core::Unit;

use crate::error::ToleranceError;
use crate::record::{MetricValue, ResultTable};

/// Columns every written table must carry.
pub const REQUIRED_COLUMNS: [&str; 2] = ["energy", "wave"];

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Float(Vec<Option<f64>>),
    Int(Vec<Option<i64>>),
    List(Vec<Option<Vec<f64>>>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlatColumn {
    pub name: String,
    /// Unit the values are expressed in, for quantity columns.
    pub unit: Option<Unit>,
    pub data: ColumnData,
}

impl FlatColumn {
    /// Unit symbol to record as metadata, if any.
    pub fn unit_symbol(&self) -> Option<&'static str> {
        self.unit.map(Unit::symbol).filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlatTable {
    pub n_rows: usize,
    pub columns: Vec<FlatColumn>,
}

impl FlatTable {
    pub fn column(&self, name: &str) -> Option<&FlatColumn> {
        self.columns.iter().find(|c| c.name == name)
    }
}

pub fn flatten(table: &ResultTable) -> Result<FlatTable, ToleranceError> {
    let names = table.columns();
    for required in REQUIRED_COLUMNS {
        if !names.contains(&required) {
            return Err(ToleranceError::data_shape(required, "column is missing"));
        }
    }

    let mut columns: Vec<FlatColumn> = Vec::with_capacity(names.len());
    for name in &names {
        let values = table.column(name);
        let column = match values.iter().flatten().next() {
            Some(MetricValue::Object(_)) => flatten_objects(name, &values)?,
            Some(MetricValue::Quantity(q)) => flatten_quantities(name, q.unit, &values)?,
            Some(MetricValue::Array(_)) => flatten_arrays(name, &values)?,
            Some(MetricValue::Scalar(_) | MetricValue::Integer(_)) => {
                flatten_numbers(name, &values)?
            }
            None => continue,
        };
        if names.contains(&column.name.as_str()) && column.name != *name {
            return Err(ToleranceError::data_shape(
                *name,
                format!("rewritten column `{}` already exists", column.name),
            ));
        }
        columns.push(column);
    }

    Ok(FlatTable {
        n_rows: table.len(),
        columns,
    })
}

fn mismatch(name: &str, expected: &str, found: &MetricValue) -> ToleranceError {
    ToleranceError::data_shape(
        name,
        format!("expected {expected} values, found a {} value", found.kind()),
    )
}

fn flatten_quantities(
    name: &str,
    unit: Unit,
    values: &[Option<&MetricValue>],
) -> Result<FlatColumn, ToleranceError> {
    let data = values
        .iter()
        .map(|v| match v {
            None => Ok(None),
            Some(MetricValue::Quantity(q)) => q.to(unit).map(|q| Some(q.value)).map_err(|_| {
                ToleranceError::data_shape(name, format!("cannot convert {q} to {unit}"))
            }),
            Some(other) => Err(mismatch(name, "quantity", other)),
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(FlatColumn {
        name: name.to_string(),
        unit: Some(unit),
        data: ColumnData::Float(data),
    })
}

fn flatten_numbers(
    name: &str,
    values: &[Option<&MetricValue>],
) -> Result<FlatColumn, ToleranceError> {
    let all_integers = values
        .iter()
        .flatten()
        .all(|v| matches!(v, MetricValue::Integer(_)));
    let data = if all_integers {
        ColumnData::Int(
            values
                .iter()
                .map(|v| match v {
                    Some(MetricValue::Integer(i)) => Some(*i),
                    _ => None,
                })
                .collect(),
        )
    } else {
        ColumnData::Float(
            values
                .iter()
                .map(|v| match v {
                    None => Ok(None),
                    Some(MetricValue::Scalar(x)) => Ok(Some(*x)),
                    Some(MetricValue::Integer(i)) => Ok(Some(*i as f64)),
                    Some(other) => Err(mismatch(name, "plain numeric", other)),
                })
                .collect::<Result<Vec<_>, _>>()?,
        )
    };
    Ok(FlatColumn {
        name: name.to_string(),
        unit: None,
        data,
    })
}

fn flatten_arrays(
    name: &str,
    values: &[Option<&MetricValue>],
) -> Result<FlatColumn, ToleranceError> {
    let data = values
        .iter()
        .map(|v| match v {
            None => Ok(None),
            Some(MetricValue::Array(a)) => Ok(Some(a.clone())),
            Some(other) => Err(mismatch(name, "array", other)),
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(FlatColumn {
        name: name.to_string(),
        unit: None,
        data: ColumnData::List(data),
    })
}

/// Replace an object column by the scalar attribute all its objects share.
fn flatten_objects(
    name: &str,
    values: &[Option<&MetricValue>],
) -> Result<FlatColumn, ToleranceError> {
    let mut attribute: Option<&'static str> = None;
    let mut unit = Unit::Radian;
    let mut data = Vec::with_capacity(values.len());
    for value in values {
        let selector = match value {
            Some(MetricValue::Object(selector)) => selector,
            Some(other) => return Err(mismatch(name, "object", other)),
            None => {
                return Err(ToleranceError::data_shape(
                    name,
                    "object column is missing in some rows",
                ))
            }
        };
        let (attr, q) = selector.named_scalar();
        match attribute {
            None => {
                attribute = Some(attr);
                unit = q.unit;
            }
            Some(seen) if seen != attr => {
                return Err(ToleranceError::data_shape(
                    name,
                    format!("objects expose both `{seen}` and `{attr}`"),
                ))
            }
            Some(_) => {}
        }
        data.push(Some(q.to(unit)?.value));
    }
    let attribute =
        attribute.ok_or_else(|| ToleranceError::data_shape(name, "object column is empty"))?;
    Ok(FlatColumn {
        name: attribute.to_string(),
        unit: Some(unit),
        data: ColumnData::Float(data),
    })
}
