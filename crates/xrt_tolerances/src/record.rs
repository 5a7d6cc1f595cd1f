//! Measurement records and result tables.
//!
//! Every metric declares its kind when it is recorded, so the writer never
//! has to probe values to find out how to store a column.

use serde::Serialize;
use xrt_core::{OrderSelector, ParamValue, Perturbation, Quantity};

/// One measured or echoed value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum MetricValue {
    Scalar(f64),
    Integer(i64),
    Quantity(Quantity),
    Array(Vec<f64>),
    /// An object that exposes a named scalar attribute.
    Object(OrderSelector),
}

impl MetricValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetricValue::Scalar(v) => Some(*v),
            MetricValue::Integer(v) => Some(*v as f64),
            MetricValue::Quantity(q) => Some(q.value),
            MetricValue::Array(_) | MetricValue::Object(_) => None,
        }
    }

    pub(crate) fn kind(&self) -> &'static str {
        match self {
            MetricValue::Scalar(_) => "scalar",
            MetricValue::Integer(_) => "integer",
            MetricValue::Quantity(_) => "quantity",
            MetricValue::Array(_) => "array",
            MetricValue::Object(_) => "object",
        }
    }
}

impl From<ParamValue> for MetricValue {
    fn from(value: ParamValue) -> Self {
        match value {
            ParamValue::Scalar(v) => MetricValue::Scalar(v),
            ParamValue::Quantity(q) => MetricValue::Quantity(q),
            ParamValue::Selector(s) => MetricValue::Object(s),
        }
    }
}

impl From<OrderSelector> for MetricValue {
    fn from(s: OrderSelector) -> Self {
        MetricValue::Object(s)
    }
}

impl From<Quantity> for MetricValue {
    fn from(q: Quantity) -> Self {
        MetricValue::Quantity(q)
    }
}

impl From<f64> for MetricValue {
    fn from(v: f64) -> Self {
        MetricValue::Scalar(v)
    }
}

impl From<i64> for MetricValue {
    fn from(v: i64) -> Self {
        MetricValue::Integer(v)
    }
}

impl From<Vec<f64>> for MetricValue {
    fn from(v: Vec<f64>) -> Self {
        MetricValue::Array(v)
    }
}

/// Ordered mapping from metric name to value for one (energy, perturbation) pair.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MeasurementRecord {
    fields: Vec<(String, MetricValue)>,
}

impl MeasurementRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces an existing value of the same name in place.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<MetricValue>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<MetricValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Echo the perturbation values into the record.
    pub fn merge_perturbation(&mut self, perturbation: &Perturbation) {
        for (name, value) in perturbation.iter() {
            self.insert(name, MetricValue::from(*value));
        }
    }

    pub fn get(&self, name: &str) -> Option<&MetricValue> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetricValue)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Rows of measurement records in the order they were produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultTable {
    rows: Vec<MeasurementRecord>,
}

impl ResultTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: MeasurementRecord) {
        self.rows.push(record);
    }

    pub fn rows(&self) -> &[MeasurementRecord] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Union of record keys in first-seen order.
    pub fn columns(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for name in self.rows.iter().flat_map(MeasurementRecord::names) {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }

    /// Values of one column, `None` where a row lacks it.
    pub fn column(&self, name: &str) -> Vec<Option<&MetricValue>> {
        self.rows.iter().map(|row| row.get(name)).collect()
    }
}

impl FromIterator<MeasurementRecord> for ResultTable {
    fn from_iter<I: IntoIterator<Item = MeasurementRecord>>(iter: I) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}
