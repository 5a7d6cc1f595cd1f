#![allow(dead_code)]

use std::fs::File;
use std::path::Path;

use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use xrt_core::pipeline::pipelines;
use xrt_core::{Adjustment, InstrumentConfig, Perturbation, PointSource, Quantity, Reset};
use xrt_tolerances::{CaptureResAeff, MeasurementRecord, SweepInputs};

pub const WAVES: [f64; 3] = [15.0, 25.0, 37.0];

pub fn analyzer(config: &InstrumentConfig) -> CaptureResAeff {
    CaptureResAeff::new(config.geometric_area(), "proj_x", -12..=4)
        .expect("geometric area should be an area")
}

pub fn inputs(
    adjustment: Adjustment,
    perturbations: Vec<Perturbation>,
    reset: Reset,
) -> SweepInputs {
    SweepInputs {
        source: PointSource::on_axis(Quantity::kev(0.5)).expect("valid energy"),
        energies: WAVES.iter().map(|&w| Quantity::angstrom(w)).collect(),
        n_photons: 400,
        seed: 17,
        adjustment,
        perturbations,
        reset,
    }
}

pub fn detector_split() -> xrt_core::SplitPipeline {
    pipelines::tolerancing()
        .split_at(pipelines::DETECTOR)
        .expect("detector stage should be splittable")
}

/// Metric fields only; NaN-safe through Debug formatting.
pub fn metrics(record: &MeasurementRecord) -> String {
    let fields: Vec<String> = ["aeff0", "aeffgrat", "effective_area", "resolution", "aeff", "res"]
        .iter()
        .map(|name| format!("{name}={:?}", record.get(name)))
        .collect();
    fields.join(" ")
}

/// Read a whole parquet file back into one batch plus the footer key/values.
pub fn read_parquet(path: &Path) -> (RecordBatch, Vec<(String, Option<String>)>) {
    let file = File::open(path).expect("parquet file should exist");
    let builder = ParquetRecordBatchReaderBuilder::try_new(file).expect("valid parquet file");
    let key_values = builder
        .metadata()
        .file_metadata()
        .key_value_metadata()
        .map(|kvs| kvs.iter().map(|kv| (kv.key.clone(), kv.value.clone())).collect())
        .unwrap_or_default();
    let schema = builder.schema().clone();
    let batches: Vec<RecordBatch> = builder
        .build()
        .expect("reader should build")
        .collect::<Result<_, _>>()
        .expect("batches should decode");
    let batch = arrow::compute::concat_batches(&schema, &batches).expect("batches should concat");
    (batch, key_values)
}
