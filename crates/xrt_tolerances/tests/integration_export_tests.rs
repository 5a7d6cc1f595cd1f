mod support;

use std::process::Command;

use arrow::array::{Array, Float64Array, Int64Array, ListArray};
use support::{analyzer, inputs, read_parquet, WAVES};
use tempfile::TempDir;
use xrt_core::pipeline::pipelines;
use xrt_core::{Adjustment, InstrumentConfig, OrderSelector, Quantity, Reset, Unit};
use xrt_tolerances::export::UNIT_KEY;
use xrt_tolerances::{
    generate_6d_wigglelist, run_for_energies, vary_order_selector, write_table, ConfigError,
    MeasurementRecord, ResultTable, SiteConfig,
};

#[test]
fn test_individual_wiggle_table_has_expected_shape() {
    let translations: Vec<Quantity> = [0.0, 0.1, 0.2, 0.4, 0.7, 1.0, 2.0, 5.0, 10.0, 20.0]
        .iter()
        .map(|&v| Quantity::mm(v))
        .collect();
    let rotations: Vec<Quantity> = [0.0, 2.0, 5.0, 10.0, 20.0, 40.0, 60.0]
        .iter()
        .map(|&v| Quantity::arcmin(v))
        .collect();
    let (_, individual) = generate_6d_wigglelist(&translations, &rotations).unwrap();
    assert_eq!(individual.len(), 9 + 6 + 1);

    let config = InstrumentConfig::lynx();
    let split = pipelines::tolerancing().split_at(pipelines::GRATINGS).unwrap();
    let outcome = run_for_energies(
        &inputs(Adjustment::Wiggle { seed: 1 }, individual, Reset::zero_6d()),
        &config,
        &split,
        &analyzer(&config),
        false,
    )
    .unwrap();
    assert_eq!(outcome.table.len(), 3 * 16);

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("CAT_individual.parquet");
    write_table(&outcome.table, &path).unwrap();
    // overwriting an existing file is fine
    write_table(&outcome.table, &path).unwrap();

    let (batch, key_values) = read_parquet(&path);
    assert_eq!(batch.num_rows(), 48);
    let schema = batch.schema();
    for column in [
        "energy",
        "wave",
        "dx",
        "dy",
        "dz",
        "rx",
        "ry",
        "rz",
        "effective_area",
        "resolution",
    ] {
        assert!(schema.field_with_name(column).is_ok(), "missing {column}");
    }
    let dx = schema.field_with_name("dx").unwrap();
    assert_eq!(dx.metadata().get(UNIT_KEY).map(String::as_str), Some("mm"));
    let rz = schema.field_with_name("rz").unwrap();
    assert_eq!(rz.metadata().get(UNIT_KEY).map(String::as_str), Some("arcmin"));
    assert!(key_values.contains(&("unit:energy".to_string(), Some("keV".to_string()))));
    assert!(key_values.contains(&("unit:effective_area".to_string(), Some("cm2".to_string()))));

    let wave = batch
        .column_by_name("wave")
        .unwrap()
        .as_any()
        .downcast_ref::<Float64Array>()
        .unwrap();
    assert!((wave.value(0) - WAVES[0]).abs() < 1e-9);
    assert!((wave.value(47) - WAVES[2]).abs() < 1e-9);

    let aeff = batch
        .column_by_name("aeff")
        .unwrap()
        .as_any()
        .downcast_ref::<ListArray>()
        .unwrap();
    assert_eq!(aeff.value(0).len(), 17);
}

#[test]
fn test_order_selector_column_is_rewritten_to_sigma() {
    let selectors: Vec<OrderSelector> = [0.0, 0.1, 0.5]
        .iter()
        .map(|&deg| OrderSelector::gaussian(Quantity::new(deg, Unit::Degree)).unwrap())
        .collect();
    let config = InstrumentConfig::lynx();
    let split = pipelines::tolerancing().split_at(pipelines::GRATINGS).unwrap();
    let outcome = run_for_energies(
        &inputs(
            Adjustment::VaryAttribute,
            vary_order_selector(&selectors).unwrap(),
            Reset::Baseline,
        ),
        &config,
        &split,
        &analyzer(&config),
        false,
    )
    .unwrap();

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("CAT_blaze.parquet");
    write_table(&outcome.table, &path).unwrap();

    let (batch, _) = read_parquet(&path);
    let schema = batch.schema();
    assert!(schema.field_with_name("order_selector").is_err());
    assert_eq!(
        schema
            .field_with_name("sigma")
            .unwrap()
            .metadata()
            .get(UNIT_KEY)
            .map(String::as_str),
        Some("rad")
    );
    let sigma = batch
        .column_by_name("sigma")
        .unwrap()
        .as_any()
        .downcast_ref::<Float64Array>()
        .unwrap();
    assert_eq!(sigma.len(), 9);
    assert_eq!(sigma.value(0), 0.0);
    assert!((sigma.value(4) - 0.1f64.to_radians()).abs() < 1e-15);
}

#[test]
fn test_top_hat_selector_column_is_rewritten_to_tophatwidth() {
    let selectors: Vec<OrderSelector> = [0.2, 0.5]
        .iter()
        .map(|&deg| OrderSelector::top_hat(Quantity::new(deg, Unit::Degree)).unwrap())
        .collect();
    let perturbations = vary_order_selector(&selectors).unwrap();
    // zero-width baseline comes first
    assert_eq!(perturbations.len(), 3);

    let config = InstrumentConfig::lynx();
    let split = pipelines::tolerancing().split_at(pipelines::GRATINGS).unwrap();
    let outcome = run_for_energies(
        &inputs(Adjustment::VaryAttribute, perturbations, Reset::Baseline),
        &config,
        &split,
        &analyzer(&config),
        false,
    )
    .unwrap();

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("CAT_blaze_tophat.parquet");
    write_table(&outcome.table, &path).unwrap();

    let (batch, key_values) = read_parquet(&path);
    let schema = batch.schema();
    assert!(schema.field_with_name("order_selector").is_err());
    assert!(schema.field_with_name("sigma").is_err());
    assert!(key_values.contains(&("unit:tophatwidth".to_string(), Some("rad".to_string()))));
    let width = batch
        .column_by_name("tophatwidth")
        .unwrap()
        .as_any()
        .downcast_ref::<Float64Array>()
        .unwrap();
    assert_eq!(width.len(), WAVES.len() * 3);
    assert_eq!(width.null_count(), 0);
    assert_eq!(width.value(0), 0.0);
    assert!((width.value(2) - 0.5f64.to_radians()).abs() < 1e-15);
}

#[test]
fn test_heterogeneous_columns_are_nullable() {
    let row = |wave: f64| {
        MeasurementRecord::new()
            .with("energy", Quantity::angstrom(wave).to(Unit::Kev).unwrap())
            .with("wave", Quantity::angstrom(wave))
    };
    let table: ResultTable = vec![
        row(15.0).with("run", 0_i64).with("aeff", vec![1.0, 2.0]),
        row(25.0).with("jitter", Quantity::arcsec(0.5)),
    ]
    .into_iter()
    .collect();

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("mixed.parquet");
    write_table(&table, &path).unwrap();

    let (batch, _) = read_parquet(&path);
    let run = batch
        .column_by_name("run")
        .unwrap()
        .as_any()
        .downcast_ref::<Int64Array>()
        .unwrap();
    assert_eq!(run.value(0), 0);
    assert!(run.is_null(1));
    assert!(batch.column_by_name("aeff").unwrap().is_null(1));
    assert!(batch.column_by_name("jitter").unwrap().is_null(0));
    assert!(batch.schema().field_with_name("jitter").unwrap().is_nullable());
}

#[test]
fn test_missing_site_config_is_fatal() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("site.toml");
    assert!(matches!(
        SiteConfig::load(Some(&missing)),
        Err(ConfigError::NotFound { .. })
    ));

    let output = Command::new(env!("CARGO_BIN_EXE_tolerances"))
        .args(["default", "10", "--config"])
        .arg(&missing)
        .output()
        .expect("binary should start");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no site configuration found"), "{stderr}");
    assert!(!dir.path().join("tolerances").exists());
}

#[test]
fn test_cli_writes_into_site_directory() {
    let dir = TempDir::new().unwrap();
    let site = dir.path().join("site.toml");
    std::fs::write(&site, "[paths]\ntolerances = \"out\"\n").unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_tolerances"))
        .args(["default", "200", "--only", "jitter", "--format", "csv", "--config"])
        .arg(&site)
        .output()
        .expect("binary should start");
    assert!(
        output.status.success(),
        "{}",
        String::from_utf8_lossy(&output.stderr)
    );

    let contents = std::fs::read_to_string(dir.path().join("out").join("jitter.csv")).unwrap();
    let header = contents.lines().next().unwrap();
    assert!(header.split(',').any(|c| c == "jitter"));
    // header plus 3 energies x 8 jitter values
    assert_eq!(contents.lines().count(), 1 + 3 * 8);
}
