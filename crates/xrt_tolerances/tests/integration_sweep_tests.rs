mod support;

use support::{analyzer, detector_split, inputs, metrics, WAVES};
use xrt_core::pipeline::pipelines;
use xrt_core::{Adjustment, ElementRef, InstrumentConfig, Perturbation, Quantity, Reset};
use xrt_tolerances::sweep::energy_seed;
use xrt_tolerances::{run_for_energies, Analyzer, MetricValue, Scenario};

fn dx_list(values: &[f64]) -> Vec<Perturbation> {
    values
        .iter()
        .map(|&v| Perturbation::new().with("dx", Quantity::mm(v)))
        .collect()
}

#[test]
fn test_row_count_and_energy_major_order() {
    let config = InstrumentConfig::lynx();
    let perturbations = dx_list(&[0.0, 0.2, 1.0, 5.0]);
    let outcome = run_for_energies(
        &inputs(Adjustment::MoveGlobal, perturbations, Reset::zero_6d()),
        &config,
        &detector_split(),
        &analyzer(&config),
        false,
    )
    .unwrap();

    let rows = outcome.table.rows();
    assert_eq!(rows.len(), WAVES.len() * 4);
    for (i, row) in rows.iter().enumerate() {
        let Some(MetricValue::Quantity(wave)) = row.get("wave") else {
            panic!("row {i} has no wave");
        };
        assert!((wave.value - WAVES[i / 4]).abs() < 1e-9);
        let Some(MetricValue::Quantity(dx)) = row.get("dx") else {
            panic!("row {i} has no dx");
        };
        assert_eq!(dx.value, [0.0, 0.2, 1.0, 5.0][i % 4]);
    }
}

#[test]
fn test_zero_perturbation_matches_unperturbed_trace() {
    let config = InstrumentConfig::lynx();
    let sweep_inputs = inputs(Adjustment::MoveGlobal, dx_list(&[0.7, 0.0]), Reset::zero_6d());
    let analyzer = analyzer(&config);
    let outcome =
        run_for_energies(&sweep_inputs, &config, &detector_split(), &analyzer, false).unwrap();

    let pipeline = pipelines::tolerancing();
    for (i, &wave) in WAVES.iter().enumerate() {
        let photons = sweep_inputs
            .source
            .with_energy(Quantity::angstrom(wave))
            .unwrap()
            .generate_photons(sweep_inputs.n_photons, energy_seed(sweep_inputs.seed, i));
        let reference = analyzer.analyze(&pipeline.run(&config, photons).unwrap()).unwrap();
        let zero_row = &outcome.table.rows()[2 * i + 1];
        assert_eq!(metrics(zero_row), metrics(&reference));
        let moved_row = &outcome.table.rows()[2 * i];
        assert_ne!(metrics(moved_row), metrics(&reference));
    }
}

#[test]
fn test_sweep_is_idempotent() {
    let config = InstrumentConfig::lynx_chirp();
    let sweep_inputs = inputs(
        Adjustment::Wiggle { seed: 4 },
        dx_list(&[0.0, 0.5]),
        Reset::Baseline,
    );
    let split = pipelines::tolerancing().split_at(pipelines::GRATINGS).unwrap();
    let analyzer = analyzer(&config);
    let first = run_for_energies(&sweep_inputs, &config, &split, &analyzer, false).unwrap();
    let second = run_for_energies(&sweep_inputs, &config, &split, &analyzer, false).unwrap();
    assert_eq!(
        format!("{:?}", first.table),
        format!("{:?}", second.table)
    );
}

#[test]
fn test_target_returns_to_reset_state() {
    let config = InstrumentConfig::lynx();
    let split = detector_split();
    for (adjustment, reset) in [
        (Adjustment::MoveGlobal, Reset::zero_6d()),
        (Adjustment::MoveIndividual, Reset::zero_6d()),
        (Adjustment::MoveGlobal, Reset::Baseline),
    ] {
        let outcome = run_for_energies(
            &inputs(adjustment, dx_list(&[0.0, 2.0]), reset),
            &config,
            &split,
            &analyzer(&config),
            false,
        )
        .unwrap();
        assert_eq!(outcome.final_config, config);
        assert_eq!(outcome.final_config.detector, config.detector);
    }

    // an explicit non-zero reset is honoured, not silently replaced
    let reset_to = Perturbation::new().with("dx", Quantity::mm(0.5));
    let outcome = run_for_energies(
        &inputs(Adjustment::MoveGlobal, dx_list(&[0.0]), Reset::To(reset_to.clone())),
        &config,
        &split,
        &analyzer(&config),
        false,
    )
    .unwrap();
    let expected = Adjustment::MoveGlobal
        .apply(&config, ElementRef::Detector, &reset_to)
        .unwrap();
    assert_eq!(outcome.final_config, expected);
}

#[test]
fn test_stage_failure_aborts_the_sweep() {
    let mut config = InstrumentConfig::lynx();
    // aperture stage rejects an inverted annulus
    config.aperture.r_outer = config.aperture.r_inner;
    let err = run_for_energies(
        &inputs(Adjustment::MoveGlobal, dx_list(&[0.0, 1.0]), Reset::zero_6d()),
        &config,
        &detector_split(),
        &analyzer(&config),
        false,
    )
    .unwrap_err();
    assert!(matches!(err, xrt_tolerances::ToleranceError::Simulation(_)));
}

#[test]
fn test_chirp_scenario_measures_dispersed_orders() {
    let config = Scenario::Chirp.configuration();
    let mut sweep = inputs(Adjustment::MoveGlobal, dx_list(&[0.0]), Reset::zero_6d());
    sweep.n_photons = 3_000;
    let outcome =
        run_for_energies(&sweep, &config, &detector_split(), &analyzer(&config), false).unwrap();

    assert_eq!(outcome.table.len(), WAVES.len());
    for row in outcome.table.rows() {
        let aeffgrat = row.get("aeffgrat").and_then(MetricValue::as_f64).unwrap();
        let resolution = row.get("resolution").and_then(MetricValue::as_f64).unwrap();
        assert!(aeffgrat > 0.0, "no dispersed signal: {}", metrics(row));
        assert!(resolution.is_finite(), "no resolving power: {}", metrics(row));
    }
}
