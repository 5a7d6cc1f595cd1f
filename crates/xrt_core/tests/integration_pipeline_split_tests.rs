mod support;

use support::{photons_at, sharp_instrument};
use xrt_core::pipeline::pipelines;
use xrt_core::{Adjustment, ElementRef, InstrumentConfig, Perturbation, Quantity, Reset};

#[test]
fn split_pipeline_matches_full_pipeline_for_every_target() {
    let config = InstrumentConfig::lynx();
    let pipeline = pipelines::tolerancing();
    let expected = pipeline
        .run(&config, photons_at(25.0, 2_000, 17))
        .expect("full pipeline should run");

    let mut checked = 0;
    for index in 0..pipeline.len() {
        let Ok(split) = pipeline.split(index) else {
            // stages without a configurable element cannot be targets
            continue;
        };
        let got = split
            .run(&config, photons_at(25.0, 2_000, 17))
            .expect("split pipeline should run");
        assert_eq!(got, expected, "split at {index} diverged");
        checked += 1;
    }
    assert_eq!(checked, pipeline.len() - 1);
}

#[test]
fn rows_are_kept_through_the_whole_pipeline() {
    let config = InstrumentConfig::lynx();
    let batch = pipelines::tolerancing()
        .run(&config, photons_at(15.0, 1_500, 3))
        .expect("pipeline should run");
    assert_eq!(batch.len(), 1_500);
    assert!(batch.total_weight() < 1_500.0);
    assert!(batch.probability.iter().any(|&p| p > 0.0));

    let mut shrunk = config.clone();
    shrunk.microcal.half_width = 0.0;
    let filtered = pipelines::tolerancing()
        .run(&shrunk, photons_at(15.0, 1_500, 3))
        .expect("pipeline should run");
    assert_eq!(filtered.len(), 1_500);
    assert!(filtered.probability.iter().any(|&p| p == 0.0));
}

#[test]
fn dispersed_orders_reach_the_ccd_strip() {
    let config = sharp_instrument();
    let batch = pipelines::tolerancing()
        .run(&config, photons_at(25.0, 5_000, 8))
        .expect("pipeline should run");
    let det_x = batch.column("det_x").expect("detector column");
    let detected = (0..batch.len())
        .filter(|&row| batch.order[row] < 0 && det_x[row].is_finite())
        .count();
    assert!(detected > 0);
    let microcal_x = batch.column("microcal_x").expect("microcal column");
    assert!(microcal_x.iter().any(|x| x.is_finite()));
}

#[test]
fn zero_perturbation_leaves_the_photons_unchanged() {
    let config = InstrumentConfig::lynx();
    let split = pipelines::tolerancing()
        .split_at(pipelines::GRATINGS)
        .expect("gratings stage should exist");
    let Reset::To(zero) = Reset::zero_6d() else {
        unreachable!("zero_6d builds an explicit descriptor")
    };
    let prefixed = split
        .run_prefix(&config, photons_at(37.0, 1_000, 5))
        .expect("prefix should run");

    let baseline = split
        .run_rest(&config, prefixed.clone())
        .expect("baseline should run");
    for adjustment in [
        Adjustment::MoveGlobal,
        Adjustment::MoveIndividual,
        Adjustment::Wiggle { seed: 99 },
    ] {
        let perturbed = split
            .target
            .apply(&config, adjustment, &zero)
            .expect("zero perturbation should apply");
        assert_eq!(perturbed, config);
        let got = split
            .run_rest(&perturbed, prefixed.clone())
            .expect("perturbed run should succeed");
        assert_eq!(got, baseline);
    }
}

#[test]
fn moving_the_detector_changes_measured_positions() {
    let config = sharp_instrument();
    let split = pipelines::tolerancing()
        .split_at(pipelines::DETECTOR)
        .expect("detector stage should exist");
    let prefixed = split
        .run_prefix(&config, photons_at(25.0, 3_000, 21))
        .expect("prefix should run");
    let moved = split
        .target
        .apply(
            &config,
            Adjustment::MoveGlobal,
            &Perturbation::new().with("dx", Quantity::mm(1.0)),
        )
        .expect("detector should move");
    assert_eq!(split.target.element(), ElementRef::Detector);

    let nominal = split.run_rest(&config, prefixed.clone()).expect("nominal run");
    let shifted = split.run_rest(&moved, prefixed).expect("shifted run");
    let a = nominal.column("proj_x").expect("proj_x");
    let b = shifted.column("proj_x").expect("proj_x");
    let shifts: Vec<f64> = a
        .iter()
        .zip(b)
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .map(|(x, y)| y - x)
        .collect();
    assert!(!shifts.is_empty());
    assert!(shifts.iter().all(|s| (s + 1.0).abs() < 1e-6));
}
