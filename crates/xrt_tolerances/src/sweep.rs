//! The sweep driver: every perturbation at every energy.
//!
//! For each energy the source batch is generated and pushed through the
//! pipeline prefix once. Each perturbation then gets its own snapshot of the
//! instrument and a clone of the cached batch, so the perturbations of one
//! energy all see the same incoming photons.

use indicatif::{ProgressBar, ProgressStyle};
use xrt_core::{
    Adjustment, InstrumentConfig, Perturbation, PointSource, Quantity, Reset, SplitPipeline, Unit,
};

use crate::analysis::Analyzer;
use crate::error::ToleranceError;
use crate::record::{MeasurementRecord, ResultTable};

/// Everything one sweep needs apart from the pipeline and analyzer.
#[derive(Debug, Clone)]
pub struct SweepInputs {
    pub source: PointSource,
    /// Energies or wavelengths; both are accepted.
    pub energies: Vec<Quantity>,
    pub n_photons: usize,
    pub seed: u64,
    pub adjustment: Adjustment,
    pub perturbations: Vec<Perturbation>,
    pub reset: Reset,
}

/// Result of a sweep together with the snapshot the target was left in.
#[derive(Debug, Clone)]
pub struct SweepOutcome {
    pub table: ResultTable,
    pub final_config: InstrumentConfig,
}

/// Seed of the source batch for the `index`-th energy.
pub fn energy_seed(seed: u64, index: usize) -> u64 {
    seed.wrapping_add(index as u64)
}

/// Run every perturbation at every energy.
///
/// Rows come out energy-major, perturbation-minor. Each row holds the
/// analyzer's metrics, the perturbation values, and `energy` (keV) and
/// `wave` (Å). Any failure aborts the whole sweep.
pub fn run_for_energies(
    inputs: &SweepInputs,
    baseline: &InstrumentConfig,
    split: &SplitPipeline,
    analyzer: &dyn Analyzer,
    show_progress: bool,
) -> Result<SweepOutcome, ToleranceError> {
    if inputs.n_photons == 0 {
        return Err(ToleranceError::InvalidInput(
            "number of photons must be positive".to_string(),
        ));
    }
    let adjustment = inputs.adjustment;
    // Validates the reset descriptor before anything is simulated.
    let reset_config = split.target.reset(baseline, adjustment, &inputs.reset)?;
    let snapshots = inputs
        .perturbations
        .iter()
        .map(|p| split.target.apply(baseline, adjustment, p))
        .collect::<Result<Vec<_>, _>>()?;
    let energies = inputs
        .energies
        .iter()
        .map(|e| -> Result<(Quantity, Quantity), ToleranceError> {
            Ok((e.to(Unit::Kev)?, e.to(Unit::Angstrom)?))
        })
        .collect::<Result<Vec<_>, _>>()?;

    log::info!(
        "Sweeping {} perturbations of `{}` at {} energies with {} photons each",
        snapshots.len(),
        split.target.name(),
        energies.len(),
        inputs.n_photons
    );

    let total = energies.len() * snapshots.len();
    let pb = if show_progress && total > 0 {
        let bar = ProgressBar::new(total as u64);
        if let Ok(style) = ProgressStyle::default_bar().template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
        ) {
            bar.set_style(style.progress_chars("#>-"));
        }
        Some(bar)
    } else {
        None
    };

    let mut table = ResultTable::new();
    let mut active = reset_config.clone();
    for (i, (energy, wave)) in energies.iter().enumerate() {
        let source = inputs.source.with_energy(*energy)?;
        let photons = source.generate_photons(inputs.n_photons, energy_seed(inputs.seed, i));
        let prefixed = split.run_prefix(baseline, photons)?;

        for (perturbation, snapshot) in inputs.perturbations.iter().zip(&snapshots) {
            active = snapshot.clone();
            log::debug!("energy {energy}: {perturbation:?}");
            let traced = split.run_rest(&active, prefixed.clone())?;
            let mut record: MeasurementRecord = analyzer.analyze(&traced)?;
            record.merge_perturbation(perturbation);
            record.insert("energy", *energy);
            record.insert("wave", *wave);
            table.push(record);
            if let Some(ref bar) = pb {
                bar.inc(1);
            }
        }

        active = reset_config.clone();
    }

    if let Some(ref bar) = pb {
        bar.finish_with_message("Completed");
    }
    log::info!("Sweep of `{}` produced {} rows", split.target.name(), table.len());

    Ok(SweepOutcome {
        table,
        final_config: active,
    })
}
