//! The standard battery of tolerancing sweeps.
//!
//! A [`Battery`] holds the instrument for one scenario and knows how to run
//! each [`Category`] of sweep and where to write its table.

use std::path::{Path, PathBuf};

use xrt_core::instrument::{Pointing, MAX_ORDER, MIN_ORDER};
use xrt_core::pipeline::pipelines;
use xrt_core::{
    Adjustment, InstrumentConfig, OrderSelector, ParamValue, Perturbation, PointSource, Quantity,
    Reset, Unit,
};

use crate::analysis::CaptureResAeff;
use crate::budget::{run_baseline_budget, BudgetInputs};
use crate::error::ToleranceError;
use crate::export::{write_table_as, OutputFormat};
use crate::perturbations::{
    generate_6d_wigglelist, paired_sweep, vary_attribute, vary_order_selector,
};
use crate::record::ResultTable;
use crate::site::SiteConfig;
use crate::sweep::{run_for_energies, SweepInputs};

/// Observed wavelengths (Å).
pub const WAVELENGTHS: [f64; 3] = [15.0, 25.0, 37.0];
/// Translation steps (mm).
pub const TRANSLATION_STEPS: [f64; 9] = [0.0, 0.1, 0.2, 0.4, 0.7, 1.0, 2.0, 5.0, 10.0];
/// Rotation steps (arcmin).
pub const ROTATION_STEPS: [f64; 9] = [0.0, 2.0, 5.0, 10.0, 20.0, 40.0, 60.0, 120.0, 180.0];
/// Pointing jitter (arcsec).
pub const JITTER_STEPS: [f64; 8] = [0.0, 0.1, 0.2, 0.5, 1.0, 1.5, 2.0, 5.0];
/// Mirror scatter (arcsec).
pub const SCATTER_STEPS: [f64; 6] = [0.0, 0.1, 0.2, 0.5, 1.0, 3.0];
/// Gaussian blaze-angle spread of the facets (degrees).
pub const BLAZE_SIGMA_STEPS: [f64; 6] = [0.0, 0.05, 0.1, 0.2, 0.5, 1.0];
/// Height of the grating assembly hinge above the optical axis (mm).
pub const HINGE_Y: f64 = 1500.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    Default,
    Chirp,
}

impl Scenario {
    /// Site path name of the output directory.
    pub fn outdir(self) -> &'static str {
        match self {
            Scenario::Default => "tolerances",
            Scenario::Chirp => "tolerances_chirp",
        }
    }

    pub fn configuration(self) -> InstrumentConfig {
        match self {
            Scenario::Default => InstrumentConfig::lynx(),
            Scenario::Chirp => InstrumentConfig::lynx_chirp(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    CatGlobal,
    CatIndividual,
    CatBlaze,
    Jitter,
    Scatter,
    DetectorGlobal,
    DetectorIndividual,
    Budget,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::CatGlobal,
        Category::CatIndividual,
        Category::CatBlaze,
        Category::Jitter,
        Category::Scatter,
        Category::DetectorGlobal,
        Category::DetectorIndividual,
        Category::Budget,
    ];

    /// Output file name without extension.
    pub fn file_stem(self) -> &'static str {
        match self {
            Category::CatGlobal => "CAT_global",
            Category::CatIndividual => "CAT_individual",
            Category::CatBlaze => "CAT_blaze",
            Category::Jitter => "jitter",
            Category::Scatter => "scatter",
            Category::DetectorGlobal => "XGSdetector_global",
            Category::DetectorIndividual => "XGSdetector_individual",
            Category::Budget => "baseline_budget",
        }
    }
}

#[derive(Debug, Clone)]
pub struct BatteryOptions {
    pub n_photons: usize,
    pub seed: u64,
    pub budget_runs: usize,
    pub format: OutputFormat,
    pub show_progress: bool,
}

impl Default for BatteryOptions {
    fn default() -> Self {
        Self {
            n_photons: 100_000,
            seed: 0,
            budget_runs: 100,
            format: OutputFormat::Parquet,
            show_progress: true,
        }
    }
}

/// One sweep, ready to run.
#[derive(Debug, Clone)]
pub struct SweepPlan {
    pub stage: &'static str,
    pub baseline: InstrumentConfig,
    pub inputs: SweepInputs,
}

pub struct Battery {
    scenario: Scenario,
    /// Scenario configuration with the grating hinge in place.
    instrument: InstrumentConfig,
    analyzer: CaptureResAeff,
    source: PointSource,
    options: BatteryOptions,
}

impl Battery {
    pub fn new(scenario: Scenario, options: BatteryOptions) -> Result<Self, ToleranceError> {
        let instrument = with_grating_hinge(scenario.configuration());
        let analyzer =
            CaptureResAeff::new(instrument.geometric_area(), "proj_x", MIN_ORDER..=MAX_ORDER)?;
        let source = PointSource::on_axis(Quantity::angstrom(WAVELENGTHS[0]))?;
        Ok(Self {
            scenario,
            instrument,
            analyzer,
            source,
            options,
        })
    }

    pub fn scenario(&self) -> Scenario {
        self.scenario
    }

    pub fn instrument(&self) -> &InstrumentConfig {
        &self.instrument
    }

    pub fn analyzer(&self) -> &CaptureResAeff {
        &self.analyzer
    }

    fn energies(&self) -> Vec<Quantity> {
        WAVELENGTHS.iter().map(|&w| Quantity::angstrom(w)).collect()
    }

    fn inputs(
        &self,
        adjustment: Adjustment,
        perturbations: Vec<Perturbation>,
        reset: Reset,
    ) -> SweepInputs {
        SweepInputs {
            source: self.source,
            energies: self.energies(),
            n_photons: self.options.n_photons,
            seed: self.options.seed,
            adjustment,
            perturbations,
            reset,
        }
    }

    /// The sweep behind `category`; `Budget` has no single sweep.
    pub fn plan(&self, category: Category) -> Result<SweepPlan, ToleranceError> {
        let translations: Vec<Quantity> =
            TRANSLATION_STEPS.iter().map(|&v| Quantity::mm(v)).collect();
        let rotations: Vec<Quantity> =
            ROTATION_STEPS.iter().map(|&v| Quantity::arcmin(v)).collect();
        let (changeglobal, changeindividual) = generate_6d_wigglelist(&translations, &rotations)?;

        let plan = match category {
            Category::CatGlobal => SweepPlan {
                stage: pipelines::GRATINGS,
                baseline: self.instrument.clone(),
                inputs: self.inputs(Adjustment::MoveGlobal, changeglobal, Reset::zero_6d()),
            },
            Category::CatIndividual => SweepPlan {
                stage: pipelines::GRATINGS,
                baseline: self.instrument.clone(),
                inputs: self.inputs(
                    Adjustment::Wiggle {
                        seed: self.options.seed,
                    },
                    changeindividual,
                    Reset::zero_6d(),
                ),
            },
            Category::CatBlaze => {
                let selectors = BLAZE_SIGMA_STEPS
                    .iter()
                    .map(|&deg| OrderSelector::gaussian(Quantity::new(deg, Unit::Degree)))
                    .collect::<Result<Vec<_>, _>>()?;
                SweepPlan {
                    stage: pipelines::GRATINGS,
                    baseline: self.instrument.clone(),
                    inputs: self.inputs(
                        Adjustment::VaryAttribute,
                        vary_order_selector(&selectors)?,
                        Reset::Baseline,
                    ),
                }
            }
            Category::Jitter => {
                let values: Vec<ParamValue> = JITTER_STEPS
                    .iter()
                    .map(|&v| Quantity::arcsec(v).into())
                    .collect();
                SweepPlan {
                    stage: pipelines::POINTING,
                    baseline: self
                        .instrument
                        .clone()
                        .with_pointing(Pointing::Jitter { jitter: 0.0 }),
                    inputs: self.inputs(
                        Adjustment::VaryAttribute,
                        vary_attribute("jitter", &values)?,
                        Reset::Baseline,
                    ),
                }
            }
            Category::Scatter => {
                let magnitudes: Vec<Quantity> =
                    SCATTER_STEPS.iter().map(|&v| Quantity::arcsec(v)).collect();
                SweepPlan {
                    stage: pipelines::MIRROR,
                    baseline: self.instrument.clone(),
                    inputs: self.inputs(
                        Adjustment::VaryAttribute,
                        paired_sweep("inplanescatter", "perpplanescatter", &magnitudes)?,
                        Reset::Baseline,
                    ),
                }
            }
            Category::DetectorGlobal => SweepPlan {
                stage: pipelines::DETECTOR,
                baseline: self.instrument.clone(),
                inputs: self.inputs(Adjustment::MoveGlobal, changeglobal, Reset::zero_6d()),
            },
            Category::DetectorIndividual => SweepPlan {
                stage: pipelines::DETECTOR,
                baseline: self.instrument.clone(),
                inputs: self.inputs(Adjustment::MoveIndividual, changeglobal, Reset::zero_6d()),
            },
            Category::Budget => {
                return Err(ToleranceError::InvalidInput(
                    "the alignment budget is a series of trials, not a sweep".to_string(),
                ))
            }
        };
        Ok(plan)
    }

    /// Run the sweep behind `category` and return its table.
    pub fn sweep(&self, category: Category) -> Result<ResultTable, ToleranceError> {
        let plan = self.plan(category)?;
        let split = pipelines::tolerancing().split_at(plan.stage)?;
        let outcome = run_for_energies(
            &plan.inputs,
            &plan.baseline,
            &split,
            &self.analyzer,
            self.options.show_progress,
        )?;
        Ok(outcome.table)
    }

    /// Run `category` and write its table into `outdir`.
    pub fn run_category(
        &self,
        category: Category,
        outdir: &Path,
    ) -> Result<PathBuf, ToleranceError> {
        let format = self.options.format;
        let path = outdir.join(format!("{}.{}", category.file_stem(), format.extension()));
        log::info!("Running {} for the {:?} scenario", category.file_stem(), self.scenario);
        match category {
            Category::Budget => {
                let inputs = BudgetInputs {
                    source: self.source,
                    energies: self.energies(),
                    n_photons: self.options.n_photons,
                    seed: self.options.seed,
                    runs: self.options.budget_runs,
                };
                // trials start from the scenario configuration, hinge included
                run_baseline_budget(
                    &inputs,
                    &self.instrument,
                    &pipelines::tolerancing(),
                    &self.analyzer,
                    Some((path.as_path(), format)),
                )?;
            }
            _ => {
                let table = self.sweep(category)?;
                write_table_as(&table, &path, format)?;
            }
        }
        Ok(path)
    }

    /// Run `categories` in order, writing into the scenario's site directory.
    pub fn run(
        &self,
        site: &SiteConfig,
        categories: &[Category],
    ) -> Result<Vec<PathBuf>, ToleranceError> {
        let outdir = site.get_path(self.scenario.outdir())?;
        categories
            .iter()
            .map(|&category| self.run_category(category, &outdir))
            .collect()
    }
}

/// Move the grating rotation center to the hinge: the facets' mean x and z,
/// [`HINGE_Y`] above the axis.
pub fn with_grating_hinge(mut config: InstrumentConfig) -> InstrumentConfig {
    let facets = &config.gratings.facets.elements;
    if facets.is_empty() {
        return config;
    }
    let n = facets.len() as f64;
    let mean_x = facets.iter().map(|f| f.center[0]).sum::<f64>() / n;
    let mean_z = facets.iter().map(|f| f.center[2]).sum::<f64>() / n;
    config.gratings.facets.move_center([mean_x, HINGE_Y, mean_z]);
    config
}
