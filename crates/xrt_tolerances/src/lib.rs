//! Tolerancing harness for the grating spectrometer.
//!
//! Each sweep perturbs one element of the instrument over a list of
//! magnitudes, re-traces photons at several energies, and records effective
//! area and resolving power for every (energy, perturbation) pair.
//!
//! # Quick Start
//!
//! ```no_run
//! use xrt_core::pipeline::pipelines;
//! use xrt_core::{Adjustment, InstrumentConfig, PointSource, Quantity, Reset};
//! use xrt_tolerances::{
//!     generate_6d_wigglelist, run_for_energies, write_table, CaptureResAeff, SweepInputs,
//! };
//!
//! let config = InstrumentConfig::lynx();
//! let (global, _individual) = generate_6d_wigglelist(
//!     &[Quantity::mm(0.0), Quantity::mm(1.0)],
//!     &[Quantity::arcmin(0.0), Quantity::arcmin(10.0)],
//! )?;
//! let inputs = SweepInputs {
//!     source: PointSource::on_axis(Quantity::angstrom(25.0))?,
//!     energies: vec![Quantity::angstrom(15.0), Quantity::angstrom(25.0)],
//!     n_photons: 10_000,
//!     seed: 0,
//!     adjustment: Adjustment::MoveGlobal,
//!     perturbations: global,
//!     reset: Reset::zero_6d(),
//! };
//! let split = pipelines::tolerancing().split_at(pipelines::DETECTOR)?;
//! let analyzer = CaptureResAeff::new(config.geometric_area(), "proj_x", -12..=4)?;
//! let outcome = run_for_energies(&inputs, &config, &split, &analyzer, true)?;
//! write_table(&outcome.table, "XGSdetector_global.parquet")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Architecture
//!
//! - [`perturbations`]: perturbation lists (six-DOF, attribute, paired, selector)
//! - [`sweep`]: the energy × perturbation driver
//! - [`analysis`]: effective area and resolving power
//! - [`record`]: tagged measurement records and result tables
//! - [`export`]: Parquet/CSV/JSON writers
//! - [`site`]: `site.toml` output path lookup
//! - [`scenarios`]: the standard battery of sweeps
//! - [`budget`]: repeated alignment budget trials

pub mod analysis;
pub mod budget;
pub mod error;
pub mod export;
pub mod perturbations;
pub mod record;
pub mod scenarios;
pub mod site;
pub mod sweep;

pub use analysis::{Analyzer, CaptureResAeff};
pub use budget::{run_baseline_budget, BudgetInputs};
pub use error::ToleranceError;
pub use export::{write_table, write_table_as, OutputFormat};
pub use perturbations::{generate_6d_wigglelist, paired_sweep, vary_attribute, vary_order_selector};
pub use record::{MeasurementRecord, MetricValue, ResultTable};
pub use scenarios::{Battery, BatteryOptions, Category, Scenario};
pub use site::{ConfigError, SiteConfig};
pub use sweep::{run_for_energies, SweepInputs, SweepOutcome};
