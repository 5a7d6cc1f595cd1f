use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use xrt_tolerances::{Battery, BatteryOptions, Category, OutputFormat, Scenario, SiteConfig};

// ── CLI definition ─────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "tolerances",
    about = "Run the tolerancing sweeps of the grating spectrometer",
    long_about = "Perturbs one element of the instrument at a time, re-traces photons at\n\
                  15, 25 and 37 Å, and writes one result table per sweep into the\n\
                  directory that site.toml registers for the scenario."
)]
struct Cli {
    /// Instrument configuration to tolerance
    #[arg(value_enum)]
    scenario: ScenarioArg,
    /// Photons traced per energy and perturbation
    #[arg(default_value_t = 100_000)]
    n_photons: usize,
    /// Site configuration file (defaults to $XRT_SITE_CONFIG, ./site.toml, then the workspace root)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Number of alignment budget trials
    #[arg(long, default_value_t = 100)]
    budget_runs: usize,
    /// Seed for photon generation and misalignment draws
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Only run these sweeps (default: all of them)
    #[arg(long, value_enum, num_args = 1..)]
    only: Vec<CategoryArg>,
    /// Output table format
    #[arg(long, value_enum, default_value_t = FormatArg::Parquet)]
    format: FormatArg,
}

#[derive(Clone, Copy, ValueEnum)]
enum ScenarioArg {
    /// Constant grating period
    Default,
    /// Grating period chirped with distance to the focal plane
    Chirp,
}

#[derive(Clone, Copy, ValueEnum)]
enum CategoryArg {
    CatGlobal,
    CatIndividual,
    CatBlaze,
    Jitter,
    Scatter,
    DetectorGlobal,
    DetectorIndividual,
    Budget,
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Parquet,
    Csv,
}

impl From<ScenarioArg> for Scenario {
    fn from(arg: ScenarioArg) -> Self {
        match arg {
            ScenarioArg::Default => Scenario::Default,
            ScenarioArg::Chirp => Scenario::Chirp,
        }
    }
}

impl From<CategoryArg> for Category {
    fn from(arg: CategoryArg) -> Self {
        match arg {
            CategoryArg::CatGlobal => Category::CatGlobal,
            CategoryArg::CatIndividual => Category::CatIndividual,
            CategoryArg::CatBlaze => Category::CatBlaze,
            CategoryArg::Jitter => Category::Jitter,
            CategoryArg::Scatter => Category::Scatter,
            CategoryArg::DetectorGlobal => Category::DetectorGlobal,
            CategoryArg::DetectorIndividual => Category::DetectorIndividual,
            CategoryArg::Budget => Category::Budget,
        }
    }
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Parquet => OutputFormat::Parquet,
            FormatArg::Csv => OutputFormat::Csv,
        }
    }
}

// ── Entry point ────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    // fail on a missing site configuration before tracing anything
    let site = SiteConfig::load(cli.config.as_deref()).context("loading site configuration")?;
    log::info!("Using site configuration {}", site.source().display());

    let categories: Vec<Category> = if cli.only.is_empty() {
        Category::ALL.to_vec()
    } else {
        cli.only.iter().map(|&c| c.into()).collect()
    };

    let options = BatteryOptions {
        n_photons: cli.n_photons,
        seed: cli.seed,
        budget_runs: cli.budget_runs,
        format: cli.format.into(),
        show_progress: true,
    };
    let battery = Battery::new(cli.scenario.into(), options)?;
    let written = battery
        .run(&site, &categories)
        .with_context(|| format!("running the {:?} scenario", battery.scenario()))?;

    log::info!("Wrote {} tables", written.len());
    Ok(())
}
