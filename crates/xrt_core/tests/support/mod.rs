#![allow(dead_code)]

use xrt_core::{EventBatch, InstrumentConfig, PointSource, Quantity};

/// Scatter-free instrument so geometric checks are exact.
pub fn sharp_instrument() -> InstrumentConfig {
    let mut config = InstrumentConfig::lynx_chirp();
    config.mirror.inplanescatter = 0.0;
    config.mirror.perpplanescatter = 0.0;
    config
}

pub fn photons_at(wave_angstrom: f64, n: usize, seed: u64) -> EventBatch {
    PointSource::on_axis(Quantity::angstrom(wave_angstrom))
        .expect("wavelength should convert to energy")
        .generate_photons(n, seed)
}
