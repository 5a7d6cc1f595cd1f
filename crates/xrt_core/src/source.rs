//! Monochromatic point source.

use crate::error::SimError;
use crate::photons::EventBatch;
use crate::units::{Quantity, Unit};

/// A point source at a fixed sky offset from the optical axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointSource {
    /// Off-axis angle along x and y (rad).
    pub offset: [f64; 2],
    /// Photon energy in keV.
    pub energy: f64,
}

impl PointSource {
    pub fn on_axis(energy: Quantity) -> Result<Self, SimError> {
        Self::new([0.0, 0.0], energy)
    }

    pub fn new(offset: [f64; 2], energy: Quantity) -> Result<Self, SimError> {
        let energy = energy.to(Unit::Kev)?.value;
        if !(energy.is_finite() && energy > 0.0) {
            return Err(SimError::InvalidValue {
                name: "energy".to_string(),
                reason: format!("{energy} keV is not a positive energy"),
            });
        }
        Ok(Self { offset, energy })
    }

    pub fn with_energy(mut self, energy: Quantity) -> Result<Self, SimError> {
        self.energy = Self::new(self.offset, energy)?.energy;
        Ok(self)
    }

    /// Emit `n` photons whose stage random streams derive from `seed`.
    pub fn generate_photons(&self, n: usize, seed: u64) -> EventBatch {
        let mut batch = EventBatch::new(seed, vec![self.energy; n]);
        batch.dir = vec![self.offset; n];
        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_photons() {
        let src = PointSource::on_axis(Quantity::angstrom(25.0)).unwrap();
        let batch = src.generate_photons(10, 4);
        assert_eq!(batch.len(), 10);
        assert_eq!(batch.seed, 4);
        assert!((batch.energy[0] - 0.4959).abs() < 1e-3);
    }

    #[test]
    fn test_rejects_non_energy() {
        assert!(PointSource::on_axis(Quantity::mm(1.0)).is_err());
        assert!(PointSource::on_axis(Quantity::kev(-1.0)).is_err());
    }
}
