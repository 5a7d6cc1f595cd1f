//! Columnar batch of simulated photons.
//!
//! Rows are never removed. Stages that "absorb" a photon set its
//! probability to zero, so every batch derived from one source batch stays
//! row-aligned with it.

use std::collections::BTreeMap;

use crate::error::SimError;

#[derive(Debug, Clone)]
pub struct EventBatch {
    /// Seed from which stage random streams are derived.
    pub seed: u64,
    /// Photon energy in keV.
    pub energy: Vec<f64>,
    pub probability: Vec<f64>,
    /// Diffraction order, 0 for undispersed photons.
    pub order: Vec<i32>,
    /// Index of the grating facet hit, -1 for none.
    pub facet: Vec<i64>,
    /// Current position (mm).
    pub pos: Vec<[f64; 3]>,
    /// Ray slopes `dx/dz`, `dy/dz` along the direction of travel towards -z.
    pub dir: Vec<[f64; 2]>,
    /// Derived per-photon values such as `proj_x` or `det_x`; NaN when unset.
    columns: BTreeMap<String, Vec<f64>>,
}

impl EventBatch {
    pub fn new(seed: u64, energy: Vec<f64>) -> Self {
        let n = energy.len();
        Self {
            seed,
            energy,
            probability: vec![1.0; n],
            order: vec![0; n],
            facet: vec![-1; n],
            pos: vec![[f64::NAN; 3]; n],
            dir: vec![[0.0; 2]; n],
            columns: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.energy.len()
    }

    pub fn is_empty(&self) -> bool {
        self.energy.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    /// Named column, created and filled with NaN if missing.
    pub fn column_mut(&mut self, name: &str) -> &mut Vec<f64> {
        let n = self.len();
        self.columns
            .entry(name.to_string())
            .or_insert_with(|| vec![f64::NAN; n])
    }

    pub fn set_column(&mut self, name: &str, values: Vec<f64>) -> Result<(), SimError> {
        if values.len() != self.len() {
            return Err(SimError::invalid_value(
                name,
                format!("column has {} rows, batch has {}", values.len(), self.len()),
            ));
        }
        self.columns.insert(name.to_string(), values);
        Ok(())
    }

    /// Sum of probabilities, the expected number of detected photons.
    pub fn total_weight(&self) -> f64 {
        self.probability.iter().sum()
    }

    /// Position at plane `z` along the current ray.
    pub fn position_at(&self, row: usize, z: f64) -> [f64; 3] {
        let p = self.pos[row];
        let s = self.dir[row];
        let dz = p[2] - z;
        [p[0] - s[0] * dz, p[1] - s[1] * dz, z]
    }
}

/// Two batches are equal when every value matches bit for bit, so unset
/// (NaN) cells compare equal to each other.
impl PartialEq for EventBatch {
    fn eq(&self, other: &Self) -> bool {
        self.seed == other.seed
            && self.order == other.order
            && self.facet == other.facet
            && same_bits(&self.energy, &other.energy)
            && same_bits(&self.probability, &other.probability)
            && same_bits(self.pos.as_flattened(), other.pos.as_flattened())
            && same_bits(self.dir.as_flattened(), other.dir.as_flattened())
            && self.columns.len() == other.columns.len()
            && self
                .columns
                .iter()
                .zip(&other.columns)
                .all(|((a, x), (b, y))| a == b && same_bits(x, y))
    }
}

fn same_bits(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
}
