use std::collections::HashMap;

use rand::rngs::StdRng;

use super::Stage;
use crate::error::SimError;
use crate::instrument::{ElementRef, GratingArray, InstrumentConfig, Placement};
use crate::photons::EventBatch;
use crate::units::kev_to_angstrom;

const ANGSTROM_IN_MM: f64 = 1.0e-7;
/// Slack added around each facet footprint when binning, to cover the
/// lateral walk of a ray between the reference plane and the facet plane.
const BIN_MARGIN: f64 = 10.0;

/// Diffracts photons that hit a grating facet.
#[derive(Debug, Default)]
pub struct GratingStage;

/// Coarse spatial bins over facet footprints.
struct FacetIndex {
    placements: Vec<Placement>,
    bins: HashMap<(i64, i64), Vec<usize>>,
    cell: f64,
    reference_z: f64,
}

impl FacetIndex {
    fn build(gratings: &GratingArray) -> Self {
        let placements: Vec<Placement> = (0..gratings.facets.len())
            .map(|i| gratings.facets.placement(i))
            .collect();
        let cell = 2.0 * (gratings.facet_half_size + BIN_MARGIN);
        let reference_z = if placements.is_empty() {
            0.0
        } else {
            placements.iter().map(|p| p.center[2]).sum::<f64>() / placements.len() as f64
        };
        let reach = gratings.facet_half_size + BIN_MARGIN;
        let mut bins: HashMap<(i64, i64), Vec<usize>> = HashMap::new();
        for (index, placement) in placements.iter().enumerate() {
            let c = placement.center;
            let (x0, x1) = (cell_of(c[0] - reach, cell), cell_of(c[0] + reach, cell));
            let (y0, y1) = (cell_of(c[1] - reach, cell), cell_of(c[1] + reach, cell));
            for ix in x0..=x1 {
                for iy in y0..=y1 {
                    bins.entry((ix, iy)).or_default().push(index);
                }
            }
        }
        Self {
            placements,
            bins,
            cell,
            reference_z,
        }
    }

    fn candidates(&self, x: f64, y: f64) -> &[usize] {
        self.bins
            .get(&(cell_of(x, self.cell), cell_of(y, self.cell)))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

fn cell_of(v: f64, cell: f64) -> i64 {
    (v / cell).floor() as i64
}

impl Stage for GratingStage {
    fn name(&self) -> &str {
        "gratings"
    }

    fn element(&self) -> Option<ElementRef> {
        Some(ElementRef::Gratings)
    }

    fn process(
        &self,
        config: &InstrumentConfig,
        mut batch: EventBatch,
        rng: &mut StdRng,
    ) -> Result<EventBatch, SimError> {
        let gratings = &config.gratings;
        let index = FacetIndex::build(gratings);
        let half = gratings.facet_half_size;

        for row in 0..batch.len() {
            if batch.probability[row] <= 0.0 {
                continue;
            }
            let reference = batch.position_at(row, index.reference_z);
            let hit = index
                .candidates(reference[0], reference[1])
                .iter()
                .copied()
                .find_map(|i| {
                    let placement = &index.placements[i];
                    let q = batch.position_at(row, placement.center[2]);
                    let inside = (q[0] - placement.center[0]).abs() <= half
                        && (q[1] - placement.center[1]).abs() <= half;
                    inside.then_some((i, q))
                });
            let Some((facet, q)) = hit else {
                continue;
            };
            let placement = index.placements[facet];
            let period = gratings.facets.elements[facet].period / placement.rx.cos();
            let wave_mm = kev_to_angstrom(batch.energy[row]) * ANGSTROM_IN_MM;
            let order =
                gratings
                    .order_selector
                    .select_order(rng, wave_mm, period, gratings.blaze + placement.ry);
            let theta = order as f64 * wave_mm / period;
            let (sin_rz, cos_rz) = placement.rz.sin_cos();

            batch.pos[row] = q;
            batch.facet[row] = facet as i64;
            batch.order[row] = order;
            batch.dir[row][0] -= theta * cos_rz;
            batch.dir[row][1] -= theta * sin_rz;
            batch.probability[row] *= gratings.efficiency;
        }
        Ok(batch)
    }
}
