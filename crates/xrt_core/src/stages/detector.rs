use rand::rngs::StdRng;

use super::{FnStage, Stage};
use crate::error::SimError;
use crate::instrument::{ElementRef, InstrumentConfig};
use crate::photons::EventBatch;

/// Records hits on the CCD strip.
///
/// Sets `det_x`/`det_y` (CCD-local coordinates), `ccd_id`, and `proj_x`,
/// the dispersion coordinate reconstructed from the nominal CCD position.
/// A misaligned CCD therefore shows up as an error in `proj_x`.
#[derive(Debug, Default)]
pub struct DetectorStage;

impl Stage for DetectorStage {
    fn name(&self) -> &str {
        "detector"
    }

    fn element(&self) -> Option<ElementRef> {
        Some(ElementRef::Detector)
    }

    fn process(
        &self,
        config: &InstrumentConfig,
        mut batch: EventBatch,
        _rng: &mut StdRng,
    ) -> Result<EventBatch, SimError> {
        let detector = &config.detector;
        let placements: Vec<_> = (0..detector.len()).map(|i| detector.placement(i)).collect();
        let n = batch.len();
        let mut det_x = vec![f64::NAN; n];
        let mut det_y = vec![f64::NAN; n];
        let mut proj_x = vec![f64::NAN; n];
        let mut ccd_id = vec![f64::NAN; n];

        for row in 0..n {
            if batch.probability[row] <= 0.0 {
                continue;
            }
            for (i, (ccd, placement)) in detector.elements.iter().zip(&placements).enumerate() {
                let c = placement.center;
                let flat = batch.position_at(row, c[2]);
                // tilted CCD surface
                let z = c[2] - placement.ry * (flat[0] - c[0]) + placement.rx * (flat[1] - c[1]);
                let q = batch.position_at(row, z);
                let (sin_rz, cos_rz) = placement.rz.sin_cos();
                let u = (q[0] - c[0]) * cos_rz + (q[1] - c[1]) * sin_rz;
                let v = -(q[0] - c[0]) * sin_rz + (q[1] - c[1]) * cos_rz;
                if u.abs() <= ccd.width / 2.0 && v.abs() <= ccd.height / 2.0 {
                    det_x[row] = u;
                    det_y[row] = v;
                    proj_x[row] = ccd.center[0] + u;
                    ccd_id[row] = i as f64;
                    batch.pos[row] = q;
                    break;
                }
            }
        }

        batch.set_column("det_x", det_x)?;
        batch.set_column("det_y", det_y)?;
        batch.set_column("proj_x", proj_x)?;
        batch.set_column("ccd_id", ccd_id)?;
        Ok(batch)
    }
}

/// Records zeroth-order hits on the microcalorimeter at the focus.
#[derive(Debug, Default)]
pub struct MicrocalStage;

impl Stage for MicrocalStage {
    fn name(&self) -> &str {
        "microcal"
    }

    fn element(&self) -> Option<ElementRef> {
        Some(ElementRef::Microcal)
    }

    fn process(
        &self,
        config: &InstrumentConfig,
        mut batch: EventBatch,
        _rng: &mut StdRng,
    ) -> Result<EventBatch, SimError> {
        let half = config.microcal.half_width;
        let n = batch.len();
        let mut microcal_x = vec![f64::NAN; n];
        let mut microcal_y = vec![f64::NAN; n];
        for row in 0..n {
            if batch.probability[row] <= 0.0 {
                continue;
            }
            let q = batch.position_at(row, 0.0);
            if q[0].abs() <= half && q[1].abs() <= half {
                microcal_x[row] = q[0];
                microcal_y[row] = q[1];
            }
        }
        batch.set_column("microcal_x", microcal_x)?;
        batch.set_column("microcal_y", microcal_y)?;
        Ok(batch)
    }
}

/// Zero the probability of photons that hit neither the CCDs nor the
/// microcalorimeter. Missing hit columns count as "not hit".
pub fn filter_no_detector() -> FnStage {
    FnStage::new("filter_no_detector", |mut batch: EventBatch| {
        let n = batch.len();
        let det_x = batch.column("det_x").map(<[f64]>::to_vec).unwrap_or_else(|| vec![f64::NAN; n]);
        let microcal_x = batch
            .column("microcal_x")
            .map(<[f64]>::to_vec)
            .unwrap_or_else(|| vec![f64::NAN; n]);
        for row in 0..n {
            if !(det_x[row].is_finite() || microcal_x[row].is_finite()) {
                batch.probability[row] = 0.0;
            }
        }
        Ok(batch)
    })
}
