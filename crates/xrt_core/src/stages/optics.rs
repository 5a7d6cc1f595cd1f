use rand::rngs::StdRng;
use rand::Rng;

use super::Stage;
use crate::error::SimError;
use crate::instrument::{ElementRef, InstrumentConfig, Pointing};
use crate::photons::EventBatch;
use crate::random::gaussian;

/// Applies pointing jitter to the incoming ray directions.
#[derive(Debug, Default)]
pub struct PointingStage;

impl Stage for PointingStage {
    fn name(&self) -> &str {
        "pointing"
    }

    fn element(&self) -> Option<ElementRef> {
        Some(ElementRef::Pointing)
    }

    fn process(
        &self,
        config: &InstrumentConfig,
        mut batch: EventBatch,
        rng: &mut StdRng,
    ) -> Result<EventBatch, SimError> {
        if let Pointing::Jitter { jitter } = config.pointing {
            for dir in &mut batch.dir {
                dir[0] += gaussian(rng, jitter);
                dir[1] += gaussian(rng, jitter);
            }
        }
        Ok(batch)
    }
}

/// Places photons uniformly on the annular entrance aperture.
#[derive(Debug, Default)]
pub struct ApertureStage;

impl Stage for ApertureStage {
    fn name(&self) -> &str {
        "aperture"
    }

    fn element(&self) -> Option<ElementRef> {
        Some(ElementRef::Aperture)
    }

    fn process(
        &self,
        config: &InstrumentConfig,
        mut batch: EventBatch,
        rng: &mut StdRng,
    ) -> Result<EventBatch, SimError> {
        let aperture = config.aperture;
        if aperture.r_outer <= aperture.r_inner {
            return Err(SimError::Stage {
                stage: self.name().to_string(),
                reason: format!(
                    "outer radius {} must exceed inner radius {}",
                    aperture.r_outer, aperture.r_inner
                ),
            });
        }
        let r2_in = aperture.r_inner.powi(2);
        let r2_out = aperture.r_outer.powi(2);
        let z = config.mirror.focal_length;
        for pos in &mut batch.pos {
            let r = (r2_in + rng.gen::<f64>() * (r2_out - r2_in)).sqrt();
            let phi = rng.gen::<f64>() * 2.0 * std::f64::consts::PI;
            *pos = [r * phi.cos(), r * phi.sin(), z];
        }
        Ok(batch)
    }
}

/// Focuses photons onto the focal plane at z = 0, with scatter in and
/// perpendicular to the plane of reflection.
#[derive(Debug, Default)]
pub struct MirrorStage;

impl Stage for MirrorStage {
    fn name(&self) -> &str {
        "mirror"
    }

    fn element(&self) -> Option<ElementRef> {
        Some(ElementRef::Mirror)
    }

    fn process(
        &self,
        config: &InstrumentConfig,
        mut batch: EventBatch,
        rng: &mut StdRng,
    ) -> Result<EventBatch, SimError> {
        let mirror = config.mirror;
        let f = mirror.focal_length;
        for row in 0..batch.len() {
            let p = batch.pos[row];
            if !p[0].is_finite() {
                return Err(SimError::Stage {
                    stage: self.name().to_string(),
                    reason: "photon has no aperture position; run the aperture stage first".into(),
                });
            }
            let phi = p[1].atan2(p[0]);
            let (sin_phi, cos_phi) = phi.sin_cos();
            let d_in = gaussian(rng, mirror.inplanescatter);
            let d_perp = gaussian(rng, mirror.perpplanescatter);
            let theta = batch.dir[row];
            let focus = [
                f * (theta[0] + d_in * cos_phi - d_perp * sin_phi),
                f * (theta[1] + d_in * sin_phi + d_perp * cos_phi),
            ];
            batch.dir[row] = [(p[0] - focus[0]) / p[2], (p[1] - focus[1]) / p[2]];
            batch.probability[row] *= mirror.reflectivity;
        }
        Ok(batch)
    }
}
