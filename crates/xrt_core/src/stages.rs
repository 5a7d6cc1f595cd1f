//! Optical elements as pipeline stages.
//!
//! A stage turns one [`EventBatch`] into another. Stages read their
//! parameters from the configuration snapshot passed to [`Stage::process`]
//! and draw randomness only from the RNG they are handed, which the
//! pipeline derives from the batch seed and the stage's position.

use std::fmt;

use rand::rngs::StdRng;

use crate::error::SimError;
use crate::instrument::{ElementRef, InstrumentConfig};
use crate::photons::EventBatch;

#[path = "stages/detector.rs"]
mod detector;
#[path = "stages/gratings.rs"]
mod gratings;
#[path = "stages/optics.rs"]
mod optics;

pub use detector::{filter_no_detector, DetectorStage, MicrocalStage};
pub use gratings::GratingStage;
pub use optics::{ApertureStage, MirrorStage, PointingStage};

/// One step of the simulation pipeline.
pub trait Stage: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// The configurable element this stage simulates, if any. Only stages
    /// with an element can be the target of a perturbation.
    fn element(&self) -> Option<ElementRef> {
        None
    }

    fn process(
        &self,
        config: &InstrumentConfig,
        batch: EventBatch,
        rng: &mut StdRng,
    ) -> Result<EventBatch, SimError>;
}

type BatchFn = dyn Fn(EventBatch) -> Result<EventBatch, SimError> + Send + Sync;

/// Wraps a plain function as a stage without configuration or randomness.
pub struct FnStage {
    name: String,
    func: Box<BatchFn>,
}

impl FnStage {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(EventBatch) -> Result<EventBatch, SimError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Box::new(func),
        }
    }

    /// A stage that returns its input unchanged.
    pub fn identity() -> Self {
        Self::new("identity", Ok)
    }
}

impl fmt::Debug for FnStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnStage").field("name", &self.name).finish()
    }
}

impl Stage for FnStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn process(
        &self,
        _config: &InstrumentConfig,
        batch: EventBatch,
        _rng: &mut StdRng,
    ) -> Result<EventBatch, SimError> {
        (self.func)(batch)
    }
}
