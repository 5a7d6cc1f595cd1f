//! Ordered simulation pipelines and pipeline splitting.
//!
//! Each stage keeps the index it had in the full pipeline and its random
//! stream is derived from that index, so running `prefix`, `target` and
//! `suffix` one after another gives exactly the same photons as running
//! the whole pipeline.

use std::sync::Arc;

use crate::error::SimError;
use crate::instrument::{ElementRef, InstrumentConfig};
use crate::perturb::{Adjustment, Perturbation, Reset};
use crate::photons::EventBatch;
use crate::random::stream_rng;
use crate::stages::{
    filter_no_detector, ApertureStage, DetectorStage, GratingStage, MicrocalStage, MirrorStage,
    PointingStage, Stage,
};

/// A stage together with its position in the original pipeline.
#[derive(Debug, Clone)]
pub struct PipelineStage {
    pub index: usize,
    pub stage: Arc<dyn Stage>,
}

impl PipelineStage {
    pub fn run(
        &self,
        config: &InstrumentConfig,
        batch: EventBatch,
    ) -> Result<EventBatch, SimError> {
        let mut rng = stream_rng(batch.seed, self.index as u64);
        self.stage.process(config, batch, &mut rng)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    stages: Vec<PipelineStage>,
}

impl Pipeline {
    pub fn new(stages: Vec<Arc<dyn Stage>>) -> Self {
        let stages = stages
            .into_iter()
            .enumerate()
            .map(|(index, stage)| PipelineStage { index, stage })
            .collect();
        Self { stages }
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn stages(&self) -> &[PipelineStage] {
        &self.stages
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.stage.name()).collect()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.stages.iter().position(|s| s.stage.name() == name)
    }

    pub fn run(
        &self,
        config: &InstrumentConfig,
        batch: EventBatch,
    ) -> Result<EventBatch, SimError> {
        if batch.is_empty() {
            return Err(SimError::EmptyBatch);
        }
        self.stages.iter().try_fold(batch, |batch, stage| {
            log::trace!("running stage {} ({})", stage.index, stage.stage.name());
            stage.run(config, batch)
        })
    }

    /// Split around the stage at `index`.
    pub fn split(&self, index: usize) -> Result<SplitPipeline, SimError> {
        let target = self.stages.get(index).cloned().ok_or_else(|| {
            SimError::InvalidSplit(format!(
                "target index {index} is out of range for a pipeline of {} stages",
                self.len()
            ))
        })?;
        let element = target.stage.element().ok_or_else(|| {
            SimError::InvalidSplit(format!(
                "stage `{}` has no configurable element to perturb",
                target.stage.name()
            ))
        })?;
        Ok(SplitPipeline {
            prefix: Pipeline {
                stages: self.stages[..index].to_vec(),
            },
            target: TargetStage { stage: target, element },
            suffix: Pipeline {
                stages: self.stages[index + 1..].to_vec(),
            },
        })
    }

    /// Split around the first stage called `name`.
    pub fn split_at(&self, name: &str) -> Result<SplitPipeline, SimError> {
        let index = self
            .position(name)
            .ok_or_else(|| SimError::InvalidSplit(format!("no stage named `{name}`")))?;
        self.split(index)
    }
}

/// The perturbed stage of a split pipeline.
#[derive(Debug, Clone)]
pub struct TargetStage {
    stage: PipelineStage,
    element: ElementRef,
}

impl TargetStage {
    pub fn element(&self) -> ElementRef {
        self.element
    }

    pub fn name(&self) -> &str {
        self.stage.stage.name()
    }

    pub fn run(
        &self,
        config: &InstrumentConfig,
        batch: EventBatch,
    ) -> Result<EventBatch, SimError> {
        self.stage.run(config, batch)
    }

    /// Snapshot of `baseline` with `perturbation` applied to this stage's element.
    pub fn apply(
        &self,
        baseline: &InstrumentConfig,
        adjustment: Adjustment,
        perturbation: &Perturbation,
    ) -> Result<InstrumentConfig, SimError> {
        adjustment.apply(baseline, self.element, perturbation)
    }

    /// Snapshot this stage returns to after a round of perturbations.
    pub fn reset(
        &self,
        baseline: &InstrumentConfig,
        adjustment: Adjustment,
        reset: &Reset,
    ) -> Result<InstrumentConfig, SimError> {
        reset.resolve(baseline, self.element, adjustment)
    }
}

/// A pipeline cut into `prefix`, `target` and `suffix`.
#[derive(Debug, Clone)]
pub struct SplitPipeline {
    pub prefix: Pipeline,
    pub target: TargetStage,
    pub suffix: Pipeline,
}

impl SplitPipeline {
    pub fn run_prefix(
        &self,
        config: &InstrumentConfig,
        batch: EventBatch,
    ) -> Result<EventBatch, SimError> {
        if batch.is_empty() {
            return Err(SimError::EmptyBatch);
        }
        self.prefix.run(config, batch)
    }

    /// Run target then suffix on an already prefixed batch.
    pub fn run_rest(
        &self,
        config: &InstrumentConfig,
        batch: EventBatch,
    ) -> Result<EventBatch, SimError> {
        let batch = self.target.run(config, batch)?;
        if self.suffix.is_empty() {
            return Ok(batch);
        }
        self.suffix.run(config, batch)
    }

    /// Equivalent to running the unsplit pipeline.
    pub fn run(
        &self,
        config: &InstrumentConfig,
        batch: EventBatch,
    ) -> Result<EventBatch, SimError> {
        let batch = self.run_prefix(config, batch)?;
        self.run_rest(config, batch)
    }
}

/// Named pipeline constructors.
pub mod pipelines {
    use super::*;

    pub const POINTING: &str = "pointing";
    pub const APERTURE: &str = "aperture";
    pub const MIRROR: &str = "mirror";
    pub const GRATINGS: &str = "gratings";
    pub const DETECTOR: &str = "detector";
    pub const MICROCAL: &str = "microcal";

    /// Pointing, aperture, mirror, gratings, CCD strip, microcalorimeter.
    pub fn standard() -> Pipeline {
        Pipeline::new(vec![
            Arc::new(PointingStage),
            Arc::new(ApertureStage),
            Arc::new(MirrorStage),
            Arc::new(GratingStage),
            Arc::new(DetectorStage),
            Arc::new(MicrocalStage),
        ])
    }

    /// The standard pipeline followed by a filter that zeroes photons
    /// missing every detector.
    pub fn tolerancing() -> Pipeline {
        let mut stages: Vec<Arc<dyn Stage>> = standard()
            .stages
            .into_iter()
            .map(|s| s.stage)
            .collect();
        stages.push(Arc::new(filter_no_detector()));
        Pipeline::new(stages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::PointSource;
    use crate::stages::FnStage;
    use crate::units::Quantity;

    fn photons() -> EventBatch {
        PointSource::on_axis(Quantity::angstrom(25.0))
            .unwrap()
            .generate_photons(300, 11)
    }

    #[test]
    fn test_split_preserves_order_and_indices() {
        let pipeline = pipelines::tolerancing();
        let split = pipeline.split_at(pipelines::GRATINGS).unwrap();
        assert_eq!(split.prefix.stage_names(), vec!["pointing", "aperture", "mirror"]);
        assert_eq!(split.target.name(), "gratings");
        assert_eq!(
            split.suffix.stage_names(),
            vec!["detector", "microcal", "filter_no_detector"]
        );
        assert_eq!(split.suffix.stages()[0].index, 4);
    }

    #[test]
    fn test_split_at_first_stage_has_identity_prefix() {
        let pipeline = pipelines::tolerancing();
        let split = pipeline.split(0).unwrap();
        assert!(split.prefix.is_empty());
        let config = InstrumentConfig::lynx();
        let batch = photons();
        assert_eq!(split.run_prefix(&config, batch.clone()).unwrap(), batch);
    }

    #[test]
    fn test_split_at_last_stage_has_identity_suffix() {
        let pipeline = pipelines::standard();
        let split = pipeline.split(pipeline.len() - 1).unwrap();
        assert!(split.suffix.is_empty());
        let config = InstrumentConfig::lynx();
        assert_eq!(
            split.run(&config, photons()).unwrap(),
            pipeline.run(&config, photons()).unwrap()
        );
    }

    #[test]
    fn test_split_rejects_out_of_range_and_elementless_stages() {
        let pipeline = pipelines::tolerancing();
        assert!(matches!(
            pipeline.split(pipeline.len()),
            Err(SimError::InvalidSplit(_))
        ));
        assert!(matches!(
            pipeline.split_at("filter_no_detector"),
            Err(SimError::InvalidSplit(_))
        ));
        assert!(pipeline.split_at("nope").is_err());
    }

    #[test]
    fn test_empty_batch_is_rejected() {
        let config = InstrumentConfig::lynx();
        let pipeline = pipelines::standard();
        let empty = EventBatch::new(0, Vec::new());
        assert!(matches!(pipeline.run(&config, empty), Err(SimError::EmptyBatch)));
    }

    #[test]
    fn test_stage_errors_propagate() {
        let config = InstrumentConfig::lynx();
        let failing = Pipeline::new(vec![
            Arc::new(FnStage::identity()),
            Arc::new(FnStage::new("boom", |_| {
                Err(SimError::Stage {
                    stage: "boom".into(),
                    reason: "engine failure".into(),
                })
            })),
        ]);
        assert!(matches!(
            failing.run(&config, photons()),
            Err(SimError::Stage { .. })
        ));
    }
}
