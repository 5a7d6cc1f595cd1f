//! Simplified ray-trace model of an X-ray grating spectrometer.
//!
//! The tolerancing harness treats this crate as its simulation engine: it
//! only relies on [`stages::Stage`] (a batch-to-batch transform), on the
//! [`pipeline::Pipeline`] ordering, and on attribute access to the
//! [`instrument::InstrumentConfig`] snapshot.
//!
//! - [`units`]: unit-tagged quantities and spectral conversion
//! - [`geometry`]: six degree-of-freedom poses and rigid moves
//! - [`instrument`]: immutable instrument configuration snapshots
//! - [`photons`]: the columnar event batch
//! - [`source`]: point source photon generation
//! - [`stages`]: optical elements as pipeline stages
//! - [`pipeline`]: ordered pipelines, splitting, and builders
//! - [`perturb`]: perturbation descriptors and how they act on elements

pub mod error;
pub mod geometry;
pub mod instrument;
pub mod perturb;
pub mod photons;
pub mod pipeline;
pub mod random;
pub mod source;
pub mod stages;
pub mod units;

pub use error::SimError;
pub use instrument::{ElementRef, InstrumentConfig, OrderSelector};
pub use perturb::{Adjustment, ParamValue, Perturbation, Reset};
pub use photons::EventBatch;
pub use pipeline::{Pipeline, SplitPipeline};
pub use source::PointSource;
pub use units::{Quantity, Unit};
