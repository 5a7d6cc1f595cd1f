use crate::instrument::ElementRef;
use crate::units::Unit;

/// Errors raised by the simulation model.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error("element `{element}` has no attribute `{name}`")]
    UnknownAttribute { element: ElementRef, name: String },
    #[error("element `{0}` cannot be moved: it is not an element array")]
    NotMovable(ElementRef),
    #[error("invalid value for `{name}`: {reason}")]
    InvalidValue { name: String, reason: String },
    #[error("cannot convert {from} to {to}")]
    UnitMismatch { from: Unit, to: Unit },
    #[error("invalid pipeline split: {0}")]
    InvalidSplit(String),
    #[error("event batch is empty")]
    EmptyBatch,
    #[error("stage `{stage}` failed: {reason}")]
    Stage { stage: String, reason: String },
}

impl SimError {
    pub(crate) fn invalid_value(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
