//! Perturbation descriptors and how they act on an element.
//!
//! A [`Perturbation`] is a list of named values. An [`Adjustment`] says how
//! those values are interpreted: as a rigid move of a whole assembly, as the
//! same move of every element, as per-element random misalignments, or as
//! plain attribute assignments. Applying always starts from a snapshot and
//! returns a new one.

use serde::{Deserialize, Serialize};

use crate::error::SimError;
use crate::geometry::{Pose, DOF_NAMES};
use crate::instrument::{ElementRef, InstrumentConfig, OrderSelector};
use crate::units::Quantity;

/// A value assigned to a named attribute.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ParamValue {
    Scalar(f64),
    Quantity(Quantity),
    Selector(OrderSelector),
}

impl ParamValue {
    pub fn as_quantity(&self, name: &str) -> Result<Quantity, SimError> {
        match self {
            ParamValue::Quantity(q) => Ok(*q),
            _ => Err(SimError::invalid_value(name, "expected a quantity with a unit")),
        }
    }

    pub fn as_scalar(&self, name: &str) -> Result<f64, SimError> {
        match self {
            ParamValue::Scalar(v) => Ok(*v),
            _ => Err(SimError::invalid_value(name, "expected a plain number")),
        }
    }

    /// True for a zero scalar or quantity. Selectors are never zero.
    pub fn is_zero(&self) -> bool {
        match self {
            ParamValue::Scalar(v) => *v == 0.0,
            ParamValue::Quantity(q) => q.value == 0.0,
            ParamValue::Selector(_) => false,
        }
    }
}

impl From<Quantity> for ParamValue {
    fn from(q: Quantity) -> Self {
        ParamValue::Quantity(q)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Scalar(v)
    }
}

impl From<OrderSelector> for ParamValue {
    fn from(s: OrderSelector) -> Self {
        ParamValue::Selector(s)
    }
}

/// Ordered mapping from attribute name to value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Perturbation {
    values: Vec<(String, ParamValue)>,
}

impl Perturbation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert; replaces an existing value of the same name.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        let name = name.into();
        let value = value.into();
        match self.values.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.values.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.values.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// True when every value is zero, i.e. the descriptor is a baseline.
    pub fn is_baseline(&self) -> bool {
        self.values.iter().all(|(_, v)| v.is_zero())
    }

    /// Interpret the descriptor as a six-DOF pose.
    pub fn as_pose(&self) -> Result<Pose, SimError> {
        let mut quantities = Vec::with_capacity(self.values.len());
        for (name, value) in &self.values {
            if !DOF_NAMES.contains(&name.as_str()) {
                return Err(SimError::invalid_value(
                    name.clone(),
                    "not one of dx, dy, dz, rx, ry, rz",
                ));
            }
            quantities.push((name.as_str(), value.as_quantity(name)?));
        }
        Pose::from_quantities(quantities)
    }
}

/// How a descriptor acts on the target element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Adjustment {
    /// Rigid move of the whole assembly about its rotation center.
    MoveGlobal,
    /// The same move applied to every element about its own center.
    MoveIndividual,
    /// Independent Gaussian misalignment of each element; descriptor values
    /// are the per-DOF sigmas.
    Wiggle { seed: u64 },
    /// Assign the named attributes.
    VaryAttribute,
}

impl Adjustment {
    /// Apply `perturbation` to `element` of `config`, returning a new snapshot.
    pub fn apply(
        &self,
        config: &InstrumentConfig,
        element: ElementRef,
        perturbation: &Perturbation,
    ) -> Result<InstrumentConfig, SimError> {
        match self {
            Adjustment::MoveGlobal => {
                let pose = perturbation.as_pose()?;
                config.with_array(element, |array| array.move_global(&pose))
            }
            Adjustment::MoveIndividual => {
                let pose = perturbation.as_pose()?;
                config.with_array(element, |array| array.move_individual(&pose))
            }
            Adjustment::Wiggle { seed } => {
                let sigma = perturbation.as_pose()?;
                let seed = *seed;
                config.with_array(element, |array| array.wiggle(&sigma, seed))
            }
            Adjustment::VaryAttribute => {
                let mut out = config.clone();
                for (name, value) in perturbation.iter() {
                    out = out.with_attribute(element, name, value)?;
                }
                Ok(out)
            }
        }
    }
}

/// What the target returns to after each energy's perturbations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum Reset {
    /// The unperturbed snapshot.
    #[default]
    Baseline,
    /// The baseline with this descriptor applied.
    To(Perturbation),
}

impl Reset {
    /// Zero displacement on all six DOF.
    pub fn zero_6d() -> Self {
        let mut p = Perturbation::new();
        for name in DOF_NAMES {
            let q = if name.starts_with('r') {
                Quantity::rad(0.0)
            } else {
                Quantity::mm(0.0)
            };
            p.insert(name, q);
        }
        Reset::To(p)
    }

    /// The snapshot this reset produces.
    pub fn resolve(
        &self,
        baseline: &InstrumentConfig,
        element: ElementRef,
        adjustment: Adjustment,
    ) -> Result<InstrumentConfig, SimError> {
        match self {
            Reset::Baseline => Ok(baseline.clone()),
            Reset::To(perturbation) => adjustment.apply(baseline, element, perturbation),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dx(value: f64) -> Perturbation {
        Perturbation::new().with("dx", Quantity::mm(value))
    }

    #[test]
    fn test_insert_replaces_existing() {
        let p = dx(1.0).with("dx", Quantity::mm(2.0));
        assert_eq!(p.len(), 1);
        assert_eq!(p.get("dx"), Some(&ParamValue::Quantity(Quantity::mm(2.0))));
    }

    #[test]
    fn test_move_global_does_not_touch_baseline() {
        let conf = InstrumentConfig::lynx();
        let moved = Adjustment::MoveGlobal
            .apply(&conf, ElementRef::Gratings, &dx(1.0))
            .unwrap();
        assert_eq!(moved.gratings.facets.pose.dx, 1.0);
        assert_eq!(conf.gratings.facets.pose.dx, 0.0);
    }

    #[test]
    fn test_move_individual_moves_every_element() {
        let conf = InstrumentConfig::lynx();
        let moved = Adjustment::MoveIndividual
            .apply(&conf, ElementRef::Detector, &dx(0.3))
            .unwrap();
        assert!(moved.detector.elements.iter().all(|ccd| ccd.pose.dx == 0.3));
        assert!(moved.detector.pose.is_identity());
    }

    #[test]
    fn test_zero_wiggle_is_baseline() {
        let conf = InstrumentConfig::lynx();
        let zero = Reset::zero_6d();
        let Reset::To(p) = zero else { unreachable!() };
        let moved = Adjustment::Wiggle { seed: 3 }
            .apply(&conf, ElementRef::Gratings, &p)
            .unwrap();
        assert_eq!(moved, conf);
    }

    #[test]
    fn test_move_rejects_non_movable_element() {
        let conf = InstrumentConfig::lynx();
        let err = Adjustment::MoveGlobal
            .apply(&conf, ElementRef::Mirror, &dx(1.0))
            .unwrap_err();
        assert!(matches!(err, SimError::NotMovable(ElementRef::Mirror)));
    }

    #[test]
    fn test_move_rejects_unknown_dof() {
        let conf = InstrumentConfig::lynx();
        let p = Perturbation::new().with("dq", Quantity::mm(1.0));
        assert!(Adjustment::MoveGlobal
            .apply(&conf, ElementRef::Gratings, &p)
            .is_err());
    }

    #[test]
    fn test_vary_attribute_sets_paired_values() {
        let conf = InstrumentConfig::lynx();
        let p = Perturbation::new()
            .with("inplanescatter", Quantity::rad(1e-5))
            .with("perpplanescatter", Quantity::rad(0.0));
        let out = Adjustment::VaryAttribute
            .apply(&conf, ElementRef::Mirror, &p)
            .unwrap();
        assert_eq!(out.mirror.inplanescatter, 1e-5);
        assert_eq!(out.mirror.perpplanescatter, 0.0);
    }

    #[test]
    fn test_reset_validation_catches_bad_names() {
        let conf = InstrumentConfig::lynx();
        let reset = Reset::To(Perturbation::new().with("jitter", Quantity::arcsec(0.0)));
        assert!(reset
            .resolve(&conf, ElementRef::Gratings, Adjustment::MoveGlobal)
            .is_err());
        assert_eq!(
            Reset::zero_6d()
                .resolve(&conf, ElementRef::Gratings, Adjustment::MoveGlobal)
                .unwrap(),
            conf
        );
    }

    #[test]
    fn test_is_baseline() {
        assert!(dx(0.0).is_baseline());
        assert!(!dx(0.1).is_baseline());
        let sel =
            Perturbation::new().with("order_selector", OrderSelector::Gaussian { sigma: 0.0 });
        assert!(!sel.is_baseline());
    }
}
