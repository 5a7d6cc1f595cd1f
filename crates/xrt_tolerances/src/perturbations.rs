//! Perturbation lists for tolerancing sweeps.
//!
//! Every list starts with a zero baseline so that each result table carries
//! its own reference row.

use xrt_core::geometry::DOF_NAMES;
use xrt_core::units::Dimension;
use xrt_core::{OrderSelector, ParamValue, Perturbation, Quantity, Unit};

use crate::error::ToleranceError;

/// Attribute name used when sweeping blaze order selectors.
pub const ORDER_SELECTOR: &str = "order_selector";

/// Build the global and individual six-DOF perturbation lists.
///
/// The global list moves one degree of freedom at a time by `-s` and `+s`
/// for every non-zero step. The individual list moves all three translations
/// together by each translation step, then all three rotations together by
/// each rotation step. Both lists start with the all-zero baseline and every
/// entry names all six degrees of freedom.
pub fn generate_6d_wigglelist(
    translations: &[Quantity],
    rotations: &[Quantity],
) -> Result<(Vec<Perturbation>, Vec<Perturbation>), ToleranceError> {
    check_steps("translation", translations, Dimension::Length)?;
    check_steps("rotation", rotations, Dimension::Angle)?;

    let zero_t = Quantity::new(0.0, first_unit(translations, Unit::Millimeter));
    let zero_r = Quantity::new(0.0, first_unit(rotations, Unit::Arcmin));
    let baseline = pose_descriptor([zero_t, zero_t, zero_t, zero_r, zero_r, zero_r]);

    let mut global = vec![baseline.clone()];
    for (axis, name) in DOF_NAMES.iter().enumerate() {
        let steps = if axis < 3 { translations } else { rotations };
        for step in steps.iter().filter(|s| s.value != 0.0) {
            for sign in [-1.0, 1.0] {
                let mut p = baseline.clone();
                p.insert(*name, Quantity::new(sign * step.value, step.unit));
                global.push(p);
            }
        }
    }

    let mut individual = vec![baseline];
    for &t in translations.iter().filter(|t| t.value != 0.0) {
        individual.push(pose_descriptor([t, t, t, zero_r, zero_r, zero_r]));
    }
    for &r in rotations.iter().filter(|r| r.value != 0.0) {
        individual.push(pose_descriptor([zero_t, zero_t, zero_t, r, r, r]));
    }

    Ok((global, individual))
}

/// One descriptor per value of a single attribute.
///
/// A zero of the first value's kind is prepended when no value is zero.
pub fn vary_attribute(
    name: &str,
    values: &[ParamValue],
) -> Result<Vec<Perturbation>, ToleranceError> {
    let first = values
        .first()
        .ok_or_else(|| ToleranceError::InvalidInput(format!("no values given for `{name}`")))?;
    let mut out = Vec::with_capacity(values.len() + 1);
    if !values.iter().any(ParamValue::is_zero) {
        let zero = match first {
            ParamValue::Scalar(_) => ParamValue::Scalar(0.0),
            ParamValue::Quantity(q) => ParamValue::Quantity(Quantity::new(0.0, q.unit)),
            ParamValue::Selector(_) => {
                return Err(ToleranceError::InvalidInput(format!(
                    "`{name}` holds selector objects; use vary_order_selector"
                )))
            }
        };
        out.push(Perturbation::new().with(name, zero));
    }
    out.extend(values.iter().map(|v| Perturbation::new().with(name, *v)));
    Ok(out)
}

/// Vary two attributes one at a time over the same magnitudes.
///
/// Yields `(0, 0)`, then `(m, 0)` and finally `(0, m)` for every non-zero `m`.
pub fn paired_sweep(
    name_a: &str,
    name_b: &str,
    magnitudes: &[Quantity],
) -> Result<Vec<Perturbation>, ToleranceError> {
    let unit = magnitudes
        .first()
        .map(|m| m.unit)
        .ok_or_else(|| ToleranceError::InvalidInput("no magnitudes given".to_string()))?;
    for m in magnitudes {
        check_finite_non_negative(name_a, *m)?;
        if m.unit.dimension() != unit.dimension() {
            return Err(ToleranceError::InvalidInput(format!(
                "magnitude {m} does not match the unit {unit}"
            )));
        }
    }
    let zero = Quantity::new(0.0, unit);
    let pair = |a: Quantity, b: Quantity| Perturbation::new().with(name_a, a).with(name_b, b);

    let mut out = vec![pair(zero, zero)];
    let nonzero: Vec<Quantity> = magnitudes.iter().copied().filter(|m| m.value != 0.0).collect();
    out.extend(nonzero.iter().map(|&m| pair(m, zero)));
    out.extend(nonzero.iter().map(|&m| pair(zero, m)));
    Ok(out)
}

/// One descriptor per order selector, under [`ORDER_SELECTOR`].
///
/// A zero-width selector of the first selector's kind is prepended when no
/// selector has zero width.
pub fn vary_order_selector(
    selectors: &[OrderSelector],
) -> Result<Vec<Perturbation>, ToleranceError> {
    let first = selectors
        .first()
        .ok_or_else(|| ToleranceError::InvalidInput("no order selectors given".to_string()))?;
    let mut out = Vec::with_capacity(selectors.len() + 1);
    if !selectors.iter().any(|s| s.named_scalar().1.value == 0.0) {
        let zero = match first {
            OrderSelector::Gaussian { .. } => OrderSelector::Gaussian { sigma: 0.0 },
            OrderSelector::TopHat { .. } => OrderSelector::TopHat { tophatwidth: 0.0 },
        };
        out.push(Perturbation::new().with(ORDER_SELECTOR, zero));
    }
    out.extend(selectors.iter().map(|s| Perturbation::new().with(ORDER_SELECTOR, *s)));
    Ok(out)
}

fn pose_descriptor(values: [Quantity; 6]) -> Perturbation {
    DOF_NAMES
        .iter()
        .zip(values)
        .fold(Perturbation::new(), |p, (name, q)| p.with(*name, q))
}

fn first_unit(steps: &[Quantity], fallback: Unit) -> Unit {
    steps.first().map(|q| q.unit).unwrap_or(fallback)
}

fn check_steps(kind: &str, steps: &[Quantity], dimension: Dimension) -> Result<(), ToleranceError> {
    for step in steps {
        if step.unit.dimension() != dimension {
            return Err(ToleranceError::InvalidInput(format!(
                "{kind} step {step} has the wrong unit"
            )));
        }
        check_finite_non_negative(kind, *step)?;
    }
    Ok(())
}

fn check_finite_non_negative(name: &str, q: Quantity) -> Result<(), ToleranceError> {
    if !q.value.is_finite() || q.value < 0.0 {
        return Err(ToleranceError::InvalidInput(format!(
            "{name} magnitude {q} must be finite and non-negative"
        )));
    }
    Ok(())
}
