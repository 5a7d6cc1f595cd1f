//! Unit-tagged scalar quantities.
//!
//! Only the handful of units the instrument model needs are supported.
//! Conversion is allowed within a physical dimension; energy and wavelength
//! are linked through the spectral equivalence `E * lambda = hc`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SimError;

/// `h * c` in keV * Angstrom.
pub const HC_KEV_ANGSTROM: f64 = 12.398_419_843_320_026;

const ARCMIN_PER_RAD: f64 = 180.0 * 60.0 / std::f64::consts::PI;

/// Physical dimension of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    None,
    Length,
    Angle,
    Energy,
    Wavelength,
    Area,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Unit {
    Dimensionless,
    Millimeter,
    Radian,
    Degree,
    Arcmin,
    Arcsec,
    Kev,
    Angstrom,
    SquareCentimeter,
}

impl Unit {
    pub fn dimension(self) -> Dimension {
        match self {
            Unit::Dimensionless => Dimension::None,
            Unit::Millimeter => Dimension::Length,
            Unit::Radian | Unit::Degree | Unit::Arcmin | Unit::Arcsec => Dimension::Angle,
            Unit::Kev => Dimension::Energy,
            Unit::Angstrom => Dimension::Wavelength,
            Unit::SquareCentimeter => Dimension::Area,
        }
    }

    /// Symbol written into result-file metadata.
    pub fn symbol(self) -> &'static str {
        match self {
            Unit::Dimensionless => "",
            Unit::Millimeter => "mm",
            Unit::Radian => "rad",
            Unit::Degree => "deg",
            Unit::Arcmin => "arcmin",
            Unit::Arcsec => "arcsec",
            Unit::Kev => "keV",
            Unit::Angstrom => "Angstrom",
            Unit::SquareCentimeter => "cm2",
        }
    }

    /// Factor that converts a value in this unit to the base unit of its dimension
    /// (mm, rad, keV, Angstrom, cm2).
    fn to_base(self) -> f64 {
        match self {
            Unit::Degree => std::f64::consts::PI / 180.0,
            Unit::Arcmin => 1.0 / ARCMIN_PER_RAD,
            Unit::Arcsec => 1.0 / (ARCMIN_PER_RAD * 60.0),
            _ => 1.0,
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unit::Dimensionless => f.write_str("dimensionless"),
            other => f.write_str(other.symbol()),
        }
    }
}

/// A value tagged with its physical unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quantity {
    pub value: f64,
    pub unit: Unit,
}

impl Quantity {
    pub fn new(value: f64, unit: Unit) -> Self {
        Self { value, unit }
    }

    pub fn mm(value: f64) -> Self {
        Self::new(value, Unit::Millimeter)
    }

    pub fn arcmin(value: f64) -> Self {
        Self::new(value, Unit::Arcmin)
    }

    pub fn arcsec(value: f64) -> Self {
        Self::new(value, Unit::Arcsec)
    }

    pub fn rad(value: f64) -> Self {
        Self::new(value, Unit::Radian)
    }

    pub fn kev(value: f64) -> Self {
        Self::new(value, Unit::Kev)
    }

    pub fn angstrom(value: f64) -> Self {
        Self::new(value, Unit::Angstrom)
    }

    pub fn cm2(value: f64) -> Self {
        Self::new(value, Unit::SquareCentimeter)
    }

    /// Convert to `unit`. Energy and wavelength convert into each other.
    pub fn to(self, unit: Unit) -> Result<Quantity, SimError> {
        let from = self.unit.dimension();
        let to = unit.dimension();
        let value = match (from, to) {
            (a, b) if a == b => self.value * self.unit.to_base() / unit.to_base(),
            (Dimension::Energy, Dimension::Wavelength)
            | (Dimension::Wavelength, Dimension::Energy) => HC_KEV_ANGSTROM / self.value,
            _ => {
                return Err(SimError::UnitMismatch {
                    from: self.unit,
                    to: unit,
                })
            }
        };
        Ok(Quantity::new(value, unit))
    }

    /// Value in the base unit of the quantity's dimension.
    pub fn base_value(self) -> f64 {
        self.value * self.unit.to_base()
    }

    /// Value in radians; fails for anything but an angle.
    pub fn radians(self) -> Result<f64, SimError> {
        Ok(self.to(Unit::Radian)?.value)
    }

    /// Value in millimeters; fails for anything but a length.
    pub fn millimeters(self) -> Result<f64, SimError> {
        Ok(self.to(Unit::Millimeter)?.value)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value, self.unit.symbol())
    }
}

pub fn kev_to_angstrom(energy_kev: f64) -> f64 {
    HC_KEV_ANGSTROM / energy_kev
}

pub fn angstrom_to_kev(wave_angstrom: f64) -> f64 {
    HC_KEV_ANGSTROM / wave_angstrom
}
